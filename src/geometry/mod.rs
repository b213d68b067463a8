pub mod padding;
pub mod region_tracker;
pub mod voxel_grid;

pub use padding::{BufferPadding, PaddedGeometry};
pub use region_tracker::{RegionCounts, RegionTracker};
pub use voxel_grid::VoxelGrid;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::Vector3;

/// Number of voxels in a grid of `dims`, or `None` when it overflows `usize`.
#[must_use]
pub fn voxel_count(dims: [usize; 3]) -> Option<usize> {
    dims[0].checked_mul(dims[1])?.checked_mul(dims[2])
}

/// Occupancy of a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoxelState {
    /// Fiber material; produces no mesh cell.
    Solid,
    /// Pore space; becomes a mesh cell.
    Fluid,
}

impl VoxelState {
    /// Returns the opposite state.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Solid => Self::Fluid,
            Self::Fluid => Self::Solid,
        }
    }

    /// Returns `true` for [`VoxelState::Fluid`].
    #[must_use]
    pub fn is_fluid(self) -> bool {
        self == Self::Fluid
    }
}

/// Region tag attached to each voxel after buffer padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionLabel {
    /// Part of the original porous geometry.
    #[default]
    Fibrous,
    /// Fluid-only layer prepended along the flow axis.
    BufferInlet,
    /// Fluid-only layer appended along the flow axis.
    BufferOutlet,
}

/// Principal flow axis of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowAxis {
    #[default]
    X,
    Y,
    Z,
}

impl FlowAxis {
    /// All axes in canonical order.
    pub const ALL: [FlowAxis; 3] = [FlowAxis::X, FlowAxis::Y, FlowAxis::Z];

    /// Component index of this axis (`x = 0`, `y = 1`, `z = 2`).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// The first transverse axis, cycling `x -> y -> z -> x`.
    #[must_use]
    pub fn secondary(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::Z,
            Self::Z => Self::X,
        }
    }

    /// The second transverse axis.
    #[must_use]
    pub fn tertiary(self) -> Self {
        self.secondary().secondary()
    }

    /// Lowercase axis name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }

    /// Picks the axis whose velocity component has the largest summed magnitude.
    ///
    /// Ties resolve in `x, y, z` order; an empty field yields `x`.
    #[must_use]
    pub fn dominant(velocities: &[Vector3]) -> Self {
        let totals = velocities
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.abs());
        if totals.x >= totals.y && totals.x >= totals.z {
            Self::X
        } else if totals.y >= totals.z {
            Self::Y
        } else {
            Self::Z
        }
    }
}

impl fmt::Display for FlowAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FlowAxis {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" | "X" => Ok(Self::X),
            "y" | "Y" => Ok(Self::Y),
            "z" | "Z" => Ok(Self::Z),
            other => Err(ConfigError::InvalidValue {
                key: "flow.axes",
                value: other.to_string(),
                reason: "expected one of x, y, z",
            }),
        }
    }
}
