use crate::error::{ConstructionError, Result};
use crate::math::{Aabb, Point3};

use super::{voxel_count, VoxelState};

/// Dense 3D occupancy array of a fibrous microstructure.
///
/// Voxels are stored flat with `x` varying fastest:
/// `index = x + nx * (y + ny * z)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    dims: [usize; 3],
    states: Vec<VoxelState>,
}

impl VoxelGrid {
    /// Creates a grid from explicit dimensions and a flat state array.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError::LengthMismatch` if `states.len()` differs
    /// from `nx * ny * nz`, or when that product overflows.
    pub fn new(dims: [usize; 3], states: Vec<VoxelState>) -> Result<Self> {
        let expected = voxel_count(dims);
        if expected != Some(states.len()) {
            return Err(ConstructionError::LengthMismatch {
                dims,
                expected: expected.unwrap_or(usize::MAX),
                actual: states.len(),
            }
            .into());
        }
        Ok(Self { dims, states })
    }

    /// Creates a grid from raw integer labels, treating any non-zero value as fluid.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError::LengthMismatch` on a length mismatch.
    pub fn from_raw(dims: [usize; 3], raw: &[i8]) -> Result<Self> {
        let states = raw
            .iter()
            .map(|&v| {
                if v == 0 {
                    VoxelState::Solid
                } else {
                    VoxelState::Fluid
                }
            })
            .collect();
        Self::new(dims, states)
    }

    /// Creates a grid with every voxel set to `state`.
    #[must_use]
    pub fn filled(dims: [usize; 3], state: VoxelState) -> Self {
        Self {
            dims,
            states: vec![state; voxel_count(dims).unwrap_or(usize::MAX)],
        }
    }

    /// Grid dimensions `[nx, ny, nz]`.
    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[must_use]
    pub fn nx(&self) -> usize {
        self.dims[0]
    }

    #[must_use]
    pub fn ny(&self) -> usize {
        self.dims[1]
    }

    #[must_use]
    pub fn nz(&self) -> usize {
        self.dims[2]
    }

    /// Total number of voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if any dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The flat state array.
    #[must_use]
    pub fn states(&self) -> &[VoxelState] {
        &self.states
    }

    /// Flat index of `(x, y, z)`, or `None` when outside the grid.
    #[must_use]
    pub fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        let [nx, ny, nz] = self.dims;
        (x < nx && y < ny && z < nz).then(|| x + nx * (y + ny * z))
    }

    /// Bounded element access.
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<VoxelState> {
        self.index(x, y, z).map(|i| self.states[i])
    }

    /// Sets a voxel, returning `false` if the coordinate is outside the grid.
    pub fn set(&mut self, x: usize, y: usize, z: usize, state: VoxelState) -> bool {
        match self.index(x, y, z) {
            Some(i) => {
                self.states[i] = state;
                true
            }
            None => false,
        }
    }

    /// Number of fluid voxels.
    #[must_use]
    pub fn fluid_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_fluid()).count()
    }

    /// Fraction of voxels that are fluid; `0.0` for an empty grid.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fluid_fraction(&self) -> f64 {
        if self.states.is_empty() {
            return 0.0;
        }
        self.fluid_count() as f64 / self.states.len() as f64
    }

    /// Swaps solid and fluid labels in place.
    ///
    /// Some geometry sources encode fibers as `1` and pores as `0`.
    pub fn invert_convention(&mut self) {
        for state in &mut self.states {
            *state = state.inverted();
        }
    }

    /// Physical box covered by the grid, from the origin to `n * voxel_size`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self, voxel_size: f64) -> Aabb {
        let [nx, ny, nz] = self.dims;
        Aabb::new(
            Point3::origin(),
            Point3::new(
                nx as f64 * voxel_size,
                ny as f64 * voxel_size,
                nz as f64 * voxel_size,
            ),
        )
    }

    /// Nearest-neighbor resampling so that the first axis has `target` voxels.
    ///
    /// The other axes are scaled by the same factor and rounded to the nearest
    /// integer (at least 1), preserving the aspect ratio. The fluid fraction is
    /// only approximately preserved.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError::EmptyGrid` for a grid with a zero dimension
    /// and `ConstructionError::InvalidParameter` when `target` is zero.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn resample(&self, target: usize) -> Result<Self> {
        if self.is_empty() {
            return Err(ConstructionError::EmptyGrid("resample").into());
        }
        if target == 0 {
            return Err(
                ConstructionError::InvalidParameter("resample target must be positive".into())
                    .into(),
            );
        }

        let [nx, ny, nz] = self.dims;
        let scale = target as f64 / nx as f64;
        let new_dims = [
            target,
            ((ny as f64 * scale).round() as usize).max(1),
            ((nz as f64 * scale).round() as usize).max(1),
        ];

        let source = |i: usize, n: usize| -> usize {
            let raw = ((i as f64 + 0.5) / scale).floor() as usize;
            raw.min(n - 1)
        };

        let mut states = Vec::with_capacity(voxel_count(new_dims).unwrap_or(0));
        for iz in 0..new_dims[2] {
            let oz = source(iz, nz);
            for iy in 0..new_dims[1] {
                let oy = source(iy, ny);
                for ix in 0..new_dims[0] {
                    let ox = source(ix, nx);
                    states.push(self.states[ox + nx * (oy + ny * oz)]);
                }
            }
        }

        tracing::debug!(
            from = ?self.dims,
            to = ?new_dims,
            "resampled voxel grid"
        );
        Self::new(new_dims, states)
    }
}
