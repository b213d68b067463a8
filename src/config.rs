//! Simulation settings.
//!
//! Every section falls back to its defaults when omitted, so a partial
//! document (or an empty one) deserializes. Keys are camelCase.

use serde::{Deserialize, Serialize};

use crate::analysis::{ConvergenceCriteria, FluidProperties, PermeabilityMethod};
use crate::error::ConfigError;
use crate::geometry::FlowAxis;
use crate::mesh::MeshOptions;

/// Full settings of one simulation campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub geometry: GeometryConfig,
    pub flow: FlowConfig,
    pub buffer: BufferConfig,
    pub mesh: MeshConfig,
    pub convergence: ConvergenceCriteria,
    pub post_processing: PostProcessingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeometryConfig {
    /// Edge length of one voxel in meters.
    pub voxel_size: f64,
    /// Resample target along the first axis.
    pub resolution: Option<usize>,
    /// Swap fluid and solid after loading.
    pub invert_convention: bool,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.5e-6,
            resolution: None,
            invert_convention: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    /// Axes to simulate, each in its own case.
    pub axes: Vec<FlowAxis>,
    pub fluid: FluidProperties,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            axes: vec![FlowAxis::X],
            fluid: FluidProperties::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BufferConfig {
    pub inlet_layers: usize,
    pub outlet_layers: usize,
}

impl BufferConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inlet_layers > 0 || self.outlet_layers > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshConfig {
    pub connectivity_check: bool,
    pub boundary_patches: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            connectivity_check: true,
            boundary_patches: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostProcessingConfig {
    pub fibrous_region_only: bool,
    pub method: PermeabilityMethod,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        Self {
            fibrous_region_only: true,
            method: PermeabilityMethod::default(),
        }
    }
}

fn positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "must be positive",
        })
    }
}

impl SimulationConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("geometry.voxelSize", self.geometry.voxel_size)?;
        if self.geometry.resolution == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "geometry.resolution",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if self.flow.axes.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "flow.axes",
                value: "[]".to_string(),
                reason: "at least one flow axis is required",
            });
        }
        positive("flow.fluid.kinematicViscosity", self.flow.fluid.kinematic_viscosity)?;
        positive("flow.fluid.density", self.flow.fluid.density)?;
        if self.convergence.window < 2 {
            return Err(ConfigError::InvalidValue {
                key: "convergence.window",
                value: self.convergence.window.to_string(),
                reason: "must be at least 2",
            });
        }
        positive("convergence.slope", self.convergence.slope)?;
        positive("convergence.errorBound", self.convergence.error_bound)?;
        Ok(())
    }

    /// Mesh builder options for one flow axis.
    #[must_use]
    pub fn mesh_options(&self, axis: FlowAxis) -> MeshOptions {
        MeshOptions::new(self.geometry.voxel_size, axis)
            .with_connectivity_check(self.mesh.connectivity_check)
            .with_boundary_patches(self.mesh.boundary_patches)
    }
}
