use serde::{Deserialize, Serialize};

use crate::error::{ConstructionError, Result};
use crate::geometry::FlowAxis;
use crate::math::{Aabb, Point3, Vector3, NEGLIGIBLE};

/// Properties of the saturating fluid and the imposed pressure drop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FluidProperties {
    /// Kinematic viscosity in m²/s.
    pub kinematic_viscosity: f64,
    /// Density in kg/m³.
    pub density: f64,
    /// Dynamic viscosity in Pa·s.
    pub dynamic_viscosity: f64,
    /// Kinematic pressure at the inlet.
    pub pressure_inlet: f64,
    /// Kinematic pressure at the outlet.
    pub pressure_outlet: f64,
}

impl Default for FluidProperties {
    fn default() -> Self {
        Self {
            kinematic_viscosity: 7.934_782_609e-5,
            density: 920.0,
            dynamic_viscosity: 0.073,
            pressure_inlet: 1.0,
            pressure_outlet: 0.0,
        }
    }
}

impl FluidProperties {
    /// Outlet minus inlet pressure.
    #[must_use]
    pub fn pressure_drop(&self) -> f64 {
        self.pressure_outlet - self.pressure_inlet
    }
}

/// Which permeability estimators to evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermeabilityMethod {
    VolumeAveraged,
    FlowRate,
    #[default]
    Both,
}

impl PermeabilityMethod {
    fn volume_averaged(self) -> bool {
        matches!(self, Self::VolumeAveraged | Self::Both)
    }

    fn flow_rate(self) -> bool {
        matches!(self, Self::FlowRate | Self::Both)
    }
}

/// Region-of-interest settings for the averaging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiConfig {
    /// Exclude the inlet and outlet buffers from the averaging.
    pub fibrous_region_only: bool,
    /// Full extent of the computational domain, buffers included.
    ///
    /// This is the voxel grid box rather than the bounding box of the mesh
    /// points, so solid outer layers still count as domain volume in the
    /// fiber volume content.
    pub domain_bounds: Aabb,
    /// Physical length of the inlet buffer.
    pub inlet_length: f64,
    /// Physical length of the outlet buffer.
    pub outlet_length: f64,
    /// Factor applied to the buffer lengths.
    pub scale: f64,
}

impl RoiConfig {
    /// A region of interest covering the whole mesh.
    #[must_use]
    pub fn full(domain_bounds: Aabb) -> Self {
        Self {
            fibrous_region_only: false,
            domain_bounds,
            inlet_length: 0.0,
            outlet_length: 0.0,
            scale: 1.0,
        }
    }

    /// Box used for cell selection.
    ///
    /// The main-axis extent is trimmed by the scaled buffer lengths when
    /// restricted to the fibrous region; transverse extents are kept.
    #[must_use]
    pub fn roi_box(&self, axis: FlowAxis) -> Aabb {
        let mut roi = self.domain_bounds;
        if self.fibrous_region_only {
            let i = axis.index();
            roi.min[i] += self.inlet_length * self.scale;
            roi.max[i] -= self.outlet_length * self.scale;
        }
        roi
    }
}

/// Solved flow field sampled at the mesh cells.
#[derive(Debug, Clone, Copy)]
pub struct FlowSolution<'a> {
    pub velocities: &'a [Vector3],
    pub cell_centers: &'a [Point3],
    /// Total fluid volume of the mesh.
    pub mesh_volume: f64,
    /// Volumetric flux through the outlet patch.
    pub outlet_flux: f64,
}

/// Permeability estimates for one flow axis.
///
/// Fields that could not be evaluated are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermeabilityResult {
    pub axis: FlowAxis,
    pub vol_avg_main: f64,
    pub vol_avg_secondary: f64,
    pub vol_avg_tertiary: f64,
    pub flow_rate: f64,
    /// Solid fraction of the full domain in percent.
    pub fiber_volume_content: f64,
    /// Main-axis length of the region of interest.
    pub flow_length: f64,
    /// Transverse area of the region of interest.
    pub cross_section_area: f64,
    pub iterations_to_converge: Option<u64>,
}

impl PermeabilityResult {
    #[must_use]
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations_to_converge = Some(iterations);
        self
    }
}

/// Darcy permeability from a steady Stokes solution.
#[derive(Debug, Clone)]
pub struct PermeabilityAnalyzer {
    fluid: FluidProperties,
    roi: RoiConfig,
    method: PermeabilityMethod,
}

impl PermeabilityAnalyzer {
    #[must_use]
    pub fn new(fluid: FluidProperties, roi: RoiConfig) -> Self {
        Self {
            fluid,
            roi,
            method: PermeabilityMethod::default(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: PermeabilityMethod) -> Self {
        self.method = method;
        self
    }

    /// Computes the permeability along `axis`.
    ///
    /// Degenerate inputs (no cells in the region of interest, negligible
    /// pressure drop or cross-section) leave the affected fields at zero.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError::FieldLengthMismatch` when velocities and
    /// cell centers differ in length.
    #[allow(clippy::cast_precision_loss)]
    pub fn execute(&self, solution: &FlowSolution<'_>, axis: FlowAxis) -> Result<PermeabilityResult> {
        if solution.velocities.len() != solution.cell_centers.len() {
            return Err(ConstructionError::FieldLengthMismatch {
                field: "velocity",
                expected: solution.cell_centers.len(),
                actual: solution.velocities.len(),
            }
            .into());
        }

        let main = axis.index();
        let secondary = axis.secondary().index();
        let tertiary = axis.tertiary().index();
        let roi = self.roi.roi_box(axis);

        let mut sum = Vector3::zeros();
        let mut selected = 0usize;
        for (velocity, center) in solution.velocities.iter().zip(solution.cell_centers) {
            if roi.contains(center) {
                sum += velocity;
                selected += 1;
            }
        }

        let mut result = PermeabilityResult {
            axis,
            ..PermeabilityResult::default()
        };
        if selected == 0 {
            tracing::warn!(%axis, "no cells inside the region of interest");
            return Ok(result);
        }

        let avg = sum / selected as f64;
        let flow_length = roi.length(main);
        let cross_section = roi.length(secondary) * roi.length(tertiary);
        let full_length = self.roi.domain_bounds.length(main);

        let nu = self.fluid.kinematic_viscosity;
        let rho = self.fluid.density;
        let dp = self.fluid.pressure_drop();
        let darcy = |velocity: f64| -(velocity * nu * rho * flow_length) / dp;

        if dp.abs() > NEGLIGIBLE {
            if self.method.volume_averaged() {
                result.vol_avg_main = darcy(avg[main]);
                result.vol_avg_secondary = darcy(avg[secondary]);
                result.vol_avg_tertiary = darcy(avg[tertiary]);
            }
            if self.method.flow_rate() && cross_section > NEGLIGIBLE {
                result.flow_rate = darcy(solution.outlet_flux / cross_section);
            }
        } else {
            tracing::warn!(%axis, dp, "negligible pressure drop, permeability left at zero");
        }

        let domain_volume = full_length * cross_section;
        if domain_volume > NEGLIGIBLE {
            result.fiber_volume_content = (1.0 - solution.mesh_volume / domain_volume) * 100.0;
        }
        result.flow_length = flow_length;
        result.cross_section_area = cross_section;

        tracing::info!(
            %axis,
            cells = selected,
            vol_avg = result.vol_avg_main,
            flow_rate = result.flow_rate,
            fvc = result.fiber_volume_content,
            "computed permeability"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_fluid() -> FluidProperties {
        FluidProperties {
            kinematic_viscosity: 1.0,
            density: 1.0,
            dynamic_viscosity: 1.0,
            pressure_inlet: 1.0,
            pressure_outlet: 0.0,
        }
    }

    fn unit_box() -> Aabb {
        Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    fn grid_centers(n: usize, length: f64) -> Vec<Point3> {
        #[allow(clippy::cast_precision_loss)]
        let step = length / n as f64;
        let mut centers = Vec::new();
        for i in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let c = (i as f64 + 0.5) * step;
            centers.push(Point3::new(c, 0.5, 0.5));
        }
        centers
    }

    #[test]
    fn uniform_flow_gives_unit_permeability() {
        let centers = grid_centers(4, 1.0);
        let velocities = vec![Vector3::new(1.0, 0.0, 0.0); 4];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 1.0,
            outlet_flux: 1.0,
        };
        let result = PermeabilityAnalyzer::new(unit_fluid(), RoiConfig::full(unit_box()))
            .execute(&solution, FlowAxis::X)
            .unwrap();
        assert_relative_eq!(result.vol_avg_main, 1.0);
        assert_relative_eq!(result.vol_avg_secondary, 0.0);
        assert_relative_eq!(result.flow_rate, 1.0);
        assert_relative_eq!(result.fiber_volume_content, 0.0);
        assert_relative_eq!(result.flow_length, 1.0);
        assert_relative_eq!(result.cross_section_area, 1.0);
    }

    #[test]
    fn buffers_are_trimmed_from_the_average() {
        // Ten cells over length 1; the first and last two sit in the buffers.
        let centers = grid_centers(10, 1.0);
        let velocities: Vec<Vector3> = (0..10)
            .map(|i| {
                let u = if (2..8).contains(&i) { 2.0 } else { 100.0 };
                Vector3::new(u, 0.0, 0.0)
            })
            .collect();
        let roi = RoiConfig {
            fibrous_region_only: true,
            domain_bounds: unit_box(),
            inlet_length: 0.2,
            outlet_length: 0.2,
            scale: 1.0,
        };
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 0.5,
            outlet_flux: 0.0,
        };
        let result = PermeabilityAnalyzer::new(unit_fluid(), roi)
            .execute(&solution, FlowAxis::X)
            .unwrap();
        assert_relative_eq!(result.flow_length, 0.6, epsilon = 1e-12);
        assert_relative_eq!(result.vol_avg_main, 2.0 * 0.6, epsilon = 1e-12);
        // Full length is used for the fiber volume content.
        assert_relative_eq!(result.fiber_volume_content, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_selection_is_all_zero() {
        let centers = vec![Point3::new(5.0, 5.0, 5.0)];
        let velocities = vec![Vector3::new(1.0, 1.0, 1.0)];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 1.0,
            outlet_flux: 1.0,
        };
        let result = PermeabilityAnalyzer::new(unit_fluid(), RoiConfig::full(unit_box()))
            .execute(&solution, FlowAxis::Y)
            .unwrap();
        assert_eq!(
            result,
            PermeabilityResult {
                axis: FlowAxis::Y,
                ..PermeabilityResult::default()
            }
        );
    }

    #[test]
    fn negligible_pressure_drop_skips_permeability() {
        let mut fluid = unit_fluid();
        fluid.pressure_outlet = fluid.pressure_inlet;
        let centers = grid_centers(2, 1.0);
        let velocities = vec![Vector3::new(1.0, 0.0, 0.0); 2];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 0.25,
            outlet_flux: 1.0,
        };
        let result = PermeabilityAnalyzer::new(fluid, RoiConfig::full(unit_box()))
            .execute(&solution, FlowAxis::X)
            .unwrap();
        assert_eq!(result.vol_avg_main, 0.0);
        assert_eq!(result.flow_rate, 0.0);
        assert!(result.vol_avg_main.is_finite());
        assert_relative_eq!(result.fiber_volume_content, 75.0);
    }

    #[test]
    fn flat_domain_leaves_flow_rate_and_fvc_at_zero() {
        let flat = Aabb::new(Point3::origin(), Point3::new(1.0, 0.0, 1.0));
        let centers = vec![Point3::new(0.5, 0.0, 0.5)];
        let velocities = vec![Vector3::new(1.0, 0.0, 0.0)];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 1.0,
            outlet_flux: 1.0,
        };
        let result = PermeabilityAnalyzer::new(unit_fluid(), RoiConfig::full(flat))
            .execute(&solution, FlowAxis::X)
            .unwrap();
        assert_eq!(result.cross_section_area, 0.0);
        assert_eq!(result.flow_rate, 0.0);
        assert_eq!(result.fiber_volume_content, 0.0);
        assert_relative_eq!(result.vol_avg_main, 1.0);
        for value in [
            result.vol_avg_main,
            result.vol_avg_secondary,
            result.vol_avg_tertiary,
            result.flow_rate,
            result.fiber_volume_content,
            result.flow_length,
        ] {
            assert!(value.is_finite());
        }
    }

    #[test]
    fn method_selection() {
        let centers = grid_centers(2, 1.0);
        let velocities = vec![Vector3::new(1.0, 0.0, 0.0); 2];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 1.0,
            outlet_flux: 3.0,
        };
        let analyzer = PermeabilityAnalyzer::new(unit_fluid(), RoiConfig::full(unit_box()));

        let flow_only = analyzer
            .clone()
            .with_method(PermeabilityMethod::FlowRate)
            .execute(&solution, FlowAxis::X)
            .unwrap();
        assert_eq!(flow_only.vol_avg_main, 0.0);
        assert_relative_eq!(flow_only.flow_rate, 3.0);

        let vol_only = analyzer
            .with_method(PermeabilityMethod::VolumeAveraged)
            .execute(&solution, FlowAxis::X)
            .unwrap();
        assert_relative_eq!(vol_only.vol_avg_main, 1.0);
        assert_eq!(vol_only.flow_rate, 0.0);
    }

    #[test]
    fn transverse_components_follow_axis_order() {
        let centers = vec![Point3::new(0.5, 0.5, 0.5)];
        let velocities = vec![Vector3::new(3.0, 1.0, 2.0)];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 1.0,
            outlet_flux: 0.0,
        };
        let result = PermeabilityAnalyzer::new(unit_fluid(), RoiConfig::full(unit_box()))
            .execute(&solution, FlowAxis::Y)
            .unwrap();
        // y is main, z secondary, x tertiary.
        assert_relative_eq!(result.vol_avg_main, 1.0);
        assert_relative_eq!(result.vol_avg_secondary, 2.0);
        assert_relative_eq!(result.vol_avg_tertiary, 3.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let centers = grid_centers(3, 1.0);
        let velocities = vec![Vector3::zeros(); 2];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: 1.0,
            outlet_flux: 0.0,
        };
        assert!(PermeabilityAnalyzer::new(unit_fluid(), RoiConfig::full(unit_box()))
            .execute(&solution, FlowAxis::X)
            .is_err());
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = PermeabilityResult::default().with_iterations(120);
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["iterationsToConverge"], 120);
        assert_eq!(json["axis"], "x");
        assert!(json.get("volAvgMain").is_some());
    }
}
