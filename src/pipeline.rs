//! Preparation of a single flow case from a voxel geometry.

use std::borrow::Cow;

use crate::analysis::{ConvergenceMonitor, PermeabilityAnalyzer, RoiConfig};
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::geometry::{BufferPadding, FlowAxis, PaddedGeometry, RegionTracker, VoxelGrid};
use crate::mesh::{HexMeshBuilder, Mesh};

/// Everything needed to solve and post-process one flow axis.
#[derive(Debug, Clone)]
pub struct PreparedCase {
    pub axis: FlowAxis,
    pub padded: PaddedGeometry,
    pub mesh: Mesh,
    pub regions: RegionTracker,
    pub roi: RoiConfig,
    /// Analyzer configured with the fluid, method and region of interest.
    pub analyzer: PermeabilityAnalyzer,
    /// Empty monitor with the configured criteria.
    pub monitor: ConvergenceMonitor,
}

/// Runs inversion, resampling, buffer padding, meshing and region tracking
/// for one flow axis.
pub struct PrepareFlowCase<'a> {
    config: &'a SimulationConfig,
    axis: FlowAxis,
}

impl<'a> PrepareFlowCase<'a> {
    #[must_use]
    pub fn new(config: &'a SimulationConfig, axis: FlowAxis) -> Self {
        Self { config, axis }
    }

    /// Executes the preparation on `grid`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid configuration, and propagates the
    /// construction and topology errors of the individual stages.
    pub fn execute(&self, grid: &VoxelGrid) -> Result<PreparedCase> {
        self.config.validate()?;
        let geometry = &self.config.geometry;
        let voxel_size = geometry.voxel_size;

        let mut working = Cow::Borrowed(grid);
        if geometry.invert_convention {
            working.to_mut().invert_convention();
        }
        if let Some(target) = geometry.resolution {
            working = Cow::Owned(working.resample(target)?);
        }

        let buffer = self.config.buffer;
        let padded = BufferPadding::new(self.axis, buffer.inlet_layers, buffer.outlet_layers)
            .execute(&working)?;

        let mesh = HexMeshBuilder::new(padded.geometry(), self.config.mesh_options(self.axis))
            .with_regions(padded.regions())
            .execute()?;
        let regions = RegionTracker::new(&mesh, &padded)?;

        let roi = RoiConfig {
            fibrous_region_only: self.config.post_processing.fibrous_region_only,
            domain_bounds: padded.geometry().extent(voxel_size),
            inlet_length: padded.inlet_length(voxel_size),
            outlet_length: padded.outlet_length(voxel_size),
            scale: 1.0,
        };
        let analyzer = PermeabilityAnalyzer::new(self.config.flow.fluid, roi)
            .with_method(self.config.post_processing.method);
        let monitor = ConvergenceMonitor::new(self.config.convergence)?;

        tracing::info!(
            axis = %self.axis,
            dims = ?padded.geometry().dims(),
            cells = mesh.n_cells(),
            fibrous_cells = regions.counts().fibrous,
            "prepared flow case"
        );

        Ok(PreparedCase {
            axis: self.axis,
            padded,
            mesh,
            regions,
            roi,
            analyzer,
            monitor,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analysis::FlowSolution;
    use crate::error::FiberMeshError;
    use crate::geometry::{RegionLabel, VoxelState};
    use crate::math::Vector3;
    use approx::assert_relative_eq;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn buffered_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.geometry.voxel_size = 1.0;
        config.buffer.inlet_layers = 2;
        config.buffer.outlet_layers = 2;
        config.flow.fluid.kinematic_viscosity = 1.0;
        config.flow.fluid.density = 1.0;
        config
    }

    #[test]
    fn buffered_case_along_x() {
        init_tracing();
        let grid = VoxelGrid::filled([3, 3, 3], VoxelState::Fluid);
        let config = buffered_config();
        let case = PrepareFlowCase::new(&config, FlowAxis::X).execute(&grid).unwrap();

        assert_eq!(case.padded.geometry().dims(), [7, 3, 3]);
        assert_eq!(case.mesh.n_cells(), 63);
        assert_eq!(case.regions.count(RegionLabel::Fibrous), 27);
        assert_eq!(case.regions.count(RegionLabel::BufferOutlet), 18);
        assert_relative_eq!(case.roi.inlet_length, 2.0);
        assert_relative_eq!(case.roi.domain_bounds.max.x, 7.0);
        assert!(case.mesh.patch("inlet").is_some());
        case.mesh.check().unwrap();

        let roi = case.roi.roi_box(FlowAxis::X);
        assert_relative_eq!(roi.min.x, 2.0);
        assert_relative_eq!(roi.max.x, 5.0);
    }

    #[test]
    fn geometric_roi_matches_fibrous_labels() {
        init_tracing();
        let grid = VoxelGrid::filled([3, 2, 2], VoxelState::Fluid);
        let config = buffered_config();
        let case = PrepareFlowCase::new(&config, FlowAxis::Y).execute(&grid).unwrap();

        let roi = case.roi.roi_box(FlowAxis::Y);
        let centers = case.mesh.cell_centers();
        let in_roi: Vec<usize> = centers
            .iter()
            .enumerate()
            .filter_map(|(i, c)| roi.contains(c).then_some(i))
            .collect();
        let fibrous: Vec<usize> = case.regions.cells_in(RegionLabel::Fibrous).collect();
        assert_eq!(in_roi, fibrous);
    }

    #[test]
    fn analyzer_runs_on_prepared_case() {
        init_tracing();
        let grid = VoxelGrid::filled([2, 2, 2], VoxelState::Fluid);
        let mut config = buffered_config();
        config.buffer.inlet_layers = 0;
        config.buffer.outlet_layers = 0;
        let case = PrepareFlowCase::new(&config, FlowAxis::Z).execute(&grid).unwrap();

        let centers = case.mesh.cell_centers();
        let velocities = vec![Vector3::new(0.0, 0.0, 0.5); centers.len()];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: case.mesh.fluid_volume(),
            outlet_flux: 2.0,
        };
        let result = case.analyzer.execute(&solution, case.axis).unwrap();
        // K = -(0.5 * 1 * 1 * 2) / (0 - 1)
        assert_relative_eq!(result.vol_avg_main, 1.0);
        assert_relative_eq!(result.flow_rate, 1.0);
        assert_relative_eq!(result.fiber_volume_content, 0.0);
        assert_eq!(case.monitor.history().len(), 0);
    }

    #[test]
    fn domain_bounds_include_solid_outer_layers() {
        let mut grid = VoxelGrid::filled([3, 3, 3], VoxelState::Fluid);
        for z in 0..3 {
            for x in 0..3 {
                grid.set(x, 2, z, VoxelState::Solid);
            }
        }
        let mut config = buffered_config();
        config.buffer.inlet_layers = 0;
        config.buffer.outlet_layers = 0;
        let case = PrepareFlowCase::new(&config, FlowAxis::X).execute(&grid).unwrap();

        assert_relative_eq!(case.mesh.bounds().unwrap().max.y, 2.0);
        assert_relative_eq!(case.roi.domain_bounds.max.y, 3.0);

        let centers = case.mesh.cell_centers();
        let velocities = vec![Vector3::zeros(); centers.len()];
        let solution = FlowSolution {
            velocities: &velocities,
            cell_centers: &centers,
            mesh_volume: case.mesh.fluid_volume(),
            outlet_flux: 0.0,
        };
        let result = case.analyzer.execute(&solution, case.axis).unwrap();
        // 18 fluid voxels out of 27.
        assert_relative_eq!(result.fiber_volume_content, 100.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn inversion_and_resampling() {
        init_tracing();
        let grid = VoxelGrid::filled([4, 4, 4], VoxelState::Solid);
        let mut config = buffered_config();
        config.geometry.invert_convention = true;
        config.geometry.resolution = Some(2);
        config.buffer.outlet_layers = 0;
        let case = PrepareFlowCase::new(&config, FlowAxis::X).execute(&grid).unwrap();

        assert_eq!(case.padded.geometry().dims(), [4, 2, 2]);
        assert_eq!(case.mesh.n_cells(), 16);
        assert_eq!(grid.fluid_count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let grid = VoxelGrid::filled([2, 2, 2], VoxelState::Fluid);
        let mut config = SimulationConfig::default();
        config.geometry.voxel_size = -1.0;
        let err = PrepareFlowCase::new(&config, FlowAxis::X)
            .execute(&grid)
            .unwrap_err();
        assert!(matches!(err, FiberMeshError::Config(_)));
    }
}
