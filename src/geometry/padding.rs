use crate::error::{ConstructionError, Result};

use super::{voxel_count, FlowAxis, RegionCounts, RegionLabel, VoxelGrid, VoxelState};

/// A voxel grid extended with fluid buffer layers, plus a parallel region array.
#[derive(Debug, Clone)]
pub struct PaddedGeometry {
    geometry: VoxelGrid,
    regions: Vec<RegionLabel>,
    axis: FlowAxis,
    inlet_layers: usize,
    outlet_layers: usize,
}

impl PaddedGeometry {
    /// Wraps an unpadded grid: every voxel is labeled [`RegionLabel::Fibrous`].
    #[must_use]
    pub fn unpadded(geometry: VoxelGrid, axis: FlowAxis) -> Self {
        let regions = vec![RegionLabel::Fibrous; geometry.len()];
        Self {
            geometry,
            regions,
            axis,
            inlet_layers: 0,
            outlet_layers: 0,
        }
    }

    /// The padded voxel grid.
    #[must_use]
    pub fn geometry(&self) -> &VoxelGrid {
        &self.geometry
    }

    /// Region label per voxel, with the same flat indexing as the grid.
    #[must_use]
    pub fn regions(&self) -> &[RegionLabel] {
        &self.regions
    }

    /// Flow axis along which the buffers were added.
    #[must_use]
    pub fn axis(&self) -> FlowAxis {
        self.axis
    }

    #[must_use]
    pub fn inlet_layers(&self) -> usize {
        self.inlet_layers
    }

    #[must_use]
    pub fn outlet_layers(&self) -> usize {
        self.outlet_layers
    }

    /// Physical length of the inlet buffer.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn inlet_length(&self, voxel_size: f64) -> f64 {
        self.inlet_layers as f64 * voxel_size
    }

    /// Physical length of the outlet buffer.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn outlet_length(&self, voxel_size: f64) -> f64 {
        self.outlet_layers as f64 * voxel_size
    }

    /// Number of voxels carrying each region label.
    #[must_use]
    pub fn region_counts(&self) -> RegionCounts {
        RegionCounts::tally(self.regions.iter().copied())
    }

    /// Physical `(start, end)` of the fibrous span along the flow axis.
    ///
    /// The span runs from the start of the first fibrous layer to the end of
    /// the last one. Returns `(0.0, 0.0)` when no voxel is labeled fibrous.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fibrous_extent(&self, voxel_size: f64) -> (f64, f64) {
        let [nx, ny, _] = self.geometry.dims();
        let axis = self.axis.index();

        let mut first: Option<usize> = None;
        let mut last: Option<usize> = None;
        for (i, region) in self.regions.iter().enumerate() {
            if *region != RegionLabel::Fibrous {
                continue;
            }
            let coord = [i % nx, (i / nx) % ny, i / (nx * ny)];
            let c = coord[axis];
            first = Some(first.map_or(c, |f| f.min(c)));
            last = Some(last.map_or(c, |l| l.max(c)));
        }

        match (first, last) {
            (Some(first), Some(last)) => (first as f64 * voxel_size, (last + 1) as f64 * voxel_size),
            _ => (0.0, 0.0),
        }
    }
}

/// Pads a voxel grid with fluid-only layers along the flow axis.
///
/// Inlet layers are prepended and outlet layers appended; the transverse axes
/// are unchanged. Copied voxels are labeled fibrous.
pub struct BufferPadding {
    axis: FlowAxis,
    inlet_layers: usize,
    outlet_layers: usize,
}

impl BufferPadding {
    /// Creates a new `BufferPadding` operation.
    #[must_use]
    pub fn new(axis: FlowAxis, inlet_layers: usize, outlet_layers: usize) -> Self {
        Self {
            axis,
            inlet_layers,
            outlet_layers,
        }
    }

    /// Executes the padding.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError::EmptyGrid` if the input grid has a zero dimension,
    /// and `ConstructionError::InvalidParameter` if the padded voxel count overflows.
    pub fn execute(&self, grid: &VoxelGrid) -> Result<PaddedGeometry> {
        if grid.is_empty() {
            return Err(ConstructionError::EmptyGrid("pad").into());
        }

        let axis = self.axis.index();
        let original = grid.dims();
        let too_large = || {
            ConstructionError::InvalidParameter(format!(
                "padding {original:?} by {} + {} layers overflows the voxel count",
                self.inlet_layers, self.outlet_layers
            ))
        };
        let mut dims = original;
        dims[axis] = self
            .inlet_layers
            .checked_add(self.outlet_layers)
            .and_then(|layers| layers.checked_add(original[axis]))
            .ok_or_else(too_large)?;
        let fibrous_end = self.inlet_layers + original[axis];

        let total = voxel_count(dims).ok_or_else(too_large)?;
        let mut states = Vec::with_capacity(total);
        let mut regions = Vec::with_capacity(total);

        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let mut coord = [x, y, z];
                    let c = coord[axis];
                    if c < self.inlet_layers {
                        states.push(VoxelState::Fluid);
                        regions.push(RegionLabel::BufferInlet);
                    } else if c >= fibrous_end {
                        states.push(VoxelState::Fluid);
                        regions.push(RegionLabel::BufferOutlet);
                    } else {
                        coord[axis] -= self.inlet_layers;
                        let state = grid.get(coord[0], coord[1], coord[2]).ok_or_else(|| {
                            ConstructionError::InvalidParameter(format!(
                                "padding source voxel {coord:?} outside grid {original:?}"
                            ))
                        })?;
                        states.push(state);
                        regions.push(RegionLabel::Fibrous);
                    }
                }
            }
        }

        let geometry = VoxelGrid::new(dims, states)?;
        tracing::info!(
            axis = %self.axis,
            inlet = self.inlet_layers,
            outlet = self.outlet_layers,
            dims = ?dims,
            "padded geometry with buffer layers"
        );

        Ok(PaddedGeometry {
            geometry,
            regions,
            axis: self.axis,
            inlet_layers: self.inlet_layers,
            outlet_layers: self.outlet_layers,
        })
    }
}
