use serde::Serialize;

use crate::error::{ConstructionError, LookupError, Result};
use crate::mesh::{Cell, Mesh};

use super::{voxel_count, PaddedGeometry, RegionLabel};

/// Number of cells (or voxels) per region label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionCounts {
    pub fibrous: usize,
    pub buffer_inlet: usize,
    pub buffer_outlet: usize,
}

impl RegionCounts {
    /// Counts the labels yielded by `labels`.
    pub fn tally(labels: impl IntoIterator<Item = RegionLabel>) -> Self {
        labels.into_iter().fold(Self::default(), |mut acc, label| {
            match label {
                RegionLabel::Fibrous => acc.fibrous += 1,
                RegionLabel::BufferInlet => acc.buffer_inlet += 1,
                RegionLabel::BufferOutlet => acc.buffer_outlet += 1,
            }
            acc
        })
    }

    /// Count for a single label.
    #[must_use]
    pub fn get(&self, label: RegionLabel) -> usize {
        match label {
            RegionLabel::Fibrous => self.fibrous,
            RegionLabel::BufferInlet => self.buffer_inlet,
            RegionLabel::BufferOutlet => self.buffer_outlet,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.fibrous + self.buffer_inlet + self.buffer_outlet
    }
}

/// Maps mesh cells back to the region of their origin voxel.
///
/// Read-only after construction.
#[derive(Debug, Clone)]
pub struct RegionTracker {
    dims: [usize; 3],
    labels: Vec<RegionLabel>,
    cell_regions: Vec<RegionLabel>,
}

impl RegionTracker {
    /// Builds the tracker for a mesh built from `padded`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`RegionTracker::from_cells`].
    pub fn new(mesh: &Mesh, padded: &PaddedGeometry) -> Result<Self> {
        Self::from_cells(&mesh.cells, padded.regions(), padded.geometry().dims())
    }

    /// Builds the tracker from cells and a region array with grid indexing.
    ///
    /// Cells whose voxel coordinate falls outside `dims` are tagged fibrous.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError::FieldLengthMismatch` when `labels` does not
    /// match `dims` or the voxel count of `dims` overflows.
    pub fn from_cells(cells: &[Cell], labels: &[RegionLabel], dims: [usize; 3]) -> Result<Self> {
        let expected = voxel_count(dims);
        if expected != Some(labels.len()) {
            return Err(ConstructionError::FieldLengthMismatch {
                field: "region",
                expected: expected.unwrap_or(usize::MAX),
                actual: labels.len(),
            }
            .into());
        }

        let [nx, ny, nz] = dims;
        let cell_regions = cells
            .iter()
            .map(|cell| {
                let [x, y, z] = cell.coord;
                if x < nx && y < ny && z < nz {
                    labels[x + nx * (y + ny * z)]
                } else {
                    RegionLabel::Fibrous
                }
            })
            .collect();

        let tracker = Self {
            dims,
            labels: labels.to_vec(),
            cell_regions,
        };
        let counts = tracker.counts();
        tracing::debug!(
            fibrous = counts.fibrous,
            inlet = counts.buffer_inlet,
            outlet = counts.buffer_outlet,
            "tracked cell regions"
        );
        Ok(tracker)
    }

    /// Region label at voxel `(x, y, z)`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::VoxelOutOfRange` outside the region array.
    pub fn region_at(&self, x: usize, y: usize, z: usize) -> Result<RegionLabel> {
        let [nx, ny, nz] = self.dims;
        if x >= nx || y >= ny || z >= nz {
            return Err(LookupError::VoxelOutOfRange { x, y, z }.into());
        }
        Ok(self.labels[x + nx * (y + ny * z)])
    }

    /// Region label of mesh cell `cell`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::CellNotFound` for an unregistered cell index.
    pub fn region_for_cell(&self, cell: usize) -> Result<RegionLabel> {
        self.cell_regions
            .get(cell)
            .copied()
            .ok_or_else(|| LookupError::CellNotFound(cell).into())
    }

    /// Per-label cell counts.
    #[must_use]
    pub fn counts(&self) -> RegionCounts {
        RegionCounts::tally(self.cell_regions.iter().copied())
    }

    /// Number of cells with `label`.
    #[must_use]
    pub fn count(&self, label: RegionLabel) -> usize {
        self.cell_regions.iter().filter(|&&r| r == label).count()
    }

    /// Indices of the cells carrying `label`, ascending.
    pub fn cells_in(&self, label: RegionLabel) -> impl Iterator<Item = usize> + '_ {
        self.cell_regions
            .iter()
            .enumerate()
            .filter_map(move |(i, &r)| (r == label).then_some(i))
    }

    /// Number of registered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cell_regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cell_regions.is_empty()
    }
}
