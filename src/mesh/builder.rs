use std::collections::BTreeMap;

use crate::error::{ConstructionError, Result};
use crate::geometry::{FlowAxis, RegionLabel, VoxelGrid};
use crate::math::{Point3, Vector3};

use super::connectivity::retain_largest_component;
use super::faces::generate_faces;
use super::patches::{classify_boundary, single_walls_patch};
use super::{Cell, Mesh};

/// Settings for [`HexMeshBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshOptions {
    /// Edge length of one voxel.
    pub voxel_size: f64,
    /// Flow axis, used to name the inlet and outlet patches.
    pub axis: FlowAxis,
    /// Keep only the largest 6-connected group of cells.
    pub connectivity_check: bool,
    /// Split boundary faces into positional patches.
    pub boundary_patches: bool,
}

impl MeshOptions {
    /// Options with connectivity filtering and patch classification enabled.
    #[must_use]
    pub fn new(voxel_size: f64, axis: FlowAxis) -> Self {
        Self {
            voxel_size,
            axis,
            connectivity_check: true,
            boundary_patches: true,
        }
    }

    #[must_use]
    pub fn with_connectivity_check(mut self, enabled: bool) -> Self {
        self.connectivity_check = enabled;
        self
    }

    #[must_use]
    pub fn with_boundary_patches(mut self, enabled: bool) -> Self {
        self.boundary_patches = enabled;
        self
    }
}

/// Converts the fluid voxels of a grid into an unstructured hexahedral mesh.
///
/// Every fluid voxel becomes one axis-aligned hexahedron of edge
/// `voxel_size`. Optional per-voxel velocity, pressure and region arrays use
/// grid indexing and are carried onto the cells.
#[derive(Debug)]
pub struct HexMeshBuilder<'a> {
    grid: &'a VoxelGrid,
    options: MeshOptions,
    velocity: Option<&'a [Vector3]>,
    pressure: Option<&'a [f64]>,
    regions: Option<&'a [RegionLabel]>,
}

impl<'a> HexMeshBuilder<'a> {
    #[must_use]
    pub fn new(grid: &'a VoxelGrid, options: MeshOptions) -> Self {
        Self {
            grid,
            options,
            velocity: None,
            pressure: None,
            regions: None,
        }
    }

    /// Attaches a per-voxel velocity field.
    #[must_use]
    pub fn with_velocity(mut self, velocity: &'a [Vector3]) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Attaches a per-voxel pressure field.
    #[must_use]
    pub fn with_pressure(mut self, pressure: &'a [f64]) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Attaches a per-voxel region array.
    #[must_use]
    pub fn with_regions(mut self, regions: &'a [RegionLabel]) -> Self {
        self.regions = Some(regions);
        self
    }

    /// Builds the mesh.
    ///
    /// A grid without fluid voxels yields an empty mesh.
    ///
    /// # Errors
    ///
    /// Returns `ConstructionError::InvalidParameter` for a non-positive voxel
    /// size, `ConstructionError::FieldLengthMismatch` when an attached field
    /// does not match the grid, and `TopologyError::FaceMultiplicity` if a
    /// face ends up shared by more than two cells.
    pub fn execute(&self) -> Result<Mesh> {
        let voxel_size = self.options.voxel_size;
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(ConstructionError::InvalidParameter(format!(
                "voxel size must be positive, got {voxel_size}"
            ))
            .into());
        }
        self.check_field_lengths()?;

        let mut cells = self.collect_cells();
        if self.options.connectivity_check {
            cells = retain_largest_component(cells);
        }
        if cells.is_empty() {
            tracing::warn!("no fluid cells, mesh is empty");
            return Ok(Mesh {
                voxel_size,
                ..Mesh::default()
            });
        }

        let (points, cell_vertices) = build_points(&cells, voxel_size);
        let face_set = generate_faces(&cell_vertices)?;

        let n_internal = face_set.internal.len();
        let classified = if self.options.boundary_patches {
            classify_boundary(face_set.boundary, &points, voxel_size, self.options.axis, n_internal)
        } else {
            single_walls_patch(face_set.boundary, n_internal)
        };

        let n_faces = n_internal + classified.faces.len();
        let mut faces = Vec::with_capacity(n_faces);
        let mut owner = Vec::with_capacity(n_faces);
        let mut neighbour = Vec::with_capacity(n_internal);
        for (face, o, n) in face_set.internal {
            faces.push(face);
            owner.push(o);
            neighbour.push(n);
        }
        for (face, o) in classified.faces {
            faces.push(face);
            owner.push(o);
        }

        tracing::info!(
            cells = cells.len(),
            points = points.len(),
            faces = faces.len(),
            internal = n_internal,
            patches = classified.patches.len(),
            "built hexahedral mesh"
        );

        Ok(Mesh {
            points,
            faces,
            owner,
            neighbour,
            n_internal_faces: n_internal,
            patches: classified.patches,
            cells,
            voxel_size,
        })
    }

    fn check_field_lengths(&self) -> Result<()> {
        let expected = self.grid.len();
        let lengths = [
            ("velocity", self.velocity.map(<[Vector3]>::len)),
            ("pressure", self.pressure.map(<[f64]>::len)),
            ("region", self.regions.map(<[RegionLabel]>::len)),
        ];
        for (field, actual) in lengths {
            if let Some(actual) = actual {
                if actual != expected {
                    return Err(ConstructionError::FieldLengthMismatch {
                        field,
                        expected,
                        actual,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Creates one cell per fluid voxel, iterating `z`, then `y`, then `x`.
    fn collect_cells(&self) -> Vec<Cell> {
        let [nx, ny, nz] = self.grid.dims();
        let states = self.grid.states();
        let mut cells = Vec::with_capacity(self.grid.fluid_count());
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let idx = x + nx * (y + ny * z);
                    if !states[idx].is_fluid() {
                        continue;
                    }
                    cells.push(Cell {
                        coord: [x, y, z],
                        velocity: self.velocity.map(|v| v[idx]),
                        pressure: self.pressure.map(|p| p[idx]),
                        region: self.regions.map_or(RegionLabel::Fibrous, |r| r[idx]),
                    });
                }
            }
        }
        cells
    }
}

/// Deduplicates cell corners on the integer voxel lattice.
///
/// Returns points ordered by `(z, y, x)` and the eight point indices of every
/// cell, in local slot order.
#[allow(clippy::cast_precision_loss)]
fn build_points(cells: &[Cell], voxel_size: f64) -> (Vec<Point3>, Vec<[usize; 8]>) {
    let corner = |coord: [usize; 3], slot: usize| {
        let [x, y, z] = coord;
        (z + (slot >> 2), y + ((slot >> 1) & 1), x + (slot & 1))
    };

    let mut lattice: BTreeMap<(usize, usize, usize), usize> = BTreeMap::new();
    for cell in cells {
        for slot in 0..8 {
            lattice.insert(corner(cell.coord, slot), 0);
        }
    }

    let mut points = Vec::with_capacity(lattice.len());
    for (i, (&(z, y, x), index)) in lattice.iter_mut().enumerate() {
        *index = i;
        points.push(Point3::new(
            x as f64 * voxel_size,
            y as f64 * voxel_size,
            z as f64 * voxel_size,
        ));
    }

    let cell_vertices = cells
        .iter()
        .map(|cell| {
            let mut v = [0; 8];
            for (slot, vertex) in v.iter_mut().enumerate() {
                *vertex = lattice[&corner(cell.coord, slot)];
            }
            v
        })
        .collect();

    (points, cell_vertices)
}
