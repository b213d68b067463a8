mod builder;
mod check;
pub mod connectivity;
mod faces;
mod patches;

pub use builder::{HexMeshBuilder, MeshOptions};
pub use faces::HEX_FACES;

use std::fmt;

use crate::geometry::RegionLabel;
use crate::math::{Aabb, Point3, Vector3};

/// A quadrilateral face as four indices into [`Mesh::points`].
pub type Face = [usize; 4];

/// One hexahedral mesh cell, created from a fluid voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Voxel coordinate `[x, y, z]` the cell was created from.
    pub coord: [usize; 3],
    /// Velocity carried over from a source field, if one was supplied.
    pub velocity: Option<Vector3>,
    /// Pressure carried over from a source field, if one was supplied.
    pub pressure: Option<f64>,
    /// Region of the origin voxel; fibrous when no region array was supplied.
    pub region: RegionLabel,
}

/// Role of a boundary patch.
///
/// The two positional patches on the flow axis are replaced by
/// [`PatchRole::Inlet`] (low end) and [`PatchRole::Outlet`] (high end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchRole {
    Inlet,
    Outlet,
    LeftX,
    RightX,
    FrontY,
    BackY,
    BottomZ,
    TopZ,
    /// Catch-all for boundary faces on no bounding-box side (fiber surfaces).
    Walls,
}

impl PatchRole {
    /// Patch name as written to mesh files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Inlet => "inlet",
            Self::Outlet => "outlet",
            Self::LeftX => "left_x",
            Self::RightX => "right_x",
            Self::FrontY => "front_y",
            Self::BackY => "back_y",
            Self::BottomZ => "bottom_z",
            Self::TopZ => "top_z",
            Self::Walls => "walls",
        }
    }
}

impl fmt::Display for PatchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A contiguous range of boundary faces sharing one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryPatch {
    pub role: PatchRole,
    /// Index of the first face of the patch in [`Mesh::faces`].
    pub start: usize,
    /// Number of faces in the patch.
    pub count: usize,
}

impl BoundaryPatch {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.role.name()
    }

    /// Face index range covered by the patch.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }
}

/// Unstructured hexahedral mesh in owner/neighbour form.
///
/// Faces are ordered with all internal faces first, sorted by
/// `(owner, neighbour)`, followed by the boundary faces grouped per patch.
/// `neighbour` has one entry per internal face.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Unique vertices ordered by `(z, y, x)`.
    pub points: Vec<Point3>,
    pub faces: Vec<Face>,
    pub owner: Vec<usize>,
    pub neighbour: Vec<usize>,
    pub n_internal_faces: usize,
    /// Patch table in face order.
    pub patches: Vec<BoundaryPatch>,
    /// Cell index to cell data.
    pub cells: Vec<Cell>,
    /// Edge length of every cell.
    pub voxel_size: f64,
}

impl Mesh {
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    #[must_use]
    pub fn n_boundary_faces(&self) -> usize {
        self.faces.len() - self.n_internal_faces
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Looks up a patch by name.
    #[must_use]
    pub fn patch(&self, name: &str) -> Option<&BoundaryPatch> {
        self.patches.iter().find(|p| p.name() == name)
    }

    /// Looks up a patch by role.
    #[must_use]
    pub fn patch_by_role(&self, role: PatchRole) -> Option<&BoundaryPatch> {
        self.patches.iter().find(|p| p.role == role)
    }

    /// Center of every cell, indexed like [`Mesh::cells`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_centers(&self) -> Vec<Point3> {
        let vs = self.voxel_size;
        self.cells
            .iter()
            .map(|c| {
                Point3::new(
                    c.coord[0] as f64 * vs + vs / 2.0,
                    c.coord[1] as f64 * vs + vs / 2.0,
                    c.coord[2] as f64 * vs + vs / 2.0,
                )
            })
            .collect()
    }

    /// Total fluid volume of the mesh.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fluid_volume(&self) -> f64 {
        self.cells.len() as f64 * self.voxel_size.powi(3)
    }

    /// Bounding box of all points, or `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.points)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::{FlowAxis, VoxelGrid, VoxelState};
    use approx::assert_relative_eq;

    fn cube_mesh(n: usize, voxel_size: f64) -> Mesh {
        let grid = VoxelGrid::filled([n, n, n], VoxelState::Fluid);
        HexMeshBuilder::new(&grid, MeshOptions::new(voxel_size, FlowAxis::X))
            .execute()
            .unwrap()
    }

    #[test]
    fn cell_centers_are_voxel_midpoints() {
        let mesh = cube_mesh(2, 0.5);
        let centers = mesh.cell_centers();
        assert_eq!(centers.len(), 8);
        assert_relative_eq!(centers[0], Point3::new(0.25, 0.25, 0.25));
        assert_relative_eq!(centers[7], Point3::new(0.75, 0.75, 0.75));
    }

    #[test]
    fn fluid_volume_and_bounds() {
        let mesh = cube_mesh(3, 2.0);
        assert_relative_eq!(mesh.fluid_volume(), 27.0 * 8.0);
        let bb = mesh.bounds().unwrap();
        assert_relative_eq!(bb.min, Point3::origin());
        assert_relative_eq!(bb.max, Point3::new(6.0, 6.0, 6.0));
    }

    #[test]
    fn patch_lookup() {
        let mesh = cube_mesh(2, 1.0);
        let inlet = mesh.patch("inlet").unwrap();
        assert_eq!(inlet.role, PatchRole::Inlet);
        assert_eq!(inlet.count, 4);
        assert_eq!(inlet.range().len(), 4);
        assert!(mesh.patch("left_x").is_none());
        assert!(mesh.patch_by_role(PatchRole::TopZ).is_some());
    }

    #[test]
    fn empty_mesh_queries() {
        let mesh = Mesh::default();
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_none());
        assert_eq!(mesh.n_boundary_faces(), 0);
        assert!(mesh.cell_centers().is_empty());
    }
}
