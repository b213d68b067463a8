use crate::geometry::FlowAxis;
use crate::math::{Aabb, Point3};

use super::{BoundaryPatch, Face, PatchRole};

/// Positional patches in declaration order, with their axis and side.
const POSITIONAL: [(PatchRole, usize, Side); 6] = [
    (PatchRole::LeftX, 0, Side::Low),
    (PatchRole::RightX, 0, Side::High),
    (PatchRole::FrontY, 1, Side::Low),
    (PatchRole::BackY, 1, Side::High),
    (PatchRole::BottomZ, 2, Side::Low),
    (PatchRole::TopZ, 2, Side::High),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Low,
    High,
}

/// Boundary faces reordered per patch, plus the patch table.
pub(super) struct ClassifiedBoundary {
    pub faces: Vec<(Face, usize)>,
    pub patches: Vec<BoundaryPatch>,
}

/// Slab of half-voxel thickness around one side of the point bounding box.
fn side_slab(bounds: &Aabb, axis: usize, side: Side, half: f64) -> Aabb {
    let mut slab = bounds.inflated(half);
    let plane = match side {
        Side::Low => bounds.min[axis],
        Side::High => bounds.max[axis],
    };
    slab.min[axis] = plane - half;
    slab.max[axis] = plane + half;
    slab
}

fn face_in(slab: &Aabb, face: &Face, points: &[Point3]) -> bool {
    face.iter().all(|&v| slab.contains(&points[v]))
}

/// Renames the flow-axis pair of positional patches to inlet and outlet.
fn role_for(role: PatchRole, axis: usize, side: Side, flow: FlowAxis) -> PatchRole {
    if axis != flow.index() {
        return role;
    }
    match side {
        Side::Low => PatchRole::Inlet,
        Side::High => PatchRole::Outlet,
    }
}

/// Assigns boundary faces to positional patches by bounding-box side.
///
/// Each side claims the not-yet-claimed faces whose four vertices lie inside
/// its slab; leftovers become [`PatchRole::Walls`]. Faces are grouped per patch
/// in declaration order and sorted by owner inside a patch. Empty patches are
/// omitted. `first_face` is the index of the first boundary face in the final
/// face list.
pub(super) fn classify_boundary(
    boundary: Vec<(Face, usize)>,
    points: &[Point3],
    voxel_size: f64,
    flow: FlowAxis,
    first_face: usize,
) -> ClassifiedBoundary {
    let Some(bounds) = Aabb::from_points(points) else {
        return ClassifiedBoundary {
            faces: Vec::new(),
            patches: Vec::new(),
        };
    };
    tracing::debug!(min = ?bounds.min, max = ?bounds.max, "mesh bounds");

    let half = voxel_size / 2.0;
    let mut remaining = boundary;
    let mut groups: Vec<(PatchRole, Vec<(Face, usize)>)> = Vec::with_capacity(POSITIONAL.len() + 1);

    for (role, axis, side) in POSITIONAL {
        let slab = side_slab(&bounds, axis, side, half);
        let (claimed, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(face, _)| face_in(&slab, face, points));
        remaining = rest;
        groups.push((role_for(role, axis, side, flow), claimed));
    }
    groups.push((PatchRole::Walls, remaining));

    assemble(groups, first_face)
}

/// Keeps every boundary face in discovery order under a single walls patch.
pub(super) fn single_walls_patch(boundary: Vec<(Face, usize)>, first_face: usize) -> ClassifiedBoundary {
    let count = boundary.len();
    let patches = if count == 0 {
        Vec::new()
    } else {
        vec![BoundaryPatch {
            role: PatchRole::Walls,
            start: first_face,
            count,
        }]
    };
    ClassifiedBoundary {
        faces: boundary,
        patches,
    }
}

fn assemble(groups: Vec<(PatchRole, Vec<(Face, usize)>)>, first_face: usize) -> ClassifiedBoundary {
    let mut faces = Vec::new();
    let mut patches = Vec::new();
    for (role, mut group) in groups {
        if group.is_empty() {
            continue;
        }
        group.sort_by_key(|&(_, owner)| owner);
        let patch = BoundaryPatch {
            role,
            start: first_face + faces.len(),
            count: group.len(),
        };
        tracing::debug!(patch = %role, start = patch.start, faces = patch.count, "boundary patch");
        patches.push(patch);
        faces.extend(group);
    }
    ClassifiedBoundary { faces, patches }
}
