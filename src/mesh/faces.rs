use std::collections::HashMap;

use crate::error::TopologyError;

use super::Face;

/// Local corner slots of the six hexahedron faces.
///
/// Corners are ordered by `(z, y, x)`, so slot `l` sits at offset
/// `(l & 1, (l >> 1) & 1, l >> 2)` from the cell origin. Each face lists its
/// slots counter-clockwise when seen from outside the cell.
pub const HEX_FACES: [[usize; 4]; 6] = [
    [1, 3, 7, 5], // +x
    [2, 6, 7, 3], // +y
    [4, 5, 7, 6], // +z
    [0, 4, 6, 2], // -x
    [0, 1, 5, 4], // -y
    [0, 2, 3, 1], // -z
];

/// Faces split into the internal prefix and the boundary suffix.
#[derive(Debug, Default)]
pub(super) struct FaceSet {
    pub internal: Vec<(Face, usize, usize)>,
    /// Boundary faces with their owner, in discovery order.
    pub boundary: Vec<(Face, usize)>,
}

struct FaceRecord {
    vertices: Face,
    first: usize,
    second: Option<usize>,
    count: usize,
}

/// Derives the faces of every cell and classifies them by how many cells share them.
///
/// Shared faces are detected through their sorted vertex tuple. The vertex
/// order of the first occurrence is kept, which orients internal faces away
/// from their owner.
///
/// # Errors
///
/// Returns `TopologyError::FaceMultiplicity` when a face is referenced by
/// a number of cells other than one or two.
pub(super) fn generate_faces(cell_vertices: &[[usize; 8]]) -> Result<FaceSet, TopologyError> {
    let mut slot_of: HashMap<Face, usize> = HashMap::with_capacity(cell_vertices.len() * 4);
    let mut records: Vec<FaceRecord> = Vec::with_capacity(cell_vertices.len() * 4);

    for (cell, vertices) in cell_vertices.iter().enumerate() {
        for def in &HEX_FACES {
            let face = def.map(|slot| vertices[slot]);
            let mut key = face;
            key.sort_unstable();

            if let Some(&slot) = slot_of.get(&key) {
                let record = &mut records[slot];
                if record.second.is_none() {
                    record.second = Some(cell);
                }
                record.count += 1;
            } else {
                slot_of.insert(key, records.len());
                records.push(FaceRecord {
                    vertices: face,
                    first: cell,
                    second: None,
                    count: 1,
                });
            }
        }
    }

    let mut set = FaceSet::default();
    for record in records {
        match (record.count, record.second) {
            (1, _) => set.boundary.push((record.vertices, record.first)),
            (2, Some(second)) => {
                let owner = record.first.min(second);
                let neighbour = record.first.max(second);
                set.internal.push((record.vertices, owner, neighbour));
            }
            (count, _) => {
                return Err(TopologyError::FaceMultiplicity {
                    vertices: record.vertices,
                    cells: count,
                });
            }
        }
    }

    set.internal.sort_by_key(|&(_, owner, neighbour)| (owner, neighbour));
    Ok(set)
}
