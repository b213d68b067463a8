use std::collections::HashSet;

use crate::error::{Result, TopologyError};

use super::Mesh;

fn violated(message: String) -> crate::error::FiberMeshError {
    TopologyError::InvariantViolated(message).into()
}

impl Mesh {
    /// Verifies the structural invariants of the owner/neighbour layout.
    ///
    /// Checks array lengths, index ranges, the internal face ordering, that
    /// patches tile the boundary faces, that no face is duplicated and that
    /// every cell is bounded by six faces.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::InvariantViolated` describing the first
    /// violation found.
    pub fn check(&self) -> Result<()> {
        let n_cells = self.n_cells();
        let n_points = self.points.len();
        let n_faces = self.faces.len();

        if self.owner.len() != n_faces {
            return Err(violated(format!(
                "{} owners for {n_faces} faces",
                self.owner.len()
            )));
        }
        if self.neighbour.len() != self.n_internal_faces || self.n_internal_faces > n_faces {
            return Err(violated(format!(
                "{} neighbours for {} internal faces",
                self.neighbour.len(),
                self.n_internal_faces
            )));
        }

        let mut seen = HashSet::with_capacity(n_faces);
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(&v) = face.iter().find(|&&v| v >= n_points) {
                return Err(violated(format!("face {i} references point {v}")));
            }
            let mut key = *face;
            key.sort_unstable();
            if !seen.insert(key) {
                return Err(violated(format!("face {i} is duplicated")));
            }
        }

        if let Some((i, &o)) = self.owner.iter().enumerate().find(|&(_, &o)| o >= n_cells) {
            return Err(violated(format!("face {i} has owner {o} out of range")));
        }
        for (i, (&o, &n)) in self.owner.iter().zip(&self.neighbour).enumerate() {
            if n >= n_cells || o >= n {
                return Err(violated(format!(
                    "internal face {i} has owner {o} and neighbour {n}"
                )));
            }
        }
        let pairs: Vec<(usize, usize)> = self
            .owner
            .iter()
            .copied()
            .zip(self.neighbour.iter().copied())
            .collect();
        if let Some(i) = pairs.windows(2).position(|w| w[0] >= w[1]) {
            return Err(violated(format!("internal faces {i} and {} out of order", i + 1)));
        }

        let mut next = self.n_internal_faces;
        for patch in &self.patches {
            if patch.start != next {
                return Err(violated(format!(
                    "patch {} starts at {} instead of {next}",
                    patch.name(),
                    patch.start
                )));
            }
            next += patch.count;
        }
        if next != n_faces {
            return Err(violated(format!(
                "patches cover {} of {} boundary faces",
                next - self.n_internal_faces,
                n_faces - self.n_internal_faces
            )));
        }

        let mut per_cell = vec![0usize; n_cells];
        for &o in &self.owner {
            per_cell[o] += 1;
        }
        for &n in &self.neighbour {
            per_cell[n] += 1;
        }
        if let Some((cell, &count)) = per_cell.iter().enumerate().find(|&(_, &c)| c != 6) {
            return Err(violated(format!("cell {cell} has {count} faces")));
        }

        Ok(())
    }
}
