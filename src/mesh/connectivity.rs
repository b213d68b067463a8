//! 6-connected component analysis over mesh cells.
//!
//! Isolated fluid pockets cannot carry flow between inlet and outlet and leave
//! the solver with a disconnected linear system, so only the largest
//! face-connected component is kept.

use std::collections::{HashMap, VecDeque};

use super::Cell;

/// Coordinates of the up to six face neighbours of `coord`.
fn face_neighbours(coord: [usize; 3]) -> impl Iterator<Item = [usize; 3]> {
    (0..3).flat_map(move |axis| {
        let lower = coord[axis].checked_sub(1).map(|c| {
            let mut n = coord;
            n[axis] = c;
            n
        });
        let upper = coord[axis].checked_add(1).map(|c| {
            let mut n = coord;
            n[axis] = c;
            n
        });
        lower.into_iter().chain(upper)
    })
}

/// Groups cells into 6-connected components.
///
/// Components are listed in order of their lowest cell index; each holds
/// ascending cell indices.
#[must_use]
pub fn connected_components(cells: &[Cell]) -> Vec<Vec<usize>> {
    let index_of: HashMap<[usize; 3], usize> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| (cell.coord, i))
        .collect();

    let mut visited = vec![false; cells.len()];
    let mut components = Vec::new();

    for start in 0..cells.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);

        while let Some(curr) = queue.pop_front() {
            for coord in face_neighbours(cells[curr].coord) {
                if let Some(&neighbour) = index_of.get(&coord) {
                    if !visited[neighbour] {
                        visited[neighbour] = true;
                        component.push(neighbour);
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        component.sort_unstable();
        components.push(component);
    }

    components
}

/// Indices of the largest component; the earliest one wins ties.
#[must_use]
pub fn largest_component(cells: &[Cell]) -> Vec<usize> {
    let mut largest: Vec<usize> = Vec::new();
    for component in connected_components(cells) {
        if component.len() > largest.len() {
            largest = component;
        }
    }
    largest
}

/// Keeps only the cells of the largest component, re-indexed densely from zero
/// in their original order.
#[must_use]
pub fn retain_largest_component(cells: Vec<Cell>) -> Vec<Cell> {
    let total = cells.len();
    let keep = largest_component(&cells);
    let mut mask = vec![false; total];
    for &i in &keep {
        mask[i] = true;
    }
    let filtered: Vec<Cell> = cells
        .into_iter()
        .zip(mask)
        .filter_map(|(cell, kept)| kept.then_some(cell))
        .collect();

    tracing::debug!(
        kept = filtered.len(),
        discarded = total - filtered.len(),
        "filtered cells by connectivity"
    );
    filtered
}
