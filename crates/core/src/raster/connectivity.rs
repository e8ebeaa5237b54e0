//! Neighbor sets for grid propagation

use serde::{Deserialize, Serialize};

/// Which cells count as neighbors when connectivity is propagated across a grid.
///
/// The choice changes results: with `Eight`, water may pass between two
/// diagonally touching cells even when both shared orthogonal neighbors are high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// N, S, E, W
    #[default]
    Four,
    /// N, S, E, W and the four diagonals
    Eight,
}

const ROOK: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

const QUEEN: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// Neighbors already visited by a top-left to bottom-right raster scan
const ROOK_PRECEDING: [(isize, isize); 2] = [(-1, 0), (0, -1)];
const QUEEN_PRECEDING: [(isize, isize); 4] = [(-1, -1), (-1, 0), (-1, 1), (0, -1)];

/// Neighbors already visited by a bottom-right to top-left raster scan
const ROOK_FOLLOWING: [(isize, isize); 2] = [(1, 0), (0, 1)];
const QUEEN_FOLLOWING: [(isize, isize); 4] = [(1, 1), (1, 0), (1, -1), (0, 1)];

impl Connectivity {
    /// All neighbor offsets as (row_offset, col_offset), center excluded
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &ROOK,
            Connectivity::Eight => &QUEEN,
        }
    }

    /// Offsets of neighbors that precede a cell in row-major order
    pub fn preceding(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &ROOK_PRECEDING,
            Connectivity::Eight => &QUEEN_PRECEDING,
        }
    }

    /// Offsets of neighbors that follow a cell in row-major order
    pub fn following(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &ROOK_FOLLOWING,
            Connectivity::Eight => &QUEEN_FOLLOWING,
        }
    }

    /// In-bounds neighbors of (row, col) in a grid of `rows` x `cols`
    pub fn neighbors(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> impl Iterator<Item = (usize, usize)> {
        offset_cells(self.offsets(), row, col, rows, cols)
    }

    /// In-bounds neighbors of (row, col) that precede it in row-major order
    pub fn preceding_neighbors(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> impl Iterator<Item = (usize, usize)> {
        offset_cells(self.preceding(), row, col, rows, cols)
    }

    /// In-bounds neighbors of (row, col) that follow it in row-major order
    pub fn following_neighbors(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> impl Iterator<Item = (usize, usize)> {
        offset_cells(self.following(), row, col, rows, cols)
    }
}

/// Apply a set of offsets to (row, col), dropping cells outside the grid
fn offset_cells(
    offsets: &'static [(isize, isize)],
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
) -> impl Iterator<Item = (usize, usize)> {
    offsets.iter().filter_map(move |&(dr, dc)| {
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
            None
        } else {
            Some((nr as usize, nc as usize))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_counts() {
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
        assert_eq!(Connectivity::Four.preceding().len(), 2);
        assert_eq!(Connectivity::Eight.following().len(), 4);
    }

    #[test]
    fn test_scan_halves_partition_neighbors() {
        for conn in [Connectivity::Four, Connectivity::Eight] {
            let mut halves: Vec<_> = conn
                .preceding()
                .iter()
                .chain(conn.following())
                .copied()
                .collect();
            let mut all = conn.offsets().to_vec();
            halves.sort();
            all.sort();
            assert_eq!(halves, all, "{:?}", conn);
        }
    }

    #[test]
    fn test_corner_neighbors_clipped() {
        let n: Vec<_> = Connectivity::Four.neighbors(0, 0, 3, 3).collect();
        assert_eq!(n, vec![(0, 1), (1, 0)]);

        let n: Vec<_> = Connectivity::Eight.neighbors(2, 2, 3, 3).collect();
        assert_eq!(n.len(), 3);
    }

    #[test]
    fn test_default_is_four() {
        assert_eq!(Connectivity::default(), Connectivity::Four);
    }
}
