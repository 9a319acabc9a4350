//! Transient voting grid shared by the line and circle transforms.
//!
//! Each detector invocation allocates its own [`Accumulator`], votes into it,
//! extracts peaks and drops it. Cells are stored row-major, which also defines
//! the scan order used for every deterministic tie-break.

/// Largest grid a detector will allocate, in cells (256 MiB of votes).
///
/// Configurations whose grid would exceed it are rejected with
/// [`HoughError::InvalidParameter`](crate::HoughError::InvalidParameter)
/// before any voting.
pub const MAX_CELLS: usize = 1 << 26;

/// Row-major `u32` vote grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulator {
    rows: usize,
    cols: usize,
    cells: Vec<u32>,
}

/// A cell selected during peak extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    /// Row-major cell index.
    pub index: usize,
    pub votes: u32,
}

impl Accumulator {
    /// Zero-initialized grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// `(row, col)` of a row-major index.
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[self.index(row, col)]
    }

    #[inline]
    pub fn vote(&mut self, row: usize, col: usize) {
        let i = self.index(row, col);
        self.cells[i] += 1;
    }

    #[inline]
    pub fn vote_index(&mut self, index: usize) {
        self.cells[index] += 1;
    }

    pub fn max_votes(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Add `other` cell-wise. Shapes must match.
    ///
    /// Addition is associative, so partial grids can be merged in any order.
    pub fn merge(&mut self, other: &Accumulator) {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        for (a, &b) in self.cells.iter_mut().zip(other.cells.iter()) {
            *a += b;
        }
    }

    /// Cells with `votes >= threshold`, in row-major order.
    pub fn cells_at_least(&self, threshold: u32) -> impl Iterator<Item = Peak> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, &v)| v >= threshold)
            .map(|(index, &votes)| Peak { index, votes })
    }

    /// 4-neighbour local maxima with `votes > threshold`, in row-major order.
    ///
    /// A cell must be strictly greater than its left and upper neighbours and
    /// at least equal to its right and lower ones; neighbours outside the grid
    /// count as zero. On a plateau only the cell with the lowest row-major
    /// index survives.
    pub fn local_maxima(&self, threshold: u32) -> Vec<Peak> {
        let mut peaks = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let v = self.get(row, col);
                if v <= threshold {
                    continue;
                }
                let left = if col > 0 { self.get(row, col - 1) } else { 0 };
                let up = if row > 0 { self.get(row - 1, col) } else { 0 };
                let right = if col + 1 < self.cols {
                    self.get(row, col + 1)
                } else {
                    0
                };
                let down = if row + 1 < self.rows {
                    self.get(row + 1, col)
                } else {
                    0
                };
                if v > left && v > up && v >= right && v >= down {
                    peaks.push(Peak {
                        index: self.index(row, col),
                        votes: v,
                    });
                }
            }
        }
        peaks
    }
}

/// Sort peaks strongest first; equal votes keep the lower row-major index first.
pub fn sort_strongest_first(peaks: &mut [Peak]) {
    peaks.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.index.cmp(&b.index)));
}
