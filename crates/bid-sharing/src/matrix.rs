//! Square matrices the assignment solver works on.
//!
//! A [`ValueMatrix`] records, for every (placement, bid) pair, whether the
//! pair is eligible and what it is worth. Rows are placements and columns are
//! bids; whichever side is shorter is padded with [`Cell::Ineligible`] so the
//! matrix is always square. Before solving, a value matrix is turned into a
//! plain cost matrix where ineligible cells cost more than any combination of
//! eligible ones.

use {
    crate::{
        domain::{Bid, Placement},
        strategy::Eligibility,
    },
    std::fmt,
};

/// A cell of a value matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Eligible(i64),
    /// The pair may not be used, or one side of it is padding.
    Ineligible,
}

impl Cell {
    pub fn value(self) -> Option<i64> {
        match self {
            Cell::Eligible(value) => Some(value),
            Cell::Ineligible => None,
        }
    }
}

/// Dense square matrix stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix<T> {
    dim: usize,
    cells: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    pub fn filled(dim: usize, value: T) -> Self {
        Self {
            dim,
            cells: vec![value; dim * dim],
        }
    }

    /// Builds a matrix from its rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows don't form a square.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let dim = rows.len();
        assert!(
            rows.iter().all(|row| row.len() == dim),
            "matrix must be square"
        );
        Self {
            dim,
            cells: rows.into_iter().flatten().collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, row: usize, column: usize) -> T {
        self.cells[row * self.dim + column]
    }

    pub fn set(&mut self, row: usize, column: usize, value: T) {
        self.cells[row * self.dim + column] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.cells[row * self.dim..(row + 1) * self.dim]
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            dim: self.dim,
            cells: self.cells.iter().copied().map(f).collect(),
        }
    }
}

impl<T: fmt::Debug + Copy> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..self.dim).map(|row| self.row(row)))
            .finish()
    }
}

/// Eligibility and worth of every (placement, bid) pair, together with the
/// placement behind each row and the bid behind each column.
#[derive(Debug, Clone)]
pub struct ValueMatrix<'a> {
    pub cells: Matrix<Cell>,
    /// Placements by row. Rows past the end are padding.
    pub rows: Vec<&'a Placement>,
    /// Bids by column. Columns past the end are padding.
    pub columns: Vec<&'a Bid>,
}

impl<'a> ValueMatrix<'a> {
    /// Builds the value matrix used to maximize the total bid value: an
    /// eligible cell holds the bid's scaled value.
    pub fn for_value(
        placements: impl IntoIterator<Item = &'a Placement>,
        bids: impl IntoIterator<Item = &'a Bid>,
        eligibility: &dyn Eligibility,
    ) -> Self {
        Self::build(placements, bids, |_, placement, _, bid| {
            eligibility
                .is_eligible(placement, bid)
                .then(|| bid.scaled_value())
        })
    }

    /// Builds the value matrix used to push strong bids towards high priority
    /// placements. `placements` must be ordered by priority (highest first)
    /// and `bids` by ascending value; an eligible cell holds
    /// `(priority rank + 1) * (bid strength rank + 1)`.
    pub fn for_priority(
        placements: impl IntoIterator<Item = &'a Placement>,
        bids: impl IntoIterator<Item = &'a Bid>,
        eligibility: &dyn Eligibility,
    ) -> Self {
        Self::build(placements, bids, |row, placement, column, bid| {
            eligibility
                .is_eligible(placement, bid)
                .then(|| to_i64(row + 1).saturating_mul(to_i64(column + 1)))
        })
    }

    fn build(
        placements: impl IntoIterator<Item = &'a Placement>,
        bids: impl IntoIterator<Item = &'a Bid>,
        value: impl Fn(usize, &Placement, usize, &Bid) -> Option<i64>,
    ) -> Self {
        let rows: Vec<_> = placements.into_iter().collect();
        let columns: Vec<_> = bids.into_iter().collect();
        let mut cells = Matrix::filled(rows.len().max(columns.len()), Cell::Ineligible);
        for (row, placement) in rows.iter().enumerate() {
            for (column, bid) in columns.iter().enumerate() {
                if let Some(value) = value(row, placement, column, bid) {
                    cells.set(row, column, Cell::Eligible(value));
                }
            }
        }
        Self {
            cells,
            rows,
            columns,
        }
    }

    pub fn dim(&self) -> usize {
        self.cells.dim()
    }

    /// Largest eligible value, zero if there is none.
    fn max_value(&self) -> i64 {
        self.cells
            .cells
            .iter()
            .filter_map(|cell| cell.value())
            .max()
            .unwrap_or_default()
    }

    /// Cost every ineligible cell gets. Picking one more ineligible cell is
    /// always worse than any combination of eligible cells, so the solver
    /// only uses them for rows without any eligible option left.
    fn sentinel_cost(&self) -> i64 {
        self.max_value()
            .saturating_mul(to_i64(self.dim().max(10)))
            .saturating_add(1)
    }

    /// Cost matrix whose minimum-cost matching is the maximum-value matching
    /// of this matrix: `max - value` for eligible cells.
    pub fn maximizing_costs(&self) -> Matrix<i64> {
        let max = self.max_value();
        let sentinel = self.sentinel_cost();
        self.cells.map(|cell| match cell {
            Cell::Eligible(value) => max - value,
            Cell::Ineligible => sentinel,
        })
    }

    /// Cost matrix whose minimum-cost matching is the minimum-value matching
    /// of this matrix.
    pub fn minimizing_costs(&self) -> Matrix<i64> {
        let sentinel = self.sentinel_cost();
        self.cells.map(|cell| match cell {
            Cell::Eligible(value) => value,
            Cell::Ineligible => sentinel,
        })
    }

    /// The placement and bid behind a cell, if the cell is a real eligible
    /// pair.
    pub fn pair(&self, row: usize, column: usize) -> Option<(&'a Placement, &'a Bid)> {
        let placement = self.rows.get(row)?;
        let bid = self.columns.get(column)?;
        self.cells
            .get(row, column)
            .value()
            .map(|_| (*placement, *bid))
    }
}

pub(crate) fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
