use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Dense, row-major 2-D array.
///
/// Used for image intensities (`Grid<f64>`) and image masks (`Grid<bool>`).
/// The invariant `rows * cols == values.len()` is enforced by every
/// constructor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid from row-major values.
    pub fn new(rows: usize, cols: usize, values: Vec<T>) -> TypeResult<Self> {
        if rows * cols != values.len() {
            return Err(TypeError::LengthMismatch {
                field: "grid values",
                expected: rows * cols,
                actual: values.len(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// Build a grid from a list of rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> TypeResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(TypeError::LengthMismatch {
                    field: "grid row",
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col)
    }
}

impl<T: Clone> Grid<T> {
    /// A grid of the given shape with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            values: vec![value; rows * cols],
        }
    }
}
