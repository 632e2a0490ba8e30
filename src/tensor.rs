use std::fmt;

use crate::error::{Error, Result};

/// Dimensions of a matrix. Batched data stores one sample per column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> usize {
        self.rows * self.cols
    }
}

/// Column-major host matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DenseMatrix {
    shape: Shape,
    vals: Vec<f32>,
}

impl DenseMatrix {
    pub fn zeroed(shape: Shape) -> Self {
        Self { shape, vals: vec![0.0; shape.size()] }
    }

    pub fn from_vec(shape: Shape, vals: Vec<f32>) -> Result<Self> {
        if vals.len() != shape.size() {
            return Err(Error::InvalidBufferLength { shape, len: vals.len() });
        }

        Ok(Self { shape, vals })
    }

    /// Builds a matrix whose `i`th column is `columns[i]`.
    pub fn from_columns(rows: usize, columns: &[&[f32]]) -> Result<Self> {
        let shape = Shape::new(rows, columns.len());
        let mut vals = Vec::with_capacity(shape.size());

        for col in columns {
            if col.len() != rows {
                return Err(Error::ShapeMismatch { expected: Shape::new(rows, 1), found: Shape::new(col.len(), 1) });
            }

            vals.extend_from_slice(col);
        }

        Ok(Self { shape, vals })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.vals
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.vals
    }

    pub fn column(&self, col: usize) -> &[f32] {
        let rows = self.shape.rows;
        &self.vals[col * rows..(col + 1) * rows]
    }

    pub fn column_mut(&mut self, col: usize) -> &mut [f32] {
        let rows = self.shape.rows;
        &mut self.vals[col * rows..(col + 1) * rows]
    }

    pub fn columns(&self) -> impl Iterator<Item = &[f32]> {
        // `chunks` panics on a zero chunk size
        self.vals.chunks(self.shape.rows.max(1)).take(self.shape.cols)
    }

    /// Gathers columns so that column `i` of the result is column `index[i]` of `self`.
    pub fn select_columns(&self, index: &[usize]) -> Result<Self> {
        let rows = self.shape.rows;
        let mut vals = Vec::with_capacity(rows * index.len());

        for &col in index {
            if col >= self.shape.cols {
                return Err(Error::InvalidPermutation { expected: self.shape.cols, found: index.len() });
            }

            vals.extend_from_slice(self.column(col));
        }

        Ok(Self { shape: Shape::new(rows, index.len()), vals })
    }

    /// `alpha * a + beta * b`, elementwise.
    pub fn linear_comb(alpha: f32, input_a: &Self, beta: f32, input_b: &Self) -> Result<Self> {
        if input_a.shape != input_b.shape {
            return Err(Error::ShapeMismatch { expected: input_a.shape, found: input_b.shape });
        }

        let vals = input_a.vals.iter().zip(&input_b.vals).map(|(a, b)| alpha * a + beta * b).collect();

        Ok(Self { shape: input_a.shape, vals })
    }

    /// Index of the largest entry in each column. Ties resolve to the lowest index.
    pub fn argmax_columns(&self) -> Vec<usize> {
        self.columns()
            .map(|col| {
                let mut best = 0;
                for (i, &x) in col.iter().enumerate() {
                    if x > col[best] {
                        best = i;
                    }
                }
                best
            })
            .collect()
    }
}
