//! Block-structured dense matrices.
//!
//! Rows and columns are split into named segments (species amounts,
//! multipliers, temperature, ...). Assembly code addresses blocks by name
//! instead of computing offsets, and absent segments simply yield `None`.

use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, DVector};
use std::ops::Range;

/// Ordered named segments of a vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout<K> {
    blocks: Vec<(K, Range<usize>)>,
    len: usize,
}

impl<K: Copy + Eq> BlockLayout<K> {
    /// Lay out segments in order; zero-sized segments are dropped.
    pub fn new(sizes: &[(K, usize)]) -> Self {
        let mut blocks = Vec::with_capacity(sizes.len());
        let mut start = 0;
        for &(key, size) in sizes {
            if size > 0 {
                blocks.push((key, start..start + size));
                start += size;
            }
        }
        Self { blocks, len: start }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self, key: K) -> Option<Range<usize>> {
        self.blocks
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, r)| r.clone())
    }

    pub fn contains(&self, key: K) -> bool {
        self.range(key).is_some()
    }

    /// Index of a single-entry segment.
    pub fn scalar(&self, key: K) -> Option<usize> {
        self.range(key).filter(|r| r.len() == 1).map(|r| r.start)
    }

    /// Copy of `v` restricted to segment `key`.
    pub fn segment(&self, v: &DVector<f64>, key: K) -> Option<DVector<f64>> {
        self.range(key).map(|r| v.rows(r.start, r.len()).into_owned())
    }
}

/// Dense matrix addressed by named row and column blocks.
#[derive(Debug, Clone)]
pub struct BlockMatrix<R, C> {
    rows: BlockLayout<R>,
    cols: BlockLayout<C>,
    matrix: DMatrix<f64>,
}

impl<R: Copy + Eq, C: Copy + Eq> BlockMatrix<R, C> {
    pub fn zeros(rows: BlockLayout<R>, cols: BlockLayout<C>) -> Self {
        let matrix = DMatrix::zeros(rows.len(), cols.len());
        Self { rows, cols, matrix }
    }

    /// Wrap a dense matrix; `None` if its shape does not match the layouts.
    pub fn from_dense(rows: BlockLayout<R>, cols: BlockLayout<C>, matrix: DMatrix<f64>) -> Option<Self> {
        (matrix.shape() == (rows.len(), cols.len())).then_some(Self { rows, cols, matrix })
    }

    pub fn rows(&self) -> &BlockLayout<R> {
        &self.rows
    }

    pub fn cols(&self) -> &BlockLayout<C> {
        &self.cols
    }

    pub fn block(&self, row: R, col: C) -> Option<DMatrixView<'_, f64>> {
        let (r, c) = (self.rows.range(row)?, self.cols.range(col)?);
        Some(self.matrix.view((r.start, c.start), (r.len(), c.len())))
    }

    pub fn block_mut(&mut self, row: R, col: C) -> Option<DMatrixViewMut<'_, f64>> {
        let (r, c) = (self.rows.range(row)?, self.cols.range(col)?);
        Some(self.matrix.view_mut((r.start, c.start), (r.len(), c.len())))
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.matrix
    }
}

impl<K: Copy + Eq> BlockMatrix<K, K> {
    /// Retire unknown `offset` of block `key`: zero its row and column, unit diagonal.
    pub fn freeze(&mut self, key: K, offset: usize) {
        if let Some(r) = self.rows.range(key) {
            let i = r.start + offset;
            if i < r.end {
                self.matrix.row_mut(i).fill(0.0);
                self.matrix.column_mut(i).fill(0.0);
                self.matrix[(i, i)] = 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Part {
        A,
        B,
        C,
    }

    #[test]
    fn layout_offsets_and_empty_blocks() {
        let layout = BlockLayout::new(&[(Part::A, 3), (Part::B, 0), (Part::C, 1)]);
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.range(Part::A), Some(0..3));
        assert!(!layout.contains(Part::B));
        assert_eq!(layout.scalar(Part::C), Some(3));
        assert_eq!(layout.scalar(Part::A), None);

        let v = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(layout.segment(&v, Part::C).unwrap()[0], 4.0);
    }

    #[test]
    fn blocks_write_through_to_dense_matrix() {
        let layout = BlockLayout::new(&[(Part::A, 2), (Part::C, 1)]);
        let mut m = BlockMatrix::zeros(layout.clone(), layout);
        m.block_mut(Part::A, Part::C).unwrap().fill(5.0);
        m.block_mut(Part::C, Part::A).unwrap()[(0, 1)] = 7.0;
        assert!(m.block_mut(Part::B, Part::A).is_none());

        let dense = m.matrix();
        assert_eq!(dense[(0, 2)], 5.0);
        assert_eq!(dense[(1, 2)], 5.0);
        assert_eq!(dense[(2, 1)], 7.0);
        assert_eq!(m.block(Part::A, Part::C).unwrap().shape(), (2, 1));

        let rows = BlockLayout::new(&[(Part::A, 2)]);
        let cols = BlockLayout::new(&[(Part::B, 1)]);
        assert!(BlockMatrix::from_dense(rows.clone(), cols.clone(), DMatrix::zeros(3, 1)).is_none());
        assert!(BlockMatrix::from_dense(rows, cols, DMatrix::zeros(2, 1)).is_some());
    }

    #[test]
    fn freeze_isolates_one_unknown() {
        let layout = BlockLayout::new(&[(Part::A, 2), (Part::C, 1)]);
        let mut m = BlockMatrix::zeros(layout.clone(), layout);
        m.block_mut(Part::A, Part::A).unwrap().fill(2.0);
        m.block_mut(Part::A, Part::C).unwrap().fill(3.0);
        m.freeze(Part::A, 1);

        let dense = m.into_matrix();
        assert_eq!(dense[(1, 1)], 1.0);
        assert_eq!(dense[(1, 0)], 0.0);
        assert_eq!(dense[(0, 1)], 0.0);
        assert_eq!(dense[(1, 2)], 0.0);
        assert_eq!(dense[(0, 0)], 2.0);
        assert_eq!(dense[(0, 2)], 3.0);
    }
}
