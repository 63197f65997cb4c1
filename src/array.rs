//! Strided array views and owned row-major arrays.
//!
//! [`ArrayView`] is a zero-copy, dynamic-rank view over a borrowed slice with
//! arbitrary (possibly negative) strides. [`Array`] owns row-major storage
//! and is what the materializer produces.

use crate::dtype::DType;
use crate::operand::Operand;
use crate::shape::{IndexVec, Shape};
use crate::value::Element;
use crate::{BroadcastError, Result};

use num_traits::Zero;
use smallvec::SmallVec;

type StrideVec = SmallVec<[isize; 4]>;

/// Row-major (C-order) strides for `dims`, in elements.
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let mut strides = vec![0isize; dims.len()];
    let mut acc = 1isize;
    for d in (0..dims.len()).rev() {
        strides[d] = acc;
        acc *= dims[d].max(1) as isize;
    }
    strides
}

/// An immutable strided view over borrowed data.
///
/// # Example
/// ```rust
/// use strided_nary::{ArrayView, Operand};
///
/// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
/// let view = ArrayView::new(&data, &[2, 3], &[3, 1], 0).unwrap();
/// assert_eq!(view.at(&[1, 2]), 6.0);
///
/// let t = view.permute(&[1, 0]);
/// assert_eq!(t.shape(), &[3, 2]);
/// assert_eq!(t.at(&[2, 1]), 6.0);
/// ```
#[derive(Debug, Clone)]
pub struct ArrayView<'a, T> {
    data: &'a [T],
    dims: Shape,
    strides: StrideVec,
    offset: usize,
}

impl<'a, T> ArrayView<'a, T> {
    /// Create a new strided view.
    ///
    /// # Errors
    /// Returns an error if `strides` and `dims` differ in length or the view
    /// would reach outside `data`.
    pub fn new(data: &'a [T], dims: &[usize], strides: &[isize], offset: usize) -> Result<Self> {
        if strides.len() != dims.len() {
            return Err(BroadcastError::StrideLengthMismatch);
        }
        validate_bounds(data.len(), dims, strides, offset)?;
        Ok(Self {
            data,
            dims: Shape::new(dims),
            strides: StrideVec::from_slice(strides),
            offset,
        })
    }

    /// Row-major view over the whole of `data`.
    ///
    /// # Errors
    /// Returns [`BroadcastError::ShapeMismatch`] if `data.len()` is not the
    /// element count of `dims`.
    pub fn contiguous(data: &'a [T], dims: &[usize]) -> Result<Self> {
        let numel: usize = dims.iter().product();
        if numel != data.len() {
            return Err(BroadcastError::ShapeMismatch(
                dims.to_vec(),
                vec![data.len()],
            ));
        }
        Self::new(data, dims, &row_major_strides(dims), 0)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Returns true if the view has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }

    /// Check if the view is contiguous in memory (row-major order).
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 1isize;
        for i in (0..self.dims.len()).rev() {
            if self.dims[i] <= 1 {
                continue;
            }
            if self.strides[i] != expected {
                return false;
            }
            expected *= self.dims[i] as isize;
        }
        true
    }

    /// Permute dimensions (zero-copy).
    ///
    /// # Panics
    /// Panics if `perm` is not a permutation of `0..rank`.
    pub fn permute(&self, perm: &[usize]) -> Self {
        assert!(
            is_permutation(perm, self.dims.len()),
            "invalid permutation"
        );
        let dims: IndexVec = perm.iter().map(|&p| self.dims[p]).collect();
        Self {
            data: self.data,
            dims: Shape::new(&dims),
            strides: perm.iter().map(|&p| self.strides[p]).collect(),
            offset: self.offset,
        }
    }

    #[inline]
    fn linear_index(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.dims.len(), "index rank mismatch");
        let mut idx = self.offset as isize;
        for (i, &s) in index.iter().zip(self.strides.iter()) {
            idx += *i as isize * s;
        }
        idx as usize
    }
}

impl<T: Element> Operand for ArrayView<'_, T> {
    type Elem = T;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    #[inline]
    fn at(&self, index: &[usize]) -> T {
        debug_assert!(
            index.iter().zip(self.dims.iter()).all(|(i, n)| i < n),
            "index out of bounds"
        );
        self.data[self.linear_index(index)]
    }
}

/// Owned row-major array.
#[derive(Debug, Clone, PartialEq)]
pub struct Array<T> {
    data: Vec<T>,
    dims: Shape,
}

impl<T> Array<T> {
    /// Wrap row-major `data` with shape `dims`.
    ///
    /// # Errors
    /// Returns [`BroadcastError::ShapeMismatch`] if the lengths disagree.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        let numel: usize = dims.iter().product();
        if numel != data.len() {
            return Err(BroadcastError::ShapeMismatch(
                dims.to_vec(),
                vec![data.len()],
            ));
        }
        Ok(Self {
            data,
            dims: Shape::new(dims),
        })
    }

    /// Wrap storage whose length is already known to match `dims`.
    pub(crate) fn from_row_major(data: Vec<T>, dims: &[usize]) -> Self {
        let dims = Shape::new(dims);
        debug_assert_eq!(data.len(), dims.numel());
        Self { data, dims }
    }

    /// Zero-filled array of shape `dims`.
    pub fn zeros(dims: &[usize]) -> Self
    where
        T: Zero + Clone,
    {
        let shape = Shape::new(dims);
        Self {
            data: vec![T::zero(); shape.numel()],
            dims: shape,
        }
    }

    /// Build an array by evaluating `f` at every row-major index.
    pub fn from_fn(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let shape = Shape::new(dims);
        let mut data = Vec::with_capacity(shape.numel());
        crate::eval::for_each_index(&shape, |idx| data.push(f(idx)));
        Self { data, dims: shape }
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Row-major storage, writable. Pair with [`crate::evaluate_into`].
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow as a row-major strided view.
    pub fn view(&self) -> ArrayView<'_, T> {
        ArrayView {
            data: &self.data,
            dims: self.dims.clone(),
            strides: StrideVec::from_vec(row_major_strides(&self.dims)),
            offset: 0,
        }
    }

    #[inline]
    fn linear_index(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.dims.len(), "index rank mismatch");
        index
            .iter()
            .zip(self.dims.iter())
            .fold(0usize, |acc, (&i, &n)| acc * n + i)
    }
}

impl<T: Element> Operand for Array<T> {
    type Elem = T;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    #[inline]
    fn at(&self, index: &[usize]) -> T {
        self.data[self.linear_index(index)]
    }
}

fn validate_bounds(
    data_len: usize,
    dims: &[usize],
    strides: &[isize],
    offset: usize,
) -> Result<()> {
    if dims.contains(&0) {
        // Empty array, no bounds to check
        return Ok(());
    }

    let mut min_offset = offset as isize;
    let mut max_offset = offset as isize;

    for (&n, &stride) in dims.iter().zip(strides.iter()) {
        let last_idx = (n - 1) as isize;
        if stride >= 0 {
            max_offset += stride * last_idx;
        } else {
            min_offset += stride * last_idx;
        }
    }

    if min_offset < 0 || max_offset as usize >= data_len {
        return Err(BroadcastError::OffsetOverflow);
    }

    Ok(())
}

fn is_permutation(perm: &[usize], rank: usize) -> bool {
    if perm.len() != rank {
        return false;
    }
    let mut seen = vec![false; rank];
    for &p in perm {
        if p >= rank || seen[p] {
            return false;
        }
        seen[p] = true;
    }
    true
}
