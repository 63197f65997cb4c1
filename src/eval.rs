//! Eager evaluation of lazy operands into row-major storage.
//!
//! Expressions never allocate on their own; these functions are the caller
//! side that walks every output index (last index fastest) and collects
//! `at(index)` results.

use tracing::debug;

use crate::array::Array;
use crate::operand::Operand;
use crate::shape::IndexVec;
use crate::{BroadcastError, Result, MIN_PARALLEL_LEN};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Options for [`materialize_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Use threads once the element count reaches this value.
    pub min_parallel_len: usize,
    /// Elements per parallel task. `0` picks a size from the thread count.
    pub chunk_len: usize,
    /// Set to `false` to force the serial path.
    pub parallel: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            min_parallel_len: MIN_PARALLEL_LEN,
            chunk_len: 0,
            parallel: true,
        }
    }
}

impl EvalOptions {
    /// Serial evaluation only.
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}

/// Call `f` with every multi-index of `shape`, row-major.
///
/// A scalar shape yields one call with `[]`; a shape with a 0 dimension
/// yields none.
pub fn for_each_index(shape: &[usize], mut f: impl FnMut(&[usize])) {
    let total: usize = shape.iter().product();
    if total == 0 {
        return;
    }
    let mut index = IndexVec::from_elem(0, shape.len());
    for _ in 0..total {
        f(&index);
        advance(&mut index, shape);
    }
}

/// Advance a row-major multi-index by one position (last index fastest).
#[inline]
fn advance(index: &mut [usize], shape: &[usize]) {
    for d in (0..shape.len()).rev() {
        index[d] += 1;
        if index[d] < shape[d] {
            return;
        }
        index[d] = 0;
    }
}

/// Row-major multi-index of flat position `flat`.
fn unravel(mut flat: usize, shape: &[usize]) -> IndexVec {
    let mut index = IndexVec::from_elem(0, shape.len());
    for d in (0..shape.len()).rev() {
        index[d] = flat % shape[d];
        flat /= shape[d];
    }
    index
}

fn fill_from<E: Operand>(expr: &E, start: usize, dest: &mut [E::Elem]) {
    if dest.is_empty() {
        return;
    }
    let shape = expr.shape();
    let mut index = unravel(start, shape);
    for slot in dest.iter_mut() {
        *slot = expr.at(&index);
        advance(&mut index, shape);
    }
}

/// Evaluate `expr` into `dest` in row-major order.
///
/// # Errors
/// Returns [`BroadcastError::ShapeMismatch`] if `dest.len()` differs from
/// the expression's element count.
pub fn evaluate_into<E: Operand>(expr: &E, dest: &mut [E::Elem]) -> Result<()> {
    let numel = expr.numel();
    if dest.len() != numel {
        return Err(BroadcastError::ShapeMismatch(
            expr.shape().to_vec(),
            vec![dest.len()],
        ));
    }
    fill_from(expr, 0, dest);
    Ok(())
}

/// Evaluate `expr` into a new row-major [`Array`].
pub fn materialize<E: Operand>(expr: &E) -> Array<E::Elem> {
    let shape = expr.shape();
    debug!(shape = ?shape, numel = expr.numel(), "materializing expression");
    let mut data = Vec::with_capacity(expr.numel());
    for_each_index(shape, |idx| data.push(expr.at(idx)));
    Array::from_row_major(data, shape)
}

/// Evaluate `expr` into a new [`Array`], splitting the work across rayon
/// threads when enabled and large enough. The result equals
/// [`materialize`]'s.
pub fn materialize_with<E>(expr: &E, options: &EvalOptions) -> Array<E::Elem>
where
    E: Operand + Sync,
    E::Elem: Send,
{
    let numel = expr.numel();
    let use_threads = cfg!(feature = "parallel")
        && options.parallel
        && numel > 0
        && numel >= options.min_parallel_len;
    if !use_threads {
        return materialize(expr);
    }
    materialize_parallel(expr, options)
}

#[cfg(feature = "parallel")]
fn materialize_parallel<E>(expr: &E, options: &EvalOptions) -> Array<E::Elem>
where
    E: Operand + Sync,
    E::Elem: Send,
{
    let numel = expr.numel();
    let chunk_len = if options.chunk_len > 0 {
        options.chunk_len
    } else {
        numel.div_ceil(rayon::current_num_threads() * 4).max(1)
    };
    debug!(
        shape = ?expr.shape(),
        numel,
        chunk_len,
        "materializing expression in parallel"
    );

    // Seed every slot with the first element so no uninitialized memory is
    // exposed; each chunk overwrites its range.
    let first = expr.at(&unravel(0, expr.shape()));
    let mut data = vec![first; numel];
    data.par_chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(i, chunk)| fill_from(expr, i * chunk_len, chunk));

    Array::from_row_major(data, expr.shape())
}

#[cfg(not(feature = "parallel"))]
fn materialize_parallel<E>(expr: &E, _options: &EvalOptions) -> Array<E::Elem>
where
    E: Operand + Sync,
    E::Elem: Send,
{
    materialize(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayView;

    #[test]
    fn test_for_each_index_order() {
        let mut seen = Vec::new();
        for_each_index(&[2, 3], |idx| seen.push((idx[0], idx[1])));
        assert_eq!(
            seen,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn test_for_each_index_scalar_and_empty() {
        let mut calls = 0;
        for_each_index(&[], |idx| {
            assert!(idx.is_empty());
            calls += 1;
        });
        assert_eq!(calls, 1);

        for_each_index(&[3, 0, 2], |_| panic!("no indices expected"));
    }

    #[test]
    fn test_unravel() {
        assert_eq!(unravel(0, &[2, 3]).as_slice(), &[0, 0]);
        assert_eq!(unravel(4, &[2, 3]).as_slice(), &[1, 1]);
        assert_eq!(unravel(23, &[2, 3, 4]).as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_evaluate_into_transposed_view() {
        let data: Vec<i32> = (0..6).collect();
        let view = ArrayView::contiguous(&data, &[2, 3]).unwrap().permute(&[1, 0]);
        let mut out = vec![0; 6];
        evaluate_into(&view, &mut out).unwrap();
        assert_eq!(out, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_evaluate_into_length_mismatch() {
        let data = vec![1.0f64; 4];
        let view = ArrayView::contiguous(&data, &[2, 2]).unwrap();
        let mut out = vec![0.0; 3];
        let err = evaluate_into(&view, &mut out).unwrap_err();
        assert!(matches!(err, BroadcastError::ShapeMismatch(_, _)));
    }

    #[test]
    fn test_materialize_with_small_chunks() {
        let data: Vec<u32> = (0..97).collect();
        let view = ArrayView::contiguous(&data, &[97]).unwrap();
        let options = EvalOptions {
            min_parallel_len: 1,
            chunk_len: 10,
            parallel: true,
        };
        let out = materialize_with(&view, &options);
        assert_eq!(out.data(), data.as_slice());
    }

    #[test]
    fn test_materialize_with_empty() {
        let data: Vec<f32> = vec![];
        let view = ArrayView::contiguous(&data, &[0, 4]).unwrap();
        let out = materialize_with(&view, &EvalOptions::default());
        assert!(out.is_empty());
        assert_eq!(out.dims(), &[0, 4]);
    }
}
