//! Flattening repeat: every element of the source, in row-major order,
//! repeated `repeats` times consecutively.
//!
//! ```text
//! source [[1, 2], [3, 4]], repeats 2  →  [1, 1, 2, 2, 3, 3, 4, 4]
//! ```

use tracing::debug;

use crate::array::Array;
use crate::dtype::DType;
use crate::eval::materialize;
use crate::operand::Operand;
use crate::shape::{IndexVec, Shape};

/// Lazy rank-1 operand repeating each source element.
#[derive(Debug, Clone)]
pub struct RepeatView<O> {
    source: O,
    repeats: usize,
    shape: Shape,
}

impl<O: Operand> RepeatView<O> {
    pub fn new(source: O, repeats: usize) -> Self {
        let shape = Shape::new(&[source.numel() * repeats]);
        Self {
            source,
            repeats,
            shape,
        }
    }

    #[inline]
    pub fn repeats(&self) -> usize {
        self.repeats
    }

    #[inline]
    pub fn source(&self) -> &O {
        &self.source
    }
}

impl<O: Operand> Operand for RepeatView<O> {
    type Elem = O::Elem;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    fn dtype(&self) -> DType {
        self.source.dtype()
    }

    #[inline]
    fn at(&self, index: &[usize]) -> O::Elem {
        let dims = self.source.shape();
        let mut flat = index[0] / self.repeats;
        let mut local = IndexVec::from_elem(0, dims.len());
        for d in (0..dims.len()).rev() {
            local[d] = flat % dims[d];
            flat /= dims[d];
        }
        self.source.at(&local)
    }
}

/// Materialize [`RepeatView`] over `source`.
pub fn repeat<O: Operand>(source: O, repeats: usize) -> Array<O::Elem> {
    debug!(shape = ?source.shape(), repeats, "repeat");
    materialize(&RepeatView::new(source, repeats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayView;
    use crate::expr::nary2;
    use crate::operand::Scalar;

    #[test]
    fn test_repeat_matrix() {
        let data = vec![1i32, 2, 3, 4];
        let view = ArrayView::contiguous(&data, &[2, 2]).unwrap();
        let out = repeat(&view, 2);
        assert_eq!(out.dims(), &[8]);
        assert_eq!(out.data(), &[1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_repeat_transposed_view() {
        let data = vec![1i32, 2, 3, 4];
        let view = ArrayView::contiguous(&data, &[2, 2]).unwrap().permute(&[1, 0]);
        let out = repeat(&view, 3);
        assert_eq!(out.data(), &[1, 1, 1, 3, 3, 3, 2, 2, 2, 4, 4, 4]);
    }

    #[test]
    fn test_repeat_zero() {
        let data = vec![5u8, 6];
        let view = ArrayView::contiguous(&data, &[2]).unwrap();
        let out = repeat(&view, 0);
        assert!(out.is_empty());
        assert_eq!(out.dims(), &[0]);
    }

    #[test]
    fn test_repeat_scalar() {
        let out = repeat(Scalar(7u64), 4);
        assert_eq!(out.data(), &[7, 7, 7, 7]);
    }

    #[test]
    fn test_repeat_view_is_an_operand() {
        let data = vec![1u8, 2, 4];
        let view = ArrayView::contiguous(&data, &[3]).unwrap();
        let rep = RepeatView::new(&view, 2);
        assert_eq!(rep.dtype(), DType::UInt8);
        let e = nary2(|a: u8, b: u8| a ^ b, &rep, Scalar(1u8)).unwrap();
        assert_eq!(materialize(&e).data(), &[0, 0, 3, 3, 5, 5]);
    }
}
