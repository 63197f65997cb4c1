use crate::dtype::DType;
use crate::value::Element;

/// Anything an expression node can read from: a shape, an element type and
/// indexed access.
///
/// `at` receives an operand-local index whose length equals the operand
/// rank. Callers guarantee the index is in bounds; implementations do not
/// report errors from `at`.
pub trait Operand {
    /// Element type produced by [`Operand::at`].
    type Elem: Copy;

    /// Size of each dimension.
    fn shape(&self) -> &[usize];

    /// Element type as seen by dtype promotion.
    fn dtype(&self) -> DType;

    /// Read the element at `index`.
    fn at(&self, index: &[usize]) -> Self::Elem;

    /// Number of dimensions.
    #[inline]
    fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    #[inline]
    fn numel(&self) -> usize {
        self.shape().iter().product()
    }
}

impl<O: Operand + ?Sized> Operand for &O {
    type Elem = O::Elem;

    #[inline]
    fn shape(&self) -> &[usize] {
        (**self).shape()
    }

    #[inline]
    fn dtype(&self) -> DType {
        (**self).dtype()
    }

    #[inline]
    fn at(&self, index: &[usize]) -> O::Elem {
        (**self).at(index)
    }
}

/// A rank-0 operand: every index reads the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scalar<T>(pub T);

impl<T: Element> Operand for Scalar<T> {
    type Elem = T;

    #[inline]
    fn shape(&self) -> &[usize] {
        &[]
    }

    #[inline]
    fn dtype(&self) -> DType {
        T::DTYPE
    }

    #[inline]
    fn at(&self, _index: &[usize]) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_operand() {
        let s = Scalar(42i32);
        assert_eq!(s.rank(), 0);
        assert_eq!(s.numel(), 1);
        assert_eq!(s.dtype(), DType::Int32);
        assert_eq!(s.at(&[]), 42);
    }

    #[test]
    fn test_operand_by_reference() {
        let s = Scalar(1.5f64);
        let r = &s;
        assert_eq!(r.dtype(), DType::Float64);
        assert_eq!(Operand::at(&r, &[]), 1.5);
    }
}
