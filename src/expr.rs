//! Lazy n-ary broadcast expressions.
//!
//! [`NaryExpr`] stores a function and a tuple of 2 to 4 operands. Building
//! it resolves the broadcast shape, the promoted dtype and one
//! [`BroadcastPlan`] per operand; after that the node is immutable and
//! [`Operand::at`] is a pure read. Array operands are borrowed or held by
//! value, never copied, and no output storage exists until the caller
//! materializes.
//!
//! # Example
//!
//! ```rust
//! use strided_nary::{nary2, nary3, ArrayView, Operand, Scalar};
//!
//! let x = vec![1i32, 2, 3];
//! let y = vec![10i32, 20];
//! let a = ArrayView::contiguous(&x, &[3, 1]).unwrap();
//! let b = ArrayView::contiguous(&y, &[2]).unwrap();
//!
//! // (a + b) * 2, nested without any intermediate buffer
//! let sum = nary2(|p: i32, q: i32| p + q, &a, &b).unwrap();
//! let scaled = nary3(|s: i32, k: i32, o: i32| s * k + o, sum, Scalar(2), Scalar(0)).unwrap();
//! assert_eq!(scaled.shape(), &[3, 2]);
//! assert_eq!(scaled.at(&[2, 1]), (3 + 20) * 2);
//! ```

use std::fmt;

use tracing::trace;

use crate::dtype::{promote_types, DType};
use crate::index_map::BroadcastPlan;
use crate::operand::Operand;
use crate::shape::{broadcast_shapes, IndexVec, Shape};
use crate::value::IntoValue;
use crate::Result;

/// Shape, dtype and per-operand plans shared by every expression node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ExprLayout {
    pub(crate) shape: Shape,
    pub(crate) dtype: DType,
    pub(crate) plans: Vec<BroadcastPlan>,
}

impl ExprLayout {
    /// Broadcast `shapes`, promote `dtypes` and plan every operand.
    pub(crate) fn build(shapes: &[&[usize]], dtypes: &[DType]) -> Result<Self> {
        let shape = broadcast_shapes(shapes)?;
        let dtype = promote_types(dtypes);
        let plans: Vec<BroadcastPlan> = shapes
            .iter()
            .map(|s| BroadcastPlan::new(s, shape.rank()))
            .collect();
        trace!(
            operands = shapes.len(),
            shape = %shape,
            dtype = %dtype,
            "planned broadcast expression"
        );
        Ok(Self {
            shape,
            dtype,
            plans,
        })
    }
}

/// A lazy elementwise expression over a tuple of operands.
///
/// `A` is `(A0, A1)`, `(A0, A1, A2)` or `(A0, A1, A2, A3)`, each an
/// [`Operand`]; `F` is a function taking one element of each operand in
/// order. The node is itself an [`Operand`], so expressions nest.
///
/// [`Operand::dtype`] reports the dtype of the function's result when it is
/// an [`crate::Element`] type, and the operands' promoted dtype otherwise.
#[derive(Clone)]
pub struct NaryExpr<F, A> {
    f: F,
    args: A,
    layout: ExprLayout,
}

impl<F, A: fmt::Debug> fmt::Debug for NaryExpr<F, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NaryExpr")
            .field("args", &self.args)
            .field("shape", &self.layout.shape)
            .field("dtype", &self.layout.dtype)
            .finish()
    }
}

impl<F, A> NaryExpr<F, A> {
    /// Broadcast output shape.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.layout.shape
    }

    /// Promoted element type of the operands, whatever `F` returns.
    #[inline]
    pub fn promoted_dtype(&self) -> DType {
        self.layout.dtype
    }

    /// The captured operands.
    #[inline]
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Broadcast plan of operand `i`.
    #[inline]
    pub fn plan(&self, i: usize) -> &BroadcastPlan {
        &self.layout.plans[i]
    }

    /// Release the function and operands.
    pub fn into_parts(self) -> (F, A) {
        (self.f, self.args)
    }
}

macro_rules! impl_nary_expr {
    ($ctor:ident; $($A:ident $a:ident $idx:tt),+) => {
        impl<F, R, $($A),+> NaryExpr<F, ($($A,)+)>
        where
            $($A: Operand,)+
            F: Fn($($A::Elem),+) -> R,
            R: IntoValue,
        {
            /// Build the expression, resolving shape and dtype.
            ///
            /// # Errors
            /// Returns [`crate::BroadcastError::IncompatibleShape`] if the
            /// operand shapes cannot be broadcast together.
            pub fn new(f: F, args: ($($A,)+)) -> Result<Self> {
                let layout = ExprLayout::build(
                    &[$(args.$idx.shape()),+],
                    &[$(args.$idx.dtype()),+],
                )?;
                Ok(Self { f, args, layout })
            }
        }

        impl<F, R, $($A),+> Operand for NaryExpr<F, ($($A,)+)>
        where
            $($A: Operand,)+
            F: Fn($($A::Elem),+) -> R,
            R: IntoValue,
        {
            type Elem = R;

            #[inline]
            fn shape(&self) -> &[usize] {
                &self.layout.shape
            }

            #[inline]
            fn dtype(&self) -> DType {
                R::FIXED_DTYPE.unwrap_or(self.layout.dtype)
            }

            #[inline]
            fn at(&self, index: &[usize]) -> R {
                let mut local = IndexVec::new();
                (self.f)($({
                    self.layout.plans[$idx].map_into(index, &mut local);
                    self.args.$idx.at(&local)
                }),+)
            }
        }

        /// Build a lazy expression applying `f` elementwise over the
        /// broadcast operands.
        pub fn $ctor<F, R, $($A),+>(f: F, $($a: $A),+) -> Result<NaryExpr<F, ($($A,)+)>>
        where
            $($A: Operand,)+
            F: Fn($($A::Elem),+) -> R,
            R: IntoValue,
        {
            NaryExpr::<F, ($($A,)+)>::new(f, ($($a,)+))
        }
    };
}

impl_nary_expr!(nary2; A0 a0 0, A1 a1 1);
impl_nary_expr!(nary3; A0 a0 0, A1 a1 1, A2 a2 2);
impl_nary_expr!(nary4; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3);
