//! Lazy n-ary elementwise expressions over strided arrays with NumPy-style
//! broadcasting.
//!
//! An expression node combines 2 to 4 operands of possibly different shapes
//! with an elementwise function. Construction resolves the broadcast output
//! shape and the promoted element type once; element access maps each output
//! index back into every operand and applies the function. Nothing is
//! allocated or copied until the caller materializes the expression.
//!
//! # Core Types
//!
//! - [`Operand`]: anything with a shape, an element type and indexed access
//!   ([`Scalar`], [`ArrayView`], [`Array`], [`RepeatView`], [`NaryExpr`])
//! - [`NaryExpr`]: statically typed lazy expression (see [`nary2`], [`nary3`], [`nary4`])
//! - [`OpRegistry`] / [`DynExpr`]: named operations with runtime [`Value`] dispatch
//!
//! # Broadcasting
//!
//! - [`broadcast_shapes`]: combine shapes, or report the conflicting dimension
//! - [`BroadcastPlan`] / [`map_index`]: output index to operand index mapping
//! - [`promote`] / [`promote_types`]: element type promotion lattice
//!
//! # Evaluation
//!
//! - [`materialize`], [`materialize_with`], [`evaluate_into`]: fill owned storage
//! - [`for_each_index`]: row-major index iteration
//!
//! # Example
//!
//! ```rust
//! use strided_nary::{nary2, materialize, ArrayView, Operand};
//!
//! let col = vec![1u8, 2, 4];
//! let row = vec![0u8, 1, 3, 7];
//! let a = ArrayView::contiguous(&col, &[3, 1]).unwrap();
//! let b = ArrayView::contiguous(&row, &[1, 4]).unwrap();
//!
//! let xor = nary2(|x: u8, y: u8| x ^ y, a, b).unwrap();
//! assert_eq!(xor.shape(), &[3, 4]);
//! assert_eq!(xor.at(&[2, 3]), 4 ^ 7);
//!
//! let out = materialize(&xor);
//! assert_eq!(out.data()[..4], [1u8, 0, 2, 6]);
//! ```

mod array;
pub mod dtype;
mod eval;
pub mod expr;
pub mod index_map;
pub mod line_source;
mod operand;
pub mod registry;
mod repeat;
pub mod shape;
mod value;

// ============================================================================
// Shapes, types and index mapping
// ============================================================================
pub use dtype::{promote, promote_types, DType};
pub use index_map::{map_index, BroadcastPlan};
pub use shape::{broadcast_shapes, IndexVec, Shape};

// ============================================================================
// Operands and expressions
// ============================================================================
pub use array::{row_major_strides, Array, ArrayView};
pub use expr::{nary2, nary3, nary4, NaryExpr};
pub use operand::{Operand, Scalar};
pub use repeat::{repeat, RepeatView};

// ============================================================================
// Runtime dispatch
// ============================================================================
pub use registry::{BoxedOperand, DynExpr, NaryKernel, OpRegistry, ValueOperand};
pub use value::{Element, IntoValue, Value};

// ============================================================================
// Evaluation
// ============================================================================
pub use eval::{evaluate_into, for_each_index, materialize, materialize_with, EvalOptions};

pub use line_source::{lines, LineSource, ReaderLines, StrLines};

// ============================================================================
// Constants
// ============================================================================

/// Smallest operand count accepted by an expression node.
pub const MIN_ARITY: usize = 2;

/// Largest operand count accepted by an expression node. Wider expressions
/// are built by nesting.
pub const MAX_ARITY: usize = 4;

/// Element count from which [`materialize_with`] splits work across threads
/// (when the `parallel` feature is enabled).
pub const MIN_PARALLEL_LEN: usize = 1 << 15;

// ============================================================================
// Error types
// ============================================================================

/// Errors raised while building or evaluating broadcast expressions.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// Two operands disagree on a non-1 size in the same aligned dimension.
    #[error("incompatible shapes at dimension {dim}: sizes {sizes:?} cannot be broadcast together")]
    IncompatibleShape { dim: usize, sizes: Vec<usize> },

    /// A buffer does not have the shape the operation requires.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// A view would reach outside its backing slice.
    #[error("offset overflow while computing view bounds")]
    OffsetOverflow,

    /// No operation is registered under this name.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Operand count does not match the operation's arity.
    #[error("operation '{op}' expects {expected} operands, found {found}")]
    ArityMismatch {
        op: String,
        expected: usize,
        found: usize,
    },

    /// The promoted element type is outside the operation's domain.
    #[error("operation '{op}' is not supported for element type {dtype}")]
    UnsupportedDType { op: String, dtype: DType },

    /// Reading from a line source failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for broadcast operations.
pub type Result<T> = std::result::Result<T, BroadcastError>;
