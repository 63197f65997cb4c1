//! Named operations bound to n-ary kernels, with runtime dtype dispatch.
//!
//! An [`OpRegistry`] is an explicit table from operation name to
//! [`NaryKernel`]. Building an operation checks arity, broadcasts the
//! operand shapes, promotes their dtypes and checks the kernel accepts the
//! promoted dtype; the result is a [`DynExpr`], which evaluates lazily
//! exactly like [`crate::NaryExpr`] but over [`Value`]s.
//!
//! ```rust
//! use strided_nary::{ArrayView, BoxedOperand, DType, OpRegistry, Operand, Scalar, Value};
//!
//! let registry = OpRegistry::with_defaults();
//! let data = vec![0b1100u8, 0b1010];
//! let a = ArrayView::contiguous(&data, &[2]).unwrap();
//!
//! let xor = registry
//!     .build("bitwise_xor", vec![Box::new(a) as BoxedOperand, Box::new(Scalar(0b0110i8))])
//!     .unwrap();
//! assert_eq!(xor.dtype(), DType::Int16);
//! assert_eq!(xor.at(&[1]), Value::I16(0b1100));
//! ```

use std::collections::HashMap;
use std::fmt;

use num_complex::Complex64;
use smallvec::SmallVec;
use tracing::debug;

use crate::dtype::DType;
use crate::expr::ExprLayout;
use crate::operand::Operand;
use crate::shape::IndexVec;
use crate::value::{IntoValue, Value};
use crate::{BroadcastError, Result, MAX_ARITY, MIN_ARITY};

// ============================================================================
// Type-erased operands
// ============================================================================

/// Object-safe view of an [`Operand`] whose elements convert to [`Value`].
///
/// Implemented for every such operand; used to hold heterogeneous operands
/// in a [`DynExpr`].
pub trait ValueOperand: Send + Sync {
    fn value_shape(&self) -> &[usize];
    fn value_dtype(&self) -> DType;
    fn value_at(&self, index: &[usize]) -> Value;
}

impl<O> ValueOperand for O
where
    O: Operand + Send + Sync,
    O::Elem: IntoValue,
{
    #[inline]
    fn value_shape(&self) -> &[usize] {
        self.shape()
    }

    #[inline]
    fn value_dtype(&self) -> DType {
        self.dtype()
    }

    #[inline]
    fn value_at(&self, index: &[usize]) -> Value {
        self.at(index).into_value()
    }
}

/// Boxed heterogeneous operand.
pub type BoxedOperand<'a> = Box<dyn ValueOperand + 'a>;

// ============================================================================
// Kernels
// ============================================================================

/// An elementwise kernel with a fixed arity.
///
/// `apply` receives the raw operand values in order plus the promoted result
/// dtype, and returns a value of that dtype. It is only called with dtypes
/// for which `supports` returned true.
///
/// Operands before `promote_from` are broadcast but left out of dtype
/// promotion (the condition of `where`).
#[derive(Clone, Copy)]
pub struct NaryKernel {
    pub name: &'static str,
    pub arity: usize,
    pub promote_from: usize,
    pub supports: fn(DType) -> bool,
    pub apply: fn(&[Value], DType) -> Value,
}

impl fmt::Debug for NaryKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NaryKernel")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

fn is_bitwise(dt: DType) -> bool {
    dt.is_bool() || dt.is_integer()
}

fn is_integer(dt: DType) -> bool {
    dt.is_integer()
}

fn is_arithmetic(dt: DType) -> bool {
    !dt.is_bool()
}

fn is_ordered(dt: DType) -> bool {
    !dt.is_complex()
}

fn any_dtype(_dt: DType) -> bool {
    true
}

/// Integer / float / complex dispatch for a binary kernel. Integers are
/// computed in `i128` and wrapped back to `dtype`.
#[inline]
fn binary_numeric(
    a: Value,
    b: Value,
    dtype: DType,
    int_op: fn(i128, i128) -> i128,
    float_op: fn(f64, f64) -> f64,
    complex_op: fn(Complex64, Complex64) -> Complex64,
) -> Value {
    if dtype.is_complex() {
        Value::from_c128(complex_op(a.to_c128(), b.to_c128()), dtype)
    } else if dtype.is_float() {
        Value::from_f64(float_op(a.to_f64(), b.to_f64()), dtype)
    } else {
        Value::from_i128(int_op(a.to_i128(), b.to_i128()), dtype)
    }
}

/// Bitwise kernels operate on the two's-complement bits of the promoted
/// integer type.
#[inline]
fn binary_bits(a: Value, b: Value, dtype: DType, op: fn(i128, i128) -> i128) -> Value {
    let a = a.cast(dtype).to_i128();
    let b = b.cast(dtype).to_i128();
    Value::from_i128(op(a, b), dtype)
}

/// Shift amount clamped to the bit width; larger shifts fill with the sign
/// (right) or zero (left).
#[inline]
fn shift_amount(v: Value, dtype: DType) -> u32 {
    let bits = (dtype.size_bytes() * 8) as i128;
    v.to_i128().clamp(0, bits) as u32
}

fn apply_bitwise_and(args: &[Value], dtype: DType) -> Value {
    binary_bits(args[0], args[1], dtype, |a, b| a & b)
}

fn apply_bitwise_or(args: &[Value], dtype: DType) -> Value {
    binary_bits(args[0], args[1], dtype, |a, b| a | b)
}

fn apply_bitwise_xor(args: &[Value], dtype: DType) -> Value {
    binary_bits(args[0], args[1], dtype, |a, b| a ^ b)
}

fn apply_left_shift(args: &[Value], dtype: DType) -> Value {
    let a = args[0].cast(dtype).to_i128();
    let s = shift_amount(args[1], dtype);
    Value::from_i128(a.checked_shl(s).unwrap_or(0), dtype)
}

fn apply_right_shift(args: &[Value], dtype: DType) -> Value {
    let a = args[0].cast(dtype).to_i128();
    let s = shift_amount(args[1], dtype);
    // i128 holds every supported integer exactly, so an arithmetic shift
    // matches the source type's semantics.
    Value::from_i128(a >> s.min(127), dtype)
}

fn apply_add(args: &[Value], dtype: DType) -> Value {
    binary_numeric(
        args[0],
        args[1],
        dtype,
        i128::wrapping_add,
        |a, b| a + b,
        |a, b| a + b,
    )
}

fn apply_subtract(args: &[Value], dtype: DType) -> Value {
    binary_numeric(
        args[0],
        args[1],
        dtype,
        i128::wrapping_sub,
        |a, b| a - b,
        |a, b| a - b,
    )
}

fn apply_multiply(args: &[Value], dtype: DType) -> Value {
    binary_numeric(
        args[0],
        args[1],
        dtype,
        i128::wrapping_mul,
        |a, b| a * b,
        |a, b| a * b,
    )
}

fn apply_maximum(args: &[Value], dtype: DType) -> Value {
    binary_numeric(
        args[0],
        args[1],
        dtype,
        std::cmp::max,
        |a, b| if a.is_nan() || a >= b { a } else { b },
        |a, _| a,
    )
}

fn apply_minimum(args: &[Value], dtype: DType) -> Value {
    binary_numeric(
        args[0],
        args[1],
        dtype,
        std::cmp::min,
        |a, b| if a.is_nan() || a <= b { a } else { b },
        |a, _| a,
    )
}

fn apply_where(args: &[Value], dtype: DType) -> Value {
    let picked = if args[0].is_truthy() { args[1] } else { args[2] };
    picked.cast(dtype)
}

fn apply_clip(args: &[Value], dtype: DType) -> Value {
    let lower = apply_maximum(&[args[0], args[1]], dtype);
    apply_minimum(&[lower, args[2]], dtype)
}

/// Kernels installed by [`OpRegistry::with_defaults`].
pub const DEFAULT_KERNELS: [NaryKernel; 12] = [
    NaryKernel {
        name: "bitwise_and",
        arity: 2,
        promote_from: 0,
        supports: is_bitwise,
        apply: apply_bitwise_and,
    },
    NaryKernel {
        name: "bitwise_or",
        arity: 2,
        promote_from: 0,
        supports: is_bitwise,
        apply: apply_bitwise_or,
    },
    NaryKernel {
        name: "bitwise_xor",
        arity: 2,
        promote_from: 0,
        supports: is_bitwise,
        apply: apply_bitwise_xor,
    },
    NaryKernel {
        name: "left_shift",
        arity: 2,
        promote_from: 0,
        supports: is_integer,
        apply: apply_left_shift,
    },
    NaryKernel {
        name: "right_shift",
        arity: 2,
        promote_from: 0,
        supports: is_integer,
        apply: apply_right_shift,
    },
    NaryKernel {
        name: "add",
        arity: 2,
        promote_from: 0,
        supports: is_arithmetic,
        apply: apply_add,
    },
    NaryKernel {
        name: "subtract",
        arity: 2,
        promote_from: 0,
        supports: is_arithmetic,
        apply: apply_subtract,
    },
    NaryKernel {
        name: "multiply",
        arity: 2,
        promote_from: 0,
        supports: is_arithmetic,
        apply: apply_multiply,
    },
    NaryKernel {
        name: "maximum",
        arity: 2,
        promote_from: 0,
        supports: is_ordered,
        apply: apply_maximum,
    },
    NaryKernel {
        name: "minimum",
        arity: 2,
        promote_from: 0,
        supports: is_ordered,
        apply: apply_minimum,
    },
    NaryKernel {
        name: "where",
        arity: 3,
        promote_from: 1,
        supports: any_dtype,
        apply: apply_where,
    },
    NaryKernel {
        name: "clip",
        arity: 3,
        promote_from: 0,
        supports: is_ordered,
        apply: apply_clip,
    },
];

// ============================================================================
// Registry
// ============================================================================

/// Table of named operations. Construct one explicitly and pass it to
/// whatever binds source-level calls to operations.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    ops: HashMap<&'static str, NaryKernel>,
}

impl OpRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding [`DEFAULT_KERNELS`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kernel in DEFAULT_KERNELS {
            registry.register(kernel);
        }
        registry
    }

    /// Add or replace a kernel, returning the one previously registered
    /// under the same name.
    ///
    /// # Panics
    /// Panics if the kernel arity is outside `MIN_ARITY..=MAX_ARITY`.
    pub fn register(&mut self, kernel: NaryKernel) -> Option<NaryKernel> {
        assert!(
            (MIN_ARITY..=MAX_ARITY).contains(&kernel.arity),
            "kernel '{}' has arity {}, expected {MIN_ARITY}..={MAX_ARITY}",
            kernel.name,
            kernel.arity
        );
        assert!(
            kernel.promote_from < kernel.arity,
            "kernel '{}' promotes from operand {} but takes {}",
            kernel.name,
            kernel.promote_from,
            kernel.arity
        );
        debug!(name = kernel.name, arity = kernel.arity, "registering kernel");
        self.ops.insert(kernel.name, kernel)
    }

    pub fn get(&self, name: &str) -> Option<&NaryKernel> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.ops.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Build a lazy expression for operation `name` over `operands`.
    ///
    /// # Errors
    /// - [`BroadcastError::UnknownOperation`] if `name` is not registered
    /// - [`BroadcastError::ArityMismatch`] if the operand count is wrong
    /// - [`BroadcastError::IncompatibleShape`] if shapes do not broadcast
    /// - [`BroadcastError::UnsupportedDType`] if the promoted dtype is
    ///   outside the kernel's domain
    pub fn build<'a>(&self, name: &str, operands: Vec<BoxedOperand<'a>>) -> Result<DynExpr<'a>> {
        let kernel = *self
            .get(name)
            .ok_or_else(|| BroadcastError::UnknownOperation(name.to_string()))?;
        DynExpr::new(kernel, operands)
    }
}

// ============================================================================
// Runtime-typed expression
// ============================================================================

/// Lazy expression over boxed operands, evaluated through a [`NaryKernel`].
///
/// Itself an [`Operand`] with `Elem = Value`, so it can be boxed again as
/// the operand of another `DynExpr`.
pub struct DynExpr<'a> {
    kernel: NaryKernel,
    operands: Vec<BoxedOperand<'a>>,
    layout: ExprLayout,
}

impl<'a> DynExpr<'a> {
    /// Build an expression applying `kernel` to `operands`.
    ///
    /// See [`OpRegistry::build`] for the error cases. A kernel whose arity is
    /// outside `MIN_ARITY..=MAX_ARITY` is rejected with
    /// [`BroadcastError::ArityMismatch`].
    pub fn new(kernel: NaryKernel, operands: Vec<BoxedOperand<'a>>) -> Result<Self> {
        if operands.len() != kernel.arity {
            return Err(BroadcastError::ArityMismatch {
                op: kernel.name.to_string(),
                expected: kernel.arity,
                found: operands.len(),
            });
        }
        if !(MIN_ARITY..=MAX_ARITY).contains(&operands.len()) {
            return Err(BroadcastError::ArityMismatch {
                op: kernel.name.to_string(),
                expected: operands.len().clamp(MIN_ARITY, MAX_ARITY),
                found: operands.len(),
            });
        }
        let layout = {
            let shapes: SmallVec<[&[usize]; 4]> =
                operands.iter().map(|o| o.value_shape()).collect();
            let dtypes: SmallVec<[DType; 4]> = operands
                .iter()
                .skip(kernel.promote_from)
                .map(|o| o.value_dtype())
                .collect();
            ExprLayout::build(&shapes, &dtypes)?
        };
        if !(kernel.supports)(layout.dtype) {
            return Err(BroadcastError::UnsupportedDType {
                op: kernel.name.to_string(),
                dtype: layout.dtype,
            });
        }
        debug!(
            op = kernel.name,
            shape = %layout.shape,
            dtype = %layout.dtype,
            "built expression"
        );
        Ok(Self {
            kernel,
            operands,
            layout,
        })
    }

    pub fn name(&self) -> &'static str {
        self.kernel.name
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.layout.shape
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.layout.dtype
    }
}

impl fmt::Debug for DynExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynExpr")
            .field("op", &self.kernel.name)
            .field("shape", &self.layout.shape)
            .field("dtype", &self.layout.dtype)
            .finish()
    }
}

impl Operand for DynExpr<'_> {
    type Elem = Value;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.layout.shape
    }

    #[inline]
    fn dtype(&self) -> DType {
        self.layout.dtype
    }

    fn at(&self, index: &[usize]) -> Value {
        let mut local = IndexVec::new();
        let values: SmallVec<[Value; 4]> = self
            .operands
            .iter()
            .zip(self.layout.plans.iter())
            .map(|(operand, plan)| {
                plan.map_into(index, &mut local);
                operand.value_at(&local)
            })
            .collect();
        (self.kernel.apply)(&values, self.layout.dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Array, ArrayView};
    use crate::eval::materialize;
    use crate::expr::nary2;
    use crate::operand::Scalar;

    fn boxed<'a, O>(o: O) -> BoxedOperand<'a>
    where
        O: ValueOperand + 'a,
    {
        Box::new(o)
    }

    #[test]
    fn test_defaults_registered() {
        let registry = OpRegistry::with_defaults();
        assert_eq!(registry.len(), DEFAULT_KERNELS.len());
        assert!(registry.contains("bitwise_xor"));
        assert_eq!(registry.get("where").unwrap().arity, 3);
        let names = registry.names();
        assert_eq!(names.first(), Some(&"add"));
    }

    #[test]
    fn test_bitwise_xor_broadcast() {
        let registry = OpRegistry::with_defaults();
        let col = vec![1i32, 2, 3];
        let row = vec![0i32, 1, 2, 3];
        let a = ArrayView::contiguous(&col, &[3, 1]).unwrap();
        let b = ArrayView::contiguous(&row, &[1, 4]).unwrap();
        let e = registry.build("bitwise_xor", vec![boxed(&a), boxed(&b)]).unwrap();
        assert_eq!(e.shape(), &[3, 4]);
        assert_eq!(e.dtype(), DType::Int32);
        for i in 0..3 {
            for j in 0..4 {
                assert_eq!(e.at(&[i, j]), Value::I32(col[i] ^ row[j]));
            }
        }
    }

    #[test]
    fn test_bitwise_on_bool() {
        let registry = OpRegistry::with_defaults();
        let e = registry
            .build("bitwise_and", vec![boxed(Scalar(true)), boxed(Scalar(false))])
            .unwrap();
        assert_eq!(e.dtype(), DType::Bool);
        assert_eq!(e.at(&[]), Value::Bool(false));
    }

    #[test]
    fn test_bitwise_mixed_sign() {
        let registry = OpRegistry::with_defaults();
        let e = registry
            .build("bitwise_or", vec![boxed(Scalar(-1i8)), boxed(Scalar(0x80u8))])
            .unwrap();
        assert_eq!(e.dtype(), DType::Int16);
        assert_eq!(e.at(&[]), Value::I16(-1));
    }

    #[test]
    fn test_unknown_operation() {
        let registry = OpRegistry::with_defaults();
        let err = registry
            .build("frobnicate", vec![boxed(Scalar(1i32)), boxed(Scalar(2i32))])
            .unwrap_err();
        assert!(matches!(err, BroadcastError::UnknownOperation(ref n) if n == "frobnicate"));
    }

    #[test]
    fn test_arity_mismatch() {
        let registry = OpRegistry::with_defaults();
        let err = registry
            .build("add", vec![boxed(Scalar(1i32))])
            .unwrap_err();
        match err {
            BroadcastError::ArityMismatch {
                op,
                expected,
                found,
            } => {
                assert_eq!(op, "add");
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            _ => panic!("unexpected error: {err:?}"),
        }
    }

    #[test]
    fn test_unsupported_dtype() {
        let registry = OpRegistry::with_defaults();
        let err = registry
            .build("bitwise_xor", vec![boxed(Scalar(1.0f64)), boxed(Scalar(2i32))])
            .unwrap_err();
        match err {
            BroadcastError::UnsupportedDType { op, dtype } => {
                assert_eq!(op, "bitwise_xor");
                assert_eq!(dtype, DType::Float64);
            }
            _ => panic!("unexpected error: {err:?}"),
        }
    }

    #[test]
    fn test_incompatible_shapes_surface_at_build() {
        let registry = OpRegistry::with_defaults();
        let a = Array::from_fn(&[2, 3], |_| 0u8);
        let b = Array::from_fn(&[2, 4], |_| 0u8);
        let err = registry.build("add", vec![boxed(&a), boxed(&b)]).unwrap_err();
        assert!(matches!(
            err,
            BroadcastError::IncompatibleShape { dim: 1, .. }
        ));
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        let registry = OpRegistry::with_defaults();
        let e = registry
            .build("add", vec![boxed(Scalar(250u8)), boxed(Scalar(10u8))])
            .unwrap();
        assert_eq!(e.at(&[]), Value::U8(4));

        let e = registry
            .build("multiply", vec![boxed(Scalar(i64::MAX)), boxed(Scalar(2i64))])
            .unwrap();
        assert_eq!(e.at(&[]), Value::I64(-2));
    }

    #[test]
    fn test_float_promotion_in_arithmetic() {
        let registry = OpRegistry::with_defaults();
        let e = registry
            .build("subtract", vec![boxed(Scalar(5i32)), boxed(Scalar(0.5f32))])
            .unwrap();
        assert_eq!(e.dtype(), DType::Float32);
        assert_eq!(e.at(&[]), Value::F32(4.5));
    }

    #[test]
    fn test_shifts() {
        let registry = OpRegistry::with_defaults();
        let e = registry
            .build("left_shift", vec![boxed(Scalar(1u8)), boxed(Scalar(7u8))])
            .unwrap();
        assert_eq!(e.at(&[]), Value::U8(128));

        let e = registry
            .build("left_shift", vec![boxed(Scalar(1u8)), boxed(Scalar(9u8))])
            .unwrap();
        assert_eq!(e.at(&[]), Value::U8(0));

        let e = registry
            .build("right_shift", vec![boxed(Scalar(-16i32)), boxed(Scalar(2i32))])
            .unwrap();
        assert_eq!(e.at(&[]), Value::I32(-4));

        let e = registry
            .build("right_shift", vec![boxed(Scalar(-16i32)), boxed(Scalar(40i32))])
            .unwrap();
        assert_eq!(e.at(&[]), Value::I32(-1));
    }

    #[test]
    fn test_where_and_clip() {
        let registry = OpRegistry::with_defaults();
        let cond = vec![true, false, true];
        let c = ArrayView::contiguous(&cond, &[3]).unwrap();
        let x = Array::from_fn(&[3], |i| i[0] as i16 * 10);
        let e = registry
            .build("where", vec![boxed(&c), boxed(&x), boxed(Scalar(-1i8))])
            .unwrap();
        assert_eq!(e.dtype(), DType::Int16);
        let out = materialize(&e);
        assert_eq!(
            out.data(),
            &[Value::I16(0), Value::I16(-1), Value::I16(20)]
        );

        let v = Array::from_fn(&[4], |i| i[0] as f64 - 1.0);
        let e = registry
            .build("clip", vec![boxed(&v), boxed(Scalar(0.0f64)), boxed(Scalar(1.5f64))])
            .unwrap();
        let out = materialize(&e);
        assert_eq!(
            out.data(),
            &[Value::F64(0.0), Value::F64(0.0), Value::F64(1.0), Value::F64(1.5)]
        );
    }

    #[test]
    fn test_nested_dyn_expr() {
        let registry = OpRegistry::with_defaults();
        let a = Array::from_fn(&[2, 1], |i| i[0] as u32 + 1);
        let b = Array::from_fn(&[3], |i| i[0] as u32);
        let inner = registry.build("add", vec![boxed(&a), boxed(&b)]).unwrap();
        let outer = registry
            .build("bitwise_xor", vec![boxed(inner), boxed(Scalar(1u32))])
            .unwrap();
        assert_eq!(outer.shape(), &[2, 3]);
        assert_eq!(outer.at(&[1, 2]), Value::U32((2 + 2) ^ 1));
    }

    #[test]
    fn test_register_custom_kernel() {
        fn sum4(args: &[Value], dtype: DType) -> Value {
            let total: i128 = args.iter().map(|v| v.to_i128()).sum();
            Value::from_i128(total, dtype)
        }
        let mut registry = OpRegistry::new();
        assert!(registry.is_empty());
        let prev = registry.register(NaryKernel {
            name: "sum4",
            arity: 4,
            promote_from: 0,
            supports: is_integer,
            apply: sum4,
        });
        assert!(prev.is_none());
        let e = registry
            .build(
                "sum4",
                vec![
                    boxed(Scalar(1i32)),
                    boxed(Scalar(2i32)),
                    boxed(Scalar(3i32)),
                    boxed(Scalar(4i32)),
                ],
            )
            .unwrap();
        assert_eq!(e.at(&[]), Value::I32(10));
    }

    #[test]
    fn test_new_rejects_arity_outside_range() {
        let kernel = NaryKernel {
            name: "sum5",
            arity: 5,
            promote_from: 0,
            supports: any_dtype,
            apply: apply_add,
        };
        let operands: Vec<BoxedOperand> = (0..5).map(|v| boxed(Scalar(v as i32))).collect();
        match DynExpr::new(kernel, operands).unwrap_err() {
            BroadcastError::ArityMismatch { op, expected, found } => {
                assert_eq!(op, "sum5");
                assert_eq!(expected, MAX_ARITY);
                assert_eq!(found, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_where_condition_not_promoted() {
        let registry = OpRegistry::with_defaults();
        let cond = vec![1u8, 0, 2];
        let c = ArrayView::contiguous(&cond, &[3]).unwrap();
        let x = Array::from_fn(&[3], |i| i[0] as i8 - 1);
        let e = registry
            .build("where", vec![boxed(&c), boxed(&x), boxed(Scalar(7i8))])
            .unwrap();
        assert_eq!(e.dtype(), DType::Int8);
        let out = materialize(&e);
        assert_eq!(out.data(), &[Value::I8(-1), Value::I8(7), Value::I8(1)]);
    }

    #[test]
    fn test_nested_static_expr_reports_result_dtype() {
        let registry = OpRegistry::with_defaults();
        let a = Array::from_fn(&[3], |i| i[0] as i32);
        let half = nary2(|p: i32, q: i32| p as f64 * 0.5 + q as f64, &a, Scalar(0i32)).unwrap();

        let err = registry
            .build("bitwise_xor", vec![boxed(&half), boxed(Scalar(0i32))])
            .unwrap_err();
        assert!(matches!(
            err,
            BroadcastError::UnsupportedDType { dtype: DType::Float64, .. }
        ));

        let sum = registry
            .build("add", vec![boxed(&half), boxed(Scalar(1i32))])
            .unwrap();
        assert_eq!(sum.dtype(), DType::Float64);
        assert_eq!(sum.at(&[2]), Value::F64(2.0));
    }

    #[test]
    #[should_panic(expected = "has arity 5")]
    fn test_register_rejects_wide_kernel() {
        let mut registry = OpRegistry::new();
        registry.register(NaryKernel {
            name: "too_wide",
            arity: 5,
            promote_from: 0,
            supports: any_dtype,
            apply: apply_add,
        });
    }
}
