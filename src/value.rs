//! Runtime-typed scalar values.
//!
//! [`Value`] carries one element of any [`DType`]. It is what the registry
//! path passes to its kernels; the statically typed path never touches it.

use num_complex::{Complex32, Complex64};

use crate::dtype::DType;

/// A single element tagged with its dtype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    C64(Complex32),
    C128(Complex64),
}

impl Value {
    pub fn dtype(&self) -> DType {
        match self {
            Value::Bool(_) => DType::Bool,
            Value::I8(_) => DType::Int8,
            Value::I16(_) => DType::Int16,
            Value::I32(_) => DType::Int32,
            Value::I64(_) => DType::Int64,
            Value::U8(_) => DType::UInt8,
            Value::U16(_) => DType::UInt16,
            Value::U32(_) => DType::UInt32,
            Value::U64(_) => DType::UInt64,
            Value::F32(_) => DType::Float32,
            Value::F64(_) => DType::Float64,
            Value::C64(_) => DType::Complex64,
            Value::C128(_) => DType::Complex128,
        }
    }

    /// Nonzero test. Complex values are truthy if either part is nonzero.
    pub fn is_truthy(&self) -> bool {
        match *self {
            Value::Bool(b) => b,
            Value::F32(x) => x != 0.0,
            Value::F64(x) => x != 0.0,
            Value::C64(c) => c.re != 0.0 || c.im != 0.0,
            Value::C128(c) => c.re != 0.0 || c.im != 0.0,
            _ => self.to_i128() != 0,
        }
    }

    /// Integer view of the value. Floats truncate toward zero (saturating),
    /// complex values use the real part.
    pub fn to_i128(&self) -> i128 {
        match *self {
            Value::Bool(b) => i128::from(b),
            Value::I8(x) => i128::from(x),
            Value::I16(x) => i128::from(x),
            Value::I32(x) => i128::from(x),
            Value::I64(x) => i128::from(x),
            Value::U8(x) => i128::from(x),
            Value::U16(x) => i128::from(x),
            Value::U32(x) => i128::from(x),
            Value::U64(x) => i128::from(x),
            Value::F32(x) => x as i128,
            Value::F64(x) => x as i128,
            Value::C64(c) => c.re as i128,
            Value::C128(c) => c.re as i128,
        }
    }

    /// Floating-point view of the value. Complex values use the real part.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Value::Bool(b) => f64::from(u8::from(b)),
            Value::F32(x) => f64::from(x),
            Value::F64(x) => x,
            Value::C64(c) => f64::from(c.re),
            Value::C128(c) => c.re,
            Value::U64(x) => x as f64,
            Value::I64(x) => x as f64,
            _ => self.to_i128() as f64,
        }
    }

    /// Complex view of the value.
    pub fn to_c128(&self) -> Complex64 {
        match *self {
            Value::C64(c) => Complex64::new(f64::from(c.re), f64::from(c.im)),
            Value::C128(c) => c,
            _ => Complex64::new(self.to_f64(), 0.0),
        }
    }

    /// Build an integer or bool value of `dtype` from `v`, wrapping like `as`.
    ///
    /// Non-integer targets go through [`Value::from_f64`].
    pub fn from_i128(v: i128, dtype: DType) -> Value {
        match dtype {
            DType::Bool => Value::Bool(v != 0),
            DType::Int8 => Value::I8(v as i8),
            DType::Int16 => Value::I16(v as i16),
            DType::Int32 => Value::I32(v as i32),
            DType::Int64 => Value::I64(v as i64),
            DType::UInt8 => Value::U8(v as u8),
            DType::UInt16 => Value::U16(v as u16),
            DType::UInt32 => Value::U32(v as u32),
            DType::UInt64 => Value::U64(v as u64),
            _ => Value::from_f64(v as f64, dtype),
        }
    }

    /// Build a value of `dtype` from a float, converting like `as`.
    pub fn from_f64(v: f64, dtype: DType) -> Value {
        match dtype {
            DType::Bool => Value::Bool(v != 0.0),
            DType::Float32 => Value::F32(v as f32),
            DType::Float64 => Value::F64(v),
            DType::Complex64 => Value::C64(Complex32::new(v as f32, 0.0)),
            DType::Complex128 => Value::C128(Complex64::new(v, 0.0)),
            _ => Value::from_i128(v as i128, dtype),
        }
    }

    /// Build a value of `dtype` from a complex number. Real targets drop the
    /// imaginary part; bool tests both parts.
    pub fn from_c128(v: Complex64, dtype: DType) -> Value {
        match dtype {
            DType::Bool => Value::Bool(v.re != 0.0 || v.im != 0.0),
            DType::Complex64 => Value::C64(Complex32::new(v.re as f32, v.im as f32)),
            DType::Complex128 => Value::C128(v),
            _ => Value::from_f64(v.re, dtype),
        }
    }

    /// Convert to `dtype`. Identity when the dtype already matches.
    pub fn cast(self, dtype: DType) -> Value {
        if self.dtype() == dtype {
            return self;
        }
        let src = self.dtype();
        if src.is_complex() {
            Value::from_c128(self.to_c128(), dtype)
        } else if src.is_float() {
            Value::from_f64(self.to_f64(), dtype)
        } else if dtype.is_bool() {
            Value::Bool(self.is_truthy())
        } else {
            Value::from_i128(self.to_i128(), dtype)
        }
    }
}

/// Conversion of an operand element into a [`Value`].
pub trait IntoValue: Copy {
    /// The dtype every value of this type has, if there is one.
    const FIXED_DTYPE: Option<DType>;

    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    const FIXED_DTYPE: Option<DType> = None;

    #[inline]
    fn into_value(self) -> Value {
        self
    }
}

/// Rust element types with a fixed [`DType`].
pub trait Element: IntoValue + Send + Sync + 'static {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($t:ty => $variant:ident, $dtype:ident);* $(;)?) => {
        $(
            impl IntoValue for $t {
                const FIXED_DTYPE: Option<DType> = Some(DType::$dtype);

                #[inline(always)]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl Element for $t {
                const DTYPE: DType = DType::$dtype;
            }

            impl From<$t> for Value {
                #[inline]
                fn from(x: $t) -> Value {
                    Value::$variant(x)
                }
            }
        )*
    };
}

impl_element!(
    bool => Bool, Bool;
    i8 => I8, Int8;
    i16 => I16, Int16;
    i32 => I32, Int32;
    i64 => I64, Int64;
    u8 => U8, UInt8;
    u16 => U16, UInt16;
    u32 => U32, UInt32;
    u64 => U64, UInt64;
    f32 => F32, Float32;
    f64 => F64, Float64;
    Complex32 => C64, Complex64;
    Complex64 => C128, Complex128;
);
