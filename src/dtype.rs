//! Element types and the promotion lattice.
//!
//! ```text
//! bool < int8 < int16 < int32 < int64 < float32 < float64 < complex64 < complex128
//! ```
//!
//! Unsigned integers sit next to the signed integer of the same width. Mixing
//! signed and unsigned integers picks the smallest signed type that holds
//! both ranges; `uint64` against any signed type has no such integer and
//! promotes to `float64`.

use std::fmt;

/// Element types understood by the promotion lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

/// Every dtype, in declaration order.
pub const ALL_DTYPES: [DType; 13] = [
    DType::Bool,
    DType::Int8,
    DType::Int16,
    DType::Int32,
    DType::Int64,
    DType::UInt8,
    DType::UInt16,
    DType::UInt32,
    DType::UInt64,
    DType::Float32,
    DType::Float64,
    DType::Complex64,
    DType::Complex128,
];

impl DType {
    /// Size in bytes of a single element.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 | DType::Complex64 => 8,
            DType::Complex128 => 16,
        }
    }

    pub fn is_bool(self) -> bool {
        self == DType::Bool
    }

    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64
        )
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(
            self,
            DType::UInt8 | DType::UInt16 | DType::UInt32 | DType::UInt64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    /// Position on the lattice (higher = wider). Unsigned integers share the
    /// rank of the signed integer of the same width.
    pub fn lattice_rank(self) -> u8 {
        match self {
            DType::Bool => 0,
            DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 => 3,
            DType::Int64 | DType::UInt64 => 4,
            DType::Float32 => 5,
            DType::Float64 => 6,
            DType::Complex64 => 7,
            DType::Complex128 => 8,
        }
    }

    /// Lowercase name, e.g. `"int32"`.
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn signed_with_bits(bits: usize) -> Option<DType> {
    match bits {
        0..=8 => Some(DType::Int8),
        9..=16 => Some(DType::Int16),
        17..=32 => Some(DType::Int32),
        33..=64 => Some(DType::Int64),
        _ => None,
    }
}

/// Promote two dtypes to a common result dtype.
///
/// Rules:
/// - Same dtype → same dtype
/// - Bool + T → T
/// - Unsigned + Unsigned → wider unsigned
/// - Signed + Unsigned → smallest signed holding both, else float64
/// - Otherwise → lattice maximum
pub fn promote(a: DType, b: DType) -> DType {
    if a == b {
        return a;
    }
    if a.is_bool() {
        return b;
    }
    if b.is_bool() {
        return a;
    }
    let (signed, unsigned) = match (a.is_signed_int(), b.is_unsigned_int()) {
        (true, true) => (a, b),
        _ if b.is_signed_int() && a.is_unsigned_int() => (b, a),
        _ => {
            return if a.lattice_rank() >= b.lattice_rank() {
                a
            } else {
                b
            };
        }
    };
    let bits = (signed.size_bytes() * 8).max(unsigned.size_bytes() * 8 + 1);
    signed_with_bits(bits).unwrap_or(DType::Float64)
}

/// Common result dtype of a list of dtypes. An empty list yields `Bool`, the
/// lattice bottom.
///
/// The widest signed and widest unsigned integers are combined first with
/// [`promote`], then the lattice maximum is taken with the float and complex
/// inputs. The result does not depend on the order of `types`.
pub fn promote_types(types: &[DType]) -> DType {
    let widest = |kind: fn(DType) -> bool| {
        types
            .iter()
            .copied()
            .filter(|&t| kind(t))
            .max_by_key(|t| t.lattice_rank())
    };
    let integer = match (widest(DType::is_signed_int), widest(DType::is_unsigned_int)) {
        (Some(signed), Some(unsigned)) => promote(signed, unsigned),
        (signed, unsigned) => signed.or(unsigned).unwrap_or(DType::Bool),
    };
    types
        .iter()
        .copied()
        .filter(|t| t.is_float() || t.is_complex())
        .fold(integer, promote)
}
