//! Shapes and the broadcasting rule.
//!
//! Shapes are aligned from the trailing dimension; missing leading
//! dimensions count as 1. Per aligned dimension all sizes must be equal or 1,
//! and the output takes the common non-1 size.

use std::fmt;
use std::ops::Deref;

use smallvec::SmallVec;

use crate::{BroadcastError, Result};

/// Multi-index buffer. Stays on the stack for rank <= 4.
pub type IndexVec = SmallVec<[usize; 4]>;

/// Array shape: one size per dimension. Rank 0 is a scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape(IndexVec);

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self(IndexVec::from_slice(dims))
    }

    /// Scalar (rank-0) shape.
    pub fn scalar() -> Self {
        Self(IndexVec::new())
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (1 for a scalar, 0 if any dimension is 0).
    #[inline]
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Size of dimension `axis` after right-aligning to `rank` dimensions.
    ///
    /// Implicit leading dimensions report 1.
    #[inline]
    pub fn aligned_dim(&self, axis: usize, rank: usize) -> usize {
        aligned(&self.0, axis, rank)
    }
}

impl Deref for Shape {
    type Target = [usize];

    #[inline]
    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(IndexVec::from_vec(dims))
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(&dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

#[inline]
fn aligned(dims: &[usize], axis: usize, rank: usize) -> usize {
    let lead = rank - dims.len();
    if axis < lead {
        1
    } else {
        dims[axis - lead]
    }
}

/// Compute the common broadcast shape of any number of operand shapes.
///
/// - sizes must be equal, or one of them must be 1
/// - the resulting size is the common non-1 size (a 1 against 0 gives 0)
/// - the resulting rank is the largest operand rank
///
/// On conflict the error names the aligned output dimension and the two
/// sizes that disagree, in operand order.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Shape> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);

    let mut out = IndexVec::from_elem(1, rank);
    for (d, slot) in out.iter_mut().enumerate() {
        let mut target = 1usize;
        for dims in shapes {
            let n = aligned(dims, d, rank);
            if n == 1 {
                continue;
            }
            if target == 1 {
                target = n;
            } else if target != n {
                return Err(BroadcastError::IncompatibleShape {
                    dim: d,
                    sizes: vec![target, n],
                });
            }
        }
        *slot = target;
    }

    Ok(Shape(out))
}
