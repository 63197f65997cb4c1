//! Mapping output indices back into operand index space.
//!
//! This replaces stride-0 promotion: instead of rewriting an operand's
//! strides, each operand keeps a [`BroadcastPlan`] that multiplies every
//! output index component by a 0/1 keep flag. A broadcast (size-1)
//! dimension therefore always reads index 0.
//!
//! ```text
//! output shape  [3, 4]        operand shape [3, 1]
//! keep flags             →    [1, 0]
//! output index  [2, 3]   →    operand index [2, 0]
//! ```

use crate::shape::IndexVec;

/// Per-operand broadcast plan, computed once per expression.
///
/// `lead` is the number of implicit leading dimensions the operand is
/// missing relative to the output; `keep[d]` is 0 where the operand's size
/// is 1 and 1 otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastPlan {
    lead: usize,
    keep: IndexVec,
}

impl BroadcastPlan {
    /// Build the plan for an operand of `operand_shape` under an output of
    /// rank `out_rank`.
    ///
    /// # Panics
    /// Panics if the operand rank exceeds `out_rank`.
    pub fn new(operand_shape: &[usize], out_rank: usize) -> Self {
        assert!(
            operand_shape.len() <= out_rank,
            "operand rank {} exceeds output rank {out_rank}",
            operand_shape.len()
        );
        Self {
            lead: out_rank - operand_shape.len(),
            keep: operand_shape.iter().map(|&n| usize::from(n != 1)).collect(),
        }
    }

    /// Rank of the operand this plan maps into.
    #[inline]
    pub fn rank(&self) -> usize {
        self.keep.len()
    }

    /// Number of implicit leading dimensions.
    #[inline]
    pub fn lead(&self) -> usize {
        self.lead
    }

    /// True when dimension `d` of the operand is broadcast.
    #[inline]
    pub fn is_broadcast(&self, d: usize) -> bool {
        self.keep[d] == 0
    }

    /// Write the operand-local index for `out_index` into `local`.
    ///
    /// `local` is cleared first. `out_index` must have the output rank.
    #[inline]
    pub fn map_into(&self, out_index: &[usize], local: &mut IndexVec) {
        debug_assert_eq!(out_index.len(), self.lead + self.keep.len());
        local.clear();
        local.extend(
            out_index[self.lead..]
                .iter()
                .zip(self.keep.iter())
                .map(|(&i, &k)| i * k),
        );
    }

    /// Operand-local index for `out_index`.
    #[inline]
    pub fn map(&self, out_index: &[usize]) -> IndexVec {
        let mut local = IndexVec::new();
        self.map_into(out_index, &mut local);
        local
    }
}

/// Map an output multi-index to the index space of an operand of shape
/// `operand_shape`, where the output has rank `out_rank`.
pub fn map_index(out_index: &[usize], operand_shape: &[usize], out_rank: usize) -> IndexVec {
    BroadcastPlan::new(operand_shape, out_rank).map(out_index)
}
