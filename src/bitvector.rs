//! A compact, read-only, rank/select-enabled bitvector (component C1).
//!
//! Built once from a sequence of bits and never mutated afterwards,
//! matching the lifecycle of the kLCP bitvector it backs: loaded or
//! built once per process, then queried only. Storage and the O(1)
//! rank/select primitives are delegated to `vers_vecs`, which packs
//! bits into 64-bit words with 512-bit superblock rank samples.

use serde::{Deserialize, Serialize};
use vers_vecs::{BitVec, RsVec};

/// A packed bitvector with O(1) `is_set`/`rank1` and O(1)-amortised
/// nearest-zero queries, built once and read thereafter.
#[derive(Serialize, Deserialize, Debug)]
pub struct Bitvector {
    bits: RsVec,
}

impl Bitvector {
    /// Build from an iterator of bits, in order.
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut bv = BitVec::new();
        for b in bits {
            bv.append(b);
        }
        Bitvector {
            bits: RsVec::from_bit_vec(bv),
        }
    }

    /// Build an all-zero bitvector of the given length; callers then
    /// set the 1-bits (used by the kLCP builder, which only ever needs
    /// to mark runs of SA rows sharing some fixed-length prefix).
    pub fn from_ones_at(len: usize, ones: impl IntoIterator<Item = usize>) -> Self {
        let mut bv = BitVec::from_zeros(len);
        for i in ones {
            bv.set(i, 1).expect("index in range");
        }
        Bitvector {
            bits: RsVec::from_bit_vec(bv),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `B[i]`. O(1).
    #[inline]
    pub fn is_set(&self, i: usize) -> bool {
        self.bits.get(i).unwrap_or(false)
    }

    /// Number of 1-bits in `B[0..=i]`. O(1).
    #[inline]
    pub fn rank1(&self, i: usize) -> usize {
        self.bits.rank1(i + 1)
    }

    /// Number of 0-bits in `B[0..=i]`. O(1).
    #[inline]
    pub fn rank0(&self, i: usize) -> usize {
        self.bits.rank0(i + 1)
    }

    /// Position of the nearest 0-bit at index `<= i`, or `None` if
    /// every bit in `B[0..=i]` is set. O(1) amortised via `select0`.
    pub fn iter_zero_left_of(&self, i: usize) -> Option<usize> {
        let zeros_before = self.bits.rank0(i + 1);
        if zeros_before == 0 {
            return None;
        }
        let pos = self.bits.select0(zeros_before - 1);
        (pos <= i).then_some(pos)
    }

    /// Position of the nearest 0-bit at index `>= i`, or `None` if
    /// every bit in `B[i..]` is set. O(1) amortised via `select0`.
    pub fn iter_zero_right_of(&self, i: usize) -> Option<usize> {
        if i >= self.len() {
            return None;
        }
        let zeros_before = self.bits.rank0(i);
        let pos = self.bits.select0(zeros_before);
        (pos < self.len()).then_some(pos)
    }
}
