//! Suffix array sampling and the small reference-construction helper
//! used to build `IndexImage`s for tests and the worked examples in
//! this crate's documentation.
//!
//! Full linear-time suffix-array construction (SA-IS) for large
//! genomes is explicitly out of scope for this tool (see the Non-goals
//! in the design notes: only the kLCP auxiliary structure is built
//! here, not the BWT/SA themselves) — the FM-index is assumed to
//! arrive pre-built from an external indexer. The naive sort-based
//! builder below exists only so this crate is self-contained for
//! tests and round-trip examples on small references.

use serde::{Deserialize, Serialize};
use vers_vecs::BitVec;

use crate::alphabet::OTHER_CODE;

/// Maps a raw BWT alphabet code to its position in sort order, where
/// the separator (numeric code [`OTHER_CODE`]) is lexicographically
/// *smallest*, followed by the four bases in their natural order. This
/// is purely a suffix-sorting convention; rank/select queries against
/// the built wavelet matrix still operate on the raw numeric codes.
#[inline]
fn sort_rank(code: u8) -> u8 {
    if code == OTHER_CODE {
        0
    } else {
        code + 1
    }
}

/// Build the suffix array of `text` (codes over the alphabet in
/// [`crate::alphabet`]) by straightforward comparison sort. `O(n log n
/// * n)` in the worst case; adequate for tests and small worked
/// examples, not for genome-scale references.
pub fn naive_suffix_array(text: &[u8]) -> Vec<usize> {
    let n = text.len();
    let mut sa: Vec<usize> = (0..n).collect();
    sa.sort_by(|&i, &j| {
        let a = text[i..].iter().map(|&c| sort_rank(c));
        let b = text[j..].iter().map(|&c| sort_rank(c));
        a.cmp(b)
    });
    sa
}

/// A suffix array sampled by the *suffix order* (SO) strategy: every
/// `2^level`-th entry is retained; the rest are reconstructed on
/// demand via LF-mapping steps in the FM-index adaptor.
///
/// Mirrors the teacher crate's `SOSampledSuffixArray`: same sampling
/// scheme, generalized from a generic `Character` alphabet to this
/// crate's fixed 5-symbol DNA alphabet.
#[derive(Serialize, Deserialize, Debug)]
pub struct SampledSuffixArray {
    level: usize,
    word_size: usize,
    samples: BitVec,
    len: usize,
}

impl SampledSuffixArray {
    /// Sample `sa`, keeping every `2^level`-th entry.
    pub fn sample(sa: &[usize], mut level: usize) -> SampledSuffixArray {
        if sa.is_empty() {
            return SampledSuffixArray {
                level: 0,
                word_size: 0,
                samples: BitVec::new(),
                len: 0,
            };
        }
        let n = sa.len();
        let word_size = (usize::BITS - (n as u64).leading_zeros() as u32) as usize + 1;
        if n <= 1 << level {
            level = 0;
        }
        let samples_len = ((n - 1) >> level) + 1;
        let mut samples = BitVec::with_capacity(samples_len * word_size);
        for i in 0..samples_len {
            samples.append_bits(sa[i << level] as u64, word_size);
        }
        SampledSuffixArray {
            level,
            word_size,
            samples,
            len: n,
        }
    }

    /// The suffix-array value at 0-indexed row `i`, if it was sampled.
    pub fn get(&self, i: usize) -> Option<usize> {
        if i >= self.len {
            return None;
        }
        if i & ((1 << self.level) - 1) == 0 {
            Some(self.samples.get_bits_unchecked((i >> self.level) * self.word_size, self.word_size) as usize)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
