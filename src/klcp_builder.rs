//! Offline construction of the kLCP bitvector (component C7): given
//! the concatenated reference text and its suffix array — the same
//! two artifacts the FM-index adaptor builds from — scan adjacent
//! suffix-array rows and mark which pairs share a prefix of at least
//! a given length. Bounded at that length: the scan never looks
//! further than that many bases past either suffix's start, so
//! construction is `O(L_total * k)`, not a full LCP-array computation.
//!
//! The bitvector is tagged with the query k-mer length `k_len` (what
//! the CLI's `-k` means, and what a loaded kLCP file is checked
//! against), but the bits themselves are marked at threshold `k_len -
//! 1`, not `k_len`. `search::rolling_extend` only ever widens the
//! *previous* window's interval, which backward-search correctness
//! already makes the maximal run for the full `k_len`-prefix — a
//! `k_len`-threshold bitvector could never find anything to widen
//! there. What rolling extension needs is the wider run sharing just
//! the `k_len - 1` bases left after dropping the window's leading
//! base, which is exactly threshold `k_len - 1`.

use crate::alphabet::OTHER_CODE;
use crate::bitvector::Bitvector;
use crate::index::IndexImage;
use crate::klcp::Klcp;

/// `true` iff the two suffixes starting at `a` and `b` agree on their
/// first `threshold` symbols and neither run crosses a separator — a
/// shared prefix can never legitimately include the ambiguous/separator
/// code, since no real k-mer ever contains one.
fn shares_prefix_at_least(text: &[u8], a: usize, b: usize, threshold: usize) -> bool {
    for offset in 0..threshold {
        let (Some(&ca), Some(&cb)) = (text.get(a + offset), text.get(b + offset)) else {
            return false;
        };
        if ca == OTHER_CODE || cb == OTHER_CODE || ca != cb {
            return false;
        }
    }
    true
}

/// Mark, for every adjacent pair of rows in `sa`, whether the two
/// suffixes share at least `threshold` symbols. Raw building block
/// with no opinion on what `threshold` means to a caller; `build_klcp`
/// is the k-mer-length-facing wrapper around this.
fn build_klcp_raw(text: &[u8], sa: &[usize], threshold: usize) -> Bitvector {
    let width = sa.len().saturating_sub(1);
    let ones = (0..width).filter(|&i| shares_prefix_at_least(text, sa[i], sa[i + 1], threshold));
    Bitvector::from_ones_at(width, ones)
}

/// Build the kLCP bitvector for query k-mer length `k` over `text`'s
/// suffix array `sa`. `sa` must be the suffix array of `text` (as
/// produced alongside an [`crate::index::IndexImage`] built from the
/// same text). Bits are marked at threshold `k - 1` (see module docs);
/// the returned [`Klcp`] is tagged with `k` itself.
pub fn build_klcp(text: &[u8], sa: &[usize], k: usize) -> Klcp {
    let bits = build_klcp_raw(text, sa, k.saturating_sub(1));
    Klcp::new(k, bits)
}

/// Build the kLCP bitvector for `k` from an already-loaded FM-index
/// alone (the `index` CLI command's path), with no separately stored
/// original text or suffix array required.
///
/// Reconstructs the full suffix array and text in a single O(`L_total`)
/// pass using only C2's public `sa_to_pos` and the BWT's
/// preceding-character relation `bwt[i] == text[SA[i] - 1]` — the same
/// linear-time decompression an FM-index supports natively — then
/// reuses [`build_klcp`]. This is the "(b) BWT-based linear
/// construction" strategy spec.md §4.7 permits as an alternative to a
/// direct bounded LCP scan over a retained text buffer.
pub fn build_klcp_from_index(index: &IndexImage, k: usize) -> Klcp {
    let n = index.len();
    let mut sa = vec![0usize; n];
    let mut text = vec![0u8; n];
    for i in 0..n {
        let pos = index.sa_to_pos(i + 1);
        sa[i] = pos;
        let pred = if pos == 0 { n - 1 } else { pos - 1 };
        text[pred] = index.bwt_code(i);
    }
    build_klcp(&text, &sa, k)
}
