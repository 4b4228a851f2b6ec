//! The k-mer search engine (component C4): cold-start backward search,
//! O(1)-amortised rolling extension via the kLCP bitvector, and the
//! per-read state machine that picks between the two as a fixed-length
//! window slides one base at a time along a read.
//!
//! **Pattern direction.** `IndexImage` stores each reference's bases
//! reversed ahead of its separator (see `index::IndexImage::concat_and_sort`).
//! Backward search's prepend recurrence therefore processes a window's
//! bases in forward order (first to last) — prepending window[0] first,
//! window[k_len-1] last — which, against that reversed text, computes
//! the interval for the literal, forward-oriented window. Running the
//! same recurrence in the opposite order over a *forward*-stored text
//! would compute the same final interval for a cold search in isolation,
//! but it makes the kLCP-widened interval a *left* extension (prepending
//! a new leading base) rather than the rightward slide the per-read scan
//! actually needs — the reversed-text/forward-order pairing is what
//! makes `rolling_extend`'s widening step a genuine one-base rightward
//! roll. See DESIGN.md for the full derivation.

use crate::alphabet::{Base, Symbol};
use crate::index::IndexImage;
use crate::klcp::Klcp;

/// A non-empty suffix-array interval `[k, l]`, or the distinguished
/// empty marker — modelled as an explicit `Option` rather than the
/// `k > l` sentinel spec.md uses internally, per the tagged-variant
/// guidance in the design notes.
pub type Interval = Option<(usize, usize)>;

/// Number of matching suffixes in an interval (`l - k + 1`, or 0 when
/// empty).
pub fn occurrence_count(interval: Interval) -> usize {
    interval.map_or(0, |(k, l)| l - k + 1)
}

/// Full backward search of `window` (length `k_len`) from scratch.
/// Returns the interval, or `None` if any base in the window is
/// ambiguous or the k-mer doesn't occur.
///
/// Processes `window` first-to-last (not the last-to-first order a
/// cold search over a forward-stored text would use) because
/// `IndexImage` stores each reference reversed; see the module docs.
pub fn cold_search(index: &IndexImage, window: &[Symbol]) -> Interval {
    let mut k = 0usize;
    let mut l = index.len();
    for &sym in window.iter() {
        let c = match sym {
            Symbol::Base(b) => b,
            Symbol::Ambiguous => return None,
        };
        let (ok, ol) = index.range_rank(k, l, c);
        k = index.c_of(c) + ok + 1;
        l = index.c_of(c) + ol;
        if k > l {
            return None;
        }
    }
    Some((k, l))
}

/// Extend a non-empty interval for the previous window by one base:
/// drop the leftmost symbol, append `new_char`. `None` if `new_char`
/// is ambiguous or the extended k-mer doesn't occur.
///
/// `prev`'s `(k, l)` are 1-indexed SA slots (slot `t` = row `t - 1`);
/// `decrease_k`/`increase_l` walk the kLCP's 0-indexed row-gap
/// bitvector, so the slot span is converted to its row span before
/// navigating and back to slots afterwards.
///
/// Because `IndexImage` stores each reference reversed (see the module
/// docs), `prev` is really the SA interval of rows whose prefix equals
/// `reverse(window)`: `cold_search`'s prepend recurrence, run
/// first-to-last over `window`, builds up exactly that string one
/// character at a time. Let `window'` be `window` with its first
/// symbol dropped and `new_char` appended; then
/// `reverse(window') = new_char` followed by `reverse(window)` with
/// its *last* character dropped — a new leading base prepended onto a
/// `(k_len - 1)`-length prefix of the string `prev` already matches.
/// `prev` is already the maximal run for the full `k_len`-length
/// `reverse(window)` match, so widening it against a `k_len`-threshold
/// kLCP could never move; what `decrease_k`/`increase_l` recover here
/// is the (possibly larger) run of rows sharing only that leading
/// `(k_len - 1)`-length prefix of `reverse(window)` — the run the
/// kLCP's bits are built against (see `klcp_builder::build_klcp`,
/// which marks bits at threshold `k_len - 1`, not `k_len`). One more
/// `range_rank`/`C[c]` step then prepends `new_char`, producing the
/// interval for `reverse(window')`.
pub fn rolling_extend(
    index: &IndexImage,
    klcp: &Klcp,
    prev: (usize, usize),
    new_char: Symbol,
) -> Interval {
    let c = match new_char {
        Symbol::Base(b) => b,
        Symbol::Ambiguous => return None,
    };
    let (k, l) = prev;
    let left_row = k - 1;
    let right_row = l - 1;
    let widened_left_row = klcp.decrease_k(left_row);
    let widened_right_row = if right_row >= klcp.len() {
        right_row
    } else {
        klcp.increase_l(right_row)
    };
    let k_prime = widened_left_row + 1;
    let l_prime = widened_right_row + 1;
    let (ok, ol) = index.range_rank(k_prime, l_prime, c);
    let new_k = index.c_of(c) + ok + 1;
    let new_l = index.c_of(c) + ol;
    if new_k > new_l {
        None
    } else {
        Some((new_k, new_l))
    }
}

/// Per-read scan state: walks a fixed-length window across a decoded
/// read, choosing cold search or rolling extension for each step, and
/// applying the optional skip-after-fail heuristic.
pub struct ReadScan<'a> {
    index: &'a IndexImage,
    klcp: Option<&'a Klcp>,
    k_len: usize,
    skip_after_fail: bool,
}

/// One emitted window outcome, in `start_pos` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResult {
    pub start_pos: usize,
    pub interval: Option<(usize, usize)>,
}

impl<'a> ReadScan<'a> {
    pub fn new(index: &'a IndexImage, klcp: Option<&'a Klcp>, k_len: usize, skip_after_fail: bool) -> Self {
        ReadScan {
            index,
            klcp,
            k_len,
            skip_after_fail,
        }
    }

    /// Scan every length-`k_len` window of `read`, in `start_pos`
    /// order. Reads shorter than `k_len` produce no windows.
    pub fn scan(&self, read: &[Symbol]) -> Vec<WindowResult> {
        let mut out = Vec::new();
        if read.len() < self.k_len {
            return out;
        }
        let last_start = read.len() - self.k_len;

        let mut prev: Interval = None;
        let mut had_hit = false;
        let mut start_pos = 0usize;
        let mut in_zero_run = false;

        while start_pos <= last_start {
            let window = &read[start_pos..start_pos + self.k_len];
            let interval = match (prev, self.klcp) {
                (Some(iv), Some(klcp)) => {
                    rolling_extend(self.index, klcp, iv, window[self.k_len - 1])
                }
                _ => cold_search(self.index, window),
            };

            out.push(WindowResult {
                start_pos,
                interval,
            });

            if interval.is_some() {
                had_hit = true;
                in_zero_run = false;
                prev = interval;
                start_pos += 1;
                continue;
            }

            prev = None;
            if self.skip_after_fail && had_hit && !in_zero_run && self.k_len >= 3 {
                // First miss of a fresh zero run: jump `k_len - 2` positions
                // ahead (the heuristic assumes the whole skipped span is a
                // non-match) but still emit one placeholder line per skipped
                // `start_pos`, so the total output line count never drifts
                // from `len - k + 1` regardless of skipping (open question
                // in the design notes, resolved in favour of alignment).
                // Clamped to `last_start + 1` so a miss near the read's end
                // never emits placeholders for positions past the last
                // window.
                in_zero_run = true;
                let skip_amount = self.k_len - 2;
                let target = (start_pos + skip_amount).min(last_start + 1);
                for p in (start_pos + 1)..target {
                    out.push(WindowResult {
                        start_pos: p,
                        interval: None,
                    });
                }
                start_pos = target;
            } else {
                in_zero_run = true;
                start_pos += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::decode_sequence;

    fn build(seq: &str) -> IndexImage {
        IndexImage::build(&[("r0".to_string(), seq.as_bytes().to_vec())], 0)
    }

    fn build_with_klcp(seq: &str, k: usize) -> (IndexImage, Klcp) {
        IndexImage::build_with_klcp(&[("r0".to_string(), seq.as_bytes().to_vec())], 0, k)
    }

    #[test]
    fn rolling_extend_matches_cold_search_on_a_homopolymer_run() {
        let (index, klcp) = build_with_klcp("AAAAA", 2);
        let read = decode_sequence(b"AAAA");
        let scan = ReadScan::new(&index, Some(&klcp), 2, false);
        let rolled = scan.scan(&read);
        let cold_only = ReadScan::new(&index, None, 2, false).scan(&read);
        assert_eq!(rolled, cold_only);
        for r in &rolled {
            assert_eq!(occurrence_count(r.interval), 4);
        }
    }

    #[test]
    fn rolling_extend_matches_cold_search_on_a_non_homopolymer_reference() {
        // A homopolymer reference is a palindrome under reversal, so it
        // can't tell a correctly-reversed index apart from a forward one.
        // This is the non-homopolymer counterexample that distinguishes
        // the two: reference "ACGTACGT", read "ACGTAC", k=3 — windows
        // "ACG", "CGT", "GTA", "TAC" must all agree between cold search
        // and rolling extension.
        let (index, klcp) = build_with_klcp("ACGTACGT", 3);
        let read = decode_sequence(b"ACGTAC");
        let rolled = ReadScan::new(&index, Some(&klcp), 3, false).scan(&read);
        let cold_only = ReadScan::new(&index, None, 3, false).scan(&read);
        assert_eq!(rolled, cold_only);
        assert_eq!(occurrence_count(rolled[0].interval), 2, "ACG occurs twice");
        assert_eq!(occurrence_count(rolled[1].interval), 2, "CGT occurs twice");
        assert_eq!(occurrence_count(rolled[2].interval), 1, "GTA occurs once");
        assert_eq!(occurrence_count(rolled[3].interval), 1, "TAC occurs once");
    }

    #[test]
    fn scenario_1_four_windows_all_hit() {
        let index = build("ACGTACGT");
        let read = decode_sequence(b"ACGTAC");
        let scan = ReadScan::new(&index, None, 3, false);
        let results = scan.scan(&read);
        assert_eq!(results.len(), 4);
        for r in &results {
            assert!(r.interval.is_some(), "window at {} should hit", r.start_pos);
        }
    }

    #[test]
    fn scenario_2_aaaa_repeat_interval_size_four() {
        let index = build("AAAAA");
        let read = decode_sequence(b"AAAA");
        let scan = ReadScan::new(&index, None, 2, false);
        let results = scan.scan(&read);
        assert_eq!(results.len(), 3);
        for r in &results {
            assert_eq!(occurrence_count(r.interval), 4);
        }
    }

    #[test]
    fn scenario_4_single_n_invalidates_overlapping_windows() {
        let index = build("ACGTACGT");
        let read = decode_sequence(b"ACNGT");
        let scan = ReadScan::new(&index, None, 3, false);
        let results = scan.scan(&read);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.interval.is_none()));
    }

    #[test]
    fn reads_shorter_than_k_have_no_windows() {
        let index = build("ACGTACGT");
        let read = decode_sequence(b"AC");
        let scan = ReadScan::new(&index, None, 5, false);
        assert!(scan.scan(&read).is_empty());
    }

    #[test]
    fn scenario_5_skip_after_fail_jumps_k_minus_two_on_first_miss() {
        // A reference with no 'C' at all: any window straddling the read's
        // "CC" insert is an unconditional miss (no reference symbol can
        // equal 'C'), so the miss here is genuine, not a hand-picked
        // coincidence that happens not to occur (unlike an all-T tail
        // appended to an all-A/T reference, which never actually misses).
        let index = build("AAAAAGGGGGGGGGGAAAAA");
        let read = decode_sequence(b"AAAAACCAAAAA");
        let scan = ReadScan::new(&index, None, 5, true);
        let results = scan.scan(&read);
        // Output stays aligned: one line per start_pos, 0..=last_start.
        let last_start = read.len() - 5;
        assert_eq!(results.len(), last_start + 1);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.start_pos, i);
        }
        assert!(results[0].interval.is_some(), "the leading AAAAA hits");
        assert!(
            results[1].interval.is_none(),
            "the window crossing into the CC insert must miss"
        );
        assert!(
            results.last().unwrap().interval.is_some(),
            "the trailing AAAAA hits again once the window clears the insert"
        );
    }

    #[test]
    fn skip_after_fail_placeholder_loop_does_not_overshoot_last_start() {
        // Regression test: a miss one position before the read's last
        // start_pos used to push placeholders for start_pos values past
        // last_start, inflating the line count beyond `len - k + 1`.
        let index = build("AAAAAG");
        let read = decode_sequence(b"AAAAAC");
        let scan = ReadScan::new(&index, None, 5, true);
        let results = scan.scan(&read);
        let last_start = read.len() - 5;
        assert_eq!(last_start, 1);
        assert_eq!(results.len(), last_start + 1);
        assert_eq!(results[0].start_pos, 0);
        assert_eq!(results[1].start_pos, 1);
        assert!(results[0].interval.is_some());
        assert!(results[1].interval.is_none());
    }

    #[test]
    fn skip_after_fail_output_length_matches_no_skip_length() {
        let index = build("ACGTACGTACGTACGTACGTGGGGCCCCAAAATTTT");
        let read = decode_sequence(b"ACGTACGTACGTACGTACGTGGGGCCCCAAAATTTT");
        let with_skip = ReadScan::new(&index, None, 6, true).scan(&read);
        let without_skip = ReadScan::new(&index, None, 6, false).scan(&read);
        assert_eq!(with_skip.len(), without_skip.len());
        assert_eq!(with_skip.len(), read.len() - 6 + 1);
    }

    #[test]
    fn all_ambiguous_read_produces_len_minus_k_plus_one_empties() {
        let index = build("ACGTACGT");
        let read = decode_sequence(b"NNNNN");
        let scan = ReadScan::new(&index, None, 3, false);
        let results = scan.scan(&read);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.interval.is_none()));
    }
}
