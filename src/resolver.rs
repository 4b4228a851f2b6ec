//! The reference-set resolver (component C5): turns a suffix-array
//! interval into the deduplicated, ordered list of reference ids it
//! intersects.
//!
//! Uses a scratch `seen` flag array rather than a hash set — `n_refs`
//! is typically small (10^3-10^5) and the hot loop is bounded by
//! interval size, so a flat `Vec<bool>` reused across windows beats
//! allocating a fresh set per call. `seen` must be all-`false` on
//! entry; this function restores that invariant before returning.

use crate::index::IndexImage;
use crate::search::Interval;

/// Resolve `interval` to the ordered, deduplicated reference ids it
/// intersects, in SA-scan order of first appearance. `seen.len()`
/// must equal the number of references in `index`; its contents are
/// unchanged by the time this returns (set and cleared symmetrically).
pub fn resolve(index: &IndexImage, interval: Interval, seen: &mut [bool]) -> Vec<usize> {
    let mut out = Vec::new();
    let Some((k, l)) = interval else {
        return out;
    };
    for t in k..=l {
        let pos = index.sa_to_pos(t);
        let Some(rid) = index.references().rid_at(pos) else {
            continue;
        };
        if !seen[rid] {
            seen[rid] = true;
            out.push(rid);
        }
    }
    for &rid in &out {
        seen[rid] = false;
    }
    out
}
