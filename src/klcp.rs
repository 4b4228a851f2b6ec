//! The kLCP auxiliary structure (component C3): a bitvector over
//! adjacent suffix-array rows, `B[i] = 1` iff `SA[i]` and `SA[i+1]`
//! share a common prefix at least as long as the builder's threshold
//! (see `klcp_builder`, which marks bits at `k - 1`, not `k`, for a
//! `Klcp` tagged with query length `k`). Rolling a query window forward
//! or backward by one base only ever needs to find the nearest 0-bit in
//! one direction, which this wraps as two named, one-sided navigators.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bitvector::Bitvector;
use crate::error::{Error, Result};

/// Magic bytes identifying a kLCP file, followed by a version byte,
/// `k` and `L_total` as little-endian `u64`s, then the bincode-encoded
/// bitvector payload. Kept deliberately simple (not a general-purpose
/// container format) since a kLCP file is only ever read back by this
/// crate, paired with the exact index it was built against.
const MAGIC: &[u8; 4] = b"KLCP";
const VERSION: u8 = 1;

/// A built kLCP bitvector, tagged with the `k` it was built for so a
/// loaded kLCP file can be checked against the index it's paired with.
#[derive(Serialize, Deserialize, Debug)]
pub struct Klcp {
    k: usize,
    bits: Bitvector,
}

impl Klcp {
    pub fn new(k: usize, bits: Bitvector) -> Self {
        Klcp { k, bits }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// `B.len() == L_total - 1`: one bit per adjacent pair of SA rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn bits(&self) -> &Bitvector {
        &self.bits
    }

    /// The left end of the run of SA rows sharing the bitvector's
    /// threshold-length prefix with row `i`: the largest `j <= i` such
    /// that `B[j-1] = 0` or `j = 0`.
    ///
    /// Shrinking the search interval's lower bound by one base (the
    /// window slides forward) walks left along this run, since every
    /// row in it still agrees on the shared prefix.
    pub fn decrease_k(&self, i: usize) -> usize {
        if i == 0 {
            return 0;
        }
        match self.bits.iter_zero_left_of(i - 1) {
            Some(z) => z + 1,
            None => 0,
        }
    }

    /// The right end of the run of SA rows sharing the bitvector's
    /// threshold-length prefix with row `i`: the smallest `j >= i` such
    /// that `B[j] = 0`, or `B.len()` if no such `j` exists (row `i` is
    /// the last row).
    pub fn increase_l(&self, i: usize) -> usize {
        match self.bits.iter_zero_right_of(i) {
            Some(z) => z,
            None => self.bits.len(),
        }
    }

    /// `L_total` of the index this kLCP was built against: one more
    /// than the number of adjacent-row bits it holds.
    #[inline]
    pub fn l_total(&self) -> u64 {
        self.bits.len() as u64 + 1
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(MAGIC)?;
        file.write_all(&[VERSION])?;
        file.write_all(&(self.k as u64).to_le_bytes())?;
        file.write_all(&self.l_total().to_le_bytes())?;
        bincode::serialize_into(file, &self.bits)?;
        Ok(())
    }

    pub fn load(path: &Path, expected_k: usize, expected_len: u64) -> Result<Klcp> {
        let mut file = std::fs::File::open(path)?;
        let mut header = [0u8; 4 + 1 + 8 + 8];
        file.read_exact(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(Error::IndexLoad {
                prefix: path.to_path_buf(),
                reason: "bad kLCP magic".to_string(),
            });
        }
        let found_k = u64::from_le_bytes(header[5..13].try_into().unwrap()) as usize;
        let found_len = u64::from_le_bytes(header[13..21].try_into().unwrap());
        if found_k != expected_k || found_len != expected_len {
            return Err(Error::KlcpMismatch {
                path: path.to_path_buf(),
                expected_k,
                expected_len,
                found_k,
                found_len,
            });
        }
        let bits: Bitvector = bincode::deserialize_from(file)?;
        Ok(Klcp { k: found_k, bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn klcp_from_str(s: &str) -> Klcp {
        Klcp::new(3, Bitvector::from_bits(s.chars().map(|c| c == '1')))
    }

    #[test]
    fn decrease_k_walks_to_run_start() {
        // index:  0123456
        let k = klcp_from_str("1011001");
        assert_eq!(k.decrease_k(0), 0);
        assert_eq!(k.decrease_k(1), 0);
        assert_eq!(k.decrease_k(2), 2);
        assert_eq!(k.decrease_k(3), 2);
        assert_eq!(k.decrease_k(4), 4);
        assert_eq!(k.decrease_k(6), 6);
    }

    #[test]
    fn increase_l_walks_to_run_end() {
        let k = klcp_from_str("1011001");
        assert_eq!(k.increase_l(0), 1);
        assert_eq!(k.increase_l(1), 1);
        assert_eq!(k.increase_l(2), 4);
        assert_eq!(k.increase_l(3), 4);
        assert_eq!(k.increase_l(4), 4);
        assert_eq!(k.increase_l(6), 7);
    }

    #[test]
    fn single_row_run_is_its_own_endpoints() {
        let k = klcp_from_str("0000");
        for i in 0..4 {
            assert_eq!(k.decrease_k(i), i);
            assert_eq!(k.increase_l(i), i);
        }
    }
}
