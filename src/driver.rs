//! The read-stream driver (component C6): pulls batches of reads from
//! a [`ReadSource`], scans each read's windows with [`ReadScan`],
//! resolves hits through the reference-set resolver, and serializes
//! the results. Single-threaded, per spec.md §5 baseline; the
//! per-worker `seen` scratch array spec.md calls out for a future
//! parallel mode is already isolated here as an owned buffer so that
//! mode would only need to clone the driver's immutable inputs.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::IndexImage;
use crate::klcp::Klcp;
use crate::reader::{Read, ReadSource};
use crate::resolver;
use crate::search::{occurrence_count, ReadScan};

/// Tunables for a streaming match run, one-to-one with the `match`
/// subcommand's flags in spec.md §6.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub k_len: usize,
    pub emit_ref_sets: bool,
    pub skip_after_fail: bool,
    pub batch_size: usize,
    pub print_header: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            k_len: 0,
            emit_ref_sets: false,
            skip_after_fail: false,
            batch_size: crate::reader::DEFAULT_BATCH_SIZE,
            print_header: true,
        }
    }
}

/// Accumulated run statistics, reported at the end of a stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverStats {
    pub reads_processed: u64,
    pub windows_emitted: u64,
    pub malformed_skipped: u64,
    pub elapsed: Duration,
}

/// Owns the immutable index/kLCP references and the reusable `seen`
/// scratch buffer; runs a full read stream to completion (or until a
/// cancellation flag is raised between batches).
pub struct Driver<'a> {
    index: &'a IndexImage,
    klcp: Option<&'a Klcp>,
    config: DriverConfig,
    seen: Vec<bool>,
}

impl<'a> Driver<'a> {
    pub fn new(index: &'a IndexImage, klcp: Option<&'a Klcp>, config: DriverConfig) -> Self {
        let n_refs = index.references().names().len();
        Driver {
            index,
            klcp,
            config,
            seen: vec![false; n_refs],
        }
    }

    /// Run until `source` signals end-of-stream (an empty batch) or
    /// `cancelled` returns `true` between batches. Writes to `out`
    /// following spec.md §6's output format.
    pub fn run(
        &mut self,
        source: &mut dyn ReadSource,
        out: &mut dyn Write,
        mut cancelled: impl FnMut() -> bool,
    ) -> Result<DriverStats> {
        let scan = ReadScan::new(self.index, self.klcp, self.config.k_len, self.config.skip_after_fail);
        let start = Instant::now();
        let mut stats = DriverStats::default();

        loop {
            if cancelled() {
                info!("stream cancelled between batches");
                break;
            }
            let batch = source.next_batch(self.config.batch_size)?;
            if batch.is_empty() {
                break;
            }
            debug!(batch_len = batch.len(), "pulled read batch");
            for read in &batch {
                self.process_read(read, &scan, out, &mut stats)?;
                stats.reads_processed += 1;
            }
        }

        stats.malformed_skipped = source.malformed_count();
        stats.elapsed = start.elapsed();
        if stats.malformed_skipped > 0 {
            warn!(count = stats.malformed_skipped, "skipped malformed reads");
        }
        info!(
            reads = stats.reads_processed,
            windows = stats.windows_emitted,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "stream complete"
        );
        Ok(stats)
    }

    fn process_read(
        &mut self,
        read: &Read,
        scan: &ReadScan<'_>,
        out: &mut dyn Write,
        stats: &mut DriverStats,
    ) -> Result<()> {
        if self.config.print_header {
            write!(out, "#")?;
            for sym in &read.bases {
                out.write_all(&[symbol_char(sym.code())])?;
            }
            writeln!(out)?;
        }

        let windows = scan.scan(&read.bases);
        for w in &windows {
            stats.windows_emitted += 1;
            if !self.config.emit_ref_sets {
                continue;
            }
            let rids = resolver::resolve(self.index, w.interval, &mut self.seen);
            debug_assert!(rids.len() <= occurrence_count(w.interval).max(1));
            write!(out, "{}", rids.len())?;
            for rid in &rids {
                write!(out, " {rid}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

fn symbol_char(code: u8) -> u8 {
    match code {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        3 => b'T',
        _ => b'N',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TextReadSource;

    fn build(seq: &str) -> IndexImage {
        IndexImage::build(&[("r0".to_string(), seq.as_bytes().to_vec())], 0)
    }

    #[test]
    fn scenario_1_full_pipeline_output() {
        let index = build("ACGTACGT");
        let mut config = DriverConfig {
            k_len: 3,
            emit_ref_sets: true,
            print_header: false,
            ..Default::default()
        };
        config.batch_size = 8;
        let mut driver = Driver::new(&index, None, config);
        let data = b">read0\nACGTAC\n";
        let mut source = TextReadSource::new(&data[..]);
        let mut out = Vec::new();
        let stats = driver.run(&mut source, &mut out, || false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["1 0", "1 0", "1 0", "1 0"]);
        assert_eq!(stats.reads_processed, 1);
        assert_eq!(stats.windows_emitted, 4);
    }

    #[test]
    fn scenario_3_two_references_distinguished() {
        let two_ref = IndexImage::build(
            &[
                ("chr1".to_string(), b"ACGT".to_vec()),
                ("chr2".to_string(), b"GGGG".to_vec()),
            ],
            0,
        );
        let config = DriverConfig {
            k_len: 2,
            emit_ref_sets: true,
            print_header: false,
            ..Default::default()
        };
        let mut driver = Driver::new(&two_ref, None, config);
        let data = b">r\nCGGG\n";
        let mut source = TextReadSource::new(&data[..]);
        let mut out = Vec::new();
        driver.run(&mut source, &mut out, || false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "1 0");
        assert_eq!(lines[1], "1 1");
        assert_eq!(lines[2], "1 1");
    }

    #[test]
    fn header_line_echoes_bases() {
        let index = build("ACGTACGT");
        let config = DriverConfig {
            k_len: 3,
            emit_ref_sets: false,
            print_header: true,
            ..Default::default()
        };
        let mut driver = Driver::new(&index, None, config);
        let data = b">r\nACNGT\n";
        let mut source = TextReadSource::new(&data[..]);
        let mut out = Vec::new();
        let stats = driver.run(&mut source, &mut out, || false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some("#ACNGT"));
        // reference-set output disabled: only the header line, no window lines.
        assert_eq!(text.lines().count(), 1);
        assert_eq!(stats.windows_emitted, 3);
    }

    #[test]
    fn empty_interval_emits_zero_with_no_rids() {
        let index = build("ACGTACGT");
        let config = DriverConfig {
            k_len: 3,
            emit_ref_sets: true,
            print_header: false,
            ..Default::default()
        };
        let mut driver = Driver::new(&index, None, config);
        let data = b">r\nTTTTT\n";
        let mut source = TextReadSource::new(&data[..]);
        let mut out = Vec::new();
        driver.run(&mut source, &mut out, || false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().all(|l| l == "0"));
    }
}
