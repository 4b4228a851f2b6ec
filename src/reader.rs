//! Read-stream input (external collaborator per the design notes,
//! given one concrete implementation here so the CLI is runnable
//! end-to-end). A [`ReadSource`] delivers decoded base sequences in
//! fixed-size batches; [`TextReadSource`] implements it over plain-text
//! FASTA and FASTQ records. The binary/packed alignment-container
//! format spec.md also names is left as an interface extension point —
//! only the text path has a concrete reader.

use std::io::{BufRead, BufReader, Read as IoRead};

use crate::alphabet::{decode_sequence, Symbol};
use crate::error::{Error, Result};

/// Default batch size pulled from a [`ReadSource`] at a time.
pub const DEFAULT_BATCH_SIZE: usize = 1 << 18;

/// Which mate(s) of a paired-end run to accept, mirroring the
/// first-of-pair/second-of-pair filters spec.md's CLI surface names
/// for the binary alignment-container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateFilter {
    SingleEnd,
    FirstOfPair,
    SecondOfPair,
}

/// One decoded read: its opaque identifier (the FASTA/FASTQ header, sans
/// the leading `>`/`@`) and its base sequence.
#[derive(Debug, Clone)]
pub struct Read {
    pub id: String,
    pub bases: Vec<Symbol>,
}

/// A source of read batches. The read-stream driver (C6) pulls batches
/// until `next_batch` returns an empty `Vec`, which signals end-of-stream.
pub trait ReadSource {
    /// Pull up to `batch_size` reads. Malformed records are skipped and
    /// counted rather than failing the whole batch (spec.md §7: a
    /// malformed read is non-fatal).
    fn next_batch(&mut self, batch_size: usize) -> Result<Vec<Read>>;

    /// Number of malformed records skipped so far.
    fn malformed_count(&self) -> u64;
}

enum Format {
    Fasta,
    Fastq,
}

/// Reads plain-text FASTA (`>id` then one sequence line) or FASTQ
/// (4-line records) from a buffered byte stream, sniffing the format
/// from the first non-empty byte (`>` vs `@`).
pub struct TextReadSource<R> {
    lines: std::io::Lines<BufReader<R>>,
    format: Option<Format>,
    malformed: u64,
}

impl<R: IoRead> TextReadSource<R> {
    pub fn new(inner: R) -> Self {
        TextReadSource {
            lines: BufReader::new(inner).lines(),
            format: None,
            malformed: 0,
        }
    }

    fn sniff(&mut self, first_line: &str) -> Option<Format> {
        match first_line.as_bytes().first() {
            Some(b'>') => Some(Format::Fasta),
            Some(b'@') => Some(Format::Fastq),
            _ => None,
        }
    }

    fn next_record(&mut self) -> Result<Option<Read>> {
        let Some(header) = self.lines.next() else {
            return Ok(None);
        };
        let header = header?;
        if header.trim().is_empty() {
            return self.next_record();
        }
        if self.format.is_none() {
            self.format = self.sniff(&header);
        }
        let Some(format) = &self.format else {
            self.malformed += 1;
            return Err(Error::MalformedRead(format!(
                "record does not start with '>' or '@': {header:?}"
            )));
        };
        match format {
            Format::Fasta => {
                if !header.starts_with('>') {
                    self.malformed += 1;
                    return Err(Error::MalformedRead(format!(
                        "expected FASTA header, got {header:?}"
                    )));
                }
                let Some(seq_line) = self.lines.next() else {
                    self.malformed += 1;
                    return Err(Error::MalformedRead(
                        "FASTA header with no sequence line".to_string(),
                    ));
                };
                let seq_line = seq_line?;
                Ok(Some(Read {
                    id: header[1..].to_string(),
                    bases: decode_sequence(seq_line.as_bytes()),
                }))
            }
            Format::Fastq => {
                if !header.starts_with('@') {
                    self.malformed += 1;
                    return Err(Error::MalformedRead(format!(
                        "expected FASTQ header, got {header:?}"
                    )));
                }
                let (Some(seq_line), Some(plus_line), Some(qual_line)) =
                    (self.lines.next(), self.lines.next(), self.lines.next())
                else {
                    self.malformed += 1;
                    return Err(Error::MalformedRead(
                        "truncated FASTQ record".to_string(),
                    ));
                };
                let seq_line = seq_line?;
                let plus_line = plus_line?;
                let qual_line = qual_line?;
                if !plus_line.starts_with('+') {
                    self.malformed += 1;
                    return Err(Error::MalformedRead(format!(
                        "expected '+' separator, got {plus_line:?}"
                    )));
                }
                if qual_line.len() != seq_line.len() {
                    self.malformed += 1;
                    return Err(Error::MalformedRead(
                        "quality string length does not match sequence length".to_string(),
                    ));
                }
                Ok(Some(Read {
                    id: header[1..].to_string(),
                    bases: decode_sequence(seq_line.as_bytes()),
                }))
            }
        }
    }
}

impl<R: IoRead> ReadSource for TextReadSource<R> {
    fn next_batch(&mut self, batch_size: usize) -> Result<Vec<Read>> {
        let mut batch = Vec::with_capacity(batch_size.min(1024));
        while batch.len() < batch_size {
            match self.next_record() {
                Ok(Some(r)) => batch.push(r),
                Ok(None) => break,
                Err(Error::MalformedRead(reason)) => {
                    tracing::warn!(reason, "skipping malformed read record");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(batch)
    }

    fn malformed_count(&self) -> u64 {
        self.malformed
    }
}
