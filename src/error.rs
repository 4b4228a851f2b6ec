//! Error kinds surfaced by the index loader, the kLCP builder and the
//! read-stream driver: index-load failure, a kLCP/index mismatch, a
//! malformed read record, or an I/O failure on output.

use std::path::PathBuf;

/// Errors produced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to load FM-index at prefix `{prefix}`: {reason}")]
    IndexLoad { prefix: PathBuf, reason: String },

    #[error(
        "kLCP file `{path}` does not match the index: expected k={expected_k} L_total={expected_len}, found k={found_k} L_total={found_len}"
    )]
    KlcpMismatch {
        path: PathBuf,
        expected_k: usize,
        expected_len: u64,
        found_k: usize,
        found_len: u64,
    },

    #[error("malformed read record: {0}")]
    MalformedRead(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("(de)serialization failure: {0}")]
    Serialization(#[from] Box<bincode::ErrorKind>),
}

pub type Result<T> = std::result::Result<T, Error>;
