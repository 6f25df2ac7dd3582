//! Error types for reading a FAT12 image.
//!
//! Errors come in two flavours. Session errors (the image can't be opened, the
//! boot record describes an impossible layout, the store stops answering) end
//! the scan. File errors only affect the entry being processed: the entry is
//! reported as unreadable and the scan moves on to the next slot.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a FAT12 image.
#[derive(Error, Debug)]
pub enum FAT12Error {
    /// The backing image could not be opened.
    #[error("Could not open image {path}: {source}")]
    StoreOpenFailure {
        /// Path of the image
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The boot record describes a geometry that can't exist.
    #[error("Malformed layout: {0}")]
    MalformedLayout(String),

    /// An allocation table lookup fell outside the loaded table.
    #[error(
        "Allocation table index out of range: cluster {cluster} needs byte {byte_index}, table holds {table_len} bytes"
    )]
    TableIndexOutOfRange {
        /// Cluster whose entry was requested
        cluster: u16,
        /// Byte index of the entry pair
        byte_index: usize,
        /// Size of one table copy in bytes
        table_len: usize,
    },

    /// A cluster chain got longer than the configured limit.
    #[error("Cluster chain starting at {start} exceeds the limit of {limit} clusters")]
    ChainLengthExceeded {
        /// First cluster of the chain
        start: u16,
        /// Configured maximum chain length
        limit: u32,
    },

    /// The image returned fewer bytes than a fixed-size read asked for.
    #[error("Truncated read at offset {offset}: expected {expected} bytes, got {actual}")]
    TruncatedRead {
        /// Absolute offset of the read
        offset: u64,
        /// Requested length
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// A seek or read failed for a reason other than a short image.
    #[error("I/O error reading image: {0}")]
    StoreRead(io::Error),

    /// A chain link points outside the data section.
    #[error("Invalid cluster {cluster}: the data section holds {cluster_count} clusters from cluster 2")]
    InvalidCluster {
        /// Offending cluster number
        cluster: u16,
        /// Number of clusters in the data section
        cluster_count: u32,
    },

    /// A fixed-size record could not be decoded.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The requested file is not in the root directory.
    #[error("File not found in root directory: {0}")]
    FileNotFound(String),
}

impl FAT12Error {
    /// Returns true if the error ends the whole session rather than a single
    /// file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FAT12Error::StoreOpenFailure { .. }
                | FAT12Error::MalformedLayout(_)
                | FAT12Error::StoreRead(_)
        )
    }
}

/// Converts standard I/O errors into FAT12Error.
impl From<io::Error> for FAT12Error {
    fn from(err: io::Error) -> Self {
        FAT12Error::StoreRead(err)
    }
}
