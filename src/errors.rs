//! # errors
//!
//! Error taxonomy for the library.
//!
//! Configuration errors (bad roots, empty splits) and data-integrity errors
//! (missing poses, labels, or archive entries) carry the offending
//! `(sequence, timestamp)` key so failures are diagnosable without rerunning
//! with extra logging. Cache corruption is handled internally and never
//! surfaces through this type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the data loaders and evaluation utilities.
#[derive(Error, Debug)]
pub enum DataError {
    /// The split directory contains no sequence directories.
    #[error("No sequences found under split directory: {split_dir}.")]
    EmptySplit {
        /// Scanned split directory.
        split_dir: PathBuf,
    },

    /// The sequence scan produced no capture files.
    #[error("No capture files found under split directory: {split_dir}.")]
    EmptyFileIndex {
        /// Scanned split directory.
        split_dir: PathBuf,
    },

    /// A capture index beyond the end of the file index.
    #[error("Capture index {index} is out of bounds (file index length {len}).")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// File index length.
        len: usize,
    },

    /// The pose table has no entry for a required timestamp.
    #[error("No pose found for timestamp {timestamp_ns} in sequence {log_id}.")]
    MissingPose {
        /// Sequence identifier.
        log_id: String,
        /// Queried timestamp (nanoseconds).
        timestamp_ns: u64,
    },

    /// Ground classification is required but absent from the capture.
    #[error("No ground labels for capture ({log_id}, {timestamp_ns}); cannot compute an evaluation mask.")]
    MissingGroundLabels {
        /// Sequence identifier.
        log_id: String,
        /// Capture timestamp (nanoseconds).
        timestamp_ns: u64,
    },

    /// Flow annotations are required but the capture pair has none.
    #[error("Missing flow annotations for capture ({log_id}, {timestamp_ns}).")]
    MissingFlowAnnotations {
        /// Sequence identifier.
        log_id: String,
        /// Capture timestamp (nanoseconds).
        timestamp_ns: u64,
    },

    /// The mask archive has no entry for the requested capture.
    #[error("No evaluation mask for capture ({log_id}, {timestamp_ns}) in archive {archive}.")]
    MaskNotFound {
        /// Sequence identifier.
        log_id: String,
        /// Capture timestamp (nanoseconds).
        timestamp_ns: u64,
        /// Archive path.
        archive: PathBuf,
    },

    /// Dataframe engine failure.
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Archive read/write failure.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    /// Contextual failure from path helpers.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
