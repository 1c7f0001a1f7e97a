//! Error types for download operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching a remote file.
#[derive(Error, Debug)]
pub enum FetchError {
    /// I/O error during file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// HTTP request error during download.
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// The server answered with a non-success status code.
    #[error("Request to {url} failed: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Required metadata fields were missing from the metadata response.
    #[error("Metadata for file id '{file_id}' could not be retrieved")]
    MetadataUnavailable { file_id: String },

    /// A slice was requested with bounds that cannot be fetched.
    #[error("Invalid slice bounds: start={start}, length={length}")]
    InvalidSliceBounds { start: u64, length: u64 },

    /// A slice temp file did not end up with exactly the requested length.
    #[error(
        "Slice error: received={actual}, requested={expected}, start={start}, file='{}'",
        .path.display()
    )]
    SliceSizeMismatch {
        path: PathBuf,
        start: u64,
        expected: u64,
        actual: u64,
    },

    /// The slices on disk do not add up to the size of the file.
    #[error("Downloaded slices total {actual} bytes, expected {expected} bytes")]
    TotalSizeMismatch { expected: u64, actual: u64 },

    /// The assembled file does not match the checksum supplied by the server.
    #[error(
        "Download process expected md5 value '{expected}' but got '{computed}' for '{}'",
        .path.display()
    )]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        computed: String,
    },

    /// General download failure (worker panics, cancelled tasks).
    #[error("Download failed: {0}")]
    DownloadFailed(String),
}

impl FetchError {
    /// Returns true when a fresh whole-file attempt may succeed where this one failed.
    ///
    /// Missing metadata and impossible slice bounds will not change between
    /// attempts, so they end the retry loop immediately.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::MetadataUnavailable { .. } | FetchError::InvalidSliceBounds { .. }
        )
    }
}
