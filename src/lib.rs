//! SliceFetch - Parallel, resumable, checksum-verified downloads of very large archive files
//!
//! This library retrieves files of up to hundreds of gigabytes from a remote
//! archive using HTTP range requests, and checks the result against the md5
//! the archive reports for the unencrypted content.
//!
//! # Features
//!
//! - **Parallel Slices**: Split a file into up to 128 byte ranges fetched concurrently
//! - **Resumable Downloads**: Slice temp files resume from their on-disk size
//! - **MD5 Verification**: Verify the merged file and keep a `.md5` sidecar
//! - **Automatic Retry**: Whole-file attempts retried with a fixed delay
//! - **Progress Tracking**: Real-time byte progress shared by all workers
//!
//! # Example
//!
//! ```no_run
//! use slicefetch::{download_file_retry, DataClient, DownloadConfig, FileEntity};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DataClient::new("https://archive.example/data");
//! let mut file = FileEntity::new("EGAF00000000001");
//! let config = DownloadConfig {
//!     connections: 8,
//!     ..DownloadConfig::default()
//! };
//!
//! download_file_retry(&client, &mut file, None, &config).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod genomic;
pub mod merge;
pub mod metadata;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod types;
pub mod utils;
pub mod verify;

pub use client::DataClient;
pub use coordinator::{AttemptOutcome, DownloadAttempt};
pub use error::FetchError;
pub use fetcher::fetch_slice;
pub use genomic::{download_genomic_range, GenomicRange, GenomicRangeRequest, GenomicRangeRetriever};
pub use merge::merge_slices;
pub use metadata::{FileEntity, FileMetadata};
pub use orchestrator::download_file_retry;
pub use planner::{plan_slices, SlicePlan};
pub use progress::TransferProgress;
pub use types::{
    ChecksumStatus, CompleteSlicePolicy, DownloadConfig, DownloadOutcome, SliceSpec,
};
pub use verify::{compute_file_md5, local_copy_matches, sidecar_path, verify_download};
