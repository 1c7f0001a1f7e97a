//! Resumable download of a single slice.

use crate::client::DataClient;
use crate::error::FetchError;
use crate::progress::TransferProgress;
use crate::types::{CompleteSlicePolicy, SliceSpec, SLICE_CHUNK_SIZE};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

/// Downloads one slice of `file_id` into its temp file, resuming a partial copy.
///
/// The temp file's size on disk is the resume cursor:
/// - larger than the slice: the file is discarded and fetched from the slice start;
/// - equal to the slice: handled per `policy` (accepted as-is by default);
/// - smaller: only the missing tail is requested and appended.
///
/// The body is written in [`SLICE_CHUNK_SIZE`] pieces and `progress` advances
/// after each write. The finished temp file must be exactly `slice.length`
/// bytes, otherwise `SliceSizeMismatch` is returned.
///
/// # Returns
///
/// The path of the completed temp file.
pub async fn fetch_slice(
    client: &DataClient,
    file_id: &str,
    slice: &SliceSpec,
    policy: CompleteSlicePolicy,
    progress: &TransferProgress,
) -> Result<PathBuf, FetchError> {
    if slice.length == 0 || slice.start.checked_add(slice.length).is_none() {
        return Err(FetchError::InvalidSliceBounds {
            start: slice.start,
            length: slice.length,
        });
    }

    let mut existing_size = on_disk_size(&slice.path).await?;
    if existing_size > slice.length {
        warn!(
            "Slice '{}' has {} bytes but only {} were requested, fetching it again",
            slice.path.display(),
            existing_size,
            slice.length
        );
        tokio::fs::remove_file(&slice.path).await?;
        existing_size = 0;
    }

    if existing_size == slice.length {
        match policy {
            CompleteSlicePolicy::AcceptByLength => {
                debug!("Slice '{}' already complete", slice.path.display());
                progress.inc(existing_size);
                return Ok(slice.path.clone());
            }
            CompleteSlicePolicy::Refetch => {
                debug!("Refetching complete slice '{}'", slice.path.display());
                tokio::fs::remove_file(&slice.path).await?;
                existing_size = 0;
            }
        }
    }
    progress.inc(existing_size);

    let response = client
        .get_file_range(file_id, slice.start + existing_size, slice.end_inclusive())
        .await?;

    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&slice.path)
        .await?;
    let mut file_out = BufWriter::with_capacity(SLICE_CHUNK_SIZE, file);

    let mut byte_stream = response.bytes_stream();
    while let Some(piece) = byte_stream.next().await {
        let piece = piece?;
        for chunk in piece.chunks(SLICE_CHUNK_SIZE) {
            file_out.write_all(chunk).await?;
            progress.inc(chunk.len() as u64);
        }
    }
    file_out.flush().await?;

    let total_received = on_disk_size(&slice.path).await?;
    if total_received != slice.length {
        return Err(FetchError::SliceSizeMismatch {
            path: slice.path.clone(),
            start: slice.start,
            expected: slice.length,
            actual: total_received,
        });
    }

    Ok(slice.path.clone())
}

async fn on_disk_size(path: &Path) -> Result<u64, FetchError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}
