//! Slice merging logic.

use crate::error::FetchError;
use crate::types::SliceSpec;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// Concatenates slice temp files into `destination` in ascending offset order,
/// then removes the temp files.
///
/// Slices may be passed in any order. Lengths are not re-checked here; the
/// caller has already compared the slice total with the expected size.
///
/// # Arguments
///
/// * `slices` - Completed slices of one file
/// * `destination` - Output file path, truncated if it exists
///
/// # Returns
///
/// The number of bytes written to `destination`.
pub async fn merge_slices(slices: &[SliceSpec], destination: &Path) -> Result<u64, FetchError> {
    let mut ordered: Vec<&SliceSpec> = slices.iter().collect();
    ordered.sort_by_key(|slice| slice.start);

    let mut output = BufWriter::with_capacity(
        4 * 1024 * 1024,
        tokio::fs::File::create(destination).await?,
    );

    let mut written = 0;
    for slice in &ordered {
        let mut part = tokio::fs::File::open(&slice.path).await?;
        written += tokio::io::copy(&mut part, &mut output).await?;
    }
    output.flush().await?;

    for slice in &ordered {
        debug!("Removing slice '{}'", slice.path.display());
        tokio::fs::remove_file(&slice.path).await?;
    }

    info!(
        "Merged {} slice(s) into '{}' ({} bytes)",
        ordered.len(),
        destination.display(),
        written
    );
    Ok(written)
}
