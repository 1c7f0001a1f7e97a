//! File verification utilities (MD5 checksums and the checksum sidecar).

use crate::error::FetchError;
use crate::types::{ChecksumStatus, CHECKSUM_SIDECAR_SUFFIX};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Length of a hex-encoded md5 digest.
const MD5_HEX_LEN: usize = 32;

/// Computes the MD5 hash of a local file, optionally limited to its first `limit` bytes.
///
/// This function reads the file in chunks to avoid loading large files
/// entirely into memory. It runs in a blocking task to avoid blocking
/// the async runtime.
///
/// # Returns
///
/// The MD5 hash as a lowercase hexadecimal string, or an error.
pub async fn compute_file_md5(path: &Path, limit: Option<u64>) -> Result<String, FetchError> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<String, FetchError> {
        use md5::{Digest, Md5};
        use std::io::Read;

        let file = std::fs::File::open(&path)?;
        let reader = std::io::BufReader::with_capacity(1024 * 1024, file);
        let mut reader = reader.take(limit.unwrap_or(u64::MAX));

        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| FetchError::DownloadFailed(format!("Task join error: {}", e)))?
}

/// Path of the checksum sidecar kept next to `output`.
pub fn sidecar_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(CHECKSUM_SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// A server checksum is only trusted if it has the length of an md5 hex digest.
pub fn is_well_formed_checksum(checksum: &str) -> bool {
    checksum.len() == MD5_HEX_LEN
}

fn checksums_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

pub(crate) fn print_local_file_info(prefix: &str, path: &Path, size: u64, md5: &str) {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    info!(
        "{}'{}'({} bytes, md5={})",
        prefix,
        absolute.display(),
        size,
        md5
    );
}

/// Checks whether `output` already holds the expected content.
///
/// A sidecar recording `expected_checksum` next to a file of exactly `size`
/// bytes is accepted without hashing. Otherwise the first `size` bytes are
/// hashed and compared. A missing file is simply not a match.
pub async fn local_copy_matches(
    output: &Path,
    expected_checksum: &str,
    size: u64,
) -> Result<bool, FetchError> {
    let file_size = match tokio::fs::metadata(output).await {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    if file_size == size {
        if let Ok(recorded) = tokio::fs::read_to_string(sidecar_path(output)).await {
            if checksums_equal(recorded.trim(), expected_checksum) {
                return Ok(true);
            }
        }
    }

    let local_md5 = compute_file_md5(output, Some(size)).await?;
    Ok(checksums_equal(&local_md5, expected_checksum))
}

/// Verifies the assembled file against the server checksum.
///
/// - A malformed server value skips verification with a warning and the file is kept.
/// - A match records the digest in the sidecar for later short-circuit checks.
/// - A mismatch deletes `path` and returns `ChecksumMismatch` with both values.
pub async fn verify_download(
    path: &Path,
    expected_checksum: &str,
    size: u64,
) -> Result<ChecksumStatus, FetchError> {
    info!("Calculating md5 (this operation can take a long time depending on the file size)");
    let received_md5 = compute_file_md5(path, Some(size)).await?;

    info!("Verifying file checksum");
    if !is_well_formed_checksum(expected_checksum) {
        warn!(
            "Unable to obtain valid MD5 from the server (received: '{}'). Can't validate download of '{}'",
            expected_checksum,
            path.display()
        );
        print_local_file_info("Saved to : ", path, size, &received_md5);
        return Ok(ChecksumStatus::Unverified {
            computed: received_md5,
            server: expected_checksum.to_string(),
        });
    }

    if !checksums_equal(&received_md5, expected_checksum) {
        tokio::fs::remove_file(path).await?;
        return Err(FetchError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected_checksum.to_string(),
            computed: received_md5,
        });
    }

    tokio::fs::write(sidecar_path(path), received_md5.as_bytes()).await?;
    print_local_file_info("Saved to : ", path, size, &received_md5);
    Ok(ChecksumStatus::Verified(received_md5))
}
