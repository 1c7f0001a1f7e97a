//! Main orchestration logic: whole-file attempts with bounded retries.

use crate::client::DataClient;
use crate::coordinator::{AttemptOutcome, DownloadAttempt};
use crate::error::FetchError;
use crate::metadata::FileEntity;
use crate::planner::plan_slices;
use crate::types::{DownloadConfig, DownloadOutcome};
use crate::utils::log_disk_usage;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_retry2::strategy::FixedInterval;
use tokio_retry2::{Retry, RetryError};
use tracing::{error, info, warn};

/// Downloads a file with whole-attempt retries.
///
/// This is the main entry point. It performs the following steps:
///
/// 1. Loads the file metadata if it is not already known
/// 2. Resolves the output path (`<cwd>/<id>/<display name>` when `output` is `None`)
/// 3. Runs attempts of plan, fetch, merge and verify, waiting
///    `config.retry_wait` after each failure, for at most
///    `config.max_retries + 1` attempts (unlimited if negative)
/// 4. On exhaustion, optionally removes slice temp files and returns the
///    last attempt's error unchanged
///
/// # Example
///
/// ```no_run
/// use slicefetch::{download_file_retry, DataClient, DownloadConfig, FileEntity};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DataClient::new("https://archive.example/data");
/// let mut file = FileEntity::new("EGAF00000000001");
/// let config = DownloadConfig { connections: 8, ..DownloadConfig::default() };
/// download_file_retry(&client, &mut file, None, &config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn download_file_retry(
    client: &DataClient,
    file: &mut FileEntity,
    output: Option<PathBuf>,
    config: &DownloadConfig,
) -> Result<DownloadOutcome, FetchError> {
    let metadata = file.ensure_metadata_loaded(client).await?.clone();
    let file_id = file.id().to_string();

    if metadata.canonical_name().ends_with(".gpg") {
        let reason = format!(
            "GPG files are not supported ('{}')",
            metadata.canonical_name()
        );
        info!("{}", reason);
        return Ok(DownloadOutcome::Skipped { reason });
    }

    info!("File Id: '{}'({} bytes).", file_id, metadata.size());

    let output = match output {
        Some(path) => path,
        None => file.generate_output_filename(&std::env::current_dir()?, None)?,
    };
    let output_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(output_dir).await?;
    log_disk_usage(output_dir);

    let result = retry_attempts(config.max_retries, config.retry_wait, |number| {
        DownloadAttempt::new(number, client, &file_id, &metadata, &output, config).run()
    })
    .await;

    match result {
        Ok((attempts, AttemptOutcome::AlreadyPresent)) => {
            info!("'{}' already present after {} attempt(s)", output.display(), attempts);
            Ok(DownloadOutcome::AlreadyPresent)
        }
        Ok((attempts, AttemptOutcome::Downloaded(checksum))) => {
            Ok(DownloadOutcome::Downloaded { attempts, checksum })
        }
        Err(e) => {
            if config.delete_temporary_files {
                let plan = plan_slices(
                    &output,
                    metadata.transfer_size(),
                    config.connections,
                    config.parallel_threshold,
                );
                delete_temporary_files(plan.slices.iter().map(|s| s.path.as_path())).await;
            }
            Err(e)
        }
    }
}

/// Number of waits between attempts for a retry setting; negative is unlimited.
fn retry_budget(max_retries: i64) -> usize {
    usize::try_from(max_retries).unwrap_or(usize::MAX)
}

/// Runs `attempt` until it succeeds, a permanent error occurs or the retry
/// budget is spent, sleeping `retry_wait` between failed attempts.
///
/// Attempts are numbered from 1 and never overlap. The error of the last
/// attempt is returned as-is.
///
/// # Returns
///
/// The number of attempts made and the successful attempt's value.
pub(crate) async fn retry_attempts<T, F, Fut>(
    max_retries: i64,
    retry_wait: Duration,
    mut attempt: F,
) -> Result<(u32, T), FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let retry_strategy = FixedInterval::new(retry_wait).take(retry_budget(max_retries));
    let mut number = 0u32;

    let result = Retry::spawn(retry_strategy, || {
        number += 1;
        let current = number;
        if current > 1 {
            info!("retry attempt {}", current - 1);
        }
        let fut = attempt(current);

        async move {
            match fut.await {
                Ok(value) => Ok((current, value)),
                Err(e) if e.is_retryable() => {
                    warn!("Download attempt {} failed: {}", current, e);
                    RetryError::to_transient(e)
                }
                Err(e) => {
                    warn!("Download attempt {} failed permanently: {}", current, e);
                    RetryError::to_permanent(e)
                }
            }
        }
    })
    .await;

    if let Err(e) = &result {
        error!("Giving up after {} attempt(s): {}", number, e);
    }
    result
}

/// Removes slice temp files, ignoring ones that do not exist.
pub(crate) async fn delete_temporary_files<'a>(paths: impl IntoIterator<Item = &'a Path>) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => info!("Deleted temporary file '{}'", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("Could not delete the temporary file '{}': {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn mismatch() -> FetchError {
        FetchError::SliceSizeMismatch {
            path: PathBuf::from("out-from-0-len-10.slice"),
            start: 0,
            expected: 10,
            actual: 3,
        }
    }

    #[test]
    fn negative_retry_setting_is_unlimited() {
        assert_eq!(retry_budget(-1), usize::MAX);
        assert_eq!(retry_budget(0), 0);
        assert_eq!(retry_budget(3), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_last_allowed_attempt_after_waiting_between_failures() {
        let wait = Duration::from_secs(5);
        let started = Instant::now();

        let (attempts, value) = retry_attempts(2, wait, |number| async move {
            if number <= 2 {
                Err(mismatch())
            } else {
                Ok("verified")
            }
        })
        .await
        .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(value, "verified");
        let elapsed = started.elapsed();
        assert!(elapsed >= wait * 2, "slept {elapsed:?}");
        assert!(elapsed < wait * 3, "slept {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_error_unchanged() {
        let mut calls = 0;
        let err = retry_attempts(1, Duration::from_secs(1), |number| {
            calls += 1;
            async move {
                Err::<(), _>(FetchError::SliceSizeMismatch {
                    path: PathBuf::from("s"),
                    start: 0,
                    expected: 10,
                    actual: number as u64,
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 2);
        assert!(matches!(err, FetchError::SliceSizeMismatch { actual: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let started = Instant::now();
        let mut calls = 0;
        let result = retry_attempts(0, Duration::from_secs(30), |_| {
            calls += 1;
            async { Err::<(), _>(mismatch()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_retries_keep_going() {
        let (attempts, _) = retry_attempts(-1, Duration::from_secs(60), |number| async move {
            if number < 20 {
                Err(mismatch())
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(attempts, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_stops_immediately() {
        let mut calls = 0;
        let err = retry_attempts(5, Duration::from_secs(1), |_| {
            calls += 1;
            async {
                Err::<(), _>(FetchError::MetadataUnavailable {
                    file_id: "EGAF01".to_string(),
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, FetchError::MetadataUnavailable { .. }));
    }
}
