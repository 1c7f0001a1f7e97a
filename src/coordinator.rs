//! One whole-file download attempt: plan, fetch slices in parallel, merge, verify.

use crate::client::DataClient;
use crate::error::FetchError;
use crate::fetcher::fetch_slice;
use crate::merge::merge_slices;
use crate::metadata::FileMetadata;
use crate::planner::{plan_slices, SlicePlan};
use crate::progress::TransferProgress;
use crate::types::{ChecksumStatus, DownloadConfig};
use crate::verify::{local_copy_matches, print_local_file_info, verify_download};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The output already matched the expected checksum; nothing was fetched.
    AlreadyPresent,
    /// Slices were fetched, merged and checked.
    Downloaded(ChecksumStatus),
}

/// State of one attempt. Built fresh for every try so that nothing but the
/// slice temp files on disk carries over between retries.
#[derive(Debug)]
pub struct DownloadAttempt<'a> {
    number: u32,
    client: &'a DataClient,
    file_id: &'a str,
    metadata: &'a FileMetadata,
    output: &'a Path,
    config: &'a DownloadConfig,
    plan: SlicePlan,
    completed: Vec<PathBuf>,
}

impl<'a> DownloadAttempt<'a> {
    pub fn new(
        number: u32,
        client: &'a DataClient,
        file_id: &'a str,
        metadata: &'a FileMetadata,
        output: &'a Path,
        config: &'a DownloadConfig,
    ) -> Self {
        let plan = plan_slices(
            output,
            metadata.transfer_size(),
            config.connections,
            config.parallel_threshold,
        );
        Self {
            number,
            client,
            file_id,
            metadata,
            output,
            config,
            plan,
            completed: Vec::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn plan(&self) -> &SlicePlan {
        &self.plan
    }

    /// Runs the attempt to completion.
    ///
    /// Skips all network activity when the output already holds the expected
    /// content. Otherwise every slice is fetched on a pool bounded by the
    /// plan's connection count; the first slice failure fails the attempt
    /// once the remaining workers have drained.
    pub async fn run(mut self) -> Result<AttemptOutcome, FetchError> {
        let total_size = self.metadata.transfer_size();
        let check_sum = self.metadata.expected_checksum();

        if local_copy_matches(self.output, check_sum, total_size).await? {
            print_local_file_info("Local file exists:", self.output, total_size, check_sum);
            return Ok(AttemptOutcome::AlreadyPresent);
        }

        info!(
            "Download starting [using {} connection(s)]...",
            self.plan.connections
        );

        let progress = TransferProgress::new(total_size, self.config.show_progress);
        if let Err(e) = self.fetch_all(&progress).await {
            progress.abandon();
            return Err(e);
        }
        progress.finish_with_message("Download complete");

        self.check_total_size(total_size).await?;

        merge_slices(&self.plan.slices, self.output).await?;
        let status = verify_download(self.output, check_sum, total_size).await?;
        Ok(AttemptOutcome::Downloaded(status))
    }

    /// The completed slice files must add up to exactly `total_size` bytes.
    async fn check_total_size(&self, total_size: u64) -> Result<(), FetchError> {
        let mut downloaded_total = 0;
        for path in &self.completed {
            downloaded_total += tokio::fs::metadata(path).await?.len();
        }
        if downloaded_total != total_size {
            return Err(FetchError::TotalSizeMismatch {
                expected: total_size,
                actual: downloaded_total,
            });
        }
        Ok(())
    }

    async fn fetch_all(&mut self, progress: &TransferProgress) -> Result<(), FetchError> {
        let semaphore = Arc::new(Semaphore::new(self.plan.connections));
        let mut download_tasks = Vec::with_capacity(self.plan.slices.len());

        for slice in &self.plan.slices {
            let semaphore = Arc::clone(&semaphore);
            let client = self.client.clone();
            let file_id = self.file_id.to_string();
            let slice = slice.clone();
            let policy = self.config.complete_slice_policy;
            let progress = progress.clone();

            download_tasks.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| FetchError::DownloadFailed(format!("Worker pool closed: {}", e)))?;
                fetch_slice(&client, &file_id, &slice, policy, &progress).await
            }));
        }

        // Every worker is awaited so that no transfer outlives the attempt,
        // but only the first failure is reported.
        let mut first_error = None;
        for task in download_tasks {
            let result = task
                .await
                .map_err(|e| FetchError::DownloadFailed(format!("Task failed: {}", e)))
                .and_then(|r| r);
            match result {
                Ok(path) => self.completed.push(path),
                Err(e) if first_error.is_none() => {
                    error!("Slice download failed in attempt {}: {}", self.number, e);
                    first_error = Some(e);
                }
                Err(e) => debug!("Further slice failure in attempt {}: {}", self.number, e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
