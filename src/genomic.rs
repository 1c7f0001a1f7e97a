//! Genomic sub-range retrieval.
//!
//! Fetching a coordinate-restricted part of a file goes through an external
//! retrieval protocol with its own retry and streaming behaviour. This module
//! only describes the request and hands it to a [`GenomicRangeRetriever`].

use crate::client::DataClient;
use crate::error::FetchError;
use crate::types::DownloadConfig;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Coordinates of a genomic sub-range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomicRange {
    pub reference_name: Option<String>,
    pub reference_md5: Option<String>,
    pub start: Option<u64>,
    pub end: Option<u64>,
    /// Target format, e.g. `BAM` or `CRAM`.
    pub format: Option<String>,
}

impl GenomicRange {
    /// A range is only meaningful once a reference is named.
    pub fn is_genomic_range(&self) -> bool {
        self.reference_name.is_some() || self.reference_md5.is_some()
    }

    pub(crate) fn reference_label(&self) -> &str {
        self.reference_name
            .as_deref()
            .or(self.reference_md5.as_deref())
            .unwrap_or("")
    }
}

/// Everything the retrieval collaborator needs for one request.
#[derive(Debug, Clone)]
pub struct GenomicRangeRequest {
    /// Collaborator endpoint for the file, `<base>/files/<id>`.
    pub url: String,
    pub file_id: String,
    pub range: GenomicRange,
    /// `None` means unlimited retries.
    pub max_retries: Option<u64>,
    pub retry_wait: Duration,
    pub bearer_token: Option<String>,
}

/// External service that streams a genomic sub-range into a local file.
pub trait GenomicRangeRetriever {
    fn retrieve(
        &self,
        request: &GenomicRangeRequest,
        output: &Path,
    ) -> impl Future<Output = Result<(), FetchError>> + Send;
}

/// Delegates a genomic sub-range download to `retriever`.
///
/// `retrieval_base_url` is the collaborator's base URL. The bearer credential
/// comes from `client` and the retry budget from `config`.
pub async fn download_genomic_range<R: GenomicRangeRetriever>(
    retriever: &R,
    client: &DataClient,
    retrieval_base_url: &str,
    file_id: &str,
    range: &GenomicRange,
    output: &Path,
    config: &DownloadConfig,
) -> Result<PathBuf, FetchError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let request = GenomicRangeRequest {
        url: format!(
            "{}/files/{}",
            retrieval_base_url.trim_end_matches('/'),
            file_id
        ),
        file_id: file_id.to_string(),
        range: range.clone(),
        max_retries: u64::try_from(config.max_retries).ok(),
        retry_wait: config.retry_wait,
        bearer_token: client.bearer_token().map(str::to_string),
    };
    retriever.retrieve(&request, output).await?;

    let size = tokio::fs::metadata(output).await?.len();
    info!(
        "Saved to : '{}'({} bytes, referenceName={:?}, referenceMD5={:?}, start={:?}, end={:?}, format={:?})",
        output.display(),
        size,
        range.reference_name,
        range.reference_md5,
        range.start,
        range.end,
        range.format
    );
    Ok(output.to_path_buf())
}
