//! HTTP access to the archive's metadata and data endpoints.

use crate::error::FetchError;
use reqwest::header::{AUTHORIZATION, RANGE};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Thin wrapper around a shared `reqwest::Client` bound to one archive.
///
/// Cloning is cheap; workers each hold a clone.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl DataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Attaches a bearer credential obtained elsewhere to every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.bearer_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Fetches `path` relative to the base URL and decodes it as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        info!("Retrieving metadata from {}", url);

        let response = self.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Requests bytes `start..=end` of the plain (IV-less) rendition of a file.
    ///
    /// The returned response is not consumed; callers stream its body.
    pub async fn get_file_range(
        &self,
        file_id: &str,
        start: u64,
        end: u64,
    ) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let range = format!("bytes={}-{}", start, end);
        debug!("Requesting {} of {}", range, url);

        let response = self
            .get(&url)
            .query(&[("destinationFormat", "plain")])
            .header(RANGE, range)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}
