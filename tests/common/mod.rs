//! Shared fixtures: a mock archive serving metadata and byte ranges.

#![allow(dead_code)]

use md5::{Digest, Md5};
use serde_json::json;
use slicefetch::{DataClient, DownloadConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const FILE_ID: &str = "EGAF00000000001";

/// Deterministic, non-repeating-looking payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Serves `bytes=a-b` requests from an in-memory payload.
///
/// The first `truncate` responses only carry half of the requested bytes.
/// Every Range header received is recorded.
#[derive(Clone)]
pub struct RangeResponder {
    payload: Arc<Vec<u8>>,
    truncate: Arc<AtomicUsize>,
    ranges: Arc<Mutex<Vec<String>>>,
}

impl RangeResponder {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload: Arc::new(payload),
            truncate: Arc::new(AtomicUsize::new(0)),
            ranges: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn truncating_first(self, responses: usize) -> Self {
        self.truncate.store(responses, Ordering::SeqCst);
        self
    }

    /// Range headers received so far, in arrival order.
    pub fn ranges(&self) -> Vec<String> {
        self.ranges.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.ranges.lock().unwrap().len()
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some(range) = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
        else {
            return ResponseTemplate::new(200).set_body_bytes(self.payload.as_slice());
        };
        self.ranges.lock().unwrap().push(range.clone());

        let bounds = range
            .strip_prefix("bytes=")
            .and_then(|r| r.split_once('-'))
            .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)));
        let Some((start, end)) = bounds else {
            return ResponseTemplate::new(416);
        };
        if start >= self.payload.len() || end < start {
            return ResponseTemplate::new(416);
        }
        let end = end.min(self.payload.len() - 1);

        let mut body = self.payload[start..=end].to_vec();
        let truncate = self
            .truncate
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if truncate {
            body.truncate(body.len() / 2);
        }

        ResponseTemplate::new(206)
            .insert_header(
                "content-range",
                format!("bytes {}-{}/{}", start, end, self.payload.len()).as_str(),
            )
            .set_body_bytes(body)
    }
}

/// Mounts the data endpoint for [`FILE_ID`] backed by `responder`.
pub async fn mount_data(server: &MockServer, responder: &RangeResponder) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{}", FILE_ID)))
        .and(query_param("destinationFormat", "plain"))
        .respond_with(responder.clone())
        .mount(server)
        .await;
}

/// Mounts the metadata endpoint for [`FILE_ID`]. `size` is the declared size,
/// i.e. the plain payload length plus the 16-byte IV.
pub async fn mount_metadata(server: &MockServer, display_name: &str, size: u64, checksum: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/metadata/files/{}", FILE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "displayFileName": display_name,
            "fileName": format!("{}.cip", display_name),
            "fileSize": size,
            "unencryptedChecksum": checksum,
        })))
        .mount(server)
        .await;
}

pub fn client(server: &MockServer) -> DataClient {
    DataClient::new(server.uri())
}

/// Config suited to tests: no progress bar, short waits, parallel from the first byte.
pub fn test_config(connections: usize, max_retries: i64) -> DownloadConfig {
    DownloadConfig {
        connections,
        max_retries,
        retry_wait: Duration::from_millis(10),
        parallel_threshold: 0,
        show_progress: false,
        ..DownloadConfig::default()
    }
}
