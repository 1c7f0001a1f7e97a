//! Remote file descriptors and metadata fetching.

use crate::client::DataClient;
use crate::error::FetchError;
use crate::genomic::GenomicRange;
use crate::types::IV_SIZE;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension carried by encrypted archive names that the plain download drops.
const ENCRYPTED_EXTENSION: &str = ".cip";

/// Raw response of the metadata endpoint. Every field may be absent.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MetadataResponse {
    display_file_name: Option<String>,
    file_name: Option<String>,
    file_size: Option<u64>,
    unencrypted_checksum: Option<String>,
}

/// Fully populated metadata of a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    display_name: String,
    canonical_name: String,
    size: u64,
    expected_checksum: String,
}

impl FileMetadata {
    pub fn new(
        display_name: impl Into<String>,
        canonical_name: impl Into<String>,
        size: u64,
        expected_checksum: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            canonical_name: canonical_name.into(),
            size,
            expected_checksum: expected_checksum.into(),
        }
    }

    /// Name the file was submitted under.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Name the archive stores the file under.
    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    /// Declared size in bytes, including the IV.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Hex md5 of the unencrypted content as reported by the server.
    pub fn expected_checksum(&self) -> &str {
        &self.expected_checksum
    }

    /// Number of bytes a plain transfer actually delivers.
    pub fn transfer_size(&self) -> u64 {
        self.size.saturating_sub(IV_SIZE)
    }
}

/// A remote file identified by its archive id.
///
/// Metadata is loaded explicitly through [`FileEntity::ensure_metadata_loaded`];
/// no accessor performs network I/O.
#[derive(Debug, Clone)]
pub struct FileEntity {
    id: String,
    metadata: Option<FileMetadata>,
}

impl FileEntity {
    /// Creates a descriptor whose metadata still has to be loaded.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: None,
        }
    }

    /// Creates a descriptor from metadata obtained elsewhere (e.g. a listing).
    pub fn with_metadata(id: impl Into<String>, metadata: FileMetadata) -> Self {
        Self {
            id: id.into(),
            metadata: Some(metadata),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Metadata if it has been loaded.
    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    /// Loads the metadata with one request unless it is already present.
    ///
    /// All fields are set together from a single response; if any of them is
    /// missing nothing is stored and `MetadataUnavailable` is returned.
    pub async fn ensure_metadata_loaded(
        &mut self,
        client: &DataClient,
    ) -> Result<&FileMetadata, FetchError> {
        if self.metadata.is_none() {
            let response: MetadataResponse = client
                .get_json(&format!("/metadata/files/{}", self.id))
                .await?;
            self.metadata = Some(hydrate(&self.id, response)?);
        }

        self.metadata
            .as_ref()
            .ok_or_else(|| FetchError::MetadataUnavailable {
                file_id: self.id.clone(),
            })
    }

    /// Default output location: `<folder>/<id>/<display name>`, minus the
    /// encrypted extension and with a suffix describing a genomic range if any.
    pub fn generate_output_filename(
        &self,
        folder: &Path,
        genomic_range: Option<&GenomicRange>,
    ) -> Result<PathBuf, FetchError> {
        let metadata = self
            .metadata
            .as_ref()
            .ok_or_else(|| FetchError::MetadataUnavailable {
                file_id: self.id.clone(),
            })?;

        let display_name = metadata.display_name();
        let display_name = display_name
            .strip_suffix(ENCRYPTED_EXTENSION)
            .unwrap_or(display_name);
        let base = Path::new(display_name);
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut ext = base
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut suffix = String::new();
        if let Some(range) = genomic_range.filter(|r| r.is_genomic_range()) {
            suffix = format!(
                "_genomic_range_{}_{}_{}",
                range.reference_label(),
                range.start.unwrap_or(0),
                range.end.map(|e| e.to_string()).unwrap_or_default()
            );
            let format_ext = format!(
                ".{}",
                range.format.as_deref().unwrap_or("").trim().to_lowercase()
            );
            if format_ext != ext && format_ext.len() > 1 {
                ext.push_str(&format_ext);
            }
        }

        let output = folder
            .join(&self.id)
            .join(format!("{}{}{}", stem, suffix, ext));
        debug!("Output file: '{}'", output.display());
        Ok(output)
    }
}

fn hydrate(file_id: &str, response: MetadataResponse) -> Result<FileMetadata, FetchError> {
    match response {
        MetadataResponse {
            display_file_name: Some(display_name),
            file_name: Some(canonical_name),
            file_size: Some(size),
            unencrypted_checksum: Some(expected_checksum),
        } => Ok(FileMetadata {
            display_name,
            canonical_name,
            size,
            expected_checksum,
        }),
        _ => Err(FetchError::MetadataUnavailable {
            file_id: file_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(display_name: &str) -> FileEntity {
        FileEntity::with_metadata(
            "EGAF00000000001",
            FileMetadata::new(display_name, "stored.bam.cip", 1016, "a".repeat(32)),
        )
    }

    #[test]
    fn transfer_size_excludes_iv() {
        let metadata = FileMetadata::new("reads.bam", "reads.bam.cip", 1016, "");
        assert_eq!(metadata.transfer_size(), 1000);
    }

    #[test]
    fn hydrate_requires_every_field() {
        let partial = MetadataResponse {
            display_file_name: Some("reads.bam".to_string()),
            file_name: Some("reads.bam.cip".to_string()),
            file_size: Some(1016),
            unencrypted_checksum: None,
        };
        let err = hydrate("EGAF01", partial).unwrap_err();
        assert!(matches!(err, FetchError::MetadataUnavailable { file_id } if file_id == "EGAF01"));
    }

    #[test]
    fn metadata_response_uses_camel_case_fields() {
        let response: MetadataResponse = serde_json::from_str(
            r#"{"displayFileName":"a.bam","fileName":"a.bam.cip","fileSize":116,"unencryptedChecksum":"abc"}"#,
        )
        .unwrap();
        let metadata = hydrate("EGAF01", response).unwrap();
        assert_eq!(metadata.display_name(), "a.bam");
        assert_eq!(metadata.canonical_name(), "a.bam.cip");
        assert_eq!(metadata.size(), 116);
        assert_eq!(metadata.expected_checksum(), "abc");
    }

    #[test]
    fn output_filename_strips_encrypted_extension() {
        let output = entity("reads.bam.cip")
            .generate_output_filename(Path::new("/data"), None)
            .unwrap();
        assert_eq!(output, PathBuf::from("/data/EGAF00000000001/reads.bam"));
    }

    #[test]
    fn output_filename_describes_genomic_range() {
        let range = GenomicRange {
            reference_name: Some("chr1".to_string()),
            reference_md5: None,
            start: Some(100),
            end: Some(200),
            format: Some("CRAM".to_string()),
        };
        let output = entity("reads.bam")
            .generate_output_filename(Path::new("/data"), Some(&range))
            .unwrap();
        assert_eq!(
            output,
            PathBuf::from("/data/EGAF00000000001/reads_genomic_range_chr1_100_200.bam.cram")
        );
    }

    #[test]
    fn output_filename_needs_metadata() {
        let err = FileEntity::new("EGAF01")
            .generate_output_filename(Path::new("/data"), None)
            .unwrap_err();
        assert!(matches!(err, FetchError::MetadataUnavailable { .. }));
    }
}
