//! Upload resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The backend takes the file as a multipart upload, so everything ends up in
//! memory. We check the PDF magic bytes (`%PDF`) before returning so callers
//! get a meaningful error instead of a vague extraction failure from the
//! backend.

use crate::error::ShortsError;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF ready to be posted to `/extract-text/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Wrap in-memory bytes after checking they look like a PDF.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ShortsError> {
        let file_name = file_name.into();
        check_magic(&file_name, &bytes)?;
        Ok(Self::new(file_name, bytes))
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a validated upload.
///
/// URLs are downloaded with `timeout_secs`; anything else is read as a
/// local path.
pub async fn resolve_upload(input: &str, timeout_secs: u64) -> Result<PdfUpload, ShortsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ShortsError::InvalidInput {
            input: input.to_string(),
            reason: "expected a PDF path or an HTTP/HTTPS URL".to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input))
    }
}

/// Read a local file, validating existence, permissions and PDF magic bytes.
fn read_local(path: &Path) -> Result<PdfUpload, ShortsError> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ShortsError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ShortsError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ShortsError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            ShortsError::Internal(format!("reading {}: {e}", path.display()))
        }
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    check_magic(&file_name, &bytes)?;

    debug!("Resolved local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(PdfUpload::new(file_name, bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfUpload, ShortsError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ShortsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            ShortsError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ShortsError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(ShortsError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let file_name = filename_from_url(url);
    let bytes = response.bytes().await.map_err(map_send_err)?.to_vec();
    check_magic(&file_name, &bytes)?;

    info!("Downloaded {} ({} bytes)", file_name, bytes.len());
    Ok(PdfUpload::new(file_name, bytes))
}

/// Last path segment of `url`, defaulting to `document.pdf`.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.to_lowercase().ends_with(".pdf") {
                s
            } else {
                format!("{s}.pdf")
            }
        })
        .unwrap_or_else(|| "document.pdf".to_string())
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), ShortsError> {
    if bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(ShortsError::NotAPdf {
        name: name.to_string(),
        magic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn url_detection() {
        assert!(is_url("https://arxiv.org/pdf/1706.03762"));
        assert!(is_url("http://localhost/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("ftp://host/doc.pdf"));
    }

    #[test]
    fn filenames_from_urls() {
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706.03762"), "1706.03762.pdf");
        assert_eq!(filename_from_url("https://x.org/a/Report.PDF"), "Report.PDF");
        assert_eq!(filename_from_url("https://x.org/"), "document.pdf");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_upload("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, ShortsError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let err = resolve_upload("   ", 5).await.unwrap_err();
        assert!(matches!(err, ShortsError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_non_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.pdf");
        std::fs::write(&p, b"PK\x03\x04zip").unwrap();

        let err = resolve_upload(p.to_str().unwrap(), 5).await.unwrap_err();
        match err {
            ShortsError::NotAPdf { name, magic } => {
                assert_eq!(name, "notes.pdf");
                assert_eq!(&magic, b"PK\x03\x04");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_pdf_is_read_whole() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("paper.pdf");
        std::fs::write(&p, b"%PDF-1.7\n...").unwrap();

        let upload = resolve_upload(p.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(upload.file_name, "paper.pdf");
        assert_eq!(upload.bytes, b"%PDF-1.7\n...");
    }

    #[tokio::test]
    async fn downloads_pdf_from_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/deck.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 deck".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let upload = resolve_upload(&format!("{}/files/deck.pdf", server.uri()), 5)
            .await
            .unwrap();
        assert_eq!(upload.file_name, "deck.pdf");

        let err = resolve_upload(&format!("{}/missing.pdf", server.uri()), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ShortsError::DownloadFailed { .. }));
    }

    #[test]
    fn short_buffers_are_not_pdfs() {
        assert!(PdfUpload::from_bytes("x.pdf", b"%P".to_vec()).is_err());
        assert!(PdfUpload::from_bytes("x.pdf", b"%PDF".to_vec()).is_ok());
    }
}
