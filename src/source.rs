use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::model::Document;

/// Supplies the page-ordered text of the schedule.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self) -> Result<Document>;
}

/// Downloads the published PDF, keeps a copy on disk, then extracts it.
pub struct HttpPdfSource {
    client: reqwest::Client,
    url: String,
    save_to: PathBuf,
}

impl HttpPdfSource {
    pub fn new(url: impl Into<String>, save_to: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            save_to: save_to.into(),
        })
    }

    async fn download(&self) -> Result<Vec<u8>> {
        info!("Downloading latest schedule PDF: {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PipelineError::SourceUnavailable(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        info!("HTTP status: {}", status.as_u16());
        if !status.is_success() {
            return Err(PipelineError::SourceUnavailable(format!(
                "{} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DocumentSource for HttpPdfSource {
    async fn fetch(&self) -> Result<Document> {
        let bytes = self.download().await?;
        info!("Downloaded {} bytes", bytes.len());
        if let Err(e) = keep_copy(&self.save_to, &bytes).await {
            warn!("Could not keep a copy at {}: {}", self.save_to.display(), e);
        }
        pdf_document(bytes).await
    }
}

/// A PDF already on disk.
pub struct PdfFileSource {
    path: PathBuf,
}

impl PdfFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for PdfFileSource {
    async fn fetch(&self) -> Result<Document> {
        let bytes = read_source(&self.path).await?;
        pdf_document(bytes).await
    }
}

/// Text already pulled out of the PDF, pages separated by form feeds.
pub struct TextFileSource {
    path: PathBuf,
}

impl TextFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for TextFileSource {
    async fn fetch(&self) -> Result<Document> {
        let bytes = read_source(&self.path).await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(Document::from_text(&text))
    }
}

async fn keep_copy(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, bytes).await
}

async fn read_source(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::SourceUnavailable(format!("{}: {}", path.display(), e)))
}

/// Extract page text on a blocking thread; pdf-extract is CPU bound.
async fn pdf_document(bytes: Vec<u8>) -> Result<Document> {
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| PipelineError::SourceUnavailable(format!("PDF extraction aborted: {}", e)))?
    .map_err(|e| PipelineError::SourceUnavailable(format!("unreadable PDF: {}", e)))?;

    let total = pages.len();
    let doc = Document::from_pages(pages);
    info!("Extracted text from {} pages ({} with text)", total, doc.pages.len());
    Ok(doc)
}
