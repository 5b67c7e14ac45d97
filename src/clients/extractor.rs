//! 文档文本提取
//!
//! 支持直接提供的文本、`.txt` / `.md` 文件以及带嵌入文本的 `.pdf` 文件。

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractError;
use crate::models::SubmissionSource;

/// 文本提取能力
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, source: &SubmissionSource) -> Result<String, ExtractError>;
}

/// 基于文件扩展名分派的提取器
#[derive(Debug, Default, Clone)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, source: &SubmissionSource) -> Result<String, ExtractError> {
        let text = match source {
            SubmissionSource::Text(text) => text.clone(),
            SubmissionSource::File(path) => extract_file(path).await?,
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ExtractError::EmptyText);
        }
        Ok(text)
    }
}

async fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ExtractError::NotFound { path: display });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "md" => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ExtractError::ReadFailed {
                path: display,
                source,
            }),
        "pdf" => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| ExtractError::ReadFailed {
                    path: display.clone(),
                    source,
                })?;
            extract_pdf_text(&bytes, &display)
        }
        _ => Err(ExtractError::UnsupportedFormat { path: display }),
    }
}

/// 逐页提取 PDF 嵌入文本，无法解析的页跳过
fn extract_pdf_text(bytes: &[u8], path: &str) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::PdfParseFailed {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    debug!("PDF 提取完成: {} ({} 字符)", path, text.len());
    Ok(text)
}
