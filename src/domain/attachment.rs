//! Inquiry documents attached to an analysis request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Document types accepted from the browser.
pub const ALLOWED_MIME_TYPES: [&str; 3] = [MIME_PDF, MIME_DOC, MIME_DOCX];

/// A document ready to be inlined into a provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub base64: String,
    pub mime_type: String,
    pub name: String,
}

impl FileAttachment {
    /// Validate the declared type and base64-encode the content.
    ///
    /// Browsers sometimes send an empty or generic content type for Word
    /// files, so a missing or `application/octet-stream` type falls back to
    /// the file extension.
    pub fn encode(
        name: &str,
        declared_mime: Option<&str>,
        bytes: &[u8],
    ) -> Result<Self, AnalysisError> {
        let mime_type = resolve_mime(name, declared_mime).ok_or_else(|| {
            AnalysisError::UnsupportedType {
                mime_type: declared_mime
                    .map(str::to_string)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "unknown".to_string()),
            }
        })?;

        if bytes.is_empty() {
            return Err(AnalysisError::Encoding(format!("'{}' is empty", name)));
        }

        tracing::debug!(name = name, mime_type = mime_type, size = bytes.len(), "Encoded attachment");

        Ok(Self {
            base64: STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
            name: name.to_string(),
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

fn resolve_mime(name: &str, declared: Option<&str>) -> Option<&'static str> {
    let declared = declared
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    match declared {
        Some(mime) => ALLOWED_MIME_TYPES.iter().copied().find(|allowed| *allowed == mime),
        None => {
            let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
            match ext.as_str() {
                "pdf" => Some(MIME_PDF),
                "doc" => Some(MIME_DOC),
                "docx" => Some(MIME_DOCX),
                _ => None,
            }
        }
    }
}
