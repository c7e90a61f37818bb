// WHY: Pages arrive pre-extracted; only `text` is classified, the rest is carried for renderers

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid page JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("page extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Output of an upstream web extractor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedPage {
    pub text: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub structural_markup: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl ExtractedPage {
    pub fn from_json_str(json: &str) -> Result<Self, PageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Text to classify, or the extractor's own error when it reported failure
    pub fn classifiable_text(&self) -> Result<&str, PageError> {
        if !self.success {
            let reason = self.error.clone().unwrap_or_else(|| "unknown error".to_string());
            return Err(PageError::ExtractionFailed(reason));
        }
        Ok(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_with_missing_fields() {
        let page = ExtractedPage::from_json_str(r#"{"text": "Hello there.", "success": true}"#).unwrap();
        assert_eq!(page.classifiable_text().unwrap(), "Hello there.");
        assert!(page.title.is_none());
        assert!(page.structural_markup.is_none());
    }

    #[test]
    fn test_failed_extraction_is_reported() {
        let page =
            ExtractedPage::from_json_str(r#"{"success": false, "error": "HTTP 404", "url": "https://x.test"}"#).unwrap();
        match page.classifiable_text() {
            Err(PageError::ExtractionFailed(reason)) => assert_eq!(reason, "HTTP 404"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(ExtractedPage::from_json_str("[1, 2"), Err(PageError::Json(_))));
    }
}
