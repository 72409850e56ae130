use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfixError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("No document is open")]
    NoDocument,

    #[error("Page rendering failed: {0}")]
    Render(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Text cannot be encoded: {0}")]
    Encoding(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PdfixError {
    fn from(e: serde_json::Error) -> Self {
        PdfixError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PdfixError>;

/// Guidance returned when an action needs a selected object and none is active.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Select an object first (use the Select tool, click a text or shape, then repeat the action)")]
pub struct SelectionRequired;
