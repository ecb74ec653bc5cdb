//! Structured error types for the Quire engine.
//!
//! Only structural defects and backend failures are errors. Validation
//! defects travel as [`crate::validate::ValidationMessage`]s and placement
//! failures are logged and recovered inside the layout engine.

use thiserror::Error;

/// The unified error type returned by the public Quire API.
#[derive(Debug, Error)]
pub enum QuireError {
    /// JSON input failed to parse as a valid Quire document.
    #[error("Failed to parse document: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// An area or style id was inserted twice.
    #[error("Duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier { kind: &'static str, id: String },

    /// A resource payload could not be decoded.
    #[error("Resource '{id}' is invalid: {reason}")]
    Resource { id: String, reason: String },

    /// The drawing backend failed. Aborts the whole compositor run.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the document schema. Check field names and element types.".to_string()
            }
            serde_json::error::Category::Eof => "Unexpected end of input, is the JSON truncated?".to_string(),
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Parse { source: e, hint }
    }
}

/// Failures raised by a [`crate::backend::DrawingBackend`].
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("failed to measure text: {0}")]
    Measure(String),
    #[error("failed to draw: {0}")]
    Draw(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("unknown surface #{0}")]
    UnknownSurface(usize),
    #[error("image error: {0}")]
    Image(String),
}
