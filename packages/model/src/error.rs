use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Position {pos} out of range (document content size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("No node at position {pos}")]
    NoNodeAt { pos: usize },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Missing attribute {attr} on {type_name}")]
    MissingAttribute { type_name: String, attr: String },

    #[error("Invalid value for attribute {attr} on {type_name}: {reason}")]
    InvalidAttribute {
        type_name: String,
        attr: String,
        reason: String,
    },

    #[error("Invalid content for {type_name}: {reason}")]
    InvalidContent { type_name: String, reason: String },

    #[error("Replace from {from} to {to} does not stay within one parent")]
    UnsupportedReplace { from: usize, to: usize },

    #[error("Transaction was built against a different document version")]
    MismatchedTransaction,

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl ModelError {
    pub fn out_of_range(pos: usize, size: usize) -> Self {
        Self::PositionOutOfRange { pos, size }
    }

    pub fn invalid_content(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidContent {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_attribute(
        type_name: impl Into<String>,
        attr: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            type_name: type_name.into(),
            attr: attr.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Json(e.to_string())
    }
}
