//! Error types for field commands

use fieldmark_model::ModelError;
use thiserror::Error;

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Node at position {pos} is not a placeholder field (found {found})")]
    NotAField { pos: usize, found: String },

    #[error("Schema has no `{0}` node type; install the field schema first")]
    MissingFieldType(String),
}
