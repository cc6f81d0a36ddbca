//! Error types for views and plugins

use fieldmark_editor::CommandError;
use fieldmark_model::ModelError;
use thiserror::Error;

pub type ViewResult<T> = Result<T, ViewError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}
