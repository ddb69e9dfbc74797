//! Error types and result aliases for dish-vision.
//!
//! This module defines the core error type [`DishVisionError`] and the [`Result`] type alias
//! used throughout the crate. Errors from the remote model are carried through untranslated
//! so the web layer can surface them as-is.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DishVisionError {
    #[error("Could not find image: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("No file was uploaded")]
    NoUpload,

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Blocked by safety filters: {0}")]
    Blocked(String),

    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DishVisionError>;
