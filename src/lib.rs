//! Tagview - a windowed browser for tagged media collections
//!
//! This library talks to a media backend over a small REST API and keeps a
//! bounded, relevance-ordered window of media around a focal item, so large
//! collections can be browsed without loading them whole.
//!
//! - [`api`]: the backend boundary (HTTP client and in-memory mock)
//! - [`gallery`]: the browsing engine (window, selection, cache, tags)
//! - [`config`]: persisted settings and the backend setup flow

use thiserror::Error;

pub mod api;
pub mod cli;
pub mod config;
pub mod gallery;
pub mod output;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum TagviewError {
    /// Engine error
    #[error("Gallery error: {0}")]
    GalleryError(#[from] gallery::GalleryError),
    /// Backend error
    #[error("Backend error: {0}")]
    ApiError(#[from] api::ApiError),
    /// A backend call failed during a command and was reported to the user
    #[error("Backend request failed: {0}")]
    BackendFailed(String),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Interactive prompt error
    #[error("Prompt error: {0}")]
    PromptError(#[from] dialoguer::Error),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
