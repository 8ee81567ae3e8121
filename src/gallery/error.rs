//! Gallery engine error types
//!
//! Only errors detected locally, before any request is sent, are returned
//! through the engine's public operations. Backend failures are routed to the
//! connection-lost handler instead (see [`crate::gallery::Gallery`]). The
//! search controller reports them as `Fetch`, which the gallery unwraps.
//!
//! # Error Types
//!
//! - **`EmptyPrompt`**: a prompt search was submitted with blank text
//! - **`EmptyTagName`**: a tag was created with a blank name
//! - **`UnknownTag`**: a tag name did not resolve against the tag index
//! - **`NoSelection`**: an operation needed a selected item and there was none
//! - **`Cancelled`**: a destructive action was not confirmed
//! - **`Fetch`**: a backend call failed

use crate::api::ApiError;
use thiserror::Error;

/// Gallery-specific errors
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Prompt text was empty or whitespace only
    #[error("Prompt text is empty")]
    EmptyPrompt,

    /// Tag name was empty or whitespace only
    #[error("Tag name is empty")]
    EmptyTagName,

    /// No tag with this name exists
    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    /// The operation needs a selected item
    #[error("No media item is selected")]
    NoSelection,

    /// A destructive action was declined
    #[error("Action cancelled")]
    Cancelled,

    /// Backend call failed
    #[error("Fetch failed: {0}")]
    Fetch(#[from] ApiError),
}

/// Result type for gallery operations
pub type Result<T> = std::result::Result<T, GalleryError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
