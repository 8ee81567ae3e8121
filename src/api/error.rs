//! Backend access errors
//!
//! Every variant is a "fetch failed" condition: the request was sent (or
//! attempted) and produced no usable result. None of them are retried.
//!
//! # Error Types
//!
//! - **`Transport`**: connection, TLS or protocol failures from reqwest
//! - **`Status`**: the backend answered with a non-success HTTP status
//! - **`Decode`**: the body was not the JSON shape we expected
//! - **`InvalidResponse`**: the JSON decoded but failed validation
//! - **`Unavailable`**: a non-HTTP backend refused the call
//! - **`InvalidUrl`**: the configured backend location cannot be parsed

use thiserror::Error;

/// Backend-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or transport failure
    #[error("Backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Backend returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body could not be decoded
    #[error("Malformed backend response: {0}")]
    Decode(String),

    /// Response decoded but contained unusable values
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Backend refused the call without an HTTP exchange
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The configured backend location is not a usable URL
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
