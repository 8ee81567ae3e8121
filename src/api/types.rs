//! Wire schema for backend responses
//!
//! The backend has returned collections both as JSON arrays and as objects
//! keyed by id. Both shapes are accepted here and normalised into plain
//! vectors, and every media item is validated before it reaches the engine.

use super::error::ApiError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Backend-assigned media identifier
pub type MediaId = i64;

/// Backend-assigned tag identifier
pub type TagId = i64;

/// A media entry as returned by a search or window fetch
///
/// Identity is by `id` only: a later fetch of the same id may carry updated
/// fields (typically a new `score`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub path: String,
    /// Capture time in seconds since the Unix epoch
    pub timestamp: f64,
    /// Relevance in `[0, 1]`, only present in prompt-search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl MediaItem {
    /// Create a tag-filter item (no score)
    #[must_use]
    pub fn new(id: MediaId, path: impl Into<String>, timestamp: f64) -> Self {
        Self {
            id,
            path: path.into(),
            timestamp,
            score: None,
        }
    }

    /// Attach a prompt-search score
    #[must_use]
    pub const fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Check the item is usable by the engine
    ///
    /// Non-finite timestamps or scores are rejected. Finite scores outside
    /// `[0, 1]` are clamped, since similarity backends may return slightly
    /// negative cosine values.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidResponse` if a number is NaN or infinite.
    pub fn validate(mut self) -> Result<Self, ApiError> {
        if !self.timestamp.is_finite() {
            return Err(ApiError::InvalidResponse(format!(
                "media {} has a non-finite timestamp",
                self.id
            )));
        }

        if let Some(score) = self.score {
            if !score.is_finite() {
                return Err(ApiError::InvalidResponse(format!(
                    "media {} has a non-finite score",
                    self.id
                )));
            }
            if !(0.0..=1.0).contains(&score) {
                warn!("Clamping score {score} of media {} into [0, 1]", self.id);
                self.score = Some(score.clamp(0.0, 1.0));
            }
        }

        Ok(self)
    }
}

/// A tag as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

impl Tag {
    #[must_use]
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Either a JSON array or a JSON object keyed by id
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireCollection<T> {
    List(Vec<T>),
    Keyed(BTreeMap<String, T>),
}

impl<T> WireCollection<T> {
    /// Flatten into a vector, keyed collections in key order
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::List(items) => items,
            Self::Keyed(map) => map.into_values().collect(),
        }
    }
}

/// Parse a media list and validate each entry
///
/// # Errors
///
/// Returns `ApiError::Decode` for malformed JSON and
/// `ApiError::InvalidResponse` for entries failing [`MediaItem::validate`].
pub fn parse_media_list(body: &[u8]) -> Result<Vec<MediaItem>, ApiError> {
    let collection: WireCollection<MediaItem> =
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    collection
        .into_vec()
        .into_iter()
        .map(MediaItem::validate)
        .collect()
}

/// Parse a tag list in either collection shape
///
/// # Errors
///
/// Returns `ApiError::Decode` for malformed JSON.
pub fn parse_tag_list(body: &[u8]) -> Result<Vec<Tag>, ApiError> {
    let collection: WireCollection<Tag> =
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(collection.into_vec())
}

/// Fully loaded media bytes
///
/// Cloning shares the underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}
