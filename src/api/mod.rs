//! Backend boundary
//!
//! The gallery engine talks to its media server exclusively through the
//! [`Backend`] trait. Two implementations ship with the crate:
//!
//! - [`HttpBackend`]: the REST client used by the binary
//! - [`MockBackend`]: an in-memory backend for tests and offline front ends
//!
//! Responses are validated here (see [`types`]) so the engine only ever sees
//! well-formed [`MediaItem`] and [`Tag`] values.

pub mod error;
pub mod http;
pub mod mock;
pub mod types;

pub use error::ApiError;
pub use http::HttpBackend;
pub use mock::MockBackend;
pub use types::{MediaId, MediaItem, Payload, Tag, TagId};

/// Result type for backend calls
pub type Result<T> = std::result::Result<T, ApiError>;

/// Operations offered by the media server
///
/// Each method maps to one REST endpoint. Implementations must not retry:
/// a failed call returns its error once and the caller decides what to do.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// `GET /tags/list`
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// `POST /tags/new?tag_name=...`
    async fn create_tag(&self, name: &str) -> Result<()>;

    /// `DELETE /tag/{id}/delete`
    async fn delete_tag(&self, tag_id: TagId) -> Result<()>;

    /// `GET /image/{id}/tags`
    async fn media_tags(&self, media_id: MediaId) -> Result<Vec<Tag>>;

    /// `POST /assign/{imageId}/{tagId}`
    async fn assign(&self, media_id: MediaId, tag_id: TagId) -> Result<()>;

    /// `POST /unassign/{imageId}/{tagId}`
    async fn unassign(&self, media_id: MediaId, tag_id: TagId) -> Result<()>;

    /// `POST /images/filter`: media carrying every tag in `tag_ids`
    ///
    /// An empty selection matches all media. No ordering is guaranteed.
    async fn filter(&self, tag_ids: &[TagId]) -> Result<Vec<MediaItem>>;

    /// `GET /images/prompt?n=&prompt=`: the `n` best matches, each scored
    async fn prompt(&self, text: &str, n: usize) -> Result<Vec<MediaItem>>;

    /// `POST /images/around?image_id=&n=`: up to `n` matches on each side
    /// of `media_id` in time
    async fn around(&self, media_id: MediaId, n: usize, tag_ids: &[TagId])
    -> Result<Vec<MediaItem>>;

    /// `GET /image/{id}/data`
    async fn media_data(&self, media_id: MediaId) -> Result<Payload>;

    /// `DELETE /image/{id}/delete`
    async fn delete_media(&self, media_id: MediaId) -> Result<()>;

    /// `GET /images/date?timestamp=`: the item closest to `timestamp`
    async fn nearest_to(&self, timestamp: f64) -> Result<Option<MediaItem>>;

    /// `GET /sync`
    async fn sync(&self) -> Result<()>;
}
