//! REST client for the media server

use super::types::{self, MediaId, MediaItem, Payload, Tag, TagId};
use super::{ApiError, Backend, Result};
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response, Url};

/// [`Backend`] over HTTP
///
/// All responses are JSON except `media_data`, which returns raw bytes.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: String,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` does not parse, or
    /// `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base: trimmed.to_string(),
        })
    }

    /// The normalised base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            warn!("Request failed: {e}");
            ApiError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            warn!("{url} answered {status}");
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
            });
        }

        debug!("{} answered {status}", response.url());
        Ok(response)
    }

    async fn media_list(&self, request: RequestBuilder) -> Result<Vec<MediaItem>> {
        let body = self.send(request).await?.bytes().await?;
        types::parse_media_list(&body)
    }

    async fn tag_list(&self, request: RequestBuilder) -> Result<Vec<Tag>> {
        let body = self.send(request).await?.bytes().await?;
        types::parse_tag_list(&body)
    }
}

impl Backend for HttpBackend {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.tag_list(self.request(Method::GET, "/tags/list")).await
    }

    async fn create_tag(&self, name: &str) -> Result<()> {
        let request = self
            .request(Method::POST, "/tags/new")
            .query(&[("tag_name", name)]);
        self.send(request).await.map(drop)
    }

    async fn delete_tag(&self, tag_id: TagId) -> Result<()> {
        let request = self.request(Method::DELETE, &format!("/tag/{tag_id}/delete"));
        self.send(request).await.map(drop)
    }

    async fn media_tags(&self, media_id: MediaId) -> Result<Vec<Tag>> {
        self.tag_list(self.request(Method::GET, &format!("/image/{media_id}/tags")))
            .await
    }

    async fn assign(&self, media_id: MediaId, tag_id: TagId) -> Result<()> {
        let request = self.request(Method::POST, &format!("/assign/{media_id}/{tag_id}"));
        self.send(request).await.map(drop)
    }

    async fn unassign(&self, media_id: MediaId, tag_id: TagId) -> Result<()> {
        let request = self.request(Method::POST, &format!("/unassign/{media_id}/{tag_id}"));
        self.send(request).await.map(drop)
    }

    async fn filter(&self, tag_ids: &[TagId]) -> Result<Vec<MediaItem>> {
        let request = self.request(Method::POST, "/images/filter").json(tag_ids);
        self.media_list(request).await
    }

    async fn prompt(&self, text: &str, n: usize) -> Result<Vec<MediaItem>> {
        let request = self
            .request(Method::GET, "/images/prompt")
            .query(&[("n", n.to_string()), ("prompt", text.to_string())]);
        self.media_list(request).await
    }

    async fn around(
        &self,
        media_id: MediaId,
        n: usize,
        tag_ids: &[TagId],
    ) -> Result<Vec<MediaItem>> {
        let request = self
            .request(Method::POST, "/images/around")
            .query(&[("image_id", media_id.to_string()), ("n", n.to_string())])
            .json(tag_ids);
        self.media_list(request).await
    }

    async fn media_data(&self, media_id: MediaId) -> Result<Payload> {
        let request = self.request(Method::GET, &format!("/image/{media_id}/data"));
        let bytes = self.send(request).await?.bytes().await?;
        Ok(Payload::from(bytes.as_ref()))
    }

    async fn delete_media(&self, media_id: MediaId) -> Result<()> {
        let request = self.request(Method::DELETE, &format!("/image/{media_id}/delete"));
        self.send(request).await.map(drop)
    }

    async fn nearest_to(&self, timestamp: f64) -> Result<Option<MediaItem>> {
        let request = self
            .request(Method::GET, "/images/date")
            .query(&[("timestamp", timestamp.to_string())]);
        let body = self.send(request).await?.bytes().await?;
        let item: Option<MediaItem> =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        item.map(MediaItem::validate).transpose()
    }

    async fn sync(&self) -> Result<()> {
        self.send(self.request(Method::GET, "/sync")).await.map(drop)
    }
}
