//! In-memory backend for testing
//!
//! Mirrors the media server's query semantics closely enough to drive the
//! engine end to end: tag intersection, `around` windows that include the
//! focal item on both sides, canned prompt results, and switchable outages.

use super::types::{MediaId, MediaItem, Payload, Tag, TagId};
use super::{ApiError, Backend, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
struct MockState {
    media: BTreeMap<MediaId, MediaItem>,
    tags: BTreeMap<TagId, Tag>,
    assignments: BTreeSet<(MediaId, TagId)>,
    prompt_results: HashMap<String, Vec<MediaItem>>,
    failing_data: HashSet<MediaId>,
    offline: bool,
    calls: Vec<String>,
}

/// Backend that answers from memory
///
/// Every call is recorded (see [`MockBackend::calls`]) so tests can assert
/// which requests the engine actually sent.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: RefCell<MockState>,
}

impl MockBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add media items
    #[must_use]
    pub fn with_media(self, items: impl IntoIterator<Item = MediaItem>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            for item in items {
                state.media.insert(item.id, item);
            }
        }
        self
    }

    /// Add a tag and assign it to `media_ids`
    #[must_use]
    pub fn with_tag(self, tag: Tag, media_ids: &[MediaId]) -> Self {
        {
            let mut state = self.state.borrow_mut();
            for &media_id in media_ids {
                state.assignments.insert((media_id, tag.id));
            }
            state.tags.insert(tag.id, tag);
        }
        self
    }

    /// Answer `prompt` searches for `text` with `items`, in the given order
    #[must_use]
    pub fn with_prompt_results(self, text: &str, items: Vec<MediaItem>) -> Self {
        self.state
            .borrow_mut()
            .prompt_results
            .insert(text.to_string(), items);
        self
    }

    /// Simulate the whole backend going away (or coming back)
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Make payload loads for `media_id` fail
    pub fn fail_data_for(&self, media_id: MediaId) {
        self.state.borrow_mut().failing_data.insert(media_id);
    }

    /// Let payload loads for `media_id` succeed again
    pub fn restore_data_for(&self, media_id: MediaId) {
        self.state.borrow_mut().failing_data.remove(&media_id);
    }

    /// Insert or replace a media item after construction
    pub fn insert_media(&self, item: MediaItem) {
        self.state.borrow_mut().media.insert(item.id, item);
    }

    /// All calls received so far, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Number of calls whose description starts with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Forget the recorded calls
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Whether `media_id` still exists
    #[must_use]
    pub fn has_media(&self, media_id: MediaId) -> bool {
        self.state.borrow().media.contains_key(&media_id)
    }

    /// Tag ids currently assigned to `media_id`
    #[must_use]
    pub fn assigned(&self, media_id: MediaId) -> BTreeSet<TagId> {
        self.state
            .borrow()
            .assignments
            .iter()
            .filter(|(m, _)| *m == media_id)
            .map(|(_, t)| *t)
            .collect()
    }

    fn record(&self, call: String) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call.clone());
        if state.offline {
            return Err(ApiError::Unavailable(call));
        }
        Ok(())
    }

    fn matching(state: &MockState, tag_ids: &[TagId]) -> Vec<MediaItem> {
        state
            .media
            .values()
            .filter(|item| {
                tag_ids
                    .iter()
                    .all(|tag_id| state.assignments.contains(&(item.id, *tag_id)))
            })
            .cloned()
            .collect()
    }
}

impl Backend for MockBackend {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.record("list_tags".into())?;
        Ok(self.state.borrow().tags.values().cloned().collect())
    }

    async fn create_tag(&self, name: &str) -> Result<()> {
        self.record(format!("create_tag {name}"))?;
        let mut state = self.state.borrow_mut();
        if state.tags.values().any(|tag| tag.name == name) {
            return Err(ApiError::Status {
                status: 409,
                url: format!("/tags/new?tag_name={name}"),
            });
        }
        let id = state.tags.keys().next_back().map_or(1, |last| last + 1);
        state.tags.insert(id, Tag::new(id, name));
        Ok(())
    }

    async fn delete_tag(&self, tag_id: TagId) -> Result<()> {
        self.record(format!("delete_tag {tag_id}"))?;
        let mut state = self.state.borrow_mut();
        state.tags.remove(&tag_id);
        state.assignments.retain(|(_, t)| *t != tag_id);
        Ok(())
    }

    async fn media_tags(&self, media_id: MediaId) -> Result<Vec<Tag>> {
        self.record(format!("media_tags {media_id}"))?;
        let state = self.state.borrow();
        Ok(state
            .assignments
            .iter()
            .filter(|(m, _)| *m == media_id)
            .filter_map(|(_, t)| state.tags.get(t).cloned())
            .collect())
    }

    async fn assign(&self, media_id: MediaId, tag_id: TagId) -> Result<()> {
        self.record(format!("assign {media_id} {tag_id}"))?;
        self.state.borrow_mut().assignments.insert((media_id, tag_id));
        Ok(())
    }

    async fn unassign(&self, media_id: MediaId, tag_id: TagId) -> Result<()> {
        self.record(format!("unassign {media_id} {tag_id}"))?;
        self.state
            .borrow_mut()
            .assignments
            .remove(&(media_id, tag_id));
        Ok(())
    }

    async fn filter(&self, tag_ids: &[TagId]) -> Result<Vec<MediaItem>> {
        self.record(format!("filter {tag_ids:?}"))?;
        let state = self.state.borrow();
        let mut items = Self::matching(&state, tag_ids);
        // Newest first, like the real server's unfiltered listing
        items.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
        Ok(items)
    }

    async fn prompt(&self, text: &str, n: usize) -> Result<Vec<MediaItem>> {
        self.record(format!("prompt {text} {n}"))?;
        let state = self.state.borrow();
        Ok(state
            .prompt_results
            .get(text)
            .map(|items| items.iter().take(n).cloned().collect())
            .unwrap_or_default())
    }

    async fn around(
        &self,
        media_id: MediaId,
        n: usize,
        tag_ids: &[TagId],
    ) -> Result<Vec<MediaItem>> {
        self.record(format!("around {media_id} {n} {tag_ids:?}"))?;
        let state = self.state.borrow();
        let Some(focal) = state.media.get(&media_id) else {
            return Err(ApiError::Status {
                status: 404,
                url: format!("/images/around?image_id={media_id}&n={n}"),
            });
        };
        let focal_time = focal.timestamp;
        let candidates = Self::matching(&state, tag_ids);

        let mut before: Vec<&MediaItem> = candidates
            .iter()
            .filter(|item| item.timestamp <= focal_time)
            .collect();
        before.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));

        let mut after: Vec<&MediaItem> = candidates
            .iter()
            .filter(|item| item.timestamp >= focal_time)
            .collect();
        after.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        Ok(before
            .into_iter()
            .take(n)
            .chain(after.into_iter().take(n))
            .cloned()
            .collect())
    }

    async fn media_data(&self, media_id: MediaId) -> Result<Payload> {
        self.record(format!("media_data {media_id}"))?;
        let state = self.state.borrow();
        if state.failing_data.contains(&media_id) {
            return Err(ApiError::Status {
                status: 500,
                url: format!("/image/{media_id}/data"),
            });
        }
        state
            .media
            .get(&media_id)
            .map(|item| Payload::from(item.path.as_bytes()))
            .ok_or_else(|| ApiError::Status {
                status: 404,
                url: format!("/image/{media_id}/data"),
            })
    }

    async fn delete_media(&self, media_id: MediaId) -> Result<()> {
        self.record(format!("delete_media {media_id}"))?;
        let mut state = self.state.borrow_mut();
        state.media.remove(&media_id);
        state.assignments.retain(|(m, _)| *m != media_id);
        Ok(())
    }

    async fn nearest_to(&self, timestamp: f64) -> Result<Option<MediaItem>> {
        self.record(format!("nearest_to {timestamp}"))?;
        let state = self.state.borrow();
        Ok(state
            .media
            .values()
            .min_by(|a, b| {
                (a.timestamp - timestamp)
                    .abs()
                    .total_cmp(&(b.timestamp - timestamp).abs())
                    .then(a.id.cmp(&b.id))
            })
            .cloned())
    }

    async fn sync(&self) -> Result<()> {
        self.record("sync".into())
    }
}
