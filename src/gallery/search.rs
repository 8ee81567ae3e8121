//! Search controller
//!
//! Holds the active search mode and its parameters, and turns them into
//! backend queries. Exactly one mode is active at a time:
//!
//! - **Tag filter**: media carrying every selected tag, ordered by time
//! - **Prompt**: free-text relevance search, ordered by backend score

use super::error::{GalleryError, Result};
use crate::api::{self, Backend, MediaId, MediaItem, TagId};
use log::info;
use std::collections::BTreeSet;

/// Default number of items fetched on each side of a focal item
pub const DEFAULT_TAG_RADIUS: usize = 10;

/// Default number of prompt results requested
pub const DEFAULT_PROMPT_LIMIT: usize = 50;

/// Which kind of search drives the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    TagFilter,
    Prompt,
}

/// Parameters of the current search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub mode: SearchMode,
    pub tag_filter: BTreeSet<TagId>,
    pub prompt_text: String,
}

/// A re-center request: up to `radius` matches on each side of `anchor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowQuery {
    pub anchor: MediaId,
    pub radius: usize,
    pub tags: Vec<TagId>,
}

impl WindowQuery {
    /// Sends the query
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged.
    pub async fn execute<B: Backend>(&self, backend: &B) -> api::Result<Vec<MediaItem>> {
        backend.around(self.anchor, self.radius, &self.tags).await
    }
}

/// Trims prompt text, rejecting blank input
fn prompt_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GalleryError::EmptyPrompt);
    }
    Ok(text)
}

/// Owns the [`SearchState`] and issues searches
#[derive(Debug)]
pub struct SearchController {
    state: SearchState,
    radius: usize,
    prompt_limit: usize,
}

impl SearchController {
    #[must_use]
    pub fn new(radius: usize, prompt_limit: usize) -> Self {
        Self {
            state: SearchState::default(),
            radius: radius.max(1),
            prompt_limit: prompt_limit.max(1),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SearchState {
        &self.state
    }

    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.state.mode
    }

    #[must_use]
    pub const fn radius(&self) -> usize {
        self.radius
    }

    #[must_use]
    pub const fn prompt_limit(&self) -> usize {
        self.prompt_limit
    }

    /// Switches mode; returns whether it changed
    ///
    /// A change means the window is stale and must be refetched.
    pub fn set_mode(&mut self, mode: SearchMode) -> bool {
        if self.state.mode == mode {
            return false;
        }
        info!("Search mode {:?} -> {mode:?}", self.state.mode);
        self.state.mode = mode;
        true
    }

    /// Commits a tag selection and switches to tag-filter mode
    ///
    /// Returns whether anything changed.
    pub fn set_tag_filter(&mut self, tags: BTreeSet<TagId>) -> bool {
        let changed = self.state.tag_filter != tags;
        self.state.tag_filter = tags;
        self.set_mode(SearchMode::TagFilter) || changed
    }

    /// Commits prompt text and switches to prompt mode
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::EmptyPrompt` for blank text; the state is left
    /// untouched.
    pub fn set_prompt(&mut self, text: &str) -> Result<bool> {
        let text = prompt_text(text)?;
        let changed = self.state.prompt_text != text;
        self.state.prompt_text = text.to_string();
        Ok(self.set_mode(SearchMode::Prompt) || changed)
    }

    /// Drops a deleted tag from the committed filter; returns whether it was there
    pub fn forget_tag(&mut self, tag: TagId) -> bool {
        self.state.tag_filter.remove(&tag)
    }

    /// Runs a fresh search for the current state
    ///
    /// Tag-filter mode always fetches the whole filter result; centering on
    /// a focal item is left to the window.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::EmptyPrompt` in prompt mode without text, or
    /// `GalleryError::Fetch` if the backend call fails.
    pub async fn run<B: Backend>(&self, backend: &B) -> Result<Vec<MediaItem>> {
        match self.state.mode {
            SearchMode::TagFilter => {
                self.run_tag_filter_search(backend, &self.state.tag_filter)
                    .await
            }
            SearchMode::Prompt => {
                self.run_prompt_search(backend, &self.state.prompt_text, self.prompt_limit)
                    .await
            }
        }
    }

    /// A re-center query anchored at `anchor`, in tag-filter mode only
    #[must_use]
    pub fn recenter_query(&self, anchor: MediaId) -> Option<WindowQuery> {
        match self.state.mode {
            SearchMode::TagFilter => Some(WindowQuery {
                anchor,
                radius: self.radius,
                tags: self.state.tag_filter.iter().copied().collect(),
            }),
            SearchMode::Prompt => None,
        }
    }

    /// Media matching every tag in `selected` (all media when empty)
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::Fetch` if the backend call fails.
    pub async fn run_tag_filter_search<B: Backend>(
        &self,
        backend: &B,
        selected: &BTreeSet<TagId>,
    ) -> Result<Vec<MediaItem>> {
        let tags: Vec<TagId> = selected.iter().copied().collect();
        info!("Tag filter search {tags:?}");
        Ok(backend.filter(&tags).await?)
    }

    /// The best `limit` matches for `text`, each carrying a score
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::EmptyPrompt` without contacting the backend
    /// for blank text, or `GalleryError::Fetch` if the call fails.
    pub async fn run_prompt_search<B: Backend>(
        &self,
        backend: &B,
        text: &str,
        limit: usize,
    ) -> Result<Vec<MediaItem>> {
        let text = prompt_text(text)?;
        info!("Prompt search {text:?} (top {limit})");
        Ok(backend.prompt(text, limit).await?)
    }
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(DEFAULT_TAG_RADIUS, DEFAULT_PROMPT_LIMIT)
    }
}
