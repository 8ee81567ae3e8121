//! Windowed media browsing engine
//!
//! [`Gallery`] is the application-state object: it owns the tag index, the
//! search controller, the window, the selection and the payload cache, and
//! drives them in the order a user action requires:
//!
//! ```text
//! action -> search/window state -> backend fetch -> window replace
//!        -> selection reconcile -> payload + item tags (cached)
//! ```
//!
//! # Failure handling
//!
//! Backend errors never escape a `Gallery` operation. Each failing call is
//! logged and handed to the connection-lost handler exactly once, and the
//! operation reports a `Failed` outcome (or `None`). Only local validation
//! errors, detected before any request is sent, are returned as `Err`.
//!
//! # Overlapping fetches
//!
//! The backend is held in an [`Rc`] so a front end can issue a re-center
//! with [`Gallery::recenter_request`], await it on its own, and hand the
//! result back through [`Gallery::finish_window_request`]. Results of
//! superseded requests are discarded.

pub mod cache;
pub mod display;
pub mod error;
pub mod grouping;
pub mod search;
pub mod selection;
pub mod tags;
pub mod window;

pub use cache::MediaCache;
pub use error::{GalleryError, Result};
pub use grouping::{Group, GroupKey};
pub use search::{SearchController, SearchMode, SearchState, WindowQuery};
pub use selection::{Direction, Selection, SelectionChange};
pub use tags::{Panel, TagEntry, TagIndex};
pub use window::{Boundary, Edge, FetchTicket, ScrollAnchor, WindowManager, WindowUpdate};

use crate::api::{self, ApiError, Backend, MediaId, MediaItem, Payload, Tag, TagId};
use chrono::Local;
use log::{debug, info, warn};
use selection::Step;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Called once for every failed backend call
pub type FailureHandler = Box<dyn FnMut(&ApiError)>;

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub cache_capacity: usize,
    pub tag_radius: usize,
    pub prompt_limit: usize,
    pub refetch_debounce: Duration,
    pub max_name_length: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_capacity: cache::DEFAULT_CAPACITY,
            tag_radius: search::DEFAULT_TAG_RADIUS,
            prompt_limit: search::DEFAULT_PROMPT_LIMIT,
            refetch_debounce: window::DEFAULT_REFETCH_DEBOUNCE,
            max_name_length: display::DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl EngineSettings {
    /// Clamps zero sizes to one
    #[must_use]
    pub fn validated(self) -> Self {
        Self {
            cache_capacity: self.cache_capacity.max(1),
            tag_radius: self.tag_radius.max(1),
            prompt_limit: self.prompt_limit.max(1),
            ..self
        }
    }
}

/// Result of a fresh search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The window was updated and the selection reconciled
    Applied {
        update: WindowUpdate,
        selection: SelectionChange,
    },
    /// A later request superseded this one
    Stale,
    /// The backend call failed
    Failed,
}

/// Result of a next/prev move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The selection moved to this item
    Moved(MediaId),
    /// Blocked at the edge of a prompt window
    Stayed,
    /// Blocked at the edge even after re-centering
    Exhausted,
    /// Nothing to navigate
    Empty,
    /// The re-center fetch failed
    Failed,
}

/// Result of deleting the current item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted {
        removed: MediaId,
        replacement: Option<MediaId>,
    },
    Failed,
}

/// A window fetch issued but not yet applied
#[derive(Debug, Clone)]
pub struct WindowRequest {
    ticket: FetchTicket,
    query: WindowQuery,
    focal: Option<MediaItem>,
}

impl WindowRequest {
    #[must_use]
    pub const fn query(&self) -> &WindowQuery {
        &self.query
    }

    #[must_use]
    pub const fn ticket(&self) -> &FetchTicket {
        &self.ticket
    }
}

/// Everything needed to render the selected item
#[derive(Debug, Clone)]
pub struct CurrentView {
    pub item: MediaItem,
    /// Path shortened for display
    pub name: String,
    /// Local capture time
    pub date: Option<String>,
    /// `None` if the payload failed to load
    pub payload: Option<Payload>,
    /// Tags assigned to the item, sorted by name
    pub tags: Vec<Tag>,
}

/// The browsing engine
pub struct Gallery<B: Backend> {
    backend: Rc<B>,
    settings: EngineSettings,
    tags: TagIndex,
    search: SearchController,
    window: WindowManager,
    selection: Selection,
    cache: MediaCache,
    payload: Option<Payload>,
    on_failure: Option<FailureHandler>,
}

impl<B: Backend> Gallery<B> {
    #[must_use]
    pub fn new(backend: B, settings: EngineSettings) -> Self {
        Self::with_shared(Rc::new(backend), settings)
    }

    /// Creates an engine over a backend shared with the caller
    #[must_use]
    pub fn with_shared(backend: Rc<B>, settings: EngineSettings) -> Self {
        let settings = settings.validated();
        Self {
            backend,
            tags: TagIndex::new(),
            search: SearchController::new(settings.tag_radius, settings.prompt_limit),
            window: WindowManager::new(
                settings.tag_radius,
                settings.prompt_limit,
                settings.refetch_debounce,
            ),
            selection: Selection::new(),
            cache: MediaCache::new(settings.cache_capacity),
            payload: None,
            on_failure: None,
            settings,
        }
    }

    /// Installs the connection-lost handler
    pub fn set_failure_handler(&mut self, handler: impl FnMut(&ApiError) + 'static) {
        self.on_failure = Some(Box::new(handler));
    }

    #[must_use]
    pub fn backend(&self) -> Rc<B> {
        Rc::clone(&self.backend)
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub const fn tags(&self) -> &TagIndex {
        &self.tags
    }

    #[must_use]
    pub const fn search_state(&self) -> &SearchState {
        self.search.state()
    }

    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.search.mode()
    }

    #[must_use]
    pub const fn window(&self) -> &WindowManager {
        &self.window
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub const fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// Display separators for the rendered window, in local time
    #[must_use]
    pub fn groups(&self) -> Vec<Group> {
        self.window.groups(&Local)
    }

    fn fail(&mut self, error: &ApiError) {
        warn!("Backend call failed: {error}");
        if let Some(handler) = self.on_failure.as_mut() {
            handler(error);
        }
    }

    fn sync_window_mode(&mut self) {
        if self.window.mode() != self.search.mode() {
            self.window.reset(self.search.mode());
        }
    }

    // ============================================================================
    // Tags
    // ============================================================================

    /// Reloads the tag list; returns `false` if the call failed
    pub async fn refresh_tags(&mut self) -> bool {
        match self.backend.list_tags().await {
            Ok(tags) => {
                debug!("Loaded {} tags", tags.len());
                self.tags.replace_all(tags);
                true
            }
            Err(e) => {
                self.fail(&e);
                false
            }
        }
    }

    /// Toggles a tag in the pending filter panel; returns the new state
    pub fn toggle_filter_tag(&mut self, tag: TagId) -> bool {
        self.tags.toggle_filter(tag)
    }

    /// Empties the pending filter panel
    pub fn clear_tag_filters(&mut self) {
        self.tags.clear_filter();
    }

    /// Commits the pending filter panel and runs a fresh tag search
    pub async fn apply_tag_filters(&mut self) -> SearchOutcome {
        let selected = self.tags.filter_selection().clone();
        self.search.set_tag_filter(selected);
        self.sync_window_mode();
        match self.search().await {
            Ok(outcome) => outcome,
            // Tag-filter queries have no local validation
            Err(_) => SearchOutcome::Failed,
        }
    }

    /// Resolves tag names, makes them the filter and searches
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::UnknownTag` for a name not in the tag index;
    /// the pending panel is left untouched in that case.
    pub async fn filter_by_names(&mut self, names: &[String]) -> Result<SearchOutcome> {
        let mut ids = BTreeSet::new();
        for name in names {
            let tag = self
                .tags
                .find_by_name(name)
                .ok_or_else(|| GalleryError::UnknownTag(name.clone()))?;
            ids.insert(tag.id);
        }
        self.tags.clear_filter();
        for id in ids {
            self.tags.toggle_filter(id);
        }
        Ok(self.apply_tag_filters().await)
    }

    /// Creates a tag and reloads the tag list
    ///
    /// Returns `Ok(false)` if the backend call failed.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::EmptyTagName` for a blank name.
    pub async fn create_tag(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GalleryError::EmptyTagName);
        }
        if let Err(e) = self.backend.create_tag(name).await {
            self.fail(&e);
            return Ok(false);
        }
        info!("Created tag {name:?}");
        Ok(self.refresh_tags().await)
    }

    /// Deletes a tag after confirmation
    ///
    /// The tag is also dropped from the pending and committed filters.
    /// Returns `Ok(false)` if the backend call failed.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::Cancelled` without `confirm`, or
    /// `GalleryError::UnknownTag` for an id not in the tag index.
    pub async fn delete_tag(&mut self, tag: TagId, confirm: bool) -> Result<bool> {
        if !confirm {
            return Err(GalleryError::Cancelled);
        }
        if self.tags.get(tag).is_none() {
            return Err(GalleryError::UnknownTag(tag.to_string()));
        }
        if let Err(e) = self.backend.delete_tag(tag).await {
            self.fail(&e);
            return Ok(false);
        }
        info!("Deleted tag {tag}");
        self.tags.remove(tag);
        self.search.forget_tag(tag);
        Ok(self.refresh_tags().await)
    }

    /// Assigns or unassigns a tag on the selected item
    ///
    /// Returns the new assignment state, or `Ok(None)` if a backend call
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::NoSelection` without a selected item, or
    /// `GalleryError::UnknownTag` for an id not in the tag index.
    pub async fn toggle_assignment(&mut self, tag: TagId) -> Result<Option<bool>> {
        let item = self.selection.current_id().ok_or(GalleryError::NoSelection)?;
        if self.tags.get(tag).is_none() {
            return Err(GalleryError::UnknownTag(tag.to_string()));
        }

        if self.tags.item() != Some(item) && !self.load_item_tags(item).await {
            return Ok(None);
        }
        let assigned = self.tags.is_selected(Panel::CurrentItem, tag);
        let result = if assigned {
            self.backend.unassign(item, tag).await
        } else {
            self.backend.assign(item, tag).await
        };
        if let Err(e) = result {
            self.fail(&e);
            return Ok(None);
        }

        if !self.load_item_tags(item).await {
            return Ok(None);
        }
        Ok(Some(self.tags.is_selected(Panel::CurrentItem, tag)))
    }

    /// [`Gallery::toggle_assignment`] by tag name
    ///
    /// # Errors
    ///
    /// As [`Gallery::toggle_assignment`], with unknown names reported as
    /// `GalleryError::UnknownTag`.
    pub async fn toggle_assignment_by_name(&mut self, name: &str) -> Result<Option<bool>> {
        let tag = self
            .tags
            .find_by_name(name)
            .map(|tag| tag.id)
            .ok_or_else(|| GalleryError::UnknownTag(name.trim().to_string()))?;
        self.toggle_assignment(tag).await
    }

    // ============================================================================
    // Searching
    // ============================================================================

    /// Switches search mode, emptying the window on change
    ///
    /// Call [`Gallery::search`] afterwards to refill it.
    pub fn set_mode(&mut self, mode: SearchMode) -> bool {
        let changed = self.search.set_mode(mode);
        self.sync_window_mode();
        changed
    }

    /// Commits prompt text and runs a prompt search
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::EmptyPrompt` for blank text; nothing is sent
    /// and the current search is left as it was.
    pub async fn submit_prompt(&mut self, text: &str) -> Result<SearchOutcome> {
        self.search.set_prompt(text)?;
        self.sync_window_mode();
        self.search().await
    }

    /// Refetches the window for the current search
    ///
    /// In tag-filter mode the whole filter result is fetched and the items
    /// nearest the selected item in time are kept, even if that item is no
    /// longer in the result. The selection is then reconciled and the
    /// selected item's payload and tags are loaded.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::EmptyPrompt` in prompt mode without text.
    pub async fn search(&mut self) -> Result<SearchOutcome> {
        let mode = self.search.mode();
        let focal = match mode {
            SearchMode::TagFilter => self.selection.current().cloned(),
            SearchMode::Prompt => None,
        };
        info!(
            "Searching {mode:?} near {:?}",
            focal.as_ref().map(|item| item.id)
        );

        let ticket = self.window.begin_fetch(None);
        let backend = self.backend();
        let items = match self.search.run(&*backend).await {
            Ok(items) => items,
            Err(GalleryError::Fetch(e)) => {
                self.fail(&e);
                return Ok(SearchOutcome::Failed);
            }
            Err(e) => return Err(e),
        };

        let update = self.window.apply(ticket, mode, focal, items);
        if update == WindowUpdate::Stale {
            return Ok(SearchOutcome::Stale);
        }
        let selection = self.selection.reconcile(&self.window);
        self.load_selected().await;
        Ok(SearchOutcome::Applied { update, selection })
    }

    // ============================================================================
    // Window Paging
    // ============================================================================

    /// Issues a re-center fetch anchored at a boundary item
    ///
    /// Returns `None` in prompt mode, which does not page. The request
    /// supersedes every earlier one.
    pub fn recenter_request(&mut self, boundary: Boundary) -> Option<WindowRequest> {
        let query = self.search.recenter_query(boundary.id)?;
        let focal = self.window.get(boundary.id).cloned();
        let ticket = self.window.begin_fetch(Some(boundary));
        Some(WindowRequest {
            ticket,
            query,
            focal,
        })
    }

    /// Applies the result of a request from [`Gallery::recenter_request`]
    ///
    /// Returns `None` if the fetch failed.
    pub fn finish_window_request(
        &mut self,
        request: WindowRequest,
        result: api::Result<Vec<MediaItem>>,
    ) -> Option<WindowUpdate> {
        let items = match result {
            Ok(items) => items,
            Err(e) => {
                self.fail(&e);
                return None;
            }
        };
        let update = self
            .window
            .apply(request.ticket, SearchMode::TagFilter, request.focal, items);
        if update != WindowUpdate::Stale {
            self.selection.refresh(&self.window);
        }
        Some(update)
    }

    /// Re-centers the window on a boundary item and waits for the result
    pub async fn recenter(&mut self, boundary: Boundary) -> Option<WindowUpdate> {
        let request = self.recenter_request(boundary)?;
        let backend = self.backend();
        let result = request.query().execute(&*backend).await;
        self.finish_window_request(request, result)
    }

    /// Reacts to the visible range of the rendered window
    ///
    /// Re-centers when the range touches an edge of a tag-filter window,
    /// at most once per debounce interval.
    pub async fn on_scroll(
        &mut self,
        first_visible: usize,
        last_visible: usize,
        now: Instant,
    ) -> Option<WindowUpdate> {
        let boundary = self.window.check_boundary(first_visible, last_visible, now)?;
        debug!("Boundary reached at {boundary:?}");
        self.recenter(boundary).await
    }

    // ============================================================================
    // Navigation
    // ============================================================================

    /// Selects the next item in rendered order
    pub async fn next(&mut self) -> Navigation {
        self.navigate(Direction::Forward).await
    }

    /// Selects the previous item in rendered order
    pub async fn prev(&mut self) -> Navigation {
        self.navigate(Direction::Backward).await
    }

    async fn navigate(&mut self, direction: Direction) -> Navigation {
        let mut from_recenter = false;
        loop {
            let edge = match self.selection.step(&self.window, direction) {
                Step::Moved(item) => {
                    self.load_selected().await;
                    return Navigation::Moved(item.id);
                }
                Step::Empty => return Navigation::Empty,
                Step::Blocked(edge) => edge,
            };

            if !Selection::can_recenter(self.search.mode()) {
                return Navigation::Stayed;
            }
            if from_recenter {
                debug!("No further items {direction:?}");
                return Navigation::Exhausted;
            }
            let Some(anchor) = self.window.edge_item(edge).map(|item| item.id) else {
                return Navigation::Empty;
            };
            if self.recenter(Boundary { id: anchor, edge }).await.is_none() {
                return Navigation::Failed;
            }
            from_recenter = true;
        }
    }

    /// Selects a rendered item directly; returns `false` if it is not in the window
    pub async fn select(&mut self, id: MediaId) -> bool {
        let Some(item) = self.window.get(id).cloned() else {
            return false;
        };
        self.selection.select(item);
        self.load_selected().await;
        true
    }

    /// Selects the item nearest `timestamp` and centers a tag-filter window on it
    ///
    /// Returns the id selected afterwards, or `None` if there is no media or
    /// a call failed.
    pub async fn jump_to_date(&mut self, timestamp: f64) -> Option<MediaId> {
        let item = match self.backend.nearest_to(timestamp).await {
            Ok(Some(item)) => item,
            Ok(None) => return None,
            Err(e) => {
                self.fail(&e);
                return None;
            }
        };
        info!("Jumping to {} near {timestamp}", item.id);
        self.set_mode(SearchMode::TagFilter);
        self.selection.select(item);
        match self.search().await {
            Ok(SearchOutcome::Applied { selection, .. }) => selection.id(),
            _ => None,
        }
    }

    /// Deletes the selected item after confirmation
    ///
    /// The replacement is picked in the direction of the last move, falling
    /// back to the other direction.
    ///
    /// # Errors
    ///
    /// Returns `GalleryError::NoSelection` without a selected item, or
    /// `GalleryError::Cancelled` without `confirm`.
    pub async fn delete_current(&mut self, confirm: bool) -> Result<Deletion> {
        let removed = self.selection.current_id().ok_or(GalleryError::NoSelection)?;
        if !confirm {
            return Err(GalleryError::Cancelled);
        }
        if let Err(e) = self.backend.delete_media(removed).await {
            self.fail(&e);
            return Ok(Deletion::Failed);
        }
        info!("Deleted media {removed}");

        let direction = self.selection.advance_direction();
        let index = self.window.position(removed);
        self.window.remove(removed);
        self.cache.remove(removed);

        let replacement = match index {
            Some(index) => self.selection.replace_removed(&self.window, index, direction),
            None => {
                self.selection.clear();
                match self.selection.step(&self.window, direction) {
                    Step::Moved(item) => Some(item.id),
                    Step::Blocked(_) | Step::Empty => None,
                }
            }
        };

        let replacement = if replacement.is_none() && self.window.is_empty() {
            match self.search().await {
                Ok(SearchOutcome::Applied { selection, .. }) => selection.id(),
                _ => None,
            }
        } else {
            self.load_selected().await;
            replacement
        };
        Ok(Deletion::Deleted {
            removed,
            replacement,
        })
    }

    /// Triggers a backend resync, then reloads tags and the current search
    ///
    /// Returns `false` if the sync call failed.
    pub async fn sync(&mut self) -> bool {
        if let Err(e) = self.backend.sync().await {
            self.fail(&e);
            return false;
        }
        self.refresh_tags().await;
        if let Err(e) = self.search().await {
            debug!("Skipping search after sync: {e}");
        }
        true
    }

    // ============================================================================
    // Current Item
    // ============================================================================

    async fn load_item_tags(&mut self, item: MediaId) -> bool {
        match self.backend.media_tags(item).await {
            Ok(tags) => {
                self.tags.set_item_tags(item, &tags);
                true
            }
            Err(e) => {
                self.fail(&e);
                self.tags.clear_item();
                false
            }
        }
    }

    async fn load_selected(&mut self) {
        let Some(id) = self.selection.current_id() else {
            self.payload = None;
            self.tags.clear_item();
            return;
        };

        let backend = self.backend();
        match self
            .cache
            .get(id, |id| async move { backend.media_data(id).await })
            .await
        {
            Ok(payload) => self.payload = Some(payload),
            Err(e) => {
                self.fail(&e);
                self.payload = None;
            }
        }
        self.load_item_tags(id).await;
    }

    /// Display data for the selected item, `None` when nothing is selected
    #[must_use]
    pub fn current_view(&self) -> Option<CurrentView> {
        let item = self.selection.current()?.clone();
        let tags = if self.tags.item() == Some(item.id) {
            self.tags.item_tags().into_iter().cloned().collect()
        } else {
            Vec::new()
        };
        Some(CurrentView {
            name: display::truncate_name(&item.path, self.settings.max_name_length),
            date: display::format_timestamp(item.timestamp, &Local),
            payload: self.payload.clone(),
            tags,
            item,
        })
    }
}
