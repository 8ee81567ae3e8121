//! Window manager
//!
//! The window is the bounded, de-duplicated working set of media around a
//! focal point. It is always replaced wholesale by a fetch result, never
//! patched, and it exists in two orders:
//!
//! - **Relevance order** ([`WindowManager::items`]): the output of
//!   [`sort_by_relevance`]. Truncation to capacity keeps the most relevant
//!   items, and a fresh search selects the first one.
//! - **Rendered order** ([`WindowManager::rendered`]): what the user scrolls
//!   through and navigates with next/prev. Tag-filter windows render
//!   chronologically, which puts the focal item near the middle; prompt
//!   windows render by score, same as relevance order.
//!
//! # Staleness
//!
//! Every fetch is bracketed by [`WindowManager::begin_fetch`] and
//! [`WindowManager::apply`]. Only the most recently issued ticket may replace
//! the window; results for older tickets are dropped whatever order they
//! complete in.

use super::grouping::{self, Group};
use super::search::SearchMode;
use crate::api::{MediaId, MediaItem};
use chrono::TimeZone;
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default minimum spacing between boundary-triggered refetches
pub const DEFAULT_REFETCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// One end of the rendered window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// A boundary item chosen as the anchor of a re-center fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub id: MediaId,
    pub edge: Edge,
}

/// Proof that a fetch was issued, needed to apply its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    boundary: Option<Boundary>,
}

impl FetchTicket {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn boundary(&self) -> Option<Boundary> {
        self.boundary
    }
}

/// Where the anchor item moved in rendered order, for scroll correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAnchor {
    pub id: MediaId,
    pub old_index: usize,
    pub new_index: usize,
}

/// Outcome of applying a fetch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowUpdate {
    /// A later fetch was issued; this result was discarded
    Stale,
    /// Same membership and order as before; nothing to redraw
    Unchanged,
    /// The window was replaced
    Replaced { anchor: Option<ScrollAnchor> },
}

/// Orders items by relevance, in place
///
/// - Tag filter without focal: timestamp ascending
/// - Tag filter with focal timestamp `t`: `|timestamp - t|` ascending
/// - Prompt: score descending, focal ignored
///
/// Ties are broken by ascending id in every mode.
pub fn sort_by_relevance(items: &mut [MediaItem], mode: SearchMode, focal: Option<f64>) {
    items.sort_by(|a, b| relevance(a, b, mode, focal));
}

fn relevance(a: &MediaItem, b: &MediaItem, mode: SearchMode, focal: Option<f64>) -> Ordering {
    let primary = match mode {
        SearchMode::TagFilter => match focal {
            Some(t) => (a.timestamp - t).abs().total_cmp(&(b.timestamp - t).abs()),
            None => a.timestamp.total_cmp(&b.timestamp),
        },
        SearchMode::Prompt => {
            let score = |item: &MediaItem| item.score.unwrap_or(f64::NEG_INFINITY);
            score(b).total_cmp(&score(a))
        }
    };
    primary.then(a.id.cmp(&b.id))
}

/// Orders items for display, in place
pub fn sort_for_display(items: &mut [MediaItem], mode: SearchMode) {
    match mode {
        SearchMode::TagFilter => {
            items.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        }
        SearchMode::Prompt => sort_by_relevance(items, mode, None),
    }
}

/// Keeps one entry per id, later entries overwriting earlier ones
#[must_use]
pub fn dedup_by_id(items: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut by_id: HashMap<MediaId, MediaItem> = HashMap::with_capacity(items.len());
    for item in items {
        by_id.insert(item.id, item);
    }
    by_id.into_values().collect()
}

/// Owns the current window and decides when to refetch
#[derive(Debug)]
pub struct WindowManager {
    items: Vec<MediaItem>,
    rendered: Vec<MediaItem>,
    mode: SearchMode,
    focal: Option<MediaItem>,
    tag_capacity: usize,
    prompt_capacity: usize,
    issued: u64,
    debounce: Duration,
    last_boundary_fetch: Option<Instant>,
    exhausted_start: bool,
    exhausted_end: bool,
}

impl WindowManager {
    /// Creates an empty window
    ///
    /// Tag-filter windows hold up to `2 * radius + 1` items, prompt windows
    /// up to `prompt_limit`.
    #[must_use]
    pub fn new(radius: usize, prompt_limit: usize, debounce: Duration) -> Self {
        Self {
            items: Vec::new(),
            rendered: Vec::new(),
            mode: SearchMode::TagFilter,
            focal: None,
            tag_capacity: 2 * radius.max(1) + 1,
            prompt_capacity: prompt_limit.max(1),
            issued: 0,
            debounce,
            last_boundary_fetch: None,
            exhausted_start: false,
            exhausted_end: false,
        }
    }

    /// Items in relevance order
    #[must_use]
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Items in display order
    #[must_use]
    pub fn rendered(&self) -> &[MediaItem] {
        &self.rendered
    }

    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.mode
    }

    #[must_use]
    pub const fn focal(&self) -> Option<&MediaItem> {
        self.focal.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self, mode: SearchMode) -> usize {
        match mode {
            SearchMode::TagFilter => self.tag_capacity,
            SearchMode::Prompt => self.prompt_capacity,
        }
    }

    #[must_use]
    pub fn contains(&self, id: MediaId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    #[must_use]
    pub fn get(&self, id: MediaId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Index of `id` in rendered order
    #[must_use]
    pub fn position(&self, id: MediaId) -> Option<usize> {
        self.rendered.iter().position(|item| item.id == id)
    }

    /// The first or last rendered item
    #[must_use]
    pub fn edge_item(&self, edge: Edge) -> Option<&MediaItem> {
        match edge {
            Edge::Start => self.rendered.first(),
            Edge::End => self.rendered.last(),
        }
    }

    /// Empties the window for a new search mode
    ///
    /// In-flight fetches are invalidated.
    pub fn reset(&mut self, mode: SearchMode) {
        debug!("Window reset for {mode:?}");
        self.items.clear();
        self.rendered.clear();
        self.focal = None;
        self.mode = mode;
        self.issued += 1;
        self.last_boundary_fetch = None;
        self.exhausted_start = false;
        self.exhausted_end = false;
    }

    /// Registers a new fetch, superseding all earlier ones
    pub fn begin_fetch(&mut self, boundary: Option<Boundary>) -> FetchTicket {
        self.issued += 1;
        FetchTicket {
            generation: self.issued,
            boundary,
        }
    }

    /// Whether `ticket` is still the latest issued fetch
    #[must_use]
    pub const fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.issued
    }

    /// Replaces the window with a fetch result
    ///
    /// The result is de-duplicated, sorted by relevance around `focal`, and
    /// truncated to the mode's capacity. If membership and display order are
    /// unchanged the window keeps its layout and only refreshes item fields.
    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        mode: SearchMode,
        focal: Option<MediaItem>,
        items: Vec<MediaItem>,
    ) -> WindowUpdate {
        if !self.is_current(&ticket) {
            debug!(
                "Discarding stale window result (ticket {}, latest {})",
                ticket.generation, self.issued
            );
            return WindowUpdate::Stale;
        }

        let mut items = dedup_by_id(items);
        let focal_time = match mode {
            SearchMode::TagFilter => focal.as_ref().map(|item| item.timestamp),
            SearchMode::Prompt => None,
        };
        sort_by_relevance(&mut items, mode, focal_time);
        items.truncate(self.capacity(mode));

        let mut rendered = items.clone();
        sort_for_display(&mut rendered, mode);

        let same_layout = mode == self.mode
            && rendered.len() == self.rendered.len()
            && rendered
                .iter()
                .zip(&self.rendered)
                .all(|(new, old)| new.id == old.id);

        if same_layout {
            debug!("Window unchanged ({} items)", rendered.len());
            if let Some(boundary) = ticket.boundary {
                match boundary.edge {
                    Edge::Start => self.exhausted_start = true,
                    Edge::End => self.exhausted_end = true,
                }
            }
            self.items = items;
            self.rendered = rendered;
            self.focal = focal;
            return WindowUpdate::Unchanged;
        }

        let anchor = ticket.boundary.and_then(|boundary| {
            let old_index = self.position(boundary.id)?;
            let new_index = rendered.iter().position(|item| item.id == boundary.id)?;
            Some(ScrollAnchor {
                id: boundary.id,
                old_index,
                new_index,
            })
        });

        debug!(
            "Window replaced: {} -> {} items ({mode:?})",
            self.rendered.len(),
            rendered.len()
        );
        self.items = items;
        self.rendered = rendered;
        self.mode = mode;
        self.focal = focal;
        self.exhausted_start = false;
        self.exhausted_end = false;
        WindowUpdate::Replaced { anchor }
    }

    /// Removes an item, e.g. after it was deleted
    pub fn remove(&mut self, id: MediaId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.rendered.retain(|item| item.id != id);
        if self.focal.as_ref().is_some_and(|item| item.id == id) {
            self.focal = None;
        }
        self.items.len() != before
    }

    /// Decides whether a scroll position warrants a re-center fetch
    ///
    /// `first_visible` and `last_visible` are indices into rendered order.
    /// Only tag-filter windows page; edges whose last re-center brought
    /// nothing new are skipped until the window changes, and triggers are
    /// spaced by the debounce interval.
    pub fn check_boundary(
        &mut self,
        first_visible: usize,
        last_visible: usize,
        now: Instant,
    ) -> Option<Boundary> {
        if self.mode != SearchMode::TagFilter || self.rendered.is_empty() {
            return None;
        }

        let last_index = self.rendered.len() - 1;
        let near_start = first_visible <= 1 && !self.exhausted_start;
        let near_end = last_visible + 1 >= last_index && !self.exhausted_end;

        let edge = if near_start {
            Edge::Start
        } else if near_end {
            Edge::End
        } else {
            return None;
        };

        if let Some(last) = self.last_boundary_fetch
            && now.duration_since(last) < self.debounce
        {
            debug!("Boundary refetch debounced");
            return None;
        }

        let id = self.edge_item(edge)?.id;
        self.last_boundary_fetch = Some(now);
        Some(Boundary { id, edge })
    }

    /// Display separators over the rendered order
    #[must_use]
    pub fn groups<Tz: TimeZone>(&self, tz: &Tz) -> Vec<Group> {
        grouping::group_items(&self.rendered, self.mode, tz)
    }
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(
            super::search::DEFAULT_TAG_RADIUS,
            super::search::DEFAULT_PROMPT_LIMIT,
            DEFAULT_REFETCH_DEBOUNCE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: MediaId, timestamp: f64) -> MediaItem {
        MediaItem::new(id, format!("{id}.jpg"), timestamp)
    }

    fn scored(id: MediaId, score: f64) -> MediaItem {
        MediaItem::new(id, format!("{id}.jpg"), 0.0).with_score(score)
    }

    fn ids(items: &[MediaItem]) -> Vec<MediaId> {
        items.iter().map(|item| item.id).collect()
    }

    fn fill(window: &mut WindowManager, mode: SearchMode, focal: Option<MediaItem>, items: Vec<MediaItem>) -> WindowUpdate {
        let ticket = window.begin_fetch(None);
        window.apply(ticket, mode, focal, items)
    }

    #[test]
    fn test_tag_sort_without_focal() {
        let mut items = vec![item(7, 500.0), item(3, 100.0)];
        sort_by_relevance(&mut items, SearchMode::TagFilter, None);
        assert_eq!(ids(&items), vec![3, 7]);
    }

    #[test]
    fn test_tag_sort_with_focal() {
        let mut items = vec![item(3, 100.0), item(7, 500.0)];
        sort_by_relevance(&mut items, SearchMode::TagFilter, Some(480.0));
        assert_eq!(ids(&items), vec![7, 3]);
    }

    #[test]
    fn test_tag_sort_ties_by_id() {
        let mut items = vec![item(9, 110.0), item(4, 90.0), item(2, 100.0), item(1, 110.0)];
        sort_by_relevance(&mut items, SearchMode::TagFilter, Some(100.0));
        assert_eq!(ids(&items), vec![2, 1, 4, 9]);
    }

    #[test]
    fn test_prompt_sort_descending_score() {
        let mut items = vec![scored(1, 0.2), scored(2, 0.9), scored(0, 0.2)];
        sort_by_relevance(&mut items, SearchMode::Prompt, Some(1.0));
        assert_eq!(ids(&items), vec![2, 0, 1]);
    }

    #[test]
    fn test_tag_order_property() {
        let mut items: Vec<MediaItem> = (0..40)
            .map(|i| item(i, f64::from((i as i32 * 37) % 23) * 10.0))
            .collect();
        let focal = 115.0;
        sort_by_relevance(&mut items, SearchMode::TagFilter, Some(focal));
        for pair in items.windows(2) {
            let da = (pair[0].timestamp - focal).abs();
            let db = (pair[1].timestamp - focal).abs();
            assert!(da < db || (da == db && pair[0].id < pair[1].id));
        }
    }

    #[test]
    fn test_prompt_order_property() {
        let mut items: Vec<MediaItem> = (0..40)
            .rev()
            .map(|i| scored(i, f64::from((i as i32 * 37) % 11) / 10.0))
            .collect();
        sort_by_relevance(&mut items, SearchMode::Prompt, Some(115.0));
        for pair in items.windows(2) {
            let (sa, sb) = (pair[0].score.unwrap(), pair[1].score.unwrap());
            assert!(sa > sb || (sa == sb && pair[0].id < pair[1].id));
        }
    }

    #[test]
    fn test_apply_dedups_and_truncates() {
        let mut window = WindowManager::new(1, 5, DEFAULT_REFETCH_DEBOUNCE);
        let focal = item(2, 200.0);
        let update = fill(
            &mut window,
            SearchMode::TagFilter,
            Some(focal),
            vec![item(2, 200.0), item(1, 100.0), item(2, 200.0), item(3, 300.0), item(4, 400.0)],
        );
        assert!(matches!(update, WindowUpdate::Replaced { .. }));
        assert_eq!(window.len(), 3);
        assert_eq!(ids(window.items()), vec![2, 1, 3]);
        assert_eq!(ids(window.rendered()), vec![1, 2, 3]);
    }

    #[test]
    fn test_later_fetch_fields_win() {
        let mut window = WindowManager::default();
        fill(
            &mut window,
            SearchMode::Prompt,
            None,
            vec![scored(5, 0.1), scored(5, 0.8)],
        );
        assert_eq!(window.get(5).and_then(|i| i.score), Some(0.8));
    }

    #[test]
    fn test_stale_result_discarded() {
        let mut window = WindowManager::default();
        let first = window.begin_fetch(None);
        let second = window.begin_fetch(None);

        let update = window.apply(second, SearchMode::TagFilter, None, vec![item(2, 2.0)]);
        assert!(matches!(update, WindowUpdate::Replaced { .. }));

        let update = window.apply(first, SearchMode::TagFilter, None, vec![item(1, 1.0)]);
        assert_eq!(update, WindowUpdate::Stale);
        assert_eq!(ids(window.items()), vec![2]);
    }

    #[test]
    fn test_reset_invalidates_in_flight() {
        let mut window = WindowManager::default();
        fill(&mut window, SearchMode::TagFilter, None, vec![item(1, 1.0)]);
        let ticket = window.begin_fetch(None);
        window.reset(SearchMode::Prompt);

        assert!(window.is_empty());
        assert_eq!(
            window.apply(ticket, SearchMode::TagFilter, None, vec![item(1, 1.0)]),
            WindowUpdate::Stale
        );
    }

    #[test]
    fn test_identical_membership_is_unchanged() {
        let mut window = WindowManager::default();
        fill(&mut window, SearchMode::TagFilter, None, vec![item(1, 1.0), item(2, 2.0)]);
        let update = fill(&mut window, SearchMode::TagFilter, None, vec![item(2, 2.0), item(1, 1.0)]);
        assert_eq!(update, WindowUpdate::Unchanged);
    }

    #[test]
    fn test_scroll_anchor_reported() {
        let mut window = WindowManager::new(2, 10, Duration::ZERO);
        let items: Vec<MediaItem> = (1..=5).map(|i| item(i, f64::from(i as i32) * 10.0)).collect();
        fill(&mut window, SearchMode::TagFilter, None, items);

        let boundary = window.check_boundary(3, 4, Instant::now()).unwrap();
        assert_eq!(boundary, Boundary { id: 5, edge: Edge::End });

        let ticket = window.begin_fetch(Some(boundary));
        let newer: Vec<MediaItem> = (3..=7).map(|i| item(i, f64::from(i as i32) * 10.0)).collect();
        let update = window.apply(ticket, SearchMode::TagFilter, Some(item(5, 50.0)), newer);
        assert_eq!(
            update,
            WindowUpdate::Replaced {
                anchor: Some(ScrollAnchor { id: 5, old_index: 4, new_index: 2 })
            }
        );
    }

    #[test]
    fn test_boundary_only_in_tag_mode() {
        let mut window = WindowManager::default();
        fill(&mut window, SearchMode::Prompt, None, vec![scored(1, 0.5), scored(2, 0.4)]);
        assert!(window.check_boundary(0, 1, Instant::now()).is_none());
    }

    #[test]
    fn test_boundary_not_near_edges() {
        let mut window = WindowManager::new(5, 10, Duration::ZERO);
        let items: Vec<MediaItem> = (1..=10).map(|i| item(i, f64::from(i as i32))).collect();
        fill(&mut window, SearchMode::TagFilter, None, items);
        assert!(window.check_boundary(3, 6, Instant::now()).is_none());
        assert_eq!(
            window.check_boundary(1, 4, Instant::now()),
            Some(Boundary { id: 1, edge: Edge::Start })
        );
    }

    #[test]
    fn test_boundary_debounced() {
        let mut window = WindowManager::new(5, 10, Duration::from_millis(500));
        let items: Vec<MediaItem> = (1..=10).map(|i| item(i, f64::from(i as i32))).collect();
        fill(&mut window, SearchMode::TagFilter, None, items);

        let start = Instant::now();
        assert!(window.check_boundary(0, 3, start).is_some());
        assert!(window.check_boundary(0, 3, start + Duration::from_millis(100)).is_none());
        assert!(window.check_boundary(0, 3, start + Duration::from_millis(600)).is_some());
    }

    #[test]
    fn test_exhausted_edge_skipped() {
        let mut window = WindowManager::new(5, 10, Duration::ZERO);
        let items: Vec<MediaItem> = (1..=10).map(|i| item(i, f64::from(i as i32))).collect();
        fill(&mut window, SearchMode::TagFilter, None, items.clone());

        let boundary = window.check_boundary(0, 3, Instant::now()).unwrap();
        let ticket = window.begin_fetch(Some(boundary));
        let update = window.apply(ticket, SearchMode::TagFilter, Some(item(1, 1.0)), items);
        assert_eq!(update, WindowUpdate::Unchanged);

        assert!(window.check_boundary(0, 3, Instant::now()).is_none());
        assert_eq!(window.check_boundary(6, 9, Instant::now()).map(|b| b.edge), Some(Edge::End));
    }

    #[test]
    fn test_remove() {
        let mut window = WindowManager::default();
        fill(&mut window, SearchMode::TagFilter, None, vec![item(1, 1.0), item(2, 2.0)]);
        assert!(window.remove(1));
        assert!(!window.remove(1));
        assert_eq!(ids(window.rendered()), vec![2]);
    }
}
