//! Integration tests for the tagview engine
//!
//! These tests drive a `Gallery` over the in-memory `MockBackend` through
//! complete user flows: searching, paging, navigating and editing.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tagview::api::{Backend, MediaId, MediaItem, MockBackend, Payload, Tag};
use tagview::gallery::cache::MediaCache;
use tagview::gallery::window::sort_by_relevance;
use tagview::gallery::{
    Boundary, Edge, EngineSettings, Gallery, GroupKey, Navigation, SearchMode, SearchOutcome,
    SelectionChange, WindowUpdate,
};

/// Helper function to build a settings value with a given radius and no debounce
fn settings(radius: usize) -> EngineSettings {
    EngineSettings {
        tag_radius: radius,
        refetch_debounce: Duration::ZERO,
        ..EngineSettings::default()
    }
}

/// Helper function to create a backend with a day of photos every hour
fn timeline_backend(count: MediaId) -> MockBackend {
    MockBackend::new()
        .with_media(
            (1..=count).map(|i| MediaItem::new(i, format!("photo_{i:03}.jpg"), i as f64 * 3600.0)),
        )
        .with_tag(Tag::new(1, "vacation"), &(1..=count).collect::<Vec<MediaId>>())
}

/// Helper function to record every failure passed to the handler
fn record_failures(gallery: &mut Gallery<MockBackend>) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    gallery.set_failure_handler(move |e| sink.borrow_mut().push(e.to_string()));
    seen
}

fn ids(items: &[MediaItem]) -> Vec<MediaId> {
    items.iter().map(|item| item.id).collect()
}

#[tokio::test]
async fn test_scenario_a_filter_without_focal() {
    let backend = MockBackend::new()
        .with_media([MediaItem::new(7, "b.jpg", 500.0), MediaItem::new(3, "a.jpg", 100.0)])
        .with_tag(Tag::new(1, "vacation"), &[3, 7]);
    let mut gallery = Gallery::new(backend, settings(10));
    gallery.refresh_tags().await;

    gallery.filter_by_names(&["vacation".to_string()]).await.unwrap();
    assert_eq!(ids(gallery.window().items()), vec![3, 7]);
    assert_eq!(gallery.selection().current_id(), Some(3));
}

#[test]
fn test_scenario_b_focal_proximity() {
    let mut items = vec![MediaItem::new(3, "a.jpg", 100.0), MediaItem::new(7, "b.jpg", 500.0)];
    sort_by_relevance(&mut items, SearchMode::TagFilter, Some(480.0));
    assert_eq!(ids(&items), vec![7, 3]);
}

#[tokio::test]
async fn test_scenario_b_through_selection() {
    let backend = MockBackend::new()
        .with_media([
            MediaItem::new(3, "a.jpg", 100.0),
            MediaItem::new(7, "b.jpg", 500.0),
            MediaItem::new(9, "c.jpg", 480.0),
        ])
        .with_tag(Tag::new(1, "vacation"), &[3, 7]);
    let mut gallery = Gallery::new(backend, settings(10));
    gallery.refresh_tags().await;

    // item 9 is not tagged but serves as the focal point at t=480
    gallery.jump_to_date(480.0).await;
    gallery.filter_by_names(&["vacation".to_string()]).await.unwrap();
    assert_eq!(ids(gallery.window().items()), vec![7, 3]);
    assert_eq!(ids(gallery.window().rendered()), vec![3, 7]);
    assert_eq!(gallery.selection().current_id(), Some(7));
}

#[tokio::test]
async fn test_scenario_c_prompt_order() {
    let backend = MockBackend::new().with_prompt_results(
        "beach at dusk",
        vec![
            MediaItem::new(1, "a.jpg", 10.0).with_score(0.2),
            MediaItem::new(2, "b.jpg", 20.0).with_score(0.9),
        ],
    );
    let mut gallery = Gallery::new(backend, settings(10));

    let outcome = gallery.submit_prompt("beach at dusk").await.unwrap();
    assert!(matches!(
        outcome,
        SearchOutcome::Applied { selection: SelectionChange::Moved(2), .. }
    ));
    assert_eq!(ids(gallery.window().items()), vec![2, 1]);
    assert_eq!(ids(gallery.window().rendered()), vec![2, 1]);
    assert_eq!(gallery.mode(), SearchMode::Prompt);
}

#[tokio::test]
async fn test_scenario_d_empty_result() {
    let backend = timeline_backend(5).with_tag(Tag::new(2, "empty"), &[]);
    let mut gallery = Gallery::new(backend, settings(10));
    gallery.refresh_tags().await;
    gallery.search().await.unwrap();
    assert!(gallery.current_view().is_some());

    let outcome = gallery.filter_by_names(&["empty".to_string()]).await.unwrap();
    assert!(matches!(
        outcome,
        SearchOutcome::Applied { selection: SelectionChange::Cleared, .. }
    ));
    assert!(gallery.window().is_empty());
    assert!(gallery.current_view().is_none());
    assert_eq!(gallery.next().await, Navigation::Empty);
}

#[tokio::test]
async fn test_scenario_e_cache_eviction() {
    let backend = timeline_backend(3);
    let mut cache = MediaCache::new(2);
    for id in [1, 2, 1, 3] {
        cache.get(id, |id| backend.media_data(id)).await.unwrap();
    }
    assert!(cache.contains(1));
    assert!(!cache.contains(2));
    assert!(cache.contains(3));
    assert_eq!(backend.call_count("media_data 1"), 1);
}

#[tokio::test]
async fn test_cache_bound_through_gallery() {
    let settings = EngineSettings {
        cache_capacity: 3,
        ..settings(10)
    };
    let mut gallery = Gallery::new(timeline_backend(10), settings);
    gallery.search().await.unwrap();
    for _ in 0..8 {
        gallery.next().await;
    }
    assert_eq!(gallery.cache().len(), 3);
    assert!(gallery.cache().contains(gallery.selection().current_id().unwrap()));
}

#[tokio::test]
async fn test_selection_persists_across_refetch() {
    let mut gallery = Gallery::new(timeline_backend(20), settings(5));
    gallery.search().await.unwrap();
    gallery.next().await;
    gallery.next().await;
    let selected = gallery.selection().current_id();

    let outcome = gallery.search().await.unwrap();
    assert!(matches!(
        outcome,
        SearchOutcome::Applied { selection: SelectionChange::Kept(_), .. }
    ));
    assert_eq!(gallery.selection().current_id(), selected);
}

#[tokio::test]
async fn test_window_has_no_duplicates() {
    let mut gallery = Gallery::new(timeline_backend(30), settings(4));
    gallery.jump_to_date(15.0 * 3600.0).await;
    // the nearest 2 * 4 + 1 items, with the focal item in the middle
    assert_eq!(ids(gallery.window().rendered()), (11..=19).collect::<Vec<_>>());

    // around returns the anchor on both sides
    gallery.recenter(Boundary { id: 19, edge: Edge::End }).await;
    let window_ids = ids(gallery.window().items());
    let unique: BTreeSet<MediaId> = window_ids.iter().copied().collect();
    assert_eq!(unique.len(), window_ids.len());
    assert_eq!(ids(gallery.window().rendered()), (16..=22).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_stale_recenter_discarded() {
    let mut gallery = Gallery::new(timeline_backend(40), settings(3));
    gallery.jump_to_date(20.0 * 3600.0).await;
    let backend = gallery.backend();

    let first = gallery
        .recenter_request(Boundary { id: 18, edge: Edge::Start })
        .unwrap();
    let second = gallery
        .recenter_request(Boundary { id: 22, edge: Edge::End })
        .unwrap();

    let second_result = second.query().execute(&*backend).await;
    let first_result = first.query().execute(&*backend).await;

    let update = gallery.finish_window_request(second, second_result);
    assert!(matches!(update, Some(WindowUpdate::Replaced { .. })));
    let after_second = ids(gallery.window().rendered());

    let update = gallery.finish_window_request(first, first_result);
    assert_eq!(update, Some(WindowUpdate::Stale));
    assert_eq!(ids(gallery.window().rendered()), after_second);
    assert_eq!(after_second, (20..=24).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_scroll_boundary_recenters_with_anchor() {
    let mut gallery = Gallery::new(timeline_backend(40), settings(3));
    gallery.jump_to_date(20.0 * 3600.0).await;
    let last = gallery.window().len() - 1;
    assert_eq!(gallery.window().rendered()[last].id, 23);

    let update = gallery.on_scroll(last - 2, last, Instant::now()).await;
    match update {
        Some(WindowUpdate::Replaced { anchor: Some(anchor) }) => {
            assert_eq!(anchor.id, 23);
            assert_eq!(anchor.old_index, last);
            assert_eq!(anchor.new_index, 2);
        }
        other => panic!("unexpected update: {other:?}"),
    }
    assert_eq!(gallery.selection().current_id(), Some(20));
}

#[tokio::test]
async fn test_vanished_selection_still_searchable() {
    let mut gallery = Gallery::new(timeline_backend(10), settings(2));
    let failures = record_failures(&mut gallery);
    gallery.search().await.unwrap();
    assert!(gallery.select(3).await);
    // removed behind the gallery's back, e.g. by another client
    gallery.backend().delete_media(3).await.unwrap();

    let outcome = gallery.apply_tag_filters().await;
    assert!(matches!(
        outcome,
        SearchOutcome::Applied { selection: SelectionChange::Moved(2), .. }
    ));
    assert_eq!(ids(gallery.window().rendered()), vec![1, 2, 4, 5, 6]);

    let outcome = gallery.apply_tag_filters().await;
    assert!(matches!(
        outcome,
        SearchOutcome::Applied { selection: SelectionChange::Kept(2), .. }
    ));
    assert!(failures.borrow().is_empty());
    assert_eq!(gallery.backend().call_count("around"), 0);
}

#[tokio::test]
async fn test_sync_picks_up_new_media() {
    let mut gallery = Gallery::new(timeline_backend(5), settings(3));
    gallery.search().await.unwrap();
    gallery
        .backend()
        .insert_media(MediaItem::new(6, "photo_006.jpg", 2.5 * 3600.0));

    assert!(gallery.sync().await);
    assert_eq!(ids(gallery.window().rendered()), vec![1, 2, 6, 3, 4, 5]);
    assert_eq!(gallery.selection().current_id(), Some(1));
}

#[tokio::test]
async fn test_prompt_window_order_property() {
    let results: Vec<MediaItem> = (1..=30)
        .rev()
        .map(|i| {
            MediaItem::new(i, format!("p{i}.jpg"), 0.0).with_score(f64::from((i as i32 * 7) % 5) / 4.0)
        })
        .collect();
    let backend = MockBackend::new().with_prompt_results("sea", results);
    let mut gallery = Gallery::new(backend, settings(3));
    gallery.submit_prompt("sea").await.unwrap();

    let items = gallery.window().items();
    assert_eq!(items.len(), 30);
    for pair in items.windows(2) {
        let (sa, sb) = (pair[0].score.unwrap(), pair[1].score.unwrap());
        assert!(sa > sb || (sa == sb && pair[0].id < pair[1].id));
    }
    assert_eq!(ids(gallery.window().rendered()), ids(items));
}

#[tokio::test]
async fn test_scroll_debounced() {
    let settings = EngineSettings {
        refetch_debounce: Duration::from_millis(500),
        ..settings(3)
    };
    let mut gallery = Gallery::new(timeline_backend(40), settings);
    gallery.jump_to_date(20.0 * 3600.0).await;
    gallery.backend().clear_calls();

    let now = Instant::now();
    assert!(gallery.on_scroll(0, 2, now).await.is_some());
    assert!(gallery.on_scroll(0, 2, now + Duration::from_millis(50)).await.is_none());
    assert_eq!(gallery.backend().call_count("around"), 1);
}

#[tokio::test]
async fn test_prompt_mode_never_pages() {
    let backend = timeline_backend(5).with_prompt_results(
        "dog",
        vec![
            MediaItem::new(1, "a", 0.0).with_score(0.5),
            MediaItem::new(2, "b", 0.0).with_score(0.4),
            MediaItem::new(3, "c", 0.0).with_score(0.3),
        ],
    );
    let mut gallery = Gallery::new(backend, settings(3));
    gallery.submit_prompt("dog").await.unwrap();
    assert!(gallery.on_scroll(0, 2, Instant::now()).await.is_none());
    assert_eq!(gallery.backend().call_count("around"), 0);
}

#[tokio::test]
async fn test_navigation_walks_whole_collection() {
    let mut gallery = Gallery::new(timeline_backend(25), settings(3));
    gallery.search().await.unwrap();

    let mut visited = vec![gallery.selection().current_id().unwrap()];
    loop {
        match gallery.next().await {
            Navigation::Moved(id) => visited.push(id),
            Navigation::Exhausted => break,
            other => panic!("unexpected navigation: {other:?}"),
        }
    }
    assert_eq!(visited, (1..=25).collect::<Vec<_>>());

    for expected in (20..=24).rev() {
        assert_eq!(gallery.prev().await, Navigation::Moved(expected));
    }
}

#[tokio::test]
async fn test_mode_switch_resets_window() {
    let backend = timeline_backend(5).with_prompt_results("x", vec![]);
    let mut gallery = Gallery::new(backend, settings(3));
    gallery.search().await.unwrap();
    assert!(!gallery.window().is_empty());

    assert!(gallery.set_mode(SearchMode::Prompt));
    assert!(gallery.window().is_empty());
    assert!(gallery.search().await.is_err());
}

#[tokio::test]
async fn test_blank_prompt_rejected_locally() {
    let mut gallery = Gallery::new(timeline_backend(5), settings(3));
    assert!(gallery.submit_prompt("  ").await.is_err());
    assert!(gallery.backend().calls().is_empty());
    assert_eq!(gallery.mode(), SearchMode::TagFilter);
}

#[tokio::test]
async fn test_failures_reported_once_each() {
    let mut gallery = Gallery::new(timeline_backend(5), settings(3));
    let failures = record_failures(&mut gallery);
    gallery.search().await.unwrap();
    gallery.backend().set_offline(true);

    assert_eq!(gallery.next().await, Navigation::Moved(2));
    // payload and tags for item 2 both failed
    assert_eq!(failures.borrow().len(), 2);
    assert!(gallery.current_view().unwrap().payload.is_none());

    assert!(!gallery.sync().await);
    assert_eq!(failures.borrow().len(), 3);
    assert!(failures.borrow().iter().all(|f| f.contains("unavailable")));
}

#[tokio::test]
async fn test_cached_payload_survives_outage() {
    let mut gallery = Gallery::new(timeline_backend(5), settings(3));
    let failures = record_failures(&mut gallery);
    gallery.search().await.unwrap();
    gallery.next().await;
    gallery.backend().set_offline(true);

    gallery.prev().await;
    let view = gallery.current_view().unwrap();
    assert_eq!(view.payload, Some(Payload::from(b"photo_001.jpg".as_slice())));
    // only the tag lookup failed
    assert_eq!(failures.borrow().len(), 1);
}

#[tokio::test]
async fn test_tag_editing_flow() {
    let mut gallery = Gallery::new(timeline_backend(5), settings(3));
    gallery.refresh_tags().await;
    assert!(gallery.create_tag("favorite").await.unwrap());
    gallery.search().await.unwrap();

    let favorite = gallery.tags().find_by_name("favorite").unwrap().id;
    assert_eq!(gallery.toggle_assignment(favorite).await.unwrap(), Some(true));
    let names: Vec<String> = gallery
        .current_view()
        .unwrap()
        .tags
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(names, vec!["favorite", "vacation"]);

    gallery.toggle_filter_tag(favorite);
    gallery.apply_tag_filters().await;
    assert_eq!(ids(gallery.window().items()), vec![1]);

    gallery.clear_tag_filters();
    gallery.apply_tag_filters().await;
    assert_eq!(ids(gallery.window().rendered()), vec![1, 2, 3, 4, 5]);
    assert_eq!(gallery.selection().current_id(), Some(1));
}

#[tokio::test]
async fn test_delete_last_item_refetches() {
    let backend = timeline_backend(6);
    let mut gallery = Gallery::new(backend, settings(1));
    gallery.jump_to_date(1.0 * 3600.0).await;
    assert_eq!(ids(gallery.window().rendered()), vec![1, 2, 3]);

    gallery.delete_current(true).await.unwrap();
    gallery.delete_current(true).await.unwrap();
    let deletion = gallery.delete_current(true).await.unwrap();
    assert!(matches!(
        deletion,
        tagview::gallery::Deletion::Deleted { removed: 3, replacement: Some(4) }
    ));
    assert!(gallery.window().contains(4));
}

#[tokio::test]
async fn test_groups_follow_mode() {
    let backend = MockBackend::new()
        .with_media((1..=4).map(|i| MediaItem::new(i, format!("{i}.jpg"), f64::from(i as i32) * 43_200.0)))
        .with_prompt_results(
            "p",
            vec![
                MediaItem::new(1, "1.jpg", 0.0).with_score(0.91),
                MediaItem::new(2, "2.jpg", 0.0).with_score(0.93),
                MediaItem::new(3, "3.jpg", 0.0).with_score(0.10),
            ],
        );
    let mut gallery = Gallery::new(backend, settings(3));
    gallery.search().await.unwrap();
    assert!(gallery.groups().iter().all(|g| matches!(g.key, GroupKey::Day(_))));

    gallery.submit_prompt("p").await.unwrap();
    let groups = gallery.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, GroupKey::Band { lower: 90 });
    assert_eq!(groups[0].len, 2);
}
