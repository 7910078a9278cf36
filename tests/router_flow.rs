mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rivbot_lib::api::MediaKind;
use rivbot_lib::errors::BotError;
use rivbot_lib::handlers::events::{ButtonAction, Event, MenuAction};
use rivbot_lib::handlers::router::{failure_notice, Router};
use rivbot_lib::session::Level;
use rivbot_lib::store::SessionStore;

const KEY: u64 = 555;

fn router(catalog: &Arc<MockCatalog>, library: &Arc<MockLibrary>) -> Router {
    let store = Arc::new(SessionStore::new(Duration::from_secs(300)));
    Router::new(store, services(catalog, library))
}

fn snapshot(router: &Router) -> rivbot_lib::session::Session {
    router.store().checkout(KEY).unwrap().clone()
}

#[tokio::test]
async fn test_second_event_is_rejected_while_first_is_in_flight() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(1, Some("tt0000001"))]));
    let library = Arc::new(MockLibrary::default());
    let router = router(&catalog, &library);
    router.open(KEY, session_over(candidates(2, MediaKind::Movie)));

    let gate = catalog.hold_detail();
    let first = {
        let router = router.clone();
        tokio::spawn(async move {
            router
                .handle(KEY, INITIATOR, Event::Menu(MenuAction::Item(0)))
                .await
        })
    };
    gate.entered.notified().await;

    let second = router
        .handle(KEY, INITIATOR, Event::Menu(MenuAction::Item(1)))
        .await;
    assert_eq!(second.unwrap_err(), BotError::Busy);

    gate.release.notify_one();
    let effect = first.await.unwrap().unwrap();
    assert!(effect.view.is_some());
    assert_eq!(catalog.detail_calls.load(Ordering::SeqCst), 1);

    let session = snapshot(&router);
    assert_eq!(session.level, Level::Movie);
    assert_eq!(session.selected_entity.unwrap().catalog_id, 1);
}

#[tokio::test]
async fn test_stranger_cannot_change_anything() {
    let catalog = Arc::new(MockCatalog::with_details(vec![show_detail(1, 2)]));
    let library = Arc::new(MockLibrary::in_library("3", "Ongoing"));
    let router = router(&catalog, &library);
    router.open(KEY, session_over(vec![summary("Show 1", 1, MediaKind::Show)]));
    router
        .handle(KEY, INITIATOR, Event::Menu(MenuAction::Item(0)))
        .await
        .unwrap();

    let before = snapshot(&router);
    let detail_calls = catalog.detail_calls.load(Ordering::SeqCst);
    let library_calls = library.total_calls();

    let events = [
        Event::Menu(MenuAction::Item(0)),
        Event::Menu(MenuAction::Season(1)),
        Event::Button(ButtonAction::Next),
        Event::Button(ButtonAction::Remove),
        Event::Button(ButtonAction::Refresh),
        Event::Button(ButtonAction::Scrape),
        Event::Companion(0),
    ];
    for event in events {
        let err = router.handle(KEY, STRANGER, event).await.unwrap_err();
        assert_eq!(err, BotError::Unauthorized);
    }

    assert_eq!(snapshot(&router), before);
    assert_eq!(catalog.detail_calls.load(Ordering::SeqCst), detail_calls);
    assert_eq!(library.total_calls(), library_calls);
}

#[tokio::test]
async fn test_unknown_session_is_expired() {
    let catalog = Arc::new(MockCatalog::default());
    let library = Arc::new(MockLibrary::default());
    let router = router(&catalog, &library);

    let err = router
        .handle(KEY, INITIATOR, Event::Button(ButtonAction::Next))
        .await
        .unwrap_err();
    assert_eq!(err, BotError::Expired);
}

#[tokio::test]
async fn test_paging_past_the_end_changes_nothing() {
    let catalog = Arc::new(MockCatalog::default());
    let library = Arc::new(MockLibrary::default());
    let router = router(&catalog, &library);
    let view = router.open(KEY, session_over(candidates(23, MediaKind::Movie)));
    assert!(!view.button(ButtonAction::Prev).unwrap().enabled);

    for _ in 0..2 {
        let effect = router
            .handle(KEY, INITIATOR, Event::Button(ButtonAction::Next))
            .await
            .unwrap();
        assert!(effect.view.is_some());
    }
    let effect = router
        .handle(KEY, INITIATOR, Event::Button(ButtonAction::Next))
        .await
        .unwrap();
    assert!(effect.is_noop());
}

#[tokio::test]
async fn test_failed_selection_reports_and_keeps_state() {
    let catalog = Arc::new(MockCatalog::default());
    catalog.fail_detail(BotError::NotFound("Item".to_string()));
    let library = Arc::new(MockLibrary::default());
    let router = router(&catalog, &library);
    router.open(KEY, session_over(candidates(3, MediaKind::Movie)));
    let before = snapshot(&router);

    let event = Event::Menu(MenuAction::Item(2));
    let err = router.handle(KEY, INITIATOR, event.clone()).await.unwrap_err();
    assert_eq!(
        failure_notice(&event, &err),
        "Failed to fetch item details. Item not found."
    );
    assert_eq!(snapshot(&router), before);
}

#[tokio::test]
async fn test_selecting_title_requests_companion_reactions() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(1, Some("tt0000001"))]));
    *catalog.recommendations.lock().unwrap() = (10..17)
        .map(|id| rivbot_lib::api::Companion {
            catalog_id: id,
            title: format!("Rec {}", id),
            year: None,
            rating: None,
        })
        .collect();
    let library = Arc::new(MockLibrary::default());
    let router = router(&catalog, &library);
    router.open(KEY, session_over(candidates(1, MediaKind::Movie)));

    let effect = router
        .handle(KEY, INITIATOR, Event::Menu(MenuAction::Item(0)))
        .await
        .unwrap();
    assert_eq!(effect.reactions, Some(5));
    let card = effect.card.unwrap();
    assert!(card.body.contains("Not in Riven"));
    assert!(effect.view.unwrap().menu.is_none());
}

#[tokio::test]
async fn test_scrape_failure_becomes_notice() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(1, Some("tt0000001"))]));
    let library = Arc::new(MockLibrary::in_library("4", "Completed"));
    let router = router(&catalog, &library);
    router.open(KEY, session_over(candidates(1, MediaKind::Movie)));
    router
        .handle(KEY, INITIATOR, Event::Menu(MenuAction::Item(0)))
        .await
        .unwrap();

    let effect = router
        .handle(KEY, INITIATOR, Event::Button(ButtonAction::Scrape))
        .await
        .unwrap();
    assert_eq!(effect.notice.as_deref(), Some("No streams found for this item."));
    assert!(effect.followup.is_none());
}
