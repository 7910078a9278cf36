mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rivbot_lib::actions::{self, Action};
use rivbot_lib::api::MediaKind;
use rivbot_lib::drilldown;
use rivbot_lib::errors::{BotError, Precondition};

#[tokio::test]
async fn test_add_without_external_id_makes_no_remote_call() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(3, None)]));
    let library = Arc::new(MockLibrary::default());
    let services = services(&catalog, &library);

    let mut session = session_over(vec![summary("Movie 3", 3, MediaKind::Movie)]);
    drilldown::select_item(&mut session, &services, 0).await.unwrap();
    let calls_after_select = library.total_calls();

    let err = actions::dispatch(&mut session, &services, Action::Add).await.unwrap_err();
    assert_eq!(err, BotError::MissingPrecondition(Precondition::MissingExternalId));
    assert_eq!(library.total_calls(), calls_after_select);
    assert_eq!(library.mutate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_add_then_remove_tracks_library_ref() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(3, Some("tt0000003"))]));
    let library = Arc::new(MockLibrary::default());
    *library.new_ref.lock().unwrap() = Some("77".to_string());
    let services = services(&catalog, &library);

    let mut session = session_over(vec![summary("Movie 3", 3, MediaKind::Movie)]);
    drilldown::select_item(&mut session, &services, 0).await.unwrap();
    assert!(!session.in_library());

    let text = actions::dispatch(&mut session, &services, Action::Add).await.unwrap();
    assert_eq!(text, "Added Movie 3");
    assert_eq!(session.library_ref.as_deref(), Some("77"));

    let text = actions::dispatch(&mut session, &services, Action::Remove).await.unwrap();
    assert_eq!(text, "Removed Movie 3");
    assert!(session.library_ref.is_none());
    assert_eq!(library.mutate_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_actions_needing_library_entry_fail_locally() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(3, Some("tt0000003"))]));
    let library = Arc::new(MockLibrary::default());
    let services = services(&catalog, &library);

    let mut session = session_over(vec![summary("Movie 3", 3, MediaKind::Movie)]);
    drilldown::select_item(&mut session, &services, 0).await.unwrap();
    let before = library.total_calls();

    for action in [Action::Remove, Action::Retry, Action::Reset, Action::Magnets] {
        let err = actions::dispatch(&mut session, &services, action).await.unwrap_err();
        assert_eq!(err, BotError::MissingPrecondition(Precondition::NotInLibrary));
    }
    assert_eq!(library.total_calls(), before);
}

#[tokio::test]
async fn test_refresh_twice_is_stable() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(3, Some("tt0000003"))]));
    let library = Arc::new(MockLibrary::in_library("12", "Completed"));
    let services = services(&catalog, &library);

    let mut session = session_over(vec![summary("Movie 3", 3, MediaKind::Movie)]);
    drilldown::select_item(&mut session, &services, 0).await.unwrap();

    actions::dispatch(&mut session, &services, Action::Refresh).await.unwrap();
    let first_ref = session.library_ref.clone();
    let first_status = drilldown::library_status(&mut session, &services).await;

    actions::dispatch(&mut session, &services, Action::Refresh).await.unwrap();
    let second_ref = session.library_ref.clone();
    let second_status = drilldown::library_status(&mut session, &services).await;

    assert_eq!(first_ref.as_deref(), Some("12"));
    assert_eq!(first_ref, second_ref);
    assert_eq!(first_status, "Completed");
    assert_eq!(first_status, second_status);
}

#[tokio::test]
async fn test_refresh_at_items_level_is_harmless() {
    let catalog = Arc::new(MockCatalog::default());
    let library = Arc::new(MockLibrary::default());
    let services = services(&catalog, &library);

    let mut session = session_over(candidates(2, MediaKind::Movie));
    let before = session.clone();
    let text = actions::dispatch(&mut session, &services, Action::Refresh).await.unwrap();
    assert_eq!(text, "Nothing selected to refresh.");
    assert_eq!(session, before);
    assert_eq!(library.total_calls(), 0);
}

#[tokio::test]
async fn test_retry_allowed_on_episode_but_add_is_not() {
    let catalog = Arc::new(MockCatalog::with_details(vec![show_detail(8, 1)]));
    catalog.episodes.lock().unwrap().insert((8, 1), episodes(3));
    let library = Arc::new(MockLibrary::in_library("30", "Ongoing"));
    let services = services(&catalog, &library);

    let mut session = session_over(vec![summary("Show 8", 8, MediaKind::Show)]);
    drilldown::select_item(&mut session, &services, 0).await.unwrap();
    drilldown::select_season(&mut session, &services, 0).await.unwrap();

    let text = actions::dispatch(&mut session, &services, Action::Retry).await.unwrap();
    assert_eq!(text, "Retrying Show 8");
    let err = actions::dispatch(&mut session, &services, Action::Add).await.unwrap_err();
    assert_eq!(err, BotError::MissingPrecondition(Precondition::WrongLevel));
}

#[tokio::test]
async fn test_magnets_lists_uris() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(3, Some("tt0000003"))]));
    let library = Arc::new(MockLibrary::in_library("12", "Completed"));
    let services = services(&catalog, &library);

    let mut session = session_over(vec![summary("Movie 3", 3, MediaKind::Movie)]);
    drilldown::select_item(&mut session, &services, 0).await.unwrap();
    let text = actions::dispatch(&mut session, &services, Action::Magnets).await.unwrap();
    assert!(text.starts_with("Magnets for Movie 3:"));
    assert!(text.contains("magnet:?xt=urn:btih:abc"));
}

#[tokio::test]
async fn test_refresh_caps_companions() {
    let catalog = Arc::new(MockCatalog::with_details(vec![movie_detail(3, Some("tt0000003"))]));
    let library = Arc::new(MockLibrary::in_library("12", "Completed"));
    let services = services(&catalog, &library);

    let mut session = session_over(vec![summary("Movie 3", 3, MediaKind::Movie)]);
    drilldown::select_item(&mut session, &services, 0).await.unwrap();
    assert!(session.companions.is_empty());

    // Recommendations arrive untrimmed from the catalog
    *catalog.recommendations.lock().unwrap() = (10..18)
        .map(|id| rivbot_lib::api::Companion {
            catalog_id: id,
            title: format!("Rec {}", id),
            year: None,
            rating: None,
        })
        .collect();
    actions::dispatch(&mut session, &services, Action::Refresh).await.unwrap();
    assert_eq!(session.companions.len(), rivbot_lib::session::MAX_COMPANIONS);
    assert_eq!(session.companions[0].catalog_id, 10);
}
