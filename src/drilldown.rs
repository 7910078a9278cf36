//! Title → season → episode transitions.
//!
//! Every transition gathers all remote data first and only then writes to the
//! session, so a failed call leaves the session exactly as it was.

use tracing::{info, warn};

use crate::api::{Companion, EntityDetail, LibraryQuery, Services, StatusTree};
use crate::errors::{BotError, BotResult, Precondition};
use crate::session::{Level, Session};

pub const NOT_IN_LIBRARY: &str = "Not in Riven";
pub const SEASON_NOT_IN_LIBRARY: &str = "Season not in Riven";
pub const UNKNOWN_STATUS: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Move the current level's page cursor. Returns false when nothing changed.
pub fn navigate(session: &mut Session, direction: Direction) -> bool {
    let Some(ctx) = session.level.page_context() else {
        return false;
    };
    let count = session.context_len(ctx);
    match direction {
        Direction::Prev => session.pagination.prev(ctx),
        Direction::Next => session.pagination.next(ctx, count),
    }
}

pub(crate) fn library_query(detail: &EntityDetail) -> LibraryQuery {
    LibraryQuery {
        name: detail.name.clone(),
        external_id: detail.external_id.clone(),
        catalog_id: detail.catalog_id,
    }
}

/// Library ref for a freshly selected title. Lookup failures count as "not present".
async fn lookup_ref(services: &Services, detail: &EntityDetail) -> Option<String> {
    match services
        .library
        .find_by_name_or_external_id(&library_query(detail))
        .await
    {
        Ok(lookup) => lookup.library_ref,
        Err(e) => {
            warn!("Library lookup for '{}' failed: {}", detail.name, e);
            None
        }
    }
}

pub(crate) async fn companions_for(services: &Services, detail: &EntityDetail) -> Vec<Companion> {
    match services
        .catalog
        .recommendations(detail.catalog_id, detail.kind)
        .await
    {
        Ok(list) => list,
        Err(e) => {
            warn!("Recommendations for '{}' failed: {}", detail.name, e);
            Vec::new()
        }
    }
}

async fn enter_resolved(session: &mut Session, services: &Services, detail: EntityDetail) {
    let library_ref = lookup_ref(services, &detail).await;
    let companions = companions_for(services, &detail).await;
    info!(
        "Selected {} (TMDB {}), library ref {:?}",
        detail.name, detail.catalog_id, library_ref
    );
    session.enter_entity(detail, library_ref, companions);
}

/// Resolve candidate `index` and move to the movie or show level
pub async fn select_item(session: &mut Session, services: &Services, index: usize) -> BotResult<()> {
    if session.level != Level::Items {
        return Err(BotError::MissingPrecondition(Precondition::WrongLevel));
    }
    let candidate = session
        .candidates
        .get(index)
        .ok_or_else(|| BotError::NotFound("Item".to_string()))?;
    let detail = services
        .catalog
        .detail(candidate.catalog_id, candidate.kind)
        .await?;
    enter_resolved(session, services, detail).await;
    Ok(())
}

/// Jump to recommended title `index`, keeping the current kind
pub async fn select_companion(
    session: &mut Session,
    services: &Services,
    index: usize,
) -> BotResult<()> {
    let kind = session
        .kind()
        .ok_or(BotError::MissingPrecondition(Precondition::NothingSelected))?;
    let companion = session
        .companions
        .get(index)
        .ok_or_else(|| BotError::NotFound("Recommendation".to_string()))?;
    let detail = services.catalog.detail(companion.catalog_id, kind).await?;
    enter_resolved(session, services, detail).await;
    Ok(())
}

pub async fn select_season(session: &mut Session, services: &Services, index: usize) -> BotResult<()> {
    if session.level != Level::Show {
        return Err(BotError::MissingPrecondition(Precondition::WrongLevel));
    }
    let entity = session
        .selected_entity
        .as_ref()
        .ok_or(BotError::MissingPrecondition(Precondition::NothingSelected))?;
    let season = entity
        .seasons
        .get(index)
        .cloned()
        .ok_or_else(|| BotError::NotFound("Season".to_string()))?;
    let episodes = services
        .catalog
        .list_season_episodes(entity.catalog_id, season.number)
        .await?;
    info!("Season {} of '{}': {} episodes", season.number, entity.name, episodes.len());
    session.enter_season(season, episodes);
    Ok(())
}

pub fn select_episode(session: &mut Session, index: usize) -> BotResult<()> {
    if session.level != Level::Episode {
        return Err(BotError::MissingPrecondition(Precondition::WrongLevel));
    }
    let episode = session
        .episodes
        .get(index)
        .cloned()
        .ok_or_else(|| BotError::NotFound("Episode".to_string()))?;
    session.selected_episode = Some(episode);
    session.invalidate_status();
    Ok(())
}

/// Status text for the cached payload at the given position in the hierarchy
pub fn resolve_status_text(
    level: Level,
    tree: &StatusTree,
    season_number: Option<i64>,
    episode_number: Option<i64>,
) -> String {
    fn state_or_unknown(state: &Option<String>) -> String {
        state.clone().unwrap_or_else(|| UNKNOWN_STATUS.to_string())
    }

    match level {
        Level::Movie | Level::Show => state_or_unknown(&tree.state),
        Level::Episode => {
            let Some(season_number) = season_number else {
                return UNKNOWN_STATUS.to_string();
            };
            let Some(season) = tree
                .seasons
                .iter()
                .find(|s| s.number == Some(season_number))
            else {
                return SEASON_NOT_IN_LIBRARY.to_string();
            };
            if let Some(episode_number) = episode_number {
                if let Some(episode) = season
                    .episodes
                    .iter()
                    .find(|e| e.number == Some(episode_number))
                {
                    return state_or_unknown(&episode.state);
                }
            }
            state_or_unknown(&season.state)
        }
        Level::Items => UNKNOWN_STATUS.to_string(),
    }
}

/// Library status of the current selection, filling the cache at most once
/// per invalidation. Fetch failures are shown but never cached.
pub async fn library_status(session: &mut Session, services: &Services) -> String {
    let Some(library_ref) = session.library_ref.clone() else {
        return NOT_IN_LIBRARY.to_string();
    };
    if session.library_status_cache.is_none() {
        match services.library.get_status(&library_ref).await {
            Ok(tree) => session.library_status_cache = Some(tree),
            Err(e) => {
                warn!("Status fetch for {} failed: {}", library_ref, e);
                return format!("Error: {}", e.user_message());
            }
        }
    }
    match &session.library_status_cache {
        Some(tree) => resolve_status_text(
            session.level,
            tree,
            session.selected_season.as_ref().map(|s| s.number),
            session.selected_episode.as_ref().map(|e| e.number),
        ),
        None => UNKNOWN_STATUS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EpisodeStatus, SeasonStatus};

    fn tree() -> StatusTree {
        StatusTree {
            state: Some("PartiallyCompleted".into()),
            seasons: vec![SeasonStatus {
                number: Some(1),
                state: Some("Ongoing".into()),
                episodes: vec![EpisodeStatus {
                    number: Some(3),
                    state: Some("Completed".into()),
                }],
            }],
        }
    }

    #[test]
    fn test_show_level_uses_top_state() {
        assert_eq!(resolve_status_text(Level::Show, &tree(), None, None), "PartiallyCompleted");
        assert_eq!(
            resolve_status_text(Level::Movie, &StatusTree::default(), None, None),
            UNKNOWN_STATUS
        );
    }

    #[test]
    fn test_episode_level_descends() {
        let t = tree();
        assert_eq!(resolve_status_text(Level::Episode, &t, Some(1), Some(3)), "Completed");
        // Unknown episode falls back to the season's state
        assert_eq!(resolve_status_text(Level::Episode, &t, Some(1), Some(9)), "Ongoing");
        assert_eq!(resolve_status_text(Level::Episode, &t, Some(1), None), "Ongoing");
        assert_eq!(resolve_status_text(Level::Episode, &t, Some(2), Some(1)), SEASON_NOT_IN_LIBRARY);
        assert_eq!(resolve_status_text(Level::Episode, &t, None, None), UNKNOWN_STATUS);
    }

    #[test]
    fn test_items_level_is_unknown() {
        assert_eq!(resolve_status_text(Level::Items, &tree(), None, None), UNKNOWN_STATUS);
    }
}
