//! Prefix commands (`!search`, `!latestreleases`, ...).
//!
//! Commands produce a [`CommandReply`]; the Discord glue decides how to send it.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::{
    CatalogService, EntitySummary, LibraryItem, LibraryStats, MediaKind, RivenClient, TraktClient,
};
use crate::config::AppConfig;
use crate::errors::BotError;
use crate::poster_grid::{self, GridLayout};
use crate::session::{ActorId, Session};
use crate::ui::card::{results_card, MediaCard};
use crate::ui::response::log_excerpt;

pub const RECENT_DEFAULT: u32 = 10;
pub const RECENT_MAX: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    LatestReleases,
    Health,
    Status,
    /// Raw argument, validated when run
    RecentlyAdded(Option<String>),
    Logs,
    Services,
}

/// Split `"{prefix}{name} {args}"` into a command
pub fn parse(prefix: &str, content: &str) -> Option<Command> {
    let body = content.trim().strip_prefix(prefix)?;
    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };
    let arg = (!args.is_empty()).then(|| args.to_string());
    Some(match name.to_lowercase().as_str() {
        "search" => Command::Search(args.to_string()),
        "latestreleases" => Command::LatestReleases,
        "health" => Command::Health,
        "status" => Command::Status,
        "recentlyadded" => Command::RecentlyAdded(arg),
        "logs" => Command::Logs,
        "services" => Command::Services,
        _ => return None,
    })
}

/// Attachment bytes plus file name
pub type FileUpload = (String, Vec<u8>);

pub enum CommandReply {
    Text(String),
    Cards {
        header: String,
        cards: Vec<MediaCard>,
    },
    /// Opens an interactive session on the reply message
    Session {
        card: MediaCard,
        session: Session,
        image: Option<FileUpload>,
    },
}

/// Services the commands run against
#[derive(Clone)]
pub struct CommandContext {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn CatalogService>,
    pub riven: Arc<RivenClient>,
    pub http: reqwest::Client,
}

impl CommandContext {
    pub async fn run(&self, command: Command, actor: ActorId) -> CommandReply {
        match command {
            Command::Search(query) => self.search(&query, actor).await,
            Command::LatestReleases => self.latest_releases(actor).await,
            Command::Health => CommandReply::Text(self.health().await),
            Command::Status => CommandReply::Text(self.status().await),
            Command::RecentlyAdded(arg) => self.recently_added(arg.as_deref()).await,
            Command::Logs => CommandReply::Text(self.logs().await),
            Command::Services => CommandReply::Text(self.services().await),
        }
    }

    async fn search(&self, query: &str, actor: ActorId) -> CommandReply {
        if query.trim().is_empty() {
            return CommandReply::Text(format!("Usage: {}search <query>", self.config.bot_prefix));
        }
        let results = match self.catalog.search(query).await {
            Ok(results) => results,
            Err(e) => return CommandReply::Text(e.user_message()),
        };
        match Session::create(results, actor, query) {
            Ok(session) => CommandReply::Session {
                card: results_card(query),
                session,
                image: None,
            },
            Err(_) => CommandReply::Text(format!("No results for '{}'", query)),
        }
    }

    async fn latest_releases(&self, actor: ActorId) -> CommandReply {
        let settings = match self.config.release_settings() {
            Ok(settings) => settings,
            Err(key) => {
                return CommandReply::Text(format!("Error: Missing required config key: `{}`", key))
            }
        };
        let trakt = TraktClient::new(
            self.http.clone(),
            settings.trakt_api_key.clone(),
            settings.list_url.clone(),
        );
        let releases = match trakt.latest(settings.count).await {
            Ok(releases) => releases,
            Err(e) => {
                error!("Error fetching latest releases from Trakt: {}", e);
                return CommandReply::Text(
                    "Failed to retrieve latest releases. Please try again later.".to_string(),
                );
            }
        };

        let mut candidates = Vec::new();
        let mut poster_urls = Vec::new();
        for release in releases {
            let Some(catalog_id) = release.catalog_id else {
                warn!("Release '{}' has no TMDB id, skipping", release.title);
                continue;
            };
            let (rating, poster) = match self.catalog.detail(catalog_id, release.kind).await {
                Ok(detail) => (detail.rating, detail.poster_url),
                Err(e) => {
                    warn!("TMDB lookup for '{}' failed: {}", release.title, e);
                    (None, None)
                }
            };
            info!("Fetched: {} ({:?}) with rating: {:?}", release.title, release.year, rating);
            candidates.push(EntitySummary {
                name: release.title,
                year: release.year,
                rating,
                catalog_id,
                kind: release.kind,
            });
            poster_urls.push(poster);
        }

        let label = format!("Latest {} Releases", settings.count);
        let session = match Session::create(candidates, actor, &label) {
            Ok(session) => session,
            Err(_) => {
                return CommandReply::Text(format!(
                    "No new releases found in the latest {} entries.",
                    settings.count
                ))
            }
        };

        let posters = poster_grid::fetch_posters(&self.http, &poster_urls).await;
        let layout = GridLayout::new(
            settings.poster_width,
            settings.poster_height,
            settings.max_grid_width,
        );
        let grid = poster_grid::compose_grid(&posters, layout);
        let image = match poster_grid::encode_png(&grid) {
            Ok(bytes) => Some((poster_grid::GRID_FILENAME.to_string(), bytes)),
            Err(e) => {
                error!("Failed to encode poster grid: {}", e);
                None
            }
        };
        CommandReply::Session {
            card: results_card(&label),
            session,
            image,
        }
    }

    async fn health(&self) -> String {
        match self.riven.health().await {
            Ok(()) => "Riven is up and running!".to_string(),
            Err(e) => format!("Health check failed: {}", e),
        }
    }

    async fn status(&self) -> String {
        match self.riven.stats().await {
            Ok(stats) => status_text(&stats),
            Err(e) => format!("Error: {}", e),
        }
    }

    async fn logs(&self) -> String {
        match self.riven.logs().await {
            Ok(value) => log_excerpt(&value),
            Err(e) => format!("Error: {}", e),
        }
    }

    async fn services(&self) -> String {
        match self.riven.services().await {
            Ok(services) => {
                let lines: Vec<String> = services
                    .iter()
                    .map(|(name, enabled)| {
                        format!("- {}: {}", name, if *enabled { "Enabled" } else { "Disabled" })
                    })
                    .collect();
                format!("Services:\n{}", lines.join("\n"))
            }
            Err(e) => format!("Error: {}", e),
        }
    }

    async fn recently_added(&self, arg: Option<&str>) -> CommandReply {
        let Some(limit) = parse_recent_limit(arg) else {
            return CommandReply::Text(format!("Number must be between 1 and {}.", RECENT_MAX));
        };
        let items = match self.riven.recently_added(limit).await {
            Ok(items) => items,
            Err(e) => return CommandReply::Text(format!("Error: {}", e)),
        };
        if items.is_empty() {
            return CommandReply::Text("No recent items.".to_string());
        }
        let mut cards = Vec::new();
        for item in items.iter().take(RECENT_MAX as usize) {
            let poster_url = self.poster_for(item).await;
            cards.push(recent_card(item, poster_url));
        }
        CommandReply::Cards {
            header: format!("**Recently Added (Top {}):**", cards.len()),
            cards,
        }
    }

    async fn poster_for(&self, item: &LibraryItem) -> Option<String> {
        let catalog_id: i64 = item.tmdb_id.canonical()?.parse().ok()?;
        let kind = match item.item_type.as_deref().map(str::to_lowercase).as_deref() {
            Some("movie") => MediaKind::Movie,
            _ => MediaKind::Show,
        };
        match self.catalog.detail(catalog_id, kind).await {
            Ok(detail) => detail.poster_url,
            Err(BotError::NotFound(_)) => None,
            Err(e) => {
                warn!("Poster lookup for TMDB {} failed: {}", catalog_id, e);
                None
            }
        }
    }
}

/// `None` when the argument is not a number in 1..=10
pub fn parse_recent_limit(arg: Option<&str>) -> Option<u32> {
    let limit = match arg {
        Some(raw) => raw.trim().parse::<u32>().ok()?,
        None => RECENT_DEFAULT,
    };
    (1..=RECENT_MAX).contains(&limit).then_some(limit)
}

pub fn status_text(stats: &LibraryStats) -> String {
    format!(
        "**Riven Status:**\nShows: {}\nMovies: {}\nCompleted: {}\nIncomplete: {}\nFailed: {}",
        stats.total_shows,
        stats.total_movies,
        stats.state_count("Completed"),
        stats.incomplete_items,
        stats.state_count("Failed")
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn recent_card(item: &LibraryItem, poster_url: Option<String>) -> MediaCard {
    MediaCard {
        title: format!(
            "{}: {}",
            capitalize(item.item_type.as_deref().unwrap_or("Unknown")),
            item.title.as_deref().unwrap_or("Unknown")
        ),
        body: format!("State: {}", item.state.as_deref().unwrap_or("Unknown")),
        poster_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("!", "!search dune 2021"), Some(Command::Search("dune 2021".into())));
        assert_eq!(parse("!", "!search"), Some(Command::Search(String::new())));
        assert_eq!(parse("!", "!recentlyadded 5"), Some(Command::RecentlyAdded(Some("5".into()))));
        assert_eq!(parse("!", "!LatestReleases"), Some(Command::LatestReleases));
        assert_eq!(parse("!", "search dune"), None);
        assert_eq!(parse("!", "!dance"), None);
    }

    #[test]
    fn test_recent_limit_bounds() {
        assert_eq!(parse_recent_limit(None), Some(10));
        assert_eq!(parse_recent_limit(Some("3")), Some(3));
        assert_eq!(parse_recent_limit(Some("0")), None);
        assert_eq!(parse_recent_limit(Some("11")), None);
        assert_eq!(parse_recent_limit(Some("many")), None);
    }

    #[test]
    fn test_status_text() {
        let stats: LibraryStats = serde_json::from_str(
            r#"{"total_shows":3,"total_movies":7,"incomplete_items":2,"states":{"Completed":6,"Failed":1}}"#,
        )
        .unwrap();
        assert_eq!(
            status_text(&stats),
            "**Riven Status:**\nShows: 3\nMovies: 7\nCompleted: 6\nIncomplete: 2\nFailed: 1"
        );
    }

    #[test]
    fn test_recent_card() {
        let item: LibraryItem =
            serde_json::from_str(r#"{"id":1,"title":"Alien","type":"movie","state":"Completed"}"#)
                .unwrap();
        let card = recent_card(&item, None);
        assert_eq!(card.title, "Movie: Alien");
        assert_eq!(card.body, "State: Completed");
    }
}
