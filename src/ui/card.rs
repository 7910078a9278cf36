use crate::api::{rating_label, year_label, Companion, EntityDetail};
use crate::handlers::events::COMPANION_REACTIONS;
use crate::session::{Level, Session};

/// Embed content for the main message
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCard {
    pub title: String,
    pub body: String,
    pub poster_url: Option<String>,
}

fn heading(query: &str) -> String {
    format!("🔎 Results for '{}'", query)
}

/// Card shown before anything is selected
pub fn results_card(query: &str) -> MediaCard {
    MediaCard {
        title: heading(query),
        body: "Select an item below to view details.".to_string(),
        poster_url: None,
    }
}

/// "Name (Year)", linked to IMDb when the id is known
pub fn title_display(entity: &EntityDetail) -> String {
    let plain = format!("{} ({})", entity.name, year_label(entity.year.as_deref()));
    match &entity.external_id {
        Some(id) => format!("[{}](https://www.imdb.com/title/{}/)", plain, id),
        None => plain,
    }
}

pub fn companion_line(index: usize, companion: &Companion) -> String {
    format!(
        "{} {} ({}) - ★ {}/10",
        COMPANION_REACTIONS.get(index).copied().unwrap_or("•"),
        companion.title,
        year_label(companion.year.as_deref()),
        rating_label(companion.rating)
    )
}

/// Card for the session's current selection with its resolved library status
pub fn session_card(session: &Session, status: &str) -> MediaCard {
    let Some(entity) = session.selected_entity.as_ref() else {
        return results_card(&session.query);
    };
    let title = title_display(entity);

    let body = match (session.level, &session.selected_season, &session.selected_episode) {
        (Level::Episode, Some(season), Some(episode)) => format!(
            "**{} - S{}: {} - E{}: {}**\n📝 {}\n🔄 Riven: {}",
            title, season.number, season.name, episode.number, episode.name, episode.overview, status
        ),
        (Level::Episode, Some(season), None) => format!(
            "**{} - Season {}: {}**\n📝 {}\n🔄 Riven: {}",
            title, season.number, season.name, entity.description, status
        ),
        _ => {
            let mut body = format!(
                "**{}**\n⭐ Rating: {}/10 ({} votes)\n📝 {}\n🔄 Riven: {}",
                title,
                rating_label(entity.rating),
                entity.vote_count,
                entity.description,
                status
            );
            if !session.companions.is_empty() {
                body.push_str("\n\nReaction at the bottom to select a title:\n**Recommended Titles:**\n");
                let lines: Vec<String> = session
                    .companions
                    .iter()
                    .enumerate()
                    .map(|(i, c)| companion_line(i, c))
                    .collect();
                body.push_str(&lines.join("\n"));
            }
            body
        }
    };

    MediaCard {
        title: heading(&session.query),
        body,
        poster_url: entity.poster_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EntitySummary, MediaKind};

    fn entity(external_id: Option<&str>) -> EntityDetail {
        EntityDetail {
            name: "Alien".into(),
            year: Some("1979".into()),
            rating: Some(8.46),
            vote_count: 1200,
            external_id: external_id.map(String::from),
            catalog_id: 348,
            poster_url: Some("https://image.tmdb.org/t/p/w500/a.jpg".into()),
            description: "In space".into(),
            kind: MediaKind::Movie,
            seasons: Vec::new(),
        }
    }

    #[test]
    fn test_title_links_to_imdb() {
        assert_eq!(
            title_display(&entity(Some("tt0078748"))),
            "[Alien (1979)](https://www.imdb.com/title/tt0078748/)"
        );
        assert_eq!(title_display(&entity(None)), "Alien (1979)");
    }

    #[test]
    fn test_movie_card_lists_companions() {
        let mut session = Session::create(
            vec![EntitySummary {
                name: "Alien".into(),
                year: None,
                rating: None,
                catalog_id: 348,
                kind: MediaKind::Movie,
            }],
            1,
            "alien",
        )
        .unwrap();
        session.enter_entity(
            entity(None),
            None,
            vec![Companion {
                catalog_id: 679,
                title: "Aliens".into(),
                year: Some("1986".into()),
                rating: Some(7.9),
            }],
        );
        let card = session_card(&session, "Not in Riven");
        assert_eq!(card.title, "🔎 Results for 'alien'");
        assert!(card.body.contains("⭐ Rating: 8.5/10 (1200 votes)"));
        assert!(card.body.contains("🔄 Riven: Not in Riven"));
        assert!(card.body.ends_with("1️⃣ Aliens (1986) - ★ 7.9/10"));
    }
}
