use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::catalog::MediaKind;
use super::read_json;
use crate::errors::{BotError, BotResult, Service};

#[derive(Debug, Deserialize)]
struct ListItemRaw {
    #[serde(rename = "type")]
    item_type: Option<String>,
    listed_at: Option<DateTime<Utc>>,
    movie: Option<MediaRaw>,
    show: Option<MediaRaw>,
}

#[derive(Debug, Deserialize)]
struct MediaRaw {
    title: Option<String>,
    year: Option<i64>,
    #[serde(default)]
    ids: IdsRaw,
}

#[derive(Debug, Default, Deserialize)]
struct IdsRaw {
    tmdb: Option<i64>,
}

/// One entry of a curated release list
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub title: String,
    pub year: Option<String>,
    pub catalog_id: Option<i64>,
    pub kind: MediaKind,
    pub listed_at: Option<DateTime<Utc>>,
}

fn into_release(raw: ListItemRaw) -> Option<Release> {
    let (kind, media) = match raw.item_type.as_deref() {
        Some("movie") => (MediaKind::Movie, raw.movie?),
        Some("show") => (MediaKind::Show, raw.show?),
        _ => return None,
    };
    Some(Release {
        title: media.title.unwrap_or_else(|| "Unknown".to_string()),
        year: media.year.map(|y| y.to_string()),
        catalog_id: media.ids.tmdb,
        kind,
        listed_at: raw.listed_at,
    })
}

/// Trakt list reader
#[derive(Debug, Clone)]
pub struct TraktClient {
    api_key: String,
    list_url: String,
    client: reqwest::Client,
}

impl TraktClient {
    pub fn new(client: reqwest::Client, api_key: String, list_url: String) -> Self {
        Self {
            api_key,
            list_url,
            client,
        }
    }

    /// First `count` movie/show entries of the list, in list order
    pub async fn latest(&self, count: usize) -> BotResult<Vec<Release>> {
        info!("Fetching latest releases from {}", self.list_url);
        let resp = self
            .client
            .get(&self.list_url)
            .header("Content-Type", "application/json")
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Service::Releases, e))?;
        let items: Vec<ListItemRaw> = read_json(Service::Releases, "Release list", resp).await?;
        let releases: Vec<Release> = items
            .into_iter()
            .take(count)
            .filter_map(|raw| {
                let release = into_release(raw);
                if release.is_none() {
                    warn!("Skipping list entry that is neither movie nor show");
                }
                release
            })
            .collect();
        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_items_map_to_releases() {
        let raw: Vec<ListItemRaw> = serde_json::from_str(
            r#"[
                {"type":"movie","listed_at":"2024-05-01T10:00:00.000Z","movie":{"title":"Dune: Part Two","year":2024,"ids":{"tmdb":693134}}},
                {"type":"person","person":{"name":"x"}},
                {"type":"show","show":{"title":"Shogun","year":2024,"ids":{}}}
            ]"#,
        )
        .unwrap();
        let releases: Vec<Release> = raw.into_iter().filter_map(into_release).collect();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].catalog_id, Some(693134));
        assert!(releases[0].listed_at.is_some());
        assert_eq!(releases[1].kind, MediaKind::Show);
        assert_eq!(releases[1].catalog_id, None);
    }
}
