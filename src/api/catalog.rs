use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{normalize_base_url, read_json};
use crate::errors::{BotError, BotResult, Service};
use crate::flex_id::deserialize_rating;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const TMDB_PAGE_LEN: usize = 20;
const MULTI_SEARCH_PAGES: u32 = 5;
const YEAR_SEARCH_PAGES: u32 = 2;
const DESCRIPTION_LIMIT: usize = 150;
const EPISODE_OVERVIEW_LIMIT: usize = 97;
const MAX_RECOMMENDATIONS: usize = 5;

static TRAILING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tv", alias = "show")]
    Show,
}

impl MediaKind {
    /// Path segment TMDB uses for this kind
    pub fn tmdb_path(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "tv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MediaKind::Movie => "Movie",
            MediaKind::Show => "Show",
        }
    }

    pub fn from_tmdb(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaKind::Movie),
            "tv" | "show" => Some(MediaKind::Show),
            _ => None,
        }
    }
}

/// Lightweight search hit
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySummary {
    pub name: String,
    pub year: Option<String>,
    pub rating: Option<f64>,
    pub catalog_id: i64,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonSummary {
    pub number: i64,
    pub name: String,
    pub episode_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub number: i64,
    pub name: String,
    pub overview: String,
}

/// Fully resolved title
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDetail {
    pub name: String,
    pub year: Option<String>,
    pub rating: Option<f64>,
    pub vote_count: u64,
    /// IMDb id, `None` when TMDB has none
    pub external_id: Option<String>,
    pub catalog_id: i64,
    pub poster_url: Option<String>,
    pub description: String,
    pub kind: MediaKind,
    pub seasons: Vec<SeasonSummary>,
}

/// A recommended title surfaced as a shortcut
#[derive(Debug, Clone, PartialEq)]
pub struct Companion {
    pub catalog_id: i64,
    pub title: String,
    pub year: Option<String>,
    pub rating: Option<f64>,
}

/// Season/episode numbers recognised in a release filename
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FilenameParse {
    #[serde(default)]
    pub seasons: Vec<i64>,
    #[serde(default)]
    pub episodes: Vec<i64>,
}

impl FilenameParse {
    pub fn is_usable(&self) -> bool {
        !self.seasons.is_empty() && !self.episodes.is_empty()
    }
}

/// Format a rating the way the menus show it
pub fn rating_label(rating: Option<f64>) -> String {
    match rating {
        Some(r) => format!("{:.1}", r),
        None => "N/A".to_string(),
    }
}

pub fn year_label(year: Option<&str>) -> &str {
    year.filter(|y| !y.is_empty()).unwrap_or("N/A")
}

/// Metadata provider consumed by the drill-down and scrape workflows
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn search(&self, query: &str) -> BotResult<Vec<EntitySummary>>;

    async fn detail(&self, catalog_id: i64, kind: MediaKind) -> BotResult<EntityDetail>;

    async fn list_season_episodes(
        &self,
        catalog_id: i64,
        season_number: i64,
    ) -> BotResult<Vec<EpisodeSummary>>;

    async fn recommendations(&self, catalog_id: i64, kind: MediaKind) -> BotResult<Vec<Companion>>;

    /// One entry per input name, in input order; `None` when unparseable
    async fn parse_filenames(&self, filenames: &[String]) -> BotResult<Vec<Option<FilenameParse>>>;
}

// --- TMDB wire types ---

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: i64,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_rating")]
    vote_average: Option<f64>,
    media_type: Option<String>,
}

impl SearchHit {
    fn into_summary(self, kind: MediaKind) -> EntitySummary {
        let (name, date) = match kind {
            MediaKind::Movie => (self.title.or(self.name), self.release_date),
            MediaKind::Show => (self.name.or(self.title), self.first_air_date),
        };
        EntitySummary {
            name: name.unwrap_or_else(|| "Unknown".to_string()),
            year: date.as_deref().and_then(year_of),
            rating: self.vote_average,
            catalog_id: self.id,
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DetailRaw {
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_rating")]
    vote_average: Option<f64>,
    #[serde(default)]
    vote_count: u64,
    poster_path: Option<String>,
    overview: Option<String>,
    imdb_id: Option<String>,
    #[serde(default)]
    seasons: Vec<SeasonRaw>,
}

#[derive(Debug, Deserialize)]
struct SeasonRaw {
    season_number: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    episode_count: u32,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeasonDetailRaw {
    #[serde(default)]
    episodes: Vec<EpisodeRaw>,
}

#[derive(Debug, Deserialize)]
struct EpisodeRaw {
    episode_number: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    overview: String,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    data: Vec<Option<FilenameParse>>,
}

fn year_of(date: &str) -> Option<String> {
    let year: String = date.chars().take(4).collect();
    (year.len() == 4).then_some(year)
}

fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn non_blank_id(id: Option<String>) -> Option<String> {
    id.filter(|s| !s.trim().is_empty() && s != "N/A")
}

/// Split "Dune 2021" into ("Dune", Some(2021))
pub fn split_trailing_year(query: &str) -> (String, Option<u32>) {
    let trimmed = query.trim();
    if let Some(caps) = TRAILING_YEAR.captures(trimmed) {
        if let Some(year) = caps.get(1).and_then(|m| m.as_str().parse().ok()) {
            let rest = trimmed[..caps.get(0).map(|m| m.start()).unwrap_or(trimmed.len())].trim();
            if !rest.is_empty() {
                return (rest.to_string(), Some(year));
            }
        }
    }
    (trimmed.to_string(), None)
}

/// Filename parsing is served by the library backend's `/scrape/parse` route
#[derive(Debug, Clone)]
pub struct ParseEndpoint {
    pub base_url: String,
    pub token: String,
}

/// TMDB-backed catalog
#[derive(Debug, Clone)]
pub struct TmdbCatalog {
    api_key: String,
    base_url: String,
    parse: ParseEndpoint,
    client: reqwest::Client,
}

impl TmdbCatalog {
    pub fn new(client: reqwest::Client, api_key: String, parse: ParseEndpoint) -> Self {
        Self {
            api_key,
            base_url: TMDB_BASE.to_string(),
            parse: ParseEndpoint {
                base_url: normalize_base_url(&parse.base_url),
                token: parse.token,
            },
            client,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> BotResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "TMDB request");
        let resp = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Service::Catalog, e))?;
        read_json(Service::Catalog, what, resp).await
    }

    /// Walk result pages until a short page, `max_pages`, or a failure.
    /// A failure on the very first page is reported; later ones just stop.
    async fn collect_pages(
        &self,
        path: &str,
        base_params: Vec<(&str, String)>,
        max_pages: u32,
        kind: Option<MediaKind>,
        out: &mut Vec<EntitySummary>,
    ) -> BotResult<()> {
        for page in 1..=max_pages {
            let mut params = base_params.clone();
            params.push(("page", page.to_string()));
            let result: BotResult<SearchPage> = self.get_json(path, &params, "Search page").await;
            let data = match result {
                Ok(data) => data,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    error!("{} page {} failed: {}", path, page, e);
                    break;
                }
            };
            let short = data.results.len() < TMDB_PAGE_LEN;
            for hit in data.results {
                let hit_kind = match kind {
                    Some(k) => Some(k),
                    None => hit.media_type.as_deref().and_then(MediaKind::from_tmdb),
                };
                if let Some(k) = hit_kind {
                    out.push(hit.into_summary(k));
                }
            }
            if short {
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogService for TmdbCatalog {
    async fn search(&self, query: &str) -> BotResult<Vec<EntitySummary>> {
        let mut results = Vec::new();
        match split_trailing_year(query) {
            (title, Some(year)) => {
                info!("Query with year: '{}' in {}", title, year);
                self.collect_pages(
                    "search/movie",
                    vec![("query", title.clone()), ("year", year.to_string())],
                    YEAR_SEARCH_PAGES,
                    Some(MediaKind::Movie),
                    &mut results,
                )
                .await?;
                self.collect_pages(
                    "search/tv",
                    vec![("query", title), ("first_air_date_year", year.to_string())],
                    YEAR_SEARCH_PAGES,
                    Some(MediaKind::Show),
                    &mut results,
                )
                .await?;
            }
            (title, None) => {
                self.collect_pages(
                    "search/multi",
                    vec![("query", title)],
                    MULTI_SEARCH_PAGES,
                    None,
                    &mut results,
                )
                .await?;
            }
        }
        info!("Found {} TMDB results for '{}'", results.len(), query);
        Ok(results)
    }

    async fn detail(&self, catalog_id: i64, kind: MediaKind) -> BotResult<EntityDetail> {
        info!("Fetching TMDB details for {} ID {}", kind.tmdb_path(), catalog_id);
        let path = format!("{}/{}", kind.tmdb_path(), catalog_id);
        let raw: DetailRaw = self.get_json(&path, &[], "Title").await?;

        let external_id = match kind {
            MediaKind::Movie => non_blank_id(raw.imdb_id),
            MediaKind::Show => {
                let ids: ExternalIds = self
                    .get_json(&format!("tv/{}/external_ids", catalog_id), &[], "External ids")
                    .await?;
                non_blank_id(ids.imdb_id)
            }
        };

        let (name, date) = match kind {
            MediaKind::Movie => (raw.title.or(raw.name), raw.release_date),
            MediaKind::Show => (raw.name.or(raw.title), raw.first_air_date),
        };
        let overview = raw.overview.filter(|o| !o.is_empty());

        Ok(EntityDetail {
            name: name.unwrap_or_else(|| "Unknown".to_string()),
            year: date.as_deref().and_then(year_of),
            rating: raw.vote_average,
            vote_count: raw.vote_count,
            external_id,
            catalog_id,
            poster_url: raw
                .poster_path
                .filter(|p| !p.is_empty())
                .map(|p| format!("{}{}", TMDB_POSTER_BASE, p)),
            description: overview
                .map(|o| shorten(&o, DESCRIPTION_LIMIT))
                .unwrap_or_else(|| "No description".to_string()),
            kind,
            seasons: match kind {
                MediaKind::Movie => Vec::new(),
                MediaKind::Show => raw
                    .seasons
                    .into_iter()
                    .map(|s| SeasonSummary {
                        number: s.season_number,
                        name: s.name,
                        episode_count: s.episode_count,
                    })
                    .collect(),
            },
        })
    }

    async fn list_season_episodes(
        &self,
        catalog_id: i64,
        season_number: i64,
    ) -> BotResult<Vec<EpisodeSummary>> {
        info!("Fetching episodes for TMDB ID {}, Season {}", catalog_id, season_number);
        let raw: SeasonDetailRaw = self
            .get_json(
                &format!("tv/{}/season/{}", catalog_id, season_number),
                &[],
                "Season",
            )
            .await?;
        if raw.episodes.is_empty() {
            return Err(BotError::NotFound("Episodes".to_string()));
        }
        Ok(raw
            .episodes
            .into_iter()
            .map(|e| EpisodeSummary {
                number: e.episode_number,
                name: e.name,
                overview: shorten(&e.overview, EPISODE_OVERVIEW_LIMIT),
            })
            .collect())
    }

    async fn recommendations(&self, catalog_id: i64, kind: MediaKind) -> BotResult<Vec<Companion>> {
        let page: SearchPage = self
            .get_json(
                &format!("{}/{}/recommendations", kind.tmdb_path(), catalog_id),
                &[],
                "Recommendations",
            )
            .await?;
        Ok(page
            .results
            .into_iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|hit| {
                let summary = hit.into_summary(kind);
                Companion {
                    catalog_id: summary.catalog_id,
                    title: summary.name,
                    year: summary.year,
                    rating: summary.rating,
                }
            })
            .collect())
    }

    async fn parse_filenames(&self, filenames: &[String]) -> BotResult<Vec<Option<FilenameParse>>> {
        let url = format!("{}/scrape/parse", self.parse.base_url);
        info!("[Parse] {} filenames", filenames.len());
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.parse.token)
            .bearer_auth(&self.parse.token)
            .json(filenames)
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Service::Library, e))?;
        let parsed: ParseResponse = read_json(Service::Library, "Parse", resp).await?;
        if parsed.data.len() != filenames.len() {
            warn!(
                "[Parse] returned {} entries for {} filenames",
                parsed.data.len(),
                filenames.len()
            );
        }
        // Align by position; anything the parser skipped counts as unparseable
        let mut aligned: Vec<Option<FilenameParse>> = parsed
            .data
            .into_iter()
            .take(filenames.len())
            .map(|p| p.filter(FilenameParse::is_usable))
            .collect();
        aligned.resize(filenames.len(), None);
        Ok(aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trailing_year() {
        assert_eq!(split_trailing_year("Dune 2021"), ("Dune".to_string(), Some(2021)));
        assert_eq!(split_trailing_year("  Alien  "), ("Alien".to_string(), None));
        // A bare year is a title, not a filter
        assert_eq!(split_trailing_year("1917"), ("1917".to_string(), None));
    }

    #[test]
    fn test_search_hit_into_summary_uses_kind_fields() {
        let hit: SearchHit = serde_json::from_str(
            r#"{"id":1399,"name":"Game of Thrones","first_air_date":"2011-04-17","vote_average":8.4,"media_type":"tv"}"#,
        )
        .unwrap();
        let summary = hit.into_summary(MediaKind::Show);
        assert_eq!(summary.name, "Game of Thrones");
        assert_eq!(summary.year.as_deref(), Some("2011"));
        assert_eq!(summary.kind, MediaKind::Show);
    }

    #[test]
    fn test_shorten_counts_chars() {
        assert_eq!(shorten("abc", 5), "abc");
        assert_eq!(shorten("abcdef", 3), "abc...");
    }

    #[test]
    fn test_rating_and_year_labels() {
        assert_eq!(rating_label(Some(7.456)), "7.5");
        assert_eq!(rating_label(None), "N/A");
        assert_eq!(year_label(Some("")), "N/A");
        assert_eq!(year_label(Some("1999")), "1999");
    }

    #[test]
    fn test_filename_parse_usable() {
        let p: FilenameParse = serde_json::from_str(r#"{"seasons":[1],"episodes":[2,3]}"#).unwrap();
        assert!(p.is_usable());
        let p: FilenameParse = serde_json::from_str(r#"{"seasons":[1]}"#).unwrap();
        assert!(!p.is_usable());
    }
}
