use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use super::{expect_success, normalize_base_url, read_json};
use crate::errors::{BotError, BotResult, Service};
use crate::flex_id::FlexId;

/// How many search hits to pull when matching a title against the library
const LOOKUP_LIMIT: u32 = 50;
const MAGNET_LIMIT: usize = 5;

/// Identity used to find a title's library entry
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryQuery {
    pub name: String,
    pub external_id: Option<String>,
    pub catalog_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryItem {
    #[serde(default)]
    pub id: FlexId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub tmdb_id: FlexId,
    #[serde(default)]
    pub imdb_id: FlexId,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    items: Vec<LibraryItem>,
}

/// First library item whose TMDB id or IMDb id matches the query.
/// Remote order is authoritative; nothing is re-sorted.
pub fn first_match<'a>(items: &'a [LibraryItem], query: &LibraryQuery) -> Option<&'a LibraryItem> {
    let catalog = FlexId::Number(query.catalog_id);
    items.iter().find(|item| {
        item.tmdb_id.same_as(&catalog)
            || query
                .external_id
                .as_deref()
                .is_some_and(|ext| item.imdb_id.matches_str(ext))
    })
}

/// Result of matching a title against the library
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryLookup {
    pub library_ref: Option<String>,
    pub state: Option<String>,
}

impl LibraryLookup {
    pub fn present(&self) -> bool {
        self.library_ref.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct EpisodeStatus {
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SeasonStatus {
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub episodes: Vec<EpisodeStatus>,
}

/// Status payload of one library entry, with its season/episode children
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StatusTree {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub seasons: Vec<SeasonStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryAction {
    Add,
    Remove,
    Retry,
    Reset,
}

impl LibraryAction {
    fn endpoint(&self) -> &'static str {
        match self {
            LibraryAction::Add => "items/add",
            LibraryAction::Remove => "items/remove",
            LibraryAction::Retry => "items/retry",
            LibraryAction::Reset => "items/reset",
        }
    }

    fn param(&self) -> &'static str {
        match self {
            LibraryAction::Add => "imdb_ids",
            _ => "ids",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LibraryAction::Add => "Add",
            LibraryAction::Remove => "Remove",
            LibraryAction::Retry => "Retry",
            LibraryAction::Reset => "Reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationTarget {
    /// IMDb id, used by `Add`
    ExternalId(String),
    /// Existing library entry
    Ref(String),
}

impl MutationTarget {
    fn value(&self) -> &str {
        match self {
            MutationTarget::ExternalId(id) | MutationTarget::Ref(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutationOutcome {
    /// Set by `Add` to the id of the created entry
    pub new_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(default)]
    ids: Vec<FlexId>,
}

/// A scraped torrent the user can start a session on
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamDescriptor {
    pub infohash: String,
    pub title: String,
    pub year: Option<String>,
    pub resolution: Option<String>,
    pub codec: Option<String>,
    pub audio: Vec<String>,
    pub channels: Vec<String>,
    pub languages: Vec<String>,
}

impl StreamDescriptor {
    /// "title year resolution codec audio channels languages", each field N/A when absent
    pub fn label(&self) -> String {
        fn or_na(v: &Option<String>) -> &str {
            v.as_deref().filter(|s| !s.is_empty()).unwrap_or("N/A")
        }
        fn joined(v: &[String], sep: &str) -> String {
            if v.is_empty() {
                "N/A".to_string()
            } else {
                v.join(sep)
            }
        }
        let title: String = self.title.chars().take(40).collect();
        format!(
            "{} {} {} {} {} {} {}",
            title,
            or_na(&self.year),
            or_na(&self.resolution),
            or_na(&self.codec),
            joined(&self.audio, "/"),
            joined(&self.channels, "/"),
            joined(&self.languages, " ")
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    streams: Option<RankedStreams>,
}

/// Streams keyed by infohash, in the order Riven ranked them
#[derive(Debug, Default)]
struct RankedStreams(Vec<(String, StreamRaw)>);

impl<'de> Deserialize<'de> for RankedStreams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{MapAccess, Visitor};

        struct RankedVisitor;

        impl<'de> Visitor<'de> for RankedVisitor {
            type Value = RankedStreams;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of infohash to stream")
            }

            fn visit_map<A>(self, mut map: A) -> Result<RankedStreams, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut streams = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((hash, raw)) = map.next_entry::<String, StreamRaw>()? {
                    streams.push((hash, raw));
                }
                Ok(RankedStreams(streams))
            }
        }

        deserializer.deserialize_map(RankedVisitor)
    }
}

#[derive(Debug, Default, Deserialize)]
struct StreamRaw {
    parsed_title: Option<String>,
    raw_title: Option<String>,
    #[serde(default)]
    parsed_data: ParsedData,
}

#[derive(Debug, Default, Deserialize)]
struct ParsedData {
    #[serde(default)]
    year: FlexId,
    resolution: Option<String>,
    codec: Option<String>,
    #[serde(default)]
    audio: Vec<String>,
    #[serde(default)]
    channels: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
}

fn ranked_descriptors(data: ScrapeResponse) -> Vec<StreamDescriptor> {
    data.streams
        .unwrap_or_default()
        .0
        .into_iter()
        .map(|(hash, raw)| raw.into_descriptor(hash))
        .collect()
}

impl StreamRaw {
    fn into_descriptor(self, infohash: String) -> StreamDescriptor {
        let title = self
            .parsed_title
            .filter(|t| !t.is_empty())
            .or(self.raw_title)
            .unwrap_or_else(|| "Unknown".to_string());
        let data = self.parsed_data;
        StreamDescriptor {
            infohash,
            title,
            year: data.year.canonical(),
            resolution: data.resolution,
            codec: data.codec,
            audio: data.audio,
            channels: data.channels,
            languages: data.languages,
        }
    }
}

/// One file inside a started scrape session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestFile {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSessionStart {
    pub session_id: String,
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Deserialize)]
struct StartSessionRaw {
    #[serde(default)]
    session_id: FlexId,
    torrent_info: Option<TorrentInfoRaw>,
}

#[derive(Debug, Deserialize)]
struct TorrentInfoRaw {
    files: Option<HashMap<String, FileRaw>>,
}

#[derive(Debug, Deserialize)]
struct FileRaw {
    #[serde(default)]
    filename: String,
    bytes: Option<u64>,
    filesize: Option<u64>,
}

fn manifest_from(files: HashMap<String, FileRaw>) -> Vec<ManifestFile> {
    let mut manifest: Vec<ManifestFile> = files
        .into_iter()
        .map(|(file_id, raw)| ManifestFile {
            file_id,
            filename: raw.filename,
            size: raw.bytes.filter(|b| *b > 0).or(raw.filesize).unwrap_or(0),
        })
        .collect();
    // Torrent file ids are numeric; keep them in torrent order
    manifest.sort_by(|a, b| {
        match (a.file_id.parse::<u64>(), b.file_id.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.file_id.cmp(&b.file_id),
        }
    });
    manifest
}

#[derive(Debug, Deserialize)]
struct StreamUri {
    uri: Option<String>,
}

/// Counters reported by the library's stats route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryStats {
    #[serde(default)]
    pub total_shows: u64,
    #[serde(default)]
    pub total_movies: u64,
    #[serde(default)]
    pub incomplete_items: u64,
    #[serde(default)]
    pub states: HashMap<String, u64>,
}

impl LibraryStats {
    pub fn state_count(&self, state: &str) -> u64 {
        self.states.get(state).copied().unwrap_or(0)
    }
}

/// Media-management backend used by the drill-down, actions and scrape workflow
#[async_trait]
pub trait LibraryService: Send + Sync {
    async fn find_by_name_or_external_id(&self, query: &LibraryQuery) -> BotResult<LibraryLookup>;

    async fn get_status(&self, library_ref: &str) -> BotResult<StatusTree>;

    async fn mutate(&self, action: LibraryAction, target: &MutationTarget) -> BotResult<MutationOutcome>;

    /// Stream URIs already attached to an entry
    async fn list_item_streams(&self, library_ref: &str) -> BotResult<Vec<String>>;

    /// Candidate streams from a fresh scrape; empty when none were found
    async fn list_streams(&self, library_ref: &str) -> BotResult<Vec<StreamDescriptor>>;

    async fn start_session(&self, library_ref: &str, stream_id: &str) -> BotResult<ScrapeSessionStart>;

    async fn select_files(&self, session_id: &str, payload: &serde_json::Value) -> BotResult<()>;

    async fn update_attributes(&self, session_id: &str, payload: &serde_json::Value) -> BotResult<()>;

    async fn complete_session(&self, session_id: &str) -> BotResult<()>;
}

/// Riven REST client
#[derive(Debug, Clone)]
pub struct RivenClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl RivenClient {
    pub fn new(client: reqwest::Client, base_url: &str, token: String) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            token,
            client,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let url = self.url(endpoint);
        debug!(%method, %url, "Riven request");
        self.client
            .request(method, url)
            .header("x-api-key", &self.token)
            .bearer_auth(&self.token)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> BotResult<reqwest::Response> {
        builder
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Service::Library, e))
    }

    pub async fn health(&self) -> BotResult<()> {
        let resp = self.send(self.request(reqwest::Method::GET, "health")).await?;
        expect_success(Service::Library, "Health", resp).await?;
        info!("Riven API is healthy");
        Ok(())
    }

    pub async fn stats(&self) -> BotResult<LibraryStats> {
        let resp = self.send(self.request(reqwest::Method::GET, "stats")).await?;
        read_json(Service::Library, "Stats", resp).await
    }

    pub async fn logs(&self) -> BotResult<serde_json::Value> {
        let resp = self.send(self.request(reqwest::Method::GET, "logs")).await?;
        read_json(Service::Library, "Logs", resp).await
    }

    /// Service name to enabled flag
    pub async fn services(&self) -> BotResult<BTreeMap<String, bool>> {
        let resp = self.send(self.request(reqwest::Method::GET, "services")).await?;
        let raw: BTreeMap<String, serde_json::Value> =
            read_json(Service::Library, "Services", resp).await?;
        Ok(raw
            .into_iter()
            .map(|(name, v)| {
                let enabled = match v {
                    serde_json::Value::Bool(b) => b,
                    serde_json::Value::Null => false,
                    _ => true,
                };
                (name, enabled)
            })
            .collect())
    }

    pub async fn recently_added(&self, limit: u32) -> BotResult<Vec<LibraryItem>> {
        let resp = self
            .send(self.request(reqwest::Method::GET, "items").query(&[
                ("sort", "date_desc".to_string()),
                ("limit", limit.to_string()),
                ("type", "movie,show".to_string()),
            ]))
            .await?;
        let page: ItemsPage = read_json(Service::Library, "Items", resp).await?;
        Ok(page.items)
    }
}

#[async_trait]
impl LibraryService for RivenClient {
    async fn find_by_name_or_external_id(&self, query: &LibraryQuery) -> BotResult<LibraryLookup> {
        let resp = self
            .send(self.request(reqwest::Method::GET, "items").query(&[
                ("search", query.name.clone()),
                ("limit", LOOKUP_LIMIT.to_string()),
            ]))
            .await?;
        let page: ItemsPage = read_json(Service::Library, "Items", resp).await?;
        if !page.success {
            warn!("Riven search for '{}' reported success=false", query.name);
            return Ok(LibraryLookup::default());
        }
        let lookup = match first_match(&page.items, query) {
            Some(item) => LibraryLookup {
                library_ref: item.id.canonical(),
                state: Some(item.state.clone().unwrap_or_else(|| "Unknown".to_string())),
            },
            None => LibraryLookup::default(),
        };
        info!(
            "Riven lookup for '{}' (TMDB {}): {:?}",
            query.name, query.catalog_id, lookup.library_ref
        );
        Ok(lookup)
    }

    async fn get_status(&self, library_ref: &str) -> BotResult<StatusTree> {
        let resp = self
            .send(self.request(reqwest::Method::GET, &format!("items/{}", library_ref)))
            .await?;
        read_json(Service::Library, "Item", resp).await
    }

    async fn mutate(&self, action: LibraryAction, target: &MutationTarget) -> BotResult<MutationOutcome> {
        let method = match action {
            LibraryAction::Remove => reqwest::Method::DELETE,
            _ => reqwest::Method::POST,
        };
        info!("Riven {} for {}", action.display_name(), target.value());
        let resp = self
            .send(
                self.request(method, action.endpoint())
                    .query(&[(action.param(), target.value())]),
            )
            .await?;
        let body: serde_json::Value = read_json(Service::Library, "Item", resp).await?;
        if action != LibraryAction::Add {
            return Ok(MutationOutcome::default());
        }
        let parsed: MutationResponse = serde_json::from_value(body)
            .map_err(|e| BotError::Malformed(Service::Library, e.to_string()))?;
        let new_ref = parsed
            .ids
            .first()
            .and_then(FlexId::canonical)
            .ok_or_else(|| BotError::Malformed(Service::Library, "add returned no ids".into()))?;
        Ok(MutationOutcome {
            new_ref: Some(new_ref),
        })
    }

    async fn list_item_streams(&self, library_ref: &str) -> BotResult<Vec<String>> {
        let resp = self
            .send(self.request(reqwest::Method::GET, &format!("items/{}/streams", library_ref)))
            .await?;
        let streams: Vec<StreamUri> = read_json(Service::Library, "Streams", resp).await?;
        Ok(streams
            .into_iter()
            .take(MAGNET_LIMIT)
            .map(|s| s.uri.unwrap_or_else(|| "No URI".to_string()))
            .collect())
    }

    async fn list_streams(&self, library_ref: &str) -> BotResult<Vec<StreamDescriptor>> {
        let resp = self
            .send(self.request(reqwest::Method::GET, &format!("scrape/scrape/{}", library_ref)))
            .await?;
        let data: ScrapeResponse = read_json(Service::Library, "Streams", resp).await?;
        let streams = ranked_descriptors(data);
        info!("[Fetch Streams] Found {} streams for {}", streams.len(), library_ref);
        Ok(streams)
    }

    async fn start_session(&self, library_ref: &str, stream_id: &str) -> BotResult<ScrapeSessionStart> {
        let resp = self
            .send(
                self.request(reqwest::Method::POST, "scrape/scrape/start_session")
                    .query(&[("item_id", library_ref), ("magnet", stream_id)]),
            )
            .await?;
        let raw: StartSessionRaw = read_json(Service::Library, "Session", resp).await?;
        let session_id = raw
            .session_id
            .canonical()
            .ok_or_else(|| BotError::Malformed(Service::Library, "no session_id returned".into()))?;
        let files = raw
            .torrent_info
            .and_then(|t| t.files)
            .ok_or_else(|| BotError::Malformed(Service::Library, "no file manifest returned".into()))?;
        info!("[Start Session] {} returned {} file(s)", session_id, files.len());
        Ok(ScrapeSessionStart {
            session_id,
            files: manifest_from(files),
        })
    }

    async fn select_files(&self, session_id: &str, payload: &serde_json::Value) -> BotResult<()> {
        debug!("[Select Files] {}: {}", session_id, payload);
        let resp = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    &format!("scrape/scrape/select_files/{}", session_id),
                )
                .json(payload),
            )
            .await?;
        expect_success(Service::Library, "Session", resp).await
    }

    async fn update_attributes(&self, session_id: &str, payload: &serde_json::Value) -> BotResult<()> {
        debug!("[Update Attributes] {}: {}", session_id, payload);
        let resp = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    &format!("scrape/scrape/update_attributes/{}", session_id),
                )
                .json(payload),
            )
            .await?;
        expect_success(Service::Library, "Session", resp).await
    }

    async fn complete_session(&self, session_id: &str) -> BotResult<()> {
        let resp = self
            .send(self.request(
                reqwest::Method::POST,
                &format!("scrape/scrape/complete_session/{}", session_id),
            ))
            .await?;
        expect_success(Service::Library, "Session", resp).await?;
        info!("[Complete Session] {} completed", session_id);
        Ok(())
    }
}
