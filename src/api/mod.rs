//! HTTP clients for the three remote collaborators.
//!
//! Each service is exposed to the core through an async trait so the drill-down
//! and scrape logic can run against mocks. The concrete clients share one
//! `reqwest::Client` with a bounded per-request timeout.

pub mod catalog;
pub mod library;
pub mod releases;

use crate::errors::{BotError, BotResult, Service};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub use catalog::{
    rating_label, year_label, CatalogService, Companion, EntityDetail, EntitySummary,
    EpisodeSummary, FilenameParse, MediaKind, ParseEndpoint, SeasonSummary, TmdbCatalog,
};
pub use library::{
    first_match, EpisodeStatus, LibraryAction, LibraryItem, LibraryLookup, LibraryQuery,
    LibraryService, LibraryStats, ManifestFile, MutationOutcome, MutationTarget, RivenClient,
    ScrapeSessionStart, SeasonStatus, StatusTree, StreamDescriptor,
};
pub use releases::{Release, TraktClient};

/// The two services every session transition may call
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<dyn CatalogService>,
    pub library: Arc<dyn LibraryService>,
}

/// Shared HTTP client. Every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("rivbot/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

/// Trim a trailing slash so endpoint joins stay predictable
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Check status and decode the body.
/// 404 maps to `NotFound(what)`, other non-2xx to `RemoteUnavailable`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: Service,
    what: &str,
    resp: reqwest::Response,
) -> BotResult<T> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(BotError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BotError::RemoteUnavailable(
            service,
            format!("status {}: {}", status.as_u16(), error_detail(&body)),
        ));
    }
    resp.json::<T>()
        .await
        .map_err(|e| BotError::from_reqwest(service, e))
}

/// Check status only, discarding the body
pub(crate) async fn expect_success(
    service: Service,
    what: &str,
    resp: reqwest::Response,
) -> BotResult<()> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(BotError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BotError::RemoteUnavailable(
            service,
            format!("status {}: {}", status.as_u16(), error_detail(&body)),
        ));
    }
    Ok(())
}

/// FastAPI-style `{"detail": ...}` bodies carry the useful part
fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").map(|d| match d {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }));
    let text = detail.unwrap_or_else(|| body.trim().to_string());
    if text.is_empty() {
        "No detail provided".to_string()
    } else {
        text.chars().take(200).collect()
    }
}
