#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use rivbot_lib::api::{
    CatalogService, Companion, EntityDetail, EntitySummary, EpisodeSummary, FilenameParse,
    LibraryAction, LibraryLookup, LibraryQuery, LibraryService, MediaKind, MutationOutcome,
    MutationTarget, ScrapeSessionStart, SeasonSummary, Services, StatusTree, StreamDescriptor,
};
use rivbot_lib::errors::{BotError, BotResult};
use rivbot_lib::session::Session;

pub const INITIATOR: u64 = 1001;
pub const STRANGER: u64 = 2002;

/// Holds the next `detail` call until released
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct MockCatalog {
    pub details: Mutex<HashMap<i64, EntityDetail>>,
    pub detail_error: Mutex<Option<BotError>>,
    pub episodes: Mutex<HashMap<(i64, i64), Vec<EpisodeSummary>>>,
    pub recommendations: Mutex<Vec<Companion>>,
    pub parses: Mutex<Vec<Option<FilenameParse>>>,
    pub gate: Mutex<Option<Arc<Gate>>>,
    pub detail_calls: AtomicUsize,
    pub episode_calls: AtomicUsize,
    pub parse_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn with_details(details: Vec<EntityDetail>) -> Self {
        let catalog = Self::default();
        {
            let mut map = catalog.details.lock().unwrap();
            for d in details {
                map.insert(d.catalog_id, d);
            }
        }
        catalog
    }

    pub fn fail_detail(&self, err: BotError) {
        *self.detail_error.lock().unwrap() = Some(err);
    }

    pub fn hold_detail(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn search(&self, _query: &str) -> BotResult<Vec<EntitySummary>> {
        Ok(Vec::new())
    }

    async fn detail(&self, catalog_id: i64, _kind: MediaKind) -> BotResult<EntityDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(err) = self.detail_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.details
            .lock()
            .unwrap()
            .get(&catalog_id)
            .cloned()
            .ok_or_else(|| BotError::NotFound("Item".to_string()))
    }

    async fn list_season_episodes(
        &self,
        catalog_id: i64,
        season_number: i64,
    ) -> BotResult<Vec<EpisodeSummary>> {
        self.episode_calls.fetch_add(1, Ordering::SeqCst);
        self.episodes
            .lock()
            .unwrap()
            .get(&(catalog_id, season_number))
            .cloned()
            .ok_or_else(|| BotError::NotFound("Episodes".to_string()))
    }

    async fn recommendations(&self, _catalog_id: i64, _kind: MediaKind) -> BotResult<Vec<Companion>> {
        Ok(self.recommendations.lock().unwrap().clone())
    }

    async fn parse_filenames(&self, filenames: &[String]) -> BotResult<Vec<Option<FilenameParse>>> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);
        let mut parses = self.parses.lock().unwrap().clone();
        parses.resize(filenames.len(), None);
        Ok(parses)
    }
}

#[derive(Default)]
pub struct MockLibrary {
    pub lookup: Mutex<LibraryLookup>,
    pub status: Mutex<StatusTree>,
    pub streams: Mutex<Vec<StreamDescriptor>>,
    pub start: Mutex<Option<ScrapeSessionStart>>,
    pub new_ref: Mutex<Option<String>>,
    pub calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub mutate_calls: AtomicUsize,
    pub select_files_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub payloads: Mutex<Vec<serde_json::Value>>,
}

impl MockLibrary {
    pub fn in_library(library_ref: &str, state: &str) -> Self {
        let library = Self::default();
        *library.lookup.lock().unwrap() = LibraryLookup {
            library_ref: Some(library_ref.to_string()),
            state: Some(state.to_string()),
        };
        *library.status.lock().unwrap() = StatusTree {
            state: Some(state.to_string()),
            seasons: Vec::new(),
        };
        library
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self, counter: &AtomicUsize) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LibraryService for MockLibrary {
    async fn find_by_name_or_external_id(&self, _query: &LibraryQuery) -> BotResult<LibraryLookup> {
        self.hit(&self.lookup_calls);
        Ok(self.lookup.lock().unwrap().clone())
    }

    async fn get_status(&self, _library_ref: &str) -> BotResult<StatusTree> {
        self.hit(&self.status_calls);
        Ok(self.status.lock().unwrap().clone())
    }

    async fn mutate(&self, _action: LibraryAction, _target: &MutationTarget) -> BotResult<MutationOutcome> {
        self.hit(&self.mutate_calls);
        Ok(MutationOutcome {
            new_ref: self.new_ref.lock().unwrap().clone(),
        })
    }

    async fn list_item_streams(&self, _library_ref: &str) -> BotResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["magnet:?xt=urn:btih:abc".to_string()])
    }

    async fn list_streams(&self, _library_ref: &str) -> BotResult<Vec<StreamDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.streams.lock().unwrap().clone())
    }

    async fn start_session(&self, _library_ref: &str, _stream_id: &str) -> BotResult<ScrapeSessionStart> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.start.lock().unwrap().clone().unwrap_or(ScrapeSessionStart {
            session_id: "session-1".to_string(),
            files: Vec::new(),
        }))
    }

    async fn select_files(&self, _session_id: &str, payload: &serde_json::Value) -> BotResult<()> {
        self.hit(&self.select_files_calls);
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn update_attributes(&self, _session_id: &str, payload: &serde_json::Value) -> BotResult<()> {
        self.hit(&self.update_calls);
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn complete_session(&self, _session_id: &str) -> BotResult<()> {
        self.hit(&self.complete_calls);
        Ok(())
    }
}

pub fn services(catalog: &Arc<MockCatalog>, library: &Arc<MockLibrary>) -> Services {
    Services {
        catalog: catalog.clone(),
        library: library.clone(),
    }
}

pub fn summary(name: &str, catalog_id: i64, kind: MediaKind) -> EntitySummary {
    EntitySummary {
        name: name.to_string(),
        year: Some("2021".to_string()),
        rating: Some(7.5),
        catalog_id,
        kind,
    }
}

pub fn candidates(count: usize, kind: MediaKind) -> Vec<EntitySummary> {
    (0..count)
        .map(|i| summary(&format!("Title {}", i), i as i64 + 1, kind))
        .collect()
}

pub fn movie_detail(catalog_id: i64, external_id: Option<&str>) -> EntityDetail {
    EntityDetail {
        name: format!("Movie {}", catalog_id),
        year: Some("2021".to_string()),
        rating: Some(7.5),
        vote_count: 1200,
        external_id: external_id.map(str::to_string),
        catalog_id,
        poster_url: None,
        description: "A film.".to_string(),
        kind: MediaKind::Movie,
        seasons: Vec::new(),
    }
}

pub fn show_detail(catalog_id: i64, season_count: i64) -> EntityDetail {
    EntityDetail {
        name: format!("Show {}", catalog_id),
        year: Some("2019".to_string()),
        rating: Some(8.1),
        vote_count: 900,
        external_id: Some(format!("tt{:07}", catalog_id)),
        catalog_id,
        poster_url: None,
        description: "A show.".to_string(),
        kind: MediaKind::Show,
        seasons: (1..=season_count)
            .map(|n| SeasonSummary {
                number: n,
                name: format!("Season {}", n),
                episode_count: 8,
            })
            .collect(),
    }
}

pub fn episodes(count: i64) -> Vec<EpisodeSummary> {
    (1..=count)
        .map(|n| EpisodeSummary {
            number: n,
            name: format!("Episode {}", n),
            overview: "Things happen.".to_string(),
        })
        .collect()
}

pub fn session_over(candidates: Vec<EntitySummary>) -> Session {
    Session::create(candidates, INITIATOR, "test").unwrap()
}
