//! Stream → session → file → commit workflow.
//!
//! The workflow is an explicit value stored on the session. Each step reads the
//! current [`ScrapeStep`], runs its remote calls and only then replaces the step,
//! so a failed call leaves the workflow where it was.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::api::{ManifestFile, MediaKind, Services, StreamDescriptor};
use crate::errors::{BotError, Precondition, ScrapeError, ScrapeStage};
use crate::menu::{clip, fit_label, MenuOption, LABEL_LIMIT, MAX_OPTIONS};
use crate::session::{Level, Session};

pub const VIDEO_EXTENSIONS: [&str; 3] = [".mkv", ".avi", ".mp4"];
pub const MOVIE_MIN_BYTES: u64 = 200 * 1024 * 1024;
pub const SHOW_MIN_BYTES: u64 = 80 * 1024 * 1024;
pub const FILE_LISTING_NAME: &str = "file_options.txt";

#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeStep {
    /// Waiting for the user to pick a stream
    ChoosingStream { streams: Vec<StreamDescriptor> },
    /// Movie: waiting for exactly one file
    ChoosingFile {
        session_id: String,
        files: Vec<ManifestFile>,
    },
    /// Show: waiting for confirm or cancel over all filtered files
    Confirming {
        session_id: String,
        files: Vec<ManifestFile>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeWorkflowState {
    pub library_ref: String,
    pub kind: MediaKind,
    pub step: ScrapeStep,
}

/// What the user is asked next
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapePrompt {
    Streams(Vec<MenuOption>),
    Files {
        options: Vec<MenuOption>,
        /// Full listing when the menu had to be cut
        overflow: Option<String>,
    },
    Confirm { listing: String },
}

pub fn min_size(kind: MediaKind) -> u64 {
    match kind {
        MediaKind::Movie => MOVIE_MIN_BYTES,
        MediaKind::Show => SHOW_MIN_BYTES,
    }
}

/// Video container with a size at or above the per-kind floor
pub fn passes_filter(filename: &str, size: u64, kind: MediaKind) -> bool {
    let lower = filename.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) && size >= min_size(kind)
}

pub fn filter_files(files: &[ManifestFile], kind: MediaKind) -> Vec<ManifestFile> {
    files
        .iter()
        .filter(|f| passes_filter(&f.filename, f.size, kind))
        .cloned()
        .collect()
}

fn file_entry(file: &ManifestFile) -> Value {
    json!({
        "file_id": file.file_id,
        "filename": file.filename,
        "filesize": file.size,
    })
}

/// `{file_id: {file_id, filename, filesize}}` for a single movie file
pub fn movie_payload(file: &ManifestFile) -> Value {
    let mut map = Map::new();
    map.insert(file.file_id.clone(), file_entry(file));
    Value::Object(map)
}

/// `{"1": {...}, "2": {...}}`, numbered from 1 in filtered order
pub fn show_select_payload(files: &[ManifestFile]) -> Value {
    let map: Map<String, Value> = files
        .iter()
        .enumerate()
        .map(|(i, f)| ((i + 1).to_string(), file_entry(f)))
        .collect();
    Value::Object(map)
}

/// `{season: {episode: {filename, filesize}}}`. Files without a usable parse
/// are left out; `None` when nothing could be attributed.
pub fn show_attribute_payload(
    files: &[ManifestFile],
    parses: &[Option<crate::api::FilenameParse>],
) -> Option<Value> {
    let mut seasons: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for (file, parse) in files.iter().zip(parses) {
        let Some(parse) = parse.as_ref().filter(|p| p.is_usable()) else {
            warn!("[Parse] dropping unparsed file {}", file.filename);
            continue;
        };
        for season in &parse.seasons {
            let episodes = seasons.entry(season.to_string()).or_default();
            for episode in &parse.episodes {
                episodes.insert(
                    episode.to_string(),
                    json!({ "filename": file.filename, "filesize": file.size }),
                );
            }
        }
    }
    if seasons.is_empty() {
        return None;
    }
    Some(Value::Object(
        seasons
            .into_iter()
            .map(|(season, episodes)| (season, Value::Object(episodes)))
            .collect(),
    ))
}

fn file_listing(files: &[ManifestFile]) -> String {
    files
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {} - {} bytes", i + 1, f.filename, f.size))
        .collect::<Vec<_>>()
        .join("\n")
}

fn stream_options(streams: &[StreamDescriptor]) -> Vec<MenuOption> {
    streams
        .iter()
        .take(MAX_OPTIONS)
        .map(|s| MenuOption {
            label: fit_label("", &clip(&s.label(), LABEL_LIMIT), "", LABEL_LIMIT),
            value: s.infohash.clone(),
            description: None,
        })
        .collect()
}

fn file_options(files: &[ManifestFile]) -> Vec<MenuOption> {
    files
        .iter()
        .enumerate()
        .map(|(i, f)| MenuOption {
            label: fit_label("", &f.filename, "", LABEL_LIMIT),
            value: i.to_string(),
            description: None,
        })
        .collect()
}

fn no_active() -> ScrapeError {
    ScrapeError::Rejected(BotError::MissingPrecondition(Precondition::NoActiveScrape))
}

/// Stage 1: list candidate streams for the selected title
pub async fn begin(session: &mut Session, services: &Services) -> Result<ScrapePrompt, ScrapeError> {
    if !matches!(session.level, Level::Movie | Level::Show) {
        return Err(ScrapeError::Rejected(BotError::MissingPrecondition(
            Precondition::WrongLevel,
        )));
    }
    let library_ref = session
        .library_ref
        .clone()
        .ok_or(ScrapeError::Rejected(BotError::MissingPrecondition(
            Precondition::NotInLibrary,
        )))?;
    let kind = session
        .kind()
        .ok_or(ScrapeError::Rejected(BotError::MissingPrecondition(
            Precondition::NothingSelected,
        )))?;

    let streams = services
        .library
        .list_streams(&library_ref)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::ListStreams, e))?;
    if streams.is_empty() {
        return Err(ScrapeError::Empty(ScrapeStage::ListStreams));
    }

    let options = stream_options(&streams);
    info!("[Stream Menu] {} stream options for {}", options.len(), library_ref);
    session.scrape = Some(ScrapeWorkflowState {
        library_ref,
        kind,
        step: ScrapeStep::ChoosingStream { streams },
    });
    Ok(ScrapePrompt::Streams(options))
}

/// Stages 2 and 3: start a session on the chosen stream and filter its files
pub async fn choose_stream(
    session: &mut Session,
    services: &Services,
    stream_id: &str,
) -> Result<ScrapePrompt, ScrapeError> {
    let state = session.scrape.as_ref().ok_or_else(no_active)?;
    let ScrapeStep::ChoosingStream { streams } = &state.step else {
        return Err(no_active());
    };
    if !streams.iter().any(|s| s.infohash == stream_id) {
        return Err(ScrapeError::Rejected(BotError::NotFound("Stream".to_string())));
    }
    let kind = state.kind;

    let started = services
        .library
        .start_session(&state.library_ref, stream_id)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::StartSession, e))?;
    if started.files.is_empty() {
        return Err(ScrapeError::Empty(ScrapeStage::StartSession));
    }

    let valid = filter_files(&started.files, kind);
    info!(
        "[File Filter] {} of {} file(s) valid for session {}",
        valid.len(),
        started.files.len(),
        started.session_id
    );
    if valid.is_empty() {
        return Err(ScrapeError::Empty(ScrapeStage::FilterFiles));
    }

    let session_id = started.session_id;
    let (step, prompt) = match kind {
        MediaKind::Movie => {
            let overflow = (valid.len() > MAX_OPTIONS).then(|| file_listing(&valid));
            let files: Vec<ManifestFile> = valid.into_iter().take(MAX_OPTIONS).collect();
            let prompt = ScrapePrompt::Files {
                options: file_options(&files),
                overflow,
            };
            (ScrapeStep::ChoosingFile { session_id, files }, prompt)
        }
        MediaKind::Show => {
            let prompt = ScrapePrompt::Confirm {
                listing: file_listing(&valid),
            };
            (
                ScrapeStep::Confirming {
                    session_id,
                    files: valid,
                },
                prompt,
            )
        }
    };
    if let Some(state) = session.scrape.as_mut() {
        state.step = step;
    }
    Ok(prompt)
}

fn finish(session: &mut Session) {
    session.scrape = None;
    session.invalidate_status();
}

/// Stage 4, movie: submit one file, update attributes, commit
pub async fn choose_file(
    session: &mut Session,
    services: &Services,
    index: usize,
) -> Result<String, ScrapeError> {
    let state = session.scrape.as_ref().ok_or_else(no_active)?;
    let ScrapeStep::ChoosingFile { session_id, files } = &state.step else {
        return Err(no_active());
    };
    let file = files
        .get(index)
        .ok_or_else(|| ScrapeError::Rejected(BotError::NotFound("File".to_string())))?;
    let payload = movie_payload(file);
    info!("[Select Files] Payload (Movie): {}", payload);

    services
        .library
        .select_files(session_id, &payload)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::SelectFiles, e))?;
    services
        .library
        .update_attributes(session_id, &payload)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::UpdateAttributes, e))?;
    services
        .library
        .complete_session(session_id)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::CompleteSession, e))?;

    let message = format!("Scraping session completed for file: {}", file.filename);
    finish(session);
    Ok(message)
}

/// Stage 4, show: submit all files, attribute them by parsed filename, commit
pub async fn confirm(session: &mut Session, services: &Services) -> Result<String, ScrapeError> {
    let state = session.scrape.as_ref().ok_or_else(no_active)?;
    let ScrapeStep::Confirming { session_id, files } = &state.step else {
        return Err(no_active());
    };

    let select_payload = show_select_payload(files);
    info!("[TV Select Files] {} file(s) for session {}", files.len(), session_id);
    services
        .library
        .select_files(session_id, &select_payload)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::SelectFiles, e))?;

    let filenames: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
    let parses = services
        .catalog
        .parse_filenames(&filenames)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::ParseFilenames, e))?;
    let attributes = show_attribute_payload(files, &parses)
        .ok_or(ScrapeError::Empty(ScrapeStage::ParseFilenames))?;

    services
        .library
        .update_attributes(session_id, &attributes)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::UpdateAttributes, e))?;
    services
        .library
        .complete_session(session_id)
        .await
        .map_err(|e| ScrapeError::Remote(ScrapeStage::CompleteSession, e))?;

    finish(session);
    Ok("TV scraping session completed.".to_string())
}

pub fn cancel(session: &mut Session) -> Result<String, ScrapeError> {
    match session.scrape.take() {
        Some(_) => Ok("Scrape cancelled.".to_string()),
        None => Err(no_active()),
    }
}
