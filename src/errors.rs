use std::fmt;
use thiserror::Error;

/// Remote collaborator an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Metadata provider (TMDB)
    Catalog,
    /// Media-management backend (Riven)
    Library,
    /// Release-list provider (Trakt)
    Releases,
    /// Chat surface (Discord)
    Chat,
}

impl Service {
    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Catalog => "TMDB",
            Service::Library => "Riven",
            Service::Releases => "Trakt",
            Service::Chat => "Discord",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Local checks that gate an action before any remote call is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The selected title has no IMDb id to add by
    MissingExternalId,
    /// The selected title has no library entry yet
    NotInLibrary,
    /// A session cannot be opened over zero candidates
    NoCandidates,
    /// Nothing is selected at the current level
    NothingSelected,
    /// The event belongs to a scrape step that is not active
    NoActiveScrape,
    /// The action is not offered at the current level
    WrongLevel,
}

impl Precondition {
    pub fn display_name(&self) -> &'static str {
        match self {
            Precondition::MissingExternalId => "Title has no IMDb id",
            Precondition::NotInLibrary => "Title not in Riven",
            Precondition::NoCandidates => "No results",
            Precondition::NothingSelected => "Nothing selected",
            Precondition::NoActiveScrape => "No scrape in progress",
            Precondition::WrongLevel => "Not available here",
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Coarse error taxonomy used for branching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteUnavailable,
    NotFound,
    MissingPrecondition,
    Unauthorized,
    Malformed,
    Busy,
    Expired,
}

/// Crate-wide error type
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BotError {
    /// Service unreachable, timed out or returned a non-2xx status
    #[error("{0} unavailable: {1}")]
    RemoteUnavailable(Service, String),

    /// Lookup returned nothing
    #[error("{0} not found")]
    NotFound(String),

    /// Local precondition failed, no remote call was made
    #[error("{0}")]
    MissingPrecondition(Precondition),

    /// Actor is not the session initiator
    #[error("Not your button!")]
    Unauthorized,

    /// Remote payload is missing expected fields
    #[error("Malformed response from {0}: {1}")]
    Malformed(Service, String),

    /// Another transition for the same session is in flight
    #[error("Still working on your previous selection")]
    Busy,

    /// The session timed out or never existed
    #[error("This menu has expired")]
    Expired,
}

impl BotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BotError::RemoteUnavailable(..) => ErrorKind::RemoteUnavailable,
            BotError::NotFound(_) => ErrorKind::NotFound,
            BotError::MissingPrecondition(_) => ErrorKind::MissingPrecondition,
            BotError::Unauthorized => ErrorKind::Unauthorized,
            BotError::Malformed(..) => ErrorKind::Malformed,
            BotError::Busy => ErrorKind::Busy,
            BotError::Expired => ErrorKind::Expired,
        }
    }

    /// Short text shown to the chat user
    pub fn user_message(&self) -> String {
        match self {
            BotError::RemoteUnavailable(service, reason) => {
                format!("{} request failed: {}", service, reason)
            }
            BotError::NotFound(what) => format!("{} not found.", what),
            BotError::MissingPrecondition(p) => format!("Unavailable: {}.", p),
            BotError::Unauthorized => "Not your button!".to_string(),
            BotError::Malformed(service, _) => {
                format!("{} returned an unexpected response.", service)
            }
            BotError::Busy => "Still working on your previous selection.".to_string(),
            BotError::Expired => "This menu has expired, run the command again.".to_string(),
        }
    }

    /// Multi-line detail for logs
    pub fn diagnostics(&self) -> String {
        match self {
            BotError::RemoteUnavailable(service, reason) => {
                format!("Remote Unavailable\nService: {}\nError: {}", service, reason)
            }
            BotError::NotFound(what) => format!("Not Found\nWhat: {}", what),
            BotError::MissingPrecondition(p) => format!("Missing Precondition\nCheck: {:?}", p),
            BotError::Unauthorized => "Unauthorized\nActor is not the session initiator".to_string(),
            BotError::Malformed(service, reason) => {
                format!("Malformed Response\nService: {}\nError: {}", service, reason)
            }
            BotError::Busy => "Busy\nA transition is already in flight".to_string(),
            BotError::Expired => "Expired\nSession timed out or is unknown".to_string(),
        }
    }

    /// Map a transport error, treating timeouts and connect failures alike
    pub fn from_reqwest(service: Service, err: reqwest::Error) -> Self {
        if err.is_decode() {
            BotError::Malformed(service, err.to_string())
        } else if err.is_timeout() {
            BotError::RemoteUnavailable(service, "request timed out".to_string())
        } else if let Some(status) = err.status() {
            BotError::RemoteUnavailable(service, format!("status {}", status.as_u16()))
        } else {
            BotError::RemoteUnavailable(service, err.to_string())
        }
    }
}

/// Step of the scrape sub-workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStage {
    ListStreams,
    StartSession,
    FilterFiles,
    SelectFiles,
    ParseFilenames,
    UpdateAttributes,
    CompleteSession,
}

impl ScrapeStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            ScrapeStage::ListStreams => "Fetch Streams",
            ScrapeStage::StartSession => "Start Session",
            ScrapeStage::FilterFiles => "File Filter",
            ScrapeStage::SelectFiles => "Select Files",
            ScrapeStage::ParseFilenames => "Parse",
            ScrapeStage::UpdateAttributes => "Update Attributes",
            ScrapeStage::CompleteSession => "Complete Session",
        }
    }

    /// Message reported when the stage fails closed on an empty result
    pub fn empty_message(&self) -> &'static str {
        match self {
            ScrapeStage::ListStreams => "No streams found for this item.",
            ScrapeStage::StartSession => "No files found for this stream.",
            ScrapeStage::FilterFiles => "No valid files found for this stream.",
            ScrapeStage::SelectFiles => "No file selected.",
            ScrapeStage::ParseFilenames => "Parsed file data is incomplete.",
            ScrapeStage::UpdateAttributes => "No attributes to update.",
            ScrapeStage::CompleteSession => "Nothing to complete.",
        }
    }

    /// Message reported when the stage's remote call fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            ScrapeStage::ListStreams => "Failed to fetch streams.",
            ScrapeStage::StartSession => "Start session failed.",
            ScrapeStage::FilterFiles => "Failed to filter files.",
            ScrapeStage::SelectFiles => "Failed to select files.",
            ScrapeStage::ParseFilenames => "Failed to parse file data.",
            ScrapeStage::UpdateAttributes => "Failed to update attributes.",
            ScrapeStage::CompleteSession => "Failed to complete session.",
        }
    }
}

impl fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A scrape workflow abort, tagged with the stage it stopped at
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScrapeError {
    #[error("[{}] {}", .0.display_name(), .0.empty_message())]
    Empty(ScrapeStage),

    #[error("[{0}] {1}")]
    Remote(ScrapeStage, BotError),

    /// Refused before any stage ran
    #[error("{0}")]
    Rejected(BotError),
}

impl ScrapeError {
    pub fn stage(&self) -> Option<ScrapeStage> {
        match self {
            ScrapeError::Empty(stage) | ScrapeError::Remote(stage, _) => Some(*stage),
            ScrapeError::Rejected(_) => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ScrapeError::Rejected(BotError::MissingPrecondition(Precondition::NotInLibrary)) => {
                "Scrape unavailable: Title not in Riven.".to_string()
            }
            ScrapeError::Rejected(err) => err.user_message(),
            ScrapeError::Empty(stage) => stage.empty_message().to_string(),
            ScrapeError::Remote(stage, err) => {
                format!("{} {}", stage.failure_message(), err.user_message())
            }
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(BotError::Unauthorized.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            BotError::MissingPrecondition(Precondition::NotInLibrary).kind(),
            ErrorKind::MissingPrecondition
        );
        assert_eq!(
            BotError::Malformed(Service::Library, "no session_id".into()).kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_scrape_messages_are_stage_specific() {
        let empty = ScrapeError::Empty(ScrapeStage::ListStreams);
        assert_eq!(empty.user_message(), "No streams found for this item.");
        assert_eq!(empty.stage(), Some(ScrapeStage::ListStreams));

        let remote = ScrapeError::Remote(
            ScrapeStage::CompleteSession,
            BotError::RemoteUnavailable(Service::Library, "status 500".into()),
        );
        assert!(remote.user_message().starts_with("Failed to complete session."));

        let rejected = ScrapeError::Rejected(BotError::MissingPrecondition(Precondition::NotInLibrary));
        assert_eq!(rejected.stage(), None);
        assert_eq!(rejected.user_message(), "Scrape unavailable: Title not in Riven.");
    }
}
