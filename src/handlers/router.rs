use std::sync::Arc;
use tracing::{info, warn};

use super::events::{ButtonAction, Event, MenuAction};
use crate::actions::{self, Action};
use crate::api::Services;
use crate::drilldown::{self, Direction};
use crate::errors::{BotError, BotResult, ScrapeError, ScrapeStage};
use crate::scrape::{self, ScrapePrompt};
use crate::session::{ActorId, Session};
use crate::store::{SessionKey, SessionStore};
use crate::ui::card::{self, MediaCard};
use crate::ui::{self, View};

/// Everything the chat layer should do after an event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Effect {
    /// Replacement components for the main message
    pub view: Option<View>,
    /// Replacement embed for the main message
    pub card: Option<MediaCard>,
    /// Ephemeral text for the actor
    pub notice: Option<String>,
    /// Next scrape prompt, sent as an ephemeral follow-up
    pub followup: Option<ScrapePrompt>,
    /// Number of companion reactions the main message should carry
    pub reactions: Option<usize>,
    /// Scrape stage that aborted, if any
    pub failed_stage: Option<ScrapeStage>,
}

impl Effect {
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            notice: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        *self == Effect::default()
    }

    fn scrape_failure(err: ScrapeError) -> Self {
        Self {
            notice: Some(err.user_message()),
            failed_stage: err.stage(),
            ..Default::default()
        }
    }
}

/// Text shown to the actor when an event fails
pub fn failure_notice(event: &Event, err: &BotError) -> String {
    match (event, err) {
        (_, BotError::Unauthorized | BotError::Busy | BotError::Expired) => err.user_message(),
        (Event::Button(button), _) => format!("{} failed: {}", button.label(), err.user_message()),
        (Event::Menu(MenuAction::Item(_)) | Event::Companion(_), _) => {
            format!("Failed to fetch item details. {}", err.user_message())
        }
        _ => err.user_message(),
    }
}

/// Single entry point from chat events into the session core
#[derive(Clone)]
pub struct Router {
    store: Arc<SessionStore>,
    services: Services,
}

impl Router {
    pub fn new(store: Arc<SessionStore>, services: Services) -> Self {
        Self { store, services }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Register a new session under the id of the message hosting it
    pub fn open(&self, key: SessionKey, session: Session) -> View {
        let view = ui::render(&session);
        info!(session = key, initiator = session.initiator, "Opened session for '{}'", session.query);
        self.store.insert(key, session);
        view
    }

    /// Apply one event. Expired, busy and unauthorized events never touch the session.
    pub async fn handle(&self, key: SessionKey, actor: ActorId, event: Event) -> BotResult<Effect> {
        let mut session = self.store.checkout(key).map_err(|e| {
            info!(session = key, actor, event = %event.describe(), "Rejected: {}", e);
            e
        })?;
        if !session.authorize(actor) {
            warn!(session = key, actor, event = %event.describe(), "Ignoring event from non-initiator");
            return Err(BotError::Unauthorized);
        }
        info!(session = key, actor, event = %event.describe(), level = session.level.display_name(), "Handling event");

        let result = self.dispatch(&mut session, event).await;
        self.store.touch(key);
        result
    }

    async fn dispatch(&self, session: &mut Session, event: Event) -> BotResult<Effect> {
        let services = &self.services;
        match event {
            Event::Menu(MenuAction::Item(index)) => {
                drilldown::select_item(session, services, index).await?;
                Ok(self.full_render(session).await)
            }
            Event::Companion(index) => {
                drilldown::select_companion(session, services, index).await?;
                Ok(self.full_render(session).await)
            }
            Event::Menu(MenuAction::Season(index)) => {
                drilldown::select_season(session, services, index).await?;
                Ok(self.main_render(session).await)
            }
            Event::Menu(MenuAction::Episode(index)) => {
                drilldown::select_episode(session, index)?;
                Ok(self.main_render(session).await)
            }
            Event::Button(ButtonAction::Prev) => Ok(self.page(session, Direction::Prev)),
            Event::Button(ButtonAction::Next) => Ok(self.page(session, Direction::Next)),
            Event::Button(ButtonAction::Scrape) => Ok(match scrape::begin(session, services).await {
                Ok(prompt) => Effect {
                    followup: Some(prompt),
                    ..Default::default()
                },
                Err(e) => Effect::scrape_failure(e),
            }),
            Event::Menu(MenuAction::Stream(stream_id)) => {
                Ok(match scrape::choose_stream(session, services, &stream_id).await {
                    Ok(prompt) => Effect {
                        followup: Some(prompt),
                        ..Default::default()
                    },
                    Err(e) => Effect::scrape_failure(e),
                })
            }
            Event::Menu(MenuAction::File(index)) => {
                let outcome = scrape::choose_file(session, services, index).await;
                Ok(self.scrape_outcome(session, outcome).await)
            }
            Event::Button(ButtonAction::ConfirmScrape) => {
                let outcome = scrape::confirm(session, services).await;
                Ok(self.scrape_outcome(session, outcome).await)
            }
            Event::Button(ButtonAction::CancelScrape) => Ok(match scrape::cancel(session) {
                Ok(text) => Effect::notice(text),
                Err(e) => Effect::scrape_failure(e),
            }),
            Event::Button(button) => {
                let action = button
                    .action()
                    .ok_or(BotError::MissingPrecondition(crate::errors::Precondition::WrongLevel))?;
                let text = actions::dispatch(session, services, action).await?;
                Ok(match action {
                    Action::Magnets => Effect::notice(text),
                    Action::Refresh => {
                        let mut effect = self.full_render(session).await;
                        effect.notice = Some(text);
                        effect
                    }
                    _ => {
                        let mut effect = self.main_render(session).await;
                        effect.notice = Some(text);
                        effect
                    }
                })
            }
        }
    }

    fn page(&self, session: &mut Session, direction: Direction) -> Effect {
        if drilldown::navigate(session, direction) {
            Effect {
                view: Some(ui::render(session)),
                ..Default::default()
            }
        } else {
            Effect::default()
        }
    }

    /// View plus card with a freshly resolved status
    async fn main_render(&self, session: &mut Session) -> Effect {
        let status = drilldown::library_status(session, &self.services).await;
        Effect {
            view: Some(ui::render(session)),
            card: Some(card::session_card(session, &status)),
            ..Default::default()
        }
    }

    /// Main render plus companion reactions
    async fn full_render(&self, session: &mut Session) -> Effect {
        let mut effect = self.main_render(session).await;
        effect.reactions = Some(session.companions.len());
        effect
    }

    async fn scrape_outcome(&self, session: &mut Session, outcome: Result<String, ScrapeError>) -> Effect {
        match outcome {
            Ok(text) => {
                let mut effect = self.main_render(session).await;
                effect.notice = Some(text);
                effect
            }
            Err(e) => Effect::scrape_failure(e),
        }
    }
}
