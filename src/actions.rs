use tracing::info;

use crate::api::{LibraryAction, MutationTarget, Services};
use crate::drilldown::{companions_for, library_query};
use crate::errors::{BotError, BotResult, Precondition};
use crate::session::{Level, Session};

/// Buttons that act on the selected title's library entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
    Retry,
    Reset,
    Refresh,
    Magnets,
}

impl Action {
    pub fn display_name(&self) -> &'static str {
        match self {
            Action::Add => "Add",
            Action::Remove => "Remove",
            Action::Retry => "Retry",
            Action::Reset => "Reset",
            Action::Refresh => "Refresh",
            Action::Magnets => "Magnets",
        }
    }

    /// Whether the action is offered at `level`
    pub fn allowed_at(&self, level: Level) -> bool {
        match self {
            Action::Add | Action::Remove | Action::Magnets => {
                matches!(level, Level::Movie | Level::Show)
            }
            Action::Retry | Action::Reset => {
                matches!(level, Level::Movie | Level::Show | Level::Episode)
            }
            Action::Refresh => true,
        }
    }

    fn library_action(&self) -> Option<LibraryAction> {
        match self {
            Action::Add => Some(LibraryAction::Add),
            Action::Remove => Some(LibraryAction::Remove),
            Action::Retry => Some(LibraryAction::Retry),
            Action::Reset => Some(LibraryAction::Reset),
            Action::Refresh | Action::Magnets => None,
        }
    }
}

fn require_ref(session: &Session) -> BotResult<String> {
    session
        .library_ref
        .clone()
        .ok_or(BotError::MissingPrecondition(Precondition::NotInLibrary))
}

/// Run `action` for the current selection and return the confirmation text.
/// Preconditions are checked before any remote call; session fields change
/// only after the remote call succeeded.
pub async fn dispatch(session: &mut Session, services: &Services, action: Action) -> BotResult<String> {
    if !action.allowed_at(session.level) {
        return Err(BotError::MissingPrecondition(Precondition::WrongLevel));
    }
    if action == Action::Refresh && session.selected_entity.is_none() {
        return Ok("Nothing selected to refresh.".to_string());
    }
    let entity = session
        .selected_entity
        .as_ref()
        .ok_or(BotError::MissingPrecondition(Precondition::NothingSelected))?;
    let name = entity.name.clone();

    match action {
        Action::Add => {
            let external_id = entity
                .external_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .ok_or(BotError::MissingPrecondition(Precondition::MissingExternalId))?;
            let outcome = services
                .library
                .mutate(LibraryAction::Add, &MutationTarget::ExternalId(external_id))
                .await?;
            session.library_ref = outcome.new_ref;
            session.invalidate_status();
            info!("Added {} as {:?}", name, session.library_ref);
            Ok(format!("Added {}", name))
        }
        Action::Remove | Action::Retry | Action::Reset => {
            let library_ref = require_ref(session)?;
            let library_action = action
                .library_action()
                .ok_or(BotError::MissingPrecondition(Precondition::WrongLevel))?;
            services
                .library
                .mutate(library_action, &MutationTarget::Ref(library_ref))
                .await?;
            session.invalidate_status();
            Ok(match action {
                Action::Remove => {
                    session.library_ref = None;
                    format!("Removed {}", name)
                }
                Action::Retry => format!("Retrying {}", name),
                _ => format!("Reset {}", name),
            })
        }
        Action::Refresh => {
            let query = library_query(entity);
            let lookup = services.library.find_by_name_or_external_id(&query).await?;
            let companions = match session.selected_entity.as_ref() {
                Some(detail) => companions_for(services, detail).await,
                None => Vec::new(),
            };
            session.library_ref = lookup.library_ref;
            session.invalidate_status();
            session.set_companions(companions);
            info!("Refreshed {}: library ref {:?}", name, session.library_ref);
            Ok(format!("Refreshed {}", name))
        }
        Action::Magnets => {
            let library_ref = require_ref(session)?;
            let uris = services.library.list_item_streams(&library_ref).await?;
            if uris.is_empty() {
                return Err(BotError::NotFound("Magnets".to_string()));
            }
            Ok(format!("Magnets for {}:\n{}", name, uris.join("\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_rules() {
        assert!(Action::Add.allowed_at(Level::Movie));
        assert!(!Action::Add.allowed_at(Level::Episode));
        assert!(!Action::Magnets.allowed_at(Level::Episode));
        assert!(Action::Retry.allowed_at(Level::Episode));
        assert!(!Action::Retry.allowed_at(Level::Items));
        assert!(Action::Refresh.allowed_at(Level::Items));
    }
}
