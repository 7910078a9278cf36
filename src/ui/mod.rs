//! Chat-surface rendering.
//!
//! [`render`] turns a session into a transport-neutral [`View`]; the
//! `discord` module maps views, cards and prompts onto serenity builders.

pub mod card;
pub mod discord;
pub mod response;

use crate::handlers::events::{ButtonAction, MenuKind};
use crate::menu::{self, MenuOptions};
use crate::session::{Level, PageContext, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonSpec {
    pub action: ButtonAction,
    pub enabled: bool,
}

impl ButtonSpec {
    pub fn style(&self) -> ButtonStyle {
        match self.action {
            ButtonAction::Add | ButtonAction::Retry | ButtonAction::ConfirmScrape => {
                ButtonStyle::Success
            }
            ButtonAction::Remove | ButtonAction::CancelScrape => ButtonStyle::Danger,
            ButtonAction::Reset | ButtonAction::Scrape => ButtonStyle::Primary,
            _ => ButtonStyle::Secondary,
        }
    }
}

/// Menu for the current page
#[derive(Debug, Clone, PartialEq)]
pub struct MenuSpec {
    pub kind: MenuKind,
    pub options: MenuOptions,
}

/// Components of the main message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct View {
    pub menu: Option<MenuSpec>,
    pub buttons: Vec<ButtonSpec>,
}

impl View {
    pub fn button(&self, action: ButtonAction) -> Option<&ButtonSpec> {
        self.buttons.iter().find(|b| b.action == action)
    }
}

fn menu_for(session: &Session, ctx: PageContext) -> Option<MenuSpec> {
    let page = session.pagination.page(ctx);
    let (kind, options) = match ctx {
        PageContext::Items => (
            MenuKind::Items,
            menu::build(&session.candidates, page, ctx.page_size(), ctx),
        ),
        PageContext::Seasons => (
            MenuKind::Seasons,
            menu::build(
                session.selected_entity.as_ref().map(|e| e.seasons.as_slice()).unwrap_or(&[]),
                page,
                ctx.page_size(),
                ctx,
            ),
        ),
        PageContext::Episodes => (
            MenuKind::Episodes,
            menu::build(&session.episodes, page, ctx.page_size(), ctx),
        ),
    };
    // A select menu needs at least one option
    (!options.options.is_empty()).then_some(MenuSpec { kind, options })
}

fn action_buttons(session: &Session) -> Vec<ButtonSpec> {
    let in_library = session.in_library();
    let order: &[ButtonAction] = match session.level {
        Level::Items => &[],
        Level::Movie | Level::Show => &[
            ButtonAction::Add,
            ButtonAction::Remove,
            ButtonAction::Retry,
            ButtonAction::Reset,
            ButtonAction::Refresh,
            ButtonAction::Scrape,
            ButtonAction::Magnets,
        ],
        Level::Episode => &[ButtonAction::Retry, ButtonAction::Reset, ButtonAction::Refresh],
    };
    order
        .iter()
        .map(|&action| ButtonSpec {
            action,
            enabled: match action {
                ButtonAction::Add => !in_library,
                ButtonAction::Refresh => true,
                _ => in_library,
            },
        })
        .collect()
}

/// Components for the session's current level and page
pub fn render(session: &Session) -> View {
    let mut view = View::default();
    if let Some(ctx) = session.level.page_context() {
        view.menu = menu_for(session, ctx);
        if let Some(menu) = &view.menu {
            if menu.options.total_pages > 1 {
                view.buttons.push(ButtonSpec {
                    action: ButtonAction::Prev,
                    enabled: menu.options.page > 1,
                });
                view.buttons.push(ButtonSpec {
                    action: ButtonAction::Next,
                    enabled: menu.options.page < menu.options.total_pages,
                });
            }
        }
    }
    view.buttons.extend(action_buttons(session));
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EntityDetail, EntitySummary, MediaKind};

    fn session(n: usize) -> Session {
        let candidates = (0..n)
            .map(|i| EntitySummary {
                name: format!("T{}", i),
                year: None,
                rating: None,
                catalog_id: i as i64,
                kind: MediaKind::Movie,
            })
            .collect();
        Session::create(candidates, 1, "q").unwrap()
    }

    fn movie() -> EntityDetail {
        EntityDetail {
            name: "Alien".into(),
            year: Some("1979".into()),
            rating: Some(8.5),
            vote_count: 10,
            external_id: Some("tt0078748".into()),
            catalog_id: 348,
            poster_url: None,
            description: "In space".into(),
            kind: MediaKind::Movie,
            seasons: Vec::new(),
        }
    }

    #[test]
    fn test_items_view_has_nav_only_when_paged() {
        let view = render(&session(5));
        assert!(view.menu.is_some());
        assert!(view.buttons.is_empty());

        let view = render(&session(23));
        assert_eq!(view.button(ButtonAction::Prev).map(|b| b.enabled), Some(false));
        assert_eq!(view.button(ButtonAction::Next).map(|b| b.enabled), Some(true));
    }

    #[test]
    fn test_movie_buttons_follow_library_presence() {
        let mut s = session(1);
        s.enter_entity(movie(), None, Vec::new());
        let view = render(&s);
        assert!(view.menu.is_none());
        assert!(view.button(ButtonAction::Add).unwrap().enabled);
        assert!(!view.button(ButtonAction::Scrape).unwrap().enabled);
        assert!(view.button(ButtonAction::Refresh).unwrap().enabled);

        s.library_ref = Some("42".into());
        let view = render(&s);
        assert!(!view.button(ButtonAction::Add).unwrap().enabled);
        assert!(view.button(ButtonAction::Magnets).unwrap().enabled);
    }
}
