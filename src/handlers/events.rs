use crate::actions::Action;
use crate::store::SessionKey;

/// A selection made in one of the menus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Item(usize),
    Season(usize),
    Episode(usize),
    /// Stream infohash
    Stream(String),
    File(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Prev,
    Next,
    Add,
    Remove,
    Retry,
    Reset,
    Refresh,
    Scrape,
    Magnets,
    ConfirmScrape,
    CancelScrape,
}

impl ButtonAction {
    pub const ALL: [ButtonAction; 11] = [
        ButtonAction::Prev,
        ButtonAction::Next,
        ButtonAction::Add,
        ButtonAction::Remove,
        ButtonAction::Retry,
        ButtonAction::Reset,
        ButtonAction::Refresh,
        ButtonAction::Scrape,
        ButtonAction::Magnets,
        ButtonAction::ConfirmScrape,
        ButtonAction::CancelScrape,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ButtonAction::Prev => "prev",
            ButtonAction::Next => "next",
            ButtonAction::Add => "add",
            ButtonAction::Remove => "remove",
            ButtonAction::Retry => "retry",
            ButtonAction::Reset => "reset",
            ButtonAction::Refresh => "refresh",
            ButtonAction::Scrape => "scrape",
            ButtonAction::Magnets => "magnets",
            ButtonAction::ConfirmScrape => "confirm",
            ButtonAction::CancelScrape => "cancel",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ButtonAction::Prev => "Previous",
            ButtonAction::Next => "Next",
            ButtonAction::Add => "Add",
            ButtonAction::Remove => "Remove",
            ButtonAction::Retry => "Retry",
            ButtonAction::Reset => "Reset",
            ButtonAction::Refresh => "Refresh",
            ButtonAction::Scrape => "Scrape",
            ButtonAction::Magnets => "Magnets",
            ButtonAction::ConfirmScrape => "Confirm File Selection",
            ButtonAction::CancelScrape => "Cancel",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.tag() == tag)
    }

    /// Library action behind the button, if it is one
    pub fn action(&self) -> Option<Action> {
        match self {
            ButtonAction::Add => Some(Action::Add),
            ButtonAction::Remove => Some(Action::Remove),
            ButtonAction::Retry => Some(Action::Retry),
            ButtonAction::Reset => Some(Action::Reset),
            ButtonAction::Refresh => Some(Action::Refresh),
            ButtonAction::Magnets => Some(Action::Magnets),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Menu(MenuAction),
    Button(ButtonAction),
    /// Reaction on recommended title 0..5
    Companion(usize),
}

impl Event {
    pub fn describe(&self) -> String {
        match self {
            Event::Menu(m) => format!("{:?}", m),
            Event::Button(b) => b.tag().to_string(),
            Event::Companion(i) => format!("companion {}", i),
        }
    }
}

/// Which menu a select component belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Items,
    Seasons,
    Episodes,
    Streams,
    Files,
}

impl MenuKind {
    const ALL: [MenuKind; 5] = [
        MenuKind::Items,
        MenuKind::Seasons,
        MenuKind::Episodes,
        MenuKind::Streams,
        MenuKind::Files,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            MenuKind::Items => "items",
            MenuKind::Seasons => "seasons",
            MenuKind::Episodes => "episodes",
            MenuKind::Streams => "streams",
            MenuKind::Files => "files",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.tag() == tag)
    }

    fn action(&self, value: &str) -> Option<MenuAction> {
        let index = || value.parse::<usize>().ok();
        Some(match self {
            MenuKind::Items => MenuAction::Item(index()?),
            MenuKind::Seasons => MenuAction::Season(index()?),
            MenuKind::Episodes => MenuAction::Episode(index()?),
            MenuKind::Streams => MenuAction::Stream(value.to_string()),
            MenuKind::Files => MenuAction::File(index()?),
        })
    }
}

/// `"{key}:{menu}"`
pub fn menu_id(key: SessionKey, kind: MenuKind) -> String {
    format!("{}:{}", key, kind.tag())
}

/// `"{key}:btn:{button}"`
pub fn button_id(key: SessionKey, button: ButtonAction) -> String {
    format!("{}:btn:{}", key, button.tag())
}

/// Decode a component interaction into its session key and event
pub fn parse_component(custom_id: &str, values: &[String]) -> Option<(SessionKey, Event)> {
    let (key, rest) = custom_id.split_once(':')?;
    let key: SessionKey = key.parse().ok()?;
    if let Some(tag) = rest.strip_prefix("btn:") {
        return Some((key, Event::Button(ButtonAction::from_tag(tag)?)));
    }
    let kind = MenuKind::from_tag(rest)?;
    let value = values.first()?;
    Some((key, Event::Menu(kind.action(value)?)))
}

pub const COMPANION_REACTIONS: [&str; 5] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣"];

pub fn companion_from_reaction(emoji: &str) -> Option<Event> {
    COMPANION_REACTIONS
        .iter()
        .position(|r| *r == emoji)
        .map(Event::Companion)
}
