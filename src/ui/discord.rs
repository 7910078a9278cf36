use serenity::builder::{
    CreateActionRow, CreateAttachment, CreateButton, CreateEmbed, CreateSelectMenu,
    CreateSelectMenuKind, CreateSelectMenuOption,
};
use serenity::model::application::ButtonStyle as DiscordButtonStyle;

use super::card::MediaCard;
use super::response::Reply;
use super::{ButtonSpec, ButtonStyle, View};
use crate::handlers::events::{button_id, menu_id, ButtonAction, MenuKind};
use crate::menu::MenuOption;
use crate::scrape::{ScrapePrompt, FILE_LISTING_NAME};
use crate::store::SessionKey;

const BUTTONS_PER_ROW: usize = 5;

fn style(style: ButtonStyle) -> DiscordButtonStyle {
    match style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    }
}

fn button(key: SessionKey, spec: &ButtonSpec) -> CreateButton {
    CreateButton::new(button_id(key, spec.action))
        .label(spec.action.label())
        .style(style(spec.style()))
        .disabled(!spec.enabled)
}

fn select_menu(
    key: SessionKey,
    kind: MenuKind,
    placeholder: &str,
    options: &[MenuOption],
) -> CreateSelectMenu {
    let options = options
        .iter()
        .map(|o| {
            let option = CreateSelectMenuOption::new(o.label.clone(), o.value.clone());
            match &o.description {
                Some(d) => option.description(d.clone()),
                None => option,
            }
        })
        .collect();
    CreateSelectMenu::new(menu_id(key, kind), CreateSelectMenuKind::String { options })
        .placeholder(placeholder.to_string())
}

/// Select menu on its own row, then buttons five to a row
pub fn components(key: SessionKey, view: &View) -> Vec<CreateActionRow> {
    let mut rows = Vec::new();
    if let Some(menu) = &view.menu {
        rows.push(CreateActionRow::SelectMenu(select_menu(
            key,
            menu.kind,
            &menu.options.placeholder,
            &menu.options.options,
        )));
    }
    for chunk in view.buttons.chunks(BUTTONS_PER_ROW) {
        rows.push(CreateActionRow::Buttons(
            chunk.iter().map(|spec| button(key, spec)).collect(),
        ));
    }
    rows
}

pub fn embed(card: &MediaCard) -> CreateEmbed {
    let embed = CreateEmbed::new().title(card.title.clone()).description(card.body.clone());
    match &card.poster_url {
        Some(url) => embed.thumbnail(url.clone()).image(url.clone()),
        None => embed,
    }
}

/// Content, components and optional attachment of a scrape follow-up
pub struct PromptMessage {
    pub content: String,
    pub rows: Vec<CreateActionRow>,
    pub attachment: Option<CreateAttachment>,
}

pub fn scrape_prompt(key: SessionKey, prompt: &ScrapePrompt) -> PromptMessage {
    match prompt {
        ScrapePrompt::Streams(options) => PromptMessage {
            content: "Step 2: Select a stream:".to_string(),
            rows: vec![CreateActionRow::SelectMenu(select_menu(
                key,
                MenuKind::Streams,
                "Select a stream",
                options,
            ))],
            attachment: None,
        },
        ScrapePrompt::Files { options, overflow } => PromptMessage {
            content: match overflow {
                Some(_) => "Too many file options. See attached file for the full list. Only the first 25 options will be shown.".to_string(),
                None => "Step 3: Select a file:".to_string(),
            },
            rows: vec![CreateActionRow::SelectMenu(select_menu(
                key,
                MenuKind::Files,
                "Select a file",
                options,
            ))],
            attachment: overflow
                .as_ref()
                .map(|text| CreateAttachment::bytes(text.as_bytes().to_vec(), FILE_LISTING_NAME)),
        },
        ScrapePrompt::Confirm { listing } => PromptMessage {
            content: "Attached is the full list of files. Please review and click Confirm to proceed."
                .to_string(),
            rows: vec![CreateActionRow::Buttons(vec![
                button(
                    key,
                    &ButtonSpec {
                        action: ButtonAction::ConfirmScrape,
                        enabled: true,
                    },
                ),
                button(
                    key,
                    &ButtonSpec {
                        action: ButtonAction::CancelScrape,
                        enabled: true,
                    },
                ),
            ])],
            attachment: Some(CreateAttachment::bytes(
                listing.as_bytes().to_vec(),
                FILE_LISTING_NAME,
            )),
        },
    }
}

/// Content and optional file for a formatted reply
pub fn reply_parts(reply: Reply) -> (String, Option<CreateAttachment>) {
    match reply {
        Reply::Text(text) => (text, None),
        Reply::Attachment {
            note,
            filename,
            content,
        } => (note, Some(CreateAttachment::bytes(content.into_bytes(), filename))),
    }
}
