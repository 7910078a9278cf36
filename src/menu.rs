//! Select-menu option building.
//!
//! Labels are capped at the chat surface's 100-character ceiling. When a label
//! overflows, only the free-text part (title, season or episode name) is
//! shortened so numbers, years and ratings stay readable.

use crate::api::{rating_label, year_label, EntitySummary, EpisodeSummary, SeasonSummary};
use crate::session::{total_pages, PageContext};

pub const LABEL_LIMIT: usize = 100;
pub const DESCRIPTION_LIMIT: usize = 100;
pub const MAX_OPTIONS: usize = 25;
pub const PLACEHOLDER_LABEL: &str = "Invalid Label";
const ELLIPSIS: char = '…';

/// Something that can be listed in a select menu
pub trait MenuEntry {
    /// Fixed text before the free text ("Season 2 - ")
    fn prefix(&self) -> String {
        String::new()
    }

    /// Shrinkable part of the label
    fn free_text(&self) -> &str;

    /// Fixed text after the free text (" (1999) - Rating: 8.7/10")
    fn suffix(&self) -> String {
        String::new()
    }

    fn description(&self) -> Option<String> {
        None
    }
}

impl MenuEntry for EntitySummary {
    fn free_text(&self) -> &str {
        &self.name
    }

    fn suffix(&self) -> String {
        format!(
            " ({}) - Rating: {}/10",
            year_label(self.year.as_deref()),
            rating_label(self.rating)
        )
    }

    fn description(&self) -> Option<String> {
        Some(format!("TMDB: {}", self.catalog_id))
    }
}

impl MenuEntry for SeasonSummary {
    fn prefix(&self) -> String {
        format!("Season {} - ", self.number)
    }

    fn free_text(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<String> {
        Some(format!("Episodes: {}", self.episode_count))
    }
}

impl MenuEntry for EpisodeSummary {
    fn prefix(&self) -> String {
        format!("Episode {} - ", self.number)
    }

    fn free_text(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<String> {
        Some(self.overview.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuOption {
    pub label: String,
    /// Global index (or stream id) mapping back to the source entity
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuOptions {
    pub placeholder: String,
    pub options: Vec<MenuOption>,
    pub page: usize,
    pub total_pages: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Hard cut to `limit` characters
pub fn clip(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Fit `prefix + free + suffix` into `limit` characters, shortening `free` first.
/// A label that ends up blank becomes the placeholder.
pub fn fit_label(prefix: &str, free: &str, suffix: &str, limit: usize) -> String {
    let fixed = char_len(prefix) + char_len(suffix);
    let full_len = fixed + char_len(free);

    let label = if full_len <= limit {
        format!("{}{}{}", prefix, free, suffix)
    } else if fixed < limit {
        let budget = limit - fixed;
        let mut shortened: String = free.chars().take(budget.saturating_sub(1)).collect();
        shortened.push(ELLIPSIS);
        format!("{}{}{}", prefix, shortened, suffix)
    } else {
        clip(&format!("{}{}{}", prefix, free, suffix), limit)
    };

    if label.trim().is_empty() {
        PLACEHOLDER_LABEL.to_string()
    } else {
        label
    }
}

/// Label of a single entry, within the ceiling
pub fn entry_label<E: MenuEntry>(entry: &E) -> String {
    fit_label(&entry.prefix(), entry.free_text(), &entry.suffix(), LABEL_LIMIT)
}

/// Options for one page of `entities`. Out-of-range pages are clamped.
pub fn build<E: MenuEntry>(entities: &[E], page: usize, page_size: usize, kind: PageContext) -> MenuOptions {
    let page_size = page_size.clamp(1, MAX_OPTIONS);
    let total = total_pages(entities.len(), page_size);
    let page = page.clamp(1, total);
    let start = (page - 1) * page_size;

    let options = entities
        .iter()
        .enumerate()
        .skip(start)
        .take(page_size)
        .map(|(index, entity)| MenuOption {
            label: entry_label(entity),
            value: index.to_string(),
            description: entity
                .description()
                .filter(|d| !d.trim().is_empty())
                .map(|d| clip(&d, DESCRIPTION_LIMIT)),
        })
        .collect();

    MenuOptions {
        placeholder: format!("Select {} (Page {}/{})", kind.display_name(), page, total),
        options,
        page,
        total_pages: total,
    }
}
