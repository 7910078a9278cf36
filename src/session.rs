use crate::api::{
    Companion, EntityDetail, EntitySummary, EpisodeSummary, MediaKind, SeasonSummary, StatusTree,
};
use crate::errors::{BotError, BotResult, Precondition};
use crate::scrape::ScrapeWorkflowState;

pub const ITEMS_PAGE_SIZE: usize = 10;
pub const SEASONS_PAGE_SIZE: usize = 25;
pub const EPISODES_PAGE_SIZE: usize = 25;
pub const MAX_COMPANIONS: usize = 5;

/// Chat user id
pub type ActorId = u64;

/// Position in the drill-down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Items,
    Movie,
    Show,
    Episode,
}

impl Level {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Movie => Level::Movie,
            MediaKind::Show => Level::Show,
        }
    }

    /// Paginated menu shown at this level, `None` for a movie
    pub fn page_context(&self) -> Option<PageContext> {
        match self {
            Level::Items => Some(PageContext::Items),
            Level::Show => Some(PageContext::Seasons),
            Level::Episode => Some(PageContext::Episodes),
            Level::Movie => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Level::Items => "items",
            Level::Movie => "movie",
            Level::Show => "show",
            Level::Episode => "episode",
        }
    }
}

/// The three independently paginated menus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageContext {
    Items,
    Seasons,
    Episodes,
}

impl PageContext {
    pub fn page_size(&self) -> usize {
        match self {
            PageContext::Items => ITEMS_PAGE_SIZE,
            PageContext::Seasons => SEASONS_PAGE_SIZE,
            PageContext::Episodes => EPISODES_PAGE_SIZE,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PageContext::Items => "Items",
            PageContext::Seasons => "Seasons",
            PageContext::Episodes => "Episodes",
        }
    }
}

/// `max(1, ceil(count / page_size))`
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    count.div_ceil(page_size).max(1)
}

/// 1-based page cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub items: usize,
    pub seasons: usize,
    pub episodes: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            items: 1,
            seasons: 1,
            episodes: 1,
        }
    }
}

impl Pagination {
    pub fn page(&self, ctx: PageContext) -> usize {
        match ctx {
            PageContext::Items => self.items,
            PageContext::Seasons => self.seasons,
            PageContext::Episodes => self.episodes,
        }
    }

    fn slot(&mut self, ctx: PageContext) -> &mut usize {
        match ctx {
            PageContext::Items => &mut self.items,
            PageContext::Seasons => &mut self.seasons,
            PageContext::Episodes => &mut self.episodes,
        }
    }

    /// Advance one page. Returns false (and changes nothing) at the last page.
    pub fn next(&mut self, ctx: PageContext, count: usize) -> bool {
        let last = total_pages(count, ctx.page_size());
        let page = self.slot(ctx);
        if *page >= last {
            return false;
        }
        *page += 1;
        true
    }

    /// Go back one page. Returns false at page 1.
    pub fn prev(&mut self, ctx: PageContext) -> bool {
        let page = self.slot(ctx);
        if *page <= 1 {
            return false;
        }
        *page -= 1;
        true
    }

    pub fn reset(&mut self, ctx: PageContext) {
        *self.slot(ctx) = 1;
    }
}

/// One user's in-progress drill-down
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Only this user may act on the session
    pub initiator: ActorId,
    /// Heading shown on every card ("Results for 'dune'")
    pub query: String,
    pub level: Level,
    /// Search results, fixed for the session's lifetime
    pub candidates: Vec<EntitySummary>,
    pub selected_entity: Option<EntityDetail>,
    pub selected_season: Option<SeasonSummary>,
    /// Episode list of `selected_season`
    pub episodes: Vec<EpisodeSummary>,
    pub selected_episode: Option<EpisodeSummary>,
    /// Library entry id, `None` when the title is not in the library
    pub library_ref: Option<String>,
    pub library_status_cache: Option<StatusTree>,
    pub pagination: Pagination,
    /// Recommended titles offered as reaction shortcuts
    pub companions: Vec<Companion>,
    /// Active scrape workflow, if any
    pub scrape: Option<ScrapeWorkflowState>,
}

impl Session {
    pub fn create(candidates: Vec<EntitySummary>, initiator: ActorId, query: &str) -> BotResult<Self> {
        if candidates.is_empty() {
            return Err(BotError::MissingPrecondition(Precondition::NoCandidates));
        }
        Ok(Self {
            initiator,
            query: query.to_string(),
            level: Level::Items,
            candidates,
            selected_entity: None,
            selected_season: None,
            episodes: Vec::new(),
            selected_episode: None,
            library_ref: None,
            library_status_cache: None,
            pagination: Pagination::default(),
            companions: Vec::new(),
            scrape: None,
        })
    }

    pub fn authorize(&self, actor: ActorId) -> bool {
        actor == self.initiator
    }

    pub fn kind(&self) -> Option<MediaKind> {
        self.selected_entity.as_ref().map(|e| e.kind)
    }

    pub fn in_library(&self) -> bool {
        self.library_ref.is_some()
    }

    pub fn invalidate_status(&mut self) {
        self.library_status_cache = None;
    }

    pub fn companion_ids(&self) -> Vec<i64> {
        self.companions.iter().map(|c| c.catalog_id).collect()
    }

    /// Number of entries in a paginated context
    pub fn context_len(&self, ctx: PageContext) -> usize {
        match ctx {
            PageContext::Items => self.candidates.len(),
            PageContext::Seasons => self
                .selected_entity
                .as_ref()
                .map(|e| e.seasons.len())
                .unwrap_or(0),
            PageContext::Episodes => self.episodes.len(),
        }
    }

    /// Install a freshly resolved entity and drop everything derived from the old one
    pub fn enter_entity(
        &mut self,
        detail: EntityDetail,
        library_ref: Option<String>,
        companions: Vec<Companion>,
    ) {
        self.level = Level::for_kind(detail.kind);
        self.selected_entity = Some(detail);
        self.selected_season = None;
        self.selected_episode = None;
        self.episodes.clear();
        self.pagination.reset(PageContext::Seasons);
        self.pagination.reset(PageContext::Episodes);
        self.library_ref = library_ref;
        self.invalidate_status();
        self.set_companions(companions);
        self.scrape = None;
    }

    pub fn set_companions(&mut self, mut companions: Vec<Companion>) {
        companions.truncate(MAX_COMPANIONS);
        self.companions = companions;
    }

    pub fn enter_season(&mut self, season: SeasonSummary, episodes: Vec<EpisodeSummary>) {
        self.selected_season = Some(season);
        self.episodes = episodes;
        self.selected_episode = None;
        self.level = Level::Episode;
        self.pagination.reset(PageContext::Episodes);
        self.invalidate_status();
        // A scrape started on the whole show does not carry into one season
        self.scrape = None;
    }
}
