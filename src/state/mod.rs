//! Controller-owned application state, mutated only on the event loop.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::catalog::{CatalogDocument, CatalogEntry, LoadedCatalog, Provenance};
use crate::config::Settings;
use crate::error::StoreError;
use crate::install::{InstalledSet, Notice, NoticeLevel, Orchestrator};
use crate::navigation::{Focus, GridShape, columns_for_width, reconcile};

/// How long a notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Maximum notices queued at once; older ones are dropped first.
const MAX_NOTICES: usize = 8;

/// What the main area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogView {
    /// Initial load in flight.
    Loading,
    /// Catalog available.
    Ready(LoadedCatalog),
    /// Every tier failed; full-screen error.
    Failed(String),
}

/// A notice with its expiry time.
#[derive(Debug, Clone)]
pub struct ActiveNotice {
    /// The message.
    pub notice: Notice,
    /// When it disappears.
    pub expires_at: Instant,
}

/// What: Whole UI state.
///
/// Details:
/// - Focus is re-clamped whenever the catalog or viewport changes.
/// - The orchestrator inside owns jobs and the installed set.
#[derive(Debug)]
pub struct AppState {
    /// Effective settings.
    pub settings: Settings,
    /// Catalog or loading/error state.
    pub view: CatalogView,
    /// Current selection.
    pub focus: Focus,
    /// Grid width in terminal cells.
    pub viewport_width: u16,
    /// Install state machine.
    pub orchestrator: Orchestrator,
    /// Queued notices, oldest first.
    pub notices: VecDeque<ActiveNotice>,
    /// A forced refresh is in flight.
    pub reloading: bool,
}

impl AppState {
    /// Fresh state in `Loading` with a persisted installed set.
    #[must_use]
    pub fn new(settings: Settings, installed: InstalledSet) -> Self {
        Self {
            settings,
            view: CatalogView::Loading,
            focus: Focus::default(),
            viewport_width: 80,
            orchestrator: Orchestrator::with_installed(installed),
            notices: VecDeque::new(),
            reloading: false,
        }
    }

    /// Loaded document, if any.
    #[must_use]
    pub const fn document(&self) -> Option<&CatalogDocument> {
        match &self.view {
            CatalogView::Ready(loaded) => Some(&loaded.document),
            CatalogView::Loading | CatalogView::Failed(_) => None,
        }
    }

    /// Grid shape for the current catalog and viewport.
    #[must_use]
    pub fn grid_shape(&self) -> GridShape {
        let (len, has_banner) = self
            .document()
            .map_or((0, false), |d| (d.entries.len(), d.has_banner()));
        GridShape::new(
            columns_for_width(self.viewport_width, self.settings.card_width),
            len,
            has_banner,
        )
    }

    /// Entry under the focus.
    #[must_use]
    pub fn focused_entry(&self) -> Option<&CatalogEntry> {
        let i = self.focus.entry()?;
        self.document()?.entries.get(i)
    }

    /// What: Record a new viewport width and re-clamp focus.
    pub fn set_viewport_width(&mut self, width: u16) {
        self.viewport_width = width;
        self.focus = reconcile(self.focus, self.grid_shape());
    }

    /// What: Apply a catalog load result.
    ///
    /// Details:
    /// - Success replaces the document wholesale.
    /// - A failed reload keeps an already displayed catalog and shows an error notice instead
    ///   of the full-screen error.
    pub fn apply_catalog(&mut self, result: Result<LoadedCatalog, StoreError>, now: Instant) {
        self.reloading = false;
        match result {
            Ok(loaded) => {
                if loaded.provenance == Provenance::StaleCache
                    && matches!(self.view, CatalogView::Ready(_))
                {
                    self.push_notice(
                        Notice::new(NoticeLevel::Info, "", "Catalog refresh failed; served from cache"),
                        now,
                    );
                }
                self.view = CatalogView::Ready(loaded);
            }
            Err(e) => {
                if matches!(self.view, CatalogView::Ready(_)) {
                    self.push_notice(Notice::new(NoticeLevel::Error, "", e.to_string()), now);
                } else {
                    self.view = CatalogView::Failed(e.to_string());
                }
            }
        }
        self.focus = reconcile(self.focus, self.grid_shape());
    }

    /// Queue `notice` to expire [`NOTICE_TTL`] after `now`.
    pub fn push_notice(&mut self, notice: Notice, now: Instant) {
        if self.notices.len() >= MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(ActiveNotice {
            notice,
            expires_at: now + NOTICE_TTL,
        });
    }

    /// Drop expired notices. Returns `true` when anything was removed.
    pub fn expire_notices(&mut self, now: Instant) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.expires_at > now);
        before != self.notices.len()
    }

    /// Newest notice still on screen.
    #[must_use]
    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.back().map(|n| &n.notice)
    }
}
