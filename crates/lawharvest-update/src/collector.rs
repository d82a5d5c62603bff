//! The seam between the merge pipeline and whatever scrapes the portal.
//!
//! A `Collector` lists identifiers currently visible on the portal and
//! extracts one document at a time. Browser automation, HTTP clients and
//! test doubles all plug in here; the updater only sees `Extraction`s.

use async_trait::async_trait;
use lawharvest_core::{DirectiveInfo, DownloadLink, EntityKind, LawInfo, Mode, Relation, col};

/// Pages scanned for new documents on an incremental run.
pub const UPDATE_PAGES: usize = 20;

/// Everything one detail page yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub law: Option<LawInfo>,
    pub directive: Option<DirectiveInfo>,
    pub relations: Vec<Relation>,
    pub links: Vec<DownloadLink>,
}

impl Extraction {
    pub fn law(info: LawInfo) -> Self {
        Self {
            law: Some(info),
            ..Self::default()
        }
    }

    pub fn directive(info: DirectiveInfo) -> Self {
        Self {
            directive: Some(info),
            ..Self::default()
        }
    }

    pub fn with_relations(mut self, relations: Vec<Relation>) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_links(mut self, links: Vec<DownloadLink>) -> Self {
        self.links = links;
        self
    }

    /// True when the page yielded no rows at all. The updater retries these.
    pub fn is_empty(&self) -> bool {
        self.law.is_none()
            && self.directive.is_none()
            && self.relations.is_empty()
            && self.links.is_empty()
    }
}

#[async_trait]
pub trait Collector: Send + Sync {
    /// Identifiers (detail URLs) on the first `pages` listing pages.
    async fn visible_identifiers(&self, pages: usize) -> anyhow::Result<Vec<String>>;

    /// Extract one document. `Ok(None)`, or an extraction with no rows, means
    /// the page held nothing usable and the attempt failed.
    async fn extract(&self, identifier: &str) -> anyhow::Result<Option<Extraction>>;
}

// ── ModeProfile ──

/// Per-mode settings the updater runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeProfile {
    pub mode: Mode,
    /// Output sub-directory under the harvest root.
    pub output_dir: String,
    /// Canonical info column holding the identifiers the collector lists.
    pub identifier_column: &'static str,
    pub label: &'static str,
    pub update_pages: usize,
}

impl ModeProfile {
    pub fn new(mode: Mode, output_dir: impl Into<String>) -> Self {
        let label = match mode {
            Mode::Central => "central law",
            Mode::Local => "local law",
            Mode::Directive => "directive",
        };
        Self {
            mode,
            output_dir: output_dir.into(),
            identifier_column: col::URL,
            label,
            update_pages: UPDATE_PAGES,
        }
    }

    pub fn with_update_pages(mut self, pages: usize) -> Self {
        self.update_pages = pages;
        self
    }

    pub fn info_kind(&self) -> EntityKind {
        self.mode.info_kind()
    }

    pub fn kinds(&self) -> &'static [EntityKind] {
        self.mode.kinds()
    }
}
