//! Collection modes: which portal section a run scrapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::EntityKind;

const LAW_KINDS: &[EntityKind] = &EntityKind::LAW_KINDS;
const DIRECTIVE_KINDS: &[EntityKind] = &[EntityKind::DirectiveInfo];

/// A collector's target on the portal.
///
/// Central and local laws share one record layout and differ only in where
/// listings come from and where output lands. Directives are a separate
/// document family with their own info table and no relations or links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Central,
    Local,
    Directive,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Central, Mode::Local, Mode::Directive];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Central => "central",
            Mode::Local => "local",
            Mode::Directive => "directive",
        }
    }

    /// The document-info kind this mode produces.
    pub fn info_kind(self) -> EntityKind {
        match self {
            Mode::Central | Mode::Local => EntityKind::LawInfo,
            Mode::Directive => EntityKind::DirectiveInfo,
        }
    }

    /// Every table kind this mode produces.
    pub fn kinds(self) -> &'static [EntityKind] {
        match self {
            Mode::Central | Mode::Local => LAW_KINDS,
            Mode::Directive => DIRECTIVE_KINDS,
        }
    }

    /// File name prefix for chunk batches. Local runs tag chunks by region.
    pub fn batch_prefix(self, region: Option<&str>) -> String {
        match (self, region) {
            (Mode::Local, Some(region)) => format!("{region}_"),
            _ => String::new(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "central" => Ok(Mode::Central),
            "local" => Ok(Mode::Local),
            "directive" => Ok(Mode::Directive),
            other => Err(format!(
                "unknown mode {other:?}, expected central, local or directive"
            )),
        }
    }
}
