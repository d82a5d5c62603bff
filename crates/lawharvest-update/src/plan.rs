//! Delta planning: which identifiers an incremental run must extract.

use std::collections::HashSet;

use arrow::array::Array;
use lawharvest_core::EntityKind;
use lawharvest_store::{BatchStore, cell, text_column};
use tracing::{info, warn};

/// Identifiers already present in a collector's canonical info table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existing {
    Known(HashSet<String>),
    /// The canonical table exists but could not be read.
    Unavailable,
}

impl Existing {
    pub fn contains(&self, id: &str) -> bool {
        match self {
            Existing::Known(ids) => ids.contains(id),
            Existing::Unavailable => false,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Existing::Known(ids) => ids.len(),
            Existing::Unavailable => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read the identifiers in `column` of the canonical `kind` table.
///
/// A missing table is an empty known set. An unreadable one, or one without
/// the column, is `Unavailable`; either way every visible id counts as new.
pub fn load_existing(store: &BatchStore, kind: EntityKind, column: &str) -> Existing {
    let table = match store.read_canonical(kind) {
        Ok(Some(table)) => table,
        Ok(None) => {
            info!(kind = %kind, "no canonical table yet, every visible document is new");
            return Existing::Known(HashSet::new());
        }
        Err(e) => {
            warn!(kind = %kind, error = %e, "canonical table unreadable, every visible document is new");
            return Existing::Unavailable;
        }
    };
    let Some(values) = text_column(&table, column) else {
        warn!(kind = %kind, column, "canonical table lacks identifier column");
        return Existing::Unavailable;
    };
    let ids: HashSet<String> = (0..values.len())
        .filter_map(|row| cell(values, row))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    info!(kind = %kind, existing = ids.len(), "loaded existing identifiers");
    Existing::Known(ids)
}

/// Identifiers to extract in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSet {
    ids: Vec<String>,
    fresh: usize,
}

impl WorkSet {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Visible identifiers not yet in the canonical table.
    pub fn fresh(&self) -> usize {
        self.fresh
    }

    /// Ledger identifiers added on top of the fresh ones.
    pub fn retried(&self) -> usize {
        self.ids.len() - self.fresh
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }
}

impl IntoIterator for WorkSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

/// `(visible - existing) ∪ failed`, without duplicates.
///
/// Fresh identifiers come first in discovery order, then ledger entries not
/// already present. Blank identifiers are dropped.
pub fn plan_work<V, F>(existing: &Existing, visible: V, failed: F) -> WorkSet
where
    V: IntoIterator,
    V::Item: AsRef<str>,
    F: IntoIterator,
    F::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for id in visible {
        let id = id.as_ref().trim();
        if !id.is_empty() && !existing.contains(id) && seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }
    let fresh = ids.len();

    for id in failed {
        let id = id.as_ref().trim();
        if !id.is_empty() && seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }

    WorkSet { ids, fresh }
}
