//! Incremental update: extract what is new or previously failed, persist it
//! as a timestamped batch, and rebuild the canonical tables.

use std::path::PathBuf;

use arrow::record_batch::RecordBatch;
use chrono::Local;
use lawharvest_core::{
    DirectiveInfo, DownloadLink, EntityKind, LawInfo, Relation, TableRecord, to_record_batch,
};
use lawharvest_merge::{MergeEngine, MergeOutcome};
use lawharvest_store::{BatchStore, HarvestConfig, update_stem};
use tracing::{Instrument, Span, error, info, info_span, warn};

use crate::UpdateError;
use crate::collector::{Collector, Extraction, ModeProfile};
use crate::ledger::FailureLedger;
use crate::plan::{load_existing, plan_work};
use crate::retry::{RetryPolicy, attempt_with_retry};

/// Outcome of one update run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub targeted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Batches written this run.
    pub written: Vec<PathBuf>,
    /// Ledger size after the flush.
    pub ledger_size: usize,
}

impl UpdateReport {
    /// Succeeded as a percentage of targeted; a run with no work is 100%.
    pub fn success_rate(&self) -> f64 {
        if self.targeted == 0 {
            100.0
        } else {
            self.succeeded as f64 / self.targeted as f64 * 100.0
        }
    }
}

/// Rows gathered over one run, per table.
#[derive(Default)]
struct Collected {
    laws: Vec<LawInfo>,
    directives: Vec<DirectiveInfo>,
    relations: Vec<Relation>,
    links: Vec<DownloadLink>,
}

impl Collected {
    fn absorb(&mut self, extraction: Extraction) {
        self.laws.extend(extraction.law);
        self.directives.extend(extraction.directive);
        self.relations.extend(extraction.relations);
        self.links.extend(extraction.links);
    }

    fn rows(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::LawInfo => self.laws.len(),
            EntityKind::DirectiveInfo => self.directives.len(),
            EntityKind::Relation => self.relations.len(),
            EntityKind::DownloadLink => self.links.len(),
        }
    }

    fn batch(&self, kind: EntityKind) -> Result<RecordBatch, UpdateError> {
        fn build<R: TableRecord>(rows: &[R]) -> Result<RecordBatch, UpdateError> {
            Ok(to_record_batch(rows)?)
        }
        match kind {
            EntityKind::LawInfo => build(&self.laws),
            EntityKind::DirectiveInfo => build(&self.directives),
            EntityKind::Relation => build(&self.relations),
            EntityKind::DownloadLink => build(&self.links),
        }
    }
}

/// Drives one collector through an incremental run.
pub struct Updater {
    profile: ModeProfile,
    engine: MergeEngine,
    ledger: FailureLedger,
    policy: RetryPolicy,
    span: Span,
}

impl Updater {
    pub fn new(profile: ModeProfile, store: BatchStore, policy: RetryPolicy) -> Self {
        let span = info_span!("update", mode = %profile.mode, root = %store.root().display());
        let ledger = FailureLedger::open(store.ledger_path());
        Self {
            engine: MergeEngine::with_span(store, span.clone()),
            profile,
            ledger,
            policy,
            span,
        }
    }

    /// An updater for `profile.mode` laid out as `config` says.
    pub fn from_config(profile: ModeProfile, config: &HarvestConfig) -> Self {
        let store = config.layout().store(profile.mode);
        let profile = profile.with_update_pages(config.update_pages);
        Self::new(profile, store, RetryPolicy::from(&config.retry))
    }

    pub fn profile(&self) -> &ModeProfile {
        &self.profile
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    /// Run one incremental update against `collector`.
    pub async fn run<C>(&mut self, collector: &C) -> Result<UpdateReport, UpdateError>
    where
        C: Collector + ?Sized,
    {
        let span = self.span.clone();
        self.run_inner(collector).instrument(span).await
    }

    async fn run_inner<C>(&mut self, collector: &C) -> Result<UpdateReport, UpdateError>
    where
        C: Collector + ?Sized,
    {
        let profile = self.profile.clone();
        let store = self.engine.store().clone();

        let existing = load_existing(&store, profile.info_kind(), profile.identifier_column);
        let visible = match collector.visible_identifiers(profile.update_pages).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "listing failed, only retrying the ledger");
                Vec::new()
            }
        };
        let failed = self.ledger.load();
        let work = plan_work(&existing, &visible, &failed);
        info!(
            label = profile.label,
            visible = visible.len(),
            existing = existing.len(),
            fresh = work.fresh(),
            retried = work.retried(),
            "planned update"
        );

        let mut report = UpdateReport {
            targeted: work.len(),
            ..UpdateReport::default()
        };
        if work.is_empty() {
            info!(label = profile.label, "nothing to update");
            report.ledger_size = failed.len();
            return Ok(report);
        }

        let mut collected = Collected::default();
        for (i, id) in work.ids().iter().enumerate() {
            info!(progress = %format!("{}/{}", i + 1, report.targeted), id = %id, "extracting");
            let id: &str = id;
            // A page that yields no rows is a failed attempt.
            let extraction = attempt_with_retry(&self.policy, id, || async move {
                let found = collector.extract(id).await;
                found.map(|extraction| extraction.filter(|e| !e.is_empty()))
            })
            .await;
            match extraction {
                Some(extraction) => {
                    collected.absorb(extraction);
                    report.succeeded += 1;
                }
                None => {
                    self.ledger.record(id);
                    report.failed += 1;
                }
            }
        }

        // Per-kind failures are logged; the ledger is flushed regardless.
        let mut first_error = None;
        let stem = update_stem(&Local::now());
        for &kind in profile.kinds() {
            if collected.rows(kind) == 0 {
                warn!(kind = %kind, "no new rows");
                continue;
            }
            match self.persist(&store, kind, &stem, &collected) {
                Ok(path) => report.written.push(path),
                Err(e) => {
                    error!(kind = %kind, error = %e, "could not persist batch");
                    first_error.get_or_insert(e);
                }
            }
        }

        report.ledger_size = self.ledger.flush()?;
        self.ledger.clear();
        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            targeted = report.targeted,
            succeeded = report.succeeded,
            failed = report.failed,
            rate = %format!("{:.1}%", report.success_rate()),
            "update finished"
        );
        Ok(report)
    }

    /// Write this run's rows for `kind` as a new batch and rebuild its canonical table.
    fn persist(
        &self,
        store: &BatchStore,
        kind: EntityKind,
        stem: &str,
        collected: &Collected,
    ) -> Result<PathBuf, UpdateError> {
        let batch = collected.batch(kind)?;
        let stem = store.unused_stem(kind, stem);
        let path = store.write_batch(kind, &stem, &batch)?;
        if let MergeOutcome::Merged { rows, .. } = self.engine.merge(kind)? {
            info!(kind = %kind, rows, "canonical table rebuilt");
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use lawharvest_core::Mode;
    use lawharvest_store::{TableFormat, cell, text_column};
    use tempfile::TempDir;

    /// Serves canned pages; ids starting with `bad` always fail and ids
    /// starting with `empty` yield a page with no rows.
    struct MockCollector {
        visible: Vec<String>,
        listing_fails: bool,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl MockCollector {
        fn new(visible: &[&str]) -> Self {
            Self {
                visible: visible.iter().map(|s| s.to_string()).collect(),
                listing_fails: false,
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn calls(&self, id: &str) -> u32 {
            self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Collector for MockCollector {
        async fn visible_identifiers(&self, _pages: usize) -> anyhow::Result<Vec<String>> {
            if self.listing_fails {
                anyhow::bail!("listing page timed out");
            }
            Ok(self.visible.clone())
        }

        async fn extract(&self, identifier: &str) -> anyhow::Result<Option<Extraction>> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(identifier.to_string())
                .or_default() += 1;
            if identifier.starts_with("bad") {
                anyhow::bail!("detail page did not load");
            }
            if identifier.starts_with("empty") {
                return Ok(Some(Extraction::default()));
            }
            let item = identifier.trim_start_matches("u");
            let mut info = LawInfo::placeholder("TW", item, identifier);
            info.code = Some(format!("{item}/2024/QH15"));
            info.title = Some(format!("Luật số {item}"));
            let relation = Relation {
                region_id: Some("TW".into()),
                item_id: Some(item.into()),
                relation_item_id: Some("1".into()),
                relation_type: Some("Văn bản căn cứ".into()),
                ..Relation::default()
            };
            let link = DownloadLink {
                region_id: Some("TW".into()),
                item_id: Some(item.into()),
                link_url: Some(format!("https://vbpl.vn/files/{item}.doc")),
                ..DownloadLink::default()
            };
            Ok(Some(
                Extraction::law(info)
                    .with_relations(vec![relation])
                    .with_links(vec![link]),
            ))
        }
    }

    fn updater(tmp: &TempDir) -> Updater {
        Updater::new(
            ModeProfile::new(Mode::Central, "central_law"),
            BatchStore::new(tmp.path(), TableFormat::Csv),
            RetryPolicy::immediate(2),
        )
    }

    fn urls(store: &BatchStore) -> Vec<String> {
        let table = store.read_canonical(EntityKind::LawInfo).unwrap().unwrap();
        let column = text_column(&table, "url").unwrap();
        (0..table.num_rows())
            .filter_map(|row| cell(column, row).map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn first_run_collects_everything() {
        let tmp = TempDir::new().unwrap();
        let mut updater = updater(&tmp);
        let collector = MockCollector::new(&["u1", "u2", "bad3"]);

        let report = updater.run(&collector).await.unwrap();
        assert_eq!((report.targeted, report.succeeded, report.failed), (3, 2, 1));
        assert_eq!(report.written.len(), 3);
        assert_eq!(report.ledger_size, 1);
        assert!((report.success_rate() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(collector.calls("bad3"), 2);

        let store = updater.engine.store().clone();
        assert_eq!(urls(&store), vec!["u1", "u2"]);
        assert_eq!(updater.ledger().load(), vec!["bad3"]);
        assert!(updater.ledger().pending().is_empty());
        let links = store.read_canonical(EntityKind::DownloadLink).unwrap().unwrap();
        assert_eq!(links.schema().field(0).name(), "id");
    }

    #[tokio::test]
    async fn second_run_only_targets_new_and_failed() {
        let tmp = TempDir::new().unwrap();
        let mut updater = updater(&tmp);
        updater.run(&MockCollector::new(&["u1", "bad2"])).await.unwrap();

        let collector = MockCollector::new(&["u1", "u3"]);
        let report = updater.run(&collector).await.unwrap();
        assert_eq!(report.targeted, 2);
        assert_eq!(collector.calls("u1"), 0);
        assert_eq!(collector.calls("u3"), 1);
        assert_eq!(collector.calls("bad2"), 2);
        assert_eq!(report.ledger_size, 1);

        let mut collected = urls(updater.engine.store());
        collected.sort();
        assert_eq!(collected, vec!["u1", "u3"]);
    }

    #[tokio::test]
    async fn listing_failure_still_retries_ledger() {
        let tmp = TempDir::new().unwrap();
        let mut updater = updater(&tmp);
        updater.run(&MockCollector::new(&["bad9"])).await.unwrap();

        let mut collector = MockCollector::new(&["u5"]);
        collector.listing_fails = true;
        let report = updater.run(&collector).await.unwrap();
        assert_eq!(report.targeted, 1);
        assert_eq!(collector.calls("bad9"), 2);
        assert_eq!(collector.calls("u5"), 0);
    }

    #[tokio::test]
    async fn empty_extraction_is_a_failure() {
        let tmp = TempDir::new().unwrap();
        let mut updater = updater(&tmp);
        let collector = MockCollector::new(&["empty1"]);

        let report = updater.run(&collector).await.unwrap();
        assert_eq!((report.succeeded, report.failed), (0, 1));
        assert_eq!(collector.calls("empty1"), 2);
        assert!(report.written.is_empty());
        assert_eq!(updater.ledger().load(), vec!["empty1"]);
    }

    #[tokio::test]
    async fn failing_kind_keeps_other_kinds_and_ledger() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("relation"), "not a directory").unwrap();
        let mut updater = updater(&tmp);

        let result = updater.run(&MockCollector::new(&["u1", "bad2"])).await;
        assert!(result.is_err());
        assert_eq!(updater.ledger().load(), vec!["bad2"]);
        assert!(updater.ledger().pending().is_empty());
        assert_eq!(urls(updater.engine.store()), vec!["u1"]);
        let links = updater.engine.store().read_canonical(EntityKind::DownloadLink).unwrap();
        assert_eq!(links.map(|t| t.num_rows()), Some(1));
    }

    #[tokio::test]
    async fn nothing_new_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut updater = updater(&tmp);
        let report = updater.run(&MockCollector::new(&[])).await.unwrap();
        assert_eq!(report, UpdateReport::default());
        assert_eq!(report.success_rate(), 100.0);
        assert!(!updater.engine.store().canonical_path(EntityKind::LawInfo).exists());
    }
}
