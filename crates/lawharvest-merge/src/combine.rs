//! Cross-collector combine: central and local canonical tables into the
//! final law tables, plus the directive table under its published name.
//!
//! A collector that never ran (or whose canonical table cannot be read)
//! contributes nothing; an output whose sources are all empty is skipped
//! and reported as missing.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::record_batch::RecordBatch;
use lawharvest_core::{EntityKind, Mode, col};
use lawharvest_store::{OutputLayout, cell, concat_text, text_column, write_table};
use tracing::{Span, info, info_span, warn};

use crate::MergeError;
use crate::dedup::dedup_keep_last;
use crate::pk::reassign_primary_key;

/// Published tables under the combined root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinedOutput {
    LawInfo,
    Relations,
    DownloadLinks,
    DirectiveInfo,
}

impl CombinedOutput {
    pub const ALL: [CombinedOutput; 4] = [
        CombinedOutput::LawInfo,
        CombinedOutput::Relations,
        CombinedOutput::DownloadLinks,
        CombinedOutput::DirectiveInfo,
    ];

    pub fn dir(self) -> &'static str {
        match self {
            CombinedOutput::LawInfo => "info",
            CombinedOutput::Relations => "relation",
            CombinedOutput::DownloadLinks => "download_link",
            CombinedOutput::DirectiveInfo => "directive",
        }
    }

    pub fn stem(self) -> &'static str {
        match self {
            CombinedOutput::LawInfo => "law_info",
            CombinedOutput::Relations => "law_relations",
            CombinedOutput::DownloadLinks => "law_file_links",
            CombinedOutput::DirectiveInfo => "directive_info",
        }
    }
}

impl fmt::Display for CombinedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dir(), self.stem())
    }
}

/// One written output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produced {
    pub output: CombinedOutput,
    pub rows: usize,
    pub path: PathBuf,
}

/// Summary of a combine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineReport {
    pub produced: Vec<Produced>,
    pub missing: Vec<CombinedOutput>,
}

impl CombineReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Law info: central then local, last row per (`regionID`, `itemID`).
pub fn combine_info(central: &RecordBatch, local: &RecordBatch) -> Result<Option<RecordBatch>, MergeError> {
    let Some(combined) = concat_sources(EntityKind::LawInfo, &[central, local])? else {
        return Ok(None);
    };
    Ok(Some(dedup_keep_last(&combined, EntityKind::LawInfo.dedup_key())?))
}

/// Relations: concatenated without dedup, then densely keyed.
pub fn combine_relations(central: &RecordBatch, local: &RecordBatch) -> Result<Option<RecordBatch>, MergeError> {
    let Some(combined) = concat_sources(EntityKind::Relation, &[central, local])? else {
        return Ok(None);
    };
    Ok(Some(reassign_primary_key(&combined, col::ID)?))
}

/// Download links: last row per (`regionID`, `itemID`, `link_url`), densely keyed.
pub fn combine_download_links(
    central: &RecordBatch,
    local: &RecordBatch,
) -> Result<Option<RecordBatch>, MergeError> {
    let Some(combined) = concat_sources(EntityKind::DownloadLink, &[central, local])? else {
        return Ok(None);
    };
    let deduped = dedup_keep_last(&combined, EntityKind::DownloadLink.dedup_key())?;
    Ok(Some(reassign_primary_key(&deduped, col::ID)?))
}

/// Concatenate non-empty sources with normalised identifiers.
///
/// Per-collector `id` columns are dropped; they are reassigned after the
/// combine. `None` when every source is empty.
fn concat_sources(kind: EntityKind, sources: &[&RecordBatch]) -> Result<Option<RecordBatch>, MergeError> {
    let present: Vec<RecordBatch> = sources
        .iter()
        .filter(|b| b.num_rows() > 0)
        .map(|b| without_column(b, col::ID))
        .collect::<Result<_, _>>()?;
    if present.is_empty() {
        return Ok(None);
    }
    let combined = concat_text(&present)?;
    Ok(Some(normalize_identifiers(&combined, kind.identifier_columns())?))
}

fn without_column(batch: &RecordBatch, name: &str) -> Result<RecordBatch, MergeError> {
    match batch.schema().index_of(name) {
        Ok(index) => {
            let mut batch = batch.clone();
            batch.remove_column(index);
            Ok(batch)
        }
        Err(_) => Ok(batch.clone()),
    }
}

/// Trim identifier cells and render integral floats (`"123.0"`) as integers,
/// so ids written by different tools compare equal.
pub fn normalize_identifiers(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch, MergeError> {
    let schema = batch.schema();
    let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();
    for name in columns {
        let (Ok(index), Some(column)) = (schema.index_of(name), text_column(batch, name)) else {
            continue;
        };
        let normalized: StringArray = (0..column.len())
            .map(|row| cell(column, row).map(normalize_identifier))
            .collect();
        arrays[index] = Arc::new(normalized);
    }
    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(int) = trimmed.strip_suffix(".0")
        && !int.is_empty()
        && int.trim_start_matches('-').chars().all(|c| c.is_ascii_digit())
    {
        return int.to_string();
    }
    trimmed.to_string()
}

/// Combines collector canonical tables into the published outputs.
pub struct Combiner {
    layout: OutputLayout,
    span: Span,
}

impl Combiner {
    pub fn new(layout: OutputLayout) -> Self {
        let span = info_span!("combine", root = %layout.combined_root().display());
        Self { layout, span }
    }

    /// Build and write every output whose sources hold any rows.
    ///
    /// Missing sources are tolerated; write failures are errors.
    pub fn run(&self) -> Result<CombineReport, MergeError> {
        let _guard = self.span.enter();
        let mut report = CombineReport::default();

        let central = |kind| self.source(Mode::Central, kind);
        let local = |kind| self.source(Mode::Local, kind);

        let info = combine_info(&central(EntityKind::LawInfo), &local(EntityKind::LawInfo))?;
        self.publish(CombinedOutput::LawInfo, info, &mut report)?;

        let relations =
            combine_relations(&central(EntityKind::Relation), &local(EntityKind::Relation))?;
        self.publish(CombinedOutput::Relations, relations, &mut report)?;

        let links = combine_download_links(
            &central(EntityKind::DownloadLink),
            &local(EntityKind::DownloadLink),
        )?;
        self.publish(CombinedOutput::DownloadLinks, links, &mut report)?;

        let directive = self.source(Mode::Directive, EntityKind::DirectiveInfo);
        let directive = (directive.num_rows() > 0).then_some(directive);
        self.publish(CombinedOutput::DirectiveInfo, directive, &mut report)?;

        let produced: Vec<String> = report
            .produced
            .iter()
            .map(|p| format!("{}={}", p.output, p.rows))
            .collect();
        let missing: Vec<String> = report.missing.iter().map(ToString::to_string).collect();
        info!(
            produced = %produced.join(", "),
            missing = %missing.join(", "),
            "combine finished"
        );
        Ok(report)
    }

    /// Canonical table of one collector, empty when absent or unreadable.
    fn source(&self, mode: Mode, kind: EntityKind) -> RecordBatch {
        let store = self.layout.store(mode);
        match store.read_canonical(kind) {
            Ok(Some(table)) => {
                info!(collector = %mode, kind = %kind, rows = table.num_rows(), "loaded source");
                table
            }
            Ok(None) => {
                warn!(
                    collector = %mode,
                    kind = %kind,
                    path = %store.canonical_path(kind).display(),
                    "source not found"
                );
                RecordBatch::new_empty(Arc::new(kind.schema()))
            }
            Err(e) => {
                warn!(collector = %mode, kind = %kind, error = %e, "source unreadable");
                RecordBatch::new_empty(Arc::new(kind.schema()))
            }
        }
    }

    fn publish(
        &self,
        output: CombinedOutput,
        table: Option<RecordBatch>,
        report: &mut CombineReport,
    ) -> Result<(), MergeError> {
        let Some(table) = table else {
            warn!(output = %output, "no source data, output skipped");
            report.missing.push(output);
            return Ok(());
        };
        let path = self.layout.combined_path(output.dir(), output.stem());
        write_table(&path, &table)?;
        info!(output = %output, rows = table.num_rows(), path = %path.display(), "wrote output");
        report.produced.push(Produced {
            output,
            rows: table.num_rows(),
            path,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::tests::{table, values};
    use lawharvest_store::{HarvestConfig, read_table};
    use tempfile::TempDir;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn empty(kind: EntityKind) -> RecordBatch {
        RecordBatch::new_empty(Arc::new(kind.schema()))
    }

    fn layout(tmp: &TempDir) -> OutputLayout {
        HarvestConfig {
            root: tmp.path().to_path_buf(),
            ..HarvestConfig::default()
        }
        .layout()
    }

    #[test]
    fn identifiers_are_normalised() {
        assert_eq!(normalize_identifier(" 123.0 "), "123");
        assert_eq!(normalize_identifier("-4.0"), "-4");
        assert_eq!(normalize_identifier("12.05"), "12.05");
        assert_eq!(normalize_identifier("TW"), "TW");
        assert_eq!(normalize_identifier(".0"), ".0");
    }

    #[test]
    fn absent_source_equals_deduplicating_the_present_one() {
        let info = table(&[
            ("regionID", vec![Some("TW"), Some("TW"), Some("HN")]),
            ("itemID", vec![Some("12.0"), Some("12"), Some("3")]),
            ("title", vec![Some("first"), Some("second"), Some("hn")]),
        ]);
        let key = EntityKind::LawInfo.dedup_key();
        let expected = dedup_keep_last(
            &normalize_identifiers(&info, EntityKind::LawInfo.identifier_columns()).unwrap(),
            key,
        )
        .unwrap();
        assert_eq!(expected.num_rows(), 2);
        let absent = empty(EntityKind::LawInfo);
        assert_eq!(combine_info(&info, &absent).unwrap().unwrap(), expected);
        assert_eq!(combine_info(&absent, &info).unwrap().unwrap(), expected);

        let links = table(&[
            ("regionID", vec![Some("TW"), Some("TW"), Some("TW")]),
            ("itemID", vec![Some("5.0"), Some("5"), Some("6")]),
            ("link_url", vec![Some("a.doc"), Some("a.doc"), Some("b.pdf")]),
        ]);
        let deduped = dedup_keep_last(
            &normalize_identifiers(&links, EntityKind::DownloadLink.identifier_columns()).unwrap(),
            EntityKind::DownloadLink.dedup_key(),
        )
        .unwrap();
        let expected = reassign_primary_key(&deduped, col::ID).unwrap();
        assert_eq!(expected.num_rows(), 2);
        let absent = empty(EntityKind::DownloadLink);
        assert_eq!(combine_download_links(&links, &absent).unwrap().unwrap(), expected);
        assert_eq!(combine_download_links(&absent, &links).unwrap().unwrap(), expected);
    }

    #[test]
    fn info_local_wins_over_central_for_same_key() {
        let central = table(&[
            ("regionID", vec![Some("TW"), Some("HN")]),
            ("itemID", vec![Some("10.0"), Some("3")]),
            ("title", vec![Some("central"), Some("central hn")]),
        ]);
        let local = table(&[
            ("regionID", vec![Some("HN")]),
            ("itemID", vec![Some(" 3")]),
            ("title", vec![Some("local hn")]),
        ]);
        let out = combine_info(&central, &local).unwrap().unwrap();
        assert_eq!(values(&out, "itemID"), vec![s("10"), s("3")]);
        assert_eq!(values(&out, "title"), vec![s("central"), s("local hn")]);
    }

    #[test]
    fn relations_are_not_deduplicated() {
        let rel = || {
            table(&[
                ("regionID", vec![Some("TW")]),
                ("itemID", vec![Some("1")]),
                ("relation_itemID", vec![Some("2")]),
                ("relation_type", vec![Some("Văn bản căn cứ")]),
            ])
        };
        let out = combine_relations(&rel(), &rel()).unwrap().unwrap();
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.schema().field(0).name(), "id");
    }

    #[test]
    fn download_links_replace_collector_ids() {
        let central = table(&[
            ("id", vec![Some("1"), Some("2")]),
            ("regionID", vec![Some("TW"), Some("TW")]),
            ("itemID", vec![Some("1"), Some("2")]),
            ("link_url", vec![Some("a.doc"), Some("b.pdf")]),
        ]);
        let local = table(&[
            ("id", vec![Some("1")]),
            ("regionID", vec![Some("TW")]),
            ("itemID", vec![Some("1")]),
            ("link_url", vec![Some("a.doc")]),
        ]);
        let out = combine_download_links(&central, &local).unwrap().unwrap();
        assert_eq!(out.num_rows(), 2);
        let names: Vec<&str> = out
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["id", "regionID", "itemID", "link_url"]);
    }

    #[test]
    fn all_empty_sources_produce_nothing() {
        let e = empty(EntityKind::Relation);
        assert!(combine_relations(&e, &e).unwrap().is_none());
    }

    #[test]
    fn run_tolerates_missing_collectors() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let central = layout.store(Mode::Central);
        central
            .write_canonical(
                EntityKind::Relation,
                &table(&[
                    ("regionID", vec![Some("TW"), Some("TW")]),
                    ("itemID", vec![Some("1"), Some("2")]),
                    ("relation_itemID", vec![Some("9"), Some("9")]),
                ]),
            )
            .unwrap();

        let report = Combiner::new(layout.clone()).run().unwrap();
        assert_eq!(report.produced.len(), 1);
        assert_eq!(report.produced[0].output, CombinedOutput::Relations);
        assert_eq!(report.produced[0].rows, 2);
        assert_eq!(
            report.missing,
            vec![
                CombinedOutput::LawInfo,
                CombinedOutput::DownloadLinks,
                CombinedOutput::DirectiveInfo
            ]
        );

        let written = read_table(&layout.combined_path("relation", "law_relations")).unwrap();
        assert_eq!(values(&written, "id"), vec![s("1"), s("2")]);
    }

    #[test]
    fn directive_is_copied_under_published_name() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        layout
            .store(Mode::Directive)
            .write_canonical(
                EntityKind::DirectiveInfo,
                &table(&[("docid", vec![Some("5")]), ("title", vec![Some("Chỉ thị")])]),
            )
            .unwrap();

        let report = Combiner::new(layout.clone()).run().unwrap();
        assert!(!report.is_complete());
        let path = layout.combined_path("directive", "directive_info");
        assert!(report.produced.iter().any(|p| p.path == path));
        let written = read_table(&path).unwrap();
        assert_eq!(values(&written, "title"), vec![s("Chỉ thị")]);
    }
}
