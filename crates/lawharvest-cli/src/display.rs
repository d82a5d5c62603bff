//! Terminal output for merge, combine, plan and ledger commands.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use lawharvest_core::{EntityKind, Mode};
use lawharvest_merge::{CombineReport, MergeError, MergeOutcome};
use lawharvest_update::WorkSet;

const MAX_LIST_ITEMS: usize = 20;

// ── Merge ──

pub fn print_merge_results(mode: Mode, results: &[(EntityKind, Result<MergeOutcome, MergeError>)]) {
    println!("{mode}");
    for (kind, result) in results {
        let label = kind.to_string();
        match result {
            Ok(MergeOutcome::NoInput) => println!("  {label:<26} no batches"),
            Ok(MergeOutcome::Merged {
                rows,
                batches,
                skipped,
                path,
            }) => {
                let skipped = if *skipped > 0 {
                    format!(", {skipped} skipped")
                } else {
                    String::new()
                };
                println!(
                    "  {label:<26} {rows} rows from {batches} batches{skipped} -> {}",
                    short(path)
                );
            }
            Err(e) => println!("  {label:<26} failed: {e}"),
        }
    }
    println!();
}

// ── Combine ──

pub fn print_combine_report(report: &CombineReport) {
    println!("Produced");
    if report.produced.is_empty() {
        println!("  (none)");
    }
    for p in &report.produced {
        println!("  {:<26} {} rows -> {}", p.output.to_string(), p.rows, short(&p.path));
    }
    if !report.missing.is_empty() {
        println!("Missing (no source data)");
        for output in &report.missing {
            println!("  {output}");
        }
    }
}

// ── Plan ──

pub fn print_work_set(work: &WorkSet) {
    println!(
        "{} to extract ({} new, {} from failure ledger)",
        work.len(),
        work.fresh(),
        work.retried()
    );
    for id in work.ids().iter().take(MAX_LIST_ITEMS) {
        println!("  {id}");
    }
    if work.len() > MAX_LIST_ITEMS {
        println!("  ... and {} more", work.len() - MAX_LIST_ITEMS);
    }
}

// ── Ledger ──

/// Print ledger entries as a numbered table.
pub fn print_ledger(path: &Path, ids: &[String]) -> anyhow::Result<()> {
    println!("{} ({} entries)", path.display(), ids.len());
    if ids.is_empty() {
        return Ok(());
    }
    let numbers: StringArray = (1..=ids.len()).map(|n| Some(n.to_string())).collect();
    let urls: StringArray = ids.iter().map(|id| Some(id.as_str())).collect();
    let schema = Schema::new(vec![
        Field::new("#", DataType::Utf8, false),
        Field::new("url", DataType::Utf8, false),
    ]);
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(numbers) as ArrayRef, Arc::new(urls) as ArrayRef],
    )?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

fn short(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}
