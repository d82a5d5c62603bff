mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lawharvest_core::Mode;
use lawharvest_merge::{Combiner, MergeEngine};
use lawharvest_store::HarvestConfig;
use lawharvest_update::{FailureLedger, ModeProfile, load_existing, plan_work};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lawharvest")]
#[command(about = "Merge, combine and plan updates of scraped legal-document tables")]
#[command(version)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = "LAWHARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Output root, overriding the config file
    #[arg(long, global = true, env = "LAWHARVEST_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild canonical tables from each collector's batches
    Merge {
        #[arg(long, value_enum, default_value_t = Target::All)]
        collector: Target,
    },

    /// Combine collector canonical tables into the published outputs
    Combine,

    /// Show which identifiers an update run would extract
    Plan {
        #[arg(long, value_enum)]
        collector: Collector,

        /// File with one visible identifier per line
        #[arg(long)]
        visible: PathBuf,
    },

    /// Inspect or prune the failure ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),
}

#[derive(Subcommand)]
enum LedgerCommand {
    /// List persisted failures
    Show {
        #[arg(long, value_enum)]
        collector: Collector,
    },

    /// Remove identifiers from the ledger
    Forget {
        #[arg(long, value_enum)]
        collector: Collector,

        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Collector {
    Central,
    Local,
    Directive,
}

impl From<Collector> for Mode {
    fn from(c: Collector) -> Self {
        match c {
            Collector::Central => Mode::Central,
            Collector::Local => Mode::Local,
            Collector::Directive => Mode::Directive,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Central,
    Local,
    Directive,
    All,
}

impl Target {
    fn modes(self) -> Vec<Mode> {
        match self {
            Target::Central => vec![Mode::Central],
            Target::Local => vec![Mode::Local],
            Target::Directive => vec![Mode::Directive],
            Target::All => Mode::ALL.to_vec(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.root)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %config.root.display(),
        "lawharvest"
    );

    match cli.command {
        Commands::Merge { collector } => cmd_merge(&config, collector),
        Commands::Combine => cmd_combine(&config),
        Commands::Plan { collector, visible } => cmd_plan(&config, collector.into(), &visible),
        Commands::Ledger(LedgerCommand::Show { collector }) => {
            cmd_ledger_show(&config, collector.into())
        }
        Commands::Ledger(LedgerCommand::Forget { collector, ids }) => {
            cmd_ledger_forget(&config, collector.into(), &ids)
        }
    }
}

fn load_config(path: Option<&Path>, root: Option<PathBuf>) -> Result<HarvestConfig> {
    let mut config = match path {
        Some(path) => HarvestConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HarvestConfig::default(),
    };
    if let Some(root) = root {
        config.root = root;
    }
    Ok(config)
}

fn cmd_merge(config: &HarvestConfig, target: Target) -> Result<()> {
    let layout = config.layout();
    for mode in target.modes() {
        let engine = MergeEngine::new(layout.store(mode));
        let results = engine.merge_all(mode.kinds());
        display::print_merge_results(mode, &results);
    }
    Ok(())
}

fn cmd_combine(config: &HarvestConfig) -> Result<()> {
    let report = Combiner::new(config.layout())
        .run()
        .context("writing combined outputs")?;
    display::print_combine_report(&report);
    Ok(())
}

fn cmd_plan(config: &HarvestConfig, mode: Mode, visible: &Path) -> Result<()> {
    let text = std::fs::read_to_string(visible)
        .with_context(|| format!("reading {}", visible.display()))?;
    let store = config.layout().store(mode);
    let profile = ModeProfile::new(mode, store.root().display().to_string());

    let existing = load_existing(&store, profile.info_kind(), profile.identifier_column);
    let failed = FailureLedger::open(store.ledger_path()).load();
    let work = plan_work(&existing, text.lines(), &failed);
    display::print_work_set(&work);
    Ok(())
}

fn cmd_ledger_show(config: &HarvestConfig, mode: Mode) -> Result<()> {
    let ledger = FailureLedger::open(config.layout().store(mode).ledger_path());
    display::print_ledger(ledger.path(), &ledger.load())
}

fn cmd_ledger_forget(config: &HarvestConfig, mode: Mode, ids: &[String]) -> Result<()> {
    let ledger = FailureLedger::open(config.layout().store(mode).ledger_path());
    let removed = ledger
        .forget(ids)
        .with_context(|| format!("rewriting {}", ledger.path().display()))?;
    println!("removed {removed} of {} requested", ids.len());
    Ok(())
}
