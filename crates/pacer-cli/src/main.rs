use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{Int64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty;
use clap::{Parser, Subcommand};
use pacer_core::index;
use pacer_pipeline::{
    CourtDirectory, GlobalIndexBuilder, JudgeBatchJoiner, JudgeDataProcessor, Project,
    ProjectRegistry, Settings,
};
use pacer_store::{WriteMode, read_table};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod display;

const PREVIEW_ROWS: usize = 5;

/// pacer-stats - case indexes and judge data from a PACER docket archive
#[derive(Parser, Debug)]
#[command(name = "pacer-stats", version, about)]
struct Cli {
    /// Root holding data/ and projects/
    #[arg(long, env = "PACER_STATS_DIR", default_value = ".", global = true)]
    base_dir: PathBuf,

    /// Raw case archive laid out as <court>/json/<year>/<case>.json
    #[arg(long, env = "PACER_DIR", global = true)]
    pacer_dir: Option<PathBuf>,

    /// Log filter directive (e.g. "info", "pacer_pipeline=debug")
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index every case file under PACER_DIR into data/global_index.csv
    BuildGlobalIndex {
        /// Add to the existing index instead of replacing it
        #[arg(long)]
        append: bool,

        /// Case files per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Run whichever project stages have no output yet
    Build {
        project: String,

        /// Discard every project table and rebuild from the global index
        #[arg(long)]
        reset: bool,
    },

    /// Collect the project's rows from the judge entity table
    InitJudges { project: String },

    /// Tally judges per case and resolve assigned judges' FJC positions
    ProcessJudges { project: String },

    /// List registered projects and their scopes
    Projects,

    /// Nature-of-suit code frequencies in a project's case index
    NosCounts { project: String },

    /// Show one case from the global index, or from a project's case index
    ShowCase {
        ucid: String,

        #[arg(long)]
        project: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
    info!("pacer-stats v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::new(&cli.base_dir);
    if let Some(dir) = &cli.pacer_dir {
        settings = settings.with_pacer_dir(dir);
    }
    let registry = ProjectRegistry::load_dir(&settings.projects_dir())
        .context("loading project declarations")?;

    match cli.command {
        Commands::BuildGlobalIndex { append, batch_size } => {
            if let Some(n) = batch_size {
                settings.index_batch_size = n;
            }
            build_global_index(&settings, append)
        }
        Commands::Build { project, reset } => {
            let project = registry.get(&project)?;
            let report = project
                .build(&settings, reset)
                .with_context(|| format!("building project {}", project.name()))?;
            eprintln!("  {report:?}");
            display::print_preview(&project.processed_judge_data_path(), PREVIEW_ROWS)
        }
        Commands::InitJudges { project } => {
            let project = registry.get(&project)?;
            let stats = JudgeBatchJoiner::new(&settings)
                .collect(project)
                .with_context(|| format!("collecting judge data for {}", project.name()))?;
            eprintln!(
                "  Kept {} of {} entity rows in {} chunks",
                stats.kept, stats.scanned, stats.chunks
            );
            display::print_preview(&project.judge_data_path(), PREVIEW_ROWS)
        }
        Commands::ProcessJudges { project } => {
            let project = registry.get(&project)?;
            let stats = JudgeDataProcessor::new(&settings)
                .process(project)
                .with_context(|| format!("processing judge data for {}", project.name()))?;
            eprintln!(
                "  {} cases, {} assigned judges, {} positions resolved",
                stats.cases, stats.assigned, stats.resolved
            );
            display::print_preview(&project.processed_judge_data_path(), PREVIEW_ROWS)
        }
        Commands::Projects => {
            if registry.is_empty() {
                eprintln!("  No projects under {}", settings.projects_dir().display());
            }
            for project in registry.all() {
                println!("{:<16} {}", project.name(), project.scope());
            }
            Ok(())
        }
        Commands::NosCounts { project } => nos_counts(&settings, registry.get(&project)?),
        Commands::ShowCase { ucid, project } => {
            let path = match project {
                Some(name) => registry.get(&name)?.case_index_path(),
                None => settings.global_index_path(),
            };
            match find_case(&path, &ucid, settings.index_batch_size)? {
                Some(case) => display::print_case_card(&case),
                None => bail!("case {ucid} not found in {}", path.display()),
            }
        }
    }
}

fn build_global_index(settings: &Settings, append: bool) -> anyhow::Result<()> {
    let courts = CourtDirectory::load(
        &settings.courts_path(),
        &settings.cases_pending_path(),
        settings.pending_preamble_lines,
    )
    .context("loading court metadata")?;
    let mode = if append {
        WriteMode::Append
    } else {
        WriteMode::Fresh
    };
    let stats = GlobalIndexBuilder::new(settings, &courts)
        .build(mode)
        .context("building global index")?;
    eprintln!(
        "  Indexed {} of {} case files ({} skipped) in {} batches",
        stats.rows, stats.files, stats.skipped, stats.batches
    );
    display::print_preview(&settings.global_index_path(), PREVIEW_ROWS)
}

fn nos_counts(settings: &Settings, project: &Project) -> anyhow::Result<()> {
    let counts = project
        .nos_counts(settings)
        .with_context(|| format!("counting NOS codes for {}", project.name()))?;
    let schema = Schema::new(vec![
        Field::new("nature_suit_code", DataType::Int64, false),
        Field::new("cases", DataType::UInt64, false),
    ]);
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from_iter_values(counts.iter().map(|(code, _)| *code))),
            Arc::new(UInt64Array::from_iter_values(counts.iter().map(|(_, n)| *n as u64))),
        ],
    )?;
    println!("{}", pretty::pretty_format_batches(&[batch])?);
    Ok(())
}

/// The single-row slice of the index batch holding `ucid`.
fn find_case(path: &Path, ucid: &str, batch_size: usize) -> anyhow::Result<Option<RecordBatch>> {
    let schema = Arc::new(index::global_index_schema());
    let batches =
        read_table(path, schema, batch_size).with_context(|| format!("reading {}", path.display()))?;
    for batch in batches {
        let batch = batch?;
        let Some(ucids) = batch
            .column_by_name(index::UCID)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        else {
            bail!("{} has no ucid column", path.display());
        };
        if let Some(row) = ucids.iter().position(|u| u == Some(ucid)) {
            return Ok(Some(batch.slice(row, 1)));
        }
    }
    Ok(None)
}
