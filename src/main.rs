// src/main.rs
mod analytics;
mod api;
mod extractors;
mod pipeline;
mod sheet;
mod sources;
mod storage;
mod utils;
mod workbook;

use clap::{Args, Parser, Subcommand};
use extractors::{ExtractorConfig, RecordRule, SectionExtractor};
use sources::amfi::{self, AMFI_BASE_URL, DEFAULT_TIMEOUT_SECS};
use sources::{nsdl, AmfiClient, ReportMonth};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storage::{FlowStore, StorageManager};
use utils::AppError;

const DEFAULT_DB_FILE: &str = "fundflow.sqlite3";

/// AMFI / NSDL report extractor and monthly flow store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base directory for downloads and extracted workbooks
    #[arg(short, long, default_value = ".", global = true)]
    output_dir: PathBuf,

    /// SQLite database path (default: <output-dir>/fundflow.sqlite3)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download AMFI monthly report files
    Fetch(FetchArgs),
    /// Extract the configured section from every workbook in a directory
    Extract(ExtractArgs),
    /// Download, extract and store, month by month
    Pipeline {
        #[command(flatten)]
        fetch: FetchArgs,
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Store the records of an already extracted workbook
    Load {
        /// Extracted workbook (first row is the header)
        #[arg(short, long)]
        file: PathBuf,
        /// Reporting period, e.g. "Nov 2025"; inferred from the file name if omitted
        #[arg(short, long)]
        month: Option<String>,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// Fetch an NSDL fortnightly sector report into a workbook
    Nsdl {
        /// Full report URL
        #[arg(long, conflicts_with = "stamp")]
        url: Option<String>,
        /// Report date stamp, e.g. Dec152025
        #[arg(long)]
        stamp: Option<String>,
        /// Also write the USD-only workbook
        #[arg(long)]
        usd_only: bool,
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
    /// Write the USD-only workbook for an existing NSDL workbook
    Usd {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Serve the query API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// First year to fetch (default: four years before --to-year)
    #[arg(long)]
    from_year: Option<i32>,
    /// Last year to fetch (default: current year)
    #[arg(long)]
    to_year: Option<i32>,
    #[arg(long, default_value = AMFI_BASE_URL)]
    base_url: String,
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Directory of .xls/.xlsx files (default: <output-dir>/amfi_downloads)
    #[arg(short, long)]
    input: Option<PathBuf>,
    #[command(flatten)]
    profile: ProfileArgs,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    /// JSON keyword profile; the AMFI Growth/Equity preset is used otherwise
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Stop before the end row instead of including it
    #[arg(long)]
    end_exclusive: bool,
    /// Drop rows with nothing past the first N columns
    #[arg(long)]
    label_columns: Option<usize>,
}

#[derive(Args, Debug)]
struct RuleArgs {
    #[arg(long, default_value_t = 1)]
    label_column: usize,
    #[arg(long, default_value_t = 6)]
    value_column: usize,
}

impl ProfileArgs {
    fn extractor(&self) -> Result<SectionExtractor, AppError> {
        let base = match &self.profile {
            Some(path) => ExtractorConfig::from_json_file(path)?,
            None => ExtractorConfig::amfi_growth_equity(),
        };
        // Flags override the profile only when given.
        let mut config = base;
        if self.end_exclusive {
            config = config.with_end_inclusive(false);
        }
        if self.label_columns.is_some() {
            config = config.with_label_columns(self.label_columns);
        }
        let extractor = SectionExtractor::new(config);
        tracing::debug!("Extractor config: {:?}", extractor.config());
        Ok(extractor)
    }
}

impl RuleArgs {
    fn rule(&self) -> RecordRule {
        RecordRule { label_column: self.label_column, value_column: self.value_column }
    }
}

impl FetchArgs {
    fn client(&self) -> Result<AmfiClient, AppError> {
        Ok(AmfiClient::new(&self.base_url, Duration::from_secs(self.timeout_secs))?)
    }

    fn months(&self) -> Vec<ReportMonth> {
        let years = amfi::year_range(self.from_year, self.to_year);
        tracing::info!("Years: {:?}", years);
        amfi::months_for_years(&years)
    }
}

fn open_store(cli: &Cli) -> Result<FlowStore, AppError> {
    let path = cli
        .db
        .clone()
        .unwrap_or_else(|| cli.output_dir.join(DEFAULT_DB_FILE));
    tracing::info!("Using store at {}", path.display());
    Ok(FlowStore::open(&path)?)
}

fn month_for_load(month: Option<&str>, file: &Path) -> Result<String, AppError> {
    let parsed = match month {
        Some(label) => ReportMonth::parse_label(label)
            .ok_or_else(|| AppError::Config(format!("Unrecognised month '{}', expected e.g. 'Nov 2025'", label)))?,
        None => file
            .file_stem()
            .and_then(|s| ReportMonth::from_file_stem(&s.to_string_lossy()))
            .ok_or_else(|| {
                AppError::Config(format!("Cannot infer month from {}; pass --month", file.display()))
            })?,
    };
    Ok(parsed.label())
}

fn finish(summary: pipeline::BatchSummary, what: &str) -> Result<(), AppError> {
    summary.log(what);
    if summary.all_failed() {
        return Err(AppError::Processing(format!("{}: all {} attempt(s) failed", what, summary.failed)));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI arguments and set up logging (reads RUST_LOG)
    let cli = Cli::parse();
    utils::logging::setup_logging(cli.verbose);
    tracing::debug!("Starting with args: {:?}", cli);

    // 2. Initialize storage layout
    let storage = StorageManager::new(&cli.output_dir)?;
    tracing::debug!("Output directory: {}", storage.base_dir().display());

    // 3. Dispatch
    match &cli.command {
        Command::Fetch(args) => {
            let client = args.client()?;
            let summary = pipeline::run_fetch(&client, &args.months(), &storage).await;
            finish(summary, "Fetch")
        }
        Command::Extract(args) => {
            let input = args.input.clone().unwrap_or_else(|| storage.downloads_dir());
            if !input.is_dir() {
                return Err(AppError::Config(format!("Input directory {} does not exist", input.display())));
            }
            let extractor = args.profile.extractor()?;
            let summary = pipeline::run_extract(&input, &storage, &extractor)?;
            finish(summary, "Extraction")
        }
        Command::Pipeline { fetch, profile, rule } => {
            let client = fetch.client()?;
            let extractor = profile.extractor()?;
            let mut store = open_store(&cli)?;
            let summary = pipeline::run_pipeline(
                &client,
                &fetch.months(),
                &storage,
                &extractor,
                &rule.rule(),
                &mut store,
            )
            .await?;
            tracing::info!("Store now holds {} rows", store.count()?);
            finish(summary, "Pipeline")
        }
        Command::Load { file, month, rule } => {
            let label = month_for_load(month.as_deref(), file)?;
            let mut store = open_store(&cli)?;
            if store.month_exists(&label)? {
                tracing::info!("{} already has rows; values will be overwritten", label);
            }
            pipeline::load_extracted(file, &label, &rule.rule(), &mut store)?;
            for record in store.records_for_month(&label)? {
                tracing::debug!("{} | {} | {:?}", record.month, record.scheme_category, record.net_inflow);
            }
            Ok(())
        }
        Command::Nsdl { url, stamp, usd_only, timeout_secs } => {
            let url = match (url, stamp) {
                (Some(url), _) => url.clone(),
                (None, Some(stamp)) => nsdl::report_url(stamp),
                (None, None) => nsdl::default_report_url(),
            };
            let output =
                pipeline::run_nsdl(&url, &storage, *usd_only, Duration::from_secs(*timeout_secs)).await?;
            tracing::info!("NSDL workbook written to {}", output.workbook.display());
            if let Some(path) = output.usd_workbook {
                tracing::info!("USD-only workbook written to {}", path.display());
            }
            Ok(())
        }
        Command::Usd { file } => {
            pipeline::run_usd(file, &storage)?;
            Ok(())
        }
        Command::Serve { bind } => {
            let store = open_store(&cli)?;
            api::serve(bind, store).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_month_comes_from_flag_or_file_name() {
        let file = Path::new("out/amnov2025repo_growth_equity.xlsx");
        assert_eq!(month_for_load(Some("november 2025"), file).unwrap(), "Nov 2025");
        assert_eq!(month_for_load(None, file).unwrap(), "Nov 2025");
        assert!(month_for_load(None, Path::new("report.xlsx")).is_err());
        assert!(month_for_load(Some("2025"), file).is_err());
    }

    #[test]
    fn profile_end_inclusive_survives_without_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(
            &path,
            r#"{"header_keywords": ["scheme"], "start_keywords": ["growth"],
                "end_keywords": ["sub total"], "end_inclusive": false}"#,
        )
        .unwrap();

        let args = ProfileArgs { profile: Some(path.clone()), end_exclusive: false, label_columns: None };
        assert!(!args.extractor().unwrap().config().end_inclusive);

        let preset = ProfileArgs { profile: None, end_exclusive: false, label_columns: None };
        assert!(preset.extractor().unwrap().config().end_inclusive);

        let flagged = ProfileArgs { profile: None, end_exclusive: true, label_columns: Some(1) };
        let config = flagged.extractor().unwrap().config().clone();
        assert!(!config.end_inclusive);
        assert_eq!(config.label_columns, Some(1));
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "fundflow", "--output-dir", "/tmp/x", "pipeline", "--from-year", "2024", "--end-exclusive",
        ])
        .unwrap();
        match cli.command {
            Command::Pipeline { fetch, profile, rule } => {
                assert_eq!(fetch.from_year, Some(2024));
                assert!(profile.end_exclusive);
                assert_eq!(rule.value_column, 6);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
