use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pagemigrate_acquire::{HttpFetcher, KeyCase, LookupTable};
use pagemigrate_extract::components::COMPONENT_COLUMN;
use pagemigrate_extract::text_block::DEFAULT_ELEMENT;
use pagemigrate_extract::{
    Components, Magazine, Profile, ProfileUrlResolver, ProfileUrls, SideNav, TextBlock, Variant,
};
use pagemigrate_model::Settings;
use pagemigrate_pipeline::{Run, RunOptions, RunSummary};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc, FormatTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "pagemigrate")]
#[command(about = "Extract content from legacy web pages into CMS content fragment tables")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    /// Also write the log to this file (overwritten, no colors)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Options shared by every job.
#[derive(Args)]
struct RunArgs {
    /// Input table (CSV, first row is the header)
    #[arg(short, long, default_value = "input.csv")]
    input: PathBuf,

    /// Header of the column holding URLs or IDs [default depends on the job]
    #[arg(short, long)]
    key_column: Option<String>,

    /// Output table of content fragment rows
    #[arg(short, long, default_value = "cf_out.csv")]
    output: PathBuf,

    /// Status table written by the detect jobs
    #[arg(long, default_value = "expanded.csv")]
    status_output: PathBuf,

    /// Identifiers that were skipped, one per line
    #[arg(long, default_value = "failed_urls.txt")]
    failure_log: PathBuf,

    /// Stop after this many input records
    #[arg(long)]
    limit: Option<usize>,

    /// Compare keys case-insensitively (input table and lookup tables)
    #[arg(long)]
    fold_key_case: bool,

    /// JSON settings file overriding the job's defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save every fetched page into this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl RunArgs {
    fn key_case(&self) -> KeyCase {
        if self.fold_key_case {
            KeyCase::Fold
        } else {
            KeyCase::Preserve
        }
    }

    fn settings(&self, defaults: Settings) -> Result<Settings> {
        let Some(path) = &self.config else {
            return Ok(defaults);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings = defaults.merged_with_json(&json)?;
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    fn options(&self, default_key: &str) -> RunOptions {
        RunOptions {
            input: self.input.clone(),
            key_column: self.key_column.clone().unwrap_or_else(|| default_key.to_string()),
            output: self.output.clone(),
            status_output: self.status_output.clone(),
            failure_log: self.failure_log.clone(),
            limit: self.limit,
            key_case: self.key_case(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

/// Profile URL sources shared by the profile jobs.
#[derive(Args)]
struct ProfileSources {
    /// Profile report keyed by `Eaglenet ID` (Default Profile Page, All
    /// Profile Pages, Force Profile, Resume, CV, Profile Image)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Fallback table of profile URLs keyed by `Eaglenet ID`, column `url`
    #[arg(long)]
    url_table: Option<PathBuf>,
}

impl ProfileSources {
    fn resolver(&self, settings: &Settings, case: KeyCase) -> Result<ProfileUrlResolver> {
        let report = self
            .report
            .as_deref()
            .map(|path| load_lookup(path, Profile::KEY_COLUMN, case))
            .transpose()?;
        let url_table = self
            .url_table
            .as_deref()
            .map(|path| load_lookup(path, Profile::KEY_COLUMN, case))
            .transpose()?;
        Ok(ProfileUrlResolver::new(report, url_table, settings.clone())?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Report text-block sections holding lists, forms or tables, and export
    /// single-block pages as HTML fragments
    TextBlock {
        #[command(flatten)]
        run: RunArgs,

        /// `data-element` value of the sections to inspect
        #[arg(short, long, default_value = DEFAULT_ELEMENT)]
        element: String,
    },

    /// Convert left navigation menus into side navigation fragments
    SideNav {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Convert faculty/staff profile pages into profile fragments
    Profile {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        sources: ProfileSources,
    },

    /// Resolve profile IDs to their canonical profile URLs (no fetching)
    ProfileUrls {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        sources: ProfileSources,
    },

    /// Convert magazine article pages into article fragments
    Magazine {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Check which of the listed components each page actually renders
    Components {
        #[command(flatten)]
        run: RunArgs,

        /// Component sheet: a `URL` column and a comma-separated `Component` column
        #[arg(long, default_value = "components.csv")]
        components: PathBuf,

        /// Only count sections that also carry this class (e.g. hero-image-full)
        #[arg(long)]
        require_class: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let summary = match &cli.command {
        Commands::TextBlock { run, element } => {
            let settings = run.settings(TextBlock::default_settings())?;
            let job = Run::init(run.options(TextBlock::KEY_COLUMN), &settings)?;
            let variant = TextBlock::new(settings.clone(), element);
            execute(job, &variant, &settings).await?
        }
        Commands::SideNav { run } => {
            let settings = run.settings(SideNav::default_settings())?;
            let job = Run::init(run.options(SideNav::KEY_COLUMN), &settings)?;
            let variant = SideNav::new(settings.clone());
            execute(job, &variant, &settings).await?
        }
        Commands::Profile { run, sources } => {
            let settings = run.settings(Profile::default_settings())?;
            let job = Run::init(run.options(Profile::KEY_COLUMN), &settings)?;
            let resolver = sources.resolver(&settings, run.key_case())?;
            let variant = Profile::new(settings.clone(), resolver);
            execute(job, &variant, &settings).await?
        }
        Commands::ProfileUrls { run, sources } => {
            let settings = run.settings(Profile::default_settings())?;
            let job = Run::init(run.options(ProfileUrls::KEY_COLUMN), &settings)?;
            let variant = ProfileUrls::new(sources.resolver(&settings, run.key_case())?);
            execute(job, &variant, &settings).await?
        }
        Commands::Magazine { run } => {
            let settings = run.settings(Magazine::default_settings())?;
            let job = Run::init(run.options(Magazine::KEY_COLUMN), &settings)?;
            let variant = Magazine::new(settings.clone());
            execute(job, &variant, &settings).await?
        }
        Commands::Components {
            run,
            components,
            require_class,
        } => {
            let settings = run.settings(Settings::default())?;
            let job = Run::init(run.options(Components::KEY_COLUMN), &settings)?;
            let sheet = load_lookup(components, Components::KEY_COLUMN, run.key_case())?;
            let variant = Components::new(sheet, require_class.as_deref())?;
            tracing::info!(components = variant.components().len(), column = COMPONENT_COLUMN, "Loaded component sheet");
            execute(job, &variant, &settings).await?
        }
    };

    if summary.skipped() > 0 {
        tracing::warn!(skipped = summary.skipped(), "Some records were skipped; see the failure log");
    }
    Ok(())
}

async fn execute<V: Variant>(job: Run, variant: &V, settings: &Settings) -> Result<RunSummary> {
    let fetcher = HttpFetcher::new(&settings.importer_id, settings.timeout())?;
    job.execute(variant, &fetcher)
        .await
        .with_context(|| format!("{} run failed", variant.name()))
}

fn load_lookup(path: &Path, key_column: &str, case: KeyCase) -> Result<LookupTable> {
    let table = LookupTable::read_csv(path, key_column, case)?;
    tracing::info!(path = %path.display(), rows = table.len(), "Loaded lookup table");
    Ok(table)
}

fn init_logging(cli: &Cli) -> Result<()> {
    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z".to_string();
    if cli.utc {
        install_subscriber(cli, ChronoUtc::new(time_format))
    } else {
        install_subscriber(cli, ChronoLocal::new(time_format))
    }
}

fn install_subscriber<T>(cli: &Cli, timer: T) -> Result<()>
where
    T: FormatTime + Clone + Send + Sync + 'static,
{
    // Suppress noisy HTML-parsing crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_timer(timer.clone())
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_timer(timer))
        .with(file_layer)
        .init();
    Ok(())
}
