//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use poolset_core::pipeline::{self, ProgressReporter, RunResult};
use poolset_shared::{
    AppConfig, ClassificationMode, PipelineConfig, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// poolset: one reconciled, classified stake pool dataset.
#[derive(Parser)]
#[command(
    name = "poolset",
    version,
    about = "Reconcile stake pool records from a registry, a classification source and an override dataset.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.poolset/poolset.toml.
    #[arg(long, global = true, env = "POOLSET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Classification strategy selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum ClassificationArg {
    /// Join on the pool id; SINGLEPOOL is sSPO, anything else MPO.
    Hash,
    /// Join on the ticker; labels are used as-is.
    Ticker,
    /// No classification source; every pool is sSPO.
    None,
}

impl From<ClassificationArg> for ClassificationMode {
    fn from(arg: ClassificationArg) -> Self {
        match arg {
            ClassificationArg::Hash => Self::Hash,
            ClassificationArg::Ticker => Self::Ticker,
            ClassificationArg::None => Self::None,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch, reconcile and export the pool dataset.
    Run {
        /// Read primary records from a JSON snapshot instead of the registry.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory for the exports.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Path of the authoritative override dataset.
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Classification strategy.
        #[arg(short, long, value_enum)]
        classification: Option<ClassificationArg>,
    },

    /// Write the stake distribution of a previously exported dataset.
    ExportStakes {
        /// Exported dataset (JSON array of pools).
        pools: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "poolset=info",
        1 => "poolset=debug",
        _ => "poolset=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            input,
            out,
            overrides,
            classification,
        } => {
            let app = resolve_config(config_path.as_deref())?;
            let overrides = RunOverrides {
                input,
                out,
                overrides,
                classification,
            };
            cmd_run(&app, overrides).await
        }
        Command::ExportStakes { pools } => cmd_export_stakes(&pools),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Flag values that take precedence over the config file.
#[derive(Debug, Default)]
struct RunOverrides {
    input: Option<PathBuf>,
    out: Option<PathBuf>,
    overrides: Option<PathBuf>,
    classification: Option<ClassificationArg>,
}

fn pipeline_config(app: &AppConfig, flags: RunOverrides) -> PipelineConfig {
    let mut config = PipelineConfig::from(app);
    config.input = flags.input;
    if let Some(out) = flags.out {
        config.output_dir = out;
    }
    if let Some(overrides) = flags.overrides {
        config.overrides_path = overrides;
    }
    if let Some(mode) = flags.classification {
        config.classification.mode = mode.into();
    }
    config
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(app: &AppConfig, flags: RunOverrides) -> Result<()> {
    let config = pipeline_config(app, flags);

    info!(
        source = %config
            .input
            .as_ref()
            .map_or_else(|| config.primary.url.clone(), |p| p.display().to_string()),
        classification = %config.classification.mode,
        overrides = %config.overrides_path.display(),
        "running reconciliation"
    );

    let reporter = CliProgress::new();
    let result = pipeline::run(&config, &reporter)
        .await
        .wrap_err("reconciliation run failed")?;

    print_summary(&result);
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!();
    println!("  Pool dataset written!");
    println!("  Dataset:    {}", result.pools_path.display());
    println!(
        "  Stakes:     {} ({} pools)",
        result.stakes_path.display(),
        result.stakes_exported
    );
    println!(
        "  Fetched:    {} ({} excluded)",
        result.fetched, result.excluded
    );
    println!("  Dropped:    {}", result.dropped);
    println!(
        "  Overrides:  {} replaced, {} appended",
        result.replaced, result.appended
    );
    println!("  Pools:      {}", result.final_count);
    for (group, count) in &result.group_counts {
        println!("    {group:<8} {count}");
    }
    let degraded = if result.classification_degraded {
        " (source unavailable)"
    } else {
        ""
    };
    println!("  Strategy:   {}{degraded}", result.strategy);
    println!(
        "  Fixes:      {} tickers, {} placeholders, {} forced MPO",
        result.fixes.tickers_corrected, result.fixes.placeholders, result.fixes.forced_mpo
    );
    if !result.diagnostics.is_empty() {
        println!("  Warnings:   {}", result.diagnostics.len());
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn cmd_export_stakes(pools: &Path) -> Result<()> {
    info!(path = %pools.display(), "exporting stake distribution");
    let export = poolset_core::export::export_stakes_from_file(pools)
        .wrap_err_with(|| format!("failed to export stakes from {}", pools.display()))?;
    println!(
        "Stake distribution written to: {} ({} pools)",
        export.path.display(),
        export.count
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, offset: u64, count: usize) {
        self.spinner
            .set_message(format!("Fetching pools [offset {offset}, {count} records]"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
