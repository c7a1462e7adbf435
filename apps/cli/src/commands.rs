//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use orgscout_connectors::{
    DuckDuckGoSearch, EnrichProvider, FetchProvider, HttpEnrichClient, HttpFetcher,
    JsonLedgerStore, LedgerStore, LlmAssist, LlmExtract, MeteredEnrich, NullLlm, SearchProvider,
    SimEnrich, SimFetch, SimLlm, SimSearch, WebGateway,
};
use orgscout_pipeline::{RunConfig, RunProgress, RunResult, RunStatus, Runner};
use orgscout_runtime::{Budget, BudgetCeilings, CacheStack, CheckpointStore, RetryPolicy};
use orgscout_shared::{
    AppConfig, Mode, Region, RunId, Segment, init_config, load_config, validate_enrich_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// OrgScout — discover and qualify organizations segment by segment.
#[derive(Parser)]
#[command(
    name = "orgscout",
    version,
    about = "Discover, score, and enrich candidate organizations under strict budgets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a discovery pass for one segment.
    Run {
        /// Target segment: healthcare, corporate, or providers.
        #[arg(long)]
        segment: Segment,

        /// Number of organizations to deliver.
        #[arg(long, default_value_t = 50)]
        target_count: usize,

        /// Budget mode: fast, deep, or strict.
        #[arg(long, default_value = "fast")]
        mode: Mode,

        /// Regional scope: na, emea, or both.
        #[arg(long, default_value = "both")]
        region: Region,

        /// Use the seeded offline providers instead of the network.
        #[arg(long)]
        offline: bool,

        /// Root directory for run artifacts (defaults from config).
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Resume an interrupted run from its newest checkpoint.
    Resume {
        /// Run id printed when the run started.
        #[arg(long)]
        run_id: RunId,

        /// Number of organizations to deliver.
        #[arg(long, default_value_t = 50)]
        target_count: usize,

        /// Budget mode: fast, deep, or strict.
        #[arg(long, default_value = "fast")]
        mode: Mode,

        /// Regional scope: na, emea, or both.
        #[arg(long, default_value = "both")]
        region: Region,

        /// Use the seeded offline providers instead of the network.
        #[arg(long)]
        offline: bool,

        /// Root directory for run artifacts (defaults from config).
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Cache management.
    Cache {
        /// Cache subcommand.
        #[command(subcommand)]
        action: CacheAction,
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

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Delete the disk cache.
    Clear,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "orgscout=info",
        1 => "orgscout=debug",
        _ => "orgscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            segment,
            target_count,
            mode,
            region,
            offline,
            output_dir,
        } => cmd_run(segment, target_count, mode, region, offline, output_dir).await,
        Command::Resume {
            run_id,
            target_count,
            mode,
            region,
            offline,
            output_dir,
        } => cmd_resume(run_id, target_count, mode, region, offline, output_dir).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
        Command::Cache { action } => match action {
            CacheAction::Clear => cmd_cache_clear().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run / resume
// ---------------------------------------------------------------------------

enum Launch {
    Run,
    Resume,
}

async fn cmd_run(
    segment: Segment,
    target_count: usize,
    mode: Mode,
    region: Region,
    offline: bool,
    output_dir: Option<String>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(dir) = output_dir {
        config.discovery.output_dir = dir;
    }
    if !offline {
        validate_enrich_key(&config)?;
    }

    let run_config = RunConfig::from_app(&config, segment, region, target_count, mode)?;
    let budget = Arc::new(Budget::new(BudgetCeilings::for_mode(&config.budget, mode)));

    info!(
        run_id = %run_config.run_id,
        segment = %segment,
        target_count,
        mode = %mode,
        region = %region,
        offline,
        "starting discovery run"
    );
    println!("  Run ID: {}", run_config.run_id);

    execute(config, run_config, budget, offline, Launch::Run).await
}

async fn cmd_resume(
    run_id: RunId,
    target_count: usize,
    mode: Mode,
    region: Region,
    offline: bool,
    output_dir: Option<String>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(dir) = output_dir {
        config.discovery.output_dir = dir;
    }
    if !offline {
        validate_enrich_key(&config)?;
    }

    // The checkpoint settles the segment and restores budget counters;
    // the runner itself restores the seen-name set.
    let checkpoints = CheckpointStore::new(config.discovery.checkpoint_dir.as_str());
    let record = checkpoints
        .latest_for_run(&run_id)?
        .ok_or_else(|| eyre!("no checkpoint found for run {run_id}"))?;

    let mut run_config =
        RunConfig::from_app(&config, record.segment, region, target_count, mode)?;
    run_config.run_id = run_id;
    let budget = Arc::new(Budget::from_snapshot(&record.budget));

    info!(
        run_id = %run_config.run_id,
        segment = %record.segment,
        batch = record.batch_index,
        offline,
        "resuming discovery run"
    );

    execute(config, run_config, budget, offline, Launch::Resume).await
}

/// Wire providers and hand off to the runner. Offline runs use the
/// seeded sim corpus; online runs talk to the real services.
async fn execute(
    app: AppConfig,
    run_config: RunConfig,
    budget: Arc<Budget>,
    offline: bool,
    launch: Launch,
) -> Result<()> {
    let cache = Arc::new(CacheStack::standard(
        app.cache.memory_capacity,
        app.cache.dir.as_str(),
        app.cache.ttl_secs,
    ));
    let retry = RetryPolicy::from_transport(&app.transport);
    let ledger = JsonLedgerStore::new(app.ledger.path.as_str());
    let checkpoints = CheckpointStore::new(run_config.checkpoint_dir.clone());
    let segment = run_config.segment;

    if offline {
        let gateway = WebGateway::new(
            SimSearch::new(segment),
            SimFetch,
            Arc::clone(&budget),
            Arc::clone(&cache),
            &app.transport,
        );
        let enrich = MeteredEnrich::new(SimEnrich, Arc::clone(&budget), Arc::clone(&cache), retry);
        let llm = LlmAssist::new(SimLlm, Arc::clone(&budget), Arc::clone(&cache), retry);
        let runner = Runner::new(
            run_config,
            budget,
            cache,
            gateway,
            enrich,
            llm,
            ledger,
            checkpoints,
        );
        drive(runner, launch).await
    } else {
        let search = DuckDuckGoSearch::new(app.transport.timeout_secs)?;
        let fetch = HttpFetcher::new(app.transport.timeout_secs)?;
        let enrich_client = HttpEnrichClient::new(&app.enrich, app.transport.timeout_secs)?;
        let gateway = WebGateway::new(
            search,
            fetch,
            Arc::clone(&budget),
            Arc::clone(&cache),
            &app.transport,
        );
        let enrich =
            MeteredEnrich::new(enrich_client, Arc::clone(&budget), Arc::clone(&cache), retry);
        let llm = LlmAssist::new(NullLlm, Arc::clone(&budget), Arc::clone(&cache), retry);
        let runner = Runner::new(
            run_config,
            budget,
            cache,
            gateway,
            enrich,
            llm,
            ledger,
            checkpoints,
        );
        drive(runner, launch).await
    }
}

async fn drive<S, F, E, M, L>(runner: Runner<S, F, E, M, L>, launch: Launch) -> Result<()>
where
    S: SearchProvider,
    F: FetchProvider,
    E: EnrichProvider,
    M: LlmExtract,
    L: LedgerStore,
{
    // Ctrl-C requests cancellation; the run stops at the next stage
    // boundary and leaves a resumable checkpoint.
    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let progress = CliProgress::new();
    let result = match launch {
        Launch::Run => runner.run(&progress).await?,
        Launch::Resume => runner.resume(&progress).await?,
    };

    print_result(&result);
    Ok(())
}

fn print_result(result: &RunResult) {
    println!();
    match result.status {
        RunStatus::Completed => println!("  Discovery run complete!"),
        RunStatus::PartiallyCompleted => {
            println!("  Discovery run partially complete (budget or error limit reached).")
        }
        RunStatus::Aborted => println!("  Run cancelled."),
    }
    println!("  Status:  {}", result.status);
    println!("  Rows:    {}", result.rows.len());
    println!(
        "  Mix:     NA {} / EMEA {}",
        result.achieved_mix.na, result.achieved_mix.emea
    );
    for line in result.budget.report_lines() {
        println!("  {line}");
    }
    if !result.errors.is_empty() {
        println!("  Errors:  {}", result.errors.len());
    }
    if let Some(dir) = &result.artifacts_dir {
        println!("  Output:  {}", dir.display());
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();

    if result.status == RunStatus::Aborted {
        println!("  Resume with: orgscout resume --run-id {}", result.run_id);
        println!();
    }
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl RunProgress for CliProgress {
    fn stage(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {label}"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config / cache
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

async fn cmd_cache_clear() -> Result<()> {
    let config = load_config()?;
    let dir = PathBuf::from(config.cache.dir.as_str());
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => println!("Cache cleared: {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("Cache already empty: {}", dir.display())
        }
        Err(e) => return Err(eyre!("failed to clear cache at '{}': {e}", dir.display())),
    }
    Ok(())
}
