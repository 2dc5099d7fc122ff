//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use modbind_core::{
    CrawlConfig, CrawlServices, StatusBus, ViewerSettings, discover_pages, run_crawl,
};
use modbind_discovery::{CredentialProbe, SnapshotProbe, StaticProbe};
use modbind_shared::{
    AppConfig, ModbindError, OutputFormat, RegionPolicy, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Bind a course module into one printable document.
#[derive(Parser)]
#[command(
    name = "modbind",
    version,
    about = "Bind every page of an LMS course module into a single printable document.",
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

/// Output format flag.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum FormatArg {
    Html,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

/// Policy flag for documents without a `<main>` region.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum MissingMainArg {
    Fail,
    Skip,
}

impl From<MissingMainArg> for RegionPolicy {
    fn from(arg: MissingMainArg) -> Self {
        match arg {
            MissingMainArg::Fail => RegionPolicy::Fail,
            MissingMainArg::Skip => RegionPolicy::Skip,
        }
    }
}

/// Where the page context comes from.
#[derive(Args, Debug)]
pub(crate) struct CredentialArgs {
    /// Course id (direct credentials).
    #[arg(long, conflicts_with = "snapshot")]
    pub course: Option<String>,

    /// Module item id the walk starts from (direct credentials).
    #[arg(long, conflicts_with = "snapshot")]
    pub item: Option<String>,

    /// Content service token (direct credentials).
    #[arg(long, env = "MODBIND_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Saved HTML of the module item page.
    #[arg(long, requires_all = ["storage", "page_url"])]
    pub snapshot: Option<PathBuf>,

    /// JSON dump of the page's localStorage/sessionStorage.
    #[arg(long, requires = "snapshot")]
    pub storage: Option<PathBuf>,

    /// URL the snapshot was taken at (carries `module_item_id`).
    #[arg(long, requires = "snapshot")]
    pub page_url: Option<String>,

    /// Bearer token for LMS API requests.
    #[arg(long, env = "MODBIND_LMS_TOKEN", hide_env_values = true)]
    pub lms_token: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a module and write the bound document.
    Crawl {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Output file (defaults to <output.dir>/module-<course>.<ext>).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format (overrides config).
        #[arg(short, long)]
        format: Option<FormatArg>,

        /// What to do with pages lacking a <main> region (overrides config).
        #[arg(long)]
        on_missing_main: Option<MissingMainArg>,

        /// Document title (defaults to one naming the course).
        #[arg(long)]
        title: Option<String>,
    },

    /// Walk the module and print its page ids, one per line.
    Discover {
        #[command(flatten)]
        credentials: CredentialArgs,
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
        0 => "modbind=info",
        1 => "modbind=debug",
        _ => "modbind=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `discover` output stays pipeable.
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
    match cli.command {
        Command::Crawl {
            credentials,
            out,
            format,
            on_missing_main,
            title,
        } => {
            cmd_crawl(
                credentials,
                out.as_deref(),
                format.map(Into::into),
                on_missing_main.map(Into::into),
                title,
            )
            .await
        }
        Command::Discover { credentials } => cmd_discover(credentials).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_crawl(
    credentials: CredentialArgs,
    out: Option<&Path>,
    format: Option<OutputFormat>,
    on_missing_main: Option<RegionPolicy>,
    title: Option<String>,
) -> Result<()> {
    let config = load_config()?;
    let format = format.unwrap_or(config.output.format);

    let lms_token = credentials.lms_token.clone();
    let probe = build_probe(credentials, &config)?;
    let services = CrawlServices::from_config(&config, probe, lms_token)?;

    let crawl_config = CrawlConfig {
        max_steps: config.traversal.max_steps,
        viewer: ViewerSettings {
            format,
            policy: on_missing_main.unwrap_or(config.output.on_missing_main),
            title,
        },
    };

    info!(format = ?format, "crawling module");

    let bus = StatusBus::new();
    let spinner = StatusSpinner::new()?;
    let follower = spinner.follow(&bus);

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_ctrl_c(cancel.clone());

    let result = run_crawl(&services, &crawl_config, &bus, &cancel).await;

    interrupt.abort();
    follower.abort();
    spinner.finish();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ModbindError::Cancelled) => {
            println!("Crawl cancelled.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let path = match out {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(&config.output.dir).join(format!(
            "module-{}.{}",
            outcome.course,
            outcome.document.format.extension()
        )),
    };
    write_document(&path, &outcome.document.body)?;

    if !outcome.skipped.is_empty() {
        warn!(skipped = ?outcome.skipped, "some pages had no main region and were left out");
    }

    // Print summary
    println!();
    println!("  Module bound successfully!");
    println!("  Crawl:  {}", outcome.crawl_id);
    println!("  Course: {}", outcome.course);
    println!("  Pages:  {}", outcome.page_count);
    if !outcome.skipped.is_empty() {
        println!("  Skipped: {}", outcome.skipped.len());
    }
    println!("  Output: {}", path.display());
    println!("  Time:   {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_discover(credentials: CredentialArgs) -> Result<()> {
    let config = load_config()?;

    let lms_token = credentials.lms_token.clone();
    let probe = build_probe(credentials, &config)?;
    let services = CrawlServices::from_config(&config, probe, lms_token)?;

    let bus = StatusBus::new();
    let spinner = StatusSpinner::new()?;
    let follower = spinner.follow(&bus);

    let result = discover_pages(&services, config.traversal.max_steps, &bus).await;

    follower.abort();
    spinner.finish();

    let request = result?;
    for page_id in &request.page_ids {
        println!("{page_id}");
    }

    Ok(())
}

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

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pick the credential probe from the flags given.
fn build_probe(args: CredentialArgs, config: &AppConfig) -> Result<Arc<dyn CredentialProbe>> {
    if let Some(snapshot) = args.snapshot {
        let storage = args
            .storage
            .ok_or_else(|| eyre!("--snapshot needs --storage"))?;
        let page_url = args
            .page_url
            .ok_or_else(|| eyre!("--snapshot needs --page-url"))?;

        let probe = SnapshotProbe::from_files(
            &snapshot,
            &storage,
            &page_url,
            &config.content_service.client_id,
        )?;
        return Ok(Arc::new(probe));
    }

    match (args.course, args.item, args.token) {
        (Some(course_id), Some(start_item_id), Some(token)) => Ok(Arc::new(StaticProbe {
            course_id,
            token,
            start_item_id,
        })),
        _ => Err(eyre!(
            "no credentials: pass --course, --item and --token (or MODBIND_TOKEN), \
             or --snapshot with --storage and --page-url"
        )),
    }
}

fn write_document(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| eyre!("cannot create {}: {e}", parent.display()))?;
    }
    std::fs::write(path, body).map_err(|e| eyre!("cannot write {}: {e}", path.display()))?;
    info!(path = %path.display(), bytes = body.len(), "document written");
    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling crawl");
            token.cancel();
        }
    })
}

// ---------------------------------------------------------------------------
// CLI status display
// ---------------------------------------------------------------------------

/// Spinner showing the latest status event.
struct StatusSpinner {
    spinner: ProgressBar,
}

impl StatusSpinner {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Ok(Self { spinner })
    }

    /// Mirror `bus` onto the spinner until the returned task is aborted.
    fn follow(&self, bus: &StatusBus) -> JoinHandle<()> {
        let spinner = self.spinner.clone();
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => spinner.set_message(event.status),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
