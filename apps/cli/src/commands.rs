//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use courtdocs_core::invocation::{Invocation, validate_url};
use courtdocs_core::pipeline::{ProgressReporter, RunPhase, ScrapeCaseConfig, scrape_case};
use courtdocs_shared::{
    AppConfig, OutputMode, ScrapeConfig, ScrapeResult, init_config, init_config_at, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// courtdocs: pull the documents of a court case into plain text.
#[derive(Parser)]
#[command(
    name = "courtdocs",
    version,
    about = "Download the PDF filings of a Texas court case page and extract their text.",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
pub(crate) struct Cli {
    /// Case page URL. Prompts interactively when omitted.
    #[arg(long)]
    pub url: Option<String>,

    /// Output directory (defaults to court_case_<case number>).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write one text file per document.
    #[arg(long, conflicts_with = "merged")]
    pub separate: bool,

    /// Write a single merged file with document delimiters.
    #[arg(long)]
    pub merged: bool,

    /// Config file to use instead of ~/.courtdocs/courtdocs.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
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
        0 => "courtdocs=info",
        1 => "courtdocs=debug",
        _ => "courtdocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(&resolve_config(config_path)?),
        },
        None => {
            let config = resolve_config(config_path)?;
            let flag_mode = flag_mode(cli.separate, cli.merged);
            cmd_scrape(cli.url, cli.output_dir, flag_mode, &config).await
        }
    }
}

/// Load `--config` when given, otherwise the default config file.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Mode chosen by `--separate` / `--merged`, if any.
fn flag_mode(separate: bool, merged: bool) -> Option<OutputMode> {
    match (separate, merged) {
        (_, true) => Some(OutputMode::Merged),
        (true, false) => Some(OutputMode::Separate),
        (false, false) => None,
    }
}

// ---------------------------------------------------------------------------
// Scrape
// ---------------------------------------------------------------------------

async fn cmd_scrape(
    url: Option<String>,
    output_dir: Option<PathBuf>,
    flag_mode: Option<OutputMode>,
    config: &AppConfig,
) -> Result<()> {
    let scrape = ScrapeConfig::from(config);

    let (url, mode) = match url {
        Some(url) => (url, flag_mode.unwrap_or(config.defaults.mode)),
        None => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stdout();
            writeln!(output, "=== Texas Court PDF Scraper ===")?;
            writeln!(output)?;
            let url = prompt_url(&mut input, &mut output, &scrape.allowed_hosts)?;
            let mode = match flag_mode {
                Some(mode) => mode,
                None => prompt_mode(&mut input, &mut output)?,
            };
            (url, mode)
        }
    };

    let request = Invocation::Command {
        url,
        merged: mode == OutputMode::Merged,
    }
    .into_request(&scrape.allowed_hosts)
    .map_err(|e| eyre!("{e}"))?;

    let output_root = output_dir
        .or_else(|| config.defaults.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| default_output_dir(request.url.as_str()));

    println!();
    println!("  Output directory: {}", output_root.display());
    println!("  Output format:    {}", format_label(request.mode));
    println!();

    info!(url = %request.url, mode = %request.mode, "starting scrape");

    let run_config = ScrapeCaseConfig {
        url: request.url,
        output_root: output_root.clone(),
        mode: request.mode,
        scrape,
    };

    let reporter = CliProgress::new();
    let result = scrape_case(&run_config, &reporter).await;
    reporter.spinner.finish_and_clear();
    let result = result?;

    print_summary(&result, &output_root);
    Ok(())
}

/// Ask for a case URL until one passes validation.
fn prompt_url(
    input: &mut impl BufRead,
    output: &mut impl Write,
    allowed_hosts: &[String],
) -> Result<String> {
    loop {
        write!(output, "Enter the Texas court case URL: ")?;
        output.flush()?;

        let line = read_line(input)?;
        if line.is_empty() {
            writeln!(output, "Please enter a valid URL.")?;
            continue;
        }

        match validate_url(&line, allowed_hosts) {
            Ok(_) => return Ok(line),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}

/// Ask for the output format (`1` separate, `2` merged).
fn prompt_mode(input: &mut impl BufRead, output: &mut impl Write) -> Result<OutputMode> {
    writeln!(output)?;
    writeln!(output, "Choose output format:")?;
    writeln!(output, "1. Separate text files (one per PDF)")?;
    writeln!(output, "2. Single merged file with document separators")?;

    loop {
        write!(output, "Enter choice (1 or 2): ")?;
        output.flush()?;

        match read_line(input)?.as_str() {
            "1" => return Ok(OutputMode::Separate),
            "2" => return Ok(OutputMode::Merged),
            _ => writeln!(output, "Please enter 1 or 2.")?,
        }
    }
}

fn read_line(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(eyre!("input closed before a value was entered"));
    }
    Ok(line.trim().to_string())
}

/// Output root derived from the case number (`cn`) query parameter.
fn default_output_dir(url: &str) -> PathBuf {
    let Ok(parsed) = Url::parse(url) else {
        return PathBuf::from("court_case_documents");
    };

    let case_number = parsed
        .query_pairs()
        .find(|(key, _)| key == "cn")
        .map(|(_, value)| value.replace('-', "_"));

    match case_number {
        Some(cn) if !cn.is_empty() => PathBuf::from(format!("court_case_{cn}")),
        _ => PathBuf::from("court_case_unknown"),
    }
}

fn format_label(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Separate => "Separate files",
        OutputMode::Merged => "Merged file",
    }
}

fn print_summary(result: &ScrapeResult, output_root: &Path) {
    println!();
    println!("  === SUMMARY ===");
    println!("  Links found:       {}", result.references_found);
    println!("  PDFs downloaded:   {}", result.downloaded.len());
    match result.mode {
        OutputMode::Merged => match &result.merged_artifact {
            Some(path) => {
                println!("  Merged file created: Yes");
                println!("  Merged file:       {}", path.display());
            }
            None => println!("  Merged file created: No"),
        },
        OutputMode::Separate => {
            println!("  Text files created: {}", result.produced_artifacts.len());
        }
    }
    println!("  Output directory:  {}", output_root.display());
    println!();
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
    fn phase(&self, phase: RunPhase) {
        self.spinner.set_message(phase.to_string());
    }

    fn document_started(&self, current: usize, total: usize, label: &str) {
        self.spinner
            .set_message(format!("Processing PDF [{current}/{total}] {label}"));
    }

    fn done(&self, _result: &ScrapeResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Write defaults to `--config` (or the default location) without reading what is there.
fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => init_config_at(path)?,
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
