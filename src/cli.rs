use crate::config::{CliOverrides, Config};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "textfetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch web pages in bulk and save them as plain text files")]
#[command(
    long_about = "TextFetch reads one or more URL list files, fetches every page over \
                       HTTP(S) with a bounded worker pool, converts the markup to plain text \
                       and writes one deterministically named .txt file per URL."
)]
#[command(after_help = "EXAMPLES:\n  \
    textfetch --inputs urls.txt --output texts\n  \
    textfetch -i technique_urls.txt -i mitigation_urls.txt -o texts -w 6\n  \
    textfetch -i urls.txt -o texts --selector '#content > .row' --timeout 10\n  \
    textfetch -i urls.txt -o texts --output-format json --quiet\n\n\
    For more information, visit: https://github.com/user/textfetch")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input files with one URL per line (blank lines and # comments skipped)
    #[arg(
        short,
        long,
        value_name = "FILE",
        num_args = 1..,
        required_unless_present = "generate_config"
    )]
    pub inputs: Vec<PathBuf>,

    /// Output directory for the per-URL text files (created if missing)
    #[arg(
        short,
        long,
        value_name = "DIR",
        required_unless_present = "generate_config"
    )]
    pub output: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-fetch timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// CSS selector to scope extraction (default: whole document)
    #[arg(long, value_name = "CSS")]
    pub selector: Option<String>,

    /// User-Agent header sent with each request
    #[arg(long, value_name = "STRING")]
    pub user_agent: Option<String>,

    /// Skip writing the batch report files under the output directory
    #[arg(long)]
    pub no_report: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (load inputs and show the plan without fetching)
    #[arg(long, help = "Show what would be fetched without making any requests")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> crate::error::Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_workers(self.workers)
            .with_timeout(self.timeout)
            .with_user_agent(self.user_agent.clone())
            .with_selector(self.selector.clone())
            .with_output_dir(self.output.clone())
            .with_report(if self.no_report { Some(false) } else { None })
    }

    pub fn should_use_colors(&self) -> bool {
        !self.quiet && console::Term::stdout().features().colors_supported()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
