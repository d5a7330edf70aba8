pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod loader;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExtractConfig, FetchConfig, OutputConfig, PoolConfig};
pub use error::{FailureKind, Result, TextFetchError, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    BatchProgress, BatchReport, BatchRunner, BatchSummary, ConfigSnapshot, ExtractionJob,
    JobFailure, OutputManager, TextConverter,
};
pub use fetcher::{FetchedPage, PageFetcher};
pub use loader::{LoadStats, UrlEntry, UrlList, UrlLoader};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Main library interface for TextFetch functionality
pub struct TextFetch {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl TextFetch {
    /// Create a new TextFetch instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create a new TextFetch instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create TextFetch instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            crate::cli::OutputFormat::Human => OutputMode::Human,
            crate::cli::OutputFormat::Json => OutputMode::Json,
            crate::cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Run one extraction batch over all URLs in the given input files.
    pub async fn run_batch(&self, inputs: &[PathBuf]) -> Result<BatchReport> {
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation("Loading URL lists");

        // Step 1: Load and filter the URL entries
        let url_list = self.load_urls(inputs)?;
        self.shutdown.check_shutdown()?;

        self.output_formatter
            .info(&format!("Loaded {} URL(s)", url_list.len()));

        // Step 2: Set up the output directory
        let output_manager = self.setup_output_directory()?;
        self.shutdown.check_shutdown()?;

        // Step 3: Resolve one job per URL
        let jobs: Vec<ExtractionJob> = url_list
            .entries
            .iter()
            .map(|entry| ExtractionJob {
                entry: entry.clone(),
                output_path: output_manager.resolve_output_path(&entry.raw),
            })
            .collect();

        // Step 4: Run the worker pool
        let summary = self.run_jobs(jobs, output_manager.clone()).await?;

        // Step 5: Assemble and persist the report
        let report = BatchReport {
            generated_at: Utc::now(),
            inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
            output_directory: output_manager.output_directory().display().to_string(),
            summary,
            config_used: self.create_config_snapshot(),
        };

        if self.config.output.report {
            output_manager.save_report(&report)?;
        }

        self.output_formatter.print_batch_summary(&report.summary);

        Ok(report)
    }

    /// Load URL entries, surfacing skipped-line warnings in verbose mode
    fn load_urls(&self, inputs: &[PathBuf]) -> Result<UrlList> {
        let warnings: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = warnings.clone();

        let loader = UrlLoader::new().with_warnings(move |message| {
            if let Ok(mut sink) = sink.lock() {
                sink.push(message.to_string());
            }
        });

        let url_list = loader.load_files(inputs)?;

        if let Ok(warnings) = warnings.lock() {
            for warning in warnings.iter() {
                self.output_formatter.warning(warning);
            }
        }
        self.output_formatter.debug(&url_list.stats.display_summary());

        Ok(url_list)
    }

    /// Setup output directory management
    fn setup_output_directory(&self) -> Result<OutputManager> {
        let output_manager = OutputManager::new(self.config.output.directory.clone());
        output_manager.initialize()?;

        self.output_formatter.success(&format!(
            "Initialized output directory: {}",
            output_manager.output_directory().display()
        ));

        Ok(output_manager)
    }

    /// Execute jobs with progress tracking
    async fn run_jobs(
        &self,
        jobs: Vec<ExtractionJob>,
        output_manager: OutputManager,
    ) -> Result<BatchSummary> {
        self.output_formatter.start_operation("Fetching URLs");

        let fetcher = PageFetcher::new(&self.config.fetch)?;
        let converter = TextConverter::new(self.config.extract.selector.as_deref())?;
        let runner = BatchRunner::new(fetcher, converter, self.config.pool.workers);

        let batch_progress = self.progress_manager.create_batch_progress(jobs.len() as u64);
        let progress_callback = {
            let pb = batch_progress.clone();
            move |progress: &BatchProgress| {
                ui::progress::update_batch_progress(&pb, progress);
            }
        };

        let result = runner
            .run(
                jobs,
                output_manager,
                self.shutdown.clone(),
                Some(&progress_callback),
            )
            .await;

        match result {
            Ok(summary) => {
                ui::progress::finish_progress_with_summary(
                    &batch_progress,
                    &format!("Saved {} of {} URL(s)", summary.succeeded, summary.total),
                    summary.duration,
                );
                Ok(summary)
            }
            Err(e) => {
                batch_progress.abandon_with_message("Batch aborted".to_string());
                Err(e)
            }
        }
    }

    /// Create configuration snapshot for reporting
    fn create_config_snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            workers: self.config.pool.workers,
            timeout_secs: self.config.fetch.timeout_secs,
            user_agent: self.config.fetch.user_agent.clone(),
            selector: self.config.extract.selector.clone(),
        }
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(TextFetchError::Io)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Get progress manager reference
    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &TextFetchError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Convenience function to run a batch with minimal setup
pub async fn fetch_urls_simple(
    inputs: &[PathBuf],
    output_dir: Option<&Path>,
    workers: Option<usize>,
) -> Result<BatchReport> {
    let mut config = Config::default();

    if let Some(output_path) = output_dir {
        config.output.directory = output_path.to_path_buf();
    }
    if let Some(workers) = workers {
        config.pool.workers = workers;
    }

    let textfetch = TextFetch::new(config, OutputMode::Human, 0, false)?;

    textfetch.run_batch(inputs).await
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TextFetch {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quiet_instance(config: Config) -> TextFetch {
        TextFetch::new_for_test(config, OutputMode::Plain, 0, true)
    }

    #[test]
    fn test_textfetch_creation() {
        let config = Config::default();
        let textfetch = quiet_instance(config);
        assert!(textfetch.is_running());
        assert_eq!(textfetch.config().pool.workers, 4);
    }

    #[test]
    fn test_config_snapshot_creation() {
        let mut config = Config::default();
        config.extract.selector = Some("#content".to_string());
        let textfetch = quiet_instance(config);

        let snapshot = textfetch.create_config_snapshot();
        assert_eq!(snapshot.workers, 4);
        assert_eq!(snapshot.selector.as_deref(), Some("#content"));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        let result = TextFetch::generate_sample_config(&config_path);
        assert!(result.is_ok());
        assert!(config_path.exists());

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[fetch]"));
        assert!(content.contains("[pool]"));
        assert!(content.contains("[output]"));
    }

    #[test]
    fn test_shutdown_handling() {
        let config = Config::default();
        let textfetch = quiet_instance(config);

        assert!(textfetch.is_running());

        textfetch.request_shutdown();
        assert!(!textfetch.is_running());
    }

    #[test]
    fn test_version_info() {
        let version = version_info();
        assert!(!version.is_empty());

        let build_info = build_info();
        assert!(!build_info.version.is_empty());
        assert!(!build_info.target.is_empty());
    }

    #[test]
    fn test_build_info_display() {
        let build_info = build_info();
        let display_string = build_info.to_string();
        assert!(display_string.contains("TextFetch"));
        assert!(display_string.contains(build_info.version));
    }

    #[tokio::test]
    async fn test_run_batch_end_to_end() {
        let server = MockServer::start().await;
        for route in ["/t1", "/t2", "/t3", "/t4", "/t5"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!("<body><p>content of {}</p></body>", route))
                        .insert_header("content-type", "text/html"),
                )
                .mount(&server)
                .await;
        }

        let temp_dir = TempDir::new().unwrap();
        let input_path = temp_dir.path().join("urls.txt");
        let list = format!(
            "# MITRE technique pages\n\
             {base}/t1\n\
             \n\
             {base}/t2\n\
             {base}/t3\n\
             # another comment\n\
             {base}/t4\n\
             {base}/t5\n",
            base = server.uri()
        );
        fs::write(&input_path, list).unwrap();

        let mut config = Config::default();
        config.output.directory = temp_dir.path().join("texts");
        config.pool.workers = 3;

        let textfetch = quiet_instance(config);
        let report = textfetch.run_batch(&[input_path]).await.unwrap();

        assert_eq!(report.summary.total, 5);
        assert_eq!(report.summary.succeeded, 5);
        assert_eq!(report.summary.failed, 0);

        let texts: Vec<_> = fs::read_dir(temp_dir.path().join("texts"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .collect();
        assert_eq!(texts.len(), 5);

        // Report artifacts are written under the metadata directory
        let metadata = temp_dir.path().join("texts").join(".textfetch");
        assert!(metadata.join("batch_report.json").exists());
        assert!(metadata.join("batch_report.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_input_fails_before_any_request() {
        let server = MockServer::start().await;

        let temp_dir = TempDir::new().unwrap();
        let input_path = temp_dir.path().join("urls.txt");
        fs::write(&input_path, "# comments only\n\n").unwrap();

        let mut config = Config::default();
        config.output.directory = temp_dir.path().join("texts");

        let textfetch = quiet_instance(config);
        let result = textfetch.run_batch(&[input_path]).await;

        assert!(matches!(result, Err(TextFetchError::InputEmpty { .. })));
        assert!(server.received_requests().await.unwrap().is_empty());
        // Fatal before setup: the output directory is never created
        assert!(!temp_dir.path().join("texts").exists());
    }
}
