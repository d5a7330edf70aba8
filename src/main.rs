use clap::Parser;
use std::process;
use textfetch::{
    Cli, OutputFormatter, OutputMode, TextFetch, TextFetchError, UrlLoader, UserFriendlyError,
};

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    // Create TextFetch instance
    let textfetch = match TextFetch::from_cli(&cli) {
        Ok(textfetch) => textfetch,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    // Handle dry run mode
    if cli.dry_run {
        return handle_dry_run(&cli, &textfetch);
    }

    // Execute main extraction workflow
    match textfetch.run_batch(&cli.inputs).await {
        Ok(report) => {
            // Display final report based on output format
            textfetch.output_formatter().print_batch_report(&report);

            if report.summary.has_failures() {
                2 // Batch completed, some jobs failed
            } else {
                0 // Full success
            }
        }
        Err(e) => {
            textfetch.handle_error(&e);

            // Map error types to appropriate exit codes
            match e {
                TextFetchError::Cancelled => 130, // Interrupted (SIGINT)
                TextFetchError::InputNotFound { .. } => 3,
                TextFetchError::InputEmpty { .. } => 4,
                TextFetchError::InvalidUrl { .. } => 5,
                TextFetchError::Setup { .. } => 6,
                _ => 1, // General error
            }
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "textfetch.toml".to_string());

    match TextFetch::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  textfetch -i urls.txt -o texts --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(cli: &Cli, textfetch: &TextFetch) -> i32 {
    let formatter = textfetch.output_formatter();

    formatter.info("DRY RUN MODE - No URLs will be fetched");
    formatter.print_separator();

    // Display configuration that would be used
    formatter.info("Configuration that would be used:");
    let config = textfetch.config();

    println!("  Workers: {}", config.pool.workers);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  User agent: {}", config.fetch.user_agent);
    if let Some(ref selector) = config.extract.selector {
        println!("  Selector: {}", selector);
    }
    println!("  Output directory: {}", config.output.directory.display());

    formatter.print_separator();

    // Load the URL lists without touching the network
    let url_list = match UrlLoader::new().load_files(&cli.inputs) {
        Ok(list) => list,
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            return match e {
                TextFetchError::InputNotFound { .. } => 3,
                TextFetchError::InputEmpty { .. } => 4,
                _ => 1,
            };
        }
    };

    formatter.info("Extraction plan:");
    println!("  URLs to fetch: {}", url_list.len());
    println!("  {}", url_list.stats.display_summary());

    let preview = url_list.entries.iter().take(5);
    println!("  Sample output files:");
    for entry in preview {
        println!(
            "    {} -> {}",
            entry.raw,
            textfetch::extractor::file_name_for_url(&entry.raw)
        );
    }
    if url_list.len() > 5 {
        println!("    ... and {} more", url_list.len() - 5);
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to perform the actual extraction");

    0
}

fn print_startup_error(error: &TextFetchError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use textfetch::cli::OutputFormat;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli {
            inputs: Vec::new(),
            output: None,
            workers: None,
            timeout: None,
            selector: None,
            user_agent: None,
            no_report: false,
            config: Some(config_path.clone()),
            output_format: OutputFormat::Human,
            verbose: 0,
            quiet: false,
            dry_run: false,
            generate_config: true,
        };

        let exit_code = handle_generate_config(&cli);
        assert_eq!(exit_code, 0);
        assert!(config_path.exists());

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[fetch]"));
        assert!(content.contains("[pool]"));
    }
}
