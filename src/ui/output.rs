use crate::error::{TextFetchError, UserFriendlyError};
use crate::extractor::{BatchReport, BatchSummary};
use console::{style, Emoji, Term};
use serde_json;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");

pub struct OutputFormatter {
    #[allow(dead_code)]
    term: Term,
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            term,
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &TextFetchError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    println!();
                    if self.use_colors {
                        println!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        println!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    println!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    // Summary and reporting
    pub fn print_batch_summary(&self, summary: &BatchSummary) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => self.print_human_summary(summary),
            OutputMode::Json => self.print_json_summary(summary),
            OutputMode::Plain => self.print_plain_summary(summary),
        }
    }

    pub fn print_batch_report(&self, report: &BatchReport) {
        match self.mode {
            OutputMode::Human => self.print_human_report(report),
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {} // No separator in JSON mode
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_summary(&self, summary: &BatchSummary) {
        println!();
        self.print_separator();

        if summary.has_failures() {
            if self.use_colors {
                println!(
                    "{} {}",
                    style("Batch completed with failures").yellow().bold(),
                    WARNING
                );
            } else {
                println!("! Batch completed with failures");
            }
        } else if self.use_colors {
            println!(
                "{} {}",
                style("Batch completed successfully!").green().bold(),
                CHECKMARK
            );
        } else {
            println!("✓ Batch completed successfully!");
        }

        println!();
        println!(
            "  URLs total:  {}",
            if self.use_colors {
                style(summary.total).cyan().bold().to_string()
            } else {
                summary.total.to_string()
            }
        );
        println!(
            "  Succeeded:   {}",
            if self.use_colors {
                style(summary.succeeded).green().bold().to_string()
            } else {
                summary.succeeded.to_string()
            }
        );
        println!(
            "  Failed:      {}",
            if self.use_colors {
                style(summary.failed).red().bold().to_string()
            } else {
                summary.failed.to_string()
            }
        );
        println!(
            "  Bytes saved: {}",
            if self.use_colors {
                style(format_bytes(summary.bytes_written))
                    .cyan()
                    .bold()
                    .to_string()
            } else {
                format_bytes(summary.bytes_written)
            }
        );
        println!(
            "  Time taken:  {}",
            if self.use_colors {
                style(format_duration(summary.duration)).cyan().bold().to_string()
            } else {
                format_duration(summary.duration)
            }
        );

        if !summary.failures.is_empty() {
            println!();
            println!("  Failed URLs:");
            for failure in &summary.failures {
                println!("    [{}] {} - {}", failure.kind, failure.url, failure.message);
            }
        }

        self.print_separator();
    }

    fn print_json_summary(&self, summary: &BatchSummary) {
        let json = serde_json::json!({
            "type": "summary",
            "total": summary.total,
            "succeeded": summary.succeeded,
            "failed": summary.failed,
            "bytes_written": summary.bytes_written,
            "duration_ms": summary.duration.as_millis(),
            "failures": summary.failures,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        println!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_plain_summary(&self, summary: &BatchSummary) {
        println!("COMPLETED: URL extraction batch");
        println!("Total: {}", summary.total);
        println!("Succeeded: {}", summary.succeeded);
        println!("Failed: {}", summary.failed);
        println!("Bytes written: {}", summary.bytes_written);
        println!("Duration: {:?}", summary.duration);
        for failure in &summary.failures {
            println!("FAILED: [{}] {} - {}", failure.kind, failure.url, failure.message);
        }
    }

    fn print_human_report(&self, report: &BatchReport) {
        println!(
            "Inputs: {}",
            report.inputs.join(", ")
        );
        println!("Output directory: {}", report.output_directory);
        println!(
            "Generated at: {}",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
    }

    fn print_plain_report(&self, report: &BatchReport) {
        println!("REPORT: Batch extraction completed");
        println!("Inputs: {}", report.inputs.join(", "));
        println!("Output directory: {}", report.output_directory);
        println!("Files written: {}", report.summary.succeeded);
        println!("Failures: {}", report.summary.failed);
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::extractor::JobFailure;

    fn sample_summary(failed: bool) -> BatchSummary {
        BatchSummary {
            total: 2,
            succeeded: if failed { 1 } else { 2 },
            failed: usize::from(failed),
            bytes_written: 512,
            duration: Duration::from_secs(2),
            failures: if failed {
                vec![JobFailure {
                    url: "https://example.com/broken".to_string(),
                    kind: FailureKind::FetchTimeout,
                    message: "timed out".to_string(),
                }]
            } else {
                Vec::new()
            },
        }
    }

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!(OutputMode::from_string("human"), OutputMode::Human);
        assert_eq!(OutputMode::from_string("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_string("plain"), OutputMode::Plain);
        assert_eq!(OutputMode::from_string("invalid"), OutputMode::Human);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputMode::Human, 1, false);
        assert_eq!(formatter.mode, OutputMode::Human);
        assert_eq!(formatter.verbose_level, 1);
        assert!(!formatter.quiet);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(formatter.quiet);
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(formatter.should_show_message(2));
        assert!(!formatter.should_show_message(3));

        let quiet_formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert!(!quiet_formatter.should_show_message(0));
    }

    #[test]
    fn test_summary_printing_does_not_panic() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, false);
        formatter.print_batch_summary(&sample_summary(false));
        formatter.print_batch_summary(&sample_summary(true));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
    }
}
