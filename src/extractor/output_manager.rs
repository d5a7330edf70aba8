use crate::error::{Result, TextFetchError};
use crate::extractor::BatchSummary;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Longest slug kept before the hash suffix; keeps the whole filename far
/// under common filesystem limits.
const MAX_SLUG_LEN: usize = 140;

/// Hex characters of the URL digest appended to every filename.
const HASH_SUFFIX_LEN: usize = 8;

const METADATA_DIR: &str = ".textfetch";

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("valid scheme regex"));
static INVALID_CHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid charset regex"));

/// Machine-readable record of one batch run, persisted under the output
/// directory's metadata folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub inputs: Vec<String>,
    pub output_directory: String,
    pub summary: BatchSummary,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub workers: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub selector: Option<String>,
}

/// Owns the output directory: creation, per-URL path resolution, atomic
/// text writes, and report persistence.
#[derive(Debug, Clone)]
pub struct OutputManager {
    output_directory: PathBuf,
}

impl OutputManager {
    pub fn new(output_directory: PathBuf) -> Self {
        Self { output_directory }
    }

    /// Create the output and metadata directories and probe writability.
    ///
    /// Creation is idempotent, so re-running a batch reuses the directory.
    pub fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.output_directory).map_err(|e| TextFetchError::Setup {
            message: format!(
                "cannot create output directory {}: {}",
                self.output_directory.display(),
                e
            ),
        })?;

        fs::create_dir_all(self.metadata_dir()).map_err(|e| TextFetchError::Setup {
            message: format!(
                "cannot create metadata directory {}: {}",
                self.metadata_dir().display(),
                e
            ),
        })?;

        let probe = self.output_directory.join(".textfetch_write_test");
        match fs::File::create(&probe) {
            Ok(_) => {
                let _ = fs::remove_file(&probe);
            }
            Err(e) => {
                return Err(TextFetchError::Setup {
                    message: format!(
                        "no write permission for directory {}: {}",
                        self.output_directory.display(),
                        e
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.output_directory.join(METADATA_DIR)
    }

    /// Map a URL to its output file path. Pure and stable across runs.
    pub fn resolve_output_path(&self, url: &str) -> PathBuf {
        self.output_directory.join(file_name_for_url(url))
    }

    /// Write `text` to `path` atomically: the content lands in a temp file
    /// in the same directory and is renamed over the target, so a crashed
    /// or cancelled run never leaves a half-written output visible.
    pub async fn write_text(&self, path: &Path, text: &str) -> Result<u64> {
        let tmp_path = path.with_extension("txt.tmp");

        let write_err = |e: std::io::Error| TextFetchError::Write {
            path: path.display().to_string(),
            source: e,
        };

        tokio::fs::write(&tmp_path, text.as_bytes())
            .await
            .map_err(write_err)?;

        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }

        Ok(text.len() as u64)
    }

    /// Persist the batch report as JSON and as a readable text file.
    pub fn save_report(&self, report: &BatchReport) -> Result<()> {
        self.save_report_json(report)?;
        self.save_report_text(report)?;
        Ok(())
    }

    fn save_report_json(&self, report: &BatchReport) -> Result<()> {
        let report_path = self.metadata_dir().join("batch_report.json");
        let json_content =
            serde_json::to_string_pretty(report).map_err(|e| TextFetchError::Config {
                message: format!("Failed to serialize report to JSON: {}", e),
            })?;

        fs::write(&report_path, json_content).map_err(TextFetchError::Io)?;

        Ok(())
    }

    fn save_report_text(&self, report: &BatchReport) -> Result<()> {
        let report_path = self.metadata_dir().join("batch_report.txt");
        let mut file = fs::File::create(&report_path).map_err(TextFetchError::Io)?;

        writeln!(file, "TextFetch Batch Report")?;
        writeln!(file, "======================")?;
        writeln!(file)?;
        writeln!(
            file,
            "Generated at: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(file, "Inputs: {}", report.inputs.join(", "))?;
        writeln!(file, "Output directory: {}", report.output_directory)?;
        writeln!(file)?;

        writeln!(file, "Summary:")?;
        writeln!(file, "  Total URLs:  {}", report.summary.total)?;
        writeln!(file, "  Succeeded:   {}", report.summary.succeeded)?;
        writeln!(file, "  Failed:      {}", report.summary.failed)?;
        writeln!(file, "  Bytes saved: {}", report.summary.bytes_written)?;
        writeln!(file, "  Duration:    {:?}", report.summary.duration)?;
        writeln!(file)?;

        writeln!(file, "Configuration used:")?;
        writeln!(file, "  Workers: {}", report.config_used.workers)?;
        writeln!(file, "  Timeout: {}s", report.config_used.timeout_secs)?;
        writeln!(file, "  User agent: {}", report.config_used.user_agent)?;
        if let Some(ref selector) = report.config_used.selector {
            writeln!(file, "  Selector: {}", selector)?;
        }
        writeln!(file)?;

        if !report.summary.failures.is_empty() {
            writeln!(file, "Failed URLs (retry these):")?;
            for failure in &report.summary.failures {
                writeln!(
                    file,
                    "  [{}] {} - {}",
                    failure.kind, failure.url, failure.message
                )?;
            }
        }

        Ok(())
    }
}

/// Derive the filesystem-safe output name for a URL.
///
/// The slug follows the URL shape (scheme stripped, query/fragment dropped,
/// separators flattened, tail-truncated); the digest suffix keeps distinct
/// URLs from ever colliding after sanitization.
pub fn file_name_for_url(url: &str) -> String {
    let without_scheme = SCHEME_RE.replace(url, "");
    let without_query = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .to_string();

    let flattened = without_query.replace('/', "_");
    let sanitized = INVALID_CHAR_RE.replace_all(&flattened, "_");

    // Keep the tail: trailing path segments are the distinctive part.
    let slug = if sanitized.len() > MAX_SLUG_LEN {
        &sanitized[sanitized.len() - MAX_SLUG_LEN..]
    } else {
        &sanitized[..]
    };
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "page" } else { slug };

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{}-{}.txt", slug, &digest[..HASH_SUFFIX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::extractor::JobFailure;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_summary() -> BatchSummary {
        BatchSummary {
            total: 3,
            succeeded: 2,
            failed: 1,
            bytes_written: 2048,
            duration: Duration::from_secs(4),
            failures: vec![JobFailure {
                url: "https://example.com/broken".to_string(),
                kind: FailureKind::Fetch,
                message: "HTTP 500".to_string(),
            }],
        }
    }

    fn sample_report() -> BatchReport {
        BatchReport {
            generated_at: Utc::now(),
            inputs: vec!["urls.txt".to_string()],
            output_directory: "texts".to_string(),
            summary: sample_summary(),
            config_used: ConfigSnapshot {
                workers: 4,
                timeout_secs: 30,
                user_agent: "textfetch-test/0".to_string(),
                selector: None,
            },
        }
    }

    #[test]
    fn test_file_name_is_stable() {
        let url = "https://attack.mitre.org/techniques/T1055/012/";
        assert_eq!(file_name_for_url(url), file_name_for_url(url));
    }

    #[test]
    fn test_file_name_shape() {
        let name = file_name_for_url("https://attack.mitre.org/techniques/T1055/");
        assert!(name.starts_with("attack.mitre.org_techniques_T1055"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_distinct_urls_never_collide() {
        // Sanitization alone would map both to the same slug.
        let a = file_name_for_url("https://example.com/a/b");
        let b = file_name_for_url("https://example.com/a_b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_and_fragment_dropped() {
        let base = file_name_for_url("https://example.com/page");
        let with_query = file_name_for_url("https://example.com/page?session=1");
        // The slug matches, the digest keeps them distinct.
        assert_eq!(
            base.rsplit_once('-').unwrap().0,
            with_query.rsplit_once('-').unwrap().0
        );
        assert_ne!(base, with_query);
    }

    #[test]
    fn test_long_url_is_truncated() {
        let long_path = "x/".repeat(400);
        let name = file_name_for_url(&format!("https://example.com/{}", long_path));
        assert!(name.len() <= MAX_SLUG_LEN + HASH_SUFFIX_LEN + 5);
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_degenerate_url_still_named() {
        let name = file_name_for_url("https://");
        assert!(name.starts_with("page-"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let manager = OutputManager::new(dir.path().join("out"));

        manager.initialize().unwrap();
        manager.initialize().unwrap();

        assert!(manager.output_directory().exists());
        assert!(manager.metadata_dir().exists());
    }

    #[tokio::test]
    async fn test_atomic_write_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let manager = OutputManager::new(dir.path().to_path_buf());
        manager.initialize().unwrap();

        let path = manager.resolve_output_path("https://example.com/page");

        let bytes = manager.write_text(&path, "first version").await.unwrap();
        assert_eq!(bytes, "first version".len() as u64);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first version");

        manager.write_text(&path, "second version").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second version");

        // No temp file left behind
        assert!(!path.with_extension("txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let manager = OutputManager::new(dir.path().join("never-created"));

        let path = manager.resolve_output_path("https://example.com/page");
        let result = manager.write_text(&path, "content").await;

        assert!(matches!(result, Err(TextFetchError::Write { .. })));
    }

    #[test]
    fn test_report_persistence() {
        let dir = TempDir::new().unwrap();
        let manager = OutputManager::new(dir.path().join("out"));
        manager.initialize().unwrap();

        manager.save_report(&sample_report()).unwrap();

        let json_path = manager.metadata_dir().join("batch_report.json");
        let text_path = manager.metadata_dir().join("batch_report.txt");
        assert!(json_path.exists());
        assert!(text_path.exists());

        let json = std::fs::read_to_string(json_path).unwrap();
        let parsed: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.failed, 1);
        assert_eq!(parsed.summary.failures[0].kind, FailureKind::Fetch);

        let text = std::fs::read_to_string(text_path).unwrap();
        assert!(text.contains("Failed URLs"));
        assert!(text.contains("https://example.com/broken"));
    }
}
