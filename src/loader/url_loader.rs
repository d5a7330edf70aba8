use crate::error::{Result, TextFetchError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

const COMMENT_MARKER: char = '#';

/// One URL taken from an input list file.
///
/// `raw` is the trimmed line as it appeared in the file; output naming is
/// derived from it so filenames stay stable regardless of URL normalization.
#[derive(Debug, Clone)]
pub struct UrlEntry {
    pub raw: String,
    pub url: Url,
    pub source: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub files_read: usize,
    pub lines_total: usize,
    pub skipped_blank_or_comment: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
}

impl LoadStats {
    pub fn display_summary(&self) -> String {
        format!(
            "Read {} file(s), {} line(s): {} blank/comment, {} invalid, {} duplicate",
            self.files_read,
            self.lines_total,
            self.skipped_blank_or_comment,
            self.skipped_invalid,
            self.skipped_duplicate
        )
    }
}

/// Ordered, de-duplicated URL entries plus loading statistics.
#[derive(Debug, Clone)]
pub struct UrlList {
    pub entries: Vec<UrlEntry>,
    pub stats: LoadStats,
}

impl UrlList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct UrlLoader {
    warn_callback: Option<Box<dyn Fn(&str)>>,
}

impl UrlLoader {
    pub fn new() -> Self {
        Self {
            warn_callback: None,
        }
    }

    /// Receive a warning message for each skipped invalid line.
    pub fn with_warnings<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        self.warn_callback = Some(Box::new(callback));
        self
    }

    /// Load URL entries from several input files in order.
    ///
    /// Duplicate URLs (first-seen wins) are dropped so each distinct URL maps
    /// to exactly one extraction job and one output file. Fails with
    /// `InputNotFound` for a missing file and `InputEmpty` when no valid URLs
    /// remain after filtering.
    pub fn load_files(&self, paths: &[PathBuf]) -> Result<UrlList> {
        let mut entries = Vec::new();
        let mut stats = LoadStats::default();
        let mut seen: HashSet<String> = HashSet::new();

        for path in paths {
            self.load_file(path, &mut entries, &mut seen, &mut stats)?;
        }

        if entries.is_empty() {
            return Err(TextFetchError::InputEmpty {
                path: display_paths(paths),
            });
        }

        Ok(UrlList { entries, stats })
    }

    fn load_file(
        &self,
        path: &Path,
        entries: &mut Vec<UrlEntry>,
        seen: &mut HashSet<String>,
        stats: &mut LoadStats,
    ) -> Result<()> {
        if !path.exists() {
            return Err(TextFetchError::InputNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        stats.files_read += 1;

        for (index, line) in content.lines().enumerate() {
            stats.lines_total += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
                stats.skipped_blank_or_comment += 1;
                continue;
            }

            let url = match parse_http_url(trimmed) {
                Ok(url) => url,
                Err(reason) => {
                    stats.skipped_invalid += 1;
                    self.warn(&format!(
                        "{}:{}: skipping {}: {}",
                        path.display(),
                        index + 1,
                        trimmed,
                        reason
                    ));
                    continue;
                }
            };

            if !seen.insert(trimmed.to_string()) {
                stats.skipped_duplicate += 1;
                continue;
            }

            entries.push(UrlEntry {
                raw: trimmed.to_string(),
                url,
                source: path.to_path_buf(),
                line: index + 1,
            });
        }

        Ok(())
    }

    fn warn(&self, message: &str) {
        if let Some(ref callback) = self.warn_callback {
            callback(message);
        }
    }
}

impl Default for UrlLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a line as an absolute http(s) URL, rejecting everything else.
pub fn parse_http_url(s: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(s).map_err(|e| e.to_string())?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme: {}", other)),
    }

    if url.host_str().is_none() {
        return Err("missing hostname".to_string());
    }

    Ok(url)
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
