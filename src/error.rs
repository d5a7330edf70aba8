use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextFetchError {
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("No valid URLs found in input: {path}")]
    InputEmpty { path: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("Fetch timed out after {seconds} seconds: {url}")]
    FetchTimeout { url: String, seconds: u64 },

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Conversion failed for {url}: {message}")]
    Conversion { url: String, message: String },

    #[error("Write failed for {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Setup failed: {message}")]
    Setup { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation was cancelled by user")]
    Cancelled,
}

/// Category of a per-job failure, carried into the batch report so a user
/// can retry just the affected URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    FetchTimeout,
    Fetch,
    Conversion,
    Write,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::FetchTimeout => "fetch-timeout",
            FailureKind::Fetch => "fetch",
            FailureKind::Conversion => "conversion",
            FailureKind::Write => "write",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl TextFetchError {
    /// Classify a job-scope error for the batch summary. Fatal variants never
    /// reach this point; anything unexpected is treated as a fetch failure.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TextFetchError::FetchTimeout { .. } => FailureKind::FetchTimeout,
            TextFetchError::Conversion { .. } => FailureKind::Conversion,
            TextFetchError::Write { .. } | TextFetchError::Io(_) => FailureKind::Write,
            _ => FailureKind::Fetch,
        }
    }

    /// Whether this error aborts the batch before any jobs run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TextFetchError::InputNotFound { .. }
                | TextFetchError::InputEmpty { .. }
                | TextFetchError::InvalidUrl { .. }
                | TextFetchError::Setup { .. }
                | TextFetchError::Config { .. }
                | TextFetchError::Cancelled
        )
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for TextFetchError {
    fn user_message(&self) -> String {
        match self {
            TextFetchError::InputNotFound { path } => {
                format!("Input file not found: {}", path)
            }
            TextFetchError::InputEmpty { path } => {
                format!("No valid URLs found in input: {}", path)
            }
            TextFetchError::InvalidUrl { url } => {
                format!("Invalid URL: {}", url)
            }
            TextFetchError::FetchTimeout { url, seconds } => {
                format!("Fetch timed out after {} seconds: {}", seconds, url)
            }
            TextFetchError::Fetch { url, message } => {
                format!("Fetch failed for {}: {}", url, message)
            }
            TextFetchError::Conversion { url, message } => {
                format!("Could not convert {} to text: {}", url, message)
            }
            TextFetchError::Write { path, source } => {
                format!("Failed to write {}: {}", path, source)
            }
            TextFetchError::Setup { message } => {
                format!("Setup failed: {}", message)
            }
            TextFetchError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            TextFetchError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            TextFetchError::InputNotFound { .. } => Some(
                "Check the path passed to --inputs. Each input file should contain one URL per line.".to_string()
            ),
            TextFetchError::InputEmpty { .. } => Some(
                "The input file(s) contained no usable URLs after skipping blanks and # comments. Add at least one http(s) URL.".to_string()
            ),
            TextFetchError::InvalidUrl { .. } => Some(
                "Only http:// and https:// URLs are supported.".to_string()
            ),
            TextFetchError::FetchTimeout { .. } => Some(
                "The server took too long to respond. Increase the limit with --timeout and retry the failed URLs.".to_string()
            ),
            TextFetchError::Fetch { .. } => Some(
                "Check your internet connection and that the URL is reachable. Failed URLs are listed in the batch report for retry.".to_string()
            ),
            TextFetchError::Setup { .. } => Some(
                "Ensure the output directory is writable and its parent exists.".to_string()
            ),
            TextFetchError::Config { .. } => Some(
                "Check your configuration file syntax. Generate a fresh template with --generate-config.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<url::ParseError> for TextFetchError {
    fn from(_: url::ParseError) -> Self {
        TextFetchError::InvalidUrl {
            url: "invalid URL".to_string(),
        }
    }
}

impl From<toml::de::Error> for TextFetchError {
    fn from(error: toml::de::Error) -> Self {
        TextFetchError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TextFetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = TextFetchError::InputNotFound {
            path: "urls.txt".to_string(),
        };
        assert!(error.user_message().contains("Input file not found"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_failure_kind_classification() {
        let timeout = TextFetchError::FetchTimeout {
            url: "https://example.com".to_string(),
            seconds: 30,
        };
        assert_eq!(timeout.failure_kind(), FailureKind::FetchTimeout);

        let conversion = TextFetchError::Conversion {
            url: "https://example.com".to_string(),
            message: "binary payload".to_string(),
        };
        assert_eq!(conversion.failure_kind(), FailureKind::Conversion);

        let write = TextFetchError::Write {
            path: "out.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(write.failure_kind(), FailureKind::Write);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TextFetchError::InputEmpty {
            path: "urls.txt".to_string()
        }
        .is_fatal());
        assert!(!TextFetchError::Fetch {
            url: "https://example.com".to_string(),
            message: "HTTP 404".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_failure_kind_label() {
        assert_eq!(FailureKind::FetchTimeout.label(), "fetch-timeout");
        assert_eq!(FailureKind::Conversion.to_string(), "conversion");
    }
}
