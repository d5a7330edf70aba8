use crate::config::FetchConfig;
use crate::error::{Result, TextFetchError};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A successfully fetched page body plus the metadata the converter needs.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL as requested (before redirects).
    pub url: String,
    /// The URL the body was ultimately served from.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

/// HTTP fetcher wrapping a shared `reqwest` client.
///
/// The client carries the timeout, so a hung server stalls only the worker
/// holding this fetch, never the pool.
pub struct PageFetcher {
    client: Client,
    timeout_secs: u64,
}

impl PageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TextFetchError::Setup {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    /// GET a single URL, returning its decoded text body.
    ///
    /// Non-2xx statuses, connection and DNS failures map to `Fetch`;
    /// deadline overruns map to `FetchTimeout`.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TextFetchError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let final_url = response.url().to_string();

        let body = response
            .text()
            .await
            .map_err(|e| self.classify_error(url, e))?;

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    fn classify_error(&self, url: &Url, error: reqwest::Error) -> TextFetchError {
        if error.is_timeout() {
            TextFetchError::FetchTimeout {
                url: url.to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            TextFetchError::Fetch {
                url: url.to_string(),
                message: error_summary(&error),
            }
        }
    }
}

/// Flatten reqwest's error chain into one line for the batch report.
fn error_summary(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message = format!("{}: {}", message, cause);
        source = cause.source();
    }
    message
}
