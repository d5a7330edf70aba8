use crate::error::{Result, TextFetchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_redirects: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// Optional CSS selector; when set, only text inside matching elements
    /// is extracted.
    pub selector: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub report: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: default_user_agent(),
            max_redirects: 5,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("text_outputs"),
            report: true,
        }
    }
}

pub fn default_user_agent() -> String {
    concat!("textfetch/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TextFetchError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TextFetchError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| TextFetchError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["textfetch.toml", "textfetch.config.toml", ".textfetch.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(workers) = cli_args.workers {
            self.pool.workers = workers;
        }

        if let Some(timeout) = cli_args.timeout {
            self.fetch.timeout_secs = timeout;
        }

        if let Some(ref user_agent) = cli_args.user_agent {
            self.fetch.user_agent = user_agent.clone();
        }

        if let Some(ref selector) = cli_args.selector {
            self.extract.selector = Some(selector.clone());
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.directory = output_dir.clone();
        }

        if let Some(report) = cli_args.report {
            self.output.report = report;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| TextFetchError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| TextFetchError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool.workers == 0 {
            return Err(TextFetchError::Config {
                message: "Worker count must be greater than 0".to_string(),
            });
        }

        if self.fetch.timeout_secs == 0 {
            return Err(TextFetchError::Config {
                message: "Fetch timeout must be greater than 0".to_string(),
            });
        }

        if self.fetch.user_agent.trim().is_empty() {
            return Err(TextFetchError::Config {
                message: "User agent must not be empty".to_string(),
            });
        }

        if let Some(ref selector) = self.extract.selector {
            if selector.trim().is_empty() {
                return Err(TextFetchError::Config {
                    message: "Selector must not be empty when set".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub workers: Option<usize>,
    pub timeout: Option<u64>,
    pub user_agent: Option<String>,
    pub selector: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub report: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_selector(mut self, selector: Option<String>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_report(mut self, report: Option<bool>) -> Self {
        self.report = report;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pool.workers, 4);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.user_agent.starts_with("textfetch/"));
        assert!(config.extract.selector.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.pool.workers = 0;
        assert!(config.validate().is_err());

        config.pool.workers = 4;
        config.fetch.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.pool.workers, loaded_config.pool.workers);
        assert_eq!(config.fetch.timeout_secs, loaded_config.fetch.timeout_secs);
    }

    #[test]
    fn test_partial_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[pool]\nworkers = 6\n").ok();

        // Sections not present in the file fall back to defaults
        let loaded: std::result::Result<Config, _> =
            toml::from_str(&std::fs::read_to_string(temp_file.path()).unwrap());
        let config = loaded.unwrap();
        assert_eq!(config.pool.workers, 6);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_workers(Some(6))
            .with_timeout(Some(10))
            .with_selector(Some("#content".to_string()));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.pool.workers, 6);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.extract.selector.as_deref(), Some("#content"));
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(!sample.is_empty());
        assert!(sample.contains("[fetch]"));
        assert!(sample.contains("[pool]"));
        assert!(sample.contains("[output]"));
    }
}
