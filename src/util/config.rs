//! TOML configuration with environment-provided API keys.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use super::logging::LoggingConfig;
use super::version::APP_NAME;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "MandiArbitrage";
const CONFIG_FILENAME: &str = "config.toml";

pub const OPENROUTE_KEY_VAR: &str = "OPENROUTE_API_KEY";
pub const MANDI_KEY_VAR: &str = "MANDI_API_KEY";

/// How long a computed run is served from cache before it is recomputed.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub distance: DistanceConfig,
    pub prices: PriceFeedConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nearest markets evaluated per run.
    pub candidate_limit: usize,
    /// Candidate resolutions allowed in flight at once.
    pub max_concurrency: usize,
    pub cache_ttl_secs: u64,
    /// Upper bound for a whole run; unset means no limit beyond provider deadlines.
    pub run_deadline_ms: Option<u64>,
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_ms.map(Duration::from_millis)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 12,
            max_concurrency: 4,
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            run_deadline_ms: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Road routing is only attempted below this great-circle distance.
    pub road_threshold_km: f64,
    /// Multiplier turning straight-line distance into an estimated road distance.
    pub linear_correction: f64,
    pub timeout_ms: u64,
    pub base_url: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl DistanceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            road_threshold_km: 150.0,
            linear_correction: 1.3,
            timeout_ms: 2_000,
            base_url: "https://api.openrouteservice.org/".into(),
            api_key: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PriceFeedConfig {
    pub base_url: String,
    pub resource_id: String,
    /// State filter sent with every query.
    pub state: String,
    pub timeout_ms: u64,
    /// Synthetic prices vary uniformly within `base * (1 ± jitter)`.
    pub jitter: f64,
    /// Fixed seed for the synthetic price generator.
    pub seed: Option<u64>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl PriceFeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.data.gov.in/".into(),
            resource_id: "9ef84268-d588-465a-a308-a864a43d0070".into(),
            state: "Gujarat".into(),
            timeout_ms: 2_000,
            jitter: 0.05,
            seed: None,
            api_key: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path if given, else the platform config file if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Fills API keys from the process environment.
    pub fn with_env_keys(mut self) -> Self {
        self.distance.api_key = non_empty_var(OPENROUTE_KEY_VAR);
        self.prices.api_key = non_empty_var(MANDI_KEY_VAR);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.candidate_limit == 0 {
            return Err(invalid("engine.candidate_limit", "must be at least 1"));
        }
        if self.engine.max_concurrency == 0 {
            return Err(invalid("engine.max_concurrency", "must be at least 1"));
        }
        if self.engine.run_deadline_ms == Some(0) {
            return Err(invalid("engine.run_deadline_ms", "must be positive when set"));
        }
        if !self.distance.road_threshold_km.is_finite() || self.distance.road_threshold_km < 0.0 {
            return Err(invalid(
                "distance.road_threshold_km",
                "must be a non-negative number",
            ));
        }
        if !self.distance.linear_correction.is_finite() || self.distance.linear_correction < 1.0 {
            return Err(invalid("distance.linear_correction", "must be at least 1.0"));
        }
        if self.distance.timeout_ms == 0 {
            return Err(invalid("distance.timeout_ms", "must be positive"));
        }
        if self.prices.timeout_ms == 0 {
            return Err(invalid("prices.timeout_ms", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.prices.jitter) {
            return Err(invalid("prices.jitter", "must be within [0, 1)"));
        }
        if self.prices.state.trim().is_empty() {
            return Err(invalid("prices.state", "cannot be empty"));
        }
        Ok(())
    }
}

/// Location of `config.toml` in the platform configuration directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.engine.candidate_limit, 12);
        assert_eq!(config.engine.max_concurrency, 4);
        assert_eq!(config.engine.cache_ttl(), DEFAULT_CACHE_TTL);
        assert_eq!(DEFAULT_CACHE_TTL, Duration::from_secs(300));
        assert_eq!(config.distance.road_threshold_km, 150.0);
        assert_eq!(config.distance.linear_correction, 1.3);
        assert_eq!(config.prices.state, "Gujarat");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
[engine]
max_concurrency = 6

[distance]
linear_correction = 1.25

[prices]
seed = 42
"#,
        )
        .unwrap();
        assert_eq!(config.engine.max_concurrency, 6);
        assert_eq!(config.engine.candidate_limit, 12);
        assert_eq!(config.distance.linear_correction, 1.25);
        assert_eq!(config.distance.timeout_ms, 2_000);
        assert_eq!(config.prices.seed, Some(42));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"\nformat = \"json\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let result = Config::from_toml("[engine\ncandidate_limit = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            ("[engine]\ncandidate_limit = 0", "engine.candidate_limit"),
            ("[engine]\nmax_concurrency = 0", "engine.max_concurrency"),
            ("[distance]\nlinear_correction = 0.8", "distance.linear_correction"),
            ("[distance]\ntimeout_ms = 0", "distance.timeout_ms"),
            ("[prices]\njitter = 1.5", "prices.jitter"),
            ("[prices]\nstate = \" \"", "prices.state"),
        ];
        for (toml, expected) in cases {
            match Config::from_toml(toml) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn default_path_sits_in_app_config_dir() {
        if let Some(path) = default_path() {
            assert!(path.ends_with(CONFIG_FILENAME));
            let dir = path.parent().unwrap().to_string_lossy().to_lowercase();
            assert!(dir.contains("arbitrage"), "unexpected config dir {dir}");
        }
    }

    #[test]
    fn api_keys_are_not_read_from_file() {
        let config = Config::from_toml("[distance]\napi_key = \"leaked\"").unwrap();
        assert!(config.distance.api_key.is_none());
    }
}
