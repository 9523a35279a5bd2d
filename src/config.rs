use crate::capture::{CaptureConfig, PeerConfig};
use crate::timeexpr::{parse_speedup, SpeedupRatio};
use crate::timelapse::ArtifactName;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub sdm: SdmConfig,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub timelapse: TimelapseSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the dated frame tree
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// OAuth client secrets downloaded from the cloud console
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    /// Cached OAuth token
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdmConfig {
    /// Device Access project id; the command line flag wins
    pub enterprise_id: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_gather_timeout_secs")]
    pub gather_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_record_secs")]
    pub record_secs: u64,
    #[serde(default = "default_close_timeout_secs")]
    pub close_timeout_secs: u64,
    #[serde(default = "default_collect_timeout_secs")]
    pub collect_timeout_secs: u64,
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelapseSettings {
    /// `<real>/<output>` ratio, e.g. `1h/1s`
    #[serde(default = "default_speedup")]
    pub speedup: String,
    /// Ceiling on emitted frames per output second
    #[serde(default = "default_max_output_rate")]
    pub max_output_rate: f64,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

// Default value functions
fn default_output_dir() -> PathBuf { PathBuf::from(".") }
fn default_credentials_file() -> PathBuf { PathBuf::from("credentials.json") }
fn default_token_file() -> PathBuf { PathBuf::from("token.json") }
fn default_api_base() -> String { crate::sdm::client::DEFAULT_API_BASE.to_string() }
fn default_gather_timeout_secs() -> u64 { 20 }
fn default_connect_timeout_secs() -> u64 { 30 }
fn default_record_secs() -> u64 { 5 }
fn default_close_timeout_secs() -> u64 { 30 }
fn default_collect_timeout_secs() -> u64 { 5 }
fn default_ice_servers() -> Vec<String> { PeerConfig::default().ice_servers }
fn default_speedup() -> String { "1h/1s".to_string() }
fn default_max_output_rate() -> f64 { crate::timelapse::DEFAULT_MAX_OUTPUT_RATE }
fn default_output_file() -> PathBuf { PathBuf::from("timelapse.mp4") }
fn default_file_prefix() -> String { ArtifactName::default().prefix().to_string() }
fn default_file_extension() -> String { ArtifactName::default().extension().to_string() }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
        }
    }
}

impl Default for SdmConfig {
    fn default() -> Self {
        Self {
            enterprise_id: None,
            api_base: default_api_base(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            gather_timeout_secs: default_gather_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            record_secs: default_record_secs(),
            close_timeout_secs: default_close_timeout_secs(),
            collect_timeout_secs: default_collect_timeout_secs(),
            ice_servers: default_ice_servers(),
        }
    }
}

impl Default for TimelapseSettings {
    fn default() -> Self {
        Self {
            speedup: default_speedup(),
            max_output_rate: default_max_output_rate(),
            output_file: default_output_file(),
            file_prefix: default_file_prefix(),
            file_extension: default_file_extension(),
        }
    }
}

impl CaptureSettings {
    /// Convert to the runtime capture bounds
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            gather_timeout: Duration::from_secs(self.gather_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            record_duration: Duration::from_secs(self.record_secs),
            close_timeout: Duration::from_secs(self.close_timeout_secs),
            collect_timeout: Duration::from_secs(self.collect_timeout_secs),
            ..CaptureConfig::default()
        }
    }

    pub fn to_peer_config(&self) -> PeerConfig {
        PeerConfig {
            ice_servers: self.ice_servers.clone(),
        }
    }
}

impl TimelapseSettings {
    pub fn speedup_ratio(&self) -> crate::timeexpr::TimeExprResult<SpeedupRatio> {
        parse_speedup(&self.speedup)
    }

    pub fn artifact_name(&self) -> ArtifactName {
        ArtifactName::new(self.file_prefix.clone(), self.file_extension.clone())
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| "# Failed to generate sample configuration".to_string())
    }

    /// Per-user configuration file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nest-timelapse").join("config.toml"))
    }

    /// Load an explicit file, else the per-user file if present, else defaults
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_config_path().filter(|path| path.is_file()) {
                Some(path) => {
                    log::debug!("Loading configuration from {}", path.display());
                    Self::load_from_file(path)?
                }
                None => Self::default(),
            },
        };
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let timeouts = [
            ("gather_timeout_secs", self.capture.gather_timeout_secs),
            ("connect_timeout_secs", self.capture.connect_timeout_secs),
            ("record_secs", self.capture.record_secs),
            ("close_timeout_secs", self.capture.close_timeout_secs),
            ("collect_timeout_secs", self.capture.collect_timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                errors.push(format!("capture.{} must be greater than 0", name));
            }
        }

        if self.capture.ice_servers.iter().any(|server| server.trim().is_empty()) {
            errors.push("capture.ice_servers must not contain empty entries".to_string());
        }

        if !(self.timelapse.max_output_rate.is_finite() && self.timelapse.max_output_rate > 0.0) {
            errors.push(format!(
                "timelapse.max_output_rate must be positive, got {}",
                self.timelapse.max_output_rate
            ));
        }

        if let Err(e) = self.timelapse.speedup_ratio() {
            errors.push(format!("timelapse.speedup: {}", e));
        }

        if self.timelapse.file_extension.is_empty() {
            errors.push("timelapse.file_extension must not be empty".to_string());
        }

        if let Some(id) = &self.sdm.enterprise_id {
            if id.trim().is_empty() {
                errors.push("sdm.enterprise_id must not be empty when set".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.to_capture_config().gather_timeout, Duration::from_secs(20));
        assert_eq!(config.timelapse.speedup_ratio().unwrap().value(), 3600.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(
            temp_file.path(),
            "[capture]\nrecord_secs = 8\n\n[sdm]\nenterprise_id = \"project-1\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.capture.record_secs, 8);
        assert_eq!(config.capture.connect_timeout_secs, 30);
        assert_eq!(config.sdm.enterprise_id.as_deref(), Some("project-1"));
        assert_eq!(config.paths.token_file, PathBuf::from("token.json"));
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = AppConfig::default();
        config.capture.connect_timeout_secs = 0;
        config.capture.record_secs = 0;
        config.timelapse.max_output_rate = -1.0;
        config.timelapse.speedup = "1h/0s".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("connect_timeout_secs")));
        assert!(errors.iter().any(|e| e.contains("max_output_rate")));
        assert!(errors.iter().any(|e| e.contains("speedup")));
    }

    #[test]
    fn test_malformed_file_names_path() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[capture\nrecord_secs = ").unwrap();
        let err = AppConfig::load_from_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = AppConfig::generate_sample_config();
        let parsed: AppConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
