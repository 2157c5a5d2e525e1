use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, str::FromStr};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const OPEN_METEO_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Which object-store backend holds the artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Google Cloud Storage, credentials from the usual `GOOGLE_*` variables.
    #[default]
    Gcs,
    /// A directory on local disk, for development.
    Local,
    /// Process memory; contents vanish on exit.
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Gcs => "gcs",
            StorageBackend::Local => "local",
            StorageBackend::Memory => "memory",
        }
    }

    pub const fn all() -> &'static [StorageBackend] {
        &[StorageBackend::Gcs, StorageBackend::Local, StorageBackend::Memory]
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "gcs" => Ok(StorageBackend::Gcs),
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(anyhow!(
                "Unknown storage backend '{value}'. Supported backends: gcs, local, memory."
            )),
        }
    }
}

/// Settings for the historical-weather provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub timezone: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_METEO_ARCHIVE_URL.to_string(),
            timeout_secs: 10,
            timezone: "GMT".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// bucket = "my-weather-bucket"
/// project_id = "my-project"
/// port = 8080
///
/// [upstream]
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bucket: Option<String>,
    pub project_id: Option<String>,
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub local_root: Option<PathBuf>,
    pub upstream: UpstreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: None,
            project_id: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage: StorageBackend::default(),
            local_root: None,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from the process environment.
    pub fn with_process_env(self) -> Result<Self> {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup; unset or empty variables
    /// leave the current value untouched.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bucket) = get("GCS_BUCKET_NAME") {
            self.bucket = Some(bucket);
        }
        if let Some(project) = get("GOOGLE_CLOUD_PROJECT") {
            self.project_id = Some(project);
        }
        if let Some(port) = get("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{port}'"))?;
        }
        if let Some(storage) = get("WEATHER_STORAGE") {
            self.storage = storage.parse()?;
        }
        if let Some(root) = get("WEATHER_LOCAL_ROOT") {
            self.local_root = Some(PathBuf::from(root));
        }
        if let Some(url) = get("OPEN_METEO_BASE_URL") {
            self.upstream.base_url = url;
        }

        Ok(self)
    }

    /// Bucket name used for artifact paths.
    ///
    /// The in-memory backend falls back to a placeholder; every other backend
    /// needs an explicit bucket.
    pub fn require_bucket(&self) -> Result<&str> {
        match (&self.bucket, self.storage) {
            (Some(bucket), _) => Ok(bucket.as_str()),
            (None, StorageBackend::Memory) => Ok("memory"),
            (None, backend) => bail!(
                "No bucket configured for the '{backend}' storage backend.\n\
                 Hint: set GCS_BUCKET_NAME or run `weather configure`."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.storage, StorageBackend::Gcs);
        assert_eq!(cfg.upstream.base_url, OPEN_METEO_ARCHIVE_URL);
        assert_eq!(cfg.upstream.timeout_secs, 10);
        assert_eq!(cfg.upstream.timezone, "GMT");
    }

    #[test]
    fn env_overrides_file_values() {
        let cfg = Config {
            bucket: Some("from-file".into()),
            ..Config::default()
        };

        let cfg = cfg
            .with_env(env(&[
                ("GCS_BUCKET_NAME", "from-env"),
                ("GOOGLE_CLOUD_PROJECT", "proj-1"),
                ("PORT", "9090"),
                ("WEATHER_STORAGE", "Local"),
                ("WEATHER_LOCAL_ROOT", "/tmp/weather"),
            ]))
            .expect("env should apply");

        assert_eq!(cfg.bucket.as_deref(), Some("from-env"));
        assert_eq!(cfg.project_id.as_deref(), Some("proj-1"));
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.storage, StorageBackend::Local);
        assert_eq!(cfg.local_root, Some(PathBuf::from("/tmp/weather")));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let cfg = Config {
            bucket: Some("keep".into()),
            ..Config::default()
        };
        let cfg = cfg.with_env(env(&[("GCS_BUCKET_NAME", "  ")])).unwrap();
        assert_eq!(cfg.bucket.as_deref(), Some("keep"));
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::default()
            .with_env(env(&[("PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT must be a port number"));
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let err = Config::default()
            .with_env(env(&[("WEATHER_STORAGE", "s3")]))
            .unwrap_err();
        assert!(err.to_string().contains("Unknown storage backend"));
    }

    #[test]
    fn backend_str_roundtrip() {
        for backend in StorageBackend::all() {
            let parsed: StorageBackend = backend.as_str().parse().expect("roundtrip");
            assert_eq!(*backend, parsed);
        }
    }

    #[test]
    fn gcs_requires_bucket() {
        let err = Config::default().require_bucket().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("No bucket configured"));
        assert!(msg.contains("Hint: set GCS_BUCKET_NAME"));
    }

    #[test]
    fn memory_backend_has_placeholder_bucket() {
        let cfg = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        assert_eq!(cfg.require_bucket().unwrap(), "memory");
    }

    #[test]
    fn toml_roundtrip_keeps_partial_files_valid() {
        let cfg: Config = toml::from_str("bucket = \"b\"\n[upstream]\ntimeout_secs = 3\n")
            .expect("partial config parses");
        assert_eq!(cfg.bucket.as_deref(), Some("b"));
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.upstream.timeout_secs, 3);
        assert_eq!(cfg.upstream.timezone, "GMT");

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.bucket, cfg.bucket);
        assert_eq!(back.storage, cfg.storage);
    }
}
