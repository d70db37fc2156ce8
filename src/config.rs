//! Configuration for cidshare.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CIDSHARE_HOME, CIDSHARE_GATEWAY, CIDSHARE_ORIGIN)
//! 2. Config file (.cidshare/config.yaml)
//! 3. Defaults (~/.cidshare, the Stratos gateway, http://localhost:3000)
//!
//! Config file discovery:
//! - Searches current directory and parents for .cidshare/config.yaml
//! - Paths in config file are relative to the directory holding .cidshare/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::gateway::GatewayConfig;
use crate::library::BackendKind;
use crate::resolver::SourceCache;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_HOME: &str = "CIDSHARE_HOME";
pub const ENV_GATEWAY: &str = "CIDSHARE_GATEWAY";
pub const ENV_ORIGIN: &str = "CIDSHARE_ORIGIN";

/// Origin share URLs are built against when nothing else is configured
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    /// State directory (relative to the directory holding .cidshare/)
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub share: ShareSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySection {
    pub base_url: Option<String>,
    pub namespace: Option<String>,
    pub known_domains: Option<Vec<String>>,
    pub filename_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverSection {
    pub candidate_timeout_seconds: Option<u64>,
    pub cache_ttl_seconds: Option<u64>,
    pub cache_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareSection {
    pub origin: Option<String>,
    pub decode_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    pub backend: Option<BackendKind>,
    /// Relative to home
    pub path: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub gateway: GatewayConfig,
    pub resolver: ResolverSettings,
    pub share: ShareSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolverSettings {
    pub candidate_timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
    pub cache_capacity: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            candidate_timeout_seconds: 15,
            cache_ttl_seconds: 24 * 60 * 60,
            cache_capacity: 512,
        }
    }
}

impl ResolverSettings {
    pub fn candidate_timeout(&self) -> Duration {
        Duration::from_secs(self.candidate_timeout_seconds)
    }

    /// A fresh cache with the configured TTL and capacity
    pub fn source_cache(&self) -> SourceCache {
        SourceCache::new(Duration::from_secs(self.cache_ttl_seconds), self.cache_capacity)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareSettings {
    pub origin: String,
    pub decode_concurrency: usize,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            decode_concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageSettings {
    pub backend: BackendKind,
    /// Database file (sqlite) or directory (json)
    pub path: PathBuf,
}

/// Default storage location under home for a backend
fn default_storage_path(home: &Path, backend: BackendKind) -> PathBuf {
    match backend {
        BackendKind::Sqlite => home.join("library.db"),
        BackendKind::Json | BackendKind::Memory => home.join("library"),
    }
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".cidshare").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a config file (if any), environment and defaults
fn resolve<E>(config_file: Option<PathBuf>, default_home: PathBuf, env: E) -> Result<ResolvedConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    // Base directory is the parent of .cidshare/ (i.e., grandparent of config.yaml)
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let home = if let Some(env_home) = env(ENV_HOME) {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = file.home {
        resolve_path(base_dir, home_path)
    } else {
        default_home
    };

    let mut gateway = GatewayConfig::default();
    if let Some(base_url) = env(ENV_GATEWAY).or(file.gateway.base_url) {
        gateway.base_url = base_url.trim().trim_end_matches('/').to_string();
    }
    if let Some(namespace) = file.gateway.namespace {
        gateway.namespace = namespace;
    }
    if let Some(known_domains) = file.gateway.known_domains {
        gateway.known_domains = known_domains;
    }
    if let Some(filename_hint) = file.gateway.filename_hint {
        gateway.filename_hint = filename_hint;
    }

    let defaults = ResolverSettings::default();
    let resolver = ResolverSettings {
        candidate_timeout_seconds: file
            .resolver
            .candidate_timeout_seconds
            .unwrap_or(defaults.candidate_timeout_seconds),
        cache_ttl_seconds: file
            .resolver
            .cache_ttl_seconds
            .unwrap_or(defaults.cache_ttl_seconds),
        cache_capacity: file
            .resolver
            .cache_capacity
            .unwrap_or(defaults.cache_capacity),
    };

    let share = ShareSettings {
        origin: env(ENV_ORIGIN)
            .or(file.share.origin)
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
        decode_concurrency: file.share.decode_concurrency.unwrap_or(1).max(1),
    };

    let backend = file.storage.backend.unwrap_or_default();
    let storage = StorageSettings {
        backend,
        path: match file.storage.path {
            Some(ref path) => resolve_path(&home, path),
            None => default_storage_path(&home, backend),
        },
    };

    Ok(ResolvedConfig {
        home,
        config_file,
        gateway,
        resolver,
        share,
        storage,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".cidshare");

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    resolve(find_config_file(&cwd), default_home, |key| {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the cidshare home directory
pub fn cidshare_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(root: &Path, yaml: &str) -> PathBuf {
        let dir = root.join(".cidshare");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, PathBuf::from("/h/.cidshare"), no_env).unwrap();

        assert_eq!(config.home, PathBuf::from("/h/.cidshare"));
        assert_eq!(config.gateway.base_url, "https://spfs-gateway.thestratos.net");
        assert_eq!(config.gateway.namespace, "ipfs");
        assert_eq!(config.resolver.candidate_timeout(), Duration::from_secs(15));
        assert_eq!(config.resolver.cache_ttl_seconds, 86_400);
        assert_eq!(config.share.origin, DEFAULT_ORIGIN);
        assert_eq!(config.share.decode_concurrency, 1);
        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.path, PathBuf::from("/h/.cidshare/library.db"));
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1"
gateway:
  base_url: http://127.0.0.1:8080
  known_domains: [stratos, example]
resolver:
  candidate_timeout_seconds: 3
share:
  origin: https://share.example
  decode_concurrency: 4
storage:
  backend: json
"#,
        );

        let file = load_config_file(&path).unwrap();
        assert_eq!(file.version.as_deref(), Some("1"));
        assert_eq!(file.storage.backend, Some(BackendKind::Json));

        let config = resolve(Some(path.clone()), PathBuf::from("/h"), no_env).unwrap();
        assert_eq!(config.gateway.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.gateway.known_domains, vec!["stratos", "example"]);
        assert_eq!(config.resolver.candidate_timeout_seconds, 3);
        assert_eq!(config.resolver.cache_capacity, 512);
        assert_eq!(config.share.origin, "https://share.example");
        assert_eq!(config.share.decode_concurrency, 4);
        assert_eq!(config.storage.path, PathBuf::from("/h/library"));
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            "gateway:\n  base_url: https://from-file\nshare:\n  origin: https://from-file\n",
        );
        let env: HashMap<&str, &str> = [
            (ENV_HOME, "/env/home"),
            (ENV_GATEWAY, "https://from-env/"),
            (ENV_ORIGIN, "https://origin-env"),
        ]
        .into_iter()
        .collect();

        let config = resolve(Some(path), PathBuf::from("/h"), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.home, PathBuf::from("/env/home"));
        assert_eq!(config.gateway.base_url, "https://from-env");
        assert_eq!(config.share.origin, "https://origin-env");
        assert_eq!(config.storage.path, PathBuf::from("/env/home/library.db"));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1\"");
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(path));
    }

    #[test]
    fn test_home_relative_to_project() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "home: state\nstorage:\n  path: db/lib.sqlite\n");

        let config = resolve(Some(path), PathBuf::from("/h"), no_env).unwrap();
        assert_eq!(config.home, temp.path().join("state"));
        assert_eq!(config.storage.path, temp.path().join("state").join("db/lib.sqlite"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
