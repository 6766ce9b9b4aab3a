use anyhow::{anyhow, Context as AnyhowContext, Result};
use chunk_graph::{NamingRules, QueryMode};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "CHUNK_FINDER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "chunk-finder.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    default_mode: Option<String>,
    naming: NamingRules,
}

/// Settings shared by every subcommand
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinderConfig {
    pub default_mode: QueryMode,
    pub naming: NamingRules,
}

impl FinderConfig {
    /// `--config` wins, then `$CHUNK_FINDER_CONFIG`, then `./chunk-finder.toml`
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.is_file().then_some(local)
            });

        match path {
            Some(path) => {
                log::debug!("Using config {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_bytes(&bytes)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Accepts JSON or TOML
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = parse_raw(bytes)?;
        let default_mode = match raw.default_mode.as_deref() {
            Some(mode) => mode.parse::<QueryMode>().map_err(|e| anyhow!(e))?,
            None => QueryMode::default(),
        };
        Ok(Self {
            default_mode,
            naming: raw.naming,
        })
    }
}

fn parse_raw(bytes: &[u8]) -> Result<RawConfig> {
    match serde_json::from_slice::<RawConfig>(bytes) {
        Ok(raw) => Ok(raw),
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes).map_err(|err| anyhow!("{json_err}; {err}"))?;
            toml::from_str(utf8).map_err(|toml_err| {
                anyhow!("Config is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}")
            })
        }
    }
}
