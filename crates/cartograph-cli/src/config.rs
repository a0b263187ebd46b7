use std::path::{Path, PathBuf};

use cartograph_generate::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "cartograph.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Which artifacts a compile run writes besides `config.json` and the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactToggles {
    pub ast: bool,
    pub validation: bool,
    pub lineage: bool,
    pub csv: bool,
    pub diagrams: bool,
    pub ddl: bool,
}

impl Default for ArtifactToggles {
    fn default() -> Self {
        Self {
            ast: true,
            validation: true,
            lineage: true,
            csv: true,
            diagrams: true,
            ddl: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub run_dir: PathBuf,
    pub engines: Vec<Engine>,
    pub strict: bool,
    pub artifacts: ArtifactToggles,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from("runs"),
            engines: Engine::ALL.to_vec(),
            strict: false,
            artifacts: ArtifactToggles::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load settings from an explicit path, or from `cartograph.toml` if present.
///
/// An explicit path must exist; the implicit one falls back to defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !required && !path.exists() {
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Settings::from_toml_str(&content, &path)
}
