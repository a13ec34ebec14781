//! Opciones de un lote y su carga desde archivos TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Tiempo máximo por defecto para herramientas externas (5 minutos).
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

/// Opciones reconocidas por el orquestador.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubOptions {
    pub recursive: bool,
    pub dry_run: bool,
    pub overwrite: bool,
    pub keep_structure: bool,
    pub external_tool_path: Option<PathBuf>,
    pub tool_timeout_secs: u64,
}

impl Default for ScrubOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            dry_run: false,
            overwrite: false,
            keep_structure: false,
            external_tool_path: None,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

impl ScrubOptions {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs.max(1))
    }
}

/// Lee las opciones desde un archivo TOML; los campos ausentes toman su valor por defecto.
pub fn load_options(path: &Path) -> Result<ScrubOptions, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
