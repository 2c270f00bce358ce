use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Environment variable naming the application home directory.
pub const HOME_ENV: &str = "CATSTORE_HOME";

/// Directory under the application home used when no base is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Content store configuration.
///
/// The only recognized option is the base content directory. The store keeps
/// everything under `{base}/content/store`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default, alias = "baseContentDirectory")]
    pub base_content_directory: Option<PathBuf>,
}

impl StoreConfig {
    /// Config rooted at an explicit base directory.
    pub fn with_base_directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_content_directory: Some(dir.into()),
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| StoreError::io(path, source))?;
        Self::from_toml_str(&text)
    }

    /// The base directory to use, falling back to the default when the
    /// configured one is empty or names something that is not a directory.
    pub fn resolve_base_directory(&self) -> PathBuf {
        match &self.base_content_directory {
            Some(dir) if is_usable(dir) => dir.clone(),
            Some(dir) => {
                let fallback = default_base_directory();
                warn!(
                    configured = %dir.display(),
                    fallback = %fallback.display(),
                    "unusable base content directory; using default"
                );
                fallback
            }
            None => default_base_directory(),
        }
    }
}

fn is_usable(dir: &Path) -> bool {
    !dir.as_os_str().is_empty() && !(dir.exists() && !dir.is_dir())
}

/// `{app_home}/data`, where `app_home` is `$CATSTORE_HOME` or the working
/// directory.
pub fn default_base_directory() -> PathBuf {
    env::var_os(HOME_ENV)
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DATA_DIR)
}
