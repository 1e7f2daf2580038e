//! Configuration for PocketDB
//!
//! Centralized configuration with sensible defaults.
//!
//! The original resolved its storage directory implicitly from the process
//! environment (personal-documents folder + executable folder name). Here the
//! directory is an explicit parameter; [`Config::in_documents_root`] is the
//! documented equivalent of that implicit resolution for callers who want it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration for a PocketDB store location
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that holds the backing files of every pocket.
    /// Internal structure:
    ///   {location}/
    ///     ├── <name>.pocket    (index file)
    ///     └── <name>.block     (block file)
    pub location: PathBuf,
}

impl Config {
    /// Create a config pointing at an explicit directory
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve the classic default location: a subdirectory of `documents_root`
    /// named after the folder containing the running executable, created if it
    /// does not exist yet.
    ///
    /// `documents_root` is supplied by the caller (e.g. a platform documents
    /// directory) rather than read from the global environment.
    pub fn in_documents_root(documents_root: &Path) -> Result<Self> {
        let app_folder = std::env::current_exe()
            .ok()
            .and_then(|exe| {
                exe.parent()
                    .and_then(|dir| dir.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "pocketdb".to_string());

        let location = documents_root.join(app_folder);
        fs::create_dir_all(&location)?;

        Ok(Self { location })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./pocketdb_data"),
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the directory that holds the backing files
    pub fn location(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.location = path.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
