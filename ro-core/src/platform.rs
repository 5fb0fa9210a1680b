//! Host platform detection and where ReachOut keeps its files.

use std::path::PathBuf;

use crate::constants::APP_NAME;
use crate::error::{RoError, RoResult};

/// Operating system the binary was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Directory holding the database and log files, e.g.
    /// `~/.local/share/ReachOut` on Linux.
    pub fn data_dir() -> RoResult<PathBuf> {
        app_subdir(dirs::data_dir(), "data")
    }

    /// Directory holding `config.toml`, e.g. `~/.config/ReachOut` on Linux.
    pub fn config_dir() -> RoResult<PathBuf> {
        app_subdir(dirs::config_dir(), "config")
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        }
    }

    /// Device label recorded with each activity log entry.
    pub fn device_model(&self) -> String {
        format!("{} Device ({})", self.name(), std::env::consts::ARCH)
    }
}

fn app_subdir(base: Option<PathBuf>, kind: &str) -> RoResult<PathBuf> {
    base.map(|dir| dir.join(APP_NAME))
        .ok_or_else(|| RoError::Config(format!("could not determine {kind} directory")))
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
