//! Helper script identifiers per host platform.

use serde::{Deserialize, Serialize};

/// Host operating system family, as far as script selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    fn script_extension(self) -> &'static str {
        match self {
            Platform::Unix => "sh",
            Platform::Windows => "cmd",
        }
    }
}

/// Resolved names of the volume helper scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostScripts {
    /// Creates `~/.sqlcontainers/<name>-<timestamp>` and prints its path
    pub create_volume: String,
    /// Removes the directory given as its only argument
    pub delete_volume: String,
}

impl HostScripts {
    pub fn for_platform(platform: Platform) -> Self {
        let ext = platform.script_extension();
        Self {
            create_volume: format!("createVolumeFolder.{}", ext),
            delete_volume: format!("deleteVolumeFolder.{}", ext),
        }
    }

    pub fn current() -> Self {
        Self::for_platform(Platform::current())
    }
}

impl Default for HostScripts {
    fn default() -> Self {
        Self::current()
    }
}
