//! Environment constants and path utilities.
//!
//! Centralizes the directory and file names used for configuration and for
//! the host folders backing container data volumes.

use std::path::{Path, PathBuf};

/// Per-user data directory name, created in the home directory
pub const DATA_DIR_NAME: &str = ".sqlcontainers";

/// Configuration file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "sqlcontainers.toml";

/// Directory holding the volume helper scripts, relative to the executable
pub const SCRIPTS_DIR_NAME: &str = "scripts";

/// Build the data directory path from a home directory
pub fn data_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(DATA_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    data_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(DATA_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Build the flat local config file path in current directory
pub fn local_flat_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE_NAME)
}

/// Home directory of the current user, if it can be determined
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
}

/// Scripts directory shipped next to the executable, if present
pub fn bundled_scripts_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.join(SCRIPTS_DIR_NAME);
    dir.is_dir().then_some(dir)
}
