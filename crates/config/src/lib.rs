// Configuration loading

use std::path::PathBuf;

pub mod session;
pub mod settings;

pub use session::Session;
pub use settings::Settings;

/// Environment variable that relocates the config directory.
pub const CONFIG_DIR_ENV: &str = "TALLYSHEET_CONFIG_DIR";

/// `<config_dir>/tallysheet`, or `$TALLYSHEET_CONFIG_DIR` when set.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tallysheet")
}
