// Application settings
// Loaded from ~/.config/tallysheet/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tallysheet_recon::DuplicatePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sheet used when neither a flag nor the session names one.
    pub default_sheet: Option<String>,

    /// 1-based row the first taxonomy label's count lands on.
    pub start_row: u32,

    /// Column as letters ("B") or a 1-based number ("2").
    pub start_column: String,

    /// TOML taxonomy replacing the built-in catalog.
    pub taxonomy_path: Option<PathBuf>,

    /// Input CSVs start with a header row.
    pub has_headers: bool,

    pub preview_rows: usize,

    pub duplicates: DuplicatePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_sheet: None,
            start_row: 2,
            start_column: "1".to_string(),
            taxonomy_path: None,
            has_headers: true,
            preview_rows: 10,
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("error parsing {}: {}; using defaults", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("error reading {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }
}
