use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_VERSION: u32 = 1;

/// Selected workbook and sheet, carried between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub version: u32,
    pub workbook: Option<PathBuf>,
    pub sheet: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self { version: SESSION_VERSION, workbook: None, sheet: None }
    }
}

impl Session {
    pub fn path() -> PathBuf {
        crate::config_dir().join("session.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Unreadable or malformed files are treated as no session.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Switch to another workbook. The sheet choice resets with it.
    pub fn select_workbook(&mut self, workbook: PathBuf, sheet: Option<String>) {
        self.workbook = Some(workbook);
        self.sheet = sheet;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.workbook.is_none() && self.sheet.is_none()
    }
}
