use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::taxonomy::Taxonomy;

// ---------------------------------------------------------------------------
// Taxonomy file
// ---------------------------------------------------------------------------

/// On-disk taxonomy definition (`*.taxonomy.toml`).
///
/// ```toml
/// name = "evaluations-2026"
/// duplicates = "reject"
/// labels = ["{INCOME_NET}", "{INCOME_OTHER}"]
/// ```
#[derive(Debug, Deserialize)]
pub struct TaxonomyConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub labels: Vec<String>,
    /// Optional policy override; `None` defers to the caller's setting.
    #[serde(default)]
    pub duplicates: Option<DuplicatePolicy>,
}

fn default_name() -> String {
    "custom".into()
}

// ---------------------------------------------------------------------------
// Duplicate handling
// ---------------------------------------------------------------------------

/// What to do when the same taxonomy label appears more than once in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later rows overwrite earlier ones; duplicates are reported.
    #[default]
    LastWins,
    /// Duplicates fail the run.
    Reject,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastWins => write!(f, "last_wins"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl TaxonomyConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: TaxonomyConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.taxonomy().map(|_| ())
    }

    /// Build the validated taxonomy.
    pub fn taxonomy(&self) -> Result<Taxonomy, ReconError> {
        Taxonomy::new(self.name.clone(), self.labels.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
