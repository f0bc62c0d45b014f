use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Taxonomy validation error (empty, blank label, duplicate label).
    ConfigValidation(String),
    /// Count column could not be read as a number.
    InvalidCountValue { label: String, line: usize, value: String },
    /// Row has fewer than the two required fields.
    MissingColumn { line: usize },
    /// Same taxonomy label seen twice while duplicates are rejected.
    DuplicateLabel { label: String, first_line: usize, line: usize },
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "taxonomy parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "taxonomy validation error: {msg}"),
            Self::InvalidCountValue { label, line, value } => {
                write!(f, "line {line}, label '{label}': cannot parse count '{value}'")
            }
            Self::MissingColumn { line } => {
                write!(f, "line {line}: expected at least 2 columns (label, count)")
            }
            Self::DuplicateLabel { label, first_line, line } => {
                write!(f, "label '{label}' appears on line {first_line} and again on line {line}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
