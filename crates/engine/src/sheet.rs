//! Sheet naming rules and grid limits.

/// Hard limits of the xlsx grid, as 1-based maxima.
pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u32 = 16_384;

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Normalize a sheet name for case-insensitive comparison.
pub fn normalize_sheet_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Excel sheet-name rules: 1..=31 chars, none of `[]:*?/\`, no leading or
/// trailing apostrophe.
pub fn is_valid_sheet_name(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
        return false;
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return false;
    }
    !name.chars().any(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_name_rules() {
        assert!(is_valid_sheet_name("Sheet1"));
        assert!(is_valid_sheet_name("Q1 2026 (draft)"));
        assert!(!is_valid_sheet_name(""));
        assert!(!is_valid_sheet_name("a/b"));
        assert!(!is_valid_sheet_name("what?"));
        assert!(!is_valid_sheet_name("'quoted'"));
        assert!(!is_valid_sheet_name(&"x".repeat(32)));
        assert!(is_valid_sheet_name(&"x".repeat(31)));
    }

    #[test]
    fn normalized_names_ignore_case_and_padding() {
        assert_eq!(normalize_sheet_name(" Counts "), normalize_sheet_name("COUNTS"));
        assert_ne!(normalize_sheet_name("Counts"), normalize_sheet_name("Count"));
    }
}
