use std::path::{Path, PathBuf};

use tallysheet_engine::cell::CellValue;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widest a preview column may get before values are cut.
pub(crate) const MAX_COLUMN_WIDTH: usize = 24;

/// Expand a leading `~` in a user-supplied path.
pub(crate) fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// True when both paths name the same file. Falls back to plain comparison
/// when either cannot be canonicalized.
pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Pad or cut `s` to exactly `width` display columns. Cut values end in "..".
pub(crate) fn fit(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw <= width {
        return format!("{}{}", s, " ".repeat(width - sw));
    }

    let budget = width.saturating_sub(2);
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        out.push(ch);
        used += cw;
    }
    if width >= 2 {
        out.push_str("..");
        used += 2;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

/// Render a header plus rows as a left-aligned text table.
pub(crate) fn render_table(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| display_width(c)).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(display_width(value));
            }
        }
    }
    for w in &mut widths {
        *w = (*w).min(MAX_COLUMN_WIDTH);
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| fit(c, *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(columns));
    out.push('\n');
    out.push_str(
        &widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "),
    );
    out.push('\n');
    for row in rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

/// Cell as a JSON scalar: numbers stay numbers, empty cells become null.
pub(crate) fn cell_to_json(value: &CellValue) -> serde_json::Value {
    match value {
        CellValue::Empty => serde_json::Value::Null,
        CellValue::Number(n) | CellValue::DateTime(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        CellValue::Bool(b) => serde_json::Value::Bool(*b),
        other => serde_json::Value::String(other.raw_display()),
    }
}
