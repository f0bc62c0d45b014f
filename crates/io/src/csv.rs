// CSV input for the (label, count) extract

use std::io::Read;
use std::path::Path;

use tallysheet_recon::{load_raw_table, LoadOptions, RawRecord};

use crate::error::IoError;

/// Read a label/count extract from disk.
///
/// `delimiter = None` sniffs the delimiter from the first lines.
pub fn read_raw_table(
    path: &Path,
    has_headers: bool,
    delimiter: Option<u8>,
) -> Result<Vec<RawRecord>, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    log::debug!("reading {} with delimiter {:?}", path.display(), delimiter as char);

    let options = LoadOptions { has_headers, delimiter };
    Ok(load_raw_table(&content, &options)?)
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback for
/// spreadsheet-exported CSVs).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let unreadable = |reason: String| IoError::InputFileUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(unreadable("no such file".into()));
    }

    let mut file = std::fs::File::open(path).map_err(|e| unreadable(e.to_string()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| unreadable(e.to_string()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            log::info!("{} is not UTF-8; decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

/// Pick the delimiter that splits the sample lines into the most consistent
/// field count (more than one field). Defaults to comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(10)
        .collect();

    let field_count = |line: &str, delim: u8| -> usize {
        csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes())
            .records()
            .next()
            .and_then(|r| r.ok())
            .map(|r| r.len())
            .unwrap_or(1)
    };

    CANDIDATES
        .iter()
        .filter_map(|&delim| {
            let counts: Vec<usize> = sample.iter().map(|line| field_count(line, delim)).collect();
            let first = *counts.first()?;
            if first <= 1 {
                return None;
            }
            let consistent = counts.iter().filter(|&&c| c == first).count();
            Some((delim, consistent * first))
        })
        // max_by_key keeps the last maximum; reverse so earlier candidates win ties
        .rev()
        .max_by_key(|(_, score)| *score)
        .map(|(delim, _)| delim)
        .unwrap_or(b',')
}
