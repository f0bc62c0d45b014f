use crate::error::ReconError;
use crate::model::RawRecord;

/// How to read the (label, count) extract.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// First row is a header and is skipped.
    pub has_headers: bool,
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { has_headers: true, delimiter: b',' }
    }
}

/// Parse CSV text into raw records.
///
/// Column 0 is the label, column 1 the count; further columns are ignored.
/// Surrounding whitespace is trimmed from both. Counts must be finite numbers.
pub fn load_raw_table(csv_data: &str, options: &LoadOptions) -> Result<Vec<RawRecord>, ReconError> {
    let csv_data = csv_data.strip_prefix('\u{feff}').unwrap_or(csv_data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(options.has_headers)
        .delimiter(options.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    if options.has_headers {
        let headers = reader.headers().map_err(|e| ReconError::Io(e.to_string()))?;
        log::debug!("header columns: {:?}", headers.iter().collect::<Vec<_>>());
    }

    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let (Some(label), Some(count_str)) = (record.get(0), record.get(1)) else {
            return Err(ReconError::MissingColumn { line });
        };

        let count = count_str
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| ReconError::InvalidCountValue {
                label: label.to_string(),
                line,
                value: count_str.to_string(),
            })?;

        rows.push(RawRecord { label: label.to_string(), count, line });
    }

    log::info!("loaded {} input rows", rows.len());
    Ok(rows)
}
