//! `tsheet apply` reconciles a label/count extract against the taxonomy and
//! writes the ordered counts into the workbook. `tsheet taxonomy` prints the
//! label order that drives it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;
use tallysheet_engine::{parse_start_row, resolve_column};
use tallysheet_io::{project, Anchor, ProjectResult};
use tallysheet_recon::evidence::summarize_unmatched;
use tallysheet_recon::{DuplicatePolicy, ReconReport, Taxonomy, TaxonomyConfig};

use crate::exit_codes::EXIT_INVALID_TAXONOMY;
use crate::util::expand_path;
use crate::{CliError, Context};

pub struct ApplyArgs {
    pub csv: PathBuf,
    pub workbook: Option<PathBuf>,
    pub sheet: Option<String>,
    pub row: Option<String>,
    pub col: Option<String>,
    pub taxonomy: Option<PathBuf>,
    pub no_headers: bool,
    pub delimiter: Option<char>,
    pub strict_duplicates: bool,
    pub dry_run: bool,
    pub json: bool,
}

/// Shape of `apply --json` output.
#[derive(Serialize)]
struct ApplyOutput<'a> {
    anchor: Anchor,
    anchor_a1: String,
    dry_run: bool,
    report: &'a ReconReport,
    projection: Option<&'a ProjectResult>,
}

/// Taxonomy from `--taxonomy`, else settings, else the built-in catalog.
/// The file may also carry a duplicate policy.
fn load_taxonomy(
    ctx: &Context,
    flag: Option<PathBuf>,
) -> Result<(Taxonomy, Option<DuplicatePolicy>), CliError> {
    let path = flag.or_else(|| ctx.settings.taxonomy_path.clone());
    let Some(path) = path else {
        return Ok((Taxonomy::builtin(), None));
    };

    let path = expand_path(&path);
    let taxonomy_err = |e: tallysheet_recon::ReconError| CliError {
        code: EXIT_INVALID_TAXONOMY,
        message: format!("{}: {}", path.display(), e),
        hint: Some("expected `name = \"...\"` and `labels = [\"{A}\", \"{B}\"]`".to_string()),
    };

    let config = TaxonomyConfig::load(&path).map_err(taxonomy_err)?;
    let policy = config.duplicates;
    let taxonomy = config.taxonomy().map_err(taxonomy_err)?;
    log::debug!("taxonomy '{}' ({} labels) from {}", taxonomy.name(), taxonomy.len(), path.display());
    Ok((taxonomy, policy))
}

fn parse_delimiter(delimiter: Option<char>) -> Result<Option<u8>, CliError> {
    match delimiter {
        None => Ok(None),
        Some(c) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => Ok(Some(c as u8)),
        Some(c) => Err(CliError::args(format!("unsupported delimiter {:?}", c))
            .with_hint("use a single ASCII character such as , ; | or a tab")),
    }
}

pub fn cmd_apply(ctx: &Context, args: ApplyArgs) -> Result<(), CliError> {
    let (taxonomy, file_policy) = load_taxonomy(ctx, args.taxonomy)?;
    let policy = if args.strict_duplicates {
        DuplicatePolicy::Reject
    } else {
        file_policy.unwrap_or(ctx.settings.duplicates)
    };

    let row_text = args.row.unwrap_or_else(|| ctx.settings.start_row.to_string());
    let col_text = args.col.unwrap_or_else(|| ctx.settings.start_column.clone());
    let anchor = Anchor::new(parse_start_row(&row_text)?, resolve_column(&col_text)?);
    let delimiter = parse_delimiter(args.delimiter)?;

    // Resolve the target before reading input so a bad selection fails fast
    let target = if args.dry_run {
        None
    } else {
        let workbook = ctx.workbook(args.workbook)?;
        let sheet = ctx.sheet(args.sheet, &workbook)?;
        Some((workbook, sheet))
    };

    let csv = expand_path(&args.csv);
    let has_headers = ctx.settings.has_headers && !args.no_headers;
    let table = tallysheet_io::csv::read_raw_table(&csv, has_headers, delimiter)?;
    let (recon, report) = tallysheet_recon::run(&table, &taxonomy, policy)?;

    let projection = match &target {
        Some((workbook, sheet)) => Some(project(workbook, sheet, anchor, &recon.vector)?),
        None => None,
    };

    if args.json {
        let out = ApplyOutput {
            anchor,
            anchor_a1: anchor.a1(),
            dry_run: args.dry_run,
            report: &report,
            projection: projection.as_ref(),
        };
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::general(format!("JSON serialization error: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("taxonomy:  {} ({} labels)", taxonomy.name(), taxonomy.len());
    println!(
        "input:     {} record(s), {} matched, {} unmatched",
        report.summary.input_records, report.summary.matched, report.summary.unmatched
    );
    println!("missing:   {} label(s) filled with 0", report.summary.missing);
    if !recon.duplicates.is_empty() {
        println!("repeated:  {} label(s), last occurrence kept", recon.duplicates.len());
    }
    for line in summarize_unmatched(&recon.unmatched) {
        println!("{}", line);
    }

    match &projection {
        Some(result) => {
            let created = if result.sheet_created { " (new sheet)" } else { "" };
            println!(
                "wrote:     {} value(s) to '{}'{} at {} in {}",
                result.cells_written,
                result.sheet,
                created,
                result.range.as_deref().unwrap_or("-"),
                display_name(&result.workbook)
            );
        }
        None => println!(
            "dry run:   would write {} value(s) starting at {}",
            recon.vector.len(),
            anchor.a1()
        ),
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn cmd_taxonomy(ctx: &Context, taxonomy: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let (taxonomy, _) = load_taxonomy(ctx, taxonomy)?;

    if json {
        let out = json!({
            "name": taxonomy.name(),
            "labels": taxonomy.labels(),
        });
        println!("{}", out);
        return Ok(());
    }

    println!("{} ({} labels)", taxonomy.name(), taxonomy.len());
    for (i, label) in taxonomy.labels().iter().enumerate() {
        println!("{:>4}  {}", i + 1, label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_must_be_plain_ascii() {
        assert_eq!(parse_delimiter(None).unwrap(), None);
        assert_eq!(parse_delimiter(Some(';')).unwrap(), Some(b';'));
        assert_eq!(parse_delimiter(Some('\t')).unwrap(), Some(b'\t'));
        assert!(parse_delimiter(Some('"')).is_err());
        assert!(parse_delimiter(Some('\u{e9}')).is_err());
    }

    #[test]
    fn display_name_is_file_name() {
        assert_eq!(display_name(Path::new("/tmp/x/book.xlsx")), "book.xlsx");
    }
}
