//! Workbook selection and read-only commands.
//!
//! - `use`: pick the workbook (and sheet) later commands default to
//! - `sheets` / `preview`: inspect without writing
//! - `export`: copy the workbook elsewhere
//! - `session`: show or reset the selection

use std::path::PathBuf;

use serde_json::json;
use tallysheet_engine::sheet::is_valid_sheet_name;
use tallysheet_io::{list_sheet_names, read_rows, PreviewGrid};

use crate::util::{cell_to_json, expand_path, render_table, same_file};
use crate::{CliError, Context};

pub fn cmd_use(ctx: &mut Context, workbook: PathBuf, sheet: Option<String>) -> Result<(), CliError> {
    let workbook = expand_path(&workbook);
    let names = list_sheet_names(&workbook)?;
    let workbook = workbook.canonicalize().unwrap_or(workbook);

    let sheet = match sheet {
        Some(sheet) => {
            if !is_valid_sheet_name(&sheet) {
                return Err(CliError::args(format!("invalid sheet name '{}'", sheet))
                    .with_hint("names are 1-31 characters without []:*?/\\"));
            }
            if !names.iter().any(|n| *n == sheet) {
                eprintln!("note: sheet '{}' does not exist yet; `tsheet apply` will create it", sheet);
            }
            Some(sheet)
        }
        None => names.first().cloned(),
    };

    ctx.session.select_workbook(workbook.clone(), sheet.clone());
    ctx.save_session()?;

    println!("workbook: {}", workbook.display());
    println!("sheet:    {}", sheet.as_deref().unwrap_or("-"));
    Ok(())
}

pub fn cmd_sheets(ctx: &Context, workbook: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let workbook = ctx.workbook(workbook)?;
    let names = list_sheet_names(&workbook)?;

    let selected = ctx
        .session
        .workbook
        .as_deref()
        .filter(|w| same_file(w, &workbook))
        .and(ctx.session.sheet.as_deref());

    if json {
        let out = json!({
            "workbook": workbook.display().to_string(),
            "sheets": names,
            "selected": selected,
        });
        println!("{}", out);
        return Ok(());
    }

    for (i, name) in names.iter().enumerate() {
        let marker = if Some(name.as_str()) == selected { "*" } else { " " };
        println!("{} {:>3}  {}", marker, i + 1, name);
    }
    Ok(())
}

pub fn cmd_preview(
    ctx: &Context,
    workbook: Option<PathBuf>,
    sheet: Option<String>,
    rows: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let workbook = ctx.workbook(workbook)?;
    let sheet = ctx.sheet(sheet, &workbook)?;
    let max_rows = rows.unwrap_or(ctx.settings.preview_rows);

    let grid = PreviewGrid::from_rows(read_rows(&workbook, &sheet, max_rows)?);

    if json {
        let rows: Vec<Vec<serde_json::Value>> = grid
            .rows
            .iter()
            .map(|row| row.iter().map(cell_to_json).collect())
            .collect();
        let out = json!({
            "sheet": sheet,
            "columns": grid.columns,
            "rows": rows,
        });
        println!("{}", out);
        return Ok(());
    }

    if grid.is_empty() {
        println!("sheet '{}' is empty", sheet);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = grid
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.raw_display()).collect())
        .collect();
    print!("{}", render_table(&grid.columns, &rows));
    Ok(())
}

pub fn cmd_export(ctx: &Context, dest: PathBuf, workbook: Option<PathBuf>) -> Result<(), CliError> {
    let workbook = ctx.workbook(workbook)?;
    let dest = expand_path(&dest);

    let bytes = tallysheet_io::export_copy(&workbook, &dest)?;
    println!("exported {} ({} bytes)", dest.display(), bytes);
    Ok(())
}

pub fn cmd_session(ctx: &mut Context, clear: bool, json: bool) -> Result<(), CliError> {
    if clear {
        ctx.session.clear();
        ctx.save_session()?;
        if !json {
            println!("session cleared");
            return Ok(());
        }
    }

    if json {
        let out = json!({
            "workbook": ctx.session.workbook.as_ref().map(|w| w.display().to_string()),
            "sheet": ctx.session.sheet,
            "config_dir": tallysheet_config::config_dir().display().to_string(),
        });
        println!("{}", out);
        return Ok(());
    }

    match &ctx.session.workbook {
        Some(workbook) => {
            println!("workbook: {}", workbook.display());
            println!("sheet:    {}", ctx.session.sheet.as_deref().unwrap_or("-"));
        }
        None => println!("no workbook selected"),
    }
    Ok(())
}
