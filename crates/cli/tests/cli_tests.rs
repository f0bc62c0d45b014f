// End-to-end tests for the `tsheet` binary.
//
// Every test gets its own config directory so session state never leaks
// between tests or into the user's real config.
//
// Run with: cargo test -p tallysheet-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn tsheet(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_tsheet"))
            .args(args)
            .current_dir(self.dir.path())
            .env("TALLYSHEET_CONFIG_DIR", self.path("config"))
            .env_remove("TALLYSHEET_TAXONOMY")
            .env_remove("TSHEET_LOG")
            .output()
            .expect("run tsheet")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Workbook with a header in A1 and a second untouched sheet.
    fn workbook(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        let mut wb = XlsxWorkbook::new();
        let first = wb.add_worksheet().set_name("Sheet1").unwrap();
        first.write_string(0, 0, "Counts").unwrap();
        let second = wb.add_worksheet().set_name("Notes").unwrap();
        second.write_string(0, 0, "keep").unwrap();
        wb.save(&path).unwrap();
        path
    }

    fn xyz_taxonomy(&self) -> PathBuf {
        self.write("xyz.toml", "name = \"xyz\"\nlabels = [\"{X}\", \"{Y}\", \"{Z}\"]\n")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn assert_success(out: &Output) {
    assert!(
        out.status.success(),
        "exit code: {:?}\nstdout: {}\nstderr: {}",
        out.status.code(),
        stdout(out),
        stderr(out)
    );
}

fn cell(path: &Path, sheet: &str, row: u32, col: u32) -> Option<Data> {
    let mut wb = open_workbook_auto(path).unwrap();
    let range = wb.worksheet_range(sheet).unwrap();
    range.get_value((row, col)).cloned()
}

fn parse_json(out: &Output) -> serde_json::Value {
    serde_json::from_str(stdout(out).trim())
        .unwrap_or_else(|e| panic!("stdout must be JSON: {e}\n{}", stdout(out)))
}

// ===========================================================================
// apply
// ===========================================================================

#[test]
fn apply_writes_counts_in_taxonomy_order() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    let taxonomy = env.xyz_taxonomy();
    env.write("data.csv", "label,count\n{Z},5\n{X},2\n");

    let out = env.tsheet(&[
        "apply",
        "data.csv",
        "--workbook",
        book.to_str().unwrap(),
        "--taxonomy",
        taxonomy.to_str().unwrap(),
        "--col",
        "B",
    ]);
    assert_success(&out);
    assert!(stdout(&out).contains("3 value(s)"), "{}", stdout(&out));

    assert_eq!(cell(&book, "Sheet1", 1, 1), Some(Data::Float(2.0)));
    assert_eq!(cell(&book, "Sheet1", 2, 1), Some(Data::Float(0.0)));
    assert_eq!(cell(&book, "Sheet1", 3, 1), Some(Data::Float(5.0)));
    assert_eq!(cell(&book, "Sheet1", 0, 0), Some(Data::String("Counts".into())));
    assert_eq!(cell(&book, "Notes", 0, 0), Some(Data::String("keep".into())));
}

#[test]
fn use_then_apply_follows_the_session() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    let taxonomy = env.xyz_taxonomy();
    env.write("data.csv", "label;count\n{Y};7\n");

    let out = env.tsheet(&["use", book.to_str().unwrap(), "--sheet", "March"]);
    assert_success(&out);
    assert!(stderr(&out).contains("will create it"));

    let out = env.tsheet(&["apply", "data.csv", "--taxonomy", taxonomy.to_str().unwrap(), "--col", "AB"]);
    assert_success(&out);
    assert!(stdout(&out).contains("(new sheet)"));

    // Default start row is 2; AB is column 28
    assert_eq!(cell(&book, "March", 1, 27), Some(Data::Float(0.0)));
    assert_eq!(cell(&book, "March", 2, 27), Some(Data::Float(7.0)));
    assert_eq!(cell(&book, "March", 3, 27), Some(Data::Float(0.0)));
}

#[test]
fn apply_twice_is_stable() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    let taxonomy = env.xyz_taxonomy();
    env.write("data.csv", "label,count\n{X},1\n{Z},3\n");
    let args = [
        "apply",
        "data.csv",
        "--workbook",
        book.to_str().unwrap(),
        "--taxonomy",
        taxonomy.to_str().unwrap(),
    ];

    assert_success(&env.tsheet(&args));
    let first: Vec<Option<Data>> = (0..5).map(|r| cell(&book, "Sheet1", r, 0)).collect();
    assert_success(&env.tsheet(&args));
    let second: Vec<Option<Data>> = (0..5).map(|r| cell(&book, "Sheet1", r, 0)).collect();
    assert_eq!(first, second);
    assert_eq!(second[1], Some(Data::Float(1.0)));
}

#[test]
fn dry_run_json_needs_no_workbook() {
    let env = Env::new();
    env.write("data.csv", "evaluation,transactions\n{DEBIT_ATM},4\n{NOT_A_LABEL},1\n");

    let out = env.tsheet(&["apply", "data.csv", "--dry-run", "--json"]);
    assert_success(&out);

    let val = parse_json(&out);
    assert_eq!(val["dry_run"], true);
    assert!(val["projection"].is_null());
    assert_eq!(val["anchor_a1"], "A2");
    assert_eq!(val["report"]["rows"].as_array().unwrap().len(), 117);
    assert_eq!(val["report"]["summary"]["unmatched"], 1);
    assert_eq!(val["report"]["unmatched"][0]["label"], "{NOT_A_LABEL}");
}

// ===========================================================================
// apply failures
// ===========================================================================

#[test]
fn no_workbook_selected_is_a_usage_error() {
    let env = Env::new();
    env.write("data.csv", "label,count\n{X},1\n");

    let out = env.tsheet(&["apply", "data.csv"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("no workbook selected"));
    assert!(stderr(&out).contains("hint:"));
}

#[test]
fn missing_workbook_exit_code() {
    let env = Env::new();
    env.write("data.csv", "label,count\n{X},1\n");

    let out = env.tsheet(&["apply", "data.csv", "--workbook", "absent.xlsx", "--sheet", "S"]);
    assert_eq!(out.status.code(), Some(5), "{}", stderr(&out));
}

#[test]
fn legacy_workbook_is_refused() {
    let env = Env::new();
    let xlsx = env.workbook("book.xlsx");
    let book = env.dir.path().join("book.xls");
    fs::copy(&xlsx, &book).unwrap();
    let before = fs::read(&book).unwrap();
    env.write("data.csv", "label,count\n{DEBIT_ATM},1\n");

    let out = env.tsheet(&["apply", "data.csv", "--workbook", book.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(5), "{}", stderr(&out));
    assert!(stderr(&out).contains(".xlsm"));
    assert_eq!(fs::read(&book).unwrap(), before);
}

#[test]
fn bad_count_leaves_workbook_untouched() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    let before = fs::read(&book).unwrap();
    env.write("data.csv", "label,count\n{X},1\n{Y},lots\n");

    let out = env.tsheet(&["apply", "data.csv", "--workbook", book.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(4), "{}", stderr(&out));
    assert!(stderr(&out).contains("lots"));
    assert_eq!(fs::read(&book).unwrap(), before);
}

#[test]
fn strict_duplicates_exit_code() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    let taxonomy = env.xyz_taxonomy();
    env.write("data.csv", "label,count\n{X},1\n{X},2\n");

    let out = env.tsheet(&[
        "apply",
        "data.csv",
        "--workbook",
        book.to_str().unwrap(),
        "--taxonomy",
        taxonomy.to_str().unwrap(),
        "--strict-duplicates",
    ]);
    assert_eq!(out.status.code(), Some(9), "{}", stderr(&out));
}

#[test]
fn bad_column_reference_exit_code() {
    let env = Env::new();
    env.write("data.csv", "label,count\n{X},1\n");

    let out = env.tsheet(&["apply", "data.csv", "--dry-run", "--col", "A1"]);
    assert_eq!(out.status.code(), Some(3));

    let out = env.tsheet(&["apply", "data.csv", "--dry-run", "--row", "0"]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn invalid_taxonomy_exit_code() {
    let env = Env::new();
    let taxonomy = env.write("bad.toml", "name = \"dup\"\nlabels = [\"{A}\", \"{A}\"]\n");

    let out = env.tsheet(&["taxonomy", "--taxonomy", taxonomy.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(10), "{}", stderr(&out));

    let out = env.tsheet(&["taxonomy", "--taxonomy", "missing.toml"]);
    assert_eq!(out.status.code(), Some(10));
}

#[test]
fn missing_input_file_exit_code() {
    let env = Env::new();
    let out = env.tsheet(&["apply", "nope.csv", "--dry-run"]);
    assert_eq!(out.status.code(), Some(8));
}

// ===========================================================================
// Read-only commands
// ===========================================================================

#[test]
fn sheets_json() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");

    let out = env.tsheet(&["sheets", "--workbook", book.to_str().unwrap(), "--json"]);
    assert_success(&out);
    let val = parse_json(&out);
    assert_eq!(val["sheets"], serde_json::json!(["Sheet1", "Notes"]));
}

#[test]
fn preview_json_shape() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    assert_success(&env.tsheet(&["use", book.to_str().unwrap()]));

    let out = env.tsheet(&["preview", "--json"]);
    assert_success(&out);
    let val = parse_json(&out);
    assert_eq!(val["sheet"], "Sheet1");
    assert_eq!(val["columns"], serde_json::json!(["Col 1"]));
    assert_eq!(val["rows"], serde_json::json!([["Counts"]]));
}

#[test]
fn preview_unknown_sheet() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");

    let out = env.tsheet(&["preview", "--workbook", book.to_str().unwrap(), "--sheet", "Nope"]);
    assert_eq!(out.status.code(), Some(6));
    assert!(stderr(&out).contains("Sheet1, Notes"));
}

#[test]
fn export_is_byte_identical() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    assert_success(&env.tsheet(&["use", book.to_str().unwrap()]));

    let dest = env.path("copy.xlsx");
    let out = env.tsheet(&["export", dest.to_str().unwrap()]);
    assert_success(&out);
    assert_eq!(fs::read(&dest).unwrap(), fs::read(&book).unwrap());
}

#[test]
fn builtin_taxonomy_listing() {
    let env = Env::new();
    let out = env.tsheet(&["taxonomy", "--json"]);
    assert_success(&out);
    let val = parse_json(&out);
    let labels = val["labels"].as_array().unwrap();
    assert_eq!(labels.len(), 117);
    assert_eq!(labels[0], "{INCOME_CHILD_BENEFIT}");
    assert_eq!(labels[116], "{INFO_RESERVATION}");
}

#[test]
fn column_command() {
    let env = Env::new();
    let out = env.tsheet(&["column", "ab"]);
    assert_success(&out);
    assert_eq!(stdout(&out).trim(), "28 (AB)");

    let out = env.tsheet(&["column", "27"]);
    assert_eq!(stdout(&out).trim(), "27 (AA)");

    let out = env.tsheet(&["column", "0"]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn session_show_and_clear() {
    let env = Env::new();
    let book = env.workbook("book.xlsx");
    assert_success(&env.tsheet(&["use", book.to_str().unwrap()]));

    let val = parse_json(&env.tsheet(&["session", "--json"]));
    assert!(val["workbook"].as_str().unwrap().ends_with("book.xlsx"));
    assert_eq!(val["sheet"], "Sheet1");

    assert_success(&env.tsheet(&["session", "--clear"]));
    let val = parse_json(&env.tsheet(&["session", "--json"]));
    assert!(val["workbook"].is_null());
}
