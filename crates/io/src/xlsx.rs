// In-place editing of xlsx packages
//
// An xlsx file is a zip of XML parts. Writing a column rewrites only the
// target worksheet part (plus workbook.xml, its rels and [Content_Types].xml
// when a sheet is appended). Every other part is raw-copied, so styles,
// defined names, merged ranges, column widths, charts and anything else the
// file carries come out unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tallysheet_engine::cell_ref::{resolve_column, row_col_to_a1};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = "[Content_Types].xml";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_WORKSHEET: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Workbook children that must come after `<calcPr>`.
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// What a column write touched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnWrite {
    pub cells_written: usize,
    /// Cells that held a formula before they were overwritten.
    pub formulas_replaced: usize,
}

#[derive(Debug, Clone)]
struct SheetPart {
    name: String,
    /// Worksheet part path; `None` for chartsheets and dangling entries.
    part: Option<String>,
}

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

/// `<sheets>` content of workbook.xml.
#[derive(Debug, Default)]
struct SheetList {
    entries: Vec<(String, String)>,
    /// Qualified key of the relationship attribute, usually `r:id`.
    id_key: Option<String>,
    max_sheet_id: u32,
    main_ns: Option<String>,
    rel_ns: Option<String>,
}

/// An opened xlsx package with pending part edits.
pub struct XlsxPackage {
    source: Vec<u8>,
    names: BTreeSet<String>,
    workbook_part: String,
    sheets: Vec<SheetPart>,
    edited: BTreeMap<String, Vec<u8>>,
    removed: BTreeSet<String>,
}

impl XlsxPackage {
    pub fn open(source: Vec<u8>) -> Result<Self, String> {
        let names: BTreeSet<String> = {
            let archive = ZipArchive::new(Cursor::new(source.as_slice()))
                .map_err(|e| format!("not an xlsx package: {}", e))?;
            archive.file_names().map(str::to_string).collect()
        };

        let mut package = Self {
            source,
            names,
            workbook_part: String::new(),
            sheets: Vec::new(),
            edited: BTreeMap::new(),
            removed: BTreeSet::new(),
        };

        let root_rels = relationships(&package.read_part(&rels_path(""))?)?;
        package.workbook_part = root_rels
            .iter()
            .find(|r| r.kind.ends_with("/officeDocument"))
            .map(|r| resolve_target("", &r.target))
            .ok_or_else(|| "package has no workbook part".to_string())?;

        let list = sheet_list(&package.read_part(&package.workbook_part)?)?;
        let rels = relationships(&package.read_part(&rels_path(&package.workbook_part))?)?;
        let base = part_dir(&package.workbook_part);

        package.sheets = list
            .entries
            .into_iter()
            .map(|(name, rid)| {
                let part = rels
                    .iter()
                    .find(|r| r.id == rid && r.kind.ends_with("/worksheet"))
                    .map(|r| resolve_target(base, &r.target));
                SheetPart { name, part }
            })
            .collect();

        if package.sheets.is_empty() {
            return Err("workbook lists no sheets".to_string());
        }
        Ok(package)
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Append an empty worksheet named `name` after the existing sheets.
    pub fn add_sheet(&mut self, name: &str) -> Result<(), String> {
        let base = part_dir(&self.workbook_part).to_string();
        let part = (1..=u16::MAX as u32)
            .map(|n| format!("{}worksheets/sheet{}.xml", base, n))
            .find(|p| !self.has_part(p))
            .ok_or_else(|| "no free worksheet part name".to_string())?;

        let rels_part = rels_path(&self.workbook_part);
        let rels_xml = self.read_part(&rels_part)?;
        let rels = relationships(&rels_xml)?;
        let rel_id = (1..=u16::MAX as u32)
            .map(|n| format!("rId{}", n))
            .find(|id| !rels.iter().any(|r| &r.id == id))
            .ok_or_else(|| "no free relationship id".to_string())?;
        let rel_type = rels
            .iter()
            .find(|r| r.kind.ends_with("/worksheet"))
            .map(|r| r.kind.clone())
            .unwrap_or_else(|| REL_WORKSHEET.to_string());
        let target = &part[base.len()..];
        let rels_xml = append_child(
            &rels_xml,
            b"Relationships",
            "Relationship",
            &[("Id", rel_id.as_str()), ("Type", rel_type.as_str()), ("Target", target)],
        )?;

        let workbook_xml = self.read_part(&self.workbook_part)?;
        let list = sheet_list(&workbook_xml)?;
        let id_key = list.id_key.clone().unwrap_or_else(|| "r:id".to_string());
        let sheet_id = (list.max_sheet_id + 1).to_string();
        let workbook_xml = append_child(
            &workbook_xml,
            b"sheets",
            "sheet",
            &[("name", name), ("sheetId", sheet_id.as_str()), (id_key.as_str(), rel_id.as_str())],
        )?;

        let part_name = format!("/{}", part);
        let types_xml = append_child(
            &self.read_part(CONTENT_TYPES)?,
            b"Types",
            "Override",
            &[("PartName", part_name.as_str()), ("ContentType", CT_WORKSHEET)],
        )?;

        let sheet_xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <worksheet xmlns=\"{}\" xmlns:r=\"{}\"><sheetData/></worksheet>",
            list.main_ns.as_deref().unwrap_or(NS_MAIN),
            list.rel_ns.as_deref().unwrap_or(NS_RELATIONSHIPS),
        );

        self.edited.insert(rels_part, rels_xml);
        self.edited.insert(self.workbook_part.clone(), workbook_xml);
        self.edited.insert(CONTENT_TYPES.to_string(), types_xml);
        self.edited.insert(part.clone(), sheet_xml.into_bytes());
        self.sheets.push(SheetPart { name: name.to_string(), part: Some(part) });
        Ok(())
    }

    /// Write `values` down column `col` starting at `row` (both 1-based).
    pub fn write_column(&mut self, sheet: &str, row: u32, col: u32, values: &[f64]) -> Result<ColumnWrite, String> {
        let part = self
            .sheets
            .iter()
            .find(|s| s.name == sheet)
            .ok_or_else(|| format!("no sheet named '{}'", sheet))?
            .part
            .clone()
            .ok_or_else(|| format!("'{}' is not a worksheet", sheet))?;

        let writes: BTreeMap<u32, f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (row + i as u32, *v))
            .collect();

        let (xml, stats) = patch_sheet(&self.read_part(&part)?, col, writes)?;
        self.edited.insert(part, xml);

        // calcChain entries for overwritten formulas would make Excel repair the file
        if stats.formulas_replaced > 0 {
            self.drop_calc_chain()?;
        }
        let workbook_xml = with_full_calc(&self.read_part(&self.workbook_part)?)?;
        self.edited.insert(self.workbook_part.clone(), workbook_xml);

        Ok(stats)
    }

    /// Serialize the package: edited parts are re-compressed, the rest copied raw.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        let zip_err = |e: zip::result::ZipError| format!("zip: {}", e);
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice())).map_err(zip_err)?;
        let mut out = ZipWriter::new(Cursor::new(Vec::with_capacity(self.source.len())));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i).map_err(zip_err)?;
            let name = file.name().to_string();
            if self.removed.contains(&name) {
                continue;
            }
            match self.edited.get(&name) {
                Some(content) => {
                    out.start_file(name.as_str(), options).map_err(zip_err)?;
                    out.write_all(content).map_err(|e| e.to_string())?;
                }
                None => out.raw_copy_file(file).map_err(zip_err)?,
            }
        }

        for (name, content) in &self.edited {
            if !self.names.contains(name) {
                out.start_file(name.as_str(), options).map_err(zip_err)?;
                out.write_all(content).map_err(|e| e.to_string())?;
            }
        }

        Ok(out.finish().map_err(zip_err)?.into_inner())
    }

    fn has_part(&self, name: &str) -> bool {
        self.edited.contains_key(name) || (self.names.contains(name) && !self.removed.contains(name))
    }

    fn read_part(&self, name: &str) -> Result<Vec<u8>, String> {
        if let Some(content) = self.edited.get(name) {
            return Ok(content.clone());
        }
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))
            .map_err(|e| format!("not an xlsx package: {}", e))?;
        let mut file = archive
            .by_name(name)
            .map_err(|e| format!("missing part {}: {}", name, e))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| format!("cannot read {}: {}", name, e))?;
        Ok(content)
    }

    fn drop_calc_chain(&mut self) -> Result<(), String> {
        let rels_part = rels_path(&self.workbook_part);
        let rels_xml = self.read_part(&rels_part)?;
        let Some(rel) = relationships(&rels_xml)?
            .into_iter()
            .find(|r| r.kind.ends_with("/calcChain"))
        else {
            return Ok(());
        };

        let part = resolve_target(part_dir(&self.workbook_part), &rel.target);
        let rels_xml = drop_elements(&rels_xml, b"Relationship", |e| {
            attr_value(e, b"Id").as_deref() == Some(rel.id.as_str())
        })?;
        let part_name = format!("/{}", part);
        let types_xml = drop_elements(&self.read_part(CONTENT_TYPES)?, b"Override", |e| {
            attr_value(e, b"PartName").as_deref() == Some(part_name.as_str())
        })?;

        log::debug!("dropping {} after overwriting formulas", part);
        self.edited.insert(rels_part, rels_xml);
        self.edited.insert(CONTENT_TYPES.to_string(), types_xml);
        self.edited.remove(&part);
        self.removed.insert(part);
        Ok(())
    }
}

// ============================================================================
// Worksheet patching
// ============================================================================

/// Target row currently open in the event stream.
struct RowState {
    row: u32,
    value: f64,
    written: bool,
}

/// Rewrite one worksheet so that `writes` (row -> value) land in column `col`.
///
/// Existing cells in the span keep their style index but lose any formula or
/// string type. Rows and cells stay in ascending order.
fn patch_sheet(xml: &[u8], col: u32, mut writes: BTreeMap<u32, f64>) -> Result<(Vec<u8>, ColumnWrite), String> {
    let span = writes.keys().next().copied().zip(writes.keys().next_back().copied());

    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + writes.len() * 32));
    let mut buf = Vec::new();
    let mut stats = ColumnWrite::default();

    let mut prefix = String::new();
    let mut in_data = false;
    let mut last_row = 0u32;
    let mut last_col = 0u32;
    let mut row_state: Option<RowState> = None;

    // Dropping a replaced <c>: nesting depth, its style, whether it had <f>
    let mut skip_depth = 0usize;
    let mut replaced_style: Option<String> = None;
    let mut replaced_formula = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("worksheet XML: {}", e))?;

        if skip_depth > 0 {
            match &event {
                Event::Start(e) => {
                    replaced_formula |= e.local_name().as_ref() == b"f";
                    skip_depth += 1;
                }
                Event::Empty(e) => replaced_formula |= e.local_name().as_ref() == b"f",
                Event::End(_) => {
                    skip_depth -= 1;
                    if skip_depth == 0 {
                        if replaced_formula {
                            stats.formulas_replaced += 1;
                            replaced_formula = false;
                        }
                        if let Some(state) = row_state.as_mut() {
                            write_cell(&mut writer, &prefix, state.row, col, state.value, replaced_style.take())?;
                            state.written = true;
                            stats.cells_written += 1;
                        }
                    }
                }
                Event::Eof => return Err("worksheet XML ends inside a cell".to_string()),
                _ => {}
            }
            buf.clear();
            continue;
        }

        match event {
            Event::Eof => break,

            Event::Empty(e) if !in_data && e.local_name().as_ref() == b"dimension" => {
                let widened = span.and_then(|(first, last)| {
                    attr_value(&e, b"ref").and_then(|r| widen_dimension(&r, first, last, col))
                });
                match widened {
                    Some(r) => emit(&mut writer, Event::Empty(with_attr(&e, b"ref", &r)))?,
                    None => emit(&mut writer, Event::Empty(e))?,
                }
            }

            Event::Start(e) if !in_data && e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(&e);
                in_data = true;
                emit(&mut writer, Event::Start(e))?;
            }
            Event::Empty(e) if !in_data && e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(&e);
                emit(&mut writer, Event::Start(e.borrow()))?;
                flush_rows(&mut writer, &prefix, col, &mut writes, u32::MAX, &mut stats)?;
                emit(&mut writer, Event::End(e.to_end()))?;
            }
            Event::End(e) if in_data && e.local_name().as_ref() == b"sheetData" => {
                flush_rows(&mut writer, &prefix, col, &mut writes, u32::MAX, &mut stats)?;
                in_data = false;
                emit(&mut writer, Event::End(e))?;
            }

            Event::Start(e) if in_data && e.local_name().as_ref() == b"row" => {
                let r = row_number(&e).unwrap_or(last_row + 1);
                last_row = r;
                last_col = 0;
                flush_rows(&mut writer, &prefix, col, &mut writes, r, &mut stats)?;
                match writes.remove(&r) {
                    Some(value) => {
                        row_state = Some(RowState { row: r, value, written: false });
                        emit(&mut writer, Event::Start(without_attr(&e, b"spans")))?;
                    }
                    None => {
                        row_state = None;
                        emit(&mut writer, Event::Start(e))?;
                    }
                }
            }
            Event::Empty(e) if in_data && e.local_name().as_ref() == b"row" => {
                let r = row_number(&e).unwrap_or(last_row + 1);
                last_row = r;
                flush_rows(&mut writer, &prefix, col, &mut writes, r, &mut stats)?;
                match writes.remove(&r) {
                    Some(value) => {
                        let start = without_attr(&e, b"spans");
                        emit(&mut writer, Event::Start(start.borrow()))?;
                        write_cell(&mut writer, &prefix, r, col, value, None)?;
                        stats.cells_written += 1;
                        emit(&mut writer, Event::End(start.to_end()))?;
                    }
                    None => emit(&mut writer, Event::Empty(e))?,
                }
            }
            Event::End(e) if in_data && e.local_name().as_ref() == b"row" => {
                if let Some(state) = row_state.take() {
                    if !state.written {
                        write_cell(&mut writer, &prefix, state.row, col, state.value, None)?;
                        stats.cells_written += 1;
                    }
                }
                emit(&mut writer, Event::End(e))?;
            }

            Event::Start(e) if in_data && e.local_name().as_ref() == b"c" => {
                let c = cell_column(&e).unwrap_or(last_col + 1);
                last_col = c;
                match row_state.as_mut() {
                    Some(state) if !state.written && c == col => {
                        replaced_style = attr_value(&e, b"s");
                        skip_depth = 1;
                    }
                    Some(state) if !state.written && c > col => {
                        write_cell(&mut writer, &prefix, state.row, col, state.value, None)?;
                        state.written = true;
                        stats.cells_written += 1;
                        emit(&mut writer, Event::Start(e))?;
                    }
                    _ => emit(&mut writer, Event::Start(e))?,
                }
            }
            Event::Empty(e) if in_data && e.local_name().as_ref() == b"c" => {
                let c = cell_column(&e).unwrap_or(last_col + 1);
                last_col = c;
                match row_state.as_mut() {
                    Some(state) if !state.written && c == col => {
                        write_cell(&mut writer, &prefix, state.row, col, state.value, attr_value(&e, b"s"))?;
                        state.written = true;
                        stats.cells_written += 1;
                    }
                    Some(state) if !state.written && c > col => {
                        write_cell(&mut writer, &prefix, state.row, col, state.value, None)?;
                        state.written = true;
                        stats.cells_written += 1;
                        emit(&mut writer, Event::Empty(e))?;
                    }
                    _ => emit(&mut writer, Event::Empty(e))?,
                }
            }

            other => emit(&mut writer, other)?,
        }
        buf.clear();
    }

    if !writes.is_empty() {
        return Err("worksheet has no <sheetData>".to_string());
    }
    Ok((writer.into_inner(), stats))
}

/// Emit new rows for every pending write above row `below`.
fn flush_rows(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    col: u32,
    writes: &mut BTreeMap<u32, f64>,
    below: u32,
    stats: &mut ColumnWrite,
) -> Result<(), String> {
    while let Some((&row, &value)) = writes.first_key_value() {
        if row >= below {
            break;
        }
        writes.remove(&row);

        let row_text = row.to_string();
        let mut start = BytesStart::new(format!("{}row", prefix));
        start.push_attribute(("r", row_text.as_str()));
        emit(writer, Event::Start(start.borrow()))?;
        write_cell(writer, prefix, row, col, value, None)?;
        emit(writer, Event::End(start.to_end()))?;
        stats.cells_written += 1;
    }
    Ok(())
}

fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row: u32,
    col: u32,
    value: f64,
    style: Option<String>,
) -> Result<(), String> {
    let reference = row_col_to_a1(row, col);
    let mut cell = BytesStart::new(format!("{}c", prefix));
    cell.push_attribute(("r", reference.as_str()));
    if let Some(style) = &style {
        cell.push_attribute(("s", style.as_str()));
    }
    let v = format!("{}v", prefix);

    emit(writer, Event::Start(cell.borrow()))?;
    emit(writer, Event::Start(BytesStart::new(v.as_str())))?;
    emit(writer, Event::Text(BytesText::new(&value.to_string())))?;
    emit(writer, Event::End(BytesEnd::new(v.as_str())))?;
    emit(writer, Event::End(cell.to_end()))
}

fn row_number(e: &BytesStart) -> Option<u32> {
    attr_value(e, b"r").and_then(|r| r.parse().ok()).filter(|r| *r >= 1)
}

fn cell_column(e: &BytesStart) -> Option<u32> {
    attr_value(e, b"r").and_then(|r| split_cell_ref(&r)).map(|(_, col)| col)
}

/// `"B12"` -> `(12, 2)`, both 1-based.
fn split_cell_ref(text: &str) -> Option<(u32, u32)> {
    let text = text.replace('$', "");
    let digits = text.find(|c: char| c.is_ascii_digit())?;
    let (letters, number) = text.split_at(digits);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = resolve_column(letters).ok()?;
    let row = number.parse::<u32>().ok().filter(|r| *r >= 1)?;
    Some((row, col))
}

/// Grow a `<dimension ref>` so it covers rows `first..=last` of `col`.
fn widen_dimension(current: &str, first: u32, last: u32, col: u32) -> Option<String> {
    let mut corners = current.split(':');
    let (r1, c1) = split_cell_ref(corners.next()?)?;
    let (r2, c2) = match corners.next() {
        Some(corner) => split_cell_ref(corner)?,
        None => (r1, c1),
    };
    let top_left = row_col_to_a1(r1.min(first), c1.min(col));
    let bottom_right = row_col_to_a1(r2.max(last), c2.max(col));
    Some(format!("{}:{}", top_left, bottom_right))
}

// ============================================================================
// Package-level XML edits
// ============================================================================

/// Copy `xml`, adding `<child attrs/>` as the last child of the first
/// `parent` element. The child takes the parent's namespace prefix.
fn append_child(xml: &[u8], parent: &[u8], child: &str, attrs: &[(&str, &str)]) -> Result<Vec<u8>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 160));
    let mut buf = Vec::new();
    let mut prefix = String::new();
    let mut done = false;

    let build = |prefix: &str| {
        let mut element = BytesStart::new(format!("{}{}", prefix, child));
        for attr in attrs {
            element.push_attribute(*attr);
        }
        element
    };

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| format!("XML: {}", e))?;
        match event {
            Event::Eof => break,
            Event::Start(e) if !done && e.local_name().as_ref() == parent => {
                prefix = element_prefix(&e);
                emit(&mut writer, Event::Start(e))?;
            }
            Event::End(e) if !done && e.local_name().as_ref() == parent => {
                emit(&mut writer, Event::Empty(build(&prefix)))?;
                emit(&mut writer, Event::End(e))?;
                done = true;
            }
            Event::Empty(e) if !done && e.local_name().as_ref() == parent => {
                emit(&mut writer, Event::Start(e.borrow()))?;
                emit(&mut writer, Event::Empty(build(&element_prefix(&e))))?;
                emit(&mut writer, Event::End(e.to_end()))?;
                done = true;
            }
            other => emit(&mut writer, other)?,
        }
        buf.clear();
    }

    if !done {
        return Err(format!("no <{}> element", String::from_utf8_lossy(parent)));
    }
    Ok(writer.into_inner())
}

/// Copy `xml` without the empty `local` elements that `matches` selects.
fn drop_elements(xml: &[u8], local: &[u8], matches: impl Fn(&BytesStart) -> bool) -> Result<Vec<u8>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| format!("XML: {}", e))?;
        match event {
            Event::Eof => break,
            Event::Empty(e) if e.local_name().as_ref() == local && matches(&e) => {}
            other => emit(&mut writer, other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

/// Mark the workbook for a full recalculation on open, so formulas that read
/// the written column do not show stale cached results.
fn with_full_calc(xml: &[u8]) -> Result<Vec<u8>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 48));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut prefix = String::new();
    let mut done = false;

    let calc_pr = |prefix: &str| {
        let mut element = BytesStart::new(format!("{}calcPr", prefix));
        element.push_attribute(("fullCalcOnLoad", "1"));
        element
    };

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| format!("workbook XML: {}", e))?;
        match event {
            Event::Eof => break,
            Event::Empty(e) if depth == 1 && !done && e.local_name().as_ref() == b"calcPr" => {
                emit(&mut writer, Event::Empty(with_attr(&e, b"fullCalcOnLoad", "1")))?;
                done = true;
            }
            Event::Start(e) if depth == 1 && !done && e.local_name().as_ref() == b"calcPr" => {
                emit(&mut writer, Event::Start(with_attr(&e, b"fullCalcOnLoad", "1")))?;
                done = true;
                depth += 1;
            }
            Event::Empty(e) if depth == 1 && !done && AFTER_CALC_PR.contains(&e.local_name().as_ref()) => {
                emit(&mut writer, Event::Empty(calc_pr(&prefix)))?;
                done = true;
                emit(&mut writer, Event::Empty(e))?;
            }
            Event::Start(e) => {
                if depth == 0 {
                    prefix = element_prefix(&e);
                } else if depth == 1 && !done && AFTER_CALC_PR.contains(&e.local_name().as_ref()) {
                    emit(&mut writer, Event::Empty(calc_pr(&prefix)))?;
                    done = true;
                }
                depth += 1;
                emit(&mut writer, Event::Start(e))?;
            }
            Event::End(e) => {
                if depth == 1 && !done {
                    emit(&mut writer, Event::Empty(calc_pr(&prefix)))?;
                    done = true;
                }
                depth = depth.saturating_sub(1);
                emit(&mut writer, Event::End(e))?;
            }
            other => emit(&mut writer, other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

// ============================================================================
// Parsing helpers
// ============================================================================

fn relationships(xml: &[u8]) -> Result<Vec<Relationship>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| format!("relationships XML: {}", e))? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(e, b"Id");
                let kind = attr_value(e, b"Type");
                let target = attr_value(e, b"Target");
                if let (Some(id), Some(kind), Some(target)) = (id, kind, target) {
                    out.push(Relationship { id, kind, target });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn sheet_list(xml: &[u8]) -> Result<SheetList, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut list = SheetList::default();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| format!("workbook XML: {}", e))? {
            Event::Start(ref e) if !seen_root => {
                seen_root = true;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.as_ref() {
                        b"xmlns" => list.main_ns = Some(value),
                        b"xmlns:r" => list.rel_ns = Some(value),
                        _ => {}
                    }
                }
            }
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(e, b"name");
                if let Some(sheet_id) = attr_value(e, b"sheetId").and_then(|v| v.parse::<u32>().ok()) {
                    list.max_sheet_id = list.max_sheet_id.max(sheet_id);
                }
                let rid = e.attributes().flatten().find(|a| {
                    a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id"
                });
                if let (Some(name), Some(rid)) = (name, rid) {
                    if list.id_key.is_none() {
                        list.id_key = Some(String::from_utf8_lossy(rid.key.as_ref()).into_owned());
                    }
                    list.entries.push((name, String::from_utf8_lossy(&rid.value).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(list)
}

/// Unescaped value of an unprefixed attribute.
fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    let attr = e.attributes().flatten().find(|a| a.key.as_ref() == key)?;
    let raw = String::from_utf8_lossy(&attr.value).into_owned();
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => Some(value.into_owned()),
        Err(_) => Some(raw),
    }
}

/// `"x:"` for `<x:sheetData>`, empty for unprefixed elements.
fn element_prefix(e: &BytesStart) -> String {
    e.name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default()
}

fn without_attr(e: &BytesStart, key: &[u8]) -> BytesStart<'static> {
    let mut out = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() != key {
            out.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
        }
    }
    out
}

fn with_attr(e: &BytesStart, key: &[u8], value: &str) -> BytesStart<'static> {
    let mut out = without_attr(e, key);
    out.push_attribute((key, value.as_bytes()));
    out
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| format!("XML write: {}", e))
}

/// Directory of a part, with trailing slash: `xl/workbook.xml` -> `xl/`.
fn part_dir(part: &str) -> &str {
    part.rfind('/').map(|i| &part[..=i]).unwrap_or("")
}

/// Relationships part belonging to `part`; `""` gives the package rels.
fn rels_path(part: &str) -> String {
    let dir = part_dir(part);
    format!("{}_rels/{}.rels", dir, &part[dir.len()..])
}

/// Resolve a relationship target against the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{}{}", base_dir, target),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
