//! XLSX reader

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::read_styles_xml;
use crate::xml::{attr_value, decode_excel_escapes};
use dcf_sheets_core::style::Style;
use dcf_sheets_core::{
    CellAddress, CellComment, CellError, CellValue, Hyperlink, NameScope, NamedRange, Workbook,
    Worksheet, MAX_COLS,
};

const WORKSHEET_REL: &str = "/worksheet";
const COMMENTS_REL: &str = "/comments";

/// A `<sheet>` entry of workbook.xml
#[derive(Debug)]
struct SheetEntry {
    name: String,
    r_id: String,
}

/// A `<definedName>` entry of workbook.xml
#[derive(Debug)]
struct DefinedNameEntry {
    name: String,
    local_sheet_id: Option<usize>,
    hidden: bool,
    refers_to: String,
}

#[derive(Debug, Default)]
struct WorkbookPart {
    sheets: Vec<SheetEntry>,
    defined_names: Vec<DefinedNameEntry>,
    active_tab: usize,
}

/// One entry of a `.rels` part, with the target resolved to an archive path
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

fn find_rel<'a>(rels: &'a [Relationship], suffix: &str) -> Option<&'a Relationship> {
    rels.iter().find(|r| r.rel_type.ends_with(suffix))
}

/// Resolve a relationship target against the folder of the part that owns it
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Which text node of a cell is being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellText {
    None,
    Value,
    Formula,
    Inline,
}

/// Accumulated state for the `<c>` element being parsed
#[derive(Debug, Default)]
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
    inline: Option<String>,
}

impl PendingCell {
    fn from_element(e: &BytesStart<'_>) -> Self {
        Self {
            reference: attr_value(e, b"r"),
            cell_type: attr_value(e, b"t"),
            style: attr_value(e, b"s").and_then(|s| s.parse().ok()),
            ..Self::default()
        }
    }

    fn push_text(&mut self, target: CellText, text: &str) {
        let slot = match target {
            CellText::Value => &mut self.value,
            CellText::Formula => &mut self.formula,
            CellText::Inline => &mut self.inline,
            CellText::None => return,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let path = path.as_ref();
        log::debug!("reading xlsx workbook from {}", path.display());
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let cell_styles = Self::read_styles(&mut archive)?;
        let workbook_part = Self::read_workbook_xml(&mut archive)?;
        let workbook_rels = Self::read_relationships(&mut archive, "xl/workbook.xml")?;

        let mut worksheets = Vec::with_capacity(workbook_part.sheets.len());
        for entry in &workbook_part.sheets {
            let rel = workbook_rels
                .iter()
                .find(|r| r.id == entry.r_id && r.rel_type.ends_with(WORKSHEET_REL));
            let Some(rel) = rel else {
                log::warn!(
                    "sheet '{}' ({}) is not a worksheet part, skipping",
                    entry.name,
                    entry.r_id
                );
                continue;
            };

            let mut worksheet = Worksheet::new(entry.name.clone());
            let sheet_rels = Self::read_relationships(&mut archive, &rel.target)?;
            Self::read_worksheet(
                &mut archive,
                &rel.target,
                &mut worksheet,
                &shared_strings,
                &cell_styles,
                &sheet_rels,
            )?;
            if let Some(comments) = find_rel(&sheet_rels, COMMENTS_REL) {
                Self::read_comments(&mut archive, &comments.target, &mut worksheet)?;
            }
            worksheets.push(worksheet);
        }

        let sheet_names: Vec<String> = worksheets.iter().map(|ws| ws.name().to_string()).collect();
        let mut workbook = Workbook::from_worksheets(worksheets)?;

        for entry in workbook_part.defined_names {
            let scope = match entry.local_sheet_id {
                None => NameScope::Workbook,
                Some(idx) => match sheet_names.get(idx) {
                    Some(sheet) => NameScope::Sheet(sheet.clone()),
                    None => {
                        log::warn!("name '{}' refers to unknown sheet {}", entry.name, idx);
                        continue;
                    }
                },
            };
            let mut range = NamedRange::new(entry.name, entry.refers_to, scope);
            range.hidden = entry.hidden;
            if let Err(e) = workbook.define_name(range) {
                log::warn!("skipping defined name: {}", e);
            }
        }

        if let Some(active) = sheet_names.get(workbook_part.active_tab) {
            workbook.set_active_sheet(active)?;
        }

        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<Vec<Style>> {
        match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file),
            Err(_) => Ok(vec![Style::default()]),
        }
    }

    /// Read workbook.xml: sheets, defined names and the active tab
    fn read_workbook_xml<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<WorkbookPart> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut part = WorkbookPart::default();
        let mut pending_name: Option<DefinedNameEntry> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"sheet" => {
                        if let (Some(name), Some(r_id)) =
                            (attr_value(&e, b"name"), attr_value(&e, b"r:id"))
                        {
                            part.sheets.push(SheetEntry { name, r_id });
                        }
                    }
                    b"workbookView" => {
                        part.active_tab = attr_value(&e, b"activeTab")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                    }
                    b"definedName" => {
                        pending_name = attr_value(&e, b"name").map(|name| DefinedNameEntry {
                            name,
                            local_sheet_id: attr_value(&e, b"localSheetId")
                                .and_then(|v| v.parse().ok()),
                            hidden: attr_value(&e, b"hidden").is_some_and(|v| v == "1"),
                            refers_to: String::new(),
                        });
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let (Some(entry), Ok(text)) = (pending_name.as_mut(), e.unescape()) {
                        entry.refers_to.push_str(&text);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"definedName" => {
                    if let Some(entry) = pending_name.take() {
                        part.defined_names.push(entry);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(part)
    }

    /// Read the relationships of `part`; a part without a `.rels` file has none
    fn read_relationships<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        part: &str,
    ) -> XlsxResult<Vec<Relationship>> {
        let file = match archive.by_name(&rels_path_for(part)) {
            Ok(f) => f,
            Err(_) => return Ok(Vec::new()),
        };

        let base_dir = parent_dir(part);
        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");
                    let external = attr_value(&e, b"TargetMode").is_some_and(|m| m == "External");

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        let target = if external {
                            target
                        } else {
                            resolve_target(base_dir, &target)
                        };
                        rels.push(Relationship {
                            id,
                            rel_type,
                            target,
                            external,
                        });
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet from the archive
    fn read_worksheet<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        cell_styles: &[Style],
        rels: &[Relationship],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();

        let mut cell: Option<PendingCell> = None;
        let mut text_target = CellText::None;
        let mut in_inline_str = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => cell = Some(PendingCell::from_element(&e)),
                    b"v" if cell.is_some() => text_target = CellText::Value,
                    b"f" if cell.is_some() => text_target = CellText::Formula,
                    b"is" if cell.is_some() => in_inline_str = true,
                    b"rPh" => in_phonetic = true,
                    b"t" if in_inline_str && !in_phonetic => text_target = CellText::Inline,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"c" => {
                        let pending = PendingCell::from_element(&e);
                        Self::process_cell(worksheet, pending, shared_strings, cell_styles)?;
                    }
                    b"f" => {
                        if cell.is_some() {
                            log::debug!("shared formula child in {}, keeping cached value", path);
                        }
                    }
                    b"col" => Self::apply_column_width(worksheet, &e),
                    b"hyperlink" => Self::apply_hyperlink(worksheet, &e, rels),
                    _ => {}
                },
                Ok(Event::Text(e)) if text_target != CellText::None => {
                    if let (Some(pending), Ok(text)) = (cell.as_mut(), e.unescape()) {
                        pending.push_text(text_target, &text);
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            Self::process_cell(worksheet, pending, shared_strings, cell_styles)?;
                        }
                        in_inline_str = false;
                    }
                    b"v" | b"f" | b"t" => text_target = CellText::None,
                    b"is" => in_inline_str = false,
                    b"rPh" => in_phonetic = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Process a cell and add it to the worksheet
    fn process_cell(
        worksheet: &mut Worksheet,
        cell: PendingCell,
        shared_strings: &[String],
        styles: &[Style],
    ) -> XlsxResult<()> {
        let Some(cell_ref) = cell.reference.as_deref() else {
            log::debug!("cell without a reference in '{}', skipping", worksheet.name());
            return Ok(());
        };
        let addr = CellAddress::parse(cell_ref).map_err(|e| {
            XlsxError::Parse(format!("Invalid cell reference '{}': {}", cell_ref, e))
        })?;
        let cell_type = cell.cell_type.as_deref();

        let plain = match (cell_type, cell.value.as_deref(), cell.inline.as_deref()) {
            (Some("inlineStr"), _, Some(text)) => Some(CellValue::string(decode_excel_escapes(text))),
            (_, Some(v), _) => Some(Self::typed_value(cell_type, v, shared_strings)?),
            _ => None,
        };

        let value = match cell.formula.as_deref().filter(|f| !f.is_empty()) {
            Some(f) => {
                let text = if f.starts_with('=') {
                    f.to_string()
                } else {
                    format!("={}", f)
                };
                Some(CellValue::Formula {
                    text,
                    cached_value: plain.map(Box::new),
                })
            }
            None => plain,
        };

        if let Some(value) = value {
            worksheet.set_value_at(addr.row, addr.col, value)?;
        }

        if let Some(s) = cell.style.filter(|&s| s != 0) {
            let style = styles
                .get(s as usize)
                .ok_or_else(|| XlsxError::Parse(format!("Style index {} out of bounds", s)))?;
            worksheet.set_style_at(addr.row, addr.col, style)?;
        }

        Ok(())
    }

    fn typed_value(
        cell_type: Option<&str>,
        value: &str,
        shared_strings: &[String],
    ) -> XlsxResult<CellValue> {
        Ok(match cell_type {
            Some("s") => {
                let idx: usize = value.parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", value))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::string(s.as_str())
            }
            Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),
            Some("e") => CellError::parse(value)
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::string(value)),
            Some("str") | Some("inlineStr") => CellValue::string(decode_excel_escapes(value)),
            None | Some("n") => match value.parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::string(value),
            },
            Some(other) => {
                log::debug!("unknown cell type '{}', reading as text", other);
                CellValue::string(value)
            }
        })
    }

    fn apply_column_width(worksheet: &mut Worksheet, e: &BytesStart<'_>) {
        if attr_value(e, b"customWidth").map_or(true, |v| v != "1" && v != "true") {
            return;
        }
        let bound = |key: &[u8]| attr_value(e, key).and_then(|v| v.parse::<u32>().ok());
        let (Some(min), Some(max), Some(width)) = (
            bound(b"min"),
            bound(b"max"),
            attr_value(e, b"width").and_then(|v| v.parse::<f64>().ok()),
        ) else {
            return;
        };
        let max = max.min(u32::from(MAX_COLS));
        for col in min.max(1)..=max {
            if let Ok(col) = u16::try_from(col - 1) {
                worksheet.set_column_width(col, width);
            }
        }
    }

    fn apply_hyperlink(worksheet: &mut Worksheet, e: &BytesStart<'_>, rels: &[Relationship]) {
        let Some(addr) = attr_value(e, b"ref").and_then(|r| CellAddress::parse(&r).ok()) else {
            return;
        };
        let target = match attr_value(e, b"r:id") {
            Some(id) => rels
                .iter()
                .find(|r| r.id == id && r.external)
                .map(|r| r.target.clone()),
            None => attr_value(e, b"location"),
        };
        let Some(target) = target else {
            log::debug!("hyperlink at {} has no target", addr);
            return;
        };

        let mut link = Hyperlink::new(target);
        link.tooltip = attr_value(e, b"tooltip");
        worksheet.set_hyperlink_at(addr.row, addr.col, link);
    }

    /// Read a comments part into the worksheet
    fn read_comments<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
    ) -> XlsxResult<()> {
        let file = match archive.by_name(path) {
            Ok(f) => f,
            Err(_) => {
                log::warn!("comments part {} is missing", path);
                return Ok(());
            }
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();
        let mut authors: Vec<String> = Vec::new();
        let mut in_author = false;
        let mut in_t = false;
        let mut current: Option<(String, usize)> = None;
        let mut text = String::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"author" => {
                        in_author = true;
                        authors.push(String::new());
                    }
                    b"comment" => {
                        text.clear();
                        current = attr_value(&e, b"ref").map(|r| {
                            let author_id = attr_value(&e, b"authorId")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0);
                            (r, author_id)
                        });
                    }
                    b"t" if current.is_some() => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"author" => {
                    authors.push(String::new());
                }
                Ok(Event::Text(e)) if in_author || in_t => {
                    if let Ok(chunk) = e.unescape() {
                        match authors.last_mut() {
                            Some(author) if in_author => author.push_str(&chunk),
                            _ => text.push_str(&chunk),
                        }
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"author" => in_author = false,
                    b"t" => in_t = false,
                    b"comment" => {
                        if let Some((cell_ref, author_id)) = current.take() {
                            match CellAddress::parse(&cell_ref) {
                                Ok(addr) => {
                                    let author =
                                        authors.get(author_id).cloned().unwrap_or_default();
                                    let comment =
                                        CellComment::new(author, decode_excel_escapes(&text));
                                    worksheet.set_comment_at(addr.row, addr.col, comment);
                                }
                                Err(_) => log::debug!("comment on bad reference '{}'", cell_ref),
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::XlsxWriter;
    use dcf_sheets_core::style::Color;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};

    fn round_trip(workbook: &Workbook) -> Workbook {
        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write(workbook, &mut buf).unwrap();
        buf.set_position(0);
        XlsxReader::read(buf).unwrap()
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/worksheets", "../comments1.xml"), "xl/comments1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/s.xml"), "xl/worksheets/s.xml");
        assert_eq!(
            rels_path_for("xl/worksheets/sheet2.xml"),
            "xl/worksheets/_rels/sheet2.xml.rels"
        );
    }

    #[test]
    fn test_workbook_survives_write_and_read() {
        let mut wb = Workbook::new();
        wb.new_sheet("Free Cash Flow").unwrap();

        let ws = wb.worksheet_mut("Sheet1").unwrap();
        ws.set_value("A1", "  padded ").unwrap();
        ws.set_value("A3", 3).unwrap();
        ws.set_value("A4", 4).unwrap();
        ws.set_value("A5", "=SUM(A3:A4)").unwrap();
        ws.set_formula_result(4, 0, CellValue::Number(7.0)).unwrap();
        ws.set_value("B1", true).unwrap();
        ws.set_value("B2", CellValue::Error(CellError::Div0)).unwrap();
        ws.set_style("A3", &Style::new().bold(true).fill_color(Color::rgb(0xDD, 0xEE, 0xFF)))
            .unwrap();
        ws.set_column_width(0, 18.5);
        ws.set_comment_at(0, 0, CellComment::new("Analyst", "Source: 10-K"));
        ws.set_hyperlink_at(
            0,
            1,
            Hyperlink::new("https://example.com/filing").with_tooltip("filing"),
        );

        wb.worksheet_mut("Free Cash Flow")
            .unwrap()
            .set_value("B2", 1.5)
            .unwrap();
        wb.name("B2", "Growth", Some("Free Cash Flow")).unwrap();
        wb.set_active_sheet("Free Cash Flow").unwrap();

        let back = round_trip(&wb);
        assert_eq!(back.sheets(), ["Sheet1", "Free Cash Flow"]);
        assert_eq!(back.active_sheet_name(), "Free Cash Flow");

        let ws = back.worksheet("Sheet1").unwrap();
        assert_eq!(ws.get_value_at(0, 0), CellValue::string("  padded "));
        assert_eq!(ws.get_value_at(2, 0), CellValue::Number(3.0));
        assert_eq!(
            ws.get_value_at(4, 0),
            CellValue::Formula {
                text: "=SUM(A3:A4)".into(),
                cached_value: Some(Box::new(CellValue::Number(7.0))),
            }
        );
        assert_eq!(ws.get_value_at(0, 1), CellValue::Boolean(true));
        assert_eq!(ws.get_value_at(1, 1), CellValue::Error(CellError::Div0));
        assert!(ws.style_at(2, 0).is_some_and(|s| s.font.bold));
        assert_eq!(ws.column_width(0), Some(18.5));
        assert_eq!(
            ws.comment_at(0, 0),
            Some(&CellComment::new("Analyst", "Source: 10-K"))
        );
        let link = ws.hyperlink_at(0, 1).unwrap();
        assert_eq!(link.target, "https://example.com/filing");
        assert_eq!(link.tooltip.as_deref(), Some("filing"));

        let growth = back.named_ranges().get("Growth", "Sheet1").unwrap();
        assert_eq!(growth.expression(), "'Free Cash Flow'!$B$2");
    }

    #[test]
    fn test_read_shared_strings_and_sheet_scoped_names() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Inputs" sheetId="1" r:id="rId1"/></sheets><definedNames><definedName name="Ticker" localSheetId="0">Inputs!$A$1</definedName></definedNames></workbook>"#).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#).unwrap();

            zip.start_file("xl/sharedStrings.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><sst><si><t>ACME</t></si><si><r><t>Rich </t></r><r><t>text</t></r></si></sst>"#).unwrap();

            zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1"><f>A1&amp;B1</f><v></v></c></row></sheetData></worksheet>"#).unwrap();

            zip.finish().unwrap();
        }

        let wb = XlsxReader::read(Cursor::new(buf)).unwrap();
        let ws = wb.worksheet("Inputs").unwrap();
        assert_eq!(ws.get_value_at(0, 0), CellValue::string("ACME"));
        assert_eq!(ws.get_value_at(0, 1), CellValue::string("Rich text"));
        assert_eq!(ws.formula_at(0, 2), Some("=A1&B1"));

        let ticker = wb.named_ranges().get("ticker", "Inputs").unwrap();
        assert_eq!(ticker.scope, NameScope::Sheet("Inputs".into()));
        assert!(wb.named_ranges().get("Ticker", "Other").is_none());
    }

    #[test]
    fn test_file_round_trip_keeps_formulas_and_names() {
        use dcf_sheets_core::{NameScope, NamedRange};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");

        let mut wb = Workbook::new();
        wb.new_sheet("Inputs").unwrap();
        wb.new_sheet("DCF").unwrap();
        wb.set("Inputs!B2", 0.0725).unwrap();
        wb.set("DCF!A1", 100).unwrap();
        wb.set("DCF!A2", "=A1*(1+Inputs!B2)").unwrap();
        wb.name("B2", "Discount_Rate", Some("Inputs")).unwrap();
        wb.define_name(NamedRange::new("Base", "DCF!$A$1", NameScope::Sheet("DCF".into())))
            .unwrap();
        XlsxWriter::write_file(&wb, &path).unwrap();

        let back = XlsxReader::read_file(&path).unwrap();
        assert_eq!(back.sheets(), ["Sheet1", "Inputs", "DCF"]);

        let dcf = back.worksheet("DCF").unwrap();
        assert_eq!(dcf.get_value_at(0, 0), CellValue::Number(100.0));
        assert_eq!(dcf.formula_at(1, 0), Some("=A1*(1+Inputs!B2)"));
        assert_eq!(
            back.worksheet("Inputs").unwrap().get_value_at(1, 1),
            CellValue::Number(0.0725)
        );

        let rate = back.named_ranges().get("Discount_Rate", "Sheet1").unwrap();
        assert_eq!(rate.scope, NameScope::Workbook);
        assert_eq!(rate.expression(), "Inputs!$B$2");
        let base = back.named_ranges().get("Base", "DCF").unwrap();
        assert_eq!(base.scope, NameScope::Sheet("DCF".into()));
        assert!(back.named_ranges().get("Base", "Inputs").is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = XlsxReader::read_file(dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, XlsxError::Io(_)));
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        let err = XlsxReader::read(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)));
    }
}
