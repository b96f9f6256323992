//! XLSX writer

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::XlsxResult;
use crate::styles::XlsxStyleTable;
use crate::xml::escape;
use dcf_sheets_core::{CellAddress, CellValue, NameScope, Workbook, Worksheet};

const REL_COMMENTS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Relationships owned by one worksheet part
#[derive(Debug, Default)]
struct SheetRels {
    comments: Option<String>,
    /// rId for each external hyperlink, in `Worksheet::hyperlinks` order
    hyperlinks: Vec<Option<String>>,
    entries: Vec<String>,
}

impl SheetRels {
    fn for_sheet(sheet: &Worksheet, index: usize) -> Self {
        let mut rels = SheetRels::default();

        if !sheet.comments().is_empty() {
            let id = rels.push(REL_COMMENTS, &format!("../comments{}.xml", index + 1), false);
            rels.comments = Some(id);
        }

        for (_, link) in sheet.hyperlinks() {
            let id = if link.is_external() {
                Some(rels.push(REL_HYPERLINK, &link.target, true))
            } else {
                None
            };
            rels.hyperlinks.push(id);
        }
        rels
    }

    fn push(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        let mode = if external {
            " TargetMode=\"External\""
        } else {
            ""
        };
        self.entries.push(format!(
            "\n    <Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>",
            id,
            rel_type,
            escape(target),
            mode
        ));
        id
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let path = path.as_ref();
        log::debug!("writing xlsx workbook to {}", path.display());
        let file = File::create(path)?;
        Self::write(workbook, BufWriter::new(file))
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        let mut zip = ZipWriter::new(writer);

        let style_table = XlsxStyleTable::build(workbook);
        let sheet_rels: Vec<SheetRels> = workbook
            .worksheets()
            .enumerate()
            .map(|(i, sheet)| SheetRels::for_sheet(sheet, i))
            .collect();

        Self::write_content_types(&mut zip, workbook, &sheet_rels)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_core_properties(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook)?;

        Self::start(&mut zip, "xl/styles.xml")?;
        zip.write_all(style_table.to_styles_xml().as_bytes())?;

        for (i, (sheet, rels)) in workbook.worksheets().zip(&sheet_rels).enumerate() {
            Self::write_worksheet(&mut zip, sheet, i, &style_table, rels)?;

            if !rels.is_empty() {
                Self::start(
                    &mut zip,
                    &format!("xl/worksheets/_rels/sheet{}.xml.rels", i + 1),
                )?;
                let content = format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}
</Relationships>"#,
                    rels.entries.concat()
                );
                zip.write_all(content.as_bytes())?;
            }
            if rels.comments.is_some() {
                Self::write_comments(&mut zip, sheet, i)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    fn start<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str) -> XlsxResult<()> {
        zip.start_file(name, SimpleFileOptions::default())?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        workbook: &Workbook,
        sheet_rels: &[SheetRels],
    ) -> XlsxResult<()> {
        Self::start(zip, "[Content_Types].xml")?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        for (i, rels) in sheet_rels.iter().enumerate() {
            if rels.comments.is_some() {
                content.push_str(&format!(
                    r#"
    <Override PartName="/xl/comments{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml"/>"#,
                    i + 1
                ));
            }
        }

        content.push_str("\n</Types>");
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut ZipWriter<W>) -> XlsxResult<()> {
        Self::start(zip, "_rels/.rels")?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_core_properties<W: Write + Seek>(zip: &mut ZipWriter<W>) -> XlsxResult<()> {
        Self::start(zip, "docProps/core.xml")?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:creator>dcf-sheets</dc:creator>
    <dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>
</cp:coreProperties>"#
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        Self::start(zip, "xl/workbook.xml")?;

        let active_tab = workbook
            .sheet_index(workbook.active_sheet_name())
            .unwrap_or(0);
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <bookViews>
        <workbookView activeTab="{}"/>
    </bookViews>
    <sheets>"#,
            active_tab
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(sheet.name()),
                i + 1,
                i + 1
            ));
        }
        content.push_str("\n    </sheets>");

        let names = workbook.named_ranges();
        if !names.is_empty() {
            content.push_str("\n    <definedNames>");
            for range in names.iter() {
                let local_sheet = match &range.scope {
                    NameScope::Workbook => String::new(),
                    NameScope::Sheet(sheet) => match workbook.sheet_index(sheet) {
                        Some(idx) => format!(" localSheetId=\"{}\"", idx),
                        None => {
                            log::warn!(
                                "skipping name '{}' scoped to missing sheet '{}'",
                                range.name,
                                sheet
                            );
                            continue;
                        }
                    },
                };
                let hidden = if range.hidden { " hidden=\"1\"" } else { "" };
                content.push_str(&format!(
                    "\n        <definedName name=\"{}\"{}{}>{}</definedName>",
                    escape(&range.name),
                    local_sheet,
                    hidden,
                    escape(range.expression())
                ));
            }
            content.push_str("\n    </definedNames>");
        }

        content.push_str("\n</workbook>");
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        Self::start(zip, "xl/_rels/workbook.xml.rels")?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
            workbook.sheet_count() + 1
        ));

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        sheet: &Worksheet,
        index: usize,
        style_table: &XlsxStyleTable,
        rels: &SheetRels,
    ) -> XlsxResult<()> {
        Self::start(zip, &format!("xl/worksheets/sheet{}.xml", index + 1))?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        if let Some(used) = sheet.used_range() {
            content.push_str(&format!("\n    <dimension ref=\"{}\"/>", used));
        }

        let widths: Vec<(u16, f64)> = sheet.column_widths().collect();
        if !widths.is_empty() {
            content.push_str("\n    <cols>");
            for (col, width) in widths {
                content.push_str(&format!(
                    "\n        <col min=\"{0}\" max=\"{0}\" width=\"{1}\" customWidth=\"1\"/>",
                    u32::from(col) + 1,
                    width
                ));
            }
            content.push_str("\n    </cols>");
        }

        content.push_str("\n    <sheetData>");

        let mut current_row: Option<u32> = None;
        for (row, col, cell) in sheet.iter_cells() {
            if current_row != Some(row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", row + 1));
                current_row = Some(row);
            }

            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let xf_id = style_table.xf_id_for(index, cell.style_index);
            let style_attr = if xf_id != 0 {
                format!(" s=\"{}\"", xf_id)
            } else {
                String::new()
            };

            content.push_str("\n            ");
            match &cell.value {
                CellValue::Formula { text, cached_value } => {
                    let formula = text.strip_prefix('=').unwrap_or(text);
                    let (type_attr, cached) = cached_value
                        .as_deref()
                        .map(value_parts)
                        .unwrap_or(("", None));
                    content.push_str(&format!(
                        "<c r=\"{}\"{}{}><f>{}</f>",
                        cell_ref,
                        style_attr,
                        type_attr,
                        escape(formula)
                    ));
                    if let Some(v) = cached {
                        content.push_str(&format!("<v>{}</v>", v));
                    }
                    content.push_str("</c>");
                }
                CellValue::String(s) => {
                    let space = if s.as_str().trim() != s.as_str() {
                        " xml:space=\"preserve\""
                    } else {
                        ""
                    };
                    content.push_str(&format!(
                        "<c r=\"{}\"{} t=\"inlineStr\"><is><t{}>{}</t></is></c>",
                        cell_ref,
                        style_attr,
                        space,
                        escape(s.as_str())
                    ));
                }
                CellValue::Empty => {
                    content.push_str(&format!("<c r=\"{}\"{}/>", cell_ref, style_attr));
                }
                other => {
                    let (type_attr, v) = value_parts(other);
                    content.push_str(&format!(
                        "<c r=\"{}\"{}{}><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        type_attr,
                        v.unwrap_or_default()
                    ));
                }
            }
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }
        content.push_str("\n    </sheetData>");

        let links = sheet.hyperlinks();
        if !links.is_empty() {
            content.push_str("\n    <hyperlinks>");
            for (((row, col), link), rel_id) in links.iter().zip(&rels.hyperlinks) {
                let cell_ref = CellAddress::new(*row, *col).to_a1_string();
                let target = match rel_id {
                    Some(id) => format!(" r:id=\"{}\"", id),
                    None => format!(" location=\"{}\"", escape(&link.target)),
                };
                let tooltip = link
                    .tooltip
                    .as_deref()
                    .map(|t| format!(" tooltip=\"{}\"", escape(t)))
                    .unwrap_or_default();
                content.push_str(&format!(
                    "\n        <hyperlink ref=\"{}\"{}{}/>",
                    cell_ref, target, tooltip
                ));
            }
            content.push_str("\n    </hyperlinks>");
        }

        content.push_str("\n</worksheet>");
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Write comments file for a worksheet
    fn write_comments<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        sheet: &Worksheet,
        sheet_index: usize,
    ) -> XlsxResult<()> {
        Self::start(zip, &format!("xl/comments{}.xml", sheet_index + 1))?;

        let comments = sheet.comments();
        let mut authors: Vec<&str> = Vec::new();
        for (_, comment) in &comments {
            if !authors.contains(&comment.author.as_str()) {
                authors.push(&comment.author);
            }
        }

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <authors>"#,
        );
        for author in &authors {
            content.push_str(&format!("\n        <author>{}</author>", escape(author)));
        }
        content.push_str("\n    </authors>\n    <commentList>");

        for ((row, col), comment) in &comments {
            let author_id = authors
                .iter()
                .position(|a| *a == comment.author)
                .unwrap_or(0);
            content.push_str(&format!(
                r#"
        <comment ref="{}" authorId="{}">
            <text>
                <r>
                    <t xml:space="preserve">{}</t>
                </r>
            </text>
        </comment>"#,
                CellAddress::new(*row, *col).to_a1_string(),
                author_id,
                escape(&comment.text)
            ));
        }

        content.push_str("\n    </commentList>\n</comments>");
        zip.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Cell type attribute and `<v>` text for a plain value
fn value_parts(value: &CellValue) -> (&'static str, Option<String>) {
    match value {
        CellValue::Number(n) if n.is_finite() => ("", Some(n.to_string())),
        CellValue::Number(_) => (" t=\"e\"", Some("#NUM!".to_string())),
        CellValue::Boolean(b) => (" t=\"b\"", Some(u8::from(*b).to_string())),
        CellValue::Error(e) => (" t=\"e\"", Some(escape(e.as_str()))),
        CellValue::String(s) => (" t=\"str\"", Some(escape(s.as_str()))),
        CellValue::Empty | CellValue::Formula { .. } => ("", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn test_formula_written_without_equals_and_with_cached_value() {
        let mut wb = Workbook::new();
        let ws = wb.worksheet_mut("Sheet1").unwrap();
        ws.set_value("A1", 3).unwrap();
        ws.set_value("A2", "=A1*2").unwrap();
        ws.set_formula_result(1, 0, CellValue::Number(6.0)).unwrap();
        ws.set_value("A3", "R&D <2024>").unwrap();

        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write(&wb, &mut buf).unwrap();
        let sheet = part(buf.get_ref(), "xl/worksheets/sheet1.xml");

        assert!(sheet.contains("<c r=\"A2\"><f>A1*2</f><v>6</v></c>"));
        assert!(sheet.contains("R&amp;D &lt;2024&gt;"));
        assert!(sheet.contains("<dimension ref=\"A1:A3\"/>"));
    }

    #[test]
    fn test_defined_names_and_sheet_names_are_escaped() {
        let mut wb = Workbook::new();
        wb.new_sheet("P&L").unwrap();
        wb.name("B2", "Revenue", Some("P&L")).unwrap();

        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write(&wb, &mut buf).unwrap();
        let workbook_xml = part(buf.get_ref(), "xl/workbook.xml");

        assert!(workbook_xml.contains("<sheet name=\"P&amp;L\" sheetId=\"2\" r:id=\"rId2\"/>"));
        assert!(workbook_xml
            .contains("<definedName name=\"Revenue\">&apos;P&amp;L&apos;!$B$2</definedName>"));
    }

    #[test]
    fn test_external_hyperlink_gets_relationship() {
        let mut wb = Workbook::new();
        let ws = wb.worksheet_mut("Sheet1").unwrap();
        ws.set_value("A1", "filing").unwrap();
        ws.set_hyperlink_at(0, 0, dcf_sheets_core::Hyperlink::new("https://sec.gov"));
        ws.set_hyperlink_at(1, 0, dcf_sheets_core::Hyperlink::new("Sheet1!C3"));

        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write(&wb, &mut buf).unwrap();
        let sheet = part(buf.get_ref(), "xl/worksheets/sheet1.xml");
        let rels = part(buf.get_ref(), "xl/worksheets/_rels/sheet1.xml.rels");

        assert!(sheet.contains("<hyperlink ref=\"A1\" r:id=\"rId1\"/>"));
        assert!(sheet.contains("<hyperlink ref=\"A2\" location=\"Sheet1!C3\"/>"));
        assert!(rels.contains("Target=\"https://sec.gov\" TargetMode=\"External\""));
    }
}
