//! XLSX styles (styles.xml) read/write helpers

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr_value, escape, flag_value};
use dcf_sheets_core::style::{
    Alignment, Border, BorderEdge, BorderLineStyle, Color, Fill, Font, HorizontalAlignment,
    Protection, Style, VerticalAlignment, GENERAL_FORMAT,
};
use dcf_sheets_core::Workbook;

/// Built-in number formats that need no `<numFmt>` entry
const BUILTIN_FORMATS: &[(u32, &str)] = &[
    (0, GENERAL_FORMAT),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (20, "h:mm"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (49, "@"),
];

/// First id available to custom number formats
const FIRST_CUSTOM_NUMFMT: u32 = 164;

fn builtin_format_id(code: &str) -> Option<u32> {
    BUILTIN_FORMATS
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(id, _)| *id)
}

fn builtin_format_code(id: u32) -> Option<&'static str> {
    BUILTIN_FORMATS
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, code)| *code)
}

// === Writing ===

/// Workbook-wide cellXfs table built from every worksheet's style pool
#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Deduplicated styles; the position is the xf id
    styles: Vec<Style>,
    /// Per worksheet: local pool index -> global xf id
    sheet_maps: Vec<HashMap<u32, u32>>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    num_fmt_id: u32,
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let default = Style::default();
        let mut styles = vec![default.clone()];
        let mut style_to_xf: HashMap<Style, u32> = HashMap::new();
        style_to_xf.insert(default, 0);

        let mut sheet_maps = Vec::with_capacity(workbook.sheet_count());
        for sheet in workbook.worksheets() {
            let mut map = HashMap::new();
            map.insert(0, 0);

            for (local_idx, style) in sheet.style_pool().iter().skip(1) {
                let xf_id = *style_to_xf.entry(style.clone()).or_insert_with(|| {
                    styles.push(style.clone());
                    (styles.len() - 1) as u32
                });
                map.insert(local_idx, xf_id);
            }
            sheet_maps.push(map);
        }

        Self { styles, sheet_maps }
    }

    pub(crate) fn xf_id_for(&self, sheet_index: usize, local_style_index: u32) -> u32 {
        self.sheet_maps
            .get(sheet_index)
            .and_then(|m| m.get(&local_style_index).copied())
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut fonts = vec![Font::default()];
        let mut font_ids: HashMap<Font, u32> = HashMap::new();
        font_ids.insert(Font::default(), 0);

        // Excel requires the first two fills to be none and gray125
        let mut fill_xml = vec![
            "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
            "<fill><patternFill patternType=\"gray125\"/></fill>".to_string(),
        ];
        let mut fill_ids: HashMap<Fill, u32> = HashMap::new();

        let mut borders = vec![Border::default()];
        let mut border_ids: HashMap<Border, u32> = HashMap::new();
        border_ids.insert(Border::default(), 0);

        let mut numfmts: Vec<(u32, String)> = Vec::new();
        let mut numfmt_ids: HashMap<String, u32> = HashMap::new();

        let mut resolved = Vec::with_capacity(self.styles.len());
        for style in &self.styles {
            let font_id = *font_ids.entry(style.font.clone()).or_insert_with(|| {
                fonts.push(style.font.clone());
                (fonts.len() - 1) as u32
            });

            let fill_id = if style.fill.is_none() {
                0
            } else {
                *fill_ids.entry(style.fill.clone()).or_insert_with(|| {
                    fill_xml.push(write_fill(&style.fill));
                    (fill_xml.len() - 1) as u32
                })
            };

            let border_id = *border_ids.entry(style.border.clone()).or_insert_with(|| {
                borders.push(style.border.clone());
                (borders.len() - 1) as u32
            });

            let num_fmt_id = match builtin_format_id(&style.number_format) {
                Some(id) => id,
                None => *numfmt_ids
                    .entry(style.number_format.clone())
                    .or_insert_with(|| {
                        let id = FIRST_CUSTOM_NUMFMT + numfmts.len() as u32;
                        numfmts.push((id, style.number_format.clone()));
                        id
                    }),
            };

            resolved.push(ResolvedXfIds {
                font_id,
                fill_id,
                border_id,
                num_fmt_id,
            });
        }

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!("\n  <fills count=\"{}\">", fill_xml.len()));
        for fill in &fill_xml {
            xml.push_str("\n    ");
            xml.push_str(fill);
        }
        xml.push_str("\n  </fills>");

        xml.push_str(&format!("\n  <borders count=\"{}\">", borders.len()));
        for border in &borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (style, ids) in self.styles.iter().zip(&resolved) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
</styleSheet>"#,
        );
        xml
    }
}

fn color_attrs(color: &Color) -> String {
    match color {
        Color::Auto => "indexed=\"64\"".to_string(),
        Color::Argb(argb) => format!("rgb=\"{:08X}\"", argb),
        Color::Theme(i) => format!("theme=\"{}\"", i),
        Color::Indexed(i) => format!("indexed=\"{}\"", i),
    }
}

fn write_font(font: &Font) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.strikethrough {
        s.push_str("<strike/>");
    }
    if font.underline {
        s.push_str("<u/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if font.color != Color::Auto {
        s.push_str(&format!("<color {}/>", color_attrs(&font.color)));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape(&font.name)));
    s.push_str("</font>");
    s
}

fn write_fill(fill: &Fill) -> String {
    match fill {
        Fill::None => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        Fill::Solid(color) => format!(
            "<fill><patternFill patternType=\"solid\"><fgColor {}/><bgColor indexed=\"64\"/></patternFill></fill>",
            color_attrs(color)
        ),
        Fill::Pattern {
            pattern,
            foreground,
            background,
        } => format!(
            "<fill><patternFill patternType=\"{}\"><fgColor {}/><bgColor {}/></patternFill></fill>",
            escape(pattern),
            color_attrs(foreground),
            color_attrs(background)
        ),
    }
}

fn write_border_edge(tag: &str, edge: &Option<BorderEdge>) -> String {
    match edge {
        None => format!("<{tag}/>"),
        Some(edge) => format!(
            "<{tag} style=\"{}\"><color {}/></{tag}>",
            edge.style.as_str(),
            color_attrs(&edge.color)
        ),
    }
}

fn write_border(border: &Border) -> String {
    format!(
        "<border>{}{}{}{}<diagonal/></border>",
        write_border_edge("left", &border.left),
        write_border_edge("right", &border.right),
        write_border_edge("top", &border.top),
        write_border_edge("bottom", &border.bottom)
    )
}

fn write_alignment(al: &Alignment) -> String {
    if al.is_default() {
        return String::new();
    }
    let mut s = String::from("<alignment");
    if al.horizontal != HorizontalAlignment::General {
        s.push_str(&format!(" horizontal=\"{}\"", al.horizontal.as_str()));
    }
    if al.vertical != VerticalAlignment::Bottom {
        s.push_str(&format!(" vertical=\"{}\"", al.vertical.as_str()));
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    if al.indent > 0 {
        s.push_str(&format!(" indent=\"{}\"", al.indent));
    }
    s.push_str("/>");
    s
}

fn write_protection(p: &Protection) -> String {
    if *p == Protection::default() {
        return String::new();
    }
    format!(
        "<protection locked=\"{}\" hidden=\"{}\"/>",
        u8::from(p.locked),
        u8::from(p.hidden)
    )
}

fn write_xf(style: &Style, ids: ResolvedXfIds) -> String {
    let mut attrs = String::new();
    if ids.num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if ids.font_id != 0 {
        attrs.push_str(" applyFont=\"1\"");
    }
    if ids.fill_id != 0 {
        attrs.push_str(" applyFill=\"1\"");
    }
    if ids.border_id != 0 {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if !style.alignment.is_default() {
        attrs.push_str(" applyAlignment=\"1\"");
    }
    if style.protection != Protection::default() {
        attrs.push_str(" applyProtection=\"1\"");
    }

    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id, attrs
    );

    let children = write_alignment(&style.alignment) + &write_protection(&style.protection);
    if children.is_empty() {
        s.push_str("/>");
    } else {
        s.push('>');
        s.push_str(&children);
        s.push_str("</xf>");
    }
    s
}

// === Reading ===

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

fn edge_mut(border: &mut Border, side: Side) -> &mut Option<BorderEdge> {
    match side {
        Side::Left => &mut border.left,
        Side::Right => &mut border.right,
        Side::Top => &mut border.top,
        Side::Bottom => &mut border.bottom,
    }
}

#[derive(Debug, Default)]
struct FillState {
    pattern: Option<String>,
    foreground: Color,
    background: Color,
}

impl FillState {
    fn finish(self) -> Fill {
        match self.pattern.as_deref() {
            None | Some("none") | Some("gray125") => Fill::None,
            Some("solid") => Fill::Solid(self.foreground),
            Some(pattern) => Fill::Pattern {
                pattern: pattern.to_string(),
                foreground: self.foreground,
                background: self.background,
            },
        }
    }
}

#[derive(Debug, Default)]
struct XfState {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
    protection: Protection,
}

/// Accumulates the component tables of styles.xml while events stream by
#[derive(Debug, Default)]
struct StyleSheetParser {
    numfmts: HashMap<u32, String>,
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    cell_styles: Vec<Style>,

    font: Option<Font>,
    fill: Option<FillState>,
    border: Option<Border>,
    side: Option<Side>,
    xf: Option<XfState>,
    in_cell_xfs: bool,
    in_dxfs: bool,
}

impl StyleSheetParser {
    fn open(&mut self, e: &BytesStart<'_>) {
        let name = e.name();
        let name = name.as_ref();
        if name == b"dxfs" {
            self.in_dxfs = true;
        }
        // Differential formats only matter for conditional formatting
        if self.in_dxfs {
            return;
        }

        match name {
            b"numFmt" => {
                let id = attr_value(e, b"numFmtId").and_then(|v| v.parse().ok());
                if let (Some(id), Some(code)) = (id, attr_value(e, b"formatCode")) {
                    self.numfmts.insert(id, code);
                }
            }
            b"font" => self.font = Some(Font::default()),
            b"b" => self.with_font(|f| f.bold = flag_value(e, b"val")),
            b"i" => self.with_font(|f| f.italic = flag_value(e, b"val")),
            b"strike" => self.with_font(|f| f.strikethrough = flag_value(e, b"val")),
            b"u" => {
                let underline = attr_value(e, b"val").map_or(true, |v| v != "none");
                self.with_font(|f| f.underline = underline);
            }
            b"sz" => {
                if let Some(size) = attr_value(e, b"val").and_then(|v| v.parse().ok()) {
                    self.with_font(|f| f.size = size);
                }
            }
            b"name" => {
                if let Some(font_name) = attr_value(e, b"val") {
                    self.with_font(|f| f.name = font_name);
                }
            }
            b"color" => {
                let color = parse_color(e);
                if let Some(font) = self.font.as_mut() {
                    font.color = color;
                } else if let (Some(border), Some(side)) = (self.border.as_mut(), self.side) {
                    if let Some(edge) = edge_mut(border, side).as_mut() {
                        edge.color = color;
                    }
                }
            }

            b"fill" => self.fill = Some(FillState::default()),
            b"patternFill" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.pattern = attr_value(e, b"patternType");
                }
            }
            b"fgColor" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.foreground = parse_color(e);
                }
            }
            b"bgColor" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.background = parse_color(e);
                }
            }

            b"border" => self.border = Some(Border::default()),
            b"left" | b"right" | b"top" | b"bottom" => {
                let side = match name {
                    b"left" => Side::Left,
                    b"right" => Side::Right,
                    b"top" => Side::Top,
                    _ => Side::Bottom,
                };
                if let Some(border) = self.border.as_mut() {
                    self.side = Some(side);
                    let style = attr_value(e, b"style").and_then(|s| BorderLineStyle::parse(&s));
                    *edge_mut(border, side) = style.map(|style| BorderEdge {
                        style,
                        color: Color::Auto,
                    });
                }
            }

            b"cellXfs" => self.in_cell_xfs = true,
            b"xf" if self.in_cell_xfs => {
                let id = |key: &[u8]| {
                    attr_value(e, key)
                        .and_then(|v| v.parse::<u32>().ok())
                        .unwrap_or(0)
                };
                self.xf = Some(XfState {
                    num_fmt_id: id(b"numFmtId"),
                    font_id: id(b"fontId") as usize,
                    fill_id: id(b"fillId") as usize,
                    border_id: id(b"borderId") as usize,
                    ..XfState::default()
                });
            }
            b"alignment" => {
                if let Some(xf) = self.xf.as_mut() {
                    let al = &mut xf.alignment;
                    if let Some(h) = attr_value(e, b"horizontal") {
                        al.horizontal = HorizontalAlignment::parse(&h);
                    }
                    if let Some(v) = attr_value(e, b"vertical") {
                        al.vertical = VerticalAlignment::parse(&v);
                    }
                    al.wrap_text = attr_value(e, b"wrapText").is_some_and(|v| v == "1");
                    al.indent = attr_value(e, b"indent")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
            }
            b"protection" => {
                if let Some(xf) = self.xf.as_mut() {
                    if let Some(v) = attr_value(e, b"locked") {
                        xf.protection.locked = v == "1";
                    }
                    if let Some(v) = attr_value(e, b"hidden") {
                        xf.protection.hidden = v == "1";
                    }
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        if self.in_dxfs {
            if name == b"dxfs" {
                self.in_dxfs = false;
            }
            return;
        }

        match name {
            b"font" => {
                if let Some(font) = self.font.take() {
                    self.fonts.push(font);
                }
            }
            b"fill" => {
                if let Some(fill) = self.fill.take() {
                    self.fills.push(fill.finish());
                }
            }
            b"border" => {
                if let Some(border) = self.border.take() {
                    self.borders.push(border);
                }
                self.side = None;
            }
            b"left" | b"right" | b"top" | b"bottom" => self.side = None,
            b"xf" => {
                if let Some(xf) = self.xf.take() {
                    let style = self.resolve(xf);
                    self.cell_styles.push(style);
                }
            }
            b"cellXfs" => self.in_cell_xfs = false,
            _ => {}
        }
    }

    fn with_font(&mut self, apply: impl FnOnce(&mut Font)) {
        if let Some(font) = self.font.as_mut() {
            apply(font);
        }
    }

    fn resolve(&self, xf: XfState) -> Style {
        let number_format = match xf.num_fmt_id {
            0 => GENERAL_FORMAT.to_string(),
            id => match self.numfmts.get(&id) {
                Some(code) => code.clone(),
                None => builtin_format_code(id).map_or_else(
                    || {
                        log::debug!("unknown built-in number format {}", id);
                        GENERAL_FORMAT.to_string()
                    },
                    str::to_string,
                ),
            },
        };

        Style {
            font: self.fonts.get(xf.font_id).cloned().unwrap_or_default(),
            fill: self.fills.get(xf.fill_id).cloned().unwrap_or_default(),
            border: self.borders.get(xf.border_id).cloned().unwrap_or_default(),
            alignment: xf.alignment,
            number_format,
            protection: xf.protection,
        }
    }
}

/// Read styles.xml into the cellXfs list; the position is the `s` attribute
/// value cells refer to
pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<Vec<Style>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut parser = StyleSheetParser::default();
    let mut buf = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.open(&e),
            Ok(Event::Empty(e)) => {
                parser.open(&e);
                parser.close(e.name().as_ref());
            }
            Ok(Event::End(e)) => parser.close(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if parser.cell_styles.is_empty() {
        parser.cell_styles.push(Style::default());
    }
    Ok(parser.cell_styles)
}

fn parse_color(e: &BytesStart<'_>) -> Color {
    if let Some(color) = attr_value(e, b"rgb").and_then(|rgb| Color::from_hex(&rgb)) {
        return color;
    }
    if let Some(theme) = attr_value(e, b"theme").and_then(|v| v.parse().ok()) {
        return Color::Theme(theme);
    }
    match attr_value(e, b"indexed").and_then(|v| v.parse::<u8>().ok()) {
        Some(64) | None => Color::Auto,
        Some(i) => Color::Indexed(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_style_table_deduplicates_across_sheets() {
        let mut wb = Workbook::new();
        wb.new_sheet("Other").unwrap();
        let bold = Style::new().bold(true);
        wb.worksheet_mut("Sheet1")
            .unwrap()
            .set_style("A1", &bold)
            .unwrap();
        let other = wb.worksheet_mut("Other").unwrap();
        other
            .set_style("A1", &Style::new().number_format("0.0%"))
            .unwrap();
        other.set_style("B1", &bold).unwrap();

        let table = XlsxStyleTable::build(&wb);
        assert_eq!(table.styles.len(), 3);
        assert_eq!(table.xf_id_for(0, 1), 1);
        assert_eq!(table.xf_id_for(1, 2), 1);
        assert_eq!(table.xf_id_for(1, 0), 0);
    }

    #[test]
    fn test_styles_xml_read_back() {
        let mut wb = Workbook::new();
        let styled = Style::new()
            .bold(true)
            .fill_color(Color::rgb(0xFF, 0xFF, 0x00))
            .number_format("#,##0.0,,\"M\"")
            .horizontal(HorizontalAlignment::Center)
            .outline(BorderLineStyle::Thin, Color::rgb(0, 0, 0))
            .locked(false);
        let percent = Style::new().number_format("0.00%");
        let ws = wb.worksheet_mut("Sheet1").unwrap();
        ws.set_style("A1", &styled).unwrap();
        ws.set_style("A2", &percent).unwrap();

        let xml = XlsxStyleTable::build(&wb).to_styles_xml();
        assert!(xml.contains("numFmtId=\"164\""));
        assert!(xml.contains("numFmtId=\"10\""));

        let styles = read_styles_xml(xml.as_bytes()).unwrap();
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[0], Style::default());
        assert_eq!(styles[1], styled);
        assert_eq!(styles[2], percent);
    }

    #[test]
    fn test_read_skips_dxfs() {
        let xml = r#"<styleSheet>
  <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
  <cellXfs count="1"><xf numFmtId="9" fontId="0" fillId="0" borderId="0"/></cellXfs>
  <dxfs count="1"><dxf><font><b/></font></dxf></dxfs>
</styleSheet>"#;
        let styles = read_styles_xml(xml.as_bytes()).unwrap();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].number_format, "0%");
        assert!(!styles[0].font.bold);
    }
}
