//! Cell style bundle
//!
//! A [`Style`] groups everything that can be attached to a cell besides its
//! value: font, fill, border, alignment, number format and protection.
//! Worksheets keep styles in a [`StylePool`] and cells reference them by index.

mod border;
mod fill;
mod font;
mod pool;

pub use border::{Border, BorderEdge, BorderLineStyle};
pub use fill::{Color, Fill};
pub use font::Font;
pub use pool::StylePool;

/// The number format Excel applies when nothing else is set
pub const GENERAL_FORMAT: &str = "General";

/// Complete cell style
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Style {
    /// Font settings
    pub font: Font,
    /// Fill/background settings
    pub fill: Fill,
    /// Border settings
    pub border: Border,
    /// Text alignment
    pub alignment: Alignment,
    /// Number format code (e.g. `"#,##0.00"`)
    pub number_format: String,
    /// Cell protection
    pub protection: Protection,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font: Font::default(),
            fill: Fill::default(),
            border: Border::default(),
            alignment: Alignment::default(),
            number_format: GENERAL_FORMAT.to_string(),
            protection: Protection::default(),
        }
    }
}

impl Style {
    /// Create a new default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set font to bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    /// Set font to italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    /// Set font color
    pub fn font_color(mut self, color: Color) -> Self {
        self.font.color = color;
        self
    }

    /// Set fill color (solid fill)
    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill = Fill::Solid(color);
        self
    }

    /// Set number format code
    pub fn number_format<S: Into<String>>(mut self, format: S) -> Self {
        self.number_format = format.into();
        self
    }

    /// Set horizontal alignment
    pub fn horizontal(mut self, align: HorizontalAlignment) -> Self {
        self.alignment.horizontal = align;
        self
    }

    /// Set all four border edges
    pub fn outline(mut self, style: BorderLineStyle, color: Color) -> Self {
        self.border = Border::all(style, color);
        self
    }

    /// Lock or unlock the cell
    pub fn locked(mut self, locked: bool) -> Self {
        self.protection.locked = locked;
        self
    }

    /// Whether this is the default style
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }
}

/// Text alignment within a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
    pub indent: u8,
}

impl Alignment {
    /// Whether any attribute differs from Excel's defaults
    pub fn is_default(&self) -> bool {
        *self == Alignment::default()
    }
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

impl HorizontalAlignment {
    /// OOXML attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Fill => "fill",
            HorizontalAlignment::Justify => "justify",
        }
    }

    /// Parse an OOXML attribute value; unknown values fall back to general
    pub fn parse(s: &str) -> Self {
        match s {
            "left" => HorizontalAlignment::Left,
            "center" | "centerContinuous" => HorizontalAlignment::Center,
            "right" => HorizontalAlignment::Right,
            "fill" => HorizontalAlignment::Fill,
            "justify" | "distributed" => HorizontalAlignment::Justify,
            _ => HorizontalAlignment::General,
        }
    }
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
}

impl VerticalAlignment {
    /// OOXML attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }

    /// Parse an OOXML attribute value; unknown values fall back to bottom
    pub fn parse(s: &str) -> Self {
        match s {
            "top" => VerticalAlignment::Top,
            "center" => VerticalAlignment::Center,
            _ => VerticalAlignment::Bottom,
        }
    }
}

/// Cell protection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    /// Cell is locked (protected when sheet is protected)
    pub locked: bool,
    /// Formula is hidden when sheet is protected
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let style = Style::new()
            .bold(true)
            .fill_color(Color::rgb(0xFF, 0xFF, 0x00))
            .number_format("0.0%")
            .locked(false);

        assert!(style.font.bold);
        assert_eq!(style.fill, Fill::Solid(Color::rgb(0xFF, 0xFF, 0x00)));
        assert_eq!(style.number_format, "0.0%");
        assert!(!style.protection.locked);
        assert!(!style.is_default());
        assert!(Style::default().is_default());
    }

    #[test]
    fn test_alignment_names() {
        for align in [
            HorizontalAlignment::Left,
            HorizontalAlignment::Center,
            HorizontalAlignment::Right,
        ] {
            assert_eq!(HorizontalAlignment::parse(align.as_str()), align);
        }
        assert_eq!(VerticalAlignment::parse("middle"), VerticalAlignment::Bottom);
    }
}
