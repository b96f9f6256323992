//! Colors and background fills

use std::fmt;

/// Color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Automatic/default color
    #[default]
    Auto,
    /// ARGB color packed as `0xAARRGGBB`
    Argb(u32),
    /// Theme color index
    Theme(u8),
    /// Indexed color (legacy palette)
    Indexed(u8),
}

impl Color {
    /// Opaque RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Argb(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Parse `RRGGBB` or `AARRGGBB`, with or without a leading `#`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(Color::Argb(0xFF00_0000 | value)),
            8 => Some(Color::Argb(value)),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => write!(f, "auto"),
            Color::Argb(argb) => write!(f, "{:08X}", argb),
            Color::Theme(i) => write!(f, "theme:{}", i),
            Color::Indexed(i) => write!(f, "indexed:{}", i),
        }
    }
}

/// Fill style for cell background
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Fill {
    /// No fill (transparent)
    #[default]
    None,
    /// Solid color fill
    Solid(Color),
    /// Any other OOXML pattern, kept by name
    Pattern {
        pattern: String,
        foreground: Color,
        background: Color,
    },
}

impl Fill {
    /// Check if this is a "no fill"
    pub fn is_none(&self) -> bool {
        matches!(self, Fill::None)
    }
}
