//! Cell borders

use super::Color;

/// Border style for a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Border {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
}

impl Border {
    /// Same edge on all four sides
    pub fn all(style: BorderLineStyle, color: Color) -> Self {
        let edge = Some(BorderEdge { style, color });
        Self {
            left: edge,
            right: edge,
            top: edge,
            bottom: edge,
        }
    }

    /// Check if no edge is set
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }
}

/// A single border edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BorderEdge {
    pub style: BorderLineStyle,
    pub color: Color,
}

/// Border line styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderLineStyle {
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
}

impl BorderLineStyle {
    /// OOXML attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderLineStyle::Thin => "thin",
            BorderLineStyle::Medium => "medium",
            BorderLineStyle::Thick => "thick",
            BorderLineStyle::Dashed => "dashed",
            BorderLineStyle::Dotted => "dotted",
            BorderLineStyle::Double => "double",
            BorderLineStyle::Hair => "hair",
        }
    }

    /// Parse an OOXML attribute value; `none` and unknown values yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "thin" => Some(BorderLineStyle::Thin),
            "medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" => {
                Some(BorderLineStyle::Medium)
            }
            "thick" => Some(BorderLineStyle::Thick),
            "dashed" | "dashDot" | "dashDotDot" | "slantDashDot" => Some(BorderLineStyle::Dashed),
            "dotted" => Some(BorderLineStyle::Dotted),
            "double" => Some(BorderLineStyle::Double),
            "hair" => Some(BorderLineStyle::Hair),
            _ => None,
        }
    }
}
