//! Notes and hyperlinks attached to cells
//!
//! Both travel with a cell when sheets are deep-copied during a merge and
//! are written back out by the xlsx writer.

use std::fmt;

/// A cell comment (note)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellComment {
    /// Author of the comment, possibly empty
    pub author: String,
    /// Comment text
    pub text: String,
}

impl CellComment {
    /// Create a new comment with the given author and text
    ///
    /// ```rust
    /// use dcf_sheets_core::CellComment;
    ///
    /// let note = CellComment::new("Analyst", "Source: 10-K");
    /// assert_eq!(note.to_string(), "[Analyst]: Source: 10-K");
    /// ```
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Check if this comment has an author
    pub fn has_author(&self) -> bool {
        !self.author.is_empty()
    }
}

impl fmt::Display for CellComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_author() {
            write!(f, "[{}]: {}", self.author, self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

/// A hyperlink attached to a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    /// External URL, or an in-workbook location such as `Inputs!A1`
    pub target: String,
    /// Optional hover text
    pub tooltip: Option<String>,
}

impl Hyperlink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Whether the target points outside the workbook
    pub fn is_external(&self) -> bool {
        self.target.contains("://") || self.target.starts_with("mailto:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_display() {
        assert_eq!(CellComment::new("John", "Hello").to_string(), "[John]: Hello");
        assert_eq!(CellComment::new("", "Hello").to_string(), "Hello");
    }

    #[test]
    fn test_hyperlink_kind() {
        assert!(Hyperlink::new("https://www.sec.gov").is_external());
        assert!(Hyperlink::new("mailto:ir@example.com").is_external());
        assert!(!Hyperlink::new("Inputs!A1").with_tooltip("jump").is_external());
    }
}
