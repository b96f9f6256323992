//! Named range definitions
//!
//! A defined name maps to one or more destinations, each a range on a sheet:
//!
//! ```text
//! Ticker      -> Inputs!$C$5
//! Projection  -> 'Free Cash Flow'!$B$2:$F$2,Inputs!$C$7
//! ```

use std::collections::HashMap;

use crate::cell::CellRange;
use crate::error::{Error, Result};

/// Scope of a named range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// Visible from every sheet
    Workbook,
    /// Local to the named sheet
    Sheet(String),
}

/// One target of a named range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Sheet the range lives on; `None` means the sheet the lookup starts from
    pub sheet: Option<String>,
    pub range: CellRange,
}

/// A named range definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRange {
    /// The name; lookups ignore case
    pub name: String,
    pub scope: NameScope,
    /// Reference text, e.g. `Inputs!$C$5` (a leading `=` is tolerated)
    pub refers_to: String,
    /// Hidden from the name manager
    pub hidden: bool,
}

impl NamedRange {
    /// Create a new named range
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>, scope: NameScope) -> Self {
        Self {
            name: name.into(),
            scope,
            refers_to: refers_to.into(),
            hidden: false,
        }
    }

    /// Create a workbook-scoped named range
    pub fn workbook_scope(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self::new(name, refers_to, NameScope::Workbook)
    }

    /// Get the refers_to expression without a leading `=`
    pub fn expression(&self) -> &str {
        self.refers_to.strip_prefix('=').unwrap_or(&self.refers_to)
    }

    /// Parse the reference text into its destinations
    ///
    /// Constants and formulas are not ranges and fail with
    /// [`Error::InvalidName`].
    pub fn destinations(&self) -> Result<Vec<Destination>> {
        split_outside_quotes(self.expression(), ',')
            .into_iter()
            .map(|part| {
                let (sheet, range) = parse_qualified(part)
                    .map_err(|_| Error::InvalidName(format!("{} -> {}", self.name, self.refers_to)))?;
                Ok(Destination { sheet, range })
            })
            .collect()
    }
}

/// Split `'My Sheet'!A1:B2` into the unquoted sheet name and the range
///
/// References without a `!` yield no sheet.
pub fn parse_qualified(reference: &str) -> Result<(Option<String>, CellRange)> {
    let reference = reference.trim();
    match split_outside_quotes(reference, '!').as_slice() {
        [range] => Ok((None, CellRange::parse(range)?)),
        [sheet, range] => Ok((Some(unquote_sheet_name(sheet)), CellRange::parse(range)?)),
        _ => Err(Error::MalformedAddress(reference.to_string())),
    }
}

/// Quote a sheet name for use in a reference when it needs it
///
/// ```
/// use dcf_sheets_core::named_range::quote_sheet_name;
///
/// assert_eq!(quote_sheet_name("Inputs"), "Inputs");
/// assert_eq!(quote_sheet_name("Free Cash Flow"), "'Free Cash Flow'");
/// assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
/// ```
pub fn quote_sheet_name(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn unquote_sheet_name(name: &str) -> String {
    let name = name.trim();
    match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => name.to_string(),
    }
}

fn split_outside_quotes(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if c == '\'' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Collection of named ranges with case-insensitive lookup
#[derive(Debug, Default, Clone)]
pub struct NamedRangeCollection {
    ranges: HashMap<(String, NameScope), NamedRange>,
}

impl NamedRangeCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, scope: &NameScope) -> (String, NameScope) {
        (name.to_lowercase(), scope.clone())
    }

    /// Define or replace a named range
    pub fn define(&mut self, range: NamedRange) -> Result<()> {
        let valid = range
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '\\')
            && range
                .name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '\\');
        if !valid {
            return Err(Error::InvalidName(range.name));
        }
        let key = Self::key(&range.name, &range.scope);
        self.ranges.insert(key, range);
        Ok(())
    }

    /// Look a name up from `current_sheet`: sheet-local names win over workbook names
    pub fn get(&self, name: &str, current_sheet: &str) -> Option<&NamedRange> {
        self.ranges
            .get(&Self::key(name, &NameScope::Sheet(current_sheet.to_string())))
            .or_else(|| self.ranges.get(&Self::key(name, &NameScope::Workbook)))
    }

    /// Remove a named range
    pub fn remove(&mut self, name: &str, scope: &NameScope) -> Option<NamedRange> {
        self.ranges.remove(&Self::key(name, scope))
    }

    /// Drop every name scoped to `sheet`
    pub fn remove_sheet_scope(&mut self, sheet: &str) {
        self.ranges
            .retain(|(_, scope), _| !matches!(scope, NameScope::Sheet(s) if s == sheet));
    }

    /// Re-home sheet-scoped names after a rename
    pub fn rename_sheet_scope(&mut self, old: &str, new: &str) {
        let keys: Vec<(String, NameScope)> = self
            .ranges
            .keys()
            .filter(|(_, scope)| matches!(scope, NameScope::Sheet(s) if s == old))
            .cloned()
            .collect();
        for key in keys {
            if let Some(mut range) = self.ranges.remove(&key) {
                range.scope = NameScope::Sheet(new.to_string());
                self.ranges.insert(Self::key(&range.name, &range.scope), range);
            }
        }
    }

    /// Iterate over all named ranges, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        let mut all: Vec<&NamedRange> = self.ranges.values().collect();
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        all.into_iter()
    }

    /// Get the number of named ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
