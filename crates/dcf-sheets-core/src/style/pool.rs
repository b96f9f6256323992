//! Per-worksheet style deduplication

use super::Style;
use ahash::AHashMap;

/// Deduplicating store of styles
///
/// Index 0 always holds the default style; a cell whose style index is 0
/// has no style of its own.
#[derive(Debug, Clone)]
pub struct StylePool {
    styles: Vec<Style>,
    index: AHashMap<Style, u32>,
}

impl StylePool {
    /// Create a pool holding only the default style
    pub fn new() -> Self {
        let mut pool = Self {
            styles: Vec::with_capacity(16),
            index: AHashMap::with_capacity(16),
        };
        pool.get_or_insert(Style::default());
        pool
    }

    /// Index of `style`, adding it when it is not pooled yet
    pub fn get_or_insert(&mut self, style: Style) -> u32 {
        if let Some(&idx) = self.index.get(&style) {
            return idx;
        }
        let idx = self.styles.len() as u32;
        self.index.insert(style.clone(), idx);
        self.styles.push(style);
        idx
    }

    /// Get a style by index
    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    /// Number of pooled styles, including the default
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// True when only the default style is pooled
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    /// Iterate over all styles with their indices
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Style)> {
        self.styles.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}
