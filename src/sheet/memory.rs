//! In-memory grid

use super::{parse_range, CellContent, CellRef, CellValue, Grid};
use std::collections::BTreeMap;

/// Opaque style handle of a [`MemorySheet`] cell
pub type StyleId = u32;

#[derive(Debug, Clone, Default, PartialEq)]
struct MemoryCell {
    content: CellContent,
    style: StyleId,
}

/// A sparse worksheet held entirely in memory
///
/// Builder methods take 1-based `(row, col)` pairs:
///
/// ```
/// use wipsheet::sheet::{Grid, MemorySheet, CellRef};
///
/// let sheet = MemorySheet::new()
///     .with_text(1, 1, "Sub Labor Cost - 5040")
///     .with_text(2, 1, "100")
///     .with_number(2, 2, 50.0)
///     .with_formula(3, 2, "SUM(B2:B2)");
///
/// assert_eq!(sheet.used_rows(), 3);
/// assert!(sheet.content(CellRef::new(3, 2)).formula.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySheet {
    cells: BTreeMap<CellRef, MemoryCell>,
    merges: Vec<(CellRef, CellRef)>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, row: u32, col: u32, text: &str) -> Self {
        self.put(CellRef::new(row, col), CellContent::text(text));
        self
    }

    pub fn with_number(mut self, row: u32, col: u32, value: f64) -> Self {
        self.put(CellRef::new(row, col), CellContent::number(value));
        self
    }

    pub fn with_formula(mut self, row: u32, col: u32, formula: &str) -> Self {
        self.put(CellRef::new(row, col), CellContent::formula(formula));
        self
    }

    pub fn with_style(mut self, row: u32, col: u32, style: StyleId) -> Self {
        self.cells.entry(CellRef::new(row, col)).or_default().style = style;
        self
    }

    /// Register a merged range such as "A5:C5"; invalid ranges are ignored
    pub fn with_merge(mut self, range: &str) -> Self {
        if let Some(corners) = parse_range(range) {
            self.merges.push(corners);
        }
        self
    }

    /// Replace a cell's content, keeping its style
    pub fn put(&mut self, at: CellRef, content: CellContent) {
        self.cells.entry(at).or_default().content = content;
    }

    pub fn style_of(&self, at: CellRef) -> StyleId {
        self.cells.get(&at).map(|c| c.style).unwrap_or_default()
    }

    /// All formula cells with their text, row-major
    pub fn formulas(&self) -> Vec<(CellRef, String)> {
        self.cells
            .iter()
            .filter_map(|(at, cell)| cell.content.formula.clone().map(|f| (*at, f)))
            .collect()
    }
}

impl Grid for MemorySheet {
    fn content(&self, at: CellRef) -> CellContent {
        self.cells
            .get(&at)
            .map(|c| c.content.clone())
            .unwrap_or_default()
    }

    fn used_rows(&self) -> u32 {
        self.cells.keys().map(|at| at.row).max().unwrap_or(0)
    }

    fn used_columns(&self) -> u32 {
        self.cells.keys().map(|at| at.col).max().unwrap_or(0)
    }

    fn set_number(&mut self, at: CellRef, value: f64) {
        self.put(at, CellContent::number(value));
    }

    fn set_text(&mut self, at: CellRef, value: &str) {
        self.put(at, CellContent::text(value));
    }

    fn set_blank(&mut self, at: CellRef) {
        if let Some(cell) = self.cells.get_mut(&at) {
            cell.content = CellContent {
                formula: None,
                value: CellValue::Blank,
            };
        }
    }

    fn copy_style(&mut self, from: CellRef, to: CellRef) {
        let style = self.style_of(from);
        self.cells.entry(to).or_default().style = style;
    }

    fn merged_origin(&self, at: CellRef) -> CellRef {
        self.merges
            .iter()
            .find(|(start, end)| {
                (start.row..=end.row).contains(&at.row) && (start.col..=end.col).contains(&at.col)
            })
            .map(|(start, _)| *start)
            .unwrap_or(at)
    }
}
