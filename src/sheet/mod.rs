//! Grid access for the reconciliation engine
//!
//! The engine never talks to a workbook library directly. It reads and writes
//! cells through the [`Grid`] trait, which is implemented for:
//! - [`MemorySheet`]: a small in-memory sheet (tests, dry runs)
//! - `umya_spreadsheet::Worksheet`: the lossless xlsx/xlsm model used on real files

mod memory;
mod worksheet;

pub use memory::{MemorySheet, StyleId};

use serde::Serialize;
use std::fmt;

/// A 1-based (row, column) cell address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style reference ("E12", "$A$3")
    pub fn parse(a1: &str) -> Option<Self> {
        let a1 = a1.trim().replace('$', "");
        let split = a1.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = a1.split_at(split);
        let col = column_index(letters)?;
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.col), self.row)
    }
}

/// Convert a 1-based column number to letters (1 → A, 27 → AA)
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut idx = col.saturating_sub(1);

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Convert column letters to a 1-based column number (A → 1, AA → 27)
pub fn column_index(letters: &str) -> Option<u32> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut result: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        result = result * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(result)
}

/// Typed cell value as read from storage
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Blank,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Whether the value has any non-whitespace representation
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Trimmed textual form, numbers without trailing zeros ("100", not "100.0")
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Blank => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

/// Format a number the way it reads in a job-number column
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// What storage holds for one cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellContent {
    /// Formula text when the storage layer reports the cell as formula-typed
    pub formula: Option<String>,
    /// Stored (or cached) value
    pub value: CellValue,
}

impl CellContent {
    pub fn number(n: f64) -> Self {
        Self {
            formula: None,
            value: CellValue::Number(n),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self {
            formula: None,
            value: CellValue::Text(s.into()),
        }
    }

    pub fn formula(f: impl Into<String>) -> Self {
        Self {
            formula: Some(f.into()),
            value: CellValue::Blank,
        }
    }
}

/// Cell-level access to one worksheet
///
/// Writers must only be called on cells that the classifier reports as
/// non-formula; the mutator enforces that before each call.
pub trait Grid {
    /// Content of a cell; absent cells are blank
    fn content(&self, at: CellRef) -> CellContent;

    /// Highest row holding any cell record
    fn used_rows(&self) -> u32;

    /// Highest column holding any cell record
    fn used_columns(&self) -> u32;

    fn set_number(&mut self, at: CellRef, value: f64);

    fn set_text(&mut self, at: CellRef, value: &str);

    /// Remove the value, keeping the cell's style
    fn set_blank(&mut self, at: CellRef);

    /// Copy the style of `from` onto `to` without touching either value
    fn copy_style(&mut self, from: CellRef, to: CellRef);

    /// Top-left cell of the merged range containing `at`, or `at` itself
    fn merged_origin(&self, at: CellRef) -> CellRef;
}

/// Cell that stores what is shown at `at`
///
/// Inside a merged range spanning columns of the same row this is the range's
/// top-left cell. Vertical merges are not followed: redirecting there would
/// read or write another row's cell.
pub fn storage_cell<G: Grid + ?Sized>(grid: &G, at: CellRef) -> CellRef {
    let origin = grid.merged_origin(at);
    if origin.row == at.row {
        origin
    } else {
        at
    }
}

/// Parse an "A1:C3" range into its corners
pub(crate) fn parse_range(range: &str) -> Option<(CellRef, CellRef)> {
    let (start, end) = range.split_once(':')?;
    Some((CellRef::parse(start)?, CellRef::parse(end)?))
}
