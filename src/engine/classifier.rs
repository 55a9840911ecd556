//! Cell classification shared by the resolver and the mutator

use crate::sheet::{CellContent, CellValue};
use crate::types::CellKind;

/// Classify a cell as formula, value or blank
///
/// A cell is a formula when storage reports it as formula-typed or when its
/// stored text starts with `=`. The mutator calls this again right before
/// every write, so both phases agree on what is protected.
pub fn classify(cell: &CellContent) -> CellKind {
    if cell.formula.is_some() {
        return CellKind::Formula;
    }
    match &cell.value {
        CellValue::Text(text) if text.trim_start().starts_with('=') => CellKind::Formula,
        value if value.is_blank() => CellKind::Blank,
        _ => CellKind::Value,
    }
}
