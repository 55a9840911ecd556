//! [`Grid`] over an `umya_spreadsheet` worksheet
//!
//! umya keeps every part of the package it does not model (VBA projects,
//! printer settings, defined names) so a read → edit → write cycle only
//! changes the cells written here.

use super::{parse_range, CellContent, CellRef, CellValue, Grid};
use umya_spreadsheet::Worksheet;

impl Grid for Worksheet {
    fn content(&self, at: CellRef) -> CellContent {
        let Some(cell) = self.get_cell((at.col, at.row)) else {
            return CellContent::default();
        };

        let formula = if cell.is_formula() {
            Some(cell.get_formula().to_string())
        } else {
            None
        };

        let value = match cell.get_value_number() {
            Some(n) => CellValue::Number(n),
            None => {
                let text = cell.get_value().to_string();
                if text.is_empty() {
                    CellValue::Blank
                } else {
                    CellValue::Text(text)
                }
            }
        };

        CellContent { formula, value }
    }

    fn used_rows(&self) -> u32 {
        self.get_highest_row()
    }

    fn used_columns(&self) -> u32 {
        self.get_highest_column()
    }

    fn set_number(&mut self, at: CellRef, value: f64) {
        self.get_cell_mut((at.col, at.row)).set_value_number(value);
    }

    fn set_text(&mut self, at: CellRef, value: &str) {
        self.get_cell_mut((at.col, at.row))
            .set_value_string(value.to_string());
    }

    fn set_blank(&mut self, at: CellRef) {
        // Absent cells are already blank; don't create a record for them
        if self.get_cell((at.col, at.row)).is_some() {
            self.get_cell_mut((at.col, at.row)).set_value(String::new());
        }
    }

    fn copy_style(&mut self, from: CellRef, to: CellRef) {
        let Some(style) = self
            .get_cell((from.col, from.row))
            .map(|cell| cell.get_style().clone())
        else {
            return;
        };
        self.get_cell_mut((to.col, to.row)).set_style(style);
    }

    fn merged_origin(&self, at: CellRef) -> CellRef {
        self.get_merge_cells()
            .iter()
            .filter_map(|range| parse_range(&range.get_range()))
            .find(|(start, end)| {
                (start.row..=end.row).contains(&at.row) && (start.col..=end.col).contains(&at.col)
            })
            .map(|(start, _)| start)
            .unwrap_or(at)
    }
}
