//! Workbook fixtures shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use umya_spreadsheet::Worksheet;

/// Fill `ws` with the two-section WIP layout
///
/// ```text
///  3  Sub Labor Cost - 5040
///  4  100        E: 50   (bold)
///  5  200        E: 0    (bold, #,##0.00)
///  6  400        E: =E4*2
///  9  Material - 5030
/// 10  100        C: 12.5
/// 11  Total      C: =SUM(C10:C10)
/// ```
pub fn fill_wip_layout(ws: &mut Worksheet) {
    ws.get_cell_mut("A1").set_value("WIP Report");
    ws.get_cell_mut("A3").set_value("Sub Labor Cost - 5040");
    ws.get_cell_mut("A4").set_value("100");
    ws.get_cell_mut("E4").set_value_number(50.0);
    ws.get_cell_mut("A5").set_value("200");
    ws.get_cell_mut("E5").set_value_number(0.0);
    ws.get_cell_mut("A6").set_value("400");
    ws.get_cell_mut("E6").set_formula("E4*2");
    ws.get_cell_mut("A9").set_value("Material - 5030");
    ws.get_cell_mut("A10").set_value("100");
    ws.get_cell_mut("C10").set_value_number(12.5);
    ws.get_cell_mut("A11").set_value("Total");
    ws.get_cell_mut("C11").set_formula("SUM(C10:C10)");

    for cell in ["A4", "E4", "A5", "E5"] {
        ws.get_style_mut(cell).get_font_mut().set_bold(true);
    }
    ws.get_style_mut("E5")
        .get_number_format_mut()
        .set_format_code("#,##0.00");
}

/// Workbook with a "Jun 25" month tab and a "Template" tab of the same layout
pub fn write_wip_workbook(dir: &Path) -> PathBuf {
    let mut book = umya_spreadsheet::new_file();
    if let Some(ws) = book.get_sheet_by_name_mut("Sheet1") {
        ws.set_name("Jun 25");
        fill_wip_layout(ws);
    }
    if let Ok(ws) = book.new_sheet("Template") {
        fill_wip_layout(ws);
    }

    let path = dir.join("WIP.xlsx");
    umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();
    path
}

pub fn write_targets(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("targets.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

pub const JUNE_TARGETS: &str = r#"
sections:
  - marker: "5040"
    rows:
      - { job: 100, value: 75 }
      - { job: 300, value: 10 }
      - { job: 400, value: 999 }
  - marker: "5030"
    rows:
      - { job: 100, value: 20 }
"#;

/// Read a cell back through umya
pub fn cell_text(path: &Path, sheet: &str, cell: &str) -> String {
    let book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
    let ws = book.get_sheet_by_name(sheet).unwrap();
    ws.get_value(cell)
}

pub fn cell_formula(path: &Path, sheet: &str, cell: &str) -> String {
    let book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
    let ws = book.get_sheet_by_name(sheet).unwrap();
    ws.get_cell(cell).map(|c| c.get_formula().to_string()).unwrap_or_default()
}

pub fn style_debug(path: &Path, sheet: &str, cell: &str) -> String {
    let book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
    let ws = book.get_sheet_by_name(sheet).unwrap();
    format!("{:?}", ws.get_style(cell))
}
