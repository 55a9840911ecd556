//! Change reports: terminal tables and exported preview files

use crate::error::{WipError, WipResult};
use crate::sheet::{format_number, CellValue};
use crate::types::{Change, ChangeSummary, OpKind, ReconcileOutcome, Warning};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Exported form of an outcome
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: String,
    pub workbook: String,
    pub sheet: &'a str,
    pub total_changes: usize,
    pub sections: &'a [ChangeSummary],
    pub warnings: &'a [Warning],
}

impl<'a> Report<'a> {
    pub fn new(workbook: &Path, outcome: &'a ReconcileOutcome) -> Self {
        Self {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            workbook: workbook.display().to_string(),
            sheet: &outcome.sheet,
            total_changes: outcome.total_changes(),
            sections: &outcome.summaries,
            warnings: &outcome.warnings,
        }
    }
}

/// Write `outcome` to `output`; the format follows the extension
pub fn export(output: &Path, workbook: &Path, outcome: &ReconcileOutcome) -> WipResult<()> {
    let report = Report::new(workbook, outcome);
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "xlsx" => export_to_excel(output, &report),
        "yaml" | "yml" => {
            fs::write(output, serde_yaml::to_string(&report)?)?;
            Ok(())
        }
        "json" => {
            fs::write(output, serde_json::to_string_pretty(&report)?)?;
            Ok(())
        }
        _ => Err(WipError::Report(format!(
            "Unsupported report format: '{}'. Use .xlsx, .yaml or .json",
            extension
        ))),
    }
}

fn export_to_excel(output: &Path, report: &Report<'_>) -> WipResult<()> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Changes")
        .map_err(|e| WipError::Report(e.to_string()))?;

    for (col, width) in [(0u16, 10), (1, 8), (2, 14), (3, 12), (4, 14), (5, 14)] {
        worksheet.set_column_width(col, width).ok();
    }

    let header_format = Format::new().set_bold();
    for (col, header) in ["Section", "Row", "Job", "Operation", "Old value", "New value"]
        .iter()
        .enumerate()
    {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .ok();
    }

    let mut row = 1u32;
    for summary in report.sections {
        for change in &summary.changes {
            worksheet.write_string(row, 0, &summary.marker).ok();
            worksheet.write_number(row, 1, change.row as f64).ok();
            worksheet.write_string(row, 2, &change.job).ok();
            worksheet.write_string(row, 3, change.operation.to_string()).ok();
            match &change.old_value {
                CellValue::Number(n) => {
                    worksheet.write_number(row, 4, *n).ok();
                }
                CellValue::Blank => {}
                other => {
                    worksheet.write_string(row, 4, other.display_text()).ok();
                }
            }
            if let Some(v) = change.new_value {
                worksheet.write_number(row, 5, v).ok();
            }
            row += 1;
        }
    }

    let meta_row = row + 2;
    worksheet
        .write_string(meta_row, 0, format!("Sheet: {}", report.sheet))
        .ok();
    worksheet
        .write_string(meta_row + 1, 0, format!("Workbook: {}", report.workbook))
        .ok();
    worksheet
        .write_string(meta_row + 2, 0, format!("Generated: {}", report.generated_at))
        .ok();
    for (i, warning) in report.warnings.iter().enumerate() {
        worksheet
            .write_string(meta_row + 3 + i as u32, 0, format!("Warning: {}", warning))
            .ok();
    }

    workbook
        .save(output)
        .map_err(|e| WipError::Report(e.to_string()))?;
    Ok(())
}

fn old_value_text(value: &CellValue) -> String {
    match value {
        CellValue::Blank => "-".to_string(),
        other => other.display_text(),
    }
}

fn new_value_text(change: &Change) -> String {
    change
        .new_value
        .map(format_number)
        .unwrap_or_else(|| "-".to_string())
}

/// Print one section's changes as a table
pub fn print_summary(summary: &ChangeSummary) {
    println!(
        "\n{}",
        format!("📊 Section {}:", summary.marker).bold().cyan()
    );
    if summary.changes.is_empty() {
        println!("   {}", "Up to date, nothing to change".green());
        return;
    }

    println!("{}", "─".repeat(64));
    println!(
        "{:>6} {:<16} {:<10} {:>14} {:>14}",
        "Row".bold(),
        "Job".bold(),
        "Operation".bold(),
        "Old".bold(),
        "New".bold()
    );
    println!("{}", "─".repeat(64));

    for change in &summary.changes {
        let operation = change.operation.to_string();
        let operation = match change.operation {
            OpKind::Overwrite => operation.yellow(),
            OpKind::Append => operation.green(),
            OpKind::Clear => operation.red(),
        };
        println!(
            "{:>6} {:<16} {:<10} {:>14} {:>14}",
            change.row,
            change.job.bright_blue(),
            operation,
            old_value_text(&change.old_value),
            new_value_text(change)
        );
    }
    println!("{}", "─".repeat(64));
}

/// Print every section plus warnings and a totals line
pub fn print_outcome(outcome: &ReconcileOutcome) {
    for summary in &outcome.summaries {
        print_summary(summary);
    }

    if !outcome.warnings.is_empty() {
        println!();
        for warning in &outcome.warnings {
            println!("   {} {}", "⚠️".yellow(), warning.to_string().yellow());
        }
    }

    let count = |kind| {
        outcome
            .summaries
            .iter()
            .map(|s| s.count(kind))
            .sum::<usize>()
    };
    println!();
    println!(
        "   {} Overwrite: {}  {} Append: {}  {} Clear: {}",
        "✏️".yellow(),
        count(OpKind::Overwrite).to_string().yellow(),
        "➕".green(),
        count(OpKind::Append).to_string().green(),
        "🧹".red(),
        count(OpKind::Clear).to_string().red()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn outcome() -> ReconcileOutcome {
        ReconcileOutcome {
            sheet: "Jun 25".to_string(),
            summaries: vec![ChangeSummary {
                marker: "5040".to_string(),
                label_column: 1,
                value_column: 5,
                changes: vec![
                    Change {
                        row: 8,
                        job: "100".to_string(),
                        operation: OpKind::Overwrite,
                        old_value: CellValue::Number(50.0),
                        new_value: Some(75.0),
                    },
                    Change {
                        row: 9,
                        job: "200".to_string(),
                        operation: OpKind::Clear,
                        old_value: CellValue::Number(0.0),
                        new_value: None,
                    },
                ],
            }],
            warnings: vec![Warning::UnterminatedSection {
                marker: "5030".to_string(),
                bound_row: 30,
            }],
        }
    }

    #[test]
    fn test_export_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.yaml");
        export(&path, Path::new("wip.xlsx"), &outcome()).unwrap();

        let value: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["sheet"].as_str(), Some("Jun 25"));
        assert_eq!(value["total_changes"].as_u64(), Some(2));
        assert_eq!(value["sections"][0]["changes"][0]["operation"].as_str(), Some("overwrite"));
        assert_eq!(value["warnings"][0]["kind"].as_str(), Some("unterminated_section"));
    }

    #[test]
    fn test_export_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.json");
        export(&path, Path::new("wip.xlsx"), &outcome()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["sections"][0]["changes"][1]["new_value"], serde_json::Value::Null);
        assert_eq!(value["sections"][0]["changes"][0]["old_value"], 50.0);
    }

    #[test]
    fn test_export_xlsx_readable() {
        use calamine::{open_workbook, Data, Reader, Xlsx};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.xlsx");
        export(&path, Path::new("wip.xlsx"), &outcome()).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range("Changes").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Section".to_string())));
        assert_eq!(range.get_value((1, 3)), Some(&Data::String("OVERWRITE".to_string())));
        assert_eq!(range.get_value((1, 5)), Some(&Data::Float(75.0)));
    }

    #[test]
    fn test_unknown_extension() {
        let err = export(Path::new("out.csv"), Path::new("wip.xlsx"), &outcome()).unwrap_err();
        assert!(err.to_string().contains("Unsupported report format"));
    }

    #[test]
    fn test_value_text() {
        assert_eq!(old_value_text(&CellValue::Blank), "-");
        assert_eq!(old_value_text(&CellValue::Number(12.5)), "12.5");
    }
}
