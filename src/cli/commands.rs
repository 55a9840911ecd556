use crate::config::Config;
use crate::error::WipResult;
use crate::month::MonthTag;
use crate::report;
use crate::targets::TargetSet;
use crate::types::RowClass;
use crate::workbook::{SheetChoice, Workbook};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Load the config file, or the built-in WIP layout when none is given
pub fn load_config(path: Option<&Path>) -> WipResult<Config> {
    match path {
        Some(path) => Config::from_path(path),
        None => Ok(Config::default()),
    }
}

/// Month tag to use when `--sheet` is omitted
fn sheet_or_current(sheet: Option<String>) -> String {
    sheet.unwrap_or_else(|| MonthTag::from_date(chrono::Local::now().date_naive()).to_string())
}

fn print_sheet_choice(choice: &SheetChoice) {
    match &choice.created_from {
        Some(template) => println!(
            "   Sheet: {} {}",
            choice.name.bright_yellow().bold(),
            format!("(new, from '{}')", template).dimmed()
        ),
        None => println!("   Sheet: {}", choice.name.bright_yellow().bold()),
    }
}

/// Execute the sections command
pub fn sections(workbook_path: PathBuf, sheet: Option<String>, config: Option<PathBuf>) -> WipResult<()> {
    let config = load_config(config.as_deref())?;
    let sheet = sheet_or_current(sheet);

    println!("{}", "📒 wipsheet - Sections".bold().green());
    println!("   Workbook: {}", workbook_path.display());

    let workbook = Workbook::open(&workbook_path)?;
    let name = workbook.find_sheet(&sheet).unwrap_or(sheet);
    println!("   Sheet: {}", name.bright_yellow().bold());

    let (extents, warnings) = workbook.sections(&name, &config)?;

    for extent in &extents {
        let section = &extent.section;
        let formula_rows: Vec<u32> = extent.formula_rows().collect();
        println!(
            "\n{}",
            format!("📍 {} (row {})", section.marker, section.anchor_row)
                .bold()
                .cyan()
        );
        println!(
            "   Columns: label {}, value {}",
            crate::sheet::column_letter(section.label_column),
            crate::sheet::column_letter(section.value_column)
        );
        println!(
            "   Extent: rows {}..={} ({} data, {} formula)",
            section.data_start_row,
            extent.extent_end_row,
            extent.data_rows.len(),
            formula_rows.len()
        );
        match extent.append_capacity {
            Some(free) => println!("   Free rows below: {}", free),
            None => println!("   Free rows below: {}", "unbounded".dimmed()),
        }

        for (row, class) in &extent.rows {
            let label = match class {
                RowClass::DataRow => {
                    let data = extent.data_rows.iter().find(|r| r.row == *row);
                    match data {
                        Some(r) => format!("{:<16} {}", r.job.bright_blue(), r.value),
                        None => String::new(),
                    }
                }
                RowClass::FormulaRow => "🔒 formula".yellow().to_string(),
                RowClass::BlankTerminator => "end".dimmed().to_string(),
            };
            println!("   {:>6}  {}", row, label);
        }
    }

    if !warnings.is_empty() {
        println!();
        for warning in &warnings {
            println!("   {} {}", "⚠️".yellow(), warning.to_string().yellow());
        }
    }

    Ok(())
}

/// Execute the preview command
pub fn preview(
    workbook_path: PathBuf,
    sheet: Option<String>,
    targets: PathBuf,
    config: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> WipResult<()> {
    let config = load_config(config.as_deref())?;
    let sheet = sheet_or_current(sheet);

    println!("{}", "📒 wipsheet - Preview".bold().green());
    println!("   Workbook: {}", workbook_path.display());
    println!("   Targets: {}", targets.display());
    println!(
        "{}",
        "📋 PREVIEW MODE - The workbook will not be written\n".yellow()
    );

    let targets = TargetSet::from_path(&targets)?;
    let mut workbook = Workbook::open(&workbook_path)?;
    let choice = workbook.ensure_sheet(&sheet, &config)?;
    print_sheet_choice(&choice);

    let outcome = workbook.preview(&choice.name, &config, &targets)?;
    report::print_outcome(&outcome);

    if let Some(path) = report_path {
        report::export(&path, &workbook_path, &outcome)?;
        println!(
            "\n{}",
            format!("✅ Preview report exported to {}", path.display())
                .bold()
                .green()
        );
    }

    Ok(())
}

/// Execute the apply command
pub fn apply(
    workbook_path: PathBuf,
    sheet: Option<String>,
    targets: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    no_verify: bool,
) -> WipResult<()> {
    let config = load_config(config.as_deref())?;
    let sheet = sheet_or_current(sheet);

    println!("{}", "📒 wipsheet - Apply".bold().green());
    println!("   Workbook: {}", workbook_path.display());
    println!("   Targets: {}", targets.display());

    let targets = TargetSet::from_path(&targets)?;
    let mut workbook = Workbook::open(&workbook_path)?;
    let choice = workbook.ensure_sheet(&sheet, &config)?;
    print_sheet_choice(&choice);

    let outcome = workbook.reconcile(&choice.name, &config, &targets)?;
    report::print_outcome(&outcome);

    let output = output.unwrap_or_else(|| workbook_path.clone());
    if outcome.total_changes() == 0 && choice.created_from.is_none() && output == workbook_path {
        println!("\n{}", "✨ Workbook already up to date".bold().green());
        return Ok(());
    }

    workbook.save(&output)?;
    println!(
        "\n{}",
        format!("✅ Saved {}", output.display()).bold().green()
    );

    if !no_verify {
        let cells = workbook.verify(&output, &outcome)?;
        println!(
            "{}",
            format!("🔍 Verified {} written cells", cells).green()
        );
    }

    Ok(())
}
