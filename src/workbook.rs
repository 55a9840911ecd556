//! Workbook handle: load, pick the month sheet, reconcile, save, verify
//!
//! The workbook is read with `umya-spreadsheet`, which round-trips the
//! package (styles, defined names, VBA) so only written cells change. Saves go
//! to a temporary sibling file that replaces the target only once the write
//! succeeded. Verification re-reads the saved file with `calamine`, so the
//! check does not share code with the writer.

use crate::config::Config;
use crate::engine::{self, extent, locator};
use crate::error::{WipError, WipResult};
use crate::month::{find_month_sheet, MonthTag};
use crate::sheet::{format_number, storage_cell, CellRef, Grid};
use crate::targets::TargetSet;
use crate::types::{OpKind, ReconcileOutcome, RowClass, SectionExtent, Warning};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Sheet names tried as the template when none is configured
const TEMPLATE_NAMES: &[&str] = &["Template", "Master"];

/// How the target sheet was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetChoice {
    pub name: String,
    /// Cloned from `template` during this run
    pub created_from: Option<String>,
}

pub struct Workbook {
    path: PathBuf,
    book: Spreadsheet,
}

impl Workbook {
    /// Load an `.xlsx` / `.xlsm` workbook
    pub fn open(path: &Path) -> WipResult<Self> {
        if !path.exists() {
            return Err(WipError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("workbook '{}' does not exist", path.display()),
            )));
        }
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(WipError::xlsx)?;
        info!(path = %path.display(), sheets = book.get_sheet_collection_no_check().len(), "opened workbook");
        Ok(Self {
            path: path.to_path_buf(),
            book,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection_no_check()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    pub fn worksheet(&self, name: &str) -> WipResult<&Worksheet> {
        self.book
            .get_sheet_by_name(name)
            .ok_or_else(|| self.not_found(name))
    }

    /// Resolve a sheet argument: an exact tab name, or a month tag
    pub fn find_sheet(&self, tag: &str) -> Option<String> {
        let names = self.sheet_names();
        if let Some(name) = names.iter().find(|n| n.as_str() == tag.trim()) {
            return Some(name.clone());
        }
        let month = MonthTag::parse(tag).ok()?;
        find_month_sheet(&names, &month).map(str::to_string)
    }

    /// Find the month sheet, or create it from the template sheet
    ///
    /// A created sheet keeps the template's layout, formulas and styles; the
    /// data rows of every configured section are blanked.
    pub fn ensure_sheet(&mut self, tag: &str, config: &Config) -> WipResult<SheetChoice> {
        if let Some(name) = self.find_sheet(tag) {
            return Ok(SheetChoice {
                name,
                created_from: None,
            });
        }

        let name = MonthTag::parse(tag)?.to_string();
        let template = self.template_name(config)?;
        let mut sheet = self.worksheet(&template)?.clone();
        sheet.set_name(name.clone());

        let cleared = clear_data_rows(&mut sheet, config)?;
        self.book
            .add_sheet(sheet)
            .map_err(|e| WipError::Xlsx(format!("cannot add sheet '{}': {}", name, e)))?;

        info!(sheet = %name, template = %template, cleared, "created month sheet");
        Ok(SheetChoice {
            name,
            created_from: Some(template),
        })
    }

    /// Locate and resolve every configured section, read only
    pub fn sections(&self, sheet: &str, config: &Config) -> WipResult<(Vec<SectionExtent>, Vec<Warning>)> {
        let ws = self.worksheet(sheet)?;
        resolve_all(ws, config)
    }

    /// Reconcile against a copy of the sheet and discard it
    pub fn preview(&self, sheet: &str, config: &Config, targets: &TargetSet) -> WipResult<ReconcileOutcome> {
        let ws = self.worksheet(sheet)?;
        engine::preview_sheet(ws, sheet, &config.sections, targets.tables(), &config.scan)
    }

    /// Reconcile the sheet in memory
    ///
    /// Work happens on a copy that replaces the sheet only when every section
    /// succeeded; on error the workbook is unchanged.
    pub fn reconcile(&mut self, sheet: &str, config: &Config, targets: &TargetSet) -> WipResult<ReconcileOutcome> {
        let mut scratch = self.worksheet(sheet)?.clone();
        let outcome = engine::reconcile_sheet(
            &mut scratch,
            sheet,
            &config.sections,
            targets.tables(),
            &config.scan,
        )?;

        let slot = self
            .book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| WipError::SheetNotFound {
                name: sheet.to_string(),
                available: Vec::new(),
            })?;
        *slot = scratch;
        Ok(outcome)
    }

    /// Write the workbook to `path` through a temporary sibling file
    pub fn save(&self, path: &Path) -> WipResult<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| WipError::Config(format!("invalid output path '{}'", path.display())))?;
        let temp = path.with_file_name(format!(".{}.wipsheet-tmp", file_name));

        if let Err(e) = umya_spreadsheet::writer::xlsx::write(&self.book, &temp) {
            let _ = fs::remove_file(&temp);
            return Err(WipError::xlsx(e));
        }
        fs::rename(&temp, path).inspect_err(|_| {
            let _ = fs::remove_file(&temp);
        })?;

        info!(path = %path.display(), "saved workbook");
        Ok(())
    }

    /// Check a saved copy of this workbook against `outcome`
    pub fn verify(&self, path: &Path, outcome: &ReconcileOutcome) -> WipResult<usize> {
        let layout = self.worksheet(&outcome.sheet)?;
        verify_saved(path, outcome, layout)
    }

    fn template_name(&self, config: &Config) -> WipResult<String> {
        let names = self.sheet_names();
        let found = match &config.template_sheet {
            Some(template) => names.iter().find(|n| *n == template),
            None => names
                .iter()
                .find(|n| TEMPLATE_NAMES.iter().any(|t| n.eq_ignore_ascii_case(t))),
        };
        found.cloned().ok_or_else(|| WipError::SheetNotFound {
            name: config
                .template_sheet
                .clone()
                .unwrap_or_else(|| TEMPLATE_NAMES.join(" / ")),
            available: names,
        })
    }

    fn not_found(&self, name: &str) -> WipError {
        WipError::SheetNotFound {
            name: name.to_string(),
            available: self.sheet_names(),
        }
    }
}

fn resolve_all<G: Grid + ?Sized>(grid: &G, config: &Config) -> WipResult<(Vec<SectionExtent>, Vec<Warning>)> {
    let sections = locator::locate(grid, &config.sections, &config.scan)?;
    let mut extents = Vec::with_capacity(sections.len());
    let mut warnings = Vec::new();
    for (idx, section) in sections.iter().enumerate() {
        let next = sections.get(idx + 1).map(|s| s.anchor_row);
        let (extent, warning) = extent::resolve(grid, section, next, &config.scan);
        warnings.extend(warning);
        extents.push(extent);
    }
    Ok((extents, warnings))
}

/// Blank the label and value cells of every data row, keeping styles
fn clear_data_rows<G: Grid + ?Sized>(grid: &mut G, config: &Config) -> WipResult<usize> {
    let (extents, _) = resolve_all(grid, config)?;
    let mut cleared = 0;
    for extent in &extents {
        for (row, class) in &extent.rows {
            if *class != RowClass::DataRow {
                continue;
            }
            grid.set_blank(CellRef::new(*row, extent.section.label_column));
            grid.set_blank(CellRef::new(*row, extent.section.value_column));
            cleared += 1;
        }
    }
    Ok(cleared)
}

/// Expected end state of one cell after an apply
#[derive(Debug, Clone, PartialEq)]
enum Expected {
    Blank,
    Number(f64),
    Text(String),
}

/// Re-read `path` and check every written cell of `outcome`
///
/// `layout` is the sheet as it was written in memory; its merged ranges
/// redirect each expected cell the way the mutator redirected the write.
/// Returns the number of cells checked.
pub fn verify_saved<G: Grid + ?Sized>(
    path: &Path,
    outcome: &ReconcileOutcome,
    layout: &G,
) -> WipResult<usize> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| WipError::Verify(format!("cannot reopen '{}': {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range(&outcome.sheet)
        .map_err(|e| WipError::Verify(format!("sheet '{}': {}", outcome.sheet, e)))?;

    // Later operations on the same row win (clear, then reuse)
    let mut expected: BTreeMap<CellRef, Expected> = BTreeMap::new();
    for summary in &outcome.summaries {
        for change in &summary.changes {
            let label = storage_cell(layout, CellRef::new(change.row, summary.label_column));
            let value = storage_cell(layout, CellRef::new(change.row, summary.value_column));
            match (change.operation, change.new_value) {
                (OpKind::Clear, _) => {
                    expected.insert(label, Expected::Blank);
                    expected.insert(value, Expected::Blank);
                }
                (_, Some(v)) => {
                    expected.insert(label, Expected::Text(change.job.clone()));
                    expected.insert(value, Expected::Number(v));
                }
                (_, None) => {}
            }
        }
    }

    for (at, want) in &expected {
        let got = range.get_value((at.row - 1, at.col - 1));
        let ok = match (want, got) {
            (Expected::Blank, None | Some(Data::Empty)) => true,
            (Expected::Blank, Some(Data::String(s))) => s.trim().is_empty(),
            (Expected::Number(v), Some(Data::Float(f))) => f == v,
            (Expected::Number(v), Some(Data::Int(i))) => *i as f64 == *v,
            (Expected::Text(job), Some(Data::String(s))) => s.trim() == job,
            (Expected::Text(job), Some(Data::Float(f))) => format_number(*f) == *job,
            (Expected::Text(job), Some(Data::Int(i))) => i.to_string() == *job,
            _ => false,
        };
        if !ok {
            return Err(WipError::Verify(format!(
                "{}!{}: expected {:?}, found {:?}",
                outcome.sheet, at, want, got
            )));
        }
        debug!(cell = %at, "verified");
    }

    info!(path = %path.display(), cells = expected.len(), "verified saved workbook");
    Ok(expected.len())
}
