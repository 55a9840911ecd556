//! wipsheet - section reconciliation for WIP report workbooks
//!
//! Writes aggregated actual-cost figures into named sections of an existing,
//! human-maintained worksheet while leaving formulas, formatting and macros
//! untouched.
//!
//! # Features
//!
//! - Marker-based section location ("Sub Labor Cost - 5040", "% of material")
//! - Per-row classification: formula rows are frozen, blank rows end a section
//! - Edit plans (overwrite / clear / append) that can be previewed before writing
//! - Lossless `.xlsx` / `.xlsm` editing, atomic saves, readback verification
//!
//! # Example
//!
//! ```
//! use wipsheet::config::SectionLayout;
//! use wipsheet::config::ScanLimits;
//! use wipsheet::engine::reconcile_sheet;
//! use wipsheet::sheet::MemorySheet;
//! use wipsheet::types::{TargetRow, TargetTable};
//!
//! let mut sheet = MemorySheet::new()
//!     .with_text(1, 1, "Sub Labor Cost - 5040")
//!     .with_text(2, 1, "100")
//!     .with_number(2, 2, 50.0)
//!     .with_text(3, 1, "200")
//!     .with_number(3, 2, 0.0);
//!
//! let targets = vec![TargetTable::new(
//!     "5040",
//!     vec![TargetRow::new("100", 75.0), TargetRow::new("300", 10.0)],
//! )];
//! let outcome = reconcile_sheet(
//!     &mut sheet,
//!     "Jun 25",
//!     &[SectionLayout::new("5040")],
//!     &targets,
//!     &ScanLimits::default(),
//! )?;
//!
//! assert_eq!(outcome.total_changes(), 3);
//! # Ok::<(), wipsheet::error::WipError>(())
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod month;
pub mod report;
pub mod sheet;
pub mod targets;
pub mod types;
pub mod workbook;

// Re-export commonly used types
pub use config::Config;
pub use error::{WipError, WipResult};
pub use types::{ChangeSummary, EditOp, EditPlan, ReconcileOutcome, TargetTable, Warning};
pub use workbook::Workbook;
