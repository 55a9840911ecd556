use thiserror::Error;

pub type WipResult<T> = Result<T, WipError>;

#[derive(Error, Debug)]
pub enum WipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    Xlsx(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sheet '{name}' not found (available: {})", .available.join(", "))]
    SheetNotFound { name: String, available: Vec<String> },

    #[error("Section marker '{marker}' not found in the used range")]
    SectionNotFound { marker: String },

    #[error("Sections '{first}' and '{second}' both anchor on row {row}")]
    OverlappingSections {
        first: String,
        second: String,
        row: u32,
    },

    #[error("Refusing to write formula cell at row {row}, column {column}")]
    FormulaProtectionViolation { row: u32, column: u32 },

    #[error("Append target at row {row}, column {column} already holds a value")]
    AppendCollision { row: u32, column: u32 },

    #[error("Section '{marker}' needs {needed} more rows but only {available} are free before the next section")]
    SectionOverflow {
        marker: String,
        needed: usize,
        available: usize,
    },

    #[error("Invalid target table for '{marker}': {reason}")]
    InvalidTarget { marker: String, reason: String },

    #[error("Cannot read '{0}' as a month (try \"Apr 25\", \"April 2025\" or \"2025-04\")")]
    InvalidMonth(String),

    #[error("Verification failed: {0}")]
    Verify(String),

    #[error("Report error: {0}")]
    Report(String),
}

impl WipError {
    /// Wrap a workbook backend failure (read, write, sheet creation).
    pub fn xlsx(err: impl std::fmt::Debug) -> Self {
        WipError::Xlsx(format!("{:?}", err))
    }
}
