use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("workbook not found: {}", path.display())]
    WorkbookNotFound { path: PathBuf },

    #[error("file name '{file_name}' does not match '<prefix> <Month> <Year>.<ext>'")]
    FileNameFormat { file_name: String },

    #[error("sheet '{sheet}' not found in {}", path.display())]
    SheetNotFound { sheet: String, path: PathBuf },

    #[error("column '{column}' not found in {table}")]
    ColumnNotFound { column: String, table: String },

    #[error("invalid column selector '{selector}'")]
    InvalidColumnSelector { selector: String },

    #[error("cannot parse config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid month '{value}' (expected YYYY-MM)")]
    InvalidMonth { value: String },

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Missing input directory or workbook.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PipelineError::DirectoryNotFound { .. } | PipelineError::WorkbookNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
