use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub input_dir: PathBuf,            // where the monthly exports live
    pub current_month: Option<String>, // "YYYY-MM"; None = keep every file
    pub rayon_threads: Option<usize>,
    pub goals: GoalsConfig,
    pub outcomes: OutcomesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GoalsConfig {
    pub prefix: String,
    pub suffix: String,
    pub player_column: String,
    pub goals_column: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutcomesConfig {
    pub workbook: Option<String>, // file name inside input_dir
    pub indicator_column: String,
    pub tracked_column: Option<String>,
    pub parity_column: Option<String>,
    pub sheets: Vec<SheetSelection>,
}

/// One sheet to read from the outcome workbook.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SheetSelection {
    pub name: String,    // also becomes the month label
    pub columns: String, // e.g. "A, B, E" or "A:C, AR"
    pub rows: usize,     // data rows below the header
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input_data"),
            current_month: None,
            rayon_threads: None,
            goals: GoalsConfig::default(),
            outcomes: OutcomesConfig::default(),
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            prefix: "Kicken".to_string(),
            suffix: ".xlsx".to_string(),
            player_column: "Name".to_string(),
            goals_column: "Tore".to_string(),
        }
    }
}

impl Default for OutcomesConfig {
    fn default() -> Self {
        Self {
            workbook: Some("Tore und Siege kicken.xlsx".to_string()),
            indicator_column: "Alt".to_string(),
            tracked_column: None,
            parity_column: None,
            sheets: Vec::new(),
        }
    }
}

impl Config {
    /// Missing file means defaults; a file that is there but does not parse
    /// is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).map_err(|source| PipelineError::Config {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// First day of the configured current month. Unset means no cutoff.
    pub fn current_month(&self) -> Result<Option<NaiveDate>> {
        self.current_month.as_deref().map(parse_year_month).transpose()
    }

    pub fn outcome_workbook_path(&self) -> Option<PathBuf> {
        self.outcomes.workbook.as_ref().map(|w| self.input_dir.join(w))
    }
}

/// "2022-11" -> 2022-11-01.
pub fn parse_year_month(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").map_err(|_| {
        PipelineError::InvalidMonth {
            value: s.to_string(),
        }
    })
}
