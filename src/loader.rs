use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use rayon::prelude::*;

use crate::error::{PipelineError, Result};
use crate::model::{Table, Value};
use crate::verbose::secs;

pub type Workbook = Sheets<BufReader<File>>;

/// Files in `dir` named `<prefix>...<suffix>`, sorted by file name.
pub fn discover(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        // Excel lock files ("~$Kicken ...") fail the prefix test.
        if name.starts_with(prefix) && name.ends_with(suffix) {
            paths.push(entry.path());
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    vprintln!("loader: {} file(s) matching '{}*{}' in {}", paths.len(), prefix, suffix, dir.display());
    Ok(paths)
}

pub fn open_workbook(path: &Path) -> Result<Workbook> {
    if !path.is_file() {
        return Err(PipelineError::WorkbookNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(open_workbook_auto(path)?)
}

/// First sheet of the workbook as a table: header row, then every non-blank row.
pub fn read_table(path: &Path) -> Result<Table> {
    let t0 = Instant::now();
    let mut wb = open_workbook(path)?;
    let label = file_name(path);

    let Some(first) = wb.sheet_names().first().cloned() else {
        return Ok(Table::new(label, Vec::new()));
    };
    let range = wb.worksheet_range(&first)?;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => header_names(header.iter()),
        None => Vec::new(),
    };
    let mut table = Table::new(label, columns);
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(Value::is_null) {
            continue;
        }
        table.push_row(values);
    }

    vprintln!("loader: {} -> {} rows x {} cols in {:.3}s",
        table.label(), table.len(), table.columns().len(), secs(t0));
    Ok(table)
}

/// Reads every workbook on the rayon pool; output order follows `paths`.
pub fn read_tables(paths: &[PathBuf]) -> Result<Vec<Table>> {
    paths.par_iter().map(|p| read_table(p)).collect()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Header cells become column names; blanks get `Unnamed: <index>`.
pub(crate) fn header_names<'a>(cells: impl Iterator<Item = &'a Data>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(i, c)| match cell_value(c) {
            Value::Null => format!("Unnamed: {}", i),
            v => v.to_string().trim().to_string(),
        })
        .collect()
}

pub(crate) fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::Date(d.date()))
            .unwrap_or(Value::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Absolute (row, col) lookup; cells outside the used range are empty.
pub(crate) fn cell_at(range: &Range<Data>, row: u32, col: u32) -> Value {
    range
        .get_value((row, col))
        .map(cell_value)
        .unwrap_or(Value::Null)
}
