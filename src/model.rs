use std::fmt;

use chrono::NaiveDate;

use crate::error::{PipelineError, Result};

/// One spreadsheet cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

impl Value {
    /// Empty cells and NaN both count as missing.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Integer view of a cell: ints, integral floats and numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| f as i64)
                })
            }
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Flag semantics for yes/no columns typed by hand into a sheet.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => !f.is_nan() && *f != 0.0,
            Value::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "x" | "true" | "yes" | "y" | "ja" | "j"
            ),
            Value::Date(_) => true,
        }
    }

    /// Grouping key: the displayed form of a non-null cell.
    pub fn key(&self) -> Option<String> {
        if self.is_null() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => Ok(()),
            Value::Float(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A rectangular table with named columns. Every transform in this crate
/// takes `&Table` and hands back a new one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    label: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(label: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            label: label.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, padded with nulls (or cut) to the table width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::ColumnNotFound {
                column: name.to_string(),
                table: self.label.clone(),
            })
    }

    /// Cell lookup by column name; `Null` for unknown columns.
    pub fn get(&self, row: usize, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        match (self.rows.get(row), self.column_index(column)) {
            (Some(r), Some(c)) => &r[c],
            _ => &NULL,
        }
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replaces the named column, or appends it when absent.
    /// `values` must hold one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let idx = match self.column_index(name) {
            Some(i) => i,
            None => {
                self.columns.push(name.to_string());
                for r in &mut self.rows {
                    r.push(Value::Null);
                }
                self.columns.len() - 1
            }
        };
        for (r, v) in self.rows.iter_mut().zip(values) {
            r[idx] = v;
        }
    }

    /// New table holding the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            label: self.label.clone(),
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Keeps rows whose cell in `column` satisfies `pred`.
    pub fn filter(&self, column: &str, pred: impl Fn(&Value) -> bool) -> Result<Table> {
        let idx = self.require(column)?;
        let keep: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| pred(&r[idx]))
            .map(|(i, _)| i)
            .collect();
        Ok(self.take_rows(&keep))
    }

    /// Row-wise concatenation. Columns are the union of all inputs in
    /// first-appearance order; cells a source table lacks become `Null`.
    pub fn concat(label: impl Into<String>, tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::new(label, Vec::new());
        for t in tables {
            let mapping: Vec<usize> = t
                .columns
                .iter()
                .map(|c| match out.column_index(c) {
                    Some(i) => i,
                    None => {
                        out.columns.push(c.clone());
                        for r in &mut out.rows {
                            r.push(Value::Null);
                        }
                        out.columns.len() - 1
                    }
                })
                .collect();
            for row in t.rows {
                let mut dst = vec![Value::Null; out.columns.len()];
                for (v, &i) in row.into_iter().zip(&mapping) {
                    dst[i] = v;
                }
                out.rows.push(dst);
            }
        }
        out
    }
}
