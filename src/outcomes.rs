use std::path::Path;
use std::time::Instant;

use calamine::Reader;

use crate::config::SheetSelection;
use crate::error::{PipelineError, Result};
use crate::loader::{self, Workbook};
use crate::model::{Table, Value};
use crate::months::MONTH_COLUMN;
use crate::verbose::secs;

pub const SIDE_A_COLUMN: &str = "side_a_count";
pub const SIDE_B_COLUMN: &str = "side_b_count";
pub const SEQUENCE_COLUMN: &str = "sequence";
pub const GAMES_COLUMN: &str = "games";
pub const WINNER_COLUMN: &str = "winner";

/// Who took the point in one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Winner {
    SideA,
    SideB,
    Draw,
}

impl Winner {
    pub const ALL: [Winner; 3] = [Winner::SideA, Winner::SideB, Winner::Draw];

    /// +1 side A, -1 side B, anything else (including blank) a draw.
    pub fn from_indicator(indicator: Option<i64>) -> Self {
        match indicator {
            Some(1) => Winner::SideA,
            Some(-1) => Winner::SideB,
            _ => Winner::Draw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Winner::SideA => "side A",
            Winner::SideB => "side B",
            Winner::Draw => "draw",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.label() == s)
    }

    /// Legend colour for charts.
    pub fn color(self) -> &'static str {
        match self {
            Winner::SideA => "#0000FF",
            Winner::SideB => "#DCDCDC",
            Winner::Draw => "#707070",
        }
    }
}

/// Running state of one month's scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub side_a: u32,
    pub side_b: u32,
    pub sequence: u32,
}

impl Tally {
    /// State after this row's own event. A counter the row does not touch
    /// keeps its previous value.
    pub fn apply(self, indicator: Option<i64>) -> Tally {
        let winner = Winner::from_indicator(indicator);
        Tally {
            side_a: self.side_a + u32::from(winner == Winner::SideA),
            side_b: self.side_b + u32::from(winner == Winner::SideB),
            sequence: self.sequence + 1,
        }
    }
}

/// One forward pass over a month's indicators, starting from zero.
pub fn tally(indicators: &[Option<i64>]) -> Vec<Tally> {
    indicators
        .iter()
        .scan(Tally::default(), |state, &ind| {
            *state = state.apply(ind);
            Some(*state)
        })
        .collect()
}

/// "A, B, E" / "A:C, AR" -> zero-based column indices, in selector order.
pub fn parse_column_selector(selector: &str) -> Result<Vec<u32>> {
    let fail = || PipelineError::InvalidColumnSelector {
        selector: selector.to_string(),
    };

    let mut out = Vec::new();
    for part in selector.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(fail());
        }
        match part.split_once(':') {
            Some((from, to)) => {
                let from = column_index(from.trim()).ok_or_else(fail)?;
                let to = column_index(to.trim()).ok_or_else(fail)?;
                if from > to {
                    return Err(fail());
                }
                out.extend(from..=to);
            }
            None => out.push(column_index(part).ok_or_else(fail)?),
        }
    }
    Ok(out)
}

/// "A" -> 0, "Z" -> 25, "AA" -> 26.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(n - 1)
}

/// 0 -> "A", 43 -> "AR".
pub fn column_letters(mut idx: u32) -> String {
    let mut s = Vec::new();
    loop {
        s.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    s.iter().rev().collect()
}

/// Reads the selected columns and at most `rows` data rows of one sheet,
/// tagged with the sheet name as month.
pub fn read_sheet(wb: &mut Workbook, path: &Path, sel: &SheetSelection) -> Result<Table> {
    if !wb.sheet_names().iter().any(|s| s == &sel.name) {
        return Err(PipelineError::SheetNotFound {
            sheet: sel.name.clone(),
            path: path.to_path_buf(),
        });
    }
    let cols = parse_column_selector(&sel.columns)?;
    let range = wb.worksheet_range(&sel.name)?;

    let missing = |c: u32| PipelineError::ColumnNotFound {
        column: column_letters(c),
        table: sel.name.clone(),
    };
    let (Some((r0, c0)), Some((r1, c1))) = (range.start(), range.end()) else {
        return Err(missing(cols[0]));
    };
    if let Some(&c) = cols.iter().find(|&&c| c < c0 || c > c1) {
        return Err(missing(c));
    }

    let header: Vec<String> = cols
        .iter()
        .map(|&c| match loader::cell_at(&range, r0, c) {
            Value::Null => format!("Unnamed: {}", c),
            v => v.to_string().trim().to_string(),
        })
        .collect();
    let mut table = Table::new(sel.name.clone(), header);

    let last = r1.min(r0.saturating_add(u32::try_from(sel.rows).unwrap_or(u32::MAX)));
    for r in (r0 + 1)..=last {
        let row: Vec<Value> = cols.iter().map(|&c| loader::cell_at(&range, r, c)).collect();
        if row.iter().all(Value::is_null) {
            continue;
        }
        table.push_row(row);
    }

    let n = table.len();
    table.set_column(MONTH_COLUMN, vec![Value::Text(sel.name.clone()); n]);
    Ok(table)
}

/// Appends the per-month counters and sequence index to one sheet's table.
pub fn with_tally(table: &Table, indicator_column: &str) -> Result<Table> {
    let indicators: Vec<Option<i64>> = table
        .column(indicator_column)?
        .into_iter()
        .map(Value::as_i64)
        .collect();
    let tallies = tally(&indicators);

    let mut out = table.clone();
    out.set_column(SIDE_A_COLUMN, tallies.iter().map(|t| Value::Int(t.side_a.into())).collect());
    out.set_column(SIDE_B_COLUMN, tallies.iter().map(|t| Value::Int(t.side_b.into())).collect());
    out.set_column(SEQUENCE_COLUMN, tallies.iter().map(|t| Value::Int(t.sequence.into())).collect());
    Ok(out)
}

/// Appends `games = 1` and the `winner` label to every row.
pub fn with_winner(table: &Table, indicator_column: &str) -> Result<Table> {
    let winners: Vec<Value> = table
        .column(indicator_column)?
        .into_iter()
        .map(|v| Value::from(Winner::from_indicator(v.as_i64()).label()))
        .collect();

    let mut out = table.clone();
    out.set_column(GAMES_COLUMN, vec![Value::Int(1); table.len()]);
    out.set_column(WINNER_COLUMN, winners);
    Ok(out)
}

/// Reads every selected sheet in order and builds the outcome table.
pub fn extract_outcomes(
    path: &Path,
    selections: &[SheetSelection],
    indicator_column: &str,
) -> Result<Table> {
    let t0 = Instant::now();
    let mut wb = loader::open_workbook(path)?;

    // Ordered (sheet, table) pairs; month order is the configured order.
    let mut months: Vec<(String, Table)> = Vec::with_capacity(selections.len());
    for sel in selections {
        let sheet = read_sheet(&mut wb, path, sel)?;
        let sheet = with_tally(&sheet, indicator_column)?;
        vprintln!("outcomes: {} -> {} games", sel.name, sheet.len());
        months.push((sel.name.clone(), sheet));
    }

    let merged = Table::concat("outcomes", months.into_iter().map(|(_, t)| t));
    let out = if merged.columns().is_empty() {
        merged
    } else {
        with_winner(&merged, indicator_column)?
    };

    vprintln!("outcomes: {} sheet(s) -> {} rows in {:.3}s", selections.len(), out.len(), secs(t0));
    Ok(out)
}
