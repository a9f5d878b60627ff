use std::sync::OnceLock;
use std::time::Instant;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::loader;
use crate::model::{Table, Value};
use crate::verbose::secs;

pub const DATE_COLUMN: &str = "date";
pub const MONTH_COLUMN: &str = "month";
pub const SOURCE_COLUMN: &str = "source";

fn file_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<prefix>\S+)\s+(?P<month>.+?)\s+(?P<year>\d{4})\.(?P<ext>[A-Za-z0-9]+)$")
            .expect("file name pattern is valid")
    })
}

/// "Kicken October 2022.xlsx" -> 2022-10-01.
pub fn parse_file_month(file_name: &str) -> Result<NaiveDate> {
    let fail = || PipelineError::FileNameFormat {
        file_name: file_name.to_string(),
    };
    let caps = file_name_re().captures(file_name.trim()).ok_or_else(fail)?;
    let month = caps.name("month").ok_or_else(fail)?.as_str().trim();
    let year = caps.name("year").ok_or_else(fail)?.as_str();
    // %B also takes the abbreviated name ("Oct")
    NaiveDate::parse_from_str(&format!("1 {} {}", month, year), "%d %B %Y").map_err(|_| fail())
}

/// 2022-10-01 -> "October-2022".
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B-%Y").to_string()
}

/// Stamps every row with the month parsed from `file_name`.
pub fn tag_month(table: &Table, file_name: &str) -> Result<Table> {
    let date = parse_file_month(file_name)?;
    let label = month_label(date);
    let n = table.len();

    let mut out = table.clone();
    out.set_column(DATE_COLUMN, vec![Value::Date(date); n]);
    out.set_column(MONTH_COLUMN, vec![Value::Text(label); n]);
    out.set_column(SOURCE_COLUMN, vec![Value::Text(file_name.to_string()); n]);
    Ok(out)
}

/// Concatenates tagged monthly tables in the order given.
pub fn merge(tables: Vec<Table>) -> Table {
    Table::concat("goals", tables)
}

/// No files yet: the key columns, no rows.
fn empty_goal_table(cfg: &Config) -> Table {
    let columns = [
        cfg.goals.player_column.as_str(),
        cfg.goals.goals_column.as_str(),
        DATE_COLUMN,
        MONTH_COLUMN,
        SOURCE_COLUMN,
    ];
    Table::new("goals", columns.iter().map(|c| c.to_string()).collect())
}

/// Discover, read, tag and merge the monthly goal exports.
pub fn load_goal_table(cfg: &Config) -> Result<Table> {
    let t0 = Instant::now();
    let cutoff = cfg.current_month()?;
    let paths = loader::discover(&cfg.input_dir, &cfg.goals.prefix, &cfg.goals.suffix)?;

    // Parse names before reading so a bad name fails fast.
    let mut selected = Vec::with_capacity(paths.len());
    for p in paths {
        let name = loader::file_name(&p);
        let month = parse_file_month(&name)?;
        if let Some(cutoff) = cutoff.filter(|&c| month > c) {
            vprintln!("months: skipping {} (after current month {})", name, month_label(cutoff));
            continue;
        }
        selected.push(p);
    }

    let raw = loader::read_tables(&selected)?;
    let mut tagged = Vec::with_capacity(raw.len());
    for (p, t) in selected.iter().zip(raw) {
        tagged.push(tag_month(&t, &loader::file_name(p))?);
    }
    let merged = if tagged.is_empty() {
        empty_goal_table(cfg)
    } else {
        merge(tagged)
    };

    vprintln!("months: merged {} file(s) -> {} rows in {:.3}s", selected.len(), merged.len(), secs(t0));
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn parses_month_and_year_from_file_name() {
        assert_eq!(parse_file_month("Kicken October 2022.xlsx").unwrap(), ymd(2022, 10));
        assert_eq!(parse_file_month("Kicken  march 2023.xlsx").unwrap(), ymd(2023, 3));
        assert_eq!(parse_file_month("Kicken Nov 2022.xls").unwrap(), ymd(2022, 11));
    }

    #[test]
    fn label_round_trips() {
        for name in ["Kicken January 2023.xlsx", "Kicken December 2022.xlsx"] {
            let date = parse_file_month(name).unwrap();
            let label = month_label(date);
            let again = NaiveDate::parse_from_str(&format!("1-{}", label), "%d-%B-%Y").unwrap();
            assert_eq!(again, date);
        }
        assert_eq!(month_label(ymd(2022, 10)), "October-2022");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "Kicken.xlsx",
            "Kicken October.xlsx",
            "Kicken October 22x.xlsx",
            "Kicken Oktobre 2022.xlsx",
            "Kicken October 2022",
        ] {
            assert!(
                matches!(parse_file_month(bad), Err(PipelineError::FileNameFormat { .. })),
                "{bad} should fail"
            );
        }
    }

    #[test]
    fn tagging_stamps_every_row() {
        let mut t = Table::new("raw", vec!["Name".into(), "Tore".into()]);
        t.push_row(vec!["Ana".into(), Value::Int(2)]);
        t.push_row(vec!["Ben".into(), Value::Int(0)]);

        let tagged = tag_month(&t, "Kicken October 2022.xlsx").unwrap();
        assert_eq!(tagged.columns(), &["Name", "Tore", "date", "month", "source"]);
        for i in 0..tagged.len() {
            assert_eq!(tagged.get(i, MONTH_COLUMN), &Value::from("October-2022"));
            assert_eq!(tagged.get(i, DATE_COLUMN), &Value::Date(ymd(2022, 10)));
        }
        // input untouched
        assert_eq!(t.columns().len(), 2);
    }

    #[test]
    fn merge_keeps_row_counts_and_order() {
        let mut a = Table::new("a", vec!["Name".into()]);
        a.push_row(vec!["Ana".into()]);
        a.push_row(vec!["Ben".into()]);
        let mut b = Table::new("b", vec!["Name".into()]);
        b.push_row(vec!["Cem".into()]);

        let merged = merge(vec![
            tag_month(&a, "Kicken October 2022.xlsx").unwrap(),
            tag_month(&b, "Kicken November 2022.xlsx").unwrap(),
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(2, MONTH_COLUMN), &Value::from("November-2022"));
        assert_eq!(merged.get(0, SOURCE_COLUMN), &Value::from("Kicken October 2022.xlsx"));
    }
}
