use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::config::GoalsConfig;
use crate::error::Result;
use crate::model::{Table, Value};
use crate::months::{DATE_COLUMN, MONTH_COLUMN};
use crate::outcomes::{Winner, GAMES_COLUMN, WINNER_COLUMN};

pub const OVERALL: &str = "Overall";
pub const RANK_COLUMN: &str = "goal_rank";
pub const TOTAL_GOALS_COLUMN: &str = "total_goals";

/// Games per winner category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Distribution {
    pub games: u64,
    pub side_a: u64,
    pub side_b: u64,
    pub draws: u64,
}

impl Distribution {
    pub fn add(&mut self, winner: Winner, games: u64) {
        self.games += games;
        match winner {
            Winner::SideA => self.side_a += games,
            Winner::SideB => self.side_b += games,
            Winner::Draw => self.draws += games,
        }
    }

    pub fn get(&self, winner: Winner) -> u64 {
        match winner {
            Winner::SideA => self.side_a,
            Winner::SideB => self.side_b,
            Winner::Draw => self.draws,
        }
    }

    /// (side A, side B, draw) in percent; zeros for an empty view.
    pub fn percentages(&self) -> (f64, f64, f64) {
        if self.games == 0 {
            return (0.0, 0.0, 0.0);
        }
        let g = self.games as f64;
        (
            100.0 * self.side_a as f64 / g,
            100.0 * self.side_b as f64 / g,
            100.0 * self.draws as f64 / g,
        )
    }

    /// Pie-chart slices in legend order.
    pub fn slices(&self) -> Vec<(Winner, u64)> {
        Winner::ALL.into_iter().map(|w| (w, self.get(w))).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitKind {
    Overall,
    EqualNumbers,
    UnequalNumbers,
    WithTracked,
    WithoutTracked,
}

impl SplitKind {
    pub fn label(self) -> &'static str {
        match self {
            SplitKind::Overall => "overall",
            SplitKind::EqualNumbers => "equal numbers",
            SplitKind::UnequalNumbers => "unequal numbers",
            SplitKind::WithTracked => "with tracked player",
            SplitKind::WithoutTracked => "without tracked player",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Split {
    pub kind: SplitKind,
    pub table: Table,
    pub distribution: Distribution,
}

/// Rows with and without a value in the tracked participant's column.
#[derive(Clone, Debug)]
pub struct Presence {
    pub present: Table,
    pub absent: Table,
}

/// Rows with a parity flag, split by its value. Unflagged rows are dropped.
#[derive(Clone, Debug)]
pub struct Parity {
    pub equal: Table,
    pub unequal: Table,
}

/// Ranks players by total goals and sorts rows by (rank, date).
/// Appends `goal_rank` and `total_goals`.
pub fn overall_goals(table: &Table, cols: &GoalsConfig) -> Result<Table> {
    let p = table.require(&cols.player_column)?;
    let g = table.require(&cols.goals_column)?;
    let d = table.column_index(DATE_COLUMN);

    // totals, in first-encounter order
    let mut totals: Vec<(String, i64)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for row in table.rows() {
        let Some(name) = row[p].key() else { continue };
        let i = *slot.entry(name.clone()).or_insert_with(|| {
            totals.push((name, 0));
            totals.len() - 1
        });
        totals[i].1 += row[g].as_i64().unwrap_or(0);
    }

    let total_of: HashMap<&str, i64> = totals.iter().map(|(n, t)| (n.as_str(), *t)).collect();
    let mut ranked: Vec<&(String, i64)> = totals.iter().collect();
    ranked.sort_by_key(|(_, t)| Reverse(*t));
    let rank_of: HashMap<&str, usize> = ranked
        .iter()
        .enumerate()
        .map(|(rank, (n, _))| (n.as_str(), rank))
        .collect();

    let rows = table.rows();
    let rank = |i: usize| rows[i][p].key().and_then(|k| rank_of.get(k.as_str()).copied());
    let date = |i: usize| d.and_then(|d| rows[i][d].as_date());

    let mut order: Vec<usize> = (0..table.len()).collect();
    order.sort_by(|&a, &b| none_last(rank(a), rank(b)).then_with(|| none_last(date(a), date(b))));

    let mut out = table.take_rows(&order);
    let mut ranks = Vec::with_capacity(out.len());
    let mut goals = Vec::with_capacity(out.len());
    for row in out.rows() {
        let key = row[p].key();
        let key = key.as_deref();
        ranks.push(Value::from(key.and_then(|k| rank_of.get(k)).map(|&r| r as i64)));
        goals.push(Value::from(key.and_then(|k| total_of.get(k)).copied()));
    }
    out.set_column(RANK_COLUMN, ranks);
    out.set_column(TOTAL_GOALS_COLUMN, goals);
    Ok(out)
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Months of a view, in first-appearance order.
pub fn distinct_months(table: &Table) -> Vec<String> {
    let Some(m) = table.column_index(MONTH_COLUMN) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    table
        .rows()
        .iter()
        .filter_map(|r| r[m].key())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

/// Appends one zero-goal row for every player missing from one of `months`,
/// so each player has a row in every month of the view.
pub fn backfill_missing_months(table: &Table, cols: &GoalsConfig, months: &[String]) -> Result<Table> {
    let p = table.require(&cols.player_column)?;
    let g = table.require(&cols.goals_column)?;
    let m = table.require(MONTH_COLUMN)?;

    let mut players: Vec<(Value, HashSet<String>)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for row in table.rows() {
        let Some(name) = row[p].key() else { continue };
        let i = *slot.entry(name).or_insert_with(|| {
            players.push((row[p].clone(), HashSet::new()));
            players.len() - 1
        });
        if let Some(month) = row[m].key() {
            players[i].1.insert(month);
        }
    }

    let width = table.columns().len();
    let mut out = table.clone();
    for (player, seen) in &players {
        for month in months.iter().filter(|mo| !seen.contains(*mo)) {
            let mut row = vec![Value::Null; width];
            row[p] = player.clone();
            row[g] = Value::Int(0);
            row[m] = Value::Text(month.clone());
            out.push_row(row);
        }
    }
    Ok(out)
}

/// Rows whose month is selected; a selection containing "Overall" keeps all.
pub fn slice_months<S: AsRef<str>>(table: &Table, selection: &[S]) -> Result<Table> {
    if selection.iter().any(|s| s.as_ref() == OVERALL) {
        return Ok(table.clone());
    }
    let wanted: HashSet<&str> = selection.iter().map(|s| s.as_ref()).collect();
    table.filter(MONTH_COLUMN, |v| v.as_text().is_some_and(|m| wanted.contains(m)))
}

pub fn partition_by_presence(table: &Table, column: &str) -> Result<Presence> {
    Ok(Presence {
        present: table.filter(column, |v| !v.is_null())?,
        absent: table.filter(column, Value::is_null)?,
    })
}

pub fn partition_by_parity(table: &Table, column: &str) -> Result<Parity> {
    Ok(Parity {
        equal: table.filter(column, |v| !v.is_null() && v.is_truthy())?,
        unequal: table.filter(column, |v| !v.is_null() && !v.is_truthy())?,
    })
}

/// Sum of `games` per `winner` category.
pub fn win_distribution(table: &Table) -> Result<Distribution> {
    let w = table.require(WINNER_COLUMN)?;
    let g = table.require(GAMES_COLUMN)?;
    let mut dist = Distribution::default();
    for row in table.rows() {
        let Some(winner) = row[w].as_text().and_then(Winner::from_label) else { continue };
        let games = row[g].as_i64().unwrap_or(0).max(0) as u64;
        dist.add(winner, games);
    }
    Ok(dist)
}

/// Overall, then parity and presence splits for whichever columns are set.
pub fn conditional_splits(
    table: &Table,
    tracked_column: Option<&str>,
    parity_column: Option<&str>,
) -> Result<Vec<Split>> {
    let mut parts = vec![(SplitKind::Overall, table.clone())];
    if let Some(col) = parity_column {
        let Parity { equal, unequal } = partition_by_parity(table, col)?;
        parts.push((SplitKind::EqualNumbers, equal));
        parts.push((SplitKind::UnequalNumbers, unequal));
    }
    if let Some(col) = tracked_column {
        let Presence { present, absent } = partition_by_presence(table, col)?;
        parts.push((SplitKind::WithTracked, present));
        parts.push((SplitKind::WithoutTracked, absent));
    }

    parts
        .into_iter()
        .map(|(kind, table)| {
            let distribution = win_distribution(&table)?;
            Ok(Split { kind, table, distribution })
        })
        .collect()
}

/// Slice, backfill against the slice's months, then rank: the table behind
/// the stacked goals chart.
pub fn goal_view<S: AsRef<str>>(table: &Table, cols: &GoalsConfig, selection: &[S]) -> Result<Table> {
    let sliced = slice_months(table, selection)?;
    let months = distinct_months(&sliced);
    let filled = backfill_missing_months(&sliced, cols, &months)?;
    overall_goals(&filled, cols)
}

pub fn write_csv(table: &Table, out_path: &Path) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(out_path)?);
    let header: Vec<String> = table.columns().iter().map(|c| escape_csv(c)).collect();
    writeln!(f, "{}", header.join(","))?;
    for row in table.rows() {
        let fields: Vec<String> = row.iter().map(|v| escape_csv(&v.to_string())).collect();
        writeln!(f, "{}", fields.join(","))?;
    }
    f.flush()
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cols() -> GoalsConfig {
        GoalsConfig::default()
    }

    fn date(m: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(2022, m, 1).unwrap())
    }

    fn goals_table(rows: &[(&str, i64, &str, u32)]) -> Table {
        let mut t = Table::new(
            "goals",
            vec!["Name".into(), "Tore".into(), "date".into(), "month".into()],
        );
        for &(name, goals, month, m) in rows {
            t.push_row(vec![name.into(), Value::Int(goals), date(m), month.into()]);
        }
        t
    }

    fn sample() -> Table {
        goals_table(&[
            ("Ana", 2, "October-2022", 10),
            ("Ana", 1, "November-2022", 11),
            ("Ben", 0, "October-2022", 10),
        ])
    }

    fn outcome_table(rows: &[(&str, &str, Value, Value)]) -> Table {
        let mut t = Table::new(
            "outcomes",
            vec!["month".into(), "winner".into(), "games".into(), "Jonas".into(), "Gleich".into()],
        );
        for (month, winner, tracked, parity) in rows {
            t.push_row(vec![
                (*month).into(),
                (*winner).into(),
                Value::Int(1),
                tracked.clone(),
                parity.clone(),
            ]);
        }
        t
    }

    #[test]
    fn backfill_adds_missing_player_month() {
        let months = vec!["October-2022".to_string(), "November-2022".to_string()];
        let filled = backfill_missing_months(&sample(), &cols(), &months).unwrap();
        assert_eq!(filled.len(), 4);
        assert_eq!(filled.get(3, "Name"), &Value::from("Ben"));
        assert_eq!(filled.get(3, "Tore"), &Value::Int(0));
        assert_eq!(filled.get(3, "month"), &Value::from("November-2022"));
        assert!(filled.get(3, "date").is_null());
        // input rows keep their place
        assert_eq!(filled.rows()[..3], sample().rows()[..]);
    }

    #[test]
    fn backfill_is_idempotent_once_complete() {
        let months = distinct_months(&sample());
        let once = backfill_missing_months(&sample(), &cols(), &months).unwrap();
        let twice = backfill_missing_months(&once, &cols(), &months).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn ranking_orders_by_total_goals() {
        let months = distinct_months(&sample());
        let filled = backfill_missing_months(&sample(), &cols(), &months).unwrap();
        let ranked = overall_goals(&filled, &cols()).unwrap();

        let names: Vec<String> = (0..ranked.len()).map(|i| ranked.get(i, "Name").to_string()).collect();
        assert_eq!(names, vec!["Ana", "Ana", "Ben", "Ben"]);
        assert_eq!(ranked.get(0, TOTAL_GOALS_COLUMN), &Value::Int(3));
        assert_eq!(ranked.get(0, RANK_COLUMN), &Value::Int(0));
        assert_eq!(ranked.get(2, TOTAL_GOALS_COLUMN), &Value::Int(0));
        assert_eq!(ranked.get(2, RANK_COLUMN), &Value::Int(1));
        // within a player rows are by date; the backfilled row has no date
        assert_eq!(ranked.get(0, "month"), &Value::from("October-2022"));
        assert!(ranked.get(3, "date").is_null());
    }

    #[test]
    fn ranking_ties_keep_first_encounter_order() {
        let t = goals_table(&[
            ("Cem", 1, "October-2022", 10),
            ("Dora", 1, "October-2022", 10),
            ("Ana", 4, "October-2022", 10),
        ]);
        let ranked = overall_goals(&t, &cols()).unwrap();
        let names: Vec<String> = (0..3).map(|i| ranked.get(i, "Name").to_string()).collect();
        assert_eq!(names, vec!["Ana", "Cem", "Dora"]);
    }

    #[test]
    fn totals_match_goal_sums() {
        let t = goals_table(&[
            ("Ana", 1, "November-2022", 11),
            ("Ben", 3, "October-2022", 10),
            ("Ana", 2, "October-2022", 10),
            ("Ben", 1, "November-2022", 11),
            ("Cem", 0, "October-2022", 10),
        ]);
        let ranked = overall_goals(&t, &cols()).unwrap();
        let mut last_total = i64::MAX;
        for i in 0..ranked.len() {
            let name = ranked.get(i, "Name").to_string();
            let sum: i64 = (0..t.len())
                .filter(|&j| t.get(j, "Name").to_string() == name)
                .map(|j| t.get(j, "Tore").as_i64().unwrap())
                .sum();
            let total = ranked.get(i, TOTAL_GOALS_COLUMN).as_i64().unwrap();
            assert_eq!(total, sum);
            assert!(total <= last_total);
            last_total = total;
        }
        // Ben (4) before Ana (3); Ana's October row before November
        assert_eq!(ranked.get(0, "Name"), &Value::from("Ben"));
        assert_eq!(ranked.get(2, "month"), &Value::from("October-2022"));
    }

    #[test]
    fn overall_slice_is_identity() {
        let t = sample();
        assert_eq!(slice_months(&t, &[OVERALL, "October-2022"]).unwrap(), t);
    }

    #[test]
    fn slice_by_month() {
        let t = sample();
        assert_eq!(slice_months(&t, &["November-2022"]).unwrap().len(), 1);
        assert!(slice_months::<&str>(&t, &[]).unwrap().is_empty());
        assert!(slice_months(&t, &["March-2021"]).unwrap().is_empty());
    }

    #[test]
    fn goal_view_backfills_within_slice() {
        let t = sample();
        let view = goal_view(&t, &cols(), &["October-2022"]).unwrap();
        // both players already have October rows; nothing synthesized
        assert_eq!(view.len(), 2);
        let view = goal_view(&t, &cols(), &[OVERALL]).unwrap();
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn presence_and_parity_partitions() {
        let t = outcome_table(&[
            ("October-2022", "side A", "x".into(), Value::Int(1)),
            ("October-2022", "side B", Value::Null, Value::Int(0)),
            ("October-2022", "draw", "x".into(), Value::Null),
            ("November-2022", "side A", Value::Null, "ja".into()),
        ]);
        let presence = partition_by_presence(&t, "Jonas").unwrap();
        assert_eq!(presence.present.len(), 2);
        assert_eq!(presence.absent.len(), 2);

        let parity = partition_by_parity(&t, "Gleich").unwrap();
        assert_eq!(parity.equal.len(), 2);
        assert_eq!(parity.unequal.len(), 1);
    }

    #[test]
    fn splits_carry_distributions() {
        let t = outcome_table(&[
            ("October-2022", "side A", "x".into(), Value::Int(1)),
            ("October-2022", "side B", Value::Null, Value::Int(0)),
            ("October-2022", "draw", "x".into(), Value::Null),
            ("November-2022", "side A", Value::Null, Value::Int(1)),
        ]);
        let splits = conditional_splits(&t, Some("Jonas"), Some("Gleich")).unwrap();
        let kinds: Vec<SplitKind> = splits.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SplitKind::Overall,
                SplitKind::EqualNumbers,
                SplitKind::UnequalNumbers,
                SplitKind::WithTracked,
                SplitKind::WithoutTracked,
            ]
        );
        assert_eq!(
            splits[0].distribution,
            Distribution { games: 4, side_a: 2, side_b: 1, draws: 1 }
        );
        assert_eq!(splits[1].distribution.side_a, 2);
        assert_eq!(splits[3].distribution.slices(), vec![
            (Winner::SideA, 1),
            (Winner::SideB, 0),
            (Winner::Draw, 1),
        ]);

        let only_overall = conditional_splits(&t, None, None).unwrap();
        assert_eq!(only_overall.len(), 1);
    }

    #[test]
    fn percentages_of_empty_view() {
        assert_eq!(Distribution::default().percentages(), (0.0, 0.0, 0.0));
        let d = Distribution { games: 4, side_a: 2, side_b: 1, draws: 1 };
        assert_eq!(d.percentages(), (50.0, 25.0, 25.0));
    }

    #[test]
    fn csv_quotes_awkward_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("goals.csv");
        let mut t = Table::new("t", vec!["Name".into(), "note".into()]);
        t.push_row(vec!["Ana".into(), "late, \"again\"".into()]);
        t.push_row(vec!["Ben".into(), Value::Null]);
        write_csv(&t, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Name,note\nAna,\"late, \"\"again\"\"\"\nBen,\n");
    }
}
