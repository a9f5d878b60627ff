use std::time::Instant;

use crate::aggregate::{self, Distribution, Split, OVERALL};
use crate::config::Config;
use crate::error::Result;
use crate::model::Table;
use crate::months;
use crate::outcomes;
use crate::verbose::secs;

/// Both tables, loaded once at start-up. Queries hand back fresh tables.
#[derive(Clone, Debug)]
pub struct Dataset {
    cfg: Config,
    goals: Table,
    outcomes: Table,
}

impl Dataset {
    pub fn load(cfg: &Config) -> Result<Self> {
        let t0 = Instant::now();
        let goals = months::load_goal_table(cfg)?;

        let outcomes = match cfg.outcome_workbook_path() {
            Some(path) if !cfg.outcomes.sheets.is_empty() => outcomes::extract_outcomes(
                &path,
                &cfg.outcomes.sheets,
                &cfg.outcomes.indicator_column,
            )?,
            _ => {
                vprintln!("dataset: no outcome sheets configured");
                Table::new("outcomes", Vec::new())
            }
        };

        vprintln!("dataset: loaded {} goal rows, {} games in {:.3}s", goals.len(), outcomes.len(), secs(t0));
        Ok(Self {
            cfg: cfg.clone(),
            goals,
            outcomes,
        })
    }

    pub fn from_tables(cfg: &Config, goals: Table, outcomes: Table) -> Self {
        Self {
            cfg: cfg.clone(),
            goals,
            outcomes,
        }
    }

    pub fn goals(&self) -> &Table {
        &self.goals
    }

    pub fn outcomes(&self) -> &Table {
        &self.outcomes
    }

    /// "Overall" followed by the months of the outcome table.
    pub fn month_options(&self) -> Vec<String> {
        let mut opts = vec![OVERALL.to_string()];
        opts.extend(aggregate::distinct_months(&self.outcomes));
        opts
    }

    /// Ranked, backfilled goal rows for the selected months.
    pub fn goals_for<S: AsRef<str>>(&self, selection: &[S]) -> Result<Table> {
        if self.goals.columns().is_empty() {
            return Ok(self.goals.clone());
        }
        aggregate::goal_view(&self.goals, &self.cfg.goals, selection)
    }

    pub fn outcomes_for<S: AsRef<str>>(&self, selection: &[S]) -> Result<Table> {
        if self.outcomes.columns().is_empty() {
            return Ok(self.outcomes.clone());
        }
        aggregate::slice_months(&self.outcomes, selection)
    }

    pub fn distribution_for<S: AsRef<str>>(&self, selection: &[S]) -> Result<Distribution> {
        let view = self.outcomes_for(selection)?;
        if view.columns().is_empty() {
            return Ok(Distribution::default());
        }
        aggregate::win_distribution(&view)
    }

    pub fn splits_for<S: AsRef<str>>(&self, selection: &[S]) -> Result<Vec<Split>> {
        let view = self.outcomes_for(selection)?;
        if view.columns().is_empty() {
            return Ok(Vec::new());
        }
        aggregate::conditional_splits(
            &view,
            self.cfg.outcomes.tracked_column.as_deref(),
            self.cfg.outcomes.parity_column.as_deref(),
        )
    }
}
