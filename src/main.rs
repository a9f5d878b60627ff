use std::path::PathBuf;

use anyhow::Context;

use kickstats::aggregate::{self, Split, OVERALL, RANK_COLUMN, TOTAL_GOALS_COLUMN};
use kickstats::config::{Config, GoalsConfig, DEFAULT_CONFIG_PATH};
use kickstats::months::MONTH_COLUMN;
use kickstats::{verbose, Dataset, Table, Winner};

mod cli;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::parse();
    if args.help {
        cli::print_help();
        return Ok(());
    }
    verbose::set(args.verbose);

    // config path: CLI > env > default
    let cfg_path = args
        .config
        .clone()
        .or_else(|| std::env::var("KICKSTATS_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut cfg =
        Config::load(&cfg_path).with_context(|| format!("loading {}", cfg_path.display()))?;
    if let Some(dir) = args
        .input_dir
        .clone()
        .or_else(|| std::env::var("KICKSTATS_INPUT_DIR").ok().map(PathBuf::from))
    {
        cfg.input_dir = dir;
    }
    if args.current_month.is_some() {
        cfg.current_month = args.current_month.clone();
    }

    if let Some(n) = cfg.rayon_threads {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    }

    let ds = Dataset::load(&cfg)
        .with_context(|| format!("loading exports from {}", cfg.input_dir.display()))?;
    eprintln!("months: {}", ds.month_options().join(", "));

    let selection = if args.months.is_empty() {
        vec![OVERALL.to_string()]
    } else {
        args.months.clone()
    };

    let goals = ds.goals_for(&selection).context("building goal view")?;
    let outcomes = ds.outcomes_for(&selection).context("slicing outcomes")?;
    let splits = ds.splits_for(&selection).context("splitting outcomes")?;

    println!("Goals {:?}", selection);
    print_ranking(&goals, &cfg.goals);
    println!();
    println!("Win and loss distribution {:?}", selection);
    print_splits(&splits);

    if let Some(dir) = args.out.as_deref() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let goals_csv = dir.join("goals.csv");
        aggregate::write_csv(&goals, &goals_csv)
            .with_context(|| format!("writing {}", goals_csv.display()))?;
        let outcomes_csv = dir.join("outcomes.csv");
        aggregate::write_csv(&outcomes, &outcomes_csv)
            .with_context(|| format!("writing {}", outcomes_csv.display()))?;
        eprintln!("wrote {} and {}", goals_csv.display(), outcomes_csv.display());
    }

    Ok(())
}

/// One line per player, best first, with the per-month breakdown.
fn print_ranking(goals: &Table, cols: &GoalsConfig) {
    let mut current: Option<String> = None;
    let mut line = String::new();
    for i in 0..goals.len() {
        let name = goals.get(i, &cols.player_column).to_string();
        if current.as_deref() != Some(name.as_str()) {
            if !line.is_empty() {
                println!("{}", line);
            }
            line = format!(
                "{:>3}. {:<20} {:>4} |",
                goals.get(i, RANK_COLUMN).as_i64().map(|r| r + 1).unwrap_or(0),
                name.as_str(),
                goals.get(i, TOTAL_GOALS_COLUMN).to_string(),
            );
            current = Some(name);
        }
        line.push_str(&format!(
            " {}={}",
            goals.get(i, MONTH_COLUMN),
            goals.get(i, &cols.goals_column).as_i64().unwrap_or(0)
        ));
    }
    if !line.is_empty() {
        println!("{}", line);
    }
}

fn print_splits(splits: &[Split]) {
    if splits.is_empty() {
        println!("  (no outcome sheets configured)");
        return;
    }
    for s in splits {
        let (a, b, d) = s.distribution.percentages();
        println!(
            "  {:<24} games={:<4} {}={:.1}% {}={:.1}% {}={:.1}%",
            s.kind.label(),
            s.distribution.games,
            Winner::SideA.label(),
            a,
            Winner::SideB.label(),
            b,
            Winner::Draw.label(),
            d
        );
    }
}
