use std::path::PathBuf;

pub struct Cli {
    pub config: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub current_month: Option<String>, // "YYYY-MM"
    pub months: Vec<String>,           // empty = Overall
    pub out: Option<PathBuf>,          // directory for CSV export
    pub verbose: bool,
    pub help: bool,
}

pub fn parse() -> Cli {
    parse_from(std::env::args().skip(1))
}

pub fn parse_from(args: impl IntoIterator<Item = String>) -> Cli {
    let mut config: Option<PathBuf> = None;
    let mut input_dir: Option<PathBuf> = None;
    let mut current_month: Option<String> = None;
    let mut months: Vec<String> = Vec::new();
    let mut out: Option<PathBuf> = None;
    let mut verbose = false;
    let mut help = false;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(p) = it.next() { config = Some(PathBuf::from(p)); }
            }
            "--input-dir" | "-i" => {
                if let Some(p) = it.next() { input_dir = Some(PathBuf::from(p)); }
            }
            "--current-month" => {
                if let Some(m) = it.next() { current_month = Some(m); }
            }
            "--months" | "-m" => {
                if let Some(list) = it.next() {
                    months.extend(list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from));
                }
            }
            "--out" | "-o" => {
                if let Some(p) = it.next() { out = Some(PathBuf::from(p)); }
            }
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => help = true,
            _ => {}
        }
    }

    Cli { config, input_dir, current_month, months, out, verbose, help }
}

pub fn print_help() {
    eprintln!(
r#"kickstats - goals and wins from the monthly Kicken exports

Usage:
  kickstats [--config PATH] [--input-dir DIR] [--current-month YYYY-MM]
            [--months M1,M2,...] [--out DIR] [-v]

Options:
  -c, --config PATH           Config file (default: config.toml, or $KICKSTATS_CONFIG).
  -i, --input-dir DIR         Folder with the exports (overrides config / $KICKSTATS_INPUT_DIR).
  --current-month YYYY-MM     Ignore goal files dated after this month (default: keep all).
  -m, --months LIST           Comma-separated month labels, e.g. October-2022,November-2022.
                              "Overall" (the default) keeps everything.
  -o, --out DIR               Write goals.csv and outcomes.csv for the selection.
  -v, --verbose               Timings and per-file diagnostics on stderr.
  -h, --help                  Show this help.

Notes:
  • Outcome sheets (name, columns, rows) are listed in config.toml under [[outcomes.sheets]].
  • Everything is recomputed from the spreadsheets on each run.
"#);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn parses_flags() {
        let cli = parse_from(args(&[
            "-v",
            "--months", "October-2022, November-2022",
            "--out", "out",
            "--current-month", "2022-11",
        ]));
        assert!(cli.verbose);
        assert_eq!(cli.months, vec!["October-2022", "November-2022"]);
        assert_eq!(cli.out, Some(PathBuf::from("out")));
        assert_eq!(cli.current_month.as_deref(), Some("2022-11"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn unknown_and_dangling_flags_are_ignored() {
        let cli = parse_from(args(&["--bogus", "--out"]));
        assert!(cli.out.is_none());
        assert!(!cli.help);
        assert!(cli.months.is_empty());
    }
}
