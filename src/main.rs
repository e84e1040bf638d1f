//! # tgroup CLI
//!
//! Reads a CSV file, splits it into two groups and reports an independent
//! two-sample t-test together with a text chart of both distributions.
//!
//! * **Argument parsing** – `clap` derives the `Cli` struct and its two
//!   subcommands, `compare` and `template`.
//! * **Data ingestion** – the file is loaded once into a `Table`; a short
//!   preview is printed so the user can check the columns they picked.
//! * **Comparison** – long layout (`--group-col`/`--value-col`) or wide layout
//!   (`--wide A B`), Welch's test unless `--equal-var` is given.
//! * **Result presentation** – `comfy_table` tables or, with `--json`, one
//!   JSON document on stdout.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::debug;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use tgroup::report::{preview, Report, ReportOptions};
use tgroup::template::{write_template, Layout};
use tgroup::{Table, TTestKind, TwoGroupComparator};

/// Rows shown in the data preview.
const PREVIEW_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "tgroup", version, about = "Two-group t-test for CSV data.")]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two groups of a CSV file
    Compare(CompareArgs),

    /// Write an example input file
    Template {
        /// Which layout to write
        #[arg(long, value_enum, default_value_t = Layout::Long)]
        layout: Layout,

        /// Destination file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// CSV file to read (header row required)
    #[arg(long)]
    data: PathBuf,

    /// Column whose two distinct values define the groups
    #[arg(long = "group-col", required_unless_present = "wide")]
    group_col: Option<String>,

    /// Column holding the numeric measurements
    #[arg(long = "value-col", required_unless_present = "wide")]
    value_col: Option<String>,

    /// Compare two value columns directly instead of a grouping column
    #[arg(long, num_args = 2, value_names = ["COL_A", "COL_B"],
          conflicts_with_all = ["group_col", "value_col"])]
    wide: Option<Vec<String>>,

    /// Assume equal variances (Student's t-test) instead of Welch's
    #[arg(long = "equal-var")]
    equal_var: bool,

    /// Field delimiter
    #[arg(long, default_value_t = ',', value_parser = parse_delimiter)]
    delimiter: char,

    /// Number of decimal places to print
    #[arg(long, default_value_t = 4)]
    round: usize,

    /// Confidence level of the group mean intervals, in percent
    #[arg(long, default_value_t = 95.0, value_parser = parse_ci)]
    ci: f64,

    /// Bootstrap resamples per group mean interval
    #[arg(long = "bootstrap-samples", default_value_t = 2000)]
    bootstrap_samples: usize,

    /// Also run a permutation test with this many shuffles
    #[arg(long)]
    permutations: Option<usize>,

    /// Random seed for the bootstrap and permutation test
    #[arg(long = "random-seed", default_value_t = 20252025)]
    seed: u64,

    /// Histogram bin count (automatic if omitted)
    #[arg(long)]
    bins: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Skip the histogram
    #[arg(long = "no-chart")]
    no_chart: bool,

    /// Skip the data preview and the reading notes
    #[arg(long, short)]
    quiet: bool,
}

fn parse_delimiter(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some('\\'), Some('t')) if s.len() == 2 => Ok('\t'),
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(format!("delimiter must be a single ASCII character, got `{}`", s)),
    }
}

fn parse_ci(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if v > 0.0 && v < 100.0 {
        Ok(v)
    } else {
        Err(format!("confidence level must lie in (0, 100), got {}", v))
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_compare(args: &CompareArgs) -> Result<()> {
    let table = Table::from_path(&args.data, args.delimiter as u8)
        .with_context(|| format!("failed to load {}", args.data.display()))?;

    let kind = if args.equal_var {
        TTestKind::Student
    } else {
        TTestKind::Welch
    };
    let comparator = TwoGroupComparator::new(kind);
    debug!("running {}", kind);
    let result = match (&args.wide, &args.group_col, &args.value_col) {
        (Some(cols), _, _) => comparator.compare_columns(&table, &cols[0], &cols[1])?,
        (None, Some(group), Some(value)) => comparator.compare(&table, group, value)?,
        _ => bail!("either --group-col and --value-col, or --wide, is required"),
    };
    debug!(
        "{} vs {}: t = {}, p = {}",
        result.label_a, result.label_b, result.t_statistic, result.p_value
    );

    let opts = ReportOptions {
        digits: args.round,
        ci: args.ci,
        bootstrap_samples: args.bootstrap_samples,
        permutations: args.permutations,
        bins: args.bins,
        chart: !args.no_chart,
        notes: !args.quiet && !args.json,
    };
    let mut rng = XorShiftRng::seed_from_u64(args.seed);
    let report = Report::build(result, &opts, &mut rng);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.json {
        writeln!(out, "{}", report.to_json()?)?;
    } else {
        if !args.quiet {
            writeln!(out, "{}", preview(&table, PREVIEW_ROWS))?;
        }
        write!(out, "{}", report.render_text(&opts))?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Compare(args) => run_compare(&args),
        Command::Template { layout, output } => {
            match output {
                Some(path) => {
                    let mut file = File::create(&path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    write_template(layout, &mut file)?;
                }
                None => write_template(layout, &mut io::stdout().lock())?,
            }
            Ok(())
        }
    }
}
