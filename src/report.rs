//! # Presentation
//!
//! Everything the user sees after a comparison: a preview of the uploaded
//! rows, the test result, per-group summaries with bootstrap intervals, the
//! optional permutation cross-check, the verdict and the chart.  Text goes
//! through `comfy_table`; `--json` serializes the same [`Report`].

use std::fmt::Write as _;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Table as TextTable};
use rand::Rng;
use serde::Serialize;

use crate::chart::Histogram;
use crate::compare::{ComparisonResult, Verdict};
use crate::resample::{bootstrap_mean_ci, permutation_test, PermutationTest};
use crate::stats::{mean, std_dev};
use crate::table::Table;

const CHART_WIDTH: usize = 30;

const NOTES: &str = "\
How to read this:
  - The t statistic is the difference of the two means measured in standard
    errors; the further it is from 0, the more the groups differ.
  - A p-value below 0.05 means a difference this large would rarely arise by
    chance if both groups had the same mean.
  - A p-value of 0.05 or more means the difference is compatible with chance
    variation.";

/// Knobs for [`Report::build`] and [`Report::render_text`].
#[derive(Clone, Debug)]
pub struct ReportOptions {
    /// Decimal places for printed numbers.
    pub digits: usize,
    /// Confidence level in percent for the group mean intervals.
    pub ci: f64,
    pub bootstrap_samples: usize,
    pub permutations: Option<usize>,
    pub bins: Option<usize>,
    pub chart: bool,
    pub notes: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            digits: 4,
            ci: 95.0,
            bootstrap_samples: 2000,
            permutations: None,
            bins: None,
            chart: true,
            notes: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub n: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub ci: Option<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub comparison: ComparisonResult,
    pub verdict: Verdict,
    pub ci_level: f64,
    pub groups: [GroupSummary; 2],
    pub permutation: Option<PermutationTest>,
    pub chart: Option<Histogram>,
}

impl Report {
    pub fn build(comparison: ComparisonResult, opts: &ReportOptions, rng: &mut impl Rng) -> Report {
        let alpha = 1.0 - opts.ci / 100.0;
        let mut summary = |label: &str, xs: &[f64]| GroupSummary {
            label: label.to_string(),
            n: xs.len(),
            mean: mean(xs).unwrap_or(f64::NAN),
            std_dev: std_dev(xs),
            ci: bootstrap_mean_ci(xs, &mut *rng, opts.bootstrap_samples, alpha),
        };
        let groups = [
            summary(&comparison.label_a, &comparison.sample_a),
            summary(&comparison.label_b, &comparison.sample_b),
        ];

        let permutation = opts
            .permutations
            .and_then(|n| permutation_test(&comparison.sample_a, &comparison.sample_b, &mut *rng, n));

        let chart = if opts.chart {
            Histogram::build(
                (&comparison.label_a, &comparison.sample_a),
                (&comparison.label_b, &comparison.sample_b),
                opts.bins,
            )
        } else {
            None
        };

        Report {
            verdict: comparison.verdict(),
            ci_level: opts.ci,
            groups,
            permutation,
            chart,
            comparison,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self, opts: &ReportOptions) -> String {
        let d = opts.digits;
        let c = &self.comparison;
        let mut out = String::new();

        let mut result = text_table();
        result.set_header(vec!["Comparison", "Method", "t", "df", "p-value"]);
        result.add_row(vec![
            Cell::new(format!("{} vs {}", c.label_a, c.label_b)),
            Cell::new(c.method.to_string()),
            Cell::new(format!("{:.1$}", c.t_statistic, d)),
            Cell::new(format!("{:.1$}", c.degrees_of_freedom, d)),
            Cell::new(format!("{:.1$}", c.p_value, d)),
        ]);
        if let Some(p) = &self.permutation {
            result.add_row(vec![
                Cell::new(""),
                Cell::new(format!("permutation test ({} shuffles)", p.permutations)),
                Cell::new(format!("Δ = {:.1$}", p.observed, d)),
                Cell::new(""),
                Cell::new(format!("{:.1$}", p.p_value, d)),
            ]);
        }
        let _ = writeln!(out, "{}", result);

        let mut groups = text_table();
        groups.set_header(vec![
            "Group".to_string(),
            "Observations".to_string(),
            "Mean".to_string(),
            "Std. Dev.".to_string(),
            format!("{}% CI of Mean", self.ci_level),
        ]);
        for g in &self.groups {
            groups.add_row(vec![
                Cell::new(&g.label),
                Cell::new(g.n.to_string()),
                Cell::new(format!("{:.1$}", g.mean, d)),
                Cell::new(g.std_dev.map_or("-".into(), |s| format!("{:.1$}", s, d))),
                Cell::new(g.ci.map_or("-".into(), |(lo, hi)| {
                    format!("[{:.2$}, {:.2$}]", lo, hi, d)
                })),
            ]);
        }
        let _ = writeln!(out, "{}", groups);

        let _ = writeln!(
            out,
            "t = {:.2$}, p = {:.2$}: {3}",
            c.t_statistic, c.p_value, d, self.verdict
        );

        if let Some(chart) = &self.chart {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", chart.to_table(CHART_WIDTH, d.min(3)));
        }
        if opts.notes {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", NOTES);
        }
        out
    }
}

/// The first `rows` rows of the uploaded table.
pub fn preview(table: &Table, rows: usize) -> TextTable {
    let mut out = text_table();
    out.set_header(table.column_names().map(Cell::new).collect::<Vec<_>>());
    for row in (0..rows.min(table.n_rows())).filter_map(|i| table.row(i)) {
        out.add_row(row.into_iter().map(Cell::new).collect::<Vec<_>>());
    }
    out
}

fn text_table() -> TextTable {
    let mut table = TextTable::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::TwoGroupComparator;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn result() -> ComparisonResult {
        let t = Table::from_reader(
            "g,v\nA,10\nA,11\nA,9\nA,10\nA,10\nB,50\nB,51\nB,49\nB,50\nB,50\n".as_bytes(),
            b',',
        )
        .unwrap();
        TwoGroupComparator::default().compare(&t, "g", "v").unwrap()
    }

    #[test]
    fn summaries_and_verdict() {
        let opts = ReportOptions {
            permutations: Some(200),
            ..ReportOptions::default()
        };
        let report = Report::build(result(), &opts, &mut XorShiftRng::seed_from_u64(7));
        assert_eq!(report.verdict, Verdict::Significant);
        assert_eq!(report.groups[0].label, "A");
        assert_eq!(report.groups[1].n, 5);
        assert!((report.groups[1].mean - 50.0).abs() < 1e-12);
        let (lo, hi) = report.groups[0].ci.unwrap();
        assert!(lo <= 10.0 && 10.0 <= hi);
        assert!(report.permutation.is_some());
        assert!(report.chart.is_some());
    }

    #[test]
    fn text_uses_four_decimals() {
        let opts = ReportOptions::default();
        let report = Report::build(result(), &opts, &mut XorShiftRng::seed_from_u64(7));
        let text = report.render_text(&opts);
        assert!(text.contains("-89.4427"), "{}", text);
        assert!(text.contains("statistically significant difference"));
        assert!(text.contains("Welch's t-test"));
        assert!(text.contains("How to read this"));
    }

    #[test]
    fn json_round_trips_the_fields() {
        let opts = ReportOptions {
            chart: false,
            ..ReportOptions::default()
        };
        let report = Report::build(result(), &opts, &mut XorShiftRng::seed_from_u64(7));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["comparison"]["label_a"], "A");
        assert_eq!(value["comparison"]["method"], "welch");
        assert_eq!(value["verdict"], "significant");
        assert!(value["chart"].is_null());
    }

    #[test]
    fn json_spells_out_infinite_t() {
        let t = Table::from_reader("g,v\nA,1\nA,1\nB,3\nB,3\n".as_bytes(), b',').unwrap();
        let r = TwoGroupComparator::default().compare(&t, "g", "v").unwrap();
        let report = Report::build(r, &ReportOptions::default(), &mut XorShiftRng::seed_from_u64(7));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["comparison"]["t_statistic"], "-inf");
        assert_eq!(value["comparison"]["p_value"], 0.0);
        assert_eq!(value["verdict"], "significant");
        assert!(report.render_text(&ReportOptions::default()).contains("-inf"));
    }

    #[test]
    fn preview_limits_rows() {
        let t = Table::from_reader("g,v\nA,1\nB,\nC,3\n".as_bytes(), b',').unwrap();
        let text = preview(&t, 2).to_string();
        assert!(text.contains('A') && text.contains('B'));
        assert!(!text.contains('C'));
    }
}
