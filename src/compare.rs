//! # Two-group comparison
//!
//! [`TwoGroupComparator`] turns a [`Table`] plus a pair of column names into
//! a [`ComparisonResult`].  The checks run in a fixed order and the first one
//! that fails ends the call:
//!
//! 1. both columns exist ([`ComparisonError::ColumnNotFound`]);
//! 2. the grouping column holds exactly two distinct labels
//!    ([`ComparisonError::GroupCountInvalid`]);
//! 3. each group keeps at least one numeric value once missing and
//!    non-numeric cells are dropped ([`ComparisonError::EmptySample`]).
//!
//! Rows whose group cell is empty carry no label and are skipped.  Labels are
//! ordered by first occurrence, so `label_a` is the label of the first
//! labelled row.

use std::fmt;

use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::stats::{serialize_extended_f64, ttest_ind, StatsError, TTestKind};
use crate::table::{Column, Table};

/// p-values below this are reported as a significant difference.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Labels quoted in a [`ComparisonError::GroupCountInvalid`] message.
const MAX_QUOTED_LABELS: usize = 5;

/// Why a comparison could not be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComparisonError {
    #[error("column `{0}` not found in the table")]
    ColumnNotFound(String),

    #[error(
        "exactly two groups are required, but column `{column}` has {found} ({})",
        .labels.join(", ")
    )]
    GroupCountInvalid {
        column: String,
        found: usize,
        labels: Vec<String>,
    },

    #[error("group `{label}` has no numeric values in column `{column}`")]
    EmptySample { label: String, column: String },

    #[error(transparent)]
    Statistics(#[from] StatsError),
}

/// Outcome of a successful comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub label_a: String,
    pub label_b: String,
    #[serde(serialize_with = "serialize_extended_f64")]
    pub t_statistic: f64,
    pub p_value: f64,
    #[serde(serialize_with = "serialize_extended_f64")]
    pub degrees_of_freedom: f64,
    pub method: TTestKind,
    pub sample_a: Vec<f64>,
    pub sample_b: Vec<f64>,
}

impl ComparisonResult {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_p_value(self.p_value)
    }
}

/// Reading of a p-value against [`SIGNIFICANCE_LEVEL`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Significant,
    NotSignificant,
}

impl Verdict {
    pub fn from_p_value(p: f64) -> Verdict {
        if p < SIGNIFICANCE_LEVEL {
            Verdict::Significant
        } else {
            Verdict::NotSignificant
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Significant => write!(
                f,
                "statistically significant difference (p < {})",
                SIGNIFICANCE_LEVEL
            ),
            Verdict::NotSignificant => write!(
                f,
                "no statistically significant difference (p >= {})",
                SIGNIFICANCE_LEVEL
            ),
        }
    }
}

/// Runs the two-sample test with a fixed variance assumption.
#[derive(Clone, Copy, Debug, Default)]
pub struct TwoGroupComparator {
    kind: TTestKind,
}

impl TwoGroupComparator {
    pub fn new(kind: TTestKind) -> Self {
        TwoGroupComparator { kind }
    }

    /// Compares the values of `value_key` between the two labels found in
    /// `group_key` (long layout).
    pub fn compare(
        &self,
        table: &Table,
        group_key: &str,
        value_key: &str,
    ) -> Result<ComparisonResult, ComparisonError> {
        let groups = lookup(table, group_key)?;
        let values = lookup(table, value_key)?;
        if group_key == value_key {
            warn!("grouping and value column are both `{}`", group_key);
        }

        let labels: Vec<String> = groups
            .cells()
            .iter()
            .filter_map(|d| d.label())
            .unique()
            .collect();
        let [label_a, label_b] = <[String; 2]>::try_from(labels).map_err(|labels| {
            ComparisonError::GroupCountInvalid {
                column: group_key.to_string(),
                found: labels.len(),
                labels: labels.into_iter().take(MAX_QUOTED_LABELS).collect(),
            }
        })?;

        let mut samples = [Vec::new(), Vec::new()];
        let mut dropped = 0usize;
        for (g, v) in groups.cells().iter().zip(values.cells()) {
            let Some(label) = g.label() else { continue };
            let slot = if label == label_a { 0 } else { 1 };
            match v.as_f64() {
                Some(x) => samples[slot].push(x),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                "dropped {} missing or non-numeric cells from `{}`",
                dropped, value_key
            );
        }

        let [sample_a, sample_b] = samples;
        self.finish(label_a, label_b, sample_a, sample_b, [value_key; 2])
    }

    /// Compares two numeric columns directly (wide layout); the column names
    /// become the group labels.
    pub fn compare_columns(
        &self,
        table: &Table,
        column_a: &str,
        column_b: &str,
    ) -> Result<ComparisonResult, ComparisonError> {
        let a = lookup(table, column_a)?;
        let b = lookup(table, column_b)?;
        if column_a == column_b {
            warn!("comparing column `{}` with itself", column_a);
        }
        let (sample_a, sample_b) = (a.numbers(), b.numbers());
        for (col, sample) in [(a, &sample_a), (b, &sample_b)] {
            let dropped = col.cells().len() - sample.len();
            if dropped > 0 {
                warn!(
                    "dropped {} missing or non-numeric cells from `{}`",
                    dropped,
                    col.name()
                );
            }
        }
        self.finish(
            a.name().to_string(),
            b.name().to_string(),
            sample_a,
            sample_b,
            [column_a, column_b],
        )
    }

    fn finish(
        &self,
        label_a: String,
        label_b: String,
        sample_a: Vec<f64>,
        sample_b: Vec<f64>,
        columns: [&str; 2],
    ) -> Result<ComparisonResult, ComparisonError> {
        let [col_a, col_b] = columns;
        let groups = [(&label_a, &sample_a, col_a), (&label_b, &sample_b, col_b)];
        for (label, sample, column) in groups {
            if sample.is_empty() {
                return Err(ComparisonError::EmptySample {
                    label: label.clone(),
                    column: column.to_string(),
                });
            }
        }
        debug!(
            "{}: n({})={}, n({})={}",
            self.kind,
            label_a,
            sample_a.len(),
            label_b,
            sample_b.len()
        );

        let test = ttest_ind(&sample_a, &sample_b, self.kind)?;
        Ok(ComparisonResult {
            label_a,
            label_b,
            t_statistic: test.statistic,
            p_value: test.p_value,
            degrees_of_freedom: test.df,
            method: test.kind,
            sample_a,
            sample_b,
        })
    }
}

/// Compares with the default (Welch) variance assumption.
pub fn compare(
    table: &Table,
    group_key: &str,
    value_key: &str,
) -> Result<ComparisonResult, ComparisonError> {
    TwoGroupComparator::default().compare(table, group_key, value_key)
}

fn lookup<'a>(table: &'a Table, name: &str) -> Result<&'a Column, ComparisonError> {
    table
        .column(name)
        .ok_or_else(|| ComparisonError::ColumnNotFound(name.to_string()))
}
