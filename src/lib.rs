//! # tgroup
//!
//! Compares two groups of a CSV dataset with an independent two-sample
//! t-test.
//!
//! ```
//! use tgroup::{Table, TwoGroupComparator, TTestKind};
//!
//! let csv = "group,value\nA,23.5\nA,24.1\nB,25.3\nB,22.8\n";
//! let table = Table::from_reader(csv.as_bytes(), b',').unwrap();
//! let result = TwoGroupComparator::new(TTestKind::Welch)
//!     .compare(&table, "group", "value")
//!     .unwrap();
//! assert_eq!((result.label_a.as_str(), result.label_b.as_str()), ("A", "B"));
//! assert!((0.0..=1.0).contains(&result.p_value));
//! ```
//!
//! ## Modules
//!
//! - [`table`] — CSV loading and cell classification
//! - [`compare`] — group extraction, validation and the test itself
//! - [`stats`] — Welford moments and the Welch/Student t-test
//! - [`resample`] — bootstrap intervals and the permutation cross-check
//! - [`chart`] — histogram and density data plus a terminal renderer
//! - [`report`] — text and JSON output
//! - [`template`] — example input files

pub mod chart;
pub mod compare;
pub mod report;
pub mod resample;
pub mod stats;
pub mod table;
pub mod template;

pub use compare::{
    compare, ComparisonError, ComparisonResult, TwoGroupComparator, Verdict, SIGNIFICANCE_LEVEL,
};
pub use stats::TTestKind;
pub use table::{Datum, Table, TableError};
