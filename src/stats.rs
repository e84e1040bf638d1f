//! Descriptive statistics and the independent two-sample t-test.
//!
//! Means and variances go through a Welford accumulator so that values with a
//! large common offset (timestamps, raw sensor counts) do not lose precision.
//! The Student's t tail probability comes from `statrs`.

use std::fmt;

use serde::{Serialize, Serializer};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Errors from the statistical routines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("a t-test needs at least one observation per sample")]
    EmptyInput,

    #[error("invalid t distribution with {df} degrees of freedom: {message}")]
    Distribution { df: f64, message: String },
}

/// Running mean and sum of squared deviations (Welford, 1962).
#[derive(Clone, Copy, Debug, Default)]
pub struct Welford {
    n: usize,
    mean: f64,
    m2: f64,
}

impl Welford {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.n
    }

    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then_some(self.mean)
    }

    /// Sample variance (denominator `n - 1`); `None` below two observations.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.n > 1).then(|| (self.m2 / (self.n - 1) as f64).max(0.0))
    }
}

impl FromIterator<f64> for Welford {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Welford::new();
        for x in iter {
            acc.update(x);
        }
        acc
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    data.iter().copied().collect::<Welford>().mean()
}

/// Sample variance; `None` below two observations.
pub fn variance(data: &[f64]) -> Option<f64> {
    data.iter().copied().collect::<Welford>().sample_variance()
}

/// Sample standard deviation; `None` below two observations.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Which variance assumption the two-sample test makes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TTestKind {
    /// Unequal variances, Welch–Satterthwaite degrees of freedom.
    #[default]
    Welch,
    /// Pooled variance, `n_a + n_b - 2` degrees of freedom.
    Student,
}

impl fmt::Display for TTestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TTestKind::Welch => write!(f, "Welch's t-test (unequal variances)"),
            TTestKind::Student => write!(f, "Student's t-test (equal variances)"),
        }
    }
}

/// Writes finite values as JSON numbers and the rest as the strings `"inf"`,
/// `"-inf"` or `"nan"`, which plain serde_json would collapse to `null`.
pub fn serialize_extended_f64<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    if v.is_finite() {
        s.serialize_f64(*v)
    } else if v.is_nan() {
        s.serialize_str("nan")
    } else if v.is_sign_positive() {
        s.serialize_str("inf")
    } else {
        s.serialize_str("-inf")
    }
}

/// Outcome of a two-sample t-test.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TTest {
    #[serde(serialize_with = "serialize_extended_f64")]
    pub statistic: f64,
    #[serde(serialize_with = "serialize_extended_f64")]
    pub df: f64,
    pub p_value: f64,
    pub kind: TTestKind,
}

/// Independent two-sample t-test of `mean(a) - mean(b)`, two-tailed.
///
/// A sample with a single observation contributes zero variance.  When the
/// standard error is zero the statistic is `0` (p = 1) for equal means and
/// `±inf` (p = 0) otherwise.
pub fn ttest_ind(a: &[f64], b: &[f64], kind: TTestKind) -> Result<TTest, StatsError> {
    let acc_a: Welford = a.iter().copied().collect();
    let acc_b: Welford = b.iter().copied().collect();
    let (Some(mean_a), Some(mean_b)) = (acc_a.mean(), acc_b.mean()) else {
        return Err(StatsError::EmptyInput);
    };
    let (n_a, n_b) = (acc_a.count() as f64, acc_b.count() as f64);
    let var_a = acc_a.sample_variance().unwrap_or(0.0);
    let var_b = acc_b.sample_variance().unwrap_or(0.0);
    let diff = mean_a - mean_b;

    let (se, df) = match kind {
        TTestKind::Welch => {
            let (qa, qb) = (var_a / n_a, var_b / n_b);
            let se2 = qa + qb;
            // Welch–Satterthwaite on the variance shares qa/se2 and qb/se2, so
            // squaring cannot underflow for small-magnitude data.
            let mut denom = 0.0;
            if qa > 0.0 {
                let ra = qa / se2;
                denom += ra * ra / (n_a - 1.0);
            }
            if qb > 0.0 {
                let rb = qb / se2;
                denom += rb * rb / (n_b - 1.0);
            }
            let df = if denom > 0.0 { 1.0 / denom } else { 0.0 };
            (se2.sqrt(), df)
        }
        TTestKind::Student => {
            let df = n_a + n_b - 2.0;
            if df > 0.0 {
                let pooled = ((n_a - 1.0) * var_a + (n_b - 1.0) * var_b) / df;
                ((pooled * (1.0 / n_a + 1.0 / n_b)).sqrt(), df)
            } else {
                (0.0, 0.0)
            }
        }
    };

    if se == 0.0 || !se.is_finite() {
        let (statistic, p_value) = if diff == 0.0 {
            (0.0, 1.0)
        } else {
            (f64::INFINITY.copysign(diff), 0.0)
        };
        return Ok(TTest {
            statistic,
            df,
            p_value,
            kind,
        });
    }

    let statistic = diff / se;
    Ok(TTest {
        statistic,
        df,
        p_value: two_tailed_p(statistic, df)?,
        kind,
    })
}

/// `P(|T| >= |t|)` for a Student's t distribution with `df` degrees of freedom.
pub fn two_tailed_p(t: f64, df: f64) -> Result<f64, StatsError> {
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::Distribution {
        df,
        message: e.to_string(),
    })?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn welford_matches_textbook() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(mean(&v).unwrap(), 5.0, 1e-12));
        assert!(close(variance(&v).unwrap(), 4.571428571428571, 1e-10));
        assert!(close(std_dev(&v).unwrap(), 2.138089935299395, 1e-10));
        assert_eq!(mean(&[]), None);
        assert_eq!(variance(&[1.0]), None);
    }

    #[test]
    fn welford_large_offset() {
        let v: Vec<f64> = [4.0, 7.0, 13.0, 16.0].iter().map(|x| x + 1e9).collect();
        assert!(close(variance(&v).unwrap(), 30.0, 1e-6));
    }

    #[test]
    fn welch_reference_values() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = ttest_ind(&a, &b, TTestKind::Welch).unwrap();
        assert!(close(r.statistic, -1.8973665961010275, 1e-10));
        assert!(close(r.df, 5.882352941176471, 1e-10));
        assert!(close(r.p_value, 0.10753119493062728, 1e-6));
    }

    #[test]
    fn student_reference_values() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = ttest_ind(&a, &b, TTestKind::Student).unwrap();
        assert!(close(r.statistic, -1.8973665961010275, 1e-10));
        assert_eq!(r.df, 8.0);
        assert!(close(r.p_value, 0.09434977284243769, 1e-6));
    }

    #[test]
    fn variants_differ_on_unbalanced_groups() {
        let a = [5.1, 4.9, 6.2, 5.8, 6.0, 5.5];
        let b = [6.8, 7.1, 6.4, 7.7, 6.9];
        let w = ttest_ind(&a, &b, TTestKind::Welch).unwrap();
        let s = ttest_ind(&a, &b, TTestKind::Student).unwrap();
        assert!(close(w.statistic, -4.681345093683709, 1e-9));
        assert!(close(w.df, 8.845809922957685, 1e-9));
        assert!(close(w.p_value, 0.0012048516222756963, 1e-7));
        assert!(close(s.statistic, -4.647942734390936, 1e-9));
        assert!(close(s.p_value, 0.0012056218240555192, 1e-7));
    }

    #[test]
    fn zero_standard_error() {
        let same = ttest_ind(&[3.0, 3.0], &[3.0, 3.0, 3.0], TTestKind::Welch).unwrap();
        assert_eq!((same.statistic, same.p_value), (0.0, 1.0));

        let apart = ttest_ind(&[1.0, 1.0], &[3.0, 3.0], TTestKind::Welch).unwrap();
        assert_eq!(apart.statistic, f64::NEG_INFINITY);
        assert_eq!(apart.p_value, 0.0);

        let singletons = ttest_ind(&[2.0], &[1.0], TTestKind::Student).unwrap();
        assert_eq!(singletons.statistic, f64::INFINITY);
        assert_eq!(singletons.p_value, 0.0);
    }

    #[test]
    fn singleton_group_uses_other_variance() {
        let r = ttest_ind(&[4.0], &[1.0, 2.0, 3.0], TTestKind::Welch).unwrap();
        // se = sqrt(1/3), df = n_b - 1
        assert!(close(r.statistic, 2.0 / (1.0f64 / 3.0).sqrt(), 1e-12));
        assert!(close(r.df, 2.0, 1e-12));
        assert!(r.p_value > 0.0 && r.p_value < 1.0);
    }

    #[test]
    fn welch_is_scale_free() {
        let unit = ttest_ind(&[1.0, 2.0], &[3.0, 4.0], TTestKind::Welch).unwrap();
        let tiny = ttest_ind(&[1e-150, 2e-150], &[3e-150, 4e-150], TTestKind::Welch).unwrap();
        assert!(close(unit.df, 2.0, 1e-12));
        assert!(close(tiny.df, unit.df, 1e-9));
        assert!(close(tiny.statistic, unit.statistic, 1e-9));
        assert!(close(tiny.p_value, unit.p_value, 1e-9));
    }

    #[test]
    fn welch_survives_subnormal_variances() {
        let r = ttest_ind(&[1e-160, 2e-160], &[3e-160, 4e-160], TTestKind::Welch).unwrap();
        assert!(r.df > 0.0 && r.df.is_finite(), "df = {}", r.df);
        assert!(r.statistic < 0.0);
        assert!((0.0..=1.0).contains(&r.p_value));
    }

    #[test]
    fn infinite_statistic_keeps_its_sign_in_json() {
        let r = ttest_ind(&[1.0, 1.0], &[3.0, 3.0], TTestKind::Welch).unwrap();
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["statistic"], "-inf");
        assert_eq!(json["p_value"], 0.0);
        assert_eq!(json["df"], 0.0);

        let r = ttest_ind(&[3.0], &[1.0], TTestKind::Student).unwrap();
        assert_eq!(serde_json::to_value(r).unwrap()["statistic"], "inf");
    }

    #[test]
    fn empty_sample_is_an_error() {
        assert_eq!(
            ttest_ind(&[], &[1.0], TTestKind::Welch),
            Err(StatsError::EmptyInput)
        );
    }

    #[test]
    fn two_tailed_p_at_zero_is_one() {
        assert!(close(two_tailed_p(0.0, 7.0).unwrap(), 1.0, 1e-12));
        assert_eq!(two_tailed_p(f64::NEG_INFINITY, 7.0).unwrap(), 0.0);
        assert!(two_tailed_p(1.0, 0.0).is_err());
    }
}
