//! # Resampling checks
//!
//! Two non-parametric companions to the t-test, both driven by a caller
//! supplied RNG so a fixed seed reproduces the printed numbers exactly:
//!
//! * [`bootstrap_mean_ci`] puts a percentile confidence interval around each
//!   group mean;
//! * [`permutation_test`] re-derives a two-sided p-value for the difference of
//!   means without assuming normality.
//!
//! Both fan the resamples out over Rayon.  Each resample gets its own
//! `XorShiftRng` seeded from one draw of the caller's RNG plus the resample
//! index, so the result does not depend on how Rayon splits the work.

use float_ord::FloatOrd;
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use rayon::prelude::*;
use serde::Serialize;

/* ---------------------------------------------------------------------------
 *  Bootstrap confidence interval of the mean
 * ---------------------------------------------------------------------------
 * Draw `samples` resamples (with replacement) of the same size as `data`,
 * take the mean of each, sort, and read off the α/2 and 1-α/2 order
 * statistics.
 */
pub fn bootstrap_mean_ci(
    data: &[f64],
    rng: &mut impl Rng,
    samples: usize,
    alpha: f64,
) -> Option<(f64, f64)> {
    let n = data.len();
    if n == 0 || samples == 0 {
        return None;
    }
    let seed = rng.random::<u64>();
    let mut means: Vec<f64> = (0..samples)
        .into_par_iter()
        .map(|si| {
            let mut prng = XorShiftRng::seed_from_u64(seed.wrapping_add(si as u64));
            (0..n).map(|_| data[prng.random_range(0..n)]).sum::<f64>() / n as f64
        })
        .collect();
    means.sort_by_key(|m| FloatOrd(*m));

    let lo_idx = ((alpha / 2.0) * samples as f64).floor() as usize;
    let hi_idx = ((1.0 - alpha / 2.0) * samples as f64)
        .ceil()
        .min((samples - 1) as f64) as usize;
    Some((means[lo_idx.min(samples - 1)], means[hi_idx]))
}

/// Outcome of a permutation test on the difference of means.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PermutationTest {
    /// `mean(a) - mean(b)` on the observed labelling.
    pub observed: f64,
    pub p_value: f64,
    pub permutations: usize,
}

/* ---------------------------------------------------------------------------
 *  Permutation test
 * ---------------------------------------------------------------------------
 * Under the null hypothesis the group labels are exchangeable.  Pool both
 * samples, shuffle, split at |a| and recompute the mean difference.  The
 * p-value is the share of shuffles at least as extreme as the observed
 * difference, with the observed labelling counted as one of them so it never
 * reports exactly zero.
 */
pub fn permutation_test(
    a: &[f64],
    b: &[f64],
    rng: &mut impl Rng,
    permutations: usize,
) -> Option<PermutationTest> {
    if a.is_empty() || b.is_empty() || permutations == 0 {
        return None;
    }
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let observed = mean(a) - mean(b);

    let mut pool = Vec::with_capacity(a.len() + b.len());
    pool.extend_from_slice(a);
    pool.extend_from_slice(b);
    let split = a.len();
    // Shuffled differences equal to the observed one up to rounding count as
    // extreme.
    let threshold = observed.abs() * (1.0 - 1e-12);

    let seed = rng.random::<u64>();
    let extreme = (0..permutations)
        .into_par_iter()
        .map_init(
            || pool.clone(),
            |buf, pi| {
                let mut prng = XorShiftRng::seed_from_u64(seed.wrapping_add(pi as u64));
                // Every shuffle starts from the observed labelling.
                buf.copy_from_slice(&pool);
                buf.shuffle(&mut prng);
                let stat = mean(&buf[..split]) - mean(&buf[split..]);
                usize::from(stat.abs() >= threshold)
            },
        )
        .sum::<usize>();

    Some(PermutationTest {
        observed,
        p_value: (extreme + 1) as f64 / (permutations + 1) as f64,
        permutations,
    })
}
