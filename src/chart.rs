//! Overlaid histograms with density curves for the two samples.
//!
//! [`Histogram::build`] produces renderer-neutral data: shared bin edges,
//! per-group counts and a Gaussian kernel density estimate evaluated at the
//! bin centres, scaled to count units so it can be drawn over the bars.
//! [`Histogram::to_table`] is the terminal renderer.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Table};
use float_ord::FloatOrd;
use serde::Serialize;

use crate::stats::std_dev;

const BAR: char = '█';
const CURVE: char = '•';

/// Upper bound on the automatically chosen bin count.
pub const MAX_AUTO_BINS: usize = 50;

/// One group's share of the chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub counts: Vec<usize>,
    /// Kernel density at each bin centre in count units; absent when the
    /// sample has fewer than two distinct values.
    pub density: Option<Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    /// `counts.len() + 1` increasing edges; the last bin is closed.
    pub edges: Vec<f64>,
    pub series: [Series; 2],
}

impl Histogram {
    /// Bins both samples on common edges.  `bins` overrides the automatic
    /// bin count.  Returns `None` if both samples are empty.
    pub fn build(
        (label_a, a): (&str, &[f64]),
        (label_b, b): (&str, &[f64]),
        bins: Option<usize>,
    ) -> Option<Histogram> {
        let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
        let edges = bin_edges(&pooled, bins)?;
        let centres: Vec<f64> = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        let width = edges[1] - edges[0];

        let series = |label: &str, xs: &[f64]| Series {
            label: label.to_string(),
            counts: count(xs, &edges),
            density: kde(xs, &centres).map(|d| {
                let scale = xs.len() as f64 * width;
                d.into_iter().map(|v| v * scale).collect()
            }),
        };
        Some(Histogram {
            series: [series(label_a, a), series(label_b, b)],
            edges,
        })
    }

    /// Renders the chart as a table: one row per bin, one bar per group.
    /// `width` is the length of the longest bar in characters.
    pub fn to_table(&self, width: usize, digits: usize) -> Table {
        let peak = self
            .series
            .iter()
            .flat_map(|s| {
                let curve = s.density.iter().flatten().copied();
                s.counts.iter().map(|&c| c as f64).chain(curve)
            })
            .fold(0.0_f64, f64::max);
        let scale = if peak > 0.0 {
            width as f64 / peak
        } else {
            0.0
        };

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .apply_modifier(UTF8_ROUND_CORNERS);
        let [a, b] = &self.series;
        table.set_header(vec![
            Cell::new("Bin"),
            Cell::new(format!("|{}|", a.label)),
            Cell::new(&a.label),
            Cell::new(format!("|{}|", b.label)),
            Cell::new(&b.label),
        ]);

        for (i, w) in self.edges.windows(2).enumerate() {
            let close = if i + 2 == self.edges.len() { "]" } else { ")" };
            let mut row = vec![Cell::new(format!(
                "[{:.3$}, {:.3$}{2}",
                w[0], w[1], close, digits
            ))];
            for s in &self.series {
                let curve = s.density.as_ref().map(|d| d[i]);
                row.push(Cell::new(s.counts[i].to_string()));
                row.push(Cell::new(bar(s.counts[i], curve, scale, width)));
            }
            table.add_row(row);
        }
        table
    }
}

/// A bar of `count * scale` blocks with the density curve marked on it.
fn bar(count: usize, curve: Option<f64>, scale: f64, width: usize) -> String {
    let mut cells = vec![' '; width + 1];
    let filled = ((count as f64 * scale).round() as usize).min(width);
    cells[..filled].fill(BAR);
    if let Some(d) = curve {
        let pos = ((d * scale).round() as usize).min(width);
        cells[pos] = CURVE;
    }
    cells.into_iter().collect::<String>().trim_end().to_string()
}

fn count(xs: &[f64], edges: &[f64]) -> Vec<usize> {
    let n_bins = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[n_bins]);
    let mut counts = vec![0; n_bins];
    for &x in xs {
        let idx = (((x - lo) / (hi - lo)) * n_bins as f64).floor() as usize;
        counts[idx.min(n_bins - 1)] += 1;
    }
    counts
}

/// Equal-width edges spanning `data`.  Without an explicit count the bin width
/// is the smaller of the Sturges and Freedman–Diaconis widths, unless the
/// Freedman–Diaconis count exceeds [`MAX_AUTO_BINS`] (a far outlier), in which
/// case Sturges is used alone.
pub fn bin_edges(data: &[f64], bins: Option<usize>) -> Option<Vec<f64>> {
    let mut sorted = data.to_vec();
    sorted.sort_by_key(|v| FloatOrd(*v));
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    if min == max {
        return Some(vec![min - 0.5, max + 0.5]);
    }

    let range = max - min;
    let n_bins = bins.filter(|&b| b > 0).unwrap_or_else(|| {
        let n = sorted.len() as f64;
        let sturges = ((n.log2() + 1.0).ceil() as usize).max(1);
        let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
        let fd_width = 2.0 * iqr * n.powf(-1.0 / 3.0);
        let fd = if fd_width > 0.0 {
            (range / fd_width).ceil()
        } else {
            0.0
        };
        if fd <= MAX_AUTO_BINS as f64 {
            sturges.max(fd as usize)
        } else {
            sturges
        }
    });

    let step = range / n_bins as f64;
    let mut edges: Vec<f64> = (0..n_bins).map(|i| min + step * i as f64).collect();
    edges.push(max);
    Some(edges)
}

/// Linear-interpolation quantile of sorted data.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let (lo, hi) = (h.floor() as usize, h.ceil() as usize);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Gaussian kernel density of `data` at `points`, bandwidth by Scott's rule.
///
/// `None` when the sample standard deviation is undefined or zero.
pub fn kde(data: &[f64], points: &[f64]) -> Option<Vec<f64>> {
    let sd = std_dev(data).filter(|s| *s > 0.0)?;
    let n = data.len() as f64;
    let h = sd * n.powf(-0.2);
    let norm = 1.0 / (n * h * (2.0 * std::f64::consts::PI).sqrt());
    Some(
        points
            .iter()
            .map(|&x| {
                norm * data
                    .iter()
                    .map(|&xi| (-0.5 * ((x - xi) / h).powi(2)).exp())
                    .sum::<f64>()
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_cover_the_data() {
        let data = [1.0, 2.0, 2.5, 3.0, 7.0];
        let edges = bin_edges(&data, Some(3)).unwrap();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[0], 1.0);
        assert_eq!(edges[3], 7.0);
        assert!((edges[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_data_gets_one_unit_bin() {
        assert_eq!(bin_edges(&[4.0, 4.0], None), Some(vec![3.5, 4.5]));
        assert_eq!(bin_edges(&[], None), None);
    }

    #[test]
    fn automatic_bins_for_small_sample() {
        // Sturges: ceil(log2(5) + 1) = 4; FD gives 2.
        let edges = bin_edges(&[1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();
        assert_eq!(edges.len() - 1, 4);
    }

    #[test]
    fn outlier_does_not_explode_bin_count() {
        let mut a: Vec<f64> = (0..100).map(|i| 20.0 + i as f64 * 0.1).collect();
        let b: Vec<f64> = (0..100).map(|i| 21.0 + i as f64 * 0.1).collect();
        a.push(1e6);
        let h = Histogram::build(("A", &a), ("B", &b), None).unwrap();
        let n_bins = h.edges.len() - 1;
        // Sturges for 201 values: ceil(log2(201) + 1) = 9
        assert_eq!(n_bins, 9);
        assert!(n_bins <= MAX_AUTO_BINS);
        assert_eq!(h.series[0].counts.iter().sum::<usize>(), 101);
        assert_eq!(h.series[0].counts[n_bins - 1], 1);
    }

    #[test]
    fn explicit_bins_are_kept() {
        let edges = bin_edges(&[0.0, 1e6], Some(80)).unwrap();
        assert_eq!(edges.len(), 81);
    }

    #[test]
    fn counts_sum_to_sample_sizes() {
        let a = [10.0, 11.0, 9.0, 10.0, 10.0];
        let b = [50.0, 51.0, 49.0, 50.0, 50.0];
        let h = Histogram::build(("A", &a), ("B", &b), None).unwrap();
        assert_eq!(h.series[0].counts.iter().sum::<usize>(), 5);
        assert_eq!(h.series[1].counts.iter().sum::<usize>(), 5);
        assert_eq!(h.series[0].label, "A");
        // Maximum lands in the last (closed) bin.
        assert!(*h.series[1].counts.last().unwrap() >= 1);
        assert_eq!(h.series[0].counts.len() + 1, h.edges.len());
    }

    #[test]
    fn kde_integrates_to_one() {
        let data = [1.0, 2.0, 2.0, 3.0, 5.0];
        let step = 0.01;
        let grid: Vec<f64> = (0..2000).map(|i| -5.0 + i as f64 * step).collect();
        let area: f64 = kde(&data, &grid).unwrap().iter().sum::<f64>() * step;
        assert!((area - 1.0).abs() < 1e-3, "area = {}", area);
        assert_eq!(kde(&[3.0, 3.0], &grid), None);
        assert_eq!(kde(&[3.0], &grid), None);
    }

    #[test]
    fn bar_marks_the_curve() {
        assert_eq!(bar(2, None, 2.0, 10), "████");
        assert_eq!(bar(2, Some(3.0), 2.0, 10), "████  •");
        assert_eq!(bar(0, None, 2.0, 10), "");
    }

    #[test]
    fn table_has_one_row_per_bin() {
        let h = Histogram::build(("x", &[1.0, 2.0, 3.0]), ("y", &[2.0, 3.0, 4.0]), Some(3)).unwrap();
        let rendered = h.to_table(20, 2).to_string();
        assert!(rendered.contains("[1.00, 2.00)"));
        assert!(rendered.contains("[3.00, 4.00]"));
        assert!(rendered.contains("|x|"));
    }
}
