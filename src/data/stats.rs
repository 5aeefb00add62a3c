//! Descriptive statistics behind the KPI cards and charts.
//!
//! Quantiles use linear interpolation between closest ranks, which is what
//! a pandas `quantile()` call returns.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// The `q`-th quantile (`0.0..=1.0`) with linear interpolation.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let sorted = sorted_finite(values);
    quantile_sorted(&sorted, q)
}

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

// ---------------------------------------------------------------------------
// Box plot
// ---------------------------------------------------------------------------

/// Five-number summary with Tukey whiskers (1.5 × IQR) and outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let sorted = sorted_finite(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let median = quantile_sorted(&sorted, 0.5)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let lo_fence = q1 - 1.5 * iqr;
    let hi_fence = q3 + 1.5 * iqr;

    // Whiskers reach the most extreme samples still inside the fences.
    let lower_whisker = sorted.iter().copied().find(|v| *v >= lo_fence).unwrap_or(q1);
    let upper_whisker = sorted.iter().rev().copied().find(|v| *v <= hi_fence).unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < lo_fence || *v > hi_fence)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram. `edges.len() == counts.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }
}

/// Bin `values` into `bins` equal-width buckets spanning min..=max.
///
/// The last bucket is closed on the right. A single distinct value gets
/// one unit-wide bucket centred on it.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let sorted = sorted_finite(values);
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    if bins == 0 {
        return None;
    }

    if min == max {
        return Some(Histogram {
            edges: vec![min - 0.5, min + 0.5],
            counts: vec![sorted.len()],
        });
    }

    let width = (max - min) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in sorted {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Histogram { edges, counts })
}

// ---------------------------------------------------------------------------
// Ordinary least squares
// ---------------------------------------------------------------------------

/// `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares line through `points`; `None` with fewer than two
/// distinct x values.
pub fn linear_fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    let points: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for &(x, y) in &points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 { 1.0 } else { (sxy * sxy) / (sxx * syy) };
    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

// ---------------------------------------------------------------------------
// Quantile categories (map colouring)
// ---------------------------------------------------------------------------

/// Quartile buckets: edges at min, Q1, median, Q3, max with duplicate
/// edges dropped. The first bucket includes its lower edge; every other
/// bucket is `(lo, hi]`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBins {
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
}

impl QuantileBins {
    pub fn new(values: &[f64], currency: &str) -> Option<Self> {
        let sorted = sorted_finite(values);
        let mut edges: Vec<f64> = [0.0, 0.25, 0.5, 0.75, 1.0]
            .iter()
            .filter_map(|q| quantile_sorted(&sorted, *q))
            .collect();
        edges.dedup();
        if edges.is_empty() {
            return None;
        }
        if edges.len() == 1 {
            // Every value is identical: one bucket holding all of them.
            edges.push(edges[0]);
        }
        let labels = edges
            .windows(2)
            .map(|w| {
                format!(
                    "{currency}{} - {currency}{}",
                    w[0].trunc() as i64,
                    w[1].trunc() as i64
                )
            })
            .collect();
        Some(QuantileBins { edges, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Bucket index of `v`, `None` when it falls outside every bucket.
    pub fn category_of(&self, v: f64) -> Option<usize> {
        let first = *self.edges.first()?;
        if v == first {
            return Some(0);
        }
        self.edges
            .windows(2)
            .position(|w| v > w[0] && v <= w[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_interpolate_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(median(&v), Some(2.5));
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[100.0, 300.0]), Some(200.0));
    }

    #[test]
    fn box_stats_flags_outliers() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let b = box_stats(&v).unwrap();
        assert_eq!(b.median, 3.5);
        assert_eq!(b.outliers, vec![100.0]);
        assert_eq!(b.upper_whisker, 5.0);
        assert_eq!(b.lower_whisker, 1.0);
    }

    #[test]
    fn histogram_closes_last_bin() {
        let h = histogram(&[0.0, 1.0, 2.0, 10.0], 5).unwrap();
        assert_eq!(h.edges.len(), 6);
        assert_eq!(h.counts, vec![2, 1, 0, 0, 1]);
        assert_eq!(h.bin_width(), 2.0);
    }

    #[test]
    fn histogram_of_constant_column() {
        let h = histogram(&[3.0, 3.0], 20).unwrap();
        assert_eq!(h.counts, vec![2]);
        assert!(histogram(&[], 20).is_none());
    }

    #[test]
    fn fit_recovers_exact_line() {
        let pts = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)];
        let fit = linear_fit(&pts).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.predict(3.0), 7.0);
    }

    #[test]
    fn fit_needs_two_distinct_x() {
        assert!(linear_fit(&[(1.0, 2.0)]).is_none());
        assert!(linear_fit(&[(1.0, 2.0), (1.0, 5.0)]).is_none());
    }

    #[test]
    fn quantile_bins_drop_duplicate_edges() {
        let bins = QuantileBins::new(&[10.0, 10.0, 10.0, 20.0], "₹").unwrap();
        assert_eq!(bins.edges, vec![10.0, 12.5, 20.0]);
        assert_eq!(bins.labels, vec!["₹10 - ₹12", "₹12 - ₹20"]);
        assert_eq!(bins.category_of(10.0), Some(0));
        assert_eq!(bins.category_of(12.5), Some(0));
        assert_eq!(bins.category_of(20.0), Some(1));
        assert_eq!(bins.category_of(25.0), None);
    }

    #[test]
    fn quantile_bins_of_constant_values() {
        let bins = QuantileBins::new(&[5.0, 5.0], "$").unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins.labels, vec!["$5 - $5"]);
        assert_eq!(bins.category_of(5.0), Some(0));
    }
}
