//! Statistics Calculator Module
//! Axis ticks, histogram binning and the percentage/number formats used in
//! chart annotations.

use statrs::statistics::Statistics;

/// Bin count used by the yearly-totals histogram.
pub const HISTOGRAM_BINS: usize = 25;

/// Equal-width histogram over the data range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Stateless helpers shared by the chart aggregations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Tick spacing for the continent top-five bars.
    ///
    /// Leading digit of `max` times the order of magnitude of `max / 10`,
    /// e.g. 1,234,567 → 100,000 and 48,000 → 4,000. Values below one give a
    /// zero step, so anything non-positive or non-finite becomes 1.
    pub fn tick_step(max: f64) -> f64 {
        if !max.is_finite() || max < 1.0 {
            return 1.0;
        }

        let whole = max.floor() as u64;
        let leading = whole
            .to_string()
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0) as f64;
        let tenth_digits = ((max / 10.0).floor() as u64).to_string().len() as i32;
        let step = leading * 10f64.powi(tenth_digits - 1);

        if step.is_finite() && step > 0.0 {
            step
        } else {
            1.0
        }
    }

    /// Number of ticks so the axis reaches `max` plus ten percent.
    pub fn tick_count(max: f64, step: f64) -> usize {
        if step <= 0.0 || !max.is_finite() || max <= 0.0 {
            return 1;
        }
        ((max * 1.1) / step).ceil().max(1.0) as usize
    }

    /// Equal-width bins over `[min, max]`; the last bin is closed.
    ///
    /// A constant series gets a unit-wide range centred on its value.
    pub fn histogram(values: &[f64], bins: usize) -> Histogram {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

        let (mut lo, mut hi) = if finite.is_empty() {
            (0.0, 1.0)
        } else {
            (Statistics::min(&finite), Statistics::max(&finite))
        };
        if hi <= lo {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];

        for v in finite {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Histogram { edges, counts }
    }

    /// Share of `total` as a percentage; zero when the total is zero.
    pub fn percent_of(value: f64, total: f64) -> f64 {
        if total == 0.0 {
            0.0
        } else {
            value / total * 100.0
        }
    }

    /// `12.3%` style label.
    pub fn format_percent(percent: f64) -> String {
        format!("{:.1}%", percent)
    }

    /// Rounded value with comma thousands separators: `1234567.4` → `1,234,567`.
    pub fn format_thousands(value: f64) -> String {
        let rounded = value.round();
        let digits = format!("{:.0}", rounded.abs());
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        if rounded < 0.0 {
            out.insert(0, '-');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_step_uses_leading_digit_and_magnitude() {
        assert_eq!(StatsCalculator::tick_step(1_234_567.0), 100_000.0);
        assert_eq!(StatsCalculator::tick_step(48_000.0), 4_000.0);
        assert_eq!(StatsCalculator::tick_step(950.0), 90.0);
        assert_eq!(StatsCalculator::tick_step(5.0), 5.0);
        assert_eq!(StatsCalculator::tick_step(10.0), 1.0);
    }

    #[test]
    fn degenerate_tick_step_falls_back_to_one() {
        assert_eq!(StatsCalculator::tick_step(0.5), 1.0);
        assert_eq!(StatsCalculator::tick_step(0.0), 1.0);
        assert_eq!(StatsCalculator::tick_step(-20.0), 1.0);
        assert_eq!(StatsCalculator::tick_step(f64::NAN), 1.0);
    }

    #[test]
    fn tick_count_covers_max_plus_margin() {
        assert_eq!(StatsCalculator::tick_count(1_234_567.0, 100_000.0), 14);
        assert_eq!(StatsCalculator::tick_count(0.0, 1.0), 1);
    }

    #[test]
    fn histogram_counts_every_value() {
        let values: Vec<f64> = (0..74).map(|i| 10_000.0 + i as f64 * 2_500.0).collect();
        let hist = StatsCalculator::histogram(&values, HISTOGRAM_BINS);

        assert_eq!(hist.counts.len(), HISTOGRAM_BINS);
        assert_eq!(hist.edges.len(), HISTOGRAM_BINS + 1);
        assert_eq!(hist.total(), values.len());
        assert_eq!(hist.edges[0], 10_000.0);
        assert!((hist.edges[HISTOGRAM_BINS] - 192_500.0).abs() < 1e-6);
        assert!(hist.counts[HISTOGRAM_BINS - 1] >= 1);
    }

    #[test]
    fn histogram_of_constant_series() {
        let hist = StatsCalculator::histogram(&[7.0, 7.0, 7.0], 4);
        assert_eq!(hist.total(), 3);
        assert_eq!(hist.edges[0], 6.5);
        assert_eq!(hist.max_count(), 3);
    }

    #[test]
    fn percent_is_relative_to_total() {
        assert_eq!(StatsCalculator::percent_of(25.0, 200.0), 12.5);
        assert_eq!(StatsCalculator::percent_of(25.0, 0.0), 0.0);
        assert_eq!(StatsCalculator::format_percent(12.345), "12.3%");
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(StatsCalculator::format_thousands(0.0), "0");
        assert_eq!(StatsCalculator::format_thousands(999.0), "999");
        assert_eq!(StatsCalculator::format_thousands(1000.0), "1,000");
        assert_eq!(StatsCalculator::format_thousands(1_234_567.4), "1,234,567");
        assert_eq!(StatsCalculator::format_thousands(-45_000.0), "-45,000");
    }
}
