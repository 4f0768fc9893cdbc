//! Tick generation and domain rounding.

use std::fmt;
use std::rc::Rc;

use crate::error::{ChartError, Result};
use crate::scale::quantitative::QuantitativeScale;

/// Default number of ticks requested from quantitative scales.
pub const DEFAULT_TICK_COUNT: usize = 10;

/// Replacement tick policy for a quantitative scale.
#[derive(Clone)]
pub enum TickGenerator {
    /// Ticks at every multiple of `interval`, plus both domain ends.
    Interval {
        /// Spacing between ticks.
        interval: f64,
    },
    /// Default ticks filtered down to integers, keeping both ends.
    Integer,
    /// Custom generator.
    Custom(Rc<dyn Fn(&QuantitativeScale) -> Vec<f64>>),
}

impl TickGenerator {
    /// Interval generator; the interval must be positive.
    pub fn interval(interval: f64) -> Result<Self> {
        if interval.is_finite() && interval > 0.0 {
            Ok(Self::Interval { interval })
        } else {
            Err(ChartError::InvalidOption {
                kind: "tick interval",
                value: interval.to_string(),
            })
        }
    }

    /// Produce ticks for a scale.
    pub fn generate(&self, scale: &QuantitativeScale) -> Vec<f64> {
        match self {
            Self::Interval { interval } => {
                let (a, b) = scale.domain();
                interval_ticks(a.min(b), a.max(b), *interval)
            }
            Self::Integer => {
                let ticks = scale.default_ticks();
                let last = ticks.len().saturating_sub(1);
                ticks
                    .iter()
                    .enumerate()
                    .filter(|(index, tick)| tick.fract() == 0.0 || *index == 0 || *index == last)
                    .map(|(_, tick)| *tick)
                    .collect()
            }
            Self::Custom(generator) => generator(scale),
        }
    }
}

impl fmt::Debug for TickGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval { interval } => write!(f, "TickGenerator::Interval({interval})"),
            Self::Integer => write!(f, "TickGenerator::Integer"),
            Self::Custom(_) => write!(f, "TickGenerator::Custom(..)"),
        }
    }
}

fn interval_ticks(low: f64, high: f64, interval: f64) -> Vec<f64> {
    if !low.is_finite() || !high.is_finite() {
        return Vec::new();
    }
    let first = (low / interval).ceil() * interval;
    let count = ((high - first) / interval).floor() as i64 + 1;
    let mut ticks = Vec::new();
    if low % interval != 0.0 {
        ticks.push(low);
    }
    ticks.extend((0..count.max(0)).map(|step| first + step as f64 * interval));
    if high % interval != 0.0 {
        ticks.push(high);
    }
    ticks
}

/// Start, stop, and step of round ticks covering a domain.
pub(crate) fn linear_tick_range(domain: (f64, f64), count: usize) -> Option<(f64, f64, f64)> {
    let (low, high) = (domain.0.min(domain.1), domain.0.max(domain.1));
    let span = high - low;
    if count == 0 || !span.is_finite() || span <= 0.0 {
        return None;
    }
    let mut step = 10_f64.powf((span / count as f64).log10().floor());
    let error = count as f64 / span * step;
    if error <= 0.15 {
        step *= 10.0;
    } else if error <= 0.35 {
        step *= 5.0;
    } else if error <= 0.75 {
        step *= 2.0;
    }
    let start = (low / step).ceil() * step;
    let stop = (high / step).floor() * step + step * 0.5;
    Some((start, stop, step))
}

/// Round ticks inside a linear domain.
pub fn linear_ticks(domain: (f64, f64), count: usize) -> Vec<f64> {
    let Some((start, stop, step)) = linear_tick_range(domain, count) else {
        return if domain.0 == domain.1 && domain.0.is_finite() {
            vec![domain.0]
        } else {
            Vec::new()
        };
    };
    let precision = if step < 1.0 {
        10_f64.powf((-step.log10()).ceil())
    } else {
        1.0
    };
    let scaled_start = (start * precision).round();
    let scaled_step = (step * precision).round();
    if scaled_step <= 0.0 {
        return Vec::new();
    }
    let mut ticks = Vec::new();
    let mut index = 0.0;
    loop {
        let value = (scaled_start + index * scaled_step) / precision;
        if value >= stop {
            break;
        }
        ticks.push(value);
        index += 1.0;
    }
    ticks
}

/// Extend a linear domain outward to multiples of its tick step.
pub fn nice_linear(domain: (f64, f64), count: usize) -> (f64, f64) {
    let Some((_, _, step)) = linear_tick_range(domain, count) else {
        return domain;
    };
    let reversed = domain.1 < domain.0;
    let (low, high) = if reversed {
        (domain.1, domain.0)
    } else {
        domain
    };
    let nice = ((low / step).floor() * step, (high / step).ceil() * step);
    if reversed { (nice.1, nice.0) } else { nice }
}

/// Extend a positive log domain to whole powers of the base.
pub fn nice_log(domain: (f64, f64), base: f64) -> (f64, f64) {
    let (low, high) = (domain.0.min(domain.1), domain.0.max(domain.1));
    if low <= 0.0 || !high.is_finite() {
        return domain;
    }
    let log = |value: f64| value.ln() / base.ln();
    let nice = (
        base.powi(log(low).floor() as i32),
        base.powi(log(high).ceil() as i32),
    );
    if domain.1 < domain.0 {
        (nice.1, nice.0)
    } else {
        nice
    }
}

/// Ticks at `k * base^i` inside a positive log domain.
pub fn log_ticks(domain: (f64, f64), base: f64) -> Vec<f64> {
    let (low, high) = (domain.0.min(domain.1), domain.0.max(domain.1));
    if low <= 0.0 || !high.is_finite() {
        return Vec::new();
    }
    let log = |value: f64| value.ln() / base.ln();
    let first = log(low).floor() as i32;
    let last = log(high).ceil() as i32;
    let multiples = if base.fract() != 0.0 { 2 } else { base as i32 };
    let mut ticks = Vec::new();
    for exponent in first..last {
        let power = base.powi(exponent);
        for multiple in 1..multiples {
            ticks.push(power * multiple as f64);
        }
    }
    ticks.push(base.powi(last));
    ticks
        .into_iter()
        .filter(|tick| *tick >= low * (1.0 - 1e-12) && *tick <= high * (1.0 + 1e-12))
        .collect()
}

/// Parameters for modified-log tick placement.
pub(crate) struct ModifiedLogTicks {
    pub(crate) base: f64,
    pub(crate) pivot: f64,
    pub(crate) count: usize,
    pub(crate) show_intermediate: bool,
}

impl ModifiedLogTicks {
    fn adjusted(&self, value: f64) -> f64 {
        crate::scale::transform::adjusted_log(value, self.base, self.pivot)
    }

    fn how_many(&self, domain: (f64, f64), lower: f64, upper: f64) -> usize {
        let (low, high) = (domain.0.min(domain.1), domain.0.max(domain.1));
        let full = self.adjusted(high) - self.adjusted(low);
        if full <= 0.0 || !full.is_finite() {
            return 0;
        }
        let proportion = (self.adjusted(upper) - self.adjusted(lower)) / full;
        (proportion * self.count as f64).ceil().max(0.0) as usize
    }

    fn log_ticks(&self, domain: (f64, f64), lower: f64, upper: f64) -> Vec<f64> {
        let count = self.how_many(domain, lower, upper);
        if count == 0 || lower <= 0.0 {
            return Vec::new();
        }
        let log = |value: f64| value.ln() / self.base.ln();
        let start = log(lower).floor() as i64;
        let end = log(upper).ceil() as i64;
        let stride = (((end - start) as f64) / count as f64).ceil().max(1.0) as i64;
        let bases: Vec<i64> = std::iter::successors(Some(end), |base| Some(base - stride))
            .take_while(|base| *base > start)
            .collect();
        if bases.is_empty() {
            return Vec::new();
        }
        let multiples_per_base = if self.show_intermediate {
            (count / bases.len()).max(1)
        } else {
            1
        };
        let increment = (self.base - 1.0) / multiples_per_base as f64;
        let mut multiples: Vec<f64> = Vec::new();
        let mut value = self.base;
        while value > 1.0 {
            let floored = value.floor();
            if !multiples.contains(&floored) {
                multiples.push(floored);
            }
            value -= increment;
        }
        let mut ticks: Vec<f64> = bases
            .iter()
            .flat_map(|base| {
                let power = self.base.powi(*base as i32 - 1);
                multiples.iter().map(move |multiple| power * multiple)
            })
            .filter(|tick| *tick >= lower && *tick <= upper)
            .collect();
        ticks.sort_by(f64::total_cmp);
        ticks
    }

    /// Ticks for a modified-log domain: log ticks on each side, linear in the middle.
    pub(crate) fn generate(&self, domain: (f64, f64)) -> Vec<f64> {
        let (low, high) = (domain.0.min(domain.1), domain.0.max(domain.1));
        let middle = |a: f64, b: f64, c: f64| {
            let mut values = [a, b, c];
            values.sort_by(f64::total_cmp);
            values[1]
        };
        let negative_upper = middle(low, high, -self.pivot);
        let positive_lower = middle(low, high, self.pivot);
        let mut negative: Vec<f64> = self
            .log_ticks(domain, -negative_upper, -low)
            .into_iter()
            .map(|tick| -tick)
            .collect();
        negative.reverse();
        let linear = if self.show_intermediate {
            let count = self.how_many(domain, negative_upper, positive_lower);
            linear_ticks((negative_upper, positive_lower), count)
        } else {
            [-self.pivot, 0.0, self.pivot]
                .into_iter()
                .filter(|tick| *tick >= low && *tick <= high)
                .collect()
        };
        let positive = self.log_ticks(domain, positive_lower, high);
        let mut ticks = negative;
        ticks.extend(linear);
        ticks.extend(positive);
        if ticks.len() <= 1 {
            return linear_ticks((low, high), self.count);
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_ticks_are_round() {
        assert_eq!(
            linear_ticks((0.0, 1.0), 10),
            vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]
        );
        assert_eq!(linear_ticks((0.0, 100.0), 5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
    }

    #[test]
    fn nice_extends_outward() {
        assert_eq!(nice_linear((0.13, 9.7), 10), (0.0, 10.0));
        assert_eq!(nice_linear((9.7, 0.13), 10), (10.0, 0.0));
        assert_eq!(nice_log((3.0, 420.0), 10.0), (1.0, 1000.0));
    }

    #[test]
    fn log_ticks_cover_decades() {
        let ticks = log_ticks((1.0, 100.0), 10.0);
        assert_eq!(ticks.first().copied(), Some(1.0));
        assert_eq!(ticks.last().copied(), Some(100.0));
        assert_eq!(ticks.len(), 19);
    }

    #[test]
    fn interval_ticks_include_domain_ends() {
        assert_eq!(interval_ticks(1.0, 9.0, 4.0), vec![1.0, 4.0, 8.0, 9.0]);
        assert_eq!(interval_ticks(0.0, 8.0, 4.0), vec![0.0, 4.0, 8.0]);
        assert!(TickGenerator::interval(0.0).is_err());
    }

    #[test]
    fn modified_log_ticks_are_symmetric() {
        let generator = ModifiedLogTicks {
            base: 10.0,
            pivot: 10.0,
            count: 10,
            show_intermediate: false,
        };
        let ticks = generator.generate((-1000.0, 1000.0));
        assert!(ticks.contains(&0.0));
        assert!(ticks.contains(&1000.0));
        assert!(ticks.contains(&-1000.0));
        let negatives = ticks.iter().filter(|tick| **tick < 0.0).count();
        let positives = ticks.iter().filter(|tick| **tick > 0.0).count();
        assert_eq!(negatives, positives);
    }
}
