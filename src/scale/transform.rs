//! Quantitative scale transforms.

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::extent::Extent;
use crate::scale::ticks;

pub(crate) const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Transform family of a quantitative scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuantitativeKind {
    /// Linear mapping.
    Linear,
    /// Logarithmic mapping; only positive values are defined.
    Log {
        /// Logarithm base.
        base: f64,
    },
    /// Logarithmic for `|x| >= pivot`, smoothly linear towards zero, odd-symmetric.
    ModifiedLog {
        /// Logarithm base.
        base: f64,
        /// Magnitude below which values are pulled towards linear.
        pivot: f64,
    },
    /// Linear mapping over epoch milliseconds.
    Time,
}

impl QuantitativeKind {
    /// Logarithmic kind with a validated base.
    pub fn log(base: f64) -> Result<Self> {
        validate_base(base)?;
        Ok(Self::Log { base })
    }

    /// Modified-log kind with a validated base; the pivot equals the base.
    pub fn modified_log(base: f64) -> Result<Self> {
        validate_base(base)?;
        Ok(Self::ModifiedLog { base, pivot: base })
    }

    /// Map a value into the space where the scale is linear.
    pub fn forward(self, value: f64) -> f64 {
        if !value.is_finite() {
            return f64::NAN;
        }
        match self {
            Self::Linear | Self::Time => value,
            Self::Log { base } => {
                if value <= 0.0 {
                    f64::NAN
                } else {
                    value.ln() / base.ln()
                }
            }
            Self::ModifiedLog { base, pivot } => adjusted_log(value, base, pivot),
        }
    }

    /// Invert [`QuantitativeKind::forward`].
    pub fn inverse(self, value: f64) -> f64 {
        if !value.is_finite() {
            return f64::NAN;
        }
        match self {
            Self::Linear | Self::Time => value,
            Self::Log { base } => base.powf(value),
            Self::ModifiedLog { base, pivot } => inverted_adjusted_log(value, base, pivot),
        }
    }

    /// Domain used when no extents are registered.
    pub fn default_extent(self) -> Extent {
        match self {
            Self::Linear => Extent::new(0.0, 1.0),
            Self::Log { .. } => Extent::new(1.0, 10.0),
            Self::ModifiedLog { base, .. } => Extent::new(0.0, base),
            Self::Time => {
                let now = chrono::Utc::now().timestamp_millis() as f64;
                Extent::new(now - MILLIS_PER_DAY, now)
            }
        }
    }

    /// Expand a single-value domain into a usable one.
    pub(crate) fn widen_degenerate(self, value: f64) -> Extent {
        match self {
            Self::Linear => Extent::new(value - 1.0, value + 1.0),
            Self::Time => Extent::new(value - MILLIS_PER_DAY, value + MILLIS_PER_DAY),
            Self::Log { .. } | Self::ModifiedLog { .. } => {
                let center = self.forward(value);
                if !center.is_finite() {
                    return self.default_extent();
                }
                Extent::new(self.inverse(center - 1.0), self.inverse(center + 1.0))
            }
        }
    }

    /// Extend a domain to round values.
    pub fn nice(self, domain: (f64, f64), count: usize) -> (f64, f64) {
        match self {
            Self::Linear | Self::Time => ticks::nice_linear(domain, count),
            Self::Log { base } => ticks::nice_log(domain, base),
            Self::ModifiedLog { .. } => domain,
        }
    }
}

fn validate_base(base: f64) -> Result<()> {
    if base.is_finite() && base > 1.0 {
        Ok(())
    } else {
        Err(ChartError::InvalidLogBase(base))
    }
}

/// Logarithm that bends to pass through zero below the pivot.
pub(crate) fn adjusted_log(value: f64, base: f64, pivot: f64) -> f64 {
    let sign = if value < 0.0 { -1.0 } else { 1.0 };
    let mut magnitude = value * sign;
    if magnitude < pivot {
        magnitude += (pivot - magnitude) / pivot;
    }
    sign * (magnitude.ln() / base.ln())
}

pub(crate) fn inverted_adjusted_log(value: f64, base: f64, pivot: f64) -> f64 {
    let sign = if value < 0.0 { -1.0 } else { 1.0 };
    let mut magnitude = base.powf(value * sign);
    if magnitude < pivot {
        magnitude = (pivot * (magnitude - 1.0)) / (pivot - 1.0);
    }
    sign * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_rejects_non_positive() {
        let kind = QuantitativeKind::log(10.0).expect("log");
        assert!(kind.forward(0.0).is_nan());
        assert!(kind.forward(-1.0).is_nan());
        assert!((kind.forward(1000.0) - 3.0).abs() < 1e-12);
        assert!(QuantitativeKind::log(1.0).is_err());
    }

    #[test]
    fn modified_log_is_odd_and_passes_through_zero() {
        let kind = QuantitativeKind::modified_log(10.0).expect("modified log");
        assert_eq!(kind.forward(0.0), 0.0);
        for value in [0.3, 1.0, 5.0, 10.0, 250.0, 1e6] {
            assert!((kind.forward(-value) + kind.forward(value)).abs() < 1e-12);
        }
        assert!((kind.forward(100.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn modified_log_roundtrip() {
        let kind = QuantitativeKind::modified_log(10.0).expect("modified log");
        for value in [-500.0, -3.0, 0.0, 0.5, 7.0, 42.0] {
            let back = kind.inverse(kind.forward(value));
            assert!((back - value).abs() < 1e-9, "{value} -> {back}");
        }
    }

    #[test]
    fn degenerate_domains_widen() {
        assert_eq!(QuantitativeKind::Linear.widen_degenerate(5.0), Extent::new(4.0, 6.0));
        let log = QuantitativeKind::log(10.0).expect("log");
        let widened = log.widen_degenerate(10.0);
        assert!((widened.min - 1.0).abs() < 1e-9);
        assert!((widened.max - 100.0).abs() < 1e-9);
    }
}
