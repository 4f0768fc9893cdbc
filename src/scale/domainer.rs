//! Domain policy for quantitative scales.
//!
//! A [`Domainer`] turns the extents registered on a scale into a domain:
//! combine, include required values, pad in the scale's visual space, then
//! optionally round outward.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::extent::Extent;
use crate::scale::ticks::DEFAULT_TICK_COUNT;
use crate::scale::transform::QuantitativeKind;

/// Padding proportion used by [`Domainer::pad`].
pub const DEFAULT_PAD_PROPORTION: f64 = 0.05;

type CombineExtents = Rc<dyn Fn(&[Extent]) -> Option<Extent>>;

/// Policy that computes a domain from registered extents.
#[derive(Clone, Default)]
pub struct Domainer {
    combine: Option<CombineExtents>,
    pad_proportion: f64,
    padding_exceptions: IndexMap<String, f64>,
    unkeyed_padding_exceptions: Vec<f64>,
    included_values: IndexMap<String, f64>,
    unkeyed_included_values: Vec<f64>,
    nice_count: Option<usize>,
}

impl Domainer {
    /// Domainer with no padding and no rounding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom extent combiner instead of min-of-mins/max-of-maxes.
    pub fn with_combine(mut self, combine: impl Fn(&[Extent]) -> Option<Extent> + 'static) -> Self {
        self.combine = Some(Rc::new(combine));
        self
    }

    /// Pad each side by the default proportion of the visual span.
    pub fn pad(self) -> Self {
        self.pad_by(DEFAULT_PAD_PROPORTION)
    }

    /// Pad each side by `proportion` of the visual span.
    pub fn pad_by(mut self, proportion: f64) -> Self {
        self.pad_proportion = proportion.max(0.0);
        self
    }

    /// Current padding proportion.
    pub fn pad_proportion(&self) -> f64 {
        self.pad_proportion
    }

    /// Round the domain outward using the default tick count.
    pub fn nice(self) -> Self {
        self.nice_with(DEFAULT_TICK_COUNT)
    }

    /// Round the domain outward to ticks for `count` intervals.
    pub fn nice_with(mut self, count: usize) -> Self {
        self.nice_count = Some(count);
        self
    }

    /// Whether rounding is enabled.
    pub fn is_nice(&self) -> bool {
        self.nice_count.is_some()
    }

    /// Exempt a value from padding. Keyed exceptions replace earlier ones with the same key.
    pub fn add_padding_exception(&mut self, value: f64, key: Option<&str>) -> &mut Self {
        match key {
            Some(key) => {
                self.padding_exceptions.insert(key.to_string(), value);
            }
            None => self.unkeyed_padding_exceptions.push(value),
        }
        self
    }

    /// Remove a keyed padding exception, or every unkeyed exception equal to `value`.
    pub fn remove_padding_exception(&mut self, value: f64, key: Option<&str>) -> &mut Self {
        match key {
            Some(key) => {
                self.padding_exceptions.shift_remove(key);
            }
            None => self.unkeyed_padding_exceptions.retain(|existing| *existing != value),
        }
        self
    }

    /// Force the domain to cover a value.
    pub fn add_included_value(&mut self, value: f64, key: Option<&str>) -> &mut Self {
        match key {
            Some(key) => {
                self.included_values.insert(key.to_string(), value);
            }
            None => self.unkeyed_included_values.push(value),
        }
        self
    }

    /// Remove an included value.
    pub fn remove_included_value(&mut self, value: f64, key: Option<&str>) -> &mut Self {
        match key {
            Some(key) => {
                self.included_values.shift_remove(key);
            }
            None => self.unkeyed_included_values.retain(|existing| *existing != value),
        }
        self
    }

    /// Compute a domain for a scale of `kind` from registered extents.
    pub fn compute_domain(&self, extents: &[Extent], kind: QuantitativeKind) -> Extent {
        let combined = match &self.combine {
            Some(combine) => combine(extents),
            None => extents
                .iter()
                .copied()
                .filter(Extent::is_finite)
                .reduce(|a, b| Extent::new(a.min.min(b.min), a.max.max(b.max))),
        };
        let mut domain = combined.unwrap_or_else(|| kind.default_extent());
        for value in self.included_values() {
            domain.expand_to_include(value);
        }
        let domain = self.pad_domain(domain, kind);
        match self.nice_count {
            Some(count) => {
                let (min, max) = kind.nice((domain.min, domain.max), count);
                Extent::new(min, max)
            }
            None => domain,
        }
    }

    fn included_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.included_values
            .values()
            .chain(self.unkeyed_included_values.iter())
            .copied()
    }

    fn is_padding_exception(&self, value: f64) -> bool {
        self.padding_exceptions.values().any(|exception| *exception == value)
            || self.unkeyed_padding_exceptions.contains(&value)
    }

    fn pad_domain(&self, domain: Extent, kind: QuantitativeKind) -> Extent {
        if domain.min == domain.max {
            return kind.widen_degenerate(domain.min);
        }
        if self.pad_proportion <= 0.0 {
            return domain;
        }
        let low = kind.forward(domain.min);
        let high = kind.forward(domain.max);
        if !low.is_finite() || !high.is_finite() {
            return domain;
        }
        let padding = (high - low) * self.pad_proportion;
        let min = if self.is_padding_exception(domain.min) {
            domain.min
        } else {
            kind.inverse(low - padding)
        };
        let max = if self.is_padding_exception(domain.max) {
            domain.max
        } else {
            kind.inverse(high + padding)
        };
        Extent::new(min, max)
    }
}

impl fmt::Debug for Domainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domainer")
            .field("pad_proportion", &self.pad_proportion)
            .field("padding_exceptions", &self.padding_exceptions)
            .field("included_values", &self.included_values)
            .field("nice_count", &self.nice_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents() -> Vec<Extent> {
        vec![Extent::new(1.0, 5.0), Extent::new(3.0, 10.0)]
    }

    #[test]
    fn combines_without_padding() {
        let domain = Domainer::new().compute_domain(&extents(), QuantitativeKind::Linear);
        assert_eq!(domain, Extent::new(1.0, 10.0));
    }

    #[test]
    fn linear_padding_is_symmetric() {
        let domain = Domainer::new()
            .pad_by(0.1)
            .compute_domain(&extents(), QuantitativeKind::Linear);
        assert!((domain.min - 0.1).abs() < 1e-9);
        assert!((domain.max - 10.9).abs() < 1e-9);
    }

    #[test]
    fn log_padding_is_multiplicative() {
        let kind = QuantitativeKind::log(10.0).expect("log");
        let domain = Domainer::new()
            .pad_by(0.5)
            .compute_domain(&[Extent::new(10.0, 100.0)], kind);
        assert!((domain.min - 10_f64.powf(0.5)).abs() < 1e-9);
        assert!((domain.max - 10_f64.powf(2.5)).abs() < 1e-6);
    }

    #[test]
    fn padding_exceptions_pin_their_side() {
        let mut domainer = Domainer::new().pad_by(0.1);
        domainer.add_padding_exception(0.0, Some("baseline"));
        let domain = domainer.compute_domain(&[Extent::new(0.0, 10.0)], QuantitativeKind::Linear);
        assert_eq!(domain.min, 0.0);
        assert!((domain.max - 11.0).abs() < 1e-9);
        domainer.remove_padding_exception(0.0, Some("baseline"));
        let domain = domainer.compute_domain(&[Extent::new(0.0, 10.0)], QuantitativeKind::Linear);
        assert!((domain.min + 1.0).abs() < 1e-9);
    }

    #[test]
    fn included_values_extend_domain() {
        let mut domainer = Domainer::new();
        domainer.add_included_value(0.0, None);
        let domain = domainer.compute_domain(&[Extent::new(3.0, 7.0)], QuantitativeKind::Linear);
        assert_eq!(domain, Extent::new(0.0, 7.0));
    }

    #[test]
    fn empty_and_degenerate_inputs() {
        let domainer = Domainer::new();
        assert_eq!(
            domainer.compute_domain(&[], QuantitativeKind::Linear),
            Extent::new(0.0, 1.0)
        );
        assert_eq!(
            domainer.compute_domain(&[Extent::new(4.0, 4.0)], QuantitativeKind::Linear),
            Extent::new(3.0, 5.0)
        );
    }

    #[test]
    fn nice_rounds_outward() {
        let domain = Domainer::new()
            .nice()
            .compute_domain(&[Extent::new(0.13, 9.7)], QuantitativeKind::Linear);
        assert_eq!(domain, Extent::new(0.0, 10.0));
    }
}
