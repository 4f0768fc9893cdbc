//! Band scale over discrete keys.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::broadcaster::Broadcaster;
use crate::error::{ChartError, Result};
use crate::extent::{as_key, number};
use crate::scale::{CategoryExtents, Scale, ScaleId};

/// Default inner padding, as a proportion of the band width.
pub const DEFAULT_INNER_PADDING: f64 = 0.3;
/// Default outer padding, as a proportion of the band width.
pub const DEFAULT_OUTER_PADDING: f64 = 0.5;

struct CategoryState {
    domain: Vec<String>,
    range: (f64, f64),
    inner_padding: f64,
    outer_padding: f64,
    extents: CategoryExtents,
    auto_domain_automatically: bool,
}

struct CategoryInner {
    id: ScaleId,
    state: RefCell<CategoryState>,
    broadcaster: Broadcaster<Scale>,
}

/// Band geometry derived from the domain, range, and paddings.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bands {
    first_start: f64,
    step: f64,
    band: f64,
    reversed: bool,
}

/// Shared handle to a category (band) scale.
#[derive(Clone)]
pub struct CategoryScale {
    inner: Rc<CategoryInner>,
}

impl Default for CategoryScale {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryScale {
    /// Create an empty category scale with range `[0, 1]`.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(CategoryInner {
                id: ScaleId::next(),
                state: RefCell::new(CategoryState {
                    domain: Vec::new(),
                    range: (0.0, 1.0),
                    inner_padding: DEFAULT_INNER_PADDING,
                    outer_padding: DEFAULT_OUTER_PADDING,
                    extents: CategoryExtents::default(),
                    auto_domain_automatically: true,
                }),
                broadcaster: Broadcaster::new(),
            }),
        }
    }

    /// Scale identifier.
    pub fn id(&self) -> ScaleId {
        self.inner.id
    }

    /// Listener hub fired when the domain or padding changes.
    pub fn broadcaster(&self) -> &Broadcaster<Scale> {
        &self.inner.broadcaster
    }

    /// Current categories.
    pub fn domain(&self) -> Vec<String> {
        self.inner.state.borrow().domain.clone()
    }

    /// Set explicit categories; automatic domaining stops.
    pub fn set_domain<I, S>(&self, domain: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.state.borrow_mut().auto_domain_automatically = false;
        self.apply_domain(domain.into_iter().map(Into::into).collect());
    }

    /// Output range.
    pub fn range(&self) -> (f64, f64) {
        self.inner.state.borrow().range
    }

    /// Set the output range. Not broadcast.
    pub fn set_range(&self, start: f64, end: f64) {
        self.inner.state.borrow_mut().range = (start, end);
    }

    /// Inner padding as a proportion of band width.
    pub fn inner_padding(&self) -> f64 {
        self.inner.state.borrow().inner_padding
    }

    /// Set the inner padding and notify listeners.
    pub fn set_inner_padding(&self, padding: f64) {
        self.inner.state.borrow_mut().inner_padding = padding.max(0.0);
        self.notify();
    }

    /// Outer padding as a proportion of band width.
    pub fn outer_padding(&self) -> f64 {
        self.inner.state.borrow().outer_padding
    }

    /// Set the outer padding and notify listeners.
    pub fn set_outer_padding(&self, padding: f64) {
        self.inner.state.borrow_mut().outer_padding = padding.max(0.0);
        self.notify();
    }

    fn bands(&self) -> Bands {
        let state = self.inner.state.borrow();
        let count = state.domain.len() as f64;
        let inner = 1.0 - 1.0 / (1.0 + state.inner_padding);
        let outer = state.outer_padding / (1.0 + state.inner_padding);
        let (low, high, reversed) = if state.range.1 < state.range.0 {
            (state.range.1, state.range.0, true)
        } else {
            (state.range.0, state.range.1, false)
        };
        let slots = count - inner + 2.0 * outer;
        let step = if count == 0.0 || slots <= 0.0 {
            0.0
        } else {
            (high - low) / slots
        };
        Bands {
            first_start: low + step * outer,
            step,
            band: step * (1.0 - inner),
            reversed,
        }
    }

    /// Width of one band in pixels.
    pub fn range_band(&self) -> f64 {
        self.bands().band
    }

    /// Band width plus the padding between adjacent bands.
    pub fn step_width(&self) -> f64 {
        self.range_band() * (1.0 + self.inner_padding())
    }

    /// Start of the band for a category.
    pub fn band_start(&self, key: &str) -> Option<f64> {
        let index = self.inner.state.borrow().domain.iter().position(|k| k == key)?;
        let count = self.inner.state.borrow().domain.len();
        let bands = self.bands();
        let slot = if bands.reversed {
            count - 1 - index
        } else {
            index
        };
        Some(bands.first_start + slot as f64 * bands.step)
    }

    /// Start and end of the band for a category.
    ///
    /// Fails for keys outside the domain and for an empty range.
    pub fn band(&self, key: &str) -> Result<(f64, f64)> {
        let width = self.range_band();
        match self.band_start(key) {
            Some(start) if width > 0.0 => Ok((start, start + width)),
            _ => Err(ChartError::UnknownCategory(key.to_string())),
        }
    }

    /// Center of the band for a category.
    pub fn scale(&self, key: &str) -> Option<f64> {
        self.band_start(key).map(|start| start + self.range_band() / 2.0)
    }

    /// Map a record value to its band center, or `null` for unknown keys.
    pub fn scale_value(&self, value: &Value) -> Value {
        as_key(value)
            .and_then(|key| self.scale(&key))
            .map(number)
            .unwrap_or(Value::Null)
    }

    /// Register or replace the categories contributed by `(owner, attribute)`.
    pub fn update_extent(&self, owner: &str, attribute: &str, keys: Vec<String>) {
        self.inner
            .state
            .borrow_mut()
            .extents
            .update(owner, attribute, keys);
        self.auto_domain();
    }

    /// Remove the categories contributed by `(owner, attribute)`.
    pub fn remove_extent(&self, owner: &str, attribute: &str) {
        self.inner.state.borrow_mut().extents.remove(owner, attribute);
        self.auto_domain();
    }

    /// Recompute the domain from registered extents unless it was set explicitly.
    pub fn auto_domain(&self) {
        let merged = {
            let state = self.inner.state.borrow();
            if !state.auto_domain_automatically {
                return;
            }
            state.extents.merged()
        };
        self.apply_domain(merged);
    }

    /// Return to automatic domaining.
    pub fn reset_domain(&self) {
        self.inner.state.borrow_mut().auto_domain_automatically = true;
        self.auto_domain();
    }

    fn apply_domain(&self, domain: Vec<String>) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            if state.domain == domain {
                false
            } else {
                state.domain = domain;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    fn notify(&self) {
        self.inner.broadcaster.broadcast(&Scale::Category(self.clone()));
    }
}

impl fmt::Debug for CategoryScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CategoryScale")
            .field("id", &self.inner.id)
            .field("domain", &state.domain)
            .field("range", &state.range)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_geometry_uses_proportional_padding() {
        let scale = CategoryScale::new();
        scale.set_domain(["a", "b", "c"]);
        scale.set_range(0.0, 390.0);
        scale.set_inner_padding(0.0);
        scale.set_outer_padding(0.0);
        assert!((scale.range_band() - 130.0).abs() < 1e-9);
        assert_eq!(scale.scale("b"), Some(195.0));

        scale.set_inner_padding(0.3);
        scale.set_outer_padding(0.5);
        let band = scale.range_band();
        let step = scale.step_width();
        assert!((step - band * 1.3).abs() < 1e-9);
        let first = scale.band_start("a").expect("a");
        assert!((first - band * 0.5).abs() < 1e-9);
        let last = scale.band_start("c").expect("c");
        assert!((390.0 - (last + band) - band * 0.5).abs() < 1e-9);
    }

    #[test]
    fn reversed_range_reverses_bands() {
        let scale = CategoryScale::new();
        scale.set_domain(["a", "b"]);
        scale.set_inner_padding(0.0);
        scale.set_outer_padding(0.0);
        scale.set_range(100.0, 0.0);
        assert_eq!(scale.scale("a"), Some(75.0));
        assert_eq!(scale.scale("b"), Some(25.0));
        assert_eq!(scale.scale("z"), None);
        let (start, end) = scale.band("b").expect("band");
        assert!(start.abs() < 1e-9 && (end - 50.0).abs() < 1e-9);
        assert_eq!(scale.band("z"), Err(ChartError::UnknownCategory("z".into())));

        scale.set_range(0.0, 0.0);
        assert!(scale.band("a").is_err());
    }

    #[test]
    fn extents_merge_until_domain_is_explicit() {
        let scale = CategoryScale::new();
        scale.update_extent("p1", "x", vec!["a".into(), "b".into()]);
        scale.update_extent("p2", "x", vec!["b".into(), "c".into()]);
        assert_eq!(scale.domain(), vec!["a", "b", "c"]);
        scale.set_domain(["z"]);
        scale.update_extent("p3", "x", vec!["q".into()]);
        assert_eq!(scale.domain(), vec!["z"]);
    }
}
