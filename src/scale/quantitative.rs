//! Continuous scales: linear, log, modified-log, and time.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::broadcaster::Broadcaster;
use crate::error::{ChartError, Result};
use crate::extent::{Extent, as_number, number};
use crate::scale::domainer::Domainer;
use crate::scale::ticks::{self, DEFAULT_TICK_COUNT, ModifiedLogTicks, TickGenerator};
use crate::scale::transform::QuantitativeKind;
use crate::scale::{Scale, ScaleId};

struct QuantitativeState {
    kind: QuantitativeKind,
    domain: (f64, f64),
    range: (f64, f64),
    clamp: bool,
    extents: IndexMap<(String, String), Extent>,
    auto_domain_automatically: bool,
    domainer: Domainer,
    user_set_domainer: bool,
    tick_generator: Option<TickGenerator>,
    tick_count: usize,
    show_intermediate_ticks: bool,
}

struct QuantitativeInner {
    id: ScaleId,
    state: RefCell<QuantitativeState>,
    broadcaster: Broadcaster<Scale>,
}

/// Shared handle to a continuous scale.
#[derive(Clone)]
pub struct QuantitativeScale {
    inner: Rc<QuantitativeInner>,
}

impl QuantitativeScale {
    /// Create a scale of the given kind with its default domain and range `[0, 1]`.
    pub fn new(kind: QuantitativeKind) -> Self {
        let default = kind.default_extent();
        Self {
            inner: Rc::new(QuantitativeInner {
                id: ScaleId::next(),
                state: RefCell::new(QuantitativeState {
                    kind,
                    domain: (default.min, default.max),
                    range: (0.0, 1.0),
                    clamp: false,
                    extents: IndexMap::new(),
                    auto_domain_automatically: true,
                    domainer: Domainer::new(),
                    user_set_domainer: false,
                    tick_generator: None,
                    tick_count: DEFAULT_TICK_COUNT,
                    show_intermediate_ticks: false,
                }),
                broadcaster: Broadcaster::new(),
            }),
        }
    }

    /// Linear scale.
    pub fn linear() -> Self {
        Self::new(QuantitativeKind::Linear)
    }

    /// Logarithmic scale; the base must exceed one.
    pub fn log(base: f64) -> Result<Self> {
        Ok(Self::new(QuantitativeKind::log(base)?))
    }

    /// Modified-log scale; the base must exceed one.
    pub fn modified_log(base: f64) -> Result<Self> {
        Ok(Self::new(QuantitativeKind::modified_log(base)?))
    }

    /// Time scale over epoch milliseconds.
    pub fn time() -> Self {
        Self::new(QuantitativeKind::Time)
    }

    /// Scale identifier.
    pub fn id(&self) -> ScaleId {
        self.inner.id
    }

    /// Transform family.
    pub fn kind(&self) -> QuantitativeKind {
        self.inner.state.borrow().kind
    }

    /// Check whether two handles refer to the same scale.
    pub fn ptr_eq(&self, other: &QuantitativeScale) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Listener hub fired when the domain changes.
    pub fn broadcaster(&self) -> &Broadcaster<Scale> {
        &self.inner.broadcaster
    }

    /// Coerce a record value to the number this scale maps.
    ///
    /// Time scales also accept RFC 3339 timestamps and `YYYY-MM-DD` dates.
    pub fn coerce(&self, value: &Value) -> f64 {
        if self.kind() == QuantitativeKind::Time
            && let Value::String(text) = value
        {
            return parse_time(text).unwrap_or(f64::NAN);
        }
        as_number(value)
    }

    /// Map a domain value to the range.
    pub fn scale(&self, value: f64) -> f64 {
        let state = self.inner.state.borrow();
        let kind = state.kind;
        let low = kind.forward(state.domain.0);
        let high = kind.forward(state.domain.1);
        let x = kind.forward(value);
        if !x.is_finite() {
            return f64::NAN;
        }
        let span = high - low;
        let mut t = if span == 0.0 { 0.0 } else { (x - low) / span };
        if state.clamp {
            t = t.clamp(0.0, 1.0);
        }
        state.range.0 + t * (state.range.1 - state.range.0)
    }

    /// Map a record value to the range; unmappable values become `null`.
    pub fn scale_value(&self, value: &Value) -> Value {
        number(self.scale(self.coerce(value)))
    }

    /// Map a range value back to the domain.
    pub fn invert(&self, value: f64) -> f64 {
        let state = self.inner.state.borrow();
        let kind = state.kind;
        let low = kind.forward(state.domain.0);
        let high = kind.forward(state.domain.1);
        let span = state.range.1 - state.range.0;
        let mut t = if span == 0.0 {
            0.0
        } else {
            (value - state.range.0) / span
        };
        if state.clamp {
            t = t.clamp(0.0, 1.0);
        }
        kind.inverse(low + t * (high - low))
    }

    /// Current domain as `(start, end)`.
    pub fn domain(&self) -> (f64, f64) {
        self.inner.state.borrow().domain
    }

    /// Set an explicit domain; automatic domaining stops until [`QuantitativeScale::reset_domain`].
    pub fn set_domain(&self, start: f64, end: f64) -> Result<()> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ChartError::InvalidDomain {
                min: start,
                max: end,
            });
        }
        if let QuantitativeKind::Log { .. } = self.kind()
            && (start <= 0.0 || end <= 0.0)
        {
            tracing::warn!(start, end, "log scale domain includes non-positive values");
        }
        self.inner.state.borrow_mut().auto_domain_automatically = false;
        self.apply_domain(start, end);
        Ok(())
    }

    /// Current range as `(start, end)`.
    pub fn range(&self) -> (f64, f64) {
        self.inner.state.borrow().range
    }

    /// Set the output range. Range changes are driven by layout and are not broadcast.
    pub fn set_range(&self, start: f64, end: f64) {
        self.inner.state.borrow_mut().range = (start, end);
    }

    /// Whether output is clamped to the range.
    pub fn clamp(&self) -> bool {
        self.inner.state.borrow().clamp
    }

    /// Enable or disable clamping.
    pub fn set_clamp(&self, clamp: bool) {
        self.inner.state.borrow_mut().clamp = clamp;
    }

    /// Whether the domain follows the registered extents.
    pub fn is_auto_domain(&self) -> bool {
        self.inner.state.borrow().auto_domain_automatically
    }

    /// Recompute the domain from the registered extents.
    ///
    /// This is a no-op once an explicit domain was set.
    pub fn auto_domain(&self) {
        if self.is_auto_domain() {
            self.recompute_domain();
        }
    }

    /// Return to automatic domaining and recompute immediately.
    pub fn reset_domain(&self) {
        self.inner.state.borrow_mut().auto_domain_automatically = true;
        self.recompute_domain();
    }

    /// Register or replace the extent contributed by `(owner, attribute)`.
    pub fn update_extent(&self, owner: &str, attribute: &str, extent: Extent) {
        self.inner
            .state
            .borrow_mut()
            .extents
            .insert((owner.to_string(), attribute.to_string()), extent);
        self.auto_domain();
    }

    /// Remove the extent contributed by `(owner, attribute)`.
    pub fn remove_extent(&self, owner: &str, attribute: &str) {
        let removed = self
            .inner
            .state
            .borrow_mut()
            .extents
            .shift_remove(&(owner.to_string(), attribute.to_string()))
            .is_some();
        if removed {
            self.auto_domain();
        }
    }

    /// All registered extents in registration order.
    pub fn extents(&self) -> Vec<Extent> {
        self.inner.state.borrow().extents.values().copied().collect()
    }

    /// Current domainer.
    pub fn domainer(&self) -> Domainer {
        self.inner.state.borrow().domainer.clone()
    }

    /// Replace the domainer. Plots stop adjusting it afterwards.
    pub fn set_domainer(&self, domainer: Domainer) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.domainer = domainer;
            state.user_set_domainer = true;
        }
        self.auto_domain();
    }

    /// Adjust the domainer on behalf of a plot unless the user supplied one.
    pub(crate) fn adjust_default_domainer(&self, adjust: impl FnOnce(&mut Domainer)) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.user_set_domainer {
                return;
            }
            adjust(&mut state.domainer);
        }
        self.auto_domain();
    }

    /// Edit the domainer in place, whoever supplied it, and re-domain.
    pub(crate) fn update_domainer(&self, update: impl FnOnce(&mut Domainer)) {
        update(&mut self.inner.state.borrow_mut().domainer);
        self.auto_domain();
    }

    /// Number of ticks requested from the default generator.
    pub fn tick_count(&self) -> usize {
        self.inner.state.borrow().tick_count
    }

    /// Set the number of ticks requested from the default generator.
    pub fn set_tick_count(&self, count: usize) {
        self.inner.state.borrow_mut().tick_count = count;
    }

    /// Replace the tick policy.
    pub fn set_tick_generator(&self, generator: Option<TickGenerator>) {
        self.inner.state.borrow_mut().tick_generator = generator;
    }

    /// Whether modified-log ticks include values between powers.
    pub fn show_intermediate_ticks(&self) -> bool {
        self.inner.state.borrow().show_intermediate_ticks
    }

    /// Toggle intermediate modified-log ticks.
    pub fn set_show_intermediate_ticks(&self, show: bool) {
        self.inner.state.borrow_mut().show_intermediate_ticks = show;
    }

    /// Tick values, from the custom generator if one is set.
    pub fn ticks(&self) -> Vec<f64> {
        let generator = self.inner.state.borrow().tick_generator.clone();
        match generator {
            Some(generator) => generator.generate(self),
            None => self.default_ticks(),
        }
    }

    /// Tick values from the kind's own algorithm.
    pub fn default_ticks(&self) -> Vec<f64> {
        let state = self.inner.state.borrow();
        match state.kind {
            QuantitativeKind::Linear | QuantitativeKind::Time => {
                ticks::linear_ticks(state.domain, state.tick_count)
            }
            QuantitativeKind::Log { base } => ticks::log_ticks(state.domain, base),
            QuantitativeKind::ModifiedLog { base, pivot } => ModifiedLogTicks {
                base,
                pivot,
                count: state.tick_count,
                show_intermediate: state.show_intermediate_ticks,
            }
            .generate(state.domain),
        }
    }

    fn recompute_domain(&self) {
        let domain = {
            let state = self.inner.state.borrow();
            let extents: Vec<Extent> = state.extents.values().copied().collect();
            state.domainer.compute_domain(&extents, state.kind)
        };
        self.apply_domain(domain.min, domain.max);
    }

    fn apply_domain(&self, start: f64, end: f64) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            if state.domain == (start, end) {
                false
            } else {
                state.domain = (start, end);
                true
            }
        };
        if changed {
            tracing::trace!(scale = self.id().get(), start, end, "scale domain changed");
            self.inner
                .broadcaster
                .broadcast(&Scale::Quantitative(self.clone()));
        }
    }
}

fn parse_time(text: &str) -> Option<f64> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis() as f64);
    }
    let date = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp_millis() as f64)
}

impl fmt::Debug for QuantitativeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("QuantitativeScale")
            .field("id", &self.inner.id)
            .field("kind", &state.kind)
            .field("domain", &state.domain)
            .field("range", &state.range)
            .field("auto", &state.auto_domain_automatically)
            .finish()
    }
}
