//! Ordinal color scale.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::broadcaster::Broadcaster;
use crate::extent::as_key;
use crate::scale::{CategoryExtents, Scale, ScaleId};

/// Palette used when no range is supplied.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#5279c7", "#fd373e", "#63c261", "#fad419", "#2c2b6f", "#ff7939", "#db2e65", "#99ce50",
    "#962565", "#06cccc",
];

struct ColorState {
    domain: Vec<String>,
    range: Vec<String>,
    extents: CategoryExtents,
    auto_domain_automatically: bool,
}

struct ColorInner {
    id: ScaleId,
    state: RefCell<ColorState>,
    broadcaster: Broadcaster<Scale>,
}

/// Shared handle mapping keys to colors, cycling through the range.
#[derive(Clone)]
pub struct ColorScale {
    inner: Rc<ColorInner>,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorScale {
    /// Color scale over the default palette.
    pub fn new() -> Self {
        Self::with_range(DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect())
    }

    /// Color scale over a custom palette.
    pub fn with_range(range: Vec<String>) -> Self {
        Self {
            inner: Rc::new(ColorInner {
                id: ScaleId::next(),
                state: RefCell::new(ColorState {
                    domain: Vec::new(),
                    range,
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

    /// Listener hub fired when the domain changes.
    pub fn broadcaster(&self) -> &Broadcaster<Scale> {
        &self.inner.broadcaster
    }

    /// Current keys.
    pub fn domain(&self) -> Vec<String> {
        self.inner.state.borrow().domain.clone()
    }

    /// Set explicit keys; automatic domaining stops.
    pub fn set_domain<I, S>(&self, domain: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.state.borrow_mut().auto_domain_automatically = false;
        self.apply_domain(domain.into_iter().map(Into::into).collect());
    }

    /// Palette.
    pub fn range(&self) -> Vec<String> {
        self.inner.state.borrow().range.clone()
    }

    /// Replace the palette and notify listeners.
    pub fn set_range(&self, range: Vec<String>) {
        self.inner.state.borrow_mut().range = range;
        self.notify();
    }

    /// Color for a key, cycling through the palette.
    pub fn scale(&self, key: &str) -> Option<String> {
        let state = self.inner.state.borrow();
        if state.range.is_empty() {
            return None;
        }
        let index = state.domain.iter().position(|k| k == key)?;
        Some(state.range[index % state.range.len()].clone())
    }

    /// Map a record value to a color, or `null` for unknown keys.
    pub fn scale_value(&self, value: &Value) -> Value {
        as_key(value)
            .and_then(|key| self.scale(&key))
            .map(Value::String)
            .unwrap_or(Value::Null)
    }

    /// Register or replace the keys contributed by `(owner, attribute)`.
    pub fn update_extent(&self, owner: &str, attribute: &str, keys: Vec<String>) {
        self.inner
            .state
            .borrow_mut()
            .extents
            .update(owner, attribute, keys);
        self.auto_domain();
    }

    /// Remove the keys contributed by `(owner, attribute)`.
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
        self.inner.broadcaster.broadcast(&Scale::Color(self.clone()));
    }
}

impl fmt::Debug for ColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ColorScale")
            .field("id", &self.inner.id)
            .field("domain", &state.domain)
            .field("range", &state.range)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn colors_cycle_through_palette() {
        let scale = ColorScale::with_range(vec!["red".into(), "blue".into()]);
        scale.set_domain(["a", "b", "c"]);
        assert_eq!(scale.scale("a").as_deref(), Some("red"));
        assert_eq!(scale.scale("c").as_deref(), Some("red"));
        assert_eq!(scale.scale_value(&json!("b")), json!("blue"));
        assert_eq!(scale.scale_value(&json!("zz")), Value::Null);
    }
}
