//! Scales map domain values to range values.
//!
//! Every scale is a shared handle. Plots register extents on the scales they
//! project through, keyed by `(owner, attribute)`; while a scale is in
//! automatic mode it recomputes its domain from those extents and notifies
//! listeners (axes, plots, coordinators) whenever the domain changes.

pub mod category;
pub mod color;
pub mod coordinator;
pub mod domainer;
pub mod interpolated;
pub mod quantitative;
pub mod ticks;
pub mod transform;

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::Value;

use crate::broadcaster::Broadcaster;
use crate::extent::{Extent, as_key, as_number};

pub use category::CategoryScale;
pub use color::ColorScale;
pub use coordinator::ScaleDomainCoordinator;
pub use domainer::Domainer;
pub use interpolated::{ColorPreset, InterpolatedColorScale, InterpolationKind};
pub use quantitative::QuantitativeScale;
pub use ticks::TickGenerator;
pub use transform::QuantitativeKind;

static SCALE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleId(u64);

impl ScaleId {
    pub(crate) fn next() -> Self {
        Self(SCALE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Extent contributed by one `(owner, attribute)` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleExtent {
    /// Numeric `[min, max]` summary.
    Numeric(Extent),
    /// Distinct categories in first-appearance order.
    Categories(Vec<String>),
}

/// Any scale a projection can map through.
#[derive(Debug, Clone)]
pub enum Scale {
    /// Linear, log, modified-log, or time scale.
    Quantitative(QuantitativeScale),
    /// Band scale over discrete keys.
    Category(CategoryScale),
    /// Ordinal mapping from keys to colors.
    Color(ColorScale),
    /// Gradient mapping from numbers to colors.
    InterpolatedColor(InterpolatedColorScale),
}

impl Scale {
    /// Identifier shared by all clones of the handle.
    pub fn id(&self) -> ScaleId {
        match self {
            Self::Quantitative(scale) => scale.id(),
            Self::Category(scale) => scale.id(),
            Self::Color(scale) => scale.id(),
            Self::InterpolatedColor(scale) => scale.id(),
        }
    }

    /// Check whether two handles refer to the same scale.
    pub fn same_as(&self, other: &Scale) -> bool {
        self.id() == other.id()
    }

    /// Map a domain value to a range value. Unmappable input maps to `null`.
    pub fn scale(&self, value: &Value) -> Value {
        match self {
            Self::Quantitative(scale) => scale.scale_value(value),
            Self::Category(scale) => scale.scale_value(value),
            Self::Color(scale) => scale.scale_value(value),
            Self::InterpolatedColor(scale) => scale.scale_value(value),
        }
    }

    /// Listener hub fired when the domain changes.
    pub fn broadcaster(&self) -> &Broadcaster<Scale> {
        match self {
            Self::Quantitative(scale) => scale.broadcaster(),
            Self::Category(scale) => scale.broadcaster(),
            Self::Color(scale) => scale.broadcaster(),
            Self::InterpolatedColor(scale) => scale.broadcaster(),
        }
    }

    /// Summarize projected values in the form this scale registers.
    pub fn extent_of(&self, values: impl IntoIterator<Item = Value>) -> Option<ScaleExtent> {
        match self {
            Self::Quantitative(scale) => {
                Extent::of_values(values.into_iter().map(|value| scale.coerce(&value)))
                    .map(ScaleExtent::Numeric)
            }
            Self::InterpolatedColor(_) => {
                Extent::of_values(values.into_iter().map(|value| as_number(&value)))
                    .map(ScaleExtent::Numeric)
            }
            Self::Category(_) | Self::Color(_) => {
                let mut keys: Vec<String> = Vec::new();
                for key in values.into_iter().filter_map(|value| as_key(&value)) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                (!keys.is_empty()).then_some(ScaleExtent::Categories(keys))
            }
        }
    }

    /// Register or replace the extent of one contributor.
    pub fn update_extent(&self, owner: &str, attribute: &str, extent: ScaleExtent) {
        match (self, extent) {
            (Self::Quantitative(scale), ScaleExtent::Numeric(extent)) => {
                scale.update_extent(owner, attribute, extent)
            }
            (Self::Category(scale), ScaleExtent::Categories(keys)) => {
                scale.update_extent(owner, attribute, keys)
            }
            (Self::Color(scale), ScaleExtent::Categories(keys)) => {
                scale.update_extent(owner, attribute, keys)
            }
            (Self::InterpolatedColor(scale), ScaleExtent::Numeric(extent)) => {
                scale.update_extent(owner, attribute, extent)
            }
            (scale, extent) => {
                tracing::warn!(scale = ?scale.id(), ?extent, "extent kind does not match scale");
            }
        }
    }

    /// Remove the extent of one contributor.
    pub fn remove_extent(&self, owner: &str, attribute: &str) {
        match self {
            Self::Quantitative(scale) => scale.remove_extent(owner, attribute),
            Self::Category(scale) => scale.remove_extent(owner, attribute),
            Self::Color(scale) => scale.remove_extent(owner, attribute),
            Self::InterpolatedColor(scale) => scale.remove_extent(owner, attribute),
        }
    }

    /// Set the output range of a positional scale. Color scales ignore this.
    pub fn set_range(&self, start: f64, end: f64) {
        match self {
            Self::Quantitative(scale) => scale.set_range(start, end),
            Self::Category(scale) => scale.set_range(start, end),
            Self::Color(_) | Self::InterpolatedColor(_) => {}
        }
    }

    /// Borrow as a quantitative scale.
    pub fn as_quantitative(&self) -> Option<&QuantitativeScale> {
        match self {
            Self::Quantitative(scale) => Some(scale),
            _ => None,
        }
    }

    /// Borrow as a category scale.
    pub fn as_category(&self) -> Option<&CategoryScale> {
        match self {
            Self::Category(scale) => Some(scale),
            _ => None,
        }
    }

    /// Borrow as a color scale.
    pub fn as_color(&self) -> Option<&ColorScale> {
        match self {
            Self::Color(scale) => Some(scale),
            _ => None,
        }
    }

    pub fn as_interpolated_color(&self) -> Option<&InterpolatedColorScale> {
        match self {
            Self::InterpolatedColor(scale) => Some(scale),
            _ => None,
        }
    }
}

impl From<QuantitativeScale> for Scale {
    fn from(value: QuantitativeScale) -> Self {
        Self::Quantitative(value)
    }
}

impl From<CategoryScale> for Scale {
    fn from(value: CategoryScale) -> Self {
        Self::Category(value)
    }
}

impl From<ColorScale> for Scale {
    fn from(value: ColorScale) -> Self {
        Self::Color(value)
    }
}

impl From<InterpolatedColorScale> for Scale {
    fn from(value: InterpolatedColorScale) -> Self {
        Self::InterpolatedColor(value)
    }
}

/// Registry of category extents keyed by `(owner, attribute)`.
#[derive(Debug, Clone, Default)]
pub(crate) struct CategoryExtents {
    entries: IndexMap<(String, String), Vec<String>>,
}

impl CategoryExtents {
    pub(crate) fn update(&mut self, owner: &str, attribute: &str, keys: Vec<String>) {
        self.entries
            .insert((owner.to_string(), attribute.to_string()), keys);
    }

    pub(crate) fn remove(&mut self, owner: &str, attribute: &str) {
        self.entries
            .shift_remove(&(owner.to_string(), attribute.to_string()));
    }

    /// Union of all registered keys in first-appearance order.
    pub(crate) fn merged(&self) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        for key in self.entries.values().flatten() {
            if !merged.contains(key) {
                merged.push(key.clone());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extent_of_matches_scale_family() {
        let linear = Scale::from(QuantitativeScale::linear());
        assert_eq!(
            linear.extent_of(vec![json!(3), json!(null), json!("7")]),
            Some(ScaleExtent::Numeric(Extent::new(3.0, 7.0)))
        );
        let category = Scale::from(CategoryScale::new());
        assert_eq!(
            category.extent_of(vec![json!("b"), json!("a"), json!("b")]),
            Some(ScaleExtent::Categories(vec!["b".into(), "a".into()]))
        );
        let gradient = Scale::from(InterpolatedColorScale::default());
        assert_eq!(
            gradient.extent_of(vec![json!(4), json!("x"), json!(-2)]),
            Some(ScaleExtent::Numeric(Extent::new(-2.0, 4.0)))
        );
    }

    #[test]
    fn category_extents_merge_in_order() {
        let mut extents = CategoryExtents::default();
        extents.update("p1", "x", vec!["a".into(), "b".into()]);
        extents.update("p2", "x", vec!["c".into(), "a".into()]);
        assert_eq!(extents.merged(), vec!["a", "b", "c"]);
        extents.remove("p1", "x");
        assert_eq!(extents.merged(), vec!["c", "a"]);
    }
}
