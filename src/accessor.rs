//! Accessors and projections.
//!
//! An [`Accessor`] reads one value out of a record. It can be a closure, a
//! record key or a constant; whichever it is, it resolves once into a
//! [`Projector`] with a single calling convention. A [`Projection`] adds the
//! scale the value is mapped through before it reaches the drawer.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::extent::number;
use crate::scale::Scale;

/// Per-dataset state a plot hands to its accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotMetadata {
    /// Key of the dataset inside the plot.
    pub dataset_key: String,
    /// Stack offset per domain key, for stacked plots.
    pub offsets: IndexMap<String, f64>,
    /// Pixel shift of the dataset's cluster, for clustered bars.
    pub cluster_position: f64,
}

impl PlotMetadata {
    /// Metadata for a freshly added dataset.
    pub fn new(dataset_key: impl Into<String>) -> Self {
        Self {
            dataset_key: dataset_key.into(),
            ..Self::default()
        }
    }

    /// Stack offset of a domain key, zero when unknown.
    pub fn offset(&self, key: &str) -> f64 {
        self.offsets.get(key).copied().unwrap_or(0.0)
    }
}

/// Function of `(datum, index, dataset metadata, plot metadata)`.
pub type Projector = Rc<dyn Fn(&Value, usize, &Value, &PlotMetadata) -> Value>;

/// Projector per visual attribute, in registration order.
pub type AttrToProjector = IndexMap<String, Projector>;

/// Where a projected value comes from.
#[derive(Clone)]
pub enum Accessor {
    /// Arbitrary closure.
    Function(Projector),
    /// Field of an object record.
    Key(String),
    /// Same value for every record.
    Constant(Value),
}

impl Accessor {
    /// Closure accessor.
    pub fn function(f: impl Fn(&Value, usize, &Value, &PlotMetadata) -> Value + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    /// Closure accessor that only looks at the record.
    pub fn of_datum(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Self::Function(Rc::new(move |datum: &Value, _: usize, _: &Value, _: &PlotMetadata| f(datum)))
    }

    /// Field accessor.
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Constant accessor.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    /// Resolve into one calling convention.
    pub fn projector(&self) -> Projector {
        match self {
            Self::Function(f) => f.clone(),
            Self::Key(key) => {
                let key = key.clone();
                Rc::new(move |datum: &Value, _: usize, _: &Value, _: &PlotMetadata| {
                    datum.get(&key).cloned().unwrap_or(Value::Null)
                })
            }
            Self::Constant(value) => {
                let value = value.clone();
                Rc::new(move |_: &Value, _: usize, _: &Value, _: &PlotMetadata| value.clone())
            }
        }
    }

    /// Read the value for one record.
    pub fn get(&self, datum: &Value, index: usize, user: &Value, plot: &PlotMetadata) -> Value {
        match self {
            Self::Function(f) => f(datum, index, user, plot),
            Self::Key(key) => datum.get(key).cloned().unwrap_or(Value::Null),
            Self::Constant(value) => value.clone(),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => write!(f, "Accessor::Function(..)"),
            Self::Key(key) => write!(f, "Accessor::Key({key:?})"),
            Self::Constant(value) => write!(f, "Accessor::Constant({value})"),
        }
    }
}

impl From<&str> for Accessor {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<String> for Accessor {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<f64> for Accessor {
    fn from(value: f64) -> Self {
        Self::Constant(number(value))
    }
}

impl From<Value> for Accessor {
    fn from(value: Value) -> Self {
        Self::Constant(value)
    }
}

/// Binding of a visual attribute to an accessor and an optional scale.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Attribute the projection feeds.
    pub attribute: String,
    /// Value source.
    pub accessor: Accessor,
    /// Scale applied to the accessed value.
    pub scale: Option<Scale>,
}

impl Projection {
    /// Bind `attribute` to `accessor`, optionally through `scale`.
    pub fn new(attribute: impl Into<String>, accessor: Accessor, scale: Option<Scale>) -> Self {
        Self {
            attribute: attribute.into(),
            accessor,
            scale,
        }
    }

    /// Accessor composed with the scale.
    pub fn projector(&self) -> Projector {
        let accessor = self.accessor.projector();
        match &self.scale {
            None => accessor,
            Some(scale) => {
                let scale = scale.clone();
                Rc::new(move |datum: &Value, index: usize, user: &Value, plot: &PlotMetadata| {
                    scale.scale(&accessor(datum, index, user, plot))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::scale::QuantitativeScale;

    #[test]
    fn accessor_kinds_resolve_to_the_same_shape() {
        let meta = PlotMetadata::new("d0");
        let datum = json!({"x": 3, "label": "a"});
        let by_key = Accessor::from("x").projector();
        let constant = Accessor::from(7.0).projector();
        let function = Accessor::function(|_, index, _, plot: &PlotMetadata| {
            json!(format!("{}-{index}", plot.dataset_key))
        })
        .projector();
        assert_eq!(by_key(&datum, 0, &Value::Null, &meta), json!(3));
        assert_eq!(constant(&datum, 0, &Value::Null, &meta), json!(7.0));
        assert_eq!(function(&datum, 2, &Value::Null, &meta), json!("d0-2"));
        assert_eq!(Accessor::key("missing").get(&datum, 0, &Value::Null, &meta), Value::Null);
    }

    #[test]
    fn projection_applies_scale() {
        let scale = QuantitativeScale::linear();
        scale.set_domain(0.0, 10.0).expect("domain");
        scale.set_range(0.0, 100.0);
        let projection = Projection::new("x", Accessor::key("x"), Some(scale.into()));
        let projector = projection.projector();
        let meta = PlotMetadata::default();
        assert_eq!(projector(&json!({"x": 2.5}), 0, &Value::Null, &meta), json!(25.0));
        assert_eq!(projector(&json!({"y": 1}), 0, &Value::Null, &meta), Value::Null);
    }
}
