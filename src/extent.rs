//! Numeric extents and value coercion helpers.

use serde_json::Value;

/// Closed numeric interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
}

impl Extent {
    /// Create a new extent, swapping bounds if needed.
    pub fn new(mut min: f64, mut max: f64) -> Self {
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        Self { min, max }
    }

    /// Span of the extent.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Check whether both bounds are finite.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Check whether the extent has positive span and finite bounds.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.span() > 0.0
    }

    /// Check whether a value lies inside the extent.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Expand the extent to include a value.
    pub fn expand_to_include(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Union two extents if both are finite.
    pub fn union(a: Self, b: Self) -> Option<Self> {
        if !a.is_finite() || !b.is_finite() {
            return None;
        }
        Some(Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        })
    }

    /// Extent covering every finite value, or `None` if there are none.
    pub fn of_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut extent: Option<Self> = None;
        for value in values.into_iter().filter(|value| value.is_finite()) {
            match extent.as_mut() {
                Some(extent) => extent.expand_to_include(value),
                None => extent = Some(Self::new(value, value)),
            }
        }
        extent
    }

    /// Clamp a value into the extent.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Coerce a record value to a number.
///
/// Numbers pass through, numeric strings are parsed and booleans map to 0/1.
/// Everything else (including `null`) becomes NaN so that drawing skips it.
pub fn as_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

/// Wrap a number as a record value; non-finite numbers become `null`.
pub fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Stringify a record value the way category keys are compared.
pub fn as_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            _ => number.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn of_values_skips_non_finite() {
        let extent = Extent::of_values([3.0, f64::NAN, -1.0, 8.0]).expect("extent");
        assert_eq!(extent, Extent::new(-1.0, 8.0));
        assert!(Extent::of_values([f64::NAN]).is_none());
    }

    #[test]
    fn coercion_treats_missing_as_nan() {
        assert_eq!(as_number(&json!("2.5")), 2.5);
        assert!(as_number(&Value::Null).is_nan());
        assert!(as_number(&json!({"a": 1})).is_nan());
        assert_eq!(number(f64::NAN), Value::Null);
    }

    #[test]
    fn keys_render_integers_without_fraction() {
        assert_eq!(as_key(&json!(3.0)).as_deref(), Some("3"));
        assert_eq!(as_key(&json!("a")).as_deref(), Some("a"));
        assert_eq!(as_key(&Value::Null), None);
    }
}
