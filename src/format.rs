//! Value formatters for tick labels, legends, and bar labels.

use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::extent::{as_key, as_number};

/// Formatter turning a value into display text.
#[derive(Clone, Default)]
pub enum Formatter {
    /// Shortest representation with up to the given number of decimals.
    General {
        /// Maximum number of fraction digits.
        precision: usize,
    },
    /// Fixed number of decimals.
    Fixed {
        /// Number of fraction digits.
        precision: usize,
    },
    /// Value times one hundred with a `%` suffix.
    Percentage {
        /// Number of fraction digits.
        precision: usize,
    },
    /// Epoch milliseconds rendered with a `chrono` format string, in UTC.
    Time {
        /// `strftime`-style pattern.
        pattern: String,
    },
    /// Text as-is, numbers via the general formatter.
    #[default]
    Identity,
    /// Custom formatter callback.
    Custom(Rc<dyn Fn(&Value) -> String>),
}

impl Formatter {
    /// Default numeric formatter used by numeric axes.
    pub fn general() -> Self {
        Self::General { precision: 3 }
    }

    /// Fixed-precision formatter.
    pub fn fixed(precision: usize) -> Self {
        Self::Fixed { precision }
    }

    /// Percentage formatter, `0.25` becomes `25%` at precision 0.
    pub fn percentage(precision: usize) -> Self {
        Self::Percentage { precision }
    }

    /// Time formatter for epoch-millisecond values.
    pub fn time(pattern: impl Into<String>) -> Self {
        Self::Time {
            pattern: pattern.into(),
        }
    }

    /// Wrap a custom formatting closure.
    pub fn custom(formatter: impl Fn(&Value) -> String + 'static) -> Self {
        Self::Custom(Rc::new(formatter))
    }

    /// Format a value for display.
    pub fn format(&self, value: &Value) -> String {
        match self {
            Self::General { precision } => format_general(as_number(value), *precision),
            Self::Fixed { precision } => {
                let number = as_number(value);
                if number.is_finite() {
                    format!("{number:.precision$}")
                } else {
                    String::new()
                }
            }
            Self::Percentage { precision } => {
                let number = as_number(value) * 100.0;
                if number.is_finite() {
                    format!("{number:.precision$}%")
                } else {
                    String::new()
                }
            }
            Self::Time { pattern } => format_time(as_number(value), pattern),
            Self::Identity => match value {
                Value::Number(_) => format_general(as_number(value), 3),
                other => as_key(other).unwrap_or_default(),
            },
            Self::Custom(formatter) => formatter(value),
        }
    }

    /// Format a plain number.
    pub fn format_number(&self, value: f64) -> String {
        self.format(&crate::extent::number(value))
    }
}

fn format_general(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let text = format!("{value:.precision$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" { "0".to_string() } else { text }
}

fn format_time(millis: f64, pattern: &str) -> String {
    if !millis.is_finite() {
        return String::new();
    }
    DateTime::<Utc>::from_timestamp_millis(millis.round() as i64)
        .map(|time| time.format(pattern).to_string())
        .unwrap_or_default()
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General { precision } => write!(f, "Formatter::General({precision})"),
            Self::Fixed { precision } => write!(f, "Formatter::Fixed({precision})"),
            Self::Percentage { precision } => write!(f, "Formatter::Percentage({precision})"),
            Self::Time { pattern } => write!(f, "Formatter::Time({pattern:?})"),
            Self::Identity => write!(f, "Formatter::Identity"),
            Self::Custom(_) => write!(f, "Formatter::Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn general_trims_trailing_zeros() {
        let formatter = Formatter::general();
        assert_eq!(formatter.format(&json!(2.5)), "2.5");
        assert_eq!(formatter.format(&json!(10)), "10");
        assert_eq!(formatter.format_number(-0.0001), "0");
    }

    #[test]
    fn identity_passes_text_through() {
        assert_eq!(Formatter::Identity.format(&json!("north")), "north");
        assert_eq!(Formatter::fixed(2).format(&json!(1)), "1.00");
        let custom = Formatter::custom(|value| format!("<{}>", as_number(value)));
        assert_eq!(custom.format(&json!(4)), "<4>");
    }

    #[test]
    fn percentages_and_times() {
        assert_eq!(Formatter::percentage(0).format(&json!(0.25)), "25%");
        assert_eq!(Formatter::percentage(1).format(&json!("x")), "");
        let time = Formatter::time("%Y-%m-%d %H:%M");
        assert_eq!(time.format(&json!(86_400_000)), "1970-01-02 00:00");
        assert_eq!(time.format(&Value::Null), "");
    }
}
