//! Animation timing.
//!
//! Animators decide when and how fast each element of a draw step moves to
//! its new attribute values. The drawer turns their schedule into SMIL
//! `<animate>` elements, so the serialized SVG carries the transitions.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChartError, Result};
use crate::extent::{as_number, number};

/// Default duration of one element's transition.
pub const DEFAULT_DURATION_MS: f64 = 300.0;
/// Default delay before the first element starts.
pub const DEFAULT_DELAY_MS: f64 = 0.0;
/// Default cap on the stagger between consecutive elements.
pub const DEFAULT_MAX_ITERATIVE_DELAY_MS: f64 = 15.0;
/// Default cap on the whole animation; unbounded.
pub const DEFAULT_MAX_TOTAL_DURATION_MS: f64 = f64::INFINITY;

/// Easing curve of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SinIn,
    SinOut,
    SinInOut,
    ExpIn,
    #[default]
    ExpOut,
    ExpInOut,
}

impl Easing {
    /// Cubic Bézier control points for SMIL `keySplines`.
    pub fn key_splines(self) -> &'static str {
        match self {
            Self::Linear => "0 0 1 1",
            Self::QuadIn => "0.11 0 0.5 0",
            Self::QuadOut => "0.5 1 0.89 1",
            Self::QuadInOut => "0.45 0 0.55 1",
            Self::CubicIn => "0.32 0 0.67 0",
            Self::CubicOut => "0.33 1 0.68 1",
            Self::CubicInOut => "0.65 0 0.35 1",
            Self::SinIn => "0.12 0 0.39 0",
            Self::SinOut => "0.61 1 0.88 1",
            Self::SinInOut => "0.37 0 0.63 1",
            Self::ExpIn => "0.7 0 0.84 0",
            Self::ExpOut => "0.16 1 0.3 1",
            Self::ExpInOut => "0.87 0 0.13 1",
        }
    }
}

impl FromStr for Easing {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        let easing = match value.to_ascii_lowercase().as_str() {
            "linear" => Self::Linear,
            "quad-in" => Self::QuadIn,
            "quad-out" => Self::QuadOut,
            "quad-in-out" | "quad" => Self::QuadInOut,
            "cubic-in" => Self::CubicIn,
            "cubic-out" => Self::CubicOut,
            "cubic-in-out" | "cubic" => Self::CubicInOut,
            "sin-in" => Self::SinIn,
            "sin-out" => Self::SinOut,
            "sin-in-out" | "sin" => Self::SinInOut,
            "exp-in" => Self::ExpIn,
            "exp-out" => Self::ExpOut,
            "exp-in-out" | "exp" => Self::ExpInOut,
            _ => {
                return Err(ChartError::InvalidOption {
                    kind: "easing",
                    value: value.to_string(),
                });
            }
        };
        Ok(easing)
    }
}

/// When one element's transition runs, relative to the start of its step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    /// Start offset in milliseconds.
    pub begin_ms: f64,
    /// Transition length in milliseconds.
    pub duration_ms: f64,
    /// Easing curve.
    pub easing: Easing,
}

/// Duration, delay, stagger and easing shared by every animating animator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    duration_ms: f64,
    delay_ms: f64,
    max_iterative_delay_ms: f64,
    max_total_duration_ms: f64,
    easing: Easing,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            delay_ms: DEFAULT_DELAY_MS,
            max_iterative_delay_ms: DEFAULT_MAX_ITERATIVE_DELAY_MS,
            max_total_duration_ms: DEFAULT_MAX_TOTAL_DURATION_MS,
            easing: Easing::default(),
        }
    }
}

impl Timing {
    /// Duration of one element's transition.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Builder-style duration; negative values clamp to zero.
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms.max(0.0);
        self
    }

    /// Delay before the first element starts.
    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    /// Builder-style start delay.
    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms.max(0.0);
        self
    }

    /// Upper bound on the stagger between consecutive elements.
    pub fn max_iterative_delay_ms(&self) -> f64 {
        self.max_iterative_delay_ms
    }

    /// Builder-style stagger bound.
    pub fn with_max_iterative_delay(mut self, delay_ms: f64) -> Self {
        self.max_iterative_delay_ms = delay_ms.max(0.0);
        self
    }

    /// Time by which every element should have finished.
    pub fn max_total_duration_ms(&self) -> f64 {
        self.max_total_duration_ms
    }

    /// Builder-style total duration cap.
    pub fn with_max_total_duration(mut self, duration_ms: f64) -> Self {
        self.max_total_duration_ms = duration_ms.max(0.0);
        self
    }

    /// Easing curve of each transition.
    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Builder-style easing.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Stagger between consecutive elements.
    ///
    /// Capped so the last element still starts within the total duration.
    pub fn iterative_delay(&self, iterations: usize) -> f64 {
        let room = (self.max_total_duration_ms - self.duration_ms).max(0.0);
        self.max_iterative_delay_ms
            .min(room / iterations.max(1) as f64)
    }

    /// Time until every element has finished.
    pub fn total(&self, iterations: usize) -> f64 {
        self.iterative_delay(iterations) * iterations as f64 + self.delay_ms + self.duration_ms
    }

    fn schedule(&self, index: usize, iterations: usize) -> Schedule {
        Schedule {
            begin_ms: self.delay_ms + self.iterative_delay(iterations) * index as f64,
            duration_ms: self.duration_ms,
            easing: self.easing,
        }
    }
}

/// How a draw step reaches its attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Animator {
    /// Set values immediately.
    #[default]
    Null,
    /// Transition from the current values.
    Base(Timing),
    /// Rectangles grow out of their baseline edge.
    Rect {
        timing: Timing,
        vertical: bool,
        reverse: bool,
    },
    /// Rectangles grow while sliding in from a fixed pixel position.
    MovingRect {
        timing: Timing,
        start_pixel: f64,
        vertical: bool,
    },
}

impl Animator {
    /// Base animator with default timing.
    pub fn base() -> Self {
        Self::Base(Timing::default())
    }

    /// Vertical rectangle animator growing upward.
    pub fn rect() -> Self {
        Self::Rect {
            timing: Timing::default(),
            vertical: true,
            reverse: false,
        }
    }

    /// Rectangle animator sliding from `start_pixel`.
    pub fn moving_rect(start_pixel: f64, vertical: bool) -> Self {
        Self::MovingRect {
            timing: Timing::default(),
            start_pixel,
            vertical,
        }
    }

    /// Timing parameters, when the animator animates.
    pub fn timing(&self) -> Option<&Timing> {
        match self {
            Self::Null => None,
            Self::Base(timing) | Self::Rect { timing, .. } | Self::MovingRect { timing, .. } => {
                Some(timing)
            }
        }
    }

    /// Replace the timing; the null animator stays instantaneous.
    pub fn with_timing(self, timing: Timing) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Base(_) => Self::Base(timing),
            Self::Rect { vertical, reverse, .. } => Self::Rect {
                timing,
                vertical,
                reverse,
            },
            Self::MovingRect {
                start_pixel,
                vertical,
                ..
            } => Self::MovingRect {
                timing,
                start_pixel,
                vertical,
            },
        }
    }

    /// Total time a step takes for `iterations` elements.
    pub fn total_time(&self, iterations: usize) -> f64 {
        self.timing().map_or(0.0, |timing| timing.total(iterations))
    }

    /// Transition window of element `index`; `None` means set immediately.
    pub fn schedule(&self, index: usize, iterations: usize) -> Option<Schedule> {
        self.timing().map(|timing| timing.schedule(index, iterations))
    }

    /// Values an element starts from, overriding whatever it shows now.
    pub fn start_values(&self, target: &IndexMap<String, Value>) -> IndexMap<String, Value> {
        let (vertical, moving_start) = match *self {
            Self::Null | Self::Base(_) => return IndexMap::new(),
            Self::Rect { vertical, reverse, .. } => {
                let (moving, growing) = rect_attrs(vertical);
                let position = target.get(moving).map_or(f64::NAN, as_number);
                let start = if vertical == reverse {
                    position
                } else {
                    position + target.get(growing).map_or(0.0, as_number)
                };
                (vertical, start)
            }
            Self::MovingRect {
                start_pixel,
                vertical,
                ..
            } => (vertical, start_pixel),
        };
        let (moving, growing) = rect_attrs(vertical);
        let mut start = IndexMap::new();
        if moving_start.is_finite() {
            start.insert(moving.to_string(), number(moving_start));
        }
        start.insert(growing.to_string(), number(0.0));
        start
    }
}

fn rect_attrs(vertical: bool) -> (&'static str, &'static str) {
    if vertical { ("y", "height") } else { ("x", "width") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stagger_is_capped_by_total_duration() {
        let timing = Timing::default();
        assert!((timing.iterative_delay(10) - 15.0).abs() < 1e-9);
        assert!((timing.total(10) - (150.0 + 300.0)).abs() < 1e-9);

        let capped = timing.with_max_total_duration(400.0);
        assert!((capped.iterative_delay(10) - 10.0).abs() < 1e-9);
        assert!((capped.with_duration(500.0).iterative_delay(10)).abs() < 1e-9);
    }

    #[test]
    fn null_animator_is_instant() {
        assert_eq!(Animator::Null.total_time(100), 0.0);
        assert_eq!(Animator::Null.schedule(3, 100), None);
        let schedule = Animator::base().schedule(2, 4).expect("schedule");
        assert!((schedule.begin_ms - 30.0).abs() < 1e-9);
        assert_eq!(schedule.easing, Easing::ExpOut);
    }

    #[test]
    fn rect_grows_from_bottom_edge() {
        let mut target = IndexMap::new();
        target.insert("y".to_string(), json!(20.0));
        target.insert("height".to_string(), json!(30.0));
        let start = Animator::rect().start_values(&target);
        assert_eq!(start.get("y"), Some(&json!(50.0)));
        assert_eq!(start.get("height"), Some(&json!(0.0)));

        let moving = Animator::moving_rect(5.0, true).start_values(&target);
        assert_eq!(moving.get("y"), Some(&json!(5.0)));
    }

    #[test]
    fn easing_names_parse() {
        assert_eq!("exp-in-out".parse::<Easing>(), Ok(Easing::ExpInOut));
        assert!("bounce".parse::<Easing>().is_err());
    }
}
