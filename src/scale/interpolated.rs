//! Continuous color scale interpolating between color stops.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broadcaster::Broadcaster;
use crate::error::{ChartError, Result};
use crate::extent::{Extent, as_number};
use crate::scale::{Scale, ScaleId};

const REDS: [&str; 9] = [
    "#FFFFFF", "#FFF6E1", "#FEF4C0", "#FED976", "#FEB24C", "#FD8D3C", "#FC4E2A", "#E31A1C",
    "#B10026",
];
const BLUES: [&str; 9] = [
    "#FFFFFF", "#CCFFFF", "#A5FFFD", "#85F7FB", "#6ED3EF", "#55A7E0", "#417FD0", "#2545D3",
    "#0B02E1",
];

/// Built-in color ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreset {
    /// White to dark red.
    #[default]
    Reds,
    /// White to dark blue.
    Blues,
    /// Dark blue through white to dark red.
    PosNeg,
}

impl ColorPreset {
    /// Hex stops of the preset, low end first.
    pub fn colors(self) -> Vec<String> {
        let owned = |colors: &[&str]| -> Vec<String> {
            colors.iter().map(|color| color.to_string()).collect()
        };
        match self {
            Self::Reds => owned(&REDS),
            Self::Blues => owned(&BLUES),
            Self::PosNeg => BLUES
                .iter()
                .rev()
                .chain(REDS.iter().skip(1))
                .map(|color| color.to_string())
                .collect(),
        }
    }
}

impl FromStr for ColorPreset {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "reds" => Ok(Self::Reds),
            "blues" => Ok(Self::Blues),
            "posneg" => Ok(Self::PosNeg),
            _ => Err(ChartError::InvalidOption {
                kind: "color range",
                value: value.to_string(),
            }),
        }
    }
}

/// How domain values are spread over the stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationKind {
    #[default]
    Linear,
    /// Natural log; non-positive values have no color.
    Log,
    Sqrt,
    /// Square.
    Pow,
}

impl InterpolationKind {
    fn forward(self, value: f64) -> f64 {
        match self {
            Self::Linear => value,
            Self::Log if value > 0.0 => value.ln(),
            Self::Log => f64::NAN,
            Self::Sqrt => value.signum() * value.abs().sqrt(),
            Self::Pow => value.signum() * value * value,
        }
    }
}

impl FromStr for InterpolationKind {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "log" => Ok(Self::Log),
            "sqrt" => Ok(Self::Sqrt),
            "pow" => Ok(Self::Pow),
            _ => Err(ChartError::InvalidOption {
                kind: "interpolated scale type",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f64, f64, f64);

impl Rgb {
    fn parse(color: &str) -> Result<Self> {
        let invalid = || ChartError::InvalidOption {
            kind: "color",
            value: color.to_string(),
        };
        let hex = color.strip_prefix('#').ok_or_else(invalid)?;
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };
        let channel = |at: usize| {
            u8::from_str_radix(expanded.get(at..at + 2).unwrap_or(""), 16)
                .map(f64::from)
                .map_err(|_| invalid())
        };
        Ok(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    fn mix(self, other: Self, t: f64) -> Self {
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        Self(lerp(self.0, other.0), lerp(self.1, other.1), lerp(self.2, other.2))
    }

    fn to_hex(self) -> String {
        let byte = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.0), byte(self.1), byte(self.2))
    }
}

struct InterpolatedState {
    domain: (f64, f64),
    colors: Vec<String>,
    stops: Vec<Rgb>,
    kind: InterpolationKind,
    extents: IndexMap<(String, String), Extent>,
    auto_domain_automatically: bool,
}

struct InterpolatedInner {
    id: ScaleId,
    state: RefCell<InterpolatedState>,
    broadcaster: Broadcaster<Scale>,
}

/// Shared handle mapping numbers to colors along a gradient.
#[derive(Clone)]
pub struct InterpolatedColorScale {
    inner: Rc<InterpolatedInner>,
}

impl Default for InterpolatedColorScale {
    fn default() -> Self {
        Self::new(ColorPreset::default())
    }
}

impl InterpolatedColorScale {
    /// Linear scale over a preset, domain `[0, 1]` until extents arrive.
    pub fn new(preset: ColorPreset) -> Self {
        let colors = preset.colors();
        let stops = colors.iter().filter_map(|color| Rgb::parse(color).ok()).collect();
        Self {
            inner: Rc::new(InterpolatedInner {
                id: ScaleId::next(),
                state: RefCell::new(InterpolatedState {
                    domain: (0.0, 1.0),
                    colors,
                    stops,
                    kind: InterpolationKind::Linear,
                    extents: IndexMap::new(),
                    auto_domain_automatically: true,
                }),
                broadcaster: Broadcaster::new(),
            }),
        }
    }

    /// Scale over custom `#rgb` or `#rrggbb` stops; at least two are needed.
    pub fn with_colors(colors: Vec<String>) -> Result<Self> {
        let scale = Self::default();
        scale.set_colors(colors)?;
        Ok(scale)
    }

    /// Scale identifier.
    pub fn id(&self) -> ScaleId {
        self.inner.id
    }

    /// Listener hub fired when the domain or colors change.
    pub fn broadcaster(&self) -> &Broadcaster<Scale> {
        &self.inner.broadcaster
    }

    /// Color stops, low end first.
    pub fn colors(&self) -> Vec<String> {
        self.inner.state.borrow().colors.clone()
    }

    /// Switch to a preset range.
    pub fn set_preset(&self, preset: ColorPreset) {
        if let Err(error) = self.set_colors(preset.colors()) {
            tracing::warn!(%error, ?preset, "preset colors failed to parse");
        }
    }

    /// Replace the stops. Fewer than two stops or unparsable colors are rejected.
    pub fn set_colors(&self, colors: Vec<String>) -> Result<()> {
        if colors.len() < 2 {
            return Err(ChartError::InvalidOption {
                kind: "color range length",
                value: colors.len().to_string(),
            });
        }
        let stops = colors
            .iter()
            .map(|color| Rgb::parse(color))
            .collect::<Result<Vec<_>>>()?;
        {
            let mut state = self.inner.state.borrow_mut();
            state.colors = colors;
            state.stops = stops;
        }
        self.notify();
        Ok(())
    }

    pub fn kind(&self) -> InterpolationKind {
        self.inner.state.borrow().kind
    }

    pub fn set_kind(&self, kind: InterpolationKind) {
        self.inner.state.borrow_mut().kind = kind;
        self.notify();
    }

    /// Current domain as `(min, max)`.
    pub fn domain(&self) -> (f64, f64) {
        self.inner.state.borrow().domain
    }

    /// Set an explicit domain; automatic domaining stops until [`Self::reset_domain`].
    pub fn set_domain(&self, min: f64, max: f64) -> Result<()> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ChartError::InvalidDomain { min, max });
        }
        self.inner.state.borrow_mut().auto_domain_automatically = false;
        self.apply_domain((min, max));
        Ok(())
    }

    /// Return to automatic domaining.
    pub fn reset_domain(&self) {
        self.inner.state.borrow_mut().auto_domain_automatically = true;
        self.auto_domain();
    }

    /// Recompute the domain from registered extents unless it was set explicitly.
    pub fn auto_domain(&self) {
        let domain = {
            let state = self.inner.state.borrow();
            if !state.auto_domain_automatically {
                return;
            }
            state
                .extents
                .values()
                .copied()
                .reduce(|a, b| Extent::union(a, b).unwrap_or(a))
                .map(|extent| (extent.min, extent.max))
                .unwrap_or((0.0, 1.0))
        };
        self.apply_domain(domain);
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
        self.inner
            .state
            .borrow_mut()
            .extents
            .shift_remove(&(owner.to_string(), attribute.to_string()));
        self.auto_domain();
    }

    /// Color for a number, clamped to the ends of the range.
    pub fn scale(&self, value: f64) -> Option<String> {
        let state = self.inner.state.borrow();
        let kind = state.kind;
        let (low, high) = (kind.forward(state.domain.0), kind.forward(state.domain.1));
        let at = kind.forward(value);
        if !at.is_finite() || !low.is_finite() || !high.is_finite() || state.stops.is_empty() {
            return None;
        }
        let t = if (high - low).abs() < f64::EPSILON {
            0.5
        } else {
            ((at - low) / (high - low)).clamp(0.0, 1.0)
        };
        let last = state.stops.len() - 1;
        let position = t * last as f64;
        let index = (position.floor() as usize).min(last.saturating_sub(1));
        let color = match state.stops.get(index + 1) {
            Some(next) => state.stops[index].mix(*next, position - index as f64),
            None => state.stops[index],
        };
        Some(color.to_hex())
    }

    /// Map a record value to a color, or `null` when it has none.
    pub fn scale_value(&self, value: &Value) -> Value {
        self.scale(as_number(value))
            .map(Value::String)
            .unwrap_or(Value::Null)
    }

    fn apply_domain(&self, domain: (f64, f64)) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let changed = state.domain != domain;
            state.domain = domain;
            changed
        };
        if changed {
            self.notify();
        }
    }

    fn notify(&self) {
        self.inner
            .broadcaster
            .broadcast(&Scale::InterpolatedColor(self.clone()));
    }
}

impl fmt::Debug for InterpolatedColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("InterpolatedColorScale")
            .field("id", &self.inner.id)
            .field("domain", &state.domain)
            .field("kind", &state.kind)
            .field("colors", &state.colors)
            .finish()
    }
}
