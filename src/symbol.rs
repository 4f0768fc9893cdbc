//! Point markers used by scatter plots and legends.
//!
//! Each marker is drawn as a path centred on the origin. `size` is the
//! diameter-like extent of the marker in pixels; marker areas follow the
//! usual d3 symbol proportions so that different shapes look equally heavy.

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::svg::format_number;

/// Shape of a point marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    #[default]
    Circle,
    Square,
    Cross,
    Diamond,
    TriangleUp,
    TriangleDown,
}

impl SymbolKind {
    /// Every marker shape, in legend order.
    pub const ALL: [SymbolKind; 6] = [
        Self::Circle,
        Self::Square,
        Self::Cross,
        Self::Diamond,
        Self::TriangleUp,
        Self::TriangleDown,
    ];

    /// Area of the marker for a given size.
    pub fn area(self, size: f64) -> f64 {
        match self {
            Self::Circle => PI * (size / 2.0).powi(2),
            Self::Square => size * size,
            Self::Cross => 5.0 / 9.0 * size * size,
            Self::Diamond => (PI / 6.0).tan() * size * size / 2.0,
            Self::TriangleUp | Self::TriangleDown => 3f64.sqrt() * (size / 2.0).powi(2),
        }
    }

    /// SVG path data of the marker centred on `(0, 0)`.
    pub fn path(self, size: f64) -> String {
        let area = self.area(size.max(0.0));
        let n = format_number;
        match self {
            Self::Circle => {
                let r = (area / PI).sqrt();
                format!(
                    "M0,{r}A{r},{r} 0 1,1 0,{nr}A{r},{r} 0 1,1 0,{r}Z",
                    r = n(r),
                    nr = n(-r)
                )
            }
            Self::Square => {
                let r = area.sqrt() / 2.0;
                format!(
                    "M{nr},{nr}L{r},{nr} {r},{r} {nr},{r}Z",
                    r = n(r),
                    nr = n(-r)
                )
            }
            Self::Cross => {
                let r = (area / 5.0).sqrt() / 2.0;
                format!(
                    "M{a},{nr}H{nr}V{a}H{r}V{nr}H{b}V{r}H{r}V{b}H{nr}V{r}H{a}Z",
                    r = n(r),
                    nr = n(-r),
                    a = n(-3.0 * r),
                    b = n(3.0 * r)
                )
            }
            Self::Diamond => {
                let tan30 = (PI / 6.0).tan();
                let ry = (area / (2.0 * tan30)).sqrt();
                let rx = ry * tan30;
                format!(
                    "M0,{nry}L{rx},0 0,{ry} {nrx},0Z",
                    ry = n(ry),
                    nry = n(-ry),
                    rx = n(rx),
                    nrx = n(-rx)
                )
            }
            Self::TriangleUp | Self::TriangleDown => {
                let rx = (area / 3f64.sqrt()).sqrt();
                let ry = rx * 3f64.sqrt() / 2.0;
                let (tip, base) = if self == Self::TriangleUp { (-ry, ry) } else { (ry, -ry) };
                format!(
                    "M0,{tip}L{rx},{base} {nrx},{base}Z",
                    tip = n(tip),
                    base = n(base),
                    rx = n(rx),
                    nrx = n(-rx)
                )
            }
        }
    }
}

impl FromStr for SymbolKind {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "circle" => Ok(Self::Circle),
            "square" => Ok(Self::Square),
            "cross" => Ok(Self::Cross),
            "diamond" => Ok(Self::Diamond),
            "triangle-up" => Ok(Self::TriangleUp),
            "triangle-down" => Ok(Self::TriangleDown),
            _ => Err(ChartError::InvalidOption {
                kind: "symbol",
                value: value.to_string(),
            }),
        }
    }
}
