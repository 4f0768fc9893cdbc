//! Axes render a scale's ticks along one edge of a plot.
//!
//! An axis is fixed-size across its orientation (the height of a horizontal
//! axis, the width of a vertical one) and stretches along it. On layout it
//! sets its scale's range to its own length so that plots sharing the scale
//! line up with the tick marks.

pub mod category;
pub mod numeric;
pub mod time;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentBase, XAlign, YAlign};
use crate::error::{ChartError, Result};
use crate::format::Formatter;
use crate::svg::{NodeId, SvgDocument};
use crate::text::DEFAULT_FONT_SIZE;

pub use category::CategoryAxis;
pub use numeric::NumericAxis;
pub use time::{TierLabelPosition, TimeAxis, TimeInterval, TimeTierConfig};

/// Class of regular tick marks.
pub const TICK_MARK_CLASS: &str = "tick-mark";
/// Class of the tick marks at the ends of the domain.
pub const END_TICK_MARK_CLASS: &str = "end-tick-mark";
/// Class of tick labels.
pub const TICK_LABEL_CLASS: &str = "tick-label";
/// Class of the line along the inner edge.
pub const BASELINE_CLASS: &str = "baseline";

pub const DEFAULT_TICK_LENGTH: f64 = 5.0;
pub const DEFAULT_END_TICK_LENGTH: f64 = 5.0;
pub const DEFAULT_TICK_LABEL_PADDING: f64 = 10.0;
pub const DEFAULT_GUTTER: f64 = 15.0;

/// Edge of the plot an axis sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrientation {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl AxisOrientation {
    /// Check whether the axis runs left to right.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl FromStr for AxisOrientation {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(ChartError::InvalidOrientation(value.to_string())),
        }
    }
}

/// Settings and SVG containers shared by every axis.
#[derive(Debug)]
pub struct AxisCore {
    orientation: AxisOrientation,
    formatter: Formatter,
    tick_length: f64,
    end_tick_length: f64,
    tick_label_padding: f64,
    gutter: f64,
    show_end_tick_labels: bool,
    font_size: f64,
    tick_marks: Option<NodeId>,
    tick_labels: Option<NodeId>,
    baseline: Option<NodeId>,
}

impl AxisCore {
    pub(crate) fn new(orientation: AxisOrientation, formatter: Formatter) -> Self {
        Self {
            orientation,
            formatter,
            tick_length: DEFAULT_TICK_LENGTH,
            end_tick_length: DEFAULT_END_TICK_LENGTH,
            tick_label_padding: DEFAULT_TICK_LABEL_PADDING,
            gutter: DEFAULT_GUTTER,
            show_end_tick_labels: false,
            font_size: DEFAULT_FONT_SIZE,
            tick_marks: None,
            tick_labels: None,
            baseline: None,
        }
    }

    /// Longest tick mark, which sets how far labels sit from the baseline.
    fn max_tick_length(&self) -> f64 {
        self.tick_length.max(self.end_tick_length)
    }

    /// Space between the baseline and the outer edge, excluding the labels.
    fn fixed_depth(&self) -> f64 {
        self.max_tick_length() + self.tick_label_padding + self.gutter
    }

    pub(crate) fn base_classes(orientation: AxisOrientation, kind: &str) -> String {
        format!("axis {kind} {}-axis", orientation.as_str())
    }

    pub(crate) fn apply_default_alignment(&self, base: &mut ComponentBase) {
        match self.orientation {
            AxisOrientation::Top => base.set_y_align(YAlign::Bottom),
            AxisOrientation::Bottom => base.set_y_align(YAlign::Top),
            AxisOrientation::Left => base.set_x_align(XAlign::Right),
            AxisOrientation::Right => base.set_x_align(XAlign::Left),
        }
    }

    pub(crate) fn setup(&mut self, base: &ComponentBase) {
        let (Some(surface), Some(content)) = (base.surface(), base.content()) else {
            return;
        };
        let mut doc = surface.document_mut();
        let tick_marks = doc.append(content, "g");
        doc.add_class(tick_marks, "tick-mark-container");
        let tick_labels = doc.append(content, "g");
        doc.add_class(tick_labels, "tick-label-container");
        let baseline = doc.append(content, "line");
        doc.add_class(baseline, BASELINE_CLASS);
        self.tick_marks = Some(tick_marks);
        self.tick_labels = Some(tick_labels);
        self.baseline = Some(baseline);
    }

    /// Baseline along the edge facing the plot.
    fn draw_baseline(&self, doc: &mut SvgDocument, width: f64, height: f64) {
        let Some(baseline) = self.baseline else {
            return;
        };
        let (x1, y1, x2, y2) = match self.orientation {
            AxisOrientation::Bottom => (0.0, 0.0, width, 0.0),
            AxisOrientation::Top => (0.0, height, width, height),
            AxisOrientation::Left => (width, 0.0, width, height),
            AxisOrientation::Right => (0.0, 0.0, 0.0, height),
        };
        doc.set_number(baseline, "x1", x1);
        doc.set_number(baseline, "y1", y1);
        doc.set_number(baseline, "x2", x2);
        doc.set_number(baseline, "y2", y2);
    }

    fn draw_tick_mark(&self, doc: &mut SvgDocument, position: f64, end: bool, width: f64, height: f64) {
        let Some(container) = self.tick_marks else {
            return;
        };
        let length = if end { self.end_tick_length } else { self.tick_length };
        let (x1, y1, x2, y2) = match self.orientation {
            AxisOrientation::Bottom => (position, 0.0, position, length),
            AxisOrientation::Top => (position, height, position, height - length),
            AxisOrientation::Left => (width, position, width - length, position),
            AxisOrientation::Right => (0.0, position, length, position),
        };
        let line = doc.append(container, "line");
        doc.add_class(line, if end { END_TICK_MARK_CLASS } else { TICK_MARK_CLASS });
        doc.set_number(line, "x1", x1);
        doc.set_number(line, "y1", y1);
        doc.set_number(line, "x2", x2);
        doc.set_number(line, "y2", y2);
    }

    /// Place a tick label and return its extent along the axis.
    fn draw_tick_label(
        &self,
        doc: &mut SvgDocument,
        position: f64,
        text: &str,
        size: (f64, f64),
        width: f64,
        height: f64,
    ) -> (NodeId, f64, f64) {
        let offset = self.max_tick_length() + self.tick_label_padding;
        let container = self.tick_labels.unwrap_or_else(|| doc.root());
        let label = doc.append(container, "text");
        doc.add_class(label, TICK_LABEL_CLASS);
        doc.set_text(label, text.to_string());
        doc.set_number(label, "font-size", self.font_size);
        let (x, y, anchor, baseline) = match self.orientation {
            AxisOrientation::Bottom => (position, offset, "middle", "hanging"),
            AxisOrientation::Top => (position, height - offset, "middle", "text-after-edge"),
            AxisOrientation::Left => (width - offset, position, "end", "central"),
            AxisOrientation::Right => (offset, position, "start", "central"),
        };
        doc.set_number(label, "x", x);
        doc.set_number(label, "y", y);
        doc.set_attr(label, "text-anchor", anchor);
        doc.set_attr(label, "dominant-baseline", baseline);
        let half = if self.orientation.is_horizontal() {
            size.0 / 2.0
        } else {
            size.1 / 2.0
        };
        (label, position - half, position + half)
    }

    fn clear(&self, doc: &mut SvgDocument) {
        for container in [self.tick_marks, self.tick_labels].into_iter().flatten() {
            doc.clear_children(container);
        }
    }
}

/// One labelled position along an axis.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tick {
    pub position: f64,
    pub text: String,
    pub end: bool,
}

/// Draw baseline, tick marks and labels, hiding labels that collide.
pub(crate) fn render_ticks(axis: &AxisCore, base: &ComponentBase, ticks: &[Tick]) {
    let Some(surface) = base.surface() else {
        return;
    };
    let (width, height) = (base.width(), base.height());
    let length = if axis.orientation.is_horizontal() { width } else { height };
    let sizes: Vec<(f64, f64)> = ticks
        .iter()
        .map(|tick| base.measure_text(&tick.text, axis.font_size))
        .collect();

    let mut doc = surface.document_mut();
    axis.clear(&mut doc);
    axis.draw_baseline(&mut doc, width, height);

    let mut placed: Vec<(NodeId, f64, f64)> = Vec::new();
    for (tick, size) in ticks.iter().zip(sizes) {
        axis.draw_tick_mark(&mut doc, tick.position, tick.end, width, height);
        if tick.end || tick.text.is_empty() {
            continue;
        }
        placed.push(axis.draw_tick_label(&mut doc, tick.position, &tick.text, size, width, height));
    }

    placed.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut last_shown_end = f64::NEG_INFINITY;
    for (label, start, end) in placed {
        let cut_off = start < -1e-9 || end > length + 1e-9;
        let overlaps = start < last_shown_end;
        if (cut_off && !axis.show_end_tick_labels) || overlaps {
            doc.set_attr(label, "visibility", "hidden");
        } else {
            last_shown_end = end;
        }
    }
}

/// Shared axis configuration.
pub trait Axis: Component {
    fn core(&self) -> &AxisCore;

    fn core_mut(&mut self) -> &mut AxisCore;

    fn orientation(&self) -> AxisOrientation {
        self.core().orientation
    }

    /// Move the axis to another edge.
    fn set_orientation(&mut self, orientation: AxisOrientation) {
        let previous = self.core().orientation;
        self.core_mut().orientation = orientation;
        let base = self.base_mut();
        base.set_class(&format!("{}-axis", previous.as_str()), false);
        base.set_class(&format!("{}-axis", orientation.as_str()), true);
        base.hook().request_layout();
    }

    fn formatter(&self) -> &Formatter {
        &self.core().formatter
    }

    fn set_formatter(&mut self, formatter: Formatter) {
        self.core_mut().formatter = formatter;
        self.base().hook().request_layout();
    }

    fn tick_length(&self) -> f64 {
        self.core().tick_length
    }

    fn set_tick_length(&mut self, length: f64) -> Result<()> {
        if length < 0.0 || !length.is_finite() {
            return Err(ChartError::InvalidOption {
                kind: "tick length",
                value: length.to_string(),
            });
        }
        self.core_mut().tick_length = length;
        self.base().hook().request_layout();
        Ok(())
    }

    fn end_tick_length(&self) -> f64 {
        self.core().end_tick_length
    }

    fn set_end_tick_length(&mut self, length: f64) -> Result<()> {
        if length < 0.0 || !length.is_finite() {
            return Err(ChartError::InvalidOption {
                kind: "end tick length",
                value: length.to_string(),
            });
        }
        self.core_mut().end_tick_length = length;
        self.base().hook().request_layout();
        Ok(())
    }

    fn tick_label_padding(&self) -> f64 {
        self.core().tick_label_padding
    }

    fn set_tick_label_padding(&mut self, padding: f64) -> Result<()> {
        if padding < 0.0 || !padding.is_finite() {
            return Err(ChartError::InvalidOption {
                kind: "tick label padding",
                value: padding.to_string(),
            });
        }
        self.core_mut().tick_label_padding = padding;
        self.base().hook().request_layout();
        Ok(())
    }

    /// Space between the tick labels and the outer edge.
    fn gutter(&self) -> f64 {
        self.core().gutter
    }

    fn set_gutter(&mut self, gutter: f64) -> Result<()> {
        if gutter < 0.0 || !gutter.is_finite() {
            return Err(ChartError::InvalidOption {
                kind: "gutter",
                value: gutter.to_string(),
            });
        }
        self.core_mut().gutter = gutter;
        self.base().hook().request_layout();
        Ok(())
    }

    /// Whether labels cut off by the axis ends are still shown.
    fn show_end_tick_labels(&self) -> bool {
        self.core().show_end_tick_labels
    }

    fn set_show_end_tick_labels(&mut self, show: bool) {
        self.core_mut().show_end_tick_labels = show;
        self.base().hook().request_render();
    }

    fn font_size(&self) -> f64 {
        self.core().font_size
    }

    fn set_font_size(&mut self, size: f64) {
        self.core_mut().font_size = size;
        self.base().hook().request_layout();
    }
}

/// Requested depth of an axis whose widest (or tallest) label is `label_depth`.
pub(crate) fn requested_depth(axis: &AxisCore, label_depth: f64) -> f64 {
    axis.fixed_depth() + label_depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_parses_case_insensitively() {
        assert_eq!("Left".parse::<AxisOrientation>(), Ok(AxisOrientation::Left));
        assert!(AxisOrientation::Top.is_horizontal());
        assert_eq!(
            "diagonal".parse::<AxisOrientation>(),
            Err(ChartError::InvalidOrientation("diagonal".into()))
        );
    }

    #[test]
    fn depth_sums_ticks_padding_and_gutter() {
        let core = AxisCore::new(AxisOrientation::Bottom, Formatter::general());
        assert!((requested_depth(&core, 14.4) - 44.4).abs() < 1e-9);
    }
}
