//! Gradient legend for an [`InterpolatedColorScale`].

use std::fmt;

use crate::broadcaster::ListenerKey;
use crate::error::{ChartError, Result};
use crate::format::Formatter;
use crate::scale::{InterpolatedColorScale, Scale};
use crate::svg::{NodeId, SvgDocument};
use crate::text::DEFAULT_FONT_SIZE;

use super::{Component, ComponentBase, LabelOrientation, SpaceRequest, XAlign, YAlign};

/// Class of the two end labels.
pub const LEGEND_LABEL_CLASS: &str = "legend-label";
/// Class of each color swatch.
pub const SWATCH_CLASS: &str = "swatch";

pub const DEFAULT_SWATCH_COUNT: usize = 10;

const PADDING: f64 = 5.0;

/// Row or column of swatches sampled from the scale, labelled at both ends.
pub struct InterpolatedColorLegend {
    base: ComponentBase,
    scale: InterpolatedColorScale,
    orientation: LabelOrientation,
    formatter: Formatter,
    swatch_count: usize,
    font_size: f64,
}

impl InterpolatedColorLegend {
    /// Horizontal legend with general number labels.
    pub fn new(scale: InterpolatedColorScale) -> Self {
        let mut base = ComponentBase::new("legend interpolated-color-legend");
        base.set_x_align(XAlign::Right);
        base.set_y_align(YAlign::Top);
        let legend = Self {
            base,
            scale,
            orientation: LabelOrientation::Horizontal,
            formatter: Formatter::general(),
            swatch_count: DEFAULT_SWATCH_COUNT,
            font_size: DEFAULT_FONT_SIZE,
        };
        legend.listen();
        legend
    }

    fn listen(&self) {
        let hook = self.base.hook().clone();
        self.scale
            .broadcaster()
            .register(ListenerKey::Id(self.base.id().get()), move |_: &Scale| {
                hook.request_layout()
            });
    }

    pub fn scale(&self) -> &InterpolatedColorScale {
        &self.scale
    }

    pub fn orientation(&self) -> LabelOrientation {
        self.orientation
    }

    /// Lay swatches out horizontally, or in a column with labels to the left or right.
    pub fn set_orientation(&mut self, orientation: LabelOrientation) {
        self.orientation = orientation;
        self.base.hook().request_layout();
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn set_formatter(&mut self, formatter: Formatter) {
        self.formatter = formatter;
        self.base.hook().request_layout();
    }

    pub fn swatch_count(&self) -> usize {
        self.swatch_count
    }

    /// Fewer than two swatches cannot show a gradient and are rejected.
    pub fn set_swatch_count(&mut self, count: usize) -> Result<()> {
        if count < 2 {
            return Err(ChartError::InvalidOption {
                kind: "swatch count",
                value: count.to_string(),
            });
        }
        self.swatch_count = count;
        self.base.hook().request_layout();
        Ok(())
    }

    /// Values the swatches sample, lowest first.
    pub fn swatch_values(&self) -> Vec<f64> {
        let (low, high) = self.scale.domain();
        let last = (self.swatch_count.max(2) - 1) as f64;
        (0..self.swatch_count)
            .map(|index| low + (high - low) * index as f64 / last)
            .collect()
    }

    fn labels(&self) -> (String, String) {
        let (low, high) = self.scale.domain();
        (
            self.formatter.format_number(low),
            self.formatter.format_number(high),
        )
    }

    fn text_height(&self) -> f64 {
        self.base.measure_text("Hg", self.font_size).1
    }

    fn label(&self, doc: &mut SvgDocument, parent: NodeId, text: String, at: (f64, f64), anchor: &str, baseline: &str) {
        let label = doc.append(parent, "text");
        doc.add_class(label, LEGEND_LABEL_CLASS);
        doc.set_text(label, text);
        doc.set_number(label, "font-size", self.font_size);
        doc.set_number(label, "x", at.0);
        doc.set_number(label, "y", at.1);
        doc.set_attr(label, "text-anchor", anchor);
        doc.set_attr(label, "dominant-baseline", baseline);
    }

    fn swatch(&self, doc: &mut SvgDocument, parent: NodeId, value: f64, rect: (f64, f64, f64, f64)) {
        let swatch = doc.append(parent, "rect");
        doc.add_class(swatch, SWATCH_CLASS);
        doc.set_number(swatch, "x", rect.0);
        doc.set_number(swatch, "y", rect.1);
        doc.set_number(swatch, "width", rect.2.max(0.0));
        doc.set_number(swatch, "height", rect.3.max(0.0));
        if let Some(color) = self.scale.scale(value) {
            doc.set_attr(swatch, "fill", color);
        }
    }
}

impl fmt::Debug for InterpolatedColorLegend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpolatedColorLegend")
            .field("base", &self.base)
            .field("scale", &self.scale)
            .field("orientation", &self.orientation)
            .field("swatch_count", &self.swatch_count)
            .finish()
    }
}

impl Component for InterpolatedColorLegend {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        let text_height = self.text_height();
        let (lower, upper) = self.labels();
        let lower = self.base.measure_text(&lower, self.font_size).0;
        let upper = self.base.measure_text(&upper, self.font_size).0;
        let swatches = text_height * self.swatch_count as f64;
        match self.orientation {
            LabelOrientation::Horizontal => {
                SpaceRequest::new(4.0 * PADDING + lower + upper + swatches, text_height + 2.0 * PADDING)
            }
            LabelOrientation::Left | LabelOrientation::Right => {
                SpaceRequest::new(3.0 * PADDING + text_height + lower.max(upper), 2.0 * PADDING + swatches)
            }
        }
    }

    fn is_fixed_width(&self) -> bool {
        true
    }

    fn is_fixed_height(&self) -> bool {
        true
    }

    fn render_immediately(&mut self) {
        let (Some(surface), Some(content)) = (self.base.surface(), self.base.content()) else {
            return;
        };
        let (width, height) = (self.base.width(), self.base.height());
        let text_height = self.text_height();
        let (lower, upper) = self.labels();
        let lower_width = self.base.measure_text(&lower, self.font_size).0;
        let upper_width = self.base.measure_text(&upper, self.font_size).0;
        let values = self.swatch_values();
        let count = values.len().max(1) as f64;

        let mut doc = surface.document_mut();
        doc.clear_children(content);
        match self.orientation {
            LabelOrientation::Horizontal => {
                let middle = height / 2.0;
                let start = 2.0 * PADDING + lower_width;
                let step = (width - start - 2.0 * PADDING - upper_width).max(0.0) / count;
                let top = middle - text_height / 2.0;
                for (index, value) in values.iter().enumerate() {
                    let x = start + index as f64 * step;
                    self.swatch(&mut doc, content, *value, (x, top, step, text_height));
                }
                self.label(&mut doc, content, lower, (PADDING, middle), "start", "central");
                self.label(&mut doc, content, upper, (width - PADDING, middle), "end", "central");
            }
            LabelOrientation::Left | LabelOrientation::Right => {
                let right = self.orientation == LabelOrientation::Right;
                let step = (height - 2.0 * PADDING).max(0.0) / count;
                let column = if right { PADDING } else { width - PADDING - text_height };
                // Highest value on top.
                for (index, value) in values.iter().rev().enumerate() {
                    let y = PADDING + index as f64 * step;
                    self.swatch(&mut doc, content, *value, (column, y, text_height, step));
                }
                let (x, anchor) = if right {
                    (2.0 * PADDING + text_height, "start")
                } else {
                    (width - 2.0 * PADDING - text_height, "end")
                };
                self.label(&mut doc, content, upper, (x, PADDING), anchor, "hanging");
                self.label(&mut doc, content, lower, (x, height - PADDING), anchor, "text-after-edge");
            }
        }
    }

    fn on_remove(&mut self) {
        self.scale
            .broadcaster()
            .deregister(&ListenerKey::Id(self.base.id().get()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentRef, remove, render_to, share};
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    fn immediate_surface() -> ChartSurface {
        ChartSurface::with_config(
            400.0,
            300.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        )
    }

    fn hundred() -> InterpolatedColorScale {
        let scale = InterpolatedColorScale::default();
        scale.set_domain(0.0, 100.0).expect("domain");
        scale
    }

    #[test]
    fn requested_space_follows_orientation() {
        let mut legend = InterpolatedColorLegend::new(hundred());
        // "0" is 7.2 wide, "100" 21.6, text height 14.4.
        let request = legend.requested_space(400.0, 300.0);
        assert!((request.min_width - (20.0 + 7.2 + 21.6 + 144.0)).abs() < 1e-9);
        assert!((request.min_height - 24.4).abs() < 1e-9);

        legend.set_orientation(LabelOrientation::Left);
        let request = legend.requested_space(400.0, 300.0);
        assert!((request.min_width - (15.0 + 14.4 + 21.6)).abs() < 1e-9);
        assert!((request.min_height - 154.0).abs() < 1e-9);
    }

    #[test]
    fn swatches_sample_the_domain() {
        let mut legend = InterpolatedColorLegend::new(hundred());
        legend.set_swatch_count(5).expect("count");
        assert_eq!(legend.swatch_values(), vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert!(legend.set_swatch_count(1).is_err());
    }

    #[test]
    fn renders_swatches_and_end_labels() {
        let surface = immediate_surface();
        let scale = hundred();
        let legend: ComponentRef = share(InterpolatedColorLegend::new(scale.clone()));
        render_to(&legend, &surface).expect("render");

        let svg = surface.to_svg_string();
        assert_eq!(svg.matches("class=\"swatch\"").count(), 10);
        assert_eq!(svg.matches("class=\"legend-label\"").count(), 2);
        assert!(svg.contains("fill=\"#ffffff\""));
        assert!(svg.contains("fill=\"#b10026\""));
        assert!(svg.contains(">100</text>"));

        scale.set_domain(0.0, 50.0).expect("domain");
        surface.flush();
        assert!(surface.to_svg_string().contains(">50</text>"));
    }

    #[test]
    fn vertical_legend_puts_the_maximum_on_top() {
        let surface = immediate_surface();
        let legend = share(InterpolatedColorLegend::new(hundred()));
        legend.borrow_mut().set_orientation(LabelOrientation::Right);
        let handle: ComponentRef = legend.clone();
        render_to(&handle, &surface).expect("render");

        let doc = surface.document();
        let swatches = doc.select_all(doc.root(), "rect.swatch");
        assert_eq!(swatches.len(), 10);
        assert_eq!(doc.attr(swatches[0], "fill"), Some("#b10026"));
        assert_eq!(doc.number_attr(swatches[0], "y"), Some(5.0));
        assert_eq!(doc.number_attr(swatches[0], "x"), Some(5.0));
    }

    #[test]
    fn removal_stops_listening() {
        let surface = immediate_surface();
        let scale = hundred();
        let legend: ComponentRef = share(InterpolatedColorLegend::new(scale.clone()));
        render_to(&legend, &surface).expect("render");
        assert_eq!(scale.broadcaster().len(), 1);
        remove(&legend);
        assert!(scale.broadcaster().is_empty());
    }
}
