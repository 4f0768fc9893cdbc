//! Bar plot and the bar geometry shared by clustered and stacked bars.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accessor::{Accessor, AttrToProjector, PlotMetadata, Projector};
use crate::animator::Animator;
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::{DrawStep, DrawerKind};
use crate::error::{ChartError, Result};
use crate::extent::{as_key, as_number, number};
use crate::format::Formatter;
use crate::geom::{Point, Rect};
use crate::interaction::hover::{HoverData, Hoverable};
use crate::scale::Scale;
use crate::scale::color::DEFAULT_PALETTE;
use crate::svg::NodeId;
use crate::text::DEFAULT_FONT_SIZE;

use super::xy::{AutoAdjust, XyPlot, set_xy_ranges, sync_baseline, update_xy_extents};
use super::{DatumRef, Plot, PlotCore, render_plot};

/// Animator that collapses bars onto the baseline.
pub const BARS_RESET_ANIMATOR: &str = "bars-reset";
/// Animator that grows bars to their values.
pub const BARS_ANIMATOR: &str = "bars";
/// Share of the smallest gap between positions a bar fills on a quantitative scale.
pub const BAR_WIDTH_RATIO: f64 = 0.95;
/// Share of the range a lone bar fills on a quantitative scale.
pub const SINGLE_BAR_DIMENSION_RATIO: f64 = 0.4;
const HIT_TOLERANCE: f64 = 0.5;

/// Direction bars grow in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarOrientation {
    #[default]
    Vertical,
    Horizontal,
}

impl FromStr for BarOrientation {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            other => Err(ChartError::InvalidOrientation(other.to_string())),
        }
    }
}

/// Where a bar sits relative to its position on a quantitative scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarAlignment {
    /// The position is the bar's leading edge.
    Left,
    #[default]
    Center,
    /// The position is the bar's trailing edge.
    Right,
}

impl BarAlignment {
    fn proportion(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

impl FromStr for BarAlignment {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(ChartError::InvalidAlignment(other.to_string())),
        }
    }
}

/// What counts as hovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoverMode {
    /// Bars under the pointer.
    #[default]
    Point,
    /// Bars crossing the pointer's position along the category direction.
    Line,
}

impl FromStr for HoverMode {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "point" => Ok(Self::Point),
            "line" => Ok(Self::Line),
            other => Err(ChartError::InvalidOption {
                kind: "hover mode",
                value: other.to_string(),
            }),
        }
    }
}

fn to_pixel(scale: Option<&Scale>, value: f64) -> f64 {
    match scale {
        Some(Scale::Quantitative(scale)) => scale.scale(value),
        Some(other) => as_number(&other.scale(&number(value))),
        None => value,
    }
}

fn raw_number(scale: Option<&Scale>, value: &Value) -> f64 {
    match scale {
        Some(Scale::Quantitative(scale)) => scale.coerce(value),
        _ => as_number(value),
    }
}

/// Rectangle of one bar, resolved from the drawn attributes.
pub(crate) fn rect_of(attrs: &AttrToProjector, at: &DatumRef<'_>) -> Option<Rect> {
    let rect = Rect::new(
        at.number(attrs, "x"),
        at.number(attrs, "y"),
        at.number(attrs, "width"),
        at.number(attrs, "height"),
    );
    [rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|value| value.is_finite())
        .then_some(rect)
}

fn gap(value: f64, low: f64, high: f64) -> f64 {
    if value < low {
        low - value
    } else if value > high {
        value - high
    } else {
        0.0
    }
}

struct BarGeometry {
    vertical: bool,
    position: Projector,
    position_key: Projector,
    value: Projector,
    value_scale: Option<Scale>,
    width: Option<Projector>,
    default_width: f64,
    align: f64,
    baseline: f64,
    stacked: bool,
}

impl BarGeometry {
    fn rect(&self, datum: &Value, index: usize, user: &Value, meta: &PlotMetadata) -> Rect {
        let position = as_number(&(self.position)(datum, index, user, meta)) + meta.cluster_position;
        let width = self
            .width
            .as_ref()
            .map_or(self.default_width, |width| as_number(&width(datum, index, user, meta)));
        let leading = position - width * self.align;
        let value = raw_number(self.value_scale.as_ref(), &(self.value)(datum, index, user, meta));
        let (from, to) = if self.stacked {
            let offset = as_key(&(self.position_key)(datum, index, user, meta))
                .map_or(0.0, |key| meta.offset(&key));
            (offset, offset + value)
        } else {
            (self.baseline, value)
        };
        let a = to_pixel(self.value_scale.as_ref(), from);
        let b = to_pixel(self.value_scale.as_ref(), to);
        let (low, length) = if a.is_finite() && b.is_finite() {
            (a.min(b), (a - b).abs())
        } else {
            (f64::NAN, f64::NAN)
        };
        if self.vertical {
            Rect::new(leading, low, width, length)
        } else {
            Rect::new(low, leading, length, width)
        }
    }
}

/// Rectangles from a baseline to each value, at each category or position.
pub struct BarPlot {
    core: PlotCore,
    orientation: BarOrientation,
    alignment: BarAlignment,
    baseline_value: f64,
    labels_enabled: bool,
    label_formatter: Formatter,
    hover_mode: HoverMode,
    auto_adjust: AutoAdjust,
    pub(crate) stacked: bool,
    pub(crate) width_override: Option<f64>,
    baseline: Option<NodeId>,
    label_area: Option<NodeId>,
}

impl BarPlot {
    /// Bar plot reading `x` and `y` keys; `orientation` picks the value direction.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>, orientation: BarOrientation) -> Self {
        Self::with_class("bar-plot", x_scale, y_scale, orientation)
    }

    pub(crate) fn with_class(
        class: &str,
        x_scale: impl Into<Scale>,
        y_scale: impl Into<Scale>,
        orientation: BarOrientation,
    ) -> Self {
        let mut core = PlotCore::new(class, DrawerKind::Rect);
        let direction = match orientation {
            BarOrientation::Vertical => "vertical",
            BarOrientation::Horizontal => "horizontal",
        };
        core.base_mut().set_class(direction, true);
        core.set_default_animator(BARS_RESET_ANIMATOR, Animator::Null);
        core.set_default_animator(BARS_ANIMATOR, Animator::base());
        let mut plot = Self {
            core,
            orientation,
            alignment: BarAlignment::Center,
            baseline_value: 0.0,
            labels_enabled: false,
            label_formatter: Formatter::Identity,
            hover_mode: HoverMode::Point,
            auto_adjust: AutoAdjust::None,
            stacked: false,
            width_override: None,
            baseline: None,
            label_area: None,
        };
        plot.x("x", x_scale);
        plot.y("y", y_scale);
        plot
    }

    pub fn orientation(&self) -> BarOrientation {
        self.orientation
    }

    pub fn is_vertical(&self) -> bool {
        self.orientation == BarOrientation::Vertical
    }

    /// Attribute carrying the category or position.
    pub fn position_attr(&self) -> &'static str {
        if self.is_vertical() { "x" } else { "y" }
    }

    /// Attribute carrying the bar's value.
    pub fn value_attr(&self) -> &'static str {
        if self.is_vertical() { "y" } else { "x" }
    }

    pub fn alignment(&self) -> BarAlignment {
        self.alignment
    }

    /// Place bars relative to quantitative positions. Category positions always centre.
    pub fn set_alignment(&mut self, alignment: BarAlignment) {
        self.alignment = alignment;
        self.core.base().hook().request_render();
    }

    pub fn baseline_value(&self) -> f64 {
        self.baseline_value
    }

    /// Value bars grow from.
    pub fn set_baseline_value(&mut self, value: f64) {
        self.baseline_value = value;
        self.refresh_extents();
    }

    pub fn labels_enabled(&self) -> bool {
        self.labels_enabled
    }

    /// Show each bar's value inside it when the text fits.
    pub fn set_labels_enabled(&mut self, enabled: bool) {
        self.labels_enabled = enabled;
        self.core.base().hook().request_render();
    }

    pub fn label_formatter(&self) -> &Formatter {
        &self.label_formatter
    }

    pub fn set_label_formatter(&mut self, formatter: Formatter) {
        self.label_formatter = formatter;
        self.core.base().hook().request_render();
    }

    pub fn hover_mode(&self) -> HoverMode {
        self.hover_mode
    }

    pub fn set_hover_mode(&mut self, mode: HoverMode) {
        self.hover_mode = mode;
    }

    fn baseline_key(&self) -> String {
        format!("BAR_PLOT{}", self.core.base().id().get())
    }

    /// Width of a bar when none is projected.
    pub fn bar_width(&self) -> f64 {
        if let Some(width) = self.width_override {
            return width;
        }
        match self.core.scale_of(self.position_attr()) {
            Some(Scale::Category(scale)) => scale.range_band(),
            Some(scale) => self.quantitative_bar_width(&scale),
            None => 0.0,
        }
    }

    fn quantitative_bar_width(&self, scale: &Scale) -> f64 {
        let Some(projector) = self
            .core
            .projection(self.position_attr())
            .map(|projection| projection.projector())
        else {
            return 0.0;
        };
        let mut positions: Vec<f64> = Vec::new();
        for entry in self.core.entries().values() {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            positions.extend(
                data.iter()
                    .enumerate()
                    .map(|(index, datum)| as_number(&projector(datum, index, &user, &entry.metadata)))
                    .filter(|value| value.is_finite()),
            );
        }
        positions.sort_by(f64::total_cmp);
        positions.dedup();
        let smallest_gap = positions
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(f64::INFINITY, f64::min);
        if smallest_gap.is_finite() {
            smallest_gap * BAR_WIDTH_RATIO
        } else {
            let span = match scale {
                Scale::Quantitative(scale) => {
                    let (start, end) = scale.range();
                    (end - start).abs()
                }
                _ => 0.0,
            };
            span * SINGLE_BAR_DIMENSION_RATIO
        }
    }

    fn geometry(&self) -> Option<Rc<BarGeometry>> {
        let position = self.core.projection(self.position_attr())?;
        let value = self.core.projection(self.value_attr())?;
        let align = match position.scale {
            Some(Scale::Category(_)) => 0.5,
            _ => self.alignment.proportion(),
        };
        let width_attr = if self.is_vertical() { "width" } else { "height" };
        Some(Rc::new(BarGeometry {
            vertical: self.is_vertical(),
            position: position.projector(),
            position_key: position.accessor.projector(),
            value: value.accessor.projector(),
            value_scale: value.scale.clone(),
            width: self
                .core
                .projection(width_attr)
                .map(|projection| projection.projector()),
            default_width: self.bar_width(),
            align,
            baseline: self.baseline_value,
            stacked: self.stacked,
        }))
    }

    fn bar_projectors(&self) -> AttrToProjector {
        let mut attrs = AttrToProjector::new();
        if let Some(geometry) = self.geometry() {
            let pick = |field: fn(&Rect) -> f64| -> Projector {
                let geometry = geometry.clone();
                Rc::new(move |datum: &Value, index: usize, user: &Value, meta: &PlotMetadata| {
                    number(field(&geometry.rect(datum, index, user, meta)))
                })
            };
            attrs.insert("x".to_string(), pick(|rect| rect.x));
            attrs.insert("y".to_string(), pick(|rect| rect.y));
            attrs.insert("width".to_string(), pick(|rect| rect.width));
            attrs.insert("height".to_string(), pick(|rect| rect.height));
        }
        for (name, projector) in self.core.projectors() {
            attrs.entry(name).or_insert(projector);
        }
        attrs
            .entry("fill".to_string())
            .or_insert_with(|| Accessor::constant(DEFAULT_PALETTE[0]).projector());
        attrs
    }

    fn collapsed_projectors(&self, attrs: &AttrToProjector) -> AttrToProjector {
        let mut collapsed = attrs.clone();
        let scale = self.core.scale_of(self.value_attr());
        let baseline = to_pixel(scale.as_ref(), self.baseline_value);
        let (edge, length) = if self.is_vertical() { ("y", "height") } else { ("x", "width") };
        collapsed.insert(edge.to_string(), Accessor::constant(baseline).projector());
        collapsed.insert(length.to_string(), Accessor::constant(0.0).projector());
        collapsed
    }

    fn raw_value(&self, at: &DatumRef<'_>) -> Value {
        self.core
            .projection(self.value_attr())
            .map(|projection| projection.accessor.get(at.datum, at.index, at.user, at.metadata))
            .unwrap_or(Value::Null)
    }

    /// Extents, skipping `skip`, plus the baseline exception on the value scale.
    pub(crate) fn update_bar_extents(&self, skip: &[&str]) {
        update_xy_extents(&self.core, self.auto_adjust, skip);
        sync_baseline(
            self.core.scale_of(self.value_attr()).as_ref(),
            &self.baseline_key(),
            Some(self.baseline_value),
            true,
        );
    }

    pub(crate) fn teardown(&mut self) {
        sync_baseline(
            self.core.scale_of(self.value_attr()).as_ref(),
            &self.baseline_key(),
            None,
            true,
        );
        self.core.teardown();
    }

    /// Bars hit by `point` under the current hover mode.
    pub(crate) fn bars_under(&self, attrs: &AttrToProjector, point: Point) -> HoverData {
        let mut found = HoverData::default();
        for (key, entry) in self.core.entries() {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            for (index, datum) in data.iter().enumerate() {
                let at = DatumRef {
                    key,
                    datum,
                    index,
                    user: &user,
                    metadata: &entry.metadata,
                };
                let Some(rect) = rect_of(attrs, &at) else {
                    continue;
                };
                let hit = match (self.hover_mode, self.is_vertical()) {
                    (HoverMode::Point, _) => rect.contains(point, HIT_TOLERANCE),
                    (HoverMode::Line, true) => gap(point.x, rect.x, rect.right()) <= HIT_TOLERANCE,
                    (HoverMode::Line, false) => gap(point.y, rect.y, rect.bottom()) <= HIT_TOLERANCE,
                };
                if !hit {
                    continue;
                }
                found.data.push(datum.clone());
                found.origins.push((key.clone(), index));
                found
                    .pixel_positions
                    .extend(self.pixel_point(attrs, &at));
                found.selection.extend(entry.drawer.selection(index));
            }
        }
        found
    }

    /// Mark hovered bars, or clear the marks when nothing is hovered.
    pub(crate) fn apply_hover_classes(&self, hovered: &HoverData) {
        let Some(surface) = self.core.base().surface() else {
            return;
        };
        let mut doc = surface.document_mut();
        for entry in self.core.entries().values() {
            for element in entry.drawer.elements() {
                doc.remove_class(*element, "hovered");
                doc.remove_class(*element, "not-hovered");
                if hovered.is_empty() {
                    continue;
                }
                let class = if hovered.selection.contains(element) {
                    "hovered"
                } else {
                    "not-hovered"
                };
                doc.add_class(*element, class);
            }
        }
    }

    fn draw_baseline(&mut self) {
        let (Some(surface), Some(area)) = (self.core.base().surface(), self.core.render_area()) else {
            return;
        };
        let pixel = to_pixel(self.core.scale_of(self.value_attr()).as_ref(), self.baseline_value);
        let (width, height) = (self.core.base().width(), self.core.base().height());
        let mut doc = surface.document_mut();
        let line = match self.baseline.filter(|node| doc.contains(*node)) {
            Some(node) => {
                doc.append_child(area, node);
                node
            }
            None => {
                let node = doc.append(area, "line");
                doc.add_class(node, "baseline");
                node
            }
        };
        let (x1, y1, x2, y2) = if self.is_vertical() {
            (0.0, pixel, width, pixel)
        } else {
            (pixel, 0.0, pixel, height)
        };
        for (name, value) in [("x1", x1), ("y1", y1), ("x2", x2), ("y2", y2)] {
            doc.set_number(line, name, value);
        }
        self.baseline = Some(line);
    }

    fn draw_labels(&mut self, attrs: &AttrToProjector) {
        let (Some(surface), Some(area)) = (self.core.base().surface().cloned(), self.core.render_area()) else {
            return;
        };
        let mut labels = Vec::new();
        if self.labels_enabled {
            for (key, entry) in self.core.entries() {
                let data = entry.dataset.data();
                let user = entry.dataset.metadata();
                for (index, datum) in data.iter().enumerate() {
                    let at = DatumRef {
                        key,
                        datum,
                        index,
                        user: &user,
                        metadata: &entry.metadata,
                    };
                    let Some(rect) = rect_of(attrs, &at) else {
                        continue;
                    };
                    let text = self.label_formatter.format(&self.raw_value(&at));
                    let (text_width, text_height) = self.core.base().measure_text(&text, DEFAULT_FONT_SIZE);
                    if text.is_empty() || text_width > rect.width || text_height > rect.height {
                        continue;
                    }
                    labels.push((text, rect));
                }
            }
        }
        let mut doc = surface.document_mut();
        let container = match self.label_area.filter(|node| doc.contains(*node)) {
            Some(node) => {
                doc.clear_children(node);
                doc.append_child(area, node);
                node
            }
            None => {
                let node = doc.append(area, "g");
                doc.add_class(node, "bar-label-text-area");
                node
            }
        };
        for (text, rect) in labels {
            let label = doc.append(container, "text");
            doc.add_class(label, "bar-label");
            doc.set_number(label, "font-size", DEFAULT_FONT_SIZE);
            doc.set_number(label, "x", rect.x + rect.width / 2.0);
            doc.set_number(label, "y", rect.y + rect.height / 2.0);
            doc.set_attr(label, "text-anchor", "middle");
            doc.set_attr(label, "dominant-baseline", "central");
            doc.set_text(label, text);
        }
        self.label_area = Some(container);
    }
}

impl fmt::Debug for BarPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarPlot")
            .field("core", &self.core)
            .field("orientation", &self.orientation)
            .field("alignment", &self.alignment)
            .field("baseline_value", &self.baseline_value)
            .field("labels_enabled", &self.labels_enabled)
            .field("hover_mode", &self.hover_mode)
            .finish()
    }
}

impl Plot for BarPlot {
    fn core(&self) -> &PlotCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        &mut self.core
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        self.bar_projectors()
    }

    fn generate_draw_steps(&self) -> Vec<DrawStep> {
        let attrs = self.generate_attr_to_projector();
        if !self.core.is_animated() {
            return vec![DrawStep::new(attrs, Animator::Null)];
        }
        vec![
            DrawStep::new(
                self.collapsed_projectors(&attrs),
                self.core.animator(BARS_RESET_ANIMATOR),
            ),
            DrawStep::new(attrs, self.core.animator(BARS_ANIMATOR)),
        ]
    }

    fn update_extents(&mut self) {
        self.update_bar_extents(&[]);
    }

    fn before_draw(&mut self) {
        if self.auto_adjust != AutoAdjust::None {
            self.update_extents();
        }
    }

    fn after_draw(&mut self, attrs: &AttrToProjector) {
        self.draw_baseline();
        self.draw_labels(attrs);
    }

    /// Centre of the bar's value end.
    fn pixel_point(&self, attrs: &AttrToProjector, at: &DatumRef<'_>) -> Option<Point> {
        let rect = rect_of(attrs, at)?;
        let scale = self.core.scale_of(self.value_attr());
        let value = raw_number(scale.as_ref(), &self.raw_value(at));
        let reference = if self.stacked { 0.0 } else { self.baseline_value };
        let negative = value < reference;
        Some(if self.is_vertical() {
            Point::new(
                rect.x + rect.width / 2.0,
                if negative { rect.bottom() } else { rect.y },
            )
        } else {
            Point::new(
                if negative { rect.x } else { rect.right() },
                rect.y + rect.height / 2.0,
            )
        })
    }

    /// Zero inside the bar; otherwise the gap along the position direction, then along the value direction.
    fn distance(&self, query: Point, _pixel: Point, attrs: &AttrToProjector, at: &DatumRef<'_>) -> (f64, f64) {
        let Some(rect) = rect_of(attrs, at) else {
            return (f64::INFINITY, f64::INFINITY);
        };
        if rect.contains(query, HIT_TOLERANCE) {
            return (0.0, 0.0);
        }
        let horizontal_gap = gap(query.x, rect.x, rect.right());
        let vertical_gap = gap(query.y, rect.y, rect.bottom());
        if self.is_vertical() {
            (horizontal_gap, vertical_gap)
        } else {
            (vertical_gap, horizontal_gap)
        }
    }
}

impl XyPlot for BarPlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.auto_adjust
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        &mut self.auto_adjust
    }
}

impl Hoverable for BarPlot {
    fn hover_over_component(&mut self, _point: Point) {}

    fn hover_out_component(&mut self, _point: Point) {
        self.apply_hover_classes(&HoverData::default());
    }

    fn do_hover(&mut self, point: Point) -> HoverData {
        let attrs = self.generate_attr_to_projector();
        let hovered = self.bars_under(&attrs, point);
        self.apply_hover_classes(&hovered);
        hovered
    }
}

impl Component for BarPlot {
    fn base(&self) -> &ComponentBase {
        self.core.base()
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        self.core.base_mut()
    }

    fn setup(&mut self) {
        self.core.setup();
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        set_xy_ranges(&self.core);
    }

    fn render_immediately(&mut self) {
        render_plot(self);
    }

    fn data_changed(&mut self) {
        self.refresh_extents();
    }

    fn on_remove(&mut self) {
        self.teardown();
    }

    fn as_hoverable_mut(&mut self) -> Option<&mut dyn Hoverable> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::component::{ComponentRef, Shared, render_to, share};
    use crate::dataset::Dataset;
    use crate::extent::Extent;
    use crate::render_controller::RenderPolicy;
    use crate::scale::{CategoryScale, QuantitativeScale};
    use crate::surface::{ChartSurface, SurfaceConfig};

    fn surface() -> ChartSurface {
        ChartSurface::with_config(
            200.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        )
    }

    /// Bands of width 50 centred on 50 and 150 once laid out on 200 pixels.
    fn categories() -> CategoryScale {
        let scale = CategoryScale::new();
        scale.set_inner_padding(1.0);
        scale.set_outer_padding(0.5);
        scale
    }

    fn rendered_plot(surface: &ChartSurface) -> Shared<BarPlot> {
        let y = QuantitativeScale::linear();
        y.set_domain(0.0, 10.0).expect("domain");
        let plot = share(BarPlot::new(categories(), y, BarOrientation::Vertical));
        plot.borrow_mut()
            .add_dataset(Dataset::new(vec![json!({"x": "a", "y": 5}), json!({"x": "b", "y": 8})]));
        let as_dyn: ComponentRef = plot.clone();
        render_to(&as_dyn, surface).expect("render");
        plot
    }

    #[test]
    fn options_parse() {
        assert_eq!("horizontal".parse::<BarOrientation>(), Ok(BarOrientation::Horizontal));
        assert_eq!(
            "diagonal".parse::<BarOrientation>(),
            Err(ChartError::InvalidOrientation("diagonal".into()))
        );
        assert_eq!("right".parse::<BarAlignment>(), Ok(BarAlignment::Right));
        assert!(matches!("top".parse::<BarAlignment>(), Err(ChartError::InvalidAlignment(_))));
        assert_eq!("line".parse::<HoverMode>(), Ok(HoverMode::Line));
        assert!(matches!(
            "area".parse::<HoverMode>(),
            Err(ChartError::InvalidOption { kind: "hover mode", .. })
        ));
    }

    #[test]
    fn vertical_bars_grow_from_the_baseline() {
        let surface = surface();
        let _plot = rendered_plot(&surface);
        let svg = surface.to_svg_string();
        assert!(svg.contains("<rect x=\"25\" y=\"50\" width=\"50\" height=\"50\" fill=\"#5279c7\"/>"));
        assert!(svg.contains("<rect x=\"125\" y=\"20\" width=\"50\" height=\"80\" fill=\"#5279c7\"/>"));
        assert!(svg.contains("<line class=\"baseline\" x1=\"0\" y1=\"100\" x2=\"200\" y2=\"100\"/>"));
    }

    #[test]
    fn labels_are_centred_when_they_fit() {
        let surface = surface();
        let plot = rendered_plot(&surface);
        plot.borrow_mut().set_labels_enabled(true);
        surface.flush();
        let svg = surface.to_svg_string();
        assert!(svg.contains(
            "<text class=\"bar-label\" font-size=\"12\" x=\"50\" y=\"75\" text-anchor=\"middle\" dominant-baseline=\"central\">5</text>"
        ));
        assert_eq!(svg.matches("class=\"bar-label\"").count(), 2);
    }

    #[test]
    fn hover_marks_bars_under_the_pointer() {
        let surface = surface();
        let plot = rendered_plot(&surface);
        let hovered = plot.borrow_mut().do_hover(Point::new(50.0, 70.0));
        assert_eq!(hovered.data, vec![json!({"x": "a", "y": 5})]);
        assert_eq!(hovered.pixel_positions, vec![Point::new(50.0, 50.0)]);
        let svg = surface.to_svg_string();
        assert!(svg.contains("<rect class=\"hovered\" x=\"25\""));
        assert!(svg.contains("<rect class=\"not-hovered\" x=\"125\""));

        plot.borrow_mut().set_hover_mode(HoverMode::Line);
        let hovered = plot.borrow_mut().do_hover(Point::new(150.0, 5.0));
        assert_eq!(hovered.data, vec![json!({"x": "b", "y": 8})]);

        plot.borrow_mut().hover_out_component(Point::new(0.0, 0.0));
        assert!(!surface.to_svg_string().contains("hovered"));
    }

    #[test]
    fn closest_bar_prefers_the_position_direction() {
        let surface = surface();
        let plot = rendered_plot(&surface);
        let found = plot.borrow().closest_plot_data(Point::new(60.0, 70.0));
        assert_eq!(found.data, vec![json!({"x": "a", "y": 5})]);
        // Equal horizontal gaps; b is vertically closer.
        let found = plot.borrow().closest_plot_data(Point::new(100.0, 10.0));
        assert_eq!(found.data, vec![json!({"x": "b", "y": 8})]);
    }

    #[test]
    fn baseline_is_included_and_not_padded() {
        let y = QuantitativeScale::linear();
        let mut plot = BarPlot::new(categories(), y.clone(), BarOrientation::Vertical);
        plot.add_dataset(Dataset::new(vec![json!({"x": "a", "y": 5}), json!({"x": "b", "y": 8})]));
        assert_eq!(y.domain().0, 0.0);
        assert!(y.domain().1 >= 8.0);

        plot.set_baseline_value(2.0);
        assert_eq!(y.domain().0, 2.0);
        plot.teardown();
        let unguarded = y.domainer().compute_domain(&[Extent::new(2.0, 8.0)], y.kind());
        assert!(unguarded.min < 2.0);
    }

    #[test]
    fn quantitative_positions_use_the_smallest_gap() {
        let x = QuantitativeScale::linear();
        x.set_domain(0.0, 10.0).expect("domain");
        x.set_range(0.0, 100.0);
        let mut plot = BarPlot::new(x.clone(), QuantitativeScale::linear(), BarOrientation::Vertical);
        plot.add_dataset(Dataset::new(vec![json!({"x": 1, "y": 1}), json!({"x": 3, "y": 1}), json!({"x": 7, "y": 1})]));
        assert!((plot.bar_width() - 19.0).abs() < 1e-9);

        plot.set_alignment(BarAlignment::Left);
        let attrs = plot.generate_attr_to_projector();
        let meta = PlotMetadata::default();
        let left = as_number(&attrs["x"](&json!({"x": 3, "y": 1}), 0, &Value::Null, &meta));
        assert!((left - 30.0).abs() < 1e-9);

        plot.remove_dataset("_0").expect("remove");
        plot.add_dataset(Dataset::new(vec![json!({"x": 5, "y": 1})]));
        assert!((plot.bar_width() - 40.0).abs() < 1e-9);
    }
}
