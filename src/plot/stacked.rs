//! Stacked bars and areas.
//!
//! Each dataset is drawn on top of the datasets before it. Offsets are kept
//! per key (the shared position value) and per sign, so a negative segment
//! stacks downwards from the zero line even when positive segments sit
//! above it. The offsets land in each dataset's [`PlotMetadata`], and the
//! whole stack's extent is registered on the value scale so auto-domaining
//! covers the visual height of the stack.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::accessor::{Accessor, AttrToProjector, PlotMetadata};
use crate::animator::Animator;
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::DrawStep;
use crate::extent::{Extent, as_key, as_number, number};
use crate::geom::Point;
use crate::interaction::hover::{HoverData, Hoverable};
use crate::scale::{Scale, ScaleExtent};
use crate::svg::NodeId;

use super::area::AreaPlot;
use super::bar::{BarOrientation, BarPlot};
use super::xy::{AutoAdjust, XyPlot, set_xy_ranges};
use super::{DatumRef, MAIN_ANIMATOR, Plot, PlotCore, RESET_ANIMATOR, STACK_EXTENT_ATTR, render_plot};

/// Per-dataset offsets and the extent of the whole stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackOffsets {
    /// One map per dataset, in stacking order: key to the value below it.
    pub offsets: Vec<IndexMap<String, f64>>,
    /// `[min(0, lowest), max(0, highest)]` over every stacked total.
    pub extent: Option<Extent>,
}

/// Stack `(key, value)` records dataset by dataset.
///
/// Positive values stack on the positive running total of their key and
/// negative values on the negative one. A zero joins the negative stack only
/// when its whole dataset is non-positive. Within one dataset the last
/// record for a key wins.
pub fn stack_offsets(datasets: &[Vec<(String, f64)>]) -> StackOffsets {
    let mut positive: IndexMap<String, f64> = IndexMap::new();
    let mut negative: IndexMap<String, f64> = IndexMap::new();
    let mut result = StackOffsets::default();
    let (mut low, mut high) = (0.0_f64, 0.0_f64);
    let mut stacked_any = false;

    for records in datasets {
        let mut values: IndexMap<&str, f64> = IndexMap::new();
        for (key, value) in records {
            values.insert(key.as_str(), *value);
        }
        let all_non_positive = values.values().all(|value| *value <= 0.0);
        let mut offsets = IndexMap::with_capacity(values.len());
        for (key, value) in values {
            let downwards = value < 0.0 || (value == 0.0 && all_non_positive);
            let stack = if downwards { &mut negative } else { &mut positive };
            let running = stack.entry(key.to_string()).or_insert(0.0);
            offsets.insert(key.to_string(), *running);
            if value.is_finite() {
                *running += value;
                low = low.min(*running);
                high = high.max(*running);
                stacked_any = true;
            }
        }
        result.offsets.push(offsets);
    }
    result.extent = stacked_any.then(|| Extent::new(low, high));
    result
}

/// Recompute every dataset's offsets from the current data.
pub(crate) fn apply_stacking(core: &mut PlotCore, position_attr: &str, value_attr: &str) -> Option<Extent> {
    let position = core.projection(position_attr)?.accessor.projector();
    let value = core.projection(value_attr)?.accessor.projector();
    let records: Vec<Vec<(String, f64)>> = core
        .entries()
        .values()
        .map(|entry| {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            data.iter()
                .enumerate()
                .filter_map(|(index, datum)| {
                    let key = as_key(&position(datum, index, &user, &entry.metadata))?;
                    Some((key, as_number(&value(datum, index, &user, &entry.metadata))))
                })
                .collect()
        })
        .collect();
    let stacked = stack_offsets(&records);
    for (entry, offsets) in core.entries_mut().values_mut().zip(stacked.offsets) {
        entry.metadata.offsets = offsets;
    }
    stacked.extent
}

/// Publish the stack extent on the value scale, or withdraw it.
pub(crate) fn register_stack_extent(core: &PlotCore, value_attr: &str, extent: Option<Extent>) {
    let Some(scale) = core.scale_of(value_attr) else {
        return;
    };
    match extent {
        Some(extent) => scale.update_extent(&core.plot_owner(), STACK_EXTENT_ATTR, ScaleExtent::Numeric(extent)),
        None => scale.remove_extent(&core.plot_owner(), STACK_EXTENT_ATTR),
    }
}

fn scaled(scale: Option<&Scale>, value: f64) -> Value {
    match scale {
        Some(scale) => scale.scale(&number(value)),
        None => number(value),
    }
}

/// Bars stacked per position, positive upwards and negative downwards.
pub struct StackedBarPlot {
    bar: BarPlot,
}

impl StackedBarPlot {
    /// Stacked bars reading `x` and `y` keys.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>, orientation: BarOrientation) -> Self {
        let mut bar = BarPlot::with_class("bar-plot stacked-bar-plot", x_scale, y_scale, orientation);
        bar.stacked = true;
        Self { bar }
    }

    /// Underlying bar plot.
    pub fn bar(&self) -> &BarPlot {
        &self.bar
    }

    /// Mutable access to the underlying bar plot, for alignment, labels and hover mode.
    pub fn bar_mut(&mut self) -> &mut BarPlot {
        &mut self.bar
    }
}

impl fmt::Debug for StackedBarPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackedBarPlot").field("bar", &self.bar).finish()
    }
}

impl Plot for StackedBarPlot {
    fn core(&self) -> &PlotCore {
        self.bar.core()
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        self.bar.core_mut()
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        self.bar.generate_attr_to_projector()
    }

    fn generate_draw_steps(&self) -> Vec<DrawStep> {
        self.bar.generate_draw_steps()
    }

    fn update_extents(&mut self) {
        let (position, value) = (self.bar.position_attr(), self.bar.value_attr());
        let extent = apply_stacking(self.bar.core_mut(), position, value);
        self.bar.update_bar_extents(&[value]);
        register_stack_extent(self.bar.core(), value, extent);
    }

    fn before_draw(&mut self) {
        if self.bar.auto_adjust() != AutoAdjust::None {
            self.update_extents();
        }
    }

    fn after_draw(&mut self, attrs: &AttrToProjector) {
        self.bar.after_draw(attrs);
    }

    fn pixel_point(&self, attrs: &AttrToProjector, at: &DatumRef<'_>) -> Option<Point> {
        self.bar.pixel_point(attrs, at)
    }

    fn distance(&self, query: Point, pixel: Point, attrs: &AttrToProjector, at: &DatumRef<'_>) -> (f64, f64) {
        self.bar.distance(query, pixel, attrs, at)
    }
}

impl XyPlot for StackedBarPlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.bar.auto_adjust()
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        self.bar.auto_adjust_slot()
    }
}

impl Hoverable for StackedBarPlot {
    fn hover_over_component(&mut self, point: Point) {
        self.bar.hover_over_component(point);
    }

    fn hover_out_component(&mut self, point: Point) {
        self.bar.hover_out_component(point);
    }

    fn do_hover(&mut self, point: Point) -> HoverData {
        self.bar.do_hover(point)
    }
}

impl Component for StackedBarPlot {
    fn base(&self) -> &ComponentBase {
        self.bar.base()
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        self.bar.base_mut()
    }

    fn setup(&mut self) {
        self.bar.setup();
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        set_xy_ranges(self.bar.core());
    }

    fn render_immediately(&mut self) {
        render_plot(self);
    }

    fn data_changed(&mut self) {
        self.refresh_extents();
    }

    fn on_remove(&mut self) {
        self.bar.teardown();
    }

    fn as_hoverable_mut(&mut self) -> Option<&mut dyn Hoverable> {
        Some(self)
    }
}

/// Areas stacked per x value, each filled down to the one below it.
pub struct StackedAreaPlot {
    area: AreaPlot,
    baseline: Option<NodeId>,
}

impl StackedAreaPlot {
    /// Stacked areas reading `x` and `y` keys.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>) -> Self {
        Self {
            area: AreaPlot::with_class("area-plot stacked-area-plot", x_scale, y_scale),
            baseline: None,
        }
    }

    fn draw_baseline(&mut self) {
        let (Some(surface), Some(area)) = (self.core().base().surface(), self.core().render_area()) else {
            return;
        };
        let pixel = as_number(&scaled(self.core().scale_of("y").as_ref(), 0.0));
        let width = self.core().base().width();
        let line = {
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
            for (name, value) in [("x1", 0.0), ("y1", pixel), ("x2", width), ("y2", pixel)] {
                doc.set_number(line, name, value);
            }
            line
        };
        self.baseline = Some(line);
    }
}

impl fmt::Debug for StackedAreaPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackedAreaPlot").field("area", &self.area).finish()
    }
}

impl Plot for StackedAreaPlot {
    fn core(&self) -> &PlotCore {
        self.area.core()
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        self.area.core_mut()
    }

    /// `y` is the top of the segment and `y0` its bottom, both in pixels.
    fn generate_attr_to_projector(&self) -> AttrToProjector {
        let mut attrs = self.area.generate_attr_to_projector();
        let core = self.core();
        let (Some(x), Some(y)) = (core.projection("x"), core.projection("y")) else {
            return attrs;
        };
        let key_of = x.accessor.projector();
        let value_of = y.accessor.projector();
        let offset_of = Rc::new(move |datum: &Value, index: usize, user: &Value, meta: &PlotMetadata| {
            as_key(&key_of(datum, index, user, meta)).map_or(0.0, |key| meta.offset(&key))
        });

        let top = {
            let (offset_of, scale) = (offset_of.clone(), y.scale.clone());
            move |datum: &Value, index: usize, user: &Value, meta: &PlotMetadata| {
                let value = as_number(&value_of(datum, index, user, meta));
                scaled(scale.as_ref(), offset_of(datum, index, user, meta) + value)
            }
        };
        let scale = y.scale.clone();
        let bottom = move |datum: &Value, index: usize, user: &Value, meta: &PlotMetadata| {
            scaled(scale.as_ref(), offset_of(datum, index, user, meta))
        };
        attrs.insert("y".to_string(), Rc::new(top));
        attrs.insert("y0".to_string(), Rc::new(bottom));
        attrs
    }

    fn generate_draw_steps(&self) -> Vec<DrawStep> {
        let attrs = self.generate_attr_to_projector();
        if !self.core().is_animated() {
            return vec![DrawStep::new(attrs, Animator::Null)];
        }
        let mut flat = attrs.clone();
        if let Some(y0) = attrs.get("y0") {
            flat.insert("y".to_string(), y0.clone());
        }
        vec![
            DrawStep::new(flat, self.core().animator(RESET_ANIMATOR)),
            DrawStep::new(attrs, self.core().animator(MAIN_ANIMATOR)),
        ]
    }

    fn update_extents(&mut self) {
        let extent = apply_stacking(self.area.core_mut(), "x", "y");
        self.area.update_area_extents(&["y"]);
        register_stack_extent(self.area.core(), "y", extent);
    }

    fn before_draw(&mut self) {
        if self.area.auto_adjust() != AutoAdjust::None {
            self.update_extents();
        }
    }

    fn after_draw(&mut self, _attrs: &AttrToProjector) {
        self.draw_baseline();
    }
}

impl XyPlot for StackedAreaPlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.area.auto_adjust()
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        self.area.auto_adjust_slot()
    }

    fn y(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>) {
        self.area.y(accessor, scale);
    }
}

impl Component for StackedAreaPlot {
    fn base(&self) -> &ComponentBase {
        self.area.base()
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        self.area.base_mut()
    }

    fn setup(&mut self) {
        self.area.setup();
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        set_xy_ranges(self.area.core());
    }

    fn render_immediately(&mut self) {
        render_plot(self);
    }

    fn data_changed(&mut self) {
        self.refresh_extents();
    }

    fn on_remove(&mut self) {
        self.area.teardown();
    }
}
