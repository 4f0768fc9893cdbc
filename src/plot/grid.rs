//! Heat-map style grid: rectangles colored through a color scale.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::accessor::{Accessor, AttrToProjector, PlotMetadata};
use crate::component::{Component, ComponentBase, LayoutOffer};
use crate::extent::{as_number, number};
use crate::geom::Point;
use crate::scale::Scale;

use super::rectangle::RectanglePlot;
use super::xy::{AutoAdjust, XyPlot};
use super::{DatumRef, Plot, PlotCore};

/// Record key read for the cell value when none is bound.
pub const DEFAULT_VALUE_KEY: &str = "value";

/// One cell per record. Category directions fill whole bands; quantitative
/// directions span `x` to `x2` and `y` to `y2` like a [`RectanglePlot`].
pub struct GridPlot {
    rect: RectanglePlot,
}

impl GridPlot {
    /// Grid over `x` and `y` keys, filled from `value` through `color_scale`.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>, color_scale: impl Into<Scale>) -> Self {
        let mut rect = RectanglePlot::new(x_scale, y_scale);
        rect.base_mut().set_class("grid-plot", true);
        rect.attr("fill", Accessor::key(DEFAULT_VALUE_KEY), Some(color_scale.into()));
        Self { rect }
    }

    /// Bind the cell value, colored through `color_scale`.
    pub fn fill(&mut self, accessor: impl Into<Accessor>, color_scale: impl Into<Scale>) {
        self.rect.attr("fill", accessor, Some(color_scale.into()));
    }

    /// Scale the fill is projected through.
    pub fn color_scale(&self) -> Option<Scale> {
        self.core().scale_of("fill")
    }

    pub fn x2(&mut self, accessor: impl Into<Accessor>) {
        self.rect.x2(accessor);
    }

    pub fn y2(&mut self, accessor: impl Into<Accessor>) {
        self.rect.y2(accessor);
    }
}

impl fmt::Debug for GridPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridPlot").field("rect", &self.rect).finish()
    }
}

impl Plot for GridPlot {
    fn core(&self) -> &PlotCore {
        self.rect.core()
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        self.rect.core_mut()
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        let mut attrs = self.rect.generate_attr_to_projector();
        for (position, length) in [("x", "width"), ("y", "height")] {
            let Some(Scale::Category(scale)) = self.core().scale_of(position) else {
                continue;
            };
            let Some(center) = self.core().projection(position).map(|projection| projection.projector()) else {
                continue;
            };
            let band = scale.range_band();
            attrs.insert(
                position.to_string(),
                Rc::new(move |datum: &Value, index: usize, user: &Value, meta: &PlotMetadata| {
                    number(as_number(&center(datum, index, user, meta)) - band / 2.0)
                }),
            );
            attrs.insert(length.to_string(), Accessor::constant(band).projector());
        }
        attrs
    }

    fn update_extents(&mut self) {
        self.rect.update_extents();
    }

    fn before_draw(&mut self) {
        self.rect.before_draw();
    }

    fn pixel_point(&self, attrs: &AttrToProjector, at: &DatumRef<'_>) -> Option<Point> {
        self.rect.pixel_point(attrs, at)
    }
}

impl XyPlot for GridPlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.rect.auto_adjust()
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        self.rect.auto_adjust_slot()
    }

    fn x(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>) {
        self.rect.x(accessor, scale);
    }

    fn y(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>) {
        self.rect.y(accessor, scale);
    }
}

impl Component for GridPlot {
    fn base(&self) -> &ComponentBase {
        self.rect.base()
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        self.rect.base_mut()
    }

    fn setup(&mut self) {
        self.rect.setup();
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        self.rect.compute_layout(offer);
    }

    fn render_immediately(&mut self) {
        super::render_plot(self);
    }

    fn data_changed(&mut self) {
        self.refresh_extents();
    }

    fn on_remove(&mut self) {
        self.rect.on_remove();
    }
}
