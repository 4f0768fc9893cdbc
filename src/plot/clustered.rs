//! Clustered bars: datasets side by side within each category.

use std::fmt;

use crate::accessor::AttrToProjector;
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::DrawStep;
use crate::geom::Point;
use crate::interaction::hover::{HoverData, Hoverable};
use crate::scale::{CategoryScale, Scale};

use super::bar::{BarOrientation, BarPlot};
use super::xy::{AutoAdjust, XyPlot, set_xy_ranges};
use super::{DatumRef, Plot, PlotCore, render_plot};

/// Bar plot that splits each band between its datasets.
pub struct ClusteredBarPlot {
    bar: BarPlot,
    inner: CategoryScale,
}

impl ClusteredBarPlot {
    /// Clustered bars reading `x` and `y` keys, one slot per dataset.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>, orientation: BarOrientation) -> Self {
        Self {
            bar: BarPlot::with_class("bar-plot clustered-bar-plot", x_scale, y_scale, orientation),
            inner: CategoryScale::new(),
        }
    }

    /// Underlying bar plot, for bar options.
    pub fn bar(&self) -> &BarPlot {
        &self.bar
    }

    /// Mutable access to the underlying bar plot.
    pub fn bar_mut(&mut self) -> &mut BarPlot {
        &mut self.bar
    }

    /// Scale placing datasets within one band.
    pub fn inner_scale(&self) -> &CategoryScale {
        &self.inner
    }

    /// Lay the datasets out inside one outer band.
    fn make_clusters(&mut self) {
        self.bar.width_override = None;
        let outer = self.bar.bar_width();
        self.inner.set_domain(self.bar.dataset_order());
        self.inner.set_range(-outer / 2.0, outer / 2.0);
        for (key, entry) in self.bar.core_mut().entries_mut() {
            entry.metadata.cluster_position = self.inner.scale(key).unwrap_or(0.0);
        }
        self.bar.width_override = Some(self.inner.range_band());
    }
}

impl fmt::Debug for ClusteredBarPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusteredBarPlot")
            .field("bar", &self.bar)
            .field("inner", &self.inner)
            .finish()
    }
}

impl Plot for ClusteredBarPlot {
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
        self.bar.update_extents();
    }

    fn before_draw(&mut self) {
        self.bar.before_draw();
        self.make_clusters();
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

impl XyPlot for ClusteredBarPlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.bar.auto_adjust()
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        self.bar.auto_adjust_slot()
    }
}

impl Hoverable for ClusteredBarPlot {
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

impl Component for ClusteredBarPlot {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::component::{ComponentRef, render_to, share};
    use crate::dataset::Dataset;
    use crate::render_controller::RenderPolicy;
    use crate::scale::QuantitativeScale;
    use crate::surface::{ChartSurface, SurfaceConfig};

    #[test]
    fn datasets_share_each_band() {
        let surface = ChartSurface::with_config(
            200.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let x = CategoryScale::new();
        // One band from 50 to 150.
        x.set_inner_padding(0.0);
        x.set_outer_padding(0.5);
        let y = QuantitativeScale::linear();
        y.set_domain(0.0, 10.0).expect("domain");
        let mut plot = ClusteredBarPlot::new(x, y, BarOrientation::Vertical);
        plot.inner_scale().set_inner_padding(0.0);
        plot.inner_scale().set_outer_padding(0.0);
        plot.add_dataset_with_key("first", Dataset::new(vec![json!({"x": "a", "y": 5})]))
            .expect("add");
        plot.add_dataset_with_key("second", Dataset::new(vec![json!({"x": "a", "y": 10})]))
            .expect("add");
        let plot: ComponentRef = share(plot);
        render_to(&plot, &surface).expect("render");

        let svg = surface.to_svg_string();
        assert!(svg.contains("<rect x=\"50\" y=\"50\" width=\"50\" height=\"50\""));
        assert!(svg.contains("<rect x=\"100\" y=\"0\" width=\"50\" height=\"100\""));
        assert!(svg.contains("class=\"component plot bar-plot clustered-bar-plot vertical\""));
    }
}
