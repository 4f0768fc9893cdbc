//! Scatter plot: one marker per record.

use std::fmt;

use crate::accessor::{Accessor, AttrToProjector};
use crate::animator::{Animator, Timing};
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::{DrawStep, DrawerKind};
use crate::geom::Point;
use crate::interaction::hover::{HoverData, Hoverable};
use crate::scale::Scale;
use crate::scale::color::DEFAULT_PALETTE;

use super::xy::{AutoAdjust, XyPlot, set_xy_ranges, update_xy_extents};
use super::{Plot, PlotCore, render_plot};

/// Animator that collapses markers before they grow in.
pub const SYMBOLS_RESET_ANIMATOR: &str = "symbols-reset";
/// Animator that grows markers to their size.
pub const SYMBOLS_ANIMATOR: &str = "symbols";

pub const DEFAULT_SYMBOL_SIZE: f64 = 6.0;
pub const DEFAULT_OPACITY: f64 = 0.6;
/// Pointer distance within which a marker counts as hovered.
pub const HOVER_RADIUS: f64 = 5.0;

/// Markers at `(x, y)`, sized by `size` and shaped by `symbol`.
pub struct ScatterPlot {
    core: PlotCore,
    auto_adjust: AutoAdjust,
}

impl ScatterPlot {
    /// Scatter plot reading `x` and `y` keys through the given scales.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>) -> Self {
        let mut core = PlotCore::new("scatter-plot", DrawerKind::Symbol);
        core.set_default_animator(SYMBOLS_RESET_ANIMATOR, Animator::Null);
        core.set_default_animator(
            SYMBOLS_ANIMATOR,
            Animator::Base(Timing::default().with_duration(250.0).with_delay(5.0)),
        );
        let mut plot = Self {
            core,
            auto_adjust: AutoAdjust::None,
        };
        plot.x("x", x_scale);
        plot.y("y", y_scale);
        plot
    }
}

impl fmt::Debug for ScatterPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScatterPlot")
            .field("core", &self.core)
            .field("auto_adjust", &self.auto_adjust)
            .finish()
    }
}

impl Plot for ScatterPlot {
    fn core(&self) -> &PlotCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        &mut self.core
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        let mut attrs = self.core.projectors();
        let defaults = [
            ("size", Accessor::constant(DEFAULT_SYMBOL_SIZE)),
            ("fill", Accessor::constant(DEFAULT_PALETTE[0])),
            ("symbol", Accessor::constant("circle")),
            ("opacity", Accessor::constant(DEFAULT_OPACITY)),
        ];
        for (name, accessor) in defaults {
            attrs.entry(name.to_string()).or_insert_with(|| accessor.projector());
        }
        attrs
    }

    fn generate_draw_steps(&self) -> Vec<DrawStep> {
        let attrs = self.generate_attr_to_projector();
        if !self.core.is_animated() {
            return vec![DrawStep::new(attrs, Animator::Null)];
        }
        let mut collapsed = attrs.clone();
        collapsed.insert("size".to_string(), Accessor::constant(0.0).projector());
        vec![
            DrawStep::new(collapsed, self.core.animator(SYMBOLS_RESET_ANIMATOR)),
            DrawStep::new(attrs, self.core.animator(SYMBOLS_ANIMATOR)),
        ]
    }

    fn update_extents(&mut self) {
        update_xy_extents(&self.core, self.auto_adjust, &[]);
    }

    fn before_draw(&mut self) {
        if self.auto_adjust != AutoAdjust::None {
            self.update_extents();
        }
    }
}

impl XyPlot for ScatterPlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.auto_adjust
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        &mut self.auto_adjust
    }
}

impl Hoverable for ScatterPlot {
    fn hover_over_component(&mut self, _point: Point) {}

    fn hover_out_component(&mut self, _point: Point) {}

    fn do_hover(&mut self, point: Point) -> HoverData {
        let closest = self.closest_plot_data(point);
        match closest.pixel_positions.first() {
            Some(pixel) if pixel.distance_squared(point) <= HOVER_RADIUS * HOVER_RADIUS => closest,
            _ => HoverData::default(),
        }
    }
}

impl Component for ScatterPlot {
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
        self.core.teardown();
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

    fn scales() -> (QuantitativeScale, QuantitativeScale) {
        let x = QuantitativeScale::linear();
        let y = QuantitativeScale::linear();
        x.set_domain(0.0, 10.0).expect("domain");
        y.set_domain(0.0, 10.0).expect("domain");
        (x, y)
    }

    #[test]
    fn markers_are_placed_with_defaults() {
        let surface = ChartSurface::with_config(
            100.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let (x, y) = scales();
        let mut plot = ScatterPlot::new(x, y);
        plot.add_dataset(Dataset::new(vec![json!({"x": 2, "y": 5}), json!({"x": 8, "y": "bad"})]));
        let plot: ComponentRef = share(plot);
        render_to(&plot, &surface).expect("render");

        let svg = surface.to_svg_string();
        assert!(svg.contains("class=\"component plot scatter-plot\""));
        assert!(svg.contains("transform=\"translate(20,50)\""));
        assert!(svg.contains("fill=\"#5279c7\""));
        assert!(svg.contains("opacity=\"0.6\""));
        assert_eq!(svg.matches("class=\"symbol\"").count(), 2);
        assert!(svg.contains("display=\"none\""));
    }

    #[test]
    fn hover_picks_the_marker_under_the_pointer() {
        let surface = ChartSurface::with_config(
            100.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let (x, y) = scales();
        let plot = share(ScatterPlot::new(x, y));
        plot.borrow_mut()
            .add_dataset(Dataset::new(vec![json!({"x": 2, "y": 5}), json!({"x": 6, "y": 5})]));
        let as_dyn: ComponentRef = plot.clone();
        render_to(&as_dyn, &surface).expect("render");

        let hovered = plot.borrow_mut().do_hover(Point::new(58.0, 52.0));
        assert_eq!(hovered.data, vec![json!({"x": 6, "y": 5})]);
        assert_eq!(hovered.pixel_positions, vec![Point::new(60.0, 50.0)]);
        assert_eq!(hovered.selection.len(), 1);
        assert!(plot.borrow_mut().do_hover(Point::new(40.0, 50.0)).is_empty());
    }

    #[test]
    fn animated_draw_grows_markers_in() {
        let (x, y) = scales();
        let mut plot = ScatterPlot::new(x, y);
        assert_eq!(plot.generate_draw_steps().len(), 1);
        plot.animate(true);
        let steps = plot.generate_draw_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].animator, Animator::Null);
        let timing = steps[1].animator.timing().copied().expect("timing");
        assert!((timing.duration_ms() - 250.0).abs() < 1e-9);
        let size = steps[0].attr_to_projector["size"](&json!({}), 0, &json!(null), &Default::default());
        assert_eq!(size, json!(0.0));
    }
}
