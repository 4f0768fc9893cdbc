//! Line plot: one stroked path per dataset.

use std::fmt;

use serde_json::Value;

use crate::accessor::{Accessor, AttrToProjector};
use crate::animator::{Animator, Easing, Timing};
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::{DrawStep, DrawerKind};
use crate::extent::{Extent, number};
use crate::geom::Point;
use crate::interaction::hover::{HoverData, Hoverable};
use crate::scale::Scale;
use crate::scale::color::DEFAULT_PALETTE;
use crate::svg::NodeId;

use super::xy::{AutoAdjust, XyPlot, set_xy_ranges, update_xy_extents};
use super::{DatumRef, MAIN_ANIMATOR, Plot, PlotCore, RESET_ANIMATOR, render_plot};

pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
/// Horizontal pointer distance within which the nearest point is hovered.
pub const HOVER_RADIUS: f64 = 15.0;
const HOVER_TARGET_RADIUS: f64 = 3.0;

/// Pixel position of the y scale's zero, clamped into its domain.
pub(crate) fn zero_pixel(scale: Option<&Scale>) -> Value {
    match scale {
        Some(Scale::Quantitative(scale)) => {
            let (start, end) = scale.domain();
            number(scale.scale(Extent::new(start, end).clamp(0.0)))
        }
        Some(other) => other.scale(&number(0.0)),
        None => number(0.0),
    }
}

/// Connects each dataset's records in order, breaking at missing values.
pub struct LinePlot {
    core: PlotCore,
    auto_adjust: AutoAdjust,
    hover_target: Option<NodeId>,
}

impl LinePlot {
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>) -> Self {
        let mut core = PlotCore::new("line-plot", DrawerKind::Line);
        core.set_default_animator(RESET_ANIMATOR, Animator::Null);
        core.set_default_animator(
            MAIN_ANIMATOR,
            Animator::Base(Timing::default().with_duration(600.0).with_easing(Easing::ExpInOut)),
        );
        let mut plot = Self {
            core,
            auto_adjust: AutoAdjust::None,
            hover_target: None,
        };
        plot.x("x", x_scale);
        plot.y("y", y_scale);
        plot
    }

    fn set_hover_target(&mut self, at: Option<Point>) {
        let (Some(surface), Some(foreground)) = (self.core.base().surface(), self.core.base().foreground()) else {
            return;
        };
        let mut doc = surface.document_mut();
        let target = match self.hover_target.filter(|node| doc.contains(*node)) {
            Some(node) => node,
            None => {
                let node = doc.append(foreground, "circle");
                doc.add_class(node, "hover-target");
                doc.set_number(node, "r", HOVER_TARGET_RADIUS);
                node
            }
        };
        self.hover_target = Some(target);
        match at {
            Some(point) => {
                doc.set_number(target, "cx", point.x);
                doc.set_number(target, "cy", point.y);
                doc.remove_attr(target, "visibility");
            }
            None => doc.set_attr(target, "visibility", "hidden"),
        }
    }
}

impl fmt::Debug for LinePlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinePlot")
            .field("core", &self.core)
            .field("auto_adjust", &self.auto_adjust)
            .finish()
    }
}

impl Plot for LinePlot {
    fn core(&self) -> &PlotCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        &mut self.core
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        let mut attrs = self.core.projectors();
        attrs
            .entry("stroke".to_string())
            .or_insert_with(|| Accessor::constant(DEFAULT_PALETTE[0]).projector());
        attrs
            .entry("stroke-width".to_string())
            .or_insert_with(|| Accessor::constant(DEFAULT_STROKE_WIDTH).projector());
        attrs
    }

    fn generate_draw_steps(&self) -> Vec<DrawStep> {
        let attrs = self.generate_attr_to_projector();
        if !self.core.is_animated() {
            return vec![DrawStep::new(attrs, Animator::Null)];
        }
        let mut flat = attrs.clone();
        flat.insert(
            "y".to_string(),
            Accessor::constant(zero_pixel(self.core.scale_of("y").as_ref())).projector(),
        );
        vec![
            DrawStep::new(flat, self.core.animator(RESET_ANIMATOR)),
            DrawStep::new(attrs, self.core.animator(MAIN_ANIMATOR)),
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

    /// Horizontal distance first, vertical distance breaks ties.
    fn distance(&self, query: Point, pixel: Point, _attrs: &AttrToProjector, _at: &DatumRef<'_>) -> (f64, f64) {
        ((query.x - pixel.x).abs(), (query.y - pixel.y).abs())
    }
}

impl XyPlot for LinePlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.auto_adjust
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        &mut self.auto_adjust
    }
}

impl Hoverable for LinePlot {
    fn hover_over_component(&mut self, _point: Point) {}

    fn hover_out_component(&mut self, _point: Point) {
        self.set_hover_target(None);
    }

    fn do_hover(&mut self, point: Point) -> HoverData {
        let closest = self.closest_plot_data(point);
        let hovered = match closest.pixel_positions.first() {
            Some(pixel) if (pixel.x - point.x).abs() <= HOVER_RADIUS => Some(*pixel),
            _ => None,
        };
        self.set_hover_target(hovered);
        if hovered.is_some() {
            closest
        } else {
            HoverData::default()
        }
    }
}

impl Component for LinePlot {
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

    fn surface() -> ChartSurface {
        ChartSurface::with_config(
            100.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        )
    }

    fn plot() -> LinePlot {
        let x = QuantitativeScale::linear();
        let y = QuantitativeScale::linear();
        x.set_domain(0.0, 10.0).expect("domain");
        y.set_domain(0.0, 10.0).expect("domain");
        LinePlot::new(x, y)
    }

    #[test]
    fn gaps_split_the_stroke() {
        let surface = surface();
        let mut plot = plot();
        plot.add_dataset(Dataset::new(vec![
            json!({"x": 0, "y": 0}),
            json!({"x": 2, "y": 5}),
            json!({"x": 4, "y": null}),
            json!({"x": 6, "y": 5}),
            json!({"x": 8, "y": 10}),
        ]));
        let plot: ComponentRef = share(plot);
        render_to(&plot, &surface).expect("render");

        let svg = surface.to_svg_string();
        assert!(svg.contains("d=\"M0,100L20,50M60,50L80,0\""));
        assert!(svg.contains("stroke=\"#5279c7\""));
        assert!(svg.contains("stroke-width=\"2\""));
        assert!(svg.contains("fill=\"none\""));
    }

    #[test]
    fn closest_point_is_x_dominant() {
        let surface = surface();
        let plot = share(plot());
        plot.borrow_mut().add_dataset(Dataset::new(vec![
            json!({"x": 2, "y": 0}),
            json!({"x": 5, "y": 9}),
        ]));
        let as_dyn: ComponentRef = plot.clone();
        render_to(&as_dyn, &surface).expect("render");

        // (20,100) is closer in euclidean terms, (50,10) is closer horizontally.
        let found = plot.borrow().closest_plot_data(Point::new(40.0, 95.0));
        assert_eq!(found.data, vec![json!({"x": 5, "y": 9})]);

        let hovered = plot.borrow_mut().do_hover(Point::new(45.0, 95.0));
        assert_eq!(hovered.pixel_positions, vec![Point::new(50.0, 10.0)]);
        assert!(surface.to_svg_string().contains("class=\"hover-target\" r=\"3\" cx=\"50\" cy=\"10\""));
        plot.borrow_mut().hover_out_component(Point::new(0.0, 0.0));
        assert!(surface.to_svg_string().contains("visibility=\"hidden\""));
    }

    #[test]
    fn reset_step_flattens_to_zero() {
        let mut plot = plot();
        plot.core().scale_of("y").expect("y").set_range(100.0, 0.0);
        plot.animate(true);
        let steps = plot.generate_draw_steps();
        assert_eq!(steps.len(), 2);
        let y = steps[0].attr_to_projector["y"](&json!({"y": 7}), 0, &Value::Null, &Default::default());
        assert_eq!(y, json!(100.0));
    }
}
