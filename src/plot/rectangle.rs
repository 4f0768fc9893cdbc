//! Rectangle plot: one box per record spanning `(x, y)` to `(x2, y2)`.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::accessor::{Accessor, AttrToProjector, PlotMetadata, Projector};
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::DrawerKind;
use crate::extent::{as_number, number};
use crate::geom::Point;
use crate::scale::Scale;
use crate::scale::color::DEFAULT_PALETTE;

use super::bar::rect_of;
use super::xy::{AutoAdjust, XyPlot, adopt_xy_scale, set_xy_ranges, update_xy_extents};
use super::{DatumRef, Plot, PlotCore, render_plot};

/// Boxes between two corners, both corners mapped through the same scales.
pub struct RectanglePlot {
    core: PlotCore,
    auto_adjust: AutoAdjust,
}

impl RectanglePlot {
    /// Rectangles reading `x`, `y`, `x2` and `y2` keys.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>) -> Self {
        let mut plot = Self {
            core: PlotCore::new("rectangle-plot", DrawerKind::Rect),
            auto_adjust: AutoAdjust::None,
        };
        plot.x("x", x_scale);
        plot.y("y", y_scale);
        plot
    }

    /// Bind the second x corner through the x scale.
    pub fn x2(&mut self, accessor: impl Into<Accessor>) {
        let scale = self.x_scale();
        self.attr("x2", accessor, scale);
    }

    /// Bind the second y corner through the y scale.
    pub fn y2(&mut self, accessor: impl Into<Accessor>) {
        let scale = self.y_scale();
        self.attr("y2", accessor, scale);
    }

    /// Bind `attribute` and its partner corner to `scale`.
    fn bind_corner_pair(&mut self, first: &str, second: &str, accessor: Accessor, scale: Scale) {
        adopt_xy_scale(&scale);
        let partner = self
            .core
            .projection(second)
            .map(|projection| projection.accessor.clone())
            .unwrap_or_else(|| Accessor::key(second));
        self.attr(first, accessor, Some(scale.clone()));
        self.attr(second, partner, Some(scale));
    }
}

impl fmt::Debug for RectanglePlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RectanglePlot")
            .field("core", &self.core)
            .field("auto_adjust", &self.auto_adjust)
            .finish()
    }
}

/// Lower corner and length along one direction.
fn span(first: Projector, second: Projector, length: bool) -> Projector {
    Rc::new(move |datum: &Value, index: usize, user: &Value, meta: &PlotMetadata| {
        let a = as_number(&first(datum, index, user, meta));
        let b = as_number(&second(datum, index, user, meta));
        number(if length { (a - b).abs() } else { a.min(b) })
    })
}

impl Plot for RectanglePlot {
    fn core(&self) -> &PlotCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        &mut self.core
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        let mut attrs = self.core.projectors();
        let x2 = attrs.shift_remove("x2");
        let y2 = attrs.shift_remove("y2");
        let corners = [("x", "width", x2), ("y", "height", y2)];
        for (start, length, end) in corners {
            let (Some(first), Some(second)) = (attrs.get(start).cloned(), end) else {
                continue;
            };
            attrs.insert(start.to_string(), span(first.clone(), second.clone(), false));
            attrs.insert(length.to_string(), span(first, second, true));
        }
        attrs
            .entry("fill".to_string())
            .or_insert_with(|| Accessor::constant(DEFAULT_PALETTE[0]).projector());
        attrs
    }

    fn update_extents(&mut self) {
        update_xy_extents(&self.core, self.auto_adjust, &[]);
    }

    fn before_draw(&mut self) {
        if self.auto_adjust != AutoAdjust::None {
            self.update_extents();
        }
    }

    /// Centre of the box.
    fn pixel_point(&self, attrs: &AttrToProjector, at: &DatumRef<'_>) -> Option<Point> {
        let rect = rect_of(attrs, at)?;
        Some(Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0))
    }
}

impl XyPlot for RectanglePlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.auto_adjust
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        &mut self.auto_adjust
    }

    fn x(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>) {
        self.bind_corner_pair("x", "x2", accessor.into(), scale.into());
    }

    fn y(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>) {
        self.bind_corner_pair("y", "y2", accessor.into(), scale.into());
    }
}

impl Component for RectanglePlot {
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
    fn corners_become_boxes() {
        let surface = ChartSurface::with_config(
            100.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let (x, y) = scales();
        let plot = share(RectanglePlot::new(x, y));
        plot.borrow_mut().add_dataset(Dataset::new(vec![
            json!({"x": 1, "y": 2, "x2": 4, "y2": 6}),
            json!({"x": 9, "y": 0, "x2": 7, "y2": 1}),
        ]));
        let as_dyn: ComponentRef = plot.clone();
        render_to(&as_dyn, &surface).expect("render");

        let svg = surface.to_svg_string();
        assert!(svg.contains("<rect x=\"10\" y=\"40\" width=\"30\" height=\"40\" fill=\"#5279c7\"/>"));
        assert!(svg.contains("<rect x=\"70\" y=\"90\" width=\"20\" height=\"10\""));
        assert!(!svg.contains("x2="));

        let centres = plot.borrow().all_plot_data(None).pixel_positions;
        assert_eq!(centres[0], Point::new(25.0, 60.0));
    }

    #[test]
    fn both_corners_follow_a_new_scale() {
        let (x, y) = scales();
        let mut plot = RectanglePlot::new(x, y);
        plot.add_dataset(Dataset::new(vec![json!({"x": 1, "y": 2, "x2": 40, "y2": 6})]));
        let wide = QuantitativeScale::linear();
        plot.x("x", wide.clone());
        assert!(plot.core().scale_of("x2").expect("x2 scale").same_as(&wide.clone().into()));
        assert!(wide.domain().1 >= 40.0);
    }
}
