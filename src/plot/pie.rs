//! Pie plot: one sector per record, sized by its share of the total.

use std::f64::consts::TAU;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::accessor::{Accessor, AttrToProjector, PlotMetadata, Projector};
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::DrawerKind;
use crate::drawer::path::polar;
use crate::extent::{as_number, number};
use crate::geom::Point;
use crate::scale::Scale;
use crate::scale::color::DEFAULT_PALETTE;
use crate::svg::format_number;

use super::{DatumRef, Plot, PlotCore, render_plot};

/// Start and end angle of each record, per dataset key.
type Angles = IndexMap<String, Vec<(f64, f64)>>;

/// Sectors around the centre of the plot, angles from the `value` projection.
pub struct PiePlot {
    core: PlotCore,
}

impl PiePlot {
    /// Pie reading the `value` key of each record.
    pub fn new() -> Self {
        let mut plot = Self {
            core: PlotCore::new("pie-plot", DrawerKind::Arc),
        };
        plot.value("value");
        plot
    }

    /// Bind the sector size.
    pub fn value(&mut self, accessor: impl Into<Accessor>) {
        self.attr("value", accessor, None);
    }

    /// Bind the inner radius, zero by default.
    pub fn inner_radius(&mut self, accessor: impl Into<Accessor>, scale: Option<Scale>) {
        self.attr("inner-radius", accessor, scale);
    }

    /// Bind the outer radius, half the smaller plot dimension by default.
    pub fn outer_radius(&mut self, accessor: impl Into<Accessor>, scale: Option<Scale>) {
        self.attr("outer-radius", accessor, scale);
    }

    fn angles(&self) -> Angles {
        let Some(value) = self.core.projection("value").map(|projection| projection.projector()) else {
            return Angles::new();
        };
        let mut angles = Angles::new();
        for (key, entry) in self.core.entries() {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            let values: Vec<f64> = data
                .iter()
                .enumerate()
                .map(|(index, datum)| as_number(&value(datum, index, &user, &entry.metadata)))
                .map(|value| if value.is_finite() && value > 0.0 { value } else { 0.0 })
                .collect();
            let total: f64 = values.iter().sum();
            let mut start = 0.0;
            let sectors = values
                .iter()
                .map(|value| {
                    let sweep = if total > 0.0 { value / total * TAU } else { 0.0 };
                    let sector = (start, start + sweep);
                    start += sweep;
                    sector
                })
                .collect();
            angles.insert(key.clone(), sectors);
        }
        angles
    }

    fn centre(&self) -> Point {
        Point::new(self.core.base().width() / 2.0, self.core.base().height() / 2.0)
    }

    fn centre_render_area(&self) {
        let (Some(surface), Some(area)) = (self.core.base().surface(), self.core.render_area()) else {
            return;
        };
        let centre = self.centre();
        surface.document_mut().set_attr(
            area,
            "transform",
            format!("translate({},{})", format_number(centre.x), format_number(centre.y)),
        );
    }

    fn warn_on_unusable_values(&self) {
        if self.core.entries().len() > 1 {
            tracing::warn!(
                plot = self.core.base().id().get(),
                datasets = self.core.entries().len(),
                "pie plots expect a single dataset"
            );
        }
        let Some(value) = self.core.projection("value").map(|projection| projection.projector()) else {
            return;
        };
        for (key, entry) in self.core.entries() {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            let skipped = data
                .iter()
                .enumerate()
                .map(|(index, datum)| as_number(&value(datum, index, &user, &entry.metadata)))
                .filter(|value| !value.is_finite() || *value < 0.0)
                .count();
            if skipped > 0 {
                tracing::warn!(dataset = %key, skipped, "negative or missing pie values are drawn as empty sectors");
            }
        }
    }
}

impl Default for PiePlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PiePlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiePlot").field("core", &self.core).finish()
    }
}

fn angle_projector(angles: Rc<Angles>, pick: fn(&(f64, f64)) -> f64) -> Projector {
    Rc::new(move |_: &Value, index: usize, _: &Value, meta: &PlotMetadata| {
        angles
            .get(&meta.dataset_key)
            .and_then(|sectors| sectors.get(index))
            .map_or(Value::Null, |sector| number(pick(sector)))
    })
}

impl Plot for PiePlot {
    fn core(&self) -> &PlotCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        &mut self.core
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        let mut attrs = self.core.projectors();
        attrs.shift_remove("value");
        let angles = Rc::new(self.angles());
        attrs.insert("start-angle".to_string(), angle_projector(angles.clone(), |sector| sector.0));
        attrs.insert("end-angle".to_string(), angle_projector(angles, |sector| sector.1));

        let outer = self.core.base().width().min(self.core.base().height()) / 2.0;
        attrs
            .entry("inner-radius".to_string())
            .or_insert_with(|| Accessor::constant(0.0).projector());
        attrs
            .entry("outer-radius".to_string())
            .or_insert_with(|| Accessor::constant(outer).projector());
        let fill: Projector = Rc::new(|_: &Value, index: usize, _: &Value, _: &PlotMetadata| {
            Value::from(DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()])
        });
        attrs.entry("fill".to_string()).or_insert(fill);
        attrs
    }

    fn before_draw(&mut self) {
        self.centre_render_area();
        self.warn_on_unusable_values();
    }

    /// Centroid of the sector, in plot coordinates.
    fn pixel_point(&self, attrs: &AttrToProjector, at: &DatumRef<'_>) -> Option<Point> {
        let inner = at.number(attrs, "inner-radius");
        let outer = at.number(attrs, "outer-radius");
        let start = at.number(attrs, "start-angle");
        let end = at.number(attrs, "end-angle");
        if ![outer, start, end].iter().all(|value| value.is_finite()) {
            return None;
        }
        let inner = if inner.is_finite() { inner } else { 0.0 };
        let offset = polar((inner + outer) / 2.0, (start + end) / 2.0);
        let centre = self.centre();
        Some(Point::new(centre.x + offset.x, centre.y + offset.y))
    }
}

impl Component for PiePlot {
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
        self.centre_render_area();
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

    #[test]
    fn sectors_split_the_circle_by_value() {
        let surface = surface();
        let plot = share(PiePlot::new());
        plot.borrow_mut()
            .add_dataset(Dataset::new(vec![json!({"value": 1}), json!({"value": 1})]));
        let as_dyn: ComponentRef = plot.clone();
        render_to(&as_dyn, &surface).expect("render");

        let svg = surface.to_svg_string();
        assert!(svg.contains("<g class=\"render-area\" transform=\"translate(50,50)\">"));
        assert!(svg.contains("d=\"M0,-50A50,50 0 0,1 0,50L0,0Z\""));
        assert_eq!(svg.matches("class=\"arc\"").count(), 2);
        assert!(svg.contains(&format!("fill=\"{}\"", DEFAULT_PALETTE[1])));

        let centroids = plot.borrow().all_plot_data(None).pixel_positions;
        assert!((centroids[0].x - 75.0).abs() < 1e-9);
        assert!((centroids[0].y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn negative_values_get_empty_sectors() {
        let mut plot = PiePlot::new();
        plot.value(Accessor::key("amount"));
        plot.add_dataset(Dataset::new(vec![
            json!({"amount": 3}),
            json!({"amount": -4}),
            json!({"amount": 1}),
        ]));
        let angles = plot.angles();
        let sectors = &angles["_0"];
        assert!((sectors[0].1 - TAU * 0.75).abs() < 1e-9);
        assert!((sectors[1].0 - sectors[1].1).abs() < 1e-12);
        assert!((sectors[2].1 - TAU).abs() < 1e-9);
    }

    #[test]
    fn radii_can_be_bound() {
        let mut plot = PiePlot::new();
        plot.inner_radius(10.0, None);
        plot.add_dataset(Dataset::new(vec![json!({"value": 2})]));
        let attrs = plot.generate_attr_to_projector();
        let meta = PlotMetadata::new("_0");
        assert_eq!(attrs["inner-radius"](&json!({}), 0, &Value::Null, &meta), json!(10.0));
        assert!(!attrs.contains_key("value"));
        assert_eq!(attrs["end-angle"](&json!({}), 0, &Value::Null, &meta), number(TAU));
    }
}
