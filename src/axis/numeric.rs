//! Axis for quantitative scales.

use std::fmt;

use crate::broadcaster::ListenerKey;
use crate::component::{Component, ComponentBase, LayoutOffer, SpaceRequest, layout_component};
use crate::format::Formatter;
use crate::scale::{QuantitativeKind, QuantitativeScale, Scale};

use super::{Axis, AxisCore, AxisOrientation, Tick, render_ticks, requested_depth};

/// Tick marks and formatted labels for a [`QuantitativeScale`].
pub struct NumericAxis {
    base: ComponentBase,
    core: AxisCore,
    scale: QuantitativeScale,
}

impl NumericAxis {
    /// Axis on `orientation`; time scales get dated labels, others the general number formatter.
    pub fn new(scale: QuantitativeScale, orientation: AxisOrientation) -> Self {
        let mut base = ComponentBase::new(&AxisCore::base_classes(orientation, "numeric-axis"));
        let formatter = match scale.kind() {
            QuantitativeKind::Time => Formatter::time("%Y-%m-%d %H:%M"),
            _ => Formatter::general(),
        };
        let core = AxisCore::new(orientation, formatter);
        core.apply_default_alignment(&mut base);
        let hook = base.hook().clone();
        scale
            .broadcaster()
            .register(ListenerKey::Id(base.id().get()), move |_: &Scale| hook.request_layout());
        Self { base, core, scale }
    }

    /// Builder-style formatter.
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.core.formatter = formatter;
        self
    }

    pub fn scale(&self) -> &QuantitativeScale {
        &self.scale
    }

    /// Ticks inside the domain, plus unlabelled end ticks at both domain ends.
    pub(crate) fn tick_values(&self) -> Vec<Tick> {
        let (start, end) = self.scale.domain();
        let (low, high) = (start.min(end), start.max(end));
        let tolerance = (high - low).abs() * 1e-9;
        let mut ticks: Vec<Tick> = self
            .scale
            .ticks()
            .into_iter()
            .filter(|value| *value >= low - tolerance && *value <= high + tolerance)
            .map(|value| Tick {
                position: self.scale.scale(value),
                text: self.core.formatter.format_number(value),
                end: false,
            })
            .filter(|tick| tick.position.is_finite())
            .collect();
        for value in [start, end] {
            let position = self.scale.scale(value);
            if position.is_finite() {
                ticks.push(Tick {
                    position,
                    text: String::new(),
                    end: true,
                });
            }
        }
        ticks
    }

    fn label_depth(&self) -> f64 {
        let sizes = self
            .tick_values()
            .into_iter()
            .filter(|tick| !tick.end)
            .map(|tick| self.base.measure_text(&tick.text, self.core.font_size));
        if self.core.orientation.is_horizontal() {
            sizes.map(|(_, height)| height).fold(0.0, f64::max)
        } else {
            sizes.map(|(width, _)| width).fold(0.0, f64::max)
        }
    }
}

impl fmt::Debug for NumericAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericAxis")
            .field("base", &self.base)
            .field("core", &self.core)
            .field("scale", &self.scale)
            .finish()
    }
}

impl Axis for NumericAxis {
    fn core(&self) -> &AxisCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AxisCore {
        &mut self.core
    }
}

impl Component for NumericAxis {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        let depth = requested_depth(&self.core, self.label_depth());
        if self.core.orientation.is_horizontal() {
            SpaceRequest::new(0.0, depth)
        } else {
            SpaceRequest::new(depth, 0.0)
        }
    }

    fn is_fixed_width(&self) -> bool {
        !self.core.orientation.is_horizontal()
    }

    fn is_fixed_height(&self) -> bool {
        self.core.orientation.is_horizontal()
    }

    fn setup(&mut self) {
        self.core.setup(&self.base);
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        if self.core.orientation.is_horizontal() {
            self.scale.set_range(0.0, self.base.width());
        } else {
            self.scale.set_range(self.base.height(), 0.0);
        }
    }

    fn render_immediately(&mut self) {
        let ticks = self.tick_values();
        render_ticks(&self.core, &self.base, &ticks);
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
    use crate::component::{ComponentRef, render_to, share};
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    fn immediate_surface(width: f64, height: f64) -> ChartSurface {
        ChartSurface::with_config(
            width,
            height,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        )
    }

    #[test]
    fn bottom_axis_sets_range_and_hides_cut_off_labels() {
        let surface = immediate_surface(200.0, 100.0);
        let scale = QuantitativeScale::linear();
        scale.set_domain(0.0, 10.0).expect("domain");
        let axis = share(NumericAxis::new(scale.clone(), AxisOrientation::Bottom));
        let as_dyn: ComponentRef = axis.clone();
        render_to(&as_dyn, &surface).expect("render");

        assert_eq!(scale.range(), (0.0, 200.0));
        assert!((axis.borrow().base().height() - 44.4).abs() < 1e-9);
        assert!(axis.borrow().is_fixed_height());

        let svg = surface.to_svg_string();
        assert!(svg.contains(
            "<text class=\"tick-label\" font-size=\"12\" x=\"100\" y=\"15\" text-anchor=\"middle\" dominant-baseline=\"hanging\">5</text>"
        ));
        assert!(svg.contains("visibility=\"hidden\">0</text>"));
        assert!(svg.contains("visibility=\"hidden\">10</text>"));
        assert!(svg.contains("class=\"end-tick-mark\""));
        assert!(svg.contains("<line class=\"baseline\" x1=\"0\" y1=\"0\" x2=\"200\" y2=\"0\"/>"));
    }

    #[test]
    fn left_axis_width_follows_widest_label() {
        let scale = QuantitativeScale::linear();
        scale.set_domain(0.0, 100.0).expect("domain");
        let axis = NumericAxis::new(scale, AxisOrientation::Left);
        let request = axis.requested_space(500.0, 500.0);
        // "100" at 12px is 21.6 wide.
        assert!((request.min_width - (21.6 + 30.0)).abs() < 1e-9);
        assert!(axis.is_fixed_width());
        assert!(!axis.is_fixed_height());
    }

    #[test]
    fn domain_changes_relayout_the_axis() {
        let surface = immediate_surface(200.0, 100.0);
        let scale = QuantitativeScale::linear();
        scale.set_domain(0.0, 10.0).expect("domain");
        let axis: ComponentRef = share(NumericAxis::new(scale.clone(), AxisOrientation::Bottom));
        render_to(&axis, &surface).expect("render");
        scale.set_domain(0.0, 20.0).expect("domain");
        surface.flush();
        assert!(surface.to_svg_string().contains(">10</text>"));
        assert!(surface.to_svg_string().contains("x=\"100\" y=\"15\""));
    }
}
