//! Axis for category scales.

use std::fmt;

use serde_json::Value;

use crate::broadcaster::ListenerKey;
use crate::component::legend::fit_text;
use crate::component::{Component, ComponentBase, LayoutOffer, SpaceRequest, layout_component};
use crate::format::Formatter;
use crate::scale::{CategoryScale, Scale};

use super::{Axis, AxisCore, AxisOrientation, Tick, render_ticks, requested_depth};

/// One tick and label per category, centred on its band.
pub struct CategoryAxis {
    base: ComponentBase,
    core: AxisCore,
    scale: CategoryScale,
}

impl CategoryAxis {
    /// Axis on `orientation` showing category names as they are.
    pub fn new(scale: CategoryScale, orientation: AxisOrientation) -> Self {
        let mut base = ComponentBase::new(&AxisCore::base_classes(orientation, "category-axis"));
        let core = AxisCore::new(orientation, Formatter::Identity);
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

    pub fn scale(&self) -> &CategoryScale {
        &self.scale
    }

    fn label(&self, key: &str) -> String {
        self.core.formatter.format(&Value::String(key.to_string()))
    }

    fn tick_values(&self) -> Vec<Tick> {
        let horizontal = self.core.orientation.is_horizontal();
        let room = if horizontal {
            self.scale.step_width()
        } else {
            (self.base.width() - requested_depth(&self.core, 0.0)).max(0.0)
        };
        self.scale
            .domain()
            .into_iter()
            .filter_map(|key| {
                let position = self.scale.scale(&key)?;
                let text = fit_text(&self.base, &self.label(&key), self.core.font_size, room);
                Some(Tick {
                    position,
                    text,
                    end: false,
                })
            })
            .collect()
    }
}

impl fmt::Debug for CategoryAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryAxis")
            .field("base", &self.base)
            .field("core", &self.core)
            .field("scale", &self.scale)
            .finish()
    }
}

impl Axis for CategoryAxis {
    fn core(&self) -> &AxisCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AxisCore {
        &mut self.core
    }
}

impl Component for CategoryAxis {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        let sizes: Vec<(f64, f64)> = self
            .scale
            .domain()
            .iter()
            .map(|key| self.base.measure_text(&self.label(key), self.core.font_size))
            .collect();
        if self.core.orientation.is_horizontal() {
            let height = sizes.iter().map(|size| size.1).fold(0.0, f64::max);
            SpaceRequest::new(0.0, requested_depth(&self.core, height))
        } else {
            let width = sizes.iter().map(|size| size.0).fold(0.0, f64::max);
            SpaceRequest::new(requested_depth(&self.core, width), 0.0)
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
            self.scale.set_range(0.0, self.base.height());
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

    #[test]
    fn labels_sit_on_band_centres() {
        let surface = ChartSurface::with_config(
            300.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let scale = CategoryScale::new();
        scale.set_domain(["a", "b", "c"]);
        let axis: ComponentRef = share(CategoryAxis::new(scale.clone(), AxisOrientation::Bottom));
        render_to(&axis, &surface).expect("render");

        assert_eq!(scale.range(), (0.0, 300.0));
        let centre = scale.scale("b").expect("band");
        assert!((centre - 150.0).abs() < 1e-9);
        let svg = surface.to_svg_string();
        assert!(svg.contains("x=\"150\" y=\"15\" text-anchor=\"middle\" dominant-baseline=\"hanging\">b</text>"));
        assert_eq!(svg.matches("class=\"tick-mark\"").count(), 3);
    }

    #[test]
    fn long_labels_are_truncated_to_the_step() {
        let scale = CategoryScale::new();
        scale.set_domain(["a very long category name", "b"]);
        scale.set_range(0.0, 60.0);
        let axis = CategoryAxis::new(scale.clone(), AxisOrientation::Bottom);
        let ticks = axis.tick_values();
        assert_eq!(ticks[1].text, "b");
        assert!(ticks[0].text.ends_with('…'));
        assert!(axis.base().measure_text(&ticks[0].text, 12.0).0 <= scale.step_width() + 1e-9);
    }
}
