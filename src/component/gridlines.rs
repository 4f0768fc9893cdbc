//! Grid lines at scale ticks.

use crate::broadcaster::ListenerKey;
use crate::scale::{QuantitativeScale, Scale};
use crate::svg::NodeId;

use super::{Component, ComponentBase, LayoutOffer};

/// Vertical lines at the x ticks and horizontal lines at the y ticks.
pub struct Gridlines {
    base: ComponentBase,
    x_scale: Option<QuantitativeScale>,
    y_scale: Option<QuantitativeScale>,
    x_container: Option<NodeId>,
    y_container: Option<NodeId>,
}

impl Gridlines {
    /// Grid over either or both scales.
    pub fn new(x_scale: Option<QuantitativeScale>, y_scale: Option<QuantitativeScale>) -> Self {
        let base = ComponentBase::new("gridlines");
        let key = ListenerKey::Id(base.id().get());
        for scale in x_scale.iter().chain(y_scale.iter()) {
            let hook = base.hook().clone();
            scale
                .broadcaster()
                .register(key.clone(), move |_: &Scale| hook.request_render());
        }
        Self {
            base,
            x_scale,
            y_scale,
            x_container: None,
            y_container: None,
        }
    }

    fn redraw_lines(&self, container: NodeId, scale: &QuantitativeScale, vertical: bool) {
        let Some(surface) = self.base.surface() else {
            return;
        };
        let (width, height) = (self.base.width(), self.base.height());
        let mut doc = surface.document_mut();
        doc.clear_children(container);
        for tick in scale.ticks() {
            let position = scale.scale(tick);
            let line = doc.append(container, "line");
            let (x1, y1, x2, y2) = if vertical {
                (position, 0.0, position, height)
            } else {
                (0.0, position, width, position)
            };
            doc.set_number(line, "x1", x1);
            doc.set_number(line, "y1", y1);
            doc.set_number(line, "x2", x2);
            doc.set_number(line, "y2", y2);
            if tick == 0.0 {
                doc.add_class(line, "zeroline");
            }
        }
    }
}

impl Component for Gridlines {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn setup(&mut self) {
        let (Some(surface), Some(content)) = (self.base.surface(), self.base.content()) else {
            return;
        };
        let mut doc = surface.document_mut();
        let x_container = doc.append(content, "g");
        doc.add_class(x_container, "x-gridlines");
        let y_container = doc.append(content, "g");
        doc.add_class(y_container, "y-gridlines");
        self.x_container = Some(x_container);
        self.y_container = Some(y_container);
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        super::layout_component(self, offer);
        if let Some(scale) = &self.x_scale {
            scale.set_range(0.0, self.base.width());
        }
        if let Some(scale) = &self.y_scale {
            scale.set_range(self.base.height(), 0.0);
        }
    }

    fn render_immediately(&mut self) {
        if let (Some(container), Some(scale)) = (self.x_container, &self.x_scale) {
            self.redraw_lines(container, scale, true);
        }
        if let (Some(container), Some(scale)) = (self.y_container, &self.y_scale) {
            self.redraw_lines(container, scale, false);
        }
    }

    fn on_remove(&mut self) {
        let key = ListenerKey::Id(self.base.id().get());
        for scale in self.x_scale.iter().chain(self.y_scale.iter()) {
            scale.broadcaster().deregister(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentRef, render_to, share};
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    #[test]
    fn lines_follow_ticks() {
        let surface = ChartSurface::with_config(
            100.0,
            50.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let x = QuantitativeScale::linear();
        x.set_domain(0.0, 10.0).expect("domain");
        x.set_tick_count(2);
        let y = QuantitativeScale::linear();
        y.set_domain(-1.0, 1.0).expect("domain");
        let grid: ComponentRef = share(Gridlines::new(Some(x.clone()), Some(y.clone())));
        render_to(&grid, &surface).expect("render");

        assert_eq!(x.range(), (0.0, 100.0));
        assert_eq!(y.range(), (50.0, 0.0));
        let svg = surface.to_svg_string();
        assert!(svg.contains("class=\"x-gridlines\""));
        assert!(svg.contains("x1=\"50\" y1=\"0\" x2=\"50\" y2=\"50\""));
        assert!(svg.contains("class=\"zeroline\""));

        x.set_domain(0.0, 8.0).expect("domain");
        surface.flush();
        assert!(surface.to_svg_string().contains("x1=\"62.5\""));
    }
}
