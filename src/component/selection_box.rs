//! Translucent selection rectangle.

use std::cell::RefCell;
use std::rc::Rc;

use crate::geom::Rect;
use crate::svg::{NodeId, SvgDocument};

use super::{Component, ComponentBase};

/// Box geometry shared with gesture callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct BoxState {
    pub(crate) bounds: Rect,
    pub(crate) visible: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BoxNodes {
    pub(crate) group: NodeId,
    pub(crate) area: NodeId,
}

/// Draws a rectangle over its full offered area.
pub struct SelectionBoxLayer {
    base: ComponentBase,
    state: Rc<RefCell<BoxState>>,
    nodes: Option<BoxNodes>,
}

impl Default for SelectionBoxLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionBoxLayer {
    /// Create a layer with a hidden, empty box.
    pub fn new() -> Self {
        Self::with_class("selection-box-layer")
    }

    pub(crate) fn with_class(class: &str) -> Self {
        Self {
            base: ComponentBase::new(class),
            state: Rc::new(RefCell::new(BoxState::default())),
            nodes: None,
        }
    }

    /// Box bounds in component coordinates.
    pub fn bounds(&self) -> Rect {
        self.state.borrow().bounds
    }

    /// Set the box bounds and redraw.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.state.borrow_mut().bounds = bounds;
        self.base.hook().request_render();
    }

    /// Whether the box is drawn.
    pub fn box_visible(&self) -> bool {
        self.state.borrow().visible
    }

    /// Show or hide the box.
    pub fn set_box_visible(&mut self, visible: bool) {
        self.state.borrow_mut().visible = visible;
        self.base.hook().request_render();
    }

    pub(crate) fn shared_state(&self) -> Rc<RefCell<BoxState>> {
        self.state.clone()
    }

    pub(crate) fn box_nodes(&self) -> Option<BoxNodes> {
        self.nodes
    }

    pub(crate) fn create_box(&mut self) {
        let Some(surface) = self.base.surface() else {
            return;
        };
        let mut doc = surface.document_mut();
        let group = doc.create("g");
        doc.add_class(group, "selection-box");
        let area = doc.append(group, "rect");
        doc.add_class(area, "selection-area");
        drop(doc);
        self.nodes = Some(BoxNodes { group, area });
    }

    /// Draw or hide the box; returns the drawn bounds.
    pub(crate) fn draw_box(&self, doc: &mut SvgDocument) -> Option<Rect> {
        let nodes = self.nodes?;
        let content = self.base.content()?;
        let state = *self.state.borrow();
        if !state.visible {
            doc.detach(nodes.group);
            return None;
        }
        let bounds = state.bounds;
        doc.set_number(nodes.area, "x", bounds.x);
        doc.set_number(nodes.area, "y", bounds.y);
        doc.set_number(nodes.area, "width", bounds.width);
        doc.set_number(nodes.area, "height", bounds.height);
        doc.append_child(content, nodes.group);
        Some(bounds)
    }
}

impl Component for SelectionBoxLayer {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn size_from_offer(&self, available_width: f64, available_height: f64) -> (f64, f64) {
        (available_width, available_height)
    }

    fn setup(&mut self) {
        self.create_box();
    }

    fn render_immediately(&mut self) {
        if let Some(surface) = self.base.surface() {
            self.draw_box(&mut surface.document_mut());
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
    fn box_is_drawn_only_when_visible() {
        let surface = ChartSurface::with_config(
            200.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let layer = share(SelectionBoxLayer::new());
        let handle: ComponentRef = layer.clone();
        render_to(&handle, &surface).expect("render");
        assert!(!surface.to_svg_string().contains("selection-area"));

        layer.borrow_mut().set_bounds(Rect::new(10.0, 20.0, 30.0, 40.0));
        layer.borrow_mut().set_box_visible(true);
        surface.flush();
        let svg = surface.to_svg_string();
        assert!(svg.contains("<rect class=\"selection-area\" x=\"10\" y=\"20\" width=\"30\" height=\"40\"/>"));
        assert_eq!(layer.borrow().base().width(), 200.0);

        layer.borrow_mut().set_box_visible(false);
        surface.flush();
        assert!(!surface.to_svg_string().contains("selection-area"));
    }
}
