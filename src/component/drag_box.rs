//! Selection box drawn and resized by dragging.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::geom::{Point, Rect};
use crate::interaction::drag::Drag;
use crate::interaction::Callbacks;
use crate::svg::NodeId;

use super::selection_box::{BoxState, SelectionBoxLayer};
use super::{Component, ComponentBase, LayoutOffer, Placement, RenderHook, layout_component};

/// Detection radius for edge resizing, in pixels.
pub const DEFAULT_DETECTION_RADIUS: f64 = 3.0;

/// Which dimensions the box selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragBoxMode {
    /// Both dimensions.
    #[default]
    Free,
    /// Horizontal span only; the box covers the full height.
    X,
    /// Vertical span only; the box covers the full width.
    Y,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Edges {
    top: bool,
    bottom: bool,
    left: bool,
    right: bool,
}

impl Edges {
    fn any(self) -> bool {
        self.top || self.bottom || self.left || self.right
    }
}

type BoundsCallback = dyn Fn(Rect);

struct Gesture {
    edges: Edges,
    top_left: Point,
    bottom_right: Point,
    new_box: bool,
}

struct DragBoxShared {
    state: Rc<RefCell<BoxState>>,
    placement: Rc<Placement>,
    hook: RenderHook,
    mode: DragBoxMode,
    resizable: Cell<bool>,
    detection_radius: Cell<f64>,
    gesture: RefCell<Option<Gesture>>,
    on_start: Callbacks<BoundsCallback>,
    on_drag: Callbacks<BoundsCallback>,
    on_end: Callbacks<BoundsCallback>,
}

impl DragBoxShared {
    fn bounds(&self) -> Rect {
        self.state.borrow().bounds
    }

    fn visible(&self) -> bool {
        self.state.borrow().visible
    }

    fn set_visible(&self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }

    /// Store bounds spanned by two corners, forcing the locked dimension.
    fn set_corners(&self, a: Point, b: Point) {
        let mut bounds = Rect::from_corners(a, b);
        match self.mode {
            DragBoxMode::Free => {}
            DragBoxMode::X => {
                bounds.y = 0.0;
                bounds.height = self.placement.height();
            }
            DragBoxMode::Y => {
                bounds.x = 0.0;
                bounds.width = self.placement.width();
            }
        }
        self.state.borrow_mut().bounds = bounds;
    }

    fn resizing_edges(&self, point: Point) -> Edges {
        let mut edges = Edges::default();
        if !self.resizable.get() {
            return edges;
        }
        let bounds = self.bounds();
        let radius = self.detection_radius.get();
        let near = |value: f64, edge: f64| edge - radius <= value && value <= edge + radius;
        if bounds.x - radius <= point.x && point.x <= bounds.right() + radius {
            edges.top = near(point.y, bounds.y);
            edges.bottom = near(point.y, bounds.bottom());
        }
        if bounds.y - radius <= point.y && point.y <= bounds.bottom() + radius {
            edges.left = near(point.x, bounds.x);
            edges.right = near(point.x, bounds.right());
        }
        match self.mode {
            DragBoxMode::Free => {}
            DragBoxMode::X => {
                edges.top = false;
                edges.bottom = false;
            }
            DragBoxMode::Y => {
                edges.left = false;
                edges.right = false;
            }
        }
        edges
    }

    fn drag_start(&self, start: Point) {
        let edges = self.resizing_edges(start);
        let new_box = !(self.visible() && edges.any());
        if new_box {
            self.set_corners(start, start);
        }
        self.set_visible(true);
        let bounds = self.bounds();
        *self.gesture.borrow_mut() = Some(Gesture {
            edges,
            top_left: Point::new(bounds.x, bounds.y),
            bottom_right: Point::new(bounds.right(), bounds.bottom()),
            new_box,
        });
        self.hook.request_render();
        for callback in self.on_start.snapshot() {
            callback(bounds);
        }
    }

    fn drag(&self, end: Point) {
        let corners = {
            let mut gesture = self.gesture.borrow_mut();
            let Some(gesture) = gesture.as_mut() else {
                return;
            };
            if gesture.new_box {
                gesture.bottom_right = end;
            } else {
                if gesture.edges.bottom {
                    gesture.bottom_right.y = end.y;
                } else if gesture.edges.top {
                    gesture.top_left.y = end.y;
                }
                if gesture.edges.right {
                    gesture.bottom_right.x = end.x;
                } else if gesture.edges.left {
                    gesture.top_left.x = end.x;
                }
            }
            (gesture.top_left, gesture.bottom_right)
        };
        self.set_corners(corners.0, corners.1);
        self.hook.request_render();
        let bounds = self.bounds();
        for callback in self.on_drag.snapshot() {
            callback(bounds);
        }
    }

    fn drag_end(&self, start: Point, end: Point) {
        let gesture = self.gesture.borrow_mut().take();
        if gesture.is_some_and(|gesture| gesture.new_box) && start == end {
            self.set_visible(false);
            self.hook.request_render();
        }
        let bounds = self.bounds();
        for callback in self.on_end.snapshot() {
            callback(bounds);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HandleNodes {
    edge_top: NodeId,
    edge_bottom: NodeId,
    edge_left: NodeId,
    edge_right: NodeId,
    corners: [NodeId; 4],
}

/// A [`SelectionBoxLayer`] whose box follows drag gestures.
///
/// Dragging on empty space starts a new box; with `resizable` enabled,
/// dragging within `detection_radius` of an edge moves that edge instead.
pub struct DragBoxLayer {
    layer: SelectionBoxLayer,
    shared: Rc<DragBoxShared>,
    drag: Drag,
    handles: Option<HandleNodes>,
}

impl Default for DragBoxLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DragBoxLayer {
    /// Box selecting in both dimensions.
    pub fn new() -> Self {
        Self::with_mode(DragBoxMode::Free)
    }

    /// Box selecting horizontal spans.
    pub fn x_only() -> Self {
        Self::with_mode(DragBoxMode::X)
    }

    /// Box selecting vertical spans.
    pub fn y_only() -> Self {
        Self::with_mode(DragBoxMode::Y)
    }

    /// Box with an explicit mode.
    pub fn with_mode(mode: DragBoxMode) -> Self {
        let class = match mode {
            DragBoxMode::Free => "selection-box-layer drag-box-layer",
            DragBoxMode::X => "selection-box-layer drag-box-layer x-drag-box-layer",
            DragBoxMode::Y => "selection-box-layer drag-box-layer y-drag-box-layer",
        };
        let mut layer = SelectionBoxLayer::with_class(class);
        let shared = Rc::new(DragBoxShared {
            state: layer.shared_state(),
            placement: layer.base().placement(),
            hook: layer.base().hook().clone(),
            mode,
            resizable: Cell::new(false),
            detection_radius: Cell::new(DEFAULT_DETECTION_RADIUS),
            gesture: RefCell::new(None),
            on_start: Callbacks::default(),
            on_drag: Callbacks::default(),
            on_end: Callbacks::default(),
        });

        let drag = Drag::new();
        let gesture = shared.clone();
        drag.on_drag_start(move |start| gesture.drag_start(start));
        let gesture = shared.clone();
        drag.on_drag(move |_, end| gesture.drag(end));
        let gesture = shared.clone();
        drag.on_drag_end(move |start, end| gesture.drag_end(start, end));
        layer.base_mut().register_interaction(drag.clone());

        Self {
            layer,
            shared,
            drag,
            handles: None,
        }
    }

    /// Selection mode.
    pub fn mode(&self) -> DragBoxMode {
        self.shared.mode
    }

    /// The drag interaction driving the box.
    pub fn drag_interaction(&self) -> &Drag {
        &self.drag
    }

    /// Box bounds in component coordinates.
    pub fn bounds(&self) -> Rect {
        self.shared.bounds()
    }

    /// Set the box bounds. The locked dimension of an X or Y box is overridden.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.shared.set_corners(
            Point::new(bounds.x, bounds.y),
            Point::new(bounds.right(), bounds.bottom()),
        );
        self.shared.hook.request_render();
    }

    /// Whether the box is drawn.
    pub fn box_visible(&self) -> bool {
        self.shared.visible()
    }

    /// Show or hide the box.
    pub fn set_box_visible(&mut self, visible: bool) {
        self.layer.set_box_visible(visible);
    }

    /// Whether edges can be dragged.
    pub fn resizable(&self) -> bool {
        self.shared.resizable.get()
    }

    /// Allow or forbid resizing by the edges.
    pub fn set_resizable(&mut self, resizable: bool) {
        self.shared.resizable.set(resizable);
        self.shared.hook.request_render();
    }

    /// Distance from an edge within which a press grabs it.
    pub fn detection_radius(&self) -> f64 {
        self.shared.detection_radius.get()
    }

    /// Set the detection radius; it must not be negative.
    pub fn set_detection_radius(&mut self, radius: f64) -> Result<()> {
        if !(radius >= 0.0) {
            return Err(ChartError::InvalidOption {
                kind: "detection radius",
                value: radius.to_string(),
            });
        }
        self.shared.detection_radius.set(radius);
        self.shared.hook.request_render();
        Ok(())
    }

    /// Called with the bounds when a drag starts.
    pub fn on_drag_start(&self, callback: impl Fn(Rect) + 'static) {
        self.shared.on_start.push(Rc::new(callback));
    }

    /// Called with the bounds on every drag update.
    pub fn on_drag(&self, callback: impl Fn(Rect) + 'static) {
        self.shared.on_drag.push(Rc::new(callback));
    }

    /// Called with the final bounds when a drag ends.
    pub fn on_drag_end(&self, callback: impl Fn(Rect) + 'static) {
        self.shared.on_end.push(Rc::new(callback));
    }

    fn create_handles(&mut self) {
        let Some(nodes) = self.layer.box_nodes() else {
            return;
        };
        let Some(surface) = self.layer.base().surface() else {
            return;
        };
        let mut doc = surface.document_mut();
        let mut edge = |class: &str| {
            let line = doc.append(nodes.group, "line");
            doc.add_class(line, class);
            doc.set_attr(line, "opacity", "0");
            doc.set_attr(line, "stroke", "pink");
            line
        };
        let edge_top = edge("drag-edge-tb");
        let edge_bottom = edge("drag-edge-tb");
        let edge_left = edge("drag-edge-lr");
        let edge_right = edge("drag-edge-lr");
        let corners = ["drag-corner-tl", "drag-corner-tr", "drag-corner-bl", "drag-corner-br"].map(|class| {
            let corner = doc.create("circle");
            doc.add_class(corner, class);
            doc.set_attr(corner, "opacity", "0");
            corner
        });
        drop(doc);
        self.handles = Some(HandleNodes {
            edge_top,
            edge_bottom,
            edge_left,
            edge_right,
            corners,
        });
    }
}

impl Component for DragBoxLayer {
    fn base(&self) -> &ComponentBase {
        self.layer.base()
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        self.layer.base_mut()
    }

    fn size_from_offer(&self, available_width: f64, available_height: f64) -> (f64, f64) {
        (available_width, available_height)
    }

    fn setup(&mut self) {
        self.layer.setup();
        self.create_handles();
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        if self.shared.mode != DragBoxMode::Free {
            let bounds = self.bounds();
            self.shared.set_corners(
                Point::new(bounds.x, bounds.y),
                Point::new(bounds.right(), bounds.bottom()),
            );
        }
    }

    fn render_immediately(&mut self) {
        let Some(surface) = self.layer.base().surface().cloned() else {
            return;
        };
        let resizable = self.resizable();
        let element = self.layer.base().element();
        let mut doc = surface.document_mut();
        if let Some(element) = element {
            let x_resizable = resizable && self.shared.mode != DragBoxMode::Y;
            let y_resizable = resizable && self.shared.mode != DragBoxMode::X;
            doc.toggle_class(element, "x-resizable", x_resizable);
            doc.toggle_class(element, "y-resizable", y_resizable);
        }
        let Some(bounds) = self.layer.draw_box(&mut doc) else {
            return;
        };
        let (Some(handles), Some(nodes)) = (self.handles, self.layer.box_nodes()) else {
            return;
        };
        let radius = self.detection_radius();
        let (left, top, right, bottom) = (bounds.x, bounds.y, bounds.right(), bounds.bottom());
        let lines = [
            (handles.edge_top, left, top, right, top),
            (handles.edge_bottom, left, bottom, right, bottom),
            (handles.edge_left, left, top, left, bottom),
            (handles.edge_right, right, top, right, bottom),
        ];
        for (line, x1, y1, x2, y2) in lines {
            doc.set_number(line, "x1", x1);
            doc.set_number(line, "y1", y1);
            doc.set_number(line, "x2", x2);
            doc.set_number(line, "y2", y2);
            doc.set_number(line, "stroke-width", radius * 2.0);
        }
        let centres = [(left, top), (right, top), (left, bottom), (right, bottom)];
        for (corner, (cx, cy)) in handles.corners.into_iter().zip(centres) {
            if resizable {
                doc.set_number(corner, "cx", cx);
                doc.set_number(corner, "cy", cy);
                doc.set_number(corner, "r", radius);
                doc.append_child(nodes.group, corner);
            } else {
                doc.detach(corner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentRef, Shared, render_to, share};
    use crate::interaction::dispatcher::MouseEvent;
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    fn rendered(layer: DragBoxLayer) -> (ChartSurface, Shared<DragBoxLayer>) {
        let surface = ChartSurface::with_config(
            400.0,
            300.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let layer = share(layer);
        let handle: ComponentRef = layer.clone();
        render_to(&handle, &surface).expect("render");
        (surface, layer)
    }

    fn drag(surface: &ChartSurface, from: (f64, f64), to: (f64, f64)) {
        let mouse = surface.dispatchers().mouse();
        mouse.mouse_down(MouseEvent::at(from.0, from.1));
        mouse.mouse_move(MouseEvent::at(to.0, to.1));
        mouse.mouse_up(MouseEvent::at(to.0, to.1));
    }

    #[test]
    fn dragging_draws_a_new_box() {
        let (surface, layer) = rendered(DragBoxLayer::new());
        let ends = Rc::new(RefCell::new(Vec::new()));
        let sink = ends.clone();
        layer.borrow().on_drag_end(move |bounds| sink.borrow_mut().push(bounds));
        drag(&surface, (150.0, 100.0), (50.0, 20.0));
        assert!(layer.borrow().box_visible());
        assert_eq!(layer.borrow().bounds(), Rect::new(50.0, 20.0, 100.0, 80.0));
        assert_eq!(*ends.borrow(), vec![Rect::new(50.0, 20.0, 100.0, 80.0)]);
        assert!(surface.to_svg_string().contains("drag-edge-tb"));
    }

    #[test]
    fn click_without_movement_hides_the_box() {
        let (surface, layer) = rendered(DragBoxLayer::new());
        drag(&surface, (10.0, 10.0), (60.0, 60.0));
        assert!(layer.borrow().box_visible());
        drag(&surface, (200.0, 200.0), (200.0, 200.0));
        assert!(!layer.borrow().box_visible());
    }

    #[test]
    fn resizable_edges_move_only_that_edge() {
        let (surface, layer) = rendered(DragBoxLayer::new());
        drag(&surface, (100.0, 100.0), (200.0, 200.0));
        layer.borrow_mut().set_resizable(true);
        drag(&surface, (201.0, 150.0), (250.0, 150.0));
        assert_eq!(layer.borrow().bounds(), Rect::new(100.0, 100.0, 150.0, 100.0));
        drag(&surface, (150.0, 99.0), (150.0, 50.0));
        assert_eq!(layer.borrow().bounds(), Rect::new(100.0, 50.0, 150.0, 150.0));
        let element = layer.borrow().base().element().expect("element");
        assert!(surface.document().has_class(element, "x-resizable"));
    }

    #[test]
    fn x_mode_spans_the_full_height() {
        let (surface, layer) = rendered(DragBoxLayer::x_only());
        drag(&surface, (100.0, 100.0), (180.0, 120.0));
        assert_eq!(layer.borrow().bounds(), Rect::new(100.0, 0.0, 80.0, 300.0));
        layer.borrow_mut().set_resizable(true);
        surface.flush();
        let element = layer.borrow().base().element().expect("element");
        assert!(surface.document().has_class(element, "x-resizable"));
        assert!(!surface.document().has_class(element, "y-resizable"));
    }

    #[test]
    fn negative_detection_radius_is_rejected() {
        let mut layer = DragBoxLayer::new();
        assert!(layer.set_detection_radius(-1.0).is_err());
        assert!((layer.detection_radius() - DEFAULT_DETECTION_RADIUS).abs() < 1e-9);
    }
}
