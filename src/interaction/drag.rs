//! Press-move-release gestures.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::broadcaster::ListenerKey;
use crate::geom::Point;

use super::dispatcher::{MouseSignal, PRIMARY_BUTTON, TouchSignal};
use super::{AnchorSlot, Callbacks, Interaction, InteractionTarget, next_interaction_id};

type StartCallback = dyn Fn(Point);
type MoveCallback = dyn Fn(Point, Point);

struct DragInner {
    id: u64,
    slot: AnchorSlot,
    constrained: Cell<bool>,
    dragging: Cell<bool>,
    origin: Cell<Point>,
    on_start: Callbacks<StartCallback>,
    on_drag: Callbacks<MoveCallback>,
    on_end: Callbacks<MoveCallback>,
}

/// Tracks a drag from a press inside the component to the release.
///
/// Callbacks receive component-local points. While constrained (the default)
/// the current point is clamped to the component's bounds.
#[derive(Clone)]
pub struct Drag {
    inner: Rc<DragInner>,
}

impl Default for Drag {
    fn default() -> Self {
        Self::new()
    }
}

impl Drag {
    /// Create an unanchored drag interaction.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DragInner {
                id: next_interaction_id(),
                slot: AnchorSlot::default(),
                constrained: Cell::new(true),
                dragging: Cell::new(false),
                origin: Cell::new(Point::default()),
                on_start: Callbacks::default(),
                on_drag: Callbacks::default(),
                on_end: Callbacks::default(),
            }),
        }
    }

    /// Whether points are clamped to the component.
    pub fn constrained_to_component(&self) -> bool {
        self.inner.constrained.get()
    }

    /// Enable or disable clamping to the component.
    pub fn set_constrained_to_component(&self, constrained: bool) {
        self.inner.constrained.set(constrained);
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.inner.dragging.get()
    }

    /// Called with the start point when a drag begins.
    pub fn on_drag_start(&self, callback: impl Fn(Point) + 'static) {
        self.inner.on_start.push(Rc::new(callback));
    }

    /// Called with the start and current points on every move.
    pub fn on_drag(&self, callback: impl Fn(Point, Point) + 'static) {
        self.inner.on_drag.push(Rc::new(callback));
    }

    /// Called with the start and end points when the drag finishes.
    pub fn on_drag_end(&self, callback: impl Fn(Point, Point) + 'static) {
        self.inner.on_end.push(Rc::new(callback));
    }

    /// Remove every callback.
    pub fn clear_callbacks(&self) {
        self.inner.on_start.clear();
        self.inner.on_drag.clear();
        self.inner.on_end.clear();
    }
}

impl DragInner {
    fn translate_and_constrain(&self, target: &InteractionTarget, point: Point) -> Point {
        let local = target.to_local(point);
        if !self.constrained.get() {
            return local;
        }
        target.placement.local_bounds().clamp(local)
    }

    fn start(&self, point: Point) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let local = target.to_local(point);
        if !target.contains(local) {
            return;
        }
        self.dragging.set(true);
        self.origin.set(local);
        for callback in self.on_start.snapshot() {
            callback(local);
        }
    }

    fn drag(&self, point: Point) {
        if !self.dragging.get() {
            return;
        }
        let Some(target) = self.slot.target() else {
            return;
        };
        let current = self.translate_and_constrain(&target, point);
        let origin = self.origin.get();
        for callback in self.on_drag.snapshot() {
            callback(origin, current);
        }
    }

    fn end(&self, point: Point) {
        if !self.dragging.replace(false) {
            return;
        }
        let Some(target) = self.slot.target() else {
            return;
        };
        let current = self.translate_and_constrain(&target, point);
        let origin = self.origin.get();
        for callback in self.on_end.snapshot() {
            callback(origin, current);
        }
    }

    fn cancel(&self) {
        if self.dragging.replace(false) {
            tracing::trace!(interaction = self.id, "drag cancelled");
        }
    }
}

impl Interaction for Drag {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn anchor(&self, target: InteractionTarget) {
        self.inner.slot.release(self.inner.id);
        let key = ListenerKey::Id(self.inner.id);
        let mouse = target.surface.dispatchers().mouse();
        let touch = target.surface.dispatchers().touch();
        let weak: Weak<DragInner> = Rc::downgrade(&self.inner);

        let inner = weak.clone();
        mouse.on_mouse_down(key.clone(), move |signal: &MouseSignal| {
            if signal.event.button != PRIMARY_BUTTON {
                return;
            }
            if let Some(inner) = inner.upgrade() {
                inner.start(signal.position);
            }
        });
        let inner = weak.clone();
        mouse.on_mouse_move(key.clone(), move |signal: &MouseSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.drag(signal.position);
            }
        });
        let inner = weak.clone();
        mouse.on_mouse_up(key.clone(), move |signal: &MouseSignal| {
            if signal.event.button != PRIMARY_BUTTON {
                return;
            }
            if let Some(inner) = inner.upgrade() {
                inner.end(signal.position);
            }
        });
        let inner = weak.clone();
        touch.on_touch_start(key.clone(), move |signal: &TouchSignal| {
            if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                inner.start(point);
            }
        });
        let inner = weak.clone();
        touch.on_touch_move(key.clone(), move |signal: &TouchSignal| {
            if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                inner.drag(point);
            }
        });
        let inner = weak.clone();
        touch.on_touch_end(key.clone(), move |signal: &TouchSignal| {
            if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                inner.end(point);
            }
        });
        let inner = weak;
        touch.on_touch_cancel(key, move |_: &TouchSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.cancel();
            }
        });
        self.inner.slot.replace(Some(target));
    }

    fn unanchor(&self) {
        self.inner.dragging.set(false);
        self.inner.slot.release(self.inner.id);
    }
}

impl fmt::Debug for Drag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drag")
            .field("id", &self.inner.id)
            .field("constrained", &self.inner.constrained.get())
            .field("dragging", &self.inner.dragging.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::component::{ComponentRef, SelectionBoxLayer, render_to, share};
    use crate::interaction::dispatcher::MouseEvent;
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    type Log = Rc<RefCell<Vec<(&'static str, Point, Point)>>>;

    fn anchored_drag(width: f64, height: f64) -> (ChartSurface, Drag, Log, ComponentRef) {
        let surface = ChartSurface::with_config(
            width,
            height,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let layer: ComponentRef = share(SelectionBoxLayer::new());
        let drag = Drag::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        drag.on_drag_start(move |start| sink.borrow_mut().push(("start", start, start)));
        let sink = log.clone();
        drag.on_drag(move |start, end| sink.borrow_mut().push(("drag", start, end)));
        let sink = log.clone();
        drag.on_drag_end(move |start, end| sink.borrow_mut().push(("end", start, end)));
        layer.borrow_mut().base_mut().register_interaction(drag.clone());
        render_to(&layer, &surface).expect("render");
        (surface, drag, log, layer)
    }

    #[test]
    fn drag_reports_start_move_and_end() {
        let (surface, drag, log, _layer) = anchored_drag(400.0, 400.0);
        let mouse = surface.dispatchers().mouse();
        mouse.mouse_down(MouseEvent::at(100.0, 100.0));
        mouse.mouse_move(MouseEvent::at(200.0, 200.0));
        assert!(drag.is_dragging());
        mouse.mouse_up(MouseEvent::at(300.0, 300.0));
        assert!(!drag.is_dragging());
        let start = Point::new(100.0, 100.0);
        assert_eq!(
            *log.borrow(),
            vec![
                ("start", start, start),
                ("drag", start, Point::new(200.0, 200.0)),
                ("end", start, Point::new(300.0, 300.0)),
            ]
        );
    }

    #[test]
    fn drag_must_start_inside_with_primary_button() {
        let (surface, drag, log, _layer) = anchored_drag(400.0, 400.0);
        let mouse = surface.dispatchers().mouse();
        mouse.mouse_down(MouseEvent::at(100.0, 100.0).with_button(2));
        mouse.mouse_move(MouseEvent::at(200.0, 200.0));
        assert!(!drag.is_dragging());
        mouse.mouse_down(MouseEvent::at(-10.0, 100.0));
        assert!(!drag.is_dragging());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn points_are_clamped_unless_unconstrained() {
        let (surface, drag, log, _layer) = anchored_drag(400.0, 400.0);
        let mouse = surface.dispatchers().mouse();
        mouse.mouse_down(MouseEvent::at(100.0, 100.0));
        mouse.mouse_move(MouseEvent::at(600.0, 600.0));
        mouse.mouse_move(MouseEvent::at(-200.0, -200.0));
        assert_eq!(log.borrow()[1].2, Point::new(400.0, 400.0));
        assert_eq!(log.borrow()[2].2, Point::new(0.0, 0.0));
        mouse.mouse_up(MouseEvent::at(100.0, 100.0));

        drag.set_constrained_to_component(false);
        log.borrow_mut().clear();
        mouse.mouse_down(MouseEvent::at(100.0, 100.0));
        mouse.mouse_move(MouseEvent::at(600.0, 600.0));
        assert_eq!(log.borrow()[1].2, Point::new(600.0, 600.0));
    }

    #[test]
    fn touch_cancel_ends_without_callback() {
        let (surface, drag, log, _layer) = anchored_drag(400.0, 400.0);
        let touch = surface.dispatchers().touch();
        touch.touch_start(&[(0, Point::new(100.0, 100.0))]);
        touch.touch_move(&[(0, Point::new(150.0, 150.0))]);
        touch.touch_cancel(&[(0, Point::new(150.0, 150.0))]);
        assert!(!drag.is_dragging());
        touch.touch_end(&[(0, Point::new(150.0, 150.0))]);
        let kinds: Vec<&str> = log.borrow().iter().map(|entry| entry.0).collect();
        assert_eq!(kinds, vec!["start", "drag"]);
    }

    #[test]
    fn removing_the_component_stops_listening() {
        let (surface, drag, log, layer) = anchored_drag(400.0, 400.0);
        crate::component::remove(&layer);
        surface.dispatchers().mouse().mouse_down(MouseEvent::at(10.0, 10.0));
        assert!(!drag.is_dragging());
        assert!(log.borrow().is_empty());
    }
}
