//! Pointer enter, move and exit.

use std::cell::Cell;
use std::rc::Rc;

use crate::broadcaster::ListenerKey;
use crate::geom::Point;

use super::dispatcher::{MouseSignal, TouchSignal};
use super::{AnchorSlot, Callbacks, Interaction, InteractionTarget, next_interaction_id};

type PointCallback = dyn Fn(Point);

struct PointerInner {
    id: u64,
    slot: AnchorSlot,
    over: Cell<bool>,
    on_enter: Callbacks<PointCallback>,
    on_move: Callbacks<PointCallback>,
    on_exit: Callbacks<PointCallback>,
}

impl PointerInner {
    fn pointer_at(&self, point: Point) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let local = target.to_local(point);
        if target.contains(local) {
            if !self.over.replace(true) {
                for callback in self.on_enter.snapshot() {
                    callback(local);
                }
            }
            for callback in self.on_move.snapshot() {
                callback(local);
            }
        } else if self.over.replace(false) {
            for callback in self.on_exit.snapshot() {
                callback(local);
            }
        }
    }
}

/// Tracks the pointer entering, moving over and leaving the component.
#[derive(Clone)]
pub struct Pointer {
    inner: Rc<PointerInner>,
}

impl Default for Pointer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pointer {
    /// Create an unanchored pointer interaction.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(PointerInner {
                id: next_interaction_id(),
                slot: AnchorSlot::default(),
                over: Cell::new(false),
                on_enter: Callbacks::default(),
                on_move: Callbacks::default(),
                on_exit: Callbacks::default(),
            }),
        }
    }

    /// Whether the pointer is currently over the component.
    pub fn is_over(&self) -> bool {
        self.inner.over.get()
    }

    /// Called when the pointer enters the component.
    pub fn on_pointer_enter(&self, callback: impl Fn(Point) + 'static) {
        self.inner.on_enter.push(Rc::new(callback));
    }

    /// Called on every move over the component.
    pub fn on_pointer_move(&self, callback: impl Fn(Point) + 'static) {
        self.inner.on_move.push(Rc::new(callback));
    }

    /// Called when the pointer leaves the component.
    pub fn on_pointer_exit(&self, callback: impl Fn(Point) + 'static) {
        self.inner.on_exit.push(Rc::new(callback));
    }
}

impl Interaction for Pointer {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn anchor(&self, target: InteractionTarget) {
        self.inner.slot.release(self.inner.id);
        let key = ListenerKey::Id(self.inner.id);
        let inner = Rc::downgrade(&self.inner);
        target
            .surface
            .dispatchers()
            .mouse()
            .on_mouse_move(key.clone(), move |signal: &MouseSignal| {
                if let Some(inner) = inner.upgrade() {
                    inner.pointer_at(signal.position);
                }
            });
        let inner = Rc::downgrade(&self.inner);
        target
            .surface
            .dispatchers()
            .touch()
            .on_touch_start(key, move |signal: &TouchSignal| {
                if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                    inner.pointer_at(point);
                }
            });
        self.inner.slot.replace(Some(target));
    }

    fn unanchor(&self) {
        self.inner.over.set(false);
        self.inner.slot.release(self.inner.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::component::{Component, ComponentRef, LayoutOffer, SelectionBoxLayer, render_to, share};
    use crate::interaction::dispatcher::MouseEvent;
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    #[test]
    fn enter_and_exit_fire_on_transitions_only() {
        let surface = ChartSurface::with_config(
            200.0,
            200.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let pointer = Pointer::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        pointer.on_pointer_enter(move |point| sink.borrow_mut().push(("enter", point)));
        let sink = log.clone();
        pointer.on_pointer_move(move |point| sink.borrow_mut().push(("move", point)));
        let sink = log.clone();
        pointer.on_pointer_exit(move |point| sink.borrow_mut().push(("exit", point)));
        let layer = share(SelectionBoxLayer::new());
        layer.borrow_mut().base_mut().register_interaction(pointer.clone());
        let handle: ComponentRef = layer.clone();
        render_to(&handle, &surface).expect("render");
        layer
            .borrow_mut()
            .compute_layout(Some(LayoutOffer::new(Point::new(100.0, 0.0), 100.0, 200.0)));

        let mouse = surface.dispatchers().mouse();
        mouse.mouse_move(MouseEvent::at(50.0, 50.0));
        mouse.mouse_move(MouseEvent::at(150.0, 50.0));
        mouse.mouse_move(MouseEvent::at(160.0, 50.0));
        assert!(pointer.is_over());
        mouse.mouse_move(MouseEvent::at(50.0, 50.0));
        let names: Vec<&str> = log.borrow().iter().map(|entry| entry.0).collect();
        assert_eq!(names, vec!["enter", "move", "move", "exit"]);
        assert_eq!(log.borrow()[0].1, Point::new(50.0, 50.0));
    }
}
