//! Single and double clicks.

use std::cell::Cell;
use std::rc::Rc;

use crate::broadcaster::ListenerKey;
use crate::geom::Point;

use super::dispatcher::{MouseSignal, TouchSignal};
use super::{AnchorSlot, Callbacks, Interaction, InteractionTarget, next_interaction_id};

type PointCallback = dyn Fn(Point);

struct ClickInner {
    id: u64,
    slot: AnchorSlot,
    pressed: Cell<bool>,
    callbacks: Callbacks<PointCallback>,
}

impl ClickInner {
    fn press(&self, point: Point) {
        let Some(target) = self.slot.target() else {
            return;
        };
        if target.contains(target.to_local(point)) {
            self.pressed.set(true);
        }
    }

    fn release(&self, point: Point) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let local = target.to_local(point);
        if self.pressed.replace(false) && target.contains(local) {
            for callback in self.callbacks.snapshot() {
                callback(local);
            }
        }
    }
}

/// Fires when a press and its release both land inside the component.
#[derive(Clone)]
pub struct Click {
    inner: Rc<ClickInner>,
}

impl Default for Click {
    fn default() -> Self {
        Self::new()
    }
}

impl Click {
    /// Create an unanchored click interaction.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ClickInner {
                id: next_interaction_id(),
                slot: AnchorSlot::default(),
                pressed: Cell::new(false),
                callbacks: Callbacks::default(),
            }),
        }
    }

    /// Called with the component-local release point.
    pub fn on_click(&self, callback: impl Fn(Point) + 'static) {
        self.inner.callbacks.push(Rc::new(callback));
    }
}

impl Interaction for Click {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn anchor(&self, target: InteractionTarget) {
        self.inner.slot.release(self.inner.id);
        let key = ListenerKey::Id(self.inner.id);
        let mouse = target.surface.dispatchers().mouse();
        let touch = target.surface.dispatchers().touch();

        let inner = Rc::downgrade(&self.inner);
        mouse.on_mouse_down(key.clone(), move |signal: &MouseSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.press(signal.position);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        mouse.on_mouse_up(key.clone(), move |signal: &MouseSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.release(signal.position);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_start(key.clone(), move |signal: &TouchSignal| {
            if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                inner.press(point);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_end(key.clone(), move |signal: &TouchSignal| {
            if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                inner.release(point);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_cancel(key, move |_: &TouchSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.pressed.set(false);
            }
        });
        self.inner.slot.replace(Some(target));
    }

    fn unanchor(&self) {
        self.inner.pressed.set(false);
        self.inner.slot.release(self.inner.id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickState {
    NotClicked,
    SingleClicked,
    DoubleClicked,
}

struct DoubleClickInner {
    id: u64,
    slot: AnchorSlot,
    state: Cell<ClickState>,
    pressed: Cell<bool>,
    clicked_point: Cell<Option<Point>>,
    callbacks: Callbacks<PointCallback>,
}

impl DoubleClickInner {
    fn press(&self, point: Point) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let local = target.to_local(point);
        if !target.contains(local) {
            return;
        }
        let same_spot = self.clicked_point.get() == Some(local);
        if self.state.get() != ClickState::SingleClicked || !same_spot {
            self.state.set(ClickState::NotClicked);
        }
        self.clicked_point.set(Some(local));
        self.pressed.set(true);
    }

    fn release(&self, point: Point) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let local = target.to_local(point);
        let next = if self.pressed.get() && self.clicked_point.get() == Some(local) {
            match self.state.get() {
                ClickState::NotClicked => ClickState::SingleClicked,
                _ => ClickState::DoubleClicked,
            }
        } else {
            ClickState::NotClicked
        };
        self.state.set(next);
        self.pressed.set(false);
    }

    fn double_click(&self) {
        if self.state.get() != ClickState::DoubleClicked {
            return;
        }
        self.state.set(ClickState::NotClicked);
        if let Some(point) = self.clicked_point.get() {
            for callback in self.callbacks.snapshot() {
                callback(point);
            }
        }
    }

    fn cancel(&self) {
        self.state.set(ClickState::NotClicked);
        self.pressed.set(false);
    }
}

/// Fires on a double click whose two clicks hit the same point inside the component.
#[derive(Clone)]
pub struct DoubleClick {
    inner: Rc<DoubleClickInner>,
}

impl Default for DoubleClick {
    fn default() -> Self {
        Self::new()
    }
}

impl DoubleClick {
    /// Create an unanchored double-click interaction.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DoubleClickInner {
                id: next_interaction_id(),
                slot: AnchorSlot::default(),
                state: Cell::new(ClickState::NotClicked),
                pressed: Cell::new(false),
                clicked_point: Cell::new(None),
                callbacks: Callbacks::default(),
            }),
        }
    }

    /// Called with the component-local point of the double click.
    pub fn on_double_click(&self, callback: impl Fn(Point) + 'static) {
        self.inner.callbacks.push(Rc::new(callback));
    }
}

impl Interaction for DoubleClick {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn anchor(&self, target: InteractionTarget) {
        self.inner.slot.release(self.inner.id);
        let key = ListenerKey::Id(self.inner.id);
        let mouse = target.surface.dispatchers().mouse();
        let touch = target.surface.dispatchers().touch();

        let inner = Rc::downgrade(&self.inner);
        mouse.on_mouse_down(key.clone(), move |signal: &MouseSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.press(signal.position);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        mouse.on_mouse_up(key.clone(), move |signal: &MouseSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.release(signal.position);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        mouse.on_dbl_click(key.clone(), move |_: &MouseSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.double_click();
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_start(key.clone(), move |signal: &TouchSignal| {
            if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                inner.press(point);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_end(key.clone(), move |signal: &TouchSignal| {
            if let (Some(inner), Some(point)) = (inner.upgrade(), signal.first_point()) {
                inner.release(point);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_cancel(key, move |_: &TouchSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.cancel();
            }
        });
        self.inner.slot.replace(Some(target));
    }

    fn unanchor(&self) {
        self.inner.cancel();
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

    fn surface_with(interaction: impl Interaction + 'static) -> (ChartSurface, ComponentRef) {
        let surface = ChartSurface::with_config(
            200.0,
            200.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let layer: ComponentRef = share(SelectionBoxLayer::new());
        layer.borrow_mut().base_mut().register_interaction(interaction);
        render_to(&layer, &surface).expect("render");
        (surface, layer)
    }

    #[test]
    fn click_needs_press_and_release_inside() {
        let click = Click::new();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = hits.clone();
        click.on_click(move |point| sink.borrow_mut().push(point));
        let (surface, layer) = surface_with(click);
        layer
            .borrow_mut()
            .compute_layout(Some(LayoutOffer::new(Point::new(50.0, 50.0), 100.0, 100.0)));
        let mouse = surface.dispatchers().mouse();
        mouse.mouse_down(MouseEvent::at(60.0, 60.0));
        mouse.mouse_up(MouseEvent::at(70.0, 80.0));
        mouse.mouse_down(MouseEvent::at(60.0, 60.0));
        mouse.mouse_up(MouseEvent::at(10.0, 10.0));
        mouse.mouse_down(MouseEvent::at(10.0, 10.0));
        mouse.mouse_up(MouseEvent::at(60.0, 60.0));
        assert_eq!(*hits.borrow(), vec![Point::new(20.0, 30.0)]);
    }

    #[test]
    fn double_click_requires_two_clicks_on_the_same_point() {
        let double = DoubleClick::new();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = hits.clone();
        double.on_double_click(move |point| sink.borrow_mut().push(point));
        let (surface, _layer) = surface_with(double);
        let mouse = surface.dispatchers().mouse();

        for _ in 0..2 {
            mouse.mouse_down(MouseEvent::at(20.0, 20.0));
            mouse.mouse_up(MouseEvent::at(20.0, 20.0));
        }
        mouse.dbl_click(MouseEvent::at(20.0, 20.0));
        assert_eq!(*hits.borrow(), vec![Point::new(20.0, 20.0)]);

        mouse.mouse_down(MouseEvent::at(20.0, 20.0));
        mouse.mouse_up(MouseEvent::at(20.0, 20.0));
        mouse.mouse_down(MouseEvent::at(40.0, 40.0));
        mouse.mouse_up(MouseEvent::at(40.0, 40.0));
        mouse.dbl_click(MouseEvent::at(40.0, 40.0));
        assert_eq!(hits.borrow().len(), 1);
    }
}
