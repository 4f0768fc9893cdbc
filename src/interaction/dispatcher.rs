//! Per-surface input dispatchers.
//!
//! The host feeds raw events into the dispatchers of a surface; every
//! interaction anchored under that surface listens on the same instances.
//! Positions arrive in client coordinates and are translated to surface
//! coordinates before they are broadcast.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::broadcaster::{Broadcaster, ListenerKey};
use crate::geom::Point;
use crate::surface::ClientTranslation;

/// Primary mouse button.
pub const PRIMARY_BUTTON: u16 = 0;

/// Raw mouse event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseEvent {
    /// Pointer position in client coordinates.
    pub client: Point,
    /// Button index; 0 is the primary button.
    pub button: u16,
    /// Vertical wheel delta in pixels.
    pub delta_y: f64,
}

impl MouseEvent {
    /// Event at a client position with the primary button.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            client: Point::new(x, y),
            ..Self::default()
        }
    }

    /// Builder-style button.
    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }

    /// Builder-style wheel delta.
    pub fn with_delta_y(mut self, delta_y: f64) -> Self {
        self.delta_y = delta_y;
        self
    }
}

/// Mouse event translated to surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseSignal {
    /// Position in surface coordinates.
    pub position: Point,
    /// The raw event.
    pub event: MouseEvent,
}

/// Touch event translated to surface coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TouchSignal {
    /// Touch ids in event order.
    pub ids: Vec<u32>,
    /// Surface position per touch id.
    pub points: IndexMap<u32, Point>,
}

impl TouchSignal {
    /// Position of the first touch in the event.
    pub fn first_point(&self) -> Option<Point> {
        self.ids.first().and_then(|id| self.points.get(id)).copied()
    }
}

/// Key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySignal {
    /// Platform key code.
    pub key_code: u32,
}

/// Broadcasts mouse events for one surface.
pub struct MouseDispatcher {
    translation: ClientTranslation,
    last_position: Cell<Option<Point>>,
    moves: Broadcaster<MouseSignal>,
    downs: Broadcaster<MouseSignal>,
    ups: Broadcaster<MouseSignal>,
    wheels: Broadcaster<MouseSignal>,
    dbl_clicks: Broadcaster<MouseSignal>,
}

impl MouseDispatcher {
    fn new(translation: ClientTranslation) -> Self {
        Self {
            translation,
            last_position: Cell::new(None),
            moves: Broadcaster::new(),
            downs: Broadcaster::new(),
            ups: Broadcaster::new(),
            wheels: Broadcaster::new(),
            dbl_clicks: Broadcaster::new(),
        }
    }

    /// Last pointer position seen, in surface coordinates.
    pub fn last_mouse_position(&self) -> Option<Point> {
        self.last_position.get()
    }

    /// Listen for pointer movement.
    pub fn on_mouse_move(&self, key: impl Into<ListenerKey>, callback: impl Fn(&MouseSignal) + 'static) {
        self.moves.register(key, callback);
    }

    /// Stop listening for pointer movement.
    pub fn off_mouse_move(&self, key: &ListenerKey) {
        self.moves.deregister(key);
    }

    /// Listen for button presses.
    pub fn on_mouse_down(&self, key: impl Into<ListenerKey>, callback: impl Fn(&MouseSignal) + 'static) {
        self.downs.register(key, callback);
    }

    /// Stop listening for button presses.
    pub fn off_mouse_down(&self, key: &ListenerKey) {
        self.downs.deregister(key);
    }

    /// Listen for button releases.
    pub fn on_mouse_up(&self, key: impl Into<ListenerKey>, callback: impl Fn(&MouseSignal) + 'static) {
        self.ups.register(key, callback);
    }

    /// Stop listening for button releases.
    pub fn off_mouse_up(&self, key: &ListenerKey) {
        self.ups.deregister(key);
    }

    /// Listen for wheel events.
    pub fn on_wheel(&self, key: impl Into<ListenerKey>, callback: impl Fn(&MouseSignal) + 'static) {
        self.wheels.register(key, callback);
    }

    /// Stop listening for wheel events.
    pub fn off_wheel(&self, key: &ListenerKey) {
        self.wheels.deregister(key);
    }

    /// Listen for double clicks.
    pub fn on_dbl_click(&self, key: impl Into<ListenerKey>, callback: impl Fn(&MouseSignal) + 'static) {
        self.dbl_clicks.register(key, callback);
    }

    /// Stop listening for double clicks.
    pub fn off_dbl_click(&self, key: &ListenerKey) {
        self.dbl_clicks.deregister(key);
    }

    /// Stop every listener registered under `key`.
    pub fn off_all(&self, key: &ListenerKey) {
        for broadcaster in [&self.moves, &self.downs, &self.ups, &self.wheels, &self.dbl_clicks] {
            broadcaster.deregister(key);
        }
    }

    /// Host entry point: the pointer moved.
    pub fn mouse_move(&self, event: MouseEvent) {
        self.dispatch(&self.moves, event);
    }

    /// Host entry point: a button was pressed.
    pub fn mouse_down(&self, event: MouseEvent) {
        self.dispatch(&self.downs, event);
    }

    /// Host entry point: a button was released.
    pub fn mouse_up(&self, event: MouseEvent) {
        self.dispatch(&self.ups, event);
    }

    /// Host entry point: the wheel turned.
    pub fn wheel(&self, event: MouseEvent) {
        self.dispatch(&self.wheels, event);
    }

    /// Host entry point: a double click.
    pub fn dbl_click(&self, event: MouseEvent) {
        self.dispatch(&self.dbl_clicks, event);
    }

    fn dispatch(&self, broadcaster: &Broadcaster<MouseSignal>, event: MouseEvent) {
        let Some(position) = self.translation.to_surface(event.client) else {
            tracing::trace!(?event, "mouse event outside translatable space");
            return;
        };
        self.last_position.set(Some(position));
        broadcaster.broadcast(&MouseSignal { position, event });
    }
}

/// Broadcasts touch events for one surface.
pub struct TouchDispatcher {
    translation: ClientTranslation,
    starts: Broadcaster<TouchSignal>,
    moves: Broadcaster<TouchSignal>,
    ends: Broadcaster<TouchSignal>,
    cancels: Broadcaster<TouchSignal>,
}

impl TouchDispatcher {
    fn new(translation: ClientTranslation) -> Self {
        Self {
            translation,
            starts: Broadcaster::new(),
            moves: Broadcaster::new(),
            ends: Broadcaster::new(),
            cancels: Broadcaster::new(),
        }
    }

    /// Listen for new touches.
    pub fn on_touch_start(&self, key: impl Into<ListenerKey>, callback: impl Fn(&TouchSignal) + 'static) {
        self.starts.register(key, callback);
    }

    /// Listen for touch movement.
    pub fn on_touch_move(&self, key: impl Into<ListenerKey>, callback: impl Fn(&TouchSignal) + 'static) {
        self.moves.register(key, callback);
    }

    /// Listen for lifted touches.
    pub fn on_touch_end(&self, key: impl Into<ListenerKey>, callback: impl Fn(&TouchSignal) + 'static) {
        self.ends.register(key, callback);
    }

    /// Listen for cancelled touches.
    pub fn on_touch_cancel(&self, key: impl Into<ListenerKey>, callback: impl Fn(&TouchSignal) + 'static) {
        self.cancels.register(key, callback);
    }

    /// Stop every listener registered under `key`.
    pub fn off_all(&self, key: &ListenerKey) {
        for broadcaster in [&self.starts, &self.moves, &self.ends, &self.cancels] {
            broadcaster.deregister(key);
        }
    }

    /// Host entry point: touches started at client positions.
    pub fn touch_start(&self, touches: &[(u32, Point)]) {
        self.dispatch(&self.starts, touches);
    }

    /// Host entry point: touches moved.
    pub fn touch_move(&self, touches: &[(u32, Point)]) {
        self.dispatch(&self.moves, touches);
    }

    /// Host entry point: touches lifted.
    pub fn touch_end(&self, touches: &[(u32, Point)]) {
        self.dispatch(&self.ends, touches);
    }

    /// Host entry point: touches cancelled by the platform.
    pub fn touch_cancel(&self, touches: &[(u32, Point)]) {
        self.dispatch(&self.cancels, touches);
    }

    fn dispatch(&self, broadcaster: &Broadcaster<TouchSignal>, touches: &[(u32, Point)]) {
        let mut signal = TouchSignal::default();
        for (id, client) in touches {
            if let Some(point) = self.translation.to_surface(*client) {
                signal.ids.push(*id);
                signal.points.insert(*id, point);
            }
        }
        if signal.ids.is_empty() {
            return;
        }
        broadcaster.broadcast(&signal);
    }
}

/// Broadcasts key presses for one surface.
#[derive(Default)]
pub struct KeyDispatcher {
    downs: Broadcaster<KeySignal>,
}

impl KeyDispatcher {
    /// Listen for key presses.
    pub fn on_key_down(&self, key: impl Into<ListenerKey>, callback: impl Fn(&KeySignal) + 'static) {
        self.downs.register(key, callback);
    }

    /// Stop listening for key presses.
    pub fn off_key_down(&self, key: &ListenerKey) {
        self.downs.deregister(key);
    }

    /// Host entry point: a key was pressed.
    pub fn key_down(&self, key_code: u32) {
        self.downs.broadcast(&KeySignal { key_code });
    }
}

/// Lazily created dispatchers owned by one surface.
pub struct DispatcherRegistry {
    translation: ClientTranslation,
    mouse: RefCell<Option<Rc<MouseDispatcher>>>,
    touch: RefCell<Option<Rc<TouchDispatcher>>>,
    key: RefCell<Option<Rc<KeyDispatcher>>>,
}

impl DispatcherRegistry {
    pub(crate) fn new(translation: ClientTranslation) -> Self {
        Self {
            translation,
            mouse: RefCell::new(None),
            touch: RefCell::new(None),
            key: RefCell::new(None),
        }
    }

    /// Mouse dispatcher, created on first use.
    pub fn mouse(&self) -> Rc<MouseDispatcher> {
        self.mouse
            .borrow_mut()
            .get_or_insert_with(|| {
                tracing::debug!("mouse dispatcher created");
                Rc::new(MouseDispatcher::new(self.translation))
            })
            .clone()
    }

    /// Touch dispatcher, created on first use.
    pub fn touch(&self) -> Rc<TouchDispatcher> {
        self.touch
            .borrow_mut()
            .get_or_insert_with(|| {
                tracing::debug!("touch dispatcher created");
                Rc::new(TouchDispatcher::new(self.translation))
            })
            .clone()
    }

    /// Key dispatcher, created on first use.
    pub fn key(&self) -> Rc<KeyDispatcher> {
        self.key
            .borrow_mut()
            .get_or_insert_with(|| {
                tracing::debug!("key dispatcher created");
                Rc::new(KeyDispatcher::default())
            })
            .clone()
    }

    /// Check whether any dispatcher exists yet.
    pub fn is_empty(&self) -> bool {
        self.mouse.borrow().is_none() && self.touch.borrow().is_none() && self.key.borrow().is_none()
    }

    /// Drop every dispatcher and its listeners.
    pub fn clear(&self) {
        self.mouse.borrow_mut().take();
        self.touch.borrow_mut().take();
        self.key.borrow_mut().take();
    }

    /// Remove everything registered under `key` from existing dispatchers.
    pub(crate) fn off_all(&self, key: &ListenerKey) {
        if let Some(mouse) = self.mouse.borrow().as_ref() {
            mouse.off_all(key);
        }
        if let Some(touch) = self.touch.borrow().as_ref() {
            touch.off_all(key);
        }
        if let Some(keys) = self.key.borrow().as_ref() {
            keys.off_key_down(key);
        }
    }
}

impl fmt::Debug for DispatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherRegistry")
            .field("mouse", &self.mouse.borrow().is_some())
            .field("touch", &self.touch.borrow().is_some())
            .field("key", &self.key.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatchers_are_created_once() {
        let registry = DispatcherRegistry::new(ClientTranslation::default());
        assert!(registry.is_empty());
        let first = registry.mouse();
        let second = registry.mouse();
        assert!(Rc::ptr_eq(&first, &second));
        registry.clear();
        assert!(registry.is_empty());
        assert!(!Rc::ptr_eq(&first, &registry.mouse()));
    }

    #[test]
    fn mouse_positions_are_translated() {
        let registry = DispatcherRegistry::new(ClientTranslation {
            offset_x: 100.0,
            offset_y: 50.0,
            ..ClientTranslation::default()
        });
        let mouse = registry.mouse();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        mouse.on_mouse_down("test", move |signal: &MouseSignal| {
            sink.borrow_mut().push((signal.position, signal.event.button));
        });
        mouse.mouse_down(MouseEvent::at(110.0, 70.0).with_button(2));
        assert_eq!(*seen.borrow(), vec![(Point::new(10.0, 20.0), 2)]);
        assert_eq!(mouse.last_mouse_position(), Some(Point::new(10.0, 20.0)));
        mouse.off_all(&ListenerKey::from("test"));
        mouse.mouse_down(MouseEvent::at(0.0, 0.0));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn touch_signal_keeps_id_order() {
        let registry = DispatcherRegistry::new(ClientTranslation::default());
        let touch = registry.touch();
        let first = Rc::new(Cell::new(None));
        let sink = first.clone();
        touch.on_touch_start("t", move |signal: &TouchSignal| sink.set(signal.first_point()));
        touch.touch_start(&[(7, Point::new(3.0, 4.0)), (2, Point::new(9.0, 9.0))]);
        assert_eq!(first.get(), Some(Point::new(3.0, 4.0)));
    }
}
