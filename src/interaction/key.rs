//! Key presses while the pointer is over a component.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::broadcaster::ListenerKey;

use super::dispatcher::{KeySignal, MouseDispatcher};
use super::{AnchorSlot, Interaction, InteractionTarget, next_interaction_id};

type KeyCallback = Rc<dyn Fn(u32)>;

struct KeyInner {
    id: u64,
    slot: AnchorSlot,
    callbacks: RefCell<IndexMap<u32, Vec<KeyCallback>>>,
}

impl KeyInner {
    fn key_down(&self, mouse: &MouseDispatcher, key_code: u32) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let Some(position) = mouse.last_mouse_position() else {
            return;
        };
        if !target.contains(target.to_local(position)) {
            return;
        }
        let callbacks = self
            .callbacks
            .borrow()
            .get(&key_code)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            callback(key_code);
        }
    }
}

/// Fires per key code when a key goes down with the pointer over the component.
#[derive(Clone)]
pub struct Key {
    inner: Rc<KeyInner>,
}

impl Default for Key {
    fn default() -> Self {
        Self::new()
    }
}

impl Key {
    /// Create an unanchored key interaction.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(KeyInner {
                id: next_interaction_id(),
                slot: AnchorSlot::default(),
                callbacks: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Called when `key_code` is pressed.
    pub fn on_key(&self, key_code: u32, callback: impl Fn(u32) + 'static) {
        self.inner
            .callbacks
            .borrow_mut()
            .entry(key_code)
            .or_default()
            .push(Rc::new(callback));
    }

    /// Drop every callback for `key_code`.
    pub fn off_key(&self, key_code: u32) {
        self.inner.callbacks.borrow_mut().shift_remove(&key_code);
    }
}

impl Interaction for Key {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn anchor(&self, target: InteractionTarget) {
        self.inner.slot.release(self.inner.id);
        let key = ListenerKey::Id(self.inner.id);
        let mouse = Rc::downgrade(&target.surface.dispatchers().mouse());
        let inner = Rc::downgrade(&self.inner);
        target
            .surface
            .dispatchers()
            .key()
            .on_key_down(key, move |signal: &KeySignal| {
                if let (Some(inner), Some(mouse)) = (inner.upgrade(), mouse.upgrade()) {
                    inner.key_down(&mouse, signal.key_code);
                }
            });
        self.inner.slot.replace(Some(target));
    }

    fn unanchor(&self) {
        self.inner.slot.release(self.inner.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::component::{ComponentRef, SelectionBoxLayer, render_to, share};
    use crate::interaction::dispatcher::MouseEvent;
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    #[test]
    fn key_fires_only_with_pointer_inside() {
        let surface = ChartSurface::with_config(
            100.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let key = Key::new();
        let presses = Rc::new(Cell::new(0));
        let sink = presses.clone();
        key.on_key(65, move |_| sink.set(sink.get() + 1));
        let layer: ComponentRef = share(SelectionBoxLayer::new());
        layer.borrow_mut().base_mut().register_interaction(key.clone());
        render_to(&layer, &surface).expect("render");

        let keys = surface.dispatchers().key();
        keys.key_down(65);
        assert_eq!(presses.get(), 0);
        surface.dispatchers().mouse().mouse_move(MouseEvent::at(10.0, 10.0));
        keys.key_down(65);
        keys.key_down(66);
        assert_eq!(presses.get(), 1);
        surface.dispatchers().mouse().mouse_move(MouseEvent::at(500.0, 10.0));
        keys.key_down(65);
        assert_eq!(presses.get(), 1);
    }
}
