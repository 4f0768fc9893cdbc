//! Pointer, touch and keyboard interactions.
//!
//! An interaction is a cheap handle around shared state. It is attached to a
//! component through [`crate::component::ComponentBase::register_interaction`]
//! and anchored whenever that component is, listening on the dispatchers of
//! the component's surface under its own id.

pub mod click;
pub mod dispatcher;
pub mod drag;
pub mod hover;
pub mod key;
pub mod pan_zoom;
pub mod pointer;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::broadcaster::ListenerKey;
use crate::component::{ComponentId, ComponentRef, Placement, WeakComponent};
use crate::geom::Point;
use crate::surface::ChartSurface;

pub use click::{Click, DoubleClick};
pub use dispatcher::{
    DispatcherRegistry, KeyDispatcher, KeySignal, MouseDispatcher, MouseEvent, MouseSignal,
    TouchDispatcher, TouchSignal,
};
pub use drag::Drag;
pub use hover::{Hover, HoverData, Hoverable};
pub use key::Key;
pub use pan_zoom::PanZoom;
pub use pointer::Pointer;

static INTERACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_interaction_id() -> u64 {
    INTERACTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Behaviour attached to one component at a time.
pub trait Interaction {
    /// Unique id, also used as the dispatcher listener key.
    fn id(&self) -> u64;

    /// Start listening on the target's surface.
    fn anchor(&self, target: InteractionTarget);

    /// Stop listening.
    fn unanchor(&self);
}

/// Component an interaction is anchored to.
#[derive(Clone)]
pub struct InteractionTarget {
    /// Surface whose dispatchers deliver input.
    pub surface: ChartSurface,
    /// Live geometry of the component.
    pub placement: Rc<Placement>,
    /// The component itself, once shared.
    pub component: Option<WeakComponent>,
    /// Component id.
    pub id: ComponentId,
}

impl InteractionTarget {
    /// Convert a surface point into component coordinates.
    pub fn to_local(&self, surface_point: Point) -> Point {
        self.placement.to_local(surface_point)
    }

    /// Check whether a component-local point lies inside the component.
    pub fn contains(&self, local: Point) -> bool {
        self.placement.contains_local(local)
    }

    /// Strong handle to the component.
    pub fn component(&self) -> Option<ComponentRef> {
        self.component.as_ref().and_then(|weak| weak.upgrade())
    }
}

/// Anchoring slot shared by every interaction type.
#[derive(Default)]
pub(crate) struct AnchorSlot {
    target: RefCell<Option<InteractionTarget>>,
}

impl AnchorSlot {
    pub(crate) fn target(&self) -> Option<InteractionTarget> {
        self.target.borrow().clone()
    }

    /// Store the new target and return the previous one.
    pub(crate) fn replace(&self, target: Option<InteractionTarget>) -> Option<InteractionTarget> {
        std::mem::replace(&mut *self.target.borrow_mut(), target)
    }

    /// Drop the target and remove the interaction's listeners from its surface.
    pub(crate) fn release(&self, interaction_id: u64) {
        if let Some(previous) = self.replace(None) {
            previous
                .surface
                .dispatchers()
                .off_all(&ListenerKey::Id(interaction_id));
        }
    }
}

/// Ordered callback list.
pub(crate) struct Callbacks<F: ?Sized> {
    entries: RefCell<Vec<Rc<F>>>,
}

impl<F: ?Sized> Default for Callbacks<F> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> Callbacks<F> {
    pub(crate) fn push(&self, callback: Rc<F>) {
        self.entries.borrow_mut().push(callback);
    }

    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Snapshot, so callbacks may register further callbacks.
    pub(crate) fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries.borrow().clone()
    }
}
