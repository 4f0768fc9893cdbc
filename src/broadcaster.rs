//! Synchronous publish/subscribe hub.
//!
//! Listeners are keyed; registering a key that already exists replaces the
//! callback in place and keeps its delivery position. Broadcasts snapshot the
//! listener list first, so callbacks may register or deregister listeners
//! without affecting the delivery that is in progress.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// Key identifying one listener registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerKey {
    /// Caller-chosen key.
    Named(String),
    /// Numeric key, used for component and interaction ids and for tokens.
    Id(u64),
}

impl From<&str> for ListenerKey {
    fn from(value: &str) -> Self {
        Self::Named(value.to_string())
    }
}

impl From<String> for ListenerKey {
    fn from(value: String) -> Self {
        Self::Named(value)
    }
}

impl From<u64> for ListenerKey {
    fn from(value: u64) -> Self {
        Self::Id(value)
    }
}

type Callback<L> = Rc<dyn Fn(&L)>;

/// Broadcaster bound to listenables of type `L`.
pub struct Broadcaster<L> {
    listeners: RefCell<IndexMap<ListenerKey, Callback<L>>>,
    next_token: Cell<u64>,
}

impl<L> Default for Broadcaster<L> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(IndexMap::new()),
            next_token: Cell::new(0),
        }
    }
}

impl<L> fmt::Debug for Broadcaster<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl<L> Broadcaster<L> {
    /// Create an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under a key, replacing any callback with that key.
    pub fn register(&self, key: impl Into<ListenerKey>, callback: impl Fn(&L) + 'static) {
        self.listeners
            .borrow_mut()
            .insert(key.into(), Rc::new(callback));
    }

    /// Register a callback under a fresh key and return that key as a token.
    pub fn subscribe(&self, callback: impl Fn(&L) + 'static) -> ListenerKey {
        let token = self.next_token.get().wrapping_add(1);
        self.next_token.set(token);
        let key = ListenerKey::Named(format!("__token-{token}"));
        self.register(key.clone(), callback);
        key
    }

    /// Remove the callback registered under a key. Returns whether one existed.
    pub fn deregister(&self, key: &ListenerKey) -> bool {
        self.listeners.borrow_mut().shift_remove(key).is_some()
    }

    /// Remove every callback.
    pub fn deregister_all(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Check whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Call every callback in registration order.
    pub fn broadcast(&self, listenable: &L) {
        let snapshot: Vec<Callback<L>> = self.listeners.borrow().values().cloned().collect();
        for callback in snapshot {
            callback(listenable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_replaces_callback() {
        let broadcaster = Broadcaster::<i32>::new();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let first = hits.clone();
        broadcaster.register("plot", move |value: &i32| first.borrow_mut().push(*value));
        let second = hits.clone();
        broadcaster.register("plot", move |value: &i32| second.borrow_mut().push(value * 10));
        broadcaster.broadcast(&2);
        assert_eq!(*hits.borrow(), vec![20]);
        assert_eq!(broadcaster.len(), 1);
    }

    #[test]
    fn delivery_is_in_registration_order() {
        let broadcaster = Broadcaster::<()>::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b", "c"] {
            let order = order.clone();
            broadcaster.register(name, move |_| order.borrow_mut().push(name));
        }
        broadcaster.broadcast(&());
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn callbacks_may_deregister_during_broadcast() {
        let broadcaster = Rc::new(Broadcaster::<()>::new());
        let count = Rc::new(Cell::new(0));
        let inner = broadcaster.clone();
        let counter = count.clone();
        let token = Rc::new(RefCell::new(None::<ListenerKey>));
        let own = token.clone();
        let key = broadcaster.subscribe(move |_| {
            counter.set(counter.get() + 1);
            if let Some(key) = own.borrow().as_ref() {
                inner.deregister(key);
            }
        });
        *token.borrow_mut() = Some(key);
        broadcaster.broadcast(&());
        broadcaster.broadcast(&());
        assert_eq!(count.get(), 1);
        assert!(broadcaster.is_empty());
    }
}
