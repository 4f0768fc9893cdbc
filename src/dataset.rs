//! Shared record collections.
//!
//! A [`Dataset`] is a cheap handle; clones refer to the same records. Plots
//! register listeners on it and rebuild their derived state whenever the
//! records or metadata change.

use std::fmt;
use std::rc::Rc;
use std::cell::RefCell;

use serde_json::Value;

use crate::broadcaster::Broadcaster;
use crate::extent::{Extent, as_key, as_number};

struct DatasetInner {
    data: RefCell<Rc<Vec<Value>>>,
    metadata: RefCell<Value>,
    broadcaster: Broadcaster<Dataset>,
}

/// Ordered records plus an opaque metadata value.
#[derive(Clone)]
pub struct Dataset {
    inner: Rc<DatasetInner>,
}

impl Dataset {
    /// Create a dataset with records and `null` metadata.
    pub fn new(data: Vec<Value>) -> Self {
        Self::with_metadata(data, Value::Null)
    }

    /// Create a dataset with records and metadata.
    pub fn with_metadata(data: Vec<Value>, metadata: Value) -> Self {
        Self {
            inner: Rc::new(DatasetInner {
                data: RefCell::new(Rc::new(data)),
                metadata: RefCell::new(metadata),
                broadcaster: Broadcaster::new(),
            }),
        }
    }

    /// Current records.
    pub fn data(&self) -> Rc<Vec<Value>> {
        self.inner.data.borrow().clone()
    }

    /// Replace the records and notify listeners.
    pub fn set_data(&self, data: Vec<Value>) {
        *self.inner.data.borrow_mut() = Rc::new(data);
        self.inner.broadcaster.broadcast(self);
    }

    /// Current metadata.
    pub fn metadata(&self) -> Value {
        self.inner.metadata.borrow().clone()
    }

    /// Replace the metadata and notify listeners.
    pub fn set_metadata(&self, metadata: Value) {
        *self.inner.metadata.borrow_mut() = metadata;
        self.inner.broadcaster.broadcast(self);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    /// Check whether the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listener hub fired on every mutation.
    pub fn broadcaster(&self) -> &Broadcaster<Dataset> {
        &self.inner.broadcaster
    }

    /// Check whether two handles refer to the same dataset.
    pub fn ptr_eq(&self, other: &Dataset) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Numeric extent of `accessor` over the records.
    pub fn numeric_extent(&self, accessor: impl Fn(&Value, usize) -> Value) -> Option<Extent> {
        let data = self.data();
        Extent::of_values(
            data.iter()
                .enumerate()
                .map(|(index, datum)| as_number(&accessor(datum, index))),
        )
    }

    /// Distinct keys produced by `accessor`, in first-appearance order.
    pub fn category_extent(&self, accessor: impl Fn(&Value, usize) -> Value) -> Vec<String> {
        let data = self.data();
        let mut keys: Vec<String> = Vec::new();
        for (index, datum) in data.iter().enumerate() {
            if let Some(key) = as_key(&accessor(datum, index))
                && !keys.contains(&key)
            {
                keys.push(key);
            }
        }
        keys
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("len", &self.len())
            .field("metadata", &*self.inner.metadata.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use serde_json::json;

    #[test]
    fn mutation_broadcasts_to_listeners() {
        let dataset = Dataset::new(vec![json!({"x": 1})]);
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        dataset
            .broadcaster()
            .register("plot-1", move |_: &Dataset| counter.set(counter.get() + 1));
        dataset.set_data(vec![json!({"x": 2}), json!({"x": 3})]);
        dataset.set_metadata(json!({"name": "b"}));
        assert_eq!(hits.get(), 2);
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn extents_skip_missing_values() {
        let dataset = Dataset::new(vec![
            json!({"x": "a", "y": 4}),
            json!({"x": "b", "y": null}),
            json!({"x": "a", "y": -2}),
        ]);
        let extent = dataset
            .numeric_extent(|datum, _| datum["y"].clone())
            .expect("extent");
        assert_eq!(extent, Extent::new(-2.0, 4.0));
        let keys = dataset.category_extent(|datum, _| datum["x"].clone());
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
