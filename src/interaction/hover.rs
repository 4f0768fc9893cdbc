//! Point-level hovering over plots.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;

use crate::broadcaster::ListenerKey;
use crate::geom::Point;
use crate::svg::NodeId;

use super::dispatcher::MouseSignal;
use super::{AnchorSlot, Callbacks, Interaction, InteractionTarget, next_interaction_id};

/// Hovered data, with the pixel position and element of each datum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverData {
    /// Hovered records.
    pub data: Vec<Value>,
    /// Position of each record in component coordinates.
    pub pixel_positions: Vec<Point>,
    /// Element drawn for each record, when there is one.
    pub selection: Vec<NodeId>,
    /// Dataset key and record index of each record, when known.
    pub origins: Vec<(String, usize)>,
}

impl HoverData {
    /// Check whether nothing is hovered.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries of `self` that are not in `other`.
    ///
    /// Records are matched by dataset key and index when both sides carry
    /// origins, so equal records from different datasets stay distinct.
    pub fn difference(&self, other: &HoverData) -> HoverData {
        let by_origin = self.origins.len() == self.data.len() && other.origins.len() == other.data.len();
        let mut diff = HoverData::default();
        for (index, datum) in self.data.iter().enumerate() {
            let shared = if by_origin {
                other.origins.contains(&self.origins[index])
            } else {
                other.data.contains(datum)
            };
            if shared {
                continue;
            }
            diff.data.push(datum.clone());
            if let Some(origin) = self.origins.get(index) {
                diff.origins.push(origin.clone());
            }
            if let Some(position) = self.pixel_positions.get(index) {
                diff.pixel_positions.push(*position);
            }
            if let Some(node) = self.selection.get(index) {
                diff.selection.push(*node);
            }
        }
        diff
    }
}

/// Components that can report the data under a point.
pub trait Hoverable {
    /// The pointer entered the component.
    fn hover_over_component(&mut self, point: Point);

    /// The pointer left the component.
    fn hover_out_component(&mut self, point: Point);

    /// Data under `point`, in component coordinates.
    fn do_hover(&mut self, point: Point) -> HoverData;
}

type HoverCallback = dyn Fn(&HoverData);

struct HoverInner {
    id: u64,
    slot: AnchorSlot,
    over: Cell<bool>,
    current: RefCell<HoverData>,
    warned: Cell<bool>,
    on_over: Callbacks<HoverCallback>,
    on_out: Callbacks<HoverCallback>,
}

enum HoverEvent {
    Over,
    Move,
    Out,
}

impl HoverInner {
    /// Run `event` against the hoverable component; `None` when unavailable.
    fn with_hoverable(&self, target: &InteractionTarget, point: Point, event: HoverEvent) -> Option<HoverData> {
        let component = target.component()?;
        let Ok(mut component) = component.try_borrow_mut() else {
            tracing::trace!(component = target.id.get(), "hover skipped, component busy");
            return None;
        };
        let Some(hoverable) = component.as_hoverable_mut() else {
            if !self.warned.replace(true) {
                tracing::warn!(component = target.id.get(), "hover attached to a component that cannot hover");
            }
            return None;
        };
        match event {
            HoverEvent::Over => hoverable.hover_over_component(point),
            HoverEvent::Out => {
                hoverable.hover_out_component(point);
                return Some(HoverData::default());
            }
            HoverEvent::Move => {}
        }
        Some(hoverable.do_hover(point))
    }

    fn pointer_at(&self, point: Point) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let local = target.to_local(point);
        let inside = target.contains(local);
        let was_over = self.over.get();
        match (was_over, inside) {
            (false, true) => {
                let Some(data) = self.with_hoverable(&target, local, HoverEvent::Over) else {
                    return;
                };
                self.over.set(true);
                *self.current.borrow_mut() = data.clone();
                if !data.is_empty() {
                    for callback in self.on_over.snapshot() {
                        callback(&data);
                    }
                }
            }
            (true, true) => {
                let Some(data) = self.with_hoverable(&target, local, HoverEvent::Move) else {
                    return;
                };
                let previous = std::mem::replace(&mut *self.current.borrow_mut(), data.clone());
                let out = previous.difference(&data);
                if !out.is_empty() {
                    for callback in self.on_out.snapshot() {
                        callback(&out);
                    }
                }
                let over = data.difference(&previous);
                if !over.is_empty() {
                    for callback in self.on_over.snapshot() {
                        callback(&over);
                    }
                }
            }
            (true, false) => {
                self.over.set(false);
                let _ = self.with_hoverable(&target, local, HoverEvent::Out);
                let previous = std::mem::take(&mut *self.current.borrow_mut());
                if !previous.is_empty() {
                    for callback in self.on_out.snapshot() {
                        callback(&previous);
                    }
                }
            }
            (false, false) => {}
        }
    }
}

/// Reports hovered data of a [`Hoverable`] component.
///
/// Over and out callbacks only receive the entries that changed since the
/// previous pointer position.
#[derive(Clone)]
pub struct Hover {
    inner: Rc<HoverInner>,
}

impl Default for Hover {
    fn default() -> Self {
        Self::new()
    }
}

impl Hover {
    /// Create an unanchored hover interaction.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HoverInner {
                id: next_interaction_id(),
                slot: AnchorSlot::default(),
                over: Cell::new(false),
                current: RefCell::new(HoverData::default()),
                warned: Cell::new(false),
                on_over: Callbacks::default(),
                on_out: Callbacks::default(),
            }),
        }
    }

    /// Called with newly hovered entries.
    pub fn on_hover_over(&self, callback: impl Fn(&HoverData) + 'static) {
        self.inner.on_over.push(Rc::new(callback));
    }

    /// Called with entries no longer hovered.
    pub fn on_hover_out(&self, callback: impl Fn(&HoverData) + 'static) {
        self.inner.on_out.push(Rc::new(callback));
    }

    /// Everything hovered right now.
    pub fn current_hover_data(&self) -> HoverData {
        self.inner.current.borrow().clone()
    }
}

impl Interaction for Hover {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn anchor(&self, target: InteractionTarget) {
        self.inner.slot.release(self.inner.id);
        let inner = Rc::downgrade(&self.inner);
        target.surface.dispatchers().mouse().on_mouse_move(
            ListenerKey::Id(self.inner.id),
            move |signal: &MouseSignal| {
                if let Some(inner) = inner.upgrade() {
                    inner.pointer_at(signal.position);
                }
            },
        );
        self.inner.slot.replace(Some(target));
    }

    fn unanchor(&self) {
        self.inner.over.set(false);
        *self.inner.current.borrow_mut() = HoverData::default();
        self.inner.slot.release(self.inner.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::component::{Component, ComponentBase, ComponentRef, render_to, share};
    use crate::interaction::dispatcher::MouseEvent;
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    /// Hovers every integer column within one pixel of the pointer.
    struct Columns {
        base: ComponentBase,
        entered: usize,
    }

    impl Component for Columns {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }

        fn as_hoverable_mut(&mut self) -> Option<&mut dyn Hoverable> {
            Some(self)
        }
    }

    impl Hoverable for Columns {
        fn hover_over_component(&mut self, _point: Point) {
            self.entered += 1;
        }

        fn hover_out_component(&mut self, _point: Point) {}

        fn do_hover(&mut self, point: Point) -> HoverData {
            let mut data = HoverData::default();
            let low = (point.x - 1.0).ceil() as i64;
            let high = (point.x + 1.0).floor() as i64;
            for column in low..=high {
                data.data.push(json!(column));
                data.pixel_positions.push(Point::new(column as f64, point.y));
            }
            data
        }
    }

    #[test]
    fn callbacks_receive_only_changes() {
        let surface = ChartSurface::with_config(
            50.0,
            50.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let columns = share(Columns {
            base: ComponentBase::new("columns"),
            entered: 0,
        });
        let hover = Hover::new();
        let overs = Rc::new(RefCell::new(Vec::new()));
        let outs = Rc::new(RefCell::new(Vec::new()));
        let sink = overs.clone();
        hover.on_hover_over(move |data| sink.borrow_mut().push(data.data.clone()));
        let sink = outs.clone();
        hover.on_hover_out(move |data| sink.borrow_mut().push(data.data.clone()));
        columns.borrow_mut().base_mut().register_interaction(hover.clone());
        let handle: ComponentRef = columns.clone();
        render_to(&handle, &surface).expect("render");

        let mouse = surface.dispatchers().mouse();
        mouse.mouse_move(MouseEvent::at(10.5, 5.0));
        mouse.mouse_move(MouseEvent::at(10.6, 5.0));
        mouse.mouse_move(MouseEvent::at(11.5, 5.0));
        mouse.mouse_move(MouseEvent::at(80.0, 5.0));

        assert_eq!(columns.borrow().entered, 1);
        assert_eq!(
            *overs.borrow(),
            vec![vec![json!(10), json!(11)], vec![json!(12)]]
        );
        assert_eq!(*outs.borrow(), vec![vec![json!(10)], vec![json!(11), json!(12)]]);
        assert!(hover.current_hover_data().is_empty());
    }

    #[test]
    fn difference_keeps_positions_aligned() {
        let a = HoverData {
            data: vec![json!(1), json!(2)],
            pixel_positions: vec![Point::new(1.0, 0.0), Point::new(2.0, 0.0)],
            ..HoverData::default()
        };
        let b = HoverData {
            data: vec![json!(1)],
            ..HoverData::default()
        };
        let diff = a.difference(&b);
        assert_eq!(diff.data, vec![json!(2)]);
        assert_eq!(diff.pixel_positions, vec![Point::new(2.0, 0.0)]);
    }

    #[test]
    fn equal_records_from_different_datasets_stay_distinct() {
        let first = HoverData {
            data: vec![json!({"x": 1})],
            origins: vec![("north".to_string(), 0)],
            ..HoverData::default()
        };
        let second = HoverData {
            data: vec![json!({"x": 1})],
            origins: vec![("south".to_string(), 0)],
            ..HoverData::default()
        };
        let diff = second.difference(&first);
        assert_eq!(diff.data, vec![json!({"x": 1})]);
        assert_eq!(diff.origins, vec![("south".to_string(), 0)]);
        assert!(first.difference(&first).is_empty());
    }
}
