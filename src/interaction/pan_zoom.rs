//! Panning and zooming of quantitative scales.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::broadcaster::ListenerKey;
use crate::geom::Point;
use crate::scale::QuantitativeScale;

use super::dispatcher::{MouseSignal, TouchSignal};
use super::drag::Drag;
use super::{AnchorSlot, Interaction, InteractionTarget, next_interaction_id};

/// Wheel pixels per doubling of the zoom.
const WHEEL_ZOOM_RATE: f64 = 0.002;

/// Rescale `scale` about the range value `center`.
///
/// Factors above one zoom out, below one zoom in.
pub fn magnify_scale(scale: &QuantitativeScale, magnify_amount: f64, center: f64) {
    let (start, end) = scale.range();
    let magnify = |range_value: f64| scale.invert(center - (center - range_value) * magnify_amount);
    let domain = (magnify(start), magnify(end));
    if let Err(error) = scale.set_domain(domain.0, domain.1) {
        tracing::debug!(%error, "zoom produced an unusable domain");
    }
}

/// Shift `scale` by `amount` range pixels.
pub fn translate_scale(scale: &QuantitativeScale, amount: f64) {
    let (start, end) = scale.range();
    let domain = (scale.invert(start + amount), scale.invert(end + amount));
    if let Err(error) = scale.set_domain(domain.0, domain.1) {
        tracing::debug!(%error, "pan produced an unusable domain");
    }
}

struct ZoomedScale {
    scale: QuantitativeScale,
    initial: Cell<Option<(f64, f64)>>,
}

impl ZoomedScale {
    fn new(scale: QuantitativeScale) -> Self {
        Self {
            scale,
            initial: Cell::new(None),
        }
    }

    fn capture(&self) {
        let initial = (!self.scale.is_auto_domain()).then(|| self.scale.domain());
        self.initial.set(initial);
    }

    fn reset(&self) {
        match self.initial.get() {
            Some((start, end)) => {
                if let Err(error) = self.scale.set_domain(start, end) {
                    tracing::warn!(%error, "could not restore domain");
                }
            }
            None => self.scale.reset_domain(),
        }
    }
}

struct PanZoomInner {
    id: u64,
    slot: AnchorSlot,
    x: Option<ZoomedScale>,
    y: Option<ZoomedScale>,
    touches: RefCell<IndexMap<u32, Point>>,
    last_drag_point: Cell<Option<Point>>,
}

impl PanZoomInner {
    fn scales(&self) -> impl Iterator<Item = &ZoomedScale> {
        self.x.iter().chain(self.y.iter())
    }

    fn magnify(&self, amount: f64, center: Point) {
        if let Some(x) = &self.x {
            magnify_scale(&x.scale, amount, center.x);
        }
        if let Some(y) = &self.y {
            magnify_scale(&y.scale, amount, center.y);
        }
    }

    fn translate(&self, dx: f64, dy: f64) {
        if let Some(x) = &self.x {
            translate_scale(&x.scale, dx);
        }
        if let Some(y) = &self.y {
            translate_scale(&y.scale, dy);
        }
    }

    fn wheel(&self, signal: &MouseSignal) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let local = target.to_local(signal.position);
        if !target.contains(local) {
            return;
        }
        let zoom = 2f64.powf(signal.event.delta_y * WHEEL_ZOOM_RATE);
        self.magnify(zoom, local);
    }

    fn drag(&self, start: Point, end: Point) {
        if self.touches.borrow().len() >= 2 {
            return;
        }
        let last = self.last_drag_point.get().unwrap_or(start);
        self.translate(-(end.x - last.x), -(end.y - last.y));
        self.last_drag_point.set(Some(end));
    }

    fn touch_start(&self, signal: &TouchSignal) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let mut touches = self.touches.borrow_mut();
        for id in &signal.ids {
            if touches.len() >= 2 {
                break;
            }
            if let Some(point) = signal.points.get(id) {
                touches.insert(*id, target.to_local(*point));
            }
        }
    }

    fn pinch(&self, signal: &TouchSignal) {
        let Some(target) = self.slot.target() else {
            return;
        };
        let (old_center, old_distance, new_center, new_distance) = {
            let mut touches = self.touches.borrow_mut();
            if touches.len() < 2 {
                return;
            }
            let (old_center, old_distance) = pinch_geometry(&touches);
            for id in &signal.ids {
                if let (Some(slot), Some(point)) = (touches.get_mut(id), signal.points.get(id)) {
                    *slot = target.to_local(*point);
                }
            }
            let (new_center, new_distance) = pinch_geometry(&touches);
            (old_center, old_distance, new_center, new_distance)
        };
        if old_distance == 0.0 || new_distance == 0.0 {
            return;
        }
        self.magnify(old_distance / new_distance, old_center);
        self.translate(old_center.x - new_center.x, old_center.y - new_center.y);
    }

    fn touch_end(&self, signal: &TouchSignal) {
        let mut touches = self.touches.borrow_mut();
        for id in &signal.ids {
            touches.shift_remove(id);
        }
    }
}

fn pinch_geometry(touches: &IndexMap<u32, Point>) -> (Point, f64) {
    let mut points = touches.values();
    let (Some(first), Some(second)) = (points.next(), points.next()) else {
        return (Point::default(), 0.0);
    };
    let center = Point::new((first.x + second.x) / 2.0, (first.y + second.y) / 2.0);
    (center, first.distance_squared(*second).sqrt())
}

/// Pans scales by dragging and zooms them with the wheel or a pinch.
///
/// Zooming is centred on the pointer, and a zoom by `a` followed by a zoom
/// by `1 / a` at the same point restores the domain.
#[derive(Clone)]
pub struct PanZoom {
    inner: Rc<PanZoomInner>,
    drag: Drag,
}

impl PanZoom {
    /// Pan and zoom the given scales. Either may be `None`.
    pub fn new(x_scale: Option<QuantitativeScale>, y_scale: Option<QuantitativeScale>) -> Self {
        let inner = Rc::new(PanZoomInner {
            id: next_interaction_id(),
            slot: AnchorSlot::default(),
            x: x_scale.map(ZoomedScale::new),
            y: y_scale.map(ZoomedScale::new),
            touches: RefCell::new(IndexMap::new()),
            last_drag_point: Cell::new(None),
        });
        let drag = Drag::new();
        drag.set_constrained_to_component(false);
        let state = Rc::downgrade(&inner);
        drag.on_drag_start(move |_| {
            if let Some(state) = state.upgrade() {
                state.last_drag_point.set(None);
            }
        });
        let state = Rc::downgrade(&inner);
        drag.on_drag(move |start, end| {
            if let Some(state) = state.upgrade() {
                state.drag(start, end);
            }
        });
        Self { inner, drag }
    }

    /// Restore the domains the scales had when the interaction was anchored.
    ///
    /// Scales that were auto-domaining go back to automatic mode.
    pub fn reset_zoom(&self) {
        for scale in self.inner.scales() {
            scale.reset();
        }
    }
}

impl Interaction for PanZoom {
    fn id(&self) -> u64 {
        self.inner.id
    }

    fn anchor(&self, target: InteractionTarget) {
        self.inner.slot.release(self.inner.id);
        for scale in self.inner.scales() {
            scale.capture();
        }
        self.drag.anchor(target.clone());
        let key = ListenerKey::Id(self.inner.id);
        let mouse = target.surface.dispatchers().mouse();
        let touch = target.surface.dispatchers().touch();

        let inner = Rc::downgrade(&self.inner);
        mouse.on_wheel(key.clone(), move |signal: &MouseSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.wheel(signal);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_start(key.clone(), move |signal: &TouchSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.touch_start(signal);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_move(key.clone(), move |signal: &TouchSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.pinch(signal);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_end(key.clone(), move |signal: &TouchSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.touch_end(signal);
            }
        });
        let inner = Rc::downgrade(&self.inner);
        touch.on_touch_cancel(key, move |signal: &TouchSignal| {
            if let Some(inner) = inner.upgrade() {
                inner.touch_end(signal);
            }
        });
        self.inner.slot.replace(Some(target));
    }

    fn unanchor(&self) {
        self.drag.unanchor();
        self.inner.touches.borrow_mut().clear();
        self.inner.slot.release(self.inner.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentRef, SelectionBoxLayer, render_to, share};
    use crate::interaction::dispatcher::MouseEvent;
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    fn anchored(pan_zoom: PanZoom) -> (ChartSurface, ComponentRef) {
        let surface = ChartSurface::with_config(
            100.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let layer: ComponentRef = share(SelectionBoxLayer::new());
        layer.borrow_mut().base_mut().register_interaction(pan_zoom);
        render_to(&layer, &surface).expect("render");
        (surface, layer)
    }

    fn linear(range: (f64, f64)) -> QuantitativeScale {
        let scale = QuantitativeScale::linear();
        scale.set_domain(0.0, 10.0).expect("domain");
        scale.set_range(range.0, range.1);
        scale
    }

    #[test]
    fn zoom_in_then_out_restores_domain() {
        let x = linear((0.0, 100.0));
        let (surface, _layer) = anchored(PanZoom::new(Some(x.clone()), None));
        let mouse = surface.dispatchers().mouse();
        mouse.wheel(MouseEvent::at(25.0, 50.0).with_delta_y(-500.0));
        let zoomed = x.domain();
        assert!(zoomed.1 - zoomed.0 < 10.0);
        // the value under the cursor stays put
        assert!((x.invert(25.0) - 2.5).abs() < 1e-9);
        mouse.wheel(MouseEvent::at(25.0, 50.0).with_delta_y(500.0));
        let (start, end) = x.domain();
        assert!(start.abs() < 1e-9);
        assert!((end - 10.0).abs() < 1e-9);
    }

    #[test]
    fn dragging_pans_against_the_pointer() {
        let x = linear((0.0, 100.0));
        let y = linear((100.0, 0.0));
        let (surface, _layer) = anchored(PanZoom::new(Some(x.clone()), Some(y.clone())));
        let mouse = surface.dispatchers().mouse();
        mouse.mouse_down(MouseEvent::at(50.0, 50.0));
        mouse.mouse_move(MouseEvent::at(60.0, 50.0));
        mouse.mouse_move(MouseEvent::at(70.0, 40.0));
        mouse.mouse_up(MouseEvent::at(70.0, 40.0));
        let (start, end) = x.domain();
        assert!((start + 2.0).abs() < 1e-9);
        assert!((end - 8.0).abs() < 1e-9);
        let (start, end) = y.domain();
        assert!((start + 1.0).abs() < 1e-9);
        assert!((end - 9.0).abs() < 1e-9);
    }

    #[test]
    fn reset_zoom_restores_anchored_domain() {
        let x = linear((0.0, 100.0));
        let pan_zoom = PanZoom::new(Some(x.clone()), None);
        let (surface, _layer) = anchored(pan_zoom.clone());
        surface
            .dispatchers()
            .mouse()
            .wheel(MouseEvent::at(50.0, 50.0).with_delta_y(300.0));
        assert!(x.domain().1 > 10.0);
        pan_zoom.reset_zoom();
        assert_eq!(x.domain(), (0.0, 10.0));
    }

    #[test]
    fn wheel_outside_the_component_is_ignored() {
        let x = linear((0.0, 100.0));
        let (surface, _layer) = anchored(PanZoom::new(Some(x.clone()), None));
        surface
            .dispatchers()
            .mouse()
            .wheel(MouseEvent::at(150.0, 50.0).with_delta_y(300.0));
        assert_eq!(x.domain(), (0.0, 10.0));
    }
}
