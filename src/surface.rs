//! Root drawing surface.
//!
//! A [`ChartSurface`] stands for one chart: it owns the SVG document that
//! root components render into, the render controller that batches their
//! updates, and the input dispatchers shared by every interaction attached
//! under it.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, WeakComponent};
use crate::geom::Point;
use crate::interaction::dispatcher::DispatcherRegistry;
use crate::render_controller::{DEFAULT_TIMEOUT_MS, RenderController, RenderPolicy};
use crate::svg::{NodeId, SvgDocument};
use crate::text::{MonospaceMeasurer, TextMeasurer};

/// Mapping from host (client) coordinates to surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientTranslation {
    /// Client x of the surface's top-left corner.
    pub offset_x: f64,
    /// Client y of the surface's top-left corner.
    pub offset_y: f64,
    /// Client pixels per surface pixel, horizontally.
    pub scale_x: f64,
    /// Client pixels per surface pixel, vertically.
    pub scale_y: f64,
}

impl Default for ClientTranslation {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl ClientTranslation {
    /// Convert a client position into surface coordinates.
    ///
    /// Returns `None` when the translation is degenerate.
    pub fn to_surface(&self, client: Point) -> Option<Point> {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return None;
        }
        let point = Point::new(
            (client.x - self.offset_x) / self.scale_x,
            (client.y - self.offset_y) / self.scale_y,
        );
        point.is_finite().then_some(point)
    }
}

/// Configuration for a chart surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// When queued layout and render work runs.
    pub render_policy: RenderPolicy,
    /// Delay requested from the host under [`RenderPolicy::Timeout`].
    pub timeout_ms: f64,
    /// Metrics of the default text measurer.
    pub text: MonospaceMeasurer,
    /// Client to surface coordinate mapping used by the dispatchers.
    pub client: ClientTranslation,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            render_policy: RenderPolicy::AnimationFrame,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            text: MonospaceMeasurer::default(),
            client: ClientTranslation::default(),
        }
    }
}

struct SurfaceInner {
    config: SurfaceConfig,
    size: Cell<(f64, f64)>,
    document: RefCell<SvgDocument>,
    controller: RenderController,
    dispatchers: DispatcherRegistry,
    measurer: Box<dyn TextMeasurer>,
    roots: RefCell<Vec<(ComponentId, WeakComponent)>>,
}

/// Shared handle to one chart surface.
#[derive(Clone)]
pub struct ChartSurface {
    inner: Rc<SurfaceInner>,
}

impl ChartSurface {
    /// Create a surface with the default configuration.
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_config(width, height, SurfaceConfig::default())
    }

    /// Create a surface with a custom configuration.
    pub fn with_config(width: f64, height: f64, config: SurfaceConfig) -> Self {
        let measurer = config.text;
        Self::with_measurer(width, height, config, measurer)
    }

    /// Create a surface with a custom configuration and text measurer.
    pub fn with_measurer(
        width: f64,
        height: f64,
        config: SurfaceConfig,
        measurer: impl TextMeasurer + 'static,
    ) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let controller = RenderController::new(config.render_policy, config.timeout_ms);
        let dispatchers = DispatcherRegistry::new(config.client);
        Self {
            inner: Rc::new(SurfaceInner {
                config,
                size: Cell::new((width, height)),
                document: RefCell::new(SvgDocument::new(width, height)),
                controller,
                dispatchers,
                measurer: Box::new(measurer),
                roots: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Configuration the surface was created with.
    pub fn config(&self) -> &SurfaceConfig {
        &self.inner.config
    }

    /// Surface width in pixels.
    pub fn width(&self) -> f64 {
        self.inner.size.get().0
    }

    /// Surface height in pixels.
    pub fn height(&self) -> f64 {
        self.inner.size.get().1
    }

    /// Resize the surface and lay out every root component again.
    pub fn set_size(&self, width: f64, height: f64) {
        let width = width.max(0.0);
        let height = height.max(0.0);
        self.inner.size.set((width, height));
        self.inner.document.borrow_mut().set_size(width, height);
        let roots: Vec<(ComponentId, WeakComponent)> = self.inner.roots.borrow().clone();
        for (id, root) in roots {
            self.inner.controller.register_to_compute_layout(id, root);
        }
    }

    /// Borrow the SVG document.
    pub fn document(&self) -> Ref<'_, SvgDocument> {
        self.inner.document.borrow()
    }

    /// Mutably borrow the SVG document.
    pub fn document_mut(&self) -> RefMut<'_, SvgDocument> {
        self.inner.document.borrow_mut()
    }

    /// Root `<svg>` node.
    pub fn root_node(&self) -> NodeId {
        self.inner.document.borrow().root()
    }

    /// Render controller shared by every component on this surface.
    pub fn controller(&self) -> &RenderController {
        &self.inner.controller
    }

    /// Input dispatchers for this surface.
    pub fn dispatchers(&self) -> &DispatcherRegistry {
        &self.inner.dispatchers
    }

    /// Text measurer used for layout.
    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.inner.measurer.as_ref()
    }

    /// Run all pending layout and render work now.
    pub fn flush(&self) {
        self.inner.controller.flush();
    }

    /// Serialize the current document.
    pub fn to_svg_string(&self) -> String {
        self.inner.document.borrow().to_svg_string()
    }

    /// Check whether two handles refer to the same surface.
    pub fn ptr_eq(&self, other: &ChartSurface) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Tear down the input dispatchers and forget the root components.
    pub fn destroy(&self) {
        self.inner.dispatchers.clear();
        self.inner.roots.borrow_mut().clear();
        tracing::debug!("chart surface destroyed");
    }

    pub(crate) fn add_root(&self, id: ComponentId, root: WeakComponent) {
        let mut roots = self.inner.roots.borrow_mut();
        roots.retain(|(existing, weak)| *existing != id && weak.strong_count() > 0);
        roots.push((id, root));
    }

    pub(crate) fn remove_root(&self, id: ComponentId) {
        self.inner
            .roots
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }
}

impl fmt::Debug for ChartSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartSurface")
            .field("size", &self.inner.size.get())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_translation_maps_into_surface_space() {
        let translation = ClientTranslation {
            offset_x: 10.0,
            offset_y: 20.0,
            scale_x: 2.0,
            scale_y: 2.0,
        };
        assert_eq!(
            translation.to_surface(Point::new(30.0, 40.0)),
            Some(Point::new(10.0, 10.0))
        );
        let degenerate = ClientTranslation {
            scale_x: 0.0,
            ..ClientTranslation::default()
        };
        assert_eq!(degenerate.to_surface(Point::new(1.0, 1.0)), None);
    }

    #[test]
    fn resizing_updates_document() {
        let surface = ChartSurface::new(100.0, 50.0);
        surface.set_size(200.0, -5.0);
        assert_eq!(surface.width(), 200.0);
        assert_eq!(surface.height(), 0.0);
        let svg = surface.to_svg_string();
        assert!(svg.contains("width=\"200\""));
        assert!(svg.contains("height=\"0\""));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config: SurfaceConfig =
            serde_json::from_str(r#"{"render_policy":"immediate"}"#).expect("config");
        assert_eq!(config.render_policy, RenderPolicy::Immediate);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }
}
