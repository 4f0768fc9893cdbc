//! Coalesces layout and render requests into flushes.
//!
//! Components only ever enqueue themselves. The controller decides when the
//! queued work runs: right away, on the next animation frame, or when the
//! host's timer fires. A flush lays out every pending root before it renders
//! anything.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, ComponentRef, WeakComponent, root_of};

/// Upper bound on flush passes; renders may enqueue more work.
pub const MAX_FLUSH_PASSES: usize = 8;
/// Default delay used by the timeout policy.
pub const DEFAULT_TIMEOUT_MS: f64 = 1.0;

/// When queued work is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderPolicy {
    /// Flush as soon as anything is enqueued.
    Immediate,
    /// Flush when the host reports an animation frame.
    #[default]
    AnimationFrame,
    /// Flush when the host's timer fires.
    Timeout,
}

impl std::str::FromStr for RenderPolicy {
    type Err = crate::error::ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "animationframe" | "animation-frame" => Ok(Self::AnimationFrame),
            "timeout" => Ok(Self::Timeout),
            _ => Err(crate::error::ChartError::InvalidOption {
                kind: "render policy",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct ControllerState {
    policy: RenderPolicy,
    timeout_ms: f64,
    layout_queue: IndexMap<ComponentId, WeakComponent>,
    render_queue: IndexMap<ComponentId, WeakComponent>,
    frame_requested: bool,
    timeout_requested: bool,
    flushing: bool,
}

/// Shared render queue for one surface.
#[derive(Clone)]
pub struct RenderController {
    state: Rc<RefCell<ControllerState>>,
}

impl RenderController {
    /// Create a controller with the given policy.
    pub fn new(policy: RenderPolicy, timeout_ms: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(ControllerState {
                policy,
                timeout_ms,
                ..ControllerState::default()
            })),
        }
    }

    /// Current policy.
    pub fn policy(&self) -> RenderPolicy {
        self.state.borrow().policy
    }

    /// Swap the policy. Pending work is kept and scheduled under the new one.
    pub fn set_policy(&self, policy: RenderPolicy) {
        self.state.borrow_mut().policy = policy;
        if self.has_pending() {
            self.schedule();
        }
    }

    /// Enqueue a component for rendering.
    pub fn register_to_render(&self, id: ComponentId, component: WeakComponent) {
        self.state
            .borrow_mut()
            .render_queue
            .entry(id)
            .or_insert(component);
        self.schedule();
    }

    /// Enqueue a component for layout and rendering.
    pub fn register_to_compute_layout(&self, id: ComponentId, component: WeakComponent) {
        {
            let mut state = self.state.borrow_mut();
            state.layout_queue.entry(id).or_insert_with(|| component.clone());
            state.render_queue.entry(id).or_insert(component);
        }
        self.schedule();
    }

    /// Check whether any work is queued.
    pub fn has_pending(&self) -> bool {
        let state = self.state.borrow();
        !state.layout_queue.is_empty() || !state.render_queue.is_empty()
    }

    /// Check whether the host should deliver an animation frame.
    pub fn frame_requested(&self) -> bool {
        self.state.borrow().frame_requested
    }

    /// Delay after which the host should call [`RenderController::on_timeout`].
    pub fn timeout_requested(&self) -> Option<f64> {
        let state = self.state.borrow();
        state.timeout_requested.then_some(state.timeout_ms)
    }

    /// Host callback for a display refresh tick.
    pub fn on_animation_frame(&self) {
        let requested = std::mem::take(&mut self.state.borrow_mut().frame_requested);
        if requested {
            self.flush();
        }
    }

    /// Host callback for the timer set up by the timeout policy.
    pub fn on_timeout(&self) {
        let requested = std::mem::take(&mut self.state.borrow_mut().timeout_requested);
        if requested {
            self.flush();
        }
    }

    fn schedule(&self) {
        let policy = {
            let mut state = self.state.borrow_mut();
            match state.policy {
                RenderPolicy::AnimationFrame => state.frame_requested = true,
                RenderPolicy::Timeout => state.timeout_requested = true,
                RenderPolicy::Immediate => {}
            }
            state.policy
        };
        if policy == RenderPolicy::Immediate {
            self.flush();
        }
    }

    /// Run all pending layouts, then all pending renders.
    ///
    /// Renders may enqueue further work, so the queues are drained repeatedly
    /// until they settle. Components that were dropped or removed are skipped.
    /// Components that are borrowed elsewhere stay queued for the next flush.
    pub fn flush(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.flushing {
                return;
            }
            state.flushing = true;
            state.frame_requested = false;
            state.timeout_requested = false;
        }
        let mut deferred_layout: IndexMap<ComponentId, WeakComponent> = IndexMap::new();
        let mut deferred_render: IndexMap<ComponentId, WeakComponent> = IndexMap::new();
        for pass in 0..MAX_FLUSH_PASSES {
            let (layout, render) = {
                let mut state = self.state.borrow_mut();
                (
                    std::mem::take(&mut state.layout_queue),
                    std::mem::take(&mut state.render_queue),
                )
            };
            if layout.is_empty() && render.is_empty() {
                break;
            }
            tracing::trace!(pass, layouts = layout.len(), renders = render.len(), "flush pass");

            let mut roots: IndexMap<ComponentId, ComponentRef> = IndexMap::new();
            for (id, weak) in &layout {
                let Some(component) = weak.upgrade() else {
                    continue;
                };
                let root = root_of(&component);
                let root_id = root.try_borrow().map(|c| c.base().id()).unwrap_or(*id);
                roots.entry(root_id).or_insert(root);
            }
            for (id, root) in roots {
                match root.try_borrow_mut() {
                    Ok(mut root) => {
                        if root.base().is_anchored() {
                            root.compute_layout(None);
                        }
                    }
                    Err(_) => {
                        tracing::debug!(component = id.get(), "layout deferred, component busy");
                        deferred_layout.insert(id, Rc::downgrade(&root));
                    }
                }
            }

            for (id, weak) in render {
                let Some(component) = weak.upgrade() else {
                    continue;
                };
                match component.try_borrow_mut() {
                    Ok(mut component) => {
                        if component.base().is_renderable() {
                            component.render_immediately();
                            component.base_mut().mark_rendered();
                        }
                    }
                    Err(_) => {
                        tracing::debug!(component = id.get(), "render deferred, component busy");
                        deferred_render.insert(id, weak);
                    }
                }
            }
        }

        let mut state = self.state.borrow_mut();
        state.flushing = false;
        if !deferred_layout.is_empty() || !deferred_render.is_empty() {
            tracing::warn!(
                layouts = deferred_layout.len(),
                renders = deferred_render.len(),
                "flush skipped busy components; they stay queued"
            );
        }
        for (id, weak) in deferred_layout {
            state.layout_queue.entry(id).or_insert(weak);
        }
        for (id, weak) in deferred_render {
            state.render_queue.entry(id).or_insert(weak);
        }
        if !state.layout_queue.is_empty() || !state.render_queue.is_empty() {
            match state.policy {
                RenderPolicy::AnimationFrame => state.frame_requested = true,
                RenderPolicy::Timeout => state.timeout_requested = true,
                RenderPolicy::Immediate => {}
            }
        }
    }
}

impl Default for RenderController {
    fn default() -> Self {
        Self::new(RenderPolicy::default(), DEFAULT_TIMEOUT_MS)
    }
}

impl fmt::Debug for RenderController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RenderController")
            .field("policy", &state.policy)
            .field("layout_queue", &state.layout_queue.len())
            .field("render_queue", &state.render_queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{
        Component, ComponentBase, LayoutOffer, Shared, layout_component, remove, render_to, share,
    };
    use crate::surface::ChartSurface;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        base: ComponentBase,
        name: &'static str,
        log: Log,
    }

    impl Component for Recorder {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }

        fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
            layout_component(self, offer);
            self.log.borrow_mut().push(format!("layout {}", self.name));
        }

        fn render_immediately(&mut self) {
            self.log.borrow_mut().push(format!("render {}", self.name));
        }
    }

    fn rendered(surface: &ChartSurface, name: &'static str, log: &Log) -> Shared<Recorder> {
        let recorder = share(Recorder {
            base: ComponentBase::new("recorder"),
            name,
            log: log.clone(),
        });
        let as_dyn: ComponentRef = recorder.clone();
        render_to(&as_dyn, surface).expect("render");
        recorder
    }

    #[test]
    fn requests_coalesce_and_layouts_run_first() {
        let surface = ChartSurface::new(100.0, 100.0);
        let log = Log::default();
        let first = rendered(&surface, "first", &log);
        let second = rendered(&surface, "second", &log);
        log.borrow_mut().clear();

        first.borrow().base().hook().request_render();
        first.borrow().base().hook().request_render();
        second.borrow().base().hook().request_layout();
        assert!(surface.controller().frame_requested());
        assert!(log.borrow().is_empty());

        surface.controller().on_animation_frame();
        assert_eq!(
            *log.borrow(),
            vec!["layout second", "render first", "render second"]
        );
        assert!(!surface.controller().has_pending());
        assert!(!surface.controller().frame_requested());
    }

    #[test]
    fn dropped_components_are_skipped() {
        let surface = ChartSurface::new(100.0, 100.0);
        let log = Log::default();
        let gone = rendered(&surface, "gone", &log);
        log.borrow_mut().clear();
        gone.borrow().base().hook().request_layout();
        drop(gone);

        surface.controller().on_animation_frame();
        assert!(log.borrow().is_empty());
        assert!(!surface.controller().has_pending());
    }

    #[test]
    fn removed_components_are_skipped() {
        let surface = ChartSurface::new(100.0, 100.0);
        let log = Log::default();
        let removed = rendered(&surface, "removed", &log);
        log.borrow_mut().clear();
        removed.borrow().base().hook().request_render();
        let as_dyn: ComponentRef = removed.clone();
        remove(&as_dyn);

        surface.controller().on_animation_frame();
        assert!(log.borrow().is_empty());
        assert!(!surface.controller().has_pending());
    }

    #[test]
    fn swapping_the_policy_keeps_pending_work() {
        let surface = ChartSurface::new(100.0, 100.0);
        let log = Log::default();
        let recorder = rendered(&surface, "kept", &log);
        log.borrow_mut().clear();
        recorder.borrow().base().hook().request_render();

        surface.controller().set_policy(RenderPolicy::Timeout);
        assert!(surface.controller().has_pending());
        assert_eq!(surface.controller().timeout_requested(), Some(DEFAULT_TIMEOUT_MS));
        surface.controller().on_timeout();
        assert_eq!(*log.borrow(), vec!["render kept"]);

        recorder.borrow().base().hook().request_render();
        surface.controller().set_policy(RenderPolicy::Immediate);
        assert_eq!(*log.borrow(), vec!["render kept", "render kept"]);
        assert!(!surface.controller().has_pending());
    }

    #[test]
    fn policy_names_parse() {
        assert_eq!("animation-frame".parse::<RenderPolicy>(), Ok(RenderPolicy::AnimationFrame));
        assert!("vsync".parse::<RenderPolicy>().is_err());
    }
}
