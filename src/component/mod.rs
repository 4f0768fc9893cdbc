//! Layout tree.
//!
//! Components are shared as `Rc<RefCell<dyn Component>>`. Each carries a
//! [`ComponentBase`] with its identity, lifecycle state, alignment and the SVG
//! layers it owns. Layout is negotiated top-down: a parent asks children for
//! their [`SpaceRequest`] and then hands each a [`LayoutOffer`]. All drawing
//! goes through the surface's render controller; components only enqueue.

pub mod drag_box;
pub mod gridlines;
pub mod group;
pub mod interpolated_legend;
pub mod label;
pub mod legend;
pub mod selection_box;
pub mod table;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::geom::{Point, Rect};
use crate::interaction::Interaction;
use crate::interaction::hover::Hoverable;
use crate::render_controller::RenderController;
use crate::surface::ChartSurface;
use crate::svg::NodeId;
use crate::text::{MonospaceMeasurer, TextMeasurer};

pub use drag_box::{DragBoxLayer, DragBoxMode};
pub use gridlines::Gridlines;
pub use group::Group;
pub use interpolated_legend::InterpolatedColorLegend;
pub use label::{Label, LabelKind, LabelOrientation};
pub use legend::Legend;
pub use selection_box::SelectionBoxLayer;
pub use table::Table;

/// Shared, dynamically typed component handle.
pub type ComponentRef = Rc<RefCell<dyn Component>>;
/// Weak counterpart of [`ComponentRef`].
pub type WeakComponent = Weak<RefCell<dyn Component>>;
/// Shared handle to a concrete component.
pub type Shared<C> = Rc<RefCell<C>>;

static COMPONENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    fn next() -> Self {
        Self(COMPONENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Horizontal placement inside slack space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAlign {
    /// Flush with the left edge.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush with the right edge.
    Right,
}

impl XAlign {
    /// Fraction of the slack placed before the component.
    pub fn proportion(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

impl FromStr for XAlign {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(ChartError::InvalidAlignment(value.to_string())),
        }
    }
}

/// Vertical placement inside slack space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAlign {
    /// Flush with the top edge.
    #[default]
    Top,
    /// Centered.
    Center,
    /// Flush with the bottom edge.
    Bottom,
}

impl YAlign {
    /// Fraction of the slack placed above the component.
    pub fn proportion(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

impl FromStr for YAlign {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            _ => Err(ChartError::InvalidAlignment(value.to_string())),
        }
    }
}

/// Minimum space a component asks for.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpaceRequest {
    /// Minimum width.
    pub min_width: f64,
    /// Minimum height.
    pub min_height: f64,
}

impl SpaceRequest {
    /// Create a request.
    pub fn new(min_width: f64, min_height: f64) -> Self {
        Self {
            min_width,
            min_height,
        }
    }
}

/// Space a parent allocates to a child, in the parent's content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutOffer {
    /// Top-left corner of the offered box.
    pub origin: Point,
    /// Offered width.
    pub width: f64,
    /// Offered height.
    pub height: f64,
}

impl LayoutOffer {
    /// Create an offer.
    pub fn new(origin: Point, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }
}

/// Lifecycle of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Not attached to any surface.
    #[default]
    Unanchored,
    /// Attached, layers not yet created.
    Anchored,
    /// Layers created.
    SetUp,
    /// Size and origin assigned.
    LaidOut,
    /// Drawn at least once since the last layout.
    Rendered,
    /// Torn down for good.
    Removed,
}

/// Geometry of a laid-out component, shared with its interactions.
///
/// Interactions read it without borrowing the component, which may be busy
/// when input arrives.
#[derive(Debug, Default)]
pub struct Placement {
    origin: Cell<Point>,
    width: Cell<f64>,
    height: Cell<f64>,
    parent: RefCell<Option<Rc<Placement>>>,
}

impl Placement {
    /// Origin relative to the parent's content.
    pub fn origin(&self) -> Point {
        self.origin.get()
    }

    /// Laid-out width.
    pub fn width(&self) -> f64 {
        self.width.get()
    }

    /// Laid-out height.
    pub fn height(&self) -> f64 {
        self.height.get()
    }

    /// Component bounds in its own coordinates.
    pub fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width(), self.height())
    }

    /// Origin in surface coordinates.
    pub fn origin_to_surface(&self) -> Point {
        let mut origin = self.origin();
        let mut parent = self.parent.borrow().clone();
        while let Some(next) = parent {
            origin = origin.offset(next.origin());
            parent = next.parent.borrow().clone();
        }
        origin
    }

    /// Convert a surface point into component coordinates.
    pub fn to_local(&self, surface_point: Point) -> Point {
        surface_point.relative_to(self.origin_to_surface())
    }

    /// Check whether a component-local point lies inside the bounds.
    pub fn contains_local(&self, point: Point) -> bool {
        self.local_bounds().contains(point, 0.0)
    }

    fn set(&self, origin: Point, width: f64, height: f64) {
        self.origin.set(origin);
        self.width.set(width);
        self.height.set(height);
    }

    fn set_parent(&self, parent: Option<Rc<Placement>>) {
        *self.parent.borrow_mut() = parent;
    }
}

struct HookInner {
    id: ComponentId,
    this: RefCell<Option<WeakComponent>>,
    controller: RefCell<Option<RenderController>>,
}

/// Handle a component uses to enqueue itself without borrowing itself.
///
/// Closures registered on scales and datasets capture a hook rather than the
/// component, so a broadcast never needs the component's `RefCell`.
#[derive(Clone)]
pub struct RenderHook {
    inner: Rc<HookInner>,
}

impl RenderHook {
    fn new(id: ComponentId) -> Self {
        Self {
            inner: Rc::new(HookInner {
                id,
                this: RefCell::new(None),
                controller: RefCell::new(None),
            }),
        }
    }

    /// Id of the component this hook belongs to.
    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    /// Weak handle to the component, once it has been shared.
    pub fn weak(&self) -> Option<WeakComponent> {
        self.inner.this.borrow().clone()
    }

    /// Strong handle to the component, if it is still alive.
    pub fn component(&self) -> Option<ComponentRef> {
        self.weak().and_then(|weak| weak.upgrade())
    }

    pub(crate) fn bind(&self, this: WeakComponent) {
        let mut slot = self.inner.this.borrow_mut();
        if slot.as_ref().is_none_or(|weak| weak.strong_count() == 0) {
            *slot = Some(this);
        }
    }

    fn set_controller(&self, controller: Option<RenderController>) {
        *self.inner.controller.borrow_mut() = controller;
    }

    /// Enqueue a render on the surface this component is anchored to.
    pub fn request_render(&self) {
        let controller = self.inner.controller.borrow().clone();
        if let (Some(controller), Some(this)) = (controller, self.weak()) {
            controller.register_to_render(self.inner.id, this);
        }
    }

    /// Enqueue a layout of this component's tree followed by a render.
    pub fn request_layout(&self) {
        let controller = self.inner.controller.borrow().clone();
        if let (Some(controller), Some(this)) = (controller, self.weak()) {
            controller.register_to_compute_layout(self.inner.id, this);
        }
    }
}

impl fmt::Debug for RenderHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderHook")
            .field("id", &self.inner.id)
            .field("bound", &self.weak().is_some())
            .finish()
    }
}

/// SVG layers created when a component is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layers {
    /// Drawn below the content.
    pub background: NodeId,
    /// Main drawing layer.
    pub content: NodeId,
    /// Drawn above the content.
    pub foreground: NodeId,
    /// Holds the bounding box and clip path.
    pub box_container: NodeId,
    /// Rect covering the laid-out bounds.
    pub bounding_box: NodeId,
    background_fill: NodeId,
    clip_rect: Option<NodeId>,
}

/// State shared by every component.
pub struct ComponentBase {
    id: ComponentId,
    hook: RenderHook,
    state: LifecycleState,
    setup_done: bool,
    surface: Option<ChartSurface>,
    parent: Option<WeakComponent>,
    element: Option<NodeId>,
    layers: Option<Layers>,
    classes: Vec<String>,
    x_align: XAlign,
    y_align: YAlign,
    x_offset: f64,
    y_offset: f64,
    placement: Rc<Placement>,
    clip_path_enabled: bool,
    interactions: Vec<Box<dyn Interaction>>,
}

impl ComponentBase {
    /// Create a base carrying the `component` class plus `class`.
    pub fn new(class: &str) -> Self {
        let id = ComponentId::next();
        let mut classes = vec!["component".to_string()];
        for class in class.split_whitespace() {
            if !classes.iter().any(|existing| existing == class) {
                classes.push(class.to_string());
            }
        }
        Self {
            id,
            hook: RenderHook::new(id),
            state: LifecycleState::Unanchored,
            setup_done: false,
            surface: None,
            parent: None,
            element: None,
            layers: None,
            classes,
            x_align: XAlign::Left,
            y_align: YAlign::Top,
            x_offset: 0.0,
            y_offset: 0.0,
            placement: Rc::new(Placement::default()),
            clip_path_enabled: false,
            interactions: Vec::new(),
        }
    }

    /// Component id.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Render hook for this component.
    pub fn hook(&self) -> &RenderHook {
        &self.hook
    }

    /// Lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Check whether the component is attached to a surface.
    pub fn is_anchored(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::Anchored
                | LifecycleState::SetUp
                | LifecycleState::LaidOut
                | LifecycleState::Rendered
        )
    }

    /// Check whether the component's layers exist.
    pub fn is_setup(&self) -> bool {
        self.setup_done
    }

    /// Check whether the component was removed.
    pub fn is_removed(&self) -> bool {
        self.state == LifecycleState::Removed
    }

    /// Check whether the component can draw: anchored, set up and laid out.
    pub fn is_renderable(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::LaidOut | LifecycleState::Rendered
        ) && self.width() >= 0.0
            && self.height() >= 0.0
    }

    pub(crate) fn mark_rendered(&mut self) {
        if self.state == LifecycleState::LaidOut {
            self.state = LifecycleState::Rendered;
        }
    }

    /// Surface the component is anchored to.
    pub fn surface(&self) -> Option<&ChartSurface> {
        self.surface.as_ref().filter(|_| self.is_anchored())
    }

    /// Parent container.
    pub fn parent(&self) -> Option<ComponentRef> {
        self.parent.as_ref().and_then(|parent| parent.upgrade())
    }

    pub(crate) fn set_parent(&mut self, parent: Option<WeakComponent>, placement: Option<Rc<Placement>>) {
        self.parent = parent;
        self.placement.set_parent(placement);
    }

    /// Outer `<g>` element.
    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    /// SVG layers, once set up.
    pub fn layers(&self) -> Option<Layers> {
        self.layers
    }

    /// Content layer, once set up.
    pub fn content(&self) -> Option<NodeId> {
        self.layers.map(|layers| layers.content)
    }

    /// Foreground layer, once set up.
    pub fn foreground(&self) -> Option<NodeId> {
        self.layers.map(|layers| layers.foreground)
    }

    /// Background layer, once set up.
    pub fn background(&self) -> Option<NodeId> {
        self.layers.map(|layers| layers.background)
    }

    /// CSS classes on the element.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Check whether the element carries a class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|existing| existing == class)
    }

    /// Add or remove a class.
    pub fn set_class(&mut self, class: &str, enabled: bool) {
        if enabled && !self.has_class(class) {
            self.classes.push(class.to_string());
        } else if !enabled {
            self.classes.retain(|existing| existing != class);
        }
        if let (Some(surface), Some(element)) = (&self.surface, self.element) {
            surface.document_mut().toggle_class(element, class, enabled);
        }
    }

    /// Horizontal alignment.
    pub fn x_align(&self) -> XAlign {
        self.x_align
    }

    /// Set the horizontal alignment and lay out again.
    pub fn set_x_align(&mut self, align: XAlign) {
        self.x_align = align;
        self.hook.request_layout();
    }

    /// Vertical alignment.
    pub fn y_align(&self) -> YAlign {
        self.y_align
    }

    /// Set the vertical alignment and lay out again.
    pub fn set_y_align(&mut self, align: YAlign) {
        self.y_align = align;
        self.hook.request_layout();
    }

    /// Horizontal pixel offset.
    pub fn x_offset(&self) -> f64 {
        self.x_offset
    }

    /// Set the horizontal pixel offset and lay out again.
    pub fn set_x_offset(&mut self, offset: f64) {
        self.x_offset = offset;
        self.hook.request_layout();
    }

    /// Vertical pixel offset.
    pub fn y_offset(&self) -> f64 {
        self.y_offset
    }

    /// Set the vertical pixel offset and lay out again.
    pub fn set_y_offset(&mut self, offset: f64) {
        self.y_offset = offset;
        self.hook.request_layout();
    }

    /// Whether content is clipped to the bounds.
    pub fn clip_path_enabled(&self) -> bool {
        self.clip_path_enabled
    }

    /// Enable clipping; takes effect at setup.
    pub fn set_clip_path_enabled(&mut self, enabled: bool) {
        self.clip_path_enabled = enabled;
    }

    /// Laid-out width.
    pub fn width(&self) -> f64 {
        self.placement.width()
    }

    /// Laid-out height.
    pub fn height(&self) -> f64 {
        self.placement.height()
    }

    /// Origin relative to the parent's content.
    pub fn origin(&self) -> Point {
        self.placement.origin()
    }

    /// Origin in surface coordinates.
    pub fn origin_to_surface(&self) -> Point {
        self.placement.origin_to_surface()
    }

    /// Shared geometry.
    pub fn placement(&self) -> Rc<Placement> {
        self.placement.clone()
    }

    /// Measure one line of text with the surface's measurer.
    pub fn measure_text(&self, text: &str, size: f64) -> (f64, f64) {
        match &self.surface {
            Some(surface) => surface.measurer().measure(text, size),
            None => MonospaceMeasurer::default().measure(text, size),
        }
    }

    /// Attach an interaction. It is anchored now if the component is.
    pub fn register_interaction(&mut self, interaction: impl Interaction + 'static) {
        let id = interaction.id();
        if self.interactions.iter().any(|existing| existing.id() == id) {
            return;
        }
        if self.is_anchored() {
            self.anchor_interaction(&interaction);
        }
        self.interactions.push(Box::new(interaction));
    }

    /// Detach an interaction by id.
    pub fn deregister_interaction(&mut self, interaction_id: u64) {
        if let Some(index) = self
            .interactions
            .iter()
            .position(|existing| existing.id() == interaction_id)
        {
            let interaction = self.interactions.remove(index);
            interaction.unanchor();
        }
    }

    fn anchor_interaction(&self, interaction: &dyn Interaction) {
        let Some(surface) = &self.surface else {
            return;
        };
        interaction.anchor(crate::interaction::InteractionTarget {
            surface: surface.clone(),
            placement: self.placement.clone(),
            component: self.hook.weak(),
            id: self.id,
        });
    }

    fn attach(&mut self, surface: &ChartSurface, parent: NodeId) {
        if let Some(previous) = &self.surface
            && !previous.ptr_eq(surface)
        {
            if let Some(element) = self.element.take() {
                previous.document_mut().remove(element);
            }
            self.layers = None;
            self.setup_done = false;
        }
        let mut doc = surface.document_mut();
        let element = match self.element.filter(|element| doc.contains(*element)) {
            Some(element) => element,
            None => {
                let element = doc.create("g");
                for class in &self.classes {
                    doc.add_class(element, class);
                }
                self.layers = None;
                self.setup_done = false;
                element
            }
        };
        doc.append_child(parent, element);
        drop(doc);
        self.element = Some(element);
        self.surface = Some(surface.clone());
        self.hook.set_controller(Some(surface.controller().clone()));
        self.state = if self.setup_done {
            LifecycleState::SetUp
        } else {
            LifecycleState::Anchored
        };
        tracing::trace!(component = self.id.get(), "anchored");
    }

    fn create_layers(&mut self) {
        let (Some(surface), Some(element)) = (&self.surface, self.element) else {
            return;
        };
        let mut doc = surface.document_mut();
        let background = doc.append(element, "g");
        doc.add_class(background, "background-container");
        let background_fill = doc.append(background, "rect");
        doc.add_class(background_fill, "background-fill");
        doc.set_attr(background_fill, "fill", "none");
        let content = doc.append(element, "g");
        doc.add_class(content, "content");
        let foreground = doc.append(element, "g");
        doc.add_class(foreground, "foreground-container");
        let box_container = doc.append(element, "g");
        doc.add_class(box_container, "box-container");
        let clip_rect = self.clip_path_enabled.then(|| {
            let clip_id = format!("clipPath{}", self.id.get());
            let clip = doc.append(box_container, "clipPath");
            doc.set_attr(clip, "id", clip_id.clone());
            doc.set_attr(element, "clip-path", format!("url(#{clip_id})"));
            doc.append(clip, "rect")
        });
        let bounding_box = doc.append(box_container, "rect");
        doc.add_class(bounding_box, "bounding-box");
        doc.set_attr(bounding_box, "fill", "none");
        self.layers = Some(Layers {
            background,
            content,
            foreground,
            box_container,
            bounding_box,
            background_fill,
            clip_rect,
        });
    }

    fn finish_setup(&mut self) {
        self.setup_done = true;
        if self.state == LifecycleState::Anchored {
            self.state = LifecycleState::SetUp;
        }
    }

    fn anchor_interactions(&self) {
        for interaction in &self.interactions {
            self.anchor_interaction(interaction.as_ref());
        }
    }

    fn place(&mut self, offer: LayoutOffer, width: f64, height: f64) {
        let x = offer.origin.x + (offer.width - width) * self.x_align.proportion() + self.x_offset;
        let y = offer.origin.y + (offer.height - height) * self.y_align.proportion() + self.y_offset;
        self.placement.set(Point::new(x, y), width, height);
        if let (Some(surface), Some(element)) = (&self.surface, self.element) {
            let mut doc = surface.document_mut();
            doc.set_attr(
                element,
                "transform",
                format!(
                    "translate({},{})",
                    crate::svg::format_number(x),
                    crate::svg::format_number(y)
                ),
            );
            if let Some(layers) = self.layers {
                let boxes = [Some(layers.background_fill), Some(layers.bounding_box), layers.clip_rect];
                for node in boxes.into_iter().flatten() {
                    doc.set_number(node, "width", width);
                    doc.set_number(node, "height", height);
                }
            }
        }
        if self.setup_done && self.is_anchored() {
            self.state = LifecycleState::LaidOut;
        }
    }

    fn detach_nodes(&mut self) {
        if let (Some(surface), Some(element)) = (&self.surface, self.element) {
            surface.document_mut().detach(element);
        }
        for interaction in &self.interactions {
            interaction.unanchor();
        }
        self.hook.set_controller(None);
        if !self.is_removed() {
            self.state = LifecycleState::Unanchored;
        }
    }

    fn destroy(&mut self) {
        self.detach_nodes();
        if let (Some(surface), Some(element)) = (&self.surface, self.element.take()) {
            surface.document_mut().remove(element);
        }
        self.layers = None;
        self.interactions.clear();
        self.state = LifecycleState::Removed;
        tracing::debug!(component = self.id.get(), "removed");
    }
}

impl fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBase")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("classes", &self.classes)
            .field("origin", &self.origin())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// A node in the layout tree.
pub trait Component {
    /// Shared component state.
    fn base(&self) -> &ComponentBase;

    /// Mutable shared component state.
    fn base_mut(&mut self) -> &mut ComponentBase;

    /// Minimum space wanted out of the available box. Must not have side effects.
    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        SpaceRequest::default()
    }

    /// Whether the component only ever uses its requested width.
    fn is_fixed_width(&self) -> bool {
        false
    }

    /// Whether the component only ever uses its requested height.
    fn is_fixed_height(&self) -> bool {
        false
    }

    /// Size taken out of an offer.
    fn size_from_offer(&self, available_width: f64, available_height: f64) -> (f64, f64) {
        default_size(self, available_width, available_height)
    }

    /// Create the component's own SVG structure. Runs once per surface.
    fn setup(&mut self) {}

    /// Attach under `parent` on `surface`.
    fn anchor(&mut self, surface: &ChartSurface, parent: NodeId) {
        anchor_component(self, surface, parent);
    }

    /// Take a size and origin out of the offer. `None` offers the whole surface.
    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
    }

    /// Draw into the layers. Called by the render controller only.
    fn render_immediately(&mut self) {}

    /// Child components, for containers.
    fn children(&self) -> Vec<ComponentRef> {
        Vec::new()
    }

    /// Drop a child from this container without touching the child.
    fn remove_child(&mut self, _id: ComponentId) -> Option<ComponentRef> {
        None
    }

    /// A data source the component listens to has changed.
    fn data_changed(&mut self) {}

    /// Release listeners and children before the component is torn down.
    fn on_remove(&mut self) {}

    /// Downcast to a group for composition.
    fn as_group_mut(&mut self) -> Option<&mut Group> {
        None
    }

    /// Point-level hover support.
    fn as_hoverable_mut(&mut self) -> Option<&mut dyn Hoverable> {
        None
    }
}

/// Default sizing: fixed dimensions take their request, others take everything.
pub fn default_size<C: Component + ?Sized>(
    component: &C,
    available_width: f64,
    available_height: f64,
) -> (f64, f64) {
    let request = component.requested_space(available_width, available_height);
    let width = if component.is_fixed_width() {
        request.min_width.min(available_width)
    } else {
        available_width
    };
    let height = if component.is_fixed_height() {
        request.min_height.min(available_height)
    } else {
        available_height
    };
    (width.max(0.0), height.max(0.0))
}

/// Default anchoring: attach the element, run setup once, anchor interactions.
pub fn anchor_component<C: Component + ?Sized>(
    component: &mut C,
    surface: &ChartSurface,
    parent: NodeId,
) {
    component.base_mut().attach(surface, parent);
    if !component.base().is_setup() {
        component.base_mut().create_layers();
        component.setup();
        component.base_mut().finish_setup();
    }
    component.base().anchor_interactions();
}

/// Default layout: size from the offer, then align inside the slack.
pub fn layout_component<C: Component + ?Sized>(component: &mut C, offer: Option<LayoutOffer>) {
    let offer = offer.unwrap_or_else(|| {
        let (width, height) = component
            .base()
            .surface()
            .map(|surface| (surface.width(), surface.height()))
            .unwrap_or((0.0, 0.0));
        LayoutOffer::new(Point::default(), width, height)
    });
    let (width, height) = component.size_from_offer(offer.width.max(0.0), offer.height.max(0.0));
    component.base_mut().place(offer, width, height);
}

/// Render children synchronously after their container.
pub(crate) fn render_children(children: &[ComponentRef]) {
    for child in children {
        if let Ok(mut child) = child.try_borrow_mut()
            && child.base().is_renderable()
        {
            child.render_immediately();
            child.base_mut().mark_rendered();
        }
    }
}

/// Make a child belong to a container and anchor it if the container is anchored.
pub(crate) fn adopt_child(container: &ComponentBase, child: &ComponentRef, parent_node: Option<NodeId>) {
    let Ok(mut child) = child.try_borrow_mut() else {
        tracing::warn!(container = container.id().get(), "child busy, not adopted");
        return;
    };
    child
        .base_mut()
        .set_parent(container.hook().weak(), Some(container.placement()));
    if let (Some(surface), Some(node)) = (container.surface(), parent_node) {
        let surface = surface.clone();
        child.anchor(&surface, node);
    }
}

/// Unlink a child that now belongs elsewhere.
pub(crate) fn release_child(child: &ComponentRef) {
    if let Ok(mut child) = child.try_borrow_mut() {
        child.base_mut().set_parent(None, None);
        child.base_mut().detach_nodes();
    }
}

/// Wrap a component in a shared handle and bind its render hook.
pub fn share<C: Component + 'static>(component: C) -> Shared<C> {
    let shared = Rc::new(RefCell::new(component));
    let as_dyn: ComponentRef = shared.clone();
    shared.borrow().base().hook().bind(Rc::downgrade(&as_dyn));
    shared
}

/// Anchor a root component to a surface, lay it out and draw it.
pub fn render_to(component: &ComponentRef, surface: &ChartSurface) -> Result<()> {
    let id = {
        let mut inner = component.borrow_mut();
        let id = inner.base().id();
        if inner.base().is_removed() {
            return Err(ChartError::ComponentRemoved(id.get()));
        }
        if inner.base().parent().is_some() {
            return Err(ChartError::AlreadyAnchored(id.get()));
        }
        inner.base().hook().bind(Rc::downgrade(component));
        if inner.base().is_anchored()
            && inner.base().surface().is_some_and(|current| !current.ptr_eq(surface))
        {
            inner.base_mut().detach_nodes();
        }
        let root = surface.root_node();
        inner.anchor(surface, root);
        id
    };
    surface.add_root(id, Rc::downgrade(component));
    surface.controller().register_to_compute_layout(id, Rc::downgrade(component));
    surface.controller().flush();
    Ok(())
}

/// Enqueue a layout of the component's tree and a render.
pub fn redraw(component: &ComponentRef) {
    if let Ok(inner) = component.try_borrow() {
        inner.base().hook().request_layout();
    }
}

/// Enqueue a render of the component.
pub fn render(component: &ComponentRef) {
    if let Ok(inner) = component.try_borrow() {
        inner.base().hook().request_render();
    }
}

/// Detach from the parent and the surface, keeping all resources.
pub fn detach(component: &ComponentRef) {
    let (id, parent) = {
        let inner = component.borrow();
        (inner.base().id(), inner.base().parent())
    };
    if let Some(parent) = parent {
        match parent.try_borrow_mut() {
            Ok(mut parent) => {
                parent.remove_child(id);
                parent.base().hook().request_layout();
            }
            Err(_) => tracing::warn!(component = id.get(), "parent busy during detach"),
        }
    }
    let mut inner = component.borrow_mut();
    if let Some(surface) = inner.base().surface.clone() {
        surface.remove_root(id);
    }
    inner.base_mut().set_parent(None, None);
    inner.base_mut().detach_nodes();
}

/// Tear a component down for good. Containers remove their children too.
pub fn remove(component: &ComponentRef) {
    if component.borrow().base().is_removed() {
        return;
    }
    detach(component);
    let children = {
        let mut inner = component.borrow_mut();
        let children = inner.children();
        for child in &children {
            let child_id = child.borrow().base().id();
            inner.remove_child(child_id);
        }
        children
    };
    for child in &children {
        if let Ok(mut child) = child.try_borrow_mut() {
            child.base_mut().set_parent(None, None);
        }
        remove(child);
    }
    let mut inner = component.borrow_mut();
    inner.on_remove();
    inner.base_mut().destroy();
}

/// Walk up to the outermost container.
pub fn root_of(component: &ComponentRef) -> ComponentRef {
    let mut current = component.clone();
    loop {
        let parent = current
            .try_borrow()
            .ok()
            .and_then(|inner| inner.base().parent());
        match parent {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

fn ensure_unanchored(component: &ComponentRef) -> Result<()> {
    let inner = component.borrow();
    if inner.base().is_removed() {
        return Err(ChartError::ComponentRemoved(inner.base().id().get()));
    }
    if inner.base().is_anchored() {
        return Err(ChartError::AlreadyAnchored(inner.base().id().get()));
    }
    Ok(())
}

/// Stack `top` above `bottom`, reusing an existing group where possible.
pub fn above(top: &ComponentRef, bottom: &ComponentRef) -> Result<ComponentRef> {
    ensure_unanchored(top)?;
    ensure_unanchored(bottom)?;
    let top_is_group = top.borrow_mut().as_group_mut().is_some();
    let bottom_is_group = bottom.borrow_mut().as_group_mut().is_some();
    match (top_is_group, bottom_is_group) {
        (true, false) => {
            Group::prepend(top, bottom.clone())?;
            Ok(top.clone())
        }
        (false, true) => {
            Group::append(bottom, top.clone())?;
            Ok(bottom.clone())
        }
        _ => {
            let group: ComponentRef = Group::with_children(vec![bottom.clone(), top.clone()])?;
            Ok(group)
        }
    }
}

/// Stack `bottom` below `top`.
pub fn below(bottom: &ComponentRef, top: &ComponentRef) -> Result<ComponentRef> {
    above(top, bottom)
}

/// Merge two components so that `overlay` draws over `base`.
pub fn merge(base: &ComponentRef, overlay: &ComponentRef) -> Result<ComponentRef> {
    above(overlay, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_controller::RenderPolicy;
    use crate::surface::SurfaceConfig;

    struct Boxy {
        base: ComponentBase,
        request: SpaceRequest,
        fixed: bool,
        renders: usize,
    }

    impl Boxy {
        fn new(width: f64, height: f64, fixed: bool) -> Self {
            Self {
                base: ComponentBase::new("boxy"),
                request: SpaceRequest::new(width, height),
                fixed,
                renders: 0,
            }
        }
    }

    impl Component for Boxy {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }

        fn requested_space(&self, _w: f64, _h: f64) -> SpaceRequest {
            self.request
        }

        fn is_fixed_width(&self) -> bool {
            self.fixed
        }

        fn is_fixed_height(&self) -> bool {
            self.fixed
        }

        fn render_immediately(&mut self) {
            self.renders += 1;
        }
    }

    fn immediate_surface(width: f64, height: f64) -> ChartSurface {
        ChartSurface::with_config(
            width,
            height,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        )
    }

    #[test]
    fn alignment_places_fixed_component_in_slack() {
        let surface = immediate_surface(400.0, 300.0);
        let mut boxy = Boxy::new(100.0, 50.0, true);
        boxy.base_mut().set_x_align(XAlign::Center);
        boxy.base_mut().set_y_align(YAlign::Bottom);
        boxy.base_mut().set_x_offset(5.0);
        let boxy = share(boxy);
        let handle: ComponentRef = boxy.clone();
        render_to(&handle, &surface).expect("render");
        let inner = boxy.borrow();
        assert_eq!(inner.base().origin(), Point::new(155.0, 250.0));
        assert_eq!(inner.base().width(), 100.0);
        assert_eq!(inner.base().state(), LifecycleState::Rendered);
        assert_eq!(inner.renders, 1);
        assert!(surface.to_svg_string().contains("translate(155,250)"));
    }

    #[test]
    fn fixed_component_is_clamped_to_offer() {
        let boxy = Boxy::new(500.0, 50.0, true);
        assert_eq!(boxy.size_from_offer(200.0, 100.0), (200.0, 50.0));
        let flexible = Boxy::new(500.0, 50.0, false);
        assert_eq!(flexible.size_from_offer(200.0, 100.0), (200.0, 100.0));
    }

    #[test]
    fn removed_component_cannot_render_again() {
        let surface = immediate_surface(100.0, 100.0);
        let handle: ComponentRef = share(Boxy::new(10.0, 10.0, false));
        render_to(&handle, &surface).expect("render");
        remove(&handle);
        assert!(handle.borrow().base().is_removed());
        assert_eq!(
            render_to(&handle, &surface),
            Err(ChartError::ComponentRemoved(handle.borrow().base().id().get()))
        );
        assert!(!surface.to_svg_string().contains("boxy"));
    }

    #[test]
    fn detach_keeps_resources_for_reanchoring() {
        let surface = immediate_surface(100.0, 100.0);
        let boxy = share(Boxy::new(10.0, 10.0, false));
        let handle: ComponentRef = boxy.clone();
        render_to(&handle, &surface).expect("render");
        let element = boxy.borrow().base().element();
        detach(&handle);
        assert_eq!(boxy.borrow().base().state(), LifecycleState::Unanchored);
        assert!(!surface.to_svg_string().contains("boxy"));
        render_to(&handle, &surface).expect("render again");
        assert_eq!(boxy.borrow().base().element(), element);
        assert!(surface.to_svg_string().contains("boxy"));
    }

    #[test]
    fn redraw_is_coalesced_until_frame() {
        let surface = ChartSurface::new(100.0, 100.0);
        let boxy = share(Boxy::new(10.0, 10.0, false));
        let handle: ComponentRef = boxy.clone();
        render_to(&handle, &surface).expect("render");
        assert_eq!(boxy.borrow().renders, 1);
        redraw(&handle);
        redraw(&handle);
        render(&handle);
        assert!(surface.controller().frame_requested());
        assert_eq!(boxy.borrow().renders, 1);
        surface.controller().on_animation_frame();
        assert_eq!(boxy.borrow().renders, 2);
        assert!(!surface.controller().has_pending());
    }

    #[test]
    fn alignment_strings_parse() {
        assert_eq!("CENTER".parse::<XAlign>(), Ok(XAlign::Center));
        assert_eq!("bottom".parse::<YAlign>(), Ok(YAlign::Bottom));
        assert!("middle".parse::<XAlign>().is_err());
    }

    #[test]
    fn above_reuses_groups() {
        let a: ComponentRef = share(Boxy::new(1.0, 1.0, false));
        let b: ComponentRef = share(Boxy::new(1.0, 1.0, false));
        let c: ComponentRef = share(Boxy::new(1.0, 1.0, false));
        let group = above(&a, &b).expect("group");
        let ids: Vec<ComponentId> = group
            .borrow()
            .children()
            .iter()
            .map(|child| child.borrow().base().id())
            .collect();
        assert_eq!(ids, vec![b.borrow().base().id(), a.borrow().base().id()]);
        let same = above(&c, &group).expect("append");
        assert!(Rc::ptr_eq(&same, &group));
        assert_eq!(group.borrow().children().len(), 3);
    }
}
