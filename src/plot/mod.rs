//! Plots bind datasets to drawers through projections.
//!
//! Every plot type embeds a [`PlotCore`] holding its datasets (in z-order),
//! its attribute projections and its animators. The [`Plot`] trait supplies
//! the shared operations on top of that core and leaves the per-type pieces
//! (default projectors, draw steps, extents, hit-testing) as overridable
//! hooks. Rendering itself goes through [`render_plot`].

pub mod area;
pub mod bar;
pub mod clustered;
pub mod grid;
pub mod line;
pub mod pie;
pub mod rectangle;
pub mod scatter;
pub mod stacked;
pub mod xy;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::accessor::{Accessor, AttrToProjector, PlotMetadata, Projection};
use crate::animator::Animator;
use crate::broadcaster::ListenerKey;
use crate::component::{Component, ComponentBase};
use crate::dataset::Dataset;
use crate::drawer::{DrawStep, Drawer, DrawerKind};
use crate::error::{ChartError, Result};
use crate::extent::as_number;
use crate::geom::Point;
use crate::interaction::hover::HoverData;
use crate::scale::Scale;
use crate::svg::NodeId;

pub use area::AreaPlot;
pub use bar::{BarAlignment, BarOrientation, BarPlot, HoverMode};
pub use clustered::ClusteredBarPlot;
pub use grid::GridPlot;
pub use line::LinePlot;
pub use pie::PiePlot;
pub use rectangle::RectanglePlot;
pub use scatter::ScatterPlot;
pub use stacked::{StackedAreaPlot, StackedBarPlot, StackOffsets, stack_offsets};
pub use xy::{AutoAdjust, XyPlot};

/// Records found by a plot query, with their pixel positions and elements.
pub type PlotData = HoverData;

/// Animator used for the final draw step.
pub const MAIN_ANIMATOR: &str = "main";
/// Animator used for the step that resets elements before they animate in.
pub const RESET_ANIMATOR: &str = "reset";
/// Attribute under which stacked plots register their whole-stack extent.
pub const STACK_EXTENT_ATTR: &str = "__stack_extent";

/// A dataset bound into a plot, with its drawer and plot metadata.
#[derive(Debug)]
pub struct PlotEntry {
    pub dataset: Dataset,
    pub drawer: Drawer,
    pub metadata: PlotMetadata,
}

/// One record as a plot sees it.
#[derive(Debug, Clone, Copy)]
pub struct DatumRef<'a> {
    pub key: &'a str,
    pub datum: &'a Value,
    pub index: usize,
    pub user: &'a Value,
    pub metadata: &'a PlotMetadata,
}

impl DatumRef<'_> {
    /// Evaluate the projector for `attribute`; `null` when there is none.
    pub fn eval(&self, attrs: &AttrToProjector, attribute: &str) -> Value {
        attrs
            .get(attribute)
            .map(|projector| projector(self.datum, self.index, self.user, self.metadata))
            .unwrap_or(Value::Null)
    }

    /// Evaluate a projector as a number; NaN when missing.
    pub fn number(&self, attrs: &AttrToProjector, attribute: &str) -> f64 {
        as_number(&self.eval(attrs, attribute))
    }
}

/// State shared by every plot type.
pub struct PlotCore {
    base: ComponentBase,
    kind: DrawerKind,
    entries: IndexMap<String, PlotEntry>,
    projections: IndexMap<String, Projection>,
    animators: IndexMap<String, Animator>,
    animated: bool,
    dirty: Rc<Cell<bool>>,
    next_key: usize,
    render_area: Option<NodeId>,
}

impl PlotCore {
    /// Core for a plot drawing with `kind`, carrying the `plot` class plus `class`.
    pub fn new(class: &str, kind: DrawerKind) -> Self {
        let mut base = ComponentBase::new(&format!("plot {class}"));
        base.set_clip_path_enabled(true);
        Self {
            base,
            kind,
            entries: IndexMap::new(),
            projections: IndexMap::new(),
            animators: IndexMap::new(),
            animated: false,
            dirty: Rc::new(Cell::new(false)),
            next_key: 0,
            render_area: None,
        }
    }

    pub fn base(&self) -> &ComponentBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    pub fn drawer_kind(&self) -> DrawerKind {
        self.kind
    }

    /// Datasets in render order.
    pub fn entries(&self) -> &IndexMap<String, PlotEntry> {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut IndexMap<String, PlotEntry> {
        &mut self.entries
    }

    pub fn projection(&self, attribute: &str) -> Option<&Projection> {
        self.projections.get(attribute)
    }

    pub fn projections(&self) -> &IndexMap<String, Projection> {
        &self.projections
    }

    /// Scale bound to an attribute.
    pub fn scale_of(&self, attribute: &str) -> Option<Scale> {
        self.projection(attribute)
            .and_then(|projection| projection.scale.clone())
    }

    /// Extent owner for one dataset of this plot.
    pub fn owner_key(&self, dataset_key: &str) -> String {
        format!("plot{}_{dataset_key}", self.base.id().get())
    }

    /// Extent owner for extents covering the whole plot.
    pub fn plot_owner(&self) -> String {
        format!("plot{}", self.base.id().get())
    }

    pub fn is_animated(&self) -> bool {
        self.animated
    }

    /// Animator for a step; the null animator while animation is off.
    pub fn animator(&self, name: &str) -> Animator {
        if !self.animated {
            return Animator::Null;
        }
        self.animators.get(name).copied().unwrap_or_default()
    }

    pub(crate) fn set_default_animator(&mut self, name: &str, animator: Animator) {
        self.animators.insert(name.to_string(), animator);
    }

    /// Projectors built from the registered projections.
    pub fn projectors(&self) -> AttrToProjector {
        self.projections
            .iter()
            .map(|(attribute, projection)| (attribute.clone(), projection.projector()))
            .collect()
    }

    /// Group the drawers draw into, once set up.
    pub fn render_area(&self) -> Option<NodeId> {
        self.render_area
    }

    fn listener_key(&self) -> ListenerKey {
        ListenerKey::Id(self.base.id().get())
    }

    fn uses_scale(&self, scale: &Scale) -> bool {
        self.projections
            .values()
            .any(|projection| projection.scale.as_ref().is_some_and(|s| s.same_as(scale)))
    }

    /// Register or replace a projection, moving scale listeners along.
    pub(crate) fn bind_projection(&mut self, projection: Projection) {
        let attribute = projection.attribute.clone();
        let scale = projection.scale.clone();
        let previous = self.projections.insert(attribute.clone(), projection);
        if let Some(old) = previous.and_then(|previous| previous.scale) {
            for key in self.entries.keys() {
                old.remove_extent(&self.owner_key(key), &attribute);
            }
            if !self.uses_scale(&old) {
                old.remove_extent(&self.plot_owner(), STACK_EXTENT_ATTR);
                old.broadcaster().deregister(&self.listener_key());
            }
        }
        if let Some(scale) = scale {
            let hook = self.base.hook().clone();
            scale
                .broadcaster()
                .register(self.listener_key(), move |_: &Scale| hook.request_render());
        }
        self.dirty.set(true);
    }

    fn next_dataset_key(&mut self) -> String {
        loop {
            let key = format!("_{}", self.next_key);
            self.next_key += 1;
            if !self.entries.contains_key(&key) {
                return key;
            }
        }
    }

    fn add_entry(&mut self, key: String, dataset: Dataset) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(ChartError::DuplicateDatasetKey(key));
        }
        let dirty = self.dirty.clone();
        let hook = self.base.hook().clone();
        dataset
            .broadcaster()
            .register(self.listener_key(), move |_: &Dataset| {
                dirty.set(true);
                if let Some(component) = hook.component()
                    && let Ok(mut plot) = component.try_borrow_mut()
                {
                    plot.data_changed();
                    return;
                }
                hook.request_render();
            });
        let mut drawer = Drawer::new(self.kind, key.clone());
        if let (Some(surface), Some(area)) = (self.base.surface(), self.render_area) {
            drawer.setup(&mut surface.document_mut(), area);
        }
        tracing::debug!(plot = self.base.id().get(), dataset = %key, "dataset added");
        self.entries.insert(
            key.clone(),
            PlotEntry {
                dataset,
                drawer,
                metadata: PlotMetadata::new(key),
            },
        );
        self.dirty.set(true);
        Ok(())
    }

    fn remove_entry(&mut self, key: &str) -> Result<Dataset> {
        let entry = self
            .entries
            .shift_remove(key)
            .ok_or_else(|| ChartError::UnknownDataset(key.to_string()))?;
        if !self.entries.values().any(|other| other.dataset.ptr_eq(&entry.dataset)) {
            entry.dataset.broadcaster().deregister(&self.listener_key());
        }
        let owner = self.owner_key(key);
        for projection in self.projections.values() {
            if let Some(scale) = &projection.scale {
                scale.remove_extent(&owner, &projection.attribute);
            }
        }
        let mut drawer = entry.drawer;
        if let Some(surface) = self.base.surface() {
            drawer.remove(&mut surface.document_mut());
        }
        tracing::debug!(plot = self.base.id().get(), dataset = %key, "dataset removed");
        self.dirty.set(true);
        Ok(entry.dataset)
    }

    fn reorder(&mut self, order: &[&str]) -> Result<()> {
        let current: Vec<String> = self.entries.keys().cloned().collect();
        let is_permutation = order.len() == current.len()
            && order.iter().all(|key| self.entries.contains_key(*key))
            && order
                .iter()
                .enumerate()
                .all(|(index, key)| !order[..index].contains(key));
        if !is_permutation {
            return Err(ChartError::InvalidDatasetOrder {
                expected: current,
                actual: order.iter().map(|key| key.to_string()).collect(),
            });
        }
        let mut reordered = IndexMap::with_capacity(order.len());
        for key in order {
            if let Some((key, entry)) = self.entries.shift_remove_entry(*key) {
                reordered.insert(key, entry);
            }
        }
        self.entries = reordered;
        if let (Some(surface), Some(area)) = (self.base.surface(), self.render_area) {
            let mut doc = surface.document_mut();
            for entry in self.entries.values() {
                entry.drawer.raise(&mut doc, area);
            }
        }
        self.dirty.set(true);
        Ok(())
    }

    /// Create the render area and the drawers' groups.
    pub(crate) fn setup(&mut self) {
        let (Some(surface), Some(content)) = (self.base.surface(), self.base.content()) else {
            return;
        };
        let mut doc = surface.document_mut();
        let area = doc.append(content, "g");
        doc.add_class(area, "render-area");
        for entry in self.entries.values_mut() {
            entry.drawer.setup(&mut doc, area);
        }
        self.render_area = Some(area);
    }

    /// Drop every listener and extent this plot registered.
    pub(crate) fn teardown(&mut self) {
        let key = self.listener_key();
        for entry in self.entries.values() {
            entry.dataset.broadcaster().deregister(&key);
        }
        for projection in self.projections.values() {
            let Some(scale) = &projection.scale else {
                continue;
            };
            scale.broadcaster().deregister(&key);
            for dataset_key in self.entries.keys() {
                scale.remove_extent(&self.owner_key(dataset_key), &projection.attribute);
            }
            scale.remove_extent(&self.plot_owner(), STACK_EXTENT_ATTR);
        }
    }
}

impl fmt::Debug for PlotCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotCore")
            .field("base", &self.base)
            .field("kind", &self.kind)
            .field("datasets", &self.entries.keys().collect::<Vec<_>>())
            .field("projections", &self.projections.keys().collect::<Vec<_>>())
            .field("animated", &self.animated)
            .finish()
    }
}

/// Register the extents of every scaled projection.
///
/// Attributes in `skip` have their per-dataset extents removed instead.
/// `include` filters which records contribute to an attribute.
pub fn update_projection_extents(
    core: &PlotCore,
    skip: &[&str],
    include: impl Fn(&str, &DatumRef<'_>) -> bool,
) {
    for (attribute, projection) in &core.projections {
        let Some(scale) = &projection.scale else {
            continue;
        };
        if skip.contains(&attribute.as_str()) {
            for key in core.entries.keys() {
                scale.remove_extent(&core.owner_key(key), attribute);
            }
            continue;
        }
        let projector = projection.accessor.projector();
        for (key, entry) in &core.entries {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            let values: Vec<Value> = data
                .iter()
                .enumerate()
                .filter(|(index, datum)| {
                    include(
                        attribute,
                        &DatumRef {
                            key,
                            datum,
                            index: *index,
                            user: &user,
                            metadata: &entry.metadata,
                        },
                    )
                })
                .map(|(index, datum)| projector(datum, index, &user, &entry.metadata))
                .collect();
            let owner = core.owner_key(key);
            match scale.extent_of(values) {
                Some(extent) => scale.update_extent(&owner, attribute, extent),
                None => scale.remove_extent(&owner, attribute),
            }
        }
    }
}

/// Operations shared by every plot type.
pub trait Plot: Component {
    fn core(&self) -> &PlotCore;

    fn core_mut(&mut self) -> &mut PlotCore;

    /// Projectors handed to the drawer, plot defaults resolved.
    fn generate_attr_to_projector(&self) -> AttrToProjector {
        self.core().projectors()
    }

    /// Ordered draw phases.
    fn generate_draw_steps(&self) -> Vec<DrawStep> {
        vec![DrawStep::new(
            self.generate_attr_to_projector(),
            self.core().animator(MAIN_ANIMATOR),
        )]
    }

    /// Register extents on every scale the plot projects through.
    fn update_extents(&mut self) {
        update_projection_extents(self.core(), &[], |_, _| true);
    }

    /// Runs before the drawers, after extents are current.
    fn before_draw(&mut self) {}

    /// Runs after the drawers with the projectors they used.
    fn after_draw(&mut self, _attrs: &AttrToProjector) {}

    /// Pixel position of a record.
    fn pixel_point(&self, attrs: &AttrToProjector, at: &DatumRef<'_>) -> Option<Point> {
        let point = Point::new(at.number(attrs, "x"), at.number(attrs, "y"));
        point.is_finite().then_some(point)
    }

    /// Distance from `query` to a record, compared as `(primary, secondary)`.
    fn distance(&self, query: Point, pixel: Point, _attrs: &AttrToProjector, _at: &DatumRef<'_>) -> (f64, f64) {
        (query.distance_squared(pixel), 0.0)
    }

    /// Check whether a pixel position lies inside the plot.
    fn is_visible_on_plot(&self, pixel: Point) -> bool {
        let (width, height) = (self.base().width(), self.base().height());
        pixel.x >= 0.0 && pixel.x <= width && pixel.y >= 0.0 && pixel.y <= height
    }

    /// Recompute extents now and schedule a render.
    fn refresh_extents(&mut self) {
        self.update_extents();
        self.core().dirty.set(false);
        self.base().hook().request_render();
    }

    /// Add a dataset under a generated key and return the key.
    fn add_dataset(&mut self, dataset: Dataset) -> String {
        let key = self.core_mut().next_dataset_key();
        if let Err(error) = self.core_mut().add_entry(key.clone(), dataset) {
            tracing::warn!(%error, "generated dataset key collided");
        }
        self.refresh_extents();
        key
    }

    /// Add a dataset under an explicit key.
    fn add_dataset_with_key(&mut self, key: impl Into<String>, dataset: Dataset) -> Result<()>
    where
        Self: Sized,
    {
        self.core_mut().add_entry(key.into(), dataset)?;
        self.refresh_extents();
        Ok(())
    }

    /// Remove a dataset by key.
    fn remove_dataset(&mut self, key: &str) -> Result<Dataset> {
        let dataset = self.core_mut().remove_entry(key)?;
        self.refresh_extents();
        Ok(dataset)
    }

    fn dataset(&self, key: &str) -> Option<Dataset> {
        self.core().entries.get(key).map(|entry| entry.dataset.clone())
    }

    /// Datasets in render order.
    fn datasets(&self) -> Vec<Dataset> {
        self.core()
            .entries
            .values()
            .map(|entry| entry.dataset.clone())
            .collect()
    }

    fn dataset_order(&self) -> Vec<String> {
        self.core().entries.keys().cloned().collect()
    }

    /// Reorder datasets; `order` must be a permutation of the current keys.
    fn set_dataset_order(&mut self, order: &[&str]) -> Result<()> {
        self.core_mut().reorder(order)?;
        self.refresh_extents();
        Ok(())
    }

    /// Bind a visual attribute to an accessor, optionally through a scale.
    fn attr(&mut self, attribute: &str, accessor: impl Into<Accessor>, scale: Option<Scale>)
    where
        Self: Sized,
    {
        self.core_mut()
            .bind_projection(Projection::new(attribute, accessor.into(), scale));
        self.refresh_extents();
    }

    fn is_animated(&self) -> bool {
        self.core().animated
    }

    /// Turn animation on or off.
    fn animate(&mut self, animated: bool) {
        self.core_mut().animated = animated;
        self.base().hook().request_render();
    }

    /// Configured animator for a step, regardless of whether animation is on.
    fn animator(&self, name: &str) -> Option<Animator> {
        self.core().animators.get(name).copied()
    }

    fn set_animator(&mut self, name: &str, animator: Animator) {
        self.core_mut().set_default_animator(name, animator);
    }

    /// Every drawn record of the given datasets, all datasets when `None`.
    fn all_plot_data(&self, keys: Option<&[&str]>) -> PlotData {
        let attrs = self.generate_attr_to_projector();
        let mut found = PlotData::default();
        for (key, entry) in &self.core().entries {
            if keys.is_some_and(|keys| !keys.contains(&key.as_str())) {
                continue;
            }
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            for (index, datum) in data.iter().enumerate() {
                let at = DatumRef {
                    key,
                    datum,
                    index,
                    user: &user,
                    metadata: &entry.metadata,
                };
                let Some(pixel) = self.pixel_point(&attrs, &at) else {
                    continue;
                };
                found.data.push(datum.clone());
                found.pixel_positions.push(pixel);
                found.origins.push((key.clone(), index));
                if let Some(node) = entry.drawer.selection(index) {
                    found.selection.push(node);
                }
            }
        }
        found
    }

    /// The visible record nearest to `query` by this plot's metric.
    fn closest_plot_data(&self, query: Point) -> PlotData {
        let attrs = self.generate_attr_to_projector();
        let mut best: Option<((f64, f64), Value, Point, Option<NodeId>, (String, usize))> = None;
        for (key, entry) in &self.core().entries {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            for (index, datum) in data.iter().enumerate() {
                let at = DatumRef {
                    key,
                    datum,
                    index,
                    user: &user,
                    metadata: &entry.metadata,
                };
                let Some(pixel) = self.pixel_point(&attrs, &at) else {
                    continue;
                };
                if !self.is_visible_on_plot(pixel) {
                    continue;
                }
                let distance = self.distance(query, pixel, &attrs, &at);
                let closer = best.as_ref().is_none_or(|(current, ..)| {
                    distance.0 < current.0 || (distance.0 == current.0 && distance.1 < current.1)
                });
                if closer {
                    best = Some((
                        distance,
                        datum.clone(),
                        pixel,
                        entry.drawer.selection(index),
                        (key.clone(), index),
                    ));
                }
            }
        }
        let mut found = PlotData::default();
        if let Some((_, datum, pixel, node, origin)) = best {
            found.data.push(datum);
            found.pixel_positions.push(pixel);
            found.selection.extend(node);
            found.origins.push(origin);
        }
        found
    }
}

/// Draw every dataset of a plot with its current draw steps.
pub fn render_plot<P: Plot + ?Sized>(plot: &mut P) {
    if plot.core().dirty.replace(false) {
        plot.update_extents();
    }
    plot.before_draw();
    let attrs = plot.generate_attr_to_projector();
    let steps = plot.generate_draw_steps();
    let Some(surface) = plot.base().surface().cloned() else {
        return;
    };
    {
        let mut doc = surface.document_mut();
        let core = plot.core_mut();
        let id = core.base.id().get();
        for (key, entry) in core.entries.iter_mut() {
            let data = entry.dataset.data();
            let user = entry.dataset.metadata();
            let total = entry
                .drawer
                .draw(&mut doc, &data, &steps, &user, &entry.metadata);
            tracing::trace!(plot = id, dataset = %key, records = data.len(), total_ms = total, "drawn");
        }
    }
    plot.after_draw(&attrs);
}
