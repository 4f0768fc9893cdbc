//! Drawers turn projected records into SVG elements.
//!
//! A draw runs a sequence of [`DrawStep`]s. Every step resolves its
//! projectors for each record, and its [`Animator`] decides whether the new
//! values are set outright or reached through SMIL transitions that start
//! from the values the previous step left behind.

pub mod path;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::Value;

use crate::accessor::{AttrToProjector, PlotMetadata};
use crate::animator::{Animator, Schedule};
use crate::extent::as_number;
use crate::geom::Point;
use crate::svg::{NodeId, SvgDocument, format_number};
use crate::symbol::SymbolKind;

pub use path::{arc_path, area_path, line_path};

/// One phase of a draw.
#[derive(Clone)]
pub struct DrawStep {
    /// Attribute projectors evaluated for each record.
    pub attr_to_projector: AttrToProjector,
    /// How the element reaches the projected values.
    pub animator: Animator,
}

impl DrawStep {
    pub fn new(attr_to_projector: AttrToProjector, animator: Animator) -> Self {
        Self {
            attr_to_projector,
            animator,
        }
    }
}

impl fmt::Debug for DrawStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawStep")
            .field("attributes", &self.attr_to_projector.keys().collect::<Vec<_>>())
            .field("animator", &self.animator)
            .finish()
    }
}

/// Shape family a drawer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerKind {
    /// One stroked path for the whole dataset.
    Line,
    /// A filled path plus its top line.
    Area,
    /// One `<rect>` per record.
    Rect,
    /// One annular sector per record.
    Arc,
    /// One marker per record.
    Symbol,
}

impl DrawerKind {
    /// Whether every record gets its own element.
    pub fn is_per_datum(self) -> bool {
        matches!(self, Self::Rect | Self::Arc | Self::Symbol)
    }

    fn element_tag(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            _ => "path",
        }
    }

    fn element_class(self) -> Option<&'static str> {
        match self {
            Self::Arc => Some("arc"),
            Self::Symbol => Some("symbol"),
            _ => None,
        }
    }
}

/// Attribute text, or `None` when the attribute should be absent.
fn attr_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(number) => number.as_f64().map(format_number),
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

fn finite(attrs: &IndexMap<String, Value>, name: &str) -> Option<f64> {
    attrs.get(name).map(as_number).filter(|value| value.is_finite())
}

fn evaluate(
    projectors: &AttrToProjector,
    datum: &Value,
    index: usize,
    user: &Value,
    meta: &PlotMetadata,
) -> IndexMap<String, Value> {
    projectors
        .iter()
        .map(|(name, projector)| (name.clone(), projector(datum, index, user, meta)))
        .collect()
}

/// Draws one dataset of a plot into its own group.
#[derive(Debug)]
pub struct Drawer {
    kind: DrawerKind,
    key: String,
    render_area: Option<NodeId>,
    elements: Vec<NodeId>,
}

impl Drawer {
    /// Drawer for the dataset stored under `key`.
    pub fn new(kind: DrawerKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            render_area: None,
            elements: Vec::new(),
        }
    }

    pub fn kind(&self) -> DrawerKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Group holding this drawer's elements.
    pub fn render_area(&self) -> Option<NodeId> {
        self.render_area
    }

    /// Elements drawn so far, in record order for per-record drawers.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    /// Element representing record `index`.
    pub fn selection(&self, index: usize) -> Option<NodeId> {
        if self.kind.is_per_datum() {
            self.elements.get(index).copied()
        } else {
            self.elements.first().copied()
        }
    }

    /// Create the drawer's group under `parent`.
    pub fn setup(&mut self, doc: &mut SvgDocument, parent: NodeId) {
        if let Some(area) = self.render_area.filter(|area| doc.contains(*area)) {
            doc.append_child(parent, area);
            return;
        }
        self.render_area = Some(doc.append(parent, "g"));
        self.elements.clear();
    }

    /// Move the group to the end of `parent`, above its siblings.
    pub fn raise(&self, doc: &mut SvgDocument, parent: NodeId) {
        if let Some(area) = self.render_area {
            doc.append_child(parent, area);
        }
    }

    /// Drop the group and everything drawn into it.
    pub fn remove(&mut self, doc: &mut SvgDocument) {
        if let Some(area) = self.render_area.take() {
            doc.remove(area);
        }
        self.elements.clear();
    }

    /// Run the draw steps over `data`; returns the total animation time.
    pub fn draw(
        &mut self,
        doc: &mut SvgDocument,
        data: &[Value],
        steps: &[DrawStep],
        user: &Value,
        meta: &PlotMetadata,
    ) -> f64 {
        let Some(area) = self.render_area else {
            return 0.0;
        };
        self.enter(doc, area, data.len());
        for element in &self.elements {
            clear_transitions(doc, *element);
        }
        let iterations = if self.kind.is_per_datum() { data.len() } else { 1 };
        let mut offset = 0.0;
        for step in steps {
            let targets = self.resolve(&step.attr_to_projector, data, user, meta);
            for (index, (node, attrs)) in targets.iter().enumerate() {
                let schedule_index = if self.kind.is_per_datum() { index } else { 0 };
                apply(doc, *node, attrs, &step.animator, schedule_index, iterations, offset);
            }
            offset += step.animator.total_time(iterations);
        }
        offset
    }

    fn enter(&mut self, doc: &mut SvgDocument, area: NodeId, count: usize) {
        self.elements.retain(|element| doc.contains(*element));
        let wanted = match self.kind {
            DrawerKind::Line => 1,
            DrawerKind::Area => 2,
            _ => count,
        };
        while self.elements.len() > wanted {
            if let Some(element) = self.elements.pop() {
                doc.remove(element);
            }
        }
        while self.elements.len() < wanted {
            let element = doc.append(area, self.kind.element_tag());
            let class = match (self.kind, self.elements.len()) {
                (DrawerKind::Area, 0) => Some("area"),
                (DrawerKind::Line, _) | (DrawerKind::Area, _) => Some("line"),
                (kind, _) => kind.element_class(),
            };
            if let Some(class) = class {
                doc.add_class(element, class);
            }
            self.elements.push(element);
        }
    }

    fn resolve(
        &self,
        projectors: &AttrToProjector,
        data: &[Value],
        user: &Value,
        meta: &PlotMetadata,
    ) -> Vec<(NodeId, IndexMap<String, Value>)> {
        match self.kind {
            DrawerKind::Rect | DrawerKind::Arc | DrawerKind::Symbol => data
                .iter()
                .enumerate()
                .zip(&self.elements)
                .map(|((index, datum), node)| {
                    let attrs = evaluate(projectors, datum, index, user, meta);
                    (*node, self.shape_attrs(attrs))
                })
                .collect(),
            DrawerKind::Line | DrawerKind::Area => self.resolve_path(projectors, data, user, meta),
        }
    }

    fn shape_attrs(&self, mut attrs: IndexMap<String, Value>) -> IndexMap<String, Value> {
        let visible = match self.kind {
            DrawerKind::Rect => ["x", "y", "width", "height"]
                .iter()
                .all(|name| finite(&attrs, name).is_some()),
            DrawerKind::Symbol => {
                let x = attrs.shift_remove("x").map_or(f64::NAN, |v| as_number(&v));
                let y = attrs.shift_remove("y").map_or(f64::NAN, |v| as_number(&v));
                let size = attrs.shift_remove("size").map_or(f64::NAN, |v| as_number(&v));
                let symbol = attrs
                    .shift_remove("symbol")
                    .and_then(|value| value.as_str().and_then(|name| SymbolKind::from_str(name).ok()))
                    .unwrap_or_default();
                let visible = x.is_finite() && y.is_finite() && size.is_finite();
                if visible {
                    attrs.insert(
                        "transform".to_string(),
                        Value::String(format!("translate({},{})", format_number(x), format_number(y))),
                    );
                    attrs.insert("d".to_string(), Value::String(symbol.path(size)));
                }
                visible
            }
            DrawerKind::Arc => {
                let mut take = |name: &str| attrs.shift_remove(name).map_or(f64::NAN, |v| as_number(&v));
                let inner = take("inner-radius");
                let outer = take("outer-radius");
                let start = take("start-angle");
                let end = take("end-angle");
                let inner = if inner.is_finite() { inner } else { 0.0 };
                let visible = [outer, start, end].iter().all(|value| value.is_finite());
                if visible {
                    attrs.insert("d".to_string(), Value::String(arc_path(inner, outer, start, end)));
                }
                visible
            }
            DrawerKind::Line | DrawerKind::Area => true,
        };
        let display = if visible { Value::Null } else { Value::String("none".into()) };
        attrs.insert("display".to_string(), display);
        attrs
    }

    fn resolve_path(
        &self,
        projectors: &AttrToProjector,
        data: &[Value],
        user: &Value,
        meta: &PlotMetadata,
    ) -> Vec<(NodeId, IndexMap<String, Value>)> {
        let mut line_points = Vec::with_capacity(data.len());
        let mut area_points = Vec::with_capacity(data.len());
        for (index, datum) in data.iter().enumerate() {
            let attrs = evaluate(projectors, datum, index, user, meta);
            let defined = attrs.get("defined").is_none_or(|value| value.as_bool() != Some(false));
            let top = match (finite(&attrs, "x"), finite(&attrs, "y")) {
                (Some(x), Some(y)) if defined => Some(Point::new(x, y)),
                _ => None,
            };
            line_points.push(top);
            area_points.push(top.and_then(|top| finite(&attrs, "y0").map(|y0| (top, y0))));
        }

        // Whole-dataset attributes come from the first record.
        let shared: IndexMap<String, Value> = match data.first() {
            Some(first) => evaluate(projectors, first, 0, user, meta)
                .into_iter()
                .filter(|(name, _)| !matches!(name.as_str(), "x" | "y" | "y0" | "defined"))
                .collect(),
            None => IndexMap::new(),
        };
        let path_value = |d: String| if d.is_empty() { Value::Null } else { Value::String(d) };

        let mut line_attrs: IndexMap<String, Value> = IndexMap::new();
        line_attrs.insert("d".to_string(), path_value(line_path(&line_points)));
        line_attrs.insert("fill".to_string(), Value::String("none".into()));
        match self.kind {
            DrawerKind::Area => {
                let mut fill_attrs: IndexMap<String, Value> = IndexMap::new();
                fill_attrs.insert("d".to_string(), path_value(area_path(&area_points)));
                fill_attrs.insert("stroke".to_string(), Value::String("none".into()));
                for (name, value) in shared {
                    if name.starts_with("stroke") {
                        line_attrs.insert(name, value);
                    } else {
                        fill_attrs.insert(name, value);
                    }
                }
                line_attrs.insert("fill".to_string(), Value::String("none".into()));
                let mut targets = Vec::new();
                if let Some(area) = self.elements.first() {
                    targets.push((*area, fill_attrs));
                }
                if let Some(line) = self.elements.get(1) {
                    targets.push((*line, line_attrs));
                }
                targets
            }
            _ => {
                for (name, value) in shared {
                    line_attrs.insert(name, value);
                }
                self.elements
                    .first()
                    .map(|line| vec![(*line, line_attrs)])
                    .unwrap_or_default()
            }
        }
    }
}

fn clear_transitions(doc: &mut SvgDocument, node: NodeId) {
    let stale: Vec<NodeId> = doc
        .children(node)
        .iter()
        .copied()
        .filter(|child| matches!(doc.tag(*child), Some("animate" | "set")))
        .collect();
    for child in stale {
        doc.remove(child);
    }
}

fn apply(
    doc: &mut SvgDocument,
    node: NodeId,
    attrs: &IndexMap<String, Value>,
    animator: &Animator,
    index: usize,
    iterations: usize,
    offset: f64,
) {
    let start = animator.start_values(attrs);
    let schedule = animator.schedule(index, iterations);
    for (name, value) in attrs {
        let Some(to) = attr_string(value) else {
            doc.remove_attr(node, name);
            continue;
        };
        if let Some(schedule) = schedule
            && !matches!(name.as_str(), "transform" | "display" | "class")
        {
            let from = start
                .get(name)
                .and_then(attr_string)
                .or_else(|| doc.attr(node, name).map(str::to_string));
            if let Some(from) = from
                && from != to
            {
                transition(doc, node, name, &from, &to, schedule, offset);
            }
        }
        doc.set_attr(node, name, to);
    }
}

fn transition(
    doc: &mut SvgDocument,
    node: NodeId,
    name: &str,
    from: &str,
    to: &str,
    schedule: Schedule,
    offset: f64,
) {
    let begin = offset + schedule.begin_ms;
    if begin > 0.0 {
        let hold = doc.append(node, "set");
        doc.set_attr(hold, "attributeName", name);
        doc.set_attr(hold, "to", from);
        doc.set_attr(hold, "begin", "0ms");
        doc.set_attr(hold, "fill", "freeze");
    }
    let animate = doc.append(node, "animate");
    doc.set_attr(animate, "attributeName", name);
    doc.set_attr(animate, "from", from);
    doc.set_attr(animate, "to", to);
    doc.set_attr(animate, "begin", format!("{}ms", format_number(begin)));
    doc.set_attr(animate, "dur", format!("{}ms", format_number(schedule.duration_ms)));
    doc.set_attr(animate, "fill", "freeze");
    doc.set_attr(animate, "calcMode", "spline");
    doc.set_attr(animate, "keyTimes", "0;1");
    doc.set_attr(animate, "keySplines", schedule.easing.key_splines());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use serde_json::json;

    use crate::accessor::{Accessor, Projector};
    use crate::animator::Timing;

    fn projectors(pairs: &[(&str, Projector)]) -> AttrToProjector {
        pairs
            .iter()
            .map(|(name, projector)| (name.to_string(), projector.clone()))
            .collect()
    }

    fn doc_with_area(drawer: &mut Drawer) -> SvgDocument {
        let mut doc = SvgDocument::new(100.0, 100.0);
        let root = doc.root();
        drawer.setup(&mut doc, root);
        doc
    }

    #[test]
    fn rect_drawer_tracks_record_count() {
        let mut drawer = Drawer::new(DrawerKind::Rect, "bars");
        let mut doc = doc_with_area(&mut drawer);
        let step = DrawStep::new(
            projectors(&[
                ("x", Accessor::key("x").projector()),
                ("y", Accessor::constant(0.0).projector()),
                ("width", Accessor::constant(5.0).projector()),
                ("height", Accessor::key("h").projector()),
            ]),
            Animator::Null,
        );
        let data = vec![json!({"x": 0, "h": 10}), json!({"x": 10, "h": null}), json!({"x": 20, "h": 4})];
        drawer.draw(&mut doc, &data, &[step.clone()], &Value::Null, &PlotMetadata::default());
        assert_eq!(drawer.elements().len(), 3);
        let hidden = drawer.selection(1).expect("second bar");
        assert_eq!(doc.attr(hidden, "display"), Some("none"));
        assert_eq!(doc.attr(drawer.selection(0).expect("bar"), "display"), None);

        drawer.draw(&mut doc, &data[..1], &[step], &Value::Null, &PlotMetadata::default());
        assert_eq!(drawer.elements().len(), 1);
        assert!(!doc.contains(hidden));
    }

    #[test]
    fn animated_steps_emit_transitions_from_previous_values() {
        let mut drawer = Drawer::new(DrawerKind::Rect, "bars");
        let mut doc = doc_with_area(&mut drawer);
        let base: AttrToProjector = projectors(&[
            ("x", Accessor::constant(0.0).projector()),
            ("width", Accessor::constant(5.0).projector()),
            ("y", Accessor::key("y").projector()),
            ("height", Accessor::key("h").projector()),
        ]);
        let mut reset = base.clone();
        reset.insert("y".into(), Accessor::constant(50.0).projector());
        reset.insert("height".into(), Accessor::constant(0.0).projector());
        let steps = [
            DrawStep::new(reset, Animator::Null),
            DrawStep::new(base, Animator::Base(Timing::default().with_duration(200.0))),
        ];
        let data = vec![json!({"y": 10, "h": 40}), json!({"y": 30, "h": 20})];
        let total = drawer.draw(&mut doc, &data, &steps, &Value::Null, &PlotMetadata::default());
        assert!((total - (2.0 * 15.0 + 200.0)).abs() < 1e-9);

        let second = drawer.selection(1).expect("bar");
        assert_eq!(doc.attr(second, "height"), Some("20"));
        let markup = doc.node_to_string(second);
        assert!(markup.contains("<animate attributeName=\"height\" from=\"0\" to=\"20\" begin=\"15ms\" dur=\"200ms\""));
        assert!(markup.contains("<set attributeName=\"height\" to=\"0\""));

        // Redrawing the same values leaves no transitions behind.
        let steady = [DrawStep::new(steps[1].attr_to_projector.clone(), steps[1].animator)];
        drawer.draw(&mut doc, &data, &steady, &Value::Null, &PlotMetadata::default());
        assert!(!doc.node_to_string(second).contains("<animate"));
    }

    #[test]
    fn line_drawer_uses_first_record_for_style() {
        let mut drawer = Drawer::new(DrawerKind::Line, "series");
        let mut doc = doc_with_area(&mut drawer);
        let stroke: Projector = Rc::new(|datum: &Value, _, _, _| datum["color"].clone());
        let step = DrawStep::new(
            projectors(&[
                ("x", Accessor::key("x").projector()),
                ("y", Accessor::key("y").projector()),
                ("stroke", stroke),
            ]),
            Animator::Null,
        );
        let data = vec![
            json!({"x": 0, "y": 0, "color": "red"}),
            json!({"x": 1, "y": "n/a", "color": "blue"}),
            json!({"x": 2, "y": 2, "color": "blue"}),
        ];
        drawer.draw(&mut doc, &data, &[step], &Value::Null, &PlotMetadata::default());
        let line = drawer.selection(2).expect("line");
        assert_eq!(doc.attr(line, "d"), Some("M0,0M2,2"));
        assert_eq!(doc.attr(line, "stroke"), Some("red"));
        assert_eq!(doc.attr(line, "fill"), Some("none"));
    }

    #[test]
    fn area_drawer_splits_fill_and_stroke() {
        let mut drawer = Drawer::new(DrawerKind::Area, "series");
        let mut doc = doc_with_area(&mut drawer);
        let step = DrawStep::new(
            projectors(&[
                ("x", Accessor::key("x").projector()),
                ("y", Accessor::key("y").projector()),
                ("y0", Accessor::constant(10.0).projector()),
                ("fill", Accessor::constant("green").projector()),
                ("stroke", Accessor::constant("black").projector()),
            ]),
            Animator::Null,
        );
        let data = vec![json!({"x": 0, "y": 2}), json!({"x": 4, "y": 6})];
        drawer.draw(&mut doc, &data, &[step], &Value::Null, &PlotMetadata::default());
        let (area, line) = (drawer.elements()[0], drawer.elements()[1]);
        assert!(doc.has_class(area, "area"));
        assert_eq!(doc.attr(area, "d"), Some("M0,2L4,6L4,10L0,10Z"));
        assert_eq!(doc.attr(area, "fill"), Some("green"));
        assert_eq!(doc.attr(area, "stroke"), Some("none"));
        assert_eq!(doc.attr(line, "stroke"), Some("black"));
        assert_eq!(doc.attr(line, "d"), Some("M0,2L4,6"));
    }

    #[test]
    fn symbol_drawer_places_markers() {
        let mut drawer = Drawer::new(DrawerKind::Symbol, "points");
        let mut doc = doc_with_area(&mut drawer);
        let step = DrawStep::new(
            projectors(&[
                ("x", Accessor::key("x").projector()),
                ("y", Accessor::key("y").projector()),
                ("size", Accessor::constant(10.0).projector()),
                ("symbol", Accessor::constant("square").projector()),
            ]),
            Animator::Null,
        );
        drawer.draw(&mut doc, &[json!({"x": 3, "y": 4})], &[step], &Value::Null, &PlotMetadata::default());
        let marker = drawer.selection(0).expect("marker");
        assert_eq!(doc.attr(marker, "transform"), Some("translate(3,4)"));
        assert_eq!(doc.attr(marker, "d"), Some("M-5,-5L5,-5 5,5 -5,5Z"));
        assert!(doc.has_class(marker, "symbol"));
    }
}
