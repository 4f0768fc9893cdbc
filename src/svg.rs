//! Retained SVG element tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Detached nodes keep
//! their subtree so a component can be re-anchored later; removed nodes are
//! freed for good.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::geom::Rect;
use crate::text::{DEFAULT_FONT_SIZE, TextMeasurer};

/// Handle to a node in an [`SvgDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct SvgNode {
    tag: String,
    attrs: IndexMap<String, String>,
    classes: Vec<String>,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl SvgNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            classes: Vec::new(),
            text: None,
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Arena-backed SVG document.
#[derive(Debug, Clone)]
pub struct SvgDocument {
    nodes: Vec<Option<SvgNode>>,
    root: NodeId,
}

impl SvgDocument {
    /// Create a document with an `<svg>` root of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        let mut document = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = document.create("svg");
        document.root = root;
        document.set_attr(root, "xmlns", "http://www.w3.org/2000/svg");
        document.set_size(width, height);
        document
    }

    /// Root `<svg>` node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Update the root size attributes.
    pub fn set_size(&mut self, width: f64, height: f64) {
        let root = self.root;
        self.set_number(root, "width", width);
        self.set_number(root, "height", height);
    }

    /// Create a detached element.
    pub fn create(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Some(SvgNode::new(tag)));
        NodeId(self.nodes.len() - 1)
    }

    /// Create an element and append it to `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create(tag);
        self.append_child(parent, node);
        node
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let Some(len) = self.node(parent).map(|node| node.children.len()) else {
            return;
        };
        self.insert_child(parent, len, child);
    }

    /// Move `child` to position `index` among `parent`'s children.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Unlink a node from its parent, keeping its subtree.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|child| *child != node);
        }
        if let Some(node) = self.node_mut(node) {
            node.parent = None;
        }
    }

    /// Free a node and its whole subtree.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(freed) = self.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(freed.children);
            }
        }
    }

    /// Free every child of a node.
    pub fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node).to_vec() {
            self.remove(child);
        }
    }

    /// Check whether a node is still alive.
    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    /// Parent of a node.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    /// Children of a node in document order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Tag name of a node.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    /// Set an attribute.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.node_mut(node) {
            node.attrs.insert(name.to_string(), value.into());
        }
    }

    /// Set a numeric attribute, formatted compactly.
    pub fn set_number(&mut self, node: NodeId, name: &str, value: f64) {
        self.set_attr(node, name, format_number(value));
    }

    /// Remove an attribute.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(node) = self.node_mut(node) {
            node.attrs.shift_remove(name);
        }
    }

    /// Read an attribute.
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    /// Read an attribute as a number.
    pub fn number_attr(&self, node: NodeId, name: &str) -> Option<f64> {
        self.attr(node, name)?.trim().parse().ok()
    }

    /// Add a class if not already present.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(node) = self.node_mut(node)
            && !node.classes.iter().any(|c| c == class)
        {
            node.classes.push(class.to_string());
        }
    }

    /// Remove a class.
    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(node) = self.node_mut(node) {
            node.classes.retain(|c| c != class);
        }
    }

    /// Add or remove a class.
    pub fn toggle_class(&mut self, node: NodeId, class: &str, enabled: bool) {
        if enabled {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Check whether a node carries a class.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    /// Set the text content.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        if let Some(node) = self.node_mut(node) {
            node.text = Some(text.into());
        }
    }

    /// Text content.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node).and_then(|n| n.text.as_deref())
    }

    /// Direct children carrying a class.
    pub fn children_with_class(&self, node: NodeId, class: &str) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|child| self.has_class(*child, class))
            .collect()
    }

    /// Descendants matching a simple selector: `tag`, `.class`, or `tag.class`.
    pub fn select_all(&self, node: NodeId, selector: &str) -> Vec<NodeId> {
        let (tag, class) = match selector.split_once('.') {
            Some((tag, class)) => (tag, Some(class)),
            None => (selector, None),
        };
        let mut matches = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            let tag_ok = tag.is_empty() || self.tag(next) == Some(tag);
            let class_ok = class.is_none_or(|class| self.has_class(next, class));
            if tag_ok && class_ok {
                matches.push(next);
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        matches
    }

    /// First descendant matching a simple selector.
    pub fn select(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        self.select_all(node, selector).into_iter().next()
    }

    /// Translation of a node's `transform="translate(x,y)"`, if any.
    pub fn translation(&self, node: NodeId) -> (f64, f64) {
        self.attr(node, "transform")
            .and_then(parse_translate)
            .unwrap_or((0.0, 0.0))
    }

    /// Bounding box in the node's parent coordinates.
    ///
    /// Paths are bounded by their vertices; groups by their children.
    pub fn bounding_box(&self, node: NodeId, measurer: &dyn TextMeasurer) -> Option<Rect> {
        let data = self.node(node)?;
        if data.attrs.get("display").is_some_and(|d| d == "none") {
            return None;
        }
        let num = |name: &str| self.number_attr(node, name).unwrap_or(0.0);
        let local = match data.tag.as_str() {
            "rect" => Some(Rect::new(num("x"), num("y"), num("width"), num("height"))),
            "circle" => {
                let r = num("r");
                Some(Rect::new(num("cx") - r, num("cy") - r, 2.0 * r, 2.0 * r))
            }
            "line" => Some(Rect::from_corners(
                crate::geom::Point::new(num("x1"), num("y1")),
                crate::geom::Point::new(num("x2"), num("y2")),
            )),
            "text" => {
                let text = data.text.as_deref().unwrap_or_default();
                let size = self.number_attr(node, "font-size").unwrap_or(DEFAULT_FONT_SIZE);
                let (width, height) = measurer.measure(text, size);
                let x = match self.attr(node, "text-anchor") {
                    Some("middle") => num("x") - width / 2.0,
                    Some("end") => num("x") - width,
                    _ => num("x"),
                };
                let y = match self.attr(node, "dominant-baseline") {
                    Some("central") | Some("middle") => num("y") - height / 2.0,
                    Some("hanging") => num("y"),
                    _ => num("y") - height,
                };
                Some(Rect::new(x, y, width, height))
            }
            "path" => self.attr(node, "d").and_then(path_bounds),
            _ => data
                .children
                .iter()
                .filter_map(|child| self.bounding_box(*child, measurer))
                .reduce(|a, b| a.union(&b)),
        }?;
        let (dx, dy) = self.translation(node);
        Some(local.translated(dx, dy))
    }

    /// Serialize the whole document.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root, &mut out);
        out
    }

    /// Serialize one subtree.
    pub fn node_to_string(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        out.push('<');
        out.push_str(&node.tag);
        if !node.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&node.classes.join(" ")));
        }
        for (name, value) in &node.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape(text));
        }
        for child in &node.children {
            self.write_node(*child, out);
        }
        let _ = write!(out, "</{}>", node.tag);
    }

    fn node(&self, node: NodeId) -> Option<&SvgNode> {
        self.nodes.get(node.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut SvgNode> {
        self.nodes.get_mut(node.0).and_then(Option::as_mut)
    }
}

/// Format a number for an attribute value.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == rounded.trunc() && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn parse_translate(transform: &str) -> Option<(f64, f64)> {
    let start = transform.find("translate(")? + "translate(".len();
    let end = start + transform[start..].find(')')?;
    let mut parts = transform[start..end]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>());
    let x = parts.next()?.ok()?;
    let y = match parts.next() {
        Some(value) => value.ok()?,
        None => 0.0,
    };
    Some((x, y))
}

fn path_bounds(d: &str) -> Option<Rect> {
    let mut numbers: Vec<f64> = Vec::new();
    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut command = ' ';
    let flush = |command: char, numbers: &mut Vec<f64>, points: &mut Vec<(f64, f64)>| {
        match command {
            'M' | 'L' => points.extend(numbers.chunks_exact(2).map(|pair| (pair[0], pair[1]))),
            'A' => points.extend(numbers.chunks_exact(7).map(|arc| (arc[5], arc[6]))),
            _ => {}
        }
        numbers.clear();
    };
    let mut token = String::new();
    for ch in d.chars().chain(std::iter::once(' ')) {
        let is_number_char = ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == '-';
        if is_number_char && !(ch == '-' && !token.is_empty() && !token.ends_with('e')) {
            token.push(ch);
            continue;
        }
        if !token.is_empty() {
            numbers.push(token.parse().ok()?);
            token.clear();
        }
        if ch == '-' {
            token.push(ch);
        } else if ch.is_ascii_alphabetic() {
            flush(command, &mut numbers, &mut points);
            command = ch;
        }
    }
    flush(command, &mut numbers, &mut points);
    let (first, rest) = points.split_first()?;
    let mut rect = Rect::new(first.0, first.1, 0.0, 0.0);
    for point in rest {
        rect = rect.union(&Rect::new(point.0, point.1, 0.0, 0.0));
    }
    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::MonospaceMeasurer;

    #[test]
    fn append_detach_and_remove() {
        let mut doc = SvgDocument::new(100.0, 50.0);
        let root = doc.root();
        let group = doc.append(root, "g");
        let rect = doc.append(group, "rect");
        doc.detach(group);
        assert!(doc.children(root).is_empty());
        assert_eq!(doc.children(group), &[rect]);
        doc.append_child(root, group);
        doc.remove(group);
        assert!(!doc.contains(rect));
        assert!(doc.children(root).is_empty());
    }

    #[test]
    fn serializes_with_escaping() {
        let mut doc = SvgDocument::new(10.0, 20.0);
        let root = doc.root();
        let text = doc.append(root, "text");
        doc.add_class(text, "label");
        doc.set_number(text, "x", 1.5);
        doc.set_text(text, "a < b");
        assert_eq!(
            doc.to_svg_string(),
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"10\" height=\"20\">\
             <text class=\"label\" x=\"1.5\">a &lt; b</text></svg>"
        );
    }

    #[test]
    fn selects_by_tag_and_class() {
        let mut doc = SvgDocument::new(10.0, 10.0);
        let root = doc.root();
        let group = doc.append(root, "g");
        let a = doc.append(group, "rect");
        doc.add_class(a, "bar");
        let b = doc.append(root, "rect");
        assert_eq!(doc.select_all(root, "rect"), vec![a, b]);
        assert_eq!(doc.select_all(root, ".bar"), vec![a]);
        assert_eq!(doc.select(root, "rect.bar"), Some(a));
    }

    #[test]
    fn bounding_boxes_follow_translation() {
        let mut doc = SvgDocument::new(100.0, 100.0);
        let root = doc.root();
        let group = doc.append(root, "g");
        doc.set_attr(group, "transform", "translate(10,20)");
        let rect = doc.append(group, "rect");
        doc.set_number(rect, "width", 5.0);
        doc.set_number(rect, "height", 6.0);
        let path = doc.append(group, "path");
        doc.set_attr(path, "d", "M-4,2L30,-8");
        let measurer = MonospaceMeasurer::default();
        assert_eq!(
            doc.bounding_box(group, &measurer),
            Some(Rect::new(6.0, 12.0, 34.0, 14.0))
        );
    }

    #[test]
    fn parses_translate_forms() {
        assert_eq!(parse_translate("translate(3,4)"), Some((3.0, 4.0)));
        assert_eq!(parse_translate("translate(3 4)"), Some((3.0, 4.0)));
        assert_eq!(parse_translate("rotate(90)"), None);
    }
}
