//! Color legend.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::broadcaster::ListenerKey;
use crate::error::{ChartError, Result};
use crate::geom::Point;
use crate::scale::{ColorScale, Scale};
use crate::svg::{NodeId, format_number};
use crate::symbol::SymbolKind;
use crate::text::DEFAULT_FONT_SIZE;

use super::{Component, ComponentBase, SpaceRequest, XAlign, YAlign};

/// Class of each row group.
pub const LEGEND_ROW_CLASS: &str = "legend-row";
/// Class of each entry group.
pub const LEGEND_ENTRY_CLASS: &str = "legend-entry";
/// Class of each entry's swatch.
pub const LEGEND_SYMBOL_CLASS: &str = "legend-symbol";

const PADDING: f64 = 5.0;

type SortFn = Rc<dyn Fn(&str, &str) -> std::cmp::Ordering>;
type SymbolFactory = Rc<dyn Fn(&str, usize) -> SymbolKind>;

struct LayoutInfo {
    text_height: f64,
    entry_lengths: IndexMap<String, f64>,
    rows: Vec<Vec<String>>,
    rows_to_draw: usize,
}

/// Rows of swatches and names, one entry per color scale key.
pub struct Legend {
    base: ComponentBase,
    scale: ColorScale,
    max_entries_per_row: usize,
    sort: Option<SortFn>,
    symbol_factory: SymbolFactory,
    font_size: f64,
}

impl Legend {
    /// Legend for the keys of `scale`, aligned to the top right.
    pub fn new(scale: ColorScale) -> Self {
        let mut base = ComponentBase::new("legend");
        base.set_x_align(XAlign::Right);
        base.set_y_align(YAlign::Top);
        let legend = Self {
            base,
            scale,
            max_entries_per_row: 1,
            sort: None,
            symbol_factory: Rc::new(|_, _| SymbolKind::Circle),
            font_size: DEFAULT_FONT_SIZE,
        };
        legend.listen();
        legend
    }

    fn listen(&self) {
        let hook = self.base.hook().clone();
        self.scale
            .broadcaster()
            .register(ListenerKey::Id(self.base.id().get()), move |_: &Scale| {
                hook.request_layout()
            });
    }

    /// Scale the entries come from.
    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Follow another color scale.
    pub fn set_scale(&mut self, scale: ColorScale) {
        self.scale
            .broadcaster()
            .deregister(&ListenerKey::Id(self.base.id().get()));
        self.scale = scale;
        self.listen();
        self.base.hook().request_layout();
    }

    /// Most entries placed on one row.
    pub fn max_entries_per_row(&self) -> usize {
        self.max_entries_per_row
    }

    /// Set the most entries per row. Zero is rejected.
    pub fn set_max_entries_per_row(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ChartError::InvalidOption {
                kind: "max entries per row",
                value: count.to_string(),
            });
        }
        self.max_entries_per_row = count;
        self.base.hook().request_layout();
        Ok(())
    }

    /// Order entries with a comparator instead of domain order.
    pub fn set_sort_function(&mut self, sort: impl Fn(&str, &str) -> std::cmp::Ordering + 'static) {
        self.sort = Some(Rc::new(sort));
        self.base.hook().request_layout();
    }

    /// Pick the marker of each entry from its name and position.
    pub fn set_symbol_factory(&mut self, factory: impl Fn(&str, usize) -> SymbolKind + 'static) {
        self.symbol_factory = Rc::new(factory);
        self.base.hook().request_render();
    }

    /// Font size of entry names.
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// Set the font size and lay out again.
    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
        self.base.hook().request_layout();
    }

    fn sorted_entries(&self) -> Vec<String> {
        let mut entries = self.scale.domain();
        if let Some(sort) = &self.sort {
            entries.sort_by(|a, b| sort(a, b));
        }
        entries
    }

    fn layout_info(&self, available_width: f64, available_height: f64) -> LayoutInfo {
        let text_height = self.base.measure_text("Hg", self.font_size).1;
        let width_for_entries = (available_width - PADDING).max(0.0);
        let entries = self.sorted_entries();
        let entry_lengths: IndexMap<String, f64> = entries
            .iter()
            .map(|name| {
                let width = self.base.measure_text(name, self.font_size).0;
                (name.clone(), text_height + width + PADDING)
            })
            .collect();
        let rows = self.pack_rows(width_for_entries, &entries, &entry_lengths);
        let rows_available = if text_height > 0.0 {
            ((available_height - 2.0 * PADDING) / text_height + 1e-9).floor().max(0.0) as usize
        } else {
            0
        };
        let rows_to_draw = rows_available.min(rows.len());
        LayoutInfo {
            text_height,
            entry_lengths,
            rows,
            rows_to_draw,
        }
    }

    fn pack_rows(&self, available_width: f64, entries: &[String], lengths: &IndexMap<String, f64>) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut space_left = available_width;
        for entry in entries {
            let length = lengths.get(entry).copied().unwrap_or(0.0);
            if !current.is_empty() && (length > space_left || current.len() == self.max_entries_per_row) {
                rows.push(std::mem::take(&mut current));
                space_left = available_width;
            }
            current.push(entry.clone());
            space_left -= length;
        }
        if !current.is_empty() {
            rows.push(current);
        }
        rows
    }

    /// Name of the entry under `point`, in component coordinates.
    pub fn entry_at(&self, point: Point) -> Option<String> {
        if !self.base.is_setup() {
            return None;
        }
        let layout = self.layout_info(self.base.width(), self.base.height());
        for (row_index, row) in layout.rows.iter().take(layout.rows_to_draw).enumerate() {
            let low_y = row_index as f64 * layout.text_height + PADDING;
            let high_y = low_y + layout.text_height;
            if point.y < low_y || point.y > high_y {
                continue;
            }
            let mut low_x = PADDING;
            for entry in row {
                let high_x = low_x + layout.entry_lengths.get(entry).copied().unwrap_or(0.0);
                if point.x >= low_x && point.x <= high_x {
                    return Some(entry.clone());
                }
                low_x = high_x;
            }
        }
        None
    }

    fn write_entry(&self, doc: &mut crate::svg::SvgDocument, row: NodeId, entry: &str, index: usize, x: f64, layout: &LayoutInfo) {
        let text_height = layout.text_height;
        let group = doc.append(row, "g");
        doc.add_class(group, LEGEND_ENTRY_CLASS);
        doc.set_attr(group, "transform", format!("translate({},0)", format_number(x)));

        let kind = (self.symbol_factory)(entry, index);
        let symbol = doc.append(group, "path");
        doc.add_class(symbol, LEGEND_SYMBOL_CLASS);
        doc.set_attr(symbol, "d", kind.path(text_height * 0.6));
        doc.set_attr(
            symbol,
            "transform",
            format!(
                "translate({},{})",
                format_number(text_height / 2.0),
                format_number(text_height / 2.0)
            ),
        );
        if let Some(color) = self.scale.scale(entry) {
            doc.set_attr(symbol, "fill", color);
        }

        let container = doc.append(group, "g");
        doc.add_class(container, "text-container");
        doc.set_attr(
            container,
            "transform",
            format!("translate({},0)", format_number(text_height)),
        );
        let title = doc.append(container, "title");
        doc.set_text(title, entry.to_string());
        let entry_length = layout.entry_lengths.get(entry).copied().unwrap_or(0.0);
        let max_width = (entry_length.min(self.base.width() - x) - text_height - PADDING).max(0.0);
        let text = doc.append(container, "text");
        doc.set_text(text, fit_text(&self.base, entry, self.font_size, max_width));
        doc.set_number(text, "font-size", self.font_size);
        doc.set_attr(text, "dominant-baseline", "hanging");
        doc.set_number(text, "x", 0.0);
        doc.set_number(text, "y", 0.0);
    }
}

/// Truncate `text` with an ellipsis until it fits `max_width`.
pub(crate) fn fit_text(base: &ComponentBase, text: &str, size: f64, max_width: f64) -> String {
    let fits = |candidate: &str| base.measure_text(candidate, size).0 <= max_width + 1e-9;
    if fits(text) {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    for keep in (0..chars.len()).rev() {
        let candidate: String = chars[..keep].iter().chain(std::iter::once(&'…')).collect();
        if fits(&candidate) {
            return candidate;
        }
    }
    String::new()
}

impl fmt::Debug for Legend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Legend")
            .field("base", &self.base)
            .field("scale", &self.scale)
            .field("max_entries_per_row", &self.max_entries_per_row)
            .finish()
    }
}

impl Component for Legend {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest {
        let layout = self.layout_info(available_width, available_height);
        let longest_row = layout
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|entry| layout.entry_lengths.get(entry).copied().unwrap_or(0.0))
                    .sum::<f64>()
            })
            .fold(0.0, f64::max);
        SpaceRequest::new(
            PADDING + longest_row,
            layout.rows.len() as f64 * layout.text_height + 2.0 * PADDING,
        )
    }

    fn is_fixed_width(&self) -> bool {
        true
    }

    fn is_fixed_height(&self) -> bool {
        true
    }

    fn render_immediately(&mut self) {
        let (Some(surface), Some(content)) = (self.base.surface(), self.base.content()) else {
            return;
        };
        let layout = self.layout_info(self.base.width(), self.base.height());
        let mut doc = surface.document_mut();
        doc.clear_children(content);
        let mut index = 0;
        for (row_index, row) in layout.rows.iter().take(layout.rows_to_draw).enumerate() {
            let row_node = doc.append(content, "g");
            doc.add_class(row_node, LEGEND_ROW_CLASS);
            doc.set_attr(
                row_node,
                "transform",
                format!(
                    "translate(0,{})",
                    format_number(row_index as f64 * layout.text_height + PADDING)
                ),
            );
            let mut x = PADDING;
            for entry in row {
                self.write_entry(&mut doc, row_node, entry, index, x, &layout);
                x += layout.entry_lengths.get(entry).copied().unwrap_or(0.0);
                index += 1;
            }
        }
    }

    fn on_remove(&mut self) {
        self.scale
            .broadcaster()
            .deregister(&ListenerKey::Id(self.base.id().get()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentRef, remove, render_to, share};
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    fn immediate_surface() -> ChartSurface {
        ChartSurface::with_config(
            400.0,
            300.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        )
    }

    #[test]
    fn requested_space_fits_longest_row() {
        let scale = ColorScale::new();
        scale.set_domain(["a", "bbb"]);
        let legend = Legend::new(scale);
        // text height 14.4; "bbb" is 21.6 wide
        let request = legend.requested_space(400.0, 300.0);
        assert!((request.min_width - (5.0 + 14.4 + 21.6 + 5.0)).abs() < 1e-9);
        assert!((request.min_height - (2.0 * 14.4 + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn rows_respect_max_entries() {
        let scale = ColorScale::new();
        scale.set_domain(["a", "b", "c"]);
        let mut legend = Legend::new(scale);
        legend.set_max_entries_per_row(2).expect("valid count");
        let layout = legend.layout_info(400.0, 300.0);
        assert_eq!(layout.rows, vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]);
        assert!(legend.set_max_entries_per_row(0).is_err());
    }

    #[test]
    fn renders_entries_and_finds_them() {
        let surface = immediate_surface();
        let scale = ColorScale::with_range(vec!["red".into(), "blue".into()]);
        scale.set_domain(["b", "a"]);
        let legend = share(Legend::new(scale.clone()));
        legend
            .borrow_mut()
            .set_sort_function(|a: &str, b: &str| a.cmp(b));
        let handle: ComponentRef = legend.clone();
        render_to(&handle, &surface).expect("render");

        let svg = surface.to_svg_string();
        assert_eq!(svg.matches("class=\"legend-entry\"").count(), 2);
        assert!(svg.contains("fill=\"blue\""));
        let first = legend.borrow().entry_at(Point::new(8.0, 8.0));
        assert_eq!(first.as_deref(), Some("a"));
        let second = legend.borrow().entry_at(Point::new(8.0, 8.0 + 14.4));
        assert_eq!(second.as_deref(), Some("b"));
        assert_eq!(legend.borrow().entry_at(Point::new(8.0, 200.0)), None);

        scale.set_domain(["a", "b", "c"]);
        surface.flush();
        assert_eq!(surface.to_svg_string().matches("class=\"legend-entry\"").count(), 3);
    }

    #[test]
    fn removal_stops_listening() {
        let surface = immediate_surface();
        let scale = ColorScale::new();
        let legend: ComponentRef = share(Legend::new(scale.clone()));
        render_to(&legend, &surface).expect("render");
        assert_eq!(scale.broadcaster().len(), 1);
        remove(&legend);
        assert!(scale.broadcaster().is_empty());
    }

    #[test]
    fn long_names_are_truncated() {
        let base = ComponentBase::new("legend");
        assert_eq!(fit_text(&base, "abcdef", 10.0, 24.0), "abc…");
        assert_eq!(fit_text(&base, "ab", 10.0, 24.0), "ab");
    }
}
