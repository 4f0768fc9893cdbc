//! Grid container.
//!
//! Space is negotiated iteratively. Every row and column gets a weight:
//! explicit weights win, otherwise a row (column) made only of fixed-size
//! cells weighs 0 and anything else weighs 1. Starting from a heuristic split
//! where fixed rows count half, the table asks every cell what it needs for
//! the space it is currently offered, guarantees those minimums, then shares
//! the remainder by weight. Rows and columns whose cells still want more get a
//! small extra weight. The loop stops when the free space settles or after a
//! handful of passes.

use std::rc::Rc;

use crate::error::{ChartError, Result};
use crate::geom::Point;
use crate::surface::ChartSurface;
use crate::svg::NodeId;

use super::{
    Component, ComponentBase, ComponentId, ComponentRef, LayoutOffer, Shared, SpaceRequest, above,
    adopt_child, anchor_component, detach, layout_component, release_child, render_children, share,
};

const MAX_LAYOUT_ITERATIONS: usize = 5;
const FIXED_HEURISTIC_WEIGHT: f64 = 0.5;
const WANTS_SPACE_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
struct Guarantees {
    widths: Vec<f64>,
    heights: Vec<f64>,
    wants_width: Vec<bool>,
    wants_height: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
struct TableLayout {
    col_proportional: Vec<f64>,
    row_proportional: Vec<f64>,
    guaranteed_widths: Vec<f64>,
    guaranteed_heights: Vec<f64>,
}

impl TableLayout {
    fn column_widths(&self) -> Vec<f64> {
        add(&self.col_proportional, &self.guaranteed_widths)
    }

    fn row_heights(&self) -> Vec<f64> {
        add(&self.row_proportional, &self.guaranteed_heights)
    }
}

/// Components arranged in rows and columns.
pub struct Table {
    base: ComponentBase,
    rows: Vec<Vec<Option<ComponentRef>>>,
    row_weights: Vec<Option<f64>>,
    col_weights: Vec<Option<f64>>,
    row_padding: f64,
    col_padding: f64,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            base: ComponentBase::new("table"),
            rows: Vec::new(),
            row_weights: Vec::new(),
            col_weights: Vec::new(),
            row_padding: 0.0,
            col_padding: 0.0,
        }
    }

    /// Create a shared table from rows of optional cells.
    pub fn with_rows(rows: Vec<Vec<Option<ComponentRef>>>) -> Result<Shared<Table>> {
        let table = share(Table::new());
        for (row, cells) in rows.into_iter().enumerate() {
            for (col, cell) in cells.into_iter().enumerate() {
                if let Some(component) = cell {
                    table.borrow_mut().add(row, col, component)?;
                }
            }
        }
        Ok(table)
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Component in a cell.
    pub fn component_at(&self, row: usize, col: usize) -> Option<ComponentRef> {
        self.rows.get(row)?.get(col)?.clone()
    }

    /// Check whether `component` occupies any cell.
    pub fn has(&self, component: &ComponentRef) -> bool {
        self.rows
            .iter()
            .flatten()
            .flatten()
            .any(|cell| Rc::ptr_eq(cell, component))
    }

    /// Put a component in a cell, growing the grid as needed.
    ///
    /// An occupied cell is replaced by a group with the new component on top.
    pub fn add(&mut self, row: usize, col: usize, component: ComponentRef) -> Result<()> {
        let (id, removed, parent, anchored) = {
            let Ok(inner) = component.try_borrow() else {
                return Err(ChartError::ComponentBusy);
            };
            (
                inner.base().id(),
                inner.base().is_removed(),
                inner.base().parent(),
                inner.base().is_anchored(),
            )
        };
        if removed {
            return Err(ChartError::ComponentRemoved(id.get()));
        }
        // A root stays on its own surface.
        if parent.is_none() && anchored {
            return Err(ChartError::AlreadyAnchored(id.get()));
        }
        if let Some(parent) = parent {
            let elsewhere = parent
                .try_borrow()
                .map(|parent| parent.base().id() != self.base.id())
                .unwrap_or(false);
            if elsewhere {
                detach(&component);
            } else {
                self.take_cell_of(id);
                release_child(&component);
            }
        }
        self.pad_to(row + 1, col + 1);
        let content = self.base.content();
        let component = match self.rows[row][col].take() {
            Some(current) => {
                release_child(&current);
                match above(&component, &current) {
                    Ok(merged) => merged,
                    Err(error) => {
                        self.rows[row][col] = Some(current.clone());
                        adopt_child(&self.base, &current, content);
                        return Err(error);
                    }
                }
            }
            None => component,
        };
        self.rows[row][col] = Some(component.clone());
        adopt_child(&self.base, &component, content);
        self.base.hook().request_layout();
        Ok(())
    }

    /// Explicit weight of a row, if any.
    pub fn row_weight(&self, row: usize) -> Option<f64> {
        self.row_weights.get(row).copied().flatten()
    }

    /// Set the weight of a row; `None` restores the fixity-based default.
    pub fn set_row_weight(&mut self, row: usize, weight: Option<f64>) -> Result<()> {
        let slot = self
            .row_weights
            .get_mut(row)
            .ok_or(ChartError::InvalidCell { row, col: 0 })?;
        *slot = weight;
        self.base.hook().request_layout();
        Ok(())
    }

    /// Explicit weight of a column, if any.
    pub fn col_weight(&self, col: usize) -> Option<f64> {
        self.col_weights.get(col).copied().flatten()
    }

    /// Set the weight of a column; `None` restores the fixity-based default.
    pub fn set_col_weight(&mut self, col: usize, weight: Option<f64>) -> Result<()> {
        let slot = self
            .col_weights
            .get_mut(col)
            .ok_or(ChartError::InvalidCell { row: 0, col })?;
        *slot = weight;
        self.base.hook().request_layout();
        Ok(())
    }

    /// Padding between rows and between columns.
    pub fn padding(&self) -> (f64, f64) {
        (self.row_padding, self.col_padding)
    }

    /// Set the padding between rows and between columns.
    pub fn set_padding(&mut self, row_padding: f64, col_padding: f64) {
        self.row_padding = row_padding.max(0.0);
        self.col_padding = col_padding.max(0.0);
        self.base.hook().request_layout();
    }

    fn pad_to(&mut self, rows: usize, cols: usize) {
        let cols = cols.max(self.col_count());
        while self.rows.len() < rows {
            self.rows.push(Vec::new());
            self.row_weights.push(None);
        }
        for row in &mut self.rows {
            row.resize_with(cols, || None);
        }
        self.col_weights.resize(cols, None);
    }

    fn take_cell_of(&mut self, id: ComponentId) -> Option<ComponentRef> {
        for cell in self.rows.iter_mut().flatten() {
            let matches = cell
                .as_ref()
                .and_then(|component| component.try_borrow().ok().map(|c| c.base().id() == id))
                .unwrap_or(false);
            if matches {
                return cell.take();
            }
        }
        None
    }

    fn columns(&self) -> Vec<Vec<Option<ComponentRef>>> {
        (0..self.col_count())
            .map(|col| self.rows.iter().map(|row| row[col].clone()).collect())
            .collect()
    }

    fn iterate_layout(&self, available_width: f64, available_height: f64, final_offer: bool) -> TableLayout {
        let n_rows = self.row_count();
        let n_cols = self.col_count();
        let width_after_padding = available_width - self.col_padding * n_cols.saturating_sub(1) as f64;
        let height_after_padding = available_height - self.row_padding * n_rows.saturating_sub(1) as f64;

        let row_weights = component_weights(&self.row_weights, &self.rows, |c| c.is_fixed_height());
        let col_weights = component_weights(&self.col_weights, &self.columns(), |c| c.is_fixed_width());

        let heuristic = |weights: &[f64]| -> Vec<f64> {
            weights
                .iter()
                .map(|weight| if *weight == 0.0 { FIXED_HEURISTIC_WEIGHT } else { *weight })
                .collect()
        };
        let mut col_proportional = proportional_space(&heuristic(&col_weights), width_after_padding);
        let mut row_proportional = proportional_space(&heuristic(&row_weights), height_after_padding);

        let mut guaranteed_widths = vec![0.0; n_cols];
        let mut guaranteed_heights = vec![0.0; n_rows];
        let mut free_width: Option<f64> = None;
        let mut free_height: Option<f64> = None;
        let mut iterations = 0;
        loop {
            let offered_widths = add(&guaranteed_widths, &col_proportional);
            let offered_heights = add(&guaranteed_heights, &row_proportional);
            let guarantees = self.determine_guarantees(&offered_widths, &offered_heights, final_offer);
            guaranteed_widths = guarantees.widths;
            guaranteed_heights = guarantees.heights;

            let last_free_width = free_width;
            let last_free_height = free_height;
            let width_left = width_after_padding - guaranteed_widths.iter().sum::<f64>();
            let height_left = height_after_padding - guaranteed_heights.iter().sum::<f64>();
            free_width = Some(width_left);
            free_height = Some(height_left);

            let x_weights = wants_weights(&guarantees.wants_width, &col_weights);
            let y_weights = wants_weights(&guarantees.wants_height, &row_weights);
            col_proportional = proportional_space(&x_weights, width_left);
            row_proportional = proportional_space(&y_weights, height_left);
            iterations += 1;

            let can_improve_width = width_left > 0.0 && last_free_width != Some(width_left);
            let can_improve_height = height_left > 0.0 && last_free_height != Some(height_left);
            if !(can_improve_width || can_improve_height) || iterations > MAX_LAYOUT_ITERATIONS {
                break;
            }
        }

        let width_left = width_after_padding - guaranteed_widths.iter().sum::<f64>();
        let height_left = height_after_padding - guaranteed_heights.iter().sum::<f64>();
        TableLayout {
            col_proportional: proportional_space(&col_weights, width_left),
            row_proportional: proportional_space(&row_weights, height_left),
            guaranteed_widths,
            guaranteed_heights,
        }
    }

    fn determine_guarantees(&self, offered_widths: &[f64], offered_heights: &[f64], final_offer: bool) -> Guarantees {
        let mut guarantees = Guarantees {
            widths: vec![0.0; offered_widths.len()],
            heights: vec![0.0; offered_heights.len()],
            wants_width: vec![false; offered_widths.len()],
            wants_height: vec![false; offered_heights.len()],
        };
        for (row_index, row) in self.rows.iter().enumerate() {
            for (col_index, cell) in row.iter().enumerate() {
                let offered_width = offered_widths[col_index];
                let offered_height = offered_heights[row_index];
                let request = cell
                    .as_ref()
                    .and_then(|component| component.try_borrow().ok())
                    .map(|component| component.requested_space(offered_width, offered_height))
                    .unwrap_or_default();
                let width = if final_offer {
                    request.min_width.min(offered_width)
                } else {
                    request.min_width
                };
                let height = if final_offer {
                    request.min_height.min(offered_height)
                } else {
                    request.min_height
                };
                guarantees.widths[col_index] = guarantees.widths[col_index].max(width);
                guarantees.heights[row_index] = guarantees.heights[row_index].max(height);
                guarantees.wants_width[col_index] |= request.min_width > offered_width;
                guarantees.wants_height[row_index] |= request.min_height > offered_height;
            }
        }
        guarantees
    }
}

fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(a, b)| a + b).collect()
}

fn component_weights(
    explicit: &[Option<f64>],
    groups: &[Vec<Option<ComponentRef>>],
    fixed: impl Fn(&dyn Component) -> bool,
) -> Vec<f64> {
    explicit
        .iter()
        .zip(groups)
        .map(|(weight, group)| {
            weight.unwrap_or_else(|| {
                let all_fixed = group.iter().all(|cell| match cell {
                    None => true,
                    Some(component) => component.try_borrow().is_ok_and(|c| fixed(&*c)),
                });
                if all_fixed { 0.0 } else { 1.0 }
            })
        })
        .collect()
}

fn proportional_space(weights: &[f64], free_space: f64) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return vec![0.0; weights.len()];
    }
    weights.iter().map(|weight| free_space * weight / total).collect()
}

fn wants_weights(wants: &[bool], weights: &[f64]) -> Vec<f64> {
    if wants.iter().any(|want| *want) {
        wants
            .iter()
            .zip(weights)
            .map(|(want, weight)| weight + if *want { WANTS_SPACE_WEIGHT } else { 0.0 })
            .collect()
    } else {
        weights.to_vec()
    }
}

fn all_fixed(groups: &[Vec<Option<ComponentRef>>], fixed: impl Fn(&dyn Component) -> bool) -> bool {
    groups.iter().flatten().all(|cell| match cell {
        None => true,
        Some(component) => component.try_borrow().is_ok_and(|c| fixed(&*c)),
    })
}

impl Component for Table {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest {
        let layout = self.iterate_layout(available_width, available_height, false);
        SpaceRequest::new(
            layout.guaranteed_widths.iter().sum(),
            layout.guaranteed_heights.iter().sum(),
        )
    }

    fn is_fixed_width(&self) -> bool {
        all_fixed(&self.rows, |c| c.is_fixed_width())
    }

    fn is_fixed_height(&self) -> bool {
        all_fixed(&self.rows, |c| c.is_fixed_height())
    }

    fn anchor(&mut self, surface: &ChartSurface, parent: NodeId) {
        anchor_component(self, surface, parent);
        let content = self.base.content();
        for cell in self.rows.iter().flatten().flatten() {
            adopt_child(&self.base, cell, content);
        }
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        let (width, height) = (self.base.width(), self.base.height());
        let mut layout = self.iterate_layout(width, height, false);
        if layout.guaranteed_widths.iter().sum::<f64>() > width
            || layout.guaranteed_heights.iter().sum::<f64>() > height
        {
            layout = self.iterate_layout(width, height, true);
        }
        let col_widths = layout.column_widths();
        let row_heights = layout.row_heights();
        let mut y = 0.0;
        for (row_index, row) in self.rows.iter().enumerate() {
            let mut x = 0.0;
            for (col_index, cell) in row.iter().enumerate() {
                if let Some(component) = cell
                    && let Ok(mut component) = component.try_borrow_mut()
                {
                    component.compute_layout(Some(LayoutOffer::new(
                        Point::new(x, y),
                        col_widths[col_index],
                        row_heights[row_index],
                    )));
                }
                x += col_widths[col_index] + self.col_padding;
            }
            y += row_heights[row_index] + self.row_padding;
        }
    }

    fn render_immediately(&mut self) {
        render_children(&self.children());
    }

    fn children(&self) -> Vec<ComponentRef> {
        self.rows.iter().flatten().flatten().cloned().collect()
    }

    fn remove_child(&mut self, id: ComponentId) -> Option<ComponentRef> {
        self.take_cell_of(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::selection_box::SelectionBoxLayer;
    use crate::component::label::Label;
    use crate::component::render_to;
    use crate::render_controller::RenderPolicy;
    use crate::surface::SurfaceConfig;

    fn surface(width: f64, height: f64) -> ChartSurface {
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
    fn fixed_row_takes_its_request_and_flexible_row_the_rest() {
        let surface = surface(300.0, 200.0);
        let title = share(Label::new("Title"));
        let subtitle = share(Label::new("Subtitle"));
        let body = share(SelectionBoxLayer::new());
        let table = Table::with_rows(vec![
            vec![Some(title.clone() as ComponentRef)],
            vec![Some(subtitle.clone() as ComponentRef)],
            vec![Some(body.clone() as ComponentRef)],
        ])
        .expect("table");
        let handle: ComponentRef = table.clone();
        render_to(&handle, &surface).expect("render");

        let title_height = title.borrow().requested_space(300.0, 200.0).min_height;
        let subtitle_height = subtitle.borrow().requested_space(300.0, 200.0).min_height;
        assert!((title.borrow().base().height() - title_height).abs() < 1e-9);
        assert!((subtitle.borrow().base().height() - subtitle_height).abs() < 1e-9);
        assert!((subtitle.borrow().base().origin().y - title_height).abs() < 1e-9);
        let body = body.borrow();
        let fixed = title_height + subtitle_height;
        assert!((body.base().origin().y - fixed).abs() < 1e-9);
        assert!((body.base().height() - (200.0 - fixed)).abs() < 1e-9);
        assert!((body.base().width() - 300.0).abs() < 1e-9);
        assert!(!table.borrow().is_fixed_height());
    }

    #[test]
    fn failed_add_leaves_the_cell_untouched() {
        let surface = surface(100.0, 100.0);
        let rooted: ComponentRef = share(Label::new("root"));
        render_to(&rooted, &surface).expect("render");
        let existing: ComponentRef = share(Label::new("existing"));
        let table = Table::with_rows(vec![vec![Some(existing.clone())]]).expect("table");

        let rooted_id = rooted.borrow().base().id().get();
        assert_eq!(
            table.borrow_mut().add(0, 0, rooted.clone()),
            Err(ChartError::AlreadyAnchored(rooted_id))
        );
        let cell = table.borrow().component_at(0, 0).expect("cell");
        assert!(Rc::ptr_eq(&cell, &existing));
        let parent = existing.borrow().base().parent().expect("parent");
        assert_eq!(parent.borrow().base().id(), table.borrow().base().id());
    }

    #[test]
    fn busy_children_are_reported() {
        let child: ComponentRef = share(Label::new("held"));
        let table = share(Table::new());
        let _held = child.borrow_mut();
        assert_eq!(table.borrow_mut().add(0, 0, child.clone()), Err(ChartError::ComponentBusy));
        assert_eq!(table.borrow().row_count(), 0);
    }

    #[test]
    fn padding_is_removed_before_sharing() {
        let surface = surface(310.0, 100.0);
        let left = share(SelectionBoxLayer::new());
        let right = share(SelectionBoxLayer::new());
        let table = Table::with_rows(vec![vec![
            Some(left.clone() as ComponentRef),
            Some(right.clone() as ComponentRef),
        ]])
        .expect("table");
        table.borrow_mut().set_padding(0.0, 10.0);
        let handle: ComponentRef = table.clone();
        render_to(&handle, &surface).expect("render");
        assert!((left.borrow().base().width() - 150.0).abs() < 1e-9);
        assert!((right.borrow().base().origin().x - 160.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_weights_split_space() {
        let surface = surface(300.0, 100.0);
        let narrow = share(SelectionBoxLayer::new());
        let wide = share(SelectionBoxLayer::new());
        let table = Table::with_rows(vec![vec![
            Some(narrow.clone() as ComponentRef),
            Some(wide.clone() as ComponentRef),
        ]])
        .expect("table");
        table.borrow_mut().set_col_weight(1, Some(2.0)).expect("weight");
        assert_eq!(table.borrow().col_weight(1), Some(2.0));
        assert_eq!(
            table.borrow_mut().set_row_weight(4, Some(1.0)),
            Err(ChartError::InvalidCell { row: 4, col: 0 })
        );
        let handle: ComponentRef = table.clone();
        render_to(&handle, &surface).expect("render");
        assert!((narrow.borrow().base().width() - 100.0).abs() < 1e-9);
        assert!((wide.borrow().base().width() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn occupied_cell_becomes_group() {
        let first: ComponentRef = share(Label::new("first"));
        let second: ComponentRef = share(Label::new("second"));
        let table = Table::with_rows(vec![vec![Some(first.clone())]]).expect("table");
        table.borrow_mut().add(0, 0, second.clone()).expect("merge");
        let cell = table.borrow().component_at(0, 0).expect("cell");
        let children = cell.borrow().children();
        assert_eq!(children.len(), 2);
        assert!(Rc::ptr_eq(&children[0], &first));
        assert!(Rc::ptr_eq(&children[1], &second));
        assert!(!table.borrow().has(&first));
    }

    #[test]
    fn fixity_propagates_from_cells() {
        let table = Table::with_rows(vec![
            vec![Some(share(Label::new("a")) as ComponentRef), None],
            vec![None, Some(share(Label::new("b")) as ComponentRef)],
        ])
        .expect("table");
        assert!(table.borrow().is_fixed_width());
        assert!(table.borrow().is_fixed_height());
        table
            .borrow_mut()
            .add(2, 0, share(SelectionBoxLayer::new()))
            .expect("add");
        assert!(!table.borrow().is_fixed_height());
        assert_eq!(table.borrow().row_count(), 3);
    }
}
