use liveplot_svg::axis::AxisOrientation;
use liveplot_svg::interaction::dispatcher::MouseEvent;
use liveplot_svg::{
    BarOrientation, CategoryAxis, CategoryScale, ChartSurface, Component, ComponentRef, Dataset, Hover,
    LinePlot, NumericAxis, Plot, QuantitativeScale, RenderPolicy, ScatterPlot, StackedBarPlot,
    SurfaceConfig, Table, render_to, share,
};
use serde_json::json;

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

fn path_data(svg: &str, class: &str) -> Vec<String> {
    let marker = format!("<path class=\"{class}\" d=\"");
    svg.match_indices(&marker)
        .filter_map(|(start, _)| {
            let rest = &svg[start + marker.len()..];
            rest.find('"').map(|end| rest[..end].to_string())
        })
        .collect()
}

#[test]
fn line_chart_with_axes_renders_to_svg() {
    let surface = immediate_surface(400.0, 300.0);
    let x = QuantitativeScale::linear();
    let y = QuantitativeScale::linear();
    let plot = share(LinePlot::new(x.clone(), y.clone()));
    plot.borrow_mut().add_dataset(Dataset::new(vec![
        json!({"x": 0, "y": 1}),
        json!({"x": 1, "y": 4}),
        json!({"x": 2, "y": 9}),
    ]));
    let x_axis: ComponentRef = share(NumericAxis::new(x.clone(), AxisOrientation::Bottom));
    let y_axis: ComponentRef = share(NumericAxis::new(y.clone(), AxisOrientation::Left));
    let plot_ref: ComponentRef = plot.clone();
    let table = Table::with_rows(vec![
        vec![Some(y_axis), Some(plot_ref)],
        vec![None, Some(x_axis)],
    ])
    .expect("table");
    let table: ComponentRef = table;
    render_to(&table, &surface).expect("render");

    let svg = surface.to_svg_string();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("class=\"component plot line-plot\""));
    assert!(svg.matches("class=\"tick-label\"").count() >= 4);

    let (low, high) = y.domain();
    assert!(low <= 1.0 && high >= 9.0);
    let lines = path_data(&svg, "line");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].matches('L').count(), 2);

    // The x range spans only the plot cell, not the axis column.
    let (start, end) = x.range();
    assert!(start.abs() < 1e-9);
    assert!(end < 400.0);
}

#[test]
fn dataset_changes_flow_back_into_the_scales() {
    let surface = immediate_surface(200.0, 200.0);
    let y = QuantitativeScale::linear();
    let plot = share(ScatterPlot::new(QuantitativeScale::linear(), y.clone()));
    let dataset = Dataset::new(vec![json!({"x": 0, "y": 1}), json!({"x": 1, "y": 2})]);
    plot.borrow_mut().add_dataset(dataset.clone());
    let plot_ref: ComponentRef = plot.clone();
    render_to(&plot_ref, &surface).expect("render");
    assert!(y.domain().1 < 10.0);

    dataset.set_data(vec![json!({"x": 0, "y": 1}), json!({"x": 1, "y": 50})]);
    surface.flush();
    assert!(y.domain().1 >= 50.0);
    assert_eq!(surface.to_svg_string().matches("class=\"symbol\"").count(), 2);
}

#[test]
fn removing_and_re_adding_a_dataset_restores_the_geometry() {
    let surface = immediate_surface(100.0, 100.0);
    let x = QuantitativeScale::linear();
    let y = QuantitativeScale::linear();
    x.set_domain(0.0, 10.0).expect("domain");
    y.set_domain(0.0, 10.0).expect("domain");
    let plot = share(LinePlot::new(x, y));
    let records = vec![json!({"x": 1, "y": 3}), json!({"x": 7, "y": 6})];
    plot.borrow_mut()
        .add_dataset_with_key("series", Dataset::new(records.clone()))
        .expect("add");
    let plot_ref: ComponentRef = plot.clone();
    render_to(&plot_ref, &surface).expect("render");
    let before = path_data(&surface.to_svg_string(), "line");

    plot.borrow_mut().remove_dataset("series").expect("remove");
    surface.flush();
    assert!(path_data(&surface.to_svg_string(), "line").is_empty());

    plot.borrow_mut()
        .add_dataset_with_key("series", Dataset::new(records))
        .expect("re-add");
    surface.flush();
    assert_eq!(path_data(&surface.to_svg_string(), "line"), before);
    assert_eq!(before, vec!["M10,70L70,40".to_string()]);
}

#[test]
fn hover_reports_the_marker_under_the_pointer() {
    let surface = immediate_surface(100.0, 100.0);
    let x = QuantitativeScale::linear();
    let y = QuantitativeScale::linear();
    x.set_domain(0.0, 10.0).expect("domain");
    y.set_domain(0.0, 10.0).expect("domain");
    let plot = share(ScatterPlot::new(x, y));
    plot.borrow_mut()
        .add_dataset(Dataset::new(vec![json!({"x": 2, "y": 5}), json!({"x": 8, "y": 5})]));
    let hover = Hover::new();
    plot.borrow_mut().base_mut().register_interaction(hover.clone());
    let plot_ref: ComponentRef = plot.clone();
    render_to(&plot_ref, &surface).expect("render");

    surface.dispatchers().mouse().mouse_move(MouseEvent::at(21.0, 52.0));
    assert_eq!(hover.current_hover_data().data, vec![json!({"x": 2, "y": 5})]);

    surface.dispatchers().mouse().mouse_move(MouseEvent::at(50.0, 50.0));
    assert!(hover.current_hover_data().is_empty());
}

#[test]
fn stacked_bars_size_the_value_axis_to_the_stack() {
    let surface = immediate_surface(300.0, 200.0);
    let categories = CategoryScale::new();
    let values = QuantitativeScale::linear();
    let plot = share(StackedBarPlot::new(
        categories.clone(),
        values.clone(),
        BarOrientation::Vertical,
    ));
    plot.borrow_mut().add_dataset(Dataset::new(vec![
        json!({"x": "north", "y": 3}),
        json!({"x": "south", "y": 4}),
    ]));
    plot.borrow_mut().add_dataset(Dataset::new(vec![
        json!({"x": "north", "y": 5}),
        json!({"x": "south", "y": -2}),
    ]));
    let axis: ComponentRef = share(CategoryAxis::new(categories.clone(), AxisOrientation::Bottom));
    let plot_ref: ComponentRef = plot.clone();
    let table: ComponentRef = Table::with_rows(vec![vec![Some(plot_ref)], vec![Some(axis)]]).expect("table");
    render_to(&table, &surface).expect("render");

    assert_eq!(categories.domain(), vec!["north".to_string(), "south".to_string()]);
    let (low, high) = values.domain();
    assert!(low <= -2.0);
    assert!(high >= 8.0);
    let svg = surface.to_svg_string();
    assert_eq!(svg.matches("<rect x=").count(), 4);
    assert!(svg.contains(">north</text>"));
}

#[test]
fn frame_policy_defers_renders_until_the_host_ticks() {
    let surface = ChartSurface::new(100.0, 100.0);
    let x = QuantitativeScale::linear();
    let y = QuantitativeScale::linear();
    x.set_domain(0.0, 10.0).expect("domain");
    y.set_domain(0.0, 10.0).expect("domain");
    let plot = share(ScatterPlot::new(x, y));
    let dataset = Dataset::new(vec![json!({"x": 1, "y": 1})]);
    plot.borrow_mut().add_dataset(dataset.clone());
    let plot_ref: ComponentRef = plot.clone();
    render_to(&plot_ref, &surface).expect("render");
    assert_eq!(surface.to_svg_string().matches("class=\"symbol\"").count(), 1);

    dataset.set_data(vec![json!({"x": 1, "y": 1}), json!({"x": 2, "y": 2})]);
    assert!(surface.controller().frame_requested());
    assert_eq!(surface.to_svg_string().matches("class=\"symbol\"").count(), 1);

    surface.controller().on_animation_frame();
    assert_eq!(surface.to_svg_string().matches("class=\"symbol\"").count(), 2);
    assert!(!surface.controller().has_pending());
}
