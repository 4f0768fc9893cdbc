//! liveplot-svg is a declarative charting library that renders to SVG.
//! Datasets are bound to plots through projections, scales keep every plot
//! and axis on a shared domain, and a component tree lays everything out
//! before drawers emit the markup.

#![forbid(unsafe_code)]

pub mod accessor;
pub mod animator;
pub mod axis;
pub mod broadcaster;
pub mod component;
pub mod dataset;
pub mod drawer;
pub mod error;
pub mod extent;
pub mod format;
pub mod geom;
pub mod interaction;
pub mod plot;
pub mod render_controller;
pub mod scale;
pub mod surface;
pub mod svg;
pub mod symbol;
pub mod text;

pub use accessor::{Accessor, AttrToProjector, PlotMetadata, Projection, Projector};
pub use animator::{Animator, Easing, Timing};
pub use axis::{
    Axis, AxisOrientation, CategoryAxis, NumericAxis, TierLabelPosition, TimeAxis, TimeInterval,
    TimeTierConfig,
};
pub use broadcaster::{Broadcaster, ListenerKey};
pub use component::{
    Component, ComponentBase, ComponentRef, DragBoxLayer, DragBoxMode, Gridlines, Group,
    InterpolatedColorLegend, Label, LabelKind, LabelOrientation, Legend, SelectionBoxLayer, Shared,
    Table, XAlign, YAlign, above, below, merge, remove, render_to, share,
};
pub use dataset::Dataset;
pub use drawer::{DrawStep, Drawer, DrawerKind};
pub use error::{ChartError, Result};
pub use extent::Extent;
pub use format::Formatter;
pub use geom::{Point, Rect};
pub use interaction::{
    Click, DoubleClick, Drag, Hover, HoverData, Hoverable, Interaction, Key, PanZoom, Pointer,
};
pub use plot::{
    AreaPlot, AutoAdjust, BarAlignment, BarOrientation, BarPlot, ClusteredBarPlot, GridPlot,
    HoverMode, LinePlot, PiePlot, Plot, PlotData, RectanglePlot, ScatterPlot, StackedAreaPlot,
    StackedBarPlot, XyPlot,
};
pub use render_controller::{RenderController, RenderPolicy};
pub use scale::{
    CategoryScale, ColorPreset, ColorScale, Domainer, InterpolatedColorScale, InterpolationKind,
    QuantitativeKind, QuantitativeScale, Scale, ScaleDomainCoordinator, TickGenerator,
};
pub use surface::{ChartSurface, SurfaceConfig};
pub use svg::{NodeId, SvgDocument};
pub use symbol::SymbolKind;
pub use text::{MonospaceMeasurer, TextMeasurer};
