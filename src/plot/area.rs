//! Area plot: a filled region between the data and a baseline.

use std::fmt;

use crate::accessor::{Accessor, AttrToProjector};
use crate::animator::{Animator, Easing, Timing};
use crate::component::{Component, ComponentBase, LayoutOffer, layout_component};
use crate::drawer::{DrawStep, DrawerKind};
use crate::extent::as_number;
use crate::scale::Scale;
use crate::scale::color::DEFAULT_PALETTE;

use super::xy::{AutoAdjust, XyPlot, adopt_xy_scale, set_xy_ranges, sync_baseline, update_xy_extents};
use super::{MAIN_ANIMATOR, Plot, PlotCore, RESET_ANIMATOR, render_plot};

pub const DEFAULT_FILL_OPACITY: f64 = 0.25;

/// Fills from `y` down to `y0`, with the top edge stroked.
pub struct AreaPlot {
    core: PlotCore,
    auto_adjust: AutoAdjust,
}

impl AreaPlot {
    /// Area plot with `y0` fixed at zero.
    pub fn new(x_scale: impl Into<Scale>, y_scale: impl Into<Scale>) -> Self {
        Self::with_class("area-plot", x_scale, y_scale)
    }

    pub(crate) fn with_class(class: &str, x_scale: impl Into<Scale>, y_scale: impl Into<Scale>) -> Self {
        let mut core = PlotCore::new(class, DrawerKind::Area);
        core.set_default_animator(RESET_ANIMATOR, Animator::Null);
        core.set_default_animator(
            MAIN_ANIMATOR,
            Animator::Base(Timing::default().with_duration(600.0).with_easing(Easing::ExpInOut)),
        );
        let mut plot = Self {
            core,
            auto_adjust: AutoAdjust::None,
        };
        plot.x("x", x_scale);
        plot.y("y", y_scale);
        plot
    }

    /// Bind the baseline through the current y scale.
    pub fn y0(&mut self, accessor: impl Into<Accessor>) {
        let scale = self.y_scale();
        self.attr("y0", accessor, scale);
    }

    /// Baseline value when `y0` is a numeric constant.
    pub fn constant_baseline(&self) -> Option<f64> {
        match self.core.projection("y0").map(|projection| &projection.accessor) {
            Some(Accessor::Constant(value)) => Some(as_number(value)).filter(|value| value.is_finite()),
            _ => None,
        }
    }

    fn baseline_key(&self) -> String {
        format!("AREA_PLOT{}", self.core.base().id().get())
    }

    /// Register extents, skipping `skip`, and refresh the baseline exception.
    pub(crate) fn update_area_extents(&self, skip: &[&str]) {
        update_xy_extents(&self.core, self.auto_adjust, skip);
        sync_baseline(
            self.core.scale_of("y").as_ref(),
            &self.baseline_key(),
            self.constant_baseline(),
            false,
        );
    }

    pub(crate) fn teardown(&mut self) {
        sync_baseline(self.core.scale_of("y").as_ref(), &self.baseline_key(), None, false);
        self.core.teardown();
    }
}

impl fmt::Debug for AreaPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaPlot")
            .field("core", &self.core)
            .field("auto_adjust", &self.auto_adjust)
            .finish()
    }
}

impl Plot for AreaPlot {
    fn core(&self) -> &PlotCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlotCore {
        &mut self.core
    }

    fn generate_attr_to_projector(&self) -> AttrToProjector {
        let mut attrs = self.core.projectors();
        let defaults = [
            ("fill", Accessor::constant(DEFAULT_PALETTE[0])),
            ("fill-opacity", Accessor::constant(DEFAULT_FILL_OPACITY)),
            ("stroke", Accessor::constant(DEFAULT_PALETTE[0])),
        ];
        for (name, accessor) in defaults {
            attrs.entry(name.to_string()).or_insert_with(|| accessor.projector());
        }
        attrs
    }

    fn generate_draw_steps(&self) -> Vec<DrawStep> {
        let attrs = self.generate_attr_to_projector();
        if !self.core.is_animated() {
            return vec![DrawStep::new(attrs, Animator::Null)];
        }
        let mut flat = attrs.clone();
        if let Some(y0) = attrs.get("y0") {
            flat.insert("y".to_string(), y0.clone());
        }
        vec![
            DrawStep::new(flat, self.core.animator(RESET_ANIMATOR)),
            DrawStep::new(attrs, self.core.animator(MAIN_ANIMATOR)),
        ]
    }

    fn update_extents(&mut self) {
        self.update_area_extents(&[]);
    }

    fn before_draw(&mut self) {
        if self.auto_adjust != AutoAdjust::None {
            self.update_extents();
        }
    }
}

impl XyPlot for AreaPlot {
    fn auto_adjust(&self) -> AutoAdjust {
        self.auto_adjust
    }

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust {
        &mut self.auto_adjust
    }

    /// Bind the y position; the baseline moves to the same scale.
    fn y(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>) {
        let scale = scale.into();
        adopt_xy_scale(&scale);
        if let Some(previous) = self.core.scale_of("y") {
            sync_baseline(Some(&previous), &self.baseline_key(), None, false);
        }
        let y0 = self
            .core
            .projection("y0")
            .map(|projection| projection.accessor.clone())
            .unwrap_or_else(|| Accessor::constant(0.0));
        self.attr("y", accessor, Some(scale.clone()));
        self.attr("y0", y0, Some(scale));
    }
}

impl Component for AreaPlot {
    fn base(&self) -> &ComponentBase {
        self.core.base()
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        self.core.base_mut()
    }

    fn setup(&mut self) {
        self.core.setup();
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        set_xy_ranges(&self.core);
    }

    fn render_immediately(&mut self) {
        render_plot(self);
    }

    fn data_changed(&mut self) {
        self.refresh_extents();
    }

    fn on_remove(&mut self) {
        self.teardown();
    }
}
