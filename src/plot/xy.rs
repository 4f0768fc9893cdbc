//! Plots positioned by an x and a y scale.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::accessor::Accessor;
use crate::error::{ChartError, Result};
use crate::extent::as_number;
use crate::scale::Scale;

use super::{DatumRef, Plot, PlotCore, update_projection_extents};

/// Which scale is re-domained from the data visible on the other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoAdjust {
    #[default]
    None,
    /// The y domain covers only records whose x is inside the x domain.
    YOverVisibleX,
    /// The x domain covers only records whose y is inside the y domain.
    XOverVisibleY,
}

impl FromStr for AutoAdjust {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "none" => Ok(Self::None),
            "y" | "y-over-visible-x" => Ok(Self::YOverVisibleX),
            "x" | "x-over-visible-y" => Ok(Self::XOverVisibleY),
            other => Err(ChartError::InvalidOption {
                kind: "auto-adjust mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Attributes placed along the x direction.
const X_FAMILY: [&str; 2] = ["x", "x2"];
/// Attributes placed along the y direction.
const Y_FAMILY: [&str; 3] = ["y", "y2", "y0"];

/// Operations of plots with an x and a y scale.
pub trait XyPlot: Plot {
    fn auto_adjust(&self) -> AutoAdjust;

    fn auto_adjust_slot(&mut self) -> &mut AutoAdjust;

    /// Choose which domain follows the visible data of the other.
    fn set_auto_adjust(&mut self, mode: AutoAdjust) {
        *self.auto_adjust_slot() = mode;
        self.refresh_extents();
    }

    /// Bind the x position.
    fn x(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>)
    where
        Self: Sized,
    {
        let scale = scale.into();
        adopt_xy_scale(&scale);
        self.attr("x", accessor, Some(scale));
    }

    /// Bind the y position.
    fn y(&mut self, accessor: impl Into<Accessor>, scale: impl Into<Scale>)
    where
        Self: Sized,
    {
        let scale = scale.into();
        adopt_xy_scale(&scale);
        self.attr("y", accessor, Some(scale));
    }

    fn x_scale(&self) -> Option<Scale> {
        self.core().scale_of("x")
    }

    fn y_scale(&self) -> Option<Scale> {
        self.core().scale_of("y")
    }

    /// Stop auto-adjusting and fit both scales to all data again.
    fn show_all_data(&mut self) {
        *self.auto_adjust_slot() = AutoAdjust::None;
        self.refresh_extents();
        for scale in [self.x_scale(), self.y_scale()].into_iter().flatten() {
            match &scale {
                Scale::Quantitative(scale) => scale.reset_domain(),
                Scale::Category(scale) => scale.reset_domain(),
                Scale::Color(scale) => scale.auto_domain(),
                Scale::InterpolatedColor(scale) => scale.reset_domain(),
            }
        }
    }
}

/// Plots pad and round the domains of the quantitative scales they position with.
pub(crate) fn adopt_xy_scale(scale: &Scale) {
    if let Some(scale) = scale.as_quantitative() {
        scale.adjust_default_domainer(|domainer| *domainer = std::mem::take(domainer).pad().nice());
    }
}

/// Keep a baseline value out of the padding of a quantitative scale.
///
/// `include` also forces the domain to cover the value. `None` drops both
/// entries registered under `key`.
pub(crate) fn sync_baseline(scale: Option<&Scale>, key: &str, value: Option<f64>, include: bool) {
    let Some(scale) = scale.and_then(Scale::as_quantitative) else {
        return;
    };
    scale.update_domainer(|domainer| {
        match value.filter(|value| value.is_finite()) {
            Some(value) => {
                domainer.add_padding_exception(value, Some(key));
                if include {
                    domainer.add_included_value(value, Some(key));
                }
            }
            None => {
                domainer.remove_padding_exception(0.0, Some(key));
                domainer.remove_included_value(0.0, Some(key));
            }
        }
    });
}

/// Point the x and y scales at the plot's pixel size.
pub(crate) fn set_xy_ranges(core: &PlotCore) {
    let (width, height) = (core.base().width(), core.base().height());
    if let Some(x) = core.scale_of("x") {
        x.set_range(0.0, width);
    }
    if let Some(y) = core.scale_of("y") {
        match y {
            Scale::Category(_) => y.set_range(0.0, height),
            _ => y.set_range(height, 0.0),
        }
    }
}

fn within_domain(scale: &Scale, value: &serde_json::Value) -> bool {
    match scale {
        Scale::Quantitative(scale) => {
            let (start, end) = scale.domain();
            let value = scale.coerce(value);
            value >= start.min(end) && value <= start.max(end)
        }
        Scale::InterpolatedColor(scale) => {
            let (low, high) = scale.domain();
            let value = as_number(value);
            value >= low.min(high) && value <= low.max(high)
        }
        Scale::Category(_) | Scale::Color(_) => !scale.scale(value).is_null(),
    }
}

/// Register extents, filtering one direction by the other's visible domain.
pub(crate) fn update_xy_extents(core: &PlotCore, mode: AutoAdjust, skip: &[&str]) {
    let filter = match mode {
        AutoAdjust::None => None,
        AutoAdjust::YOverVisibleX => Some((&Y_FAMILY[..], "x")),
        AutoAdjust::XOverVisibleY => Some((&X_FAMILY[..], "y")),
    };
    let Some((filtered, by)) = filter else {
        update_projection_extents(core, skip, |_, _| true);
        return;
    };
    let Some(projection) = core.projection(by) else {
        update_projection_extents(core, skip, |_, _| true);
        return;
    };
    let Some(scale) = projection.scale.clone() else {
        update_projection_extents(core, skip, |_, _| true);
        return;
    };
    let accessor = projection.accessor.projector();
    update_projection_extents(core, skip, |attribute, at: &DatumRef<'_>| {
        if !filtered.contains(&attribute) {
            return true;
        }
        let value = accessor(at.datum, at.index, at.user, at.metadata);
        within_domain(&scale, &value)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::dataset::Dataset;
    use crate::plot::ScatterPlot;
    use crate::scale::{Domainer, QuantitativeScale};

    #[test]
    fn auto_adjust_parses() {
        assert_eq!("y".parse::<AutoAdjust>(), Ok(AutoAdjust::YOverVisibleX));
        assert_eq!("x-over-visible-y".parse::<AutoAdjust>(), Ok(AutoAdjust::XOverVisibleY));
        assert!("z".parse::<AutoAdjust>().is_err());
    }

    #[test]
    fn y_domain_follows_visible_x() {
        let x = QuantitativeScale::linear();
        let y = QuantitativeScale::linear();
        let mut plot = ScatterPlot::new(x.clone(), y.clone());
        y.set_domainer(Domainer::new());
        plot.add_dataset(Dataset::new(vec![
            json!({"x": 1, "y": 10}),
            json!({"x": 2, "y": 20}),
            json!({"x": 9, "y": 90}),
        ]));
        assert_eq!(y.domain(), (10.0, 90.0));

        x.set_domain(0.0, 5.0).expect("domain");
        plot.set_auto_adjust(AutoAdjust::YOverVisibleX);
        assert_eq!(y.domain(), (10.0, 20.0));

        plot.show_all_data();
        assert_eq!(y.domain(), (10.0, 90.0));
        assert!(x.is_auto_domain());
    }

    #[test]
    fn position_scales_are_padded_and_rounded_by_default() {
        let x = QuantitativeScale::linear();
        let mut plot = ScatterPlot::new(x.clone(), QuantitativeScale::linear());
        plot.add_dataset(Dataset::new(vec![json!({"x": 0.3, "y": 1}), json!({"x": 9.6, "y": 2})]));
        let (start, end) = x.domain();
        assert!(start <= -0.1 && end >= 10.0);
        assert_eq!(start, start.round());
        assert_eq!(end, end.round());
    }
}
