//! Axis for time scales, drawn as up to two tiers of calendar-aligned ticks.
//!
//! The axis holds a list of tier configurations ordered from most to least
//! precise and, on every render, picks the first one whose labels fit the
//! available width.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcaster::ListenerKey;
use crate::component::{Component, ComponentBase, LayoutOffer, SpaceRequest, layout_component};
use crate::error::{ChartError, Result};
use crate::format::Formatter;
use crate::scale::{QuantitativeKind, QuantitativeScale, Scale};
use crate::svg::{NodeId, SvgDocument};

use super::{Axis, AxisCore, AxisOrientation, TICK_LABEL_CLASS, TICK_MARK_CLASS};

/// Class of each tier group.
pub const TIME_AXIS_TIER_CLASS: &str = "time-axis-tier";

/// Most tiers a configuration may have.
pub const MAX_TIERS: usize = 2;

const SECOND: i64 = 1;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

// Unit boundaries walked per tier before a configuration is rejected.
const MAX_UNITS: f64 = 100_000.0;

/// Calendar unit a tier is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInterval {
    Second,
    Minute,
    Hour,
    Day,
    /// Weeks start on Sunday.
    Week,
    Month,
    Year,
}

impl TimeInterval {
    fn seconds(self) -> Option<i64> {
        match self {
            Self::Second => Some(SECOND),
            Self::Minute => Some(MINUTE),
            Self::Hour => Some(HOUR),
            Self::Day => Some(DAY),
            Self::Week => Some(WEEK),
            Self::Month | Self::Year => None,
        }
    }

    /// Rough length in milliseconds, used to bound tick enumeration.
    fn approximate_millis(self) -> f64 {
        match self {
            Self::Month => 30.44 * DAY as f64 * 1000.0,
            Self::Year => 365.25 * DAY as f64 * 1000.0,
            fixed => fixed.seconds().unwrap_or(DAY) as f64 * 1000.0,
        }
    }

    /// Start of the interval containing `time`.
    pub fn floor(self, time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Second | Self::Minute | Self::Hour | Self::Day => {
                let unit = self.seconds().unwrap_or(SECOND);
                DateTime::from_timestamp(time.timestamp().div_euclid(unit) * unit, 0)
            }
            Self::Week => {
                let day = Self::Day.floor(time)?;
                let back = i64::from(day.weekday().num_days_from_sunday());
                DateTime::from_timestamp(day.timestamp() - back * DAY, 0)
            }
            Self::Month => time
                .date_naive()
                .with_day(1)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|start| start.and_utc()),
            Self::Year => time
                .date_naive()
                .with_ordinal(1)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|start| start.and_utc()),
        }
    }

    /// Boundary one unit after `time`.
    pub fn next(self, time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Month => time.checked_add_months(Months::new(1)),
            Self::Year => time.checked_add_months(Months::new(12)),
            fixed => {
                let unit = fixed.seconds().unwrap_or(SECOND);
                DateTime::from_timestamp(time.timestamp() + unit, 0)
            }
        }
    }

    /// Position of a boundary within its parent unit, used for step alignment.
    fn ordinal(self, time: DateTime<Utc>) -> i64 {
        match self {
            Self::Second => i64::from(time.second()),
            Self::Minute => i64::from(time.minute()),
            Self::Hour => i64::from(time.hour()),
            Self::Day => i64::from(time.day0()),
            // 1970-01-04 was the first Sunday after the epoch.
            Self::Week => (time.timestamp() - 3 * DAY).div_euclid(WEEK),
            Self::Month => i64::from(time.month0()),
            Self::Year => i64::from(time.year()),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl FromStr for TimeInterval {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "second" => Ok(Self::Second),
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(ChartError::InvalidOption {
                kind: "time interval",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where tier labels sit relative to their tick marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierLabelPosition {
    /// Centred in the span up to the next tick.
    #[default]
    Between,
    /// Centred on the tick.
    Center,
}

impl FromStr for TierLabelPosition {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "between" => Ok(Self::Between),
            "center" => Ok(Self::Center),
            _ => Err(ChartError::InvalidOption {
                kind: "tier label position",
                value: value.to_string(),
            }),
        }
    }
}

/// One tier: ticks every `step` units of `interval`, labelled by `formatter`.
#[derive(Debug, Clone)]
pub struct TimeTierConfig {
    pub interval: TimeInterval,
    pub step: u32,
    pub formatter: Formatter,
}

impl TimeTierConfig {
    pub fn new(interval: TimeInterval, step: u32, pattern: &str) -> Self {
        Self {
            interval,
            step: step.max(1),
            formatter: Formatter::time(pattern),
        }
    }
}

/// Tiers drawn together, nearest the baseline first.
pub type TimeAxisConfiguration = Vec<TimeTierConfig>;

/// Built-in configurations from seconds up to millennia.
pub fn default_configurations() -> Vec<TimeAxisConfiguration> {
    use TimeInterval::*;

    let with_date = |interval, step, pattern| {
        vec![
            TimeTierConfig::new(interval, step, pattern),
            TimeTierConfig::new(Day, 1, "%B %e, %Y"),
        ]
    };
    let with_month = |pattern| {
        vec![
            TimeTierConfig::new(Day, 1, pattern),
            TimeTierConfig::new(Month, 1, "%B %Y"),
        ]
    };
    let with_year = |step, pattern| {
        vec![
            TimeTierConfig::new(Month, step, pattern),
            TimeTierConfig::new(Year, 1, "%Y"),
        ]
    };

    let mut configurations = Vec::new();
    for step in [1, 5, 10, 15, 30] {
        configurations.push(with_date(Second, step, "%I:%M:%S %p"));
    }
    for step in [1, 5, 10, 15, 30] {
        configurations.push(with_date(Minute, step, "%I:%M %p"));
    }
    for step in [1, 3, 6, 12] {
        configurations.push(with_date(Hour, step, "%I %p"));
    }
    configurations.push(with_month("%a %e"));
    configurations.push(with_month("%e"));
    configurations.push(with_year(1, "%B"));
    configurations.push(with_year(1, "%b"));
    configurations.push(with_year(3, "%b"));
    configurations.push(with_year(6, "%b"));
    configurations.push(vec![TimeTierConfig::new(Year, 1, "%Y")]);
    configurations.push(vec![TimeTierConfig::new(Year, 1, "%y")]);
    for step in [5, 25, 50, 100, 200, 500, 1000] {
        configurations.push(vec![TimeTierConfig::new(Year, step, "%Y")]);
    }
    configurations
}

/// Boundaries of `tier` inside `[start, end]` (epoch milliseconds), plus the
/// first boundary past `end`. `None` when the span holds too many units.
pub fn tier_boundaries(tier: &TimeTierConfig, start: f64, end: f64) -> Option<Vec<f64>> {
    let (low, high) = (start.min(end), start.max(end));
    if !low.is_finite() || !high.is_finite() {
        return None;
    }
    if (high - low) / tier.interval.approximate_millis() > MAX_UNITS {
        return None;
    }
    let step = i64::from(tier.step.max(1));
    let mut cursor = tier
        .interval
        .floor(DateTime::from_timestamp_millis(low.floor() as i64)?)?;
    let mut boundaries = Vec::new();
    loop {
        let millis = cursor.timestamp_millis() as f64;
        if tier.interval.ordinal(cursor).rem_euclid(step) == 0 {
            if millis > high {
                boundaries.push(millis);
                break;
            }
            if millis >= low {
                boundaries.push(millis);
            }
        }
        cursor = tier.interval.next(cursor)?;
    }
    Some(boundaries)
}

/// Tick marks grouped by tier, for a horizontal [`QuantitativeScale`] of kind time.
pub struct TimeAxis {
    base: ComponentBase,
    core: AxisCore,
    scale: QuantitativeScale,
    configurations: Vec<TimeAxisConfiguration>,
    tier_label_positions: [TierLabelPosition; MAX_TIERS],
    tiers: Vec<NodeId>,
}

/// A laid-out tier label: position, text, measured width.
struct TierLabel {
    position: f64,
    text: String,
    width: f64,
}

impl TimeAxis {
    /// Time axis on the top or bottom edge.
    pub fn new(scale: QuantitativeScale, orientation: AxisOrientation) -> Result<Self> {
        if !orientation.is_horizontal() {
            return Err(ChartError::InvalidOrientation(orientation.as_str().to_string()));
        }
        if scale.kind() != QuantitativeKind::Time {
            return Err(ChartError::InvalidOption {
                kind: "time axis scale",
                value: format!("{:?}", scale.kind()),
            });
        }
        let mut base = ComponentBase::new(&AxisCore::base_classes(orientation, "time-axis"));
        let core = AxisCore::new(orientation, Formatter::time("%Y-%m-%d"));
        core.apply_default_alignment(&mut base);
        let hook = base.hook().clone();
        scale
            .broadcaster()
            .register(ListenerKey::Id(base.id().get()), move |_: &Scale| hook.request_layout());
        Ok(Self {
            base,
            core,
            scale,
            configurations: default_configurations(),
            tier_label_positions: [TierLabelPosition::Between; MAX_TIERS],
            tiers: Vec::new(),
        })
    }

    pub fn scale(&self) -> &QuantitativeScale {
        &self.scale
    }

    pub fn configurations(&self) -> &[TimeAxisConfiguration] {
        &self.configurations
    }

    /// Replace the candidate configurations, most precise first.
    ///
    /// Each configuration needs one or two tiers.
    pub fn set_configurations(&mut self, configurations: Vec<TimeAxisConfiguration>) -> Result<()> {
        if configurations.is_empty() {
            return Err(ChartError::InvalidOption {
                kind: "time axis configurations",
                value: "[]".into(),
            });
        }
        if let Some(bad) = configurations
            .iter()
            .find(|tiers| tiers.is_empty() || tiers.len() > MAX_TIERS)
        {
            return Err(ChartError::InvalidOption {
                kind: "time axis tier count",
                value: bad.len().to_string(),
            });
        }
        self.configurations = configurations;
        self.base.hook().request_layout();
        Ok(())
    }

    pub fn tier_label_positions(&self) -> [TierLabelPosition; MAX_TIERS] {
        self.tier_label_positions
    }

    pub fn set_tier_label_positions(&mut self, positions: [TierLabelPosition; MAX_TIERS]) {
        self.tier_label_positions = positions;
        self.base.hook().request_render();
    }

    fn tier_count(&self) -> usize {
        self.configurations.iter().map(Vec::len).max().unwrap_or(1)
    }

    fn tier_height(&self) -> f64 {
        let (_, text_height) = self.base.measure_text("0", self.core.font_size);
        self.core.max_tick_length() + self.core.tick_label_padding + text_height
    }

    /// Index of the most precise configuration whose labels fit `length`.
    pub fn chosen_configuration(&self, length: f64) -> usize {
        let (start, end) = self.scale.domain();
        self.configurations
            .iter()
            .position(|tiers| {
                tiers
                    .iter()
                    .all(|tier| self.tier_fits(tier, start, end, length))
            })
            .unwrap_or(self.configurations.len().saturating_sub(1))
    }

    fn tier_fits(&self, tier: &TimeTierConfig, start: f64, end: f64, length: f64) -> bool {
        let span = (end - start).abs();
        if span <= 0.0 || length <= 0.0 {
            return true;
        }
        let Some(boundaries) = tier_boundaries(tier, start, end) else {
            return false;
        };
        if boundaries.len() as f64 > length + 2.0 {
            return false;
        }
        let pixels = length / span;
        let widest = boundaries
            .iter()
            .map(|value| {
                self.base
                    .measure_text(&tier.formatter.format_number(*value), self.core.font_size)
                    .0
            })
            .fold(0.0, f64::max);
        let spacing = boundaries
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) * pixels)
            .fold(f64::INFINITY, f64::min);
        // Centred and between labels both get one tick spacing each.
        !spacing.is_finite() || widest + self.core.tick_label_padding <= spacing + 1e-9
    }

    fn tier_labels(&self, tier: &TimeTierConfig, position: TierLabelPosition, boundaries: &[f64]) -> Vec<TierLabel> {
        let mut labels = Vec::new();
        for (index, value) in boundaries.iter().enumerate() {
            let text = tier.formatter.format_number(*value);
            let width = self.base.measure_text(&text, self.core.font_size).0;
            let here = self.scale.scale(*value);
            let at = match position {
                TierLabelPosition::Center => here,
                TierLabelPosition::Between => match boundaries.get(index + 1) {
                    Some(next) => (here + self.scale.scale(*next)) / 2.0,
                    None => continue,
                },
            };
            if at.is_finite() {
                labels.push(TierLabel {
                    position: at,
                    text,
                    width,
                });
            }
        }
        labels
    }

    fn draw_tier(&self, doc: &mut SvgDocument, group: NodeId, index: usize, tier: &TimeTierConfig) {
        let (width, height) = (self.base.width(), self.base.height());
        let (start, end) = self.scale.domain();
        let Some(boundaries) = tier_boundaries(tier, start, end) else {
            return;
        };
        let tier_height = self.tier_height();
        let bottom = self.core.orientation == AxisOrientation::Bottom;
        let top_edge = if bottom {
            index as f64 * tier_height
        } else {
            height - index as f64 * tier_height
        };
        let direction = if bottom { 1.0 } else { -1.0 };
        let mark_length = if index == 0 {
            self.core.tick_length
        } else {
            tier_height
        };

        for value in &boundaries {
            let position = self.scale.scale(*value);
            if !position.is_finite() || position < -1e-9 || position > width + 1e-9 {
                continue;
            }
            let line = doc.append(group, "line");
            doc.add_class(line, TICK_MARK_CLASS);
            doc.set_number(line, "x1", position);
            doc.set_number(line, "y1", top_edge);
            doc.set_number(line, "x2", position);
            doc.set_number(line, "y2", top_edge + direction * mark_length);
        }

        let offset = self.core.max_tick_length() + self.core.tick_label_padding;
        let y = top_edge + direction * offset;
        let mut last_shown_end = f64::NEG_INFINITY;
        let position = self.tier_label_positions[index.min(MAX_TIERS - 1)];
        for label in self.tier_labels(tier, position, &boundaries) {
            let node = doc.append(group, "text");
            doc.add_class(node, TICK_LABEL_CLASS);
            doc.set_text(node, label.text);
            doc.set_number(node, "font-size", self.core.font_size);
            doc.set_number(node, "x", label.position);
            doc.set_number(node, "y", y);
            doc.set_attr(node, "text-anchor", "middle");
            doc.set_attr(node, "dominant-baseline", if bottom { "hanging" } else { "text-after-edge" });
            let (from, to) = (label.position - label.width / 2.0, label.position + label.width / 2.0);
            let cut_off = from < -1e-9 || to > width + 1e-9;
            if (cut_off && !self.core.show_end_tick_labels) || from < last_shown_end {
                doc.set_attr(node, "visibility", "hidden");
            } else {
                last_shown_end = to;
            }
        }
    }
}

impl fmt::Debug for TimeAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeAxis")
            .field("base", &self.base)
            .field("core", &self.core)
            .field("scale", &self.scale)
            .field("configurations", &self.configurations.len())
            .field("tier_label_positions", &self.tier_label_positions)
            .finish()
    }
}

impl Axis for TimeAxis {
    fn core(&self) -> &AxisCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AxisCore {
        &mut self.core
    }

    fn set_orientation(&mut self, orientation: AxisOrientation) {
        if !orientation.is_horizontal() {
            tracing::warn!(?orientation, "time axes only support top and bottom orientations");
            return;
        }
        let previous = self.core.orientation;
        self.core.orientation = orientation;
        self.base
            .set_class(&format!("{}-axis", previous.as_str()), false);
        self.base
            .set_class(&format!("{}-axis", orientation.as_str()), true);
        self.base.hook().request_layout();
    }
}

impl Component for TimeAxis {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        let depth = self.tier_count() as f64 * self.tier_height() + self.core.gutter;
        SpaceRequest::new(0.0, depth)
    }

    fn is_fixed_width(&self) -> bool {
        false
    }

    fn is_fixed_height(&self) -> bool {
        true
    }

    fn setup(&mut self) {
        self.core.setup(&self.base);
        let (Some(surface), Some(content)) = (self.base.surface(), self.base.content()) else {
            return;
        };
        let mut doc = surface.document_mut();
        self.tiers = (0..MAX_TIERS)
            .map(|_| {
                let group = doc.append(content, "g");
                doc.add_class(group, TIME_AXIS_TIER_CLASS);
                group
            })
            .collect();
    }

    fn compute_layout(&mut self, offer: Option<LayoutOffer>) {
        layout_component(self, offer);
        self.scale.set_range(0.0, self.base.width());
    }

    fn render_immediately(&mut self) {
        let Some(surface) = self.base.surface() else {
            return;
        };
        let chosen = self.chosen_configuration(self.base.width());
        let mut doc = surface.document_mut();
        self.core.clear(&mut doc);
        self.core
            .draw_baseline(&mut doc, self.base.width(), self.base.height());
        for group in &self.tiers {
            doc.clear_children(*group);
        }
        let Some(tiers) = self.configurations.get(chosen) else {
            return;
        };
        tracing::trace!(chosen, tiers = tiers.len(), "time axis configuration");
        for (index, (tier, group)) in tiers.iter().zip(&self.tiers).enumerate() {
            self.draw_tier(&mut doc, *group, index, tier);
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
    use crate::component::{ComponentRef, render_to, share};
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};
    use chrono::TimeZone;

    fn millis(year: i32, month: u32, day: u32, hour: u32) -> f64 {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .expect("valid date")
            .timestamp_millis() as f64
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
    fn day_boundaries_fall_on_midnight() {
        let tier = TimeTierConfig::new(TimeInterval::Day, 1, "%e");
        let ticks = tier_boundaries(&tier, millis(2024, 1, 1, 6), millis(2024, 1, 3, 6)).expect("ticks");
        assert_eq!(
            ticks,
            vec![millis(2024, 1, 2, 0), millis(2024, 1, 3, 0), millis(2024, 1, 4, 0)]
        );
    }

    #[test]
    fn stepped_months_align_to_quarters() {
        let tier = TimeTierConfig::new(TimeInterval::Month, 3, "%b");
        let ticks = tier_boundaries(&tier, millis(2024, 2, 10, 0), millis(2024, 12, 1, 0)).expect("ticks");
        assert_eq!(
            ticks,
            vec![millis(2024, 4, 1, 0), millis(2024, 7, 1, 0), millis(2024, 10, 1, 0), millis(2025, 1, 1, 0)]
        );
    }

    #[test]
    fn weeks_start_on_sunday() {
        // 2024-01-03 was a Wednesday.
        let floor = TimeInterval::Week
            .floor(Utc.with_ymd_and_hms(2024, 1, 3, 15, 0, 0).single().expect("date"))
            .expect("floor");
        assert_eq!(floor.timestamp_millis() as f64, millis(2023, 12, 31, 0));
    }

    #[test]
    fn huge_spans_are_rejected_for_fine_tiers() {
        let tier = TimeTierConfig::new(TimeInterval::Second, 1, "%S");
        assert!(tier_boundaries(&tier, 0.0, millis(2024, 1, 1, 0)).is_none());
    }

    #[test]
    fn picks_the_most_precise_configuration_that_fits() {
        let scale = QuantitativeScale::time();
        scale
            .set_domain(millis(2024, 1, 1, 0), millis(2024, 1, 2, 0))
            .expect("domain");
        let axis = TimeAxis::new(scale, AxisOrientation::Bottom).expect("axis");
        // "12 AM" is 36 wide; hourly ticks are 16.7 apart, three-hourly ones 50.
        let chosen = &axis.configurations()[axis.chosen_configuration(400.0)];
        assert_eq!(chosen[0].interval, TimeInterval::Hour);
        assert_eq!(chosen[0].step, 3);
        assert_eq!(chosen[1].interval, TimeInterval::Day);
    }

    #[test]
    fn renders_two_tiers_and_reserves_their_height() {
        let surface = immediate_surface(400.0, 200.0);
        let scale = QuantitativeScale::time();
        scale
            .set_domain(millis(2024, 1, 1, 0), millis(2024, 1, 2, 0))
            .expect("domain");
        let axis = share(TimeAxis::new(scale.clone(), AxisOrientation::Bottom).expect("axis"));
        let as_dyn: ComponentRef = axis.clone();
        render_to(&as_dyn, &surface).expect("render");

        assert_eq!(scale.range(), (0.0, 400.0));
        // Two tiers of 5 + 10 + 14.4 plus the gutter.
        assert!((axis.borrow().base().height() - 73.8).abs() < 1e-9);

        let svg = surface.to_svg_string();
        assert_eq!(svg.matches("class=\"time-axis-tier\"").count(), 2);
        assert!(svg.contains(">03 AM</text>"));
        assert!(svg.contains(
            "x=\"200\" y=\"44.4\" text-anchor=\"middle\" dominant-baseline=\"hanging\">January  1, 2024</text>"
        ));
    }

    #[test]
    fn vertical_orientations_are_rejected() {
        let scale = QuantitativeScale::time();
        assert_eq!(
            TimeAxis::new(scale.clone(), AxisOrientation::Left).err(),
            Some(ChartError::InvalidOrientation("left".into()))
        );
        let mut axis = TimeAxis::new(scale, AxisOrientation::Top).expect("axis");
        axis.set_orientation(AxisOrientation::Right);
        assert_eq!(axis.orientation(), AxisOrientation::Top);
    }

    #[test]
    fn only_time_scales_are_accepted() {
        assert!(matches!(
            TimeAxis::new(QuantitativeScale::linear(), AxisOrientation::Bottom),
            Err(ChartError::InvalidOption { kind: "time axis scale", .. })
        ));
    }

    #[test]
    fn configurations_need_one_or_two_tiers() {
        let mut axis = TimeAxis::new(QuantitativeScale::time(), AxisOrientation::Bottom).expect("axis");
        let three = vec![TimeTierConfig::new(TimeInterval::Day, 1, "%e"); 3];
        assert!(axis.set_configurations(vec![three]).is_err());
        assert!(axis.set_configurations(Vec::new()).is_err());
        let single = vec![vec![TimeTierConfig::new(TimeInterval::Year, 1, "%Y")]];
        axis.set_configurations(single).expect("one tier");
        assert_eq!(axis.configurations().len(), 1);
        assert_eq!("center".parse::<TierLabelPosition>(), Ok(TierLabelPosition::Center));
        assert_eq!("Week".parse::<TimeInterval>(), Ok(TimeInterval::Week));
    }
}
