//! Text labels.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::svg::{NodeId, format_number};
use crate::text::DEFAULT_FONT_SIZE;

use super::{Component, ComponentBase, SpaceRequest, XAlign, YAlign};

/// Reading direction of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrientation {
    /// Left to right.
    #[default]
    Horizontal,
    /// Bottom to top.
    Left,
    /// Top to bottom.
    Right,
}

impl LabelOrientation {
    fn rotation(self) -> f64 {
        match self {
            Self::Horizontal => 0.0,
            Self::Left => -90.0,
            Self::Right => 90.0,
        }
    }
}

impl FromStr for LabelOrientation {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Self::Horizontal),
            "left" | "vertical-left" => Ok(Self::Left),
            "right" | "vertical-right" => Ok(Self::Right),
            _ => Err(ChartError::InvalidOrientation(value.to_string())),
        }
    }
}

/// Styling variant, expressed as a CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelKind {
    /// `label`
    #[default]
    Plain,
    /// `label title-label`
    Title,
    /// `label axis-label`
    Axis,
}

impl LabelKind {
    fn classes(self) -> &'static str {
        match self {
            Self::Plain => "label",
            Self::Title => "label title-label",
            Self::Axis => "label axis-label",
        }
    }
}

/// A single line of text that asks for exactly the space it needs.
pub struct Label {
    base: ComponentBase,
    text: String,
    orientation: LabelOrientation,
    padding: f64,
    font_size: f64,
    text_container: Option<NodeId>,
}

impl Label {
    /// Plain label.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_kind(text, LabelKind::Plain)
    }

    /// Chart title.
    pub fn title(text: impl Into<String>) -> Self {
        Self::with_kind(text, LabelKind::Title)
    }

    /// Axis caption.
    pub fn axis(text: impl Into<String>) -> Self {
        Self::with_kind(text, LabelKind::Axis)
    }

    /// Label with an explicit styling variant.
    pub fn with_kind(text: impl Into<String>, kind: LabelKind) -> Self {
        let mut base = ComponentBase::new(kind.classes());
        base.set_x_align(XAlign::Center);
        base.set_y_align(YAlign::Center);
        Self {
            base,
            text: text.into(),
            orientation: LabelOrientation::Horizontal,
            padding: 0.0,
            font_size: DEFAULT_FONT_SIZE,
            text_container: None,
        }
    }

    /// Builder-style orientation.
    pub fn with_orientation(mut self, orientation: LabelOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Displayed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text and lay out again.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.base.hook().request_layout();
    }

    /// Reading direction.
    pub fn orientation(&self) -> LabelOrientation {
        self.orientation
    }

    /// Change the reading direction and lay out again.
    pub fn set_orientation(&mut self, orientation: LabelOrientation) {
        self.orientation = orientation;
        self.base.hook().request_layout();
    }

    /// Padding on every side.
    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Set the padding and lay out again.
    pub fn set_padding(&mut self, padding: f64) {
        self.padding = padding.max(0.0);
        self.base.hook().request_layout();
    }

    /// Font size in pixels.
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// Set the font size and lay out again.
    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
        self.base.hook().request_layout();
    }

    fn text_extent(&self) -> (f64, f64) {
        let (width, height) = self.base.measure_text(&self.text, self.font_size);
        match self.orientation {
            LabelOrientation::Horizontal => (width, height),
            LabelOrientation::Left | LabelOrientation::Right => (height, width),
        }
    }
}

impl Component for Label {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        let (width, height) = self.text_extent();
        SpaceRequest::new(width + 2.0 * self.padding, height + 2.0 * self.padding)
    }

    fn is_fixed_width(&self) -> bool {
        true
    }

    fn is_fixed_height(&self) -> bool {
        true
    }

    fn setup(&mut self) {
        let (Some(surface), Some(content)) = (self.base.surface(), self.base.content()) else {
            return;
        };
        let container = surface.document_mut().append(content, "g");
        surface.document_mut().add_class(container, "text-container");
        self.text_container = Some(container);
    }

    fn render_immediately(&mut self) {
        let (Some(surface), Some(container)) = (self.base.surface(), self.text_container) else {
            return;
        };
        let (text_width, text_height) = self.text_extent();
        let (width, height) = (self.base.width(), self.base.height());
        let width_padding = ((width - text_width) / 2.0).min(self.padding).max(0.0);
        let height_padding = ((height - text_height) / 2.0).min(self.padding).max(0.0);
        let write_width = width - 2.0 * width_padding;
        let write_height = height - 2.0 * height_padding;

        let mut doc = surface.document_mut();
        doc.clear_children(container);
        doc.set_attr(
            container,
            "transform",
            format!(
                "translate({},{})",
                format_number(width_padding),
                format_number(height_padding)
            ),
        );
        if self.text.is_empty() {
            return;
        }
        let center_x = write_width / 2.0;
        let center_y = write_height / 2.0;
        let node = doc.append(container, "text");
        doc.set_text(node, self.text.clone());
        doc.set_number(node, "font-size", self.font_size);
        doc.set_attr(node, "dominant-baseline", "central");
        match self.orientation {
            LabelOrientation::Horizontal => {
                let (anchor, x) = match self.base.x_align() {
                    XAlign::Left => ("start", 0.0),
                    XAlign::Center => ("middle", center_x),
                    XAlign::Right => ("end", write_width),
                };
                doc.set_attr(node, "text-anchor", anchor);
                doc.set_number(node, "x", x);
                doc.set_number(node, "y", center_y);
            }
            orientation => {
                doc.set_attr(node, "text-anchor", "middle");
                doc.set_attr(
                    node,
                    "transform",
                    format!(
                        "translate({},{}) rotate({})",
                        format_number(center_x),
                        format_number(center_y),
                        format_number(orientation.rotation())
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentRef, render_to, share};
    use crate::render_controller::RenderPolicy;
    use crate::surface::{ChartSurface, SurfaceConfig};

    #[test]
    fn vertical_labels_swap_request() {
        let horizontal = Label::new("abcd");
        let request = horizontal.requested_space(100.0, 100.0);
        assert!((request.min_width - 28.8).abs() < 1e-9);
        assert!((request.min_height - 14.4).abs() < 1e-9);
        let mut vertical = Label::new("abcd").with_orientation(LabelOrientation::Left);
        vertical.set_padding(2.0);
        let request = vertical.requested_space(100.0, 100.0);
        assert!((request.min_width - 18.4).abs() < 1e-9);
        assert!((request.min_height - 32.8).abs() < 1e-9);
    }

    #[test]
    fn renders_centered_text() {
        let surface = ChartSurface::with_config(
            200.0,
            100.0,
            SurfaceConfig {
                render_policy: RenderPolicy::Immediate,
                ..SurfaceConfig::default()
            },
        );
        let label = share(Label::title("Sales & <Costs>"));
        let handle: ComponentRef = label.clone();
        render_to(&handle, &surface).expect("render");
        let svg = surface.to_svg_string();
        assert!(svg.contains("class=\"component label title-label\""));
        assert!(svg.contains("Sales &amp; &lt;Costs&gt;"));
        assert!(svg.contains("text-anchor=\"middle\""));
        let origin = label.borrow().base().origin();
        let request = label.borrow().requested_space(200.0, 100.0);
        assert!((origin.x - (200.0 - request.min_width) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn orientation_parses() {
        assert_eq!("LEFT".parse::<LabelOrientation>(), Ok(LabelOrientation::Left));
        assert!(matches!(
            "diagonal".parse::<LabelOrientation>(),
            Err(ChartError::InvalidOrientation(_))
        ));
    }
}
