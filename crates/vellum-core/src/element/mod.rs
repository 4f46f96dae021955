//! Element definitions for the design canvas.

mod image;
mod style;
mod text;

pub use image::{ImageAdjustments, ImageFormat, MAX_BLUR_RADIUS};
pub use style::{SerializableColor, ShapeStyle};
pub use text::{
    spans_are_well_formed, FontWeight, ResolvedSpanStyle, RichTextSpan, SpanStyle, TextAlign,
    TextDecoration, TextStyle,
};

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Discriminant of the [`Element`] union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Rect,
    Circle,
    Triangle,
    Text,
    Image,
    Group,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Rect => "rect",
            ElementType::Circle => "circle",
            ElementType::Triangle => "triangle",
            ElementType::Text => "text",
            ElementType::Image => "image",
            ElementType::Group => "group",
        }
    }
}

/// Scale and fractional pivot of an element.
///
/// The pivot is relative to the element's width/height (0.5/0.5 = center).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub pivot_x: f64,
    pub pivot_y: f64,
}

impl Default for ElementTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            pivot_x: 0.5,
            pivot_y: 0.5,
        }
    }
}

/// Fields shared by every element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementCommon {
    pub id: ElementId,
    /// Top-left of the axis-aligned local box, before transform.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees around the pivot.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub transform: ElementTransform,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
    /// Back-reference to the owning group, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ElementId>,
    /// Transient visibility flag (hide-during-edit). Not persisted, so a
    /// freshly-deserialized element always comes back visible.
    #[serde(skip, default = "default_visible")]
    pub visible: bool,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_visible() -> bool {
    true
}

impl ElementCommon {
    /// Create common fields for a new element at the given local box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            opacity: 1.0,
            transform: ElementTransform::default(),
            z_index: 0,
            version: 0,
            created_at: 0,
            updated_at: 0,
            parent_id: None,
            visible: true,
        }
    }

    /// The untransformed axis-aligned local box.
    pub fn local_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Absolute pivot point in world coordinates.
    pub fn pivot_point(&self) -> Point {
        Point::new(
            self.x + self.transform.pivot_x * self.width,
            self.y + self.transform.pivot_y * self.height,
        )
    }
}

/// Rectangle element with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectElement {
    #[serde(flatten)]
    pub common: ElementCommon,
    pub style: ShapeStyle,
    /// Corner radius; clamped to half the shorter side when rendered.
    #[serde(default)]
    pub border_radius: f64,
}

/// Ellipse element (the local box is its bounding box).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleElement {
    #[serde(flatten)]
    pub common: ElementCommon,
    pub style: ShapeStyle,
}

/// Isoceles triangle element (apex top-center, base along the bottom edge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleElement {
    #[serde(flatten)]
    pub common: ElementCommon,
    pub style: ShapeStyle,
}

/// Text element with optional rich-text spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(flatten)]
    pub common: ElementCommon,
    pub content: String,
    pub text_style: TextStyle,
    /// Sorted, non-overlapping byte-range spans over `content`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rich_text: Vec<RichTextSpan>,
    /// Background fill / border paint.
    pub style: ShapeStyle,
}

/// Image element referencing a decodable resource by `src`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    #[serde(flatten)]
    pub common: ElementCommon,
    /// Resource key resolved through the resource manager.
    pub src: String,
    pub natural_width: u32,
    pub natural_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustments: Option<ImageAdjustments>,
    /// Border paint.
    pub style: ShapeStyle,
    /// Embedded image payload, if the document carries the bytes inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
}

/// Group element. Its own box is always rederived from its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupElement {
    #[serde(flatten)]
    pub common: ElementCommon,
    pub children: Vec<ElementId>,
}

/// Tagged union over all element types, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Rect(RectElement),
    Circle(CircleElement),
    Triangle(TriangleElement),
    Text(TextElement),
    Image(ImageElement),
    Group(GroupElement),
}

impl Element {
    /// Create a rectangle element.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Element::Rect(RectElement {
            common: ElementCommon::new(x, y, width, height),
            style: ShapeStyle::default(),
            border_radius: 0.0,
        })
    }

    /// Create an ellipse element.
    pub fn circle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Element::Circle(CircleElement {
            common: ElementCommon::new(x, y, width, height),
            style: ShapeStyle::default(),
        })
    }

    /// Create a triangle element.
    pub fn triangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Element::Triangle(TriangleElement {
            common: ElementCommon::new(x, y, width, height),
            style: ShapeStyle::default(),
        })
    }

    /// Create a text element. The box height defaults to one line.
    pub fn text(x: f64, y: f64, width: f64, content: impl Into<String>) -> Self {
        let text_style = TextStyle::default();
        let height = text_style.font_size * text_style.line_height;
        Element::Text(TextElement {
            common: ElementCommon::new(x, y, width, height),
            content: content.into(),
            text_style,
            rich_text: Vec::new(),
            style: ShapeStyle {
                stroke: None,
                ..ShapeStyle::default()
            },
        })
    }

    /// Create an image element sized to its natural dimensions.
    pub fn image(x: f64, y: f64, src: impl Into<String>, natural_width: u32, natural_height: u32) -> Self {
        Element::Image(ImageElement {
            common: ElementCommon::new(x, y, natural_width as f64, natural_height as f64),
            src: src.into(),
            natural_width,
            natural_height,
            adjustments: None,
            style: ShapeStyle {
                stroke: None,
                ..ShapeStyle::default()
            },
            data_base64: None,
        })
    }

    /// Create a group over the given children. The box is recomputed by
    /// [`Element::bounds_of`]; the stored values are a placeholder.
    pub fn group(children: Vec<ElementId>) -> Self {
        Element::Group(GroupElement {
            common: ElementCommon::new(0.0, 0.0, 0.0, 0.0),
            children,
        })
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        if let Some(s) = self.style_mut() {
            *s = style;
        }
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.common_mut().rotation = degrees;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.common_mut().z_index = z_index;
        self
    }

    pub fn id(&self) -> ElementId {
        self.common().id
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Element::Rect(_) => ElementType::Rect,
            Element::Circle(_) => ElementType::Circle,
            Element::Triangle(_) => ElementType::Triangle,
            Element::Text(_) => ElementType::Text,
            Element::Image(_) => ElementType::Image,
            Element::Group(_) => ElementType::Group,
        }
    }

    pub fn common(&self) -> &ElementCommon {
        match self {
            Element::Rect(e) => &e.common,
            Element::Circle(e) => &e.common,
            Element::Triangle(e) => &e.common,
            Element::Text(e) => &e.common,
            Element::Image(e) => &e.common,
            Element::Group(e) => &e.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ElementCommon {
        match self {
            Element::Rect(e) => &mut e.common,
            Element::Circle(e) => &mut e.common,
            Element::Triangle(e) => &mut e.common,
            Element::Text(e) => &mut e.common,
            Element::Image(e) => &mut e.common,
            Element::Group(e) => &mut e.common,
        }
    }

    /// Paint style, if this element type carries one (groups do not).
    pub fn style(&self) -> Option<&ShapeStyle> {
        match self {
            Element::Rect(e) => Some(&e.style),
            Element::Circle(e) => Some(&e.style),
            Element::Triangle(e) => Some(&e.style),
            Element::Text(e) => Some(&e.style),
            Element::Image(e) => Some(&e.style),
            Element::Group(_) => None,
        }
    }

    pub fn style_mut(&mut self) -> Option<&mut ShapeStyle> {
        match self {
            Element::Rect(e) => Some(&mut e.style),
            Element::Circle(e) => Some(&mut e.style),
            Element::Triangle(e) => Some(&mut e.style),
            Element::Text(e) => Some(&mut e.style),
            Element::Image(e) => Some(&mut e.style),
            Element::Group(_) => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Element::Group(_))
    }

    pub fn as_group(&self) -> Option<&GroupElement> {
        match self {
            Element::Group(g) => Some(g),
            _ => None,
        }
    }

    /// World-space axis-aligned bounds of this element.
    ///
    /// A group's own stored box is never authoritative: its bounds are
    /// recomputed recursively bottom-up from the live children via
    /// `resolve`. Missing children are skipped.
    pub fn bounds_of(&self, resolve: &dyn Fn(ElementId) -> Option<Element>) -> Rect {
        match self {
            Element::Group(group) => {
                let mut bounds: Option<Rect> = None;
                for &child_id in &group.children {
                    if let Some(child) = resolve(child_id) {
                        let child_bounds = child.bounds_of(resolve);
                        bounds = Some(match bounds {
                            Some(b) => b.union(child_bounds),
                            None => child_bounds,
                        });
                    }
                }
                bounds.unwrap_or(Rect::ZERO)
            }
            _ => {
                let outline = crate::geometry::world_outline_flat(self);
                crate::geometry::aabb_of(&outline).unwrap_or_else(|| self.common().local_rect())
            }
        }
    }

    /// Hit test in world coordinates.
    ///
    /// Groups hit on their recomputed bounding box; other elements hit on
    /// their transformed outline polygon, inflated by `tolerance`.
    pub fn hit_test(
        &self,
        point: Point,
        tolerance: f64,
        resolve: &dyn Fn(ElementId) -> Option<Element>,
    ) -> bool {
        match self {
            Element::Group(_) => self
                .bounds_of(resolve)
                .inflate(tolerance, tolerance)
                .contains(point),
            _ => {
                let outline = crate::geometry::world_outline_flat(self);
                if crate::geometry::point_in_polygon(point, &outline) {
                    return true;
                }
                tolerance > 0.0
                    && crate::geometry::distance_to_polygon(point, &outline) <= tolerance
            }
        }
    }

    /// Model-level validation.
    ///
    /// Groups are exempt from the dimension check: their box is rederived
    /// from children and may legitimately be empty.
    pub fn validate(&self) -> Result<(), crate::error::ElementError> {
        let common = self.common();
        if !self.is_group() && (common.width <= 0.0 || common.height <= 0.0) {
            return Err(crate::error::ElementError::InvalidDimensions {
                width: common.width,
                height: common.height,
            });
        }
        if let Element::Text(text) = self {
            if !text.rich_text.is_empty()
                && !spans_are_well_formed(&text.rich_text, &text.content)
            {
                return Err(crate::error::ElementError::MalformedSpans(common.id));
            }
        }
        Ok(())
    }

    /// Replace the element's ID (used when duplicating or pasting).
    pub fn regenerate_id(&mut self) {
        self.common_mut().id = Uuid::new_v4();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_creation() {
        let rect = Element::rect(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.element_type(), ElementType::Rect);
        let c = rect.common();
        assert!((c.x - 10.0).abs() < f64::EPSILON);
        assert!((c.width - 100.0).abs() < f64::EPSILON);
        assert!(c.visible);
    }

    #[test]
    fn test_group_has_no_style() {
        let group = Element::group(vec![]);
        assert!(group.style().is_none());
        assert!(group.is_group());
    }

    #[test]
    fn test_serde_tag_roundtrip() {
        let circle = Element::circle(0.0, 0.0, 40.0, 40.0);
        let json = serde_json::to_string(&circle).unwrap();
        assert!(json.contains("\"type\":\"circle\""));
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back.element_type(), ElementType::Circle);
        assert_eq!(back.id(), circle.id());
    }

    #[test]
    fn test_visibility_not_persisted() {
        let mut rect = Element::rect(0.0, 0.0, 10.0, 10.0);
        rect.common_mut().visible = false;
        let json = serde_json::to_string(&rect).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        // Transient flag resets on deserialization.
        assert!(back.common().visible);
    }

    #[test]
    fn test_group_bounds_recomputed_from_children() {
        let a = Element::rect(0.0, 0.0, 100.0, 100.0);
        let b = Element::rect(200.0, 200.0, 50.0, 50.0);
        let group = Element::group(vec![a.id(), b.id()]);

        let pool = vec![a, b];
        let resolve = |id: ElementId| pool.iter().find(|e| e.id() == id).cloned();
        let bounds = group.bounds_of(&resolve);
        assert!((bounds.x0 - 0.0).abs() < 1e-9);
        assert!((bounds.x1 - 250.0).abs() < 1e-9);
        assert!((bounds.y1 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_elements() {
        use crate::error::ElementError;

        let flat = Element::rect(0.0, 0.0, 0.0, 10.0);
        assert!(matches!(
            flat.validate(),
            Err(ElementError::InvalidDimensions { .. })
        ));

        let mut text = Element::text(0.0, 0.0, 100.0, "héllo");
        if let Element::Text(t) = &mut text {
            t.rich_text = vec![RichTextSpan::new(0, 2, SpanStyle::default())];
        }
        assert!(matches!(
            text.validate(),
            Err(ElementError::MalformedSpans(_))
        ));

        assert!(Element::group(vec![]).validate().is_ok());
        assert!(Element::rect(0.0, 0.0, 10.0, 10.0).validate().is_ok());
    }

    #[test]
    fn test_hit_test_rotated_rect() {
        let rect = Element::rect(0.0, 0.0, 100.0, 100.0).with_rotation(45.0);
        let resolve = |_| None;
        // Center always hits.
        assert!(rect.hit_test(Point::new(50.0, 50.0), 0.0, &resolve));
        // The unrotated corner is outside the rotated square.
        assert!(!rect.hit_test(Point::new(2.0, 2.0), 0.0, &resolve));
    }
}
