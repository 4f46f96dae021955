//! Minimal structural diffs between element snapshots.
//!
//! A patch carries only the properties that changed. Nested objects are
//! flattened to the changed sub-object (a changed `style.fill` travels as
//! `{style: {fill: ..}}`), so renderer strategies can apply one coherent
//! partial update instead of a pile of leaf writes.

use crate::element::{
    Element, ElementId, ImageAdjustments, RichTextSpan, SerializableColor, TextAlign,
    TextDecoration, TextStyle,
};
use serde::{Deserialize, Serialize};

/// Partial update of a [`crate::element::ShapeStyle`].
///
/// The double `Option` on nullable fields distinguishes "unchanged" from
/// "set to none".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Option<SerializableColor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Option<SerializableColor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl StylePatch {
    pub fn is_empty(&self) -> bool {
        self.fill.is_none()
            && self.stroke.is_none()
            && self.stroke_width.is_none()
            && self.opacity.is_none()
    }

    /// Per-key merge; incoming wins.
    pub fn merge(&mut self, incoming: StylePatch) {
        if incoming.fill.is_some() {
            self.fill = incoming.fill;
        }
        if incoming.stroke.is_some() {
            self.stroke = incoming.stroke;
        }
        if incoming.stroke_width.is_some() {
            self.stroke_width = incoming.stroke_width;
        }
        if incoming.opacity.is_some() {
            self.opacity = incoming.opacity;
        }
    }
}

/// Partial update of a [`TextStyle`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<crate::element::FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SerializableColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoration: Option<TextDecoration>,
}

impl TextStylePatch {
    pub fn is_empty(&self) -> bool {
        self == &TextStylePatch::default()
    }

    pub fn merge(&mut self, incoming: TextStylePatch) {
        macro_rules! take {
            ($field:ident) => {
                if incoming.$field.is_some() {
                    self.$field = incoming.$field;
                }
            };
        }
        take!(font_size);
        take!(font_family);
        take!(font_weight);
        take!(italic);
        take!(color);
        take!(text_align);
        take!(line_height);
        take!(decoration);
    }
}

/// Partial update of an [`crate::element::ElementTransform`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_y: Option<f64>,
}

impl TransformPatch {
    pub fn is_empty(&self) -> bool {
        self == &TransformPatch::default()
    }

    pub fn merge(&mut self, incoming: TransformPatch) {
        if incoming.scale_x.is_some() {
            self.scale_x = incoming.scale_x;
        }
        if incoming.scale_y.is_some() {
            self.scale_y = incoming.scale_y;
        }
        if incoming.pivot_x.is_some() {
            self.pivot_x = incoming.pivot_x;
        }
        if incoming.pivot_y.is_some() {
            self.pivot_y = incoming.pivot_y;
        }
    }
}

/// The changed properties of an element between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StylePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStylePatch>,
    /// Rich-text spans are replaced wholesale when they change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_text: Option<Vec<RichTextSpan>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustments: Option<Option<ImageAdjustments>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ElementId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl ElementPatch {
    pub fn is_empty(&self) -> bool {
        self == &ElementPatch::default()
    }

    /// True when the patch changes the local path geometry (requires a
    /// rebuild of the drawable path, not just a transform write).
    pub fn affects_geometry(&self) -> bool {
        self.width.is_some()
            || self.height.is_some()
            || self.border_radius.is_some()
            || self.content.is_some()
            || self.text_style.is_some()
            || self.rich_text.is_some()
            || self.children.is_some()
    }

    /// True when the patch changes paintable style.
    pub fn affects_paint(&self) -> bool {
        self.style.is_some() || self.adjustments.is_some() || self.src.is_some()
    }

    /// True when the patch only touches transform-level properties
    /// (position, rotation, scale, opacity, visibility, ordering).
    pub fn is_transform_only(&self) -> bool {
        !self.affects_geometry() && !self.affects_paint()
    }

    /// Merge `incoming` over this patch: incoming wins per key, nested
    /// sub-patches merge key-wise.
    pub fn merge(&mut self, incoming: ElementPatch) {
        macro_rules! take {
            ($field:ident) => {
                if incoming.$field.is_some() {
                    self.$field = incoming.$field;
                }
            };
        }
        take!(x);
        take!(y);
        take!(width);
        take!(height);
        take!(rotation);
        take!(opacity);
        take!(z_index);
        take!(version);
        take!(updated_at);
        take!(border_radius);
        take!(content);
        take!(rich_text);
        take!(src);
        take!(adjustments);
        take!(children);
        take!(visible);
        if let Some(incoming_style) = incoming.style {
            match &mut self.style {
                Some(existing) => existing.merge(incoming_style),
                None => self.style = Some(incoming_style),
            }
        }
        if let Some(incoming_text) = incoming.text_style {
            match &mut self.text_style {
                Some(existing) => existing.merge(incoming_text),
                None => self.text_style = Some(incoming_text),
            }
        }
        if let Some(incoming_transform) = incoming.transform {
            match &mut self.transform {
                Some(existing) => existing.merge(incoming_transform),
                None => self.transform = Some(incoming_transform),
            }
        }
    }
}

/// Structural diff of two snapshots of the same element.
///
/// Returns `None` when the snapshots are equal, or when the element type
/// changed (the caller must treat that as delete + create). The result
/// carries only the changed properties.
pub fn diff_elements(prev: &Element, next: &Element) -> Option<ElementPatch> {
    if prev.element_type() != next.element_type() {
        return None;
    }
    if prev == next {
        return None;
    }

    let mut patch = ElementPatch::default();
    diff_common(prev, next, &mut patch);

    match (prev, next) {
        (Element::Rect(p), Element::Rect(n)) => {
            patch.style = diff_style(&p.style, &n.style);
            if (p.border_radius - n.border_radius).abs() > f64::EPSILON {
                patch.border_radius = Some(n.border_radius);
            }
        }
        (Element::Circle(p), Element::Circle(n)) => {
            patch.style = diff_style(&p.style, &n.style);
        }
        (Element::Triangle(p), Element::Triangle(n)) => {
            patch.style = diff_style(&p.style, &n.style);
        }
        (Element::Text(p), Element::Text(n)) => {
            patch.style = diff_style(&p.style, &n.style);
            if p.content != n.content {
                patch.content = Some(n.content.clone());
            }
            patch.text_style = diff_text_style(&p.text_style, &n.text_style);
            if p.rich_text != n.rich_text {
                patch.rich_text = Some(n.rich_text.clone());
            }
        }
        (Element::Image(p), Element::Image(n)) => {
            patch.style = diff_style(&p.style, &n.style);
            if p.src != n.src {
                patch.src = Some(n.src.clone());
            }
            if p.adjustments != n.adjustments {
                patch.adjustments = Some(n.adjustments);
            }
        }
        (Element::Group(p), Element::Group(n)) => {
            if p.children != n.children {
                patch.children = Some(n.children.clone());
            }
        }
        // Type mismatch is handled above.
        _ => return None,
    }

    if patch.is_empty() {
        None
    } else {
        Some(patch)
    }
}

fn diff_common(prev: &Element, next: &Element, patch: &mut ElementPatch) {
    let (p, n) = (prev.common(), next.common());
    if (p.x - n.x).abs() > f64::EPSILON {
        patch.x = Some(n.x);
    }
    if (p.y - n.y).abs() > f64::EPSILON {
        patch.y = Some(n.y);
    }
    if (p.width - n.width).abs() > f64::EPSILON {
        patch.width = Some(n.width);
    }
    if (p.height - n.height).abs() > f64::EPSILON {
        patch.height = Some(n.height);
    }
    if (p.rotation - n.rotation).abs() > f64::EPSILON {
        patch.rotation = Some(n.rotation);
    }
    if (p.opacity - n.opacity).abs() > f64::EPSILON {
        patch.opacity = Some(n.opacity);
    }
    if p.z_index != n.z_index {
        patch.z_index = Some(n.z_index);
    }
    if p.version != n.version {
        patch.version = Some(n.version);
    }
    if p.updated_at != n.updated_at {
        patch.updated_at = Some(n.updated_at);
    }
    if p.visible != n.visible {
        patch.visible = Some(n.visible);
    }
    if p.transform != n.transform {
        let mut t = TransformPatch::default();
        if (p.transform.scale_x - n.transform.scale_x).abs() > f64::EPSILON {
            t.scale_x = Some(n.transform.scale_x);
        }
        if (p.transform.scale_y - n.transform.scale_y).abs() > f64::EPSILON {
            t.scale_y = Some(n.transform.scale_y);
        }
        if (p.transform.pivot_x - n.transform.pivot_x).abs() > f64::EPSILON {
            t.pivot_x = Some(n.transform.pivot_x);
        }
        if (p.transform.pivot_y - n.transform.pivot_y).abs() > f64::EPSILON {
            t.pivot_y = Some(n.transform.pivot_y);
        }
        if !t.is_empty() {
            patch.transform = Some(t);
        }
    }
}

fn diff_style(
    prev: &crate::element::ShapeStyle,
    next: &crate::element::ShapeStyle,
) -> Option<StylePatch> {
    if prev == next {
        return None;
    }
    let mut patch = StylePatch::default();
    if prev.fill != next.fill {
        patch.fill = Some(next.fill);
    }
    if prev.stroke != next.stroke {
        patch.stroke = Some(next.stroke);
    }
    if (prev.stroke_width - next.stroke_width).abs() > f64::EPSILON {
        patch.stroke_width = Some(next.stroke_width);
    }
    if (prev.opacity - next.opacity).abs() > f64::EPSILON {
        patch.opacity = Some(next.opacity);
    }
    if patch.is_empty() {
        None
    } else {
        Some(patch)
    }
}

fn diff_text_style(prev: &TextStyle, next: &TextStyle) -> Option<TextStylePatch> {
    if prev == next {
        return None;
    }
    let mut patch = TextStylePatch::default();
    if (prev.font_size - next.font_size).abs() > f64::EPSILON {
        patch.font_size = Some(next.font_size);
    }
    if prev.font_family != next.font_family {
        patch.font_family = Some(next.font_family.clone());
    }
    if prev.font_weight != next.font_weight {
        patch.font_weight = Some(next.font_weight);
    }
    if prev.italic != next.italic {
        patch.italic = Some(next.italic);
    }
    if prev.color != next.color {
        patch.color = Some(next.color);
    }
    if prev.text_align != next.text_align {
        patch.text_align = Some(next.text_align);
    }
    if (prev.line_height - next.line_height).abs() > f64::EPSILON {
        patch.line_height = Some(next.line_height);
    }
    if prev.decoration != next.decoration {
        patch.decoration = Some(next.decoration);
    }
    if patch.is_empty() {
        None
    } else {
        Some(patch)
    }
}

impl Element {
    /// Apply a patch to this element snapshot in place.
    ///
    /// Used when coalescing an UPDATE into a pending CREATE, and by the
    /// engine to keep its element snapshots current.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        {
            let common = self.common_mut();
            if let Some(x) = patch.x {
                common.x = x;
            }
            if let Some(y) = patch.y {
                common.y = y;
            }
            if let Some(width) = patch.width {
                common.width = width;
            }
            if let Some(height) = patch.height {
                common.height = height;
            }
            if let Some(rotation) = patch.rotation {
                common.rotation = rotation;
            }
            if let Some(opacity) = patch.opacity {
                common.opacity = opacity.clamp(0.0, 1.0);
            }
            if let Some(z_index) = patch.z_index {
                common.z_index = z_index;
            }
            if let Some(version) = patch.version {
                common.version = version;
            }
            if let Some(updated_at) = patch.updated_at {
                common.updated_at = updated_at;
            }
            if let Some(visible) = patch.visible {
                common.visible = visible;
            }
            if let Some(t) = &patch.transform {
                if let Some(sx) = t.scale_x {
                    common.transform.scale_x = sx;
                }
                if let Some(sy) = t.scale_y {
                    common.transform.scale_y = sy;
                }
                if let Some(px) = t.pivot_x {
                    common.transform.pivot_x = px;
                }
                if let Some(py) = t.pivot_y {
                    common.transform.pivot_y = py;
                }
            }
        }

        if let Some(style_patch) = &patch.style {
            if let Some(style) = self.style_mut() {
                if let Some(fill) = style_patch.fill {
                    style.fill = fill;
                }
                if let Some(stroke) = style_patch.stroke {
                    style.stroke = stroke;
                }
                if let Some(width) = style_patch.stroke_width {
                    style.stroke_width = width;
                }
                if let Some(opacity) = style_patch.opacity {
                    style.opacity = opacity;
                }
            }
        }

        match self {
            Element::Rect(rect) => {
                if let Some(radius) = patch.border_radius {
                    rect.border_radius = radius;
                }
            }
            Element::Text(text) => {
                if let Some(content) = &patch.content {
                    text.content = content.clone();
                }
                if let Some(ts) = &patch.text_style {
                    apply_text_style_patch(&mut text.text_style, ts);
                }
                if let Some(spans) = &patch.rich_text {
                    text.rich_text = spans.clone();
                }
            }
            Element::Image(image) => {
                if let Some(src) = &patch.src {
                    image.src = src.clone();
                }
                if let Some(adjustments) = patch.adjustments {
                    image.adjustments = adjustments;
                }
            }
            Element::Group(group) => {
                if let Some(children) = &patch.children {
                    group.children = children.clone();
                }
            }
            Element::Circle(_) | Element::Triangle(_) => {}
        }
    }
}

fn apply_text_style_patch(style: &mut TextStyle, patch: &TextStylePatch) {
    if let Some(size) = patch.font_size {
        style.font_size = size;
    }
    if let Some(family) = &patch.font_family {
        style.font_family = family.clone();
    }
    if let Some(weight) = patch.font_weight {
        style.font_weight = weight;
    }
    if let Some(italic) = patch.italic {
        style.italic = italic;
    }
    if let Some(color) = patch.color {
        style.color = color;
    }
    if let Some(align) = patch.text_align {
        style.text_align = align;
    }
    if let Some(lh) = patch.line_height {
        style.line_height = lh;
    }
    if let Some(decoration) = patch.decoration {
        style.decoration = decoration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ShapeStyle;

    #[test]
    fn test_diff_equal_is_none() {
        let rect = Element::rect(0.0, 0.0, 100.0, 100.0);
        assert!(diff_elements(&rect, &rect.clone()).is_none());
    }

    #[test]
    fn test_diff_fill_only_is_minimal() {
        let rect = Element::rect(0.0, 0.0, 100.0, 100.0);
        let mut changed = rect.clone();
        if let Some(style) = changed.style_mut() {
            style.fill = Some(SerializableColor::from_hex("#f00"));
        }

        let patch = diff_elements(&rect, &changed).unwrap();
        let expected = ElementPatch {
            style: Some(StylePatch {
                fill: Some(Some(SerializableColor::from_hex("#f00"))),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(patch, expected);
    }

    #[test]
    fn test_diff_position_only_is_transform_only() {
        let rect = Element::rect(0.0, 0.0, 100.0, 100.0);
        let mut moved = rect.clone();
        moved.common_mut().x = 50.0;
        moved.common_mut().rotation = 15.0;

        let patch = diff_elements(&rect, &moved).unwrap();
        assert!(patch.is_transform_only());
        assert_eq!(patch.x, Some(50.0));
        assert_eq!(patch.rotation, Some(15.0));
        assert!(patch.y.is_none());
    }

    #[test]
    fn test_diff_type_change_is_none() {
        let rect = Element::rect(0.0, 0.0, 10.0, 10.0);
        let circle = Element::circle(0.0, 0.0, 10.0, 10.0);
        assert!(diff_elements(&rect, &circle).is_none());
    }

    #[test]
    fn test_merge_incoming_wins() {
        let mut base = ElementPatch {
            x: Some(1.0),
            y: Some(2.0),
            ..Default::default()
        };
        base.merge(ElementPatch {
            x: Some(10.0),
            rotation: Some(45.0),
            ..Default::default()
        });
        assert_eq!(base.x, Some(10.0));
        assert_eq!(base.y, Some(2.0));
        assert_eq!(base.rotation, Some(45.0));
    }

    #[test]
    fn test_merge_nested_style_keywise() {
        let mut base = ElementPatch {
            style: Some(StylePatch {
                fill: Some(Some(SerializableColor::black())),
                stroke_width: Some(1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        base.merge(ElementPatch {
            style: Some(StylePatch {
                stroke_width: Some(4.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        let style = base.style.unwrap();
        assert_eq!(style.fill, Some(Some(SerializableColor::black())));
        assert_eq!(style.stroke_width, Some(4.0));
    }

    #[test]
    fn test_apply_patch_roundtrip() {
        let prev = Element::rect(0.0, 0.0, 100.0, 100.0).with_style(ShapeStyle::default());
        let mut next = prev.clone();
        next.common_mut().x = 30.0;
        if let Some(style) = next.style_mut() {
            style.fill = Some(SerializableColor::white());
        }
        if let Element::Rect(r) = &mut next {
            r.border_radius = 8.0;
        }

        let patch = diff_elements(&prev, &next).unwrap();
        let mut applied = prev.clone();
        applied.apply_patch(&patch);
        assert_eq!(applied, next);
    }

    #[test]
    fn test_text_diff_flattens_to_subobject() {
        let text = Element::text(0.0, 0.0, 200.0, "hello");
        let mut changed = text.clone();
        if let Element::Text(t) = &mut changed {
            t.text_style.font_size = 32.0;
        }
        let patch = diff_elements(&text, &changed).unwrap();
        let ts = patch.text_style.unwrap();
        assert_eq!(ts.font_size, Some(32.0));
        assert!(ts.font_family.is_none());
        assert!(patch.content.is_none());
    }
}
