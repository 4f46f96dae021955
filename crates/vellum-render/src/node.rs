//! Retained scene graph nodes.
//!
//! One node per live element, owned by the engine and keyed by element id.
//! Nodes carry fully resolved drawing data; the host's rasterizer walks
//! them without touching the element model.

use kurbo::{Affine, BezPath, Point, Rect};
use peniko::Color;
use std::sync::Arc;
use vellum_core::{ElementType, FontWeight, ShapeStyle};

use crate::resources::DecodedImage;

/// Stroke paint for a path.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePaint {
    pub color: Color,
    pub width: f64,
}

/// Filled and stroked vector path content.
#[derive(Debug, Clone, PartialEq)]
pub struct PathContent {
    pub path: BezPath,
    pub fill: Option<Color>,
    pub stroke: Option<StrokePaint>,
}

/// One composable image filter stage, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageFilter {
    /// Multiplier, 1.0 = neutral.
    Brightness(f64),
    Contrast(f64),
    Saturate(f64),
    Grayscale,
    /// Degrees.
    HueRotate(f64),
    /// Radius in pixels, already clamped.
    Blur(f64),
}

/// Image content: a decoded texture scaled into the element box.
#[derive(Debug, Clone)]
pub struct ImageContent {
    pub src: String,
    pub width: f64,
    pub height: f64,
    /// Decoded pixels, shared with the resource cache. `None` while the
    /// source is unavailable; `placeholder` is then drawn instead.
    pub texture: Option<Arc<DecodedImage>>,
    pub placeholder: bool,
    pub filters: Vec<ImageFilter>,
    pub border: Option<StrokePaint>,
}

/// A run of uniformly styled text positioned at a baseline origin.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub text: String,
    pub origin: Point,
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: FontWeight,
    pub italic: bool,
    pub color: Color,
}

/// Underline or strikethrough segment.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationLine {
    pub from: Point,
    pub to: Point,
    pub color: Color,
    pub width: f64,
}

/// Laid-out text content in three sub-layers, painted back to front:
/// background fill, glyph runs, decoration lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub background: Option<PathContent>,
    pub runs: Vec<GlyphRun>,
    pub decorations: Vec<DecorationLine>,
    /// Laid-out size, may exceed the element box vertically.
    pub layout_size: kurbo::Size,
}

/// Group content: no visible pixels, only a hit-testable region.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupContent {
    pub hit_region: Rect,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Path(PathContent),
    Image(ImageContent),
    Text(TextContent),
    Group(GroupContent),
}

/// A retained scene node.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Origin-space to world transform (translation, then scale and
    /// rotation about the pivot). Content is built with the element's
    /// top-left at (0, 0), so moves never rebuild it.
    pub transform: Affine,
    pub alpha: f64,
    pub visible: bool,
    pub kind: NodeKind,
}

impl SceneNode {
    pub fn new(transform: Affine, alpha: f64, kind: NodeKind) -> Self {
        Self {
            transform,
            alpha: alpha.clamp(0.0, 1.0),
            visible: true,
            kind,
        }
    }
}

/// Bookkeeping the engine keeps per node, parallel to the node map.
///
/// Strategies consult it to decide between an O(1) transform write and a
/// full geometry rebuild; drawables themselves stay free of such tags.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub element_type: ElementType,
    pub last_width: f64,
    pub last_height: f64,
    pub last_style: Option<ShapeStyle>,
    pub last_transform: Affine,
}

impl NodeRecord {
    pub fn for_element(element: &vellum_core::Element, transform: Affine) -> Self {
        let common = element.common();
        Self {
            element_type: element.element_type(),
            last_width: common.width,
            last_height: common.height,
            last_style: element.style().cloned(),
            last_transform: transform,
        }
    }
}
