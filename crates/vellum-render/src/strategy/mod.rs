//! Per-element-type renderer strategies and their registry.
//!
//! A strategy knows how to turn one element type into a scene node
//! (`materialize`) and how to apply an incremental patch to an existing
//! node (`patch`). Position, rotation, scale and opacity changes are O(1)
//! transform/alpha writes; only geometry or paint changes rebuild content.

mod ellipse;
mod group;
mod image;
mod rect;
mod text;
mod triangle;

pub use ellipse::EllipseRenderer;
pub use group::GroupRenderer;
pub use image::ImageRenderer;
pub use rect::RectRenderer;
pub use text::TextRenderer;
pub use triangle::TriangleRenderer;

use log::warn;
use std::collections::HashMap;
use vellum_core::geometry::node_transform;
use vellum_core::{Element, ElementError, ElementId, ElementPatch, ElementType};

use crate::error::RenderError;
use crate::node::{NodeRecord, SceneNode};
use crate::resources::{PreparedResources, TextMeasurer};

/// Collaborators a strategy may need while building or patching a node.
pub struct StrategyContext<'a> {
    pub resources: &'a PreparedResources,
    pub measurer: &'a dyn TextMeasurer,
    /// Element lookup for strategies that need siblings (groups).
    pub resolve: &'a dyn Fn(ElementId) -> Option<Element>,
}

/// Renders one element type into the retained scene graph.
pub trait RendererStrategy: std::fmt::Debug {
    fn element_type(&self) -> ElementType;

    /// Build a fresh scene node for a validated element.
    fn materialize(
        &self,
        element: &Element,
        ctx: &StrategyContext<'_>,
    ) -> Result<SceneNode, RenderError>;

    /// Apply an incremental patch. `element` is the post-patch snapshot.
    ///
    /// The default implementation writes transform and alpha in place and
    /// rebuilds the node content only when the patch touches geometry or
    /// paint.
    fn patch(
        &self,
        node: &mut SceneNode,
        record: &mut NodeRecord,
        element: &Element,
        patch: &ElementPatch,
        ctx: &StrategyContext<'_>,
    ) -> Result<(), RenderError> {
        if patch.affects_geometry() || patch.affects_paint() {
            let rebuilt = self.materialize(element, ctx)?;
            node.kind = rebuilt.kind;
        }
        apply_transform_patch(node, record, element, patch);
        Ok(())
    }
}

/// Reject elements a strategy cannot sensibly draw.
///
/// Model validation decides what is fatal: bad dimensions fail the
/// command, while malformed rich-text spans only log, since the text
/// strategy renders them with the uniform fallback.
pub fn validate_element(expected: ElementType, element: &Element) -> Result<(), RenderError> {
    let actual = element.element_type();
    if actual != expected {
        return Err(RenderError::TypeMismatch { expected, actual });
    }
    match element.validate() {
        Err(err @ ElementError::InvalidDimensions { .. }) => Err(RenderError::InvalidElement {
            id: element.id(),
            reason: err.to_string(),
        }),
        Err(err @ ElementError::MalformedSpans(_)) => {
            warn!("{err}");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

/// Write the cheap per-frame node properties and refresh the record.
pub(crate) fn apply_transform_patch(
    node: &mut SceneNode,
    record: &mut NodeRecord,
    element: &Element,
    patch: &ElementPatch,
) {
    let common = element.common();
    node.transform = node_transform(common);
    node.alpha = (common.opacity
        * element.style().map(|style| style.opacity).unwrap_or(1.0))
    .clamp(0.0, 1.0);
    if let Some(visible) = patch.visible {
        node.visible = visible;
    }

    record.last_width = common.width;
    record.last_height = common.height;
    record.last_style = element.style().cloned();
    record.last_transform = node.transform;
}

/// Resolve fill and stroke paints from a shape style.
pub(crate) fn path_paint(
    style: &vellum_core::ShapeStyle,
) -> (Option<peniko::Color>, Option<crate::node::StrokePaint>) {
    let fill = style.fill_color();
    let stroke = style.stroke_color().map(|color| crate::node::StrokePaint {
        color,
        width: style.stroke_width,
    });
    (fill, stroke)
}

/// Element-type to strategy map, built once at engine construction.
///
/// Resolution failure is a configuration error: the command fails with
/// `Err`, it is never silently substituted with another renderer.
pub struct RendererRegistry {
    strategies: HashMap<ElementType, Box<dyn RendererStrategy>>,
}

impl RendererRegistry {
    /// Empty registry, for hosts that bring their own strategies.
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with the built-in strategies for all element types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RectRenderer));
        registry.register(Box::new(EllipseRenderer));
        registry.register(Box::new(TriangleRenderer));
        registry.register(Box::new(TextRenderer));
        registry.register(Box::new(ImageRenderer));
        registry.register(Box::new(GroupRenderer));
        registry
    }

    /// Register a strategy, replacing any existing one for its type.
    pub fn register(&mut self, strategy: Box<dyn RendererStrategy>) {
        self.strategies.insert(strategy.element_type(), strategy);
    }

    pub fn resolve(&self, ty: ElementType) -> Result<&dyn RendererStrategy, RenderError> {
        self.strategies
            .get(&ty)
            .map(|s| s.as_ref())
            .ok_or(RenderError::UnknownElementType(ty.name()))
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_all_defaults() {
        let registry = RendererRegistry::with_defaults();
        for ty in [
            ElementType::Rect,
            ElementType::Circle,
            ElementType::Triangle,
            ElementType::Text,
            ElementType::Image,
            ElementType::Group,
        ] {
            assert!(registry.resolve(ty).is_ok(), "missing strategy for {ty:?}");
        }
    }

    #[test]
    fn test_empty_registry_is_configuration_error() {
        let registry = RendererRegistry::new();
        let err = registry.resolve(ElementType::Rect).unwrap_err();
        assert!(matches!(err, RenderError::UnknownElementType("rect")));
    }

    #[test]
    fn test_validate_rejects_non_positive_dimensions() {
        let rect = Element::rect(0.0, 0.0, 0.0, 10.0);
        assert!(validate_element(ElementType::Rect, &rect).is_err());
        let ok = Element::rect(0.0, 0.0, 1.0, 1.0);
        assert!(validate_element(ElementType::Rect, &ok).is_ok());
    }

    #[test]
    fn test_validate_rejects_type_mismatch() {
        let circle = Element::circle(0.0, 0.0, 10.0, 10.0);
        let err = validate_element(ElementType::Rect, &circle).unwrap_err();
        assert!(matches!(err, RenderError::TypeMismatch { .. }));
    }

    #[test]
    fn test_group_exempt_from_dimension_check() {
        let group = Element::group(vec![]);
        assert!(validate_element(ElementType::Group, &group).is_ok());
    }

    #[test]
    fn test_malformed_spans_do_not_block_validation() {
        use vellum_core::{RichTextSpan, SpanStyle};
        // The text strategy renders these with the uniform fallback, so
        // validation logs instead of failing the create.
        let mut element = Element::text(0.0, 0.0, 100.0, "héllo");
        if let Element::Text(text) = &mut element {
            text.rich_text = vec![RichTextSpan::new(0, 2, SpanStyle::default())];
        }
        assert!(validate_element(ElementType::Text, &element).is_ok());
    }
}
