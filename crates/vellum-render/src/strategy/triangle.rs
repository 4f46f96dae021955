//! Triangle renderer strategy.

use kurbo::{BezPath, Point};
use vellum_core::geometry::node_transform;
use vellum_core::{Element, ElementPatch, ElementType};

use super::{apply_transform_patch, path_paint, RendererStrategy, StrategyContext};
use crate::error::RenderError;
use crate::node::{NodeKind, NodeRecord, PathContent, SceneNode};

#[derive(Debug)]
pub struct TriangleRenderer;

/// Isoceles triangle in origin space: apex at top-center, base along the
/// bottom edge. Position lives on the node transform.
fn build_path(element: &Element) -> BezPath {
    let common = element.common();
    let mut path = BezPath::new();
    path.move_to(Point::new(common.width / 2.0, 0.0));
    path.line_to(Point::new(common.width, common.height));
    path.line_to(Point::new(0.0, common.height));
    path.close_path();
    path
}

impl RendererStrategy for TriangleRenderer {
    fn element_type(&self) -> ElementType {
        ElementType::Triangle
    }

    fn materialize(
        &self,
        element: &Element,
        _ctx: &StrategyContext<'_>,
    ) -> Result<SceneNode, RenderError> {
        let Element::Triangle(triangle) = element else {
            return Err(RenderError::TypeMismatch {
                expected: ElementType::Triangle,
                actual: element.element_type(),
            });
        };
        let (fill, stroke) = path_paint(&triangle.style);
        Ok(SceneNode::new(
            node_transform(&triangle.common),
            triangle.common.opacity * triangle.style.opacity,
            NodeKind::Path(PathContent {
                path: build_path(element),
                fill,
                stroke,
            }),
        ))
    }

    fn patch(
        &self,
        node: &mut SceneNode,
        record: &mut NodeRecord,
        element: &Element,
        patch: &ElementPatch,
        _ctx: &StrategyContext<'_>,
    ) -> Result<(), RenderError> {
        if let NodeKind::Path(content) = &mut node.kind {
            if patch.affects_geometry() {
                content.path = build_path(element);
            }
            if patch.affects_paint() {
                if let Some(style) = element.style() {
                    let (fill, stroke) = path_paint(style);
                    content.fill = fill;
                    content.stroke = stroke;
                }
            }
        }
        apply_transform_patch(node, record, element, patch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    #[test]
    fn test_triangle_path_vertices() {
        let element = Element::triangle(0.0, 0.0, 100.0, 60.0);
        let path = build_path(&element);
        let bbox = path.bounding_box();
        assert!((bbox.width() - 100.0).abs() < f64::EPSILON);
        assert!((bbox.height() - 60.0).abs() < f64::EPSILON);
        // Apex sits on the top edge at the horizontal center.
        let first = path.elements().first().copied();
        assert_eq!(first, Some(kurbo::PathEl::MoveTo(Point::new(50.0, 0.0))));
    }
}
