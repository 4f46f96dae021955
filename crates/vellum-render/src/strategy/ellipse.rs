//! Ellipse renderer strategy.

use kurbo::{BezPath, Ellipse, Point, Shape};
use vellum_core::geometry::node_transform;
use vellum_core::{Element, ElementPatch, ElementType};

use super::{apply_transform_patch, path_paint, RendererStrategy, StrategyContext};
use crate::error::RenderError;
use crate::node::{NodeKind, NodeRecord, PathContent, SceneNode};

#[derive(Debug)]
pub struct EllipseRenderer;

/// Path in origin space: position lives on the node transform.
fn build_path(element: &Element) -> BezPath {
    let common = element.common();
    Ellipse::new(
        Point::new(common.width / 2.0, common.height / 2.0),
        (common.width / 2.0, common.height / 2.0),
        0.0,
    )
    .to_path(0.1)
}

impl RendererStrategy for EllipseRenderer {
    fn element_type(&self) -> ElementType {
        ElementType::Circle
    }

    fn materialize(
        &self,
        element: &Element,
        _ctx: &StrategyContext<'_>,
    ) -> Result<SceneNode, RenderError> {
        let Element::Circle(circle) = element else {
            return Err(RenderError::TypeMismatch {
                expected: ElementType::Circle,
                actual: element.element_type(),
            });
        };
        let (fill, stroke) = path_paint(&circle.style);
        Ok(SceneNode::new(
            node_transform(&circle.common),
            circle.common.opacity * circle.style.opacity,
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
