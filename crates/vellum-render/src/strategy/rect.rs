//! Rectangle renderer strategy.

use kurbo::{BezPath, Rect, RoundedRect, Shape};
use vellum_core::geometry::node_transform;
use vellum_core::{Element, ElementPatch, ElementType};

use super::{apply_transform_patch, path_paint, RendererStrategy, StrategyContext};
use crate::error::RenderError;
use crate::node::{NodeKind, NodeRecord, PathContent, SceneNode};

#[derive(Debug)]
pub struct RectRenderer;

/// Path in origin space: position lives on the node transform.
fn build_path(element: &Element) -> BezPath {
    let common = element.common();
    let radius = match element {
        Element::Rect(rect) => rect.border_radius,
        _ => 0.0,
    };
    // Radius never exceeds half the shorter side.
    let radius = radius.clamp(0.0, common.width.min(common.height) / 2.0);
    let rect = Rect::new(0.0, 0.0, common.width, common.height);
    if radius > 0.0 {
        RoundedRect::from_rect(rect, radius).to_path(0.1)
    } else {
        rect.to_path(0.1)
    }
}

impl RendererStrategy for RectRenderer {
    fn element_type(&self) -> ElementType {
        ElementType::Rect
    }

    fn materialize(
        &self,
        element: &Element,
        _ctx: &StrategyContext<'_>,
    ) -> Result<SceneNode, RenderError> {
        let Element::Rect(rect) = element else {
            return Err(RenderError::TypeMismatch {
                expected: ElementType::Rect,
                actual: element.element_type(),
            });
        };
        let (fill, stroke) = path_paint(&rect.style);
        let node = SceneNode::new(
            node_transform(&rect.common),
            rect.common.opacity * rect.style.opacity,
            NodeKind::Path(PathContent {
                path: build_path(element),
                fill,
                stroke,
            }),
        );
        Ok(node)
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
    use crate::resources::{HeuristicTextMeasurer, PreparedResources};
    use vellum_core::{diff_elements, SerializableColor};

    fn ctx<'a>(
        resources: &'a PreparedResources,
        measurer: &'a HeuristicTextMeasurer,
        resolve: &'a dyn Fn(vellum_core::ElementId) -> Option<Element>,
    ) -> StrategyContext<'a> {
        StrategyContext {
            resources,
            measurer,
            resolve,
        }
    }

    #[test]
    fn test_materialize_rect() {
        let resources = PreparedResources::default();
        let measurer = HeuristicTextMeasurer;
        let resolve = |_| None;
        let ctx = ctx(&resources, &measurer, &resolve);

        let element = Element::rect(10.0, 20.0, 100.0, 50.0);
        let node = RectRenderer.materialize(&element, &ctx).unwrap();
        let NodeKind::Path(content) = &node.kind else {
            panic!("expected path node");
        };
        // Path is origin based; the transform carries the position.
        let bbox = content.path.bounding_box();
        assert!(bbox.x0.abs() < 0.2);
        assert!((bbox.x1 - 100.0).abs() < 0.2);
        let origin = node.transform * kurbo::Point::ZERO;
        assert!((origin.x - 10.0).abs() < 1e-9);
        assert!((origin.y - 20.0).abs() < 1e-9);
        assert!(content.stroke.is_some());
    }

    #[test]
    fn test_transform_only_patch_keeps_path() {
        let resources = PreparedResources::default();
        let measurer = HeuristicTextMeasurer;
        let resolve = |_| None;
        let ctx = ctx(&resources, &measurer, &resolve);

        let element = Element::rect(0.0, 0.0, 100.0, 50.0);
        let mut node = RectRenderer.materialize(&element, &ctx).unwrap();
        let mut record = NodeRecord::for_element(&element, node.transform);
        let path_before = match &node.kind {
            NodeKind::Path(content) => content.path.clone(),
            _ => unreachable!(),
        };

        let mut moved = element.clone();
        moved.common_mut().x = 500.0;
        moved.common_mut().rotation = 30.0;
        let patch = diff_elements(&element, &moved).unwrap();
        assert!(patch.is_transform_only());

        RectRenderer
            .patch(&mut node, &mut record, &moved, &patch, &ctx)
            .unwrap();
        let NodeKind::Path(content) = &node.kind else {
            unreachable!()
        };
        // Local path untouched, only the node transform moved.
        assert_eq!(content.path.elements(), path_before.elements());
        assert_eq!(node.transform, node_transform(moved.common()));
    }

    #[test]
    fn test_resize_rebuilds_path() {
        let resources = PreparedResources::default();
        let measurer = HeuristicTextMeasurer;
        let resolve = |_| None;
        let ctx = ctx(&resources, &measurer, &resolve);

        let element = Element::rect(0.0, 0.0, 100.0, 50.0);
        let mut node = RectRenderer.materialize(&element, &ctx).unwrap();
        let mut record = NodeRecord::for_element(&element, node.transform);

        let mut resized = element.clone();
        resized.common_mut().width = 200.0;
        let patch = diff_elements(&element, &resized).unwrap();
        RectRenderer
            .patch(&mut node, &mut record, &resized, &patch, &ctx)
            .unwrap();

        let NodeKind::Path(content) = &node.kind else {
            unreachable!()
        };
        assert!((content.path.bounding_box().x1 - 200.0).abs() < 0.2);
        assert!((record.last_width - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_paint_patch_updates_fill() {
        let resources = PreparedResources::default();
        let measurer = HeuristicTextMeasurer;
        let resolve = |_| None;
        let ctx = ctx(&resources, &measurer, &resolve);

        let element = Element::rect(0.0, 0.0, 100.0, 50.0);
        let mut node = RectRenderer.materialize(&element, &ctx).unwrap();
        let mut record = NodeRecord::for_element(&element, node.transform);

        let mut painted = element.clone();
        painted.style_mut().unwrap().fill = Some(SerializableColor::from_hex("#ff0000"));
        let patch = diff_elements(&element, &painted).unwrap();
        RectRenderer
            .patch(&mut node, &mut record, &painted, &patch, &ctx)
            .unwrap();

        let NodeKind::Path(content) = &node.kind else {
            unreachable!()
        };
        assert!(content.fill.is_some());
    }

    #[test]
    fn test_border_radius_clamped() {
        let mut element = Element::rect(0.0, 0.0, 100.0, 20.0);
        if let Element::Rect(rect) = &mut element {
            rect.border_radius = 500.0;
        }
        // Path stays within the element box even with an absurd radius.
        let path = build_path(&element);
        let bbox = path.bounding_box();
        assert!(bbox.x0 >= -0.2 && bbox.x1 <= 100.2);
        assert!(bbox.y0 >= -0.2 && bbox.y1 <= 20.2);
    }
}
