//! Group renderer strategy.
//!
//! Groups draw nothing. Their node carries only a hit-testable region
//! equal to the recomputed bounds of their children, in world space.

use kurbo::Affine;
use vellum_core::{Element, ElementPatch, ElementType};

use super::{RendererStrategy, StrategyContext};
use crate::error::RenderError;
use crate::node::{GroupContent, NodeKind, NodeRecord, SceneNode};

#[derive(Debug)]
pub struct GroupRenderer;

impl RendererStrategy for GroupRenderer {
    fn element_type(&self) -> ElementType {
        ElementType::Group
    }

    fn materialize(
        &self,
        element: &Element,
        ctx: &StrategyContext<'_>,
    ) -> Result<SceneNode, RenderError> {
        if !element.is_group() {
            return Err(RenderError::TypeMismatch {
                expected: ElementType::Group,
                actual: element.element_type(),
            });
        }
        // Child bounds are already world-space, the node transform stays
        // identity.
        let hit_region = element.bounds_of(ctx.resolve);
        Ok(SceneNode::new(
            Affine::IDENTITY,
            element.common().opacity,
            NodeKind::Group(GroupContent { hit_region }),
        ))
    }

    fn patch(
        &self,
        node: &mut SceneNode,
        record: &mut NodeRecord,
        element: &Element,
        patch: &ElementPatch,
        ctx: &StrategyContext<'_>,
    ) -> Result<(), RenderError> {
        // Any group change can move the child union; recompute always.
        node.kind = NodeKind::Group(GroupContent {
            hit_region: element.bounds_of(ctx.resolve),
        });
        node.alpha = element.common().opacity.clamp(0.0, 1.0);
        if let Some(visible) = patch.visible {
            node.visible = visible;
        }
        record.last_width = element.common().width;
        record.last_height = element.common().height;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{HeuristicTextMeasurer, PreparedResources};

    #[test]
    fn test_group_hit_region_from_children() {
        let a = Element::rect(0.0, 0.0, 100.0, 100.0);
        let b = Element::rect(300.0, 100.0, 50.0, 50.0);
        let group = Element::group(vec![a.id(), b.id()]);

        let pool = vec![a, b];
        let resolve = move |id| pool.iter().find(|e| e.id() == id).cloned();
        let resources = PreparedResources::default();
        let measurer = HeuristicTextMeasurer;
        let ctx = StrategyContext {
            resources: &resources,
            measurer: &measurer,
            resolve: &resolve,
        };

        let node = GroupRenderer.materialize(&group, &ctx).unwrap();
        let NodeKind::Group(content) = &node.kind else {
            panic!("expected group node");
        };
        assert!((content.hit_region.x1 - 350.0).abs() < 1e-9);
        assert!((content.hit_region.y1 - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_children_yield_empty_region() {
        let group = Element::group(vec![vellum_core::ElementId::new_v4()]);
        let resolve = |_| None;
        let resources = PreparedResources::default();
        let measurer = HeuristicTextMeasurer;
        let ctx = StrategyContext {
            resources: &resources,
            measurer: &measurer,
            resolve: &resolve,
        };

        let node = GroupRenderer.materialize(&group, &ctx).unwrap();
        let NodeKind::Group(content) = &node.kind else {
            panic!("expected group node");
        };
        assert!(content.hit_region.is_zero_area());
    }
}
