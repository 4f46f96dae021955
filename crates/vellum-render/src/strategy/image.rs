//! Image renderer strategy.

use log::warn;
use vellum_core::geometry::node_transform;
use vellum_core::{Element, ElementPatch, ElementType, ImageAdjustments};

use super::{apply_transform_patch, RendererStrategy, StrategyContext};
use crate::error::RenderError;
use crate::node::{ImageContent, ImageFilter, NodeKind, NodeRecord, SceneNode, StrokePaint};

#[derive(Debug)]
pub struct ImageRenderer;

/// Map adjustments onto an ordered filter chain. Neutral channels emit
/// no stage; saturation of exactly zero forces grayscale.
pub fn filter_chain(adjustments: &ImageAdjustments) -> Vec<ImageFilter> {
    let a = adjustments.clamped();
    let mut chain = Vec::new();
    if (a.brightness - 100.0).abs() > f64::EPSILON {
        chain.push(ImageFilter::Brightness(a.brightness / 100.0));
    }
    if (a.contrast - 100.0).abs() > f64::EPSILON {
        chain.push(ImageFilter::Contrast(a.contrast / 100.0));
    }
    if a.saturation.abs() < f64::EPSILON {
        chain.push(ImageFilter::Grayscale);
    } else if (a.saturation - 100.0).abs() > f64::EPSILON {
        chain.push(ImageFilter::Saturate(a.saturation / 100.0));
    }
    if a.hue.abs() > f64::EPSILON {
        chain.push(ImageFilter::HueRotate(a.hue));
    }
    if a.blur > f64::EPSILON {
        chain.push(ImageFilter::Blur(a.blur));
    }
    chain
}

fn build_content(element: &Element, ctx: &StrategyContext<'_>) -> Option<ImageContent> {
    let Element::Image(image) = element else {
        return None;
    };
    let texture = ctx
        .resources
        .texture(&image.src)
        .cloned()
        .or_else(|| {
            warn!(
                "No texture for '{}' on element {}, rendering placeholder",
                image.src, image.common.id
            );
            None
        });
    let placeholder = texture.is_none();
    let border = image.style.stroke_color().map(|color| StrokePaint {
        color,
        width: image.style.stroke_width,
    });
    Some(ImageContent {
        src: image.src.clone(),
        width: image.common.width,
        height: image.common.height,
        texture,
        placeholder,
        filters: image
            .adjustments
            .as_ref()
            .map(filter_chain)
            .unwrap_or_default(),
        border,
    })
}

impl RendererStrategy for ImageRenderer {
    fn element_type(&self) -> ElementType {
        ElementType::Image
    }

    fn materialize(
        &self,
        element: &Element,
        ctx: &StrategyContext<'_>,
    ) -> Result<SceneNode, RenderError> {
        let Some(content) = build_content(element, ctx) else {
            return Err(RenderError::TypeMismatch {
                expected: ElementType::Image,
                actual: element.element_type(),
            });
        };
        let common = element.common();
        let style_opacity = element.style().map(|s| s.opacity).unwrap_or(1.0);
        Ok(SceneNode::new(
            node_transform(common),
            common.opacity * style_opacity,
            NodeKind::Image(content),
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
        if patch.affects_geometry() || patch.affects_paint() {
            if let Some(content) = build_content(element, ctx) {
                node.kind = NodeKind::Image(content);
            }
        }
        apply_transform_patch(node, record, element, patch);
        Ok(())
    }
}
