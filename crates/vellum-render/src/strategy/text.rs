//! Text renderer strategy.
//!
//! A text node has three sub-layers painted back to front: background
//! fill, glyph runs, decoration lines. Content is segmented by rich-text
//! spans, wrapped on whitespace into the element width, and flowed
//! left/center/right per the alignment. Each line's baseline is centered
//! on the tallest item of that line.

use kurbo::{Point, Rect, Shape, Size};
use peniko::Color;
use vellum_core::element::spans_are_well_formed;
use vellum_core::geometry::node_transform;
use vellum_core::{
    Element, ElementPatch, ElementType, ResolvedSpanStyle, TextAlign, TextElement,
};

use super::{apply_transform_patch, path_paint, RendererStrategy, StrategyContext};
use crate::error::RenderError;
use crate::node::{
    DecorationLine, GlyphRun, NodeKind, NodeRecord, PathContent, SceneNode, TextContent,
};
use crate::resources::TextMeasurer;

#[derive(Debug)]
pub struct TextRenderer;

/// A maximal run of uniformly styled content.
struct Segment<'a> {
    text: &'a str,
    style: ResolvedSpanStyle,
}

/// Split content at span boundaries. Malformed spans fall back to the
/// uniform base style (the invariant holds at the store boundary, this is
/// a defensive rendering path).
fn segments(text: &TextElement) -> Vec<Segment<'_>> {
    let content = text.content.as_str();
    let base = text.text_style.resolve_span(None);
    if text.rich_text.is_empty() || !spans_are_well_formed(&text.rich_text, content) {
        return vec![Segment {
            text: content,
            style: base,
        }];
    }

    let mut out = Vec::new();
    let mut cursor = 0usize;
    for span in &text.rich_text {
        if span.start > cursor {
            out.push(Segment {
                text: &content[cursor..span.start],
                style: base.clone(),
            });
        }
        out.push(Segment {
            text: &content[span.start..span.end],
            style: text.text_style.resolve_span(Some(&span.style)),
        });
        cursor = span.end;
    }
    if cursor < content.len() {
        out.push(Segment {
            text: &content[cursor..],
            style: base,
        });
    }
    out.retain(|segment| !segment.text.is_empty());
    out
}

struct LineItem {
    text: String,
    style: ResolvedSpanStyle,
    width: f64,
}

struct Line {
    items: Vec<LineItem>,
    width: f64,
    max_font: f64,
}

impl Line {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            width: 0.0,
            max_font: 0.0,
        }
    }

    fn push(&mut self, item: LineItem) {
        self.width += item.width;
        self.max_font = self.max_font.max(item.style.font_size);
        self.items.push(item);
    }
}

/// Greedy whitespace wrapping into `max_width`. Explicit newlines always
/// break; a word longer than the box gets a line of its own rather than
/// being split.
fn wrap(segments: &[Segment<'_>], max_width: f64, measurer: &dyn TextMeasurer) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut current = Line::empty();

    for segment in segments {
        for (i, hard_line) in segment.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(std::mem::replace(&mut current, Line::empty()));
            }
            // split_inclusive keeps trailing spaces attached to words so
            // inter-word gaps survive measurement.
            for word in hard_line.split_inclusive(' ') {
                let width = measurer.measure_width(
                    word,
                    segment.style.font_size,
                    segment.style.font_weight,
                    segment.style.italic,
                );
                if current.width + width > max_width && !current.items.is_empty() {
                    lines.push(std::mem::replace(&mut current, Line::empty()));
                    // Drop a pure-space token at a wrap point.
                    if word.trim().is_empty() {
                        continue;
                    }
                }
                current.push(LineItem {
                    text: word.to_string(),
                    style: segment.style.clone(),
                    width,
                });
            }
        }
    }
    lines.push(current);
    lines
}

fn layout(
    text: &TextElement,
    measurer: &dyn TextMeasurer,
) -> (Vec<GlyphRun>, Vec<DecorationLine>, Size) {
    // Runs are laid out in origin space; position lives on the node
    // transform.
    let common = &text.common;
    let lines = wrap(&segments(text), common.width, measurer);
    let line_height_factor = text.text_style.line_height;

    let mut runs = Vec::new();
    let mut decorations = Vec::new();
    let mut top = 0.0f64;
    let mut laid_width = 0.0f64;

    for line in &lines {
        let font = if line.max_font > 0.0 {
            line.max_font
        } else {
            text.text_style.font_size
        };
        let line_px = font * line_height_factor;
        // Baseline of the tallest item, vertically centered in the line
        // box (ascent approximated as 0.8 em).
        let baseline = top + (line_px - font) / 2.0 + font * 0.8;

        let mut x = match text.text_style.text_align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (common.width - line.width) / 2.0,
            TextAlign::Right => common.width - line.width,
        };

        for item in &line.items {
            let color: Color = item.style.color.into();
            let origin = Point::new(x, baseline);
            runs.push(GlyphRun {
                text: item.text.clone(),
                origin,
                font_size: item.style.font_size,
                font_family: text.text_style.font_family.clone(),
                font_weight: item.style.font_weight,
                italic: item.style.italic,
                color,
            });

            let thickness = (item.style.font_size / 16.0).max(1.0);
            if item.style.decoration.underline {
                let y = baseline + item.style.font_size * 0.12;
                decorations.push(DecorationLine {
                    from: Point::new(x, y),
                    to: Point::new(x + item.width, y),
                    color,
                    width: thickness,
                });
            }
            if item.style.decoration.strikethrough {
                let y = baseline - item.style.font_size * 0.28;
                decorations.push(DecorationLine {
                    from: Point::new(x, y),
                    to: Point::new(x + item.width, y),
                    color,
                    width: thickness,
                });
            }
            x += item.width;
        }
        laid_width = laid_width.max(line.width);
        top += line_px;
    }

    (runs, decorations, Size::new(laid_width, top))
}

fn build_content(text: &TextElement, measurer: &dyn TextMeasurer) -> TextContent {
    let background = {
        let (fill, stroke) = path_paint(&text.style);
        if fill.is_some() || stroke.is_some() {
            Some(PathContent {
                path: Rect::new(0.0, 0.0, text.common.width, text.common.height).to_path(0.1),
                fill,
                stroke,
            })
        } else {
            None
        }
    };
    let (runs, decorations, layout_size) = layout(text, measurer);
    TextContent {
        background,
        runs,
        decorations,
        layout_size,
    }
}

impl RendererStrategy for TextRenderer {
    fn element_type(&self) -> ElementType {
        ElementType::Text
    }

    fn materialize(
        &self,
        element: &Element,
        ctx: &StrategyContext<'_>,
    ) -> Result<SceneNode, RenderError> {
        let Element::Text(text) = element else {
            return Err(RenderError::TypeMismatch {
                expected: ElementType::Text,
                actual: element.element_type(),
            });
        };
        Ok(SceneNode::new(
            node_transform(&text.common),
            text.common.opacity * text.style.opacity,
            NodeKind::Text(build_content(text, ctx.measurer)),
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
            if let Element::Text(text) = element {
                node.kind = NodeKind::Text(build_content(text, ctx.measurer));
            }
        }
        apply_transform_patch(node, record, element, patch);
        Ok(())
    }
}
