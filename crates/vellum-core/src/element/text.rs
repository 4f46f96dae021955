//! Text styling: base style, rich-text spans, decoration flags.

use super::style::SerializableColor;
use serde::{Deserialize, Serialize};

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontWeight {
    Light,
    #[default]
    Regular,
    Bold,
}

/// Horizontal text alignment within the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Underline / strikethrough flags.
///
/// Base and span decorations are OR'd together unless a span explicitly
/// opts out with [`TextDecoration::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextDecoration {
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
}

impl TextDecoration {
    /// Explicit "no decoration" marker.
    pub const NONE: Self = Self {
        underline: false,
        strikethrough: false,
    };

    pub fn underline() -> Self {
        Self {
            underline: true,
            strikethrough: false,
        }
    }

    pub fn strikethrough() -> Self {
        Self {
            underline: false,
            strikethrough: true,
        }
    }

    /// Union of two decoration sets.
    pub fn union(self, other: Self) -> Self {
        Self {
            underline: self.underline || other.underline,
            strikethrough: self.strikethrough || other.strikethrough,
        }
    }

    pub fn is_none(&self) -> bool {
        !self.underline && !self.strikethrough
    }
}

/// Base text style for a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub italic: bool,
    #[serde(default = "default_text_color")]
    pub color: SerializableColor,
    #[serde(default)]
    pub text_align: TextAlign,
    /// Line height as a multiple of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default)]
    pub decoration: TextDecoration,
}

fn default_font_size() -> f64 {
    16.0
}

fn default_font_family() -> String {
    "Inter".to_string()
}

fn default_text_color() -> SerializableColor {
    SerializableColor::black()
}

fn default_line_height() -> f64 {
    1.2
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            font_family: default_font_family(),
            font_weight: FontWeight::default(),
            italic: false,
            color: default_text_color(),
            text_align: TextAlign::default(),
            line_height: default_line_height(),
            decoration: TextDecoration::default(),
        }
    }
}

/// Style overrides carried by a rich-text span.
///
/// Every field is optional; unset fields inherit from the base style.
/// `decoration: Some(TextDecoration::NONE)` explicitly removes base
/// decorations for the span, any other `Some` value is OR'd with the base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SerializableColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoration: Option<TextDecoration>,
}

/// A styled byte range of a text element's content.
///
/// Spans are kept sorted by `start` and never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextSpan {
    /// Start byte offset into `content` (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    pub style: SpanStyle,
}

impl RichTextSpan {
    pub fn new(start: usize, end: usize, style: SpanStyle) -> Self {
        Self { start, end, style }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// The style a span resolves to once merged over a base style.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpanStyle {
    pub color: SerializableColor,
    pub font_size: f64,
    pub font_weight: FontWeight,
    pub italic: bool,
    pub decoration: TextDecoration,
}

impl TextStyle {
    /// Merge a span's overrides additively over this base style.
    pub fn resolve_span(&self, span: Option<&SpanStyle>) -> ResolvedSpanStyle {
        let base = ResolvedSpanStyle {
            color: self.color,
            font_size: self.font_size,
            font_weight: self.font_weight,
            italic: self.italic,
            decoration: self.decoration,
        };
        let Some(span) = span else { return base };
        let decoration = match span.decoration {
            // Explicit none strips the base decoration too.
            Some(d) if d.is_none() => TextDecoration::NONE,
            Some(d) => base.decoration.union(d),
            None => base.decoration,
        };
        ResolvedSpanStyle {
            color: span.color.unwrap_or(base.color),
            font_size: span.font_size.unwrap_or(base.font_size),
            font_weight: span.font_weight.unwrap_or(base.font_weight),
            italic: span.italic.unwrap_or(base.italic),
            decoration,
        }
    }
}

/// Validate that spans are sorted, non-overlapping, within `content` and
/// aligned to UTF-8 character boundaries.
pub fn spans_are_well_formed(spans: &[RichTextSpan], content: &str) -> bool {
    let mut prev_end = 0usize;
    for span in spans {
        if span.is_empty() || span.start < prev_end || span.end > content.len() {
            return false;
        }
        if !content.is_char_boundary(span.start) || !content.is_char_boundary(span.end) {
            return false;
        }
        prev_end = span.end;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoration_union() {
        let base = TextDecoration::underline();
        let span = TextDecoration::strikethrough();
        let merged = base.union(span);
        assert!(merged.underline);
        assert!(merged.strikethrough);
    }

    #[test]
    fn test_span_resolution_inherits_base() {
        let base = TextStyle::default();
        let resolved = base.resolve_span(Some(&SpanStyle {
            font_size: Some(24.0),
            ..Default::default()
        }));
        assert!((resolved.font_size - 24.0).abs() < f64::EPSILON);
        assert_eq!(resolved.color, base.color);
    }

    #[test]
    fn test_span_decoration_ors_with_base() {
        let base = TextStyle {
            decoration: TextDecoration::underline(),
            ..Default::default()
        };
        let resolved = base.resolve_span(Some(&SpanStyle {
            decoration: Some(TextDecoration::strikethrough()),
            ..Default::default()
        }));
        assert!(resolved.decoration.underline);
        assert!(resolved.decoration.strikethrough);
    }

    #[test]
    fn test_explicit_none_strips_base_decoration() {
        let base = TextStyle {
            decoration: TextDecoration::underline(),
            ..Default::default()
        };
        let resolved = base.resolve_span(Some(&SpanStyle {
            decoration: Some(TextDecoration::NONE),
            ..Default::default()
        }));
        assert!(resolved.decoration.is_none());
    }

    #[test]
    fn test_span_well_formedness() {
        let content = "abcdefghij";
        let ok = vec![
            RichTextSpan::new(0, 4, SpanStyle::default()),
            RichTextSpan::new(4, 8, SpanStyle::default()),
        ];
        assert!(spans_are_well_formed(&ok, content));

        let overlapping = vec![
            RichTextSpan::new(0, 5, SpanStyle::default()),
            RichTextSpan::new(4, 8, SpanStyle::default()),
        ];
        assert!(!spans_are_well_formed(&overlapping, content));

        let out_of_range = vec![RichTextSpan::new(0, 20, SpanStyle::default())];
        assert!(!spans_are_well_formed(&out_of_range, content));
    }

    #[test]
    fn test_span_must_end_on_char_boundary() {
        // 'é' is two bytes; a span ending inside it is malformed.
        let content = "héllo";
        let mid_char = vec![RichTextSpan::new(0, 2, SpanStyle::default())];
        assert!(!spans_are_well_formed(&mid_char, content));

        let aligned = vec![RichTextSpan::new(0, 3, SpanStyle::default())];
        assert!(spans_are_well_formed(&aligned, content));
    }
}
