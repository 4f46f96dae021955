//! Error types for the element model.

use thiserror::Error;

/// Validation errors raised by [`Element::validate`](crate::Element::validate).
#[derive(Error, Debug)]
pub enum ElementError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },
    #[error("Malformed rich-text spans for element {0}")]
    MalformedSpans(crate::element::ElementId),
}
