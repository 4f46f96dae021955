//! Error types for the render pipeline.

use thiserror::Error;
use vellum_core::{ElementId, ElementType};

#[derive(Error, Debug)]
pub enum RenderError {
    /// Configuration error: no strategy registered for an element type.
    /// Fatal, never silently substituted.
    #[error("No renderer registered for element type '{0}'")]
    UnknownElementType(&'static str),
    #[error("Invalid element {id}: {reason}")]
    InvalidElement { id: ElementId, reason: String },
    /// An update or delete raced a removal; callers log and skip.
    #[error("No scene node for element {0}")]
    MissingNode(ElementId),
    #[error("Strategy for {expected:?} received a {actual:?} element")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },
    /// Transient resource failure (e.g. image decode). The element still
    /// renders with a placeholder.
    #[error("Resource failure for '{src}': {reason}")]
    ResourceFailure { src: String, reason: String },
    #[error("Engine has been destroyed")]
    Destroyed,
}
