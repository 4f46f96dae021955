//! Vellum Render Library
//!
//! Retained scene graph and render pipeline for the Vellum design canvas:
//! the state-diff bridge, the coalescing command flow, per-type renderer
//! strategies, layered compositing and selection overlays.

pub mod bridge;
pub mod engine;
pub mod error;
pub mod layers;
pub mod node;
pub mod resources;
pub mod scheduler;
pub mod strategy;

pub use bridge::RenderBridge;
pub use engine::{RenderEngine, HANDLE_SIZE, ROTATION_HANDLE_OFFSET};
pub use error::RenderError;
pub use layers::{LayerId, LayerManager};
pub use node::{NodeKind, NodeRecord, SceneNode};
pub use resources::{
    DecodedImage, HeuristicTextMeasurer, InMemoryResourceManager, PreparedResources,
    ResourceManager, TextMeasurer,
};
pub use scheduler::{FlushDecision, RenderScheduler};
pub use strategy::{RendererRegistry, RendererStrategy, StrategyContext};
