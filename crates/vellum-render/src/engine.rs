//! Render engine: executes render commands against the retained scene.
//!
//! The engine owns the id to node map, the layer manager, the renderer
//! registry and the selection overlay. Commands arrive already coalesced
//! from the bridge; each one is executed independently, and a failing
//! command is logged without halting the rest of the flush.

use kurbo::{BezPath, Circle, Point, Rect, Shape};
use log::{debug, error, warn};
use peniko::Color;
use std::collections::{HashMap, HashSet};
use vellum_core::geometry::{aabb_of, minimum_bounding_box, world_outline, world_transform, Obb};
use vellum_core::{
    Element, ElementId, ElementPatch, Priority, RenderCommand, ViewportController, ViewportState,
};

use crate::error::RenderError;
use crate::layers::{LayerId, LayerManager};
use crate::node::{NodeKind, NodeRecord, PathContent, SceneNode, StrokePaint};
use crate::resources::{
    HeuristicTextMeasurer, InMemoryResourceManager, PreparedResources, ResourceManager,
    TextMeasurer,
};
use crate::scheduler::RenderScheduler;
use crate::strategy::{validate_element, RendererRegistry, StrategyContext};

/// Resize handle side length in screen pixels; divided by zoom so handles
/// stay constant on screen.
pub const HANDLE_SIZE: f64 = 8.0;
/// Distance of the rotation handle above the selection box, screen pixels.
pub const ROTATION_HANDLE_OFFSET: f64 = 24.0;

fn selection_color() -> Color {
    Color::from_rgba8(59, 130, 246, 255)
}

fn guideline_color() -> Color {
    Color::from_rgba8(236, 72, 153, 200)
}

pub struct RenderEngine {
    registry: RendererRegistry,
    layers: LayerManager,
    nodes: HashMap<ElementId, SceneNode>,
    records: HashMap<ElementId, NodeRecord>,
    /// Latest element snapshots, kept current by the command stream.
    elements: HashMap<ElementId, Element>,
    selection: Vec<ElementId>,
    selection_nodes: Vec<SceneNode>,
    selection_box: Option<Obb>,
    overlay_nodes: Vec<SceneNode>,
    temp_node: Option<SceneNode>,
    resources: Box<dyn ResourceManager>,
    measurer: Box<dyn TextMeasurer>,
    viewport: ViewportController,
    scheduler: RenderScheduler,
    editing_element: Option<ElementId>,
    destroyed: bool,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new(
            RendererRegistry::with_defaults(),
            Box::new(InMemoryResourceManager::new()),
        )
    }
}

impl RenderEngine {
    pub fn new(registry: RendererRegistry, resources: Box<dyn ResourceManager>) -> Self {
        Self {
            registry,
            layers: LayerManager::new(),
            nodes: HashMap::new(),
            records: HashMap::new(),
            elements: HashMap::new(),
            selection: Vec::new(),
            selection_nodes: Vec::new(),
            selection_box: None,
            overlay_nodes: Vec::new(),
            temp_node: None,
            resources,
            measurer: Box::new(HeuristicTextMeasurer),
            viewport: ViewportController::default(),
            scheduler: RenderScheduler::new(),
            editing_element: None,
            destroyed: false,
        }
    }

    pub fn with_measurer(mut self, measurer: Box<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    // Accessors used by hosts and the bridge.

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn node(&self, id: ElementId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn scheduler_mut(&mut self) -> &mut RenderScheduler {
        &mut self.scheduler
    }

    /// Selection overlay nodes, back to front.
    pub fn selection_overlay(&self) -> &[SceneNode] {
        &self.selection_nodes
    }

    /// The current selection box, when one is drawn.
    pub fn selection_box(&self) -> Option<&Obb> {
        self.selection_box.as_ref()
    }

    pub fn overlay(&self) -> &[SceneNode] {
        &self.overlay_nodes
    }

    pub fn temp_node(&self) -> Option<&SceneNode> {
        self.temp_node.as_ref()
    }

    /// Execute a batch, logging failures per command so one bad command
    /// never halts the rest.
    pub fn execute_all(&mut self, commands: Vec<RenderCommand>) {
        for command in commands {
            if let Err(err) = self.execute_render_command(command) {
                match err {
                    RenderError::MissingNode(id) => {
                        warn!("Skipping command for missing node {id}");
                    }
                    other => error!("Render command failed: {other}"),
                }
            }
        }
    }

    /// Execute one render command.
    pub fn execute_render_command(&mut self, command: RenderCommand) -> Result<(), RenderError> {
        if self.destroyed {
            return Err(RenderError::Destroyed);
        }
        match command {
            RenderCommand::CreateElement { element, priority } => {
                self.create_element(element, priority)
            }
            RenderCommand::UpdateElement { id, patch, priority } => {
                self.update_element(id, &patch)?;
                self.scheduler.request(priority);
                Ok(())
            }
            RenderCommand::DeleteElement { id, priority } => {
                self.delete_element(id)?;
                self.scheduler.request(priority);
                Ok(())
            }
            RenderCommand::BatchUpdate { updates, priority } => {
                for (id, patch) in &updates {
                    if let Err(err) = self.update_element(*id, patch) {
                        warn!("Batch update skipped {id}: {err}");
                    }
                }
                self.scheduler.request(priority);
                Ok(())
            }
            RenderCommand::BatchDelete { ids, priority } => {
                for id in ids {
                    if let Err(err) = self.delete_element(id) {
                        warn!("Batch delete skipped {id}: {err}");
                    }
                }
                self.scheduler.request(priority);
                Ok(())
            }
            RenderCommand::UpdateSelection {
                selected_ids,
                priority,
            } => {
                self.selection = selected_ids;
                self.refresh_selection_overlay();
                self.scheduler.request(priority);
                Ok(())
            }
            RenderCommand::UpdateViewport { viewport, priority } => {
                self.update_viewport(viewport);
                self.scheduler.request(priority);
                Ok(())
            }
        }
    }

    fn create_element(&mut self, element: Element, priority: Priority) -> Result<(), RenderError> {
        let id = element.id();
        let ty = element.element_type();
        validate_element(ty, &element)?;
        self.registry.resolve(ty)?;

        debug!("CREATE {} ({})", id, ty.name());
        let prepared = self.resources.prepare_resources(&element);
        // Snapshot goes in first so group strategies can resolve through
        // the live map.
        self.elements.insert(id, element.clone());

        let node = {
            let elements = &self.elements;
            let resolve = |child: ElementId| elements.get(&child).cloned();
            let ctx = StrategyContext {
                resources: &prepared,
                measurer: self.measurer.as_ref(),
                resolve: &resolve,
            };
            let strategy = self.registry.resolve(ty)?;
            strategy.materialize(&element, &ctx)
        };
        let node = match node {
            Ok(node) => node,
            Err(err) => {
                self.elements.remove(&id);
                return Err(err);
            }
        };

        // A second CREATE for the same id replaces the first.
        self.layers.insert(LayerId::Elements, id, element.common().z_index);
        self.records
            .insert(id, NodeRecord::for_element(&element, node.transform));
        self.nodes.insert(id, node);

        self.scheduler.request(priority);
        if !self.selection.is_empty() {
            self.refresh_selection_overlay();
        }
        Ok(())
    }

    fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> Result<(), RenderError> {
        let Some(snapshot) = self.elements.get(&id) else {
            return Err(RenderError::MissingNode(id));
        };
        let mut updated = snapshot.clone();
        updated.apply_patch(patch);
        if let Some(z_index) = patch.z_index {
            self.layers.insert(LayerId::Elements, id, z_index);
        }
        self.elements.insert(id, updated.clone());

        // Resources are re-prepared only when the source key changed.
        let prepared = if patch.src.is_some() {
            self.resources.prepare_resources(&updated)
        } else if let Some(src) = updated_src(&updated) {
            let mut prepared = PreparedResources::default();
            if let Some(texture) = self.resources.texture(src) {
                prepared.textures.insert(src.to_string(), texture);
            }
            prepared
        } else {
            PreparedResources::default()
        };

        let record = self
            .records
            .get_mut(&id)
            .ok_or(RenderError::MissingNode(id))?;
        let strategy = self.registry.resolve(record.element_type)?;
        let node = self.nodes.get_mut(&id).ok_or(RenderError::MissingNode(id))?;

        let elements = &self.elements;
        let resolve = |child: ElementId| elements.get(&child).cloned();
        let ctx = StrategyContext {
            resources: &prepared,
            measurer: self.measurer.as_ref(),
            resolve: &resolve,
        };
        strategy.patch(node, record, &updated, patch, &ctx)?;

        if !self.selection.is_empty() {
            self.refresh_selection_overlay();
        }
        Ok(())
    }

    fn delete_element(&mut self, id: ElementId) -> Result<(), RenderError> {
        if self.elements.remove(&id).is_none() {
            return Err(RenderError::MissingNode(id));
        }
        debug!("DELETE {id}");
        self.layers.remove_everywhere(id);
        self.nodes.remove(&id);
        self.records.remove(&id);
        self.resources.cleanup_element_resources(id);
        if self.editing_element == Some(id) {
            self.editing_element = None;
        }
        if self.selection.contains(&id) {
            self.selection.retain(|sel| *sel != id);
            self.refresh_selection_overlay();
        } else if !self.selection.is_empty() {
            // A deleted group member can move a selected parent's box.
            self.refresh_selection_overlay();
        }
        Ok(())
    }

    fn update_viewport(&mut self, state: ViewportState) {
        let snapping = state.snapping;
        self.viewport.set_viewport(state);
        self.overlay_nodes.clear();
        if snapping.enabled && snapping.show_guidelines {
            self.draw_snap_guidelines();
        }
        // Handle sizes depend on zoom.
        if !self.selection.is_empty() {
            self.refresh_selection_overlay();
        }
    }

    /// Center guidelines of the content bounds, spanning the visible rect.
    fn draw_snap_guidelines(&mut self) {
        let state = self.viewport.state();
        let content = state.content_bounds;
        if content.is_zero_area() {
            return;
        }
        let visible = state.visible_rect();
        let width = 1.0 / state.zoom;
        let center = content.center();

        for (from, to) in [
            (
                Point::new(center.x, visible.y0),
                Point::new(center.x, visible.y1),
            ),
            (
                Point::new(visible.x0, center.y),
                Point::new(visible.x1, center.y),
            ),
        ] {
            let mut path = BezPath::new();
            path.move_to(from);
            path.line_to(to);
            self.overlay_nodes.push(SceneNode::new(
                kurbo::Affine::IDENTITY,
                1.0,
                NodeKind::Path(PathContent {
                    path,
                    fill: None,
                    stroke: Some(StrokePaint {
                        color: guideline_color(),
                        width,
                    }),
                }),
            ));
        }
    }

    // Selection overlay.

    /// Selected ids that actually draw a box: members of a selected group
    /// are suppressed (only the parent box draws), as is the element
    /// currently being edited.
    fn effective_selection(&self) -> Vec<ElementId> {
        let selected: HashSet<ElementId> = self.selection.iter().copied().collect();
        self.selection
            .iter()
            .copied()
            .filter(|id| Some(*id) != self.editing_element)
            .filter(|id| {
                let mut ancestor = self
                    .elements
                    .get(id)
                    .and_then(|element| element.common().parent_id);
                while let Some(parent) = ancestor {
                    if selected.contains(&parent) {
                        return false;
                    }
                    ancestor = self
                        .elements
                        .get(&parent)
                        .and_then(|element| element.common().parent_id);
                }
                true
            })
            .collect()
    }

    /// Rebuild the Selection layer from the current selection.
    pub fn refresh_selection_overlay(&mut self) {
        self.selection_nodes.clear();
        self.selection_box = None;
        self.layers.clear(LayerId::Selection);

        let effective = self.effective_selection();
        let zoom = self.viewport.state().zoom;

        match effective.len() {
            0 => {}
            1 => {
                if let Some(obb) = self.single_selection_box(effective[0]) {
                    self.push_selection_box(&obb);
                    self.push_handles(&obb, zoom);
                    self.selection_box = Some(obb);
                }
            }
            _ => {
                if let Some(obb) = self.multi_selection_box(&effective) {
                    self.push_selection_box(&obb);
                    self.selection_box = Some(obb);
                }
            }
        }
    }

    /// Exact rotated quadrilateral of one element, from its world-space
    /// transform, never the axis-aligned box.
    fn single_selection_box(&self, id: ElementId) -> Option<Obb> {
        let element = self.elements.get(&id)?;
        if element.is_group() {
            let resolve = |child: ElementId| self.elements.get(&child).cloned();
            let bounds = element.bounds_of(&resolve);
            return Some(Obb::from_rect(bounds));
        }
        let common = element.common();
        let rect = common.local_rect();
        let transform = world_transform(common);
        let corners = [
            transform * Point::new(rect.x0, rect.y0),
            transform * Point::new(rect.x1, rect.y0),
            transform * Point::new(rect.x1, rect.y1),
            transform * Point::new(rect.x0, rect.y1),
        ];
        Some(Obb::from_corners(corners, common.rotation.to_radians()))
    }

    /// Minimum oriented bounding box over every member's world outline.
    fn multi_selection_box(&self, ids: &[ElementId]) -> Option<Obb> {
        let resolve = |child: ElementId| self.elements.get(&child).cloned();
        let mut points = Vec::new();
        for id in ids {
            if let Some(element) = self.elements.get(id) {
                points.extend(world_outline(element, &resolve));
            }
        }
        minimum_bounding_box(&points)
            // Degenerate point sets fall back to the axis-aligned box.
            .or_else(|| aabb_of(&points).map(Obb::from_rect))
    }

    fn push_selection_box(&mut self, obb: &Obb) {
        let mut path = BezPath::new();
        path.move_to(obb.corners[0]);
        for corner in &obb.corners[1..] {
            path.line_to(*corner);
        }
        path.close_path();
        let zoom = self.viewport.state().zoom;
        self.selection_nodes.push(SceneNode::new(
            kurbo::Affine::IDENTITY,
            1.0,
            NodeKind::Path(PathContent {
                path,
                fill: None,
                stroke: Some(StrokePaint {
                    color: selection_color(),
                    width: 1.5 / zoom,
                }),
            }),
        ));
    }

    /// Eight resize handles (corners and edge midpoints) plus one rotation
    /// handle above the top edge, all sized in screen pixels.
    fn push_handles(&mut self, obb: &Obb, zoom: f64) {
        let half = HANDLE_SIZE / zoom / 2.0;
        let corners = obb.corners;
        let midpoints = [
            corners[0].midpoint(corners[1]),
            corners[1].midpoint(corners[2]),
            corners[2].midpoint(corners[3]),
            corners[3].midpoint(corners[0]),
        ];

        for anchor in corners.iter().chain(midpoints.iter()) {
            let rect = Rect::new(
                anchor.x - half,
                anchor.y - half,
                anchor.x + half,
                anchor.y + half,
            );
            self.selection_nodes.push(SceneNode::new(
                kurbo::Affine::rotate_about(obb.rotation, *anchor),
                1.0,
                NodeKind::Path(PathContent {
                    path: rect.to_path(0.1),
                    fill: Some(Color::WHITE),
                    stroke: Some(StrokePaint {
                        color: selection_color(),
                        width: 1.0 / zoom,
                    }),
                }),
            ));
        }

        // Rotation handle extends outward from the top edge midpoint.
        let top_mid = midpoints[0];
        let toward_top = top_mid - obb.center;
        let outward = if toward_top.hypot() > 1e-9 {
            toward_top.normalize()
        } else {
            kurbo::Vec2::new(0.0, -1.0)
        };
        let anchor = top_mid + outward * (ROTATION_HANDLE_OFFSET / zoom);
        self.selection_nodes.push(SceneNode::new(
            kurbo::Affine::IDENTITY,
            1.0,
            NodeKind::Path(PathContent {
                path: Circle::new(anchor, half).to_path(0.1),
                fill: Some(Color::WHITE),
                stroke: Some(StrokePaint {
                    color: selection_color(),
                    width: 1.0 / zoom,
                }),
            }),
        ));
    }

    // Host surface API.

    /// Live preview element, drawn on the Overlay layer without entering
    /// the document.
    pub fn set_temp_element(&mut self, element: Option<&Element>) {
        self.temp_node = element.and_then(|element| {
            let ty = element.element_type();
            if validate_element(ty, element).is_err() {
                return None;
            }
            let prepared = self.resources.prepare_resources(element);
            let elements = &self.elements;
            let resolve = |child: ElementId| elements.get(&child).cloned();
            let ctx = StrategyContext {
                resources: &prepared,
                measurer: self.measurer.as_ref(),
                resolve: &resolve,
            };
            let strategy = self.registry.resolve(ty).ok()?;
            match strategy.materialize(element, &ctx) {
                Ok(node) => Some(node),
                Err(err) => {
                    warn!("Temp element not drawable: {err}");
                    None
                }
            }
        });
        self.scheduler.request(Priority::High);
    }

    /// World-space bounds of a live element.
    pub fn get_element_bounds(&self, id: ElementId) -> Option<Rect> {
        let element = self.elements.get(&id)?;
        let resolve = |child: ElementId| self.elements.get(&child).cloned();
        Some(element.bounds_of(&resolve))
    }

    pub fn is_element_visible(&self, id: ElementId) -> bool {
        self.nodes.get(&id).map(|node| node.visible).unwrap_or(false)
    }

    /// Hide or show an element without touching the document (used while
    /// an external editor covers it).
    pub fn set_element_visibility(&mut self, id: ElementId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
        if let Some(element) = self.elements.get_mut(&id) {
            element.common_mut().visible = visible;
        }
    }

    /// Suppress the selection box of the element being edited in place.
    pub fn set_editing_element(&mut self, id: Option<ElementId>) {
        if self.editing_element != id {
            self.editing_element = id;
            self.refresh_selection_overlay();
        }
    }

    /// Release every node, record and cached resource. The engine rejects
    /// all commands afterwards.
    pub fn destroy(&mut self) {
        for layer in LayerId::ALL {
            self.layers.clear(layer);
        }
        self.nodes.clear();
        self.records.clear();
        self.elements.clear();
        self.selection.clear();
        self.selection_nodes.clear();
        self.selection_box = None;
        self.overlay_nodes.clear();
        self.temp_node = None;
        self.resources.clear();
        self.destroyed = true;
    }
}

fn updated_src(element: &Element) -> Option<&str> {
    match element {
        Element::Image(image) => Some(image.src.as_str()),
        _ => None,
    }
}
