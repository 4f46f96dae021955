//! Fixed z-ordered drawing layers.

use vellum_core::ElementId;

/// The four compositing layers, in fixed back-to-front paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    Background,
    Elements,
    Selection,
    Overlay,
}

impl LayerId {
    /// All layers, back to front.
    pub const ALL: [LayerId; 4] = [
        LayerId::Background,
        LayerId::Elements,
        LayerId::Selection,
        LayerId::Overlay,
    ];

    fn index(self) -> usize {
        match self {
            LayerId::Background => 0,
            LayerId::Elements => 1,
            LayerId::Selection => 2,
            LayerId::Overlay => 3,
        }
    }
}

#[derive(Debug, Default)]
struct Layer {
    /// (id, z_index) pairs kept sorted by z, stable on ties.
    entries: Vec<(ElementId, i32)>,
    interactive: bool,
}

/// Maintains per-layer z-ordered element lists and interactivity flags.
#[derive(Debug)]
pub struct LayerManager {
    layers: [Layer; 4],
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerManager {
    pub fn new() -> Self {
        let mut manager = Self {
            layers: [
                Layer::default(),
                Layer::default(),
                Layer::default(),
                Layer::default(),
            ],
        };
        // Only the element layer receives input by default; overlays are
        // visual chrome.
        manager.layers[LayerId::Elements.index()].interactive = true;
        manager
    }

    /// Insert an id at its z-sorted position. Re-inserting moves it.
    pub fn insert(&mut self, layer: LayerId, id: ElementId, z_index: i32) {
        let entries = &mut self.layers[layer.index()].entries;
        entries.retain(|(existing, _)| *existing != id);
        let at = entries.partition_point(|(_, z)| *z <= z_index);
        entries.insert(at, (id, z_index));
    }

    /// Remove an id from a layer. Unknown ids are ignored.
    pub fn remove(&mut self, layer: LayerId, id: ElementId) {
        self.layers[layer.index()]
            .entries
            .retain(|(existing, _)| *existing != id);
    }

    /// Remove an id from whatever layer holds it.
    pub fn remove_everywhere(&mut self, id: ElementId) {
        for layer in &mut self.layers {
            layer.entries.retain(|(existing, _)| *existing != id);
        }
    }

    pub fn clear(&mut self, layer: LayerId) {
        self.layers[layer.index()].entries.clear();
    }

    pub fn contains(&self, layer: LayerId, id: ElementId) -> bool {
        self.layers[layer.index()]
            .entries
            .iter()
            .any(|(existing, _)| *existing == id)
    }

    /// Ids of one layer in paint order (ascending z).
    pub fn ids_in_order(&self, layer: LayerId) -> impl Iterator<Item = ElementId> + '_ {
        self.layers[layer.index()].entries.iter().map(|(id, _)| *id)
    }

    /// Every layer's ids in global paint order.
    pub fn paint_order(&self) -> impl Iterator<Item = (LayerId, ElementId)> + '_ {
        LayerId::ALL
            .into_iter()
            .flat_map(|layer| self.ids_in_order(layer).map(move |id| (layer, id)))
    }

    pub fn set_interactive(&mut self, layer: LayerId, interactive: bool) {
        self.layers[layer.index()].interactive = interactive;
    }

    pub fn is_interactive(&self, layer: LayerId) -> bool {
        self.layers[layer.index()].interactive
    }

    pub fn len(&self, layer: LayerId) -> usize {
        self.layers[layer.index()].entries.len()
    }

    pub fn is_empty(&self, layer: LayerId) -> bool {
        self.layers[layer.index()].entries.is_empty()
    }
}
