//! Resource preparation: image decoding and text measurement.
//!
//! Resource preparation happens before a node is materialized, on the
//! single UI thread. Decode failures are transient errors: they are
//! logged and the element falls back to a placeholder, never a panic or
//! a dropped node.

use base64::Engine as _;
use kurbo::Size;
use log::{debug, error};
use std::collections::HashMap;
use std::sync::Arc;
use vellum_core::{Element, ElementId, FontWeight, ImageFormat};

use crate::error::RenderError;

/// A decoded RGBA8 texture, shared between the cache and scene nodes.
#[derive(Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8, row-major.
    pub rgba: Arc<Vec<u8>>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Textures prepared for one element, keyed by `src`.
#[derive(Debug, Clone, Default)]
pub struct PreparedResources {
    pub textures: HashMap<String, Arc<DecodedImage>>,
}

impl PreparedResources {
    pub fn texture(&self, src: &str) -> Option<&Arc<DecodedImage>> {
        self.textures.get(src)
    }
}

/// Prepares and releases per-element resources.
pub trait ResourceManager {
    /// Decode whatever the element needs before materialization.
    /// Failures are reflected as missing textures, not errors.
    fn prepare_resources(&mut self, element: &Element) -> PreparedResources;

    /// Cached texture lookup by source key.
    fn texture(&self, src: &str) -> Option<Arc<DecodedImage>>;

    /// Release the resources held for an element. Safe on unknown ids.
    fn cleanup_element_resources(&mut self, id: ElementId);

    /// Release everything.
    fn clear(&mut self);
}

/// Default resource manager: decodes embedded base64 payloads with the
/// `image` crate and caches per `src`, refcounted by element usage.
#[derive(Default)]
pub struct InMemoryResourceManager {
    cache: HashMap<String, Arc<DecodedImage>>,
    /// Which source keys each element holds alive.
    element_keys: HashMap<ElementId, Vec<String>>,
}

impl InMemoryResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-decoded texture, e.g. one uploaded by the host.
    pub fn insert_texture(&mut self, src: impl Into<String>, texture: DecodedImage) {
        self.cache.insert(src.into(), Arc::new(texture));
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn decode(src: &str, data_base64: &str) -> Result<DecodedImage, RenderError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data_base64)
            .map_err(|err| RenderError::ResourceFailure {
                src: src.to_string(),
                reason: format!("base64: {err}"),
            })?;
        if let Some(format) = ImageFormat::from_magic_bytes(&bytes) {
            debug!("Decoding '{src}' as {}", format.mime_type());
        }
        let decoded =
            image::load_from_memory(&bytes).map_err(|err| RenderError::ResourceFailure {
                src: src.to_string(),
                reason: err.to_string(),
            })?;
        let rgba = decoded.to_rgba8();
        Ok(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            rgba: Arc::new(rgba.into_raw()),
        })
    }

    fn retain_key(&mut self, id: ElementId, src: &str) {
        let keys = self.element_keys.entry(id).or_default();
        if !keys.iter().any(|key| key == src) {
            keys.push(src.to_string());
        }
    }

    /// Drop cache entries no surviving element references.
    fn evict_unreferenced(&mut self) {
        let element_keys = &self.element_keys;
        self.cache.retain(|src, _| {
            element_keys
                .values()
                .any(|keys| keys.iter().any(|key| key == src))
        });
    }
}

impl ResourceManager for InMemoryResourceManager {
    fn prepare_resources(&mut self, element: &Element) -> PreparedResources {
        let mut prepared = PreparedResources::default();
        let Element::Image(image) = element else {
            return prepared;
        };

        if !self.cache.contains_key(&image.src) {
            if let Some(payload) = &image.data_base64 {
                // A decode failure is transient: the node draws its
                // placeholder and a later payload may still succeed.
                match Self::decode(&image.src, payload) {
                    Ok(decoded) => {
                        self.cache.insert(image.src.clone(), Arc::new(decoded));
                    }
                    Err(err) => error!("{err}"),
                }
            }
        }

        if let Some(texture) = self.cache.get(&image.src) {
            prepared
                .textures
                .insert(image.src.clone(), Arc::clone(texture));
            self.retain_key(element.id(), &image.src);
        }
        prepared
    }

    fn texture(&self, src: &str) -> Option<Arc<DecodedImage>> {
        self.cache.get(src).cloned()
    }

    fn cleanup_element_resources(&mut self, id: ElementId) {
        if self.element_keys.remove(&id).is_some() {
            self.evict_unreferenced();
        }
    }

    fn clear(&mut self) {
        self.cache.clear();
        self.element_keys.clear();
    }
}

/// Text measurement collaborator used by the text strategy.
pub trait TextMeasurer {
    /// Advance width of `text` at the given style.
    fn measure_width(&self, text: &str, font_size: f64, weight: FontWeight, italic: bool) -> f64;

    fn measure(&self, text: &str, font_size: f64, weight: FontWeight, italic: bool) -> Size {
        Size::new(
            self.measure_width(text, font_size, weight, italic),
            font_size,
        )
    }
}

/// Character-count approximation of text width.
///
/// Average advance factors are empirical; actual width depends on the
/// host's fonts, which report exact layout back through the host API.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure_width(&self, text: &str, font_size: f64, weight: FontWeight, italic: bool) -> f64 {
        let factor = match weight {
            FontWeight::Light => 0.50,
            FontWeight::Regular => 0.55,
            FontWeight::Bold => 0.60,
        };
        let slant = if italic { 1.02 } else { 1.0 };
        text.chars().count() as f64 * font_size * factor * slant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid PNG: 1x1 transparent pixel.
    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn image_element(src: &str, payload: Option<&str>) -> Element {
        let mut element = Element::image(0.0, 0.0, src, 1, 1);
        if let Element::Image(image) = &mut element {
            image.data_base64 = payload.map(str::to_string);
        }
        element
    }

    #[test]
    fn test_decode_and_cache() {
        let mut manager = InMemoryResourceManager::new();
        let element = image_element("mem://a", Some(PNG_1X1));

        let prepared = manager.prepare_resources(&element);
        let texture = prepared.texture("mem://a").expect("decoded");
        assert_eq!(texture.width, 1);
        assert_eq!(texture.height, 1);
        assert_eq!(manager.cached_count(), 1);

        // Second element with the same src shares the cache entry.
        let other = image_element("mem://a", Some(PNG_1X1));
        let again = manager.prepare_resources(&other);
        assert!(Arc::ptr_eq(
            again.texture("mem://a").unwrap(),
            prepared.texture("mem://a").unwrap()
        ));
    }

    #[test]
    fn test_decode_failure_yields_no_texture() {
        let mut manager = InMemoryResourceManager::new();
        let element = image_element("mem://bad", Some("not base64 at all!!"));
        let prepared = manager.prepare_resources(&element);
        assert!(prepared.texture("mem://bad").is_none());
        assert_eq!(manager.cached_count(), 0);
    }

    #[test]
    fn test_decode_failure_is_resource_failure() {
        let err = InMemoryResourceManager::decode("mem://bad", "not base64 at all!!").unwrap_err();
        assert!(matches!(err, RenderError::ResourceFailure { .. }));
    }

    #[test]
    fn test_cleanup_evicts_unreferenced() {
        let mut manager = InMemoryResourceManager::new();
        let a = image_element("mem://shared", Some(PNG_1X1));
        let b = image_element("mem://shared", Some(PNG_1X1));
        manager.prepare_resources(&a);
        manager.prepare_resources(&b);

        manager.cleanup_element_resources(a.id());
        assert_eq!(manager.cached_count(), 1, "still referenced by b");
        manager.cleanup_element_resources(b.id());
        assert_eq!(manager.cached_count(), 0);
    }

    #[test]
    fn test_cleanup_unknown_id_is_noop() {
        let mut manager = InMemoryResourceManager::new();
        manager.cleanup_element_resources(ElementId::new_v4());
    }

    #[test]
    fn test_heuristic_measure_scales_with_size() {
        let measurer = HeuristicTextMeasurer;
        let narrow = measurer.measure_width("hello", 16.0, FontWeight::Regular, false);
        let wide = measurer.measure_width("hello", 32.0, FontWeight::Regular, false);
        assert!((wide - narrow * 2.0).abs() < 1e-9);
        let bold = measurer.measure_width("hello", 16.0, FontWeight::Bold, false);
        assert!(bold > narrow);
    }
}
