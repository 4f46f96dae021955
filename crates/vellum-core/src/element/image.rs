//! Image element payload: source reference, natural size, color adjustments.

use serde::{Deserialize, Serialize};

/// Image format for embedded image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Color adjustments applied to an image element.
///
/// Brightness/contrast/saturation are percentages where 100 is neutral,
/// hue is a rotation in degrees, blur a pixel radius clamped to [0, 20].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageAdjustments {
    #[serde(default = "neutral_percent")]
    pub brightness: f64,
    #[serde(default = "neutral_percent")]
    pub contrast: f64,
    #[serde(default = "neutral_percent")]
    pub saturation: f64,
    /// Hue rotation in degrees.
    #[serde(default)]
    pub hue: f64,
    /// Gaussian blur radius in pixels.
    #[serde(default)]
    pub blur: f64,
}

fn neutral_percent() -> f64 {
    100.0
}

/// Maximum supported blur radius in pixels.
pub const MAX_BLUR_RADIUS: f64 = 20.0;

impl Default for ImageAdjustments {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
            blur: 0.0,
        }
    }
}

impl ImageAdjustments {
    /// True when every channel is at its neutral value.
    pub fn is_neutral(&self) -> bool {
        (self.brightness - 100.0).abs() < f64::EPSILON
            && (self.contrast - 100.0).abs() < f64::EPSILON
            && (self.saturation - 100.0).abs() < f64::EPSILON
            && self.hue.abs() < f64::EPSILON
            && self.blur.abs() < f64::EPSILON
    }

    /// Clamp all channels into their supported ranges.
    pub fn clamped(&self) -> Self {
        Self {
            brightness: self.brightness.clamp(0.0, 200.0),
            contrast: self.contrast.clamp(0.0, 200.0),
            saturation: self.saturation.clamp(0.0, 200.0),
            hue: self.hue.rem_euclid(360.0),
            blur: self.blur.clamp(0.0, MAX_BLUR_RADIUS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        let mut webp = Vec::new();
        webp.extend_from_slice(b"RIFF");
        webp.extend_from_slice(&[0, 0, 0, 0]);
        webp.extend_from_slice(b"WEBP");
        assert_eq!(ImageFormat::from_magic_bytes(&webp), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_magic_bytes(&[0, 1]), None);
    }

    #[test]
    fn test_neutral_adjustments() {
        assert!(ImageAdjustments::default().is_neutral());
        let tinted = ImageAdjustments {
            hue: 90.0,
            ..Default::default()
        };
        assert!(!tinted.is_neutral());
    }

    #[test]
    fn test_clamping() {
        let wild = ImageAdjustments {
            brightness: 500.0,
            contrast: -10.0,
            saturation: 150.0,
            hue: -90.0,
            blur: 100.0,
        };
        let clamped = wild.clamped();
        assert!((clamped.brightness - 200.0).abs() < f64::EPSILON);
        assert!((clamped.contrast - 0.0).abs() < f64::EPSILON);
        assert!((clamped.hue - 270.0).abs() < f64::EPSILON);
        assert!((clamped.blur - MAX_BLUR_RADIUS).abs() < f64::EPSILON);
    }
}
