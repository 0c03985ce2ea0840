//! Effective image settings for a device.
//!
//! Three tiers, strictly ordered:
//!
//! 1. A device model, when the device references one, supplies every field.
//! 2. Otherwise each field comes from the device's own override.
//! 3. Anything still missing falls back to the system defaults.
//!
//! Model and device fields are never mixed. The explicit image format has no
//! default: a device without one resolves to `None` and the renderer decides.

use serde::{Deserialize, Serialize};

use crate::format::{classify, ImageFormat};
use crate::model::{DeviceModelSnapshot, DeviceSnapshot};
use crate::{
    DEFAULT_BIT_DEPTH, DEFAULT_COLORS, DEFAULT_MIME_TYPE, DEFAULT_ROTATION, DEFAULT_SCALE_FACTOR,
    DISPLAY_HEIGHT, DISPLAY_WIDTH,
};

/// Fully resolved rendering configuration.
///
/// Built fresh by [`resolve`] on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveImageSettings {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of colors
    pub colors: u32,
    /// Bits per pixel
    pub bit_depth: u8,
    /// Render scale factor
    pub scale_factor: f64,
    /// Rotation in degrees
    pub rotation: i32,
    /// Output MIME type
    pub mime_type: String,
    /// Horizontal offset in pixels
    pub offset_x: i32,
    /// Vertical offset in pixels
    pub offset_y: i32,
    /// Explicit output format, if one was configured
    pub image_format: Option<ImageFormat>,
    /// Whether the values came from a device model
    pub use_model_settings: bool,
}

impl Default for EffectiveImageSettings {
    fn default() -> Self {
        Self {
            width: DISPLAY_WIDTH,
            height: DISPLAY_HEIGHT,
            colors: DEFAULT_COLORS,
            bit_depth: DEFAULT_BIT_DEPTH,
            scale_factor: DEFAULT_SCALE_FACTOR,
            rotation: DEFAULT_ROTATION,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            offset_x: 0,
            offset_y: 0,
            image_format: None,
            use_model_settings: false,
        }
    }
}

impl EffectiveImageSettings {
    /// Format the renderer should produce.
    ///
    /// The explicit format when set, otherwise the classification of
    /// mime type, bit depth and colors.
    pub fn output_format(&self) -> ImageFormat {
        self.image_format
            .unwrap_or_else(|| classify(&self.mime_type, self.bit_depth, self.colors))
    }
}

impl From<&DeviceModelSnapshot> for EffectiveImageSettings {
    fn from(model: &DeviceModelSnapshot) -> Self {
        Self {
            width: model.width,
            height: model.height,
            colors: model.colors,
            bit_depth: model.bit_depth,
            scale_factor: model.scale_factor,
            rotation: model.rotation,
            mime_type: model.mime_type.clone(),
            offset_x: model.offset_x,
            offset_y: model.offset_y,
            image_format: Some(classify(&model.mime_type, model.bit_depth, model.colors)),
            use_model_settings: true,
        }
    }
}

/// Resolve the effective image settings for a device.
///
/// # Example
///
/// ```
/// use trmnl_engine::{resolve, DeviceSnapshot};
///
/// let device = DeviceSnapshot::new(1).with_rotation(180);
/// let settings = resolve(&device, None);
///
/// assert_eq!(settings.width, 800);
/// assert_eq!(settings.rotation, 180);
/// assert!(!settings.use_model_settings);
/// assert!(settings.image_format.is_none());
/// ```
pub fn resolve(
    device: &DeviceSnapshot,
    model: Option<&DeviceModelSnapshot>,
) -> EffectiveImageSettings {
    if let Some(model) = model {
        tracing::debug!(
            device_id = device.id,
            model_id = model.id,
            "Using device model image settings"
        );
        return EffectiveImageSettings::from(model);
    }

    let defaults = EffectiveImageSettings::default();
    EffectiveImageSettings {
        width: device.width.unwrap_or(defaults.width),
        height: device.height.unwrap_or(defaults.height),
        rotation: device.rotate.unwrap_or(defaults.rotation),
        image_format: device.image_format.as_deref().map(parse_device_format),
        ..defaults
    }
}

fn parse_device_format(raw: &str) -> ImageFormat {
    raw.parse().unwrap_or_else(|e| {
        tracing::warn!("{}, falling back to auto", e);
        ImageFormat::Auto
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DeviceModelSnapshot {
        DeviceModelSnapshot {
            id: 5,
            name: Some("xl".to_string()),
            width: 1024,
            height: 768,
            colors: 256,
            bit_depth: 8,
            scale_factor: 1.5,
            rotation: 90,
            mime_type: "image/png".to_string(),
            offset_x: 10,
            offset_y: 20,
        }
    }

    #[test]
    fn test_model_settings_are_authoritative() {
        let device = DeviceSnapshot::new(1)
            .with_device_model(5)
            .with_dimensions(640, 384)
            .with_rotation(180)
            .with_image_format("png_1bit");

        let settings = resolve(&device, Some(&model()));
        assert_eq!(settings.width, 1024);
        assert_eq!(settings.height, 768);
        assert_eq!(settings.colors, 256);
        assert_eq!(settings.bit_depth, 8);
        assert_eq!(settings.scale_factor, 1.5);
        assert_eq!(settings.rotation, 90);
        assert_eq!(settings.mime_type, "image/png");
        assert_eq!(settings.offset_x, 10);
        assert_eq!(settings.offset_y, 20);
        assert_eq!(settings.image_format, Some(ImageFormat::PngEightBit256c));
        assert!(settings.use_model_settings);
    }

    #[test]
    fn test_device_overrides_without_model() {
        let device = DeviceSnapshot::new(1)
            .with_dimensions(800, 480)
            .with_rotation(180)
            .with_image_format("png_8bit_grayscale");

        let settings = resolve(&device, None);
        assert_eq!(settings.width, 800);
        assert_eq!(settings.height, 480);
        assert_eq!(settings.rotation, 180);
        assert_eq!(settings.image_format, Some(ImageFormat::PngEightBitGrayscale));
        assert!(!settings.use_model_settings);
    }

    #[test]
    fn test_defaults_for_missing_device_properties() {
        let settings = resolve(&DeviceSnapshot::new(1), None);
        assert_eq!(settings.width, 800);
        assert_eq!(settings.height, 480);
        assert_eq!(settings.rotation, 0);
        assert_eq!(settings.colors, 2);
        assert_eq!(settings.bit_depth, 1);
        assert_eq!(settings.scale_factor, 1.0);
        assert_eq!(settings.mime_type, "image/png");
        assert_eq!(settings.offset_x, 0);
        assert_eq!(settings.offset_y, 0);
        assert_eq!(settings.image_format, None);
        assert!(!settings.use_model_settings);
    }

    #[test]
    fn test_unknown_device_format_degrades_to_auto() {
        let device = DeviceSnapshot::new(1).with_image_format("webp_lossless");
        let settings = resolve(&device, None);
        assert_eq!(settings.image_format, Some(ImageFormat::Auto));
    }

    #[test]
    fn test_output_format() {
        // Defaults are 1-bit PNG with 2 colors, which no rule covers
        let settings = resolve(&DeviceSnapshot::new(1), None);
        assert_eq!(settings.output_format(), ImageFormat::Auto);

        let bmp = EffectiveImageSettings {
            mime_type: "image/bmp".to_string(),
            ..EffectiveImageSettings::default()
        };
        assert_eq!(bmp.output_format(), ImageFormat::Bmp3OneBitSrgb);

        let explicit = EffectiveImageSettings {
            image_format: Some(ImageFormat::PngOneBit),
            ..bmp
        };
        assert_eq!(explicit.output_format(), ImageFormat::PngOneBit);
    }
}
