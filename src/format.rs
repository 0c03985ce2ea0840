//! Output image formats and their classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output image format understood by the rasterizer.
///
/// Serialized as the lowercase identifier the device settings store
/// (e.g. `"png_8bit_grayscale"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Let the renderer decide
    #[serde(rename = "auto")]
    Auto,
    /// 1-bit BMP3 in sRGB (original TRMNL firmware)
    #[serde(rename = "bmp3_1bit_srgb")]
    Bmp3OneBitSrgb,
    /// 1-bit PNG
    #[serde(rename = "png_1bit")]
    PngOneBit,
    /// 2-bit grayscale PNG with 4 colors
    #[serde(rename = "png_2bit_4c")]
    PngTwoBit4c,
    /// 8-bit grayscale PNG
    #[serde(rename = "png_8bit_grayscale")]
    PngEightBitGrayscale,
    /// 8-bit PNG with a 256 color palette
    #[serde(rename = "png_8bit_256c")]
    PngEightBit256c,
}

impl ImageFormat {
    /// All known formats.
    pub const ALL: [ImageFormat; 6] = [
        ImageFormat::Auto,
        ImageFormat::Bmp3OneBitSrgb,
        ImageFormat::PngOneBit,
        ImageFormat::PngTwoBit4c,
        ImageFormat::PngEightBitGrayscale,
        ImageFormat::PngEightBit256c,
    ];

    /// Stored identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Auto => "auto",
            ImageFormat::Bmp3OneBitSrgb => "bmp3_1bit_srgb",
            ImageFormat::PngOneBit => "png_1bit",
            ImageFormat::PngTwoBit4c => "png_2bit_4c",
            ImageFormat::PngEightBitGrayscale => "png_8bit_grayscale",
            ImageFormat::PngEightBit256c => "png_8bit_256c",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ImageFormat::Auto => "Auto",
            ImageFormat::Bmp3OneBitSrgb => "BMP3 1-bit sRGB",
            ImageFormat::PngOneBit => "PNG 1-bit",
            ImageFormat::PngTwoBit4c => "PNG 2-bit Grayscale 4c",
            ImageFormat::PngEightBitGrayscale => "PNG 8-bit Grayscale",
            ImageFormat::PngEightBit256c => "PNG 8-bit 256c",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown image format identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownImageFormat(pub String);

impl fmt::Display for UnknownImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown image format '{}'", self.0)
    }
}

impl std::error::Error for UnknownImageFormat {}

impl FromStr for ImageFormat {
    type Err = UnknownImageFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ImageFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| UnknownImageFormat(s.to_string()))
    }
}

/// Classify a rendering configuration into an output format.
///
/// Exact match on the (mime type, bit depth, colors) triple; anything
/// unrecognized is [`ImageFormat::Auto`].
///
/// # Example
///
/// ```
/// use trmnl_engine::{classify, ImageFormat};
///
/// assert_eq!(classify("image/bmp", 1, 2), ImageFormat::Bmp3OneBitSrgb);
/// assert_eq!(classify("image/jpeg", 16, 65536), ImageFormat::Auto);
/// ```
pub fn classify(mime_type: &str, bit_depth: u8, colors: u32) -> ImageFormat {
    match (mime_type, bit_depth, colors) {
        ("image/bmp", 1, 2) => ImageFormat::Bmp3OneBitSrgb,
        ("image/png", 8, 2) => ImageFormat::PngEightBitGrayscale,
        ("image/png", 8, 256) => ImageFormat::PngEightBit256c,
        ("image/png", 2, 4) => ImageFormat::PngTwoBit4c,
        _ => ImageFormat::Auto,
    }
}
