//! Request payloads accepted by the scheduler.
//!
//! The scheduler takes ownership of a payload at submission time and never
//! mutates it. Image bytes are decoded at the boundary (see
//! [`DecodedImage::from_encoded`]) so the backend always receives RGB8 pixels.

use std::fmt;

use crate::error::{EmbeddingError, EmbeddingResult};

use super::RequestKind;

// ============================================================================
// DECODED IMAGE
// ============================================================================

/// Decoded image in packed RGB8 layout (`width * height * 3` bytes).
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Build from raw RGB8 pixels.
    ///
    /// # Errors
    /// * `EmbeddingError::EmptyInput` if either dimension is zero
    /// * `EmbeddingError::InvalidImage` if the buffer length does not match
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> EmbeddingResult<Self> {
        if width == 0 || height == 0 {
            return Err(EmbeddingError::EmptyInput);
        }
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(EmbeddingError::InvalidImage {
                reason: format!(
                    "expected {} bytes for {}x{} RGB8, got {}",
                    expected,
                    width,
                    height,
                    pixels.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an encoded image (PNG, JPEG, WebP) and convert it to RGB8.
    ///
    /// Grayscale, palette and alpha images are converted; the alpha channel
    /// is discarded.
    ///
    /// # Errors
    /// * `EmbeddingError::EmptyInput` for an empty buffer
    /// * `EmbeddingError::InvalidImage` if the format is unknown or corrupt
    pub fn from_encoded(bytes: &[u8]) -> EmbeddingResult<Self> {
        if bytes.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let decoded = image::load_from_memory(bytes).map_err(|e| EmbeddingError::InvalidImage {
            reason: e.to_string(),
        })?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();

        Self::from_rgb8(width, height, rgb.into_raw())
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB8 pixel data, row-major.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

// Pixel buffers are large; keep Debug output to the shape.
impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

// ============================================================================
// MODEL INPUT
// ============================================================================

/// A single payload submitted to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    Image(DecodedImage),
    Text(String),
}

impl ModelInput {
    /// Text input. Any string is accepted, including the empty string.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        ModelInput::Text(content.into())
    }

    /// Image input from already-decoded pixels.
    #[must_use]
    pub fn image(image: DecodedImage) -> Self {
        ModelInput::Image(image)
    }

    /// Kind used for batch partitioning.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            ModelInput::Image(_) => RequestKind::Image,
            ModelInput::Text(_) => RequestKind::Text,
        }
    }
}

impl From<DecodedImage> for ModelInput {
    fn from(image: DecodedImage) -> Self {
        ModelInput::Image(image)
    }
}

impl From<String> for ModelInput {
    fn from(text: String) -> Self {
        ModelInput::Text(text)
    }
}

impl From<&str> for ModelInput {
    fn from(text: &str) -> Self {
        ModelInput::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(img: image::DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)
            .expect("png encoding");
        buf.into_inner()
    }

    #[test]
    fn test_from_rgb8_accepts_matching_buffer() {
        let img = DecodedImage::from_rgb8(2, 3, vec![7; 18]).unwrap();
        assert_eq!(img.width(), 2);
        assert_eq!(img.height(), 3);
        assert_eq!(img.pixels().len(), 18);
    }

    #[test]
    fn test_from_rgb8_rejects_wrong_length() {
        let err = DecodedImage::from_rgb8(2, 2, vec![0; 11]).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidImage { .. }));
        assert!(err.to_string().contains("expected 12 bytes"));
    }

    #[test]
    fn test_from_rgb8_rejects_zero_dimension() {
        let err = DecodedImage::from_rgb8(0, 4, Vec::new()).unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyInput));
    }

    #[test]
    fn test_from_encoded_converts_rgba_to_rgb() {
        let rgba = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 128]));
        let bytes = encode_png(image::DynamicImage::ImageRgba8(rgba));

        let img = DecodedImage::from_encoded(&bytes).unwrap();

        assert_eq!((img.width(), img.height()), (4, 2));
        assert_eq!(img.pixels().len(), 4 * 2 * 3);
        assert_eq!(&img.pixels()[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_from_encoded_converts_grayscale_to_rgb() {
        let gray = image::GrayImage::from_pixel(3, 3, image::Luma([200]));
        let bytes = encode_png(image::DynamicImage::ImageLuma8(gray));

        let img = DecodedImage::from_encoded(&bytes).unwrap();
        assert_eq!(&img.pixels()[..3], &[200, 200, 200]);
    }

    #[test]
    fn test_from_encoded_rejects_garbage() {
        let err = DecodedImage::from_encoded(b"definitely not an image").unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidImage { .. }));
    }

    #[test]
    fn test_from_encoded_rejects_empty() {
        assert!(matches!(
            DecodedImage::from_encoded(&[]),
            Err(EmbeddingError::EmptyInput)
        ));
    }

    #[test]
    fn test_model_input_kind() {
        let img = DecodedImage::from_rgb8(1, 1, vec![0, 0, 0]).unwrap();
        assert_eq!(ModelInput::image(img).kind(), RequestKind::Image);
        assert_eq!(ModelInput::text("hi").kind(), RequestKind::Text);
        assert_eq!(ModelInput::from("").kind(), RequestKind::Text);
    }

    #[test]
    fn test_debug_omits_pixel_data() {
        let img = DecodedImage::from_rgb8(1, 1, vec![1, 2, 3]).unwrap();
        let dbg = format!("{:?}", img);
        assert!(dbg.contains("bytes: 3"));
        assert!(!dbg.contains("[1, 2, 3]"));
    }
}
