//! Image optimization pipeline.
//!
//! Pure byte-buffer transform: decode, shrink-only aspect-fit resize, and
//! re-encode at a requested quality. No filesystem or network access; the
//! caller decides where the output goes.
//!
//! Oversized results are retried at reduced quality and dimensions until
//! they fit under the 5 MB ceiling or the quality floor is reached.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use thiserror::Error;
use tracing::{debug, instrument};

/// Encoded size ceiling. Results above this are re-encoded smaller.
const MAX_ENCODED_BYTES: usize = 5 * 1024 * 1024;
/// Quality floor for the retry ladder.
const MIN_QUALITY: f32 = 0.5;
/// Quality reduction per retry.
const QUALITY_STEP: f32 = 0.2;
/// Dimension reduction per retry.
const SHRINK_FACTOR: f32 = 0.8;

/// Errors produced by the pipeline.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Input bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Re-encoding failed.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Resampling failed.
    #[error("failed to resize image: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    /// The input is not a well-formed base64 `data:` URL.
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// The requested output format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Supported output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Lossy default.
    #[default]
    Jpeg,
    /// Lossless, keeps transparency.
    Png,
}

impl OutputFormat {
    /// Parse a format name (`jpeg`, `jpg`, `png`).
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::UnsupportedFormat`] for anything else.
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(ImageError::UnsupportedFormat(other.to_string())),
        }
    }

    /// File extension used in generated blob names.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// MIME type recorded on the stored blob.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Options for [`optimize`].
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Maximum output width.
    pub max_width: u32,
    /// Maximum output height.
    pub max_height: u32,
    /// Encoding quality in `0.0..=1.0` (JPEG only).
    pub quality: f32,
    /// Output encoding.
    pub format: OutputFormat,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
            quality: 0.8,
            format: OutputFormat::default(),
        }
    }
}

/// An optimized image ready for upload.
#[derive(Debug, Clone)]
pub struct Optimized {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Encoding the bytes are in.
    pub format: OutputFormat,
    /// Quality the bytes were encoded at.
    pub quality: f32,
}

impl Optimized {
    /// Encoded size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Resize and re-encode an image to bounded dimensions and file size.
///
/// The source format is sniffed from the bytes. Output dimensions preserve
/// the aspect ratio and never exceed the configured maximums; images already
/// within bounds are not upscaled. If the encoded result exceeds the 5 MB
/// ceiling, the encode is retried with quality lowered by 0.2 (floor 0.5)
/// and target dimensions scaled by 0.8 until it fits or the floor is hit.
///
/// # Errors
///
/// Returns [`ImageError`] if the input cannot be decoded or the output
/// cannot be encoded. Never returns a partial result.
#[instrument(skip(bytes, options), fields(input_size = bytes.len()))]
pub fn optimize(bytes: &[u8], options: &OptimizeOptions) -> Result<Optimized, ImageError> {
    let source = image::load_from_memory(bytes).map_err(ImageError::Decode)?;

    let mut max_width = options.max_width.max(1);
    let mut max_height = options.max_height.max(1);
    let mut quality = options.quality.clamp(MIN_QUALITY, 1.0);

    loop {
        let (width, height) = fit_dimensions(source.width(), source.height(), max_width, max_height);
        let resized = resample(&source, width, height)?;
        let encoded = encode(&resized, options.format, quality)?;

        if encoded.len() <= MAX_ENCODED_BYTES || quality <= MIN_QUALITY {
            debug!(width, height, size = encoded.len(), "image optimized");
            return Ok(Optimized {
                bytes: encoded,
                width,
                height,
                format: options.format,
                quality,
            });
        }

        // Still over the ceiling: drop quality a step and shrink the target.
        quality = (quality - QUALITY_STEP).max(MIN_QUALITY);
        max_width = scaled(width);
        max_height = scaled(height);
        debug!(quality, max_width, max_height, "encoded output over ceiling, retrying");
    }
}

/// Target dimensions fitting inside `max_width`×`max_height`, aspect ratio
/// preserved, shrink-only.
fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    )
    .min(1.0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let fitted = |dim: u32| ((f64::from(dim) * scale).round() as u32).max(1);
    (fitted(width), fitted(height))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(dim: u32) -> u32 {
    ((dim as f32) * SHRINK_FACTOR).floor().max(1.0) as u32
}

/// Resample with a Lanczos3 convolution filter.
fn resample(
    source: &image::DynamicImage,
    width: u32,
    height: u32,
) -> Result<image::DynamicImage, ImageError> {
    if width == source.width() && height == source.height() {
        return Ok(source.clone());
    }

    let mut destination = image::DynamicImage::new(width, height, source.color());
    let mut resizer = fast_image_resize::Resizer::new();
    resizer.resize(
        source,
        &mut destination,
        Some(&fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Convolution(fast_image_resize::FilterType::Lanczos3),
        )),
    )?;
    Ok(destination)
}

/// Encode to the requested format.
fn encode(
    image: &image::DynamicImage,
    format: OutputFormat,
    quality: f32,
) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        OutputFormat::Jpeg => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            // JPEG has no alpha channel.
            JpegEncoder::new_with_quality(&mut buffer, percent)
                .encode_image(&image.to_rgb8())
                .map_err(ImageError::Encode)?;
        }
        OutputFormat::Png => {
            image
                .write_with_encoder(PngEncoder::new(&mut buffer))
                .map_err(ImageError::Encode)?;
        }
    }
    Ok(buffer.into_inner())
}

// =============================================================================
// Data URLs
// =============================================================================

/// A parsed base64 `data:` URL.
#[derive(Debug, Clone)]
pub struct DataUrl {
    /// Declared MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Decoded payload.
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parse a `data:{mime};base64,{payload}` URL.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidDataUrl`] if the scheme, encoding
    /// marker, or base64 payload is malformed.
    pub fn parse(input: &str) -> Result<Self, ImageError> {
        use base64::Engine as _;

        let rest = input
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing data: scheme".to_string()))?;
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing base64 marker".to_string()))?;

        if mime_type.is_empty() {
            return Err(ImageError::InvalidDataUrl("empty MIME type".to_string()));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ImageError::InvalidDataUrl(e.to_string()))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode a solid-color test image of the given dimensions as PNG bytes.
    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 80, 200]),
        ));
        let mut buffer = Cursor::new(Vec::new());
        img.write_with_encoder(PngEncoder::new(&mut buffer)).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_wide_image_is_fit_to_max_width() {
        let input = png_fixture(1600, 800);
        let out = optimize(&input, &OptimizeOptions::default()).unwrap();
        assert_eq!(out.width, 800);
        assert_eq!(out.height, 400);
        assert_eq!(out.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_tall_image_is_fit_to_max_height() {
        let input = png_fixture(400, 1200);
        let out = optimize(&input, &OptimizeOptions::default()).unwrap();
        assert_eq!(out.height, 800);
        // 400 * (800/1200) = 266.67, rounded
        assert!((266..=267).contains(&out.width));
    }

    #[test]
    fn test_small_image_is_never_upscaled() {
        let input = png_fixture(400, 300);
        let out = optimize(&input, &OptimizeOptions::default()).unwrap();
        assert_eq!((out.width, out.height), (400, 300));
    }

    #[test]
    fn test_png_output_keeps_png_magic() {
        let input = png_fixture(100, 100);
        let out = optimize(
            &input,
            &OptimizeOptions {
                format: OutputFormat::Png,
                ..OptimizeOptions::default()
            },
        )
        .unwrap();
        assert_eq!(&out.bytes[..4], b"\x89PNG".as_slice());
    }

    #[test]
    fn test_jpeg_output_keeps_jpeg_magic() {
        let input = png_fixture(100, 100);
        let out = optimize(&input, &OptimizeOptions::default()).unwrap();
        assert_eq!(&out.bytes[..2], [0xFF, 0xD8].as_slice());
    }

    #[test]
    fn test_garbage_input_is_a_decode_error() {
        let err = optimize(b"definitely not an image", &OptimizeOptions::default()).unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
    }

    #[test]
    fn test_fit_dimensions() {
        assert_eq!(fit_dimensions(1600, 800, 800, 800), (800, 400));
        assert_eq!(fit_dimensions(800, 1600, 800, 800), (400, 800));
        assert_eq!(fit_dimensions(400, 300, 800, 800), (400, 300));
        assert_eq!(fit_dimensions(1, 10_000, 800, 800), (1, 800));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("JPEG").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("png").unwrap(), OutputFormat::Png);
        assert!(matches!(
            OutputFormat::parse("webp"),
            Err(ImageError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_data_url_roundtrip() {
        use base64::Engine as _;

        let payload = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
        let parsed = DataUrl::parse(&format!("data:image/png;base64,{payload}")).unwrap();
        assert_eq!(parsed.mime_type, "image/png");
        assert_eq!(parsed.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_data_url_rejects_malformed_input() {
        assert!(DataUrl::parse("http://example.com/x.png").is_err());
        assert!(DataUrl::parse("data:image/png,plain").is_err());
        assert!(DataUrl::parse("data:image/png;base64,!!!not-base64!!!").is_err());
    }
}
