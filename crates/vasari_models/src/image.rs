//! Preparing images for inline upload.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde_json::{Value, json};
use std::io::Cursor;
use tracing::{debug, info, instrument};
use vasari_core::ImageInput;
use vasari_error::{ImageError, ImageErrorKind, VasariResult};

/// Per-step scale factor applied to each dimension.
const SHRINK_FACTOR: f64 = 0.9;
/// Resize steps between progress logs.
const LOG_EVERY: u32 = 5;
/// Default cap on resize steps.
const DEFAULT_MAX_STEPS: u32 = 64;
/// JPEG quality used for upload.
const JPEG_QUALITY: u8 = 95;

/// Shrinks images until their encoded size fits under a byte limit.
///
/// Each step scales both dimensions by 0.9 with Lanczos3 resampling, so the
/// aspect ratio is kept within rounding. Size is measured as PNG.
///
/// # Examples
///
/// ```
/// use image::DynamicImage;
/// use vasari_core::ImageInput;
/// use vasari_models::ImageNormalizer;
///
/// let normalizer = ImageNormalizer::new(5 * 1024 * 1024);
/// let small = ImageInput::new(DynamicImage::new_rgb8(16, 16));
/// let out = normalizer.normalize(small.clone()).unwrap();
/// assert_eq!(out, small);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct ImageNormalizer {
    max_bytes: usize,
    max_steps: u32,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(5 * 1024 * 1024)
    }
}

impl ImageNormalizer {
    /// Normalizer for the given encoded size limit.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Cap the number of resize steps.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Return the image unchanged if it fits, otherwise a shrunk copy.
    ///
    /// # Errors
    ///
    /// Returns an image error if encoding fails, or if the image still does
    /// not fit after the step cap or at one pixel per side.
    #[instrument(skip_all, fields(max_bytes = self.max_bytes))]
    pub fn normalize(&self, input: ImageInput) -> VasariResult<ImageInput> {
        let mut size = encoded_size(input.image())?;
        if size <= self.max_bytes {
            return Ok(input);
        }

        let (width, height) = input.dimensions();
        info!(bytes = size, width, height, "Image exceeds size limit, shrinking");

        let mut current = input.image().clone();
        let mut steps = 0u32;
        while size > self.max_bytes {
            let (width, height) = current.dimensions();
            let next_width = (f64::from(width) * SHRINK_FACTOR) as u32;
            let next_height = (f64::from(height) * SHRINK_FACTOR) as u32;
            if steps >= self.max_steps || next_width == 0 || next_height == 0 {
                return Err(ImageError::new(ImageErrorKind::CannotShrink {
                    width,
                    height,
                    bytes: size,
                    steps,
                    limit: self.max_bytes,
                })
                .into());
            }

            current = current.resize_exact(next_width, next_height, FilterType::Lanczos3);
            size = encoded_size(&current)?;
            steps += 1;

            if steps % LOG_EVERY == 0 {
                info!(
                    bytes = size,
                    width = next_width,
                    height = next_height,
                    steps,
                    "Shrinking image"
                );
            }
        }

        let (width, height) = current.dimensions();
        info!(bytes = size, width, height, steps, "Image shrunk below limit");
        Ok(input.with_image(current))
    }
}

/// Size of the image encoded as PNG, in bytes.
///
/// # Errors
///
/// Returns an image error if encoding fails.
pub fn encoded_size(image: &DynamicImage) -> VasariResult<usize> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ImageError::new(ImageErrorKind::Encode(e.to_string())))?;
    Ok(buffer.into_inner().len())
}

/// Render an image as an `image_url` content part with an inline JPEG
/// `data:` URL.
///
/// # Errors
///
/// Returns an image error if JPEG encoding fails.
pub fn image_content(input: &ImageInput) -> VasariResult<Value> {
    let rgb = input.image().to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ImageError::new(ImageErrorKind::Encode(e.to_string())))?;

    let encoded = STANDARD.encode(&jpeg);
    debug!(base64_bytes = encoded.len(), "Encoded image for upload");

    Ok(json!({
        "type": "image_url",
        "image_url": {
            "url": format!("data:image/jpeg;base64,{}", encoded),
            "detail": input.detail().to_string(),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use vasari_core::ImageDetail;

    /// Pseudo-random pixels so PNG cannot compress them away.
    fn noisy(width: u32, height: u32) -> DynamicImage {
        let mut state: u32 = 0x2545_f491;
        let image = RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(image)
    }

    #[test]
    fn oversized_image_is_shrunk_below_limit() {
        let input = ImageInput::new(noisy(400, 200));
        let original = encoded_size(input.image()).unwrap();
        let limit = original / 3;

        let out = ImageNormalizer::new(limit).normalize(input).unwrap();

        assert!(encoded_size(out.image()).unwrap() <= limit);
        let (width, height) = out.dimensions();
        assert!(width < 400 && height < 200);
        let ratio = f64::from(width) / f64::from(height);
        assert!((ratio - 2.0).abs() < 0.1, "aspect ratio drifted: {}", ratio);
    }

    #[test]
    fn step_cap_reports_cannot_shrink() {
        let input = ImageInput::new(noisy(64, 64));
        let err = ImageNormalizer::new(1)
            .with_max_steps(3)
            .normalize(input)
            .unwrap_err();
        assert!(format!("{}", err).contains("after 3 resize steps"));
    }

    #[test]
    fn tiny_image_hits_the_pixel_floor() {
        let input = ImageInput::new(noisy(4, 4));
        let err = ImageNormalizer::new(1).normalize(input).unwrap_err();
        assert!(format!("{}", err).contains("Image still"));
    }

    #[test]
    fn content_part_is_a_jpeg_data_url() {
        let input = ImageInput::new(noisy(8, 8)).with_detail(ImageDetail::Low);
        let part = image_content(&input).unwrap();
        assert_eq!(part["type"], "image_url");
        assert_eq!(part["image_url"]["detail"], "low");
        let url = part["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
