//! Image attachments for multimodal prompts.

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use vasari_error::{ImageError, ImageErrorKind, VasariResult};

/// Fidelity hint sent with an inline image.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageDetail {
    /// Let the provider choose
    #[default]
    Auto,
    /// Low fidelity
    Low,
    /// High fidelity
    High,
}

/// A decoded image attached to a completion request.
///
/// # Examples
///
/// ```
/// use image::DynamicImage;
/// use vasari_core::{ImageDetail, ImageInput};
///
/// let input = ImageInput::new(DynamicImage::new_rgb8(64, 32)).with_detail(ImageDetail::High);
/// assert_eq!(input.dimensions(), (64, 32));
/// assert_eq!(input.detail(), ImageDetail::High);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    image: DynamicImage,
    detail: ImageDetail,
}

/// Longest side an image is fitted into before tiling.
const TILE_FIT: u32 = 1024;
/// Edge length of a billing tile.
const TILE_EDGE: u32 = 512;
/// Flat token charge per image.
const BASE_IMAGE_TOKENS: u64 = 85;
/// Token charge per tile.
const TOKENS_PER_TILE: u64 = 170;

impl ImageInput {
    /// Wrap a decoded image with the default detail level.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            detail: ImageDetail::default(),
        }
    }

    /// Decode an image from disk.
    ///
    /// # Errors
    ///
    /// Returns an image decode error if the file cannot be read or parsed.
    pub fn open(path: impl AsRef<std::path::Path>) -> VasariResult<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| {
            ImageError::new(ImageErrorKind::Decode(format!("{}: {}", path.display(), e)))
        })?;
        Ok(Self::new(image))
    }

    /// Set the detail hint.
    pub fn with_detail(mut self, detail: ImageDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Replace the pixels while keeping the detail hint.
    pub fn with_image(mut self, image: DynamicImage) -> Self {
        self.image = image;
        self
    }

    /// The decoded image.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// The detail hint.
    pub fn detail(&self) -> ImageDetail {
        self.detail
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Approximate prompt tokens this image costs.
    ///
    /// The image is fitted into a 1024 px square, cut into 512 px tiles, and
    /// charged 85 tokens plus 170 per tile.
    pub fn approx_tokens(&self) -> u64 {
        let (width, height) = self.dimensions();
        let (width, height) = fit_within(width, height, TILE_FIT);
        let tiles = u64::from(width.div_ceil(TILE_EDGE)) * u64::from(height.div_ceil(TILE_EDGE));
        BASE_IMAGE_TOKENS + TOKENS_PER_TILE * tiles
    }
}

fn fit_within(width: u32, height: u32, limit: u32) -> (u32, u32) {
    if width <= limit && height <= limit {
        return (width, height);
    }
    if width > height {
        let scaled = (u64::from(height) * u64::from(limit) / u64::from(width)) as u32;
        (limit, scaled)
    } else {
        let scaled = (u64::from(width) * u64::from(limit) / u64::from(height)) as u32;
        (scaled, limit)
    }
}
