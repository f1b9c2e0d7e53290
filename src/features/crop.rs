use crate::error::{Result, SignatureError};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{imageops, ColorType, DynamicImage, ImageEncoder, RgbaImage};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Inclusive pixel bounds of drawn content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl ContentBounds {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Grows the box by `padding` on every side, clamped to a `width` x `height` raster.
    pub fn padded(self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(padding),
            min_y: self.min_y.saturating_sub(padding),
            max_x: self.max_x.saturating_add(padding).min(width.saturating_sub(1)),
            max_y: self.max_y.saturating_add(padding).min(height.saturating_sub(1)),
        }
    }
}

/// Bounding box of every pixel with non-zero alpha, or `None` for a blank raster.
pub fn content_bounds(image: &RgbaImage) -> Option<ContentBounds> {
    let mut bounds: Option<ContentBounds> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => ContentBounds {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            },
            Some(b) => ContentBounds {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        });
    }
    bounds
}

/// Copies the padded content box into a new minimal raster. A blank raster
/// comes back whole.
pub fn crop_to_content(image: &RgbaImage, padding: u32) -> RgbaImage {
    match content_bounds(image) {
        None => image.clone(),
        Some(bounds) => {
            let b = bounds.padded(padding, image.width(), image.height());
            imageops::crop_imm(image, b.min_x, b.min_y, b.width(), b.height()).to_image()
        }
    }
}

/// Crops and encodes in one step, as the place buttons need it.
pub fn cropped_data_url(image: &RgbaImage, padding: u32) -> Result<String> {
    encode_png_data_url(&crop_to_content(image, padding))
}

pub fn encode_png_data_url(image: &RgbaImage) -> Result<String> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| SignatureError::Encode(e.to_string()))?;
    Ok(format!("{PNG_DATA_URL_PREFIX}{}", B64.encode(buf)))
}

/// Decodes a `data:<mime>;base64,` URL, or bare base64, into an image.
pub fn decode_data_url(data_url: &str) -> Result<DynamicImage> {
    let payload = match data_url.strip_prefix("data:") {
        Some(rest) => {
            let (meta, body) = rest
                .split_once(',')
                .ok_or_else(|| SignatureError::InvalidDataUrl("missing_payload".into()))?;
            if !meta.ends_with(";base64") {
                return Err(SignatureError::InvalidDataUrl("not_base64".into()));
            }
            body
        }
        None => data_url,
    };
    let bytes = B64
        .decode(payload.trim().as_bytes())
        .map_err(|e| SignatureError::InvalidDataUrl(e.to_string()))?;
    Ok(image::load_from_memory(&bytes)?)
}
