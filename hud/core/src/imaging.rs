//! Image Fitting
//!
//! HUD image containers take PNG bytes of exactly the container size. Source
//! images are fitted aspect-preserving, centred on a transparent canvas.

use std::io::Cursor;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::debug;

/// Sample image used by the demo pages
pub const DEMO_IMAGE_URL: &str = "https://sbox.studio/images/transparent.png";

/// Where image bytes come from
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch encoded image bytes
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// Fetches images over HTTP
#[derive(Clone, Debug)]
pub struct HttpImageSource {
    http_client: reqwest::Client,
}

impl HttpImageSource {
    /// Create a source with a per-request timeout
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        debug!(url, "Fetching image");
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Image fetch returned {status}");
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Fit an encoded image into a `width` x `height` transparent PNG
///
/// The image is scaled by `min(width / w, height / h)`, never below one
/// pixel per side, and centred.
///
/// # Errors
///
/// Fails if the bytes cannot be decoded or the result cannot be encoded.
pub fn fit_png(bytes: &[u8], width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let source = image::load_from_memory(bytes).context("Failed to decode image")?;
    let (draw_width, draw_height) = fitted_size(source.width(), source.height(), width, height);

    let resized = imageops::resize(&source.to_rgba8(), draw_width, draw_height, FilterType::Triangle);
    let mut canvas = RgbaImage::new(width, height);
    let dx = (width.saturating_sub(draw_width)) / 2;
    let dy = (height.saturating_sub(draw_height)) / 2;
    imageops::replace(&mut canvas, &resized, i64::from(dx), i64::from(dy));

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut out, ImageFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(out.into_inner())
}

/// Size of a `source_width` x `source_height` image fitted into the target box
#[must_use]
pub fn fitted_size(source_width: u32, source_height: u32, width: u32, height: u32) -> (u32, u32) {
    if source_width == 0 || source_height == 0 {
        return (width.max(1), height.max(1));
    }

    let scale = (f64::from(width) / f64::from(source_width))
        .min(f64::from(height) / f64::from(source_height));

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = |side: u32| ((f64::from(side) * scale).floor() as u32).max(1);
    (scaled(source_width), scaled(source_height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_fitted_size_preserves_aspect() {
        assert_eq!(fitted_size(200, 100, 100, 100), (100, 50));
        assert_eq!(fitted_size(50, 200, 100, 100), (25, 100));
        assert_eq!(fitted_size(10, 10, 100, 100), (100, 100));
        assert_eq!(fitted_size(10_000, 1, 100, 100), (100, 1));
    }

    #[test]
    fn test_fit_png_centres_on_transparent_canvas() {
        let fitted = fit_png(&png(200, 100), 100, 100).unwrap();
        let decoded = image::load_from_memory(&fitted).unwrap();

        assert_eq!(decoded.dimensions(), (100, 100));
        // Padding rows above and below stay transparent
        assert_eq!(decoded.get_pixel(50, 0)[3], 0);
        assert_eq!(decoded.get_pixel(50, 99)[3], 0);
        let centre = decoded.get_pixel(50, 50);
        assert_eq!(centre[3], 255);
        assert!(centre[0] > 250);
    }

    #[test]
    fn test_fit_png_rejects_garbage() {
        assert!(fit_png(b"not an image", 10, 10).is_err());
    }
}
