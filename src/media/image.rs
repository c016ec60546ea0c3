use anyhow::Context;
use image::RgbImage;
use std::path::Path;

/// Collaborator seam for turning an image file into pixel data. Failures are
/// opaque to the engine; a failing image becomes a warning and is skipped.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> anyhow::Result<RgbImage>;
}

/// Default decoder backed by the `image` crate.
#[derive(Debug, Default)]
pub struct StdImageDecoder;

impl ImageDecoder for StdImageDecoder {
    fn decode(&self, path: &Path) -> anyhow::Result<RgbImage> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode image: {}", path.display()))?;
        Ok(image.into_rgb8())
    }
}
