use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, ImageDecoder, ImageReader};
use image::metadata::Orientation;

use crate::assets::RenderAsset;
use crate::assets::exif::parse_exif;
use crate::compose::surface::Surface;

/// Turns one source into a [`RenderAsset`]. Runs on a blocking worker thread.
pub trait AssetDecoder: Send + Sync + 'static {
    fn decode(&self, index: usize, source: &Path) -> anyhow::Result<RenderAsset>;
}

/// Decodes image files with the `image` crate, honoring EXIF orientation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileDecoder;

impl AssetDecoder for ImageFileDecoder {
    fn decode(&self, index: usize, source: &Path) -> anyhow::Result<RenderAsset> {
        let reader = ImageReader::open(source)
            .with_context(|| format!("open image '{}'", source.display()))?
            .with_guessed_format()
            .with_context(|| format!("sniff image format of '{}'", source.display()))?;
        let mut decoder = reader
            .into_decoder()
            .with_context(|| format!("create decoder for '{}'", source.display()))?;

        // Metadata read failures are not fatal: the photo still renders, just unrotated/uncaptioned.
        let raw_exif = decoder.exif_metadata().ok().flatten();
        let orientation = raw_exif
            .as_deref()
            .and_then(Orientation::from_exif_chunk)
            .unwrap_or(Orientation::NoTransforms);
        let exif = raw_exif.as_deref().map(parse_exif).unwrap_or_default();

        let mut img = DynamicImage::from_decoder(decoder)
            .with_context(|| format!("decode image '{}'", source.display()))?;
        img.apply_orientation(orientation);

        let image = surface_from_dynamic(img)?;
        tracing::debug!(
            index,
            width = image.width(),
            height = image.height(),
            "decoded source image"
        );
        Ok(RenderAsset::new(index, source, image).with_exif(exif))
    }
}

pub(crate) fn surface_from_dynamic(img: DynamicImage) -> anyhow::Result<Surface> {
    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        anyhow::bail!("image has zero size");
    }
    Ok(Surface::from_straight_rgba8(width, height, rgba.into_raw())?)
}
