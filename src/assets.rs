//! Source images: decoding, EXIF captions, and the bounded async [`AssetProvider`].

pub mod decode;
pub mod exif;
pub mod provider;

use std::path::{Path, PathBuf};

use crate::compose::surface::Surface;

pub use decode::{AssetDecoder, ImageFileDecoder};
pub use exif::ExifSummary;
pub use provider::{AssetProvider, AssetProviderStats};

/// A decoded, EXIF-oriented source image plus its caption metadata.
#[derive(Clone, Debug)]
pub struct RenderAsset {
    pub index: usize,
    pub source: PathBuf,
    pub image: Surface,
    pub exif: ExifSummary,
}

impl RenderAsset {
    pub fn new(index: usize, source: impl Into<PathBuf>, image: Surface) -> Self {
        Self {
            index,
            source: source.into(),
            image,
            exif: ExifSummary::default(),
        }
    }

    pub fn with_exif(mut self, exif: ExifSummary) -> Self {
        self.exif = exif;
        self
    }

    pub fn caption(&self) -> String {
        self.exif.caption()
    }

    pub fn byte_len(&self) -> usize {
        self.image.byte_len()
    }
}

/// File name used in log lines and error messages.
pub(crate) fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
