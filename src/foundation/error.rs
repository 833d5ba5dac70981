/// Convenience result alias used across the crate.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors surfaced by export, preview, and audio muxing.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("no source images")]
    EmptyInput,

    #[error("render cancelled")]
    Cancelled,

    #[error("failed to load image #{index}: {message}")]
    AssetLoadFailed { index: usize, message: String },

    #[error("export pipeline failed: {0}")]
    ExportPipelineFailed(String),

    #[error("preview pipeline failed: {0}")]
    PreviewPipelineFailed(String),

    #[error("audio mux failed: {0}")]
    AudioMuxFailed(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset_load(index: usize, msg: impl Into<String>) -> Self {
        Self::AssetLoadFailed {
            index,
            message: msg.into(),
        }
    }

    pub fn export_pipeline(msg: impl Into<String>) -> Self {
        Self::ExportPipelineFailed(msg.into())
    }

    pub fn preview_pipeline(msg: impl Into<String>) -> Self {
        Self::PreviewPipelineFailed(msg.into())
    }

    pub fn audio_mux(msg: impl Into<String>) -> Self {
        Self::AudioMuxFailed(msg.into())
    }

    /// `true` for a honored cancellation request, as opposed to a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Index of the offending source image, when the error is attributable to one.
    pub fn asset_index(&self) -> Option<usize> {
        match self {
            Self::AssetLoadFailed { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Re-tag a pipeline-level failure as a preview failure.
    ///
    /// Asset, cancellation, and validation errors keep their kind.
    pub(crate) fn into_preview(self) -> Self {
        match self {
            Self::ExportPipelineFailed(msg) => Self::PreviewPipelineFailed(msg),
            Self::Other(e) => Self::PreviewPipelineFailed(format!("{e:#}")),
            other => other,
        }
    }
}

/// Decode failure for one source image.
///
/// Cloneable so a single in-flight decode can hand the same outcome to every waiter.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("image #{index} ({source_name}): {message}")]
pub struct AssetLoadError {
    pub index: usize,
    pub source_name: String,
    pub message: String,
}

impl From<AssetLoadError> for RenderError {
    fn from(e: AssetLoadError) -> Self {
        RenderError::AssetLoadFailed {
            index: e.index,
            message: format!("{}: {}", e.source_name, e.message),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
