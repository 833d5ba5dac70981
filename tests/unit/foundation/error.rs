use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RenderError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        RenderError::export_pipeline("x")
            .to_string()
            .contains("export pipeline failed:")
    );
    assert!(
        RenderError::audio_mux("x")
            .to_string()
            .contains("audio mux failed:")
    );
    assert_eq!(RenderError::EmptyInput.to_string(), "no source images");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RenderError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn asset_load_error_keeps_index() {
    let err: RenderError = AssetLoadError {
        index: 4,
        source_name: "beach.jpg".to_string(),
        message: "truncated".to_string(),
    }
    .into();
    assert_eq!(err.asset_index(), Some(4));
    assert!(err.to_string().contains("beach.jpg"));
    assert!(!err.is_cancelled());
}

#[test]
fn preview_retag_only_touches_pipeline_errors() {
    assert!(matches!(
        RenderError::export_pipeline("x").into_preview(),
        RenderError::PreviewPipelineFailed(_)
    ));
    assert!(RenderError::Cancelled.into_preview().is_cancelled());
    assert_eq!(
        RenderError::asset_load(2, "bad").into_preview().asset_index(),
        Some(2)
    );
}
