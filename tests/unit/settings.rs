use super::*;

#[test]
fn defaults_are_valid() {
    RenderSettings::default().validate().unwrap();
}

#[test]
fn partial_json_falls_back_to_defaults() {
    let s = RenderSettings::from_json_str(
        r#"{
            "output_width": 640,
            "output_height": 360,
            "plate": { "placement": "below_canvas" },
            "orientation": "force_portrait",
            "audio": { "source": "music.m4a", "looping": true }
        }"#,
    )
    .unwrap();
    assert_eq!(s.canvas().width, 640);
    assert_eq!(s.plate.placement, PlatePlacement::BelowCanvas);
    assert_eq!(s.plate.height, PlateSettings::default().height);
    assert_eq!(s.orientation, OrientationStrategy::ForcePortrait);
    let audio = s.audio.unwrap();
    assert!(audio.looping);
    assert_eq!(audio.volume, 1.0);
}

#[test]
fn transition_must_be_shorter_than_image() {
    let s = RenderSettings {
        image_duration: 2.0,
        transition_duration: 2.0,
        ..Default::default()
    };
    assert!(matches!(s.validate(), Err(RenderError::Validation(_))));

    let disabled = RenderSettings {
        transitions_enabled: false,
        ..s
    };
    disabled.validate().unwrap();
    assert_eq!(disabled.effective_transition(), 0.0);
}

#[test]
fn odd_output_size_is_rejected() {
    let s = RenderSettings {
        output_width: 641,
        ..Default::default()
    };
    assert!(s.validate().is_err());
}

#[test]
fn audio_volume_range_is_checked() {
    let s = RenderSettings {
        audio: Some(AudioTrackSettings {
            source: "a.wav".into(),
            volume: 1.5,
            looping: false,
        }),
        ..Default::default()
    };
    assert!(s.validate().is_err());
}

#[test]
fn malformed_json_is_a_validation_error() {
    assert!(matches!(
        RenderSettings::from_json_str("{ nope"),
        Err(RenderError::Validation(_))
    ));
}
