use super::*;
use serde_json::json;

#[test]
fn defaults_match_interactive_canvas_conventions() {
    let o = EngineOpts::default();
    assert_eq!(o.sample_rate_hz, 30.0);
    assert_eq!(o.handle_size, 10.0);
    assert_eq!(o.default_font, "30px Arial");
    assert_eq!(o.selection_color.to_rgba8(), [0, 0, 255, 128]);
    assert!(o.validated().is_ok());
}

#[test]
fn partial_json_keeps_defaults() {
    let o: EngineOpts = serde_json::from_value(json!({
        "canvas": {"width": 320, "height": 240},
        "default_text_color": "#ff0000"
    }))
    .unwrap();
    assert_eq!(
        o.canvas,
        Canvas {
            width: 320,
            height: 240
        }
    );
    assert_eq!(o.default_text_color, Color::rgba(1.0, 0.0, 0.0, 1.0));
    assert_eq!(o.handle_size, 10.0);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_value::<EngineOpts>(json!({"fps": 30})).is_err());
}

#[test]
fn validation_rejects_bad_values() {
    let o = EngineOpts {
        canvas: Canvas {
            width: 0,
            height: 10,
        },
        ..EngineOpts::default()
    };
    assert!(matches!(o.validated(), Err(DeckError::Config(_))));

    let o = EngineOpts {
        sample_rate_hz: 0.0,
        ..EngineOpts::default()
    };
    assert!(o.validated().is_err());
}

#[test]
fn from_json_path_reads_file() {
    let dir = std::env::temp_dir().join(format!("framedeck-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("opts.json");
    std::fs::write(&path, br#"{"handle_size": 12.0}"#).unwrap();

    let o = EngineOpts::from_json_path(&path).unwrap();
    assert!(o.handle_size == 12.0 || std::env::var("FRAMEDECK_HANDLE_SIZE").is_ok());

    std::fs::remove_dir_all(&dir).ok();
}
