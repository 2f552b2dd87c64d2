use super::*;

#[test]
fn events_serialize_with_snake_case_tag() {
    let json = serde_json::to_value(EngineEvent::TimeUpdate { time_ms: 12.5 }).unwrap();
    assert_eq!(json, serde_json::json!({"event": "time_update", "time_ms": 12.5}));

    let json = serde_json::to_value(EngineEvent::Ready).unwrap();
    assert_eq!(json, serde_json::json!({"event": "ready"}));

    let json = serde_json::to_value(EngineEvent::Progress {
        id: ElementId::new("clip"),
        progress: 0.5,
        time_ms: 100.0,
    })
    .unwrap();
    assert_eq!(
        json,
        serde_json::json!({"event": "progress", "id": "clip", "progress": 0.5, "time_ms": 100.0})
    );
}

#[test]
fn clock_events_map_one_to_one() {
    assert_eq!(EngineEvent::from(ClockEvent::Ended), EngineEvent::Ended);
    assert_eq!(
        EngineEvent::from(ClockEvent::DurationUpdate(3.0)),
        EngineEvent::DurationUpdate { duration_ms: 3.0 }
    );
    assert_eq!(
        EngineEvent::from(ClockEvent::Seek(7.0)).kind(),
        EngineEventKind::Seek
    );
}
