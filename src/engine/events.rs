use crate::events::hub::HubEvent;
use crate::playback::clock::ClockEvent;
use crate::timeline::element::ElementId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineEventKind {
    Ready,
    Play,
    Pause,
    TimeUpdate,
    DurationUpdate,
    Ended,
    Loading,
    Progress,
    Seek,
}

/// Engine-level notifications, serialized as `{"event": "<name>", ...}` for logs and the CLI.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The frame extractor finished loading.
    Ready,
    Play,
    Pause,
    TimeUpdate {
        time_ms: f64,
    },
    DurationUpdate {
        duration_ms: f64,
    },
    Ended,
    /// Something started loading: the extractor on `start`, or frames for a video element.
    Loading,
    /// A video frame finished decoding.
    Progress {
        id: ElementId,
        progress: f64,
        time_ms: f64,
    },
    Seek {
        time_ms: f64,
    },
}

impl HubEvent for EngineEvent {
    type Kind = EngineEventKind;

    fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::Ready => EngineEventKind::Ready,
            EngineEvent::Play => EngineEventKind::Play,
            EngineEvent::Pause => EngineEventKind::Pause,
            EngineEvent::TimeUpdate { .. } => EngineEventKind::TimeUpdate,
            EngineEvent::DurationUpdate { .. } => EngineEventKind::DurationUpdate,
            EngineEvent::Ended => EngineEventKind::Ended,
            EngineEvent::Loading => EngineEventKind::Loading,
            EngineEvent::Progress { .. } => EngineEventKind::Progress,
            EngineEvent::Seek { .. } => EngineEventKind::Seek,
        }
    }
}

impl From<ClockEvent> for EngineEvent {
    fn from(ev: ClockEvent) -> Self {
        match ev {
            ClockEvent::Play => EngineEvent::Play,
            ClockEvent::Pause => EngineEvent::Pause,
            ClockEvent::TimeUpdate(time_ms) => EngineEvent::TimeUpdate { time_ms },
            ClockEvent::Seek(time_ms) => EngineEvent::Seek { time_ms },
            ClockEvent::Ended => EngineEvent::Ended,
            ClockEvent::DurationUpdate(duration_ms) => EngineEvent::DurationUpdate { duration_ms },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/events.rs"]
mod tests;
