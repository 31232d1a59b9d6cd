//! Usage events as reported by the platform usage log

use serde::{Deserialize, Deserializer, Serialize};

/// Platform code for an activity coming to the foreground
pub const CODE_ACTIVITY_RESUMED: i64 = 1;

/// Platform code for an activity leaving the screen
pub const CODE_ACTIVITY_STOPPED: i64 = 23;

/// Kind of a usage event. Anything unrecognised decodes as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Resumed,
    Stopped,
    Other,
}

impl EventKind {
    /// Decode a numeric platform event code
    pub fn from_code(code: i64) -> Self {
        match code {
            CODE_ACTIVITY_RESUMED => EventKind::Resumed,
            CODE_ACTIVITY_STOPPED => EventKind::Stopped,
            _ => EventKind::Other,
        }
    }

    /// Decode an event name, e.g. `resumed` or `ACTIVITY_RESUMED`
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        let name = name
            .strip_prefix("ACTIVITY_")
            .or_else(|| name.strip_prefix("activity_"))
            .unwrap_or(name);
        if name.eq_ignore_ascii_case("resumed") {
            EventKind::Resumed
        } else if name.eq_ignore_ascii_case("stopped") {
            EventKind::Stopped
        } else {
            EventKind::Other
        }
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawKind {
            Code(i64),
            Name(String),
            Unknown(serde_json::Value),
        }

        Ok(match RawKind::deserialize(deserializer)? {
            RawKind::Code(code) => EventKind::from_code(code),
            RawKind::Name(name) => EventKind::from_name(&name),
            RawKind::Unknown(_) => EventKind::Other,
        })
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Resumed => "RESUMED",
            EventKind::Stopped => "STOPPED",
            EventKind::Other => "OTHER",
        };
        write!(f, "{}", name)
    }
}

/// One record of the usage log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Process identifier (package name)
    pub package: String,
    /// Activity (screen) identifier, empty when the source omits it
    #[serde(default)]
    pub activity: String,
    pub kind: EventKind,
}

impl UsageEvent {
    pub fn new(timestamp_ms: i64, package: impl Into<String>, kind: EventKind) -> Self {
        Self {
            timestamp_ms,
            package: package.into(),
            activity: String::new(),
            kind,
        }
    }

    pub fn resumed(timestamp_ms: i64, package: impl Into<String>) -> Self {
        Self::new(timestamp_ms, package, EventKind::Resumed)
    }

    pub fn stopped(timestamp_ms: i64, package: impl Into<String>) -> Self {
        Self::new(timestamp_ms, package, EventKind::Stopped)
    }

    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activity = activity.into();
        self
    }

    pub fn is_resumed(&self) -> bool {
        self.kind == EventKind::Resumed
    }
}
