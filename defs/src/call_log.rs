use serde::{Deserialize, Serialize};

/// One handled call as served by the bot's `/logs` endpoint.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CallLogRecord {
    pub id: i64,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub detected_intent: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CallLogsResponse {
    pub logs: Vec<CallLogRecord>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallCompleteness {
    pub has_caller: bool,
    pub has_transcript: bool,
    pub has_intent: bool,
    pub has_duration: bool,
}

impl CallCompleteness {
    pub fn is_complete(&self) -> bool {
        self.has_caller && self.has_transcript && self.has_intent && self.has_duration
    }
}

fn known(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|v| !v.trim().is_empty() && v != "unknown")
        .unwrap_or(false)
}

impl CallLogRecord {
    pub fn completeness(&self) -> CallCompleteness {
        CallCompleteness {
            has_caller: known(&self.caller_number),
            has_transcript: self
                .transcript
                .as_deref()
                .map(|t| !t.is_empty())
                .unwrap_or(false),
            has_intent: known(&self.detected_intent),
            has_duration: self.duration_seconds.map(|d| d > 0).unwrap_or(false),
        }
    }
}
