use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const EVENT_SCHEMA_VERSION: u32 = 1;

/// Number reported when the platform delivers a ringing state without a caller id.
pub const UNKNOWN_NUMBER: &str = "Unknown Number";

/// Telephony state as delivered by the platform.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PhoneState {
    Ringing {
        #[serde(default)]
        number: Option<String>,
    },
    Idle,
}

impl PhoneState {
    /// Parses one input line: either a JSON object (`{"state":"ringing","number":"..."}`)
    /// or the plain form `RINGING <number>` / `IDLE`.
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.starts_with('{') {
            return serde_json::from_str(line)
                .with_context(|| format!("Invalid phone state JSON: {line}"));
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        match head.to_ascii_lowercase().as_str() {
            "ringing" => Ok(Self::Ringing {
                number: (!rest.is_empty()).then(|| rest.to_string()),
            }),
            "idle" => Ok(Self::Idle),
            other => anyhow::bail!("Unknown phone state '{other}' (expected RINGING or IDLE)"),
        }
    }

    /// Caller id for a ringing state, substituting [`UNKNOWN_NUMBER`] when absent.
    #[must_use]
    pub fn ringing_number(&self) -> Option<&str> {
        match self {
            Self::Ringing { number } => Some(
                number
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(UNKNOWN_NUMBER),
            ),
            Self::Idle => None,
        }
    }
}

/// Notification delivered to the companion application.
///
/// Besides the call lifecycle, the screen's actions ask the companion to open
/// a view: edit or show a known lead, start a new lead, or show the call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    IncomingCall {
        number: String,
        timestamp_ms: u64,
    },
    CallEnded {
        timestamp_ms: u64,
    },
    EditLead {
        number: String,
        lead_id: String,
        timestamp_ms: u64,
    },
    ShowLeadDetails {
        number: String,
        lead_id: String,
        timestamp_ms: u64,
    },
    NewLead {
        number: String,
        timestamp_ms: u64,
    },
    ShowCallDetails {
        number: String,
        timestamp_ms: u64,
    },
}

impl CallEvent {
    #[must_use]
    pub fn incoming(number: impl Into<String>) -> Self {
        Self::IncomingCall {
            number: number.into(),
            timestamp_ms: unix_ms_now(),
        }
    }

    #[must_use]
    pub fn ended() -> Self {
        Self::CallEnded {
            timestamp_ms: unix_ms_now(),
        }
    }

    #[must_use]
    pub fn edit_lead(number: impl Into<String>, lead_id: impl Into<String>) -> Self {
        Self::EditLead {
            number: number.into(),
            lead_id: lead_id.into(),
            timestamp_ms: unix_ms_now(),
        }
    }

    #[must_use]
    pub fn show_lead_details(number: impl Into<String>, lead_id: impl Into<String>) -> Self {
        Self::ShowLeadDetails {
            number: number.into(),
            lead_id: lead_id.into(),
            timestamp_ms: unix_ms_now(),
        }
    }

    #[must_use]
    pub fn new_lead(number: impl Into<String>) -> Self {
        Self::NewLead {
            number: number.into(),
            timestamp_ms: unix_ms_now(),
        }
    }

    #[must_use]
    pub fn show_call_details(number: impl Into<String>) -> Self {
        Self::ShowCallDetails {
            number: number.into(),
            timestamp_ms: unix_ms_now(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IncomingCall { .. } => "incoming_call",
            Self::CallEnded { .. } => "call_ended",
            Self::EditLead { .. } => "edit_lead",
            Self::ShowLeadDetails { .. } => "show_lead_details",
            Self::NewLead { .. } => "new_lead",
            Self::ShowCallDetails { .. } => "show_call_details",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub struct EventSchemas {
    pub schema_version: u32,
    pub phone_state: schemars::Schema,
    pub call_event: schemars::Schema,
}

#[must_use]
pub fn event_schemas() -> EventSchemas {
    EventSchemas {
        schema_version: EVENT_SCHEMA_VERSION,
        phone_state: schemars::schema_for!(PhoneState),
        call_event: schemars::schema_for!(CallEvent),
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

#[must_use]
pub fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
