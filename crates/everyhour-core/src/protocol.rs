//! Request/response protocol between clients and the coordinator.
//!
//! One JSON request object in, one JSON response object out. Requests are
//! tagged by `type`; responses always carry `ok`.
//!
//! ```text
//! {"type":"submit-checkin","task":"write report","unchanged":false} -> {"ok":true}
//! {"type":"get-settings"} -> {"ok":true,"settings":{"intervalMinutes":60,"minuteOffset":0}}
//! {"type":"foo"} -> {"ok":false,"error":"Unknown message type: foo"}
//! ```
//!
//! Field decoding is lenient: a non-string `task` reads as empty and
//! `unchanged` follows JSON truthiness.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::checkin::{CheckinEntry, LedgerSnapshot};
use crate::error::ProtocolError;
use crate::settings::{RawSettings, Settings};

/// Every request kind the coordinator understands.
pub const REQUEST_KINDS: [&str; 5] = [
    "submit-checkin",
    "get-state",
    "get-settings",
    "save-settings",
    "clear-history",
];

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    SubmitCheckin {
        #[serde(default, deserialize_with = "lenient_string")]
        task: String,
        #[serde(default, deserialize_with = "truthy")]
        unchanged: bool,
    },
    GetState,
    GetSettings,
    SaveSettings {
        #[serde(default, deserialize_with = "lenient_settings")]
        settings: RawSettings,
    },
    ClearHistory,
}

impl Request {
    /// Decode a raw JSON request.
    ///
    /// # Errors
    /// Returns [`ProtocolError::UnknownKind`] or [`ProtocolError::MissingKind`]
    /// when `type` does not name a known request.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingKind)?;
        if !REQUEST_KINDS.contains(&kind) {
            return Err(ProtocolError::UnknownKind(kind.to_string()));
        }
        let kind = kind.to_string();
        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed {
            kind,
            message: e.to_string(),
        })
    }

    /// The wire name of this request.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::SubmitCheckin { .. } => "submit-checkin",
            Request::GetState => "get-state",
            Request::GetSettings => "get-settings",
            Request::SaveSettings { .. } => "save-settings",
            Request::ClearHistory => "clear-history",
        }
    }

    pub fn submit(task: impl Into<String>, unchanged: bool) -> Self {
        Request::SubmitCheckin {
            task: task.into(),
            unchanged,
        }
    }
}

/// Response to a single request.
///
/// Variant order matters for untagged decoding: richer shapes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    State {
        ok: bool,
        current_task: String,
        settings: Settings,
        history_count: usize,
        last_entry: Option<CheckinEntry>,
    },
    Settings {
        ok: bool,
        settings: Settings,
    },
    Failure {
        ok: bool,
        error: String,
    },
    Ack {
        ok: bool,
    },
}

impl Response {
    pub fn ack() -> Self {
        Response::Ack { ok: true }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Response::Failure {
            ok: false,
            error: error.into(),
        }
    }

    pub fn settings(settings: Settings) -> Self {
        Response::Settings { ok: true, settings }
    }

    pub fn state(snapshot: LedgerSnapshot, settings: Settings) -> Self {
        Response::State {
            ok: true,
            current_task: snapshot.current_task,
            settings,
            history_count: snapshot.history_count,
            last_entry: snapshot.last_entry,
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            Response::State { ok, .. }
            | Response::Settings { ok, .. }
            | Response::Failure { ok, .. }
            | Response::Ack { ok } => *ok,
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn lenient_settings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RawSettings, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(RawSettings::from_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_submit_leniently() {
        let req =
            Request::from_value(json!({"type": "submit-checkin", "task": 12, "unchanged": 1}))
                .unwrap();
        assert_eq!(req, Request::submit("", true));

        let req = Request::from_value(json!({"type": "submit-checkin"})).unwrap();
        assert_eq!(req, Request::submit("", false));

        let req = Request::from_value(
            json!({"type": "submit-checkin", "task": " code ", "unchanged": ""}),
        )
        .unwrap();
        assert_eq!(req, Request::submit(" code ", false));
    }

    #[test]
    fn decodes_unit_requests_with_extra_fields() {
        let req = Request::from_value(json!({"type": "get-state", "extra": true})).unwrap();
        assert_eq!(req, Request::GetState);
        assert_eq!(req.kind(), "get-state");
    }

    #[test]
    fn save_settings_accepts_anything() {
        let req =
            Request::from_value(json!({"type": "save-settings", "settings": "nope"})).unwrap();
        assert_eq!(req, Request::SaveSettings { settings: RawSettings::default() });

        let req = Request::from_value(json!({
            "type": "save-settings",
            "settings": {"intervalMinutes": "45", "minuteOffset": 10}
        }))
        .unwrap();
        let Request::SaveSettings { settings } = req else {
            panic!("expected save-settings");
        };
        assert_eq!(settings.interval_minutes, Some(json!("45")));
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        assert_eq!(
            Request::from_value(json!({"type": "foo"})),
            Err(ProtocolError::UnknownKind("foo".into()))
        );
        assert_eq!(Request::from_value(json!([1, 2])), Err(ProtocolError::MissingKind));
        assert_eq!(Request::from_value(json!({"type": 3})), Err(ProtocolError::MissingKind));
    }

    #[test]
    fn responses_use_wire_field_names() {
        let state = Response::state(
            LedgerSnapshot {
                current_task: "x".into(),
                history_count: 0,
                last_entry: None,
            },
            Settings::default(),
        );
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "ok": true,
                "currentTask": "x",
                "settings": {"intervalMinutes": 60, "minuteOffset": 0},
                "historyCount": 0,
                "lastEntry": null
            })
        );
        assert_eq!(serde_json::to_value(Response::ack()).unwrap(), json!({"ok": true}));

        let failure = serde_json::to_value(Response::failure("boom")).unwrap();
        assert_eq!(failure, json!({"ok": false, "error": "boom"}));
        let parsed: Response = serde_json::from_value(failure).unwrap();
        assert!(!parsed.is_ok());
    }
}
