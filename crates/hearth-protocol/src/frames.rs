use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` tag every line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Req,
    Res,
    Event,
}

/// A control call, e.g.
/// `{ "type": "req", "id": "7", "method": "templates.list", "params": {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReqFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ReqFrame {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            kind: FrameKind::Req,
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// The answer to one `ReqFrame`, echoing its `id`. Exactly one of `payload`
/// and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResFrame {
    pub fn ok(id: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            kind: FrameKind::Res,
            id: id.into(),
            ok: true,
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, code: &str, message: &str) -> Self {
        Self {
            kind: FrameKind::Res,
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(ErrorShape {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// Something the host reports without being asked: a fired notification or
/// a tick report. `seq` counts up from 0 per host process so a client can
/// spot gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub event: String,
    pub payload: Value,
    pub seq: u64,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, payload: impl Serialize, seq: u64) -> Self {
        Self {
            kind: FrameKind::Event,
            event: event.into(),
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
            seq,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}

/// One line read from a client, classified.
#[derive(Debug, Clone)]
pub enum Inbound {
    Request(ReqFrame),
    /// Tagged `req` but without a usable method; `id` is kept when present
    /// so the host can still answer.
    Malformed { id: Option<String> },
    /// Any other `type`. The host only accepts requests.
    Ignored { kind: String },
}

/// Loose view of a line, enough to classify it.
#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

impl Inbound {
    /// Fails only when the line is not a JSON object with a string `type`.
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        let raw: RawFrame = serde_json::from_str(line)?;
        if raw.kind != "req" {
            return Ok(Inbound::Ignored { kind: raw.kind });
        }
        Ok(match (raw.id, raw.method) {
            (Some(id), Some(method)) if !method.is_empty() => {
                Inbound::Request(ReqFrame::new(id, method, raw.params))
            }
            (id, _) => Inbound::Malformed { id },
        })
    }
}
