//! Classification and dispatch of assistant replies.
//!
//! An assistant turn either carries a fenced JSON payload directing a device
//! operation or it is plain conversation. The router decides which, validates
//! the structured form, and reports one terminal outcome per turn. It keeps
//! no state between turns; only the transcript accumulates history.

use serde_json::Value;
use tracing::warn;

const OPEN_MARKER: &str = "```json";
const CLOSE_MARKER: &str = "```";

const CONTROL_LABEL: &str = "control-instruction";
const DIALOG_LABEL: &str = "dialog";

/// Wire-level classification of a structured reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    ControlCommand,
    Dialog,
    /// A `type` label outside the known vocabulary.
    Unknown(String),
}

impl ReplyKind {
    fn parse(label: &str) -> Self {
        match label {
            CONTROL_LABEL => ReplyKind::ControlCommand,
            DIALOG_LABEL => ReplyKind::Dialog,
            other => ReplyKind::Unknown(other.to_string()),
        }
    }
}

/// Device operations the router knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ActivateFusion,
    SwitchLight,
}

impl Operation {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "activateFusion" => Some(Operation::ActivateFusion),
            "switchLight" => Some(Operation::SwitchLight),
            _ => None,
        }
    }

    /// The status report produced when the operation is applied.
    pub fn report(&self, status: &str) -> String {
        match self {
            Operation::ActivateFusion => format!("Activating fusion, status: {}", status),
            Operation::SwitchLight => format!("Switching light, status: {}", status),
        }
    }
}

/// Terminal state of one routed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A known operation was dispatched with the given status.
    EffectPerformed {
        operation: Operation,
        status: String,
    },
    /// The reply is conversation for the user.
    DialogShown(String),
    /// A structured reply was missing a required field; nothing was done.
    MalformedLogged { field: &'static str },
    /// The payload's `type` label is not one the router knows.
    UnknownTypeLogged(String),
    /// A well-formed command named an operation outside the known set.
    UnknownOperationLogged { operation: String },
}

/// A routed assistant turn: the terminal outcome plus the text appended to
/// the transcript (the inner payload for fenced replies, the raw text
/// otherwise).
#[derive(Debug)]
pub struct Routed {
    pub outcome: Outcome,
    pub entry: String,
}

/// Classify one assistant reply and decide its outcome.
pub fn route(text: &str) -> Routed {
    match strip_fence(text) {
        Some(payload) => Routed {
            outcome: route_payload(payload),
            entry: payload.to_string(),
        },
        // No structured envelope; the whole reply is conversation.
        None => Routed {
            outcome: Outcome::DialogShown(text.to_string()),
            entry: text.to_string(),
        },
    }
}

/// Locate the fenced JSON payload, if the reply carries one.
///
/// The reply must begin with the opening marker and end with the closing
/// marker. The opening marker's trailing newline is dropped; a reply too
/// short to hold both markers is not treated as fenced.
fn strip_fence(text: &str) -> Option<&str> {
    let inner = text
        .trim_end()
        .strip_prefix(OPEN_MARKER)?
        .strip_suffix(CLOSE_MARKER)?;
    Some(inner.strip_prefix('\n').unwrap_or(inner))
}

fn route_payload(payload: &str) -> Outcome {
    let json: Value = match serde_json::from_str(payload) {
        Ok(json) => json,
        Err(err) => {
            // The model fenced something that is not JSON; fall back to
            // showing it verbatim.
            warn!(%err, "fenced reply is not valid JSON, treating as dialog");
            return Outcome::DialogShown(payload.to_string());
        }
    };

    let kind = match json.get("type").and_then(Value::as_str) {
        Some(label) => ReplyKind::parse(label),
        None => {
            warn!("reply payload has no string `type` field");
            return Outcome::UnknownTypeLogged("<missing>".to_string());
        }
    };

    match kind {
        ReplyKind::ControlCommand => route_control(&json),
        ReplyKind::Dialog => route_dialog(&json),
        ReplyKind::Unknown(label) => {
            warn!(%label, "unknown reply type");
            Outcome::UnknownTypeLogged(label)
        }
    }
}

fn route_control(json: &Value) -> Outcome {
    let operation = match json.get("operation").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name,
        _ => {
            warn!("control command missing or malformed `operation`");
            return Outcome::MalformedLogged { field: "operation" };
        }
    };

    let parameters = match json.get("parameters").and_then(Value::as_object) {
        Some(parameters) => parameters,
        None => {
            warn!("control command missing or malformed `parameters`");
            return Outcome::MalformedLogged { field: "parameters" };
        }
    };

    let status = match parameters.get("status").and_then(Value::as_str) {
        Some(status) if !status.is_empty() => status,
        _ => {
            warn!("control command missing or malformed `parameters.status`");
            return Outcome::MalformedLogged {
                field: "parameters.status",
            };
        }
    };

    match Operation::parse(operation) {
        Some(op) => Outcome::EffectPerformed {
            operation: op,
            status: status.to_string(),
        },
        None => {
            warn!(%operation, "unknown operation, no device effect");
            Outcome::UnknownOperationLogged {
                operation: operation.to_string(),
            }
        }
    }
}

fn route_dialog(json: &Value) -> Outcome {
    match json.get("message").and_then(Value::as_str) {
        Some(message) if !message.is_empty() => Outcome::DialogShown(message.to_string()),
        _ => {
            warn!("dialog reply missing or malformed `message`");
            Outcome::MalformedLogged { field: "message" }
        }
    }
}
