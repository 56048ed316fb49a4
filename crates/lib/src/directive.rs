//! Directive extraction from assistant replies.
//!
//! The conversational service hides machine-actionable instructions behind a
//! sentinel marker followed by a single JSON object. Everything here is
//! best-effort: a reply that does not yield a recognizable directive is an
//! ordinary chat turn, never an error.

use serde_json::{Map, Value};

/// Marker that starts the hidden directive section of a reply. Nothing from
/// this marker onward is ever shown to the end user.
pub const SENTINEL: &str = "ACCION_JSON";

/// Recognized action discriminators. Anything else degrades to "no directive".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateClient,
    CreateExpediente,
    AgendarCita,
}

impl Action {
    fn parse(raw: &str) -> Option<Action> {
        match raw {
            "createClient" => Some(Action::CreateClient),
            "createExpediente" => Some(Action::CreateExpediente),
            "agendarCita" => Some(Action::AgendarCita),
            _ => None,
        }
    }
}

/// An extracted instruction: the action discriminator plus its raw data map.
#[derive(Debug, Clone)]
pub struct Directive {
    pub action: Action,
    pub data: Map<String, Value>,
}

/// Scan a reply for the sentinel and extract the directive that follows it.
///
/// Returns `None` when the marker is absent, no brace span follows it, the
/// span does not parse even after brace repair, or the action discriminator
/// is unknown. The caller treats all of those as a plain chat turn.
pub fn extract_directive(reply: &str) -> Option<Directive> {
    let marker = reply.find(SENTINEL)?;
    let span = first_brace_span(&reply[marker..])?;
    let flat = flatten_whitespace(span);
    let value = parse_with_repair(&flat)?;
    let action = value.get("action").and_then(Value::as_str).and_then(Action::parse)?;
    let data = match value.get("data") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    Some(Directive { action, data })
}

/// Read a field from a directive data map as a trimmed string. Scalar JSON
/// values are coerced; absent, blank, and non-scalar values count as missing.
pub fn field(data: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match data.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Minimal non-greedy brace match: from the first `{` to the first `}` after
/// it. Nested objects are deliberately cut short here; `parse_with_repair`
/// re-balances the braces.
fn first_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text[start..].find('}')?;
    Some(&text[start..start + end + 1])
}

/// The directive may be pretty-printed by the model; collapse all whitespace
/// runs (including newlines) to single spaces before parsing.
fn flatten_whitespace(span: &str) -> String {
    span.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the captured span as JSON. On failure, append as many `}` as needed
/// to balance the brace counts and retry once. The contract is narrow:
/// unmatched opening braces are the only malformation repaired; anything else
/// is logged and dropped.
fn parse_with_repair(span: &str) -> Option<Value> {
    match serde_json::from_str(span) {
        Ok(value) => Some(value),
        Err(first_err) => {
            let opens = span.matches('{').count();
            let closes = span.matches('}').count();
            if opens > closes {
                let mut repaired = span.to_string();
                for _ in closes..opens {
                    repaired.push('}');
                }
                if let Ok(value) = serde_json::from_str(&repaired) {
                    return Some(value);
                }
            }
            log::warn!("directive block did not parse even after brace repair: {}", first_err);
            None
        }
    }
}
