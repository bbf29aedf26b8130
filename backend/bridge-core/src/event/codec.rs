//! JSON framing for [`Envelope`]s.
//!
//! Outbound frames follow the configured [`WireFormat`]. Inbound frames are
//! accepted in either layout, so a peer that answers in superjson is still
//! understood when this side sends plain JSON.

use crate::error::CodecError;
use crate::event::{Envelope, WireFormat};

use log::trace;
use serde_json::{Map, Value};

const SUPERJSON_KEY: &str = "json";
const TYPE_KEY: &str = "type";

/// Result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(Envelope),
    /// Blank frames and `{}` are peer keep-alives, not protocol errors.
    KeepAlive,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventCodec {
    format: WireFormat,
}

impl EventCodec {
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    pub fn encode(&self, envelope: &Envelope) -> Result<String, CodecError> {
        let result = match self.format {
            WireFormat::Json => serde_json::to_string(envelope),
            WireFormat::SuperJson => {
                let inner = serde_json::to_value(envelope).map_err(|e| {
                    CodecError::encode(format!("Failed to encode {}: {e}", envelope.event_type()))
                })?;
                let mut wrapper = Map::with_capacity(1);
                wrapper.insert(SUPERJSON_KEY.to_string(), inner);
                serde_json::to_string(&Value::Object(wrapper))
            }
        };

        result.map_err(|e| {
            CodecError::encode(format!("Failed to encode {}: {e}", envelope.event_type()))
        })
    }

    pub fn decode(&self, frame: &str) -> Result<Frame, CodecError> {
        let trimmed = frame.trim();
        if trimmed.is_empty() {
            return Ok(Frame::KeepAlive);
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| CodecError::decode(format!("Malformed frame: {e}")))?;

        let value = match value {
            Value::Object(map) if map.is_empty() => return Ok(Frame::KeepAlive),
            Value::Object(mut map) if !map.contains_key(TYPE_KEY) => {
                match map.remove(SUPERJSON_KEY) {
                    Some(inner @ Value::Object(_)) => {
                        trace!("Unwrapped superjson frame");
                        inner
                    }
                    _ => return Err(CodecError::decode("Frame has no event type")),
                }
            }
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(CodecError::decode(format!(
                    "Frame is not an object: {}",
                    json_kind(&other)
                )));
            }
        };

        serde_json::from_value::<Envelope>(value)
            .map(Frame::Event)
            .map_err(|e| CodecError::decode(format!("Invalid envelope: {e}")))
    }

    /// Binary frames carry the same JSON, UTF-8 encoded.
    pub fn decode_bytes(&self, frame: &[u8]) -> Result<Frame, CodecError> {
        let text = std::str::from_utf8(frame)
            .map_err(|e| CodecError::decode(format!("Binary frame is not UTF-8: {e}")))?;
        self.decode(text)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
