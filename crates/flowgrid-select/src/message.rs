//! The message shape the selection engine routes on.
//!
//! The core never delivers payloads; it only inspects the structured
//! body to decide which connection(s) receive the message.

use serde_json::Value;

/// An outbound message with a structured body.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    body: Value,
}

impl Message {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// String value of a top-level body field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}

impl From<Value> for Message {
    fn from(body: Value) -> Self {
        Self::new(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_returns_string_values_only() {
        let message = Message::new(json!({"user": "ada", "count": 3}));
        assert_eq!(message.field("user"), Some("ada"));
        assert_eq!(message.field("count"), None);
        assert_eq!(message.field("missing"), None);
    }
}
