//! Wire envelopes.
//!
//! Requests and notifications share one shape:
//!
//! ```text
//! {"jsonrpc":"2.0","method":"renderComponent","params":["HelloWorld-x1",["preview"]],"id":7}
//! ```
//!
//! `id` is present for requests expecting a [`Response`] and absent (or
//! `null`) for notifications.

use serde_json::{Map, Value, json};

use crate::error::ProtocolError;

/// Protocol version tag carried by every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// A decoded request or notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Method name.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    /// Correlation id, present only for requests.
    pub id: Option<Value>,
}

impl Envelope {
    /// A notification (no reply expected).
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
            id: None,
        }
    }

    /// A request carrying correlation `id`.
    #[must_use]
    pub fn request(method: impl Into<String>, params: Vec<Value>, id: impl Into<Value>) -> Self {
        Self {
            method: method.into(),
            params,
            id: Some(id.into()),
        }
    }

    /// Returns true if a reply is expected.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.id.is_some()
    }

    /// Parses envelope shape only. Parameters are not validated; see
    /// [`SchemaRegistry`](crate::SchemaRegistry).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedEnvelope`] if the text is not a JSON
    /// object with a string `method`, an array `params` (optional) and a string
    /// or number `id` (optional).
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| ProtocolError::malformed(format!("invalid JSON: {err}")))?;
        Self::from_value(value)
    }

    /// Like [`parse`](Self::parse), starting from a JSON value.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::malformed("frame is not a JSON object"));
        };

        match object.remove("jsonrpc") {
            None => {}
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            Some(other) => {
                return Err(ProtocolError::malformed(format!(
                    "unsupported jsonrpc version {other}"
                )));
            }
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            Some(Value::String(_)) => return Err(ProtocolError::malformed("empty method name")),
            Some(_) => return Err(ProtocolError::malformed("method must be a string")),
            None => return Err(ProtocolError::malformed("missing method")),
        };

        let params = match object.remove("params") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(params)) => params,
            Some(_) => return Err(ProtocolError::malformed("params must be an array")),
        };

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(id @ (Value::String(_) | Value::Number(_))) => Some(id),
            Some(_) => return Err(ProtocolError::malformed("id must be a string or number")),
        };

        Ok(Self { method, params, id })
    }

    /// Correlation id to answer a frame that failed to [`parse`](Self::parse)
    /// with: its string or number `id` if the text is a JSON object carrying
    /// one, `null` otherwise.
    #[must_use]
    pub fn reply_id(text: &str) -> Value {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(mut object)) => match object.remove("id") {
                Some(id @ (Value::String(_) | Value::Number(_))) => id,
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }

    /// JSON value of this envelope.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("jsonrpc".into(), Value::from(JSONRPC_VERSION));
        object.insert("method".into(), Value::from(self.method.clone()));
        object.insert("params".into(), Value::Array(self.params.clone()));
        if let Some(id) = &self.id {
            object.insert("id".into(), id.clone());
        }
        Value::Object(object)
    }

    /// JSON text of this envelope.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

/// Error body of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    /// Stable error identifier, such as `"UnknownInstance"`.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

/// Reply to a request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Correlation id copied from the request.
    pub id: Value,
    /// Result value or error body.
    pub outcome: Result<Value, ErrorBody>,
}

impl Response {
    /// A successful reply.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            outcome: Ok(result),
        }
    }

    /// A failed reply.
    #[must_use]
    pub fn error(id: Value, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Err(ErrorBody {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }

    /// JSON value of this response.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match &self.outcome {
            Ok(result) => json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": self.id,
                "result": result,
            }),
            Err(body) => json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": self.id,
                "error": { "kind": body.kind, "message": body.message },
            }),
        }
    }

    /// JSON text of this response.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(text: &str) -> String {
        match Envelope::parse(text) {
            Err(ProtocolError::MalformedEnvelope(msg)) => msg,
            other => panic!("expected MalformedEnvelope, got {other:?}"),
        }
    }

    #[test]
    fn parses_request_and_notification() {
        let request =
            Envelope::parse(r#"{"jsonrpc":"2.0","method":"deleteComponent","params":["a"],"id":3}"#)
                .unwrap();
        assert_eq!(request.method, "deleteComponent");
        assert_eq!(request.id, Some(json!(3)));

        let notification = Envelope::parse(r#"{"method":"keepAlive"}"#).unwrap();
        assert!(!notification.is_request());
        assert!(notification.params.is_empty());
    }

    #[test]
    fn null_id_is_a_notification() {
        let envelope = Envelope::parse(r#"{"method":"keepAlive","id":null}"#).unwrap();
        assert_eq!(envelope.id, None);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(malformed("not json").starts_with("invalid JSON"));
        assert_eq!(malformed("[1,2]"), "frame is not a JSON object");
        assert_eq!(malformed(r#"{"params":[]}"#), "missing method");
        assert_eq!(malformed(r#"{"method":7}"#), "method must be a string");
        assert_eq!(malformed(r#"{"method":"m","params":{}}"#), "params must be an array");
        assert_eq!(malformed(r#"{"method":"m","id":[1]}"#), "id must be a string or number");
        assert!(malformed(r#"{"jsonrpc":"1.0","method":"m"}"#).contains("version"));
    }

    #[test]
    fn reply_id_of_malformed_frames() {
        assert_eq!(
            Envelope::reply_id(r#"{"method":"addComponent","params":{"type":"x"},"id":7}"#),
            json!(7)
        );
        assert_eq!(Envelope::reply_id(r#"{"method":7,"id":"r9"}"#), json!("r9"));
        assert_eq!(Envelope::reply_id(r#"{"method":"m","id":[1]}"#), Value::Null);
        assert_eq!(Envelope::reply_id("not json"), Value::Null);
    }

    #[test]
    fn encodes_with_version_and_optional_id() {
        let text = Envelope::notification("componentDeleted", vec![json!("x")])
            .encode()
            .unwrap();
        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","method":"componentDeleted","params":["x"]}"#
        );

        let request = Envelope::request("keepAlive", vec![], "r1");
        assert_eq!(request.to_value()["id"], json!("r1"));
    }

    #[test]
    fn response_shapes() {
        let ok = Response::success(json!(1), json!("HelloWorld-abc")).to_value();
        assert_eq!(ok["result"], json!("HelloWorld-abc"));
        assert!(ok.get("error").is_none());

        let err = Response::error(json!(2), "UnknownInstance", "no such instance").to_value();
        assert_eq!(
            err["error"],
            json!({"kind": "UnknownInstance", "message": "no such instance"})
        );
    }
}
