use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::MalformedRequest;
use crate::types::RequestId;

/// A decoded inbound call.
///
/// Fields are read-only once constructed; a request is consumed by exactly
/// one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RequestId>,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl Request {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Create a request with an id and no parameters
    pub fn call(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self::new(Some(id.into()), method, None)
    }

    /// Create a request without an id
    pub fn anonymous(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::new(None, method, params)
    }

    /// Parse request text.
    ///
    /// A `"jsonrpc"` member is accepted and ignored. An `"id"` of `null` is
    /// the same as no id.
    pub fn decode(text: &str) -> Result<Self, MalformedRequest> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut object) = value else {
            return Err(MalformedRequest::NotAnObject);
        };

        let id = match object.remove("id") {
            Some(raw) => RequestId::from_value(&raw).map_err(|()| MalformedRequest::InvalidId)?,
            None => None,
        };

        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            Some(_) => return Err(MalformedRequest::InvalidMethod { id }),
            None => return Err(MalformedRequest::MissingMethod { id }),
        };

        let params = object.remove("params").filter(|p| !p.is_null());

        Ok(Self { id, method, params })
    }

    /// Parse request bytes, which must be UTF-8.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, MalformedRequest> {
        Self::decode(std::str::from_utf8(bytes)?)
    }

    /// Canonical text form
    pub fn encode(&self) -> String {
        // A struct of strings, integers and `Value`s cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    /// Take ownership of the parameters, dropping the rest of the request
    pub fn into_params(self) -> Option<Value> {
        self.params
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params_object()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.as_array()?.get(index)
    }

    fn params_object(&self) -> Option<&Map<String, Value>> {
        self.params.as_ref()?.as_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_minimal_request() {
        let request = Request::decode(r#"{"method":"ping","id":1}"#).unwrap();

        assert_eq!(request.id(), Some(&RequestId::Number(1)));
        assert_eq!(request.method(), "ping");
        assert!(request.params().is_none());
    }

    #[test]
    fn test_decode_without_id() {
        let request = Request::decode(r#"{"method":"unknown"}"#).unwrap();
        assert!(request.id().is_none());

        let request = Request::decode(r#"{"method":"unknown","id":null}"#).unwrap();
        assert!(request.id().is_none());
    }

    #[test]
    fn test_decode_ignores_version_member() {
        let request =
            Request::decode(r#"{"jsonrpc":"2.0","method":"sum","id":"a","params":[1,2]}"#)
                .unwrap();

        assert_eq!(request.id(), Some(&RequestId::String("a".to_string())));
        assert_eq!(request.get_param_index(1), Some(&json!(2)));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = Request::decode("this is not json").unwrap_err();
        assert!(matches!(err, MalformedRequest::Syntax(_)));
    }

    #[test]
    fn test_decode_bytes_rejects_invalid_utf8() {
        let err = Request::decode_bytes(b"{\"method\":\"\xff\"}").unwrap_err();
        assert!(matches!(err, MalformedRequest::Encoding(_)));

        let request = Request::decode_bytes(br#"{"method":"ping"}"#).unwrap();
        assert_eq!(request.method(), "ping");
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            Request::decode("[1,2,3]").unwrap_err(),
            MalformedRequest::NotAnObject
        ));
        assert!(matches!(
            Request::decode("\"ping\"").unwrap_err(),
            MalformedRequest::NotAnObject
        ));
    }

    #[test]
    fn test_decode_missing_method_keeps_id() {
        let err = Request::decode(r#"{"id":9,"params":{}}"#).unwrap_err();
        assert!(matches!(err, MalformedRequest::MissingMethod { .. }));
        assert_eq!(err.request_id(), Some(&RequestId::Number(9)));
    }

    #[test]
    fn test_decode_rejects_non_string_method() {
        let err = Request::decode(r#"{"id":"x","method":42}"#).unwrap_err();
        assert!(matches!(err, MalformedRequest::InvalidMethod { .. }));
        assert_eq!(err.request_id(), Some(&RequestId::String("x".to_string())));
    }

    #[test]
    fn test_decode_rejects_bad_id() {
        let err = Request::decode(r#"{"id":{"a":1},"method":"ping"}"#).unwrap_err();
        assert!(matches!(err, MalformedRequest::InvalidId));
    }

    #[test]
    fn test_named_params() {
        let request = Request::new(
            Some(RequestId::from("req1")),
            "set_value",
            Some(json!({"name": "test", "value": 42})),
        );

        assert_eq!(request.get_param("name"), Some(&json!("test")));
        assert_eq!(request.get_param("value"), Some(&json!(42)));
        assert_eq!(request.get_param("missing"), None);
        assert_eq!(request.get_param_index(0), None);
    }

    #[test]
    fn test_encode_omits_absent_members() {
        let text = Request::anonymous("notify", None).encode();
        assert_eq!(text, r#"{"method":"notify"}"#);

        let decoded = Request::decode(&Request::call(5_i64, "ping").encode()).unwrap();
        assert_eq!(decoded, Request::call(5_i64, "ping"));
    }
}
