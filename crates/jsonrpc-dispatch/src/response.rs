use serde::Serialize;
use serde_json::Value;

use crate::error::{MalformedResponse, RpcError};
use crate::types::RequestId;

/// Exactly one of a result or an error
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Success result with data (may be `null` for void methods)
    Result(Value),
    Error(RpcError),
}

/// An outgoing reply, correlated with its request by `id`
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    id: RequestId,
    outcome: Outcome,
}

/// Wire shape: `id` first, then whichever member the outcome carries.
#[derive(Serialize)]
struct WireResponse<'a> {
    id: &'a RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a RpcError>,
}

impl Response {
    pub fn new(id: RequestId, outcome: Outcome) -> Self {
        Self { id, outcome }
    }

    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(id, Outcome::Result(result))
    }

    pub fn null(id: RequestId) -> Self {
        Self::success(id, Value::Null)
    }

    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self::new(id, Outcome::Error(error))
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    pub fn rpc_error(&self) -> Option<&RpcError> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// Same outcome, different correlation id
    pub(crate) fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    /// Canonical text form
    pub fn encode(&self) -> String {
        let wire = WireResponse {
            id: &self.id,
            result: self.result(),
            error: self.rpc_error(),
        };
        // Every member is a string, an integer or a `Value`; serialization is infallible.
        serde_json::to_string(&wire).unwrap_or_default()
    }

    /// Parse response text produced by [`Response::encode`] or a peer.
    pub fn decode(text: &str) -> Result<Self, MalformedResponse> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut object) = value else {
            return Err(MalformedResponse::NotAnObject);
        };

        let id = object
            .remove("id")
            .and_then(|raw| RequestId::from_value(&raw).ok().flatten())
            .ok_or(MalformedResponse::InvalidId)?;

        let outcome = match (object.remove("result"), object.remove("error")) {
            (Some(result), None) => Outcome::Result(result),
            (None, Some(error)) => Outcome::Error(
                serde_json::from_value(error).map_err(MalformedResponse::InvalidError)?,
            ),
            _ => return Err(MalformedResponse::AmbiguousOutcome),
        };

        Ok(Self { id, outcome })
    }
}

impl From<(RequestId, Value)> for Response {
    fn from((id, result): (RequestId, Value)) -> Self {
        Self::success(id, result)
    }
}

impl From<(RequestId, RpcError)> for Response {
    fn from((id, error): (RequestId, RpcError)) -> Self {
        Self::error(id, error)
    }
}
