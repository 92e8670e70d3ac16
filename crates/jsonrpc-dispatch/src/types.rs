use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

static NEXT_GENERATED_ID: AtomicI64 = AtomicI64::new(1);

/// Correlation token for a call.
/// Can be a string or a number, but never null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl RequestId {
    /// Mint an identifier that no other call to `generate` in this process
    /// will return.
    pub fn generate() -> Self {
        RequestId::Number(NEXT_GENERATED_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Interpret a decoded JSON value as an id.
    ///
    /// `null` means "absent"; anything other than a string or an integer is
    /// rejected with `Err(())`.
    pub(crate) fn from_value(value: &Value) -> Result<Option<Self>, ()> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(RequestId::String(s.clone()))),
            Value::Number(n) => n.as_i64().map(|n| Some(RequestId::Number(n))).ok_or(()),
            _ => Err(()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_request_id_serialization() {
        let id_str = RequestId::String("test".to_string());
        let id_num = RequestId::Number(42);

        assert_eq!(serde_json::to_string(&id_str).unwrap(), r#""test""#);
        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<RequestId> = (0..1000).map(|_| RequestId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_generated_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| (0..250).map(|_| RequestId::generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "duplicate generated id");
            }
        }
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_id_from_value() {
        assert_eq!(RequestId::from_value(&json!(null)), Ok(None));
        assert_eq!(
            RequestId::from_value(&json!(7)),
            Ok(Some(RequestId::Number(7)))
        );
        assert_eq!(
            RequestId::from_value(&json!("abc")),
            Ok(Some(RequestId::String("abc".to_string())))
        );
        assert!(RequestId::from_value(&json!(1.5)).is_err());
        assert!(RequestId::from_value(&json!({"nested": true})).is_err());
        assert!(RequestId::from_value(&json!([1])).is_err());
    }
}
