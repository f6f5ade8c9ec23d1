//! Wire envelopes for the iCE API.
//!
//! # Design
//! The instance record itself is not modelled here: callers bring any
//! `Serialize` type and the server owns its schema. Only the response to a
//! store request has a fixed shape, and every field in it is optional on the
//! wire. Absent and `null` fields both decode to their empty value.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decoded body of a `POST /v2/instances` response.
///
/// A successful store carries `_id`; a rejected one carries `_error` and
/// usually `_issues`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StoreInstanceResponse {
    #[serde(rename = "_id", default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(rename = "_error", default, deserialize_with = "null_as_default")]
    pub error: ResponseError,

    /// Kept raw; see `issues::store_instance_error_message`.
    #[serde(rename = "_issues", default)]
    pub issues: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

impl StoreInstanceResponse {
    /// Decode the first JSON value in `body`. Anything after it is ignored.
    /// A body with no value at all (empty or whitespace) and a literal
    /// `null` both decode to the empty envelope.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::Deserializer::from_slice(body)
            .into_iter::<Option<Self>>()
            .next()
        {
            Some(decoded) => decoded.map(Option::unwrap_or_default),
            None => Ok(Self::default()),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
