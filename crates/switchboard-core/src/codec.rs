//! Payload codec.
//!
//! Arguments and replies travel as JSON documents inside the binary wire
//! envelope, so either side can evolve its structs independently as long as
//! field names agree.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value into a payload.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a payload into a fresh value.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(payload)?)
}
