//! Pluggable response unmarshalling strategies.
//!
//! A request descriptor carries an [`Unmarshaller`] which its response wrapper
//! inherits; calling [`Response::unmarshal`](crate::Response::unmarshal) runs
//! the configured strategy. Strategies decode raw body bytes into a JSON value
//! tree ([`serde_json::Value`]), the self-describing interchange form that is
//! then handed to the caller's typed target. This keeps strategies usable as
//! trait objects while the decode target stays generic.
//!
//! The named variants `unmarshal_json`/`unmarshal_form` on the response wrapper
//! bypass the strategy entirely and decode with a fixed codec.
//!
//! # Examples
//!
//! ```rust
//! use request_kit::{Error, Unmarshaller};
//!
//! // A strategy that tolerates an empty body by decoding it as null.
//! #[derive(Debug)]
//! struct LenientJson;
//!
//! impl Unmarshaller for LenientJson {
//!     fn decode(&self, data: &[u8]) -> Result<serde_json::Value, Error> {
//!         if data.is_empty() {
//!             return Ok(serde_json::Value::Null);
//!         }
//!         serde_json::from_slice(data).map_err(Error::decode)
//!     }
//! }
//! ```

use serde_json::Value;
use std::any::type_name;

use crate::error::{Error, Result};

/// A strategy for decoding response bodies.
///
/// Implementations turn raw bytes into a [`serde_json::Value`] tree; the
/// response wrapper deserializes that tree into the caller's target type.
/// Formats that do not distinguish scalar types (such as URL-encoded forms)
/// necessarily surface every value as a string through this path; use the
/// typed named codec on the response wrapper when that matters.
pub trait Unmarshaller: Send + Sync {
    /// Decodes raw body bytes into the interchange value tree.
    fn decode(&self, data: &[u8]) -> Result<Value>;

    /// Returns the type name of the strategy, for debug output.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// The default strategy: bodies are JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Unmarshaller for Json {
    fn decode(&self, data: &[u8]) -> Result<Value> {
        serde_json::from_slice(data).map_err(Error::decode)
    }
}

/// Decodes `application/x-www-form-urlencoded` bodies.
///
/// Every decoded value is a string in the interchange tree; a later duplicate
/// key overwrites an earlier one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Form;

impl Unmarshaller for Form {
    fn decode(&self, data: &[u8]) -> Result<Value> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(data).map_err(Error::decode)?;
        let map = pairs
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        Ok(Value::Object(map))
    }
}
