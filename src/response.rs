//! The response wrapper returned by request execution.
//!
//! [`Response`] couples the raw wire response (absent on total transport
//! failure) with the unmarshalling strategy inherited from the descriptor that
//! produced it. Decoding is deferred: nothing is read until the caller invokes
//! [`Response::bytes`] or one of the unmarshal methods, and the body is a
//! single-pass stream: the first read consumes it, and later reads fail with
//! a "body already consumed" error.
//!
//! Response middlewares may replace the wrapper wholesale via
//! [`Response::new`].

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::unmarshal::Unmarshaller;
use crate::WireResponse;

/// A wire response paired with a deferred decoding strategy.
///
/// # Examples
///
/// ```rust
/// use request_kit::{Json, Response};
/// use std::sync::Arc;
///
/// // A wrapper with no underlying response, as produced on transport failure.
/// let rep = Response::new(None, Arc::new(Json));
/// assert_eq!(rep.status(), None);
/// ```
pub struct Response {
    raw: Option<WireResponse>,
    unmarshaller: Arc<dyn Unmarshaller>,
}

impl Response {
    /// Creates a wrapper from a raw response and an unmarshalling strategy.
    ///
    /// `raw` is `None` when the network call failed outright.
    pub fn new(raw: Option<WireResponse>, unmarshaller: Arc<dyn Unmarshaller>) -> Self {
        Self { raw, unmarshaller }
    }

    /// Returns the HTTP status code, or `None` if there is no underlying
    /// response.
    pub fn status(&self) -> Option<StatusCode> {
        self.raw.as_ref().map(|response| response.status())
    }

    /// Returns the response headers, if an underlying response exists.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.raw.as_ref().map(|response| response.headers())
    }

    /// Returns the underlying wire response, if any.
    pub fn raw(&self) -> Option<&WireResponse> {
        self.raw.as_ref()
    }

    /// Returns the underlying wire response mutably, if any.
    pub fn raw_mut(&mut self) -> Option<&mut WireResponse> {
        self.raw.as_mut()
    }

    /// Consumes the wrapper, returning the underlying wire response.
    pub fn into_raw(self) -> Option<WireResponse> {
        self.raw
    }

    /// Reads the response body into memory.
    ///
    /// The body is single-pass: this takes the stream and freezes it in
    /// place, so a second call fails.
    ///
    /// # Errors
    ///
    /// Fails if there is no underlying response, the body was already
    /// consumed, or the stream errors while reading.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let raw = self.raw.as_mut().ok_or_else(Error::body_unavailable)?;
        let body = raw.body_mut().take()?;
        body.into_bytes().await
    }

    /// Decodes the response body with the configured strategy.
    ///
    /// # Errors
    ///
    /// Fails like [`Response::bytes`], or when the strategy or the final
    /// typed deserialization rejects the data.
    pub async fn unmarshal<T: DeserializeOwned>(&mut self) -> Result<T> {
        let data = self.bytes().await?;
        let value = self.unmarshaller.decode(&data)?;
        serde_json::from_value(value).map_err(Error::decode)
    }

    /// Decodes the response body as JSON, bypassing the configured strategy.
    pub async fn unmarshal_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let data = self.bytes().await?;
        serde_json::from_slice(&data).map_err(Error::decode)
    }

    /// Decodes the response body as a URL-encoded form, bypassing the
    /// configured strategy.
    pub async fn unmarshal_form<T: DeserializeOwned>(&mut self) -> Result<T> {
        let data = self.bytes().await?;
        serde_urlencoded::from_bytes(&data).map_err(Error::decode)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status())
            .field("unmarshaller", &self.unmarshaller.name())
            .finish()
    }
}
