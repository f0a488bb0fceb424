//! Error types and utilities.
//!
//! This module provides the core error handling infrastructure. The main types are:
//!
//! - [`Error`] - The error type produced by every fallible operation in this crate
//! - [`Result`] - A specialized Result type alias
//! - [`BoxError`] - A boxed, sendable error used at the capability boundaries
//!
//! [`Error`] is cheaply clonable (the payload lives behind an `Arc`), which is what
//! allows it to be stored in a request descriptor's taint slot and later returned
//! from `prepare`/`send` without losing the original cause. Instead of downcasting,
//! callers classify errors through predicate methods such as [`Error::is_transport`]
//! or [`Error::is_canceled`].
//!
//! # Examples
//!
//! ```rust
//! use request_kit::Error;
//!
//! let err = Error::msg("account id must not be empty");
//! assert_eq!(err.to_string(), "account id must not be empty");
//! assert!(!err.is_transport());
//! ```

use std::fmt;
use std::sync::Arc;

/// A boxed error that can cross thread boundaries.
///
/// Used wherever this crate accepts or surfaces an error produced by an external
/// capability (transport, codec, body stream).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A specialized Result type for request building and execution.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type for request building, execution, and response decoding.
///
/// All failure modes of the crate funnel into this one type: taint errors set by
/// the caller or a middleware, construction errors raised while materializing the
/// wire request, transport failures, context cancellation, and decode errors.
/// The variants are not exposed directly; use the `is_*` predicates to classify.
///
/// Cloning is cheap and preserves identity of the underlying cause, so a tainted
/// descriptor can be cloned freely and every derived call reports the same error.
///
/// # Examples
///
/// ```rust
/// use request_kit::{Error, Request};
///
/// let req = Request::new().set_error(Some(Error::msg("bad input")));
/// assert!(req.has_error());
/// ```
#[derive(Clone)]
pub struct Error {
    inner: Arc<ErrorKind>,
}

#[derive(Debug, thiserror::Error)]
enum ErrorKind {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Other(BoxError),
    #[error("invalid request URL: {0}")]
    InvalidUrl(BoxError),
    #[error("invalid header `{name}`: {source}")]
    InvalidHeader { name: String, source: BoxError },
    #[error("failed to materialize wire request: {0}")]
    Build(#[source] http::Error),
    #[error("transport failure: {0}")]
    Transport(BoxError),
    #[error("no client override set and no default client registered")]
    NoClient,
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("failed to encode request body: {0}")]
    Encode(BoxError),
    #[error("failed to decode response body: {0}")]
    Decode(BoxError),
    #[error("response body unavailable")]
    BodyUnavailable,
    #[error("body already consumed")]
    BodyConsumed,
    #[error("failed to read body stream: {0}")]
    Read(#[source] std::io::Error),
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            inner: Arc::new(kind),
        }
    }

    /// Creates an error from a display-able message.
    ///
    /// This is the usual way to produce a taint error for
    /// [`Request::set_error`](crate::Request::set_error).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Error;
    ///
    /// let err = Error::msg(format!("missing field `{}`", "name"));
    /// assert_eq!(err.to_string(), "missing field `name`");
    /// ```
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::from_kind(ErrorKind::Message(message.to_string()))
    }

    /// Wraps an arbitrary error without further classification.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Error;
    ///
    /// let err = Error::other(std::io::Error::other("disk full"));
    /// assert_eq!(err.to_string(), "disk full");
    /// assert!(!err.is_transport());
    /// ```
    pub fn other(error: impl Into<BoxError>) -> Self {
        Self::from_kind(ErrorKind::Other(error.into()))
    }

    /// Wraps a failure reported by a network client.
    ///
    /// [`Client`](crate::Client) implementations use this to surface connect,
    /// write, and read failures.
    pub fn transport(error: impl Into<BoxError>) -> Self {
        Self::from_kind(ErrorKind::Transport(error.into()))
    }

    /// Wraps a failure reported by an unmarshalling strategy or codec.
    pub fn decode(error: impl Into<BoxError>) -> Self {
        Self::from_kind(ErrorKind::Decode(error.into()))
    }

    pub(crate) fn invalid_url(error: impl Into<BoxError>) -> Self {
        Self::from_kind(ErrorKind::InvalidUrl(error.into()))
    }

    pub(crate) fn invalid_header(name: impl Into<String>, error: impl Into<BoxError>) -> Self {
        Self::from_kind(ErrorKind::InvalidHeader {
            name: name.into(),
            source: error.into(),
        })
    }

    pub(crate) fn build(error: http::Error) -> Self {
        Self::from_kind(ErrorKind::Build(error))
    }

    pub(crate) fn no_client() -> Self {
        Self::from_kind(ErrorKind::NoClient)
    }

    pub(crate) fn canceled() -> Self {
        Self::from_kind(ErrorKind::Canceled)
    }

    pub(crate) fn deadline_exceeded() -> Self {
        Self::from_kind(ErrorKind::DeadlineExceeded)
    }

    pub(crate) fn encode(error: impl Into<BoxError>) -> Self {
        Self::from_kind(ErrorKind::Encode(error.into()))
    }

    pub(crate) fn body_unavailable() -> Self {
        Self::from_kind(ErrorKind::BodyUnavailable)
    }

    pub(crate) fn body_consumed() -> Self {
        Self::from_kind(ErrorKind::BodyConsumed)
    }

    pub(crate) fn read(error: std::io::Error) -> Self {
        Self::from_kind(ErrorKind::Read(error))
    }

    /// Returns true if this error came from the network client.
    pub fn is_transport(&self) -> bool {
        matches!(*self.inner, ErrorKind::Transport(_))
    }

    /// Returns true if the execution context was canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(*self.inner, ErrorKind::Canceled)
    }

    /// Returns true if the execution context's deadline passed.
    pub fn is_timeout(&self) -> bool {
        matches!(*self.inner, ErrorKind::DeadlineExceeded)
    }

    /// Returns true if decoding a response body failed.
    pub fn is_decode(&self) -> bool {
        matches!(*self.inner, ErrorKind::Decode(_))
    }

    /// Returns true if the request URL could not be assembled.
    pub fn is_invalid_url(&self) -> bool {
        matches!(*self.inner, ErrorKind::InvalidUrl(_))
    }

    /// Returns true if execution failed because no client was available.
    pub fn is_no_client(&self) -> bool {
        matches!(*self.inner, ErrorKind::NoClient)
    }

    /// Returns true if a body was read after it had already been consumed.
    pub fn is_body_consumed(&self) -> bool {
        matches!(*self.inner, ErrorKind::BodyConsumed)
    }

    /// Returns true if the response wrapper held no underlying response.
    pub fn is_body_unavailable(&self) -> bool {
        matches!(*self.inner, ErrorKind::BodyUnavailable)
    }

    /// Returns true if two errors share the same underlying cause.
    ///
    /// Clones of an error compare equal under this predicate, so a caller can
    /// check that an executed descriptor surfaced the exact error it stored.
    pub fn same_cause(&self, other: &Error) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&*self.inner)
    }
}
