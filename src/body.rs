//! Request and response body handling.
//!
//! Two types live here:
//!
//! - [`Body`] - a byte stream that is either buffered in memory or read lazily
//!   from an async reader. A body is single-pass: taking or consuming it leaves
//!   a frozen placeholder behind, and reading a frozen body fails with a
//!   "body already consumed" error.
//! - [`BodySource`] - the capability a request descriptor holds instead of a
//!   body. A source can be opened any number of times, once per prepared wire
//!   request, which is what keeps descriptors safely reusable.
//!
//! # Examples
//!
//! ```rust
//! use request_kit::Body;
//!
//! let body = Body::from_bytes("hello");
//! assert_eq!(body.len(), Some(5));
//! ```

use bytes::Bytes;
use futures_lite::{AsyncBufRead, AsyncReadExt};
use std::fmt;
use std::mem;
use std::pin::Pin;

use crate::error::{Error, Result};

// A boxed bufreader object.
type BoxBufReader = Pin<Box<dyn AsyncBufRead + Send + Sync + 'static>>;

/// A single-pass HTTP body.
///
/// Bodies are either fully buffered (`Bytes`) or streamed from an async reader
/// with an optional length hint. Consuming methods freeze the body in place so
/// accidental double reads surface as errors rather than silently yielding
/// nothing.
pub struct Body {
    inner: BodyInner,
}

enum BodyInner {
    Once(Bytes),
    Reader {
        reader: BoxBufReader,
        length: Option<usize>,
    },
    Frozen,
}

impl Body {
    /// Creates an empty body.
    pub const fn empty() -> Self {
        Self {
            inner: BodyInner::Once(Bytes::new()),
        }
    }

    /// Creates a buffered body from bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Body;
    ///
    /// let body = Body::from_bytes("payload");
    /// assert_eq!(body.is_empty(), Some(false));
    /// ```
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: BodyInner::Once(bytes.into()),
        }
    }

    /// Creates a streaming body from an async buffered reader.
    ///
    /// The optional length is a hint only; it sizes the read buffer and is
    /// reported by [`Body::len`].
    pub fn from_reader(
        reader: impl AsyncBufRead + Send + Sync + 'static,
        length: impl Into<Option<usize>>,
    ) -> Self {
        Self {
            inner: BodyInner::Reader {
                reader: Box::pin(reader),
                length: length.into(),
            },
        }
    }

    /// Creates a frozen body that can no longer provide data.
    pub const fn frozen() -> Self {
        Self {
            inner: BodyInner::Frozen,
        }
    }

    /// Returns the number of bytes, when known up front.
    ///
    /// Buffered bodies always know their length; streaming bodies report the
    /// length hint; frozen bodies report `None`.
    pub fn len(&self) -> Option<usize> {
        match &self.inner {
            BodyInner::Once(bytes) => Some(bytes.len()),
            BodyInner::Reader { length, .. } => *length,
            BodyInner::Frozen => None,
        }
    }

    /// Returns whether the body is empty, when the length is known.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|length| length == 0)
    }

    /// Returns true if the body has been consumed.
    pub fn is_frozen(&self) -> bool {
        matches!(self.inner, BodyInner::Frozen)
    }

    /// Takes the body out, leaving a frozen placeholder in its place.
    ///
    /// # Errors
    ///
    /// Fails if the body was already taken.
    pub fn take(&mut self) -> Result<Body> {
        if self.is_frozen() {
            return Err(Error::body_consumed());
        }
        Ok(Self {
            inner: mem::replace(&mut self.inner, BodyInner::Frozen),
        })
    }

    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Fails if the body was already consumed or the underlying stream errors.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Body;
    ///
    /// # futures_lite::future::block_on(async {
    /// let body = Body::from_bytes("hello");
    /// assert_eq!(body.into_bytes().await?.as_ref(), b"hello");
    /// # Ok::<(), request_kit::Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self.inner {
            BodyInner::Once(bytes) => Ok(bytes),
            BodyInner::Reader { mut reader, length } => {
                let mut buf = Vec::with_capacity(length.unwrap_or(0));
                reader.read_to_end(&mut buf).await.map_err(Error::read)?;
                Ok(buf.into())
            }
            BodyInner::Frozen => Err(Error::body_consumed()),
        }
    }

    /// Reads the whole body into memory as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Fails like [`Body::into_bytes`], or when the data is not valid UTF-8.
    pub async fn into_string(self) -> Result<String> {
        let bytes = self.into_bytes().await?;
        String::from_utf8(bytes.into()).map_err(Error::decode)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            BodyInner::Once(bytes) => f.debug_tuple("Body::Once").field(&bytes.len()).finish(),
            BodyInner::Reader { length, .. } => {
                f.debug_tuple("Body::Reader").field(length).finish()
            }
            BodyInner::Frozen => f.write_str("Body::Frozen"),
        }
    }
}

macro_rules! impl_body_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Body {
                fn from(value: $ty) -> Self {
                    Self::from_bytes(value)
                }
            }
        )*
    };
}

impl_body_from![Bytes, String, Vec<u8>, &'static str, &'static [u8]];

/// A reusable source of request body data.
///
/// Descriptors hold a source rather than a body so that a base descriptor can
/// derive many independent calls: `prepare` opens a fresh stream per wire
/// request. A source also carries content metadata, which `prepare` uses to
/// fill in a `Content-Type` header when the header store has none.
///
/// # Examples
///
/// ```rust
/// use request_kit::{Body, BodySource};
///
/// struct Greeting;
///
/// impl BodySource for Greeting {
///     fn open(&self) -> Body {
///         Body::from_bytes("hello")
///     }
///
///     fn len(&self) -> Option<u64> {
///         Some(5)
///     }
/// }
/// ```
pub trait BodySource: Send + Sync {
    /// Opens a fresh byte stream over this source's data.
    fn open(&self) -> Body;

    /// Returns the content length, when known.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns the media type of the data, when known.
    fn content_type(&self) -> Option<&str> {
        None
    }
}

impl BodySource for Bytes {
    fn open(&self) -> Body {
        Body::from_bytes(self.clone())
    }

    fn len(&self) -> Option<u64> {
        Some(Bytes::len(self) as u64)
    }
}

impl BodySource for String {
    fn open(&self) -> Body {
        Body::from_bytes(Bytes::from(self.clone()))
    }

    fn len(&self) -> Option<u64> {
        Some(String::len(self) as u64)
    }
}

impl BodySource for &'static str {
    fn open(&self) -> Body {
        Body::from_bytes(*self)
    }

    fn len(&self) -> Option<u64> {
        Some(str::len(self) as u64)
    }
}

impl BodySource for Vec<u8> {
    fn open(&self) -> Body {
        Body::from_bytes(Bytes::from(self.clone()))
    }

    fn len(&self) -> Option<u64> {
        Some(Vec::len(self) as u64)
    }
}

/// JSON-serialized body data produced by `Request::set_body_json`.
#[derive(Debug, Clone)]
pub(crate) struct JsonSource {
    data: Bytes,
}

impl JsonSource {
    pub(crate) fn new<T: serde::Serialize>(value: &T) -> Result<Self> {
        let data = serde_json::to_vec(value).map_err(Error::encode)?;
        Ok(Self { data: data.into() })
    }
}

impl BodySource for JsonSource {
    fn open(&self) -> Body {
        Body::from_bytes(self.data.clone())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn content_type(&self) -> Option<&str> {
        Some("application/json")
    }
}
