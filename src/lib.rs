#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]
//! A fluent, composable HTTP request builder.
//!
//! This crate constructs immutable, chainable request descriptors, applies a
//! pipeline of request/response middlewares around the actual network call,
//! and yields a wrapped response with pluggable body unmarshalling. It speaks
//! no HTTP itself: the transport is an injected [`Client`] capability, so the
//! same builder works over any HTTP implementation (and over a mock in tests).
//!
//! # Features
//!
//! - **Value-semantics builder** - every mutator returns a new descriptor, so
//!   a base request can safely derive many independent calls
//! - **Ordered middleware chains** - fail-fast on the request side, fail-soft
//!   on the response side
//! - **Error tainting** - invalid builder input poisons the descriptor and
//!   surfaces when it is executed, not mid-chain
//! - **Case-preserving header store** - insertion-ordered, multi-valued, with
//!   the transport's case-insensitive matching
//! - **Pluggable decoding** - JSON by default, swappable per request
//!
//! # Examples
//!
//! ## Building and preparing a request
//!
//! ```rust
//! use request_kit::{Context, Request};
//! use http::Method;
//!
//! let wire = Request::begin("https://api.example.com")
//!     .set_method(Method::POST)
//!     .join_path("/users")
//!     .set_bearer_token("mytoken")
//!     .set_body_json(&serde_json::json!({"name": "Alice"}))
//!     .prepare(&Context::background())
//!     .unwrap();
//!
//! assert_eq!(wire.uri().path(), "/users");
//! assert_eq!(wire.headers()["content-type"], "application/json");
//! ```
//!
//! ## Executing through a client capability
//!
//! ```rust
//! use request_kit::{Body, Client, Context, Error, Request, WireRequest, WireResponse};
//!
//! struct Canned;
//!
//! impl Client for Canned {
//!     async fn execute(&self, _request: WireRequest, _cx: &Context) -> Result<WireResponse, Error> {
//!         http::Response::builder()
//!             .status(200)
//!             .body(Body::from_bytes(r#"{"ok":true}"#))
//!             .map_err(Error::transport)
//!     }
//! }
//!
//! # futures_lite::future::block_on(async {
//! let mut rep = Request::begin("https://api.example.com/health")
//!     .set_client(Canned)
//!     .send(&Context::background())
//!     .await?;
//!
//! assert_eq!(rep.status(), Some(request_kit::StatusCode::OK));
//! let body: serde_json::Value = rep.unmarshal().await?;
//! assert_eq!(body["ok"], true);
//! # Ok::<(), request_kit::Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Middleware
//!
//! ```rust
//! use request_kit::{Context, Request};
//!
//! let wire = Request::begin("https://api.example.com")
//!     .add_request_middleware(|req| req.set_header("X-Request-Id", "42"))
//!     .prepare(&Context::background())
//!     .unwrap();
//!
//! assert_eq!(wire.headers()["x-request-id"], "42");
//! ```

pub mod error;
pub use error::{BoxError, Error, Result};

pub mod headers;
pub use headers::{Header, Headers};

pub mod body;
pub use body::{Body, BodySource};

pub mod context;
pub use context::{CancelHandle, Context};

pub mod unmarshal;
pub use unmarshal::{Form, Json, Unmarshaller};

pub mod client;
pub use client::{clear_default_client, set_default_client, Client};

pub mod middleware;
pub use middleware::{RequestMiddleware, ResponseMiddleware};

pub mod request;
pub use request::Request;

pub mod response;
pub use response::Response;

/// The concrete protocol-level request handed to the network transport.
pub type WireRequest = http::Request<Body>;
/// The concrete protocol-level response produced by the network transport.
pub type WireResponse = http::Response<Body>;

pub use http::{header, method, uri, HeaderMap, Method, StatusCode, Uri};
