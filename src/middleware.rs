//! Middleware types for the request and response pipelines.
//!
//! Two chains run around every executed call, each strictly in registration
//! order:
//!
//! - **Request middlewares** transform the descriptor before the wire request
//!   is materialized. A middleware that taints the descriptor (via
//!   [`Request::set_error`](crate::Request::set_error)) aborts the remaining
//!   chain and the network call; the request side is fail-fast.
//! - **Response middlewares** observe and transform the `(wrapper, error)`
//!   pair after the network call. The full chain always runs, even when an
//!   earlier stage or the transport reported an error; the response side is
//!   fail-soft so middlewares can log, recover, or replace the outcome.
//!
//! Middlewares are plain closures stored behind [`Arc`], so descriptors stay
//! cheap to clone.
//!
//! # Examples
//!
//! ```rust
//! use request_kit::Request;
//!
//! let req = Request::begin("https://api.example.com")
//!     .add_request_middleware(|req| req.set_header("X-Api-Version", "2"))
//!     .add_response_middleware(|_req, rep, err| {
//!         if let Some(error) = &err {
//!             eprintln!("call failed: {error}");
//!         }
//!         (rep, err)
//!     });
//! # drop(req);
//! ```

use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// A stage of the request pipeline: descriptor in, descriptor out.
///
/// May taint the descriptor to abort the call.
pub type RequestMiddleware = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// A stage of the response pipeline.
///
/// Receives the originating descriptor, the in-progress response wrapper, and
/// the in-progress error; returns the pair handed to the next stage.
pub type ResponseMiddleware =
    Arc<dyn Fn(&Request, Response, Option<Error>) -> (Response, Option<Error>) + Send + Sync>;
