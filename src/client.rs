//! The network transport capability and the process-wide default client.
//!
//! This crate does not speak HTTP itself. Executing a request requires a
//! [`Client`]: a capability that sends a prepared wire request over a network
//! connection and returns a response or a transport error. Implementations must
//! be safe for concurrent use and are expected to honor the [`Context`] they
//! receive (abort on cancellation, respect the deadline).
//!
//! A client is resolved per call: the descriptor's override if set, otherwise
//! the process-wide default registered with [`set_default_client`]. The default
//! is an explicitly initialized, swappable singleton; nothing is registered
//! until the application (or a test) installs a client.
//!
//! # Examples
//!
//! ```rust
//! use request_kit::{Body, Client, Context, Error, WireRequest, WireResponse};
//!
//! /// A canned-response client for tests.
//! struct Fixed;
//!
//! impl Client for Fixed {
//!     async fn execute(&self, _request: WireRequest, _cx: &Context) -> Result<WireResponse, Error> {
//!         http::Response::builder()
//!             .status(204)
//!             .body(Body::empty())
//!             .map_err(Error::transport)
//!     }
//! }
//! ```

use std::any::type_name;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::{WireRequest, WireResponse};

/// A capability that executes wire requests over a network connection.
///
/// The returned future resolves to the wire response or a transport error
/// (construct one with [`Error::transport`]). Implementations must be safe to
/// share across concurrent calls; this crate adds no locking of its own.
pub trait Client: Send + Sync {
    /// Sends the request, honoring the supplied context.
    fn execute(
        &self,
        request: WireRequest,
        cx: &Context,
    ) -> impl Future<Output = Result<WireResponse>> + Send;
}

pub(crate) trait ClientImpl: Send + Sync {
    fn execute_inner<'a>(
        &'a self,
        request: WireRequest,
        cx: &'a Context,
    ) -> Pin<Box<dyn Future<Output = Result<WireResponse>> + Send + 'a>>;

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<T: Client> ClientImpl for T {
    fn execute_inner<'a>(
        &'a self,
        request: WireRequest,
        cx: &'a Context,
    ) -> Pin<Box<dyn Future<Output = Result<WireResponse>> + Send + 'a>> {
        Box::pin(self.execute(request, cx))
    }
}

static DEFAULT_CLIENT: RwLock<Option<Arc<dyn ClientImpl>>> = RwLock::new(None);

/// Installs the process-wide default client.
///
/// Requests without a [`set_client`](crate::Request::set_client) override
/// execute through this client. Replacing the default affects subsequent calls
/// only; in-flight calls keep the client they already resolved.
pub fn set_default_client(client: impl Client + 'static) {
    let client: Arc<dyn ClientImpl> = Arc::new(client);
    match DEFAULT_CLIENT.write() {
        Ok(mut slot) => *slot = Some(client),
        Err(poisoned) => *poisoned.into_inner() = Some(client),
    }
}

/// Removes the process-wide default client, if one was installed.
pub fn clear_default_client() {
    match DEFAULT_CLIENT.write() {
        Ok(mut slot) => *slot = None,
        Err(poisoned) => *poisoned.into_inner() = None,
    }
}

pub(crate) fn default_client() -> Option<Arc<dyn ClientImpl>> {
    match DEFAULT_CLIENT.read() {
        Ok(slot) => slot.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub(crate) fn resolve(override_client: Option<&Arc<dyn ClientImpl>>) -> Result<Arc<dyn ClientImpl>> {
    match override_client {
        Some(client) => Ok(client.clone()),
        None => default_client().ok_or_else(Error::no_client),
    }
}
