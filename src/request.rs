//! The request descriptor and its execution engine.
//!
//! [`Request`] is an immutable-by-convention value describing a not-yet-executed
//! HTTP call: method, URL parts, headers, body source, unmarshalling strategy,
//! client override, middleware chains, and a taint slot. Every mutator consumes
//! the receiver and returns a new value, so a cloned base descriptor can derive
//! any number of independent calls:
//!
//! ```rust
//! use request_kit::Request;
//!
//! let base = Request::begin("https://api.example.com/v1")
//!     .set_bearer_token("mytoken");
//!
//! let users = base.clone().join_path("users");
//! let posts = base.clone().join_path("posts");
//! assert_eq!(users.path(), "/v1/users");
//! assert_eq!(base.path(), "/v1");
//! ```
//!
//! Execution happens through [`Request::prepare`] (materialize the wire request,
//! running the request-middleware chain) and [`Request::send`] (additionally
//! dispatch through a network client and run the response-middleware chain).
//! The execution context is injected at that point, never stored by mutators.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::uri::{Authority, Scheme};
use http::{HeaderMap, Method, Uri};
use std::fmt;
use std::sync::Arc;

use crate::body::{Body, BodySource, JsonSource};
use crate::client::{self, ClientImpl};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::middleware::{RequestMiddleware, ResponseMiddleware};
use crate::response::Response;
use crate::unmarshal::{Json, Unmarshaller};
use crate::WireRequest;

/// An immutable, chainable HTTP request descriptor.
///
/// Built via [`Request::begin`] (or [`Request::new`] for an empty descriptor),
/// shaped through chained mutators, and consumed by [`Request::prepare`] or
/// [`Request::send`]. All mutators are pure, non-throwing transforms: inputs
/// that cannot be applied (a malformed base URL, a body that fails to
/// serialize) taint the descriptor instead of returning an error, and the
/// stored error surfaces when the descriptor is executed.
///
/// # Examples
///
/// ```rust
/// use request_kit::{Context, Request};
/// use http::Method;
///
/// let wire = Request::begin("https://api.example.com/search")
///     .set_method(Method::GET)
///     .add_query("q", "rust")
///     .set_header("Accept", "application/json")
///     .prepare(&Context::background())
///     .unwrap();
///
/// assert_eq!(wire.method(), &Method::GET);
/// assert_eq!(wire.uri().query(), Some("q=rust"));
/// ```
#[derive(Clone)]
pub struct Request {
    method: Method,
    scheme: Option<Scheme>,
    authority: Option<Authority>,
    path: String,
    query: Vec<(String, String)>,
    headers: Headers,
    body: Option<Arc<dyn BodySource>>,
    client: Option<Arc<dyn ClientImpl>>,
    unmarshaller: Arc<dyn Unmarshaller>,
    request_middlewares: Vec<RequestMiddleware>,
    response_middlewares: Vec<ResponseMiddleware>,
    error: Option<Error>,
    context: Option<Context>,
}

impl Request {
    /// Creates an empty descriptor: method GET, no URL parts, no headers.
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            scheme: None,
            authority: None,
            path: String::new(),
            query: Vec::new(),
            headers: Headers::new(),
            body: None,
            client: None,
            unmarshaller: Arc::new(Json),
            request_middlewares: Vec::new(),
            response_middlewares: Vec::new(),
            error: None,
            context: None,
        }
    }

    /// Creates a descriptor from a base URL.
    ///
    /// The URL's scheme, authority, path, and query seed the descriptor. A
    /// malformed URL does not fail here; it taints the descriptor, and the
    /// parse error is returned when the request is prepared or sent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Request;
    ///
    /// let req = Request::begin("https://api.example.com/v1?page=2");
    /// assert_eq!(req.path(), "/v1");
    /// assert!(!req.has_error());
    ///
    /// let bad = Request::begin("https://exa mple.com");
    /// assert!(bad.has_error());
    /// ```
    pub fn begin(base_url: impl AsRef<str>) -> Self {
        let raw = base_url.as_ref();
        let mut req = Self::new();
        if raw.is_empty() {
            return req;
        }
        let uri = match raw.parse::<Uri>() {
            Ok(uri) => uri,
            Err(error) => return req.set_error(Some(Error::invalid_url(error))),
        };
        let parts = uri.into_parts();
        req.scheme = parts.scheme;
        req.authority = parts.authority;
        if let Some(path_and_query) = parts.path_and_query {
            req.path = path_and_query.path().to_owned();
            if let Some(query) = path_and_query.query() {
                match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
                    Ok(pairs) => req.query = pairs,
                    Err(error) => return req.set_error(Some(Error::invalid_url(error))),
                }
            }
        }
        req
    }

    /// Sets the HTTP method.
    pub fn set_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Replaces the URL path.
    pub fn set_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Appends a segment to the URL path, normalizing the joining slash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Request;
    ///
    /// let req = Request::begin("https://api.example.com/v1/")
    ///     .join_path("/users")
    ///     .join_path("42");
    /// assert_eq!(req.path(), "/v1/users/42");
    /// ```
    pub fn join_path(mut self, segment: impl AsRef<str>) -> Self {
        let segment = segment.as_ref().trim_start_matches('/');
        if !self.path.ends_with('/') {
            self.path.push('/');
        }
        self.path.push_str(segment);
        self
    }

    /// Returns the URL path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replaces any query parameter named `name` with a single pair.
    pub fn set_query(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        let name = name.into();
        self.query.retain(|(existing, _)| *existing != name);
        self.query.push((name, value.to_string()));
        self
    }

    /// Appends a query parameter, keeping existing pairs of the same name.
    pub fn add_query(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Returns the accumulated query parameters in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Appends a header pair without touching existing pairs of the same name.
    pub fn add_header(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Removes all case-insensitive matches for `name`, then appends one pair.
    pub fn set_header(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Removes all header pairs matching `name` case-insensitively.
    pub fn remove_header(mut self, name: impl AsRef<str>) -> Self {
        self.headers.remove(name);
        self
    }

    /// Returns all matching header values joined with `"; "`.
    ///
    /// See [`Headers::get`] for the empty-string ambiguity.
    pub fn get_header(&self, name: impl AsRef<str>) -> String {
        self.headers.get(name)
    }

    /// Returns true if at least one header pair matches `name`.
    pub fn has_header(&self, name: impl AsRef<str>) -> bool {
        self.headers.has(name)
    }

    /// Returns the header store.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the headers in canonical wire form.
    ///
    /// # Errors
    ///
    /// Fails if a stored name or value is not a valid wire header.
    pub fn header_map(&self) -> Result<HeaderMap> {
        self.headers.to_header_map()
    }

    /// Sets the request body source.
    pub fn set_body(mut self, source: impl BodySource + 'static) -> Self {
        self.body = Some(Arc::new(source));
        self
    }

    /// Sets a JSON body serialized from `value`.
    ///
    /// Serialization happens eagerly; a failure taints the descriptor. The
    /// source advertises `application/json`, which `prepare` applies unless a
    /// `Content-Type` header was set explicitly.
    pub fn set_body_json<T: serde::Serialize>(self, value: &T) -> Self {
        match JsonSource::new(value) {
            Ok(source) => self.set_body(source),
            Err(error) => self.set_error(Some(error)),
        }
    }

    /// Sets the `Authorization` header to HTTP basic credentials.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Request;
    ///
    /// let req = Request::new().set_basic_auth("johndoe", "password123");
    /// assert_eq!(
    ///     req.get_header("authorization"),
    ///     "Basic am9obmRvZTpwYXNzd29yZDEyMw=="
    /// );
    /// ```
    pub fn set_basic_auth(self, user: impl fmt::Display, password: impl fmt::Display) -> Self {
        let credentials = BASE64_STANDARD.encode(format!("{user}:{password}"));
        self.set_header("Authorization", format!("Basic {credentials}"))
    }

    /// Sets the `Authorization` header to a bearer token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Request;
    ///
    /// let req = Request::new().set_bearer_token("mytoken");
    /// assert_eq!(req.get_header("Authorization"), "Bearer mytoken");
    /// ```
    pub fn set_bearer_token(self, token: impl fmt::Display) -> Self {
        self.set_header("Authorization", format!("Bearer {token}"))
    }

    /// Overrides the network client for this descriptor.
    ///
    /// Without an override, execution falls back to the process-wide default
    /// registered with [`set_default_client`](crate::set_default_client).
    pub fn set_client(mut self, client: impl crate::Client + 'static) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Returns true if a client override is set.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Replaces the unmarshalling strategy inherited by the response wrapper.
    pub fn set_unmarshaller(mut self, unmarshaller: impl Unmarshaller + 'static) -> Self {
        self.unmarshaller = Arc::new(unmarshaller);
        self
    }

    /// Appends a request middleware. Middlewares run in registration order.
    pub fn add_request_middleware(
        mut self,
        middleware: impl Fn(Request) -> Request + Send + Sync + 'static,
    ) -> Self {
        self.request_middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends a response middleware. Middlewares run in registration order.
    pub fn add_response_middleware(
        mut self,
        middleware: impl Fn(&Request, Response, Option<Error>) -> (Response, Option<Error>)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.response_middlewares.push(Arc::new(middleware));
        self
    }

    /// Taints or un-taints the descriptor.
    ///
    /// Builder methods keep working on a tainted descriptor, but executing it
    /// fails immediately with the stored error, before any middleware runs.
    /// Passing `None` un-taints.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::{Context, Error, Request};
    ///
    /// let req = Request::new().set_error(Some(Error::msg("boom")));
    /// assert!(req.prepare(&Context::background()).is_err());
    ///
    /// let req = req.set_error(None);
    /// assert!(req.prepare(&Context::background()).is_ok());
    /// ```
    pub fn set_error(mut self, error: impl Into<Option<Error>>) -> Self {
        self.error = error.into();
        self
    }

    /// Returns the taint error, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns true if the descriptor is tainted.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Applies an arbitrary transform to the descriptor.
    ///
    /// The general escape hatch for packaging custom builder extensions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use request_kit::Request;
    ///
    /// fn traced(req: Request) -> Request {
    ///     req.set_header("X-Trace-Id", "abc123")
    /// }
    ///
    /// let req = Request::new().map(traced);
    /// assert!(req.has_header("x-trace-id"));
    /// ```
    pub fn map(self, f: impl FnOnce(Request) -> Request) -> Self {
        f(self)
    }

    /// Returns the execution context bound to this descriptor.
    ///
    /// The context is bound by `prepare`/`send`, so this is only meaningful
    /// inside middlewares; elsewhere it is the background context.
    pub fn context(&self) -> Context {
        self.context.clone().unwrap_or_default()
    }

    /// Materializes the wire request that would be sent.
    ///
    /// Runs in order: the taint check, the context bind, each request
    /// middleware (with a taint check after every one), then translation of
    /// method, URL parts, body source, and header store into a wire request.
    /// Stored headers are *appended* onto the wire request, so a default
    /// header installed by the transport may coexist with a stored header of
    /// the same name.
    ///
    /// # Errors
    ///
    /// Returns the taint error (stored or set by a middleware), or a
    /// construction error if the URL or a header cannot be materialized.
    pub fn prepare(&self, cx: &Context) -> Result<WireRequest> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let mut req = self.clone();
        req.context = Some(cx.clone());
        let chain = req.request_middlewares.clone();
        for middleware in chain {
            req = middleware(req);
            if let Some(error) = req.error.take() {
                return Err(error);
            }
        }
        req.materialize()
    }

    /// Executes the request and returns the final `(wrapper, error)` pair
    /// produced by the response-middleware chain.
    ///
    /// Both sides are always returned: a middleware that flags an otherwise
    /// successful exchange as an error (a non-2xx status check being the
    /// usual case) still leaves the response inspectable. On a transport
    /// failure the wrapper has no underlying response but is handed through
    /// the full chain regardless. A `prepare` or client-resolution failure
    /// yields an empty wrapper and the error without running response
    /// middlewares.
    ///
    /// Use [`Request::send`] when a collapsed `Result` is enough.
    pub async fn dispatch(&self, cx: &Context) -> (Response, Option<Error>) {
        let wire = match self.prepare(cx) {
            Ok(wire) => wire,
            Err(error) => return (Response::new(None, self.unmarshaller.clone()), Some(error)),
        };
        let client = match client::resolve(self.client.as_ref()) {
            Ok(client) => client,
            Err(error) => return (Response::new(None, self.unmarshaller.clone()), Some(error)),
        };
        let (raw, mut error) = match client.execute_inner(wire, cx).await {
            Ok(response) => (Some(response), None),
            Err(transport_error) => (None, Some(cx.error().unwrap_or(transport_error))),
        };
        let mut response = Response::new(raw, self.unmarshaller.clone());
        let mut origin = self.clone();
        origin.context = Some(cx.clone());
        for middleware in &origin.response_middlewares {
            let (next_response, next_error) = middleware(&origin, response, error);
            response = next_response;
            error = next_error;
        }
        (response, error)
    }

    /// Executes the request and threads the outcome through the response
    /// middlewares.
    ///
    /// Resolution order for the network client: the descriptor's override,
    /// else the process-wide default, else a "no client" error. A `prepare`
    /// failure returns immediately without running response middlewares; a
    /// transport failure does not short-circuit them. When the transport
    /// fails and the context had already been canceled or expired, the
    /// context's error is reported as the cause instead of the raw transport
    /// error.
    ///
    /// The final `(wrapper, error)` pair is collapsed into a `Result`: an
    /// error wins, and a middleware that clears the error recovers the call.
    /// Use [`Request::dispatch`] when the response must stay inspectable
    /// alongside the error.
    pub async fn send(&self, cx: &Context) -> Result<Response> {
        let (response, error) = self.dispatch(cx).await;
        match error {
            Some(error) => Err(error),
            None => Ok(response),
        }
    }

    /// Sets the method to GET and sends the request.
    pub async fn get(&self, cx: &Context) -> Result<Response> {
        self.clone().set_method(Method::GET).send(cx).await
    }

    /// Sets the method to POST and sends the request.
    pub async fn post(&self, cx: &Context) -> Result<Response> {
        self.clone().set_method(Method::POST).send(cx).await
    }

    /// Sets the method to PUT and sends the request.
    pub async fn put(&self, cx: &Context) -> Result<Response> {
        self.clone().set_method(Method::PUT).send(cx).await
    }

    /// Sets the method to PATCH and sends the request.
    pub async fn patch(&self, cx: &Context) -> Result<Response> {
        self.clone().set_method(Method::PATCH).send(cx).await
    }

    /// Sets the method to DELETE and sends the request.
    pub async fn delete(&self, cx: &Context) -> Result<Response> {
        self.clone().set_method(Method::DELETE).send(cx).await
    }

    /// Sets the method to HEAD and sends the request.
    pub async fn head(&self, cx: &Context) -> Result<Response> {
        self.clone().set_method(Method::HEAD).send(cx).await
    }

    fn build_uri(&self) -> Result<Uri> {
        let mut path_and_query = if self.path.is_empty() {
            String::from("/")
        } else {
            self.path.clone()
        };
        if !path_and_query.starts_with('/') {
            path_and_query.insert(0, '/');
        }
        if !self.query.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.query).map_err(Error::invalid_url)?;
            path_and_query.push('?');
            path_and_query.push_str(&encoded);
        }
        let mut builder = Uri::builder();
        if let Some(scheme) = &self.scheme {
            builder = builder.scheme(scheme.clone());
        } else if self.authority.is_some() {
            builder = builder.scheme(Scheme::HTTP);
        }
        if let Some(authority) = &self.authority {
            builder = builder.authority(authority.clone());
        }
        builder
            .path_and_query(path_and_query)
            .build()
            .map_err(Error::invalid_url)
    }

    fn materialize(self) -> Result<WireRequest> {
        let uri = self.build_uri()?;
        let body = match &self.body {
            Some(source) => source.open(),
            None => Body::empty(),
        };
        let mut wire = http::Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(body)
            .map_err(Error::build)?;
        if let Some(source) = &self.body {
            if !self.headers.has("content-type") {
                if let Some(content_type) = source.content_type() {
                    let value = HeaderValue::from_str(content_type)
                        .map_err(|error| Error::invalid_header("content-type", error))?;
                    wire.headers_mut().insert(CONTENT_TYPE, value);
                }
            }
        }
        for header in &self.headers {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|error| Error::invalid_header(&header.name, error))?;
            let value = HeaderValue::from_str(&header.value)
                .map_err(|error| Error::invalid_header(&header.name, error))?;
            wire.headers_mut().append(name, value);
        }
        Ok(wire)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("scheme", &self.scheme)
            .field("authority", &self.authority)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .field("has_client", &self.client.is_some())
            .field("unmarshaller", &self.unmarshaller.name())
            .field("request_middlewares", &self.request_middlewares.len())
            .field("response_middlewares", &self.response_middlewares.len())
            .field("error", &self.error)
            .finish()
    }
}
