use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use request_kit::{
    Body, BodySource, Client, Context, Error, Form, Header, Headers, Json, Request, Response,
    WireRequest, WireResponse,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock client saw on its last call.
struct Captured {
    method: Method,
    uri: Uri,
    headers: http::HeaderMap,
    body: Bytes,
}

/// A canned-response transport that records every request it executes.
#[derive(Clone)]
struct MockClient {
    status: u16,
    body: &'static str,
    fail: bool,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Option<Captured>>>,
}

impl MockClient {
    fn ok(body: &'static str) -> Self {
        Self {
            status: 200,
            body,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(None)),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok("")
        }
    }

    fn with_status(status: u16, body: &'static str) -> Self {
        Self {
            status,
            ..Self::ok(body)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn captured(&self) -> Captured {
        self.seen.lock().unwrap().take().expect("no request captured")
    }
}

impl Client for MockClient {
    async fn execute(&self, mut request: WireRequest, _cx: &Context) -> Result<WireResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = request.body_mut().take()?;
        let data = body.into_bytes().await?;
        *self.seen.lock().unwrap() = Some(Captured {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
            body: data,
        });
        if self.fail {
            return Err(Error::transport(std::io::Error::other("connection refused")));
        }
        http::Response::builder()
            .status(self.status)
            .body(Body::from_bytes(self.body))
            .map_err(Error::transport)
    }
}

fn pairs(headers: &Headers) -> Vec<(&str, &str)> {
    headers
        .iter()
        .map(|h| (h.name.as_str(), h.value.as_str()))
        .collect()
}

#[test]
fn test_headers_add_and_get() {
    let req = Request::new()
        .add_header("Test1", "a")
        .add_header("Test2", "b")
        .add_header("Test1", "c");

    assert_eq!(req.get_header("Test1"), "a; c");
    assert_eq!(req.get_header("test1"), "a; c");
    assert_eq!(req.get_header("TeSt1"), "a; c");
    assert_eq!(req.get_header("TEST2"), "b");
    assert_eq!(req.get_header("Nothing"), "");
}

#[test]
fn test_headers_has() {
    let req = Request::new()
        .add_header("Test1", "a")
        .add_header("Test2", "b");

    assert!(req.has_header("Test1"));
    assert!(req.has_header("TEsT2"));
    assert!(!req.has_header("Test3"));
}

#[test]
fn test_headers_set_replaces_all_matches() {
    let req = Request::new()
        .add_header("Test1", "a")
        .add_header("Test2", "b")
        .add_header("TEST1", "c");
    assert_eq!(
        pairs(req.headers()),
        vec![("Test1", "a"), ("Test2", "b"), ("TEST1", "c")]
    );

    let req = req.set_header("Test1", "d");
    assert_eq!(pairs(req.headers()), vec![("Test2", "b"), ("Test1", "d")]);
}

#[test]
fn test_headers_remove_is_idempotent() {
    let base = Request::new()
        .add_header("Test1", "a")
        .add_header("Test2", "b")
        .add_header("Test1", "c");

    let removed = base.clone().remove_header("TeSt1");
    assert_eq!(pairs(removed.headers()), vec![("Test2", "b")]);

    // Removing again, or removing something absent, changes nothing.
    let removed = removed.remove_header("Test1").remove_header("Missing");
    assert_eq!(pairs(removed.headers()), vec![("Test2", "b")]);

    // The base descriptor is untouched.
    assert_eq!(base.headers().len(), 3);
}

#[test]
fn test_headers_get_keeps_separators_for_empty_values() {
    let mut headers = Headers::new();
    headers.add("X-Flag", "");
    headers.add("X-Flag", "b");
    assert_eq!(headers.get("x-flag"), "; b");

    headers.add("X-FLAG", "");
    assert_eq!(headers.get("X-Flag"), "; b; ");
}

#[test]
fn test_headers_collect_from_pairs() {
    let headers: Headers = [("Accept", "text/html"), ("ACCEPT", "application/json")]
        .into_iter()
        .map(|(name, value)| Header::new(name, value))
        .collect();

    assert_eq!(headers.len(), 2);
    assert_eq!(headers.get("accept"), "text/html; application/json");
}

#[test]
fn test_header_map_wire_form() {
    let req = Request::new();
    assert_eq!(req.header_map().unwrap(), http::HeaderMap::new());

    let req = req
        .add_header("Single1", "a")
        .add_header("Multiple", "first")
        .add_header("Single2", "b")
        .add_header("MULTIPLE", "second");

    let map = req.header_map().unwrap();
    assert_eq!(map.keys_len(), 3);
    assert_eq!(map["single1"], "a");
    assert_eq!(map["single2"], "b");
    let multiple: Vec<_> = map.get_all("multiple").iter().collect();
    assert_eq!(multiple, vec!["first", "second"]);
}

#[test]
fn test_set_basic_auth() {
    let req = Request::new().set_basic_auth("johndoe", "password123");
    assert_eq!(
        req.get_header("authorization"),
        "Basic am9obmRvZTpwYXNzd29yZDEyMw=="
    );
}

#[test]
fn test_set_bearer_token() {
    let req = Request::new().set_bearer_token("mytoken");
    assert_eq!(req.get_header("authorization"), "Bearer mytoken");
}

#[test]
fn test_tainted_request_fails_before_middlewares() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = invoked.clone();
    let err = Error::msg("tainted");

    let req = Request::begin("https://example.com")
        .add_request_middleware(move |req| {
            counter.fetch_add(1, Ordering::SeqCst);
            req
        })
        .set_error(Some(err.clone()));

    let failure = req.prepare(&Context::background()).unwrap_err();
    assert!(failure.same_cause(&err));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    // Un-tainting restores the pipeline.
    let req = req.set_error(None);
    assert!(req.prepare(&Context::background()).is_ok());
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tainted_request_never_reaches_client() {
    let client = MockClient::ok("{}");
    let err = Error::msg("do not send");
    let failure = Request::begin("https://example.com")
        .set_client(client.clone())
        .set_error(Some(err.clone()))
        .send(&Context::background())
        .await
        .unwrap_err();

    assert!(failure.same_cause(&err));
    assert_eq!(client.calls(), 0);
}

#[test]
fn test_request_middlewares_run_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = order.clone();
    let second = order.clone();

    let wire = Request::begin("https://example.com")
        .add_request_middleware(move |req| {
            first.lock().unwrap().push("m1");
            req.set_header("X-From-M1", "yes")
        })
        .add_request_middleware(move |req| {
            // m2 observes m1's effect, proving ordering.
            assert!(req.has_header("X-From-M1"));
            second.lock().unwrap().push("m2");
            req
        })
        .prepare(&Context::background())
        .unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["m1", "m2"]);
    assert_eq!(wire.headers()["x-from-m1"], "yes");
}

#[test]
fn test_tainting_middleware_halts_chain() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = invoked.clone();
    let err = Error::msg("m1 says no");
    let cause = err.clone();

    let failure = Request::begin("https://example.com")
        .add_request_middleware(move |req| req.set_error(Some(cause.clone())))
        .add_request_middleware(move |req| {
            counter.fetch_add(1, Ordering::SeqCst);
            req
        })
        .prepare(&Context::background())
        .unwrap_err();

    assert!(failure.same_cause(&err));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[test]
fn test_middlewares_observe_execution_context() {
    let saw_deadline = Arc::new(AtomicUsize::new(0));
    let counter = saw_deadline.clone();

    Request::begin("https://example.com")
        .add_request_middleware(move |req| {
            if req.context().deadline().is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            req
        })
        .prepare(&Context::with_timeout(Duration::from_secs(30)))
        .unwrap();

    assert_eq!(saw_deadline.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_response_middlewares_run_despite_transport_failure() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let first = invoked.clone();
    let second = invoked.clone();

    let failure = Request::begin("https://example.com")
        .set_client(MockClient::failing())
        .add_response_middleware(move |_req, rep, err| {
            first.fetch_add(1, Ordering::SeqCst);
            assert!(err.is_some());
            (rep, err)
        })
        .add_response_middleware(move |_req, rep, err| {
            second.fetch_add(1, Ordering::SeqCst);
            (rep, err)
        })
        .send(&Context::background())
        .await
        .unwrap_err();

    assert!(failure.is_transport());
    assert_eq!(invoked.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_response_middleware_can_recover() {
    let rep = Request::begin("https://example.com")
        .set_client(MockClient::failing())
        .add_response_middleware(|_req, rep, _err| (rep, None))
        .send(&Context::background())
        .await
        .unwrap();

    // The transport never produced a response; the recovered wrapper is empty.
    assert_eq!(rep.status(), None);
}

#[tokio::test]
async fn test_response_middleware_can_replace_wrapper() {
    let rep = Request::begin("https://example.com")
        .set_client(MockClient::failing())
        .add_response_middleware(|_req, _rep, _err| {
            let fallback = http::Response::builder()
                .status(299)
                .body(Body::empty())
                .unwrap();
            (Response::new(Some(fallback), Arc::new(Json)), None)
        })
        .send(&Context::background())
        .await
        .unwrap();

    assert_eq!(rep.status().map(|s| s.as_u16()), Some(299));
}

#[tokio::test]
async fn test_prepare_failure_skips_response_middlewares() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = invoked.clone();

    let result = Request::begin("https://example.com")
        .set_client(MockClient::ok("{}"))
        .set_error(Some(Error::msg("tainted")))
        .add_response_middleware(move |_req, rep, err| {
            counter.fetch_add(1, Ordering::SeqCst);
            (rep, err)
        })
        .send(&Context::background())
        .await;

    assert!(result.is_err());
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[test]
fn test_prepare_without_body_yields_empty_body() {
    let wire = Request::begin("https://example.com/ping")
        .prepare(&Context::background())
        .unwrap();
    assert_eq!(wire.body().is_empty(), Some(true));
}

#[tokio::test]
async fn test_prepare_materializes_body_source() {
    let wire = Request::begin("https://example.com/upload")
        .set_method(Method::POST)
        .set_body(Bytes::from_static(b"raw payload"))
        .prepare(&Context::background())
        .unwrap();

    let data = wire.into_body().into_bytes().await.unwrap();
    assert_eq!(data.as_ref(), b"raw payload");
}

/// A body source backed by an async reader, opened fresh per call.
struct StreamSource(&'static [u8]);

impl BodySource for StreamSource {
    fn open(&self) -> Body {
        Body::from_reader(futures_lite::io::Cursor::new(self.0), self.0.len())
    }

    fn len(&self) -> Option<u64> {
        Some(self.0.len() as u64)
    }
}

#[tokio::test]
async fn test_streaming_body_source_matches_stream() {
    let req = Request::begin("https://example.com")
        .set_method(Method::POST)
        .set_body(StreamSource(b"streamed bytes"));

    // The source re-opens per prepare, so the descriptor stays reusable.
    for _ in 0..2 {
        let wire = req.prepare(&Context::background()).unwrap();
        let data = wire.into_body().into_bytes().await.unwrap();
        assert_eq!(data.as_ref(), b"streamed bytes");
    }
}

#[test]
fn test_prepare_round_trip() {
    let wire = Request::begin("https://api.example.com/v1")
        .set_method(Method::PUT)
        .join_path("items")
        .add_query("page", 2)
        .add_query("q", "two words")
        .add_header("Accept", "application/json")
        .add_header("accept", "text/html")
        .prepare(&Context::background())
        .unwrap();

    assert_eq!(wire.method(), &Method::PUT);
    assert_eq!(wire.uri().path(), "/v1/items");
    assert_eq!(wire.uri().query(), Some("page=2&q=two+words"));
    let accept: Vec<_> = wire.headers().get_all("accept").iter().collect();
    assert_eq!(accept, vec!["application/json", "text/html"]);
}

#[test]
fn test_set_query_replaces_pairs() {
    let req = Request::new()
        .add_query("page", 1)
        .add_query("page", 2)
        .set_query("page", 3)
        .add_query("limit", 50);

    assert_eq!(
        req.query(),
        &[
            ("page".to_string(), "3".to_string()),
            ("limit".to_string(), "50".to_string()),
        ]
    );
}

#[test]
fn test_begin_with_malformed_url_taints() {
    let req = Request::begin("https://exa mple.com/path");
    assert!(req.has_error());
    let failure = req.prepare(&Context::background()).unwrap_err();
    assert!(failure.is_invalid_url());
}

#[test]
fn test_value_semantics_reuse() {
    let base = Request::begin("https://api.example.com").set_header("X-Env", "prod");
    let derived = base.clone().set_header("X-Env", "staging").join_path("jobs");

    assert_eq!(base.get_header("X-Env"), "prod");
    assert_eq!(derived.get_header("X-Env"), "staging");
    assert_ne!(base.path(), derived.path());
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    name: String,
    role: String,
}

#[tokio::test]
async fn test_send_and_unmarshal_json() {
    let client = MockClient::ok(r#"{"name":"alice","role":"admin"}"#);
    let mut rep = Request::begin("https://api.example.com/users/alice")
        .set_client(client.clone())
        .set_bearer_token("mytoken")
        .send(&Context::background())
        .await
        .unwrap();

    assert_eq!(rep.status(), Some(StatusCode::OK));
    let user: User = rep.unmarshal().await.unwrap();
    assert_eq!(
        user,
        User {
            name: "alice".into(),
            role: "admin".into()
        }
    );

    let captured = client.captured();
    assert_eq!(captured.method, Method::GET);
    assert_eq!(captured.uri.path(), "/users/alice");
    assert_eq!(captured.headers["authorization"], "Bearer mytoken");
}

#[tokio::test]
async fn test_send_json_body_sets_content_type() {
    let client = MockClient::ok("{}");
    Request::begin("https://api.example.com/users")
        .set_client(client.clone())
        .set_body_json(&serde_json::json!({"name": "bob"}))
        .post(&Context::background())
        .await
        .unwrap();

    let captured = client.captured();
    assert_eq!(captured.method, Method::POST);
    assert_eq!(captured.headers["content-type"], "application/json");
    assert_eq!(captured.body.as_ref(), br#"{"name":"bob"}"#);
}

#[tokio::test]
async fn test_explicit_content_type_wins_over_source() {
    let client = MockClient::ok("{}");
    Request::begin("https://api.example.com/users")
        .set_client(client.clone())
        .set_header("Content-Type", "application/json; charset=utf-8")
        .set_body_json(&serde_json::json!({}))
        .post(&Context::background())
        .await
        .unwrap();

    let captured = client.captured();
    let values: Vec<_> = captured.headers.get_all("content-type").iter().collect();
    assert_eq!(values, vec!["application/json; charset=utf-8"]);
}

#[tokio::test]
async fn test_form_strategy_and_json_bypass() {
    let client = MockClient::ok("name=alice&role=admin");
    let req = Request::begin("https://api.example.com/form")
        .set_client(client)
        .set_unmarshaller(Form);

    let mut rep = req.send(&Context::background()).await.unwrap();
    let user: User = rep.unmarshal().await.unwrap();
    assert_eq!(user.name, "alice");
    assert_eq!(user.role, "admin");

    // The named codec ignores the configured strategy.
    let client = MockClient::ok(r#"{"name":"carol","role":"ops"}"#);
    let req = Request::begin("https://api.example.com/json")
        .set_client(client)
        .set_unmarshaller(Form);
    let mut rep = req.send(&Context::background()).await.unwrap();
    let user: User = rep.unmarshal_json().await.unwrap();
    assert_eq!(user.name, "carol");
}

#[tokio::test]
async fn test_dispatch_keeps_response_alongside_error() {
    let client = MockClient::with_status(503, "upstream down");
    let req = Request::begin("https://example.com/health")
        .set_client(client)
        .add_response_middleware(|_req, rep, err| match rep.status() {
            Some(status) if !status.is_success() => {
                (rep, Some(Error::msg(format!("unexpected status {status}"))))
            }
            _ => (rep, err),
        });

    let (mut rep, error) = req.dispatch(&Context::background()).await;
    assert!(error.is_some());
    assert_eq!(rep.status().map(|status| status.as_u16()), Some(503));
    assert_eq!(rep.bytes().await.unwrap().as_ref(), b"upstream down");

    // The collapsing form reports only the error.
    let failure = req.send(&Context::background()).await.unwrap_err();
    assert_eq!(failure.to_string(), "unexpected status 503 Service Unavailable");
}

#[tokio::test]
async fn test_dispatch_pair_on_tainted_descriptor() {
    let err = Error::msg("tainted");
    let (rep, error) = Request::begin("https://example.com")
        .set_client(MockClient::ok("{}"))
        .set_error(Some(err.clone()))
        .dispatch(&Context::background())
        .await;

    assert!(error.unwrap().same_cause(&err));
    assert_eq!(rep.status(), None);
}

#[tokio::test]
async fn test_frozen_body_rejects_reads() {
    let body = Body::frozen();
    assert!(body.is_frozen());
    assert_eq!(body.len(), None);

    let failure = body.into_bytes().await.unwrap_err();
    assert!(failure.is_body_consumed());
}

#[tokio::test]
async fn test_response_body_is_single_pass() {
    let client = MockClient::ok("payload");
    let mut rep = Request::begin("https://example.com")
        .set_client(client)
        .send(&Context::background())
        .await
        .unwrap();

    assert_eq!(rep.bytes().await.unwrap().as_ref(), b"payload");
    let second = rep.bytes().await.unwrap_err();
    assert!(second.is_body_consumed());
}

#[tokio::test]
async fn test_canceled_context_overrides_transport_error() {
    let (cx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    let failure = Request::begin("https://example.com")
        .set_client(MockClient::failing())
        .send(&cx)
        .await
        .unwrap_err();
    assert!(failure.is_canceled());
    assert!(!failure.is_transport());
}

#[tokio::test]
async fn test_expired_deadline_overrides_transport_error() {
    let cx = Context::with_timeout(Duration::ZERO);

    let failure = Request::begin("https://example.com")
        .set_client(MockClient::failing())
        .send(&cx)
        .await
        .unwrap_err();
    assert!(failure.is_timeout());
}

#[tokio::test]
async fn test_done_context_does_not_mask_success() {
    let (cx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    // The engine only consults the context after a transport failure.
    let rep = Request::begin("https://example.com")
        .set_client(MockClient::ok("{}"))
        .send(&cx)
        .await
        .unwrap();
    assert_eq!(rep.status(), Some(StatusCode::OK));
}

#[tokio::test]
async fn test_default_client_registry() {
    // No override, nothing registered: execution fails up front.
    let failure = Request::begin("https://example.com")
        .send(&Context::background())
        .await
        .unwrap_err();
    assert!(failure.is_no_client());

    let client = MockClient::ok("{}");
    request_kit::set_default_client(client.clone());
    let rep = Request::begin("https://example.com")
        .send(&Context::background())
        .await
        .unwrap();
    assert_eq!(rep.status(), Some(StatusCode::OK));
    assert_eq!(client.calls(), 1);
    request_kit::clear_default_client();
}

#[tokio::test]
async fn test_verb_helpers_set_method() {
    let client = MockClient::ok("{}");
    let req = Request::begin("https://example.com/things").set_client(client.clone());

    req.delete(&Context::background()).await.unwrap();
    assert_eq!(client.captured().method, Method::DELETE);

    req.put(&Context::background()).await.unwrap();
    assert_eq!(client.captured().method, Method::PUT);

    // The descriptor itself keeps its original method.
    assert_eq!(req.method(), &Method::GET);
}

#[test]
fn test_map_escape_hatch() {
    fn with_tracing(req: Request) -> Request {
        req.set_header("X-Trace", "on")
    }

    let req = Request::new().map(with_tracing).map(|r| r.add_query("v", 1));
    assert!(req.has_header("x-trace"));
    assert_eq!(req.query().len(), 1);
}

#[test]
fn test_headers_store_standalone() {
    let mut headers = Headers::new();
    headers.add("Foo", "Bar");
    headers.add("Bax", "Baz");
    headers.set("foo", "Qux");

    assert_eq!(headers.get("FOO"), "Qux");
    assert!(headers.has("bax"));
    assert_eq!(headers.len(), 2);

    let map = headers.to_header_map().unwrap();
    assert_eq!(map["foo"], "Qux");
    assert_eq!(map["bax"], "Baz");
}
