//! Canned-response HTTP server for exercising the real REST client
//!
//! Records every request and answers from a table keyed by method and path.
//! Unknown paths get GitHub's 404 body.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use tokio::net::TcpListener;

/// A recorded HTTP request for test assertions
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    /// Path only, still percent-encoded
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body parsed as JSON
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[derive(Clone, Debug)]
struct CannedResponse {
    status: StatusCode,
    body: Vec<u8>,
}

type ResponseTable = Arc<RwLock<HashMap<(String, String), CannedResponse>>>;

/// A mock GitHub REST endpoint
pub struct MockHttpService {
    addr: SocketAddr,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    responses: ResponseTable,
}

impl MockHttpService {
    /// Start the service on an ephemeral port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock service");
        let addr = listener.local_addr().expect("mock service has no address");

        let requests: Arc<RwLock<Vec<RecordedRequest>>> = Arc::new(RwLock::new(Vec::new()));
        let responses: ResponseTable = Arc::new(RwLock::new(HashMap::new()));

        let requests_clone = requests.clone();
        let responses_clone = responses.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let requests = requests_clone.clone();
                let responses = responses_clone.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let requests = requests.clone();
                        let responses = responses.clone();
                        async move {
                            let method = req.method().to_string();
                            let path = req.uri().path().to_string();
                            let query = req.uri().query().map(str::to_string);
                            let headers: Vec<(String, String)> = req
                                .headers()
                                .iter()
                                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                                .collect();

                            let body = req
                                .into_body()
                                .collect()
                                .await
                                .map(|b| b.to_bytes().to_vec())
                                .unwrap_or_default();

                            let canned = responses
                                .read()
                                .get(&(method.clone(), path.clone()))
                                .cloned()
                                .unwrap_or_else(not_found);

                            requests.write().push(RecordedRequest {
                                method,
                                path,
                                query,
                                headers,
                                body,
                            });

                            let mut builder = Response::builder().status(canned.status);
                            if !canned.body.is_empty() {
                                builder = builder.header("content-type", "application/json");
                            }

                            Ok::<_, Infallible>(
                                builder
                                    .body(Full::new(Bytes::from(canned.body)))
                                    .expect("canned response is valid"),
                            )
                        }
                    });

                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            addr,
            requests,
            responses,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL to hand to the REST client
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer `method path` with `status` and a JSON body
    pub fn respond_json(&self, method: &str, path: &str, status: u16, body: serde_json::Value) {
        self.respond(method, path, status, body.to_string().into_bytes());
    }

    /// Answer `method path` with `status` and no body
    pub fn respond_empty(&self, method: &str, path: &str, status: u16) {
        self.respond(method, path, status, Vec::new());
    }

    /// Answer `method path` with `status` and a raw body
    pub fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.responses.write().insert(
            (method.to_string(), path.to_string()),
            CannedResponse {
                status,
                body: body.into(),
            },
        );
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.read().last().cloned()
    }

    pub fn clear_requests(&self) {
        self.requests.write().clear();
    }
}

fn not_found() -> CannedResponse {
    CannedResponse {
        status: StatusCode::NOT_FOUND,
        body: br#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#
            .to_vec(),
    }
}
