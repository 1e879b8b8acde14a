//! In-process HTTP stand-in for the data store and LLM APIs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct Route {
    path: String,
    status: StatusCode,
    body: String,
}

pub struct MockServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    /// Every request gets the same canned response.
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::with_routes(vec![("", status, body.into())]).await
    }

    /// First route whose path is a prefix of the request path answers; 404 otherwise.
    pub async fn with_routes(routes: Vec<(&str, u16, String)>) -> Self {
        let routes: Arc<Vec<Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, status, body)| Route {
                    path: path.to_string(),
                    status: StatusCode::from_u16(status).unwrap(),
                    body,
                })
                .collect(),
        );
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handler = {
            let hits = hits.clone();
            let requests = requests.clone();
            move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
                let hits = hits.clone();
                let requests = requests.clone();
                let routes = routes.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    requests.lock().push(RecordedRequest {
                        method: method.to_string(),
                        path: uri.path().to_string(),
                        query: uri.query().map(str::to_string),
                        headers: headers
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                            .collect(),
                        body,
                    });
                    match routes.iter().find(|r| uri.path().starts_with(&r.path)) {
                        Some(route) => (route.status, route.body.clone()),
                        None => (StatusCode::NOT_FOUND, "not found".to_string()),
                    }
                }
            }
        };

        let app = Router::new().fallback(handler);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

/// Address that refuses connections
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";
