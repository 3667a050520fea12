//! In-memory [`Transport`] for tests.
//!
//! Available to the crate's own tests and, through the `test-util` feature,
//! to integration tests and downstream crates.

use super::{ApiError, ApiRequest, ApiResponse, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use std::collections::VecDeque;

struct MockRoute {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    responses: VecDeque<ApiResponse>,
}

impl MockRoute {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.method == request.method
            && self.path == request.path
            && self
                .query
                .iter()
                .all(|(k, v)| request.query_param(k) == Some(v.as_str()))
    }
}

/// In-memory transport with canned responses.
///
/// Routes match on method, path and (optionally) a subset of query
/// parameters; the most specific route wins. Queued responses for a route
/// are returned in order and the last one repeats. Unrouted requests get a
/// 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response for `method path`
    pub fn on(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.on_query(method, path, &[], status, body)
    }

    /// Queue a JSON response for `method path` with the given query parameters
    pub fn on_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        status: u16,
        body: Value,
    ) -> &Self {
        let response = if body.is_null() {
            ApiResponse::new(status, "")
        } else {
            ApiResponse::json(status, &body)
        };
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut routes = self.routes.lock();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path && r.query == query)
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(MockRoute {
                method,
                path: path.to_string(),
                query,
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests sent for `method path`
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .filter(|r| r.matches(&request))
            .max_by_key(|r| r.query.len());

        let response = match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front(),
            Some(route) => route.responses.front().cloned(),
            None => None,
        };

        Ok(response.unwrap_or_else(|| ApiResponse::new(404, r#"{"error":"Not found"}"#)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: Method, path: &str, query: &[(&str, &str)]) -> ApiRequest {
        ApiRequest {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_mock_routes_most_specific_query() {
        let mock = MockTransport::new();
        mock.on(Method::GET, "/instances", 200, json!({"page": 1}));
        mock.on_query(Method::GET, "/instances", &[("cursor", "abc")], 200, json!({"page": 2}));

        let first = mock
            .send(request(Method::GET, "/instances", &[("per_page", "100")]))
            .await
            .unwrap();
        let second = mock
            .send(request(Method::GET, "/instances", &[("per_page", "100"), ("cursor", "abc")]))
            .await
            .unwrap();

        assert_eq!(first.body, json!({"page": 1}).to_string());
        assert_eq!(second.body, json!({"page": 2}).to_string());
        assert_eq!(mock.count(Method::GET, "/instances"), 2);
    }

    #[tokio::test]
    async fn test_mock_queue_repeats_last_response() {
        let mock = MockTransport::new();
        mock.on(Method::POST, "/domains", 500, json!({"error": "boom"}))
            .on(Method::POST, "/domains", 201, json!({"domain": {}}));

        let statuses: Vec<u16> = send_repeatedly(&mock, 3).await;
        assert_eq!(statuses, vec![500, 201, 201]);
    }

    async fn send_repeatedly(mock: &MockTransport, n: usize) -> Vec<u16> {
        let mut statuses = Vec::new();
        for _ in 0..n {
            let response = mock
                .send(request(Method::POST, "/domains", &[]))
                .await
                .unwrap();
            statuses.push(response.status);
        }
        statuses
    }

    #[tokio::test]
    async fn test_unrouted_request_is_404() {
        let mock = MockTransport::new();
        let response = mock.send(request(Method::GET, "/nope", &[])).await.unwrap();
        assert_eq!(response.status, 404);
    }
}
