use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::logging::{log_request, RequestLog};
use crate::request::{ApiRequest, RequestError};
use crate::response::{codes, error_response, Response};
use crate::routing::{RouteMatch, RouteTable};

pub struct RequestHandler {
    routing_table: Arc<RwLock<RouteTable>>,
    max_body_bytes: usize,
}

impl RequestHandler {
    pub fn new(routing_table: Arc<RwLock<RouteTable>>, max_body_bytes: usize) -> Self {
        Self {
            routing_table,
            max_body_bytes,
        }
    }

    pub async fn handle_request<B>(
        &self,
        req: Request<B>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Response, Infallible>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let mut log = RequestLog::new(request_id_of(&parts.headers));
        log.with_request(
            &parts.method,
            parts.uri.path(),
            parts.headers.get(hyper::header::HOST).and_then(|v| v.to_str().ok()),
        );

        let api_request = match collect_body(body, self.max_body_bytes).await {
            Ok(bytes) => ApiRequest::from_parts(parts, bytes),
            Err(e) => Err(e),
        };

        let response = match api_request {
            Ok(mut api_request) => {
                api_request.remote_addr = remote_addr;
                api_request.request_id = log.request_id.clone();
                self.dispatch(api_request, &mut log).await
            }
            Err(e) => {
                log.with_error(&e);
                request_error_response(&e)
            }
        };

        log.with_response(response.status());
        log_request(&log);
        Ok(response)
    }

    async fn dispatch(&self, req: ApiRequest, log: &mut RequestLog) -> Response {
        let table = self.routing_table.read().await;
        if let RouteMatch::Found { route, .. } = table.find(&req.method, &req.path) {
            log.with_route(route.normalized_path.clone());
        }
        table.dispatch(req).await
    }

    pub async fn handle_connection<I>(
        self: Arc<Self>,
        io: I,
        remote_addr: SocketAddr,
    ) -> std::result::Result<(), hyper::Error>
    where
        I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
    {
        http1::Builder::new()
            .serve_connection(
                io,
                service_fn(move |req: Request<Incoming>| {
                    let handler = self.clone();
                    async move { handler.handle_request(req, Some(remote_addr)).await }
                }),
            )
            .await
    }
}

fn request_id_of(headers: &hyper::HeaderMap) -> String {
    headers
        .get(crate::request::X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, RequestError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            debug!(limit, "요청 본문 크기 초과");
            Err(RequestError::PayloadTooLarge { limit })
        }
        Err(e) => {
            error!(error = %e, "요청 본문 읽기 실패");
            Err(RequestError::Body(e.to_string()))
        }
    }
}

/// 체인에 들어가기 전의 요청 오류를 응답 봉투로 바꿉니다.
pub fn request_error_response(error: &RequestError) -> Response {
    match error {
        RequestError::InvalidJson(e) => error_response(
            StatusCode::BAD_REQUEST,
            codes::INVALID_JSON,
            format!("Invalid JSON body: {}", e),
        ),
        RequestError::PayloadTooLarge { limit } => error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            format!("Request body exceeds {} bytes", limit),
        ),
        RequestError::Body(_) => error_response(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            "Failed to read request body",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ApiCompiler;
    use crate::config::ParseOptions;
    use http_body_util::Full;
    use serde_json::{json, Value};

    async fn handler(max_body_bytes: usize) -> RequestHandler {
        let raw = json!({
            "endpoints": [{"path": "/users", "methods": ["GET", "POST"], "handler": "users"}]
        });
        let table = ApiCompiler::new(ParseOptions::default()).build_table(&raw).unwrap();
        RequestHandler::new(Arc::new(RwLock::new(table)), max_body_bytes)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_through_handler() {
        let handler = handler(1024).await;
        let response = handler.handle_request(post(r#"{"name":"kim"}"#), None).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["name"], "kim");
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let handler = handler(1024).await;
        let response = handler.handle_request(post("{not json"), None).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let handler = handler(8).await;
        let response = handler
            .handle_request(post(r#"{"name":"a long enough name"}"#), None)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_request_id_is_kept() {
        let handler = handler(1024).await;
        let req = Request::builder()
            .uri("/missing")
            .header("x-request-id", "req-42")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = handler.handle_request(req, None).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
