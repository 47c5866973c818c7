use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, StatusCode};
use tracing::debug;

use super::config::CorsConfig;
use crate::middleware::{Middleware, MiddlewareError, Next};
use crate::request::ApiRequest;
use crate::response::Response;

/// CORS 미들웨어
///
/// 모든 응답에 CORS 헤더를 붙이고, OPTIONS 요청은 안쪽 체인을 호출하지
/// 않고 204로 바로 응답합니다.
#[derive(Debug)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    pub const NAME: &'static str = "cors";

    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// CORS 헤더 설정
    pub fn set_cors_headers(&self, headers: &mut HeaderMap, request_origin: Option<&str>) {
        if let Some(origin) = self.config.origin.resolve(request_origin) {
            insert(headers, header::ACCESS_CONTROL_ALLOW_ORIGIN, &origin);
        }
        if self.config.origin.varies() {
            insert(headers, header::VARY, "Origin");
        }

        insert(
            headers,
            header::ACCESS_CONTROL_ALLOW_METHODS,
            &self.config.methods.join(", "),
        );

        if !self.config.allowed_headers.is_empty() {
            insert(
                headers,
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                &self.config.allowed_headers.join(", "),
            );
        }

        if self.config.credentials {
            insert(headers, header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }

        if !self.config.exposed_headers.is_empty() {
            insert(
                headers,
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                &self.config.exposed_headers.join(", "),
            );
        }
    }

    /// Preflight 요청 처리
    fn preflight(&self, req: &ApiRequest) -> Response {
        let mut response = hyper::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::NO_CONTENT;

        let headers = response.headers_mut();
        self.set_cors_headers(headers, req.origin());
        if let Some(max_age) = self.config.max_age {
            insert(headers, header::ACCESS_CONTROL_MAX_AGE, &max_age.to_string());
        }
        response
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError> {
        if req.method == Method::OPTIONS {
            debug!(request_id = %req.request_id, path = %req.path, "CORS preflight 요청 처리");
            return Ok(self.preflight(&req));
        }

        let origin = req.origin().map(String::from);
        let mut response = next.run(req).await?;
        self.set_cors_headers(response.headers_mut(), origin.as_deref());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{FnHandler, HandlerError};
    use crate::middleware::cors::CorsOrigin;
    use crate::response::success_response;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn run(config: CorsConfig, req: ApiRequest, calls: Arc<AtomicUsize>) -> Response {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(CorsMiddleware::new(config))];
        let endpoint = FnHandler::new(move |_req: ApiRequest| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, HandlerError>(success_response(StatusCode::OK, json!({})))
            }
        });
        Next::new(&chain, &endpoint).run(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CorsConfig {
            origin: CorsOrigin::Reflect(true),
            max_age: Some(600),
            ..CorsConfig::default()
        };
        let req = ApiRequest::new(Method::OPTIONS, "/users").with_header("Origin", "https://app.io");

        let response = run(config, req, calls.clone()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.io");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "600");
        assert!(headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("PATCH"));
    }

    #[tokio::test]
    async fn test_headers_on_pass_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CorsConfig {
            origin: CorsOrigin::List(vec!["https://app.io".to_string()]),
            credentials: true,
            ..CorsConfig::default()
        };

        let allowed = ApiRequest::new(Method::GET, "/users").with_header("Origin", "https://app.io");
        let response = run(config.clone(), allowed, calls.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.io");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let other = ApiRequest::new(Method::GET, "/users").with_header("Origin", "https://evil.io");
        let response = run(config, other, calls.clone()).await;
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
