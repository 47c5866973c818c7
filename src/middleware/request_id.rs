use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue};

use super::{Middleware, MiddlewareError, Next};
use crate::request::{ApiRequest, X_REQUEST_ID};
use crate::response::Response;

/// 요청 ID를 응답 헤더로 돌려주는 미들웨어
#[derive(Debug, Default)]
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
    pub const NAME: &'static str = "requestId";
}

#[async_trait]
impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError> {
        let request_id = req.request_id.clone();
        let mut response = next.run(req).await?;
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(X_REQUEST_ID), value);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{FnHandler, HandlerError};
    use crate::response::success_response;
    use hyper::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_echoes_request_id() {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(RequestIdMiddleware)];
        let endpoint = FnHandler::new(|_req: ApiRequest| async {
            Ok::<_, HandlerError>(success_response(StatusCode::OK, json!({})))
        });

        let mut req = ApiRequest::new(Method::GET, "/");
        req.request_id = "abc-123".to_string();
        let response = Next::new(&chain, &endpoint).run(req).await.unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
    }
}
