use async_trait::async_trait;
use hyper::StatusCode;
use serde_json::json;

use super::{HandlerError, RouteHandler};
use crate::request::ApiRequest;
use crate::response::{success_response, Response};

/// 구현이 등록되지 않은 사용자 정의 엔드포인트가 사용하는 핸들러
///
/// 엔드포인트 경로와 메서드, 핸들러 이름을 그대로 돌려줍니다.
pub struct PlaceholderHandler {
    endpoint: String,
    handler: String,
}

impl PlaceholderHandler {
    pub fn new(endpoint: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            handler: handler.into(),
        }
    }
}

#[async_trait]
impl RouteHandler for PlaceholderHandler {
    async fn call(&self, req: ApiRequest) -> Result<Response, HandlerError> {
        Ok(success_response(
            StatusCode::OK,
            json!({
                "endpoint": self.endpoint,
                "method": req.method.as_str(),
                "handler": self.handler,
            }),
        ))
    }
}
