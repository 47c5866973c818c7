use async_trait::async_trait;
use hyper::{header, StatusCode};
use tracing::debug;

use super::{Middleware, MiddlewareError, Next};
use crate::config::AuthConfig;
use crate::request::ApiRequest;
use crate::response::{codes, ErrorBody, ResponseEnvelope, Response};

/// 인증 정보 존재 여부만 확인하는 미들웨어
///
/// 토큰 자체는 검증하지 않습니다. `roles`는 기록만 하고 강제하지 않습니다.
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    config: AuthConfig,
}

impl AuthMiddleware {
    pub const NAME: &'static str = "auth";

    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError> {
        let credential = req
            .header(header::AUTHORIZATION.as_str())
            .filter(|v| !v.trim().is_empty());

        if self.config.required && credential.is_none() {
            debug!(request_id = %req.request_id, path = %req.path, "인증 정보 없음");
            return Ok(ResponseEnvelope::failure(
                ErrorBody::new(codes::UNAUTHORIZED, "Authentication required")
                    .with_field(header::AUTHORIZATION.as_str()),
            )
            .with_request_id(req.request_id)
            .into_response(StatusCode::UNAUTHORIZED));
        }

        if let Some(roles) = self.config.roles.as_ref().filter(|r| !r.is_empty()) {
            debug!(request_id = %req.request_id, roles = ?roles, "역할 제한은 기록만 하고 적용하지 않음");
        }

        next.run(req).await
    }
}
