use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;
use tracing::error;

use super::response::handle_middleware_error;
use super::{Middleware, MiddlewareError, Next};
use crate::handlers::panic_message;
use crate::request::ApiRequest;
use crate::response::Response;

/// 가장 바깥쪽 미들웨어. 안쪽에서 올라온 에러와 패닉을 500
/// `INTERNAL_ERROR` 응답으로 바꿉니다.
#[derive(Debug, Default)]
pub struct ErrorBoundary;

impl ErrorBoundary {
    pub const NAME: &'static str = "errorBoundary";
}

#[async_trait]
impl Middleware for ErrorBoundary {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError> {
        let request_id = req.request_id.clone();
        let path = req.path.clone();

        let err = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(e)) => e,
            Err(panic) => MiddlewareError::Processing(
                panic_message(panic.as_ref()).unwrap_or_else(|| "unknown panic".to_string()),
            ),
        };

        error!(request_id = %request_id, path = %path, error = %err, "요청 처리 중 에러 발생");
        Ok(handle_middleware_error(&err))
    }
}
