use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use hyper::StatusCode;
use tracing::error;

use super::{HandlerError, RouteHandler};
use crate::request::ApiRequest;
use crate::response::{codes, error_response, Response};

/// 핸들러의 에러와 패닉을 500 응답으로 바꾸는 래퍼
///
/// 이 경계 밖으로는 어떤 실패도 전파되지 않습니다.
pub struct CatchingHandler {
    name: String,
    inner: Arc<dyn RouteHandler>,
}

impl CatchingHandler {
    pub fn new(name: impl Into<String>, inner: Arc<dyn RouteHandler>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl RouteHandler for CatchingHandler {
    async fn call(&self, req: ApiRequest) -> Result<Response, HandlerError> {
        let request_id = req.request_id.clone();
        let path = req.path.clone();

        match AssertUnwindSafe(self.inner.call(req)).catch_unwind().await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                error!(
                    request_id = %request_id,
                    handler = %self.name,
                    path = %path,
                    error = %e,
                    "핸들러 실행 실패"
                );
                Ok(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::INTERNAL_ERROR,
                    e.to_string(),
                ))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    request_id = %request_id,
                    handler = %self.name,
                    path = %path,
                    panic = ?message,
                    "핸들러 패닉"
                );
                Ok(match message {
                    Some(message) => error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        codes::INTERNAL_ERROR,
                        message,
                    ),
                    None => error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        codes::UNKNOWN_ERROR,
                        "An unknown error occurred",
                    ),
                })
            }
        }
    }
}

/// 패닉 페이로드가 문자열이면 메시지를 꺼냅니다.
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<String>() {
        Some(s.clone())
    } else {
        payload.downcast_ref::<&str>().map(|s| s.to_string())
    }
}
