use async_trait::async_trait;

use super::{Middleware, MiddlewareError, Next};
use crate::logging::{log_request, RequestLog};
use crate::request::ApiRequest;
use crate::response::Response;

/// 요청마다 한 줄의 처리 결과를 남기는 미들웨어
#[derive(Debug, Default)]
pub struct LoggerMiddleware;

impl LoggerMiddleware {
    pub const NAME: &'static str = "logger";
}

#[async_trait]
impl Middleware for LoggerMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError> {
        let mut log = RequestLog::new(req.request_id.clone());
        log.with_request(&req.method, &req.path, req.host());

        let result = next.run(req).await;
        match &result {
            Ok(response) => log.with_response(response.status()),
            Err(e) => {
                log.with_response(hyper::StatusCode::INTERNAL_SERVER_ERROR);
                log.with_error(e);
            }
        }
        log_request(&log);
        result
    }
}
