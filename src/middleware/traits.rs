use std::sync::Arc;

use async_trait::async_trait;

use crate::handlers::RouteHandler;
use crate::middleware::MiddlewareError;
use crate::request::ApiRequest;
use crate::response::Response;

/// 미들웨어 트레이트
///
/// 요청을 받아 직접 응답하거나 `next`로 다음 단계에 위임합니다.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 미들웨어의 고유 이름을 반환합니다.
    fn name(&self) -> &str;

    /// 요청을 처리합니다.
    async fn handle(&self, req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError>;
}

/// 체인의 나머지 부분
///
/// 남은 미들웨어를 앞에서부터 하나씩 꺼내 실행하고, 모두 소진되면
/// 최종 핸들러를 호출합니다.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn RouteHandler,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], endpoint: &'a dyn RouteHandler) -> Self {
        Self {
            middlewares,
            endpoint,
        }
    }

    pub async fn run(self, req: ApiRequest) -> Result<Response, MiddlewareError> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middlewares: rest,
                    endpoint: self.endpoint,
                };
                current.handle(req, next).await
            }
            None => Ok(self.endpoint.call(req).await?),
        }
    }
}
