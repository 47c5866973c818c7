use std::sync::Arc;

use tracing::error;

use super::response::handle_middleware_error;
use super::{Middleware, MiddlewareError, Next};
use crate::handlers::RouteHandler;
use crate::request::ApiRequest;
use crate::response::Response;

/// 순서가 고정된 미들웨어 목록과 최종 핸들러
///
/// 먼저 추가된 미들웨어가 요청 시점에 먼저 실행됩니다.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    endpoint: Arc<dyn RouteHandler>,
}

impl MiddlewareChain {
    pub fn new(endpoint: Arc<dyn RouteHandler>) -> Self {
        Self {
            middlewares: Vec::new(),
            endpoint,
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// 여러 라우트가 상태를 공유하는 미들웨어를 추가합니다.
    pub fn add_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.middlewares.iter().any(|m| m.name() == name)
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub async fn execute(&self, req: ApiRequest) -> Result<Response, MiddlewareError> {
        Next::new(&self.middlewares, self.endpoint.as_ref()).run(req).await
    }

    /// 체인을 실행하고 남은 에러를 응답 봉투로 바꿉니다.
    pub async fn handle(&self, req: ApiRequest) -> Response {
        let request_id = req.request_id.clone();
        match self.execute(req).await {
            Ok(response) => response,
            Err(e) => {
                error!(request_id = %request_id, error = %e, "미들웨어 체인 실행 실패");
                handle_middleware_error(&e)
            }
        }
    }
}
