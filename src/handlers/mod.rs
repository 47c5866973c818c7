//! 미들웨어 체인의 끝에서 실제 응답을 만드는 최종 핸들러들입니다.

mod crud;
mod guard;
mod placeholder;
mod registry;

use async_trait::async_trait;

use crate::request::ApiRequest;
use crate::response::Response;

pub use crud::{CrudDispatcher, LIST_TOTAL, MAX_LIMIT};
pub use guard::{panic_message, CatchingHandler};
pub use placeholder::PlaceholderHandler;
pub use registry::HandlerRegistry;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("핸들러 {handler} 실패: {message}")]
    Failed { handler: String, message: String },

    #[error("응답 생성 실패: {0}")]
    Response(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// 최종 요청 핸들러
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn call(&self, req: ApiRequest) -> Result<Response, HandlerError>;
}

/// 비동기 클로저를 핸들러로 사용합니다.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(ApiRequest) -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<Response, HandlerError>> + Send,
    {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> RouteHandler for FnHandler<F>
where
    F: Fn(ApiRequest) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Response, HandlerError>> + Send,
{
    async fn call(&self, req: ApiRequest) -> Result<Response, HandlerError> {
        (self.f)(req).await
    }
}
