//! Rate Limiting 미들웨어
//!
//! 키별 고정 윈도 카운터로 요청 수를 제한합니다. 상태는 프로세스
//! 안에만 있으며 인스턴스 간에 공유되지 않습니다.

mod config;
mod middleware;
pub mod store;

pub use config::{KeyBy, RateLimitConfig};
pub use middleware::{
    key_extractor, KeyExtractor, RateLimitMiddleware, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING,
    X_RATELIMIT_RESET,
};
pub use store::{FixedWindow, MemoryStore, RateLimitState, RateLimitStore, WindowDecision};
