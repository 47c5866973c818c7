use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use hyper::StatusCode;
use tracing::{debug, warn};

use super::config::{KeyBy, RateLimitConfig};
use super::store::{FixedWindow, MemoryStore, RateLimitStore, WindowDecision};
use crate::middleware::{Middleware, MiddlewareError, Next};
use crate::request::ApiRequest;
use crate::response::{codes, error_response, Response};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// 요청에서 rate limit 키를 뽑는 함수
pub type KeyExtractor = Arc<dyn Fn(&ApiRequest) -> String + Send + Sync>;

/// Rate Limit 미들웨어
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    window: FixedWindow,
    store: Arc<dyn RateLimitStore>,
    key_fn: KeyExtractor,
}

impl RateLimitMiddleware {
    pub const NAME: &'static str = "rateLimit";

    /// 메모리 저장소를 사용하는 미들웨어를 만듭니다.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        let key_fn = key_extractor(&config.key_by);
        Self {
            window: FixedWindow::new(config.window_ms, config.max_requests),
            config,
            store,
            key_fn,
        }
    }

    /// 키 추출 방식을 직접 지정합니다.
    pub fn with_key_fn(mut self, key_fn: KeyExtractor) -> Self {
        self.key_fn = key_fn;
        self
    }

    fn stamp(&self, headers: &mut HeaderMap, remaining: u64, reset_at: u64) {
        insert(headers, X_RATELIMIT_LIMIT, self.config.max_requests);
        insert(headers, X_RATELIMIT_REMAINING, remaining);
        insert(headers, X_RATELIMIT_RESET, reset_at.div_ceil(1000));
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: u64) {
    headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
}

/// 현재 시각 (epoch 밀리초)
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub fn key_extractor(key_by: &KeyBy) -> KeyExtractor {
    match key_by {
        KeyBy::Host => Arc::new(|req: &ApiRequest| req.host().unwrap_or("unknown").to_string()),
        KeyBy::Ip => Arc::new(client_ip),
        KeyBy::Header(name) => {
            let name = name.clone();
            Arc::new(move |req: &ApiRequest| req.header(&name).unwrap_or("unknown").to_string())
        }
    }
}

/// 클라이언트 IP를 추출합니다.
fn client_ip(req: &ApiRequest) -> String {
    // X-Forwarded-For 헤더 확인
    if let Some(ip) = req
        .header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    // X-Real-IP 헤더 확인
    if let Some(real_ip) = req.header("x-real-ip") {
        return real_ip.to_string();
    }

    req.remote_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle(&self, req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError> {
        let key = (self.key_fn)(&req);
        let now = now_millis();

        match self.store.hit(&key, &self.window, now).await {
            WindowDecision::Allowed { remaining, reset_at } => {
                debug!(key = %key, remaining, "rate limit 통과");
                let mut response = next.run(req).await?;
                self.stamp(response.headers_mut(), remaining, reset_at);
                Ok(response)
            }
            WindowDecision::Limited { reset_at } => {
                warn!(
                    request_id = %req.request_id,
                    key = %key,
                    limit = self.config.max_requests,
                    "rate limit 초과"
                );
                let mut response = error_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    codes::RATE_LIMIT_EXCEEDED,
                    "Too many requests, please try again later",
                );
                let headers = response.headers_mut();
                self.stamp(headers, 0, reset_at);
                headers.insert(
                    RETRY_AFTER,
                    HeaderValue::from(reset_at.saturating_sub(now).div_ceil(1000)),
                );
                Ok(response)
            }
        }
    }
}
