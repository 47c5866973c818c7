use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::auth::AuthMiddleware;
use super::cors::{CorsConfig, CorsMiddleware};
use super::logger::LoggerMiddleware;
use super::rate_limit::{RateLimitConfig, RateLimitMiddleware};
use super::request_id::RequestIdMiddleware;
use super::{Middleware, MiddlewareError};
use crate::config::{AuthConfig, ParsedApiConfig};

/// 이름으로 만들 수 있는 내장 미들웨어
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMiddleware {
    Cors,
    RateLimit,
    Auth,
    Logger,
    RequestId,
}

impl BuiltinMiddleware {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cors" => Some(Self::Cors),
            "rateLimit" | "rate-limit" | "rate_limit" => Some(Self::RateLimit),
            "auth" => Some(Self::Auth),
            "logger" | "logging" => Some(Self::Logger),
            "requestId" | "request-id" | "request_id" => Some(Self::RequestId),
            _ => None,
        }
    }
}

/// 미들웨어 이름을 인스턴스로 해석합니다.
///
/// 인스턴스는 이름마다 한 번만 만들어지므로 같은 이름을 쓰는 라우트는
/// rate limit 카운터 같은 상태를 공유합니다.
#[derive(Default)]
pub struct MiddlewareManager {
    definitions: HashMap<String, Value>,
    auth: Option<AuthConfig>,
    cors: Option<CorsConfig>,
    instances: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 파싱된 정의와 최상위 auth/cors 블록으로 관리자를 만듭니다.
    pub fn from_parsed(parsed: &ParsedApiConfig) -> Self {
        let definitions = parsed
            .middleware_definitions
            .iter()
            .map(|d| (d.name.clone(), d.config.clone().unwrap_or(Value::Null)))
            .collect();

        Self {
            definitions,
            auth: parsed.auth_config.clone(),
            cors: parsed.cors_config.clone(),
            instances: HashMap::new(),
        }
    }

    /// 사용자 정의 미들웨어를 등록합니다. 같은 이름의 내장 미들웨어보다 우선합니다.
    pub fn register(&mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) {
        self.instances.insert(name.into(), middleware);
    }

    /// 이름을 인스턴스로 해석합니다. 알 수 없는 이름이나 설정이 잘못된
    /// 미들웨어는 기록하고 `None`을 돌려줍니다.
    pub fn resolve(&mut self, name: &str) -> Option<Arc<dyn Middleware>> {
        if let Some(instance) = self.instances.get(name) {
            return Some(instance.clone());
        }

        let Some(kind) = BuiltinMiddleware::from_name(name) else {
            warn!(middleware = %name, "알 수 없는 미들웨어, 건너뜀");
            return None;
        };

        match self.create(kind, name) {
            Ok(instance) => {
                debug!(middleware = %name, kind = ?kind, "미들웨어 생성");
                self.instances.insert(name.to_string(), instance.clone());
                Some(instance)
            }
            Err(e) => {
                error!(middleware = %name, error = %e, "미들웨어 생성 실패");
                None
            }
        }
    }

    fn create(
        &self,
        kind: BuiltinMiddleware,
        name: &str,
    ) -> Result<Arc<dyn Middleware>, MiddlewareError> {
        let config = self.definitions.get(name).filter(|c| !c.is_null());
        let invalid = |e: serde_json::Error| {
            MiddlewareError::Config(format!("미들웨어 {} 설정 오류: {}", name, e))
        };

        Ok(match kind {
            BuiltinMiddleware::Cors => {
                let config = match config {
                    Some(value) => CorsConfig::from_value(value).map_err(invalid)?,
                    None => self.cors.clone().unwrap_or_default(),
                };
                Arc::new(CorsMiddleware::new(config))
            }
            BuiltinMiddleware::RateLimit => {
                let config = match config {
                    Some(value) => RateLimitConfig::from_value(value).map_err(invalid)?,
                    None => RateLimitConfig::default(),
                };
                Arc::new(RateLimitMiddleware::new(config))
            }
            BuiltinMiddleware::Auth => {
                let config: AuthConfig = match config {
                    Some(value) => serde_json::from_value(value.clone()).map_err(invalid)?,
                    None => self.auth.clone().unwrap_or_default(),
                };
                Arc::new(AuthMiddleware::new(config))
            }
            BuiltinMiddleware::Logger => Arc::new(LoggerMiddleware),
            BuiltinMiddleware::RequestId => Arc::new(RequestIdMiddleware),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MiddlewareDefinition;
    use serde_json::json;

    fn parsed_with(definitions: Vec<MiddlewareDefinition>) -> ParsedApiConfig {
        ParsedApiConfig {
            middleware_definitions: definitions,
            ..ParsedApiConfig::default()
        }
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(BuiltinMiddleware::from_name("rate-limit"), Some(BuiltinMiddleware::RateLimit));
        assert_eq!(BuiltinMiddleware::from_name("logging"), Some(BuiltinMiddleware::Logger));
        assert_eq!(BuiltinMiddleware::from_name("compress"), None);
    }

    #[test]
    fn test_instances_are_shared_by_name() {
        let mut manager = MiddlewareManager::from_parsed(&parsed_with(vec![MiddlewareDefinition {
            name: "rateLimit".to_string(),
            config: Some(json!({"maxRequests": 5})),
            order: None,
        }]));

        let first = manager.resolve("rateLimit").unwrap();
        let second = manager.resolve("rateLimit").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "rateLimit");
    }

    #[test]
    fn test_unknown_and_invalid_are_skipped() {
        let mut manager = MiddlewareManager::from_parsed(&parsed_with(vec![MiddlewareDefinition {
            name: "cors".to_string(),
            config: Some(json!({"origin": 42})),
            order: None,
        }]));

        assert!(manager.resolve("compress").is_none());
        assert!(manager.resolve("cors").is_none());
    }

    #[test]
    fn test_custom_registration_wins() {
        let mut manager = MiddlewareManager::new();
        manager.register("logger", Arc::new(RequestIdMiddleware));
        assert_eq!(manager.resolve("logger").unwrap().name(), "requestId");
    }
}
