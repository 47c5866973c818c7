use std::fmt;

/// 라우트 등록 관련 에러를 표현하는 열거형입니다.
#[derive(Debug, PartialEq)]
pub enum RoutingError {
    /// 잘못된 경로 패턴
    InvalidPathPattern {
        pattern: String,
        reason: String,
    },
    /// 같은 경로와 메서드로 이미 등록된 라우트
    DuplicateRoute {
        path: String,
        method: String,
    },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::InvalidPathPattern { pattern, reason } =>
                write!(f, "잘못된 경로 패턴: {} ({})", pattern, reason),
            RoutingError::DuplicateRoute { path, method } =>
                write!(f, "중복된 라우트: {} {}", method, path),
        }
    }
}

impl std::error::Error for RoutingError {}
