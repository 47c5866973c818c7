//! 모든 핸들러와 미들웨어가 공유하는 응답 봉투(envelope)입니다.
//!
//! 성공 응답과 에러 응답은 항상 같은 JSON 형태를 가집니다.
//!
//! ```json
//! {"success": true, "data": {...}, "meta": {"timestamp": "..."}}
//! {"success": false, "error": {"code": "...", "message": "..."}, "meta": {...}}
//! ```

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

/// 생성된 모든 핸들러가 반환하는 HTTP 응답 타입
pub type Response = hyper::Response<Full<Bytes>>;

/// 안정적인 기계 판독용 에러 코드
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
    pub const MISSING_BODY: &str = "MISSING_BODY";
    pub const MISSING_ID: &str = "MISSING_ID";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INVALID_JSON: &str = "INVALID_JSON";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
}

/// 에러 상세 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            field: None,
            suggestions: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }
}

/// 필드 단위 검증 위반 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// `<section>.<name>` 형식
    pub field: String,
    pub message: String,
    pub code: String,
    pub value: Value,
}

/// 목록 응답의 페이지 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// 페이지 번호와 크기, 전체 개수로부터 페이지 정보를 계산합니다.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: timestamp(),
            pagination: None,
            request_id: None,
        }
    }
}

/// 공통 응답 봉투
///
/// `success == false` 이면 항상 `error`가 존재합니다. 생성자를 통해서만
/// 만들도록 해서 이 불변식을 유지합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub meta: ResponseMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<FieldViolation>>,
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::default(),
            validation_errors: None,
        }
    }

    pub fn failure(error: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            meta: ResponseMeta::default(),
            validation_errors: None,
        }
    }

    /// 검증 실패 응답. 모든 위반 항목을 한 번에 담습니다.
    pub fn validation_failure(violations: Vec<FieldViolation>) -> Self {
        let mut envelope = Self::failure(ErrorBody::new(
            codes::VALIDATION_ERROR,
            "Request validation failed",
        ));
        envelope.validation_errors = Some(violations);
        envelope
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.meta.pagination = Some(pagination);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.meta.request_id = Some(request_id.into());
        self
    }

    /// 주어진 상태 코드로 HTTP 응답을 만듭니다.
    pub fn into_response(self, status: StatusCode) -> Response {
        let body = match serde_json::to_vec(&self) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "응답 직렬화 실패");
                return fallback_response();
            }
        };

        hyper::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|e| {
                error!(error = %e, "응답 생성 실패");
                fallback_response()
            })
    }
}

/// 성공 응답을 만듭니다.
pub fn success_response(status: StatusCode, data: Value) -> Response {
    ResponseEnvelope::success(data).into_response(status)
}

/// 코드와 메시지만 가진 에러 응답을 만듭니다.
pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    ResponseEnvelope::failure(ErrorBody::new(code, message)).into_response(status)
}

/// RFC 3339 형식의 현재 UTC 시각
pub fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn fallback_response() -> Response {
    let mut response = hyper::Response::new(Full::new(Bytes::from(
        r#"{"success":false,"error":{"code":"INTERNAL_ERROR","message":"Internal Server Error"}}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
