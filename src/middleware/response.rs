use hyper::StatusCode;
use serde_json::json;

use super::MiddlewareError;
use crate::response::{codes, ErrorBody, ResponseEnvelope, Response};

/// 미들웨어 에러를 응답 봉투로 변환합니다.
///
/// 설정 오류는 내부 오류로 취급되며, 원인은 `details.reason`에 담깁니다.
pub fn handle_middleware_error(err: &MiddlewareError) -> Response {
    let body = ErrorBody::new(codes::INTERNAL_ERROR, "Internal server error")
        .with_details(json!({ "reason": err.to_string() }));

    ResponseEnvelope::failure(body).into_response(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_becomes_internal_error_envelope() {
        let err = MiddlewareError::Processing("boom".to_string());
        let response = handle_middleware_error(&err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(body["error"]["details"]["reason"].as_str().unwrap().contains("boom"));
    }
}
