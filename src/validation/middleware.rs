use async_trait::async_trait;
use hyper::StatusCode;
use tracing::debug;

use super::engine::{validate_request, CompiledSchema, ValidationMode};
use super::schema::ValidationSchema;
use crate::middleware::{Middleware, MiddlewareError, Next};
use crate::request::ApiRequest;
use crate::response::{ResponseEnvelope, Response};

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub schema: ValidationSchema,
    pub strict: bool,
    pub allow_unknown: bool,
}

impl ValidationOptions {
    pub fn new(schema: ValidationSchema) -> Self {
        Self {
            schema,
            strict: false,
            allow_unknown: true,
        }
    }
}

/// 요청 검증 미들웨어
///
/// 위반이 하나라도 있으면 400 `VALIDATION_ERROR`로 응답하고, 통과하면
/// 강제 변환된 값을 `req.validated`에 담아 다음 단계로 넘깁니다.
pub struct ValidationMiddleware {
    schema: CompiledSchema,
    mode: ValidationMode,
}

impl ValidationMiddleware {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            schema: CompiledSchema::compile(&options.schema),
            mode: ValidationMode {
                strict: options.strict,
                allow_unknown: options.allow_unknown,
            },
        }
    }
}

#[async_trait]
impl Middleware for ValidationMiddleware {
    fn name(&self) -> &str {
        "validation"
    }

    async fn handle(&self, mut req: ApiRequest, next: Next<'_>) -> Result<Response, MiddlewareError> {
        match validate_request(&self.schema, &req, self.mode) {
            Ok(validated) => {
                req.validated = validated;
                next.run(req).await
            }
            Err(violations) => {
                debug!(
                    request_id = %req.request_id,
                    path = %req.path,
                    violations = violations.len(),
                    "요청 검증 실패"
                );
                Ok(ResponseEnvelope::validation_failure(violations)
                    .with_request_id(req.request_id)
                    .into_response(StatusCode::BAD_REQUEST))
            }
        }
    }
}
