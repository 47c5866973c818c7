//! 선언적 필드 규칙으로 요청을 검증하고 값을 강제 변환합니다.

mod engine;
mod middleware;
mod schema;

pub use engine::{coerce, validate_request, CompiledSchema, ValidationMode};
pub use middleware::{ValidationMiddleware, ValidationOptions};
pub use schema::{FieldRules, FieldType, FieldValidation, Section, ValidationSchema};

/// 필드 위반 코드
pub mod codes {
    pub const REQUIRED_FIELD_MISSING: &str = "REQUIRED_FIELD_MISSING";
    pub const INVALID_TYPE: &str = "INVALID_TYPE";
    pub const MIN_LENGTH: &str = "MIN_LENGTH";
    pub const MAX_LENGTH: &str = "MAX_LENGTH";
    pub const PATTERN_MISMATCH: &str = "PATTERN_MISMATCH";
    pub const INVALID_PATTERN: &str = "INVALID_PATTERN";
    pub const MIN_VALUE: &str = "MIN_VALUE";
    pub const MAX_VALUE: &str = "MAX_VALUE";
    pub const MIN_ITEMS: &str = "MIN_ITEMS";
    pub const MAX_ITEMS: &str = "MAX_ITEMS";
    pub const ENUM_VIOLATION: &str = "ENUM_VIOLATION";
    pub const UNKNOWN_FIELD: &str = "UNKNOWN_FIELD";
}
