/// API 정의 JSON 스키마 (Draft 7)
///
/// 최상위 구조와 미들웨어 정의만 검사합니다. 엔드포인트 항목의 세부
/// 규칙은 `validate_api_endpoint`가 제안과 함께 보고합니다.
pub const API_CONFIG_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "type": "object",
    "required": ["endpoints"],
    "properties": {
        "endpoints": {
            "type": "array",
            "items": {"type": "object"}
        },
        "middleware": {
            "type": "array",
            "items": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "config": {},
                    "order": {"type": "number"}
                }
            }
        },
        "auth": {
            "type": "object",
            "properties": {
                "required": {"type": "boolean"},
                "roles": {
                    "type": "array",
                    "items": {"type": "string"}
                }
            }
        },
        "cors": {
            "type": "object",
            "properties": {
                "origin": {
                    "anyOf": [
                        {"type": "boolean"},
                        {"type": "string"},
                        {"type": "array", "items": {"type": "string"}}
                    ]
                },
                "methods": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "allowedHeaders": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "exposedHeaders": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "credentials": {"type": "boolean"},
                "maxAge": {"type": "integer", "minimum": 0}
            }
        }
    }
}"#;

/// 알려진 최상위 키. 그 밖의 키는 경고로 보고합니다.
pub const KNOWN_TOP_LEVEL_KEYS: [&str; 4] = ["endpoints", "middleware", "auth", "cors"];
