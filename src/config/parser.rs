//! API 정의 JSON을 엔드포인트 디스크립터 목록으로 정규화합니다.

use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::types::{
    ConfigIssue, EndpointDescriptor, MiddlewareDefinition, ParseOptions, ParsedApiConfig,
};
use super::validator::{ConfigSchemaValidator, JsonSchemaValidator};
use crate::routing::HttpMethod;
use crate::validation::ValidationSchema;

/// 내장 스키마 검증기로 API 정의를 파싱합니다.
pub fn parse_api_config(raw: &Value, options: &ParseOptions) -> ParsedApiConfig {
    match JsonSchemaValidator::new() {
        Ok(validator) => parse_api_config_with(raw, options, &validator),
        Err(e) => ParsedApiConfig {
            errors: vec![ConfigIssue::new(e.to_string())],
            ..ParsedApiConfig::default()
        },
    }
}

/// 주어진 검증기로 API 정의를 파싱합니다.
///
/// strict 모드에서 구조 검증이 실패하면 엔드포인트를 하나도 등록하지
/// 않습니다. strict가 아니면 위반 사항을 경고로 낮추고 읽을 수 있는
/// 엔드포인트만 사용합니다.
pub fn parse_api_config_with(
    raw: &Value,
    options: &ParseOptions,
    validator: &dyn ConfigSchemaValidator,
) -> ParsedApiConfig {
    let result = validator.validate(raw);
    let mut parsed = ParsedApiConfig {
        warnings: result.warnings,
        ..ParsedApiConfig::default()
    };

    if !result.valid {
        if options.strict {
            parsed.errors = result.errors;
            return parsed;
        }
        parsed.warnings.extend(result.errors);
    }

    let mut issues = Vec::new();

    let definitions = read_definitions(raw, &mut issues);
    parsed.global_middleware = order_middleware(&definitions, &options.default_middleware);
    parsed.middleware_definitions = definitions;

    parsed.auth_config = read_block(raw, "auth", &mut issues);
    parsed.cors_config = read_block(raw, "cors", &mut issues);

    if let Some(endpoints) = raw.get("endpoints").and_then(Value::as_array) {
        for (i, endpoint) in endpoints.iter().enumerate() {
            match read_endpoint(endpoint, &options.base_path) {
                Ok(descriptor) => {
                    debug!(path = %descriptor.path, methods = ?descriptor.methods, "엔드포인트 파싱");
                    parsed.endpoints.push(descriptor);
                }
                Err(reason) => issues.push(
                    ConfigIssue::new(format!("Skipping endpoint: {}", reason))
                        .at(format!("endpoints[{}]", i)),
                ),
            }
        }
    }

    if options.strict {
        parsed.errors.extend(issues);
    } else {
        parsed.warnings.extend(issues);
    }

    if !parsed.errors.is_empty() {
        parsed.endpoints.clear();
    }
    parsed
}

fn read_definitions(raw: &Value, issues: &mut Vec<ConfigIssue>) -> Vec<MiddlewareDefinition> {
    let Some(items) = raw.get("middleware").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            serde_json::from_value::<MiddlewareDefinition>(item.clone())
                .map_err(|e| {
                    issues.push(
                        ConfigIssue::new(format!("Invalid middleware definition: {}", e))
                            .at(format!("middleware[{}]", i)),
                    )
                })
                .ok()
        })
        .collect()
}

fn read_block<T: DeserializeOwned>(
    raw: &Value,
    key: &str,
    issues: &mut Vec<ConfigIssue>,
) -> Option<T> {
    let value = raw.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(block) => Some(block),
        Err(e) => {
            issues.push(ConfigIssue::new(format!("Invalid {} block: {}", key, e)).at(key));
            None
        }
    }
}

fn read_endpoint(endpoint: &Value, base_path: &str) -> Result<EndpointDescriptor, String> {
    let object = endpoint.as_object().ok_or("not an object")?;

    let original_path = object
        .get("path")
        .and_then(Value::as_str)
        .filter(|p| p.starts_with('/'))
        .ok_or("path must be a string starting with '/'")?;

    let mut methods: Vec<HttpMethod> = Vec::new();
    for method in object
        .get("methods")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|m| m.as_str()?.parse::<HttpMethod>().ok())
    {
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err("no recognized HTTP methods".to_string());
    }

    let handler = object
        .get("handler")
        .and_then(Value::as_str)
        .filter(|h| !h.trim().is_empty())
        .ok_or("handler is required")?;

    let middleware = object
        .get("middleware")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let validation = match object.get("validation") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<ValidationSchema>(value.clone())
                .map_err(|e| format!("invalid validation schema: {}", e))?,
        ),
    };

    let auth = match object.get("auth") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value(value.clone())
                .map_err(|e| format!("invalid auth block: {}", e))?,
        ),
    };

    Ok(EndpointDescriptor {
        path: prefix_path(base_path, original_path),
        original_path: original_path.to_string(),
        methods,
        handler: handler.to_string(),
        validation,
        middleware,
        auth,
    })
}

/// basePath를 붙입니다. 이미 basePath로 시작하는 경로는 그대로 둡니다.
///
/// 비교는 세그먼트 단위이므로 `/api`는 `/apiv2`의 접두사가 아닙니다.
pub fn prefix_path(base_path: &str, path: &str) -> String {
    let path = collapse_slashes(path);
    let base = collapse_slashes(base_path.trim());
    let base = base.trim_end_matches('/');

    if base.is_empty() {
        return path;
    }

    let base = if base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{}", base)
    };

    let already_prefixed = path == base
        || path
            .strip_prefix(base.as_str())
            .is_some_and(|rest| rest.starts_with('/'));

    if already_prefixed {
        path
    } else {
        collapse_slashes(&format!("{}/{}", base, path))
    }
}

/// 연속된 슬래시를 하나로 줄입니다.
pub fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }
    out
}

/// 전역 미들웨어 순서를 결정합니다.
///
/// 정의는 `order` 오름차순으로 안정 정렬되며 `order`가 없는 항목은
/// 입력 순서를 유지한 채 맨 뒤에 옵니다. 결과는 기본 미들웨어 뒤에
/// 붙고, 이름이 중복되면 처음 나온 것만 남습니다.
pub fn order_middleware(definitions: &[MiddlewareDefinition], defaults: &[String]) -> Vec<String> {
    let mut sorted: Vec<&MiddlewareDefinition> = definitions.iter().collect();
    sorted.sort_by(|a, b| match (a.order, b.order) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut names: Vec<String> = Vec::new();
    for name in defaults.iter().chain(sorted.iter().map(|d| &d.name)) {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaValidationResult;
    use serde_json::json;

    fn definition(name: &str, order: Option<f64>) -> MiddlewareDefinition {
        MiddlewareDefinition {
            name: name.to_string(),
            config: None,
            order,
        }
    }

    #[test]
    fn test_prefix_path() {
        let test_cases = vec![
            ("", "/users", "/users"),
            ("/api", "/users", "/api/users"),
            ("/api/", "/users", "/api/users"),
            ("api", "/users", "/api/users"),
            ("/api", "/api/users", "/api/users"),
            ("/api", "/api", "/api"),
            ("/api", "/apiv2/users", "/api/apiv2/users"),
            ("/api", "//users///list", "/api/users/list"),
            ("/", "/users", "/users"),
        ];

        for (base, path, expected) in test_cases {
            let once = prefix_path(base, path);
            assert_eq!(once, expected, "base '{}' path '{}'", base, path);
            assert_eq!(prefix_path(base, &once), once, "두 번 적용해도 같아야 함");
        }
    }

    #[test]
    fn test_order_middleware() {
        let definitions = vec![
            definition("logger", None),
            definition("cors", Some(2.0)),
            definition("rateLimit", Some(1.0)),
            definition("requestId", None),
            definition("auth", Some(2.0)),
        ];
        let defaults = vec!["requestId".to_string(), "custom".to_string()];

        assert_eq!(
            order_middleware(&definitions, &defaults),
            vec!["requestId", "custom", "rateLimit", "cors", "auth", "logger"]
        );
    }

    #[test]
    fn test_parse_normalizes_endpoints() {
        let raw = json!({
            "endpoints": [
                {"path": "/users", "methods": ["GET", "POST", "GET"], "handler": "users"},
                {
                    "path": "/users/:id",
                    "methods": ["DELETE"],
                    "handler": "users",
                    "middleware": ["rateLimit"],
                    "auth": {"roles": ["admin"]},
                    "validation": {"params": {"id": {"type": "string", "required": true}}}
                }
            ],
            "middleware": [{"name": "logger", "order": 1}],
            "cors": {"origin": "*"},
            "auth": {"required": false}
        });

        let parsed = parse_api_config(&raw, &ParseOptions::default().with_base_path("/api"));
        assert!(parsed.is_valid(), "{:?}", parsed.errors);
        assert_eq!(parsed.endpoints.len(), 2);

        let users = &parsed.endpoints[0];
        assert_eq!(users.path, "/api/users");
        assert_eq!(users.original_path, "/users");
        assert_eq!(users.methods, vec![HttpMethod::Get, HttpMethod::Post]);

        let user = &parsed.endpoints[1];
        assert_eq!(user.middleware, vec!["rateLimit"]);
        assert!(user.auth.as_ref().unwrap().required);
        assert!(user.validation.is_some());

        assert_eq!(parsed.global_middleware, vec!["logger"]);
        assert!(parsed.cors_config.is_some());
        assert!(!parsed.auth_config.as_ref().unwrap().required);
    }

    #[test]
    fn test_strict_mode_fails_closed() {
        let raw = json!({
            "endpoints": [
                {"path": "/ok", "methods": ["GET"], "handler": "ok"},
                {"path": "bad", "methods": ["GET"], "handler": "bad"}
            ]
        });

        let strict = parse_api_config(&raw, &ParseOptions::default());
        assert!(!strict.errors.is_empty());
        assert!(strict.endpoints.is_empty());

        let lenient = parse_api_config(&raw, &ParseOptions::lenient());
        assert!(lenient.errors.is_empty());
        assert_eq!(lenient.endpoints.len(), 1);
        assert_eq!(lenient.endpoints[0].path, "/ok");
        assert!(lenient
            .warnings
            .iter()
            .any(|w| w.message.contains("must start with '/'")));
        assert!(lenient
            .warnings
            .iter()
            .any(|w| w.path.as_deref() == Some("endpoints[1]")));
    }

    #[test]
    fn test_lenient_drops_unrecognized_methods() {
        let raw = json!({
            "endpoints": [{"path": "/a", "methods": ["GET", "FETCH"], "handler": "a"}]
        });
        let parsed = parse_api_config(&raw, &ParseOptions::lenient());
        assert_eq!(parsed.endpoints[0].methods, vec![HttpMethod::Get]);
    }

    struct AlwaysValid;

    impl ConfigSchemaValidator for AlwaysValid {
        fn validate(&self, _raw: &Value) -> SchemaValidationResult {
            SchemaValidationResult {
                valid: true,
                ..SchemaValidationResult::default()
            }
        }
    }

    #[test]
    fn test_custom_validator_and_unreadable_endpoint_in_strict_mode() {
        let raw = json!({
            "endpoints": [
                {"path": "/a", "methods": ["GET"], "handler": "a"},
                {"path": "/b", "methods": [], "handler": "b"}
            ]
        });

        let parsed = parse_api_config_with(&raw, &ParseOptions::default(), &AlwaysValid);
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.endpoints.is_empty());
    }
}
