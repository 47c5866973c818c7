use std::sync::OnceLock;

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use tracing::debug;

use super::error::ConfigError;
use super::schema::{API_CONFIG_SCHEMA, KNOWN_TOP_LEVEL_KEYS};
use super::types::{ConfigIssue, SchemaValidationResult};
use crate::routing::HttpMethod;
use crate::validation::{FieldType, Section};

/// API 정의의 구조 검증을 담당하는 협력자
pub trait ConfigSchemaValidator: Send + Sync {
    fn validate(&self, raw: &Value) -> SchemaValidationResult;
}

/// 내장 JSON 스키마와 엔드포인트 규칙으로 검증합니다.
pub struct JsonSchemaValidator {
    schema: &'static JSONSchema,
}

static COMPILED_SCHEMA: OnceLock<Result<JSONSchema, String>> = OnceLock::new();

fn compile_schema() -> Result<JSONSchema, String> {
    let schema_value: Value = serde_json::from_str(API_CONFIG_SCHEMA)
        .map_err(|e| format!("스키마 파싱 오류: {}", e))?;

    let schema = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_value)
        .map_err(|e| format!("스키마 컴파일 오류: {}", e))?;

    debug!("API 정의 JSON 스키마 컴파일 성공");
    Ok(schema)
}

impl JsonSchemaValidator {
    /// 스키마는 프로세스에서 한 번만 컴파일됩니다.
    pub fn new() -> Result<Self, ConfigError> {
        match COMPILED_SCHEMA.get_or_init(compile_schema) {
            Ok(schema) => Ok(Self { schema }),
            Err(reason) => Err(ConfigError::SchemaCompile {
                reason: reason.clone(),
            }),
        }
    }
}

impl ConfigSchemaValidator for JsonSchemaValidator {
    fn validate(&self, raw: &Value) -> SchemaValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if let Err(schema_errors) = self.schema.validate(raw) {
            errors.extend(
                schema_errors
                    .map(|e| ConfigIssue::new(e.to_string()).at(e.instance_path.to_string())),
            );
        }

        if let Some(object) = raw.as_object() {
            for key in object.keys() {
                if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
                    warnings.push(
                        ConfigIssue::new(format!("Unknown top-level key '{}'", key))
                            .at(key.clone())
                            .suggest(KNOWN_TOP_LEVEL_KEYS.iter().map(|k| k.to_string()).collect()),
                    );
                }
            }
        }

        if let Some(endpoints) = raw.get("endpoints").and_then(Value::as_array) {
            if endpoints.is_empty() {
                warnings.push(ConfigIssue::new("No endpoints defined").at("endpoints"));
            }
            for (i, endpoint) in endpoints.iter().enumerate() {
                // 객체가 아닌 항목은 스키마 검증에서 이미 보고됩니다.
                if !endpoint.is_object() {
                    continue;
                }
                for mut issue in validate_api_endpoint(endpoint) {
                    issue.path = Some(match issue.path {
                        Some(path) => format!("endpoints[{}].{}", i, path),
                        None => format!("endpoints[{}]", i),
                    });
                    errors.push(issue);
                }
            }
        }

        SchemaValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// 엔드포인트 정의 하나의 구조 문제를 모두 찾습니다.
pub fn validate_api_endpoint(endpoint: &Value) -> Vec<ConfigIssue> {
    let Some(endpoint) = endpoint.as_object() else {
        return vec![ConfigIssue::new("Endpoint must be an object")];
    };

    let mut issues = Vec::new();
    check_path(endpoint, &mut issues);
    check_methods(endpoint, &mut issues);

    match endpoint.get("handler") {
        Some(Value::String(handler)) if !handler.trim().is_empty() => {}
        _ => issues.push(ConfigIssue::new("Endpoint handler is required").at("handler")),
    }

    if let Some(middleware) = endpoint.get("middleware") {
        let valid = middleware
            .as_array()
            .is_some_and(|names| names.iter().all(Value::is_string));
        if !valid {
            issues.push(
                ConfigIssue::new("Endpoint middleware must be a list of names").at("middleware"),
            );
        }
    }

    if let Some(auth) = endpoint.get("auth") {
        if !auth.is_object() {
            issues.push(ConfigIssue::new("Endpoint auth must be an object").at("auth"));
        }
    }

    if let Some(validation) = endpoint.get("validation") {
        check_validation(validation, &mut issues);
    }

    issues
}

fn check_path(endpoint: &Map<String, Value>, issues: &mut Vec<ConfigIssue>) {
    match endpoint.get("path") {
        Some(Value::String(path)) if path.starts_with('/') => {}
        Some(Value::String(path)) => issues.push(
            ConfigIssue::new(format!("Endpoint path '{}' must start with '/'", path))
                .at("path")
                .suggest(vec![format!("/{}", path)]),
        ),
        _ => issues.push(ConfigIssue::new("Endpoint path is required").at("path")),
    }
}

fn check_methods(endpoint: &Map<String, Value>, issues: &mut Vec<ConfigIssue>) {
    let methods = match endpoint.get("methods") {
        Some(Value::Array(methods)) if !methods.is_empty() => methods,
        _ => {
            issues.push(
                ConfigIssue::new("Endpoint must declare at least one HTTP method")
                    .at("methods")
                    .suggest(all_methods()),
            );
            return;
        }
    };

    for (i, method) in methods.iter().enumerate() {
        let Some(name) = method.as_str() else {
            issues.push(
                ConfigIssue::new(format!("HTTP method must be a string, got {}", method))
                    .at(format!("methods[{}]", i)),
            );
            continue;
        };
        if name.parse::<HttpMethod>().is_ok() {
            continue;
        }

        let upper = name.to_ascii_uppercase();
        let suggestions = if upper.parse::<HttpMethod>().is_ok() {
            vec![upper]
        } else {
            all_methods()
        };
        issues.push(
            ConfigIssue::new(format!("Unrecognized HTTP method '{}'", name))
                .at(format!("methods[{}]", i))
                .suggest(suggestions),
        );
    }
}

fn check_validation(validation: &Value, issues: &mut Vec<ConfigIssue>) {
    let Some(sections) = validation.as_object() else {
        issues.push(ConfigIssue::new("Endpoint validation must be an object").at("validation"));
        return;
    };

    for (section, fields) in sections {
        if !Section::ALL.iter().any(|s| s.as_str() == section) {
            issues.push(
                ConfigIssue::new(format!("Unknown validation section '{}'", section))
                    .at(format!("validation.{}", section))
                    .suggest(Section::ALL.iter().map(|s| s.to_string()).collect()),
            );
            continue;
        }

        let Some(fields) = fields.as_object() else {
            issues.push(
                ConfigIssue::new(format!("Validation section '{}' must be an object", section))
                    .at(format!("validation.{}", section)),
            );
            continue;
        };

        for (name, rule) in fields {
            let at = format!("validation.{}.{}.type", section, name);
            match rule.get("type") {
                Some(Value::String(t)) if t.parse::<FieldType>().is_ok() => {}
                Some(Value::String(t)) => issues.push(
                    ConfigIssue::new(format!(
                        "Invalid type '{}' for validation field '{}.{}'",
                        t, section, name
                    ))
                    .at(at)
                    .suggest(suggest_field_type(t)),
                ),
                _ => issues.push(
                    ConfigIssue::new(format!(
                        "Validation field '{}.{}' is missing a type",
                        section, name
                    ))
                    .at(at)
                    .suggest(FieldType::NAMES.iter().map(|n| n.to_string()).collect()),
                ),
            }
        }
    }
}

fn all_methods() -> Vec<String> {
    HttpMethod::ALL.iter().map(|m| m.to_string()).collect()
}

/// 흔한 오타나 다른 언어의 타입 이름을 가까운 필드 타입으로 연결합니다.
fn suggest_field_type(given: &str) -> Vec<String> {
    let suggestion = match given.to_ascii_lowercase().as_str() {
        "int" | "integer" | "float" | "double" | "decimal" | "num" => Some(FieldType::Number),
        "bool" => Some(FieldType::Boolean),
        "str" | "text" => Some(FieldType::String),
        "list" | "vec" => Some(FieldType::Array),
        "map" | "dict" | "json" => Some(FieldType::Object),
        other => other.parse().ok(),
    };

    match suggestion {
        Some(field_type) => vec![field_type.to_string()],
        None => FieldType::NAMES.iter().map(|n| n.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(issues: &[ConfigIssue]) -> Vec<&str> {
        issues.iter().filter_map(|i| i.path.as_deref()).collect()
    }

    #[test]
    fn test_valid_endpoint_has_no_issues() {
        let issues = validate_api_endpoint(&json!({
            "path": "/users/:id",
            "methods": ["GET", "DELETE"],
            "handler": "users",
            "validation": {"params": {"id": {"type": "number", "required": true}}}
        }));
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_reports_every_structural_problem() {
        let issues = validate_api_endpoint(&json!({
            "path": "users",
            "methods": ["get", "FETCH"],
            "validation": {
                "body": {
                    "age": {"type": "integer"},
                    "name": {"required": true}
                }
            }
        }));

        assert_eq!(
            paths(&issues),
            vec![
                "path",
                "methods[0]",
                "methods[1]",
                "handler",
                "validation.body.age.type",
                "validation.body.name.type",
            ]
        );
        assert_eq!(issues[0].suggestions, vec!["/users"]);
        assert_eq!(issues[1].suggestions, vec!["GET"]);
        assert_eq!(issues[2].suggestions.len(), HttpMethod::ALL.len());
        assert_eq!(issues[4].suggestions, vec!["number"]);
    }

    #[test]
    fn test_empty_methods() {
        let issues = validate_api_endpoint(&json!({"path": "/a", "methods": [], "handler": "h"}));
        assert_eq!(paths(&issues), vec!["methods"]);
        assert!(validate_api_endpoint(&json!("nope"))[0].message.contains("object"));
    }

    #[test]
    fn test_schema_validator() {
        let validator = JsonSchemaValidator::new().unwrap();

        let ok = validator.validate(&json!({
            "endpoints": [{"path": "/a", "methods": ["GET"], "handler": "h"}],
            "middleware": [{"name": "cors", "order": 1}],
            "cors": {"origin": true},
            "extra": 1
        }));
        assert!(ok.valid, "{:?}", ok.errors);
        assert_eq!(ok.warnings.len(), 1);
        assert_eq!(ok.warnings[0].path.as_deref(), Some("extra"));

        let bad = validator.validate(&json!({
            "endpoints": [{"path": "a", "methods": ["GET"], "handler": "h"}],
            "middleware": [{"order": 1}]
        }));
        assert!(!bad.valid);
        assert!(bad
            .errors
            .iter()
            .any(|e| e.path.as_deref() == Some("endpoints[0].path")));
        assert!(bad.errors.len() >= 2);

        let missing = validator.validate(&json!({}));
        assert!(!missing.valid);
    }
}
