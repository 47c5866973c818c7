//! 요청 구역별 강제 변환과 제약 검사
//!
//! 모든 구역의 모든 필드를 한 번에 검사하고 위반 사항을 모읍니다.
//! 첫 위반에서 멈추지 않습니다.

use regex_lite::Regex;
use serde_json::{Map, Number, Value};

use super::codes;
use super::schema::{FieldType, FieldValidation, Section, ValidationSchema};
use crate::request::{ApiRequest, ValidatedData};
use crate::response::FieldViolation;

/// 패턴을 미리 컴파일한 필드 규칙
#[derive(Debug)]
struct CompiledField {
    name: String,
    rule: FieldValidation,
    /// 잘못된 패턴은 에러 메시지로 보관했다가 요청마다 위반으로 보고합니다.
    pattern: Option<Result<Regex, String>>,
}

/// 검증 준비가 끝난 스키마
#[derive(Debug)]
pub struct CompiledSchema {
    sections: Vec<(Section, Vec<CompiledField>)>,
}

impl CompiledSchema {
    pub fn compile(schema: &ValidationSchema) -> Self {
        let sections = schema
            .sections()
            .map(|(section, rules)| {
                let fields = rules
                    .iter()
                    .map(|(name, rule)| CompiledField {
                        name: name.clone(),
                        rule: rule.clone(),
                        pattern: rule
                            .pattern
                            .as_deref()
                            .map(|p| Regex::new(p).map_err(|e| e.to_string())),
                    })
                    .collect();
                (section, fields)
            })
            .collect();

        Self { sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// 검증 동작 옵션
#[derive(Debug, Clone, Copy)]
pub struct ValidationMode {
    pub strict: bool,
    pub allow_unknown: bool,
}

impl Default for ValidationMode {
    fn default() -> Self {
        Self {
            strict: false,
            allow_unknown: true,
        }
    }
}

impl ValidationMode {
    fn rejects_unknown(&self) -> bool {
        self.strict && !self.allow_unknown
    }
}

/// 요청 전체를 검증합니다. 성공하면 강제 변환된 값을, 실패하면 모든
/// 위반 항목을 반환합니다.
pub fn validate_request(
    schema: &CompiledSchema,
    req: &ApiRequest,
    mode: ValidationMode,
) -> Result<ValidatedData, Vec<FieldViolation>> {
    let mut violations = Vec::new();
    let mut validated = ValidatedData::default();

    for (section, fields) in &schema.sections {
        let raw = section_values(*section, req);
        let mut output = match section {
            // 헤더는 선언된 필드만 남깁니다.
            Section::Headers => Map::new(),
            _ => raw.clone(),
        };

        for field in fields {
            let label = format!("{}.{}", section, field.name);
            let value = lookup(&raw, *section, &field.name);
            match validate_field(field, value, &label) {
                Ok(Some(coerced)) => {
                    output.insert(field.name.clone(), coerced);
                }
                Ok(None) => {}
                Err(mut found) => violations.append(&mut found),
            }
        }

        if mode.rejects_unknown() && matches!(section, Section::Body | Section::Query) {
            for (key, value) in &raw {
                if fields.iter().all(|f| &f.name != key) {
                    violations.push(violation(
                        format!("{}.{}", section, key),
                        codes::UNKNOWN_FIELD,
                        format!("Unknown field '{}'", key),
                        value.clone(),
                    ));
                }
            }
        }

        let slot = match section {
            Section::Body => &mut validated.body,
            Section::Query => &mut validated.query,
            Section::Params => &mut validated.params,
            Section::Headers => &mut validated.headers,
        };
        *slot = Some(output);
    }

    if violations.is_empty() {
        Ok(validated)
    } else {
        Err(violations)
    }
}

fn section_values(section: Section, req: &ApiRequest) -> Map<String, Value> {
    match section {
        Section::Body => match &req.body {
            Some(Value::Object(body)) => body.clone(),
            _ => Map::new(),
        },
        Section::Query => req.query.clone(),
        Section::Params => req
            .params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
        Section::Headers => req
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
            })
            .collect(),
    }
}

fn lookup<'a>(raw: &'a Map<String, Value>, section: Section, name: &str) -> Option<&'a Value> {
    match section {
        // hyper가 헤더 이름을 소문자로 저장합니다.
        Section::Headers => raw.get(&name.to_ascii_lowercase()),
        _ => raw.get(name),
    }
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// 필드 하나를 검사합니다. 값이 없고 필수가 아니면 `Ok(None)`입니다.
fn validate_field(
    field: &CompiledField,
    value: Option<&Value>,
    label: &str,
) -> Result<Option<Value>, Vec<FieldViolation>> {
    if is_empty_value(value) {
        if field.rule.required {
            return Err(vec![violation(
                label,
                codes::REQUIRED_FIELD_MISSING,
                format!("Field '{}' is required", label),
                value.cloned().unwrap_or(Value::Null),
            )]);
        }
        return Ok(None);
    }

    let raw = value.cloned().unwrap_or(Value::Null);
    let Some(coerced) = coerce(field.rule.field_type, &raw) else {
        return Err(vec![violation(
            label,
            codes::INVALID_TYPE,
            format!("Field '{}' must be of type {}", label, field.rule.field_type),
            raw,
        )]);
    };

    let mut violations = Vec::new();
    check_constraints(field, &coerced, label, &mut violations);

    if violations.is_empty() {
        Ok(Some(coerced))
    } else {
        Err(violations)
    }
}

/// 타입 태그별 강제 변환. 변환할 수 없으면 `None`입니다.
pub fn coerce(field_type: FieldType, value: &Value) -> Option<Value> {
    match field_type {
        FieldType::String => coerce_string(value),
        FieldType::Number => coerce_number(value),
        FieldType::Boolean => coerce_boolean(value),
        FieldType::Array => value.is_array().then(|| value.clone()),
        FieldType::Object => value.is_object().then(|| value.clone()),
    }
}

fn coerce_string(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Value::String(s.clone())),
        other => Some(Value::String(other.to_string())),
    }
}

fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => Some(Value::Number(n.clone())),
        Value::String(s) => parse_number(s.trim()).map(Value::Number),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(Number::from(f as i64))
    } else {
        Number::from_f64(f)
    }
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Number(n) => Some(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
        _ => None,
    }
}

fn check_constraints(
    field: &CompiledField,
    value: &Value,
    label: &str,
    violations: &mut Vec<FieldViolation>,
) {
    let rule = &field.rule;

    match (rule.field_type, value) {
        (FieldType::String, Value::String(s)) => {
            let len = s.chars().count() as f64;
            if let Some(min) = rule.min.filter(|min| len < *min) {
                violations.push(violation(
                    label,
                    codes::MIN_LENGTH,
                    format!("Field '{}' must be at least {} characters", label, min),
                    value.clone(),
                ));
            }
            if let Some(max) = rule.max.filter(|max| len > *max) {
                violations.push(violation(
                    label,
                    codes::MAX_LENGTH,
                    format!("Field '{}' must be at most {} characters", label, max),
                    value.clone(),
                ));
            }
            match &field.pattern {
                Some(Ok(regex)) if !regex.is_match(s) => violations.push(violation(
                    label,
                    codes::PATTERN_MISMATCH,
                    format!("Field '{}' does not match the required pattern", label),
                    value.clone(),
                )),
                Some(Err(e)) => violations.push(violation(
                    label,
                    codes::INVALID_PATTERN,
                    format!("Field '{}' has an invalid pattern: {}", label, e),
                    value.clone(),
                )),
                _ => {}
            }
        }
        (FieldType::Number, Value::Number(n)) => {
            let n = n.as_f64().unwrap_or_default();
            if let Some(min) = rule.min.filter(|min| n < *min) {
                violations.push(violation(
                    label,
                    codes::MIN_VALUE,
                    format!("Field '{}' must be at least {}", label, min),
                    value.clone(),
                ));
            }
            if let Some(max) = rule.max.filter(|max| n > *max) {
                violations.push(violation(
                    label,
                    codes::MAX_VALUE,
                    format!("Field '{}' must be at most {}", label, max),
                    value.clone(),
                ));
            }
        }
        (FieldType::Array, Value::Array(items)) => {
            let count = items.len() as f64;
            if let Some(min) = rule.min.filter(|min| count < *min) {
                violations.push(violation(
                    label,
                    codes::MIN_ITEMS,
                    format!("Field '{}' must contain at least {} items", label, min),
                    value.clone(),
                ));
            }
            if let Some(max) = rule.max.filter(|max| count > *max) {
                violations.push(violation(
                    label,
                    codes::MAX_ITEMS,
                    format!("Field '{}' must contain at most {} items", label, max),
                    value.clone(),
                ));
            }
        }
        _ => {}
    }

    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|candidate| values_equal(candidate, value)) {
            let choices = allowed
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            violations.push(violation(
                label,
                codes::ENUM_VIOLATION,
                format!("Field '{}' must be one of: {}", label, choices),
                value.clone(),
            ));
        }
    }
}

/// 숫자는 표현 방식(정수/실수)과 무관하게 값으로 비교합니다.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn violation(
    field: impl Into<String>,
    code: &str,
    message: String,
    value: Value,
) -> FieldViolation {
    FieldViolation {
        field: field.into(),
        message,
        code: code.to_string(),
        value,
    }
}
