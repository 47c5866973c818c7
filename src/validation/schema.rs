use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 필드 타입. 타입마다 강제 변환 규칙이 하나씩 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub const NAMES: [&'static str; 5] = ["string", "number", "boolean", "array", "object"];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "array" => Ok(FieldType::Array),
            "object" => Ok(FieldType::Object),
            other => Err(format!("Invalid field type: {}", other)),
        }
    }
}

/// 필드 하나의 검증 규칙
///
/// `min`/`max`는 타입에 따라 의미가 달라집니다. 문자열은 길이, 숫자는 값,
/// 배열은 항목 수입니다. 선언된 타입에 해당하지 않는 제약은 무시됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl FieldValidation {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            min: None,
            max: None,
            pattern: None,
            allowed: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn one_of(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// 요청 구역
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Body,
    Query,
    Params,
    Headers,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Body, Section::Query, Section::Params, Section::Headers];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Body => "body",
            Section::Query => "query",
            Section::Params => "params",
            Section::Headers => "headers",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type FieldRules = BTreeMap<String, FieldValidation>;

/// 엔드포인트의 검증 스키마
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<FieldRules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<FieldRules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<FieldRules>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<FieldRules>,
}

impl ValidationSchema {
    pub fn section(&self, section: Section) -> Option<&FieldRules> {
        match section {
            Section::Body => self.body.as_ref(),
            Section::Query => self.query.as_ref(),
            Section::Params => self.params.as_ref(),
            Section::Headers => self.headers.as_ref(),
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Option<FieldRules> {
        match section {
            Section::Body => &mut self.body,
            Section::Query => &mut self.query,
            Section::Params => &mut self.params,
            Section::Headers => &mut self.headers,
        }
    }

    /// 존재하는 구역을 고정된 순서(body, query, params, headers)로 돌려줍니다.
    pub fn sections(&self) -> impl Iterator<Item = (Section, &FieldRules)> {
        Section::ALL
            .into_iter()
            .filter_map(move |section| self.section(section).map(|rules| (section, rules)))
    }

    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }

    /// 구역에 필드 규칙을 추가합니다.
    pub fn field(mut self, section: Section, name: &str, rule: FieldValidation) -> Self {
        self.section_mut(section)
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_schema() {
        let schema: ValidationSchema = serde_json::from_value(json!({
            "body": {
                "name": {"type": "string", "required": true, "min": 2, "max": 40},
                "role": {"type": "string", "enum": ["admin", "user"]}
            },
            "query": {
                "page": {"type": "number", "min": 1}
            }
        }))
        .unwrap();

        let body = schema.body.as_ref().unwrap();
        assert_eq!(body["name"].field_type, FieldType::String);
        assert!(body["name"].required);
        assert_eq!(body["name"].min, Some(2.0));
        assert_eq!(body["role"].allowed, Some(vec![json!("admin"), json!("user")]));
        assert_eq!(schema.query.as_ref().unwrap()["page"].field_type, FieldType::Number);

        let sections: Vec<_> = schema.sections().map(|(s, _)| s).collect();
        assert_eq!(sections, vec![Section::Body, Section::Query]);
    }

    #[test]
    fn test_invalid_type_is_rejected() {
        let result: Result<FieldValidation, _> = serde_json::from_value(json!({"type": "integer"}));
        assert!(result.is_err());
        assert!("integer".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_builder() {
        let schema = ValidationSchema::default()
            .field(Section::Params, "id", FieldValidation::new(FieldType::Number).required());
        assert!(!schema.is_empty());
        assert!(schema.params.as_ref().unwrap()["id"].required);
    }
}
