use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::cors::CorsConfig;
use crate::routing::HttpMethod;
use crate::validation::ValidationSchema;

/// 인증 설정. `required`가 없으면 필수로 간주합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_required")]
    pub required: bool,

    /// 기록만 하고 강제하지 않습니다.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

fn default_required() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required: true,
            roles: None,
        }
    }
}

/// 최상위 `middleware` 배열의 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,

    /// 낮은 값이 먼저 실행됩니다. 없으면 맨 뒤입니다.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}

/// 정규화된 엔드포인트 하나
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    /// basePath가 붙고 중복 슬래시가 정리된 경로
    pub path: String,
    /// 설정 파일에 적힌 그대로의 경로
    pub original_path: String,
    /// 중복 없이 선언 순서대로
    pub methods: Vec<HttpMethod>,
    pub handler: String,
    pub validation: Option<ValidationSchema>,
    pub middleware: Vec<String>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub strict: bool,
    pub base_path: String,
    pub default_middleware: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: true,
            base_path: String::new(),
            default_middleware: Vec::new(),
        }
    }
}

impl ParseOptions {
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_default_middleware(mut self, names: Vec<String>) -> Self {
        self.default_middleware = names;
        self
    }
}

/// 설정 검증에서 발견된 문제 하나
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigIssue {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ConfigIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            suggestions: Vec::new(),
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn suggest(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) if !path.is_empty() => write!(f, "{} (경로: {})", self.message, path)?,
            _ => write!(f, "{}", self.message)?,
        }
        if !self.suggestions.is_empty() {
            write!(f, " [제안: {}]", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

/// 구조 검증 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaValidationResult {
    pub valid: bool,
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

/// 파싱 결과
///
/// `errors`가 비어 있지 않으면 `endpoints`는 항상 비어 있습니다.
#[derive(Debug, Clone, Default)]
pub struct ParsedApiConfig {
    pub endpoints: Vec<EndpointDescriptor>,
    /// 기본 미들웨어 뒤에 정렬된 정의 이름을 붙인 목록
    pub global_middleware: Vec<String>,
    pub middleware_definitions: Vec<MiddlewareDefinition>,
    pub auth_config: Option<AuthConfig>,
    pub cors_config: Option<CorsConfig>,
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ParsedApiConfig {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn definition(&self, name: &str) -> Option<&MiddlewareDefinition> {
        self.middleware_definitions.iter().find(|d| d.name == name)
    }
}
