use serde::{Deserialize, Serialize};

/// 허용 Origin 설정
///
/// - `true`: 요청의 Origin을 그대로 돌려줍니다.
/// - `"https://a.com"` 또는 `"*"`: 고정 값을 사용합니다.
/// - `["https://a.com", ...]`: 목록에 있는 Origin만 허용합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    Reflect(bool),
    Exact(String),
    List(Vec<String>),
}

impl Default for CorsOrigin {
    fn default() -> Self {
        CorsOrigin::Exact("*".to_string())
    }
}

impl CorsOrigin {
    /// 응답의 `Access-Control-Allow-Origin` 값을 결정합니다.
    pub fn resolve(&self, request_origin: Option<&str>) -> Option<String> {
        match self {
            CorsOrigin::Reflect(true) => request_origin.map(String::from),
            CorsOrigin::Reflect(false) => None,
            CorsOrigin::Exact(origin) => Some(origin.clone()),
            CorsOrigin::List(allowed) => request_origin
                .filter(|origin| allowed.iter().any(|a| a == origin))
                .map(String::from),
        }
    }

    /// 요청마다 결과가 달라지는 설정인지 여부
    pub fn varies(&self) -> bool {
        !matches!(self, CorsOrigin::Exact(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsConfig {
    #[serde(default)]
    pub origin: CorsOrigin,

    /// 허용할 HTTP 메서드 목록
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    /// 허용할 헤더 목록
    #[serde(default = "default_headers", alias = "allowHeaders")]
    pub allowed_headers: Vec<String>,

    /// 노출할 헤더 목록
    #[serde(default)]
    pub exposed_headers: Vec<String>,

    /// credentials 허용 여부
    #[serde(default)]
    pub credentials: bool,

    /// preflight 요청 캐시 시간 (초)
    #[serde(default)]
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: CorsOrigin::default(),
            methods: default_methods(),
            allowed_headers: default_headers(),
            exposed_headers: Vec::new(),
            credentials: false,
            max_age: None,
        }
    }
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_headers() -> Vec<String> {
    ["Content-Type", "Authorization"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl CorsConfig {
    /// JSON 설정 값으로부터 만듭니다. 빈 값이면 기본 설정입니다.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }
}
