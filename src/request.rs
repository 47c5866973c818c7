//! 미들웨어 체인을 따라 흐르는 요청 컨텍스트입니다.
//!
//! hyper 요청의 헤더 부분과 수집된 본문으로부터 만들어지며, 라우트
//! 파라미터와 검증된 값이 단계별로 채워집니다.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::{header, HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("요청 본문 JSON 파싱 실패: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("요청 본문 읽기 실패: {0}")]
    Body(String),

    #[error("요청 본문이 허용 크기({limit} bytes)를 초과함")]
    PayloadTooLarge { limit: usize },
}

/// 검증 미들웨어가 강제 변환을 마친 값들
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedData {
    pub body: Option<Map<String, Value>>,
    pub query: Option<Map<String, Value>>,
    pub params: Option<Map<String, Value>>,
    pub headers: Option<Map<String, Value>>,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// 쿼리 문자열. 같은 키가 반복되면 배열이 됩니다.
    pub query: Map<String, Value>,
    /// 라우트 테이블이 채우는 경로 파라미터
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
    pub remote_addr: Option<SocketAddr>,
    pub request_id: String,
    pub validated: ValidatedData,
}

impl ApiRequest {
    /// 본문 없는 요청을 만듭니다. `uri`는 경로와 쿼리 문자열을 포함할 수 있습니다.
    pub fn new(method: Method, uri: &str) -> Self {
        let uri: Uri = uri.parse().unwrap_or_default();
        Self {
            method,
            path: uri.path().to_string(),
            headers: HeaderMap::new(),
            query: uri.query().map(parse_query).unwrap_or_default(),
            params: HashMap::new(),
            body: None,
            remote_addr: None,
            request_id: Uuid::new_v4().to_string(),
            validated: ValidatedData::default(),
        }
    }

    /// hyper 요청 헤더와 본문 바이트로부터 요청을 만듭니다.
    ///
    /// 본문은 POST/PUT/PATCH 요청에서만 JSON으로 파싱합니다.
    pub fn from_parts(parts: Parts, body: Bytes) -> Result<Self, RequestError> {
        let body = if carries_body(&parts.method) {
            parse_body(&body)?
        } else {
            None
        };

        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(parse_query).unwrap_or_default(),
            method: parts.method,
            headers: parts.headers,
            params: HashMap::new(),
            body,
            remote_addr: None,
            request_id,
            validated: ValidatedData::default(),
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST.as_str())
    }

    pub fn origin(&self) -> Option<&str> {
        self.header(header::ORIGIN.as_str())
    }
}

/// 본문을 가질 수 있는 메서드인지 확인합니다.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn parse_body(bytes: &Bytes) -> Result<Option<Value>, RequestError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(bytes)?))
}

/// 쿼리 문자열을 JSON 객체로 변환합니다. 값은 모두 문자열입니다.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts(method: Method, uri: &str) -> Parts {
        hyper::Request::builder()
            .method(method)
            .uri(uri)
            .header(X_REQUEST_ID, "req-1")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_query_repeated_keys_become_arrays() {
        let query = parse_query("page=2&tag=a&tag=b&name=J%C3%BCrgen");
        assert_eq!(query["page"], json!("2"));
        assert_eq!(query["tag"], json!(["a", "b"]));
        assert_eq!(query["name"], json!("Jürgen"));
    }

    #[test]
    fn test_body_only_parsed_for_body_methods() {
        let body = Bytes::from(r#"{"name":"kim"}"#);

        let post = ApiRequest::from_parts(parts(Method::POST, "/users"), body.clone()).unwrap();
        assert_eq!(post.body, Some(json!({"name": "kim"})));
        assert_eq!(post.request_id, "req-1");

        let get = ApiRequest::from_parts(parts(Method::GET, "/users?page=1"), body).unwrap();
        assert_eq!(get.body, None);
        assert_eq!(get.query["page"], json!("1"));
    }

    #[test]
    fn test_empty_body_is_none_and_bad_json_is_error() {
        let empty = ApiRequest::from_parts(parts(Method::PUT, "/users/1"), Bytes::from("  ")).unwrap();
        assert!(empty.body.is_none());

        let bad = ApiRequest::from_parts(parts(Method::PATCH, "/users/1"), Bytes::from("{oops"));
        assert!(matches!(bad, Err(RequestError::InvalidJson(_))));
    }

    #[test]
    fn test_builder_helpers() {
        let req = ApiRequest::new(Method::GET, "/users?limit=5")
            .with_header("Host", "api.example.com")
            .with_param("id", "7");
        assert_eq!(req.path, "/users");
        assert_eq!(req.host(), Some("api.example.com"));
        assert_eq!(req.query["limit"], json!("5"));
        assert_eq!(req.params["id"], "7");
    }
}
