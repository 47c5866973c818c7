use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::routing::error::RoutingError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Static(String),
    Param(String),
    /// 마지막 위치에만 올 수 있는 선택 파라미터
    OptionalParam(String),
}

/// 엔드포인트 경로로부터 컴파일된 경로 패턴
///
/// `:id`와 `{id}` 두 문법을 모두 받아들이며, 정규화된 경로는 항상
/// `{id}` 형식으로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pub pattern: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, RoutingError> {
        if !pattern.starts_with('/') {
            return Err(RoutingError::InvalidPathPattern {
                pattern: pattern.to_string(),
                reason: "경로는 '/'로 시작해야 합니다".to_string(),
            });
        }

        let raw: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw.len());

        for (i, part) in raw.iter().enumerate() {
            let segment = parse_segment(part).ok_or_else(|| RoutingError::InvalidPathPattern {
                pattern: pattern.to_string(),
                reason: format!("빈 파라미터 이름: {}", part),
            })?;

            if matches!(segment, Segment::OptionalParam(_)) && i + 1 != raw.len() {
                return Err(RoutingError::InvalidPathPattern {
                    pattern: pattern.to_string(),
                    reason: "선택 파라미터는 마지막 세그먼트에만 올 수 있습니다".to_string(),
                });
            }
            segments.push(segment);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// 끝에 선택 파라미터를 추가합니다. CRUD 컬렉션 경로에 사용됩니다.
    pub fn with_optional_param(mut self, name: &str) -> Self {
        let ends_with_param = matches!(
            self.segments.last(),
            Some(Segment::Param(_)) | Some(Segment::OptionalParam(_))
        );
        if !ends_with_param {
            self.segments.push(Segment::OptionalParam(name.to_string()));
        }
        self
    }

    /// 호스트 라우터 문법(`{name}`, `{name?}`)으로 표현한 경로
    pub fn normalized(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Static(s) => format!("/{}", s),
                Segment::Param(name) => format!("/{{{}}}", name),
                Segment::OptionalParam(name) => format!("/{{{}?}}", name),
            })
            .collect()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(name) | Segment::OptionalParam(name) => Some(name.as_str()),
                Segment::Static(_) => None,
            })
            .collect()
    }

    /// 우선순위 계산용 정적 세그먼트 수
    pub fn static_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count()
    }

    /// 요청 경로와 비교하고, 일치하면 추출한 파라미터를 반환합니다.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let required = self
            .segments
            .iter()
            .filter(|s| !matches!(s, Segment::OptionalParam(_)))
            .count();

        if parts.len() < required || parts.len() > self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match (segment, parts.get(i)) {
                (Segment::Static(expected), Some(actual)) if expected == actual => {}
                (Segment::Static(_), _) => return None,
                (Segment::Param(name), Some(actual))
                | (Segment::OptionalParam(name), Some(actual)) => {
                    let value = percent_decode_str(actual).decode_utf8_lossy();
                    params.insert(name.clone(), value.into_owned());
                }
                (Segment::Param(_), None) => return None,
                (Segment::OptionalParam(_), None) => {}
            }
        }
        Some(params)
    }
}

fn parse_segment(part: &str) -> Option<Segment> {
    let param = part
        .strip_prefix(':')
        .or_else(|| part.strip_prefix('{').and_then(|p| p.strip_suffix('}')));

    match param {
        None => Some(Segment::Static(part.to_string())),
        Some(name) => {
            let (name, optional) = match name.strip_suffix('?') {
                Some(name) => (name, true),
                None => (name, false),
            };
            if name.is_empty() {
                return None;
            }
            if optional {
                Some(Segment::OptionalParam(name.to_string()))
            } else {
                Some(Segment::Param(name.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_creation() {
        let test_cases = vec![
            // (패턴, 정규화 결과, 성공 여부)
            ("/users", "/users", true),
            ("/users/:id", "/users/{id}", true),
            ("/users/{id}", "/users/{id}", true),
            ("/api//users/", "/api/users", true),
            ("/", "/", true),
            ("users", "", false),
            ("/users/:", "", false),
            ("/users/:id?/posts", "", false),
        ];

        for (pattern, expected, should_succeed) in test_cases {
            let result = RoutePattern::parse(pattern);
            if should_succeed {
                let compiled = result.unwrap_or_else(|e| panic!("패턴 '{}' 실패: {}", pattern, e));
                assert_eq!(compiled.normalized(), expected, "패턴 '{}'", pattern);
            } else {
                assert!(result.is_err(), "패턴 '{}'은 실패해야 하는데 성공함", pattern);
            }
        }
    }

    #[test]
    fn test_optional_param_matching() {
        let pattern = RoutePattern::parse("/users").unwrap().with_optional_param("id");
        assert_eq!(pattern.normalized(), "/users/{id?}");

        assert_eq!(pattern.matches("/users"), Some(HashMap::new()));
        let params = pattern.matches("/users/42/").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(pattern.matches("/users/42/posts").is_none());
        assert!(pattern.matches("/accounts").is_none());
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let pattern = RoutePattern::parse("/users/:id").unwrap();
        let params = pattern.matches("/users/a%20b").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("a b"));

        let params = pattern.matches("/users/J%C3%BCrgen+x").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("Jürgen+x"));
    }

    #[test]
    fn test_optional_param_not_added_twice() {
        let pattern = RoutePattern::parse("/users/:userId").unwrap().with_optional_param("id");
        assert_eq!(pattern.normalized(), "/users/{userId}");
        assert_eq!(pattern.param_names(), vec!["userId"]);
        assert!(pattern.matches("/users").is_none());
    }

    #[test]
    fn test_nested_params() {
        let pattern = RoutePattern::parse("/orgs/:org/members/:member").unwrap();
        let params = pattern.matches("/orgs/acme/members/kim").unwrap();
        assert_eq!(params["org"], "acme");
        assert_eq!(params["member"], "kim");
        assert_eq!(pattern.static_count(), 2);
    }
}
