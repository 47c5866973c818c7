//! 경로 형태와 메서드 집합으로부터 CRUD 의도를 추론합니다.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::EndpointDescriptor;
use crate::routing::HttpMethod;

/// CRUD 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudOperation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

/// 엔드포인트 분류 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    Crud {
        resource: String,
        /// 단일 리소스 식별자 파라미터 이름
        id_param: String,
        operations: BTreeSet<CrudOperation>,
    },
    Custom {
        handler: String,
    },
}

impl RouteKind {
    pub fn is_crud(&self) -> bool {
        matches!(self, RouteKind::Crud { .. })
    }
}

const CRUD_METHODS: [HttpMethod; 5] = [
    HttpMethod::Get,
    HttpMethod::Post,
    HttpMethod::Put,
    HttpMethod::Delete,
    HttpMethod::Patch,
];

/// 경로가 정확히 한 개의 정적 세그먼트(선택적으로 식별자 파라미터 하나가
/// 뒤따름)이고 메서드 집합이 CRUD 메서드와 겹치면 CRUD 라우트입니다.
///
/// 분류는 basePath가 붙기 전의 원래 경로로 합니다.
pub fn is_crud_pattern(endpoint: &EndpointDescriptor) -> bool {
    crud_id_param(&endpoint.original_path).is_some()
        && endpoint.methods.iter().any(|m| CRUD_METHODS.contains(m))
}

/// 첫 번째 경로 세그먼트
pub fn extract_resource_name(path: &str) -> String {
    path.split('/')
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

pub fn map_methods_to_crud_operations(methods: &[HttpMethod]) -> BTreeSet<CrudOperation> {
    let mut operations = BTreeSet::new();
    for method in methods {
        match method {
            HttpMethod::Get => {
                operations.insert(CrudOperation::Read);
                operations.insert(CrudOperation::List);
            }
            HttpMethod::Post => {
                operations.insert(CrudOperation::Create);
            }
            HttpMethod::Put | HttpMethod::Patch => {
                operations.insert(CrudOperation::Update);
            }
            HttpMethod::Delete => {
                operations.insert(CrudOperation::Delete);
            }
            HttpMethod::Head | HttpMethod::Options => {}
        }
    }
    operations
}

pub fn classify(endpoint: &EndpointDescriptor) -> RouteKind {
    if is_crud_pattern(endpoint) {
        let id_param = crud_id_param(&endpoint.original_path)
            .flatten()
            .unwrap_or_else(|| "id".to_string());
        RouteKind::Crud {
            resource: extract_resource_name(&endpoint.original_path),
            id_param,
            operations: map_methods_to_crud_operations(&endpoint.methods),
        }
    } else {
        RouteKind::Custom {
            handler: endpoint.handler.clone(),
        }
    }
}

/// 경로가 CRUD 형태면 `Some(식별자 파라미터 이름)`을 반환합니다.
/// 식별자 세그먼트가 없는 컬렉션 경로는 `Some(None)`입니다.
fn crud_id_param(path: &str) -> Option<Option<String>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [resource] if !is_param(resource) => Some(None),
        [resource, id] if !is_param(resource) => param_name(id).map(Some),
        _ => None,
    }
}

fn is_param(segment: &str) -> bool {
    param_name(segment).is_some()
}

fn param_name(segment: &str) -> Option<String> {
    segment
        .strip_prefix(':')
        .or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .map(|name| name.trim_end_matches('?'))
        .filter(|name| !name.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(path: &str, methods: &[HttpMethod]) -> EndpointDescriptor {
        EndpointDescriptor {
            path: path.to_string(),
            original_path: path.to_string(),
            methods: methods.to_vec(),
            handler: "handler".to_string(),
            validation: None,
            middleware: Vec::new(),
            auth: None,
        }
    }

    #[test]
    fn test_crud_patterns() {
        let test_cases = vec![
            ("/users", vec![HttpMethod::Get, HttpMethod::Post], true),
            ("/users/:id", vec![HttpMethod::Get, HttpMethod::Delete], true),
            ("/users/{id}", vec![HttpMethod::Put], true),
            ("/auth/login", vec![HttpMethod::Post], false),
            ("/users/:id/posts", vec![HttpMethod::Get], false),
            ("/:tenant", vec![HttpMethod::Get], false),
            ("/users", vec![HttpMethod::Head, HttpMethod::Options], false),
            ("/", vec![HttpMethod::Get], false),
        ];

        for (path, methods, expected) in test_cases {
            assert_eq!(
                is_crud_pattern(&endpoint(path, &methods)),
                expected,
                "경로 '{}' 메서드 {:?}",
                path,
                methods
            );
        }
    }

    #[test]
    fn test_extract_resource_name() {
        assert_eq!(extract_resource_name("/users/:id"), "users");
        assert_eq!(extract_resource_name("//orders"), "orders");
        assert_eq!(extract_resource_name("/"), "");
    }

    #[test]
    fn test_method_mapping() {
        let ops = map_methods_to_crud_operations(&[HttpMethod::Get, HttpMethod::Patch, HttpMethod::Head]);
        let expected: BTreeSet<_> = [CrudOperation::Read, CrudOperation::List, CrudOperation::Update]
            .into_iter()
            .collect();
        assert_eq!(ops, expected);
        assert!(map_methods_to_crud_operations(&[HttpMethod::Options]).is_empty());
    }

    #[test]
    fn test_classify_uses_declared_id_param() {
        let kind = classify(&endpoint("/posts/:postId", &[HttpMethod::Get]));
        match kind {
            RouteKind::Crud { resource, id_param, .. } => {
                assert_eq!(resource, "posts");
                assert_eq!(id_param, "postId");
            }
            other => panic!("CRUD로 분류되어야 함: {:?}", other),
        }

        let custom = classify(&endpoint("/auth/login", &[HttpMethod::Post]));
        assert_eq!(custom, RouteKind::Custom { handler: "handler".to_string() });
    }
}
