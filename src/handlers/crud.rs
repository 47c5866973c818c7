use async_trait::async_trait;
use hyper::{Method, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{HandlerError, RouteHandler};
use crate::request::ApiRequest;
use crate::response::{
    codes, error_response, success_response, timestamp, Pagination, ResponseEnvelope, Response,
};
use crate::routing::CrudOperation;

/// 목록 응답의 전체 개수. 실제 저장소가 붙기 전까지의 대체 값입니다.
pub const LIST_TOTAL: u64 = 100;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;
/// 한 페이지에 담을 수 있는 최대 항목 수
pub const MAX_LIMIT: u64 = 100;

/// CRUD로 분류된 엔드포인트의 최종 핸들러
///
/// 메서드와 식별자 파라미터 유무로 동작을 고르고, 저장소 대신
/// 요청 내용을 바탕으로 합성한 데이터를 반환합니다.
pub struct CrudDispatcher {
    resource: String,
    id_param: String,
}

impl CrudDispatcher {
    pub fn new(resource: impl Into<String>, id_param: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id_param: id_param.into(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// 요청에 해당하는 CRUD 동작. 해당 동작이 없으면 `None`입니다.
    pub fn operation_for(&self, req: &ApiRequest) -> Option<CrudOperation> {
        match req.method {
            Method::GET if self.id(req).is_some() => Some(CrudOperation::Read),
            Method::GET => Some(CrudOperation::List),
            Method::POST => Some(CrudOperation::Create),
            Method::PUT | Method::PATCH => Some(CrudOperation::Update),
            Method::DELETE => Some(CrudOperation::Delete),
            _ => None,
        }
    }

    pub fn create(&self, req: &ApiRequest) -> Response {
        let Some(body) = request_body(req) else {
            return missing_body();
        };

        let now = timestamp();
        let mut data = Map::new();
        data.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        data.extend(body);
        data.insert("createdAt".to_string(), Value::String(now.clone()));
        data.insert("updatedAt".to_string(), Value::String(now));

        success_response(StatusCode::CREATED, Value::Object(data))
    }

    pub fn read(&self, req: &ApiRequest) -> Response {
        let Some(id) = self.id(req) else {
            return missing_id();
        };

        let now = timestamp();
        success_response(
            StatusCode::OK,
            json!({
                "id": id,
                "resource": self.resource,
                "createdAt": now,
                "updatedAt": now,
            }),
        )
    }

    pub fn update(&self, req: &ApiRequest) -> Response {
        let Some(id) = self.id(req) else {
            return missing_id();
        };
        let Some(body) = request_body(req) else {
            return missing_body();
        };

        let mut data = Map::new();
        data.insert("id".to_string(), Value::String(id.to_string()));
        data.extend(body);
        data.insert("updatedAt".to_string(), Value::String(timestamp()));

        success_response(StatusCode::OK, Value::Object(data))
    }

    /// 204 상태와 함께 JSON 본문을 내보냅니다.
    pub fn delete(&self, req: &ApiRequest) -> Response {
        let Some(id) = self.id(req) else {
            return missing_id();
        };

        success_response(StatusCode::NO_CONTENT, json!({ "id": id, "deleted": true }))
    }

    pub fn list(&self, req: &ApiRequest) -> Response {
        let page = query_number(req, "page").unwrap_or(DEFAULT_PAGE).max(1);
        let limit = query_number(req, "limit")
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);
        let pagination = Pagination::new(page, limit, LIST_TOTAL);
        let offset = pagination.offset();

        let items: Vec<Value> = (1..=limit)
            .map(|i| {
                let n = offset.saturating_add(i);
                json!({
                    "id": n.to_string(),
                    "resource": self.resource,
                    "name": format!("{} {}", self.resource, n),
                })
            })
            .collect();

        ResponseEnvelope::success(Value::Array(items))
            .with_pagination(pagination)
            .into_response(StatusCode::OK)
    }

    fn id<'r>(&self, req: &'r ApiRequest) -> Option<&'r str> {
        req.params
            .get(&self.id_param)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

#[async_trait]
impl RouteHandler for CrudDispatcher {
    async fn call(&self, req: ApiRequest) -> Result<Response, HandlerError> {
        let Some(operation) = self.operation_for(&req) else {
            return Ok(error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                codes::METHOD_NOT_ALLOWED,
                format!("Method {} not allowed for {}", req.method, self.resource),
            ));
        };

        debug!(
            request_id = %req.request_id,
            resource = %self.resource,
            operation = ?operation,
            "CRUD 요청 처리"
        );

        Ok(match operation {
            CrudOperation::Create => self.create(&req),
            CrudOperation::Read => self.read(&req),
            CrudOperation::Update => self.update(&req),
            CrudOperation::Delete => self.delete(&req),
            CrudOperation::List => self.list(&req),
        })
    }
}

/// 검증된 본문을 우선 사용하고, 없으면 원본 본문을 사용합니다.
fn request_body(req: &ApiRequest) -> Option<Map<String, Value>> {
    if let Some(body) = &req.validated.body {
        return Some(body.clone());
    }
    match &req.body {
        Some(Value::Object(body)) => Some(body.clone()),
        _ => None,
    }
}

fn query_number(req: &ApiRequest, name: &str) -> Option<u64> {
    let value = req
        .validated
        .query
        .as_ref()
        .and_then(|q| q.get(name))
        .or_else(|| req.query.get(name))?;

    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn missing_body() -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        codes::MISSING_BODY,
        "Request body is required",
    )
}

fn missing_id() -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        codes::MISSING_ID,
        "Resource id is required",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn users() -> CrudDispatcher {
        CrudDispatcher::new("users", "id")
    }

    async fn parts_of(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_create_merges_body() {
        let req = ApiRequest::new(Method::POST, "/users").with_body(json!({"name": "kim"}));
        let (status, body) = parts_of(users().call(req).await.unwrap()).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["name"], "kim");
        assert!(body["data"]["id"].is_string());
        assert!(body["data"]["createdAt"].is_string());
        assert!(body["data"]["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_create_without_body() {
        let req = ApiRequest::new(Method::POST, "/users");
        let (status, body) = parts_of(users().call(req).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_BODY");

        let not_object = ApiRequest::new(Method::POST, "/users").with_body(json!([1, 2]));
        let (status, _) = parts_of(users().call(not_object).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_read_and_update() {
        let read = ApiRequest::new(Method::GET, "/users/7").with_param("id", "7");
        let (status, body) = parts_of(users().call(read).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], "7");

        let update = ApiRequest::new(Method::PATCH, "/users/7")
            .with_param("id", "7")
            .with_body(json!({"name": "lee"}));
        let (status, body) = parts_of(users().call(update).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], "7");
        assert_eq!(body["data"]["name"], "lee");
        assert!(body["data"].get("createdAt").is_none());

        let no_id = ApiRequest::new(Method::PUT, "/users").with_body(json!({"name": "lee"}));
        let (status, body) = parts_of(users().call(no_id).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_ID");

        let (_, body) = parts_of(users().read(&ApiRequest::new(Method::GET, "/users"))).await;
        assert_eq!(body["error"]["code"], "MISSING_ID");
    }

    #[tokio::test]
    async fn test_delete_returns_no_content_with_body() {
        let req = ApiRequest::new(Method::DELETE, "/users/123").with_param("id", "123");
        let (status, body) = parts_of(users().call(req).await.unwrap()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body["data"], json!({"id": "123", "deleted": true}));
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let req = ApiRequest::new(Method::GET, "/users?page=2&limit=5");
        let (status, body) = parts_of(users().call(req).await.unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0]["id"], "6");

        let pagination = &body["meta"]["pagination"];
        assert_eq!(pagination["page"], 2);
        assert_eq!(pagination["limit"], 5);
        assert_eq!(pagination["total"], LIST_TOTAL);
        assert_eq!(pagination["totalPages"], 20);
        assert_eq!(pagination["hasNext"], true);
        assert_eq!(pagination["hasPrev"], true);
    }

    #[tokio::test]
    async fn test_list_defaults_and_validated_query() {
        let (_, body) = parts_of(users().call(ApiRequest::new(Method::GET, "/users")).await.unwrap()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 10);
        assert_eq!(body["meta"]["pagination"]["page"], 1);
        assert_eq!(body["meta"]["pagination"]["hasPrev"], false);

        let mut req = ApiRequest::new(Method::GET, "/users?limit=50");
        let mut validated = Map::new();
        validated.insert("limit".to_string(), json!(3));
        req.validated.query = Some(validated);
        let (_, body) = parts_of(users().call(req).await.unwrap()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_extreme_paging() {
        let req = ApiRequest::new(Method::GET, "/users?page=18446744073709551615&limit=2");
        let (status, body) = parts_of(users().call(req).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["meta"]["pagination"]["hasNext"], false);

        let req = ApiRequest::new(Method::GET, "/users?limit=4000000000");
        let (status, body) = parts_of(users().call(req).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len() as u64, MAX_LIMIT);
        assert_eq!(body["meta"]["pagination"]["limit"], MAX_LIMIT);
    }

    #[tokio::test]
    async fn test_other_methods_not_allowed() {
        let req = ApiRequest::new(Method::HEAD, "/users");
        let (status, body) = parts_of(users().call(req).await.unwrap()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
    }
}
