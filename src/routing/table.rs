use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use hyper::header::{HeaderValue, ALLOW};
use hyper::{Method, StatusCode};
use tracing::{debug, warn};

use crate::compiler::GeneratedRouteHandler;
use crate::middleware::cors::CorsMiddleware;
use crate::request::ApiRequest;
use crate::response::{codes, error_response, Response};
use crate::routing::{HttpMethod, RouteKind, RoutePattern, RoutingError};

/// 라우트의 경로 패턴을 만듭니다. CRUD 컬렉션 경로는 선택 식별자
/// 세그먼트를 받습니다.
pub fn pattern_for(path: &str, kind: &RouteKind) -> Result<RoutePattern, RoutingError> {
    let pattern = RoutePattern::parse(path)?;
    Ok(match kind {
        RouteKind::Crud { id_param, .. } => pattern.with_optional_param(id_param),
        RouteKind::Custom { .. } => pattern,
    })
}

struct CompiledRoute {
    pattern: RoutePattern,
    route: GeneratedRouteHandler,
    /// CORS 미들웨어가 있으면 선언되지 않은 OPTIONS도 받습니다.
    allows_preflight: bool,
}

/// 요청 매칭 결과
pub enum RouteMatch<'a> {
    Found {
        route: &'a GeneratedRouteHandler,
        params: HashMap<String, String>,
    },
    MethodNotAllowed {
        allowed: BTreeSet<HttpMethod>,
    },
    NotFound,
}

/// 생성된 라우트 핸들러를 보관하는 라우팅 테이블입니다.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
    /// 체인을 거치지 않는 404/405 응답에 붙일 CORS 정책
    cors: Option<Arc<CorsMiddleware>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cors(&mut self, cors: Arc<CorsMiddleware>) {
        self.cors = Some(cors);
    }

    /// 라우트를 등록합니다. 같은 경로에 겹치는 메서드가 있으면 실패합니다.
    pub fn add_route(&mut self, route: GeneratedRouteHandler) -> Result<(), RoutingError> {
        let pattern = pattern_for(&route.path, &route.kind)?;
        let normalized = pattern.normalized();

        for existing in &self.routes {
            if existing.pattern.normalized() != normalized {
                continue;
            }
            if let Some(method) = route.methods.iter().find(|m| existing.route.methods.contains(m)) {
                return Err(RoutingError::DuplicateRoute {
                    path: normalized,
                    method: method.to_string(),
                });
            }
        }

        debug!(path = %normalized, methods = ?route.methods, "라우트 등록");
        let allows_preflight = route.handler.contains("cors");
        self.routes.push(CompiledRoute {
            pattern,
            route,
            allows_preflight,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &GeneratedRouteHandler> {
        self.routes.iter().map(|r| &r.route)
    }

    /// 메서드와 경로로 라우트를 찾습니다. 여러 패턴이 일치하면 정적
    /// 세그먼트가 더 많은 쪽이 우선합니다.
    pub fn find(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let requested = HttpMethod::from_hyper(method);
        let mut best: Option<(&CompiledRoute, HashMap<String, String>)> = None;
        let mut allowed = BTreeSet::new();
        let mut path_matched = false;

        for compiled in &self.routes {
            let Some(params) = compiled.pattern.matches(path) else {
                continue;
            };
            path_matched = true;

            let accepts = match requested {
                Some(m) if compiled.route.methods.contains(&m) => true,
                Some(HttpMethod::Options) => compiled.allows_preflight,
                _ => false,
            };

            if !accepts {
                allowed.extend(compiled.route.methods.iter().copied());
                continue;
            }

            let better = best
                .as_ref()
                .map(|(current, _)| compiled.pattern.static_count() > current.pattern.static_count())
                .unwrap_or(true);
            if better {
                best = Some((compiled, params));
            }
        }

        match best {
            Some((compiled, params)) => RouteMatch::Found {
                route: &compiled.route,
                params,
            },
            None if path_matched => RouteMatch::MethodNotAllowed { allowed },
            None => RouteMatch::NotFound,
        }
    }

    /// 요청을 일치하는 라우트의 미들웨어 체인으로 전달합니다.
    pub async fn dispatch(&self, mut req: ApiRequest) -> Response {
        let mut response = match self.find(&req.method, &req.path) {
            RouteMatch::Found { route, params } => {
                debug!(
                    request_id = %req.request_id,
                    route = %route.normalized_path,
                    "라우트 매칭"
                );
                req.params = params;
                return route.handler.handle(req).await;
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                warn!(method = %req.method, path = %req.path, "허용되지 않은 메서드");
                let mut response = error_response(
                    StatusCode::METHOD_NOT_ALLOWED,
                    codes::METHOD_NOT_ALLOWED,
                    format!("Method {} not allowed for {}", req.method, req.path),
                );
                let allow = allowed
                    .iter()
                    .map(HttpMethod::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                response
            }
            RouteMatch::NotFound => {
                debug!(method = %req.method, path = %req.path, "일치하는 라우트 없음");
                error_response(
                    StatusCode::NOT_FOUND,
                    codes::NOT_FOUND,
                    format!("No route for {} {}", req.method, req.path),
                )
            }
        };

        if let Some(cors) = &self.cors {
            cors.set_cors_headers(response.headers_mut(), req.origin());
        }
        response
    }
}
