//! 파싱된 API 정의를 라우트 핸들러로 조립합니다.
//!
//! 각 엔드포인트의 체인은 바깥쪽부터 다음 순서로 고정됩니다.
//!
//! 1. `ErrorBoundary`
//! 2. 이름으로 지정된 미들웨어 (엔드포인트 선언 순서, 그다음 전역 목록, 중복 제거)
//! 3. 인증 (`auth`가 있을 때)
//! 4. 요청 검증 (`validation`이 있을 때)
//! 5. 최종 핸들러 (CRUD 디스패처, 등록된 핸들러 또는 플레이스홀더)

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::{
    load_api_config, parse_api_config_with, ConfigError, ConfigIssue, ConfigSchemaValidator,
    EndpointDescriptor, JsonSchemaValidator, ParseOptions, ParsedApiConfig,
};
use crate::handlers::{
    CatchingHandler, CrudDispatcher, HandlerRegistry, PlaceholderHandler, RouteHandler,
};
use crate::middleware::cors::CorsMiddleware;
use crate::middleware::{
    AuthMiddleware, BuiltinMiddleware, ErrorBoundary, Middleware, MiddlewareChain, MiddlewareManager,
};
use crate::routing::table::pattern_for;
use crate::routing::{classify, HttpMethod, RouteKind, RouteTable, RoutingError};
use crate::validation::{ValidationMiddleware, ValidationOptions};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("API 정의 오류 {}건: {}", .errors.len(), join_issues(.errors))]
    Configuration { errors: Vec<ConfigIssue> },

    #[error("핸들러를 찾을 수 없음: {handler} (경로: {path})")]
    UnresolvedHandler { handler: String, path: String },

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 엔드포인트 하나에 대해 생성된 핸들러
#[derive(Clone)]
pub struct GeneratedRouteHandler {
    pub handler: Arc<MiddlewareChain>,
    /// 선언된 메서드와 정확히 같습니다.
    pub methods: Vec<HttpMethod>,
    pub path: String,
    /// 체인에 실제로 들어간 미들웨어 이름 (바깥쪽부터)
    pub middleware: Vec<String>,
    pub original_path: String,
    /// `{name}` 문법으로 정규화된 경로
    pub normalized_path: String,
    pub kind: RouteKind,
}

impl std::fmt::Debug for GeneratedRouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedRouteHandler")
            .field("methods", &self.methods)
            .field("path", &self.path)
            .field("middleware", &self.middleware)
            .field("normalized_path", &self.normalized_path)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// 등록되지 않은 핸들러 이름을 플레이스홀더 대신 에러로 처리합니다.
    pub require_handlers: bool,
    pub strict_validation: bool,
    pub allow_unknown_fields: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            require_handlers: false,
            strict_validation: false,
            allow_unknown_fields: true,
        }
    }
}

pub struct ApiCompiler {
    parse_options: ParseOptions,
    options: CompileOptions,
    handlers: HandlerRegistry,
    middleware: Vec<(String, Arc<dyn Middleware>)>,
    validator: Option<Arc<dyn ConfigSchemaValidator>>,
}

impl ApiCompiler {
    pub fn new(parse_options: ParseOptions) -> Self {
        Self {
            parse_options,
            options: CompileOptions::default(),
            handlers: HandlerRegistry::new(),
            middleware: Vec::new(),
            validator: None,
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_handler(mut self, name: impl Into<String>, handler: Arc<dyn RouteHandler>) -> Self {
        self.handlers.register(name, handler);
        self
    }

    /// 이름으로 참조할 수 있는 사용자 정의 미들웨어를 추가합니다.
    pub fn with_middleware(mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push((name.into(), middleware));
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ConfigSchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// 원본 정의를 파싱합니다. 에러가 있으면 라우트를 만들지 않습니다.
    pub fn parse(&self, raw: &serde_json::Value) -> Result<ParsedApiConfig, CompileError> {
        let parsed = match &self.validator {
            Some(validator) => parse_api_config_with(raw, &self.parse_options, validator.as_ref()),
            None => {
                let validator = JsonSchemaValidator::new()?;
                parse_api_config_with(raw, &self.parse_options, &validator)
            }
        };

        for warning in &parsed.warnings {
            warn!(issue = %warning, "API 정의 경고");
        }

        if !parsed.is_valid() {
            for issue in &parsed.errors {
                error!(issue = %issue, "API 정의 오류");
            }
            return Err(CompileError::Configuration {
                errors: parsed.errors,
            });
        }

        Ok(parsed)
    }

    /// 엔드포인트마다 미들웨어 체인을 조립합니다.
    pub fn generate(&self, parsed: &ParsedApiConfig) -> Result<Vec<GeneratedRouteHandler>, CompileError> {
        let mut manager = MiddlewareManager::from_parsed(parsed);
        for (name, middleware) in &self.middleware {
            manager.register(name.clone(), middleware.clone());
        }

        parsed
            .endpoints
            .iter()
            .map(|endpoint| self.generate_one(endpoint, parsed, &mut manager))
            .collect()
    }

    fn generate_one(
        &self,
        endpoint: &EndpointDescriptor,
        parsed: &ParsedApiConfig,
        manager: &mut MiddlewareManager,
    ) -> Result<GeneratedRouteHandler, CompileError> {
        let kind = classify(endpoint);
        let terminal = self.terminal_for(endpoint, &kind)?;
        let mut chain = MiddlewareChain::new(Arc::new(CatchingHandler::new(
            endpoint.handler.clone(),
            terminal,
        )));

        chain.add(ErrorBoundary);

        for name in named_middleware(endpoint, parsed) {
            if let Some(middleware) = manager.resolve(&name) {
                chain.add_shared(middleware);
            }
        }

        match (&endpoint.auth, &parsed.auth_config) {
            (Some(auth), _) => chain.add(AuthMiddleware::new(auth.clone())),
            (None, Some(auth)) if !chain.contains(AuthMiddleware::NAME) => {
                chain.add(AuthMiddleware::new(auth.clone()))
            }
            _ => {}
        }

        if let Some(schema) = endpoint.validation.as_ref().filter(|s| !s.is_empty()) {
            chain.add(ValidationMiddleware::new(ValidationOptions {
                schema: schema.clone(),
                strict: self.options.strict_validation,
                allow_unknown: self.options.allow_unknown_fields,
            }));
        }

        let normalized_path = pattern_for(&endpoint.path, &kind)?.normalized();
        let middleware = chain.names().into_iter().map(String::from).collect();

        debug!(
            path = %endpoint.path,
            normalized = %normalized_path,
            crud = kind.is_crud(),
            middleware = ?chain.names(),
            "라우트 핸들러 생성"
        );

        Ok(GeneratedRouteHandler {
            handler: Arc::new(chain),
            methods: endpoint.methods.clone(),
            path: endpoint.path.clone(),
            middleware,
            original_path: endpoint.original_path.clone(),
            normalized_path,
            kind,
        })
    }

    fn terminal_for(
        &self,
        endpoint: &EndpointDescriptor,
        kind: &RouteKind,
    ) -> Result<Arc<dyn RouteHandler>, CompileError> {
        match kind {
            RouteKind::Crud { resource, id_param, .. } => {
                Ok(Arc::new(CrudDispatcher::new(resource.clone(), id_param.clone())))
            }
            RouteKind::Custom { handler } => match self.handlers.get(handler) {
                Some(registered) => Ok(registered),
                None if self.options.require_handlers => Err(CompileError::UnresolvedHandler {
                    handler: handler.clone(),
                    path: endpoint.path.clone(),
                }),
                None => {
                    debug!(handler = %handler, path = %endpoint.path, "등록된 핸들러 없음, 플레이스홀더 사용");
                    Ok(Arc::new(PlaceholderHandler::new(endpoint.path.clone(), handler.clone())))
                }
            },
        }
    }

    /// 원본 정의로부터 라우팅 테이블을 만듭니다.
    pub fn build_table(&self, raw: &serde_json::Value) -> Result<RouteTable, CompileError> {
        let parsed = self.parse(raw)?;
        let mut table = RouteTable::new();
        if let Some(cors) = &parsed.cors_config {
            table.set_cors(Arc::new(CorsMiddleware::new(cors.clone())));
        }
        for route in self.generate(&parsed)? {
            table.add_route(route)?;
        }
        info!(routes = table.len(), "라우팅 테이블 생성 완료");
        Ok(table)
    }

    pub async fn compile_file<P: AsRef<Path>>(&self, path: P) -> Result<RouteTable, CompileError> {
        let raw = load_api_config(path).await?;
        self.build_table(&raw)
    }
}

/// 엔드포인트 미들웨어, 최상위 cors, 전역 미들웨어 순으로 합치고 중복을 제거합니다.
/// 엔드포인트가 자체 auth 블록을 가지면 공유 auth 인스턴스는 빠집니다.
fn named_middleware(endpoint: &EndpointDescriptor, parsed: &ParsedApiConfig) -> Vec<String> {
    let cors = parsed
        .cors_config
        .as_ref()
        .map(|_| CorsMiddleware::NAME.to_string());

    let mut seen = HashSet::new();
    cors.into_iter()
        .chain(endpoint.middleware.iter().cloned())
        .chain(parsed.global_middleware.iter().cloned())
        .filter(|name| {
            endpoint.auth.is_none()
                || BuiltinMiddleware::from_name(name) != Some(BuiltinMiddleware::Auth)
        })
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
