//! 선언적 API 컴파일러
//!
//! 엔드포인트, 메서드, 검증 규칙, 미들웨어, 인증/CORS 정책을 담은 JSON 정의를
//! 실제 요청 핸들러로 바꿉니다. 각 핸들러는 고정된 순서의 미들웨어 체인으로
//! 감싸지고, 모든 응답은 같은 JSON 봉투 형식을 가집니다.
//!
//! # 예제
//!
//! ```
//! use api_compiler::compiler::ApiCompiler;
//! use api_compiler::config::ParseOptions;
//! use serde_json::json;
//!
//! let definition = json!({
//!     "endpoints": [
//!         {"path": "/users", "methods": ["GET", "POST"], "handler": "users"},
//!         {"path": "/reports/daily", "methods": ["GET"], "handler": "dailyReport"}
//!     ],
//!     "cors": {"origin": "*"}
//! });
//!
//! let table = ApiCompiler::new(ParseOptions::default().with_base_path("/api"))
//!     .build_table(&definition)
//!     .unwrap();
//! assert_eq!(table.len(), 2);
//! ```

pub mod compiler;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod response;
pub mod routing;
pub mod server;
pub mod settings;
pub mod validation;
