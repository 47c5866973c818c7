pub mod auth;
pub mod chain;
pub mod cors;
pub mod error;
pub mod error_boundary;
pub mod logger;
pub mod manager;
pub mod rate_limit;
pub mod request_id;
pub mod response;
pub mod traits;

pub use auth::AuthMiddleware;
pub use chain::MiddlewareChain;
pub use error::MiddlewareError;
pub use error_boundary::ErrorBoundary;
pub use manager::{BuiltinMiddleware, MiddlewareManager};
pub use response::handle_middleware_error;
pub use traits::{Middleware, Next};
