//! CORS 미들웨어

mod config;
mod middleware;

pub use config::{CorsConfig, CorsOrigin};
pub use middleware::CorsMiddleware;
