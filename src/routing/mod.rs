//! 라우트 분류와 요청 매칭을 담당하는 모듈입니다.

pub mod classifier;
mod error;
mod method;
mod path;
pub mod table;

pub use classifier::{
    classify, extract_resource_name, is_crud_pattern, map_methods_to_crud_operations,
    CrudOperation, RouteKind,
};
pub use error::RoutingError;
pub use method::HttpMethod;
pub use path::{RoutePattern, Segment};
pub use table::{RouteMatch, RouteTable};
