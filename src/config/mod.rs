//! API 정의 파싱과 구조 검증

mod error;
mod parser;
mod schema;
mod types;
mod validator;

use std::path::Path;

use serde_json::Value;
use tracing::info;

pub use error::ConfigError;
pub use parser::{collapse_slashes, order_middleware, parse_api_config, parse_api_config_with, prefix_path};
pub use schema::API_CONFIG_SCHEMA;
pub use types::{
    AuthConfig, ConfigIssue, EndpointDescriptor, MiddlewareDefinition, ParseOptions,
    ParsedApiConfig, SchemaValidationResult,
};
pub use validator::{validate_api_endpoint, ConfigSchemaValidator, JsonSchemaValidator};

/// API 정의 파일을 읽어 JSON 값으로 반환합니다.
pub async fn load_api_config<P: AsRef<Path>>(path: P) -> Result<Value, ConfigError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    let value = serde_json::from_str(&content)?;
    info!(path = %path.display(), "API 정의 파일 로드");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_api_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"endpoints": []}}"#).unwrap();

        let value = load_api_config(file.path()).await.unwrap();
        assert!(value["endpoints"].is_array());

        let mut broken = NamedTempFile::new().unwrap();
        write!(broken, "{{").unwrap();
        assert!(matches!(load_api_config(broken.path()).await, Err(ConfigError::Parse(_))));

        assert!(matches!(
            load_api_config("/nonexistent/api.json").await,
            Err(ConfigError::FileRead { .. })
        ));
    }
}
