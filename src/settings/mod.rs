//! 서버 실행 설정 (TOML 파일 또는 환경 변수)

use std::env;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

mod api;
mod error;
pub mod logging;
mod server;
pub mod watcher;

pub use api::ApiSettings;
pub use error::SettingsError;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use server::{parse_env_var, ServerSettings};
pub use watcher::{ConfigEvent, ConfigWatcher};

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub logging: LogSettings,

    #[serde(default)]
    pub api: ApiSettings,
}

impl Settings {
    /// `API_SETTINGS_FILE`이 있으면 TOML 파일에서, 없으면 환경 변수에서 읽습니다.
    pub async fn load() -> Result<Self> {
        if let Ok(config_path) = env::var("API_SETTINGS_FILE") {
            Self::from_toml_file(&config_path).await
        } else {
            Self::from_env().await
        }
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SettingsError::FileError {
                path: path.to_string_lossy().to_string(),
                error: e,
            })?;

        let settings: Self = toml::from_str(&content)?;
        debug!(path = %path.display(), "설정 파일 로드");

        settings.validate()?;
        Ok(settings)
    }

    pub async fn from_env() -> Result<Self> {
        let settings = Self {
            server: ServerSettings::from_env()?,
            logging: LogSettings::from_env()?,
            api: ApiSettings::from_env()?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.api.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_settings_from_toml() {
        let toml_content = r#"
            [server]
            http_port = 9090
            max_body_bytes = 2048

            [logging]
            format = "json"
            level = "debug"

            [api]
            config_file = "/etc/api/api.json"
            base_path = "/v1"
            default_middleware = ["requestId", "logger"]
        "#;

        let settings: Settings = toml::from_str(toml_content).unwrap();
        assert_eq!(settings.server.http_port, 9090);
        assert_eq!(settings.server.max_body_bytes, 2048);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.api.base_path, "/v1");
        assert!(settings.api.strict);
        assert_eq!(settings.api.default_middleware, vec!["requestId", "logger"]);
    }

    #[tokio::test]
    async fn test_from_toml_file_validates() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[server]\nhttp_port = 0\n").unwrap();

        let result = Settings::from_toml_file(file.path()).await;
        assert!(matches!(result, Err(SettingsError::EnvVarInvalid { .. })));

        let missing = Settings::from_toml_file("/nonexistent/settings.toml").await;
        assert!(matches!(missing, Err(SettingsError::FileError { .. })));
    }
}
