use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use super::{parse_env_var, SettingsError};
use crate::config::ParseOptions;

/// API 정의 파일과 파싱 옵션
#[derive(Clone, Debug, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,

    #[serde(default)]
    pub base_path: String,

    #[serde(default = "default_strict")]
    pub strict: bool,

    #[serde(default)]
    pub default_middleware: Vec<String>,

    /// 정의 파일이 바뀌면 라우팅 테이블을 다시 만듭니다.
    #[serde(default)]
    pub watch_config: bool,

    #[serde(default)]
    pub require_handlers: bool,
}

fn default_config_file() -> PathBuf { PathBuf::from("api.json") }
fn default_strict() -> bool { true }

impl ApiSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let default_middleware = env::var("API_DEFAULT_MIDDLEWARE")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let settings = Self {
            config_file: env::var("API_CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_config_file()),
            base_path: env::var("API_BASE_PATH").unwrap_or_default(),
            strict: parse_env_var("API_STRICT", default_strict)?,
            default_middleware,
            watch_config: parse_env_var("API_WATCH_CONFIG", || false)?,
            require_handlers: parse_env_var("API_REQUIRE_HANDLERS", || false)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.config_file.as_os_str().is_empty() {
            return Err(SettingsError::EnvVarMissing {
                var_name: "API_CONFIG_FILE".to_string(),
            });
        }

        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "API_BASE_PATH".to_string(),
                value: self.base_path.clone(),
                reason: "basePath는 '/'로 시작해야 합니다".to_string(),
            });
        }

        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict: self.strict,
            base_path: self.base_path.clone(),
            default_middleware: self.default_middleware.clone(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            config_file: default_config_file(),
            base_path: String::new(),
            strict: default_strict(),
            default_middleware: Vec::new(),
            watch_config: false,
            require_handlers: false,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" cors, logger ,,"), vec!["cors", "logger"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_base_path_validation() {
        let settings = ApiSettings {
            base_path: "api".to_string(),
            ..ApiSettings::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::EnvVarInvalid { .. })));

        let settings = ApiSettings {
            base_path: "/api".to_string(),
            ..ApiSettings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.parse_options().base_path, "/api");
    }
}
