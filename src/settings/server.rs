use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::Deserialize;

use super::SettingsError;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerSettings {
    /// HTTP 포트 (기본값: 8080)
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// 요청 본문 최대 크기 (바이트)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_http_port() -> u16 { 8080 }
fn default_bind_address() -> IpAddr { IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
fn default_max_body_bytes() -> usize { 1024 * 1024 }

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            http_port: parse_env_var("API_HTTP_PORT", default_http_port)?,
            bind_address: parse_env_var("API_BIND_ADDRESS", default_bind_address)?,
            max_body_bytes: parse_env_var("API_MAX_BODY_BYTES", default_max_body_bytes)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.http_port == 0 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "API_HTTP_PORT".to_string(),
                value: "0".to_string(),
                reason: "포트는 0이 될 수 없습니다".to_string(),
            });
        }

        if self.max_body_bytes == 0 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "API_MAX_BODY_BYTES".to_string(),
                value: "0".to_string(),
                reason: "본문 크기 제한은 0보다 커야 합니다".to_string(),
            });
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}
