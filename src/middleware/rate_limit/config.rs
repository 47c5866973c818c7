use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 요청을 묶는 기준
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyBy {
    /// Host 헤더
    #[default]
    Host,
    /// 클라이언트 IP (X-Forwarded-For, X-Real-IP, 연결 주소 순)
    Ip,
    /// 지정한 헤더 값
    Header(String),
}

impl FromStr for KeyBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(KeyBy::Host),
            "ip" => Ok(KeyBy::Ip),
            other => match other.strip_prefix("header:") {
                Some(name) if !name.trim().is_empty() => {
                    Ok(KeyBy::Header(name.trim().to_ascii_lowercase()))
                }
                _ => Err(format!("Invalid keyBy value: {}", s)),
            },
        }
    }
}

impl fmt::Display for KeyBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyBy::Host => f.write_str("host"),
            KeyBy::Ip => f.write_str("ip"),
            KeyBy::Header(name) => write!(f, "header:{}", name),
        }
    }
}

impl Serialize for KeyBy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyBy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Rate Limit 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// 윈도 길이 (밀리초)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// 윈도당 최대 요청 수
    #[serde(default = "default_max_requests", alias = "max")]
    pub max_requests: u64,

    #[serde(default)]
    pub key_by: KeyBy,
}

fn default_window_ms() -> u64 {
    60_000 // 기본값: 1분
}

fn default_max_requests() -> u64 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            key_by: KeyBy::default(),
        }
    }
}

impl RateLimitConfig {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }
}
