use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API 정의 파일 읽기 실패 ({path}): {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API 정의 JSON 파싱 실패: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("스키마 컴파일 실패: {reason}")]
    SchemaCompile { reason: String },
}
