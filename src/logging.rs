use std::path::Path;
use std::time::Instant;

use tracing::{error, info, span, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 전역 tracing 구독자를 설치합니다.
///
/// 파일 출력이면 일 단위로 회전하는 파일에 기록하며, 반환된 가드가
/// 살아 있는 동안에만 버퍼가 비워집니다.
pub fn init_logging(settings: &LogSettings) -> Option<WorkerGuard> {
    let mut filter = EnvFilter::from_default_env().add_directive(settings.level.into());
    if let Ok(directive) = "api_compiler=debug".parse() {
        filter = filter.add_directive(directive);
    }

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "api_compiler.log".to_string());
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file))
        }
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let result = match settings.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    // 이미 구독자가 설치된 경우(테스트 등)에는 기존 것을 유지합니다.
    match result {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

/// 요청 하나의 처리 결과 기록
#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub host: String,
    pub route: Option<String>,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error: Option<String>,
    started: Instant,
}

impl RequestLog {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            method: String::new(),
            path: String::new(),
            host: String::new(),
            route: None,
            status_code: 0,
            duration_ms: 0,
            error: None,
            started: Instant::now(),
        }
    }

    pub fn with_request(&mut self, method: &hyper::Method, path: &str, host: Option<&str>) {
        self.method = method.to_string();
        self.path = path.to_string();
        self.host = host.unwrap_or_default().to_string();
    }

    pub fn with_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
        self.duration_ms = self.started.elapsed().as_millis() as u64;
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        self.error = Some(error.to_string());
    }
}

pub fn log_request(log: &RequestLog) {
    let level = if log.error.is_some() || log.status_code >= 500 {
        Level::ERROR
    } else if log.status_code >= 400 {
        Level::WARN
    } else {
        Level::INFO
    };

    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        method = %log.method,
        path = %log.path,
        host = %log.host,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(route = ?log.route, error = ?log.error, "요청 실패"),
        Level::WARN => warn!(route = ?log.route, "요청 완료 (클라이언트 오류)"),
        _ => info!(route = ?log.route, "요청 완료"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_log_records_outcome() {
        let mut log = RequestLog::new("req-1");
        log.with_request(&hyper::Method::GET, "/users", Some("api.local"));
        log.with_route("/users/{id?}");
        log.with_response(hyper::StatusCode::NOT_FOUND);

        assert_eq!(log.method, "GET");
        assert_eq!(log.host, "api.local");
        assert_eq!(log.status_code, 404);
        assert_eq!(log.route.as_deref(), Some("/users/{id?}"));
        assert!(log.error.is_none());
        log_request(&log);
    }
}
