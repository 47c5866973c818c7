use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::handler::RequestHandler;
use super::listener::ServerListener;
use super::Result;
use crate::compiler::{ApiCompiler, CompileOptions};
use crate::routing::RouteTable;
use crate::settings::{ConfigWatcher, Settings};

/// 라우팅 테이블을 만들고 HTTP 리스너와 정의 파일 감시를 실행합니다.
pub struct ServerManager {
    pub settings: Settings,
    pub routing_table: Arc<RwLock<RouteTable>>,
    compiler: Arc<ApiCompiler>,
}

impl ServerManager {
    pub fn new(settings: Settings, compiler: ApiCompiler, table: RouteTable) -> Self {
        Self {
            settings,
            routing_table: Arc::new(RwLock::new(table)),
            compiler: Arc::new(compiler),
        }
    }

    /// 설정으로 컴파일러를 만들고 정의 파일을 컴파일합니다.
    pub async fn with_defaults(settings: Settings) -> Result<Self> {
        let compiler = ApiCompiler::new(settings.api.parse_options()).with_options(CompileOptions {
            require_handlers: settings.api.require_handlers,
            ..CompileOptions::default()
        });
        Self::with_compiler(settings, compiler).await
    }

    /// 핸들러와 미들웨어가 등록된 컴파일러로 시작합니다.
    pub async fn with_compiler(settings: Settings, compiler: ApiCompiler) -> Result<Self> {
        let table = compiler
            .compile_file(&settings.api.config_file)
            .await
            .map_err(|e| {
                error!(error = %e, path = %settings.api.config_file.display(), "API 정의 컴파일 실패");
                e
            })?;

        Ok(Self::new(settings, compiler, table))
    }

    pub async fn run(self) -> Result<()> {
        let listener = ServerListener::new(&self.settings.server).await?;
        let handler = Arc::new(RequestHandler::new(
            self.routing_table.clone(),
            self.settings.server.max_body_bytes,
        ));

        if self.settings.api.watch_config {
            self.spawn_watcher();
        }

        listener.run(handler).await
    }

    fn spawn_watcher(&self) {
        let mut watcher = ConfigWatcher::new(&self.settings.api.config_file);
        if let Err(e) = watcher.start() {
            error!(error = %e, "API 정의 파일 감시 시작 실패");
            return;
        }
        info!(path = %watcher.target().display(), "API 정의 파일 감시 시작");

        let compiler = self.compiler.clone();
        let routing_table = self.routing_table.clone();
        tokio::spawn(async move {
            while let Some(event) = watcher.watch().await {
                if !event.requires_reload() {
                    warn!(path = %event.path().display(), "API 정의 파일 삭제됨, 기존 라우트 유지");
                    continue;
                }
                reload(&compiler, &routing_table, watcher.target()).await;
            }
        });
    }
}

/// 정의 파일을 다시 컴파일하고 성공하면 라우팅 테이블을 교체합니다.
/// 실패하면 기존 테이블을 유지합니다.
pub async fn reload(
    compiler: &ApiCompiler,
    routing_table: &RwLock<RouteTable>,
    path: &std::path::Path,
) -> bool {
    match compiler.compile_file(path).await {
        Ok(table) => {
            let routes = table.len();
            *routing_table.write().await = table;
            info!(routes, "라우팅 테이블 갱신 완료");
            true
        }
        Err(e) => {
            error!(error = %e, "API 정의 재컴파일 실패, 기존 라우트 유지");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_reload_keeps_table_on_failure() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"endpoints": [{{"path": "/users", "methods": ["GET"], "handler": "users"}}]}}"#
        )
        .unwrap();

        let compiler = ApiCompiler::new(ParseOptions::default());
        let table = RwLock::new(RouteTable::new());

        assert!(reload(&compiler, &table, file.path()).await);
        assert_eq!(table.read().await.len(), 1);

        let mut broken = NamedTempFile::new().unwrap();
        write!(broken, r#"{{"endpoints": [{{"path": "users"}}]}}"#).unwrap();
        assert!(!reload(&compiler, &table, broken.path()).await);
        assert_eq!(table.read().await.len(), 1);
    }
}
