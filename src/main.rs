use api_compiler::logging::init_logging;
use api_compiler::server::ServerManager;
use api_compiler::settings::Settings;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let settings = match Settings::load().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&settings.logging);
    info!(
        config_file = %settings.api.config_file.display(),
        port = settings.server.http_port,
        "API 서버 시작"
    );

    let manager = match ServerManager::with_defaults(settings).await {
        Ok(manager) => manager,
        Err(e) => {
            error!(error = %e, "서버 초기화 실패");
            std::process::exit(1);
        }
    };

    if let Err(e) = manager.run().await {
        error!(error = %e, "서버 실행 실패");
        std::process::exit(1);
    }
}
