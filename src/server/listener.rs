use std::sync::Arc;

use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::handler::RequestHandler;
use super::Result;
use crate::settings::ServerSettings;

pub struct ServerListener {
    http_listener: TcpListener,
}

impl ServerListener {
    pub async fn new(settings: &ServerSettings) -> Result<Self> {
        let addr = settings.socket_addr();
        let http_listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(error = %e, port = settings.http_port, "HTTP 포트 바인딩 실패");
            e
        })?;

        info!(address = %addr, "HTTP 리스너 시작");
        Ok(Self { http_listener })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    pub async fn run(self, handler: Arc<RequestHandler>) -> Result<()> {
        loop {
            match self.http_listener.accept().await {
                Ok((stream, remote_addr)) => {
                    debug!(remote = %remote_addr, "연결 수락");
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        if let Err(err) = handler.handle_connection(io, remote_addr).await {
                            error!(error = %err, "HTTP 연결 처리 실패");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "HTTP 연결 수락 실패");
                }
            }
        }
    }
}
