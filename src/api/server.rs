//! API server lifecycle: bind, spawn the axum server in the background,
//! return a handle with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::lab_api_router;
use crate::api::types::ApiContext;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Handle to a running API server.
pub struct LabApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl LabApiServer {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait until the server task has exited.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Start the API server on `addr`. Port 0 binds an ephemeral port; the
/// actual address is on the returned handle.
pub async fn start_server_on(ctx: ApiContext, addr: SocketAddr) -> Result<LabApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = lab_api_router(ctx);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(LabApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use crate::api::types::{HealthResponse, LabTestsResponse};
    use crate::config::ServerConfig;
    use crate::pipeline::extraction::{LabReportExtractor, MockImagePreprocessor, MockOcrEngine};

    fn test_ctx() -> ApiContext {
        let extractor = LabReportExtractor::new(
            Box::new(MockImagePreprocessor::new()),
            Box::new(MockOcrEngine::new("Glucose: 92 mg/dL\n70 - 110")),
        );
        ApiContext::new(extractor, ServerConfig::default())
    }

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start_server_on(test_ctx(), localhost())
            .await
            .expect("server should start");
        assert!(server.port() > 0);

        let url = format!("http://127.0.0.1:{}/health", server.port());
        let health: HealthResponse = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(health.status, "healthy");

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn serves_multipart_upload() {
        let mut server = start_server_on(test_ctx(), localhost())
            .await
            .expect("server should start");

        let part = reqwest::multipart::Part::bytes(b"fake image".to_vec())
            .file_name("report.jpg")
            .mime_str("image/jpeg")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{}/get-lab-tests", server.port()))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let body: LabTestsResponse = resp.json().await.unwrap();
        assert!(body.is_success);
        assert_eq!(body.lab_tests.len(), 1);
        assert_eq!(body.lab_tests[0].test_name, "Glucose");
        assert_eq!(body.lab_tests[0].unit.as_deref(), Some("mg/dL"));

        server.shutdown();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let server = start_server_on(test_ctx(), localhost())
            .await
            .expect("server should start");
        let taken = server.addr;

        let result = start_server_on(test_ctx(), taken).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_server_on(test_ctx(), localhost())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown(); // Second call should be safe
    }
}
