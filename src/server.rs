//! Artifact HTTP server.
//!
//! Serves saved screenshots and logs as static files so external automation
//! can retrieve them. Request logging goes to stderr through the log facade;
//! stdout stays reserved for the JSON envelope.

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tower_http::services::ServeDir;

#[derive(Debug, Serialize)]
pub struct ServeReport {
    pub serving: String,
    pub host: String,
    pub port: u16,
    pub url: String,
}

/// Describe the server about to start; printed as the envelope before the
/// accept loop blocks.
pub fn describe(directory: &Path, host: &str, port: u16) -> ServeReport {
    ServeReport {
        serving: directory.display().to_string(),
        host: host.to_string(),
        port,
        url: format!("http://{host}:{port}/"),
    }
}

/// Serve `directory` until Ctrl-C, then shut down gracefully and return.
pub async fn serve(directory: PathBuf, host: &str, port: u16) -> Result<()> {
    let app = Router::new()
        .fallback_service(ServeDir::new(directory))
        .layer(middleware::from_fn(log_request));

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("interrupt received, shutting down artifact server");
        })
        .await
        .context("artifact server failed")?;

    Ok(())
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    log::info!("{} {} -> {}", method, uri, response.status());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_builds_url() {
        let report = describe(Path::new("/tmp/artifacts"), "127.0.0.1", 8000);
        assert_eq!(report.serving, "/tmp/artifacts");
        assert_eq!(report.url, "http://127.0.0.1:8000/");
        assert_eq!(report.port, 8000);
    }
}
