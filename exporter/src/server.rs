use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use nodestat_core::{
    export::{encode_text, Registry, TEXT_FORMAT},
    Config,
};
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    registry: Registry,
    metrics_path: String,
}

async fn handle_metrics(State(state): State<AppState>) -> Response {
    // collection reads files synchronously; keep it off the async workers
    let registry = state.registry.clone();
    match tokio::task::spawn_blocking(move || encode_text(&registry)).await {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "metrics collection task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html><head><title>nodestat</title></head><body>\
         <h1>nodestat</h1><p><a href=\"{path}\">Metrics</a></p></body></html>",
        path = state.metrics_path
    ))
}

pub fn build_router(registry: Registry, metrics_path: &str) -> Router {
    let state = AppState {
        registry,
        metrics_path: metrics_path.to_string(),
    };
    Router::new()
        .route("/", get(handle_index))
        .route(metrics_path, get(handle_metrics))
        .with_state(state)
}

/// Serve the registry until Ctrl-C
pub async fn run_server(config: &Config, registry: Registry) -> anyhow::Result<()> {
    let app = build_router(registry, &config.metrics_path);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, path = %config.metrics_path, "serving metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use nodestat_core::{export::new_registry, MetricsCollector, ProcFs};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(proc_root: &std::path::Path) -> Router {
        let collector = Arc::new(MetricsCollector::new(&ProcFs::new(proc_root)));
        build_router(new_registry(collector).unwrap(), "/metrics")
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("uptime"), "12345.67 98765.43\n").unwrap();
        std::fs::write(dir.path().join("loadavg"), "0.52 0.58 0.59 2/1034 48213\n").unwrap();

        let (status, body) = get_body(router(dir.path()), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("node_uptime_seconds 12345.67"));
        assert!(body.contains("node_load15 0.59"));
        assert!(body.contains("node_collect_duration_seconds_total"));
        assert!(!body.contains("node_cpu_seconds_total{"));
    }

    #[tokio::test]
    async fn test_index_links_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_body(router(dir.path()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get_body(router(dir.path()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
