use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{error, warn};
use std::path::Path;
use std::sync::Arc;

use crate::logger::LogFiles;
use crate::utils::escape_html;

/// Read-only view of the running configuration for the status page
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub region: Option<String>,
    pub url: String,
    pub selector: String,
    pub interval_secs: u64,
    pub logs: LogFiles,
}

pub fn router(info: StatusInfo) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/info", get(info_log))
        .route("/error", get(error_log))
        .with_state(Arc::new(info))
}

/// Serve the status routes on an already bound listener until the process exits
pub async fn serve(listener: tokio::net::TcpListener, info: StatusInfo) {
    if let Err(e) = axum::serve(listener, router(info)).await {
        error!("Status server stopped: {}", e);
    }
}

async fn index(State(info): State<Arc<StatusInfo>>) -> Html<String> {
    let region = info.region.as_deref().unwrap_or("unknown");
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>page_watch</title></head>
<body>
<h1>page_watch is running</h1>
<p>Region: {}</p>
<p>Watching <code>{}</code> at <a href="{}">{}</a> every {} s.</p>
<p><a href="/info">info log</a> | <a href="/error">error log</a></p>
</body>
</html>
"#,
        escape_html(region),
        escape_html(&info.selector),
        escape_html(&info.url),
        escape_html(&info.url),
        info.interval_secs
    ))
}

async fn info_log(State(info): State<Arc<StatusInfo>>) -> Response {
    serve_log(&info.logs.info).await
}

async fn error_log(State(info): State<Arc<StatusInfo>>) -> Response {
    serve_log(&info.logs.error).await
}

async fn serve_log(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(contents) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            contents,
        )
            .into_response(),
        Err(e) => {
            warn!("Cannot serve {}: {}", path.display(), e);
            (StatusCode::NOT_FOUND, "log file not available").into_response()
        }
    }
}
