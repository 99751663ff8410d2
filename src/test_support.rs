//! Local HTTP servers and scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, LazyLock, Mutex, Once};

use async_trait::async_trait;
use axum::Router;
use log::{LevelFilter, Log, Metadata, Record};

use crate::monitors::fetcher::{FetchError, Fetcher};
use crate::notifiers::{Ack, Notification, Notifier, NotifyError};

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{}", addr)
}

/// Base URL of a localhost port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{}", addr)
}

/// Wraps `fragment` in a page where it sits inside the watched button.
pub fn page_with(fragment: &str) -> String {
    format!(
        r#"<html><body><div class="hero"><a class="btn btn-primary btn-md bg-gradient-to-r" href="/register">{}</a></div></body></html>"#,
        fragment
    )
}

pub const WATCHED: &str = ".btn.btn-primary.btn-md.bg-gradient-to-r";

/// Fetcher answering from a script, one entry per call.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<VecDeque<Result<String, FetchError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<String, FetchError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("fetcher script exhausted")
    }
}

/// Notifier remembering every message it was asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<Ack, NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 401,
                message: "Authenticate".to_string(),
            });
        }
        Ok(Ack {
            sid: "SM-test".to_string(),
            status: "queued".to_string(),
        })
    }
}

/// Global logger keeping the text of every record, for asserting on log lines.
struct CaptureLogger {
    messages: Mutex<Vec<String>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.messages.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

static CAPTURE: LazyLock<CaptureLogger> = LazyLock::new(|| CaptureLogger {
    messages: Mutex::new(Vec::new()),
});
static INSTALL_CAPTURE: Once = Once::new();

pub fn capture_logs() {
    INSTALL_CAPTURE.call_once(|| {
        log::set_logger(&*CAPTURE).expect("no other global logger in tests");
        log::set_max_level(LevelFilter::Info);
    });
}

/// Messages logged so far by any test in this process.
pub fn captured_logs() -> Vec<String> {
    CAPTURE.messages.lock().unwrap().clone()
}
