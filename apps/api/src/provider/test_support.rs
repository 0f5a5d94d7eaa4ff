// Local stand-ins for vendor APIs, served by axum on an ephemeral port.

use std::sync::{Arc, Mutex};

use axum::Router;
use bytes::Bytes;

use crate::extraction::document::PdfDocument;
use crate::provider::ApiCredential;

/// Serves `router` on 127.0.0.1 and returns its base URL.
pub(crate) async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Ordered log of the calls a stub received, e.g. "POST /files".
#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub(crate) fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub(crate) fn sample_pdf() -> PdfDocument {
    PdfDocument::new(
        "benefits.pdf",
        Some("application/pdf".to_string()),
        Bytes::from_static(b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF"),
    )
}

pub(crate) fn credential() -> ApiCredential {
    ApiCredential::new("sk-test").unwrap()
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}
