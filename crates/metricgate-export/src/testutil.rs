//! A throwaway remote-write receiver for tests.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;

type Captured = Arc<Mutex<Vec<(HeaderMap, Vec<u8>)>>>;

pub struct Receiver {
    pub url: String,
    captured: Captured,
}

impl Receiver {
    pub fn requests(&self) -> Vec<(HeaderMap, Vec<u8>)> {
        self.captured.lock().unwrap().clone()
    }
}

async fn receive(
    State((captured, status)): State<(Captured, StatusCode)>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    captured.lock().unwrap().push((headers, body.to_vec()));
    let text = if status.is_success() { "" } else { "rejected" };
    (status, text)
}

/// Serve `POST /api/v1/write` on an ephemeral port, answering `status`.
pub async fn spawn_receiver(status: StatusCode) -> Receiver {
    let captured = Captured::default();
    let app = Router::new()
        .route("/api/v1/write", post(receive))
        .with_state((captured.clone(), status));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Receiver {
        url: format!("http://{addr}/api/v1/write"),
        captured,
    }
}
