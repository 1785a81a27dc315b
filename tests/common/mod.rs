#![allow(dead_code)]

use axum::Router;
use insightdeck_lib::api::ApiClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serve `app` on an ephemeral local port and return a client pointed at it.
pub async fn serve(app: Router) -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ApiClient::with_base_url(&format!("http://{}", addr)).unwrap()
}

/// Request counter shared with handlers.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
