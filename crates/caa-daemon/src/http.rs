use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// The last generated `latest.json`, `None` until the first good scrape.
pub type SharedDocument = Arc<RwLock<Option<String>>>;

pub fn router(document: SharedDocument) -> Router {
    Router::new()
        .route("/latest.json", get(get_latest))
        .route("/health", get(|| async { "ok" }))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(document)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    document: SharedDocument,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(document);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("Serving latest.json on http://{}/latest.json", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_latest(State(document): State<SharedDocument>) -> Response {
    match document.read().await.as_ref() {
        Some(body) => ([(header::CONTENT_TYPE, "application/json")], body.clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no songs scraped yet").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn serve(document: SharedDocument) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(document)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unavailable_until_first_scrape() {
        let document: SharedDocument = Arc::new(RwLock::new(None));
        let base = serve(document.clone()).await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{}/latest.json", base)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 503);

        *document.write().await = Some(r#"{"songs":[]}"#.to_string());
        let resp = client.get(format!("{}/latest.json", base)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(
            resp.headers().get("content-type").unwrap().to_str().unwrap(),
            "application/json"
        );
        assert_eq!(resp.text().await.unwrap(), r#"{"songs":[]}"#);
    }

    #[tokio::test]
    async fn test_health_and_cors() {
        let base = serve(Arc::new(RwLock::new(None))).await;
        let resp = reqwest::Client::new()
            .get(format!("{}/health", base))
            .header("Origin", "http://example.org")
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .unwrap()
                .to_str()
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_bind_failure_ends_task() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let handle = start_server("127.0.0.1".to_string(), port, Arc::new(RwLock::new(None)));
        handle.await.unwrap();
    }
}
