//! HttpFeed against a local axum server serving canned `latest.json` bodies.

use axum::{http::StatusCode, routing::get, Router};
use caa_tui::feed::{FeedSource, FetchError, HttpFeed};
use tokio::net::TcpListener;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn fetches_and_converts_songs() {
    let base = serve(Router::new().route(
        "/latest.json",
        get(|| async {
            r#"{"songs":[
                {"timestamp":1400000300,"artist":"Stereolab","title":"Cybele's Reverie"},
                {"timestamp":1400000000,"artist":null,"title":"CAA Radio ID"}
            ]}"#
        }),
    ))
    .await;

    let feed = HttpFeed::new(format!("{}/latest.json", base), None).unwrap();
    let songs = feed.fetch_latest().await.unwrap();

    assert_eq!(songs.len(), 2);
    assert_eq!(songs[0].display(), "Stereolab \u{2013} Cybele's Reverie");
    assert_eq!(songs[0].timestamp.timestamp(), 1_400_000_300);
    assert!(songs[1].artist.is_none());
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let base = serve(Router::new().route(
        "/latest.json",
        get(|| async { (StatusCode::NOT_FOUND, "gone") }),
    ))
    .await;

    let feed = HttpFeed::new(format!("{}/latest.json", base), None).unwrap();
    match feed.fetch_latest().await {
        Err(FetchError::Status(status)) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected status error, got {:?}", other.map(|s| s.len())),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let base = serve(Router::new().route("/latest.json", get(|| async { r#"{"tracks":[]}"# })))
        .await;

    let feed = HttpFeed::new(format!("{}/latest.json", base), None).unwrap();
    assert!(matches!(feed.fetch_latest().await, Err(FetchError::Decode(_))));
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let feed = HttpFeed::new(format!("http://{}/latest.json", addr), None).unwrap();
    assert!(matches!(feed.fetch_latest().await, Err(FetchError::Request(_))));
}
