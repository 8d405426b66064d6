use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use csdplay_core::catalog::ResourceCatalog;
use csdplay_core::provision::{FetchError, HttpResourceSource, ResourceProvisioner, ResourceSource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const PREFIX: &str = "/resources/SourceMaterials";

/// Serve canned files over HTTP/1.1; anything else is a 404.
async fn serve(files: HashMap<String, Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let files = files.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
                let (status, body) = match files.get(&path) {
                    Some(body) => ("200 OK", body.clone()),
                    None => ("404 Not Found", b"not found".to_vec()),
                };
                let header = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

fn files(entries: &[(&str, &[u8])]) -> HashMap<String, Vec<u8>> {
    entries
        .iter()
        .map(|(name, body)| (format!("{}/{}", PREFIX, name), body.to_vec()))
        .collect()
}

#[tokio::test]
async fn fetches_body_on_ok() {
    let base = serve(files(&[("fox.wav", &b"RIFF....WAVE"[..])])).await;
    let source = HttpResourceSource::new(&base, PREFIX, Duration::from_secs(5)).unwrap();

    assert_eq!(source.url_for("fox.wav"), format!("{}{}/fox.wav", base, PREFIX));
    assert_eq!(source.fetch("fox.wav").await.unwrap(), b"RIFF....WAVE".to_vec());
}

#[tokio::test]
async fn non_ok_status_is_an_error() {
    let base = serve(HashMap::new()).await;
    let source = HttpResourceSource::new(&base, PREFIX, Duration::from_secs(5)).unwrap();

    assert_eq!(source.fetch("piano.wav").await, Err(FetchError::Status(404)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = format!("http://{}", addr);
    let source = HttpResourceSource::new(&base, PREFIX, Duration::from_secs(5)).unwrap();
    assert!(matches!(
        source.fetch("fox.wav").await,
        Err(FetchError::Transport(_))
    ));
}

#[tokio::test]
async fn provisioner_over_http_skips_missing_and_renames() {
    let base = serve(files(&[
        ("circularstring-128", &[7u8; 128][..]),
        ("fox.wav", &b"fox"[..]),
    ]))
    .await;
    let with_slash = format!("{}/", base);
    let source = HttpResourceSource::new(&with_slash, PREFIX, Duration::from_secs(5)).unwrap();
    let catalog = Arc::new(ResourceCatalog::new(["circularstring", "fox.wav", "piano.wav"]));
    let provisioner = ResourceProvisioner::new(catalog, source);

    let doc = r#"giT ftgen 0, 0, 128, -23, "circularstring"
aL diskin2 "fox.wav", 1
aR diskin2 "piano.wav", 1"#;
    let fetched = provisioner.diff_and_fetch(doc, &HashSet::new()).await;

    let names: Vec<&str> = fetched.names().collect();
    assert_eq!(names, vec!["circularstring-128", "fox.wav"]);
    assert_eq!(fetched.get("circularstring-128").map(<[u8]>::len), Some(128));
    assert!(fetched.get("circularstring").is_none());
    assert!(fetched.get("piano.wav").is_none());
}
