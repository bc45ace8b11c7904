use capture_proxy::config::{Config, UpstreamEndpoint};
use capture_proxy::{CaptureListener, ListenerHandle, TargetKind};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const UPSTREAM_BODY: &[u8] = br#"{"status":"ok"}"#;

fn forwarding_config() -> Config {
    let mut config = Config::default();
    config.listener.host = "127.0.0.1".to_string();
    config.listener.port = 0;
    config.forwarding.enabled = true;
    config.forwarding.timeout_ms = 2000;
    config
}

async fn start(config: Config) -> ListenerHandle {
    CaptureListener::from_config(config)
        .expect("Failed to build listener")
        .bind()
        .await
        .expect("Failed to bind listener")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build client")
}

/// One-shot upstream that records the raw request it receives and answers
/// with a fixed JSON body.
async fn spawn_stub_upstream(expected_body: &'static [u8]) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&chunk[..n]);
            if received.ends_with(expected_body) {
                break;
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&received).into_owned());

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            UPSTREAM_BODY.len()
        );
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(UPSTREAM_BODY).await.unwrap();
    });

    (addr, rx)
}

#[tokio::test]
async fn test_vector_store_request_is_forwarded_after_capture() {
    let (upstream_addr, received) = spawn_stub_upstream(br#"{"points":[]}"#).await;

    let mut config = forwarding_config();
    config.upstreams.vector_store = UpstreamEndpoint::new("127.0.0.1", upstream_addr.port());
    let handle = start(config).await;

    let response = client()
        .post(format!(
            "http://{}/collections/test/points?wait=true",
            handle.local_addr()
        ))
        .header("api-key", "qdrant-secret-key")
        .body(r#"{"points":[]}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.bytes().await.unwrap().as_ref(), UPSTREAM_BODY);

    let upstream_request = received.await.unwrap();
    assert!(upstream_request.starts_with("POST /collections/test/points?wait=true HTTP/1.1"));
    assert!(upstream_request.contains("api-key: qdrant-secret-key"));
    assert!(upstream_request.ends_with(r#"{"points":[]}"#));

    let captured = handle.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].target(), TargetKind::VectorStore);
    assert_eq!(captured[0].body().as_ref(), br#"{"points":[]}"#);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_upstream_is_502_and_capture_kept() {
    // Reserve a port, then free it so nothing is listening there
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_port = unused.local_addr().unwrap().port();
    drop(unused);

    let mut config = forwarding_config();
    config.upstreams.embedding = UpstreamEndpoint::new("127.0.0.1", dead_port);
    let handle = start(config).await;

    let response = client()
        .post(format!("http://{}/api/embed", handle.local_addr()))
        .body(r#"{"input":"hello"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
    assert_eq!(
        response.text().await.unwrap(),
        "Request captured but upstream forwarding failed"
    );

    let captured = handle.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].target(), TargetKind::Embedding);
    assert!(handle
        .metrics()
        .encode_text()
        .contains(r#"capture_proxy_requests_failed_total{reason="forward"} 1"#));

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_unclassified_request_is_not_forwarded() {
    let mut config = forwarding_config();
    // Nothing listens here; an attempt to forward would surface as 502
    config.upstreams.embedding = UpstreamEndpoint::new("127.0.0.1", 1);
    config.upstreams.vector_store = UpstreamEndpoint::new("127.0.0.1", 1);
    let handle = start(config).await;

    let response = client()
        .get(format!("http://{}/health", handle.local_addr()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 501);
    assert_eq!(handle.captured().len(), 1);

    handle.stop().await.unwrap();
}
