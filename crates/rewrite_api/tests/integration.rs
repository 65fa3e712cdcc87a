use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use rewrite_api::{
    ChatCompletionRequest, ChatMessage, RewriteApiClient, RewriteApiConfig, RewriteApiError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

fn allow_local_integration() -> bool {
    std::env::var("REWRITE_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    body: String,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener.local_addr().expect("resolved listener address");
        let base_url = format!("http://{addr}/v1");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn respond(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        body: body.to_string(),
    }
}

fn completion(text: &str) -> ScriptedResponse {
    let body = serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    });
    respond(200, &body.to_string())
}

fn client_for(server: &ScriptedServer) -> RewriteApiClient {
    let config = RewriteApiConfig::new("sk-test")
        .with_base_url(&server.base_url)
        .with_timeout(Duration::from_secs(5));
    RewriteApiClient::new(config)
        .expect("client")
        .with_backoff(|_| Duration::ZERO)
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new("gpt-3.5-turbo", vec![ChatMessage::user("notes")])
        .with_temperature(0.2)
}

#[tokio::test]
async fn integration_completion_returns_trimmed_text() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![completion("  **Minutes**\n")]).await;
    let client = client_for(&server);

    let text = client
        .complete_text(&request(), None)
        .await
        .expect("completion");

    assert_eq!(text, "**Minutes**");
    assert_eq!(server.request_count(), 1);
    server.shutdown();
}

#[tokio::test]
async fn integration_transient_failures_are_retried() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        respond(503, r#"{"error":{"message":"overloaded"}}"#),
        respond(429, r#"{"error":{"message":"rate limit reached","code":"rate_limit_exceeded"}}"#),
        completion("done"),
    ])
    .await;
    let client = client_for(&server);

    let text = client
        .complete_text(&request(), None)
        .await
        .expect("completion after retries");

    assert_eq!(text, "done");
    assert_eq!(server.request_count(), 3);
    server.shutdown();
}

#[tokio::test]
async fn integration_retry_budget_is_bounded() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        respond(502, ""),
        respond(502, ""),
        respond(502, ""),
        respond(502, ""),
        completion("never reached"),
    ])
    .await;
    let client = client_for(&server);

    let error = client
        .complete_text(&request(), None)
        .await
        .expect_err("retries exhausted");

    match error {
        RewriteApiError::RetryExhausted {
            attempts, status, ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(status.map(|status| status.as_u16()), Some(502));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.request_count(), 4);
    server.shutdown();
}

#[tokio::test]
async fn integration_quota_and_auth_errors_fail_fast() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        respond(
            429,
            r#"{"error":{"message":"You exceeded your current quota","code":"insufficient_quota"}}"#,
        ),
        respond(401, r#"{"error":{"message":"Incorrect API key provided"}}"#),
    ])
    .await;
    let client = client_for(&server);

    let quota = client.complete_text(&request(), None).await;
    assert!(matches!(quota, Err(RewriteApiError::QuotaExhausted { .. })));

    let auth = client.complete_text(&request(), None).await;
    match auth {
        Err(RewriteApiError::Status(status, message)) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(server.request_count(), 2);
    server.shutdown();
}

#[tokio::test]
async fn integration_blank_completion_is_an_error() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![completion("   ")]).await;
    let client = client_for(&server);

    let result = client.complete_text(&request(), None).await;
    assert!(matches!(
        result,
        Err(RewriteApiError::EmptyCompletion { finish_reason: Some(ref reason) }) if reason == "stop"
    ));
    server.shutdown();
}

#[tokio::test]
async fn integration_cancellation_stops_before_sending() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![completion("unused")]).await;
    let client = client_for(&server);
    let cancel = Arc::new(AtomicBool::new(true));

    let result = timeout(
        Duration::from_secs(2),
        client.complete_text(&request(), Some(&cancel)),
    )
    .await
    .expect("cancellation is prompt");

    assert!(matches!(result, Err(RewriteApiError::Cancelled)));
    assert_eq!(server.request_count(), 0);
    server.shutdown();
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
) {
    if read_request(&mut socket).await.is_err() {
        return;
    }

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| respond(500, r#"{"error":{"message":"unexpected request"}}"#));

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_reason(response.status),
        response.body.len(),
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    let _ = socket.write_all(response.body.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Reads headers plus a `Content-Length` body.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(position) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }
    Ok(())
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
