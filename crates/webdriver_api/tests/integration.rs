use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use webdriver_api::{keys, BrowserOptions, WebDriverClient, WebDriverConfig};

fn allow_local_integration() -> bool {
    std::env::var("WEBDRIVER_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct Scripted {
    status: u16,
    body: String,
}

fn ok(value: serde_json::Value) -> Scripted {
    Scripted {
        status: 200,
        body: json!({ "value": value }).to_string(),
    }
}

fn fail(status: u16, error: &str, message: &str) -> Scripted {
    Scripted {
        status,
        body: json!({ "value": { "error": error, "message": message } }).to_string(),
    }
}

/// Records `METHOD /path body` for each request and replays scripted replies.
struct FakeDriver {
    endpoint: String,
    seen: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeDriver {
    async fn new(scripts: Vec<Scripted>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let endpoint = format!("http://{}", listener.local_addr().expect("address"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let scripts = Arc::new(Mutex::new(scripts.into_iter()));

        let handle = tokio::spawn({
            let seen = Arc::clone(&seen);
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let reply = scripts
                        .lock()
                        .expect("scripts")
                        .next()
                        .unwrap_or_else(|| fail(500, "unknown error", "unexpected request"));
                    serve_one(socket, reply, Arc::clone(&seen)).await;
                }
            }
        });

        Self {
            endpoint,
            seen,
            handle,
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("seen").clone()
    }
}

impl Drop for FakeDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn integration_session_lifecycle() {
    if !allow_local_integration() {
        return;
    }

    let driver = FakeDriver::new(vec![
        ok(json!({ "sessionId": "s1", "capabilities": {} })),
        ok(json!(null)),
        ok(json!([
            { "element-6066-11e4-a52e-4f735466cecf": "e1" },
            { "element-6066-11e4-a52e-4f735466cecf": "e2" }
        ])),
        ok(json!("Ops Team")),
        ok(json!(null)),
        ok(json!(null)),
    ])
    .await;
    let client = WebDriverClient::new(
        WebDriverConfig::new(&driver.endpoint).with_timeout(Duration::from_secs(5)),
    )
    .expect("client");

    let session = client
        .new_session(&BrowserOptions::default().headless(true))
        .await
        .expect("session");
    assert_eq!(session.id(), "s1");

    session
        .navigate("https://web.whatsapp.com")
        .await
        .expect("navigate");
    let found = session.find_elements("span[title]").await.expect("elements");
    assert_eq!(found.len(), 2);
    assert_eq!(
        session.element_text(&found[1]).await.expect("text"),
        "Ops Team"
    );
    session.send_keys(&found[0], keys::ENTER).await.expect("keys");
    session.delete().await.expect("delete");

    let seen = driver.seen();
    assert_eq!(seen.len(), 6);
    assert!(seen[0].starts_with("POST /session "));
    assert!(seen[1].starts_with("POST /session/s1/url "));
    assert!(seen[1].contains("web.whatsapp.com"));
    assert!(seen[2].contains(r#""using":"css selector""#));
    assert!(seen[3].starts_with("GET /session/s1/element/e2/text"));
    assert!(seen[4].starts_with("POST /session/s1/element/e1/value "));
    assert!(seen[5].starts_with("DELETE /session/s1"));
}

#[tokio::test]
async fn integration_missing_element_is_none_and_waits_expire() {
    if !allow_local_integration() {
        return;
    }

    let driver = FakeDriver::new(vec![
        fail(404, "no such element", "Unable to locate element"),
        ok(json!([])),
        ok(json!([])),
        ok(json!([])),
        ok(json!([])),
        ok(json!([])),
        ok(json!([])),
    ])
    .await;
    let client = WebDriverClient::new(
        WebDriverConfig::new(&driver.endpoint).with_poll_interval(Duration::from_millis(20)),
    )
    .expect("client");
    let session = client.attach("s2");

    assert_eq!(
        session.find_element("div[title='Type a message']").await.expect("lookup"),
        None
    );
    let waited = session
        .wait_for_elements("span[title]", Duration::from_millis(50))
        .await
        .expect("wait");
    assert!(waited.is_empty());
}

#[tokio::test]
async fn integration_protocol_errors_surface_code() {
    if !allow_local_integration() {
        return;
    }

    let driver = FakeDriver::new(vec![fail(
        404,
        "invalid session id",
        "session deleted because of page crash",
    )])
    .await;
    let client = WebDriverClient::new(WebDriverConfig::new(&driver.endpoint)).expect("client");

    let error = client
        .attach("gone")
        .refresh()
        .await
        .expect_err("protocol error");
    assert_eq!(error.code(), Some("invalid session id"));
    assert!(error.to_string().contains("page crash"));
}

async fn serve_one(mut socket: TcpStream, reply: Scripted, seen: Arc<Mutex<Vec<String>>>) {
    let Ok(request) = read_request(&mut socket).await else {
        return;
    };
    seen.lock().expect("seen").push(request);

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        if reply.status == 200 { "OK" } else { "Error" },
        reply.body.len(),
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    let _ = socket.write_all(reply.body.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Returns `METHOD /path body`.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
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

    let head = String::from_utf8_lossy(&request[..header_end]).to_string();
    let content_length = head
        .to_ascii_lowercase()
        .lines()
        .find_map(|line| line.strip_prefix("content-length:").map(str::to_owned))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }

    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();
    let body = String::from_utf8_lossy(&request[header_end..]);
    Ok(format!("{method} {path} {body}"))
}
