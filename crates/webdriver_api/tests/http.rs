use reqwest::Method;
use serde_json::json;
use webdriver_api::{BrowserOptions, WebDriverClient, WebDriverConfig};

fn client() -> WebDriverClient {
    WebDriverClient::new(WebDriverConfig::new("http://127.0.0.1:9515/")).expect("client")
}

#[test]
fn new_session_posts_capabilities_to_session_root() {
    let request = client()
        .build_new_session(&BrowserOptions::default().headless(true))
        .build()
        .expect("request");

    assert_eq!(request.method(), "POST");
    assert_eq!(request.url().as_str(), "http://127.0.0.1:9515/session");
    let body: serde_json::Value = serde_json::from_slice(
        request
            .body()
            .and_then(|body| body.as_bytes())
            .expect("buffered body"),
    )
    .expect("json");
    assert_eq!(
        body["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"],
        json!(["--headless=new"])
    );
}

#[test]
fn session_commands_are_scoped_under_session_id() {
    let session = client().attach("s-42");

    let navigate = session
        .build_command(Method::POST, "url", Some(&json!({"url": "https://web.whatsapp.com"})))
        .build()
        .expect("request");
    assert_eq!(
        navigate.url().as_str(),
        "http://127.0.0.1:9515/session/s-42/url"
    );
    assert_eq!(navigate.headers()["content-type"], "application/json");

    let delete = session
        .build_command(Method::DELETE, "", None)
        .build()
        .expect("request");
    assert_eq!(delete.method(), "DELETE");
    assert_eq!(delete.url().as_str(), "http://127.0.0.1:9515/session/s-42");
    assert!(delete.body().is_none());
}

#[test]
fn invalid_endpoint_is_rejected() {
    assert!(WebDriverClient::new(WebDriverConfig::new("not a url")).is_err());
}
