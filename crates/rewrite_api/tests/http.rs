use rewrite_api::{
    normalize_completions_url, ChatCompletionRequest, ChatMessage, RewriteApiClient,
    RewriteApiConfig, RewriteApiError,
};

#[test]
fn http_request_targets_completions_endpoint() {
    let config = RewriteApiConfig::new("sk-test").with_base_url("https://llm.internal/v1/");
    let client = RewriteApiClient::new(config).expect("client");
    let request = ChatCompletionRequest::new(
        "gpt-3.5-turbo",
        vec![ChatMessage::system("sys"), ChatMessage::user("notes")],
    );

    let http_request = client
        .build_request(&request)
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(
        http_request.url().as_str(),
        normalize_completions_url("https://llm.internal/v1")
    );
    assert_eq!(http_request.method(), "POST");
}

#[test]
fn http_headers_carry_bearer_organization_and_extras() {
    let config = RewriteApiConfig::new("  sk-test  ")
        .with_organization("org-1")
        .insert_header("X-Trace", "abc");
    let client = RewriteApiClient::new(config).expect("client");
    let headers = client.build_headers().expect("headers");

    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert_eq!(headers["openai-organization"], "org-1");
    assert_eq!(headers["x-trace"], "abc");
    assert!(headers["user-agent"]
        .to_str()
        .expect("ascii")
        .starts_with("mom_relay/"));
}

#[test]
fn http_headers_require_api_key() {
    let client = RewriteApiClient::new(RewriteApiConfig::new(" ")).expect("client");
    assert!(matches!(
        client.build_headers(),
        Err(RewriteApiError::MissingApiKey)
    ));
}

#[test]
fn http_headers_reject_invalid_extra_header() {
    let config = RewriteApiConfig::new("sk-test").insert_header("bad header", "x");
    let client = RewriteApiClient::new(config).expect("client");
    assert!(matches!(
        client.build_headers(),
        Err(RewriteApiError::InvalidHeader(_))
    ));
}
