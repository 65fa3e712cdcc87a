use pretty_assertions::assert_eq;
use serde_json::json;
use webdriver_api::payload::{css_locator, new_session_body, script_body};
use webdriver_api::{BrowserOptions, Cookie, ElementRef, ELEMENT_KEY};

#[test]
fn new_session_body_carries_chrome_args() {
    let options = BrowserOptions::default()
        .headless(true)
        .with_user_data_dir("/tmp/wa-profile")
        .with_window_size(1280, 900)
        .with_arg("--lang=en");

    assert_eq!(
        new_session_body(&options),
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            "--headless=new",
                            "--user-data-dir=/tmp/wa-profile",
                            "--window-size=1280,900",
                            "--lang=en"
                        ]
                    }
                }
            }
        })
    );
}

#[test]
fn visible_browser_has_no_headless_arg_and_optional_binary() {
    let options = BrowserOptions::default().with_binary("/opt/chrome/chrome");
    let body = new_session_body(&options);
    let chrome = &body["capabilities"]["alwaysMatch"]["goog:chromeOptions"];
    assert_eq!(chrome["args"], json!([]));
    assert_eq!(chrome["binary"], "/opt/chrome/chrome");
}

#[test]
fn element_refs_use_the_w3c_key() {
    let element: ElementRef =
        serde_json::from_value(json!({ ELEMENT_KEY: "el-1", "ELEMENT": "el-1" })).expect("element");
    assert_eq!(element.id(), "el-1");
    assert_eq!(
        serde_json::to_value(&element).expect("serialize"),
        json!({ ELEMENT_KEY: "el-1" })
    );
}

#[test]
fn cookies_round_trip_camel_case_fields() {
    let wire = json!({
        "name": "wa_session",
        "value": "abc",
        "path": "/",
        "domain": ".web.whatsapp.com",
        "secure": true,
        "httpOnly": true,
        "expiry": 1_900_000_000u64,
        "sameSite": "Lax"
    });
    let cookie: Cookie = serde_json::from_value(wire.clone()).expect("cookie");
    assert_eq!(cookie.http_only, Some(true));
    assert_eq!(cookie.same_site.as_deref(), Some("Lax"));
    assert_eq!(serde_json::to_value(&cookie).expect("serialize"), wire);

    let minimal = serde_json::to_value(Cookie::new("a", "b")).expect("serialize");
    assert_eq!(minimal, json!({"name": "a", "value": "b"}));
}

#[test]
fn locator_and_script_bodies() {
    assert_eq!(
        css_locator("span[title]"),
        json!({"using": "css selector", "value": "span[title]"})
    );
    assert_eq!(
        script_body("return arguments[0];", &[json!(1)]),
        json!({"script": "return arguments[0];", "args": [1]})
    );
}
