//! Minimal W3C WebDriver client.
//!
//! Only the handful of endpoints needed for page capture are implemented:
//! session creation, navigation, window sizing, anchor lookup and screenshots.
//! The session is deleted when the client is dropped.

use base64::Engine;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Agent;

use super::backend::BrowserDriver;
use super::types::{SnapshotError, SnapshotResult};

/// Key under which WebDriver returns element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Upper bound for a single WebDriver round trip (page loads included)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Delete,
}

/// A live WebDriver session
pub struct WebDriverSession {
    agent: Agent,
    endpoint: String,
    session_id: String,
}

impl WebDriverSession {
    /// Open a new browser session on the given WebDriver endpoint
    pub fn connect(endpoint: &str, browser: &str) -> SnapshotResult<Self> {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        let agent: Agent = config.into();
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": { "browserName": browser }
            }
        });
        let value = execute(
            &agent,
            Method::Post,
            &format!("{}/session", endpoint),
            Some(&capabilities),
        )?;

        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| SnapshotError::Driver("session response has no sessionId".to_string()))?
            .to_string();
        debug!(%session_id, %browser, "webdriver session created");

        Ok(Self {
            agent,
            endpoint,
            session_id,
        })
    }

    /// Identifier assigned by the WebDriver endpoint
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn call(&self, method: Method, path: &str, body: Option<&Value>) -> SnapshotResult<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        execute(&self.agent, method, &url, body)
    }
}

impl BrowserDriver for WebDriverSession {
    fn resize_viewport(&mut self, width: u32, height: u32) -> SnapshotResult<()> {
        let body = json!({ "width": width, "height": height });
        self.call(Method::Post, "/window/rect", Some(&body))?;
        Ok(())
    }

    fn load_page(&mut self, url: &str) -> SnapshotResult<()> {
        self.call(Method::Post, "/url", Some(&json!({ "url": url })))?;
        Ok(())
    }

    fn find_anchor_hrefs(&mut self) -> SnapshotResult<Vec<String>> {
        let query = json!({ "using": "css selector", "value": "a" });
        let elements = self.call(Method::Post, "/elements", Some(&query))?;
        let elements = elements
            .as_array()
            .ok_or_else(|| SnapshotError::Driver("element lookup did not return a list".to_string()))?;

        let mut hrefs = Vec::with_capacity(elements.len());
        for element in elements {
            let id = element[ELEMENT_KEY]
                .as_str()
                .ok_or_else(|| SnapshotError::Driver("element reference without id".to_string()))?;
            // The href property is the resolved absolute URL; anchors without one yield null
            let href = self.call(Method::Get, &format!("/element/{}/property/href", id), None)?;
            if let Some(href) = href.as_str() {
                hrefs.push(href.to_string());
            }
        }
        Ok(hrefs)
    }

    fn screenshot(&mut self) -> SnapshotResult<Vec<u8>> {
        let encoded = self.call(Method::Get, "/screenshot", None)?;
        let encoded = encoded
            .as_str()
            .ok_or_else(|| SnapshotError::Driver("screenshot response is not a string".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SnapshotError::Driver(format!("invalid screenshot encoding: {}", e)))
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        match self.call(Method::Delete, "", None) {
            Ok(_) => debug!(session_id = %self.session_id, "webdriver session closed"),
            Err(e) => warn!(session_id = %self.session_id, "could not close webdriver session: {}", e),
        }
    }
}

/// Perform one WebDriver command and unwrap its `value` field.
///
/// WebDriver reports failures as a non-2xx status with a JSON body
/// `{"value": {"error": ..., "message": ...}}`; those become driver errors.
fn execute(agent: &Agent, method: Method, url: &str, body: Option<&Value>) -> SnapshotResult<Value> {
    let empty = json!({});
    let mut response = match method {
        Method::Get => agent.get(url).call()?,
        Method::Delete => agent.delete(url).call()?,
        Method::Post => agent.post(url).send_json(body.unwrap_or(&empty))?,
    };

    let status = response.status();
    let payload: Value = response.body_mut().read_json().map_err(|e| {
        SnapshotError::Driver(format!("unreadable response from {} ({}): {}", url, status, e))
    })?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        return Err(SnapshotError::Driver(format!("{}: {}", error, message)));
    }
    if !status.is_success() {
        return Err(SnapshotError::Driver(format!("{} returned {}", url, status)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Mock, Server, ServerGuard};

    // Mocks are removed from the server when dropped, so they travel with the driver
    fn session(server: &mut ServerGuard) -> (WebDriverSession, Vec<Mock>) {
        let created = server
            .mock("POST", "/session")
            .match_body(Matcher::PartialJson(json!({
                "capabilities": { "alwaysMatch": { "browserName": "chrome" } }
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"value":{"sessionId":"s1","capabilities":{}}}"#)
            .create();
        let deleted = server
            .mock("DELETE", "/session/s1")
            .with_body(r#"{"value":null}"#)
            .create();
        let driver = WebDriverSession::connect(&server.url(), "chrome").unwrap();
        (driver, vec![created, deleted])
    }

    #[test]
    fn test_connect_reads_session_id() {
        let mut server = Server::new();
        let (driver, _mocks) = session(&mut server);
        assert_eq!(driver.session_id(), "s1");
    }

    #[test]
    fn test_connect_without_session_id_fails() {
        let mut server = Server::new();
        let _created = server
            .mock("POST", "/session")
            .with_body(r#"{"value":{}}"#)
            .create();

        assert!(WebDriverSession::connect(&server.url(), "chrome").is_err());
    }

    #[test]
    fn test_load_page_posts_url() {
        let mut server = Server::new();
        let (mut driver, _mocks) = session(&mut server);
        let nav = server
            .mock("POST", "/session/s1/url")
            .match_body(Matcher::Json(json!({ "url": "http://alpha.test/about" })))
            .with_body(r#"{"value":null}"#)
            .create();

        driver.load_page("http://alpha.test/about").unwrap();
        nav.assert();
    }

    #[test]
    fn test_resize_sets_window_rect() {
        let mut server = Server::new();
        let (mut driver, _mocks) = session(&mut server);
        let rect = server
            .mock("POST", "/session/s1/window/rect")
            .match_body(Matcher::Json(json!({ "width": 1920, "height": 1280 })))
            .with_body(r#"{"value":{"x":0,"y":0,"width":1920,"height":1280}}"#)
            .create();

        driver.resize_viewport(1920, 1280).unwrap();
        rect.assert();
    }

    #[test]
    fn test_driver_errors_are_reported() {
        let mut server = Server::new();
        let (mut driver, _mocks) = session(&mut server);
        let _nav = server
            .mock("POST", "/session/s1/url")
            .with_status(500)
            .with_body(r#"{"value":{"error":"unknown error","message":"net::ERR_NAME_NOT_RESOLVED"}}"#)
            .create();

        let err = driver.load_page("http://nowhere.test/").unwrap_err();
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn test_screenshot_is_base64_decoded() {
        let mut server = Server::new();
        let (mut driver, _mocks) = session(&mut server);
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"png bytes");
        let _shot = server
            .mock("GET", "/session/s1/screenshot")
            .with_body(json!({ "value": encoded }).to_string())
            .create();

        assert_eq!(driver.screenshot().unwrap(), b"png bytes");
    }

    #[test]
    fn test_find_anchor_hrefs_skips_missing_href() {
        let mut server = Server::new();
        let (mut driver, _mocks) = session(&mut server);
        let _elements = server
            .mock("POST", "/session/s1/elements")
            .with_body(format!(
                r#"{{"value":[{{"{key}":"e1"}},{{"{key}":"e2"}}]}}"#,
                key = ELEMENT_KEY
            ))
            .create();
        let _first = server
            .mock("GET", "/session/s1/element/e1/property/href")
            .with_body(r#"{"value":"http://alpha.test/about"}"#)
            .create();
        let _second = server
            .mock("GET", "/session/s1/element/e2/property/href")
            .with_body(r#"{"value":null}"#)
            .create();

        assert_eq!(driver.find_anchor_hrefs().unwrap(), vec!["http://alpha.test/about"]);
    }
}
