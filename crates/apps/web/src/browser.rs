use gloo_net::http::Request;
use tracing::warn;
use viewstate::{
    FetchFailure, FetchedRecords, HistorySink, NodeSubmission, SubmissionFailure,
    SubmissionReply, parse_nodes_body,
};
use wasm_bindgen::JsValue;

/// `history.replaceState` on the current page.
#[derive(Debug, Default)]
pub struct BrowserHistory;

impl HistorySink for BrowserHistory {
    fn replace(&mut self, query: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let url = if query.is_empty() {
            window.location().pathname().unwrap_or_else(|_| "/".to_string())
        } else {
            format!("?{query}")
        };
        let result = window
            .history()
            .and_then(|h| h.replace_state_with_url(&JsValue::NULL, "", Some(&url)));
        if let Err(err) = result {
            warn!("replaceState failed: {:?}", err);
        }
    }
}

pub fn location_search() -> String {
    web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default()
}

/// `window.__meshmapApiUrl`, when the page sets it to a string.
pub fn api_url_override() -> Option<String> {
    let window = web_sys::window()?;
    js_sys::Reflect::get(&window, &JsValue::from_str("__meshmapApiUrl"))
        .ok()?
        .as_string()
        .filter(|s| !s.trim().is_empty())
}

pub async fn fetch_nodes(url: &str) -> Result<FetchedRecords, FetchFailure> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| FetchFailure::Transport(e.to_string()))?;
    if !resp.ok() {
        return Err(FetchFailure::Status(resp.status()));
    }
    let text = resp
        .text()
        .await
        .map_err(|e| FetchFailure::Transport(e.to_string()))?;
    parse_nodes_body(&text)
}

/// The reply body is read whatever the status: errors come back as `{ error }`.
pub async fn post_submission(
    url: &str,
    submission: &NodeSubmission,
) -> Result<String, SubmissionFailure> {
    let body = submission
        .to_json()
        .map_err(|e| SubmissionFailure::Transport(e.to_string()))?;
    let resp = Request::post(url)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| SubmissionFailure::Transport(e.to_string()))?
        .send()
        .await
        .map_err(|e| SubmissionFailure::Transport(e.to_string()))?;
    let text = resp
        .text()
        .await
        .map_err(|e| SubmissionFailure::Transport(e.to_string()))?;
    SubmissionReply::parse(&text)?.into_result()
}
