//! Behaviour of the push worker: turning a push payload into a notification
//! and deciding what a notification click does.

use reqwest::Url;
use serde_json::Value;

pub const DEFAULT_TITLE: &str = "Recipe timer";
pub const DEFAULT_BODY: &str = "Timer finished!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
}

/// Builds the notification for a push payload.
///
/// A JSON object contributes `title` and `body` (or `message`); a JSON string
/// or any non-JSON text becomes the body. Missing or blank values fall back to
/// the defaults.
pub fn notification_for_push(data: Option<&str>, icon: Option<&str>) -> NotificationContent {
    let (title, body) = match data.map(str::trim).filter(|text| !text.is_empty()) {
        None => (None, None),
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => {
                let field = |name: &str| {
                    fields
                        .get(name)
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|value| !value.is_empty())
                        .map(str::to_string)
                };
                (field("title"), field("body").or_else(|| field("message")))
            }
            Ok(Value::String(body)) => (None, Some(body)),
            Ok(_) => (None, None),
            Err(_) => (None, Some(text.to_string())),
        },
    };

    NotificationContent {
        title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: body
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BODY.to_string()),
        icon: icon.map(str::to_string),
        badge: icon.map(str::to_string),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Focus the open window at this index.
    Focus(usize),
    Open(String),
}

/// Focuses the first open window on the app's origin, otherwise opens the
/// app root.
pub fn resolve_click(app_url: &Url, windows: &[Url]) -> ClickAction {
    let origin = app_url.origin();
    windows
        .iter()
        .position(|window| window.origin() == origin)
        .map(ClickAction::Focus)
        .unwrap_or_else(|| {
            let root = app_url
                .join("/")
                .map(|root| root.to_string())
                .unwrap_or_else(|_| app_url.to_string());
            ClickAction::Open(root)
        })
}
