//! Wire-format handling for the sessions listing.
//!
//! The listing endpoint has answered with several shapes over time: a bare JSON array, or
//! an object with the array nested under one of a few keys. Individual sessions also carry
//! their identifier under legacy names. Everything is resolved here into [`SessionPage`] so
//! nothing downstream needs to know about aliases.

use serde_json::{Map, Value};

use super::{Folder, Session, SessionPage};

/// Keys that may hold the session array, in priority order
pub const SESSION_LIST_ALIASES: &[&str] = &["Results", "Items", "Sessions"];

/// Keys that may hold the session identifier, in priority order
pub const SESSION_ID_ALIASES: &[&str] = &["Id", "DeliveryId", "id"];

/// Keys that may hold the session display name, in priority order
pub const SESSION_NAME_ALIASES: &[&str] = &["Name", "name"];

impl SessionPage {
    /// Build a page from a decoded listing response
    pub fn from_json(body: Value) -> Self {
        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut object) => SESSION_LIST_ALIASES
                .iter()
                .find_map(|key| match object.remove(*key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let item_count = items.len();
        let folder = items
            .first()
            .and_then(Value::as_object)
            .and_then(folder_details);

        let sessions = items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|raw| {
                let session = session_from_raw(raw);
                if session.is_none() {
                    tracing::debug!("Skipping listing entry without an identifier");
                }
                session
            })
            .collect();

        Self {
            sessions,
            item_count,
            folder,
        }
    }
}

fn session_from_raw(raw: &Map<String, Value>) -> Option<Session> {
    let id = first_non_empty(raw, SESSION_ID_ALIASES)?;
    let name = first_non_empty(raw, SESSION_NAME_ALIASES).unwrap_or_default();

    let caption_url = raw
        .get("Urls")
        .and_then(Value::as_object)
        .and_then(|urls| first_non_empty(urls, &["CaptionDownloadUrl"]))
        .or_else(|| first_non_empty(raw, &["CaptionDownloadUrl"]));

    Some(Session {
        id,
        name,
        caption_url,
    })
}

fn folder_details(raw: &Map<String, Value>) -> Option<Folder> {
    let details = raw.get("FolderDetails")?.as_object()?;

    Some(Folder {
        id: first_non_empty(details, &["Id", "id"]),
        name: first_non_empty(details, &["Name", "name"]).unwrap_or_default(),
    })
}

/// First alias holding a non-empty string (or a number, rendered as text)
fn first_non_empty(raw: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| match raw.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
