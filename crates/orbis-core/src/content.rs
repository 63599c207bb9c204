// crates/orbis-core/src/content.rs

use serde::{Deserialize, Serialize};

/// Title shown when content could not be retrieved.
pub const UNAVAILABLE_TITLE: &str = "[Content Unavailable]";

/// Body shown when content could not be retrieved.
pub const UNAVAILABLE_BODY: &str = "Unable to fetch content";

/// A title+body document stored at a content address.
///
/// The wire form uses `content` for the body field, matching the gateway's
/// JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
}

impl ContentDocument {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// The placeholder returned when a fetch fails. Readers see a degraded
    /// document instead of an error.
    pub fn placeholder() -> Self {
        Self {
            title: UNAVAILABLE_TITLE.to_string(),
            body: UNAVAILABLE_BODY.to_string(),
        }
    }

    /// Whether this is the fetch-failure placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.title == UNAVAILABLE_TITLE
    }
}
