//! Content payload delivered to a display window.

use serde::{Deserialize, Serialize};

/// Everything a window can show for one update.
///
/// Only the title is required. The remaining fields are independent of each
/// other and any subset may be present; the presentation layer decides how
/// to lay them out. Field names on the wire are camelCase and absent fields
/// are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    /// Title displayed at the top of the window.
    pub title: String,

    /// Markdown-formatted body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Raw HTML markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Mermaid diagram source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaid: Option<String>,

    /// URL of an image to display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ContentPayload {
    /// Create a payload carrying only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: None,
            html: None,
            mermaid: None,
            image_url: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn mermaid(mut self, source: impl Into<String>) -> Self {
        self.mermaid = Some(source.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}
