//! Audit notice bodies sent to the log room.

use serde::Serialize;

/// Content of an `m.notice` message.
///
/// Carries a plain-text body plus an optional HTML rendering; helpers cover
/// the few shapes the agent actually emits (colored one-liners and
/// collapsible detail sections).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

impl Notice {
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            formatted_body: None,
        }
    }

    /// One-line notice rendered in the given hex color.
    pub fn colored(hex: &str, body: impl Into<String>) -> Self {
        let body = body.into();
        let formatted = format!(
            "<font color=\"#{}\">{}</font>",
            hex.trim_start_matches('#'),
            html_escape(&body)
        );
        Self {
            body,
            formatted_body: Some(formatted),
        }
    }

    /// Append a collapsible section holding preformatted detail text.
    #[must_use]
    pub fn with_section(mut self, title: &str, detail: &str) -> Self {
        let formatted = self
            .formatted_body
            .take()
            .unwrap_or_else(|| html_escape(&self.body));
        self.formatted_body = Some(format!(
            "{formatted}<details><summary>{}</summary><pre><code>{}</code></pre></details>",
            html_escape(title),
            html_escape(detail)
        ));
        self.body = format!("{}\n{title}:\n{detail}", self.body);
        self
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A queued outbound notice. No identity: the dispatch queue never
/// deduplicates these.
#[derive(Debug, Clone)]
pub struct DispatchMessage {
    pub room_id: String,
    pub content: Notice,
}
