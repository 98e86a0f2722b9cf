//! Callout blocks inside blockquotes.
//!
//! A blockquote whose rendered content is a paragraph starting with
//! `[!NOTE]`, `[!IMPORTANT]` or `[!WARNING]` becomes a styled callout with an
//! icon and a title. Anything else renders as a plain blockquote.

use std::fmt;

/// The fixed set of callout kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Note,
    Important,
    Warning,
}

impl AlertKind {
    /// Parse the bracketed keyword. Matching is case-sensitive.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "NOTE" => Some(AlertKind::Note),
            "IMPORTANT" => Some(AlertKind::Important),
            "WARNING" => Some(AlertKind::Warning),
            _ => None,
        }
    }

    /// Lower-case name, used as the CSS class.
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Note => "note",
            AlertKind::Important => "important",
            AlertKind::Warning => "warning",
        }
    }

    /// Title-cased label.
    pub fn title(self) -> &'static str {
        match self {
            AlertKind::Note => "Note",
            AlertKind::Important => "Important",
            AlertKind::Warning => "Warning",
        }
    }

    /// Inline SVG icon.
    pub fn icon(self) -> &'static str {
        match self {
            AlertKind::Note => NOTE_ICON,
            AlertKind::Important => IMPORTANT_ICON,
            AlertKind::Warning => WARNING_ICON,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognized callout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertBlock<'a> {
    pub kind: AlertKind,
    /// Rendered markup following the keyword, unmodified apart from trimming.
    pub body: &'a str,
}

impl AlertBlock<'_> {
    /// Render the callout container.
    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"alert {kind}\"><p><span class=\"alert-title\">{icon} {title}</span><br>{body}</p></div>\n",
            kind = self.kind,
            icon = self.kind.icon(),
            title = self.kind.title(),
            body = self.body,
        )
    }
}

/// Recognize a callout in the rendered inner markup of a blockquote.
///
/// The whole content must be a `<p>…</p>` whose text starts with a bracketed
/// keyword. An unknown keyword is a non-match.
pub fn detect(inner_html: &str) -> Option<AlertBlock<'_>> {
    let content = inner_html.trim();
    let inner = content.strip_prefix("<p>[!")?.strip_suffix("</p>")?;
    let (keyword, body) = inner.split_once(']')?;
    let kind = AlertKind::from_keyword(keyword)?;

    Some(AlertBlock {
        kind,
        body: body.trim(),
    })
}

/// Render a blockquote, substituting a callout when one is recognized.
pub fn render_blockquote(inner_html: &str) -> String {
    match detect(inner_html) {
        Some(alert) => alert.to_html(),
        None => format!("<blockquote>\n{inner_html}</blockquote>\n"),
    }
}

const NOTE_ICON: &str = r#"<svg class="note" viewBox="0 0 16 16" version="1.1" width="16" height="16" aria-hidden="true"><path d="M0 8a8 8 0 1 1 16 0A8 8 0 0 1 0 8Zm8-6.5a6.5 6.5 0 1 0 0 13 6.5 6.5 0 0 0 0-13ZM6.5 7.75A.75.75 0 0 1 7.25 7h1a.75.75 0 0 1 .75.75v2.75h.25a.75.75 0 0 1 0 1.5h-2a.75.75 0 0 1 0-1.5h.25v-2h-.25a.75.75 0 0 1-.75-.75ZM8 6a1 1 0 1 1 0-2 1 1 0 0 1 0 2Z"></path></svg>"#;

const IMPORTANT_ICON: &str = r#"<svg class="important" viewBox="0 0 16 16" version="1.1" width="16" height="16" aria-hidden="true"><path d="M0 1.75C0 .784.784 0 1.75 0h12.5C15.216 0 16 .784 16 1.75v9.5A1.75 1.75 0 0 1 14.25 13H8.06l-2.573 2.573A1.458 1.458 0 0 1 3 14.543V13H1.75A1.75 1.75 0 0 1 0 11.25Zm1.75-.25a.25.25 0 0 0-.25.25v9.5c0 .138.112.25.25.25h2a.75.75 0 0 1 .75.75v2.19l2.72-2.72a.749.749 0 0 1 .53-.22h6.5a.25.25 0 0 0 .25-.25v-9.5a.25.25 0 0 0-.25-.25Zm7 2.25v2.5a.75.75 0 0 1-1.5 0v-2.5a.75.75 0 0 1 1.5 0ZM9 9a1 1 0 1 1-2 0 1 1 0 0 1 2 0Z"></path></svg>"#;

const WARNING_ICON: &str = r#"<svg class="warning" viewBox="0 0 16 16" version="1.1" width="16" height="16" aria-hidden="true"><path d="M6.457 1.047c.659-1.234 2.427-1.234 3.086 0l6.082 11.378A1.75 1.75 0 0 1 14.082 15H1.918a1.75 1.75 0 0 1-1.543-2.575Zm1.763.707a.25.25 0 0 0-.44 0L1.698 13.132a.25.25 0 0 0 .22.368h12.164a.25.25 0 0 0 .22-.368Zm.53 3.996v2.5a.75.75 0 0 1-1.5 0v-2.5a.75.75 0 0 1 1.5 0ZM9 11a1 1 0 1 1-2 0 1 1 0 0 1 2 0Z"></path></svg>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_note() {
        let alert = detect("<p>[!NOTE] Be careful</p>\n").unwrap();
        assert_eq!(alert.kind, AlertKind::Note);
        assert_eq!(alert.body, "Be careful");
    }

    #[test]
    fn test_detect_each_kind() {
        assert_eq!(detect("<p>[!IMPORTANT] x</p>").unwrap().kind, AlertKind::Important);
        assert_eq!(detect("<p>[!WARNING] x</p>").unwrap().kind, AlertKind::Warning);
    }

    #[test]
    fn test_keyword_is_case_sensitive() {
        assert!(detect("<p>[!note] Be careful</p>").is_none());
    }

    #[test]
    fn test_unknown_keyword_falls_through() {
        assert!(detect("<p>[!TIP] Be careful</p>").is_none());
        assert!(detect("<p>[!] Be careful</p>").is_none());
        assert!(detect("<p>[!NOTE Be careful</p>").is_none());
    }

    #[test]
    fn test_plain_quote_falls_through() {
        let html = render_blockquote("<p>Just a quote</p>\n");
        assert_eq!(html, "<blockquote>\n<p>Just a quote</p>\n</blockquote>\n");
    }

    #[test]
    fn test_not_a_paragraph() {
        assert!(detect("<ul>\n<li>[!NOTE] x</li>\n</ul>").is_none());
    }

    #[test]
    fn test_body_markup_is_preserved() {
        let alert = detect("<p>[!WARNING] Do <em>not</em> run <code>rm</code></p>").unwrap();
        assert_eq!(alert.body, "Do <em>not</em> run <code>rm</code>");
    }

    #[test]
    fn test_render_callout() {
        let html = render_blockquote("<p>[!NOTE] Be careful</p>\n");
        assert!(html.starts_with("<div class=\"alert note\">"));
        assert!(html.contains("<span class=\"alert-title\"><svg class=\"note\""));
        assert!(html.contains("</svg> Note</span>"));
        assert!(html.contains("<br>Be careful</p></div>"));
    }
}
