//! The single-page HTML shell.
//!
//! The shell carries an empty `<style></style>` placeholder in its head. The
//! style sheet can only be reduced once the final markup exists, so it is
//! spliced in last with [`fill_style`].

use crate::markdown::escape_html;

/// Style placeholder replaced by the reduced style sheet.
pub const STYLE_PLACEHOLDER: &str = "<style></style>";

/// Live-reload script loaded in watch mode.
pub const LIVE_RELOAD_URL: &str = "https://livejs.com/live.js";

const DIAGRAM_INIT: &str = "const isDarkMode = window.matchMedia && window.matchMedia('(prefers-color-scheme: dark)').matches; \
const theme = isDarkMode ? \"dark\" : \"neutral\"; mermaid.initialize({theme});";

/// Everything the shell embeds.
#[derive(Debug, Clone, Copy)]
pub struct Shell<'a> {
    pub title: &'a str,
    /// Rendered chapter markup.
    pub body: &'a str,
    /// Inner items of the TOC `<ol>`.
    pub toc: &'a str,
    /// Already formatted generation date.
    pub date: &'a str,
    /// Diagram library source, embedded when present.
    pub diagram_script: Option<&'a str>,
    pub watch: bool,
}

impl Shell<'_> {
    pub fn render(&self) -> String {
        let title = escape_html(self.title);
        let mut out = String::with_capacity(self.body.len() + self.toc.len() + 1024);

        out.push_str("<!DOCTYPE html><html lang=\"en\"><head>");
        out.push_str("<meta charset=\"utf-8\">");
        out.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1, shrink-to-fit=no\">",
        );
        out.push_str("<title>");
        out.push_str(&title);
        out.push_str("</title>");
        out.push_str(STYLE_PLACEHOLDER);

        if let Some(script) = self.diagram_script {
            out.push_str("<script type=\"text/javascript\">");
            out.push_str(script);
            out.push_str("</script>");
        }
        if self.watch {
            out.push_str("<script type=\"text/javascript\" src=\"");
            out.push_str(LIVE_RELOAD_URL);
            out.push_str("\"></script>");
        }
        out.push_str("</head><body>");

        if self.diagram_script.is_some() {
            out.push_str("<script type=\"text/javascript\">");
            out.push_str(DIAGRAM_INIT);
            out.push_str("</script>");
        }

        out.push_str("<main class=\"content\"><div class=\"content__inner\">");
        out.push_str("<div class=\"book-title\">");
        out.push_str(&title);
        out.push_str("</div>");
        out.push_str(self.body);
        out.push_str("</div></main>");

        out.push_str("<div class=\"header\"><div class=\"title\">");
        out.push_str(&title);
        out.push_str("</div><div class=\"date\">");
        out.push_str(&escape_html(self.date));
        out.push_str("</div></div>");

        out.push_str("<div class=\"menu\"><ol>");
        out.push_str(self.toc);
        out.push_str("</ol></div>");

        out.push_str("</body></html>");
        out
    }
}

/// Replace the first style placeholder with `css`.
pub fn fill_style(html: &str, css: &str) -> String {
    html.replacen(STYLE_PLACEHOLDER, &format!("<style>{css}</style>"), 1)
}
