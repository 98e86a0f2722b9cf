//! Markdown rendering pass.
//!
//! [`MarkdownRenderer`] is the per-book configuration (slug policy, TOC depth,
//! math engine). Each call to [`MarkdownRenderer::render`] runs one
//! [`RenderPass`]: the source is rewritten by the span classifier, parsed by
//! `pulldown-cmark`, observed by an [`AssetFlags`] visitor, and then mapped
//! event by event before the engine's HTML writer produces the final string.

use std::sync::{Arc, LazyLock};

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use serde::Serialize;

use crate::math::{MathMlRenderer, MathMode, MathRenderer};

use super::alert;
use super::escape::{escape_attr, escape_html};
use super::headings::{Heading, HeadingTracker, TocConfig};
use super::slugify::Slugger;
use super::tokenize::{rewrite_source, unwrap_math};

/// Fence language that marks a diagram block.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";
/// Fence language that marks a display math block.
pub const MATH_LANGUAGE: &str = "math";

/// Which optional page assets the rendered markup needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssetFlags {
    /// A diagram block was seen.
    pub diagram: bool,
    /// A math block or math span was seen.
    pub math: bool,
}

impl AssetFlags {
    /// Visit one engine event.
    pub fn observe(&mut self, event: &Event<'_>) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                match fence_language(info) {
                    DIAGRAM_LANGUAGE => self.diagram = true,
                    MATH_LANGUAGE => self.math = true,
                    _ => {}
                }
            }
            Event::Code(text) if unwrap_math(text).is_some() => self.math = true,
            _ => {}
        }
    }
}

/// Result of one render pass.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    /// Top-level headings of the TOC tree.
    pub headings: Vec<Heading>,
    pub assets: AssetFlags,
}

/// Per-book markdown renderer.
///
/// Holds configuration only; every render gets its own heading tracker and
/// asset flags.
#[derive(Clone)]
pub struct MarkdownRenderer {
    slugger: Slugger,
    toc: TocConfig,
    math: Arc<dyn MathRenderer>,
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(Arc::new(MathMlRenderer::default()))
    }
}

impl MarkdownRenderer {
    pub fn new(math: Arc<dyn MathRenderer>) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);

        Self {
            slugger: Slugger::default(),
            toc: TocConfig::default(),
            math,
            options,
        }
    }

    pub fn with_slugger(mut self, slugger: Slugger) -> Self {
        self.slugger = slugger;
        self
    }

    pub fn with_toc(mut self, toc: TocConfig) -> Self {
        self.toc = toc;
        self
    }

    pub fn toc(&self) -> TocConfig {
        self.toc
    }

    /// Render a whole document.
    pub fn render(&self, src: &str) -> RenderOutput {
        let source = rewrite_source(src);
        let events: Vec<Event<'_>> = Parser::new_ext(&source, self.options).collect();

        let mut assets = AssetFlags::default();
        for event in &events {
            assets.observe(event);
        }

        let mut pass = RenderPass {
            math: self.math.as_ref(),
            options: self.options,
            tracker: HeadingTracker::new(self.slugger.clone(), self.toc.max_level),
        };
        let mapped = pass.map_events(events);

        let mut html_out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut html_out, mapped.into_iter());

        log::debug!(
            "rendered {} bytes of markdown into {} bytes of html",
            src.len(),
            html_out.len()
        );

        RenderOutput {
            html: html_out,
            headings: pass.tracker.into_headings(),
            assets,
        }
    }
}

// ============================================================================
// Event mapping
// ============================================================================

/// State for one traversal of one document.
struct RenderPass<'r> {
    math: &'r dyn MathRenderer,
    options: Options,
    tracker: HeadingTracker,
}

impl RenderPass<'_> {
    fn map_events<'a>(&mut self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::with_capacity(events.len());
        let mut iter = events.into_iter();

        while let Some(event) = iter.next() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let inner = take_block(&mut iter);
                    out.push(self.heading(level as u8, inner));
                }
                Event::Start(Tag::BlockQuote(_)) => {
                    let inner = self.map_events(take_block(&mut iter));
                    let mut inner_html = String::new();
                    html::push_html(&mut inner_html, inner.into_iter());
                    out.push(Event::Html(alert::render_blockquote(&inner_html).into()));
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let inner = take_block(&mut iter);
                    out.push(self.code_block(&kind, &inner));
                }
                Event::Start(Tag::Paragraph) => {
                    let inner = take_block(&mut iter);
                    if is_lone_image(&inner) {
                        out.push(self.standalone_image(inner));
                    } else {
                        out.push(Event::Start(Tag::Paragraph));
                        out.extend(self.map_events(inner));
                        out.push(Event::End(TagEnd::Paragraph));
                    }
                }
                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    let inner = take_block(&mut iter);
                    let alt = plain_text(&inner);
                    out.push(Event::InlineHtml(
                        image_link(&dest_url, &alt, &title).into(),
                    ));
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => out.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url: rewrite_chapter_link(dest_url),
                    title,
                    id,
                })),
                Event::Code(text) => out.push(self.code_span(text)),
                other => out.push(other),
            }
        }

        out
    }

    fn heading<'a>(&mut self, level: u8, inner: Vec<Event<'a>>) -> Event<'a> {
        let title = plain_text(&inner);
        let heading = self.tracker.push(&title, level);
        let id = escape_attr(&heading.id);

        let mut inner_html = String::new();
        html::push_html(&mut inner_html, self.map_events(inner).into_iter());

        Event::Html(
            format!(
                "<h{level} id=\"{id}\">{inner_html}<a class=\"header-link\" href=\"#{id}\">🔗</a></h{level}>\n"
            )
            .into(),
        )
    }

    fn code_block<'a>(&self, kind: &CodeBlockKind<'_>, inner: &[Event<'a>]) -> Event<'a> {
        let mut text = String::new();
        for event in inner {
            if let Event::Text(t) = event {
                text.push_str(t);
            }
        }

        let language = match kind {
            CodeBlockKind::Fenced(info) => fence_language(info),
            CodeBlockKind::Indented => "",
        };

        let html = match language {
            DIAGRAM_LANGUAGE => format!("<pre class=\"mermaid\">{}</pre>\n", escape_html(&text)),
            MATH_LANGUAGE => format!("{}\n", self.math.render(text.trim(), MathMode::Display)),
            _ => format!("<pre><code>{}</code></pre>\n", escape_html(&text)),
        };

        Event::Html(html.into())
    }

    fn code_span<'a>(&self, text: CowStr<'a>) -> Event<'a> {
        match unwrap_math(&text) {
            Some(expr) => Event::InlineHtml(self.math.render(expr, MathMode::Inline).into()),
            None => Event::Code(text),
        }
    }

    fn standalone_image<'a>(&self, mut inner: Vec<Event<'a>>) -> Event<'a> {
        // Drop the image's own end tag; the start tag carries the attributes.
        inner.pop();
        let mut events = inner.into_iter();
        let Some(Event::Start(Tag::Image {
            dest_url, title, ..
        })) = events.next()
        else {
            return Event::Html(CowStr::Borrowed(""));
        };

        let alt = plain_text(&events.collect::<Vec<_>>());
        let link = image_link(&dest_url, &alt, "");

        let html = if title.is_empty() {
            format!("<p class=\"image-container\">{link}</p>\n")
        } else {
            format!(
                "<figure class=\"image-container\">\n{link}\n<figcaption>{}</figcaption>\n</figure>\n",
                self.render_inline(&title)
            )
        };

        Event::Html(html.into())
    }

    /// Render a one-line fragment without the surrounding paragraph.
    fn render_inline(&self, src: &str) -> String {
        let source = rewrite_source(src);
        let events = Parser::new_ext(&source, self.options).map(|event| match event {
            Event::Code(text) => self.code_span(text),
            other => other,
        });

        let mut out = String::new();
        html::push_html(&mut out, events);

        let trimmed = out.trim();
        trimmed
            .strip_prefix("<p>")
            .and_then(|s| s.strip_suffix("</p>"))
            .unwrap_or(trimmed)
            .to_string()
    }
}

/// Collect the events up to the end tag matching an already-consumed start
/// tag. The end tag itself is consumed and dropped.
fn take_block<'a>(iter: &mut impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut depth = 0usize;
    let mut inner = Vec::new();

    for event in iter.by_ref() {
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            _ => {}
        }
        inner.push(event);
    }

    inner
}

/// Whether a paragraph consists of exactly one image.
fn is_lone_image(inner: &[Event<'_>]) -> bool {
    if !matches!(inner.first(), Some(Event::Start(Tag::Image { .. }))) {
        return false;
    }

    let mut depth = 0usize;
    for (i, event) in inner.iter().enumerate() {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return i == inner.len() - 1;
                }
            }
            _ => {}
        }
    }

    false
}

/// Plain text of inline events, as used for heading titles and alt text.
fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) => text.push_str(t),
            Event::Code(t) => match unwrap_math(t) {
                Some(expr) => {
                    text.push('$');
                    text.push_str(expr);
                    text.push('$');
                }
                None => text.push_str(t),
            },
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn image_link(src: &str, alt: &str, title: &str) -> String {
    let src = escape_attr(src);
    let alt = escape_attr(alt);
    if title.is_empty() {
        format!("<a href=\"{src}\"><img src=\"{src}\" alt=\"{alt}\"></a>")
    } else {
        format!(
            "<a href=\"{src}\"><img src=\"{src}\" alt=\"{alt}\" title=\"{}\"></a>",
            escape_attr(title)
        )
    }
}

fn fence_language(info: &str) -> &str {
    info.split_whitespace().next().unwrap_or("")
}

static CHAPTER_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\./(.*\.md)(#.*)$").expect("chapter link pattern is valid")
});

/// Point `./chapter.md#fragment` at `#fragment`; chapters share one page.
fn rewrite_chapter_link(dest: CowStr<'_>) -> CowStr<'_> {
    match CHAPTER_LINK.captures(&dest) {
        Some(caps) => CowStr::from(caps[2].to_string()),
        None => dest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(src: &str) -> RenderOutput {
        MarkdownRenderer::default().render(src)
    }

    #[test]
    fn test_heading_anchor() {
        let out = render("# Hello World\n");
        assert!(out.html.contains(
            "<h1 id=\"hello-world\">Hello World<a class=\"header-link\" href=\"#hello-world\">🔗</a></h1>"
        ));
        assert_eq!(out.headings.len(), 1);
        assert_eq!(out.headings[0].id, "hello-world");
    }

    #[test]
    fn test_duplicate_headings() {
        let out = render("## Setup\n\n## Setup\n\n## Setup\n");
        assert!(out.html.contains("id=\"setup\""));
        assert!(out.html.contains("id=\"setup-1\""));
        assert!(out.html.contains("id=\"setup-2\""));
    }

    #[test]
    fn test_deep_headings_keep_anchors() {
        let out = render("# Top\n\n#### Deep\n");
        assert!(out.html.contains("<h4 id=\"deep\">"));
        assert!(out.headings[0].children.is_empty());
    }

    #[test]
    fn test_each_render_starts_fresh() {
        let renderer = MarkdownRenderer::default();
        let first = renderer.render("# Intro\n");
        let second = renderer.render("# Intro\n");
        assert_eq!(first.html, second.html);
        assert_eq!(second.headings[0].id, "intro");
    }

    #[test]
    fn test_inline_math() {
        let out = render("Let $x^2$ be.\n");
        assert!(out.html.contains("<math"));
        assert!(!out.html.contains("__math__"));
        assert!(out.assets.math);
        assert!(!out.assets.diagram);
    }

    #[test]
    fn test_code_span_is_escaped() {
        let out = render("Use `a<b` here.\n");
        assert!(out.html.contains("<code>a&lt;b</code>"));
        assert!(!out.assets.math);
    }

    #[test]
    fn test_dollars_in_code_block_are_verbatim() {
        let out = render("```\n$x$\n```\n");
        assert!(out.html.contains("<pre><code>$x$\n</code></pre>"));
        assert!(!out.assets.math);
    }

    #[test]
    fn test_mermaid_block() {
        let out = render("```mermaid\ngraph TD; A-->B\n```\n");
        assert!(out.html.contains("<pre class=\"mermaid\">graph TD; A--&gt;B\n</pre>"));
        assert!(out.assets.diagram);
        assert!(!out.assets.math);
    }

    #[test]
    fn test_math_block() {
        let out = render("```math\nx^2\n```\n");
        assert!(out.html.contains("display=\"block\""));
        assert!(out.assets.math);
    }

    #[test]
    fn test_alert_blockquote() {
        let out = render("> [!NOTE] Be careful\n");
        assert!(out.html.contains("<div class=\"alert note\">"));
        assert!(out.html.contains("<br>Be careful</p></div>"));
        assert!(!out.html.contains("<blockquote>"));
    }

    #[test]
    fn test_plain_blockquote() {
        let out = render("> Just a quote\n");
        assert!(out.html.contains("<blockquote>\n<p>Just a quote</p>\n</blockquote>"));
    }

    #[test]
    fn test_chapter_link_rewrite() {
        let out = render("[see](./setup.md#install) and [other](./other.md)\n");
        assert!(out.html.contains("<a href=\"#install\">see</a>"));
        assert!(out.html.contains("<a href=\"./other.md\">other</a>"));
    }

    #[test]
    fn test_standalone_image() {
        let out = render("![A cat](cat.png)\n");
        assert!(out.html.contains(
            "<p class=\"image-container\"><a href=\"cat.png\"><img src=\"cat.png\" alt=\"A cat\"></a></p>"
        ));
        assert!(!out.html.contains("<p><p"));
    }

    #[test]
    fn test_titled_image_becomes_figure() {
        let out = render("![A cat](cat.png \"A *sleepy* cat\")\n");
        assert!(out.html.contains("<figure class=\"image-container\">"));
        assert!(out.html.contains("<figcaption>A <em>sleepy</em> cat</figcaption>"));
    }

    #[test]
    fn test_inline_image_stays_in_paragraph() {
        let out = render("Look: ![x](x.png) here\n");
        assert!(out.html.contains("<p>Look: <a href=\"x.png\"><img src=\"x.png\" alt=\"x\"></a> here</p>"));
    }

    #[test]
    fn test_math_in_heading_title() {
        let out = render("# Cost of $n$ items\n");
        assert_eq!(out.headings[0].title, "Cost of $n$ items");
        assert!(out.html.contains("<math"));
    }

    #[test]
    fn test_html_block_passes_through() {
        let out = render("<div>\n$x$ and `y`\n</div>\n");
        assert!(out.html.contains("<div>\n$x$ and `y`\n</div>"));
        assert!(!out.html.contains("__math__"));
        assert!(!out.html.contains("<math"));
    }

    #[test]
    fn test_dollars_in_link_destination() {
        let out = render("[cost](https://x.com/?a=$1&b=$2)\n");
        assert!(out.html.contains("<a href=\"https://x.com/?a=$1&amp;b=$2\">cost</a>"));
        assert!(!out.html.contains("<math"));
    }

    #[test]
    fn test_dollars_in_reference_definition() {
        let out = render("See [cost].\n\n[cost]: https://x.com/?a=$1&b=$2\n");
        assert!(out.html.contains("<a href=\"https://x.com/?a=$1&amp;b=$2\">cost</a>"));
    }

    #[test]
    fn test_custom_toc_depth() {
        let renderer = MarkdownRenderer::default().with_toc(TocConfig { max_level: 1 });
        let out = renderer.render("# A\n\n## B\n");
        assert!(out.headings[0].children.is_empty());
        assert!(out.html.contains("<h2 id=\"b\">"));
    }
}
