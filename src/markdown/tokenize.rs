//! Inline code and math spans.
//!
//! Backticks and dollar signs both open delimited inline spans. This module
//! decides which one a span is before the markup engine sees the text:
//! [`classify_span`] recognizes a balanced span, [`plain_text_len`] finds
//! where ordinary text stops, and [`rewrite_source`] re-emits every span as an
//! inline code span the engine understands. Math spans carry a sentinel
//! prefix/suffix so the renderer can tell them apart after the engine has
//! classified them as code.

use std::sync::LazyLock;

use memchr::memchr;
use regex::Regex;

use super::escape::inline_code_fence;

/// Marks the start of a math payload inside an inline code span.
pub const MATH_PREFIX: &str = "__math__:";
/// Marks the end of a math payload inside an inline code span.
pub const MATH_SUFFIX: &str = ":__math__";

/// Kind of a delimited inline span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Code,
    Math,
}

/// A delimited inline span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Original text including delimiters.
    pub raw: &'a str,
    /// Trimmed payload without delimiters.
    pub text: &'a str,
}

impl Token<'_> {
    /// Payload as handed to the markup engine; math is sentinel-wrapped.
    pub fn engine_text(&self) -> String {
        match self.kind {
            TokenKind::Code => self.text.to_string(),
            TokenKind::Math => format!("{MATH_PREFIX}{}{MATH_SUFFIX}", self.text),
        }
    }

    /// Re-emit the span as a backtick code span.
    ///
    /// The fence is longer than any backtick run in the payload, and the
    /// padding spaces are stripped again by the engine.
    pub fn to_code_span(&self) -> String {
        let text = self.engine_text();
        let fence = inline_code_fence(&text);
        format!("{fence} {text} {fence}")
    }
}

/// Extract the math expression from a sentinel-wrapped code span payload.
pub fn unwrap_math(text: &str) -> Option<&str> {
    text.strip_prefix(MATH_PREFIX)?.strip_suffix(MATH_SUFFIX)
}

fn is_delim(b: u8) -> bool {
    b == b'`' || b == b'$'
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Recognize a delimited span at the start of `src`.
///
/// The span opens with a run of identical delimiter characters and closes at
/// the first run of exactly the same length that follows a non-delimiter
/// character and is not itself followed by another delimiter. The payload
/// must start and end with a non-delimiter and must not be blank.
///
/// # Examples
///
/// ```
/// use quire::markdown::{classify_span, TokenKind};
///
/// let token = classify_span("$$x^2$$ rest").unwrap();
/// assert_eq!(token.kind, TokenKind::Math);
/// assert_eq!(token.text, "x^2");
/// assert!(classify_span("`abc").is_none());
/// ```
pub fn classify_span(src: &str) -> Option<Token<'_>> {
    let bytes = src.as_bytes();
    let delim = *bytes.first()?;
    if !is_delim(delim) {
        return None;
    }

    let open = bytes.iter().take_while(|&&b| b == delim).count();
    match bytes.get(open) {
        Some(&b) if !is_delim(b) => {}
        _ => return None,
    }

    let mut search = open + 1;
    while let Some(offset) = memchr(delim, &bytes[search..]) {
        let close = search + offset;
        let run = bytes[close..].iter().take_while(|&&b| b == delim).count();
        let followed_by_delim = bytes.get(close + run).is_some_and(|&b| is_delim(b));

        if run == open && !is_delim(bytes[close - 1]) && !followed_by_delim {
            let text = src[open..close].trim();
            if text.is_empty() {
                return None;
            }

            let kind = if delim == b'$' {
                TokenKind::Math
            } else {
                TokenKind::Code
            };

            return Some(Token {
                kind,
                raw: &src[..close + run],
                text,
            });
        }

        search = close + run;
    }

    None
}

/// Length of the plain-text token at the start of `src`.
///
/// The first character (or a whole run of delimiter characters) is always
/// consumed. Text then stops before the next escape, `<`, `!`, `[`,
/// delimiter, `*`, word-initial `_`, or before two or more spaces that end a
/// line (a hard line break).
pub fn plain_text_len(src: &str) -> usize {
    let bytes = src.as_bytes();
    let Some(&first) = bytes.first() else {
        return 0;
    };

    let mut i = if is_delim(first) {
        bytes.iter().take_while(|&&b| is_delim(b)).count()
    } else {
        src.chars().next().map_or(0, char::len_utf8)
    };

    while i < bytes.len() {
        let b = bytes[i];
        let prev = bytes[i - 1];

        match b {
            b'\\' | b'<' | b'!' | b'[' | b'`' | b'$' | b'*' => break,
            b'_' if !is_word(prev) => break,
            b' ' if prev != b' ' && is_hard_break(&bytes[i..]) => break,
            _ => {}
        }

        i += src[i..].chars().next().map_or(1, char::len_utf8);
    }

    i
}

fn is_hard_break(bytes: &[u8]) -> bool {
    let spaces = bytes.iter().take_while(|&&b| b == b' ').count();
    spaces >= 2 && bytes.get(spaces) == Some(&b'\n')
}

static INLINE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"<[A-Za-z][A-Za-z0-9+.\-]{1,31}:[^\s<>]*>",
        r"|<[A-Za-z0-9.!#$%&'*+/=?^_`{|}~\-]+@[A-Za-z0-9.\-]+>",
        r"|</?[A-Za-z][A-Za-z0-9\-]*(?:\s[^<>]*)?/?>",
        r"|<!--[\s\S]*?-->",
        r")"
    ))
    .expect("inline markup pattern is valid")
});

/// An inline token as seen by the rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineToken<'a> {
    /// A code or math span.
    Span(Token<'a>),
    /// A backslash and the character it escapes.
    Escape(&'a str),
    /// An inline tag, comment, autolink or link destination.
    Markup(&'a str),
    Text(&'a str),
}

impl<'a> InlineToken<'a> {
    /// Source text covered by the token.
    pub fn raw(&self) -> &'a str {
        match self {
            InlineToken::Span(token) => token.raw,
            InlineToken::Escape(s) | InlineToken::Markup(s) | InlineToken::Text(s) => s,
        }
    }
}

/// Splits inline source text into [`InlineToken`]s. Never fails; unmatched
/// delimiter runs come out as text.
#[derive(Debug, Clone)]
pub struct InlineLexer<'a> {
    rest: &'a str,
}

impl<'a> InlineLexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { rest: src }
    }

    fn lex(&self) -> InlineToken<'a> {
        let src = self.rest;
        match src.as_bytes()[0] {
            b'\\' => {
                let len = 1 + src[1..].chars().next().map_or(0, char::len_utf8);
                InlineToken::Escape(&src[..len])
            }
            b'`' | b'$' => match classify_span(src) {
                Some(token) => InlineToken::Span(token),
                None => text_token(src),
            },
            b'<' => match INLINE_MARKUP.find(src) {
                Some(m) => InlineToken::Markup(m.as_str()),
                None => text_token(src),
            },
            b']' if src.starts_with("](") => match link_destination_len(src) {
                Some(len) => InlineToken::Markup(&src[..len]),
                None => InlineToken::Text(&src[..1]),
            },
            _ => text_token(src),
        }
    }
}

/// Plain text, cut short where a link destination begins.
fn text_token(src: &str) -> InlineToken<'_> {
    let text = &src[..plain_text_len(src)];
    match text.find("](") {
        Some(end) if end > 0 => InlineToken::Text(&text[..end]),
        _ => InlineToken::Text(text),
    }
}

/// Length of `](destination "title")` at the start of `src`, closing paren
/// included. Destinations are opaque: spans inside a URL stay untouched.
fn link_destination_len(src: &str) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = 2;
    while matches!(bytes.get(i), Some(b' ' | b'\t' | b'\n')) {
        i += 1;
    }
    if bytes.get(i) == Some(&b'<') {
        i += 1 + memchr(b'>', &bytes[i + 1..])? + 1;
    }

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\\' => i += 1,
                b'"' | b'\'' if matches!(bytes[i - 1], b' ' | b'\t' | b'\n') => quote = Some(b),
                b'(' => depth += 1,
                b')' if depth == 0 => return Some(i + 1),
                b')' => depth -= 1,
                b'\n' if bytes.get(i + 1) == Some(&b'\n') => return None,
                _ => {}
            },
        }
        i += 1;
    }

    None
}

impl<'a> Iterator for InlineLexer<'a> {
    type Item = InlineToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let token = self.lex();
        self.rest = &self.rest[token.raw().len()..];
        Some(token)
    }
}

/// Rewrite one run of inline text, re-emitting spans as code spans.
pub fn rewrite_inline(src: &str, out: &mut String) {
    for token in InlineLexer::new(src) {
        match token {
            InlineToken::Span(token) => out.push_str(&token.to_code_span()),
            other => out.push_str(other.raw()),
        }
    }
}

// ============================================================================
// Block scanning
// ============================================================================

/// Rewrite a whole document.
///
/// Inline text is rewritten one block at a time so spans never cross
/// paragraph boundaries. Fenced and indented code blocks, HTML blocks and
/// link reference definitions pass through untouched.
pub fn rewrite_source(src: &str) -> String {
    let mut out = String::with_capacity(src.len() + src.len() / 8);
    let mut scanner = BlockScanner::default();
    let mut run: Option<(usize, usize)> = None;
    let mut offset = 0;

    for line in src.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        match scanner.classify(line) {
            LineKind::Verbatim | LineKind::Blank => {
                flush_run(src, &mut run, &mut out);
                out.push_str(line);
            }
            LineKind::BlockStart => {
                flush_run(src, &mut run, &mut out);
                run = Some((start, offset));
            }
            LineKind::Continuation => {
                run = Some(match run {
                    Some((run_start, _)) => (run_start, offset),
                    None => (start, offset),
                });
            }
        }
    }

    flush_run(src, &mut run, &mut out);
    out
}

fn flush_run(src: &str, run: &mut Option<(usize, usize)>, out: &mut String) {
    if let Some((start, end)) = run.take() {
        rewrite_inline(&src[start..end], out);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    /// Code, raw HTML or a link definition; copied unchanged.
    Verbatim,
    Blank,
    /// A line that starts a new inline block.
    BlockStart,
    /// A line that continues the current inline block.
    Continuation,
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    ch: u8,
    len: usize,
}

impl Fence {
    fn open(stripped: &str) -> Option<Self> {
        let bytes = stripped.as_bytes();
        let ch = *bytes.first()?;
        if ch != b'`' && ch != b'~' {
            return None;
        }

        let len = bytes.iter().take_while(|&&b| b == ch).count();
        if len < 3 {
            return None;
        }

        // Backtick fences cannot carry backticks in their info string.
        if ch == b'`' && memchr(b'`', &bytes[len..]).is_some() {
            return None;
        }

        Some(Fence { ch, len })
    }

    fn closes(&self, stripped: &str) -> bool {
        let bytes = stripped.as_bytes();
        let len = bytes.iter().take_while(|&&b| b == self.ch).count();
        len >= self.len && stripped[len..].trim().is_empty()
    }
}

/// Tags that open an HTML block even in the middle of a paragraph.
const HTML_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "search", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

/// Tags whose content is raw up to the matching close tag.
const HTML_RAW_TAGS: &[(&str, &str)] = &[
    ("pre", "</pre>"),
    ("script", "</script>"),
    ("style", "</style>"),
    ("textarea", "</textarea>"),
];

/// A lone open or close tag on its own line.
static HTML_LONE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"^(?:<[A-Za-z][A-Za-z0-9\-]*(?:\s+[A-Za-z_:][A-Za-z0-9_.:\-]*"#,
        r#"(?:\s*=\s*(?:[^\s"'=<>`]+|'[^']*'|"[^"]*"))?)*\s*/?>"#,
        r"|</[A-Za-z][A-Za-z0-9\-]*\s*>)\s*$"
    ))
    .expect("lone tag pattern is valid")
});

static LINK_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?:[^\]\\]|\\.)+\]:").expect("link definition pattern is valid")
});

/// How an open HTML block ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlBlock {
    /// On the line containing this (lower-case) marker.
    Until(&'static str),
    /// Before the next blank line.
    UntilBlank,
}

impl HtmlBlock {
    fn open(stripped: &str, at_block_start: bool) -> Option<Self> {
        let rest = stripped.strip_prefix('<')?;
        let lower = rest.to_ascii_lowercase();

        for &(tag, end) in HTML_RAW_TAGS {
            if lower
                .strip_prefix(tag)
                .is_some_and(|after| ends_tag_name(after, false))
            {
                return Some(HtmlBlock::Until(end));
            }
        }

        if lower.starts_with("!--") {
            return Some(HtmlBlock::Until("-->"));
        }
        if lower.starts_with('?') {
            return Some(HtmlBlock::Until("?>"));
        }
        if lower.starts_with("![cdata[") {
            return Some(HtmlBlock::Until("]]>"));
        }
        if lower
            .strip_prefix('!')
            .is_some_and(|after| after.starts_with(|c: char| c.is_ascii_alphabetic()))
        {
            return Some(HtmlBlock::Until(">"));
        }

        let name_start = lower.strip_prefix('/').unwrap_or(&lower);
        let name_len = name_start
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();
        let name = &name_start[..name_len];
        if HTML_BLOCK_TAGS.contains(&name) && ends_tag_name(&name_start[name_len..], true) {
            return Some(HtmlBlock::UntilBlank);
        }

        // A lone tag of any other name cannot interrupt a paragraph.
        (at_block_start && HTML_LONE_TAG.is_match(stripped)).then_some(HtmlBlock::UntilBlank)
    }

    fn ends(self, line: &str) -> bool {
        match self {
            HtmlBlock::Until(marker) => line.to_ascii_lowercase().contains(marker),
            HtmlBlock::UntilBlank => line.trim().is_empty(),
        }
    }
}

fn ends_tag_name(after: &str, allow_self_close: bool) -> bool {
    after.is_empty()
        || after.starts_with([' ', '\t', '>'])
        || (allow_self_close && after.starts_with("/>"))
}

#[derive(Debug, Default)]
struct BlockScanner {
    fence: Option<Fence>,
    html: Option<HtmlBlock>,
    in_indented_code: bool,
    prev_blank: bool,
    after_heading: bool,
    in_list: bool,
    started: bool,
}

impl BlockScanner {
    fn classify(&mut self, line: &str) -> LineKind {
        let content = line.trim_end_matches(['\n', '\r']);
        let stripped = content.trim_start_matches([' ', '\t', '>']);

        if let Some(fence) = self.fence {
            if fence.closes(stripped) {
                self.fence = None;
            }
            return LineKind::Verbatim;
        }

        if let Some(html) = self.html {
            if html.ends(content) {
                self.html = None;
            }
            if html == HtmlBlock::UntilBlank && content.trim().is_empty() {
                self.prev_blank = true;
                return LineKind::Blank;
            }
            return LineKind::Verbatim;
        }

        if content.trim().is_empty() {
            self.prev_blank = true;
            return LineKind::Blank;
        }

        let indent = leading_indent(content);
        let prev_blank = std::mem::replace(&mut self.prev_blank, false);
        let after_heading = std::mem::replace(&mut self.after_heading, false);
        let first_line = !std::mem::replace(&mut self.started, true);
        let at_block_start = prev_blank || after_heading || first_line;

        if indent >= 4 && (prev_blank || self.in_indented_code) && !self.in_list {
            self.in_indented_code = true;
            return LineKind::Verbatim;
        }
        self.in_indented_code = false;

        if let Some(fence) = Fence::open(stripped) {
            self.fence = Some(fence);
            return LineKind::Verbatim;
        }

        let trimmed = content.trim_start();
        if indent < 4 {
            if let Some(html) = HtmlBlock::open(stripped, at_block_start) {
                if !html.ends(content) {
                    self.html = Some(html);
                }
                return LineKind::Verbatim;
            }

            if at_block_start && LINK_DEFINITION.is_match(trimmed) {
                return LineKind::Verbatim;
            }
        }

        if is_list_item(trimmed) {
            self.in_list = true;
            return LineKind::BlockStart;
        }

        if indent == 0 && prev_blank {
            self.in_list = false;
        }

        // ATX headings never continue onto the next line.
        self.after_heading = trimmed.starts_with('#');

        if trimmed.starts_with(['#', '>', '|']) || prev_blank || after_heading {
            LineKind::BlockStart
        } else {
            LineKind::Continuation
        }
    }
}

fn leading_indent(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - width % 4,
            _ => break,
        }
    }
    width
}

fn is_list_item(trimmed: &str) -> bool {
    let bytes = trimmed.as_bytes();
    match bytes.first() {
        Some(b'-' | b'*' | b'+') => matches!(bytes.get(1), Some(b' ' | b'\t') | None),
        Some(b) if b.is_ascii_digit() => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            digits <= 9
                && matches!(bytes.get(digits), Some(b'.' | b')'))
                && matches!(bytes.get(digits + 1), Some(b' ' | b'\t') | None)
        }
        _ => false,
    }
}
