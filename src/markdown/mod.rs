//! Markdown to HTML rendering.
//!
//! The heavy lifting (block structure, emphasis, lists, tables) is done by
//! `pulldown-cmark`. This module patches the edges where a generic engine
//! does the wrong thing for a single-page book:
//!
//! - [`tokenize`]: tells `$math$` apart from `` `code` `` before the engine
//!   sees the text, re-emitting both as code spans the engine understands
//! - [`headings`]: unique heading anchors and the numbered table of contents
//! - [`alert`]: `> [!NOTE]` style callouts inside blockquotes
//! - [`render`]: the per-render event-mapping pass tying everything together
//! - [`slugify`] / [`escape`]: small pure string helpers
//!
//! ## Design Notes
//!
//! - **Per-render state**: every call to [`MarkdownRenderer::render`] builds a
//!   fresh [`HeadingTracker`] and [`AssetFlags`], so concurrent renders of
//!   different documents never share state
//! - **Math sentinel**: math spans travel through the engine as inline code
//!   wrapped in `__math__:` / `:__math__`; the render pass unwraps them
//! - **Anchors for every level**: headings deeper than the TOC limit still
//!   get ids, they just don't appear in the tree

pub mod alert;
mod escape;
pub mod headings;
mod render;
mod slugify;
pub mod tokenize;

pub use alert::{AlertBlock, AlertKind};
pub use escape::{escape_attr, escape_html, inline_code_fence};
pub use headings::{
    DEFAULT_MAX_TOC_LEVEL, Heading, HeadingTracker, TocConfig, render_toc, toc_text,
};
pub use render::{AssetFlags, MarkdownRenderer, RenderOutput};
pub use slugify::{DEFAULT_SLUG_PATTERN, SlugPolicy, Slugger, slugify};
pub use tokenize::{Token, TokenKind, classify_span, plain_text_len, rewrite_source};
