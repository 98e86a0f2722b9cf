//! # quire
//!
//! Render an ordered set of markdown chapters into one self-contained,
//! navigable HTML page.
//!
//! ## Features
//!
//! - Book index from an explicit chapter list or scanned from `README.md` /
//!   `index.md`
//! - Numbered, anchor-linked table of contents with page-unique heading ids
//! - `$math$` and `` `code` `` told apart before markdown parsing; math is
//!   rendered to MathML
//! - `> [!NOTE]` / `[!IMPORTANT]` / `[!WARNING]` callouts
//! - Style sheet pruned against the rendered page, with `@font-face` rules
//!   restored when their family is still referenced
//!
//! ## Quick Start
//!
//! ```no_run
//! use quire::{PageAssembler, PageConfig};
//!
//! let page = PageAssembler::new(PageConfig::new("docs")).render().unwrap();
//! std::fs::write("index.html", &page.html).unwrap();
//! ```
//!
//! ## Rendering markdown directly
//!
//! ```
//! use quire::MarkdownRenderer;
//!
//! let out = MarkdownRenderer::default().render("# Intro\n\nInline `code` and $x^2$.");
//! assert_eq!(out.headings[0].id, "intro");
//! assert!(out.assets.math);
//! ```

pub mod book;
pub mod css;
pub mod error;
pub mod markdown;
pub mod math;
pub mod page;
pub(crate) mod util;

use std::path::Path;

pub use book::{BookIndex, IndexResolver, IndexSource};
pub use css::{StylePruner, StyleSheetPruner};
pub use error::{Error, Result};
pub use markdown::{AssetFlags, Heading, HeadingTracker, MarkdownRenderer, SlugPolicy, TocConfig};
pub use math::{MathMlRenderer, MathMode, MathRenderer};
pub use page::{AssetSource, PageAssembler, PageConfig, RenderedPage};

/// Render the book rooted at `base_dir` with default settings.
///
/// The index is scanned from the first of `README.md` / `index.md` that
/// exists.
pub fn render_book(base_dir: impl AsRef<Path>) -> Result<RenderedPage> {
    PageAssembler::new(PageConfig::new(base_dir.as_ref())).render()
}
