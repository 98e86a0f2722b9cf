//! Style sheet reduction.
//!
//! The page ships one inlined style sheet, reduced to what the rendered
//! markup uses:
//!
//! - [`prune`]: the default [`StylePruner`], dropping rules whose selectors
//!   match nothing in the markup
//! - [`minify`]: token-level minifier
//! - [`fontface`]: restores `@font-face` rules referenced only by family name
//! - [`inline`]: turns WOFF2 font sources into `data:` URLs
//! - [`parse`]: the rule-level style sheet model shared by the passes above
//!
//! [`StyleSheetPruner`] runs prune, minify and font-face restoration in that
//! order.

use std::sync::Arc;

pub mod fontface;
pub mod inline;
mod minify;
pub mod parse;
pub mod prune;

pub use fontface::restore_font_faces;
pub use inline::inline_fonts;
pub use minify::minify;
pub use parse::{AtBody, CssRule, Stylesheet};
pub use prune::{MarkupInventory, SelectorPruner};

use crate::error::Result;

/// One piece of the corpus a style sheet is pruned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub raw: String,
    /// Content type, e.g. `html`.
    pub extension: String,
}

impl Content {
    pub fn new(raw: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            extension: extension.into(),
        }
    }

    pub fn html(raw: impl Into<String>) -> Self {
        Self::new(raw, "html")
    }
}

/// An unused-rule elimination engine.
pub trait StylePruner: Send + Sync {
    /// Return `css` without the rules that nothing in `content` uses.
    fn prune(&self, css: &str, content: &[Content]) -> Result<String>;
}

/// Reduces a style sheet against the final page markup.
#[derive(Clone)]
pub struct StyleSheetPruner {
    pruner: Arc<dyn StylePruner>,
}

impl Default for StyleSheetPruner {
    fn default() -> Self {
        Self::new(Arc::new(SelectorPruner))
    }
}

impl StyleSheetPruner {
    pub fn new(pruner: Arc<dyn StylePruner>) -> Self {
        Self { pruner }
    }

    /// Prune, minify and (when math styles are present) restore font-faces.
    pub fn process(&self, css: &str, markup: &str, has_math: bool) -> Result<String> {
        let pruned = self.pruner.prune(css, &[Content::html(markup)])?;
        let minified = minify(&pruned);

        if !has_math {
            return Ok(minified);
        }

        restore_font_faces(&minified, markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"
        /* base */
        body { margin: 0; }
        .unused { color: red; }
        @font-face { font-family: "Foo"; src: url(foo.woff2); }
        @font-face { font-family: "Bar"; src: url(bar.woff2); }
    "#;

    #[test]
    fn test_process_without_math_keeps_font_faces() {
        let out = StyleSheetPruner::default()
            .process(SHEET, "<html><body><p>x</p></body></html>", false)
            .unwrap();
        assert!(out.starts_with("body{margin:0}"));
        assert!(!out.contains("unused"));
        assert!(out.contains("\"Foo\""));
        assert!(out.contains("\"Bar\""));
    }

    #[test]
    fn test_process_with_math_restores_referenced_faces() {
        let markup = r#"<html><body><span style="font-family: Foo">x</span></body></html>"#;
        let out = StyleSheetPruner::default().process(SHEET, markup, true).unwrap();
        assert_eq!(
            out,
            "@font-face{font-family:\"Foo\";src:url(foo.woff2)}body{margin:0}"
        );
    }

    #[test]
    fn test_custom_pruner() {
        struct KeepAll;
        impl StylePruner for KeepAll {
            fn prune(&self, css: &str, _content: &[Content]) -> Result<String> {
                Ok(css.to_string())
            }
        }

        let out = StyleSheetPruner::new(Arc::new(KeepAll))
            .process(SHEET, "", false)
            .unwrap();
        assert!(out.contains(".unused{color:red}"));
    }
}
