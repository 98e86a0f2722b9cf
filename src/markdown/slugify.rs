//! Slug generation for heading anchors.
//!
//! A slug is the heading title lower-cased with every run of characters
//! matched by the policy pattern replaced by a separator. The default policy
//! collapses runs of non-word characters (anything outside `[A-Za-z0-9_]`)
//! into a single hyphen and does not trim the result, so `"Hello, World!"`
//! becomes `"hello-world-"`.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default pattern: runs of ASCII non-word characters.
pub const DEFAULT_SLUG_PATTERN: &str = "[^A-Za-z0-9_]+";

/// Configurable slug policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlugPolicy {
    /// Regular expression matching the runs to replace.
    pub pattern: String,
    /// Replacement for each matched run.
    pub separator: String,
}

impl Default for SlugPolicy {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_SLUG_PATTERN.to_string(),
            separator: "-".to_string(),
        }
    }
}

impl SlugPolicy {
    /// Compile the policy into a reusable [`Slugger`].
    pub fn compile(&self) -> Result<Slugger> {
        Ok(Slugger {
            pattern: Regex::new(&self.pattern)?,
            separator: self.separator.clone(),
        })
    }
}

/// A compiled slug policy.
#[derive(Debug, Clone)]
pub struct Slugger {
    pattern: Regex,
    separator: String,
}

impl Default for Slugger {
    fn default() -> Self {
        DEFAULT_SLUGGER.clone()
    }
}

impl Slugger {
    /// Generate a slug from heading text.
    pub fn slugify(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        self.pattern
            .replace_all(&lower, NoExpand(&self.separator))
            .into_owned()
    }
}

static DEFAULT_SLUGGER: LazyLock<Slugger> = LazyLock::new(|| Slugger {
    pattern: Regex::new(DEFAULT_SLUG_PATTERN).expect("default slug pattern is valid"),
    separator: "-".to_string(),
});

/// Generate a slug with the default policy.
///
/// # Examples
///
/// ```
/// use quire::markdown::slugify;
///
/// assert_eq!(slugify("Chapter One"), "chapter-one");
/// assert_eq!(slugify("Hello, World!"), "hello-world-");
/// ```
pub fn slugify(text: &str) -> String {
    DEFAULT_SLUGGER.slugify(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slugify_simple() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn test_slugify_with_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world-");
    }

    #[test]
    fn test_slugify_multiple_spaces() {
        assert_eq!(slugify("Hello   World"), "hello-world");
    }

    #[test]
    fn test_slugify_leading_trailing_spaces() {
        assert_eq!(slugify("  Hello World  "), "-hello-world-");
    }

    #[test]
    fn test_slugify_underscores_are_word_characters() {
        assert_eq!(slugify("hello_world"), "hello_world");
    }

    #[test]
    fn test_slugify_mixed_case() {
        assert_eq!(slugify("Chapter ONE"), "chapter-one");
    }

    #[test]
    fn test_slugify_numbers() {
        assert_eq!(slugify("Chapter 1.2"), "chapter-1-2");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
    }

    #[test]
    fn test_custom_policy() {
        let slugger = SlugPolicy {
            pattern: r"\s+".to_string(),
            separator: "_".to_string(),
        }
        .compile()
        .unwrap();
        assert_eq!(slugger.slugify("Hello Big World"), "hello_big_world");
    }

    #[test]
    fn test_separator_is_literal() {
        let slugger = SlugPolicy {
            pattern: r"\s+".to_string(),
            separator: "$1".to_string(),
        }
        .compile()
        .unwrap();
        assert_eq!(slugger.slugify("a b"), "a$1b");
    }

    #[test]
    fn test_invalid_pattern() {
        let policy = SlugPolicy {
            pattern: "(".to_string(),
            separator: "-".to_string(),
        };
        assert!(policy.compile().is_err());
    }

    proptest! {
        #[test]
        fn slug_never_has_adjacent_separators(text in "\\PC{0,40}") {
            let slug = slugify(&text);
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c == '-' || c.is_ascii_alphanumeric() || c == '_'));
        }
    }
}
