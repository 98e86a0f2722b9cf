//! Heading tree and table of contents.
//!
//! [`HeadingTracker`] observes headings in document order, assigns each one a
//! slug that is unique within the page, and nests them into a tree. The tree
//! only holds headings up to the configured maximum TOC depth; deeper
//! headings still receive ids so the body can anchor them.

use std::collections::HashSet;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::escape::{escape_attr, escape_html};
use super::slugify::Slugger;

/// Deepest heading level shown in the table of contents by default.
pub const DEFAULT_MAX_TOC_LEVEL: u8 = 3;

/// Table of contents settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    /// Deepest heading level attached to the tree.
    pub max_level: u8,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_TOC_LEVEL,
        }
    }
}

/// One heading occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// Slug, unique within the page.
    pub id: String,
    /// Heading text.
    pub title: String,
    /// Nesting depth (1 = top).
    pub level: u8,
    /// Sub-headings in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Heading>,
}

impl Heading {
    pub fn new(id: impl Into<String>, title: impl Into<String>, level: u8) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            level,
            children: Vec::new(),
        }
    }

    /// Dotted number of the heading at `index` (0-based) under `prefix`.
    pub fn numbering(prefix: &str, index: usize) -> String {
        if prefix.is_empty() {
            format!("{}", index + 1)
        } else {
            format!("{prefix}.{}", index + 1)
        }
    }

    /// Render this heading as a TOC list item.
    ///
    /// Children are only emitted while `self.level < max_level`.
    pub fn render_toc(&self, prefix: &str, index: usize, max_level: u8, out: &mut String) {
        let numbering = Self::numbering(prefix, index);

        let _ = write!(
            out,
            "<li><a href=\"#{}\">{}. {}</a>",
            escape_attr(&self.id),
            numbering,
            escape_html(&self.title)
        );

        if !self.children.is_empty() && self.level < max_level {
            out.push_str("<ol>");
            for (i, child) in self.children.iter().enumerate() {
                child.render_toc(&numbering, i, max_level, out);
            }
            out.push_str("</ol>");
        }

        out.push_str("</li>");
    }

    /// Write this heading and its visible children as indented text lines.
    pub fn write_toc_text(&self, prefix: &str, index: usize, max_level: u8, out: &mut String) {
        let numbering = Self::numbering(prefix, index);
        let indent = "  ".repeat(self.level.saturating_sub(1) as usize);
        let _ = writeln!(out, "{indent}{numbering}. {} (#{})", self.title, self.id);

        if self.level < max_level {
            for (i, child) in self.children.iter().enumerate() {
                child.write_toc_text(&numbering, i, max_level, out);
            }
        }
    }
}

/// Render the top-level headings as the inner items of an `<ol>`.
pub fn render_toc(headings: &[Heading], max_level: u8) -> String {
    let mut out = String::new();
    for (i, heading) in headings.iter().enumerate() {
        heading.render_toc("", i, max_level, &mut out);
    }
    out
}

/// Render the top-level headings as a plain-text outline.
pub fn toc_text(headings: &[Heading], max_level: u8) -> String {
    let mut out = String::new();
    for (i, heading) in headings.iter().enumerate() {
        heading.write_toc_text("", i, max_level, &mut out);
    }
    out
}

/// Builds the heading tree for one render pass.
///
/// The open-ancestor chain is kept as a stack of owned headings seeded with a
/// synthetic level-0 root. A heading is moved into its parent's children when
/// it is closed, which happens in document order, so the final tree matches
/// insertion order.
#[derive(Debug)]
pub struct HeadingTracker {
    parents: Vec<Heading>,
    ids: HashSet<String>,
    slugger: Slugger,
    max_level: u8,
}

impl Default for HeadingTracker {
    fn default() -> Self {
        Self::new(Slugger::default(), DEFAULT_MAX_TOC_LEVEL)
    }
}

impl HeadingTracker {
    pub fn new(slugger: Slugger, max_level: u8) -> Self {
        Self {
            parents: vec![Heading::new("root", "root", 0)],
            ids: HashSet::new(),
            slugger,
            max_level,
        }
    }

    /// Record a heading and return a detached copy carrying its assigned id.
    pub fn push(&mut self, title: &str, level: u8) -> Heading {
        let id = self.unique_id(self.slugger.slugify(title));
        let heading = Heading::new(id, title, level);

        if level > self.max_level {
            return heading;
        }

        // Stack always holds a strict ancestor chain; the root (level 0) is
        // never popped for a positive level.
        while self.parents.last().is_some_and(|top| top.level >= level) {
            self.close_top();
        }

        self.parents.push(heading.clone());
        heading
    }

    /// Whether `id` has already been assigned in this pass.
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Close every open heading and return the synthetic root.
    pub fn into_root(mut self) -> Heading {
        while self.parents.len() > 1 {
            self.close_top();
        }
        self.parents
            .pop()
            .unwrap_or_else(|| Heading::new("root", "root", 0))
    }

    /// Close every open heading and return the top-level headings.
    pub fn into_headings(self) -> Vec<Heading> {
        self.into_root().children
    }

    fn close_top(&mut self) {
        if let Some(closed) = self.parents.pop() {
            match self.parents.last_mut() {
                Some(parent) => parent.children.push(closed),
                // A level <= 0 heading displaced the root; keep it as the root.
                None => self.parents.push(closed),
            }
        }
    }

    fn unique_id(&mut self, base: String) -> String {
        let mut id = base.clone();
        let mut n = 1;

        while self.ids.contains(&id) {
            id = format!("{base}-{n}");
            n += 1;
        }

        self.ids.insert(id.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn build(headings: &[(&str, u8)]) -> Vec<Heading> {
        let mut tracker = HeadingTracker::default();
        for (title, level) in headings {
            tracker.push(title, *level);
        }
        tracker.into_headings()
    }

    fn collect_ids(headings: &[Heading], ids: &mut Vec<String>) {
        for heading in headings {
            ids.push(heading.id.clone());
            collect_ids(&heading.children, ids);
        }
    }

    #[test]
    fn test_single_heading() {
        let tree = build(&[("Intro", 1)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "intro");
        assert_eq!(tree[0].level, 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_nested_headings() {
        let tree = build(&[("A", 1), ("A1", 2), ("A1a", 3), ("A2", 2), ("B", 1)]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].children[0].title, "A1a");
        assert_eq!(tree[0].children[1].title, "A2");
        assert_eq!(tree[1].title, "B");
    }

    #[test]
    fn test_duplicate_titles_get_suffixes() {
        let mut tracker = HeadingTracker::default();
        assert_eq!(tracker.push("Setup", 2).id, "setup");
        assert_eq!(tracker.push("Setup", 2).id, "setup-1");
        assert_eq!(tracker.push("Setup", 2).id, "setup-2");
    }

    #[test]
    fn test_suffix_skips_taken_ids() {
        let mut tracker = HeadingTracker::default();
        assert_eq!(tracker.push("a-1", 1).id, "a-1");
        assert_eq!(tracker.push("a", 1).id, "a");
        assert_eq!(tracker.push("a", 1).id, "a-2");
    }

    #[test]
    fn test_skipped_levels_attach_to_nearest_ancestor() {
        let tree = build(&[("Deep", 3), ("Top", 1), ("Sub", 3)]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].title, "Deep");
        assert_eq!(tree[1].children[0].title, "Sub");
    }

    #[test]
    fn test_deep_headings_excluded_from_tree() {
        let mut tracker = HeadingTracker::default();
        tracker.push("A", 1);
        let deep = tracker.push("Deep", 4);
        tracker.push("B", 2);
        assert_eq!(deep.id, "deep");
        assert!(tracker.contains_id("deep"));

        let tree = tracker.into_headings();
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].title, "B");
    }

    #[test]
    fn test_toc_numbering() {
        let tree = build(&[("A", 1), ("A1", 2), ("A1a", 3), ("A2", 2), ("B", 1)]);
        let html = render_toc(&tree, 3);
        assert!(html.contains("<a href=\"#a\">1. A</a>"));
        assert!(html.contains("<a href=\"#a1\">1.1. A1</a>"));
        assert!(html.contains("<a href=\"#a1a\">1.1.1. A1a</a>"));
        assert!(html.contains("<a href=\"#a2\">1.2. A2</a>"));
        assert!(html.contains("<a href=\"#b\">2. B</a>"));
    }

    #[test]
    fn test_toc_respects_max_level() {
        let tree = build(&[("A", 1), ("A1", 2), ("A1a", 3)]);
        let html = render_toc(&tree, 2);
        assert!(html.contains("A1"));
        assert!(!html.contains("A1a"));
    }

    #[test]
    fn test_toc_escapes_titles() {
        let tree = build(&[("<Tags> & more", 1)]);
        let html = render_toc(&tree, 3);
        assert!(html.contains("1. &lt;Tags&gt; &amp; more"));
    }

    #[test]
    fn test_reordering_swaps_numbers_not_ids() {
        let first = build(&[("Alpha", 1), ("Beta", 1)]);
        let second = build(&[("Beta", 1), ("Alpha", 1)]);

        let first_html = render_toc(&first, 3);
        let second_html = render_toc(&second, 3);
        assert!(first_html.contains("<a href=\"#alpha\">1. Alpha</a>"));
        assert!(second_html.contains("<a href=\"#alpha\">2. Alpha</a>"));
        assert!(second_html.contains("<a href=\"#beta\">1. Beta</a>"));
    }

    #[test]
    fn test_toc_text() {
        let tree = build(&[("A", 1), ("A1", 2)]);
        assert_eq!(toc_text(&tree, 3), "1. A (#a)\n  1.1. A1 (#a1)\n");
    }

    proptest! {
        #[test]
        fn ids_are_unique(titles in proptest::collection::vec(("[a-c ]{0,3}", 1u8..=6), 0..40)) {
            let mut tracker = HeadingTracker::default();
            let mut assigned = Vec::new();
            for (title, level) in &titles {
                assigned.push(tracker.push(title, *level).id);
            }
            let unique: HashSet<_> = assigned.iter().collect();
            prop_assert_eq!(unique.len(), assigned.len());

            let mut in_tree = Vec::new();
            collect_ids(&tracker.into_headings(), &mut in_tree);
            let unique: HashSet<_> = in_tree.iter().collect();
            prop_assert_eq!(unique.len(), in_tree.len());
        }

        #[test]
        fn children_are_deeper_than_parents(levels in proptest::collection::vec(1u8..=6, 0..40)) {
            fn check(heading: &Heading) -> bool {
                heading.level <= DEFAULT_MAX_TOC_LEVEL
                    && heading.children.iter().all(|c| c.level > heading.level && check(c))
            }
            let mut tracker = HeadingTracker::default();
            for (i, level) in levels.iter().enumerate() {
                tracker.push(&format!("h{i}"), *level);
            }
            prop_assert!(tracker.into_headings().iter().all(check));
        }
    }
}
