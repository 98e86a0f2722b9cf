//! Unused rule elimination.
//!
//! [`SelectorPruner`] is the default [`StylePruner`]: it inventories the tag
//! names, ids, classes and attribute names present in the rendered markup and
//! drops every selector that requires something the inventory lacks. The
//! check is deliberately coarse (no structural matching), so it only ever
//! errs on the side of keeping a rule.

use std::cell::RefCell;
use std::collections::HashSet;

use cssparser::{ParseError, Parser, ParserInput, Token};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token as HtmlToken, TokenSink, TokenSinkResult, Tokenizer,
    TokenizerOpts,
};

use super::parse::{AtBody, CssRule, Stylesheet};
use super::{Content, StylePruner};
use crate::error::Result;

type CssParseError<'i> = ParseError<'i, ()>;

// ============================================================================
// Markup inventory
// ============================================================================

/// Names present in a markup corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupInventory {
    pub tags: HashSet<String>,
    pub ids: HashSet<String>,
    pub classes: HashSet<String>,
    pub attributes: HashSet<String>,
}

impl MarkupInventory {
    /// Tokenize `content` and collect every start tag's names.
    pub fn from_content(content: &[Content]) -> Self {
        let sink = InventorySink::default();
        let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
        let queue = BufferQueue::default();

        for item in content {
            queue.push_back(StrTendril::from_slice(&item.raw));
            let _ = tokenizer.feed(&queue);
        }
        tokenizer.end();

        tokenizer.sink.inventory.take()
    }

    pub fn from_html(html: &str) -> Self {
        Self::from_content(&[Content::html(html)])
    }

    /// Whether every requirement of `selector` is present.
    pub fn satisfies(&self, selector: &SelectorRequirements) -> bool {
        selector.tags.iter().all(|t| self.tags.contains(t))
            && selector.ids.iter().all(|i| self.ids.contains(i))
            && selector.classes.iter().all(|c| self.classes.contains(c))
            && selector.attributes.iter().all(|a| self.attributes.contains(a))
    }
}

#[derive(Default)]
struct InventorySink {
    inventory: RefCell<MarkupInventory>,
}

impl TokenSink for InventorySink {
    type Handle = ();

    fn process_token(&self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        if let HtmlToken::TagToken(tag) = token
            && tag.kind == TagKind::StartTag
        {
            let mut inventory = self.inventory.borrow_mut();
            inventory.tags.insert(tag.name.to_string());

            for attr in &tag.attrs {
                let name = attr.name.local.to_string();
                match name.as_str() {
                    "id" => {
                        inventory.ids.insert(attr.value.to_string());
                    }
                    "class" => {
                        for class in attr.value.split_ascii_whitespace() {
                            inventory.classes.insert(class.to_string());
                        }
                    }
                    _ => {}
                }
                inventory.attributes.insert(name);
            }
        }

        TokenSinkResult::Continue
    }
}

// ============================================================================
// Selector requirements
// ============================================================================

/// What a selector needs from the markup in order to match anything.
///
/// Only simple selectors outside pseudo-class arguments count; `:not(.x)` and
/// friends are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorRequirements {
    pub tags: Vec<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<String>,
}

impl SelectorRequirements {
    pub fn parse(selector: &str) -> Self {
        let mut requirements = Self::default();
        let mut input = ParserInput::new(selector);
        let mut parser = Parser::new(&mut input);

        collect_requirements(&mut parser, &mut requirements);
        requirements
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Previous {
    Dot,
    Colon,
    Other,
}

fn collect_requirements(parser: &mut Parser, req: &mut SelectorRequirements) {
    let mut previous = Previous::Other;

    while let Ok(token) = parser.next_including_whitespace() {
        let next = match token {
            Token::Delim('.') => Previous::Dot,
            Token::Colon => Previous::Colon,
            Token::Ident(name) => {
                match previous {
                    Previous::Dot => req.classes.push(name.to_string()),
                    Previous::Colon => {}
                    Previous::Other => req.tags.push(name.to_ascii_lowercase()),
                }
                Previous::Other
            }
            Token::IDHash(id) => {
                req.ids.push(id.to_string());
                Previous::Other
            }
            Token::SquareBracketBlock => {
                let _ = parser.parse_nested_block(|p| {
                    if let Ok(Token::Ident(name)) = p.next() {
                        req.attributes.push(name.to_ascii_lowercase());
                    }
                    Ok::<_, CssParseError>(())
                });
                Previous::Other
            }
            // Pseudo-class arguments (and any other function) are skipped.
            _ => Previous::Other,
        };
        previous = next;
    }
}

// ============================================================================
// Pruner
// ============================================================================

/// Default pruning engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorPruner;

impl StylePruner for SelectorPruner {
    fn prune(&self, css: &str, content: &[Content]) -> Result<String> {
        let inventory = MarkupInventory::from_content(content);
        let sheet = Stylesheet::parse(css)?;
        let before = sheet.rules.len();

        let rules = prune_rules(sheet.rules, &inventory);
        log::debug!("pruned style sheet from {before} to {} top-level rules", rules.len());

        Ok(Stylesheet { rules }.to_css())
    }
}

/// Drop selectors the inventory cannot satisfy, and rules left without any.
pub fn prune_rules(rules: Vec<CssRule>, inventory: &MarkupInventory) -> Vec<CssRule> {
    rules
        .into_iter()
        .filter_map(|rule| match rule {
            CssRule::Style { selectors, block } => {
                let selectors: Vec<String> = selectors
                    .into_iter()
                    .filter(|s| inventory.satisfies(&SelectorRequirements::parse(s)))
                    .collect();
                (!selectors.is_empty()).then_some(CssRule::Style { selectors, block })
            }
            CssRule::At {
                name,
                prelude,
                body: AtBody::Rules(inner),
            } => {
                let inner = prune_rules(inner, inventory);
                (!inner.is_empty()).then_some(CssRule::At {
                    name,
                    prelude,
                    body: AtBody::Rules(inner),
                })
            }
            other => Some(other),
        })
        .collect()
}
