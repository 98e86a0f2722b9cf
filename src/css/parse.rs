//! Style sheet structure.
//!
//! A [`Stylesheet`] is an ordered list of rules. Style rules keep their
//! selector list split into individual selectors and their declaration block
//! as raw text; at-rules keep their name and prelude, and grouping at-rules
//! (`@media` and friends) are parsed recursively so the pruner can descend
//! into them. Everything else is carried through verbatim.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};

use crate::error::{Error, Result};

type CssParseError<'i> = ParseError<'i, ()>;

/// At-rules whose block is itself a list of rules.
const GROUPING_AT_RULES: &[&str] = &["media", "supports", "layer", "container", "document"];

/// A parsed style sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

/// One top-level or nested rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssRule {
    /// `a, b.c { … }`
    Style {
        selectors: Vec<String>,
        /// Declaration block without the braces.
        block: String,
    },
    /// `@name prelude { … }` or `@name prelude;`
    At {
        name: String,
        prelude: String,
        body: AtBody,
    },
}

/// Body of an at-rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtBody {
    /// Statement at-rule ending in `;`.
    None,
    /// Nested rule list.
    Rules(Vec<CssRule>),
    /// Any other block, kept as text without the braces.
    Raw(String),
}

impl CssRule {
    /// Whether this is an `@font-face` rule.
    pub fn is_font_face(&self) -> bool {
        matches!(self, CssRule::At { name, .. } if name.eq_ignore_ascii_case("font-face"))
    }

    /// Append the rule's CSS text to `out`.
    pub fn write_css(&self, out: &mut String) {
        match self {
            CssRule::Style { selectors, block } => {
                out.push_str(&selectors.join(","));
                out.push('{');
                out.push_str(block);
                out.push('}');
            }
            CssRule::At {
                name,
                prelude,
                body,
            } => {
                out.push('@');
                out.push_str(name);
                if !prelude.is_empty() {
                    out.push(' ');
                    out.push_str(prelude);
                }
                match body {
                    AtBody::None => out.push(';'),
                    AtBody::Rules(rules) => {
                        out.push('{');
                        for rule in rules {
                            rule.write_css(out);
                        }
                        out.push('}');
                    }
                    AtBody::Raw(block) => {
                        out.push('{');
                        out.push_str(block);
                        out.push('}');
                    }
                }
            }
        }
    }
}

impl Stylesheet {
    /// Parse a style sheet.
    ///
    /// Any rule the CSS syntax rules reject (a selector with no block, a stray
    /// closing brace) is an [`Error::Style`] carrying its location.
    pub fn parse(css: &str) -> Result<Self> {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);

        let rules = parse_rule_list(&mut parser).map_err(|(err, slice)| Error::Style {
            line: err.location.line + 1,
            column: err.location.column,
            message: format!("invalid rule near {:?}", slice.trim()),
        })?;

        Ok(Self { rules })
    }

    /// Serialize back to CSS text.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            rule.write_css(&mut out);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_rule_list<'i>(
    input: &mut Parser<'i, '_>,
) -> std::result::Result<Vec<CssRule>, (CssParseError<'i>, &'i str)> {
    let mut rule_parser = RuleListParser;
    let mut rules = Vec::new();

    for result in StyleSheetParser::new(input, &mut rule_parser) {
        rules.push(result?);
    }

    Ok(rules)
}

/// Consume the rest of `input` and return its source text.
fn rest_of<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next_including_whitespace_and_comments().is_ok() {}
    input.slice_from(start)
}

// =============================================================================
// Rule parser
// =============================================================================

struct RuleListParser;

struct AtPrelude {
    name: String,
    prelude: String,
}

impl<'i> AtRuleParser<'i> for RuleListParser {
    type Prelude = AtPrelude;
    type AtRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, CssParseError<'i>> {
        Ok(AtPrelude {
            name: name.to_string(),
            prelude: rest_of(input).trim().to_string(),
        })
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> std::result::Result<Self::AtRule, ()> {
        Ok(CssRule::At {
            name: prelude.name,
            prelude: prelude.prelude,
            body: AtBody::None,
        })
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::AtRule, CssParseError<'i>> {
        let grouping = GROUPING_AT_RULES
            .iter()
            .any(|g| prelude.name.eq_ignore_ascii_case(g));

        let body = if grouping {
            AtBody::Rules(parse_rule_list(input).map_err(|(err, _)| err)?)
        } else {
            AtBody::Raw(rest_of(input).trim().to_string())
        };

        Ok(CssRule::At {
            name: prelude.name,
            prelude: prelude.prelude,
            body,
        })
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleListParser {
    type Prelude = Vec<String>;
    type QualifiedRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, CssParseError<'i>> {
        let selectors = input.parse_comma_separated(|i| {
            Ok::<_, CssParseError<'i>>(rest_of(i).trim().to_string())
        })?;
        Ok(selectors.into_iter().filter(|s| !s.is_empty()).collect())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::QualifiedRule, CssParseError<'i>> {
        Ok(CssRule::Style {
            selectors: prelude,
            block: rest_of(input).trim().to_string(),
        })
    }
}

// =============================================================================
// Declaration lookup
// =============================================================================

/// One `name: value` declaration with its raw value text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

/// Split a declaration block into declarations, in source order.
///
/// Declarations that fail to parse are skipped.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(block);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();
    let mut decl_parser = DeclarationListParser {
        declarations: &mut declarations,
    };

    for result in RuleBodyParser::new(&mut parser, &mut decl_parser) {
        // Ignore errors - lenient parsing
        let _ = result;
    }

    declarations
}

/// Serialize declarations back into block text.
pub fn write_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| format!("{}:{}", d.name, d.value))
        .collect::<Vec<_>>()
        .join(";")
}

/// Find the value of `property` in a declaration block.
///
/// Returns the raw value text of the last declaration of that property,
/// trimmed, or `None` if it is not declared.
pub fn declaration_value(block: &str, property: &str) -> Option<String> {
    parse_declarations(block)
        .into_iter()
        .rev()
        .find(|d| d.name.eq_ignore_ascii_case(property))
        .map(|d| d.value)
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Vec<Declaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> std::result::Result<Self::Declaration, CssParseError<'i>> {
        self.declarations.push(Declaration {
            name: name.to_string(),
            value: rest_of(input).trim().to_string(),
        });
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}
