//! Web font inlining.
//!
//! Rewrites each `@font-face` so its `src` is a single base64 `data:` URL
//! built from the face's WOFF2 source. The result is a style sheet that can
//! be embedded in one self-contained page.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cssparser::{ParseError, Parser, ParserInput, Token};

use super::parse::{AtBody, CssRule, Stylesheet, parse_declarations, write_declarations};
use crate::error::{Error, Result};

type CssParseError<'i> = ParseError<'i, ()>;

/// Inline the WOFF2 source of every font-face in `css`.
///
/// Relative URLs are resolved against `base_dir`. A font-face without a
/// `.woff2` source is an [`Error::Font`].
pub fn inline_fonts(css: &str, base_dir: &Path) -> Result<String> {
    let mut sheet = Stylesheet::parse(css)?;
    let mut inlined = 0;
    inline_rules(&mut sheet.rules, base_dir, &mut inlined)?;
    log::info!("inlined {inlined} web fonts");
    Ok(sheet.to_css())
}

fn inline_rules(rules: &mut [CssRule], base_dir: &Path, inlined: &mut usize) -> Result<()> {
    for rule in rules {
        let is_font_face = rule.is_font_face();
        match rule {
            CssRule::At {
                body: AtBody::Raw(block),
                ..
            } if is_font_face => {
                *block = inline_block(block, base_dir)?;
                *inlined += 1;
            }
            CssRule::At {
                body: AtBody::Rules(inner),
                ..
            } => inline_rules(inner, base_dir, inlined)?,
            _ => {}
        }
    }
    Ok(())
}

fn inline_block(block: &str, base_dir: &Path) -> Result<String> {
    let mut declarations = parse_declarations(block);

    let mut woff2 = None;
    for decl in &declarations {
        if decl.name.eq_ignore_ascii_case("src") {
            woff2 = extract_urls(&decl.value)
                .into_iter()
                .find(|url| is_woff2(url));
        }
    }

    let Some(url) = woff2 else {
        return Err(Error::Font(format!("no woff2 source in @font-face {{{block}}}")));
    };

    let path = base_dir.join(strip_query(&url));
    let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
    log::debug!("inlining {} ({} bytes)", path.display(), bytes.len());

    let src = format!(
        "url(data:font/woff2;base64,{}) format(\"woff2\")",
        STANDARD.encode(&bytes)
    );

    // Only the last `src` declaration wins; drop the others.
    let mut replaced = false;
    declarations.retain_mut(|decl| {
        if !decl.name.eq_ignore_ascii_case("src") {
            return true;
        }
        if replaced {
            return false;
        }
        decl.value = src.clone();
        replaced = true;
        true
    });

    Ok(write_declarations(&declarations))
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn is_woff2(url: &str) -> bool {
    strip_query(url).to_ascii_lowercase().ends_with(".woff2")
}

/// Extract all URLs referenced in a declaration value, in order.
pub fn extract_urls(value: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);

    extract_urls_recursive(&mut parser, &mut urls);
    urls
}

fn extract_urls_recursive(parser: &mut Parser, urls: &mut Vec<String>) {
    while let Ok(token) = parser.next() {
        match token {
            Token::UnquotedUrl(url) => {
                urls.push(url.to_string());
            }
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                let _ = parser.parse_nested_block(|p| {
                    if let Ok(Token::QuotedString(url)) = p.next() {
                        urls.push(url.to_string());
                    }
                    Ok::<_, CssParseError>(())
                });
            }
            Token::Function(_) | Token::ParenthesisBlock => {
                let _ = parser.parse_nested_block(|p| {
                    extract_urls_recursive(p, urls);
                    Ok::<_, CssParseError>(())
                });
            }
            _ => {}
        }
    }
}
