//! Font-face restoration.
//!
//! The pruning engine judges rules by the selectors they carry, and
//! `@font-face` has none: whether a face is used depends on its family name
//! appearing in some other rule's `font-family` value, a reference the
//! selector check never sees. This pass takes every font-face out of the
//! pruned sheet and puts back only the ones whose family name still appears
//! literally in the remaining sheet or in the markup.

use super::parse::{AtBody, CssRule, Stylesheet, declaration_value};
use crate::error::Result;

/// Remove every `@font-face` rule (at any nesting depth) from `rules`.
///
/// The removed rules are returned in document order.
pub fn extract_font_faces(rules: &mut Vec<CssRule>) -> Vec<CssRule> {
    let mut faces = Vec::new();
    extract_into(rules, &mut faces);
    faces
}

fn extract_into(rules: &mut Vec<CssRule>, faces: &mut Vec<CssRule>) {
    let mut kept = Vec::with_capacity(rules.len());

    for mut rule in rules.drain(..) {
        if rule.is_font_face() {
            faces.push(rule);
            continue;
        }

        if let CssRule::At {
            body: AtBody::Rules(inner),
            ..
        } = &mut rule
        {
            extract_into(inner, faces);
        }
        kept.push(rule);
    }

    *rules = kept;
}

/// The family name declared by a font-face rule, quotes stripped.
pub fn font_family(rule: &CssRule) -> Option<String> {
    let CssRule::At {
        body: AtBody::Raw(block),
        ..
    } = rule
    else {
        return None;
    };

    let value = declaration_value(block, "font-family")?;
    let family = strip_quotes(&value);
    (!family.is_empty()).then(|| family.to_string())
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Drop font-faces whose family is referenced neither by the rest of the
/// sheet nor by the markup.
///
/// Kept faces move to the top of the sheet in their original relative order;
/// every other rule keeps its position.
pub fn restore_font_faces(css: &str, markup: &str) -> Result<String> {
    let mut sheet = Stylesheet::parse(css)?;
    let faces = extract_font_faces(&mut sheet.rules);
    if faces.is_empty() {
        return Ok(css.to_string());
    }

    let without_faces = sheet.to_css();
    let total = faces.len();

    let mut out = String::with_capacity(css.len());
    let mut kept = 0;
    for face in &faces {
        let referenced = font_family(face).is_some_and(|family| {
            without_faces.contains(&family) || markup.contains(&family)
        });

        if referenced {
            face.write_css(&mut out);
            kept += 1;
        }
    }

    log::debug!("kept {kept} of {total} font-face rules");

    out.push_str(&without_faces);
    Ok(out)
}
