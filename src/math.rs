//! Math typesetting.
//!
//! The renderer only needs a [`MathRenderer`]: something that turns a LaTeX
//! expression into self-contained markup and never fails. [`MathMlRenderer`]
//! is the default, converting to MathML with `latex2mathml` after expanding a
//! table of single-argument macros. Malformed expressions come back as an
//! inline error marker.

use std::collections::BTreeMap;

use latex2mathml::{DisplayStyle, latex_to_mathml};

use crate::markdown::{escape_attr, escape_html};

/// Inline or display (block) math.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathMode {
    Inline,
    Display,
}

/// A math typesetting engine.
///
/// Implementations must be tolerant: malformed input renders as an inline
/// error annotation instead of failing.
pub trait MathRenderer: Send + Sync {
    fn render(&self, expr: &str, mode: MathMode) -> String;
}

/// The default macro table.
pub fn default_macros() -> BTreeMap<String, String> {
    let mut macros = BTreeMap::new();
    macros.insert(r"\label".to_string(), r"\qquad\text{(#1)}".to_string());
    macros
}

/// Renders LaTeX to MathML.
#[derive(Debug, Clone)]
pub struct MathMlRenderer {
    macros: BTreeMap<String, String>,
}

impl Default for MathMlRenderer {
    fn default() -> Self {
        Self::new(default_macros())
    }
}

impl MathMlRenderer {
    pub fn new(macros: BTreeMap<String, String>) -> Self {
        Self { macros }
    }

    pub fn macros(&self) -> &BTreeMap<String, String> {
        &self.macros
    }
}

impl MathRenderer for MathMlRenderer {
    fn render(&self, expr: &str, mode: MathMode) -> String {
        let expanded = expand_macros(expr, &self.macros);
        let style = match mode {
            MathMode::Inline => DisplayStyle::Inline,
            MathMode::Display => DisplayStyle::Block,
        };

        match latex_to_mathml(&expanded, style) {
            Ok(mathml) => mathml,
            Err(err) => {
                log::debug!("math error in {expr:?}: {err}");
                error_marker(expr, &err.to_string())
            }
        }
    }
}

/// Inline marker shown in place of an expression that failed to render.
pub fn error_marker(expr: &str, message: &str) -> String {
    format!(
        "<span class=\"math-error\" title=\"{}\">{}</span>",
        escape_attr(message),
        escape_html(expr)
    )
}

/// Maximum number of expansion rounds, bounding self-referential macros.
const MAX_EXPANSION_ROUNDS: usize = 16;

/// Expand macros in `expr`.
///
/// A macro name is a control sequence such as `\label`. When the replacement
/// mentions `#1`, the following braced group (or single character) is taken
/// as the argument.
pub fn expand_macros(expr: &str, macros: &BTreeMap<String, String>) -> String {
    let mut current = expr.to_string();

    for _ in 0..MAX_EXPANSION_ROUNDS {
        let mut changed = false;
        for (name, replacement) in macros {
            if let Some(next) = expand_one(&current, name, replacement) {
                current = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    current
}

fn expand_one(expr: &str, name: &str, replacement: &str) -> Option<String> {
    let takes_arg = replacement.contains("#1");
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;
    let mut changed = false;

    while let Some(pos) = rest.find(name) {
        let after = &rest[pos + name.len()..];
        // `\label` must not match the start of `\labelx`.
        let is_whole = !after.starts_with(|c: char| c.is_ascii_alphabetic());
        if !is_whole {
            out.push_str(&rest[..pos + name.len()]);
            rest = after;
            continue;
        }

        out.push_str(&rest[..pos]);
        if takes_arg {
            let (arg, remaining) = take_argument(after);
            out.push_str(&replacement.replace("#1", arg));
            rest = remaining;
        } else {
            out.push_str(replacement);
            rest = after;
        }
        changed = true;
    }

    out.push_str(rest);
    changed.then_some(out)
}

/// Split off a macro argument: a balanced `{…}` group or one character.
fn take_argument(src: &str) -> (&str, &str) {
    let trimmed = src.trim_start();
    let Some(first) = trimmed.chars().next() else {
        return ("", trimmed);
    };

    if first != '{' {
        let len = first.len_utf8();
        return (&trimmed[..len], &trimmed[len..]);
    }

    let mut depth = 0usize;
    for (i, c) in trimmed.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return (&trimmed[1..i], &trimmed[i + 1..]);
                }
            }
            _ => {}
        }
    }

    // Unbalanced: take the rest as the argument.
    (&trimmed[1..], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_label() {
        let expanded = expand_macros(r"x = 1 \label{eq1}", &default_macros());
        assert_eq!(expanded, r"x = 1 \qquad\text{(eq1)}");
    }

    #[test]
    fn test_expand_nested_braces() {
        let mut macros = BTreeMap::new();
        macros.insert(r"\b".to_string(), r"\mathbf{#1}".to_string());
        assert_eq!(expand_macros(r"\b{x_{1}}", &macros), r"\mathbf{x_{1}}");
    }

    #[test]
    fn test_expand_single_character_argument() {
        let mut macros = BTreeMap::new();
        macros.insert(r"\b".to_string(), r"\mathbf{#1}".to_string());
        assert_eq!(expand_macros(r"\b x", &macros), r"\mathbf{x}");
    }

    #[test]
    fn test_expand_requires_whole_name() {
        let mut macros = BTreeMap::new();
        macros.insert(r"\R".to_string(), r"\mathbb{R}".to_string());
        assert_eq!(expand_macros(r"\Rightarrow \R", &macros), r"\Rightarrow \mathbb{R}");
    }

    #[test]
    fn test_self_referential_macro_terminates() {
        let mut macros = BTreeMap::new();
        macros.insert(r"\x".to_string(), r"\x\x".to_string());
        let expanded = expand_macros(r"\x", &macros);
        assert!(expanded.len() > 2);
    }

    #[test]
    fn test_render_inline() {
        let html = MathMlRenderer::default().render("x^2", MathMode::Inline);
        assert!(html.starts_with("<math"));
        assert!(html.contains("<msup>"));
    }

    #[test]
    fn test_render_display() {
        let html = MathMlRenderer::default().render("x^2", MathMode::Display);
        assert!(html.contains("display=\"block\""));
    }

    #[test]
    fn test_malformed_input_still_renders() {
        let html = MathMlRenderer::default().render(r"\frac{1}{", MathMode::Inline);
        assert!(html.starts_with("<math") || html.starts_with("<span class=\"math-error\""));
    }

    #[test]
    fn test_error_marker_escapes() {
        let html = error_marker("a<b", "bad \"thing\"");
        assert_eq!(
            html,
            "<span class=\"math-error\" title=\"bad &quot;thing&quot;\">a&lt;b</span>"
        );
    }
}
