//! Token-level CSS minifier.
//!
//! Re-serializes the token stream with comments dropped, whitespace collapsed
//! to the minimum that keeps tokens apart, and the trailing `;` of every block
//! removed. Token text is copied from the source, so numbers, escapes and
//! `unicode-range` values come out exactly as written.

use cssparser::{ParseError, Parser, ParserInput, Token};

type CssParseError<'i> = ParseError<'i, ()>;

/// Characters after which whitespace is never significant.
const NO_SPACE_AFTER: &[char] = &['{', '}', ';', ',', '>', '(', ':'];
/// Characters before which whitespace is never significant.
const NO_SPACE_BEFORE: &[char] = &['{', '}', ';', ',', '>', ')', '!'];

/// Minify a style sheet.
///
/// # Examples
///
/// ```
/// use quire::css::minify;
///
/// let css = "/* header */\n.a  >  b {\n  color: red ;\n}\n";
/// assert_eq!(minify(css), ".a>b{color:red}");
/// ```
pub fn minify(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    minify_recursive(&mut parser, &mut out);
    out
}

fn minify_recursive(parser: &mut Parser, out: &mut String) {
    let mut pending_space = false;

    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => {
                pending_space = true;
                continue;
            }
            _ => {}
        }

        let text = parser.slice_from(start);
        if pending_space && needs_space(out, text) {
            out.push(' ');
        }
        pending_space = false;

        let closer = match token {
            Token::Function(_) | Token::ParenthesisBlock => Some(')'),
            Token::SquareBracketBlock => Some(']'),
            Token::CurlyBracketBlock => Some('}'),
            _ => None,
        };

        out.push_str(text);

        if let Some(closer) = closer {
            let _ = parser.parse_nested_block(|p| {
                minify_recursive(p, out);
                Ok::<_, CssParseError>(())
            });

            if closer == '}' && out.ends_with(';') {
                out.pop();
            }
            out.push(closer);
        }
    }
}

fn needs_space(out: &str, next: &str) -> bool {
    let Some(prev) = out.chars().next_back() else {
        return false;
    };
    let Some(next) = next.chars().next() else {
        return false;
    };

    !NO_SPACE_AFTER.contains(&prev) && !NO_SPACE_BEFORE.contains(&next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_comments() {
        assert_eq!(minify("/* a */ p { x: y } /* b */"), "p{x:y}");
    }

    #[test]
    fn test_keeps_descendant_space() {
        assert_eq!(minify("nav   ol  li { a: b }"), "nav ol li{a:b}");
    }

    #[test]
    fn test_keeps_pseudo_class_space() {
        assert_eq!(minify("a :hover { x: y }"), "a :hover{x:y}");
    }

    #[test]
    fn test_drops_last_semicolon() {
        assert_eq!(minify("a { x: 1; y: 2; }"), "a{x:1;y:2}");
    }

    #[test]
    fn test_important() {
        assert_eq!(minify("a { x: 1 !important; }"), "a{x:1!important}");
    }

    #[test]
    fn test_nested_blocks() {
        assert_eq!(
            minify("@media screen and (max-width: 600px) {\n  .a { x: calc(1px + 2px); }\n}"),
            "@media screen and (max-width:600px){.a{x:calc(1px + 2px)}}"
        );
    }

    #[test]
    fn test_preserves_token_text() {
        assert_eq!(
            minify("@font-face { unicode-range: U+0000-00FF; src: url(a.woff2) format(\"woff2\") }"),
            "@font-face{unicode-range:U+0000-00FF;src:url(a.woff2) format(\"woff2\")}"
        );
    }

    #[test]
    fn test_strings_untouched() {
        assert_eq!(minify("a::before { content: \"  x ; y  \" }"), "a::before{content:\"  x ; y  \"}");
    }

    #[test]
    fn test_idempotent() {
        let once = minify(".a , .b > c { color : red ; margin : 0 auto }");
        assert_eq!(minify(&once), once);
    }
}
