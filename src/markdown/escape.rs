//! Pure HTML escaping utilities.
//!
//! The markup engine escapes the text it renders itself; these helpers cover
//! the fragments this crate writes by hand (headings, images, code, the TOC
//! and the page shell).

/// Escape text for use as HTML element content.
///
/// # Examples
///
/// ```
/// use quire::markdown::escape_html;
///
/// assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape text for use inside a double-quoted HTML attribute.
///
/// # Examples
///
/// ```
/// use quire::markdown::escape_attr;
///
/// assert_eq!(escape_attr(r#"say "hi""#), "say &quot;hi&quot;");
/// ```
pub fn escape_attr(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Calculate the backtick fence needed to wrap `content` in an inline code span.
///
/// Returns one more backtick than the longest backtick run in the content.
pub fn inline_code_fence(content: &str) -> String {
    let mut max_run = 0;
    let mut current_run = 0;

    for c in content.chars() {
        if c == '`' {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }

    "`".repeat(max_run + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_plain() {
        assert_eq!(escape_html("hello"), "hello");
    }

    #[test]
    fn test_escape_html_special() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_escape_html_keeps_quotes() {
        assert_eq!(escape_html("\"x\""), "\"x\"");
    }

    #[test]
    fn test_escape_attr_quotes() {
        assert_eq!(escape_attr("a\"b'c"), "a&quot;b&#39;c");
    }

    #[test]
    fn test_inline_code_fence() {
        assert_eq!(inline_code_fence("plain"), "`");
        assert_eq!(inline_code_fence("use `x`"), "``");
        assert_eq!(inline_code_fence("a ``` b"), "````");
    }
}
