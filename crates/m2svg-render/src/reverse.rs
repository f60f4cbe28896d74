use crate::markup::unescape_attr;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static NOWRAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="nowrap">( ?)(<img [^>]*>)([^<]*)</span>"#).unwrap());
static CENTERED_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="align-center">(<img [^>]*>)</span>"#).unwrap());
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img [^>]*?data-tex="([^"]*)"[^>]*>"#).unwrap());
static MARKUP_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<span class="(?:math-inline|align-center)" data-tex="([^"]*)">.*?</span>"#)
        .unwrap()
});

/// Restores delimited TeX from an embedded `data-tex` value, or `None` if the
/// value is not one this crate writes.
fn delimited(data_tex: &str) -> Option<String> {
    let tex = unescape_attr(data_tex);
    if let Some(inner) = tex.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(format!("\\({}\\)", inner))
    } else if let Some(inner) = tex.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        Some(format!("\\[{}\\]", inner))
    } else {
        None
    }
}

fn restore(caps: &Captures) -> String {
    delimited(&caps[1]).unwrap_or_else(|| caps[0].to_string())
}

/// Turns a converted document back into TeX-delimited text.
///
/// Every placeholder carrying a `data-tex` attribute is replaced by its
/// original source between `\( \)` or `\[ \]`. Literal text is left alone,
/// except that the non-breaking space absorbed by a `nowrap` span comes back
/// as a plain space.
///
/// # Examples
///
/// ```
/// use m2svg_render::reverse;
///
/// let html = r#"a <img style="" src="images/1.svg" alt=" " data-tex="(x&lt;1)"> b"#;
/// assert_eq!(reverse(html), "a \\(x<1\\) b");
/// ```
pub fn reverse(document: &str) -> String {
    let text = NOWRAP.replace_all(document, "$1$2$3");
    let text = CENTERED_IMAGE.replace_all(&text, "$1");
    let text = IMAGE.replace_all(&text, restore);
    MARKUP_SPAN.replace_all(&text, restore).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_image() {
        let html = r#"<p><span class="align-center"><img style="s" src="images/2.svg" alt=" " data-tex="[\sum_i x_i]"></span></p>"#;
        assert_eq!(reverse(html), r"<p>\[\sum_i x_i\]</p>");
    }

    #[test]
    fn test_nowrap_span() {
        let html = r#"so <span class="nowrap"> <img src="1.svg" data-tex="(x)">,</span> ok"#;
        assert_eq!(reverse(html), r"so  \(x\), ok");
    }

    #[test]
    fn test_inline_markup_spans() {
        let html = "<span class=\"math-inline\" data-tex=\"(a)\"><svg>\n<g/></svg></span> and <span class=\"align-center\" data-tex=\"[b]\"><math><mi>b</mi></math></span>";
        assert_eq!(reverse(html), r"\(a\) and \[b\]");
    }

    #[test]
    fn test_unknown_data_tex_is_left_alone() {
        let html = r#"<img src="x.png" data-tex="plain">"#;
        assert_eq!(reverse(html), html);
    }

    #[test]
    fn test_plain_document() {
        let text = "<p>Nothing to see, 3 > 2 & 1 < 2.</p>";
        assert_eq!(reverse(text), text);
    }
}
