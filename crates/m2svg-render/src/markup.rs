//! HTML placeholders for rendered equations.
//!
//! Every placeholder embeds the original TeX in a `data-tex` attribute, with
//! `(...)` marking inline math and `[...]` display math, so the document can be
//! turned back into TeX with [`crate::reverse`].

use crate::cache::CacheEntry;
use crate::svg::Metrics;
use m2svg_scan::Role;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// How rendered equations appear in the output document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `<img>` tags referencing one SVG file per equation.
    #[default]
    Image,
    /// SVG markup inlined into the document.
    Svg,
    /// MathML inlined into the document.
    MathMl,
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_attr`].
pub fn unescape_attr(value: &str) -> String {
    static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(amp|quot|lt|gt);").unwrap());
    ENTITY
        .replace_all(value, |caps: &Captures| match &caps[1] {
            "amp" => "&",
            "quot" => "\"",
            "lt" => "<",
            _ => ">",
        })
        .into_owned()
}

/// The escaped `data-tex` value for `content`.
pub fn data_tex(content: &str, role: Role) -> String {
    let escaped = escape_attr(content);
    match role {
        Role::Inline => format!("({})", escaped),
        Role::Display => format!("[{}]", escaped),
    }
}

fn src(entry: &CacheEntry) -> String {
    entry.path.to_string_lossy().replace('\\', "/")
}

/// An `<img>` referencing the stored SVG of an equation.
pub fn image_tag(entry: &CacheEntry, metrics: &Metrics, content: &str, role: Role) -> String {
    let img = format!(
        r#"<img style="{}" src="{}" alt=" " data-tex="{}">"#,
        metrics.style(),
        escape_attr(&src(entry)),
        data_tex(content, role)
    );
    match role {
        Role::Inline => img,
        Role::Display => format!(r#"<span class="align-center">{}</span>"#, img),
    }
}

/// Rendered markup inlined into the document.
pub fn inline_markup(markup: &str, content: &str, role: Role) -> String {
    let class = match role {
        Role::Inline => "math-inline",
        Role::Display => "align-center",
    };
    format!(
        r#"<span class="{}" data-tex="{}">{}</span>"#,
        class,
        data_tex(content, role),
        markup
    )
}

/// Keeps inline images together with an adjacent non-breaking space or
/// trailing punctuation.
///
/// An inline `<img>` preceded by `&nbsp;`/U+00A0, or followed by one of
/// `, . ; : ' ? ) ]` or a non-breaking space, is wrapped in
/// `<span class="nowrap">`. The non-breaking spaces become plain spaces inside
/// the span.
pub fn nowrap(document: &str) -> String {
    static INLINE_IMAGE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(&nbsp;|\x{00a0})?(<img [^>]*data-tex="\([^"]*\)"[^>]*>)([,.;:'?)\]]|&nbsp;|\x{00a0})?"#,
        )
        .unwrap()
    });

    INLINE_IMAGE
        .replace_all(document, |caps: &Captures| {
            let image = &caps[2];
            let before = caps.get(1);
            let after = caps.get(3);
            if before.is_none() && after.is_none() {
                return image.to_string();
            }
            let precede = if before.is_some() { " " } else { "" };
            let follow = match after.map(|m| m.as_str()) {
                Some("&nbsp;") | Some("\u{a0}") => " ",
                Some(punctuation) => punctuation,
                None => "",
            };
            format!(r#"<span class="nowrap">{}{}{}</span>"#, precede, image, follow)
        })
        .into_owned()
}
