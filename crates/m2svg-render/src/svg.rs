//! Post-processing of MathJax SVG output.
//!
//! MathJax emits sizes in `ex` and a handful of `data-*` attributes that fail
//! strict validators (EPUB checkers in particular). [`normalize`] rewrites the
//! root element so the file stands alone, and [`Metrics`] carries the original
//! sizes over to the HTML placeholder.

use once_cell::sync::Lazy;
use regex::Regex;

static VERTICAL_ALIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"style="vertical-align: (.+?);""#).unwrap());
static WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r#"width="(.+?)""#).unwrap());
static HEIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"height="(.+?)""#).unwrap());
static VIEW_BOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"viewBox=".+? .+? (.+?) (.+?)""#).unwrap());
static ROOT_WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r#" width=".*?""#).unwrap());
static ROOT_HEIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r#" height=".*?""#).unwrap());
static NOISY_ATTRIBUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"data-mml-node=".*?"|data-c=".*?"|data-mjx-texclass=".*?""#).unwrap()
});
static ROLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"role=".*?""#).unwrap());
static FOCUSABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"focusable=".*?""#).unwrap());
static SVG_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<svg").unwrap());
static MJX_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"data-mjx-error="(.*?)""#).unwrap());

/// Layout of a rendered equation as reported by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub vertical_align: String,
    pub width: String,
    pub height: String,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            vertical_align: "0px".to_string(),
            width: "0px".to_string(),
            height: "0px".to_string(),
        }
    }
}

impl Metrics {
    /// Reads the metrics from the root element of a MathJax SVG.
    ///
    /// Missing values default to `0px`.
    pub fn from_svg(svg: &str) -> Self {
        let capture = |re: &Regex| re.captures(svg).map(|c| c[1].to_string());
        let defaults = Metrics::default();
        Self {
            vertical_align: capture(&VERTICAL_ALIGN).unwrap_or(defaults.vertical_align),
            width: capture(&WIDTH).unwrap_or(defaults.width),
            height: capture(&HEIGHT).unwrap_or(defaults.height),
        }
    }

    /// The inline CSS used on `<img>` placeholders.
    pub fn style(&self) -> String {
        format!(
            "vertical-align: {}; width: {}; height: {};",
            self.vertical_align, self.width, self.height
        )
    }
}

/// The error message MathJax embeds in its output for malformed TeX.
pub fn render_error(markup: &str) -> Option<String> {
    MJX_ERROR.captures(markup).map(|c| c[1].to_string())
}

/// Rewrites a MathJax SVG into a standalone file.
///
/// - the root `width`/`height` become the viewBox extents in `px`;
/// - `data-mml-node`, `data-c` and `data-mjx-texclass` attributes are removed,
///   as are the first `role` and `focusable`;
/// - `version="1.1"` is added to the root element.
pub fn normalize(svg: &str) -> String {
    let mut out = svg.to_string();

    if let Some(caps) = VIEW_BOX.captures(svg) {
        let width = format!(r#" width="{}px""#, &caps[1]);
        let height = format!(r#" height="{}px""#, &caps[2]);
        out = ROOT_WIDTH.replace(&out, width.as_str()).into_owned();
        out = ROOT_HEIGHT.replace(&out, height.as_str()).into_owned();
    }

    out = NOISY_ATTRIBUTES.replace_all(&out, "").into_owned();
    out = ROLE.replace(&out, "").into_owned();
    out = FOCUSABLE.replace(&out, "").into_owned();
    SVG_OPEN.replace(&out, r#"<svg version="1.1""#).into_owned()
}
