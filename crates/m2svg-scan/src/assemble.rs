use crate::diagnostic::Diagnostic;
use crate::scanner::{Event, MathSpan, RecoveryPolicy, Scanner};
use std::convert::Infallible;

/// The result of rendering one math span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Markup that replaces the span.
    Rendered(String),
    /// The renderer rejected the span; `markup` is spliced in as a fallback.
    Failed { markup: String, message: String },
}

impl RenderOutcome {
    pub fn markup(&self) -> &str {
        match self {
            RenderOutcome::Rendered(markup) => markup,
            RenderOutcome::Failed { markup, .. } => markup,
        }
    }
}

/// Receives the math spans and diagnostics of a scan as they occur.
pub trait SpanHandler {
    /// Errors that abort the whole scan.
    type Error;

    /// Produces the markup for a matched span.
    fn render(&mut self, span: &MathSpan<'_>) -> Result<RenderOutcome, Self::Error>;

    /// Called once for every diagnostic, in document order.
    fn diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}

struct FnHandler<F>(F);

impl<F> SpanHandler for FnHandler<F>
where
    F: FnMut(&MathSpan<'_>) -> RenderOutcome,
{
    type Error = Infallible;

    fn render(&mut self, span: &MathSpan<'_>) -> Result<RenderOutcome, Infallible> {
        Ok((self.0)(span))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub policy: RecoveryPolicy,
    /// Also write each diagnostic into the output as a visible marker.
    pub inline_faults: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub output: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of matched math spans, including ones that failed to render.
    pub spans: usize,
}

/// The marker written into the output for a diagnostic when inline faults are enabled.
pub fn fault_marker(diagnostic: &Diagnostic) -> String {
    format!(" ******* {} ******* ", diagnostic)
}

/// Scans `document` with the default options, replacing every math span with
/// the markup returned by `render_span`.
///
/// # Examples
///
/// ```
/// use m2svg_scan::{scan, RenderOutcome};
///
/// let result = scan("a \\(x+1\\) b", |span| {
///     RenderOutcome::Rendered(format!("<m>{}</m>", span.content))
/// });
/// assert_eq!(result.output, "a <m>x+1</m> b");
/// assert!(result.diagnostics.is_empty());
/// ```
pub fn scan<F>(document: &str, render_span: F) -> ScanOutput
where
    F: FnMut(&MathSpan<'_>) -> RenderOutcome,
{
    scan_with(document, ScanOptions::default(), render_span)
}

pub fn scan_with<F>(document: &str, options: ScanOptions, render_span: F) -> ScanOutput
where
    F: FnMut(&MathSpan<'_>) -> RenderOutcome,
{
    match run(document, options, &mut FnHandler(render_span)) {
        Ok(output) => output,
        Err(never) => match never {},
    }
}

/// Drives a [`Scanner`] over `document`, assembling the output text.
///
/// Each span is rendered before the scanner moves past it. A render failure
/// adds a diagnostic and uses the fallback markup; only an `Err` from the
/// handler stops the scan.
pub fn run<H: SpanHandler>(
    document: &str,
    options: ScanOptions,
    handler: &mut H,
) -> Result<ScanOutput, H::Error> {
    let mut result = ScanOutput {
        output: String::with_capacity(document.len()),
        ..ScanOutput::default()
    };

    for event in Scanner::new(document).with_policy(options.policy) {
        match event {
            Event::Literal(text) => result.output.push_str(text),
            Event::Math(span) => {
                result.spans += 1;
                match handler.render(&span)? {
                    RenderOutcome::Rendered(markup) => result.output.push_str(&markup),
                    RenderOutcome::Failed { markup, message } => {
                        let diagnostic = Diagnostic::render(message, span.content, span.line);
                        report(&mut result, handler, options, diagnostic);
                        result.output.push_str(&markup);
                    }
                }
            }
            Event::Fault(diagnostic) => report(&mut result, handler, options, diagnostic),
        }
    }

    Ok(result)
}

fn report<H: SpanHandler>(
    result: &mut ScanOutput,
    handler: &mut H,
    options: ScanOptions,
    diagnostic: Diagnostic,
) {
    handler.diagnostic(&diagnostic);
    if options.inline_faults {
        result.output.push_str(&fault_marker(&diagnostic));
    }
    result.diagnostics.push(diagnostic);
}
