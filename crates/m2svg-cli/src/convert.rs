use crate::config::ConvertConfig;
use anyhow::Context;
use m2svg_render::markup::{image_tag, inline_markup, nowrap};
use m2svg_render::{svg, ArtifactId, ArtifactStore, OutputMode, RenderCache, Renderer, Rendering};
use m2svg_scan::{run, Diagnostic, MathSpan, RenderOutcome, ScanOptions, ScanOutput, SpanHandler};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

/// Renders the math spans of a document through the cache.
///
/// Each distinct equation is sent to the renderer once per run. A failed
/// render is remembered too, so every occurrence of the same bad TeX gets its
/// own diagnostic without running the renderer again.
pub struct Converter<'r> {
    renderer: &'r dyn Renderer,
    mode: OutputMode,
    options: ScanOptions,
    nowrap: bool,
    cache: RenderCache,
    store: ArtifactStore,
    renderings: HashMap<ArtifactId, Result<Rendering, String>>,
    progress: bool,
}

impl<'r> Converter<'r> {
    /// `root` is the directory of the output document; artifacts go below it.
    pub fn new(
        renderer: &'r dyn Renderer,
        config: &ConvertConfig,
        root: impl Into<PathBuf>,
    ) -> Self {
        let extension = renderer.format().extension();
        Self {
            renderer,
            mode: config.mode,
            options: config.scan_options(),
            nowrap: config.nowrap_enabled(),
            cache: RenderCache::new(config.naming, &config.images_dir, extension),
            store: ArtifactStore::new(root),
            renderings: HashMap::new(),
            progress: false,
        }
    }

    /// Prints a `.` for every rendered span.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn convert(&mut self, document: &str) -> anyhow::Result<ScanOutput> {
        let options = self.options;
        let mut result = run(document, options, self)?;
        if self.nowrap {
            result.output = nowrap(&result.output);
        }
        let structural = result
            .diagnostics
            .iter()
            .filter(|d| d.is_structural())
            .count();
        log::info!(
            "{} spans, {} distinct equations, {} artifacts written, {} delimiter faults, {} render faults",
            result.spans,
            self.cache.len(),
            self.store.len(),
            structural,
            result.diagnostics.len() - structural
        );
        Ok(result)
    }

    /// Number of distinct equations seen so far.
    pub fn equations(&self) -> usize {
        self.cache.len()
    }

    pub fn artifacts(&self) -> usize {
        self.store.len()
    }

    fn rendering(
        &mut self,
        id: &ArtifactId,
        span: &MathSpan<'_>,
    ) -> anyhow::Result<Result<Rendering, String>> {
        if let Some(known) = self.renderings.get(id) {
            log::debug!("Reusing artifact {}", id);
            return Ok(known.clone());
        }
        let rendered = match self.renderer.render(span.content, span.role) {
            Ok(rendering) => Ok(rendering),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => Err(err.to_string()),
        };
        self.renderings.insert(id.clone(), rendered.clone());
        Ok(rendered)
    }

    fn tick(&self) {
        if self.progress {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, ".");
            let _ = stdout.flush();
        }
    }
}

impl SpanHandler for Converter<'_> {
    type Error = anyhow::Error;

    fn render(&mut self, span: &MathSpan<'_>) -> anyhow::Result<RenderOutcome> {
        let entry = self.cache.lookup_or_assign(span.content).into_entry();
        let rendering = match self.rendering(&entry.id, span)? {
            Ok(rendering) => rendering,
            Err(message) => {
                return Ok(RenderOutcome::Failed {
                    markup: span.source(),
                    message,
                });
            }
        };

        let markup = match self.mode {
            OutputMode::Image => {
                let file = svg::normalize(&rendering.markup);
                self.store.write(&entry, file.as_bytes()).with_context(|| {
                    format!("failed to write {}", self.store.resolve(&entry).display())
                })?;
                image_tag(&entry, &rendering.metrics, span.content, span.role)
            }
            OutputMode::Svg | OutputMode::MathMl => {
                inline_markup(&rendering.markup, span.content, span.role)
            }
        };
        self.tick();
        Ok(RenderOutcome::Rendered(markup))
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        log::warn!("{}", diagnostic);
        eprintln!("{}", diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m2svg_render::{Metrics, NamingPolicy, OutputFormat, RenderError};
    use m2svg_scan::{DiagnosticKind, RecoveryPolicy, Role};
    use std::cell::RefCell;
    use std::fs;

    /// Wraps the TeX in an SVG and records every call.
    #[derive(Default)]
    struct MockRenderer {
        format: OutputFormat,
        unusable: bool,
        calls: RefCell<Vec<(String, Role)>>,
    }

    impl Renderer for MockRenderer {
        fn name(&self) -> &str {
            "mock"
        }

        fn format(&self) -> OutputFormat {
            self.format
        }

        fn render(&self, tex: &str, role: Role) -> Result<Rendering, RenderError> {
            self.calls.borrow_mut().push((tex.to_string(), role));
            if self.unusable {
                return Err(RenderError::NotFound("mock".into()));
            }
            if tex.contains("\\bad") {
                return Err(RenderError::Tex("Undefined control sequence \\bad".into()));
            }
            Ok(Rendering {
                markup: format!(
                    r#"<svg style="vertical-align: -0.5ex;" width="1ex" height="2ex" role="img" viewBox="0 -500 100 200"><text>{}</text></svg>"#,
                    tex
                ),
                metrics: Metrics {
                    vertical_align: "-0.5ex".into(),
                    width: "1ex".into(),
                    height: "2ex".into(),
                },
            })
        }
    }

    #[test]
    fn test_duplicate_equations_render_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer::default();
        let mut converter = Converter::new(&renderer, &ConvertConfig::default(), temp_dir.path());

        let result = converter.convert("\\(x\\) and \\(y\\) and \\(x\\)").unwrap();

        assert!(result.diagnostics.is_empty());
        assert_eq!(result.spans, 3);
        assert_eq!(converter.equations(), 2);
        assert_eq!(converter.artifacts(), 2);
        assert_eq!(
            *renderer.calls.borrow(),
            vec![("x".to_string(), Role::Inline), ("y".to_string(), Role::Inline)]
        );
        assert_eq!(result.output.matches(r#"src="images/1.svg""#).count(), 2);
        assert_eq!(result.output.matches(r#"src="images/2.svg""#).count(), 1);

        let svg = fs::read_to_string(temp_dir.path().join("images/1.svg")).unwrap();
        assert!(svg.starts_with(r#"<svg version="1.1""#));
        assert!(svg.contains(r#"width="100px""#));
        assert!(!svg.contains("role="));
        assert!(temp_dir.path().join("images/2.svg").exists());
        assert!(!temp_dir.path().join("images/3.svg").exists());
    }

    #[test]
    fn test_inline_and_display_share_artifact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer::default();
        let mut converter = Converter::new(&renderer, &ConvertConfig::default(), temp_dir.path());

        let result = converter.convert("\\(x\\) \\[x\\]").unwrap();

        assert_eq!(result.spans, 2);
        assert_eq!(converter.equations(), 1);
        assert_eq!(converter.artifacts(), 1);
        assert_eq!(*renderer.calls.borrow(), vec![("x".to_string(), Role::Inline)]);
        assert_eq!(result.output.matches(r#"src="images/1.svg""#).count(), 2);
        assert!(result.output.contains(r#"data-tex="(x)""#));
        assert!(result.output.contains(r#"data-tex="[x]"></span>"#));
        assert!(!temp_dir.path().join("images/2.svg").exists());
    }

    #[test]
    fn test_display_placeholder() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer::default();
        let mut converter = Converter::new(&renderer, &ConvertConfig::default(), temp_dir.path());

        let result = converter.convert("<p>\\[a+b\\]</p>").unwrap();
        assert_eq!(
            result.output,
            r#"<p><span class="align-center"><img style="vertical-align: -0.5ex; width: 1ex; height: 2ex;" src="images/1.svg" alt=" " data-tex="[a+b]"></span></p>"#
        );
        assert_eq!(renderer.calls.borrow()[0].1, Role::Display);
    }

    #[test]
    fn test_render_failure_falls_back_to_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer::default();
        let mut converter = Converter::new(&renderer, &ConvertConfig::default(), temp_dir.path());

        let document = "\\(\\bad\\)\nthen \\(\\bad\\) and \\(z\\)";
        let result = converter.convert(document).unwrap();

        assert_eq!(renderer.calls.borrow().len(), 2);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].line, 1);
        assert_eq!(result.diagnostics[1].line, 2);
        assert!(matches!(
            &result.diagnostics[0].kind,
            DiagnosticKind::Render { content, .. } if content == "\\bad"
        ));
        assert!(result.output.starts_with("\\(\\bad\\)\nthen \\(\\bad\\) and <img "));
        assert_eq!(converter.artifacts(), 1);
        assert_eq!(m2svg_render::reverse(&result.output), document);
    }

    #[test]
    fn test_fatal_renderer_error_aborts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer {
            unusable: true,
            ..Default::default()
        };
        let mut converter = Converter::new(&renderer, &ConvertConfig::default(), temp_dir.path());

        let err = converter.convert("a \\(x\\) b \\(y\\)").unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(renderer.calls.borrow().len(), 1);
    }

    #[test]
    fn test_inline_svg_mode_writes_no_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer::default();
        let config = ConvertConfig {
            mode: OutputMode::Svg,
            ..Default::default()
        };
        let mut converter = Converter::new(&renderer, &config, temp_dir.path());

        let result = converter.convert("see \\(x\\), ok").unwrap();
        assert!(result
            .output
            .starts_with(r#"see <span class="math-inline" data-tex="(x)"><svg "#));
        assert!(!result.output.contains("nowrap"));
        assert_eq!(converter.artifacts(), 0);
        assert!(!temp_dir.path().join("images").exists());
    }

    #[test]
    fn test_hash_naming_and_nowrap() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer::default();
        let config = ConvertConfig {
            naming: NamingPolicy::Hash,
            images_dir: PathBuf::from("eq"),
            ..Default::default()
        };
        let mut converter = Converter::new(&renderer, &config, temp_dir.path());

        let result = converter.convert("so \\(x\\).").unwrap();
        let id = m2svg_render::Fingerprint::of("x").to_hex();
        assert!(temp_dir.path().join("eq").join(format!("{}.svg", id)).exists());
        assert!(result.output.starts_with(r#"so <span class="nowrap"><img "#));
        assert!(result.output.ends_with(r#"data-tex="(x)">.</span>"#));
    }

    #[test]
    fn test_structural_faults_with_markers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = MockRenderer::default();
        let config = ConvertConfig {
            recovery: RecoveryPolicy::Literal,
            inline_errors: true,
            nowrap: Some(false),
            ..Default::default()
        };
        let mut converter = Converter::new(&renderer, &config, temp_dir.path());

        let result = converter.convert("a \\) b").unwrap();
        assert_eq!(
            result.output,
            "a  ******* no start tag for \\) at line 1 ******* \\) b"
        );
        assert!(renderer.calls.borrow().is_empty());
    }
}
