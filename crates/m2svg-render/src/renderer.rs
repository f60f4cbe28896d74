//! The external TeX renderer.
//!
//! ## Overview
//!
//! Rendering is delegated to a MathJax command-line tool through the
//! [`Renderer`] trait. The production backend, [`CommandRenderer`], runs
//! `tex2svg` or `tex2mml` once per equation:
//!
//! ```text
//! tex2svg [--inline] [extra args] -- '<tex>'
//! ```
//!
//! Process spawning goes through the [`CommandExecutor`] trait so tests can
//! substitute canned output for the real tool.
//!
//! ## Error taxonomy
//!
//! - [`RenderError::Tex`]: the tool rejected the equation. Recoverable; the
//!   caller reports it and carries on with the next span.
//! - [`RenderError::NotFound`] and [`RenderError::Spawn`]: the tool itself is
//!   unusable. Fatal for the whole run.

use crate::svg::{self, Metrics};
use m2svg_scan::Role;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Markup language produced by a renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Svg,
    MathMl,
}

impl OutputFormat {
    /// The MathJax command-line tool for this format.
    pub fn default_program(self) -> &'static str {
        match self {
            OutputFormat::Svg => "tex2svg",
            OutputFormat::MathMl => "tex2mml",
        }
    }

    /// File extension for stored artifacts.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::MathMl => "mml",
        }
    }
}

/// A successfully rendered equation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    pub markup: String,
    pub metrics: Metrics,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer rejected the TeX source.
    #[error("{0}")]
    Tex(String),
    #[error("renderer `{0}` not found in PATH")]
    NotFound(String),
    #[error("failed to run renderer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Whether the error ends the run rather than just the current equation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RenderError::Tex(_))
    }
}

/// Turns TeX source into markup.
///
/// Implementations must be idempotent for identical input and must report
/// malformed TeX as [`RenderError::Tex`] rather than failing the process.
pub trait Renderer {
    /// A human-readable name for logs.
    fn name(&self) -> &str;

    fn format(&self) -> OutputFormat;

    fn render(&self, tex: &str, role: Role) -> Result<Rendering, RenderError>;
}

/// Trait for executing system commands.
/// This allows us to mock `std::process::Command` in tests.
pub trait CommandExecutor: std::fmt::Debug {
    fn execute(&self, program: &Path, args: &[&str]) -> std::io::Result<Output>;
}

/// Default implementation of [`CommandExecutor`] using `std::process::Command`.
#[derive(Debug)]
pub struct RealCommandExecutor;

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, program: &Path, args: &[&str]) -> std::io::Result<Output> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
    }
}

/// Renders equations by running a MathJax command-line tool.
#[derive(Debug)]
pub struct CommandRenderer {
    program: PathBuf,
    format: OutputFormat,
    extra_args: Vec<String>,
    executor: Box<dyn CommandExecutor>,
}

impl CommandRenderer {
    /// Locates `program` (or the default tool for `format`) on the `PATH`.
    pub fn detect(program: Option<&str>, format: OutputFormat) -> Result<Self, RenderError> {
        let name = program.unwrap_or(format.default_program());
        let path = which::which(name).map_err(|_| RenderError::NotFound(name.to_string()))?;
        log::info!("Using renderer {:?}", path);
        Ok(Self::new(path, format))
    }

    pub fn new(program: PathBuf, format: OutputFormat) -> Self {
        Self {
            program,
            format,
            extra_args: Vec::new(),
            executor: Box::new(RealCommandExecutor),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Replaces the process executor (for testing).
    pub fn with_executor(mut self, executor: Box<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    fn args<'a>(&'a self, tex: &'a str, role: Role) -> Vec<&'a str> {
        let mut args = Vec::with_capacity(self.extra_args.len() + 3);
        if role == Role::Inline {
            args.push("--inline");
        }
        args.extend(self.extra_args.iter().map(String::as_str));
        args.push("--");
        args.push(tex);
        args
    }
}

impl Renderer for CommandRenderer {
    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("renderer")
    }

    fn format(&self) -> OutputFormat {
        self.format
    }

    fn render(&self, tex: &str, role: Role) -> Result<Rendering, RenderError> {
        let output = self
            .executor
            .execute(&self.program, &self.args(tex, role))
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.name(), output.status)
            } else {
                stderr
            };
            return Err(RenderError::Tex(message));
        }

        let markup = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if let Some(message) = svg::render_error(&markup) {
            return Err(RenderError::Tex(message));
        }

        let metrics = match self.format {
            OutputFormat::Svg => Metrics::from_svg(&markup),
            OutputFormat::MathMl => Metrics::default(),
        };
        Ok(Rendering { markup, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// A mocked executor that records its arguments and returns canned output.
    #[derive(Debug, Default)]
    pub struct MockCommandExecutor {
        pub stdout: String,
        pub stderr: String,
        pub status_code: i32,
        pub fail_to_spawn: bool,
        pub calls: RefCell<Vec<Vec<String>>>,
    }

    impl CommandExecutor for MockCommandExecutor {
        fn execute(&self, _program: &Path, args: &[&str]) -> std::io::Result<Output> {
            self.calls
                .borrow_mut()
                .push(args.iter().map(|a| a.to_string()).collect());
            if self.fail_to_spawn {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ));
            }
            #[cfg(unix)]
            let status = {
                use std::os::unix::process::ExitStatusExt;
                std::process::ExitStatus::from_raw(self.status_code << 8)
            };
            #[cfg(windows)]
            let status = {
                use std::os::windows::process::ExitStatusExt;
                std::process::ExitStatus::from_raw(self.status_code as u32)
            };

            Ok(Output {
                status,
                stdout: self.stdout.as_bytes().to_vec(),
                stderr: self.stderr.as_bytes().to_vec(),
            })
        }
    }

    fn renderer(executor: MockCommandExecutor) -> CommandRenderer {
        CommandRenderer::new(PathBuf::from("/usr/bin/tex2svg"), OutputFormat::Svg)
            .with_executor(Box::new(executor))
    }

    #[test]
    fn test_render_success() {
        let renderer = renderer(MockCommandExecutor {
            stdout: "<svg style=\"vertical-align: -0.5ex;\" width=\"2ex\" height=\"1ex\"></svg>\n"
                .to_string(),
            ..Default::default()
        });
        let rendering = renderer.render("x", Role::Display).unwrap();
        assert!(rendering.markup.ends_with("</svg>"));
        assert_eq!(rendering.metrics.vertical_align, "-0.5ex");
        assert_eq!(rendering.metrics.width, "2ex");
        assert_eq!(renderer.name(), "tex2svg");
    }

    #[test]
    fn test_arguments() {
        let executor = MockCommandExecutor {
            stdout: "<svg></svg>".to_string(),
            ..Default::default()
        };
        let renderer = CommandRenderer::new(PathBuf::from("tex2svg"), OutputFormat::Svg)
            .with_args(vec!["--font".to_string(), "TeX".to_string()]);
        let renderer = renderer.with_executor(Box::new(executor));

        assert_eq!(
            renderer.args("-x", Role::Inline),
            vec!["--inline", "--font", "TeX", "--", "-x"]
        );
        assert_eq!(renderer.args("y", Role::Display), vec!["--font", "TeX", "--", "y"]);
    }

    #[test]
    fn test_mathjax_error_in_output() {
        let renderer = renderer(MockCommandExecutor {
            stdout: r#"<svg><g data-mjx-error="Undefined control sequence \foo"></g></svg>"#
                .to_string(),
            ..Default::default()
        });
        match renderer.render("\\foo", Role::Inline) {
            Err(RenderError::Tex(message)) => {
                assert_eq!(message, "Undefined control sequence \\foo")
            }
            other => panic!("expected a TeX error, got {:?}", other),
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_non_zero_exit() {
        let renderer = renderer(MockCommandExecutor {
            stderr: "Missing close brace\n".to_string(),
            status_code: 1,
            ..Default::default()
        });
        let err = renderer.render("\\frac{a", Role::Display).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Missing close brace");
    }

    #[test]
    fn test_spawn_failure_is_fatal() {
        let renderer = renderer(MockCommandExecutor {
            fail_to_spawn: true,
            ..Default::default()
        });
        let err = renderer.render("x", Role::Inline).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("failed to run renderer"));
    }

    #[test]
    fn test_detect_missing_program() {
        let err = CommandRenderer::detect(Some("m2svg-no-such-renderer"), OutputFormat::Svg)
            .unwrap_err();
        assert!(matches!(err, RenderError::NotFound(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_format_defaults() {
        assert_eq!(OutputFormat::Svg.default_program(), "tex2svg");
        assert_eq!(OutputFormat::MathMl.default_program(), "tex2mml");
        assert_eq!(OutputFormat::MathMl.extension(), "mml");
    }
}
