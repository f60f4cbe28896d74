use crate::lexer::Delimiter;
use serde::{Deserialize, Serialize};

/// A structural or render fault found while converting a document.
///
/// Diagnostics never stop a scan; they are collected alongside the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line the fault is reported against.
    pub line: usize,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum DiagnosticKind {
    /// A closing delimiter with no open region.
    NoStartTag { delimiter: Delimiter },
    /// An open region interrupted by another open delimiter or closed by the wrong kind.
    Mismatch {
        open: Delimiter,
        open_line: usize,
        found: Delimiter,
    },
    /// A region still open at the end of the document.
    NoEndTag { delimiter: Delimiter },
    /// The renderer rejected the TeX of a span.
    Render { message: String, content: String },
}

impl Diagnostic {
    pub fn no_start_tag(delimiter: Delimiter, line: usize) -> Self {
        Self {
            line,
            kind: DiagnosticKind::NoStartTag { delimiter },
        }
    }

    pub fn mismatch(open: Delimiter, open_line: usize, found: Delimiter, line: usize) -> Self {
        Self {
            line,
            kind: DiagnosticKind::Mismatch {
                open,
                open_line,
                found,
            },
        }
    }

    pub fn no_end_tag(delimiter: Delimiter, open_line: usize) -> Self {
        Self {
            line: open_line,
            kind: DiagnosticKind::NoEndTag { delimiter },
        }
    }

    pub fn render(message: impl Into<String>, content: impl Into<String>, line: usize) -> Self {
        Self {
            line,
            kind: DiagnosticKind::Render {
                message: message.into(),
                content: content.into(),
            },
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self.kind, DiagnosticKind::Render { .. })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            DiagnosticKind::NoStartTag { delimiter } => {
                write!(f, "no start tag for {} at line {}", delimiter, self.line)
            }
            DiagnosticKind::Mismatch {
                open,
                open_line,
                found,
            } => write!(
                f,
                "{} at line {} followed by {} at line {}",
                open, open_line, found, self.line
            ),
            DiagnosticKind::NoEndTag { delimiter } => {
                write!(f, "no end tag for {} at line {}", delimiter, self.line)
            }
            DiagnosticKind::Render { message, content } => write!(
                f,
                "MathJax error near line {}: {} : {}",
                self.line, message, content
            ),
        }
    }
}
