//! # m2svg scanner
//!
//! Single-pass scanner for TeX math regions in text and HTML documents.
//!
//! ## Overview
//!
//! Documents mark math with `\[ ... \]` (display) and `\( ... \)` (inline).
//! This crate splits a document into literal text and math spans, reports
//! malformed delimiter nesting with accurate line numbers, and reassembles the
//! document with each span replaced by caller-supplied markup.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  tokens   ┌─────────┐  events   ┌────────────┐
//! │  Lexer   │ ────────► │ Scanner │ ────────► │ run / scan │ ──► ScanOutput
//! └──────────┘           └─────────┘           └─────┬──────┘
//!                                                    │ render(span)
//!                                                    ▼
//!                                              SpanHandler
//! ```
//!
//! - [`lexer::Lexer`] yields the four delimiter tokens and newline tokens.
//! - [`Scanner`] is the state machine (`Idle`, `InDisplay`, `InInline`)
//!   producing [`Event`]s lazily.
//! - [`run`] renders each span through a [`SpanHandler`] before scanning on,
//!   and collects [`Diagnostic`]s.
//!
//! ## Examples
//!
//! ```
//! use m2svg_scan::{scan, RenderOutcome};
//!
//! let result = scan("\\(a\\]", |_| RenderOutcome::Rendered(String::new()));
//! assert_eq!(result.diagnostics.len(), 1);
//! assert_eq!(
//!     result.diagnostics[0].to_string(),
//!     "\\( at line 1 followed by \\] at line 1"
//! );
//! ```

pub mod assemble;
pub mod diagnostic;
pub mod lexer;
pub mod scanner;


pub use assemble::{
    RenderOutcome, ScanOptions, ScanOutput, SpanHandler, fault_marker, run, scan, scan_with,
};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use lexer::{Delimiter, Role};
pub use scanner::{Event, MathSpan, ParseState, RecoveryPolicy, Scanner};
