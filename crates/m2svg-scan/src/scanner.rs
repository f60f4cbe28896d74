use crate::diagnostic::Diagnostic;
use crate::lexer::{Delimiter, Lexer, Role, Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Where the scanner currently is relative to math delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    /// After an unmatched `\[`.
    InDisplay,
    /// After an unmatched `\(`.
    InInline,
}

impl ParseState {
    fn entered_by(open: Delimiter) -> Self {
        match open.role() {
            Role::Display => ParseState::InDisplay,
            Role::Inline => ParseState::InInline,
        }
    }

    fn open_delimiter(self) -> Option<Delimiter> {
        match self {
            ParseState::Idle => None,
            ParseState::InDisplay => Some(Delimiter::OpenDisplay),
            ParseState::InInline => Some(Delimiter::OpenInline),
        }
    }
}

/// What happens to the text of a region abandoned by a structural fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryPolicy {
    /// Drop the abandoned region's text.
    #[default]
    Discard,
    /// Re-emit the abandoned region verbatim, delimiters included, as literal text.
    Literal,
}

/// A run of text between a matched pair of delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathSpan<'a> {
    pub role: Role,
    /// The TeX source with the delimiters stripped.
    pub content: &'a str,
    /// Line of the closing delimiter.
    pub line: usize,
    /// Line of the opening delimiter.
    pub open_line: usize,
    /// Byte offset of the opening delimiter.
    pub offset: usize,
}

impl MathSpan<'_> {
    /// The span as it appeared in the document, delimiters included.
    pub fn source(&self) -> String {
        format!(
            "{}{}{}",
            self.role.open(),
            self.content,
            self.role.close()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    Literal(&'a str),
    Math(MathSpan<'a>),
    Fault(Diagnostic),
}

/// A single-pass state machine splitting a document into literal text, math
/// spans and structural faults.
///
/// The scanner is an iterator over [`Event`]s in document order. It looks no
/// further ahead than the next delimiter token, so a consumer may act on each
/// event (for instance render a span) before the scanner advances.
///
/// ## Recovery
///
/// Structural faults never stop the scan:
///
/// - an open delimiter inside an open region reports a mismatch and restarts
///   the region at the new delimiter;
/// - a close delimiter with no open region reports a missing start tag and
///   stays in the literal text;
/// - a close delimiter of the wrong kind reports a mismatch and returns to
///   [`ParseState::Idle`] without producing a span;
/// - a region still open at the end reports a missing end tag.
///
/// What happens to the text of an abandoned region is decided by the
/// [`RecoveryPolicy`].
///
/// ## Examples
///
/// ```
/// use m2svg_scan::{Event, Scanner};
///
/// let events: Vec<_> = Scanner::new("a \\(x+1\\) b").collect();
/// assert_eq!(events.len(), 3);
/// assert_eq!(events[0], Event::Literal("a "));
/// if let Event::Math(span) = &events[1] {
///     assert_eq!(span.content, "x+1");
/// }
/// assert_eq!(events[2], Event::Literal(" b"));
/// ```
pub struct Scanner<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    policy: RecoveryPolicy,
    state: ParseState,
    start_index: usize,
    open_line: usize,
    open_offset: usize,
    pending: VecDeque<Event<'a>>,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            lexer: Lexer::new(input),
            policy: RecoveryPolicy::default(),
            state: ParseState::Idle,
            start_index: 0,
            open_line: 1,
            open_offset: 0,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub fn with_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    fn literal(&mut self, start: usize, end: usize) {
        if start < end {
            self.pending.push_back(Event::Literal(&self.input[start..end]));
        }
    }

    fn fault(&mut self, diagnostic: Diagnostic) {
        log::debug!("structural fault: {}", diagnostic);
        self.pending.push_back(Event::Fault(diagnostic));
    }

    /// Gives up on the open region, which ends (exclusive) at `end`.
    fn abandon(&mut self, end: usize) {
        if self.policy == RecoveryPolicy::Literal {
            self.literal(self.open_offset, end);
        }
        self.state = ParseState::Idle;
        self.start_index = end;
    }

    fn enter(&mut self, open: Delimiter, token: &Token) {
        self.state = ParseState::entered_by(open);
        self.open_line = token.line;
        self.open_offset = token.offset;
        self.start_index = token.end();
    }

    fn step(&mut self, token: Token) {
        let delim = match token.kind {
            TokenKind::Newline => return,
            TokenKind::Delimiter(delim) => delim,
        };

        match (self.state.open_delimiter(), delim.is_open()) {
            (None, true) => {
                self.literal(self.start_index, token.offset);
                self.enter(delim, &token);
            }
            (Some(open), true) => {
                self.fault(Diagnostic::mismatch(open, self.open_line, delim, token.line));
                self.abandon(token.offset);
                self.enter(delim, &token);
            }
            (None, false) => {
                // the stray delimiter stays in the literal text after the fault
                self.literal(self.start_index, token.offset);
                self.start_index = token.offset;
                self.fault(Diagnostic::no_start_tag(delim, token.line));
            }
            (Some(open), false) if delim.closes(open) => {
                self.pending.push_back(Event::Math(MathSpan {
                    role: open.role(),
                    content: &self.input[self.start_index..token.offset],
                    line: token.line,
                    open_line: self.open_line,
                    offset: self.open_offset,
                }));
                self.state = ParseState::Idle;
                self.start_index = token.end();
            }
            (Some(open), false) => {
                self.fault(Diagnostic::mismatch(open, self.open_line, delim, token.line));
                self.abandon(token.end());
            }
        }
    }

    fn finish(&mut self) {
        if let Some(open) = self.state.open_delimiter() {
            self.fault(Diagnostic::no_end_tag(open, self.open_line));
            if self.policy == RecoveryPolicy::Literal {
                self.start_index = self.open_offset;
            }
            self.state = ParseState::Idle;
        }
        self.literal(self.start_index, self.input.len());
        self.start_index = self.input.len();
        self.finished = true;
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Event<'a>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }
            match self.lexer.next() {
                Some(token) => self.step(token),
                None => self.finish(),
            }
        }
    }
}
