use serde::{Deserialize, Serialize};

/// One of the four math delimiters recognised in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delimiter {
    /// `\[`
    #[serde(rename = "\\[")]
    OpenDisplay,
    /// `\]`
    #[serde(rename = "\\]")]
    CloseDisplay,
    /// `\(`
    #[serde(rename = "\\(")]
    OpenInline,
    /// `\)`
    #[serde(rename = "\\)")]
    CloseInline,
}

/// Whether a math span is typeset within a line of text or as its own block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Inline,
    Display,
}

impl Delimiter {
    /// Every delimiter is two bytes long.
    pub const LEN: usize = 2;

    /// Maps the character following a backslash to a delimiter.
    fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            b'[' => Some(Self::OpenDisplay),
            b']' => Some(Self::CloseDisplay),
            b'(' => Some(Self::OpenInline),
            b')' => Some(Self::CloseInline),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenDisplay => "\\[",
            Self::CloseDisplay => "\\]",
            Self::OpenInline => "\\(",
            Self::CloseInline => "\\)",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::OpenDisplay | Self::OpenInline)
    }

    pub fn role(self) -> Role {
        match self {
            Self::OpenDisplay | Self::CloseDisplay => Role::Display,
            Self::OpenInline | Self::CloseInline => Role::Inline,
        }
    }

    /// Returns true if `self` is the closing partner of `open`.
    pub fn closes(self, open: Delimiter) -> bool {
        matches!(
            (open, self),
            (Self::OpenDisplay, Self::CloseDisplay) | (Self::OpenInline, Self::CloseInline)
        )
    }
}

impl Role {
    pub fn open(self) -> Delimiter {
        match self {
            Role::Inline => Delimiter::OpenInline,
            Role::Display => Delimiter::OpenDisplay,
        }
    }

    pub fn close(self) -> Delimiter {
        match self {
            Role::Inline => Delimiter::CloseInline,
            Role::Display => Delimiter::CloseDisplay,
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Delimiter(Delimiter),
    /// `\r\n`, `\n` or a lone `\r`.
    Newline,
}

/// A token located in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first byte of the token.
    pub offset: usize,
    /// Length of the token in bytes.
    pub len: usize,
    /// 1-based line the token starts on.
    pub line: usize,
}

impl Token {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// A lexer producing the delimiter and newline tokens of a document.
///
/// ## Overview
///
/// Everything that is not one of the four math delimiters or a newline sequence
/// is skipped; the text between tokens is recovered by the scanner from the
/// token offsets. Matching is purely literal, so `\\[` contains an `\[` token
/// starting at its second backslash.
///
/// ## UTF-8 Handling
///
/// All markers are ASCII, and ASCII bytes never occur inside a multi-byte UTF-8
/// sequence, so the lexer walks raw bytes and every offset it reports lies on a
/// character boundary.
///
/// ## Examples
///
/// ```
/// use m2svg_scan::lexer::{Delimiter, Lexer, TokenKind};
///
/// let tokens: Vec<_> = Lexer::new("a \\(x\\)\nb").collect();
///
/// assert_eq!(tokens[0].kind, TokenKind::Delimiter(Delimiter::OpenInline));
/// assert_eq!(tokens[1].kind, TokenKind::Delimiter(Delimiter::CloseInline));
/// assert_eq!(tokens[2].kind, TokenKind::Newline);
/// assert_eq!(tokens[2].line, 1);
/// ```
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
        }
    }

    fn token(&mut self, kind: TokenKind, offset: usize, len: usize) -> Token {
        let token = Token {
            kind,
            offset,
            len,
            line: self.line,
        };
        self.position = offset + len;
        if kind == TokenKind::Newline {
            self.line += 1;
        }
        token
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let bytes = self.input.as_bytes();
        while self.position < bytes.len() {
            let offset = self.position;
            match bytes[offset] {
                b'\\' => {
                    let marker = bytes.get(offset + 1).copied().and_then(Delimiter::from_marker);
                    match marker {
                        Some(delim) => {
                            return Some(self.token(
                                TokenKind::Delimiter(delim),
                                offset,
                                Delimiter::LEN,
                            ));
                        }
                        None => self.position += 1,
                    }
                }
                b'\r' => {
                    let len = if bytes.get(offset + 1) == Some(&b'\n') { 2 } else { 1 };
                    return Some(self.token(TokenKind::Newline, offset, len));
                }
                b'\n' => return Some(self.token(TokenKind::Newline, offset, 1)),
                _ => self.position += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_four_delimiters() {
        let tokens = kinds(r"\[ \] \( \)");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Delimiter(Delimiter::OpenDisplay),
                TokenKind::Delimiter(Delimiter::CloseDisplay),
                TokenKind::Delimiter(Delimiter::OpenInline),
                TokenKind::Delimiter(Delimiter::CloseInline),
            ]
        );
    }

    #[test]
    fn test_other_commands_are_skipped() {
        assert!(kinds(r"\frac{a}{b} \alpha [x] (y)").is_empty());
    }

    #[test]
    fn test_newline_sequences() {
        let tokens: Vec<_> = Lexer::new("a\r\nb\nc\rd").collect();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Newline));
        assert_eq!(tokens[0].len, 2);
        assert_eq!(tokens[1].len, 1);
        assert_eq!(tokens[2].len, 1);
        assert_eq!(
            tokens.iter().map(|t| t.line).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_offsets_and_lines() {
        let tokens: Vec<_> = Lexer::new("x\n\n  \\(y\\)").collect();
        let open = tokens[2];
        assert_eq!(open.kind, TokenKind::Delimiter(Delimiter::OpenInline));
        assert_eq!(open.offset, 5);
        assert_eq!(open.line, 3);
        assert_eq!(tokens[3].offset, 8);
        assert_eq!(tokens[3].end(), 10);
    }

    #[test]
    fn test_double_backslash_matches_literally() {
        let tokens: Vec<_> = Lexer::new(r"a \\[2pt] b").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].offset, 3);
    }

    #[test]
    fn test_trailing_backslash() {
        assert!(kinds("abc\\").is_empty());
    }

    #[test]
    fn test_multibyte_text() {
        let input = "Émilie \\(π\\) ü";
        let tokens: Vec<_> = Lexer::new(input).collect();
        assert_eq!(tokens.len(), 2);
        assert!(input.is_char_boundary(tokens[0].offset));
        assert_eq!(&input[tokens[0].end()..tokens[1].offset], "π");
    }

    #[test]
    fn test_delimiter_pairs() {
        assert!(Delimiter::CloseDisplay.closes(Delimiter::OpenDisplay));
        assert!(Delimiter::CloseInline.closes(Delimiter::OpenInline));
        assert!(!Delimiter::CloseInline.closes(Delimiter::OpenDisplay));
        assert!(!Delimiter::CloseDisplay.closes(Delimiter::OpenInline));
        assert_eq!(Role::Inline.open(), Delimiter::OpenInline);
        assert_eq!(Role::Display.close(), Delimiter::CloseDisplay);
    }
}
