use serde::{Deserialize, Serialize};

use crate::error::{SyntaxError, SyntaxErrorKind};

/// The tag delimiter pair in effect at some point of a scan.
///
/// Delimiters are local state of a single `tokenize` call: a `{{=<% %>=}}`
/// tag swaps them for the remainder of that call only, and they never leak
/// into other scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: "{{".to_string(),
            close: "}}".to_string(),
        }
    }
}

/// Tag kind, decided once at tokenization time from the leading sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Variable,
    UnescapedVariable,
    SectionOpen,
    SectionInverseOpen,
    SectionClose,
    Partial,
    Comment,
    DelimiterChange,
    Pragma,
}

impl TagKind {
    /// Whether a tag of this kind may absorb the whitespace of a line it
    /// has to itself. Variable tags never do.
    pub(crate) const fn swallows_whitespace(self) -> bool {
        !matches!(self, Self::Variable | Self::UnescapedVariable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag<'a> {
    pub kind: TagKind,
    /// Trimmed tag content with the sigil removed.
    pub name: &'a str,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the tag's opening delimiter in the source.
    pub start: usize,
    /// Byte offset just past the tag's closing delimiter.
    pub end: usize,
    /// Line indentation absorbed by a standalone tag. Re-applied to the
    /// output of standalone partials.
    pub indent: &'a str,
    /// The delimiters in effect when this tag was scanned. Sections hand
    /// these to lambda expansions so re-parsing sees the same pair.
    pub delimiters: Delimiters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Text { text: &'a str, line: usize },
    Tag(Tag<'a>),
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// The starting location of the current line
    line_start: usize,
    delimiters: Delimiters,
}

impl<'a> Scanner<'a> {
    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    fn current_column(&self) -> usize {
        self.pos - self.line_start + 1
    }

    /// Advances past the next char, updating the line counter on newlines.
    #[inline]
    fn advance_char(&mut self) {
        if let Some(c) = self.input[self.pos..].chars().next() {
            if c == '\n' {
                self.line += 1;
                self.line_start = self.pos + c.len_utf8();
            }
            self.pos += c.len_utf8();
        }
    }

    /// Consumes verbatim text up to the next opening delimiter.
    fn scan_text(&mut self, tokens: &mut Vec<Token<'a>>) {
        let start = self.pos;
        let line = self.line;
        while !self.eof()
            && !self.input[self.pos..].starts_with(self.delimiters.open.as_str())
        {
            self.advance_char();
        }
        if self.pos > start {
            tokens.push(Token::Text {
                text: &self.input[start..self.pos],
                line,
            });
        }
    }

    /// Consumes one tag, starting at the opening delimiter. Classifies it by
    /// its leading sigil and, for delimiter changes, installs the new pair
    /// before the next token is scanned.
    fn scan_tag(&mut self, tokens: &mut Vec<Token<'a>>) -> Result<(), SyntaxError> {
        let start = self.pos;
        let line = self.line;
        let column = self.current_column();

        // Delimiters never contain newlines, so byte advances are fine here.
        self.pos += self.delimiters.open.len();

        let (kind, close) = match self.input[self.pos..].chars().next() {
            Some('#') => (TagKind::SectionOpen, self.delimiters.close.clone()),
            Some('^') => (TagKind::SectionInverseOpen, self.delimiters.close.clone()),
            Some('/') => (TagKind::SectionClose, self.delimiters.close.clone()),
            Some('>') => (TagKind::Partial, self.delimiters.close.clone()),
            Some('!') => (TagKind::Comment, self.delimiters.close.clone()),
            Some('&') => (TagKind::UnescapedVariable, self.delimiters.close.clone()),
            Some('{') => (
                TagKind::UnescapedVariable,
                format!("}}{}", self.delimiters.close),
            ),
            Some('=') => (
                TagKind::DelimiterChange,
                format!("={}", self.delimiters.close),
            ),
            Some('%') => (TagKind::Pragma, self.delimiters.close.clone()),
            _ => (TagKind::Variable, self.delimiters.close.clone()),
        };
        if kind != TagKind::Variable {
            // All sigils are single ASCII characters.
            self.pos += 1;
        }

        let content_start = self.pos;
        while !self.eof() && !self.input[self.pos..].starts_with(close.as_str()) {
            self.advance_char();
        }
        if self.eof() {
            return Err(SyntaxError {
                line,
                column,
                kind: SyntaxErrorKind::UnclosedTag { expected: close },
            });
        }

        let content = self.input[content_start..self.pos].trim();
        self.pos += close.len();
        let end = self.pos;

        if kind == TagKind::DelimiterChange {
            self.delimiters = parse_delimiters(content, line, column)?;
        } else if content.is_empty() && kind != TagKind::Comment {
            return Err(SyntaxError {
                line,
                column,
                kind: SyntaxErrorKind::EmptyTag,
            });
        }

        tokens.push(Token::Tag(Tag {
            kind,
            name: content,
            line,
            column,
            start,
            end,
            indent: "",
            delimiters: self.delimiters.clone(),
        }));
        Ok(())
    }
}

fn parse_delimiters(
    content: &str,
    line: usize,
    column: usize,
) -> Result<Delimiters, SyntaxError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    let malformed = || SyntaxError {
        line,
        column,
        kind: SyntaxErrorKind::InvalidDelimiters {
            content: content.to_string(),
        },
    };
    match parts.as_slice() {
        [open, close] if !open.contains('=') && !close.contains('=') => Ok(Delimiters {
            open: (*open).to_string(),
            close: (*close).to_string(),
        }),
        _ => Err(malformed()),
    }
}

/// Scans `source` into a flat token sequence, starting from the supplied
/// delimiters.
///
/// # Errors
/// - A tag opened but never closed, an empty tag name, or a malformed
///   delimiter change, each reported with line and column.
pub(crate) fn tokenize<'a>(
    source: &'a str,
    delimiters: Delimiters,
) -> Result<Vec<Token<'a>>, SyntaxError> {
    let mut scanner = Scanner {
        input: source,
        pos: 0,
        line: 1,
        line_start: 0,
        delimiters,
    };
    let mut tokens = Vec::new();
    while !scanner.eof() {
        scanner.scan_text(&mut tokens);
        if scanner.eof() {
            break;
        }
        scanner.scan_tag(&mut tokens)?;
    }
    strip_standalone(&mut tokens);
    Ok(tokens)
}

/// A standalone-tag decision: which neighboring text tokens get cut, and
/// the line indentation the tag absorbed.
struct Standalone<'a> {
    tag: usize,
    /// (text token index, new end offset) for the preceding text.
    prev_cut: Option<(usize, usize)>,
    /// (text token index, new start offset) for the following text.
    next_cut: Option<(usize, usize)>,
    indent: &'a str,
}

fn is_line_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Applies the standalone-tag rule: a section/close/partial/comment/
/// delimiter-change/pragma tag that is the only non-whitespace content on
/// its line absorbs the line's indentation and trailing newline.
///
/// Decisions are made against the original token texts, then the cuts are
/// applied in one pass. The two cuts a text token can receive (a suffix cut
/// from the tag to its right, a prefix cut from the tag to its left) cannot
/// overlap: each requires a newline inside the text, and the prefix cut
/// stops at the first newline while the suffix cut starts after the last.
fn strip_standalone<'a>(tokens: &mut Vec<Token<'a>>) {
    let mut records: Vec<Standalone<'a>> = Vec::new();

    for i in 0..tokens.len() {
        let Token::Tag(tag) = &tokens[i] else {
            continue;
        };
        if !tag.kind.swallows_whitespace() {
            continue;
        }

        let before = match i.checked_sub(1) {
            None => Some((None, "")),
            Some(j) => match &tokens[j] {
                Token::Text { text, .. } => {
                    let text: &'a str = text;
                    match text.rfind('\n') {
                        Some(nl) => {
                            let tail = &text[nl + 1..];
                            tail.bytes()
                                .all(is_line_whitespace)
                                .then_some((Some((j, nl + 1)), tail))
                        }
                        None => (j == 0 && text.bytes().all(is_line_whitespace))
                            .then_some((Some((j, 0)), text)),
                    }
                }
                Token::Tag(_) => None,
            },
        };
        let Some((prev_cut, indent)) = before else {
            continue;
        };

        let after = if i + 1 == tokens.len() {
            Some(None)
        } else {
            match &tokens[i + 1] {
                Token::Text { text, .. } => {
                    let ws = text.bytes().take_while(|b| is_line_whitespace(*b)).count();
                    let rest = &text[ws..];
                    if rest.starts_with("\r\n") {
                        Some(Some((i + 1, ws + 2)))
                    } else if rest.starts_with('\n') {
                        Some(Some((i + 1, ws + 1)))
                    } else if ws == text.len() && i + 2 == tokens.len() {
                        // Trailing whitespace at end of input.
                        Some(Some((i + 1, ws)))
                    } else {
                        None
                    }
                }
                Token::Tag(_) => None,
            }
        };
        let Some(next_cut) = after else {
            continue;
        };

        records.push(Standalone {
            tag: i,
            prev_cut,
            next_cut,
            indent,
        });
    }

    // A text token may be cut from both sides (suffix by the tag to its
    // right, prefix by the tag to its left); resolve both against the
    // original text before touching anything.
    let mut keep_start = vec![None; tokens.len()];
    let mut keep_end = vec![None; tokens.len()];
    for record in &records {
        if let Some((j, end)) = record.prev_cut {
            keep_end[j] = Some(end);
        }
        if let Some((j, start)) = record.next_cut {
            keep_start[j] = Some(start);
        }
    }
    for (j, token) in tokens.iter_mut().enumerate() {
        if let Token::Text { text, .. } = token {
            let start = keep_start[j].unwrap_or(0);
            let end = keep_end[j].unwrap_or(text.len());
            if let Some(cut) = text.get(start..end) {
                *text = cut;
            }
        }
    }
    for record in &records {
        if let Token::Tag(tag) = &mut tokens[record.tag] {
            tag.indent = record.indent;
        }
    }

    tokens.retain(|token| !matches!(token, Token::Text { text, .. } if text.is_empty()));
}
