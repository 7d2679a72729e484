use crate::ast::Node;
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::token::{Delimiters, Tag, TagKind, Token};

/// A section whose close tag has not been seen yet.
struct OpenSection<'a> {
    name: &'a str,
    path: Vec<&'a str>,
    inverted: bool,
    line: usize,
    column: usize,
    /// Byte offset where the section body starts, just past the open tag.
    body_start: usize,
    delimiters: Delimiters,
    children: Vec<Node<'a>>,
}

/// Builds the node tree from the token sequence.
///
/// Maintains a stack of currently-open sections over an implicit root
/// frame. Comment, pragma and delimiter-change tokens produce no nodes;
/// they only drove the tokenizer.
///
/// # Errors
/// - A close tag with no open section, a close tag naming a different
///   section than the innermost open one, or an open section left
///   unclosed at end of input.
/// - A dotted name with an empty segment.
pub(crate) fn parse<'a>(
    source: &'a str,
    tokens: Vec<Token<'a>>,
) -> Result<Vec<Node<'a>>, SyntaxError> {
    let mut root: Vec<Node<'a>> = Vec::new();
    let mut stack: Vec<OpenSection<'a>> = Vec::new();

    for token in tokens {
        match token {
            Token::Text { text, .. } => {
                children_of(&mut root, &mut stack).push(Node::Text { text });
            }
            Token::Tag(tag) => match tag.kind {
                TagKind::Variable => {
                    let path = parse_path(&tag)?;
                    children_of(&mut root, &mut stack)
                        .push(Node::Variable { path, escape: true });
                }
                TagKind::UnescapedVariable => {
                    let path = parse_path(&tag)?;
                    children_of(&mut root, &mut stack)
                        .push(Node::Variable { path, escape: false });
                }
                TagKind::SectionOpen | TagKind::SectionInverseOpen => {
                    let path = parse_path(&tag)?;
                    stack.push(OpenSection {
                        name: tag.name,
                        path,
                        inverted: tag.kind == TagKind::SectionInverseOpen,
                        line: tag.line,
                        column: tag.column,
                        body_start: tag.end,
                        delimiters: tag.delimiters,
                        children: Vec::new(),
                    });
                }
                TagKind::SectionClose => {
                    let Some(open) = stack.pop() else {
                        return Err(SyntaxError {
                            line: tag.line,
                            column: tag.column,
                            kind: SyntaxErrorKind::UnexpectedSectionClose {
                                name: tag.name.to_string(),
                            },
                        });
                    };
                    if open.name != tag.name {
                        return Err(SyntaxError {
                            line: tag.line,
                            column: tag.column,
                            kind: SyntaxErrorKind::MismatchedSectionClose {
                                expected: open.name.to_string(),
                                found: tag.name.to_string(),
                            },
                        });
                    }
                    let raw = source.get(open.body_start..tag.start).unwrap_or("");
                    let section = Node::Section {
                        path: open.path,
                        inverted: open.inverted,
                        children: open.children,
                        raw,
                        delimiters: open.delimiters,
                    };
                    children_of(&mut root, &mut stack).push(section);
                }
                TagKind::Partial => {
                    children_of(&mut root, &mut stack).push(Node::Partial {
                        name: tag.name,
                        indent: tag.indent,
                    });
                }
                TagKind::Comment | TagKind::DelimiterChange | TagKind::Pragma => {}
            },
        }
    }

    if let Some(open) = stack.pop() {
        return Err(SyntaxError {
            line: open.line,
            column: open.column,
            kind: SyntaxErrorKind::UnclosedSection {
                name: open.name.to_string(),
            },
        });
    }
    Ok(root)
}

fn children_of<'a, 'b>(
    root: &'b mut Vec<Node<'a>>,
    stack: &'b mut Vec<OpenSection<'a>>,
) -> &'b mut Vec<Node<'a>> {
    match stack.last_mut() {
        Some(frame) => &mut frame.children,
        None => root,
    }
}

fn parse_path<'a>(tag: &Tag<'a>) -> Result<Vec<&'a str>, SyntaxError> {
    if tag.name == "." {
        return Ok(vec!["."]);
    }
    let segments: Vec<&str> = tag.name.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(SyntaxError {
            line: tag.line,
            column: tag.column,
            kind: SyntaxErrorKind::InvalidPath {
                name: tag.name.to_string(),
            },
        });
    }
    Ok(segments)
}
