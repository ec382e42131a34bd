//! Token stream plumbing for the DDL recognizer.
//!
//! The `sqlparser` tokenizer gives us a flat, dialect-aware token stream with
//! source spans. On top of it we keep each token's verbatim source slice and
//! fold balanced parentheses into groups, so the recognizer can tell the
//! outermost column list apart from nested width specifiers.

use sqlparser::dialect::Dialect;
use sqlparser::tokenizer::{Location, Token, Tokenizer, Whitespace, Word};

use crate::core::{EmmError, Result};

/// A token together with the exact source text it was read from.
#[derive(Debug, Clone)]
pub struct Lexeme<'a> {
    pub token: Token,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Lexeme<'a> {
    /// Spaces, tabs and newlines. Comments are reported by [`Lexeme::is_comment`].
    pub fn is_whitespace(&self) -> bool {
        matches!(
            self.token,
            Token::Whitespace(Whitespace::Space | Whitespace::Newline | Whitespace::Tab)
        )
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.token,
            Token::Whitespace(Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_))
        )
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.token, Token::Whitespace(_))
    }

    pub fn word(&self) -> Option<&Word> {
        match &self.token {
            Token::Word(word) => Some(word),
            _ => None,
        }
    }
}

/// A balanced parenthesis group. `nodes` starts with the opening `(` leaf and
/// ends with the closing `)` leaf.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    pub nodes: Vec<Node<'a>>,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub enum Node<'a> {
    Leaf(Lexeme<'a>),
    Group(Group<'a>),
}

impl<'a> Node<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Node::Leaf(lexeme) => lexeme.text,
            Node::Group(group) => group.text,
        }
    }

    pub fn as_leaf(&self) -> Option<&Lexeme<'a>> {
        match self {
            Node::Leaf(lexeme) => Some(lexeme),
            Node::Group(_) => None,
        }
    }

    pub fn is_trivia(&self) -> bool {
        self.as_leaf().is_some_and(Lexeme::is_trivia)
    }
}

/// Maps tokenizer locations (1-based line, 1-based character column) back to
/// byte offsets in the source.
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { source, line_starts }
    }

    fn offset(&self, location: Location) -> usize {
        let line = (location.line as usize).saturating_sub(1);
        let Some(&line_start) = self.line_starts.get(line) else {
            return self.source.len();
        };
        let column = (location.column as usize).saturating_sub(1);
        self.source[line_start..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| line_start + i)
            .unwrap_or(self.source.len())
    }
}

/// Tokenize `sql`, attaching to every token the slice of `sql` it came from.
pub fn tokenize<'a>(dialect: &dyn Dialect, sql: &'a str) -> Result<Vec<Lexeme<'a>>> {
    let tokens = Tokenizer::new(dialect, sql).tokenize_with_location()?;
    let index = LineIndex::new(sql);

    let lexemes = tokens
        .into_iter()
        .filter(|t| t.token != Token::EOF)
        .map(|t| {
            let start = index.offset(t.span.start);
            let end = index.offset(t.span.end).max(start);
            Lexeme {
                token: t.token,
                text: &sql[start..end],
                start,
                end,
            }
        })
        .collect();

    Ok(lexemes)
}

/// Fold balanced parentheses into [`Group`] nodes. A stray `)` stays a plain
/// leaf; an unclosed `(` is an error.
pub fn group<'a>(source: &'a str, lexemes: Vec<Lexeme<'a>>) -> Result<Vec<Node<'a>>> {
    let mut top: Vec<Node<'a>> = Vec::new();
    // (start offset, nodes) for every currently open group
    let mut open: Vec<(usize, Vec<Node<'a>>)> = Vec::new();

    for lexeme in lexemes {
        match lexeme.token {
            Token::LParen => {
                let start = lexeme.start;
                open.push((start, vec![Node::Leaf(lexeme)]));
            }
            Token::RParen if !open.is_empty() => {
                let end = lexeme.end;
                if let Some((start, mut nodes)) = open.pop() {
                    nodes.push(Node::Leaf(lexeme));
                    let group = Node::Group(Group {
                        nodes,
                        text: &source[start..end],
                    });
                    match open.last_mut() {
                        Some((_, parent)) => parent.push(group),
                        None => top.push(group),
                    }
                }
            }
            _ => match open.last_mut() {
                Some((_, nodes)) => nodes.push(Node::Leaf(lexeme)),
                None => top.push(Node::Leaf(lexeme)),
            },
        }
    }

    if let Some((start, _)) = open.first() {
        return Err(EmmError::ParseError(format!(
            "unbalanced parenthesis opened at byte {}: missing ')'",
            start
        )));
    }

    Ok(top)
}

/// Split top-level nodes into statements at `;`. Statements made only of
/// whitespace and comments are dropped.
pub fn split_statements(nodes: Vec<Node<'_>>) -> Vec<Vec<Node<'_>>> {
    let mut statements = Vec::new();
    let mut current = Vec::new();

    for node in nodes {
        let is_terminator = node
            .as_leaf()
            .is_some_and(|lexeme| lexeme.token == Token::SemiColon);
        if is_terminator {
            statements.push(std::mem::take(&mut current));
        } else {
            current.push(node);
        }
    }
    statements.push(current);

    statements
        .into_iter()
        .filter(|statement| statement.iter().any(|node| !node.is_trivia()))
        .collect()
}
