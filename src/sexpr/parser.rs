use std::{borrow::Cow, iter::Peekable};

use crate::error::ParseError;

use super::{
    lexer::{Token, TokenIter, TokenKind},
    SExpr,
};

pub(super) struct Parser<'a> {
    input: &'a str,
    iter: Peekable<TokenIter<'a>>,
}

type Span = logos::Span;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParsedSExpr {
    SExpr(Span, Vec<ParsedSExpr>),
    Atom(Span),
    String(Span),
}

impl ParsedSExpr {
    fn into_sexpr(self, input: &str) -> SExpr {
        match self {
            ParsedSExpr::SExpr(label_span, children) => {
                let label = &input[label_span];
                let children: Box<[SExpr]> =
                    children.into_iter().map(|c| c.into_sexpr(input)).collect();
                SExpr::SExpr(label, children)
            }
            ParsedSExpr::Atom(span) => SExpr::Atom(Cow::Borrowed(&input[span])),
            ParsedSExpr::String(span) => SExpr::String(unescape(&input[span])),
        }
    }
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            input,
            iter: TokenIter::new(input).peekable(),
        }
    }

    fn eof(&self) -> ParseError {
        let end = self.input.len();
        ParseError::UnexpectedEof { at: end..end }
    }

    fn get(&mut self) -> Result<Token, ParseError> {
        self.iter.next().ok_or_else(|| self.eof())
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.iter.peek().map(|tok| tok.kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let tok = self.get()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(self.unexpected(format!("{:?}", kind), tok))
        }
    }

    fn unexpected(&self, expected: String, tok: Token) -> ParseError {
        match tok.kind {
            TokenKind::Error => ParseError::UnknownToken {
                found: self.input[tok.span.clone()].to_owned(),
                at: tok.span,
            },
            kind => ParseError::UnexpectedToken {
                expected,
                found: format!("{:?}", kind),
                at: tok.span,
            },
        }
    }

    fn parse_sexpr(&mut self) -> Result<ParsedSExpr, ParseError> {
        self.expect(TokenKind::LParen)?;
        let label = self.expect(TokenKind::Atom)?;

        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::RParen) => {
                    self.get()?;
                    break Ok(ParsedSExpr::SExpr(label.span, children));
                }
                Some(TokenKind::LParen) => {
                    children.push(self.parse_sexpr()?);
                }
                Some(TokenKind::Atom) => {
                    children.push(ParsedSExpr::Atom(self.get()?.span));
                }
                Some(TokenKind::QuotedString) => {
                    children.push(ParsedSExpr::String(self.get()?.span));
                }
                Some(TokenKind::Error) => {
                    let tok = self.get()?;
                    break Err(self.unexpected(String::new(), tok));
                }
                None => break Err(self.eof()),
            }
        }
    }

    fn parse_document(&mut self) -> Result<Vec<ParsedSExpr>, ParseError> {
        let mut roots = Vec::new();
        while let Some(kind) = self.peek() {
            if kind != TokenKind::LParen {
                let tok = self.get()?;
                return Err(self.unexpected(format!("{:?}", TokenKind::LParen), tok));
            }
            roots.push(self.parse_sexpr()?);
        }
        if roots.is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        Ok(roots)
    }
}

/// Parses a sequence of top-level lists
pub fn parse_document(input: &str) -> Result<Vec<SExpr>, ParseError> {
    let mut parser = Parser::new(input);
    let roots = parser.parse_document()?;
    Ok(roots.into_iter().map(|r| r.into_sexpr(input)).collect())
}

fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}
