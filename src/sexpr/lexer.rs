use logos::{Logos, SpannedIter};

pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) span: logos::Span,
}

pub(super) struct TokenIter<'a> {
    iter: SpannedIter<'a, LogosTokenKind>,
}

impl<'a> TokenIter<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            iter: LogosTokenKind::lexer(input).spanned(),
        }
    }
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let (kind, span) = self.iter.next()?;
        let (kind, span) = match kind {
            Ok(LogosTokenKind::LParen) => (TokenKind::LParen, span),
            Ok(LogosTokenKind::RParen) => (TokenKind::RParen, span),
            // The span of a quoted string excludes the quotes
            Ok(LogosTokenKind::QuotedString) => {
                (TokenKind::QuotedString, (span.start + 1)..(span.end - 1))
            }
            Ok(LogosTokenKind::Atom) => (TokenKind::Atom, span),
            Ok(LogosTokenKind::WS) => unreachable!(),
            Err(_) => (TokenKind::Error, span),
        };
        Some(Token { kind, span })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum TokenKind {
    LParen,
    RParen,
    QuotedString,
    Atom,
    Error,
}

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
enum LogosTokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r#""([^"\\]|\\["\\bnfrt]|\\u[a-fA-F0-9]{4})*""#)]
    QuotedString,
    #[regex(r#"[^"() \t\r\f\n]+"#)]
    Atom,
    #[regex(r"[ \t\r\f\n]+", logos::skip)]
    WS,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<(TokenKind, &str)> {
        TokenIter::new(input)
            .map(|token| (token.kind, &input[token.span]))
            .collect()
    }

    #[test]
    fn lexes_atoms_and_strings() {
        let expected = vec![
            (TokenKind::LParen, "("),
            (TokenKind::Atom, "a"),
            (TokenKind::QuotedString, "b"),
            (TokenKind::QuotedString, ""),
            (TokenKind::Atom, "12"),
            (TokenKind::RParen, ")"),
        ];

        assert_eq!(lex("(a \"b\" \"\" 12\n)"), expected);
    }

    #[test]
    fn keeps_escapes_inside_strings() {
        assert_eq!(
            lex(r#"(name "a \"b\"")"#),
            vec![
                (TokenKind::LParen, "("),
                (TokenKind::Atom, "name"),
                (TokenKind::QuotedString, r#"a \"b\""#),
                (TokenKind::RParen, ")"),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let tokens = lex("(name \"abc)");
        assert!(tokens.iter().any(|(kind, _)| *kind == TokenKind::Error));
    }
}
