use kava_core::Span;
use logos::{Lexer, Logos};

use crate::error::SyntaxError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    // Integers in every radix; range checks happen during construction.
    #[regex(r"0[xX][0-9a-fA-F_]+[lL]?")]
    #[regex(r"0[bB][01_]+[lL]?")]
    #[regex(r"[0-9][0-9_]*[lL]?")]
    Integer,

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+[fFdD]?")]
    #[regex(r"[0-9][0-9_]*[fFdD]")]
    Floating,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"'([^'\\\n]|\\u+[0-9a-fA-F]{4}|\\[0-7]{1,3}|\\[^u0-7\n])'")]
    Char,

    #[regex(r">>>=|<<=|>>=|>>>|\.\.\.|->|::|\+\+|--|&&|\|\||==|!=|<=|>=|\+=|-=|\*=|/=|%=|&=|\|=|\^=|<<|>>")]
    #[regex(r"[{}()\[\];,.@=<>!~?:+\-*/&|\^%]")]
    Punct,
}

/// Consume a block comment body through the closing `*/`. An unterminated
/// comment swallows the rest of the input and fails.
fn block_comment(lex: &mut Lexer<'_, TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub const KEYWORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "continue", "default",
    "do", "double", "else", "extends", "false", "final", "finally", "float", "for", "if",
    "implements", "import", "instanceof", "int", "interface", "long", "new", "null", "private",
    "protected", "public", "return", "short", "static", "super", "switch", "synchronized", "this",
    "throw", "throws", "true", "try", "void", "while",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Split source text into tokens. Comments are kept so the matcher can
/// surface them at statement positions.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end);
        match result {
            Ok(kind) => tokens.push(Token { kind, span }),
            Err(()) if lexer.slice().starts_with("/*") => {
                return Err(SyntaxError::new("unterminated comment", span));
            }
            Err(()) => {
                return Err(SyntaxError::new(
                    format!("unexpected character `{}`", lexer.slice()),
                    span,
                ));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, &source[t.span.start..t.span.end]))
            .collect()
    }

    #[test]
    fn numbers_in_every_radix() {
        let tokens = kinds("0x1F 0b101L 017 42 3.5f .5 1e10 2d");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Integer, "0x1F"),
                (TokenKind::Integer, "0b101L"),
                (TokenKind::Integer, "017"),
                (TokenKind::Integer, "42"),
                (TokenKind::Floating, "3.5f"),
                (TokenKind::Floating, ".5"),
                (TokenKind::Floating, "1e10"),
                (TokenKind::Floating, "2d"),
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        let tokens = kinds("a >>>= b >> c");
        assert_eq!(tokens[1], (TokenKind::Punct, ">>>="));
        assert_eq!(tokens[3], (TokenKind::Punct, ">>"));
    }

    #[test]
    fn char_literals_with_escapes() {
        let tokens = kinds(r"'a' '\n' '\u0041' '\'' '\101'");
        assert!(tokens.iter().all(|(kind, _)| *kind == TokenKind::Char));
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[2].1, r"'\u0041'");
    }

    #[test]
    fn comments_are_tokens() {
        let tokens = kinds("x // trailing\n/* block */ y");
        assert_eq!(tokens[1].0, TokenKind::LineComment);
        assert_eq!(tokens[2], (TokenKind::BlockComment, "/* block */"));
        assert_eq!(tokens[3], (TokenKind::Ident, "y"));
    }

    #[test]
    fn block_comments_end_at_the_first_close() {
        let tokens = kinds("/** a * b **/ x /*/ c */ /**/");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::BlockComment, "/** a * b **/"),
                (TokenKind::Ident, "x"),
                (TokenKind::BlockComment, "/*/ c */"),
                (TokenKind::BlockComment, "/**/"),
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = tokenize("x /* open").unwrap_err();
        assert_eq!(err.message, "unterminated comment");
        assert_eq!(err.span, Span::new(2, 9));
    }

    #[test]
    fn unknown_character_is_an_error() {
        let err = tokenize("int #x").unwrap_err();
        assert_eq!(err.span, Span::new(4, 5));
    }
}
