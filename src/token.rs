//! Lexical tokens shared by the scanner, parser, and condition evaluator.

use serde::{Deserialize, Serialize};

/// A lexical token tag.
///
/// The scanner produces structural, operator, keyword, and literal tags.
/// The parser additionally classifies condition-clause identifiers into
/// `Entity`, `Attribute`, and `Function` before the evaluator sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    // Special
    Illegal,
    Eof,
    Whitespace,
    Comment,

    // Literals
    Ident,
    Long,
    DblQuoteStr,

    // Derived (parser-classified)
    Entity,
    Attribute,
    Function,

    // Structural
    LeftParen,
    RightParen,
    LeftSqb,
    RightSqb,
    LeftBrace,
    RightBrace,
    Period,
    Comma,
    Colon,
    Semicolon,

    // Operators
    Exclamation,
    Lt,
    Gt,
    Lte,
    Gte,
    Dash,
    Plus,
    Multiplier,
    Namespace,
    Equality,
    Inequality,
    And,
    Or,

    // Keywords
    Permit,
    Forbid,
    When,
    Unless,
    True,
    False,
    If,
    Then,
    Else,
    In,
    Like,
    Has,
    Principal,
    Action,
    Resource,
    Context,
}

impl Token {
    /// Look up the keyword for an identifier, if it is reserved.
    pub fn keyword(ident: &str) -> Option<Token> {
        match ident {
            "permit" => Some(Token::Permit),
            "forbid" => Some(Token::Forbid),
            "when" => Some(Token::When),
            "unless" => Some(Token::Unless),
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            "if" => Some(Token::If),
            "then" => Some(Token::Then),
            "else" => Some(Token::Else),
            "in" => Some(Token::In),
            "like" => Some(Token::Like),
            "has" => Some(Token::Has),
            "principal" => Some(Token::Principal),
            "action" => Some(Token::Action),
            "resource" => Some(Token::Resource),
            "context" => Some(Token::Context),
            _ => None,
        }
    }
}

/// One element of a condition-clause token sequence.
///
/// `literal` preserves the source spelling (quotes and escapes included) for
/// policy-text reconstruction; `normalized` carries the canonical form the
/// evaluator works with (unquoted strings, canonical decimal longs, full
/// entity references).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceItem {
    pub token: Token,
    pub literal: String,
    pub normalized: String,
}

impl SequenceItem {
    pub fn new(token: Token, literal: impl Into<String>) -> Self {
        let literal = literal.into();
        let normalized = literal.clone();
        SequenceItem {
            token,
            literal,
            normalized,
        }
    }

    pub fn with_normalized(
        token: Token,
        literal: impl Into<String>,
        normalized: impl Into<String>,
    ) -> Self {
        SequenceItem {
            token,
            literal: literal.into(),
            normalized: normalized.into(),
        }
    }
}
