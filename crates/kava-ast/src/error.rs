//! Construction-time errors.

use derive_more::{Display, Error};
use kava_core::Span;

pub type ConstructionResult<T> = Result<T, ConstructionError>;

/// A structural problem found while binding a parse-match tree. No AST is
/// produced when one is raised.
#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display("{kind}")]
pub struct ConstructionError {
    kind: Box<ConstructionErrorKind>,
    pub span: Span,
}

impl ConstructionError {
    pub fn new(kind: ConstructionErrorKind, span: Span) -> Self {
        Self {
            kind: Box::new(kind),
            span,
        }
    }

    pub fn kind(&self) -> &ConstructionErrorKind {
        &self.kind
    }

    pub(crate) fn malformed(what: impl Into<String>, span: Span) -> Self {
        Self::new(ConstructionErrorKind::Malformed(what.into()), span)
    }
}

#[derive(Clone, Debug, Display, PartialEq)]
pub enum ConstructionErrorKind {
    #[display("unexpected `{_0}` match")]
    UnexpectedMatch(String),

    #[display("malformed {_0}")]
    Malformed(String),

    #[display("invalid literal: {_0}")]
    Literal(LiteralError),

    #[display("only the last parameter may be variable-arity")]
    MisplacedVarargs,

    #[display("`try` requires at least one `catch` or a `finally`")]
    BareTry,

    #[display("duplicate `default` label in switch")]
    DuplicateDefault,

    #[display("statement outside of a switch label")]
    UnlabelledSwitchStatement,

    #[display("cannot instantiate the type {_0}")]
    WildcardInstantiation(String),

    #[display("anonymous class members must be field or method declarations")]
    InvalidClassMember,

    #[display("array initializer needs an array type, found {_0}")]
    InitializerForNonArray(String),
}

/// Why a literal's source text was rejected.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum LiteralError {
    #[display("the literal {_0} of type int is out of range")]
    IntOutOfRange(String),

    #[display("the literal {_0} of type long is out of range")]
    LongOutOfRange(String),

    #[display("floating-point number too large: {_0}")]
    FloatTooLarge(String),

    #[display("floating-point number too small: {_0}")]
    FloatTooSmall(String),

    #[display("invalid digit in {_0}")]
    InvalidDigit(String),

    #[display("invalid escape sequence in {_0}")]
    InvalidEscape(String),

    #[display("invalid character constant {_0}")]
    InvalidChar(String),

    #[display("unterminated literal {_0}")]
    Unterminated(String),
}

/// Why a structural [`replace`](crate::Node::replace) was refused.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum EditError {
    #[display("invalid replacement target: {kind} has no children")]
    InvalidTarget { kind: &'static str },

    #[display("{kind} has no child at index {index}")]
    IndexOutOfRange { kind: &'static str, index: usize },

    #[display("cannot place {found} in {slot} slot")]
    IncompatibleKind {
        slot: crate::node::Slot,
        found: &'static str,
    },
}
