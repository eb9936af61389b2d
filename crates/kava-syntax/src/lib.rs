//! Reference front end for Kava.
//!
//! The evaluator consumes raw parse-match trees ([`ParseMatch`]); this crate
//! is one way to produce them. Matches are named after grammar rules in the
//! tree-sitter style (`local_declaration`, `method_invocation`, ...) and are
//! deliberately shallow: operator levels come out as flat operand/operator
//! lists and unary operators in source order, leaving association and
//! prefix/postfix inference to the construction pass.

pub mod error;
pub mod lexer;
pub mod matcher;
pub mod tree;

pub use error::SyntaxError;
pub use matcher::{parse_expression, parse_program};
pub use tree::ParseMatch;
