//! Kava abstract syntax tree.
//!
//! [`construct_program`] binds a raw parse-match tree from `kava-syntax` (or
//! any front end producing [`ParseMatch`](kava_syntax::ParseMatch) trees)
//! into [`Node`]s, validating structure on the way.

pub mod construct;
pub mod error;
pub mod function;
pub mod literal;
pub mod node;
pub mod type_ref;

pub use construct::{construct, construct_program};
pub use error::{
    ConstructionError, ConstructionErrorKind, ConstructionResult, EditError, LiteralError,
};
pub use function::{FunctionDecl, Param};
pub use literal::Literal;
pub use node::{
    AssignOp, BinaryOp, CatchClause, Declaration, Import, Keyword, Node, NodeKind, Slot,
    SwitchCase, UnaryOp,
};
pub use type_ref::{TypeName, TypeRef};
