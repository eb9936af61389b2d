//! Tree-walking evaluation of Kava AST nodes.
//!
//! The [`Interpreter`] evaluates one node at a time against an
//! [`Environment`], either with values (executing side effects) or type-only
//! (checking without running anything). Member lookup and overload
//! selection live in [`resolve`]; the host class library is reached only
//! through [`kava_core::MemberCatalog`].

pub mod diagnostics;
mod engine;
pub mod environment;
pub mod error;
pub mod evaluated;
pub mod resolve;

pub use diagnostics::{Counters, DiagnosticSink, NullSink};
pub use engine::{Interpreter, MAX_CALL_DEPTH};
pub use environment::{Environment, Scope, Variable};
pub use error::{Error, EvalResult, EvaluationError, EvaluationErrorKind, ExecutionError};
pub use evaluated::{Evaluated, Outcome, Signal};
