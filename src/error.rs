//! Errors surfaced by a [`Session`](crate::Session).

use derive_more::{Display, Error, From};
use kava_ast::ConstructionError;
use kava_core::Span;
use kava_eval::{EvaluationError, ExecutionError};
use kava_syntax::SyntaxError;

pub type Result<T> = std::result::Result<T, Error>;

/// Which stage of handling a submission failed.
#[derive(Clone, Debug, Display, Error, From)]
pub enum Error {
    Syntax(SyntaxError),
    Construction(ConstructionError),
    Evaluation(EvaluationError),
    /// A thrown value no `catch` handled.
    Execution(ExecutionError),
}

impl From<kava_eval::Error> for Error {
    fn from(error: kava_eval::Error) -> Self {
        match error {
            kava_eval::Error::Evaluation(e) => Error::Evaluation(e),
            kava_eval::Error::Execution(e) => Error::Execution(e),
        }
    }
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Syntax(e) => e.span,
            Error::Construction(e) => e.span,
            Error::Evaluation(e) => e.span,
            Error::Execution(e) => e.span,
        }
    }

    /// Short name of the failing stage, used as the report code.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Syntax(_) => "syntax",
            Error::Construction(_) => "construction",
            Error::Evaluation(_) => "evaluation",
            Error::Execution(_) => "exception",
        }
    }

    /// The submission ran out of input before it was complete.
    pub fn is_incomplete(&self, source: &str) -> bool {
        matches!(self, Error::Syntax(e) if e.span.start >= source.trim_end().len())
    }
}
