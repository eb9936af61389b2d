//! Evaluation errors.
//!
//! Two kinds of failure leave the engine. An [`EvaluationError`] is a static
//! or semantic problem with a node (an unresolved name, a type mismatch, an
//! inapplicable overload); it is never caught by script code. An
//! [`ExecutionError`] is a thrown `Throwable` value, raised by `throw`, by a
//! host member or by the engine itself, and is what `catch` clauses match.

use derive_more::{Display, Error, From};
use kava_ast::{Keyword, Node};
use kava_core::{Span, Type, Value};

pub type EvalResult<T> = Result<T, Error>;

#[derive(Clone, Debug, Display, Error, From)]
pub enum Error {
    Evaluation(EvaluationError),
    Execution(ExecutionError),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Evaluation(e) => e.span,
            Error::Execution(e) => e.span,
        }
    }
}

#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display("{kind}")]
pub struct EvaluationError {
    kind: Box<EvaluationErrorKind>,
    /// Label of the offending node kind, see [`kava_ast::NodeKind::label`].
    pub node: &'static str,
    pub span: Span,
}

impl EvaluationError {
    pub fn new(kind: EvaluationErrorKind, node: &Node) -> Self {
        Self::at(kind, node.label(), node.span)
    }

    pub fn at(kind: EvaluationErrorKind, node: &'static str, span: Span) -> Self {
        Self {
            kind: Box::new(kind),
            node,
            span,
        }
    }

    pub fn kind(&self) -> &EvaluationErrorKind {
        &self.kind
    }
}

#[derive(Clone, Debug, Display, PartialEq)]
pub enum EvaluationErrorKind {
    #[display("{_0} cannot be resolved to a variable")]
    UnresolvedVariable(String),

    #[display("{_0} cannot be resolved to a type")]
    UnresolvedType(String),

    #[display("{_0} cannot be resolved")]
    Unresolved(String),

    #[display("the type {_0} cannot be used as a value")]
    TypeAsValue(Type),

    #[display("incorrect number of arguments for type {ty}; it cannot be parameterized with arguments <{args}>")]
    TypeArity { ty: String, args: String },

    #[display("duplicate variable {_0}")]
    DuplicateVariable(String),

    #[display("the final variable {_0} cannot be assigned")]
    FinalAssignment(String),

    #[display("the variable {_0} may not have been initialized")]
    Uninitialized(String),

    #[display("type mismatch: cannot convert from {from} to {to}")]
    TypeMismatch { from: Type, to: Type },

    #[display("the operator {op} is undefined for the argument type(s) {operands}")]
    UndefinedOperator { op: String, operands: String },

    #[display("cannot cast from {from} to {to}")]
    InvalidCast { from: Type, to: Type },

    #[display("incompatible conditional operand types {left} and {right}")]
    IncompatibleOperands { left: Type, right: Type },

    #[display("the left-hand side of an assignment must be a variable")]
    InvalidTarget,

    #[display("{_0} cannot be resolved or is not a field")]
    UnknownField(String),

    #[display("the field {owner}.{name} is not visible")]
    InvisibleField { owner: String, name: String },

    #[display("cannot make a static reference to the non-static field {_0}")]
    NonStaticField(String),

    #[display("the static field {owner}.{name} should be accessed in a static way")]
    StaticFieldFromInstance { owner: String, name: String },

    #[display("the method {name} is undefined for the type {ty}")]
    UnrecognizedMethod { name: String, ty: Type },

    #[display("the method {name}({args}) is undefined for the type {ty}")]
    UndefinedForArguments { name: String, args: String, ty: Type },

    #[display("the function {name}({args}) is undefined")]
    UndefinedFunction { name: String, args: String },

    #[display("the constructor {ty}({args}) is undefined")]
    UndefinedConstructor { ty: Type, args: String },

    #[display("the method {name}({args}) is ambiguous")]
    AmbiguousMethod { name: String, args: String },

    #[display("cannot make a static reference to the non-static method {_0}")]
    NonStaticMethod(String),

    #[display("the method {_0} is not visible")]
    InvisibleMethod(String),

    #[display("cannot invoke {name}() on the primitive type {ty}")]
    PrimitiveReceiver { name: String, ty: Type },

    #[display("cannot instantiate the type {_0}")]
    AbstractInstantiation(Type),

    #[display("the anonymous class of {ty} must implement the inherited abstract method {method}")]
    MissingImplementation { ty: Type, method: String },

    #[display("{_0} cannot be extended by an anonymous class")]
    UnsupportedBase(Type),

    #[display("duplicate function {_0}")]
    DuplicateFunction(String),

    #[display("no function {_0} to drop")]
    UnknownFunction(String),

    #[display("this method must return a result of type {_0}")]
    MissingReturn(Type),

    #[display("void methods cannot return a value")]
    VoidReturn,

    #[display("unhandled exception type {_0}")]
    UnhandledException(Type),

    #[display("no exception of type {_0} can be thrown; an exception type must be a subclass of Throwable")]
    NotThrowable(Type),

    #[display("{_0} cannot be used outside of a loop")]
    MisplacedJump(Keyword),

    #[display("cannot use this outside of an anonymous class")]
    ThisOutside,

    #[display("{_0} is not allowed here")]
    Misplaced(&'static str),

    #[display("the type of the expression must be an array type but it resolved to {_0}")]
    NotAnArray(Type),

    #[display("can only iterate over an array or an instance of java.lang.Iterable, not {_0}")]
    NotIterable(Type),

    #[display("cannot switch on a value of type {_0}")]
    InvalidSwitch(Type),

    #[display("cannot synchronize on a value of type {_0}")]
    InvalidLock(Type),

    #[display("call depth exceeded {_0}")]
    TooDeep(usize),

    #[display("evaluation canceled")]
    Canceled,
}

/// A thrown value escaping the node at `span`.
#[derive(Clone, Debug, Display, Error)]
#[display("{message}")]
pub struct ExecutionError {
    /// The thrown `Throwable` instance.
    pub value: Value,
    /// Runtime type of `value`, used for `catch` matching.
    pub ty: Type,
    pub span: Span,
    /// `Throwable.toString()` of the value when it was raised.
    pub message: String,
}
