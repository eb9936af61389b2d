//! The interpreter.
//!
//! Every node is evaluated by one exhaustive match: expressions in
//! [`Interpreter::eval`], statements in [`Interpreter::exec`]. A [`Frame`]
//! threads the per-call context (value or type-only mode, enclosing
//! function, active `catch` clauses, `this`) through the walk; all mutable
//! bindings live in the [`Environment`].

use std::cell::Cell;
use std::rc::Rc;

use kava_ast::{AssignOp, Node, NodeKind};
use kava_core::{MemberCatalog, Object, Primitive, Thrown, Type, Value, relations, types};

use crate::diagnostics::{DiagnosticSink, NullSink};
use crate::environment::Environment;
use crate::error::{EvalResult, EvaluationError, EvaluationErrorKind, ExecutionError};
use crate::evaluated::{Evaluated, Outcome, Signal};

mod call;
mod class;
mod expression;
mod operators;
mod statement;
mod typing;

pub(crate) use class::ScriptClass;

/// Nested script calls (functions and anonymous-class methods) allowed
/// before evaluation fails instead of exhausting the native stack.
pub const MAX_CALL_DEPTH: usize = 128;

pub(crate) const NPE: &str = "java.lang.NullPointerException";
pub(crate) const ARITHMETIC: &str = "java.lang.ArithmeticException";
pub(crate) const INDEX_OUT_OF_BOUNDS: &str = "java.lang.ArrayIndexOutOfBoundsException";
pub(crate) const NEGATIVE_SIZE: &str = "java.lang.NegativeArraySizeException";
pub(crate) const CLASS_CAST: &str = "java.lang.ClassCastException";
pub(crate) const ARRAY_STORE: &str = "java.lang.ArrayStoreException";

static NULL_SINK: NullSink = NullSink;

pub struct Interpreter<'a> {
    catalog: &'a dyn MemberCatalog,
    sink: &'a dyn DiagnosticSink,
    depth: Cell<usize>,
}

/// Per-call evaluation context.
#[derive(Clone)]
pub(crate) struct Frame {
    /// Type+value mode; `false` derives types only, without side effects.
    pub values: bool,
    /// Declared return type inside a function or method body.
    pub returns: Option<Type>,
    /// Exception types the enclosing function declares.
    pub throws: Vec<Type>,
    /// Exception types caught by enclosing `try` statements.
    pub handlers: Vec<Type>,
    /// The anonymous-class instance a method or initializer runs on.
    pub this: Option<Rc<Object>>,
    pub loops: usize,
    pub switches: usize,
}

impl Frame {
    fn top(values: bool) -> Self {
        Self {
            values,
            returns: None,
            throws: Vec::new(),
            handlers: Vec::new(),
            this: None,
            loops: 0,
            switches: 0,
        }
    }

    /// A function or method body.
    pub fn body(values: bool, returns: Type, throws: Vec<Type>, this: Option<Rc<Object>>) -> Self {
        Self {
            returns: Some(returns),
            throws,
            this,
            ..Self::top(values)
        }
    }

    pub fn typed(&self) -> Self {
        Self {
            values: false,
            ..self.clone()
        }
    }

    pub fn looping(&self) -> Self {
        Self {
            loops: self.loops + 1,
            ..self.clone()
        }
    }

    pub fn switching(&self) -> Self {
        Self {
            switches: self.switches + 1,
            ..self.clone()
        }
    }

    pub fn handling(&self, caught: &[Type]) -> Self {
        let mut frame = self.clone();
        frame.handlers.extend(caught.iter().cloned());
        frame
    }

    /// `this` and its script class, inside anonymous-class code.
    pub fn script_this(&self) -> Option<(Rc<Object>, Rc<ScriptClass>)> {
        let object = self.this.as_ref()?;
        let class = object.opaque::<ScriptClass>()?;
        Some((Rc::clone(object), class))
    }
}

/// An expression result that denotes a value (as opposed to a type or a
/// package). `value` is `None` in type-only mode.
#[derive(Clone, Debug)]
pub(crate) struct Operand {
    pub ty: Type,
    pub value: Option<Value>,
}

impl Operand {
    pub fn new(ty: Type, value: Option<Value>) -> Self {
        Self { ty, value }
    }

    pub fn typed(ty: Type) -> Self {
        Self { ty, value: None }
    }

    /// The value, or `null` in type-only mode.
    pub fn get(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }

    pub fn into_evaluated(self) -> Evaluated {
        match self.value {
            Some(value) => Evaluated::Value(self.ty, value),
            None => Evaluated::Typed(self.ty),
        }
    }
}

/// Decrements the call depth when a script call returns.
struct DepthGuard<'i> {
    depth: &'i Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

pub(crate) fn fail<T>(kind: EvaluationErrorKind, node: &Node) -> EvalResult<T> {
    Err(EvaluationError::new(kind, node).into())
}

/// `int, String`, as listed in overload diagnostics.
pub(crate) fn type_list(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl<'a> Interpreter<'a> {
    pub fn new(catalog: &'a dyn MemberCatalog) -> Self {
        Self::with_sink(catalog, &NULL_SINK)
    }

    pub fn with_sink(catalog: &'a dyn MemberCatalog, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            catalog,
            sink,
            depth: Cell::new(0),
        }
    }

    pub fn catalog(&self) -> &'a dyn MemberCatalog {
        self.catalog
    }

    /// Evaluate one top-level construct. Expressions produce
    /// [`Outcome::Value`]; statements complete normally or with a signal.
    /// With `with_values` unset nothing is executed and the environment
    /// only receives declarations.
    pub fn evaluate(
        &self,
        env: &mut dyn Environment,
        node: &Node,
        with_values: bool,
    ) -> EvalResult<Outcome> {
        let frame = Frame::top(with_values);
        let declares = matches!(
            &node.kind,
            NodeKind::Assign { op: AssignOp::Assign, target, .. }
                if matches!(target.kind, NodeKind::Declaration(_))
        );
        if node.kind.is_expression() && !declares {
            let operand = self.operand(env, &frame, node)?;
            return Ok(Outcome::Value(operand.into_evaluated()));
        }
        Ok(match self.exec(env, &frame, node)? {
            Some(signal) => Outcome::Signal(signal),
            None => Outcome::Normal,
        })
    }

    /// Evaluate an expression with values.
    pub fn expression(&self, env: &mut dyn Environment, node: &Node) -> EvalResult<Evaluated> {
        Ok(self.operand(env, &Frame::top(true), node)?.into_evaluated())
    }

    /// Execute a statement with values.
    pub fn execute(&self, env: &mut dyn Environment, node: &Node) -> EvalResult<Option<Signal>> {
        self.exec(env, &Frame::top(true), node)
    }

    /// `String.valueOf(value)`, honouring `toString()` declared by
    /// anonymous classes.
    pub fn display(&self, value: &Value) -> EvalResult<String> {
        if let Value::Object(object) = value {
            if let Some(text) = self.script_to_string(object)? {
                return Ok(text);
            }
        }
        Ok(self.catalog.display(value))
    }

    /// Enter a nested script call.
    fn enter(&self, node: &Node) -> EvalResult<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= MAX_CALL_DEPTH {
            return fail(EvaluationErrorKind::TooDeep(MAX_CALL_DEPTH), node);
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard { depth: &self.depth })
    }

    /// Wrap a thrown value as an execution error surfacing at `node`.
    fn thrown(&self, thrown: Thrown, node: &Node) -> crate::Error {
        let value = thrown.0;
        let ty = self.catalog.runtime_type(&value);
        self.sink.exception_raised(&ty);
        let message = self.catalog.display(&value);
        tracing::debug!(%message, node = node.label(), "exception raised");
        ExecutionError {
            value,
            ty,
            span: node.span,
            message,
        }
        .into()
    }

    /// Throw a new instance of the library exception `class`.
    fn raise<T>(&self, class: &str, message: Option<String>, node: &Node) -> EvalResult<T> {
        Err(self.thrown(self.catalog.throwable(class, message), node))
    }

    fn null_pointer<T>(&self, node: &Node) -> EvalResult<T> {
        self.raise(NPE, None, node)
    }

    /// Poll cancellation before a loop iteration.
    fn checkpoint(&self, env: &dyn Environment, node: &Node) -> EvalResult<()> {
        if env.is_canceled() {
            tracing::debug!(node = node.label(), "evaluation canceled");
            return fail(EvaluationErrorKind::Canceled, node);
        }
        self.sink.loop_iteration();
        tracing::trace!(node = node.label(), "loop iteration");
        Ok(())
    }

    /// Evaluate an expression that must denote a value.
    fn operand(&self, env: &mut dyn Environment, frame: &Frame, node: &Node) -> EvalResult<Operand> {
        match self.eval(env, frame, node)? {
            Evaluated::Value(ty, value) => Ok(Operand::new(ty, Some(value))),
            Evaluated::Typed(ty) => Ok(Operand::typed(ty)),
            Evaluated::Static(ty) => fail(EvaluationErrorKind::TypeAsValue(ty), node),
            Evaluated::Package(name) => fail(EvaluationErrorKind::Unresolved(name), node),
            Evaluated::Name(name) => fail(EvaluationErrorKind::UnresolvedVariable(name), node),
        }
    }

    /// Evaluate an operand that must be `boolean` (or `Boolean`).
    fn condition(&self, env: &mut dyn Environment, frame: &Frame, node: &Node) -> EvalResult<Option<bool>> {
        let operand = self.operand(env, frame, node)?;
        if operand.ty.unboxed() != Some(Primitive::Boolean) {
            return fail(
                EvaluationErrorKind::TypeMismatch {
                    from: operand.ty,
                    to: Type::boolean(),
                },
                node,
            );
        }
        match operand.value {
            Some(Value::Null) => self.null_pointer(node),
            Some(value) => Ok(value.as_bool()),
            None => Ok(None),
        }
    }

    /// Whether a value of type `from` produced by `node` may be assigned to
    /// `to`, including narrowing of `int` constants to `byte`, `short` and
    /// `char`.
    fn check_assignable(&self, to: &Type, from: &Type, node: &Node) -> EvalResult<()> {
        if relations::is_assignable(self.catalog, to, from) || self.narrows_constant(to, from, node) {
            return Ok(());
        }
        fail(
            EvaluationErrorKind::TypeMismatch {
                from: from.clone(),
                to: to.clone(),
            },
            node,
        )
    }

    fn narrows_constant(&self, to: &Type, from: &Type, node: &Node) -> bool {
        let Some(target) = to.unboxed() else {
            return false;
        };
        if !matches!(from.as_primitive(), Some(Primitive::Int | Primitive::Short | Primitive::Char | Primitive::Byte)) {
            return false;
        }
        let Some(value) = constant(node) else {
            return false;
        };
        match target {
            Primitive::Byte => i8::try_from(value).is_ok(),
            Primitive::Short => i16::try_from(value).is_ok(),
            Primitive::Char => u16::try_from(value).is_ok(),
            _ => false,
        }
    }

    /// Convert `value` for storage in a slot of type `to`: primitive slots
    /// receive the exact primitive, box-class slots the boxed primitive.
    fn coerce(&self, value: Value, to: &Type, node: &Node) -> EvalResult<Value> {
        if let Some(p) = to.as_primitive() {
            if p == Primitive::Void {
                return Ok(value);
            }
            if value.is_null() {
                return self.null_pointer(node);
            }
            return Ok(value.convert(p).unwrap_or(value));
        }
        match (to.class_name().and_then(Primitive::unbox), value.primitive()) {
            (Some(p), Some(_)) => Ok(value.convert(p).unwrap_or(value)),
            _ => Ok(value),
        }
    }

    /// Check that a checked exception of type `ty` raised at `node` is
    /// caught, declared, or accepted by the host.
    fn check_handled(
        &self,
        env: &dyn Environment,
        frame: &Frame,
        ty: &Type,
        node: &Node,
    ) -> EvalResult<()> {
        if !relations::is_checked_exception(self.catalog, ty) {
            return Ok(());
        }
        let covered = |list: &[Type]| {
            list.iter()
                .any(|h| relations::is_assignable_strict(self.catalog, h, ty))
        };
        if covered(&frame.handlers) || covered(&frame.throws) {
            return Ok(());
        }
        if frame.returns.is_none() && env.can_handle(ty) {
            return Ok(());
        }
        fail(EvaluationErrorKind::UnhandledException(ty.clone()), node)
    }

    fn is_throwable(&self, ty: &Type) -> bool {
        ty.is_null()
            || relations::is_assignable_strict(self.catalog, &Type::class(types::THROWABLE), ty)
    }
}

/// The value of an integral constant expression.
pub(crate) fn constant(node: &Node) -> Option<i64> {
    use kava_ast::{BinaryOp, Literal, UnaryOp};
    match &node.kind {
        NodeKind::Literal(Literal::Int(v)) => Some(i64::from(*v)),
        NodeKind::Literal(Literal::Char(c)) => Some(i64::from(*c)),
        NodeKind::Unary { op, operand } => {
            let v = constant(operand)?;
            match op {
                UnaryOp::Plus => Some(v),
                UnaryOp::Minus => Some(i64::from((v as i32).wrapping_neg())),
                UnaryOp::BitNot => Some(i64::from(!(v as i32))),
                _ => None,
            }
        }
        NodeKind::Binary { op, left, right } => {
            let (l, r) = (constant(left)? as i32, constant(right)? as i32);
            let v = match op {
                BinaryOp::Add => l.wrapping_add(r),
                BinaryOp::Sub => l.wrapping_sub(r),
                BinaryOp::Mul => l.wrapping_mul(r),
                BinaryOp::Div if r != 0 => l.wrapping_div(r),
                BinaryOp::Rem if r != 0 => l.wrapping_rem(r),
                BinaryOp::BitAnd => l & r,
                BinaryOp::BitOr => l | r,
                BinaryOp::BitXor => l ^ r,
                BinaryOp::Shl => l.wrapping_shl(r as u32 & 31),
                BinaryOp::Shr => l >> (r & 31),
                BinaryOp::UShr => ((l as u32) >> (r & 31)) as i32,
                _ => return None,
            };
            Some(i64::from(v))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests;
