//! Statements and control flow.

use kava_ast::{CatchClause, FunctionDecl, Keyword, Literal, Node, NodeKind, SwitchCase, TypeRef};
use kava_core::{Primitive, Thrown, Type, Value, relations, types};

use super::{Frame, Interpreter, Operand, fail};
use crate::environment::Environment;
use crate::error::{Error, EvalResult, EvaluationErrorKind};
use crate::evaluated::Signal;

/// What a loop does after its body completed with `signal`.
enum Flow {
    Next,
    Exit,
    Propagate(Signal),
}

fn after_body(signal: Option<Signal>) -> Flow {
    match signal {
        None | Some(Signal::Continue) => Flow::Next,
        Some(Signal::Break) => Flow::Exit,
        Some(signal) => Flow::Propagate(signal),
    }
}

fn is_true(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Literal(Literal::Boolean(true)))
}

/// Whether `node` contains a `break` that exits the statement it belongs
/// to (nested loops and switches catch their own).
fn breaks(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Keyword(Keyword::Break) => true,
        NodeKind::Block(items) => items.iter().any(breaks),
        NodeKind::If {
            then, otherwise, ..
        } => breaks(then) || otherwise.as_deref().is_some_and(breaks),
        NodeKind::Try {
            body,
            catches,
            finally,
        } => breaks(body) || catches.iter().any(|c| breaks(&c.body)) || finally.as_deref().is_some_and(breaks),
        NodeKind::Synchronized { body, .. } => breaks(body),
        _ => false,
    }
}

/// Conservative reachability: whether execution can fall off the end of
/// `node`.
pub(super) fn completes_normally(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Return(_) | NodeKind::Throw(_) => false,
        NodeKind::Keyword(Keyword::Break | Keyword::Continue) => false,
        NodeKind::Block(items) => items.iter().all(completes_normally),
        NodeKind::If {
            then,
            otherwise: Some(otherwise),
            ..
        } => completes_normally(then) || completes_normally(otherwise),
        NodeKind::While { cond, body } => !is_true(cond) || breaks(body),
        NodeKind::DoWhile { body, cond } => breaks(body) || (!is_true(cond) && completes_normally(body)),
        NodeKind::For { cond, body, .. } => cond.as_deref().is_some_and(|c| !is_true(c)) || breaks(body),
        NodeKind::Switch { cases, .. } => {
            let has_default = cases.iter().any(|c| c.label.is_none());
            !has_default
                || cases.iter().any(|c| c.body.iter().any(breaks))
                || cases.last().is_none_or(|c| c.body.iter().all(completes_normally))
        }
        NodeKind::Try {
            body,
            catches,
            finally,
        } => {
            if finally.as_deref().is_some_and(|f| !completes_normally(f)) {
                return false;
            }
            completes_normally(body) || catches.iter().any(|c| completes_normally(&c.body))
        }
        NodeKind::Synchronized { body, .. } => completes_normally(body),
        _ => true,
    }
}

impl Interpreter<'_> {
    pub(super) fn exec(&self, env: &mut dyn Environment, frame: &Frame, node: &Node) -> EvalResult<Option<Signal>> {
        self.sink.node_evaluated(node.label());
        match &node.kind {
            NodeKind::NoOp => Ok(None),
            NodeKind::Block(items) => {
                let mut scope = env.scope(true);
                self.sequence(scope.as_mut(), frame, items)
            }
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                let taken = self.condition(env, frame, cond)?;
                if !frame.values {
                    let then_signal = self.exec(env.scope(true).as_mut(), frame, then)?;
                    if let Some(otherwise) = otherwise {
                        self.exec(env.scope(true).as_mut(), frame, otherwise)?;
                    }
                    return Ok(then_signal);
                }
                let branch = if taken == Some(true) { Some(then.as_ref()) } else { otherwise.as_deref() };
                match branch {
                    Some(branch) => self.exec(env.scope(true).as_mut(), frame, branch),
                    None => Ok(None),
                }
            }
            NodeKind::While { cond, body } => self.while_loop(env, frame, node, cond, body),
            NodeKind::DoWhile { body, cond } => self.do_loop(env, frame, node, body, cond),
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => self.for_loop(env, frame, node, init, cond.as_deref(), update, body),
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => self.for_each(env, frame, node, variable, iterable, body),
            NodeKind::Switch { value, cases } => self.switch(env, frame, node, value, cases),
            NodeKind::Synchronized { lock, body } => {
                let lock_value = self.operand(env, frame, lock)?;
                if lock_value.ty.is_primitive() {
                    return fail(EvaluationErrorKind::InvalidLock(lock_value.ty), lock);
                }
                let Some(value) = lock_value.value else {
                    return self.exec(env.scope(true).as_mut(), frame, body);
                };
                let Some(monitor) = value.monitor() else {
                    return if value.is_null() {
                        self.null_pointer(lock)
                    } else {
                        self.exec(env.scope(true).as_mut(), frame, body)
                    };
                };
                let _held = monitor.lock();
                self.exec(env.scope(true).as_mut(), frame, body)
            }
            NodeKind::Throw(value) => {
                let thrown = self.operand(env, frame, value)?;
                if !self.is_throwable(&thrown.ty) {
                    return fail(EvaluationErrorKind::NotThrowable(thrown.ty), value);
                }
                self.check_handled(env, frame, &thrown.ty, node)?;
                match thrown.value {
                    None => Ok(None),
                    Some(Value::Null) => self.null_pointer(value),
                    Some(value) => Err(self.thrown(Thrown(value), node)),
                }
            }
            NodeKind::Return(value) => self.return_statement(env, frame, node, value.as_deref()),
            NodeKind::Try {
                body,
                catches,
                finally,
            } => self.try_statement(env, frame, body, catches, finally.as_deref()),
            NodeKind::Keyword(keyword @ (Keyword::Break | Keyword::Continue)) => {
                let allowed = match keyword {
                    Keyword::Break => frame.loops > 0 || frame.switches > 0,
                    _ => frame.loops > 0,
                };
                if !allowed {
                    return fail(EvaluationErrorKind::MisplacedJump(*keyword), node);
                }
                Ok(Some(match keyword {
                    Keyword::Break => Signal::Break,
                    _ => Signal::Continue,
                }))
            }
            NodeKind::Declaration(declaration) => {
                let ty = self.resolve_type(env, &declaration.ty)?;
                env.declare_variable(&declaration.name, ty, declaration.is_final, node)?;
                Ok(None)
            }
            NodeKind::DeclarationList(items) => {
                for item in items {
                    self.exec(env, frame, item)?;
                }
                Ok(None)
            }
            NodeKind::Import(import) => {
                env.add_import(import, node)?;
                Ok(None)
            }
            NodeKind::Drop { name, params } => self.drop(env, node, name, params.as_deref()),
            NodeKind::Function(function) => {
                self.declare_function(env, node, function)?;
                Ok(None)
            }
            kind if kind.is_expression() => {
                self.operand(env, frame, node)?;
                Ok(None)
            }
            other => fail(EvaluationErrorKind::Misplaced(other.label()), node),
        }
    }

    /// Run statements in order. In type-only mode every statement is
    /// checked and the first signal is reported.
    fn sequence(&self, env: &mut dyn Environment, frame: &Frame, items: &[Node]) -> EvalResult<Option<Signal>> {
        let mut first = None;
        for item in items {
            if let Some(signal) = self.exec(env, frame, item)? {
                if frame.values {
                    return Ok(Some(signal));
                }
                first.get_or_insert(signal);
            }
        }
        Ok(first)
    }

    fn while_loop(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        cond: &Node,
        body: &Node,
    ) -> EvalResult<Option<Signal>> {
        let inner = frame.looping();
        loop {
            self.checkpoint(env, node)?;
            let go = self.condition(env, frame, cond)?;
            if frame.values && go != Some(true) {
                return Ok(None);
            }
            let signal = self.exec(env.scope(true).as_mut(), &inner, body)?;
            if !frame.values {
                return Ok(None);
            }
            match after_body(signal) {
                Flow::Next => {}
                Flow::Exit => return Ok(None),
                Flow::Propagate(signal) => return Ok(Some(signal)),
            }
        }
    }

    fn do_loop(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        body: &Node,
        cond: &Node,
    ) -> EvalResult<Option<Signal>> {
        let inner = frame.looping();
        loop {
            self.checkpoint(env, node)?;
            let signal = self.exec(env.scope(true).as_mut(), &inner, body)?;
            if frame.values {
                match after_body(signal) {
                    Flow::Next => {}
                    Flow::Exit => return Ok(None),
                    Flow::Propagate(signal) => return Ok(Some(signal)),
                }
            }
            let go = self.condition(env, frame, cond)?;
            if go != Some(true) {
                return Ok(None);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn for_loop(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        init: &[Node],
        cond: Option<&Node>,
        update: &[Node],
        body: &Node,
    ) -> EvalResult<Option<Signal>> {
        let mut scope = env.scope(true);
        for item in init {
            self.exec(scope.as_mut(), frame, item)?;
        }
        let inner = frame.looping();
        loop {
            self.checkpoint(scope.as_ref(), node)?;
            if let Some(cond) = cond {
                let go = self.condition(scope.as_mut(), frame, cond)?;
                if frame.values && go != Some(true) {
                    return Ok(None);
                }
            }
            let signal = self.exec(scope.scope(true).as_mut(), &inner, body)?;
            if frame.values {
                match after_body(signal) {
                    Flow::Next => {}
                    Flow::Exit => return Ok(None),
                    Flow::Propagate(signal) => return Ok(Some(signal)),
                }
            }
            for item in update {
                self.operand(scope.as_mut(), frame, item)?;
            }
            if !frame.values {
                return Ok(None);
            }
        }
    }

    /// Element type produced by iterating over a value of type `ty`.
    fn element_type(&self, ty: &Type) -> Option<Type> {
        if let Some(component) = ty.component() {
            return Some(component);
        }
        let iterable = relations::as_super(self.catalog, ty, types::ITERABLE)?;
        Some(match iterable.args().first() {
            None => Type::object(),
            Some(arg) if arg.is_wildcard() => relations::erase(arg),
            Some(arg) => arg.clone(),
        })
    }

    fn for_each(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        variable: &Node,
        iterable: &Node,
        body: &Node,
    ) -> EvalResult<Option<Signal>> {
        let NodeKind::Declaration(declaration) = &variable.kind else {
            return fail(EvaluationErrorKind::Misplaced(variable.label()), variable);
        };
        let mut scope = env.scope(true);
        let source = self.operand(scope.as_mut(), frame, iterable)?;
        let Some(element) = self.element_type(&source.ty) else {
            return fail(EvaluationErrorKind::NotIterable(source.ty), iterable);
        };
        let ty = self.resolve_type(scope.as_ref(), &declaration.ty)?;
        if !relations::is_assignable(self.catalog, &ty, &element) {
            return fail(EvaluationErrorKind::TypeMismatch { from: element, to: ty }, variable);
        }
        let inner = frame.looping();
        let Some(value) = source.value else {
            let mut each = scope.scope(true);
            each.declare_variable(&declaration.name, ty, declaration.is_final, variable)?;
            each.set_variable(&declaration.name, None, variable)?;
            self.exec(each.as_mut(), &inner, body)?;
            return Ok(None);
        };
        if value.is_null() {
            return self.null_pointer(iterable);
        }
        let items = self
            .catalog
            .iterate(&value)
            .map_err(|thrown| self.thrown(thrown, iterable))?;
        for item in items {
            self.checkpoint(scope.as_ref(), node)?;
            let item = self.coerce(item, &ty, variable)?;
            let mut each = scope.scope(true);
            each.declare_variable(&declaration.name, ty.clone(), declaration.is_final, variable)?;
            each.set_variable(&declaration.name, Some(item), variable)?;
            match after_body(self.exec(each.as_mut(), &inner, body)?) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Propagate(signal) => return Ok(Some(signal)),
            }
        }
        Ok(None)
    }

    fn switch(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        value: &Node,
        cases: &[SwitchCase],
    ) -> EvalResult<Option<Signal>> {
        let subject = self.operand(env, frame, value)?;
        let switchable = subject.ty.is_string()
            || matches!(
                subject.ty.unboxed(),
                Some(Primitive::Char | Primitive::Byte | Primitive::Short | Primitive::Int)
            );
        if !switchable {
            return fail(EvaluationErrorKind::InvalidSwitch(subject.ty), value);
        }
        let slot = match subject.ty.unboxed() {
            Some(p) => Type::primitive(p),
            None => subject.ty.clone(),
        };
        let mut labels = Vec::with_capacity(cases.len());
        for case in cases {
            labels.push(match &case.label {
                Some(label) => {
                    let label_value = self.value_for(env, frame, &slot, label)?;
                    Some(label_value)
                }
                None => None,
            });
        }

        let mut scope = env.scope(true);
        let inner = frame.switching();
        let Some(subject) = subject.value else {
            for case in cases {
                self.sequence(scope.as_mut(), &inner, &case.body)?;
            }
            return Ok(None);
        };
        if subject.is_null() {
            return self.null_pointer(value);
        }
        let subject = self.coerce(subject, &slot, value)?;
        let start = labels
            .iter()
            .position(|label| matches!(label, Some(Some(v)) if v.identical(&subject)))
            .or_else(|| labels.iter().position(Option::is_none));
        let Some(start) = start else {
            tracing::trace!(node = node.label(), "no switch case matched");
            return Ok(None);
        };
        for case in &cases[start..] {
            match self.sequence(scope.as_mut(), &inner, &case.body)? {
                None => {}
                Some(Signal::Break) => return Ok(None),
                Some(signal) => return Ok(Some(signal)),
            }
        }
        Ok(None)
    }

    fn return_statement(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        value: Option<&Node>,
    ) -> EvalResult<Option<Signal>> {
        let Some(ret) = &frame.returns else {
            let result = value
                .map(|v| self.operand(env, frame, v))
                .transpose()?
                .map(Operand::into_evaluated);
            return Ok(Some(Signal::Return(result)));
        };
        match value {
            Some(_) if ret.is_void() => fail(EvaluationErrorKind::VoidReturn, node),
            None if ret.is_void() => Ok(Some(Signal::Return(None))),
            None => fail(EvaluationErrorKind::MissingReturn(ret.clone()), node),
            Some(value) => {
                let result = self.value_for(env, frame, ret, value)?;
                Ok(Some(Signal::Return(Some(Operand::new(ret.clone(), result).into_evaluated()))))
            }
        }
    }

    fn catch_types(&self, env: &dyn Environment, clause: &CatchClause) -> EvalResult<Vec<Type>> {
        let mut types = Vec::with_capacity(clause.types.len());
        for written in &clause.types {
            let ty = self.resolve_type(env, written)?;
            if ty.is_null() || !self.is_throwable(&ty) {
                return fail(EvaluationErrorKind::NotThrowable(ty), &clause.body);
            }
            types.push(ty);
        }
        Ok(types)
    }

    fn try_statement(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        body: &Node,
        catches: &[CatchClause],
        finally: Option<&Node>,
    ) -> EvalResult<Option<Signal>> {
        let clauses = catches
            .iter()
            .map(|clause| self.catch_types(env, clause))
            .collect::<EvalResult<Vec<_>>>()?;
        let caught: Vec<Type> = clauses.iter().flatten().cloned().collect();
        let result = self.exec(env.scope(true).as_mut(), &frame.handling(&caught), body);

        let outcome = if !frame.values {
            let signal = result?;
            for (clause, types) in catches.iter().zip(&clauses) {
                self.catch_body(env, frame, clause, types, None)?;
            }
            Ok(signal)
        } else {
            match result {
                Err(Error::Execution(error)) => {
                    let handler = catches.iter().zip(&clauses).find(|(_, types)| {
                        types
                            .iter()
                            .any(|ty| relations::is_instance(self.catalog, ty, &error.ty))
                    });
                    match handler {
                        Some((clause, types)) => {
                            tracing::debug!(caught = %error.ty, "exception caught");
                            self.catch_body(env, frame, clause, types, Some(error.value))
                        }
                        None => Err(Error::Execution(error)),
                    }
                }
                other => other,
            }
        };

        if let Some(finally) = finally {
            if let Some(signal) = self.exec(env.scope(true).as_mut(), frame, finally)? {
                if frame.values {
                    return Ok(Some(signal));
                }
            }
        }
        outcome
    }

    fn catch_body(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        clause: &CatchClause,
        types: &[Type],
        value: Option<Value>,
    ) -> EvalResult<Option<Signal>> {
        let ty = types
            .iter()
            .cloned()
            .reduce(|a, b| relations::common_type(self.catalog, &a, &b))
            .unwrap_or_else(|| Type::class(types::THROWABLE));
        let mut scope = env.scope(true);
        scope.declare_variable(&clause.name, ty, types.len() > 1, &clause.body)?;
        scope.set_variable(&clause.name, value, &clause.body)?;
        self.exec(scope.as_mut(), frame, &clause.body)
    }

    fn drop(
        &self,
        env: &mut dyn Environment,
        node: &Node,
        name: &str,
        params: Option<&[TypeRef]>,
    ) -> EvalResult<Option<Signal>> {
        match params {
            None => {
                if !env.drop_variable(name) {
                    return fail(EvaluationErrorKind::UnresolvedVariable(name.to_string()), node);
                }
            }
            Some(params) => {
                if !env.drop_function(name, params) {
                    let params = params.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                    return fail(EvaluationErrorKind::UnknownFunction(format!("{name}({params})")), node);
                }
            }
        }
        tracing::debug!(name, "dropped");
        Ok(None)
    }

    /// Check a function declaration's body and make it callable.
    fn declare_function(
        &self,
        env: &mut dyn Environment,
        node: &Node,
        function: &std::rc::Rc<FunctionDecl>,
    ) -> EvalResult<()> {
        if env.declared_functions().iter().any(|f| f.same_signature(function)) {
            return fail(EvaluationErrorKind::DuplicateFunction(function.signature()), node);
        }
        let params = function
            .params
            .iter()
            .map(|p| self.resolve_type(env, &p.ty))
            .collect::<EvalResult<Vec<_>>>()?;
        let ret = self.resolve_type(env, &function.ret)?;
        let mut throws = Vec::with_capacity(function.throws.len());
        for written in &function.throws {
            let ty = self.resolve_type(env, written)?;
            if !self.is_throwable(&ty) {
                return fail(EvaluationErrorKind::NotThrowable(ty), node);
            }
            throws.push(ty);
        }

        let mut scope = env.scope(false);
        scope.declare_function(std::rc::Rc::clone(function));
        for (param, ty) in function.params.iter().zip(params) {
            scope.declare_variable(&param.name, ty, param.is_final, node)?;
            scope.set_variable(&param.name, None, node)?;
        }
        let frame = Frame::body(false, ret.clone(), throws, None);
        self.exec(scope.as_mut(), &frame, &function.body)?;
        if !ret.is_void() && completes_normally(&function.body) {
            return fail(EvaluationErrorKind::MissingReturn(ret), &function.body);
        }

        tracing::debug!(function = %function.signature(), "function declared");
        env.declare_function(std::rc::Rc::clone(function));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kava_core::Span;

    use super::*;

    fn node(kind: NodeKind) -> Node {
        Node::new(kind, Span::default())
    }

    fn boxed(kind: NodeKind) -> Box<Node> {
        Box::new(node(kind))
    }

    fn ret() -> NodeKind {
        NodeKind::Return(Some(boxed(NodeKind::Literal(Literal::Int(1)))))
    }

    #[test]
    fn if_without_else_falls_through() {
        let cond = boxed(NodeKind::Identifier("c".into()));
        let stmt = node(NodeKind::If {
            cond,
            then: boxed(ret()),
            otherwise: None,
        });
        assert!(completes_normally(&stmt));
    }

    #[test]
    fn infinite_loop_without_break_never_completes() {
        let forever = node(NodeKind::While {
            cond: boxed(NodeKind::Literal(Literal::Boolean(true))),
            body: boxed(NodeKind::Block(vec![])),
        });
        assert!(!completes_normally(&forever));

        let escapes = node(NodeKind::While {
            cond: boxed(NodeKind::Literal(Literal::Boolean(true))),
            body: boxed(NodeKind::Block(vec![node(NodeKind::Keyword(Keyword::Break))])),
        });
        assert!(completes_normally(&escapes));
    }

    #[test]
    fn nested_loop_break_stays_inside() {
        let inner = node(NodeKind::While {
            cond: boxed(NodeKind::Identifier("c".into())),
            body: boxed(NodeKind::Keyword(Keyword::Break)),
        });
        assert!(!breaks(&inner));
    }

    #[test]
    fn try_with_returning_finally_does_not_complete() {
        let stmt = node(NodeKind::Try {
            body: boxed(NodeKind::Block(vec![])),
            catches: vec![],
            finally: Some(boxed(ret())),
        });
        assert!(!completes_normally(&stmt));
    }
}
