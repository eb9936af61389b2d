//! Method calls, constructor calls and script functions.

use std::collections::HashMap;
use std::rc::Rc;

use kava_ast::{FunctionDecl, Keyword, Node, NodeKind, TypeRef};
use kava_core::{Array, Method, Object, Type, Value, relations, types};

use super::{Frame, Interpreter, Operand, ScriptClass, fail, type_list};
use crate::environment::Environment;
use crate::error::{EvalResult, EvaluationErrorKind};
use crate::evaluated::{Evaluated, Signal};
use crate::resolve::{self, Member, Phase, Selection, Signature};

/// A host method or constructor chosen for a call.
#[derive(Clone)]
pub(super) struct Resolved {
    pub member: Member,
    pub bindings: HashMap<String, Type>,
    pub signature: Signature,
    pub phase: Phase,
}

enum Lookup<T> {
    Found(T),
    Ambiguous,
    /// Applicable candidates exist but none is accessible.
    Invisible,
    NotApplicable,
}

/// A method's parameter types with type arguments dropped.
pub(super) fn erased_params(method: &Method) -> Vec<Type> {
    method.params.iter().map(relations::erase).collect()
}

impl Interpreter<'_> {
    fn arguments(&self, env: &mut dyn Environment, frame: &Frame, args: &[Node]) -> EvalResult<Vec<Operand>> {
        args.iter().map(|arg| self.operand(env, frame, arg)).collect()
    }

    fn pick_host(
        &self,
        env: &dyn Environment,
        members: Vec<Member>,
        args: &[Type],
        explicit: &[Type],
    ) -> Lookup<Resolved> {
        let entries = |visible_only: bool| -> Vec<((Member, HashMap<String, Type>), Signature)> {
            members
                .iter()
                .filter(|m| !visible_only || self.visible(env, m.method.visibility))
                .map(|m| {
                    let (signature, bindings) = m.instantiate(self.catalog, args, explicit);
                    ((m.clone(), bindings), signature)
                })
                .collect()
        };
        match resolve::select(self.catalog, &entries(true), args) {
            Selection::Found {
                member: (member, bindings),
                signature,
                phase,
            } => Lookup::Found(Resolved {
                member,
                bindings,
                signature,
                phase,
            }),
            Selection::Ambiguous => Lookup::Ambiguous,
            Selection::NotApplicable => match resolve::select(self.catalog, &entries(false), args) {
                Selection::NotApplicable => Lookup::NotApplicable,
                _ => Lookup::Invisible,
            },
        }
    }

    fn explicit_types(&self, env: &dyn Environment, type_args: &[TypeRef]) -> EvalResult<Vec<Type>> {
        type_args.iter().map(|t| self.resolve_type(env, t)).collect()
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn method_call(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        target: Option<&Node>,
        type_args: &[TypeRef],
        name: &str,
        args: &[Node],
    ) -> EvalResult<Operand> {
        let explicit = self.explicit_types(env, type_args)?;
        let Some(target) = target else {
            let operands = self.arguments(env, frame, args)?;
            return self.unqualified_call(env, frame, node, name, &explicit, operands);
        };

        let receiver = match self.eval(env, frame, target)? {
            Evaluated::Static(ty) => {
                let operands = self.arguments(env, frame, args)?;
                return self.static_call(env, frame, node, &ty, name, &explicit, operands);
            }
            Evaluated::Package(unknown) | Evaluated::Name(unknown) => {
                return fail(EvaluationErrorKind::Unresolved(unknown), target);
            }
            Evaluated::Typed(ty) => Operand::typed(ty),
            Evaluated::Value(ty, value) => Operand::new(ty, Some(value)),
        };
        let operands = self.arguments(env, frame, args)?;
        if let Some(p) = receiver.ty.as_primitive() {
            return fail(
                EvaluationErrorKind::PrimitiveReceiver {
                    name: name.to_string(),
                    ty: Type::primitive(p),
                },
                node,
            );
        }
        if matches!(target.kind, NodeKind::Keyword(Keyword::This)) {
            if let Some(result) = self.script_method_call(env, frame, node, name, &operands)? {
                return Ok(result);
            }
        }
        let arg_types: Vec<Type> = operands.iter().map(|o| o.ty.clone()).collect();
        let members = resolve::methods_named(self.catalog, &receiver.ty, name);
        if members.is_empty() {
            return fail(
                EvaluationErrorKind::UnrecognizedMethod {
                    name: name.to_string(),
                    ty: receiver.ty,
                },
                node,
            );
        }
        let resolved = match self.pick_host(env, members, &arg_types, &explicit) {
            Lookup::Found(resolved) => resolved,
            miss => return self.missed(miss, name, &arg_types, &receiver.ty, node),
        };
        self.invoke_host(env, frame, node, Some(receiver), resolved, operands)
    }

    fn missed<T, U>(&self, miss: Lookup<U>, name: &str, args: &[Type], ty: &Type, node: &Node) -> EvalResult<T> {
        let kind = match miss {
            Lookup::Ambiguous => EvaluationErrorKind::AmbiguousMethod {
                name: name.to_string(),
                args: type_list(args),
            },
            Lookup::Invisible => EvaluationErrorKind::InvisibleMethod(format!("{name}({})", type_list(args))),
            Lookup::NotApplicable | Lookup::Found(_) => EvaluationErrorKind::UndefinedForArguments {
                name: name.to_string(),
                args: type_list(args),
                ty: ty.clone(),
            },
        };
        fail(kind, node)
    }

    #[allow(clippy::too_many_arguments)]
    fn static_call(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        ty: &Type,
        name: &str,
        explicit: &[Type],
        operands: Vec<Operand>,
    ) -> EvalResult<Operand> {
        let arg_types: Vec<Type> = operands.iter().map(|o| o.ty.clone()).collect();
        let members = resolve::methods_named(self.catalog, ty, name);
        if members.is_empty() {
            return fail(
                EvaluationErrorKind::UnrecognizedMethod {
                    name: name.to_string(),
                    ty: ty.clone(),
                },
                node,
            );
        }
        let resolved = match self.pick_host(env, members, &arg_types, explicit) {
            Lookup::Found(resolved) => resolved,
            miss => return self.missed(miss, name, &arg_types, ty, node),
        };
        if !resolved.member.method.is_static {
            return fail(
                EvaluationErrorKind::NonStaticMethod(resolved.member.method.signature()),
                node,
            );
        }
        self.invoke_host(env, frame, node, None, resolved, operands)
    }

    /// A call without a receiver: a method of the enclosing anonymous
    /// class, a script function, an inherited method of `this`, or a
    /// statically imported method, in that order.
    fn unqualified_call(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        name: &str,
        explicit: &[Type],
        operands: Vec<Operand>,
    ) -> EvalResult<Operand> {
        if let Some(result) = self.script_method_call(env, frame, node, name, &operands)? {
            return Ok(result);
        }
        let arg_types: Vec<Type> = operands.iter().map(|o| o.ty.clone()).collect();

        let mut candidates = Vec::new();
        for function in env.declared_functions().into_iter().filter(|f| f.name == name) {
            let signature = self.function_signature(env, &function)?;
            candidates.push((function, signature));
        }
        match resolve::select(self.catalog, &candidates, &arg_types) {
            Selection::Found {
                member,
                signature,
                phase,
            } => return self.call_function(env, frame, node, &member, &signature, phase, operands),
            Selection::Ambiguous => {
                return fail(
                    EvaluationErrorKind::AmbiguousMethod {
                        name: name.to_string(),
                        args: type_list(&arg_types),
                    },
                    node,
                );
            }
            Selection::NotApplicable => {}
        }

        if let Some(this) = &frame.this {
            let members = resolve::methods_named(self.catalog, this.class(), name);
            match self.pick_host(env, members, &arg_types, explicit) {
                Lookup::Found(resolved) => {
                    let receiver = (!resolved.member.method.is_static)
                        .then(|| Operand::new(this.class().clone(), Some(Value::Object(Rc::clone(this)))));
                    return self.invoke_host(env, frame, node, receiver, resolved, operands);
                }
                Lookup::NotApplicable => {}
                miss => return self.missed(miss, name, &arg_types, this.class(), node),
            }
        }

        if let Some(owner) = env.import_method_type(name) {
            let members: Vec<Member> = resolve::methods_named(self.catalog, &owner, name)
                .into_iter()
                .filter(|m| m.method.is_static)
                .collect();
            match self.pick_host(env, members, &arg_types, explicit) {
                Lookup::Found(resolved) => return self.invoke_host(env, frame, node, None, resolved, operands),
                Lookup::NotApplicable => {}
                miss => return self.missed(miss, name, &arg_types, &owner, node),
            }
        }

        fail(
            EvaluationErrorKind::UndefinedFunction {
                name: name.to_string(),
                args: type_list(&arg_types),
            },
            node,
        )
    }

    /// Call a method declared by the anonymous class of `this`, if one
    /// applies.
    fn script_method_call(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        name: &str,
        operands: &[Operand],
    ) -> EvalResult<Option<Operand>> {
        let Some((this, class)) = frame.script_this() else {
            return Ok(None);
        };
        let candidates: Vec<(usize, Signature)> = class
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.decl.name == name)
            .map(|(i, m)| (i, Signature::new(m.params.clone(), m.decl.is_varargs())))
            .collect();
        let arg_types: Vec<Type> = operands.iter().map(|o| o.ty.clone()).collect();
        match resolve::select(self.catalog, &candidates, &arg_types) {
            Selection::Found {
                member,
                signature,
                phase,
            } => {
                let method = &class.methods[member];
                for ty in &method.throws {
                    self.check_handled(env, frame, ty, node)?;
                }
                if !frame.values {
                    return Ok(Some(Operand::typed(method.ret.clone())));
                }
                let values = self.pack(&signature, phase, operands, node)?;
                self.call_script_method(&this, &class, member, values, node).map(Some)
            }
            Selection::Ambiguous => fail(
                EvaluationErrorKind::AmbiguousMethod {
                    name: name.to_string(),
                    args: type_list(&arg_types),
                },
                node,
            ),
            Selection::NotApplicable => Ok(None),
        }
    }

    /// Invoke a resolved host method, dispatching on the receiver's
    /// runtime type.
    fn invoke_host(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        receiver: Option<Operand>,
        resolved: Resolved,
        operands: Vec<Operand>,
    ) -> EvalResult<Operand> {
        let method = &resolved.member.method;
        let signature = method.signature();
        self.sink.member_resolved(&method.declaring, &signature);
        tracing::debug!(owner = %method.declaring, method = %signature, phase = ?resolved.phase, "member resolved");

        for ty in resolved.member.throws() {
            self.check_handled(env, frame, &ty, node)?;
        }
        let ret = resolved.member.return_type(&resolved.bindings);
        if !frame.values {
            return Ok(Operand::typed(ret));
        }
        let values = self.pack(&resolved.signature, resolved.phase, &operands, node)?;
        let receiver = match receiver.filter(|_| !method.is_static) {
            Some(operand) => match operand.value {
                Some(Value::Null) | None => return self.null_pointer(node),
                Some(value) => Some(value),
            },
            None => None,
        };

        if let Some(Value::Object(object)) = &receiver {
            if let Some(class) = object.opaque::<ScriptClass>() {
                if let Some(index) = class.overriding(method) {
                    let result = self.call_script_method(object, &class, index, values, node)?;
                    return Ok(Operand::new(ret, result.value));
                }
            }
        }

        let target = match &receiver {
            Some(value) => self.dispatch(value, method),
            None => Rc::clone(method),
        };
        let value = self
            .catalog
            .invoke(&target, receiver.as_ref(), &values)
            .map_err(|thrown| self.thrown(thrown, node))?;
        Ok(Operand::new(ret, Some(value)))
    }

    /// The most derived implementation of `method` for a receiver value.
    fn dispatch(&self, receiver: &Value, method: &Rc<Method>) -> Rc<Method> {
        let erased = erased_params(method);
        let runtime = self.catalog.runtime_type(receiver);
        resolve::methods_named(self.catalog, &runtime, &method.name)
            .into_iter()
            .map(|m| m.method)
            .find(|m| m.native.is_some() && erased_params(m) == erased)
            .unwrap_or_else(|| Rc::clone(method))
    }

    /// Argument values for a call, with trailing arguments collected into
    /// an array in the variable-arity phase.
    pub(super) fn pack(
        &self,
        signature: &Signature,
        phase: Phase,
        operands: &[Operand],
        node: &Node,
    ) -> EvalResult<Vec<Value>> {
        let fixed = match phase {
            Phase::Varargs => signature.params.len().saturating_sub(1),
            _ => signature.params.len(),
        };
        let (head, tail) = operands.split_at(fixed.min(operands.len()));
        let mut values = Vec::with_capacity(signature.params.len());
        for (operand, ty) in head.iter().zip(&signature.params) {
            values.push(self.coerce(operand.get(), ty, node)?);
        }
        if phase != Phase::Varargs {
            return Ok(values);
        }
        let declared = signature.element().unwrap_or_else(Type::object);
        let element = if declared.is_primitive() {
            declared
        } else {
            tail.iter()
                .map(|o| o.ty.boxed())
                .reduce(|a, b| relations::common_type(self.catalog, &a, &b))
                .filter(|t| !t.is_null() && relations::is_assignable_strict(self.catalog, &declared, t))
                .unwrap_or(declared)
        };
        let items = tail
            .iter()
            .map(|o| self.coerce(o.get(), &element, node))
            .collect::<EvalResult<Vec<_>>>()?;
        values.push(Value::Array(Array::new(element, items)));
        Ok(values)
    }

    pub(super) fn construct(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        class: &TypeRef,
        args: &[Node],
    ) -> EvalResult<Operand> {
        let ty = self.resolve_type(env, class)?;
        let Some(info) = ty.class_name().and_then(|name| self.catalog.class(name)) else {
            return fail(EvaluationErrorKind::UnresolvedType(class.to_string()), node);
        };
        if info.is_abstract || info.is_interface {
            return fail(EvaluationErrorKind::AbstractInstantiation(ty), node);
        }
        let operands = self.arguments(env, frame, args)?;
        let resolved = self.pick_constructor(env, &ty, &operands, node)?;
        for thrown in resolved.member.throws() {
            self.check_handled(env, frame, &thrown, node)?;
        }
        if !frame.values {
            return Ok(Operand::typed(ty));
        }
        let values = self.pack(&resolved.signature, resolved.phase, &operands, node)?;
        let value = self
            .catalog
            .construct(&info, &resolved.member.method, &values)
            .map_err(|thrown| self.thrown(thrown, node))?;
        tracing::debug!(class = %info.name, "constructed");
        Ok(Operand::new(ty, Some(value)))
    }

    pub(super) fn pick_constructor(
        &self,
        env: &dyn Environment,
        ty: &Type,
        operands: &[Operand],
        node: &Node,
    ) -> EvalResult<Resolved> {
        let arg_types: Vec<Type> = operands.iter().map(|o| o.ty.clone()).collect();
        let members = resolve::constructors(self.catalog, ty);
        match self.pick_host(env, members, &arg_types, &[]) {
            Lookup::Found(resolved) => {
                let signature = resolved.member.method.signature();
                self.sink.member_resolved(&resolved.member.method.declaring, &signature);
                tracing::debug!(owner = %resolved.member.method.declaring, method = %signature, "constructor resolved");
                Ok(resolved)
            }
            Lookup::Ambiguous => fail(
                EvaluationErrorKind::AmbiguousMethod {
                    name: types::simple_name(ty.class_name().unwrap_or_default()).to_string(),
                    args: type_list(&arg_types),
                },
                node,
            ),
            Lookup::Invisible => fail(
                EvaluationErrorKind::InvisibleMethod(format!("{ty}({})", type_list(&arg_types))),
                node,
            ),
            Lookup::NotApplicable => fail(
                EvaluationErrorKind::UndefinedConstructor {
                    ty: ty.clone(),
                    args: type_list(&arg_types),
                },
                node,
            ),
        }
    }

    fn function_signature(&self, env: &dyn Environment, function: &FunctionDecl) -> EvalResult<Signature> {
        let params = function
            .params
            .iter()
            .map(|p| self.resolve_type(env, &p.ty))
            .collect::<EvalResult<Vec<_>>>()?;
        Ok(Signature::new(params, function.is_varargs()))
    }

    #[allow(clippy::too_many_arguments)]
    fn call_function(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        function: &Rc<FunctionDecl>,
        signature: &Signature,
        phase: Phase,
        operands: Vec<Operand>,
    ) -> EvalResult<Operand> {
        let ret = self.resolve_type(env, &function.ret)?;
        let throws = function
            .throws
            .iter()
            .map(|t| self.resolve_type(env, t))
            .collect::<EvalResult<Vec<_>>>()?;
        for ty in &throws {
            self.check_handled(env, frame, ty, node)?;
        }
        self.sink.member_resolved("", &function.signature());
        tracing::debug!(function = %function.signature(), "calling script function");
        if !frame.values {
            return Ok(Operand::typed(ret));
        }
        let values = self.pack(signature, phase, &operands, node)?;
        let _guard = self.enter(node)?;
        let mut scope = env.scope(false);
        for ((param, ty), value) in function.params.iter().zip(&signature.params).zip(values) {
            scope.declare_variable(&param.name, ty.clone(), param.is_final, node)?;
            scope.set_variable(&param.name, Some(value), node)?;
        }
        let body = Frame::body(true, ret.clone(), throws, None);
        self.run_body(scope.as_mut(), &body, &function.body, &ret, node)
    }

    /// Execute a function or method body and produce its result.
    pub(super) fn run_body(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        body: &Node,
        ret: &Type,
        call: &Node,
    ) -> EvalResult<Operand> {
        match self.exec(env, frame, body)? {
            Some(Signal::Return(Some(Evaluated::Value(_, value)))) => Ok(Operand::new(ret.clone(), Some(value))),
            _ if ret.is_void() => Ok(Operand::new(ret.clone(), Some(Value::Null))),
            _ => fail(EvaluationErrorKind::MissingReturn(ret.clone()), call),
        }
    }

    /// Run method `index` of an anonymous class on `this`.
    pub(super) fn call_script_method(
        &self,
        this: &Rc<Object>,
        class: &Rc<ScriptClass>,
        index: usize,
        values: Vec<Value>,
        node: &Node,
    ) -> EvalResult<Operand> {
        let method = &class.methods[index];
        tracing::debug!(method = %method.decl.signature(), "calling anonymous class method");
        let _guard = self.enter(node)?;
        let mut scope = class.env.scope(true);
        for ((param, ty), value) in method.decl.params.iter().zip(&method.params).zip(values) {
            scope.declare_variable(&param.name, ty.clone(), param.is_final, node)?;
            scope.set_variable(&param.name, Some(value), node)?;
        }
        let body = Frame::body(true, method.ret.clone(), method.throws.clone(), Some(Rc::clone(this)));
        self.run_body(scope.as_mut(), &body, &method.decl.body, &method.ret, node)
    }
}
