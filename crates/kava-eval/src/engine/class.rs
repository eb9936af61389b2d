//! Anonymous classes: `new Base(args) { members }`.
//!
//! An anonymous class extends a host class or implements a host interface.
//! Its instances are ordinary host objects typed as the base, carrying the
//! [`ScriptClass`] as opaque native state; calls dispatch to script methods
//! through [`ScriptClass::overriding`].

use std::collections::HashSet;
use std::rc::Rc;

use kava_ast::{AssignOp, FunctionDecl, Node, NodeKind, TypeRef};
use kava_core::{Method, Native, Object, Type, Value, relations};

use super::call::erased_params;
use super::statement::completes_normally;
use super::{Frame, Interpreter, Operand, fail};
use crate::environment::Environment;
use crate::error::{EvalResult, EvaluationErrorKind};
use crate::resolve;

pub(crate) struct ScriptField {
    pub name: String,
    pub ty: Type,
    pub is_final: bool,
    pub init: Option<Node>,
}

pub(crate) struct ScriptMethod {
    pub decl: Rc<FunctionDecl>,
    pub params: Vec<Type>,
    pub ret: Type,
    pub throws: Vec<Type>,
    /// Host methods this method implements or overrides.
    pub overrides: Vec<Rc<Method>>,
}

pub(crate) struct ScriptClass {
    pub base: Type,
    pub fields: Vec<ScriptField>,
    pub methods: Vec<ScriptMethod>,
    /// The scope the class body was declared in.
    pub env: Box<dyn Environment>,
}

impl ScriptClass {
    /// The script method replacing host method `method`, if any.
    pub fn overriding(&self, method: &Method) -> Option<usize> {
        let erased = erased_params(method);
        self.methods.iter().position(|m| {
            m.decl.name == method.name
                && m.overrides
                    .iter()
                    .any(|o| o.name == method.name && erased_params(o) == erased)
        })
    }
}

impl Interpreter<'_> {
    pub(super) fn anonymous(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        class: &TypeRef,
        args: &[Node],
        members: &[Node],
    ) -> EvalResult<Operand> {
        let base = self.resolve_type(env, class)?;
        let Some(info) = base.class_name().and_then(|name| self.catalog.class(name)) else {
            return fail(EvaluationErrorKind::UnresolvedType(class.to_string()), node);
        };
        let operands = args
            .iter()
            .map(|arg| self.operand(env, frame, arg))
            .collect::<EvalResult<Vec<_>>>()?;
        let ctor = if info.is_interface {
            if !operands.is_empty() {
                let args: Vec<Type> = operands.iter().map(|o| o.ty.clone()).collect();
                return fail(
                    EvaluationErrorKind::UndefinedConstructor {
                        ty: base,
                        args: super::type_list(&args),
                    },
                    node,
                );
            }
            None
        } else {
            let resolved = self.pick_constructor(env, &base, &operands, node)?;
            for thrown in resolved.member.throws() {
                self.check_handled(env, frame, &thrown, node)?;
            }
            Some(resolved)
        };

        let class_env = if frame.values { env.scope(true) } else { env.snapshot() };
        let class = Rc::new(self.declare_class(class_env, &base, members)?);
        self.check_implemented(&class, node)?;
        tracing::debug!(base = %base, methods = class.methods.len(), "anonymous class declared");

        let object = Object::with_native(base.clone(), Native::Opaque(class.clone()));
        if !frame.values {
            self.check_class(&class, &object, frame, node)?;
            return Ok(Operand::typed(base));
        }

        if let Some(resolved) = ctor {
            let method = &resolved.member.method;
            if method.native.is_some() {
                let values = self.pack(&resolved.signature, resolved.phase, &operands, node)?;
                let instance = self
                    .catalog
                    .invoke(method, None, &values)
                    .map_err(|thrown| self.thrown(thrown, node))?;
                if let Value::Object(instance) = instance {
                    if !matches!(&*instance.native(), Native::None) {
                        return fail(EvaluationErrorKind::UnsupportedBase(base), node);
                    }
                    for (name, value) in instance.fields() {
                        object.set_field(name, value);
                    }
                }
            }
        }
        self.initialize(&class, &object, frame, node)?;
        Ok(Operand::new(base, Some(Value::Object(object))))
    }

    fn declare_class(&self, env: Box<dyn Environment>, base: &Type, members: &[Node]) -> EvalResult<ScriptClass> {
        let mut class = ScriptClass {
            base: base.clone(),
            fields: Vec::new(),
            methods: Vec::new(),
            env,
        };
        let mut names = HashSet::new();
        for member in members {
            self.declare_member(&mut class, &mut names, member)?;
        }
        Ok(class)
    }

    fn declare_member(&self, class: &mut ScriptClass, names: &mut HashSet<String>, member: &Node) -> EvalResult<()> {
        match &member.kind {
            NodeKind::NoOp => Ok(()),
            NodeKind::DeclarationList(items) => items
                .iter()
                .try_for_each(|item| self.declare_member(class, names, item)),
            NodeKind::Declaration(declaration) => self.declare_field(class, names, member, declaration, None),
            NodeKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => match &target.kind {
                NodeKind::Declaration(declaration) => {
                    self.declare_field(class, names, target, declaration, Some(value.as_ref().clone()))
                }
                _ => fail(EvaluationErrorKind::Misplaced(member.label()), member),
            },
            NodeKind::Function(decl) => {
                if class.methods.iter().any(|m| m.decl.same_signature(decl)) {
                    return fail(EvaluationErrorKind::DuplicateFunction(decl.signature()), member);
                }
                let method = self.declare_method(class.env.as_ref(), &class.base, decl, member)?;
                class.methods.push(method);
                Ok(())
            }
            _ => fail(EvaluationErrorKind::Misplaced(member.label()), member),
        }
    }

    fn declare_field(
        &self,
        class: &mut ScriptClass,
        names: &mut HashSet<String>,
        node: &Node,
        declaration: &kava_ast::Declaration,
        init: Option<Node>,
    ) -> EvalResult<()> {
        if !names.insert(declaration.name.clone()) {
            return fail(EvaluationErrorKind::DuplicateVariable(declaration.name.clone()), node);
        }
        let ty = self.resolve_type(class.env.as_ref(), &declaration.ty)?;
        class.fields.push(ScriptField {
            name: declaration.name.clone(),
            ty,
            is_final: declaration.is_final,
            init,
        });
        Ok(())
    }

    fn declare_method(
        &self,
        env: &dyn Environment,
        base: &Type,
        decl: &Rc<FunctionDecl>,
        node: &Node,
    ) -> EvalResult<ScriptMethod> {
        let params = decl
            .params
            .iter()
            .map(|p| self.resolve_type(env, &p.ty))
            .collect::<EvalResult<Vec<_>>>()?;
        let ret = self.resolve_type(env, &decl.ret)?;
        let throws = decl
            .throws
            .iter()
            .map(|t| self.resolve_type(env, t))
            .collect::<EvalResult<Vec<_>>>()?;
        if let Some(bad) = throws.iter().find(|t| !self.is_throwable(t)) {
            return fail(EvaluationErrorKind::NotThrowable(bad.clone()), node);
        }
        let erased: Vec<Type> = params.iter().map(relations::erase).collect();
        let overrides = resolve::methods_named(self.catalog, base, &decl.name)
            .into_iter()
            .filter(|m| !m.method.is_static)
            .filter(|m| {
                let (seen, _) = m.instantiate(self.catalog, &[], &[]);
                let seen: Vec<Type> = seen.params.iter().map(relations::erase).collect();
                seen == erased || erased_params(&m.method) == erased
            })
            .map(|m| m.method)
            .collect();
        Ok(ScriptMethod {
            decl: Rc::clone(decl),
            params,
            ret,
            throws,
            overrides,
        })
    }

    /// Every abstract method of the base must have a script implementation.
    fn check_implemented(&self, class: &ScriptClass, node: &Node) -> EvalResult<()> {
        let mut names: Vec<String> = Vec::new();
        for sup in relations::superclass_chain(self.catalog, &class.base) {
            let Some(info) = sup.class_name().and_then(|n| self.catalog.class(n)) else {
                continue;
            };
            for method in info.methods.iter().filter(|m| m.is_abstract && !m.is_static) {
                if !names.contains(&method.name) {
                    names.push(method.name.clone());
                }
            }
        }
        for name in names {
            for member in resolve::methods_named(self.catalog, &class.base, &name) {
                if member.method.is_abstract && class.overriding(&member.method).is_none() {
                    return fail(
                        EvaluationErrorKind::MissingImplementation {
                            ty: class.base.clone(),
                            method: member.method.signature(),
                        },
                        node,
                    );
                }
            }
        }
        Ok(())
    }

    /// Type-check field initializers and method bodies.
    fn check_class(&self, class: &Rc<ScriptClass>, this: &Rc<Object>, frame: &Frame, node: &Node) -> EvalResult<()> {
        self.initialize(class, this, frame, node)?;
        for method in &class.methods {
            let mut scope = class.env.snapshot();
            for (param, ty) in method.decl.params.iter().zip(&method.params) {
                scope.declare_variable(&param.name, ty.clone(), param.is_final, &method.decl.body)?;
                scope.set_variable(&param.name, None, &method.decl.body)?;
            }
            let body = Frame::body(false, method.ret.clone(), method.throws.clone(), Some(Rc::clone(this)));
            self.exec(scope.as_mut(), &body, &method.decl.body)?;
            if !method.ret.is_void() && completes_normally(&method.decl.body) {
                return fail(EvaluationErrorKind::MissingReturn(method.ret.clone()), &method.decl.body);
            }
        }
        Ok(())
    }

    /// Set field defaults, then run initializers in declaration order.
    fn initialize(&self, class: &ScriptClass, this: &Rc<Object>, frame: &Frame, node: &Node) -> EvalResult<()> {
        for field in &class.fields {
            this.set_field(field.name.clone(), Value::default_for(&field.ty));
        }
        let init_frame = Frame {
            this: Some(Rc::clone(this)),
            returns: None,
            loops: 0,
            switches: 0,
            ..frame.clone()
        };
        let mut env = if frame.values { class.env.scope(true) } else { class.env.snapshot() };
        for field in &class.fields {
            let Some(init) = &field.init else {
                continue;
            };
            let value = self.value_for(env.as_mut(), &init_frame, &field.ty, init)?;
            if let Some(value) = value {
                this.set_field(field.name.clone(), value);
            }
        }
        tracing::trace!(fields = class.fields.len(), node = node.label(), "anonymous instance initialized");
        Ok(())
    }

    /// `toString()` declared by the anonymous class of `object`.
    pub(super) fn script_to_string(&self, object: &Rc<Object>) -> EvalResult<Option<String>> {
        let Some(class) = object.opaque::<ScriptClass>() else {
            return Ok(None);
        };
        let Some(index) = class
            .methods
            .iter()
            .position(|m| m.decl.name == "toString" && m.params.is_empty())
        else {
            return Ok(None);
        };
        let body = &class.methods[index].decl.body;
        let result = self.call_script_method(object, &class, index, Vec::new(), body)?;
        Ok(Some(match result.value {
            Some(value) => self.catalog.display(&value),
            None => "null".to_string(),
        }))
    }
}
