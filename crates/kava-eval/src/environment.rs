//! The environment an evaluation runs against.
//!
//! [`Environment`] is the contract the engine consumes: variable storage,
//! the import table, declared functions and the host's policy switches.
//! [`Scope`] is the default implementation used by sessions and tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kava_ast::{FunctionDecl, Import, Node, TypeRef};
use kava_core::{MemberCatalog, Type, Value, relations, types};

use crate::error::{EvalResult, EvaluationError, EvaluationErrorKind};

/// A bound variable.
#[derive(Clone, Debug)]
pub struct Variable {
    pub ty: Type,
    /// `None` until the first assignment, and always in type-only scopes.
    pub value: Option<Value>,
    pub is_final: bool,
    /// Whether any assignment (typed or valued) has been seen.
    pub assigned: bool,
}

pub trait Environment {
    /// A child scope for a block, loop or call. With `copy_vars` the child
    /// sees (and writes through to) the parent's variables; declarations in
    /// the child never reach the parent.
    fn scope(&self, copy_vars: bool) -> Box<dyn Environment>;

    /// A detached copy for type checking: the same bindings, imports and
    /// functions, but no write made through it reaches this scope.
    fn snapshot(&self) -> Box<dyn Environment>;

    fn declare_variable(
        &mut self,
        name: &str,
        ty: Type,
        is_final: bool,
        origin: &Node,
    ) -> EvalResult<()>;

    /// Assign a bound variable. `None` records a type-only assignment, which
    /// still counts against a `final` variable.
    fn set_variable(&mut self, name: &str, value: Option<Value>, origin: &Node) -> EvalResult<()>;

    fn variable(&self, name: &str) -> Option<Variable>;

    /// Unbind `name`; returns whether it was bound.
    fn drop_variable(&mut self, name: &str) -> bool;

    /// The class a simple type name refers to through the import table.
    fn import_type(&self, simple: &str) -> Option<Type>;

    /// The class owning a statically imported method or field `name`.
    fn import_method_type(&self, name: &str) -> Option<Type>;

    fn add_import(&mut self, import: &Import, origin: &Node) -> EvalResult<()>;

    fn declared_functions(&self) -> Vec<Rc<FunctionDecl>>;

    fn declare_function(&mut self, function: Rc<FunctionDecl>);

    /// Remove the function `name` whose parameter types are exactly
    /// `params`; returns whether one was removed.
    fn drop_function(&mut self, name: &str, params: &[TypeRef]) -> bool;

    /// Whether only public members are accessible to scripts.
    fn use_public_only(&self) -> bool;

    /// Whether the host accepts a checked exception escaping a top-level
    /// construct.
    fn can_handle(&self, exception: &Type) -> bool;

    fn is_canceled(&self) -> bool;
}

/// Host policy shared by a scope and all of its children.
#[derive(Clone)]
struct Policy {
    catalog: Rc<dyn MemberCatalog>,
    public_only: bool,
    handled: Vec<Type>,
    cancel: Arc<AtomicBool>,
}

#[derive(Clone, Debug, Default)]
struct Imports {
    /// Simple name to qualified class name.
    classes: HashMap<String, String>,
    /// On-demand packages, `java.lang` first.
    packages: Vec<String>,
    /// Statically imported member name to owning class.
    members: HashMap<String, String>,
    /// Classes imported with `import static Owner.*`.
    owners: Vec<String>,
}

/// The default [`Environment`].
#[derive(Clone)]
pub struct Scope {
    variables: HashMap<String, Rc<RefCell<Variable>>>,
    /// Names declared at this level, as opposed to copied from a parent.
    own: HashSet<String>,
    imports: Imports,
    functions: Vec<Rc<FunctionDecl>>,
    policy: Rc<Policy>,
}

impl Scope {
    /// A root scope importing `java.lang.*`, with no visibility
    /// restriction and every exception type handled at top level.
    pub fn new(catalog: Rc<dyn MemberCatalog>) -> Self {
        Self {
            variables: HashMap::new(),
            own: HashSet::new(),
            imports: Imports {
                packages: vec!["java.lang".to_string()],
                ..Imports::default()
            },
            functions: Vec::new(),
            policy: Rc::new(Policy {
                catalog,
                public_only: false,
                handled: vec![Type::class(types::THROWABLE)],
                cancel: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn with_public_only(mut self, public_only: bool) -> Self {
        Rc::make_mut(&mut self.policy).public_only = public_only;
        self
    }

    /// Exception types escaping top-level constructs that the host accepts.
    /// Empty means every checked exception must be caught by the script.
    pub fn with_handled(mut self, handled: Vec<Type>) -> Self {
        Rc::make_mut(&mut self.policy).handled = handled;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        Rc::make_mut(&mut self.policy).cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.policy.cancel)
    }

    /// Names of the variables visible in this scope, sorted.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.variables.keys().cloned().collect();
        names.sort();
        names
    }

    fn catalog(&self) -> &dyn MemberCatalog {
        self.policy.catalog.as_ref()
    }

    fn has_static_member(&self, owner: &str, name: &str) -> bool {
        self.catalog().class(owner).is_some_and(|class| {
            class.methods.iter().any(|m| m.is_static && m.name == name)
                || class.fields.iter().any(|f| f.is_static && f.name == name)
        })
    }

    fn accepts(&self, ty: &Type, value: &Value) -> bool {
        match ty.as_primitive() {
            Some(p) => value.primitive() == Some(p),
            None => {
                value.is_null()
                    || relations::is_instance(self.catalog(), ty, &self.catalog().runtime_type(value))
            }
        }
    }
}

fn fail(kind: EvaluationErrorKind, origin: &Node) -> EvalResult<()> {
    Err(EvaluationError::new(kind, origin).into())
}

impl Environment for Scope {
    fn scope(&self, copy_vars: bool) -> Box<dyn Environment> {
        Box::new(Scope {
            variables: if copy_vars {
                self.variables.clone()
            } else {
                HashMap::new()
            },
            own: HashSet::new(),
            imports: self.imports.clone(),
            functions: self.functions.clone(),
            policy: Rc::clone(&self.policy),
        })
    }

    fn snapshot(&self) -> Box<dyn Environment> {
        let variables = self
            .variables
            .iter()
            .map(|(name, cell)| (name.clone(), Rc::new(RefCell::new(cell.borrow().clone()))))
            .collect();
        Box::new(Scope {
            variables,
            ..self.clone()
        })
    }

    fn declare_variable(
        &mut self,
        name: &str,
        ty: Type,
        is_final: bool,
        origin: &Node,
    ) -> EvalResult<()> {
        if self.own.contains(name) {
            return fail(EvaluationErrorKind::DuplicateVariable(name.to_string()), origin);
        }
        tracing::trace!(name, %ty, is_final, "declare variable");
        self.own.insert(name.to_string());
        self.variables.insert(
            name.to_string(),
            Rc::new(RefCell::new(Variable {
                ty,
                value: None,
                is_final,
                assigned: false,
            })),
        );
        Ok(())
    }

    fn set_variable(&mut self, name: &str, value: Option<Value>, origin: &Node) -> EvalResult<()> {
        let Some(cell) = self.variables.get(name) else {
            return fail(EvaluationErrorKind::UnresolvedVariable(name.to_string()), origin);
        };
        let mut variable = cell.borrow_mut();
        if variable.is_final && variable.assigned {
            return fail(EvaluationErrorKind::FinalAssignment(name.to_string()), origin);
        }
        if let Some(value) = &value {
            if !self.accepts(&variable.ty, value) {
                return fail(
                    EvaluationErrorKind::TypeMismatch {
                        from: self.catalog().runtime_type(value),
                        to: variable.ty.clone(),
                    },
                    origin,
                );
            }
        }
        variable.assigned = true;
        if value.is_some() {
            variable.value = value;
        }
        Ok(())
    }

    fn variable(&self, name: &str) -> Option<Variable> {
        self.variables.get(name).map(|cell| cell.borrow().clone())
    }

    fn drop_variable(&mut self, name: &str) -> bool {
        self.own.remove(name);
        self.variables.remove(name).is_some()
    }

    fn import_type(&self, simple: &str) -> Option<Type> {
        if let Some(name) = self.imports.classes.get(simple) {
            return Some(Type::class(name.clone()));
        }
        self.imports
            .packages
            .iter()
            .map(|package| format!("{package}.{simple}"))
            .find(|name| self.catalog().class(name).is_some())
            .map(Type::class)
    }

    fn import_method_type(&self, name: &str) -> Option<Type> {
        if let Some(owner) = self.imports.members.get(name) {
            return Some(Type::class(owner.clone()));
        }
        self.imports
            .owners
            .iter()
            .find(|owner| self.has_static_member(owner, name))
            .map(|owner| Type::class(owner.clone()))
    }

    fn add_import(&mut self, import: &Import, origin: &Node) -> EvalResult<()> {
        tracing::debug!(?import, "import");
        match import {
            Import::Class(name) => {
                if self.catalog().class(name).is_none() {
                    return fail(EvaluationErrorKind::UnresolvedType(name.clone()), origin);
                }
                self.imports
                    .classes
                    .insert(types::simple_name(name).to_string(), name.clone());
            }
            Import::Package(package) => {
                if !self.catalog().has_package(package) {
                    return fail(EvaluationErrorKind::Unresolved(package.clone()), origin);
                }
                if !self.imports.packages.contains(package) {
                    self.imports.packages.push(package.clone());
                }
            }
            Import::StaticMember { owner, member } => {
                if self.catalog().class(owner).is_none() {
                    return fail(EvaluationErrorKind::UnresolvedType(owner.clone()), origin);
                }
                if !self.has_static_member(owner, member) {
                    return fail(
                        EvaluationErrorKind::Unresolved(format!("{owner}.{member}")),
                        origin,
                    );
                }
                self.imports.members.insert(member.clone(), owner.clone());
            }
            Import::Static { owner } => {
                if self.catalog().class(owner).is_none() {
                    return fail(EvaluationErrorKind::UnresolvedType(owner.clone()), origin);
                }
                if !self.imports.owners.contains(owner) {
                    self.imports.owners.push(owner.clone());
                }
            }
        }
        Ok(())
    }

    fn declared_functions(&self) -> Vec<Rc<FunctionDecl>> {
        self.functions.clone()
    }

    fn declare_function(&mut self, function: Rc<FunctionDecl>) {
        self.functions.push(function);
    }

    fn drop_function(&mut self, name: &str, params: &[TypeRef]) -> bool {
        match self
            .functions
            .iter()
            .position(|f| f.name == name && f.has_param_types(params))
        {
            Some(index) => {
                self.functions.remove(index);
                true
            }
            None => false,
        }
    }

    fn use_public_only(&self) -> bool {
        self.policy.public_only
    }

    fn can_handle(&self, exception: &Type) -> bool {
        let Some(name) = exception.class_name() else {
            return false;
        };
        self.policy.handled.iter().any(|handled| {
            handled
                .class_name()
                .is_some_and(|h| relations::is_subclass(self.catalog(), name, h))
        })
    }

    fn is_canceled(&self) -> bool {
        self.policy.cancel.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use kava_core::Span;
    use kava_runtime::Runtime;

    use super::*;

    fn root() -> Scope {
        Scope::new(Rc::new(Runtime::captured()))
    }

    fn origin() -> Node {
        Node::new(kava_ast::NodeKind::NoOp, Span::new(0, 0))
    }

    #[test]
    fn child_declarations_stay_in_the_child() {
        let mut parent = root();
        parent
            .declare_variable("x", Type::int(), false, &origin())
            .unwrap();
        let mut child = parent.scope(true);
        child
            .declare_variable("y", Type::int(), false, &origin())
            .unwrap();
        child.set_variable("x", Some(Value::Int(3)), &origin()).unwrap();
        assert!(parent.variable("y").is_none());
        let x = parent.variable("x").unwrap();
        assert!(matches!(x.value, Some(Value::Int(3))));
    }

    #[test]
    fn snapshots_do_not_write_back() {
        let mut scope = root();
        scope
            .declare_variable("k", Type::int(), true, &origin())
            .unwrap();
        let mut check = scope.snapshot();
        check.set_variable("k", None, &origin()).unwrap();
        check
            .declare_variable("extra", Type::int(), false, &origin())
            .unwrap();
        assert!(!scope.variable("k").unwrap().assigned);
        assert!(scope.variable("extra").is_none());
        scope.set_variable("k", Some(Value::Int(1)), &origin()).unwrap();
    }

    #[test]
    fn final_variables_take_one_assignment() {
        let mut scope = root();
        scope
            .declare_variable("k", Type::int(), true, &origin())
            .unwrap();
        scope.set_variable("k", None, &origin()).unwrap();
        let error = scope.set_variable("k", Some(Value::Int(1)), &origin()).unwrap_err();
        insta::assert_snapshot!(error, @"the final variable k cannot be assigned");
    }

    #[test]
    fn set_variable_checks_runtime_type() {
        let mut scope = root();
        scope
            .declare_variable("s", Type::string(), false, &origin())
            .unwrap();
        let error = scope.set_variable("s", Some(Value::Int(1)), &origin()).unwrap_err();
        insta::assert_snapshot!(error, @"type mismatch: cannot convert from Integer to String");
        scope.set_variable("s", Some(Value::Null), &origin()).unwrap();
    }

    #[test]
    fn imports_resolve_simple_names() {
        let mut scope = root();
        assert_eq!(scope.import_type("String"), Some(Type::string()));
        assert_eq!(scope.import_type("ArrayList"), None);
        scope
            .add_import(&Import::Package("java.util".into()), &origin())
            .unwrap();
        assert_eq!(
            scope.import_type("ArrayList"),
            Some(Type::class("java.util.ArrayList"))
        );
        scope
            .add_import(&Import::Static { owner: "java.lang.Math".into() }, &origin())
            .unwrap();
        assert_eq!(
            scope.import_method_type("max"),
            Some(Type::class("java.lang.Math"))
        );
        let error = scope
            .add_import(&Import::Class("java.util.Nope".into()), &origin())
            .unwrap_err();
        insta::assert_snapshot!(error, @"java.util.Nope cannot be resolved to a type");
    }

    #[test]
    fn handled_exceptions_follow_the_hierarchy() {
        let scope = root().with_handled(vec![Type::class("java.io.IOException")]);
        assert!(scope.can_handle(&Type::class("java.io.IOException")));
        assert!(!scope.can_handle(&Type::class("java.lang.InterruptedException")));
    }
}
