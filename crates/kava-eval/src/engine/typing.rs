use kava_ast::{Node, NodeKind, TypeName, TypeRef};
use kava_core::{Type, relations};

use super::Interpreter;
use crate::environment::Environment;
use crate::error::{EvalResult, EvaluationError, EvaluationErrorKind};

fn type_error<T>(kind: EvaluationErrorKind, ty: &TypeRef) -> EvalResult<T> {
    Err(EvaluationError::at(kind, "type", ty.span).into())
}

impl Interpreter<'_> {
    /// Resolve a written type against the import table and the catalog.
    pub(super) fn resolve_type(&self, env: &dyn Environment, ty: &TypeRef) -> EvalResult<Type> {
        let base = match &ty.name {
            TypeName::Primitive(p) => {
                if !ty.args.is_empty() {
                    return type_error(
                        EvaluationErrorKind::TypeArity {
                            ty: p.to_string(),
                            args: ty.args.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
                        },
                        ty,
                    );
                }
                Type::primitive(*p)
            }
            TypeName::Wildcard { bound, upper } => {
                let bound = bound
                    .as_ref()
                    .map(|b| self.resolve_type(env, b))
                    .transpose()?;
                Type::wildcard(bound, *upper)
            }
            TypeName::Named(name) => {
                let class = self.named_class(env, name, ty)?;
                let args = ty
                    .args
                    .iter()
                    .map(|arg| self.type_argument(env, arg))
                    .collect::<EvalResult<Vec<_>>>()?;
                let arity = self
                    .catalog
                    .class(&class)
                    .map_or(0, |info| info.type_params.len());
                if !args.is_empty() && args.len() != arity {
                    return type_error(
                        EvaluationErrorKind::TypeArity {
                            ty: kava_core::types::simple_name(&class).to_string(),
                            args: super::type_list(&args),
                        },
                        ty,
                    );
                }
                Type::generic(class, args)
            }
        };
        Ok(base.array_of(ty.dims))
    }

    fn named_class(&self, env: &dyn Environment, name: &str, ty: &TypeRef) -> EvalResult<String> {
        let found = if name.contains('.') {
            self.catalog.class(name).map(|_| Type::class(name))
        } else {
            env.import_type(name)
        };
        match found.as_ref().and_then(Type::class_name) {
            Some(class) => Ok(class.to_string()),
            None => type_error(EvaluationErrorKind::UnresolvedType(name.to_string()), ty),
        }
    }

    fn type_argument(&self, env: &dyn Environment, arg: &TypeRef) -> EvalResult<Type> {
        let resolved = self.resolve_type(env, arg)?;
        if resolved.is_primitive() {
            return type_error(
                EvaluationErrorKind::TypeMismatch {
                    from: resolved,
                    to: Type::object(),
                },
                arg,
            );
        }
        Ok(resolved)
    }

    /// The type named by a `Type` node in expression position.
    pub(super) fn type_node(&self, env: &dyn Environment, node: &Node) -> EvalResult<Type> {
        match &node.kind {
            NodeKind::Type(ty) => self.resolve_type(env, ty),
            _ => super::fail(EvaluationErrorKind::Misplaced(node.label()), node),
        }
    }

    /// Whether a reference of type `from` may be cast to `to`.
    pub(super) fn castable(&self, to: &Type, from: &Type) -> bool {
        if from.is_null() {
            return to.is_reference();
        }
        let (to, from) = (relations::erase(to), relations::erase(from));
        if relations::is_assignable_strict(self.catalog, &to, &from)
            || relations::is_assignable_strict(self.catalog, &from, &to)
        {
            return true;
        }
        let interface = |ty: &Type| {
            ty.class_name()
                .and_then(|name| self.catalog.class(name))
                .is_some_and(|info| info.is_interface)
        };
        interface(&to) || interface(&from)
    }
}
