use kava_core::Span;

use crate::node::Node;
use crate::type_ref::TypeRef;

/// A script-level function declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeRef,
    pub throws: Vec<TypeRef>,
    /// Always a block node.
    pub body: Node,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    /// Declared type; for a variable-arity parameter this is the array type.
    pub ty: TypeRef,
    pub is_final: bool,
    pub varargs: bool,
}

impl FunctionDecl {
    pub fn is_varargs(&self) -> bool {
        self.params.last().is_some_and(|p| p.varargs)
    }

    /// Call-signature equality: same name, arity, parameter types and
    /// variable-arity flag. Parameter names and bodies do not matter.
    pub fn same_signature(&self, other: &FunctionDecl) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.varargs == b.varargs && a.ty.same_as(&b.ty))
    }

    /// Whether the parameter types are exactly `types`, as used by
    /// `drop name(T1, T2)`.
    pub fn has_param_types(&self, types: &[TypeRef]) -> bool {
        self.params.len() == types.len()
            && self.params.iter().zip(types).all(|(p, t)| p.ty.same_as(t))
    }

    /// `name(int, String...)`
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| match (p.varargs, p.ty.component()) {
                (true, Some(element)) => format!("{element}..."),
                _ => p.ty.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({params})", self.name)
    }
}
