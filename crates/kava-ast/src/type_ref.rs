use std::fmt;

use kava_core::{Primitive, Span};

/// A type as written in source, before name resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub name: TypeName,
    pub args: Vec<TypeRef>,
    pub dims: u32,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeName {
    Primitive(Primitive),
    /// A possibly qualified class name, segments joined with `.`.
    Named(String),
    /// `?`, `? extends T` or `? super T`.
    Wildcard {
        bound: Option<Box<TypeRef>>,
        upper: bool,
    },
}

impl TypeRef {
    pub fn primitive(p: Primitive, span: Span) -> Self {
        Self {
            name: TypeName::Primitive(p),
            args: Vec::new(),
            dims: 0,
            span,
        }
    }

    pub fn named(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: TypeName::Named(name.into()),
            args: Vec::new(),
            dims: 0,
            span,
        }
    }

    pub fn with_dims(mut self, extra: u32) -> Self {
        self.dims += extra;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.name, TypeName::Wildcard { .. })
    }

    pub fn is_void(&self) -> bool {
        self.dims == 0 && self.name == TypeName::Primitive(Primitive::Void)
    }

    /// Structural equality ignoring source positions.
    pub fn same_as(&self, other: &TypeRef) -> bool {
        let names_match = match (&self.name, &other.name) {
            (
                TypeName::Wildcard { bound: a, upper: ua },
                TypeName::Wildcard { bound: b, upper: ub },
            ) => {
                ua == ub
                    && match (a, b) {
                        (Some(a), Some(b)) => a.same_as(b),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (a, b) => a == b,
        };
        names_match
            && self.dims == other.dims
            && self.args.len() == other.args.len()
            && self.args.iter().zip(&other.args).all(|(a, b)| a.same_as(b))
    }

    /// The element type of an array type reference.
    pub fn component(&self) -> Option<TypeRef> {
        (self.dims > 0).then(|| Self {
            dims: self.dims - 1,
            ..self.clone()
        })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            TypeName::Primitive(p) => write!(f, "{p}")?,
            TypeName::Named(name) => f.write_str(name)?,
            TypeName::Wildcard { bound, upper } => {
                f.write_str("?")?;
                if let Some(bound) = bound {
                    let keyword = if *upper { "extends" } else { "super" };
                    write!(f, " {keyword} {bound}")?;
                }
            }
        }
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}
