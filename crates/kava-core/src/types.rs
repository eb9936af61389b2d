//! Runtime type descriptors.
//!
//! A [`Type`] is a base ([`TypeKind`]) plus an array depth. Array types are
//! therefore never nested structurally: `int[][]` is `Primitive(Int)` with
//! `dims == 2`, and stepping to the component type just decrements the depth.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const ITERABLE: &str = "java.lang.Iterable";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const EXCEPTION: &str = "java.lang.Exception";
pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
pub const ERROR: &str = "java.lang.Error";

/// The primitive types, including the pseudo-type `void`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Short,
        Primitive::Char,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Void,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Void => "void",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Primitive::Boolean | Primitive::Void)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Primitive::Byte | Primitive::Short | Primitive::Char | Primitive::Int | Primitive::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Primitive::Float | Primitive::Double)
    }

    /// Whether a value of `self` converts to `to` by a widening primitive
    /// conversion (`byte -> short -> int -> long -> float -> double`, with
    /// `char` joining at `int`).
    pub fn widens_to(self, to: Primitive) -> bool {
        use Primitive::*;
        match self {
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => matches!(to, Double),
            _ => false,
        }
    }

    /// Unary numeric promotion: anything narrower than `int` becomes `int`.
    pub fn promote(self) -> Primitive {
        match self {
            Primitive::Byte | Primitive::Short | Primitive::Char => Primitive::Int,
            other => other,
        }
    }

    /// Binary numeric promotion of two numeric operands.
    pub fn promote_binary(a: Primitive, b: Primitive) -> Primitive {
        use Primitive::*;
        if a == Double || b == Double {
            Double
        } else if a == Float || b == Float {
            Float
        } else if a == Long || b == Long {
            Long
        } else {
            Int
        }
    }

    /// The wider of two primitives, used where a single type must accommodate
    /// both (conditional results, array element inference).
    pub fn wider(a: Primitive, b: Primitive) -> Primitive {
        if a == b || b.widens_to(a) {
            a
        } else if a.widens_to(b) {
            b
        } else {
            Primitive::promote_binary(a, b)
        }
    }

    /// Fully qualified name of the wrapper class.
    pub fn box_class(self) -> &'static str {
        match self {
            Primitive::Boolean => "java.lang.Boolean",
            Primitive::Byte => "java.lang.Byte",
            Primitive::Short => "java.lang.Short",
            Primitive::Char => "java.lang.Character",
            Primitive::Int => "java.lang.Integer",
            Primitive::Long => "java.lang.Long",
            Primitive::Float => "java.lang.Float",
            Primitive::Double => "java.lang.Double",
            Primitive::Void => "java.lang.Void",
        }
    }

    /// The primitive a wrapper class unboxes to.
    pub fn unbox(class: &str) -> Option<Primitive> {
        Self::ALL
            .into_iter()
            .filter(|p| *p != Primitive::Void)
            .find(|p| p.box_class() == class)
    }

    /// Bit width for integral types, used to mask shift distances.
    pub fn bits(self) -> u32 {
        match self {
            Primitive::Byte => 8,
            Primitive::Short | Primitive::Char => 16,
            Primitive::Int | Primitive::Float => 32,
            Primitive::Long | Primitive::Double => 64,
            Primitive::Boolean => 1,
            Primitive::Void => 0,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The non-array part of a [`Type`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(Primitive),
    /// A class or interface, parameterized when `args` is non-empty.
    Class { name: String, args: Vec<Type> },
    /// A type variable of a generic class or method, with its upper bound.
    Variable { name: String, bound: Box<Type> },
    /// `?`, `? extends B` (`upper`) or `? super B`.
    Wildcard {
        bound: Option<Box<Type>>,
        upper: bool,
    },
    /// The type of the `null` literal.
    Null,
}

/// A runtime type descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    pub kind: TypeKind,
    pub dims: u32,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind, dims: 0 }
    }

    pub fn primitive(p: Primitive) -> Self {
        Self::new(TypeKind::Primitive(p))
    }

    pub fn boolean() -> Self {
        Self::primitive(Primitive::Boolean)
    }

    pub fn int() -> Self {
        Self::primitive(Primitive::Int)
    }

    pub fn void() -> Self {
        Self::primitive(Primitive::Void)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::generic(name, Vec::new())
    }

    pub fn generic(name: impl Into<String>, args: Vec<Type>) -> Self {
        Self::new(TypeKind::Class {
            name: name.into(),
            args,
        })
    }

    pub fn variable(name: impl Into<String>, bound: Type) -> Self {
        Self::new(TypeKind::Variable {
            name: name.into(),
            bound: Box::new(bound),
        })
    }

    pub fn wildcard(bound: Option<Type>, upper: bool) -> Self {
        Self::new(TypeKind::Wildcard {
            bound: bound.map(Box::new),
            upper,
        })
    }

    pub fn null() -> Self {
        Self::new(TypeKind::Null)
    }

    pub fn object() -> Self {
        Self::class(OBJECT)
    }

    pub fn string() -> Self {
        Self::class(STRING)
    }

    /// `java.lang.Class<T>` for a class literal of `of`.
    pub fn class_of(of: &Type) -> Self {
        let arg = match of.as_primitive() {
            Some(p) => Type::class(p.box_class()),
            None => of.clone(),
        };
        Self::generic(CLASS, vec![arg])
    }

    /// This type with `n` more array dimensions.
    pub fn array_of(&self, n: u32) -> Self {
        Self {
            kind: self.kind.clone(),
            dims: self.dims + n,
        }
    }

    /// The component type of an array type.
    pub fn component(&self) -> Option<Self> {
        (self.dims > 0).then(|| Self {
            kind: self.kind.clone(),
            dims: self.dims - 1,
        })
    }

    /// The innermost element type of an array type, or the type itself.
    pub fn base(&self) -> Self {
        Self::new(self.kind.clone())
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self.kind {
            TypeKind::Primitive(p) if self.dims == 0 => Some(p),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.as_primitive().is_some()
    }

    pub fn is_void(&self) -> bool {
        self.as_primitive() == Some(Primitive::Void)
    }

    pub fn is_boolean(&self) -> bool {
        self.as_primitive() == Some(Primitive::Boolean)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, TypeKind::Null)
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    pub fn is_wildcard(&self) -> bool {
        self.dims == 0 && matches!(self.kind, TypeKind::Wildcard { .. })
    }

    /// Class name of a non-array class type.
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Class { name, .. } if self.dims == 0 => Some(name),
            _ => None,
        }
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.class_name() == Some(name)
    }

    pub fn is_string(&self) -> bool {
        self.is_class(STRING)
    }

    /// Type arguments of a parameterized class type.
    pub fn args(&self) -> &[Type] {
        match &self.kind {
            TypeKind::Class { args, .. } => args,
            _ => &[],
        }
    }

    /// The primitive this type denotes or unboxes to.
    pub fn unboxed(&self) -> Option<Primitive> {
        self.as_primitive()
            .or_else(|| self.class_name().and_then(Primitive::unbox))
    }

    /// Numeric primitive this type denotes or unboxes to.
    pub fn numeric(&self) -> Option<Primitive> {
        self.unboxed().filter(|p| p.is_numeric())
    }

    /// Integral primitive this type denotes or unboxes to.
    pub fn integral(&self) -> Option<Primitive> {
        self.unboxed().filter(|p| p.is_integral())
    }

    /// The reference type used when this type must be boxed.
    pub fn boxed(&self) -> Type {
        match self.as_primitive() {
            Some(p) => Type::class(p.box_class()),
            None => self.clone(),
        }
    }

    /// Replace type variables according to `map`. Unmapped variables are
    /// left in place.
    pub fn substitute(&self, map: &HashMap<String, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        let substituted = match &self.kind {
            TypeKind::Variable { name, .. } => match map.get(name) {
                Some(ty) => return ty.array_of(self.dims),
                None => self.kind.clone(),
            },
            TypeKind::Class { name, args } => TypeKind::Class {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            TypeKind::Wildcard { bound, upper } => TypeKind::Wildcard {
                bound: bound.as_ref().map(|b| Box::new(b.substitute(map))),
                upper: *upper,
            },
            other => other.clone(),
        };
        Type {
            kind: substituted,
            dims: self.dims,
        }
    }

    /// Replace every type variable by its bound and wildcard by its bound
    /// (or `Object`), recursively.
    pub fn erase_variables(&self) -> Type {
        match &self.kind {
            TypeKind::Variable { bound, .. } => bound.erase_variables().array_of(self.dims),
            TypeKind::Wildcard { bound, upper } => match bound {
                Some(b) if *upper => b.erase_variables().array_of(self.dims),
                _ => Type::object().array_of(self.dims),
            },
            TypeKind::Class { name, args } => Type {
                kind: TypeKind::Class {
                    name: name.clone(),
                    args: args.iter().map(Type::erase_variables).collect(),
                },
                dims: self.dims,
            },
            _ => self.clone(),
        }
    }

    /// Whether the type mentions a type variable anywhere.
    pub fn has_variables(&self) -> bool {
        match &self.kind {
            TypeKind::Variable { .. } => true,
            TypeKind::Class { args, .. } => args.iter().any(Type::has_variables),
            TypeKind::Wildcard { bound, .. } => bound.as_ref().is_some_and(|b| b.has_variables()),
            _ => false,
        }
    }

    /// Fully qualified rendering (`java.util.List<java.lang.String>[]`).
    pub fn qualified(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, true);
        out
    }

    fn render(&self, out: &mut String, qualified: bool) {
        match &self.kind {
            TypeKind::Primitive(p) => out.push_str(p.name()),
            TypeKind::Class { name, args } => {
                if qualified {
                    out.push_str(name);
                } else {
                    out.push_str(simple_name(name));
                }
                if !args.is_empty() {
                    out.push('<');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        arg.render(out, qualified);
                    }
                    out.push('>');
                }
            }
            TypeKind::Variable { name, .. } => out.push_str(name),
            TypeKind::Wildcard { bound, upper } => {
                out.push('?');
                if let Some(bound) = bound {
                    out.push_str(if *upper { " extends " } else { " super " });
                    bound.render(out, qualified);
                }
            }
            TypeKind::Null => out.push_str("null"),
        }
        for _ in 0..self.dims {
            out.push_str("[]");
        }
    }
}

/// `java.util.List` -> `List`.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// `java.util.List` -> `java.util`.
pub fn package_of(name: &str) -> &str {
    name.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
}

impl fmt::Display for Type {
    /// Simple names by default, `{:#}` renders fully qualified names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, f.alternate());
        f.write_str(&out)
    }
}

impl From<Primitive> for Type {
    fn from(p: Primitive) -> Self {
        Type::primitive(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_ladder() {
        use Primitive::*;
        assert_eq!(Primitive::promote_binary(Byte, Short), Int);
        assert_eq!(Primitive::promote_binary(Char, Long), Long);
        assert_eq!(Primitive::promote_binary(Int, Float), Float);
        assert_eq!(Primitive::promote_binary(Long, Double), Double);
        assert_eq!(Primitive::wider(Byte, Short), Short);
        assert_eq!(Primitive::wider(Char, Short), Int);
    }

    #[test]
    fn widening_is_not_symmetric() {
        assert!(Primitive::Int.widens_to(Primitive::Long));
        assert!(!Primitive::Long.widens_to(Primitive::Int));
        assert!(!Primitive::Short.widens_to(Primitive::Char));
        assert!(!Primitive::Char.widens_to(Primitive::Short));
    }

    #[test]
    fn array_depth_steps() {
        let ty = Type::int().array_of(2);
        assert_eq!(ty.to_string(), "int[][]");
        let component = ty.component().unwrap();
        assert_eq!(component, Type::int().array_of(1));
        assert_eq!(component.component().unwrap(), Type::int());
        assert!(Type::int().component().is_none());
    }

    #[test]
    fn display_simple_and_qualified() {
        let ty = Type::generic(
            "java.util.Map",
            vec![
                Type::string(),
                Type::wildcard(Some(Type::class("java.lang.Number")), true),
            ],
        );
        assert_eq!(ty.to_string(), "Map<String,? extends Number>");
        assert_eq!(
            format!("{ty:#}"),
            "java.util.Map<java.lang.String,? extends java.lang.Number>"
        );
    }

    #[test]
    fn substitute_keeps_array_depth() {
        let t = Type::variable("T", Type::object()).array_of(1);
        let map = HashMap::from([("T".to_string(), Type::string())]);
        assert_eq!(t.substitute(&map), Type::string().array_of(1));
    }

    #[test]
    fn boxing_round_trip() {
        for p in Primitive::ALL {
            if p == Primitive::Void {
                continue;
            }
            assert_eq!(Primitive::unbox(p.box_class()), Some(p));
        }
        assert_eq!(Type::class("java.lang.Integer").numeric(), Some(Primitive::Int));
    }
}
