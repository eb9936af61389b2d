//! The member catalog: how a host exposes its classes to scripts.
//!
//! The evaluator never inspects host storage directly. It asks the catalog
//! for [`ClassInfo`] metadata, picks a member with its own overload
//! resolution, then hands the chosen [`Field`] or [`Method`] back to the
//! catalog to read, write, invoke or construct.

use std::fmt;
use std::rc::Rc;

use crate::types::{self, Type};
use crate::value::Value;

/// A value thrown by host code; always an instance of a `Throwable` class.
#[derive(Clone, Debug)]
pub struct Thrown(pub Value);

pub type HostResult<T> = Result<T, Thrown>;

/// Native implementation of a method or constructor. Receives the catalog
/// (so it can create exceptions or render other values), the receiver for
/// instance members, and the already-converted arguments.
pub type NativeFn = Rc<dyn Fn(&dyn MemberCatalog, Option<&Value>, &[Value]) -> HostResult<Value>>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

/// A declared type parameter with its upper bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub bound: Type,
}

impl TypeParam {
    pub fn new(name: impl Into<String>, bound: Type) -> Self {
        Self {
            name: name.into(),
            bound,
        }
    }

    /// The type variable this parameter declares.
    pub fn variable(&self) -> Type {
        Type::variable(self.name.clone(), self.bound.clone())
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
    pub is_final: bool,
    pub visibility: Visibility,
    /// Fully qualified name of the declaring class.
    pub declaring: String,
}

/// A method or constructor. Constructors are named `<init>` and return the
/// declaring class type.
#[derive(Clone)]
pub struct Method {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Type>,
    /// The last parameter is variable-arity; its type is an array type.
    pub varargs: bool,
    pub ret: Type,
    pub is_static: bool,
    pub is_abstract: bool,
    pub visibility: Visibility,
    pub declaring: String,
    pub throws: Vec<Type>,
    pub native: Option<NativeFn>,
}

impl Method {
    pub const CONSTRUCTOR: &'static str = "<init>";

    pub fn is_constructor(&self) -> bool {
        self.name == Self::CONSTRUCTOR
    }

    /// `name(int, String...)`, used in diagnostics.
    pub fn signature(&self) -> String {
        let name = if self.is_constructor() {
            types::simple_name(&self.declaring)
        } else {
            &self.name
        };
        let params = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if self.varargs && i + 1 == self.params.len() {
                    let element = p.component().unwrap_or_else(|| p.clone());
                    format!("{element}...")
                } else {
                    p.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{name}({params})")
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("declaring", &self.declaring)
            .field("signature", &self.signature())
            .field("ret", &self.ret)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

/// Metadata for one class or interface.
#[derive(Clone, Debug)]
pub struct ClassInfo {
    /// Fully qualified name.
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// Direct superclass with type arguments expressed in this class's
    /// type variables. `None` only for `java.lang.Object` and interfaces.
    pub superclass: Option<Type>,
    pub interfaces: Vec<Type>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub visibility: Visibility,
    pub fields: Vec<Rc<Field>>,
    pub methods: Vec<Rc<Method>>,
    pub constructors: Vec<Rc<Method>>,
}

impl ClassInfo {
    pub fn simple_name(&self) -> &str {
        types::simple_name(&self.name)
    }

    pub fn package(&self) -> &str {
        types::package_of(&self.name)
    }

    /// The generic self type, `List<E>` for `java.util.List`.
    pub fn this_type(&self) -> Type {
        Type::generic(
            self.name.clone(),
            self.type_params.iter().map(TypeParam::variable).collect(),
        )
    }

    /// Direct supertypes: superclass first, then interfaces. Interfaces
    /// without explicit supertypes report `Object`.
    pub fn supertypes(&self) -> Vec<Type> {
        let mut out = Vec::new();
        match &self.superclass {
            Some(sup) => out.push(sup.clone()),
            None if self.name != types::OBJECT => out.push(Type::object()),
            None => {}
        }
        out.extend(self.interfaces.iter().cloned());
        out
    }

    pub fn declared_field(&self, name: &str) -> Option<&Rc<Field>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The host type system as seen by the evaluator.
pub trait MemberCatalog {
    /// Metadata for a fully qualified class name.
    fn class(&self, name: &str) -> Option<Rc<ClassInfo>>;

    /// Whether `name` is a known package or a prefix of one.
    fn has_package(&self, name: &str) -> bool;

    /// The most specific type describing a runtime value.
    fn runtime_type(&self, value: &Value) -> Type;

    /// Invoke a method. `receiver` is `None` for static methods.
    fn invoke(&self, method: &Method, receiver: Option<&Value>, args: &[Value]) -> HostResult<Value> {
        match &method.native {
            Some(native) => native(self.as_dyn(), receiver, args),
            None => Err(self.throwable(
                "java.lang.AbstractMethodError",
                Some(method.signature()),
            )),
        }
    }

    /// Create an instance of `class` through one of its constructors.
    fn construct(&self, class: &ClassInfo, ctor: &Method, args: &[Value]) -> HostResult<Value> {
        if class.is_abstract || class.is_interface {
            return Err(self.throwable(
                "java.lang.InstantiationException",
                Some(class.name.clone()),
            ));
        }
        self.invoke(ctor, None, args)
    }

    fn get_field(&self, field: &Field, receiver: Option<&Value>) -> HostResult<Value>;

    fn set_field(&self, field: &Field, receiver: Option<&Value>, value: Value) -> HostResult<()>;

    /// The elements of an `Iterable` value, in iteration order.
    fn iterate(&self, value: &Value) -> HostResult<Vec<Value>>;

    /// A new `Throwable` of the given class, wrapped ready to throw.
    fn throwable(&self, class: &str, message: Option<String>) -> Thrown;

    /// `String.valueOf` rendering of a value.
    fn display(&self, value: &Value) -> String;

    /// Upcast helper for default methods.
    fn as_dyn(&self) -> &dyn MemberCatalog;
}
