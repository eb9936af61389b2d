//! Type relations that need the class hierarchy: subtyping, assignment
//! conversions and common supertypes.

use std::collections::{HashMap, VecDeque};

use crate::catalog::MemberCatalog;
use crate::types::{self, Primitive, Type, TypeKind};

/// How a value of one type is converted for assignment to another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Conversion {
    Identity,
    WideningPrimitive,
    WideningReference,
    /// Raw or otherwise unchecked generic conversion.
    Unchecked,
    Boxing,
    Unboxing,
}

impl Conversion {
    /// Conversions allowed without boxing, used to rank overloads.
    pub fn is_strict(self) -> bool {
        !matches!(self, Conversion::Boxing | Conversion::Unboxing)
    }
}

/// Whether class `sub` is `sup` or inherits from it.
pub fn is_subclass(catalog: &dyn MemberCatalog, sub: &str, sup: &str) -> bool {
    if sub == sup || sup == types::OBJECT {
        return true;
    }
    let Some(class) = catalog.class(sub) else {
        return false;
    };
    class.supertypes().iter().any(|st| {
        st.class_name()
            .is_some_and(|name| is_subclass(catalog, name, sup))
    })
}

/// View `ty` as an instance of class `target`, carrying type arguments
/// through the hierarchy: `ArrayList<String>` as `java.lang.Iterable`
/// becomes `Iterable<String>`. Raw types stay raw.
pub fn as_super(catalog: &dyn MemberCatalog, ty: &Type, target: &str) -> Option<Type> {
    let name = match &ty.kind {
        TypeKind::Class { name, .. } if ty.dims == 0 => name.as_str(),
        TypeKind::Variable { bound, .. } if ty.dims == 0 => return as_super(catalog, bound, target),
        TypeKind::Wildcard {
            bound: Some(bound),
            upper: true,
        } if ty.dims == 0 => return as_super(catalog, bound, target),
        _ => return (target == types::OBJECT).then(Type::object),
    };
    if name == target {
        return Some(ty.clone());
    }
    let class = catalog.class(name)?;
    let raw = ty.args().is_empty() && !class.type_params.is_empty();
    let bindings: HashMap<String, Type> = class
        .type_params
        .iter()
        .zip(ty.args())
        .map(|(param, arg)| (param.name.clone(), arg.clone()))
        .collect();
    for sup in class.supertypes() {
        let sup = if raw {
            Type::class(sup.class_name().unwrap_or(types::OBJECT))
        } else {
            sup.substitute(&bindings)
        };
        if let Some(found) = as_super(catalog, &sup, target) {
            return Some(found);
        }
    }
    None
}

/// The conversion used to assign a value of type `from` to a variable of
/// type `to`, or `None` if the assignment is not allowed.
pub fn assignment_conversion(
    catalog: &dyn MemberCatalog,
    to: &Type,
    from: &Type,
) -> Option<Conversion> {
    if to == from && !to.is_void() {
        return Some(Conversion::Identity);
    }
    if to.is_void() || from.is_void() {
        return None;
    }
    match (to.as_primitive(), from.as_primitive()) {
        (Some(t), Some(f)) => f.widens_to(t).then_some(Conversion::WideningPrimitive),
        (None, Some(f)) => {
            let boxed = Type::class(f.box_class());
            reference_conversion(catalog, to, &boxed).map(|_| Conversion::Boxing)
        }
        (Some(t), None) => {
            let unboxed = from.unboxed()?;
            (unboxed == t || unboxed.widens_to(t)).then_some(Conversion::Unboxing)
        }
        (None, None) => reference_conversion(catalog, to, from),
    }
}

/// Loose assignability: subtyping, primitive widening and boxing.
pub fn is_assignable(catalog: &dyn MemberCatalog, to: &Type, from: &Type) -> bool {
    assignment_conversion(catalog, to, from).is_some()
}

/// Strict assignability: no boxing or unboxing.
pub fn is_assignable_strict(catalog: &dyn MemberCatalog, to: &Type, from: &Type) -> bool {
    assignment_conversion(catalog, to, from).is_some_and(Conversion::is_strict)
}

fn reference_conversion(catalog: &dyn MemberCatalog, to: &Type, from: &Type) -> Option<Conversion> {
    if from.is_null() {
        return Some(Conversion::WideningReference);
    }
    if to.dims == 0 {
        match &to.kind {
            TypeKind::Wildcard { bound, upper } => {
                return match bound {
                    Some(b) if *upper => reference_conversion(catalog, b, from),
                    _ => Some(Conversion::WideningReference),
                };
            }
            TypeKind::Variable { name, bound } => {
                if let TypeKind::Variable { name: other, .. } = &from.kind {
                    if other == name && from.dims == 0 {
                        return Some(Conversion::Identity);
                    }
                }
                return reference_conversion(catalog, bound, from).map(|_| Conversion::Unchecked);
            }
            _ => {}
        }
    }
    if from.dims == 0 {
        match &from.kind {
            TypeKind::Variable { bound, .. } => return reference_conversion(catalog, to, bound),
            TypeKind::Wildcard { bound, upper } => {
                let upper_bound = match bound {
                    Some(b) if *upper => (**b).clone(),
                    _ => Type::object(),
                };
                return reference_conversion(catalog, to, &upper_bound);
            }
            _ => {}
        }
    }
    if to.is_class(types::OBJECT) {
        return Some(Conversion::WideningReference);
    }
    if to.dims > 0 || from.dims > 0 {
        let (Some(to_component), Some(from_component)) = (to.component(), from.component()) else {
            return None;
        };
        if to_component.is_primitive() || from_component.is_primitive() {
            return (to_component == from_component).then_some(Conversion::Identity);
        }
        return reference_conversion(catalog, &to_component, &from_component);
    }
    let target = to.class_name()?;
    let viewed = as_super(catalog, from, target)?;
    if to.args().is_empty() {
        return Some(Conversion::WideningReference);
    }
    if viewed.args().is_empty() {
        return Some(Conversion::Unchecked);
    }
    if to.args().len() != viewed.args().len() {
        return None;
    }
    let contained = to
        .args()
        .iter()
        .zip(viewed.args())
        .all(|(t, f)| contains(catalog, t, f));
    contained.then_some(Conversion::WideningReference)
}

/// Type-argument containment: `? extends Number` contains `Integer`,
/// a plain argument contains only itself.
fn contains(catalog: &dyn MemberCatalog, to: &Type, from: &Type) -> bool {
    match &to.kind {
        TypeKind::Wildcard { bound: None, .. } if to.dims == 0 => true,
        TypeKind::Wildcard {
            bound: Some(bound),
            upper: true,
        } if to.dims == 0 => match &from.kind {
            TypeKind::Wildcard {
                bound: Some(from_bound),
                upper: true,
            } => is_assignable(catalog, bound, from_bound),
            _ => is_assignable(catalog, bound, from),
        },
        TypeKind::Wildcard {
            bound: Some(bound),
            upper: false,
        } if to.dims == 0 => match &from.kind {
            TypeKind::Wildcard {
                bound: Some(from_bound),
                upper: false,
            } => is_assignable(catalog, from_bound, bound),
            _ => is_assignable(catalog, from, bound),
        },
        TypeKind::Variable { .. } => true,
        _ => to == from || matches!(from.kind, TypeKind::Variable { .. }),
    }
}

/// Whether a value of runtime type `actual` passes an `instanceof` test
/// or checked cast against `target`. Type arguments are not checked.
pub fn is_instance(catalog: &dyn MemberCatalog, target: &Type, actual: &Type) -> bool {
    if actual.is_null() {
        return false;
    }
    let erased_target = erase(target);
    let erased_actual = erase(actual);
    is_assignable_strict(catalog, &erased_target, &erased_actual)
}

/// Drop type arguments and replace variables by their bounds.
pub fn erase(ty: &Type) -> Type {
    match &ty.kind {
        TypeKind::Class { name, .. } => Type::class(name.clone()).array_of(ty.dims),
        TypeKind::Variable { bound, .. } => erase(bound).array_of(ty.dims),
        TypeKind::Wildcard { bound, upper } => match bound {
            Some(b) if *upper => erase(b).array_of(ty.dims),
            _ => Type::object().array_of(ty.dims),
        },
        _ => ty.clone(),
    }
}

/// The narrowest type assignable from both `a` and `b`. Primitives meet at
/// the wider type of the promotion ladder, references at their nearest
/// common supertype, and mixed operands through boxing.
pub fn common_type(catalog: &dyn MemberCatalog, a: &Type, b: &Type) -> Type {
    if a == b {
        return a.clone();
    }
    if a.is_null() {
        return b.boxed();
    }
    if b.is_null() {
        return a.boxed();
    }
    if let (Some(pa), Some(pb)) = (a.unboxed(), b.unboxed()) {
        if a.is_primitive() || b.is_primitive() {
            if pa.is_numeric() && pb.is_numeric() {
                return Type::primitive(Primitive::wider(pa, pb));
            }
            if pa == pb {
                return Type::primitive(pa);
            }
        }
    }
    let (a, b) = (a.boxed(), b.boxed());
    if is_assignable_strict(catalog, &a, &b) {
        return a;
    }
    if is_assignable_strict(catalog, &b, &a) {
        return b;
    }
    if a.dims > 0 && b.dims > 0 {
        if let (Some(ca), Some(cb)) = (a.component(), b.component()) {
            if ca.is_reference() && cb.is_reference() {
                return common_type(catalog, &ca, &cb).array_of(1);
            }
        }
        return Type::object();
    }
    for sup in superclass_chain(catalog, &a) {
        if is_assignable_strict(catalog, &sup, &b) {
            return sup;
        }
    }
    Type::object()
}

/// `ty` and its supertypes in breadth-first order, superclasses before
/// interfaces at each level.
pub fn superclass_chain(catalog: &dyn MemberCatalog, ty: &Type) -> Vec<Type> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([ty.clone()]);
    while let Some(current) = queue.pop_front() {
        if out.contains(&current) {
            continue;
        }
        if let Some(name) = current.class_name() {
            if let Some(class) = catalog.class(name) {
                let bindings: HashMap<String, Type> = class
                    .type_params
                    .iter()
                    .zip(current.args())
                    .map(|(p, a)| (p.name.clone(), a.clone()))
                    .collect();
                queue.extend(class.supertypes().iter().map(|s| s.substitute(&bindings)));
            }
        }
        out.push(current);
    }
    out
}

/// Checked exceptions must be caught or declared: `Throwable` subclasses
/// other than `RuntimeException` and `Error` and their subclasses.
pub fn is_checked_exception(catalog: &dyn MemberCatalog, ty: &Type) -> bool {
    let Some(name) = ty.class_name() else {
        return false;
    };
    is_subclass(catalog, name, types::THROWABLE)
        && !is_subclass(catalog, name, types::RUNTIME_EXCEPTION)
        && !is_subclass(catalog, name, types::ERROR)
}
