//! Member lookup, overload selection and generic inference.
//!
//! Lookup walks the receiver's supertypes and carries their type arguments
//! along, so a member declared on `List<E>` is seen with `E` bound to the
//! receiver's argument. Selection then runs in three phases, as a Java
//! compiler would: strict (no boxing), loose (boxing allowed), and variable
//! arity. Within the first phase that accepts any candidate, the most
//! specific candidate wins.

use std::collections::HashMap;
use std::rc::Rc;

use kava_core::{Field, MemberCatalog, Method, Type, TypeKind, TypeParam, relations};

/// The parameter types of one candidate, after substitution.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub varargs: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Strict,
    Loose,
    Varargs,
}

impl Signature {
    pub fn new(params: Vec<Type>, varargs: bool) -> Self {
        Self { params, varargs }
    }

    /// Element type of the variable-arity parameter.
    pub fn element(&self) -> Option<Type> {
        if !self.varargs {
            return None;
        }
        self.params.last().and_then(Type::component)
    }

    /// The formal type argument `index` is matched against when `count`
    /// arguments are passed in `phase`.
    pub fn formal(&self, index: usize, phase: Phase) -> Option<Type> {
        let fixed = self.params.len().saturating_sub(1);
        if phase == Phase::Varargs && index >= fixed {
            return self.element();
        }
        self.params.get(index).cloned()
    }

    pub fn applies(&self, catalog: &dyn MemberCatalog, args: &[Type], phase: Phase) -> bool {
        match phase {
            Phase::Strict | Phase::Loose => {
                args.len() == self.params.len()
                    && self
                        .params
                        .iter()
                        .zip(args)
                        .all(|(p, a)| convertible(catalog, p, a, phase))
            }
            Phase::Varargs => {
                self.varargs
                    && args.len() + 1 >= self.params.len()
                    && args.iter().enumerate().all(|(i, a)| {
                        self.formal(i, phase)
                            .is_some_and(|p| convertible(catalog, &p, a, phase))
                    })
            }
        }
    }
}

fn convertible(catalog: &dyn MemberCatalog, to: &Type, from: &Type, phase: Phase) -> bool {
    match phase {
        Phase::Strict => relations::is_assignable_strict(catalog, to, from),
        Phase::Loose | Phase::Varargs => relations::is_assignable(catalog, to, from),
    }
}

pub enum Selection<T> {
    Found {
        member: T,
        signature: Signature,
        phase: Phase,
    },
    /// Several applicable candidates, none more specific than the others.
    Ambiguous,
    NotApplicable,
}

/// Pick the best candidate for `args`.
pub fn select<T: Clone>(
    catalog: &dyn MemberCatalog,
    candidates: &[(T, Signature)],
    args: &[Type],
) -> Selection<T> {
    for phase in [Phase::Strict, Phase::Loose, Phase::Varargs] {
        let applicable: Vec<&(T, Signature)> = candidates
            .iter()
            .filter(|(_, signature)| signature.applies(catalog, args, phase))
            .collect();
        if applicable.is_empty() {
            continue;
        }
        let best = applicable.iter().find(|(_, a)| {
            applicable
                .iter()
                .all(|(_, b)| more_specific(catalog, a, b, args.len(), phase))
        });
        return match best {
            Some((member, signature)) => Selection::Found {
                member: member.clone(),
                signature: signature.clone(),
                phase,
            },
            None => Selection::Ambiguous,
        };
    }
    Selection::NotApplicable
}

fn more_specific(
    catalog: &dyn MemberCatalog,
    a: &Signature,
    b: &Signature,
    count: usize,
    phase: Phase,
) -> bool {
    let positions = match phase {
        Phase::Varargs => count.max(a.params.len()).max(b.params.len()),
        _ => a.params.len(),
    };
    (0..positions).all(|i| match (a.formal(i, phase), b.formal(i, phase)) {
        (Some(x), Some(y)) => relations::is_assignable_strict(catalog, &y, &x),
        _ => true,
    })
}

/// A method or constructor as seen from one receiver type.
#[derive(Clone, Debug)]
pub struct Member {
    pub method: Rc<Method>,
    /// Declaring class's type variables bound from the receiver type.
    pub bindings: HashMap<String, Type>,
}

impl Member {
    fn seen(method: &Rc<Method>, class_bindings: &HashMap<String, Type>) -> Self {
        let mut bindings = if method.is_static && !method.is_constructor() {
            HashMap::new()
        } else {
            class_bindings.clone()
        };
        for param in &method.type_params {
            bindings.remove(&param.name);
        }
        Self {
            method: Rc::clone(method),
            bindings,
        }
    }

    fn declared_signature(&self) -> Signature {
        Signature::new(
            self.method
                .params
                .iter()
                .map(|p| p.substitute(&self.bindings))
                .collect(),
            self.method.varargs,
        )
    }

    /// The signature used for applicability checks against `args`, with
    /// method type variables inferred (or taken from `explicit`), and the
    /// bindings that produced it.
    pub fn instantiate(
        &self,
        catalog: &dyn MemberCatalog,
        args: &[Type],
        explicit: &[Type],
    ) -> (Signature, HashMap<String, Type>) {
        let declared = self.declared_signature();
        let type_params = &self.method.type_params;
        let mut bindings = if !explicit.is_empty() && explicit.len() == type_params.len() {
            type_params
                .iter()
                .map(|p| p.name.clone())
                .zip(explicit.iter().cloned())
                .collect()
        } else {
            infer(catalog, type_params, &declared, args)
        };
        for param in type_params {
            bindings
                .entry(param.name.clone())
                .or_insert_with(|| close(&param.bound));
        }
        let signature = Signature::new(
            declared
                .params
                .iter()
                .map(|p| close(&p.substitute(&bindings)))
                .collect(),
            declared.varargs,
        );
        (signature, bindings)
    }

    /// Return type under the method bindings from [`Member::instantiate`].
    pub fn return_type(&self, method_bindings: &HashMap<String, Type>) -> Type {
        if self.method.is_constructor() {
            return self.method.ret.clone();
        }
        close(
            &self
                .method
                .ret
                .substitute(&self.bindings)
                .substitute(method_bindings),
        )
    }

    pub fn throws(&self) -> Vec<Type> {
        self.method
            .throws
            .iter()
            .map(|t| close(&t.substitute(&self.bindings)))
            .collect()
    }
}

/// Replace type variables by their bounds, keeping wildcards.
pub fn close(ty: &Type) -> Type {
    match &ty.kind {
        TypeKind::Variable { bound, .. } => close(bound).array_of(ty.dims),
        TypeKind::Class { name, args } => Type {
            kind: TypeKind::Class {
                name: name.clone(),
                args: args.iter().map(close).collect(),
            },
            dims: ty.dims,
        },
        TypeKind::Wildcard { bound, upper } => Type {
            kind: TypeKind::Wildcard {
                bound: bound.as_ref().map(|b| Box::new(close(b))),
                upper: *upper,
            },
            dims: ty.dims,
        },
        _ => ty.clone(),
    }
}

/// Bindings of the class declaring `sup`'s members, from `sup`'s arguments.
/// Raw types bind every parameter to its bound.
fn class_bindings(params: &[TypeParam], sup: &Type) -> HashMap<String, Type> {
    if sup.args().is_empty() {
        return params
            .iter()
            .map(|p| (p.name.clone(), close(&p.bound)))
            .collect();
    }
    params
        .iter()
        .zip(sup.args())
        .map(|(p, a)| (p.name.clone(), a.clone()))
        .collect()
}

/// The type whose supertypes are searched for members of `ty`.
fn lookup_view(ty: &Type) -> Type {
    if ty.is_array() {
        Type::object()
    } else {
        match &ty.kind {
            TypeKind::Variable { .. } | TypeKind::Wildcard { .. } => ty.erase_variables(),
            _ => ty.clone(),
        }
    }
}

/// Methods named `name` on `ty` and its supertypes, most derived first.
/// A method overridden further down the hierarchy is listed once.
pub fn methods_named(catalog: &dyn MemberCatalog, ty: &Type, name: &str) -> Vec<Member> {
    let mut found: Vec<Member> = Vec::new();
    for sup in relations::superclass_chain(catalog, &lookup_view(ty)) {
        let Some(class) = sup.class_name().and_then(|n| catalog.class(n)) else {
            continue;
        };
        let bindings = class_bindings(&class.type_params, &sup);
        for method in class.methods.iter().filter(|m| m.name == name) {
            let member = Member::seen(method, &bindings);
            let erased: Vec<Type> = member
                .declared_signature()
                .params
                .iter()
                .map(relations::erase)
                .collect();
            let overridden = found.iter().any(|other| {
                let theirs: Vec<Type> = other
                    .declared_signature()
                    .params
                    .iter()
                    .map(relations::erase)
                    .collect();
                theirs == erased
            });
            if !overridden {
                found.push(member);
            }
        }
    }
    found
}

/// Constructors of the class `ty` names.
pub fn constructors(catalog: &dyn MemberCatalog, ty: &Type) -> Vec<Member> {
    let Some(class) = ty.class_name().and_then(|n| catalog.class(n)) else {
        return Vec::new();
    };
    let bindings = class_bindings(&class.type_params, ty);
    class
        .constructors
        .iter()
        .map(|ctor| Member::seen(ctor, &bindings))
        .collect()
}

/// The field `name` on `ty` or its supertypes, with its type as seen from
/// `ty`.
pub fn field(catalog: &dyn MemberCatalog, ty: &Type, name: &str) -> Option<(Rc<Field>, Type)> {
    if ty.is_array() {
        return None;
    }
    relations::superclass_chain(catalog, &lookup_view(ty))
        .into_iter()
        .find_map(|sup| {
            let class = catalog.class(sup.class_name()?)?;
            let field = class.declared_field(name)?;
            let bindings = class_bindings(&class.type_params, &sup);
            let ty = close(&field.ty.substitute(&bindings));
            Some((Rc::clone(field), ty))
        })
}

/// Infer method type arguments by matching formal parameter shapes against
/// argument types.
pub fn infer(
    catalog: &dyn MemberCatalog,
    type_params: &[TypeParam],
    declared: &Signature,
    args: &[Type],
) -> HashMap<String, Type> {
    let mut out = HashMap::new();
    if type_params.is_empty() {
        return out;
    }
    let names: Vec<&str> = type_params.iter().map(|p| p.name.as_str()).collect();
    let spread = declared.varargs
        && !(args.len() == declared.params.len() && args.last().is_some_and(Type::is_array));
    let phase = if spread { Phase::Varargs } else { Phase::Loose };
    for (i, actual) in args.iter().enumerate() {
        if let Some(formal) = declared.formal(i, phase) {
            collect(catalog, &names, &formal, actual, &mut out);
        }
    }
    out
}

fn collect(
    catalog: &dyn MemberCatalog,
    names: &[&str],
    formal: &Type,
    actual: &Type,
    out: &mut HashMap<String, Type>,
) {
    if actual.is_null() {
        return;
    }
    if formal.dims > 0 {
        if let (Some(f), Some(a)) = (formal.component(), actual.component()) {
            let primitive_into_variable =
                a.is_primitive() && matches!(f.kind, TypeKind::Variable { .. }) && f.dims == 0;
            if !primitive_into_variable {
                collect(catalog, names, &f, &a, out);
            }
        }
        return;
    }
    match &formal.kind {
        TypeKind::Variable { name, .. } if names.contains(&name.as_str()) => {
            let actual = match &actual.kind {
                TypeKind::Wildcard { .. } => actual.erase_variables(),
                _ => actual.boxed(),
            };
            let merged = match out.get(name) {
                Some(existing) => relations::common_type(catalog, existing, &actual),
                None => actual,
            };
            out.insert(name.clone(), merged);
        }
        TypeKind::Wildcard {
            bound: Some(bound), ..
        } => collect(catalog, names, bound, actual, out),
        TypeKind::Class { name, args } if !args.is_empty() => {
            let Some(viewed) = relations::as_super(catalog, &actual.boxed(), name) else {
                return;
            };
            for (f, a) in args.iter().zip(viewed.args()) {
                let a = match &a.kind {
                    TypeKind::Wildcard {
                        bound: Some(bound), ..
                    } => bound.as_ref(),
                    _ => a,
                };
                collect(catalog, names, f, a, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use kava_core::Primitive;
    use kava_runtime::Runtime;

    use super::*;

    fn sig(params: Vec<Type>, varargs: bool) -> Signature {
        Signature::new(params, varargs)
    }

    fn long() -> Type {
        Type::primitive(Primitive::Long)
    }

    fn chosen(selection: Selection<&'static str>) -> Option<(&'static str, Phase)> {
        match selection {
            Selection::Found { member, phase, .. } => Some((member, phase)),
            _ => None,
        }
    }

    #[test]
    fn narrower_primitive_wins_regardless_of_order() {
        let rt = Runtime::captured();
        let int_first = [("int", sig(vec![Type::int()], false)), ("long", sig(vec![long()], false))];
        let long_first = [("long", sig(vec![long()], false)), ("int", sig(vec![Type::int()], false))];
        for candidates in [&int_first, &long_first] {
            let selection = select(&rt, candidates.as_slice(), &[Type::int()]);
            assert_eq!(chosen(selection), Some(("int", Phase::Strict)));
        }
        let selection = select(&rt, &int_first, &[long()]);
        assert_eq!(chosen(selection), Some(("long", Phase::Strict)));
    }

    #[test]
    fn fixed_arity_beats_varargs() {
        let rt = Runtime::captured();
        let candidates = [
            ("varargs", sig(vec![Type::int().array_of(1)], true)),
            ("pair", sig(vec![Type::int(), Type::int()], false)),
        ];
        let pair = select(&rt, &candidates, &[Type::int(), Type::int()]);
        assert_eq!(chosen(pair), Some(("pair", Phase::Strict)));
        let triple = select(&rt, &candidates, &[Type::int(), Type::int(), Type::int()]);
        assert_eq!(chosen(triple), Some(("varargs", Phase::Varargs)));
        let none = select(&rt, &candidates, &[]);
        assert_eq!(chosen(none), Some(("varargs", Phase::Varargs)));
    }

    #[test]
    fn boxing_only_in_the_loose_phase() {
        let rt = Runtime::captured();
        let candidates = [
            ("object", sig(vec![Type::object()], false)),
            ("long", sig(vec![long()], false)),
        ];
        let selection = select(&rt, &candidates, &[Type::int()]);
        assert_eq!(chosen(selection), Some(("long", Phase::Strict)));
        let selection = select(&rt, &candidates, &[Type::boolean()]);
        assert_eq!(chosen(selection), Some(("object", Phase::Loose)));
    }

    #[test]
    fn unrelated_candidates_are_ambiguous() {
        let rt = Runtime::captured();
        let candidates = [
            ("chars", sig(vec![Type::primitive(Primitive::Char).array_of(1)], false)),
            ("string", sig(vec![Type::string()], false)),
        ];
        assert!(matches!(
            select(&rt, &candidates, &[Type::null()]),
            Selection::Ambiguous
        ));
    }

    #[test]
    fn inherited_methods_see_receiver_arguments() {
        let rt = Runtime::captured();
        let list = Type::generic("java.util.ArrayList", vec![Type::string()]);
        let get = methods_named(&rt, &list, "get");
        assert_eq!(get.len(), 1);
        let (signature, bindings) = get[0].instantiate(&rt, &[Type::int()], &[]);
        assert_eq!(signature.params, vec![Type::int()]);
        assert_eq!(get[0].return_type(&bindings), Type::string());

        let raw = methods_named(&rt, &Type::class("java.util.ArrayList"), "get");
        assert_eq!(raw[0].return_type(&HashMap::new()), Type::object());
    }

    #[test]
    fn generic_static_methods_infer_from_arguments() {
        let rt = Runtime::captured();
        let as_list = methods_named(&rt, &Type::class("java.util.Arrays"), "asList");
        let member = &as_list[0];
        let args = [Type::int(), Type::int()];
        let (signature, bindings) = member.instantiate(&rt, &args, &[]);
        let integer = Type::class("java.lang.Integer");
        assert_eq!(bindings.get("T"), Some(&integer));
        assert_eq!(signature.element(), Some(integer.clone()));
        assert_eq!(
            member.return_type(&bindings),
            Type::generic("java.util.List", vec![integer])
        );

        let mixed = [Type::string(), Type::int()];
        let (_, bindings) = member.instantiate(&rt, &mixed, &[]);
        assert_eq!(bindings.get("T"), Some(&Type::object()));
    }

    #[test]
    fn fields_carry_their_declared_type() {
        let rt = Runtime::captured();
        let (x, ty) = field(&rt, &Type::class("java.awt.Point"), "x").unwrap();
        assert_eq!(ty, Type::int());
        assert!(!x.is_static);
        assert!(field(&rt, &Type::int().array_of(1), "length").is_none());
    }
}
