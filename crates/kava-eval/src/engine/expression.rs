//! Expressions: names, fields, arrays, assignment, casts and conditionals.

use std::rc::Rc;

use kava_ast::{AssignOp, Keyword, Literal, Node, NodeKind, TypeRef};
use kava_core::{Array, Field, Object, Primitive, Type, Value, Visibility, relations, types};

use super::{
    ARRAY_STORE, CLASS_CAST, Frame, INDEX_OUT_OF_BOUNDS, Interpreter, NEGATIVE_SIZE, Operand,
    ScriptClass, fail,
};
use crate::environment::Environment;
use crate::error::{EvalResult, EvaluationErrorKind};
use crate::evaluated::Evaluated;
use crate::resolve;

/// Something an assignment can store into.
pub(super) enum Place {
    Variable {
        name: String,
        ty: Type,
    },
    Field {
        field: Rc<Field>,
        receiver: Option<Value>,
        ty: Type,
    },
    ScriptField {
        object: Rc<Object>,
        name: String,
        ty: Type,
        is_final: bool,
    },
    Element {
        array: Option<Value>,
        index: i32,
        ty: Type,
    },
}

impl Place {
    pub fn ty(&self) -> &Type {
        match self {
            Place::Variable { ty, .. }
            | Place::Field { ty, .. }
            | Place::ScriptField { ty, .. }
            | Place::Element { ty, .. } => ty,
        }
    }
}

/// A `target.name` access: either storage or a qualified name.
enum Member {
    Place(Place),
    Result(Evaluated),
}

impl Interpreter<'_> {
    pub(super) fn eval(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
    ) -> EvalResult<Evaluated> {
        self.sink.node_evaluated(node.label());
        let operand = match &node.kind {
            NodeKind::Literal(literal) => self.literal(frame, literal),
            NodeKind::Identifier(name) => return self.identifier(env, frame, node, name),
            NodeKind::Keyword(Keyword::This) => self.this(frame, node)?,
            NodeKind::Type(ty) => return Ok(Evaluated::Static(self.resolve_type(env, ty)?)),
            NodeKind::FieldAccess { target, name } => {
                return match self.member(env, frame, node, target, name)? {
                    Member::Place(place) => Ok(self.load(env, frame, &place, node)?.into_evaluated()),
                    Member::Result(result) => Ok(result),
                };
            }
            NodeKind::ArrayIndex { .. } => {
                let place = self.place(env, frame, node)?;
                self.load(env, frame, &place, node)?
            }
            NodeKind::ArrayInit { ty, items } => {
                let ty = ty.as_ref().map(|t| self.resolve_type(env, t)).transpose()?;
                self.array_init(env, frame, node, ty, items)?
            }
            NodeKind::NewArray {
                element,
                sizes,
                dims,
                init,
            } => self.new_array(env, frame, node, element, sizes, *dims, init.as_deref())?,
            NodeKind::Assign { op, target, value } => match op {
                AssignOp::Assign => self.assign(env, frame, target, value)?,
                AssignOp::Compound(op) => self.compound(env, frame, node, *op, target, value)?,
            },
            NodeKind::Binary { op, left, right } => self.binary(env, frame, node, *op, left, right)?,
            NodeKind::Unary { op, operand } => self.unary(env, frame, node, *op, operand)?,
            NodeKind::Cast { ty, operand } => self.cast(env, frame, node, ty, operand)?,
            NodeKind::InstanceOf { operand, ty } => self.instance_of(env, frame, node, operand, ty)?,
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => self.conditional(env, frame, node, cond, then, otherwise)?,
            NodeKind::ClassLiteral(ty) => {
                let ty = self.type_node(env, ty)?;
                self.class_literal(frame, ty)
            }
            NodeKind::New { class, args, body } => match body {
                Some(members) => self.anonymous(env, frame, node, class, args, members)?,
                None => self.construct(env, frame, node, class, args)?,
            },
            NodeKind::MethodCall {
                target,
                type_args,
                name,
                args,
            } => self.method_call(env, frame, node, target.as_deref(), type_args, name, args)?,
            other => return fail(EvaluationErrorKind::Misplaced(other.label()), node),
        };
        Ok(operand.into_evaluated())
    }

    fn literal(&self, frame: &Frame, literal: &Literal) -> Operand {
        let value = frame.values.then(|| literal.value());
        Operand::new(literal.ty(), value)
    }

    fn this(&self, frame: &Frame, node: &Node) -> EvalResult<Operand> {
        match &frame.this {
            Some(object) => Ok(Operand::new(
                object.class().clone(),
                frame.values.then(|| Value::Object(Rc::clone(object))),
            )),
            None => fail(EvaluationErrorKind::ThisOutside, node),
        }
    }

    fn class_literal(&self, frame: &Frame, ty: Type) -> Operand {
        let class = Type::class_of(&ty);
        Operand::new(class, frame.values.then(|| Value::Class(Rc::new(ty))))
    }

    pub(super) fn visible(&self, env: &dyn Environment, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Private => false,
            Visibility::Protected | Visibility::Package => !env.use_public_only(),
        }
    }

    /// A simple name: variable, field of `this`, statically imported field,
    /// imported type, package, or nothing yet.
    fn identifier(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        name: &str,
    ) -> EvalResult<Evaluated> {
        if let Some(place) = self.named_place(env, frame, name)? {
            return Ok(self.load(env, frame, &place, node)?.into_evaluated());
        }
        if let Some(ty) = env.import_type(name) {
            return Ok(Evaluated::Static(ty));
        }
        if self.catalog.has_package(name) {
            return Ok(Evaluated::Package(name.to_string()));
        }
        Ok(Evaluated::Name(name.to_string()))
    }

    fn named_place(
        &self,
        env: &dyn Environment,
        frame: &Frame,
        name: &str,
    ) -> EvalResult<Option<Place>> {
        if let Some(variable) = env.variable(name) {
            return Ok(Some(Place::Variable {
                name: name.to_string(),
                ty: variable.ty,
            }));
        }
        if let Some(object) = &frame.this {
            if let Some(place) = self.script_field(object, name) {
                return Ok(Some(place));
            }
            if let Some((field, ty)) = resolve::field(self.catalog, object.class(), name) {
                if field.visibility != Visibility::Private {
                    let receiver = (!field.is_static).then(|| Value::Object(Rc::clone(object)));
                    return Ok(Some(Place::Field { field, receiver, ty }));
                }
            }
        }
        if let Some(owner) = env.import_method_type(name) {
            if let Some((field, ty)) = resolve::field(self.catalog, &owner, name) {
                if field.is_static && self.visible(env, field.visibility) {
                    return Ok(Some(Place::Field {
                        field,
                        receiver: None,
                        ty,
                    }));
                }
            }
        }
        Ok(None)
    }

    fn script_field(&self, object: &Rc<Object>, name: &str) -> Option<Place> {
        let class = object.opaque::<ScriptClass>()?;
        let field = class.fields.iter().find(|f| f.name == name)?;
        Some(Place::ScriptField {
            object: Rc::clone(object),
            name: field.name.clone(),
            ty: field.ty.clone(),
            is_final: field.is_final,
        })
    }

    fn member(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        target: &Node,
        name: &str,
    ) -> EvalResult<Member> {
        let receiver = match self.eval(env, frame, target)? {
            Evaluated::Package(package) => {
                let qualified = format!("{package}.{name}");
                if self.catalog.class(&qualified).is_some() {
                    return Ok(Member::Result(Evaluated::Static(Type::class(qualified))));
                }
                if self.catalog.has_package(&qualified) {
                    return Ok(Member::Result(Evaluated::Package(qualified)));
                }
                return fail(EvaluationErrorKind::Unresolved(qualified), node);
            }
            Evaluated::Name(unknown) => {
                return fail(EvaluationErrorKind::Unresolved(unknown), target);
            }
            Evaluated::Static(ty) => {
                if name == "class" {
                    let literal = self.class_literal(frame, ty);
                    return Ok(Member::Result(literal.into_evaluated()));
                }
                let Some((field, field_ty)) = resolve::field(self.catalog, &ty, name) else {
                    return fail(EvaluationErrorKind::UnknownField(name.to_string()), node);
                };
                if !field.is_static {
                    return fail(EvaluationErrorKind::NonStaticField(name.to_string()), node);
                }
                self.check_field_visible(env, &field, node)?;
                return Ok(Member::Place(Place::Field {
                    field,
                    receiver: None,
                    ty: field_ty,
                }));
            }
            Evaluated::Typed(ty) => Operand::typed(ty),
            Evaluated::Value(ty, value) => Operand::new(ty, Some(value)),
        };

        if let Some(p) = receiver.ty.as_primitive() {
            return fail(
                EvaluationErrorKind::PrimitiveReceiver {
                    name: name.to_string(),
                    ty: Type::primitive(p),
                },
                node,
            );
        }
        if receiver.ty.is_array() && name == "length" {
            let length = match &receiver.value {
                None => None,
                Some(Value::Array(array)) => Some(Value::Int(array.len() as i32)),
                Some(_) => return self.null_pointer(node),
            };
            return Ok(Member::Result(Operand::new(Type::int(), length).into_evaluated()));
        }
        if matches!(target.kind, NodeKind::Keyword(Keyword::This)) {
            if let Some(place) = frame.this.as_ref().and_then(|this| self.script_field(this, name)) {
                return Ok(Member::Place(place));
            }
        }
        let Some((field, ty)) = resolve::field(self.catalog, &receiver.ty, name) else {
            return fail(EvaluationErrorKind::UnknownField(name.to_string()), node);
        };
        if field.is_static {
            return fail(
                EvaluationErrorKind::StaticFieldFromInstance {
                    owner: types::simple_name(&field.declaring).to_string(),
                    name: name.to_string(),
                },
                node,
            );
        }
        self.check_field_visible(env, &field, node)?;
        Ok(Member::Place(Place::Field {
            field,
            receiver: receiver.value,
            ty,
        }))
    }

    fn check_field_visible(&self, env: &dyn Environment, field: &Field, node: &Node) -> EvalResult<()> {
        if self.visible(env, field.visibility) {
            return Ok(());
        }
        fail(
            EvaluationErrorKind::InvisibleField {
                owner: types::simple_name(&field.declaring).to_string(),
                name: field.name.clone(),
            },
            node,
        )
    }

    /// Resolve an assignment target. Declarations are declared on the way.
    pub(super) fn place(&self, env: &mut dyn Environment, frame: &Frame, node: &Node) -> EvalResult<Place> {
        match &node.kind {
            NodeKind::Identifier(name) => match self.named_place(env, frame, name)? {
                Some(place) => Ok(place),
                None => fail(EvaluationErrorKind::UnresolvedVariable(name.clone()), node),
            },
            NodeKind::Declaration(declaration) => {
                let ty = self.resolve_type(env, &declaration.ty)?;
                env.declare_variable(&declaration.name, ty.clone(), declaration.is_final, node)?;
                Ok(Place::Variable {
                    name: declaration.name.clone(),
                    ty,
                })
            }
            NodeKind::FieldAccess { target, name } => match self.member(env, frame, node, target, name)? {
                Member::Place(place) => Ok(place),
                Member::Result(Evaluated::Typed(_) | Evaluated::Value(..)) if name == "length" => {
                    fail(EvaluationErrorKind::FinalAssignment(name.clone()), node)
                }
                Member::Result(_) => fail(EvaluationErrorKind::InvalidTarget, node),
            },
            NodeKind::ArrayIndex { array, index } => {
                let array_operand = self.operand(env, frame, array)?;
                let Some(element) = array_operand.ty.component() else {
                    return fail(EvaluationErrorKind::NotAnArray(array_operand.ty), array);
                };
                let index = self.index(env, frame, index)?;
                Ok(Place::Element {
                    array: array_operand.value,
                    index,
                    ty: element,
                })
            }
            _ => fail(EvaluationErrorKind::InvalidTarget, node),
        }
    }

    /// An array index or size: promoted to `int`.
    fn index(&self, env: &mut dyn Environment, frame: &Frame, node: &Node) -> EvalResult<i32> {
        let operand = self.operand(env, frame, node)?;
        match operand.ty.integral().map(Primitive::promote) {
            Some(Primitive::Int) => {}
            _ => {
                return fail(
                    EvaluationErrorKind::TypeMismatch {
                        from: operand.ty,
                        to: Type::int(),
                    },
                    node,
                );
            }
        }
        match operand.value {
            None => Ok(0),
            Some(Value::Null) => self.null_pointer(node),
            Some(value) => Ok(value.as_i64().unwrap_or(0) as i32),
        }
    }

    pub(super) fn load(
        &self,
        env: &dyn Environment,
        frame: &Frame,
        place: &Place,
        node: &Node,
    ) -> EvalResult<Operand> {
        match place {
            Place::Variable { name, ty } => {
                let variable = env.variable(name);
                let assigned = variable.as_ref().is_some_and(|v| v.assigned);
                if !assigned {
                    return fail(EvaluationErrorKind::Uninitialized(name.clone()), node);
                }
                if !frame.values {
                    return Ok(Operand::typed(ty.clone()));
                }
                match variable.and_then(|v| v.value) {
                    Some(value) => Ok(Operand::new(ty.clone(), Some(value))),
                    None => fail(EvaluationErrorKind::Uninitialized(name.clone()), node),
                }
            }
            _ if !frame.values => Ok(Operand::typed(place.ty().clone())),
            Place::Field {
                field,
                receiver,
                ty,
            } => {
                let value = self
                    .catalog
                    .get_field(field, receiver.as_ref())
                    .map_err(|thrown| self.thrown(thrown, node))?;
                Ok(Operand::new(ty.clone(), Some(value)))
            }
            Place::ScriptField {
                object, name, ty, ..
            } => {
                let value = object.field(name).unwrap_or_else(|| Value::default_for(ty));
                Ok(Operand::new(ty.clone(), Some(value)))
            }
            Place::Element { array, index, ty } => {
                let array = self.element_array(array.as_ref(), *index, node)?;
                let value = array.get(*index as usize).unwrap_or(Value::Null);
                Ok(Operand::new(ty.clone(), Some(value)))
            }
        }
    }

    fn element_array(&self, array: Option<&Value>, index: i32, node: &Node) -> EvalResult<Rc<Array>> {
        let Some(Value::Array(array)) = array else {
            return self.null_pointer(node);
        };
        if index < 0 || index as usize >= array.len() {
            return self.raise(
                INDEX_OUT_OF_BOUNDS,
                Some(format!("Index {index} out of bounds for length {}", array.len())),
                node,
            );
        }
        Ok(Rc::clone(array))
    }

    /// Store into a place. `value` is `None` in type-only mode.
    pub(super) fn store(
        &self,
        env: &mut dyn Environment,
        place: &Place,
        value: Option<Value>,
        node: &Node,
    ) -> EvalResult<()> {
        match place {
            Place::Variable { name, .. } => env.set_variable(name, value, node),
            Place::Field { field, receiver, .. } => {
                if field.is_final {
                    return fail(EvaluationErrorKind::FinalAssignment(field.name.clone()), node);
                }
                let Some(value) = value else {
                    return Ok(());
                };
                self.catalog
                    .set_field(field, receiver.as_ref(), value)
                    .map_err(|thrown| self.thrown(thrown, node))
            }
            Place::ScriptField {
                object,
                name,
                is_final,
                ..
            } => {
                if *is_final {
                    return fail(EvaluationErrorKind::FinalAssignment(name.clone()), node);
                }
                if let Some(value) = value {
                    object.set_field(name.clone(), value);
                }
                Ok(())
            }
            Place::Element { array, index, ty } => {
                let Some(value) = value else {
                    return Ok(());
                };
                let array = self.element_array(array.as_ref(), *index, node)?;
                let element = array.element().clone();
                if element.is_reference() && !value.is_null() {
                    let actual = self.catalog.runtime_type(&value);
                    if !relations::is_instance(self.catalog, &element, &actual) {
                        return self.raise(ARRAY_STORE, Some(actual.qualified()), node);
                    }
                }
                let value = self.coerce(value, ty, node)?;
                array.set(*index as usize, value);
                Ok(())
            }
        }
    }

    /// Evaluate `node` as the value of a slot of type `to`: array
    /// initializers take the slot type, constants may narrow.
    pub(super) fn value_for(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        to: &Type,
        node: &Node,
    ) -> EvalResult<Option<Value>> {
        let operand = match &node.kind {
            NodeKind::ArrayInit { ty: None, items } => {
                if !to.is_array() {
                    return fail(EvaluationErrorKind::NotAnArray(to.clone()), node);
                }
                self.array_init(env, frame, node, Some(to.clone()), items)?
            }
            _ => self.operand(env, frame, node)?,
        };
        self.check_assignable(to, &operand.ty, node)?;
        operand
            .value
            .map(|value| self.coerce(value, to, node))
            .transpose()
    }

    fn assign(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        target: &Node,
        value: &Node,
    ) -> EvalResult<Operand> {
        let place = self.place(env, frame, target)?;
        let ty = place.ty().clone();
        let value = self.value_for(env, frame, &ty, value)?;
        self.store(env, &place, value.clone(), target)?;
        Ok(Operand::new(ty, value))
    }

    fn array_init(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        ty: Option<Type>,
        items: &[Node],
    ) -> EvalResult<Operand> {
        let ty = match ty {
            Some(ty) => ty,
            None => {
                let mut element: Option<Type> = None;
                for item in items {
                    let item_ty = self.operand(env, &frame.typed(), item)?.ty;
                    element = Some(match element {
                        Some(sofar) => relations::common_type(self.catalog, &sofar, &item_ty),
                        None => item_ty,
                    });
                }
                element.unwrap_or_else(Type::object).array_of(1)
            }
        };
        let Some(element) = ty.component() else {
            return fail(EvaluationErrorKind::NotAnArray(ty), node);
        };
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(self.value_for(env, frame, &element, item)?);
        }
        if !frame.values {
            return Ok(Operand::typed(ty));
        }
        let values = values.into_iter().map(|v| v.unwrap_or(Value::Null)).collect();
        Ok(Operand::new(ty, Some(Value::Array(Array::new(element, values)))))
    }

    #[allow(clippy::too_many_arguments)]
    fn new_array(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        element: &TypeRef,
        sizes: &[Node],
        dims: u32,
        init: Option<&Node>,
    ) -> EvalResult<Operand> {
        let element = self.resolve_type(env, element)?;
        let ty = element.array_of(dims);
        if let Some(init) = init {
            let items = match &init.kind {
                NodeKind::ArrayInit { items, .. } => items,
                _ => return fail(EvaluationErrorKind::Misplaced(init.label()), init),
            };
            return self.array_init(env, frame, init, Some(ty), items);
        }
        let mut lengths = Vec::with_capacity(sizes.len());
        for size in sizes {
            lengths.push(self.index(env, frame, size)?);
        }
        if !frame.values {
            return Ok(Operand::typed(ty));
        }
        if let Some(negative) = lengths.iter().find(|n| **n < 0) {
            return self.raise(NEGATIVE_SIZE, Some(negative.to_string()), node);
        }
        Ok(Operand::new(ty.clone(), Some(allocate(&ty, &lengths))))
    }

    fn cast(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        ty: &Node,
        operand: &Node,
    ) -> EvalResult<Operand> {
        let to = self.type_node(env, ty)?;
        let from = self.operand(env, frame, operand)?;
        let invalid = || {
            fail(
                EvaluationErrorKind::InvalidCast {
                    from: from.ty.clone(),
                    to: to.clone(),
                },
                node,
            )
        };
        if to.is_void() || from.ty.is_void() {
            return invalid();
        }
        match (to.as_primitive(), from.ty.as_primitive()) {
            (Some(t), Some(f)) => {
                if (t == Primitive::Boolean) != (f == Primitive::Boolean) {
                    return invalid();
                }
            }
            (Some(t), None) => {
                let boxed = Type::class(t.box_class());
                let unboxes = from.ty.unboxed().is_some_and(|u| u == t || u.widens_to(t));
                if !unboxes && !self.castable(&boxed, &from.ty) {
                    return invalid();
                }
                if let Some(value) = &from.value {
                    if value.is_null() {
                        return self.null_pointer(node);
                    }
                    if from.ty.unboxed().is_none() {
                        self.check_instance(&boxed, value, node)?;
                    }
                }
            }
            (None, Some(_)) => {
                if !relations::is_assignable(self.catalog, &to, &from.ty) {
                    return invalid();
                }
            }
            (None, None) => {
                if !self.castable(&to, &from.ty) {
                    return invalid();
                }
                if let Some(value) = &from.value {
                    if !value.is_null() {
                        self.check_instance(&to, value, node)?;
                    }
                }
            }
        }
        let value = from
            .value
            .map(|value| self.coerce(value, &to, node))
            .transpose()?;
        Ok(Operand::new(to, value))
    }

    fn check_instance(&self, to: &Type, value: &Value, node: &Node) -> EvalResult<()> {
        let actual = self.catalog.runtime_type(value);
        if relations::is_instance(self.catalog, to, &actual) {
            return Ok(());
        }
        self.raise(
            CLASS_CAST,
            Some(format!(
                "class {} cannot be cast to class {}",
                relations::erase(&actual).qualified(),
                relations::erase(to).qualified()
            )),
            node,
        )
    }

    fn instance_of(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        operand: &Node,
        ty: &Node,
    ) -> EvalResult<Operand> {
        let target = self.type_node(env, ty)?;
        let operand = self.operand(env, frame, operand)?;
        if operand.ty.is_primitive() || target.is_primitive() || !self.castable(&target, &operand.ty) {
            return fail(
                EvaluationErrorKind::IncompatibleOperands {
                    left: operand.ty,
                    right: target,
                },
                node,
            );
        }
        let value = operand.value.map(|value| {
            let matches = !value.is_null()
                && relations::is_instance(self.catalog, &target, &self.catalog.runtime_type(&value));
            Value::Boolean(matches)
        });
        Ok(Operand::new(Type::boolean(), value))
    }

    fn conditional(
        &self,
        env: &mut dyn Environment,
        frame: &Frame,
        node: &Node,
        cond: &Node,
        then: &Node,
        otherwise: &Node,
    ) -> EvalResult<Operand> {
        let taken = self.condition(env, frame, cond)?;
        let left = self.branch(env, frame, taken == Some(true), then)?;
        let right = self.branch(env, frame, taken == Some(false), otherwise)?;
        let ty = self.conditional_type(&left.ty, &right.ty, node)?;
        let value = left.value.or(right.value);
        let value = value.map(|v| self.coerce(v, &ty, node)).transpose()?;
        Ok(Operand::new(ty, value))
    }

    /// One arm of `?:`. An arm not taken is only type-checked.
    fn branch(&self, env: &mut dyn Environment, frame: &Frame, taken: bool, node: &Node) -> EvalResult<Operand> {
        if taken {
            return self.operand(env, frame, node);
        }
        let mut check = env.snapshot();
        self.operand(check.as_mut(), &frame.typed(), node)
    }

    fn conditional_type(&self, left: &Type, right: &Type, node: &Node) -> EvalResult<Type> {
        if left.is_void() || right.is_void() {
            return fail(
                EvaluationErrorKind::IncompatibleOperands {
                    left: left.clone(),
                    right: right.clone(),
                },
                node,
            );
        }
        if left == right {
            return Ok(left.clone());
        }
        if let (Some(l), Some(r)) = (left.numeric(), right.numeric()) {
            return Ok(Type::primitive(Primitive::wider(l, r)));
        }
        if left.unboxed() == Some(Primitive::Boolean) && right.unboxed() == Some(Primitive::Boolean) {
            return Ok(Type::boolean());
        }
        Ok(relations::common_type(self.catalog, &left.boxed(), &right.boxed()))
    }
}

/// A new array of type `ty` with the leading dimensions sized by `lengths`.
fn allocate(ty: &Type, lengths: &[i32]) -> Value {
    let (Some((&length, rest)), Some(component)) = (lengths.split_first(), ty.component()) else {
        return Value::default_for(ty);
    };
    if rest.is_empty() {
        return Value::Array(Array::filled(component, length as usize));
    }
    let items = (0..length).map(|_| allocate(&component, rest)).collect();
    Value::Array(Array::new(component, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_sizes_leading_dimensions() {
        let ty = Type::int().array_of(3);
        let Value::Array(outer) = allocate(&ty, &[2, 3]) else {
            panic!("not an array");
        };
        assert_eq!(outer.len(), 2);
        let Some(Value::Array(inner)) = outer.get(1) else {
            panic!("not an array");
        };
        assert_eq!(inner.len(), 3);
        assert_eq!(inner.element(), &Type::int().array_of(1));
        assert!(matches!(inner.get(0), Some(Value::Null)));
    }

    #[test]
    fn allocate_fills_defaults() {
        let Value::Array(array) = allocate(&Type::primitive(Primitive::Char).array_of(1), &[2]) else {
            panic!("not an array");
        };
        assert!(matches!(array.get(1), Some(Value::Char(0))));
    }
}
