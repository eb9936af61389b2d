//! Computed values.
//!
//! Primitive values are stored unboxed; a boxed `Integer` is simply an
//! `Int` value seen through a reference type. Arrays and objects are shared
//! (`Rc`) and mutated in place, and each carries a reentrant monitor used by
//! `synchronized` blocks.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::types::{Primitive, Type};

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Rc<str>),
    Array(Rc<Array>),
    Object(Rc<Object>),
    /// A `java.lang.Class` instance describing the given type.
    Class(Rc<Type>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The primitive this value is an instance of, if any.
    pub fn primitive(&self) -> Option<Primitive> {
        Some(match self {
            Value::Boolean(_) => Primitive::Boolean,
            Value::Byte(_) => Primitive::Byte,
            Value::Short(_) => Primitive::Short,
            Value::Char(_) => Primitive::Char,
            Value::Int(_) => Primitive::Int,
            Value::Long(_) => Primitive::Long,
            Value::Float(_) => Primitive::Float,
            Value::Double(_) => Primitive::Double,
            _ => return None,
        })
    }

    /// The default value of a field or array element of type `ty`.
    pub fn default_for(ty: &Type) -> Value {
        match ty.as_primitive() {
            Some(Primitive::Boolean) => Value::Boolean(false),
            Some(Primitive::Byte) => Value::Byte(0),
            Some(Primitive::Short) => Value::Short(0),
            Some(Primitive::Char) => Value::Char(0),
            Some(Primitive::Int) => Value::Int(0),
            Some(Primitive::Long) => Value::Long(0),
            Some(Primitive::Float) => Value::Float(0.0),
            Some(Primitive::Double) => Value::Double(0.0),
            _ => Value::Null,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        Some(match self {
            Value::Byte(v) => *v as i64,
            Value::Short(v) => *v as i64,
            Value::Char(v) => *v as i64,
            Value::Int(v) => *v as i64,
            Value::Long(v) => *v,
            _ => return None,
        })
    }

    /// Numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<Object>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Rc<Array>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Primitive conversion with the C-family cast semantics: integral
    /// narrowing keeps the low bits, floating to integral truncates toward
    /// zero and saturates, `NaN` becomes zero. Narrowing from floating point
    /// to `byte`, `short` or `char` goes through `int` first.
    pub fn convert(&self, to: Primitive) -> Option<Value> {
        if to == Primitive::Boolean {
            return self.as_bool().map(Value::Boolean);
        }
        if let Some(p) = self.primitive() {
            if p == to {
                return Some(self.clone());
            }
        }
        let value = match self {
            Value::Float(_) | Value::Double(_) => {
                let f = self.as_f64()?;
                match to {
                    Primitive::Float => Value::Float(f as f32),
                    Primitive::Double => Value::Double(f),
                    Primitive::Long => Value::Long(f as i64),
                    Primitive::Int => Value::Int(f as i32),
                    Primitive::Short => Value::Short((f as i32) as i16),
                    Primitive::Byte => Value::Byte((f as i32) as i8),
                    Primitive::Char => Value::Char((f as i32) as u16),
                    _ => return None,
                }
            }
            _ => {
                let i = self.as_i64()?;
                match to {
                    Primitive::Float => Value::Float(i as f32),
                    Primitive::Double => Value::Double(i as f64),
                    Primitive::Long => Value::Long(i),
                    Primitive::Int => Value::Int(i as i32),
                    Primitive::Short => Value::Short(i as i16),
                    Primitive::Byte => Value::Byte(i as i8),
                    Primitive::Char => Value::Char(i as u16),
                    _ => return None,
                }
            }
        };
        Some(value)
    }

    /// Reference identity for shared values, value equality for primitives
    /// and strings.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (a, b) if a.primitive().is_some() && b.primitive().is_some() => {
                match (a.as_i64(), b.as_i64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => a.as_f64() == b.as_f64(),
                }
            }
            _ => false,
        }
    }

    /// Monitor guarding this value in `synchronized` blocks. Primitives and
    /// `null` have none.
    pub fn monitor(&self) -> Option<&ReentrantMutex<()>> {
        match self {
            Value::Array(a) => Some(&a.monitor),
            Value::Object(o) => Some(&o.monitor),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Char(c) => match char::from_u32(*c as u32) {
                Some(c) => write!(f, "{c}"),
                None => write!(f, "\\u{c:04x}"),
            },
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => f.write_str(&format_floating(*v as f64, true)),
            Value::Double(v) => f.write_str(&format_floating(*v, false)),
            Value::Str(s) => f.write_str(s),
            Value::Array(a) => write!(f, "{:#}@{:x}", a.type_of(), a.identity()),
            Value::Object(o) => write!(f, "{:#}@{:x}", o.class(), o.identity()),
            Value::Class(t) => {
                if t.is_primitive() {
                    write!(f, "{t}")
                } else {
                    write!(f, "class {t:#}")
                }
            }
        }
    }
}

/// Render a floating-point value the way `String.valueOf` does: plain
/// notation with at least one fractional digit for magnitudes in
/// `[1e-3, 1e7)`, computerized scientific notation (`1.0E20`) otherwise.
pub fn format_floating(v: f64, single: bool) -> String {
    if v.is_nan() {
        return "NaN".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    let magnitude = v.abs();
    if v != 0.0 && !(1e-3..1e7).contains(&magnitude) {
        return scientific(v, single);
    }
    let text = if single {
        format!("{}", v as f32)
    } else {
        format!("{v}")
    };
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// `d.dddE±n` with the shortest digits that identify the value, but never
/// fewer than two.
fn scientific(v: f64, single: bool) -> String {
    let shortest = if single {
        format!("{:e}", v as f32)
    } else {
        format!("{v:e}")
    };
    let text = match shortest.split_once('e') {
        Some((mantissa, _)) if !mantissa.contains('.') => {
            if single {
                format!("{:.1e}", v as f32)
            } else {
                format!("{v:.1e}")
            }
        }
        _ => shortest,
    };
    text.replacen('e', "E", 1)
}

/// A fixed-length, shared array.
pub struct Array {
    element: Type,
    items: RefCell<Vec<Value>>,
    monitor: ReentrantMutex<()>,
}

impl Array {
    pub fn new(element: Type, items: Vec<Value>) -> Rc<Self> {
        Rc::new(Self {
            element,
            items: RefCell::new(items),
            monitor: ReentrantMutex::new(()),
        })
    }

    /// An array of `len` default values.
    pub fn filled(element: Type, len: usize) -> Rc<Self> {
        let fill = Value::default_for(&element);
        Self::new(element, vec![fill; len])
    }

    pub fn element(&self) -> &Type {
        &self.element
    }

    pub fn type_of(&self) -> Type {
        self.element.array_of(1)
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Store `value` at `index`; returns `false` when out of bounds.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.items.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    fn identity(&self) -> usize {
        self as *const Self as usize
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("element", &self.element)
            .field("items", &self.items.borrow())
            .finish()
    }
}

/// Host-specific state attached to an object.
pub enum Native {
    None,
    Text(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// State owned by whoever created the object (anonymous script classes).
    Opaque(Rc<dyn Any>),
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Native::None => f.write_str("None"),
            Native::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Native::List(items) => f.debug_tuple("List").field(items).finish(),
            Native::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Native::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

/// A class instance: named fields plus optional native state.
pub struct Object {
    class: Type,
    fields: RefCell<BTreeMap<String, Value>>,
    native: RefCell<Native>,
    monitor: ReentrantMutex<()>,
}

impl Object {
    pub fn new(class: Type) -> Rc<Self> {
        Self::with_native(class, Native::None)
    }

    pub fn with_native(class: Type, native: Native) -> Rc<Self> {
        Rc::new(Self {
            class,
            fields: RefCell::new(BTreeMap::new()),
            native: RefCell::new(native),
            monitor: ReentrantMutex::new(()),
        })
    }

    pub fn class(&self) -> &Type {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    /// Snapshot of every named field, in name order.
    pub fn fields(&self) -> Vec<(String, Value)> {
        self.fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(name)
    }

    pub fn set_field(&self, name: impl Into<String>, value: Value) {
        self.fields.borrow_mut().insert(name.into(), value);
    }

    pub fn native(&self) -> Ref<'_, Native> {
        self.native.borrow()
    }

    pub fn native_mut(&self) -> RefMut<'_, Native> {
        self.native.borrow_mut()
    }

    /// Opaque state downcast to `T`.
    pub fn opaque<T: Any>(&self) -> Option<Rc<T>> {
        match &*self.native.borrow() {
            Native::Opaque(state) => state.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.monitor.lock()
    }

    fn identity(&self) -> usize {
        self as *const Self as usize
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class)
            .field("fields", &self.fields.borrow())
            .field("native", &self.native.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_keeps_low_bits() {
        assert!(matches!(Value::Int(310).convert(Primitive::Byte), Some(Value::Byte(54))));
        assert!(matches!(Value::Int(65).convert(Primitive::Char), Some(Value::Char(65))));
        assert!(matches!(
            Value::Long(1 << 40).convert(Primitive::Int),
            Some(Value::Int(0))
        ));
    }

    #[test]
    fn floating_to_integral_truncates_and_saturates() {
        assert!(matches!(Value::Double(-3.9).convert(Primitive::Int), Some(Value::Int(-3))));
        assert!(matches!(
            Value::Double(1e20).convert(Primitive::Int),
            Some(Value::Int(i32::MAX))
        ));
        assert!(matches!(Value::Double(f64::NAN).convert(Primitive::Long), Some(Value::Long(0))));
        assert!(matches!(Value::Double(300.5).convert(Primitive::Byte), Some(Value::Byte(44))));
    }

    #[test]
    fn boolean_does_not_convert_to_numbers() {
        assert!(Value::Boolean(true).convert(Primitive::Int).is_none());
        assert!(Value::Int(1).convert(Primitive::Boolean).is_none());
    }

    #[test]
    fn floating_display_always_has_fraction() {
        assert_eq!(Value::Double(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Double(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Double(-0.0).to_string(), "-0.0");
        assert_eq!(Value::Double(1234567.5).to_string(), "1234567.5");
        assert_eq!(Value::Double(0.001).to_string(), "0.001");
    }

    #[test]
    fn large_and_small_magnitudes_use_exponents() {
        assert_eq!(Value::Double(1e20).to_string(), "1.0E20");
        assert_eq!(Value::Double(1e-5).to_string(), "1.0E-5");
        assert_eq!(Value::Double(1e7).to_string(), "1.0E7");
        assert_eq!(Value::Double(-1.25e-4).to_string(), "-1.25E-4");
        assert_eq!(Value::Double(f64::MIN_POSITIVE * f64::EPSILON).to_string(), "4.9E-324");
        assert_eq!(Value::Double(f64::MAX).to_string(), "1.7976931348623157E308");
        assert_eq!(Value::Float(f32::MAX).to_string(), "3.4028235E38");
        assert_eq!(Value::Float(1.0e10).to_string(), "1.0E10");
    }

    #[test]
    fn arrays_are_shared() {
        let array = Array::filled(Type::int(), 3);
        let alias = Value::Array(array.clone());
        assert!(array.set(1, Value::Int(7)));
        assert!(!array.set(3, Value::Int(7)));
        let Value::Array(seen) = alias else {
            unreachable!()
        };
        assert!(matches!(seen.get(1), Some(Value::Int(7))));
    }
}
