//! The host class library scripts run against.
//!
//! [`Runtime`] implements [`MemberCatalog`] over a fixed subset of
//! `java.lang`, `java.util`, `java.io` and `java.awt`. Classes are declared
//! with Java-style signature strings (see [`registry`]) and implemented by
//! native closures.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use kava_core::{
    ClassInfo, Field, HostResult, MemberCatalog, Native, Thrown, Type, Value, types,
};

mod args;
mod awt;
mod collections;
mod io;
mod lang;
mod number;
mod registry;
mod signature;
mod string;
pub mod text;
mod throwable;

pub use io::Output;
pub use signature::{LIBRARY, SignatureError, qualify};
pub use throwable::message;

use registry::{Registry, Statics};

pub struct Runtime {
    classes: HashMap<String, Rc<ClassInfo>>,
    packages: HashSet<String>,
    statics: RefCell<Statics>,
    out: Output,
    err: Output,
    rejected: Vec<SignatureError>,
}

impl Runtime {
    /// A runtime whose `System.out` and `System.err` are the process streams.
    pub fn new() -> Self {
        Self::with_output(Output::Stdout, Output::Stderr)
    }

    /// A runtime printing into in-memory buffers, see [`Runtime::out`].
    pub fn captured() -> Self {
        Self::with_output(Output::buffer(), Output::buffer())
    }

    pub fn with_output(out: Output, err: Output) -> Self {
        let mut registry = Registry::new(out.clone(), err.clone());
        lang::install(&mut registry);
        string::install(&mut registry);
        number::install(&mut registry);
        throwable::install(&mut registry);
        io::install(&mut registry);
        collections::install(&mut registry);
        awt::install(&mut registry);
        let library = registry.finish();

        let mut packages = HashSet::new();
        for name in library.classes.keys() {
            let mut package = types::package_of(name);
            while !package.is_empty() {
                packages.insert(package.to_string());
                package = types::package_of(package);
            }
        }

        Self {
            classes: library.classes,
            packages,
            statics: RefCell::new(library.statics),
            out,
            err,
            rejected: library.rejected,
        }
    }

    pub fn out(&self) -> &Output {
        &self.out
    }

    pub fn err(&self) -> &Output {
        &self.err
    }

    /// Library declarations that failed to parse. Empty unless the library
    /// itself has a bug.
    pub fn rejected(&self) -> &[SignatureError] {
        &self.rejected
    }

    fn receiver_object<'v>(&self, receiver: Option<&'v Value>) -> HostResult<&'v Rc<kava_core::Object>> {
        match receiver {
            Some(Value::Object(object)) => Ok(object),
            Some(Value::Null) | None => Err(self.throwable(args::NPE, None)),
            Some(other) => Err(self.throwable(
                args::IAE,
                Some(format!("{:#} has no fields", self.runtime_type(other))),
            )),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberCatalog for Runtime {
    fn class(&self, name: &str) -> Option<Rc<ClassInfo>> {
        self.classes.get(name).cloned()
    }

    fn has_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    fn runtime_type(&self, value: &Value) -> Type {
        match value {
            Value::Null => Type::null(),
            Value::Str(_) => Type::string(),
            Value::Array(array) => array.type_of(),
            Value::Object(object) => object.class().clone(),
            Value::Class(of) => Type::class_of(of),
            primitive => match primitive.primitive() {
                Some(p) => Type::class(p.box_class()),
                None => Type::object(),
            },
        }
    }

    fn get_field(&self, field: &Field, receiver: Option<&Value>) -> HostResult<Value> {
        if field.is_static {
            let key = (field.declaring.clone(), field.name.clone());
            return Ok(self
                .statics
                .borrow()
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Value::default_for(&field.ty)));
        }
        let object = self.receiver_object(receiver)?;
        Ok(object
            .field(&field.name)
            .unwrap_or_else(|| Value::default_for(&field.ty)))
    }

    fn set_field(&self, field: &Field, receiver: Option<&Value>, value: Value) -> HostResult<()> {
        if field.is_static {
            let key = (field.declaring.clone(), field.name.clone());
            self.statics.borrow_mut().insert(key, value);
            return Ok(());
        }
        let object = self.receiver_object(receiver)?;
        object.set_field(field.name.clone(), value);
        Ok(())
    }

    fn iterate(&self, value: &Value) -> HostResult<Vec<Value>> {
        match value {
            Value::Array(array) => Ok(array.items().clone()),
            Value::Object(object) => match &*object.native() {
                Native::List(items) => Ok(items.clone()),
                _ => Err(self.throwable(
                    "java.lang.ClassCastException",
                    Some(format!(
                        "class {} cannot be cast to class {}",
                        object.class().qualified(),
                        types::ITERABLE
                    )),
                )),
            },
            Value::Null => Err(self.throwable(args::NPE, None)),
            other => Err(self.throwable(
                "java.lang.ClassCastException",
                Some(format!("{:#} is not iterable", self.runtime_type(other))),
            )),
        }
    }

    fn throwable(&self, class: &str, message: Option<String>) -> Thrown {
        let message = message.map(Value::string).unwrap_or(Value::Null);
        Thrown(throwable::instance(class, message, Value::Null))
    }

    fn display(&self, value: &Value) -> String {
        text::display(self, value)
    }

    fn as_dyn(&self) -> &dyn MemberCatalog {
        self
    }
}

#[cfg(test)]
mod tests {
    use kava_core::relations;

    use super::*;

    fn method(rt: &Runtime, class: &str, signature: &str) -> Rc<kava_core::Method> {
        rt.class(class)
            .and_then(|info| {
                info.methods
                    .iter()
                    .chain(&info.constructors)
                    .find(|m| m.signature() == signature)
                    .cloned()
            })
            .unwrap_or_else(|| panic!("{class}.{signature} not declared"))
    }

    fn thrown_message(thrown: Thrown) -> String {
        match thrown.0 {
            Value::Object(object) => throwable::describe(&object),
            other => panic!("not a throwable: {other:?}"),
        }
    }

    #[test]
    fn library_declares_without_rejections() {
        let rt = Runtime::captured();
        assert!(rt.rejected().is_empty(), "{:?}", rt.rejected());
        for name in LIBRARY {
            assert!(rt.class(name).is_some(), "{name} missing");
        }
        assert!(rt.has_package("java"));
        assert!(rt.has_package("java.util"));
        assert!(!rt.has_package("java.utils"));
    }

    #[test]
    fn generic_supertypes_follow_declarations() {
        let rt = Runtime::captured();
        let list = Type::generic("java.util.ArrayList", vec![Type::string()]);
        let target = Type::generic("java.util.List", vec![Type::string()]);
        assert!(relations::is_assignable(&rt, &target, &list));
        let iterable = relations::as_super(&rt, &list, types::ITERABLE);
        assert_eq!(
            iterable,
            Some(Type::generic(types::ITERABLE, vec![Type::string()]))
        );
        let common = relations::common_type(
            &rt,
            &Type::class("java.lang.Integer"),
            &Type::class("java.lang.Long"),
        );
        assert_eq!(common, Type::class("java.lang.Number"));
    }

    #[test]
    fn display_of_library_values() {
        let rt = Runtime::captured();
        let list = collections::new_list(vec![Value::Int(1), Value::string("two"), Value::Null]);
        insta::assert_snapshot!(rt.display(&list), @"[1, two, null]");

        let map = rt
            .invoke(&method(&rt, "java.util.HashMap", "HashMap()"), None, &[])
            .unwrap();
        let put = method(&rt, "java.util.Map", "put(K, V)");
        rt.invoke(&put, Some(&map), &[Value::string("a"), Value::Int(1)]).unwrap();
        rt.invoke(&put, Some(&map), &[Value::string("b"), Value::Int(2)]).unwrap();
        let old = rt.invoke(&put, Some(&map), &[Value::string("a"), Value::Int(3)]).unwrap();
        assert!(matches!(old, Value::Int(1)));
        insta::assert_snapshot!(rt.display(&map), @"{a=3, b=2}");

        let error = rt.throwable("java.lang.IllegalStateException", Some("closed".into()));
        insta::assert_snapshot!(rt.display(&error.0), @"java.lang.IllegalStateException: closed");

        let point = rt
            .invoke(
                &method(&rt, "java.awt.Point", "Point(int, int)"),
                None,
                &[Value::Int(1), Value::Int(2)],
            )
            .unwrap();
        insta::assert_snapshot!(rt.display(&point), @"java.awt.Point[x=1,y=2]");
    }

    #[test]
    fn string_format_through_invoke() {
        let rt = Runtime::captured();
        let format = method(&rt, "java.lang.String", "format(String, Object...)");
        let args = kava_core::Array::new(
            Type::object(),
            vec![Value::Int(42), Value::Double(3.14159), Value::string("x")],
        );
        let result = rt
            .invoke(
                &format,
                None,
                &[Value::string("%5d|%.2f|%-3s|"), Value::Array(args)],
            )
            .unwrap();
        assert_eq!(result.as_str(), Some("   42|3.14|x  |"));
    }

    #[test]
    fn parse_int_reports_input() {
        let rt = Runtime::captured();
        let parse = method(&rt, "java.lang.Integer", "parseInt(String)");
        let error = rt.invoke(&parse, None, &[Value::string("12a")]).unwrap_err();
        insta::assert_snapshot!(
            thrown_message(error),
            @r#"java.lang.NumberFormatException: For input string: "12a""#
        );
    }

    #[test]
    fn list_index_out_of_bounds() {
        let rt = Runtime::captured();
        let list = collections::new_list(vec![Value::Int(1)]);
        let get = method(&rt, "java.util.List", "get(int)");
        let error = rt.invoke(&get, Some(&list), &[Value::Int(3)]).unwrap_err();
        insta::assert_snapshot!(
            thrown_message(error),
            @"java.lang.IndexOutOfBoundsException: Index 3 out of bounds for length 1"
        );
    }

    #[test]
    fn system_out_is_captured() {
        let rt = Runtime::captured();
        let out_field = rt
            .class("java.lang.System")
            .and_then(|info| info.declared_field("out").cloned())
            .unwrap();
        let out = rt.get_field(&out_field, None).unwrap();
        let println = method(&rt, io::PRINT_STREAM, "println(String)");
        rt.invoke(&println, Some(&out), &[Value::string("hello")]).unwrap();
        let print = method(&rt, io::PRINT_STREAM, "print(int)");
        rt.invoke(&print, Some(&out), &[Value::Int(7)]).unwrap();
        assert_eq!(rt.out().take(), "hello\n7");
        assert_eq!(rt.out().contents(), "");
    }

    #[test]
    fn array_helpers_through_invoke() {
        let rt = Runtime::captured();
        let ints = Value::Array(kava_core::Array::new(Type::int(), vec![Value::Int(3), Value::Int(1)]));
        let fill = method(&rt, "java.util.Arrays", "fill(int[], int)");
        rt.invoke(&fill, None, &[ints.clone(), Value::Int(7)]).unwrap();
        let render = method(&rt, "java.util.Arrays", "toString(int[])");
        let text = rt.invoke(&render, None, &[ints.clone()]).unwrap();
        assert_eq!(text.as_str(), Some("[7, 7]"));

        let copy_of = method(&rt, "java.util.Arrays", "copyOf(int[], int)");
        let longer = rt.invoke(&copy_of, None, &[ints, Value::Int(3)]).unwrap();
        let text = rt.invoke(&render, None, &[longer]).unwrap();
        assert_eq!(text.as_str(), Some("[7, 7, 0]"));

        let chars = Value::Array(kava_core::Array::new(
            Type::primitive(kava_core::Primitive::Char),
            vec![Value::Char(u16::from(b'h')), Value::Char(u16::from(b'i'))],
        ));
        let value_of = method(&rt, "java.lang.String", "valueOf(char[])");
        let text = rt.invoke(&value_of, None, &[chars]).unwrap();
        assert_eq!(text.as_str(), Some("hi"));

        let error = rt.throwable("java.lang.IllegalStateException", Some("closed".into()));
        let to_string = method(&rt, "java.lang.Throwable", "toString()");
        let text = rt.invoke(&to_string, Some(&error.0), &[]).unwrap();
        assert_eq!(text.as_str(), Some("java.lang.IllegalStateException: closed"));
    }

    #[test]
    fn instance_fields_need_a_receiver() {
        let rt = Runtime::captured();
        let x = rt
            .class(awt::POINT)
            .and_then(|info| info.declared_field("x").cloned())
            .unwrap();
        let error = rt.get_field(&x, Some(&Value::Null)).unwrap_err();
        insta::assert_snapshot!(thrown_message(error), @"java.lang.NullPointerException");
    }
}
