//! `Throwable` and the exception classes scripts and the engine raise.

use std::rc::Rc;

use kava_core::{MemberCatalog, Object, Type, Value};

use crate::args::receiver_object;
use crate::io::Output;
use crate::registry::Registry;

const MESSAGE: &str = "detailMessage";
const CAUSE: &str = "cause";

/// Exception classes and their direct superclass, parents first.
const HIERARCHY: &[(&str, &str)] = &[
    ("java.lang.Exception", "Throwable"),
    ("java.lang.Error", "Throwable"),
    ("java.lang.RuntimeException", "Exception"),
    ("java.lang.ArithmeticException", "RuntimeException"),
    ("java.lang.NullPointerException", "RuntimeException"),
    ("java.lang.ClassCastException", "RuntimeException"),
    ("java.lang.IndexOutOfBoundsException", "RuntimeException"),
    ("java.lang.ArrayIndexOutOfBoundsException", "IndexOutOfBoundsException"),
    ("java.lang.StringIndexOutOfBoundsException", "IndexOutOfBoundsException"),
    ("java.lang.NegativeArraySizeException", "RuntimeException"),
    ("java.lang.ArrayStoreException", "RuntimeException"),
    ("java.lang.IllegalArgumentException", "RuntimeException"),
    ("java.lang.NumberFormatException", "IllegalArgumentException"),
    ("java.lang.IllegalStateException", "RuntimeException"),
    ("java.lang.UnsupportedOperationException", "RuntimeException"),
    ("java.lang.InterruptedException", "Exception"),
    ("java.lang.CloneNotSupportedException", "Exception"),
    ("java.lang.InstantiationException", "Exception"),
    ("java.lang.AbstractMethodError", "Error"),
];

/// A new throwable object of `class`.
pub(crate) fn instance(class: &str, message: Value, cause: Value) -> Value {
    let object = Object::new(Type::class(class));
    object.set_field(MESSAGE, message);
    object.set_field(CAUSE, cause);
    Value::Object(object)
}

pub fn message(object: &Object) -> Option<Rc<str>> {
    match object.field(MESSAGE) {
        Some(Value::Str(s)) => Some(s),
        _ => None,
    }
}

/// `java.lang.IllegalStateException: reason`
pub(crate) fn describe(object: &Object) -> String {
    let name = object.class().qualified();
    match message(object) {
        Some(message) => format!("{name}: {message}"),
        None => name,
    }
}

pub(crate) fn install(registry: &mut Registry) {
    registry
        .declare("public class java.lang.Throwable")
        .field("private String detailMessage")
        .field("private Throwable cause")
        .exception()
        .method("public String getMessage()", |cx, this, _| {
            let this = receiver_object(cx, this)?;
            Ok(this.field(MESSAGE).unwrap_or(Value::Null))
        })
        .method("public String getLocalizedMessage()", |cx, this, _| {
            let this = receiver_object(cx, this)?;
            Ok(this.field(MESSAGE).unwrap_or(Value::Null))
        })
        .method("public Throwable getCause()", |cx, this, _| {
            let this = receiver_object(cx, this)?;
            Ok(this.field(CAUSE).unwrap_or(Value::Null))
        })
        .method("public String toString()", |cx, this, _| {
            Ok(Value::string(describe(&*receiver_object(cx, this)?)))
        })
        .method("public void printStackTrace()", |cx, this, _| {
            let this = receiver_object(cx, this)?;
            let mut text = describe(&this);
            text.push('\n');
            standard_error(cx).write(&text);
            Ok(Value::Null)
        })
        .finish();

    for (class, parent) in HIERARCHY {
        registry
            .declare(&format!("public class {class} extends {parent}"))
            .exception()
            .finish();
    }
}

/// The stream behind `System.err`, reached through the catalog.
fn standard_error(cx: &dyn MemberCatalog) -> Output {
    cx.class("java.lang.System")
        .and_then(|system| system.declared_field("err").cloned())
        .and_then(|field| cx.get_field(&field, None).ok())
        .and_then(|stream| stream.as_object().and_then(|o| o.opaque::<Output>()))
        .map(|output| (*output).clone())
        .unwrap_or(Output::Stderr)
}
