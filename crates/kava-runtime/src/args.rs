//! Argument and receiver extraction for native members.
//!
//! The evaluator converts arguments to the declared parameter types before
//! a native runs, so these only fail on `null` or on a library bug.

use std::rc::Rc;

use kava_core::{Array, HostResult, MemberCatalog, Object, Value};

pub(crate) const NPE: &str = "java.lang.NullPointerException";
pub(crate) const IAE: &str = "java.lang.IllegalArgumentException";

pub(crate) fn receiver<'v>(cx: &dyn MemberCatalog, this: Option<&'v Value>) -> HostResult<&'v Value> {
    match this {
        Some(Value::Null) | None => Err(cx.throwable(NPE, None)),
        Some(value) => Ok(value),
    }
}

pub(crate) fn receiver_str(cx: &dyn MemberCatalog, this: Option<&Value>) -> HostResult<Rc<str>> {
    match receiver(cx, this)? {
        Value::Str(s) => Ok(s.clone()),
        other => Err(mismatch(cx, "receiver", "a String", other)),
    }
}

pub(crate) fn receiver_object(
    cx: &dyn MemberCatalog,
    this: Option<&Value>,
) -> HostResult<Rc<Object>> {
    match receiver(cx, this)? {
        Value::Object(o) => Ok(o.clone()),
        other => Err(mismatch(cx, "receiver", "an object", other)),
    }
}

fn mismatch(cx: &dyn MemberCatalog, what: &str, wanted: &str, found: &Value) -> kava_core::Thrown {
    let found = cx.runtime_type(found);
    cx.throwable(IAE, Some(format!("{what} must be {wanted}, found {found:#}")))
}

pub(crate) fn arg<'v>(cx: &dyn MemberCatalog, args: &'v [Value], i: usize) -> HostResult<&'v Value> {
    args.get(i)
        .ok_or_else(|| cx.throwable(IAE, Some(format!("missing argument {i}"))))
}

pub(crate) fn int(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<i32> {
    long(cx, args, i).map(|v| v as i32)
}

pub(crate) fn long(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<i64> {
    match arg(cx, args, i)? {
        Value::Null => Err(cx.throwable(NPE, None)),
        value => value
            .as_i64()
            .ok_or_else(|| mismatch(cx, "argument", "an integer", value)),
    }
}

pub(crate) fn double(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<f64> {
    match arg(cx, args, i)? {
        Value::Null => Err(cx.throwable(NPE, None)),
        value => value
            .as_f64()
            .ok_or_else(|| mismatch(cx, "argument", "a number", value)),
    }
}

pub(crate) fn boolean(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<bool> {
    match arg(cx, args, i)? {
        Value::Boolean(b) => Ok(*b),
        Value::Null => Err(cx.throwable(NPE, None)),
        other => Err(mismatch(cx, "argument", "a boolean", other)),
    }
}

pub(crate) fn char_value(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<u16> {
    match arg(cx, args, i)? {
        Value::Char(c) => Ok(*c),
        Value::Null => Err(cx.throwable(NPE, None)),
        other => other
            .as_i64()
            .map(|v| v as u16)
            .ok_or_else(|| mismatch(cx, "argument", "a char", other)),
    }
}

pub(crate) fn string(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<Rc<str>> {
    match arg(cx, args, i)? {
        Value::Str(s) => Ok(s.clone()),
        Value::Null => Err(cx.throwable(NPE, None)),
        other => Err(mismatch(cx, "argument", "a String", other)),
    }
}

/// A `CharSequence` argument: a string or the text of a `StringBuilder`.
pub(crate) fn chars(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<String> {
    match arg(cx, args, i)? {
        Value::Null => Err(cx.throwable(NPE, None)),
        other => Ok(cx.display(other)),
    }
}

pub(crate) fn array(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<Rc<Array>> {
    match arg(cx, args, i)? {
        Value::Array(a) => Ok(a.clone()),
        Value::Null => Err(cx.throwable(NPE, None)),
        other => Err(mismatch(cx, "argument", "an array", other)),
    }
}

pub(crate) fn object(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<Rc<Object>> {
    match arg(cx, args, i)? {
        Value::Object(o) => Ok(o.clone()),
        Value::Null => Err(cx.throwable(NPE, None)),
        other => Err(mismatch(cx, "argument", "an object", other)),
    }
}

/// An array index or length, checked against `len`.
pub(crate) fn index(
    cx: &dyn MemberCatalog,
    class: &str,
    index: i64,
    len: usize,
) -> HostResult<usize> {
    if index < 0 || index as u64 >= len as u64 {
        return Err(cx.throwable(
            class,
            Some(format!("Index {index} out of bounds for length {len}")),
        ));
    }
    Ok(index as usize)
}
