//! `java.io`: print streams over a caller-visible output.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use kava_core::{HostResult, MemberCatalog, Native, Object, Primitive, Type, Value};

use crate::args::{array, char_value, receiver, string};
use crate::registry::Registry;
use crate::text;

pub const PRINT_STREAM: &str = "java.io.PrintStream";

/// Where a `PrintStream` writes: a shared in-memory buffer, or the
/// process's own standard streams.
#[derive(Clone, Debug)]
pub enum Output {
    Buffer(Rc<RefCell<String>>),
    Stdout,
    Stderr,
}

impl Output {
    pub fn buffer() -> Self {
        Output::Buffer(Rc::default())
    }

    pub fn write(&self, text: &str) {
        match self {
            Output::Buffer(buffer) => buffer.borrow_mut().push_str(text),
            Output::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            Output::Stderr => {
                let _ = std::io::stderr().lock().write_all(text.as_bytes());
            }
        }
    }

    /// Everything written so far; empty for the standard streams.
    pub fn contents(&self) -> String {
        match self {
            Output::Buffer(buffer) => buffer.borrow().clone(),
            _ => String::new(),
        }
    }

    /// Drain the buffer.
    pub fn take(&self) -> String {
        match self {
            Output::Buffer(buffer) => std::mem::take(&mut *buffer.borrow_mut()),
            _ => String::new(),
        }
    }
}

/// A `java.io.PrintStream` instance writing to `output`.
pub fn print_stream(output: Output) -> Value {
    Value::Object(Object::with_native(
        Type::class(PRINT_STREAM),
        Native::Opaque(Rc::new(output)),
    ))
}

fn output_of(cx: &dyn MemberCatalog, this: Option<&Value>) -> HostResult<Rc<Output>> {
    let this = receiver(cx, this)?;
    this.as_object()
        .and_then(|o| o.opaque::<Output>())
        .ok_or_else(|| cx.throwable("java.lang.IllegalStateException", Some("stream is closed".into())))
}

/// `print` text for one argument of a `print`/`println` overload.
fn printed(cx: &dyn MemberCatalog, args: &[Value]) -> HostResult<String> {
    match args.first() {
        None => Ok(String::new()),
        Some(Value::Array(chars)) if chars.element().as_primitive() == Some(Primitive::Char) => {
            let units: Vec<u16> = chars
                .items()
                .iter()
                .filter_map(|v| match v {
                    Value::Char(c) => Some(*c),
                    _ => None,
                })
                .collect();
            Ok(String::from_utf16_lossy(&units))
        }
        Some(Value::Null) => Ok("null".into()),
        Some(value) => Ok(cx.display(value)),
    }
}

const PRINTABLE: &[&str] = &[
    "boolean", "char", "int", "long", "float", "double", "char[]", "String", "Object",
];

pub(crate) fn install(registry: &mut Registry) {
    let mut stream = registry.declare("public class java.io.PrintStream");
    for param in PRINTABLE {
        stream = stream
            .method(&format!("public void print({param})"), |cx, this, args| {
                let text = printed(cx, args)?;
                output_of(cx, this)?.write(&text);
                Ok(Value::Null)
            })
            .method(&format!("public void println({param})"), |cx, this, args| {
                let mut text = printed(cx, args)?;
                text.push('\n');
                output_of(cx, this)?.write(&text);
                Ok(Value::Null)
            });
    }
    stream
        .method("public void println()", |cx, this, _| {
            output_of(cx, this)?.write("\n");
            Ok(Value::Null)
        })
        .method("public PrintStream printf(String, Object...)", format_to)
        .method("public PrintStream format(String, Object...)", format_to)
        .method("public PrintStream append(char)", |cx, this, args| {
            let c = char_value(cx, args, 0)?;
            output_of(cx, this)?.write(&String::from_utf16_lossy(&[c]));
            Ok(receiver(cx, this)?.clone())
        })
        .method("public void flush()", |_, _, _| Ok(Value::Null))
        .finish();

    registry
        .declare("public class java.io.IOException extends Exception")
        .exception()
        .finish();
}

fn format_to(
    cx: &dyn MemberCatalog,
    this: Option<&Value>,
    args: &[Value],
) -> HostResult<Value> {
    let pattern = string(cx, args, 0)?;
    let values = array(cx, args, 1)?.items().clone();
    let text = text::format(cx, &pattern, &values)?;
    output_of(cx, this)?.write(&text);
    Ok(receiver(cx, this)?.clone())
}
