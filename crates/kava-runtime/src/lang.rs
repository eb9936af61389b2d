//! The rest of `java.lang`: `Object`, `Class`, the core interfaces,
//! `Math`, `System` and `Thread`.

use std::rc::Rc;
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use kava_core::relations;
use kava_core::{Array, HostResult, MemberCatalog, Object, Type, Value};

use crate::args::{IAE, arg, array, double, index, int, long, receiver};
use crate::io;
use crate::registry::Registry;
use crate::text;

const AIOOBE: &str = "java.lang.ArrayIndexOutOfBoundsException";

fn class_of(cx: &dyn MemberCatalog, this: Option<&Value>) -> HostResult<Rc<Type>> {
    match receiver(cx, this)? {
        Value::Class(ty) => Ok(ty.clone()),
        other => Err(cx.throwable(
            "java.lang.ClassCastException",
            Some(format!("{} is not a Class", cx.runtime_type(other).qualified())),
        )),
    }
}

pub(crate) fn install(registry: &mut Registry) {
    registry
        .declare("public class java.lang.Object")
        .constructor("public Object()", |_, _, _| {
            Ok(Value::Object(Object::new(Type::object())))
        })
        .method("public boolean equals(Object)", |cx, this, args| {
            Ok(Value::Boolean(text::equals(receiver(cx, this)?, arg(cx, args, 0)?)))
        })
        .method("public int hashCode()", |cx, this, _| {
            Ok(Value::Int(text::hash_code(receiver(cx, this)?)))
        })
        .method("public String toString()", |cx, this, _| {
            Ok(Value::string(text::display(cx, receiver(cx, this)?)))
        })
        .method("public final Class<?> getClass()", |cx, this, _| {
            let ty = relations::erase(&cx.runtime_type(receiver(cx, this)?));
            Ok(Value::Class(Rc::new(ty)))
        })
        .method(
            "protected Object clone() throws CloneNotSupportedException",
            |cx, this, _| match receiver(cx, this)? {
                Value::Array(a) => Ok(Value::Array(Array::new(
                    a.element().clone(),
                    a.items().clone(),
                ))),
                other => Err(cx.throwable(
                    "java.lang.CloneNotSupportedException",
                    Some(cx.runtime_type(other).qualified()),
                )),
            },
        )
        .finish();

    registry
        .declare("public final class java.lang.Class<T>")
        .method("public String getName()", |cx, this, _| {
            Ok(Value::string(class_of(cx, this)?.qualified()))
        })
        .method("public String getSimpleName()", |cx, this, _| {
            Ok(Value::string(class_of(cx, this)?.to_string()))
        })
        .method("public boolean isArray()", |cx, this, _| {
            Ok(Value::Boolean(class_of(cx, this)?.is_array()))
        })
        .method("public boolean isPrimitive()", |cx, this, _| {
            Ok(Value::Boolean(class_of(cx, this)?.is_primitive()))
        })
        .method("public boolean isInterface()", |cx, this, _| {
            let ty = class_of(cx, this)?;
            let interface = ty
                .class_name()
                .and_then(|name| cx.class(name))
                .is_some_and(|class| class.is_interface);
            Ok(Value::Boolean(interface))
        })
        .method("public boolean isInstance(Object)", |cx, this, args| {
            let ty = class_of(cx, this)?;
            let actual = cx.runtime_type(arg(cx, args, 0)?);
            Ok(Value::Boolean(relations::is_instance(cx, &ty, &actual)))
        })
        .finish();

    registry
        .declare("public interface java.lang.Iterable<T>")
        .finish();
    registry
        .declare("public interface java.lang.Runnable")
        .abstract_method("public abstract void run()")
        .finish();
    registry
        .declare("public interface java.lang.Comparable<T>")
        .abstract_method("public abstract int compareTo(T)")
        .finish();

    install_math(registry);
    install_system(registry);

    registry
        .declare("public class java.lang.Thread implements Runnable")
        .method("public void run()", |_, _, _| Ok(Value::Null))
        .method(
            "public static void sleep(long) throws InterruptedException",
            |cx, _, args| {
                let millis = long(cx, args, 0)?;
                if millis < 0 {
                    return Err(cx.throwable(IAE, Some("timeout value is negative".into())));
                }
                std::thread::sleep(Duration::from_millis(millis as u64));
                Ok(Value::Null)
            },
        )
        .finish();
}

fn install_math(registry: &mut Registry) {
    let mut math = registry
        .declare("public final class java.lang.Math")
        .constant("public static final double PI", Value::Double(std::f64::consts::PI))
        .constant("public static final double E", Value::Double(std::f64::consts::E))
        .method("public static int abs(int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.wrapping_abs()))
        })
        .method("public static long abs(long)", |cx, _, args| {
            Ok(Value::Long(long(cx, args, 0)?.wrapping_abs()))
        })
        .method("public static float abs(float)", |cx, _, args| {
            Ok(Value::Float((double(cx, args, 0)? as f32).abs()))
        })
        .method("public static double abs(double)", |cx, _, args| {
            Ok(Value::Double(double(cx, args, 0)?.abs()))
        })
        .method("public static int max(int, int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.max(int(cx, args, 1)?)))
        })
        .method("public static long max(long, long)", |cx, _, args| {
            Ok(Value::Long(long(cx, args, 0)?.max(long(cx, args, 1)?)))
        })
        .method("public static float max(float, float)", |cx, _, args| {
            Ok(Value::Float(java_max(double(cx, args, 0)?, double(cx, args, 1)?) as f32))
        })
        .method("public static double max(double, double)", |cx, _, args| {
            Ok(Value::Double(java_max(double(cx, args, 0)?, double(cx, args, 1)?)))
        })
        .method("public static int min(int, int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.min(int(cx, args, 1)?)))
        })
        .method("public static long min(long, long)", |cx, _, args| {
            Ok(Value::Long(long(cx, args, 0)?.min(long(cx, args, 1)?)))
        })
        .method("public static float min(float, float)", |cx, _, args| {
            Ok(Value::Float(java_min(double(cx, args, 0)?, double(cx, args, 1)?) as f32))
        })
        .method("public static double min(double, double)", |cx, _, args| {
            Ok(Value::Double(java_min(double(cx, args, 0)?, double(cx, args, 1)?)))
        })
        .method("public static double pow(double, double)", |cx, _, args| {
            Ok(Value::Double(double(cx, args, 0)?.powf(double(cx, args, 1)?)))
        })
        .method("public static double hypot(double, double)", |cx, _, args| {
            Ok(Value::Double(double(cx, args, 0)?.hypot(double(cx, args, 1)?)))
        })
        .method("public static long round(double)", |cx, _, args| {
            Ok(Value::Long((double(cx, args, 0)? + 0.5).floor() as i64))
        })
        .method("public static int round(float)", |cx, _, args| {
            Ok(Value::Int(((double(cx, args, 0)? as f32) + 0.5).floor() as i32))
        })
        .method("public static int floorDiv(int, int)", |cx, _, args| {
            let (a, b) = (int(cx, args, 0)?, int(cx, args, 1)?);
            if b == 0 {
                return Err(cx.throwable("java.lang.ArithmeticException", Some("/ by zero".into())));
            }
            let adjust = a.wrapping_rem(b) != 0 && (a < 0) != (b < 0);
            Ok(Value::Int(a.wrapping_div(b) - i32::from(adjust)))
        })
        .method("public static int floorMod(int, int)", |cx, _, args| {
            let (a, b) = (int(cx, args, 0)?, int(cx, args, 1)?);
            if b == 0 {
                return Err(cx.throwable("java.lang.ArithmeticException", Some("/ by zero".into())));
            }
            let r = a.wrapping_rem(b);
            Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
        })
        .method("public static double random()", |_, _, _| Ok(Value::Double(random())));
    for (name, f) in [
        ("sqrt", f64::sqrt as fn(f64) -> f64),
        ("cbrt", f64::cbrt),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("rint", f64::round_ties_even),
        ("exp", f64::exp),
        ("log", f64::ln),
        ("log10", f64::log10),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("atan", f64::atan),
        ("signum", signum),
        ("toRadians", f64::to_radians),
        ("toDegrees", f64::to_degrees),
    ] {
        math = math.method(&format!("public static double {name}(double)"), move |cx, _, args| {
            Ok(Value::Double(f(double(cx, args, 0)?)))
        });
    }
    math.finish();
}

fn signum(v: f64) -> f64 {
    if v == 0.0 || v.is_nan() { v } else { v.signum() }
}

fn java_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

fn java_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

/// xorshift over the clock; scripts get no reproducibility guarantee.
fn random() -> f64 {
    let mut x = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x2545_f491_4f6c_dd1d)
        | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    (x >> 11) as f64 / (1u64 << 53) as f64
}

fn started() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

fn install_system(registry: &mut Registry) {
    let out = io::print_stream(registry.out().clone());
    let err = io::print_stream(registry.err().clone());
    registry
        .declare("public final class java.lang.System")
        .constant("public static final PrintStream out", out)
        .constant("public static final PrintStream err", err)
        .method("public static long currentTimeMillis()", |_, _, _| {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            Ok(Value::Long(millis))
        })
        .method("public static long nanoTime()", |_, _, _| {
            Ok(Value::Long(started().elapsed().as_nanos() as i64))
        })
        .method("public static String lineSeparator()", |_, _, _| Ok(Value::string("\n")))
        .method("public static int identityHashCode(Object)", |cx, _, args| {
            Ok(Value::Int(match arg(cx, args, 0)? {
                Value::Object(o) => Rc::as_ptr(o) as usize as i32,
                Value::Array(a) => Rc::as_ptr(a) as usize as i32,
                other => text::hash_code(other),
            }))
        })
        .method(
            "public static void arraycopy(Object, int, Object, int, int)",
            |cx, _, args| {
                let source = array(cx, args, 0)?;
                let from = int(cx, args, 1)?;
                let target = array(cx, args, 2)?;
                let to = int(cx, args, 3)?;
                let len = int(cx, args, 4)?;
                arraycopy(cx, &source, from, &target, to, len)
            },
        )
        .finish();
}

fn arraycopy(
    cx: &dyn MemberCatalog,
    source: &Array,
    from: i32,
    target: &Array,
    to: i32,
    len: i32,
) -> HostResult<Value> {
    let (source_element, target_element) = (source.element(), target.element());
    let compatible = if source_element.is_primitive() || target_element.is_primitive() {
        source_element == target_element
    } else {
        true
    };
    if !compatible {
        return Err(cx.throwable(
            "java.lang.ArrayStoreException",
            Some(format!(
                "arraycopy: type mismatch: can not copy {}[] into {}[]",
                source_element, target_element
            )),
        ));
    }
    if len < 0 {
        return Err(cx.throwable(AIOOBE, Some(format!("arraycopy: length {len} is negative"))));
    }
    for (position, array, what) in [(from, source, "source"), (to, target, "destination")] {
        if position < 0 || position as i64 + len as i64 > array.len() as i64 {
            let last = position as i64 + len as i64;
            return Err(cx.throwable(
                AIOOBE,
                Some(format!(
                    "arraycopy: last {what} index {last} out of bounds for {}[{}]",
                    array.element(),
                    array.len()
                )),
            ));
        }
    }
    let copied: Vec<Value> = source.items()[from as usize..(from + len) as usize].to_vec();
    for (offset, value) in copied.into_iter().enumerate() {
        if !target_element.is_primitive() && !value.is_null() {
            let actual = cx.runtime_type(&value);
            if !relations::is_instance(cx, target_element, &actual) {
                return Err(cx.throwable(
                    "java.lang.ArrayStoreException",
                    Some(format!("arraycopy: element type mismatch: {actual:#}")),
                ));
            }
        }
        let at = index(cx, AIOOBE, to as i64 + offset as i64, target.len())?;
        target.set(at, value);
    }
    Ok(Value::Null)
}
