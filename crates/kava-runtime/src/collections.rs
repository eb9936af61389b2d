//! `java.util`: list and map collections, `Arrays` and `Objects`.
//!
//! `ArrayList` keeps its elements in [`Native::List`], `HashMap` its
//! entries in [`Native::Map`] in insertion order.

use std::cmp::Ordering;

use kava_core::relations;
use kava_core::{Array, HostResult, MemberCatalog, Native, Object, Type, Value};

use crate::args::{IAE, NPE, arg, array, index, int, long, object, receiver_object};
use crate::registry::Registry;
use crate::text;

const ARRAY_LIST: &str = "java.util.ArrayList";
const HASH_MAP: &str = "java.util.HashMap";
const IOOBE: &str = "java.lang.IndexOutOfBoundsException";

pub(crate) fn new_list(items: Vec<Value>) -> Value {
    Value::Object(Object::with_native(Type::class(ARRAY_LIST), Native::List(items)))
}

fn new_map(entries: Vec<(Value, Value)>) -> Value {
    Value::Object(Object::with_native(Type::class(HASH_MAP), Native::Map(entries)))
}

/// Run `f` over the receiver's list storage.
fn with_list<R>(
    cx: &dyn MemberCatalog,
    this: Option<&Value>,
    f: impl FnOnce(&mut Vec<Value>) -> HostResult<R>,
) -> HostResult<R> {
    let this = receiver_object(cx, this)?;
    let mut native = this.native_mut();
    match &mut *native {
        Native::List(items) => f(items),
        _ => Err(cx.throwable(
            "java.lang.UnsupportedOperationException",
            Some(format!("{} is not a list", this.class().qualified())),
        )),
    }
}

fn with_map<R>(
    cx: &dyn MemberCatalog,
    this: Option<&Value>,
    f: impl FnOnce(&mut Vec<(Value, Value)>) -> HostResult<R>,
) -> HostResult<R> {
    let this = receiver_object(cx, this)?;
    let mut native = this.native_mut();
    match &mut *native {
        Native::Map(entries) => f(entries),
        _ => Err(cx.throwable(
            "java.lang.UnsupportedOperationException",
            Some(format!("{} is not a map", this.class().qualified())),
        )),
    }
}

/// Elements of a `Collection` argument, copied out before the receiver is
/// borrowed so `list.addAll(list)` works.
fn elements(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<Vec<Value>> {
    let source = object(cx, args, i)?;
    let items = match &*source.native() {
        Native::List(items) => items.clone(),
        _ => return cx.iterate(&Value::Object(source.clone())),
    };
    Ok(items)
}

fn entries(cx: &dyn MemberCatalog, args: &[Value], i: usize) -> HostResult<Vec<(Value, Value)>> {
    let source = object(cx, args, i)?;
    let entries = match &*source.native() {
        Native::Map(entries) => entries.clone(),
        _ => {
            return Err(cx.throwable(
                "java.lang.ClassCastException",
                Some(format!("{} is not a map", source.class().qualified())),
            ));
        }
    };
    Ok(entries)
}

fn put(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) -> Value {
    match entries.iter_mut().find(|(k, _)| text::equals(k, &key)) {
        Some((_, slot)) => std::mem::replace(slot, value),
        None => {
            entries.push((key, value));
            Value::Null
        }
    }
}

fn lookup(entries: &[(Value, Value)], key: &Value) -> Option<Value> {
    entries
        .iter()
        .find(|(k, _)| text::equals(k, key))
        .map(|(_, v)| v.clone())
}

pub(crate) fn install(registry: &mut Registry) {
    registry
        .declare("public interface java.util.Collection<E> extends Iterable<E>")
        .method("public int size()", |cx, this, _| {
            with_list(cx, this, |items| Ok(Value::Int(items.len() as i32)))
        })
        .method("public boolean isEmpty()", |cx, this, _| {
            with_list(cx, this, |items| Ok(Value::Boolean(items.is_empty())))
        })
        .method("public boolean contains(Object)", |cx, this, args| {
            let needle = arg(cx, args, 0)?.clone();
            with_list(cx, this, |items| {
                Ok(Value::Boolean(items.iter().any(|v| text::equals(v, &needle))))
            })
        })
        .method("public boolean add(E)", |cx, this, args| {
            let value = arg(cx, args, 0)?.clone();
            with_list(cx, this, |items| {
                items.push(value);
                Ok(Value::Boolean(true))
            })
        })
        .method("public boolean remove(Object)", |cx, this, args| {
            let needle = arg(cx, args, 0)?.clone();
            with_list(cx, this, |items| {
                let found = items.iter().position(|v| text::equals(v, &needle));
                if let Some(at) = found {
                    items.remove(at);
                }
                Ok(Value::Boolean(found.is_some()))
            })
        })
        .method("public boolean addAll(Collection<? extends E>)", |cx, this, args| {
            let added = elements(cx, args, 0)?;
            with_list(cx, this, |items| {
                let changed = !added.is_empty();
                items.extend(added);
                Ok(Value::Boolean(changed))
            })
        })
        .method("public boolean containsAll(Collection<?>)", |cx, this, args| {
            let wanted = elements(cx, args, 0)?;
            with_list(cx, this, |items| {
                Ok(Value::Boolean(
                    wanted
                        .iter()
                        .all(|w| items.iter().any(|v| text::equals(v, w))),
                ))
            })
        })
        .method("public void clear()", |cx, this, _| {
            with_list(cx, this, |items| {
                items.clear();
                Ok(Value::Null)
            })
        })
        .method("public Object[] toArray()", |cx, this, _| {
            with_list(cx, this, |items| {
                Ok(Value::Array(Array::new(Type::object(), items.clone())))
            })
        })
        .finish();

    registry
        .declare("public interface java.util.List<E> extends Collection<E>")
        .method("public E get(int)", |cx, this, args| {
            let at = long(cx, args, 0)?;
            with_list(cx, this, |items| {
                let at = index(cx, IOOBE, at, items.len())?;
                Ok(items[at].clone())
            })
        })
        .method("public E set(int, E)", |cx, this, args| {
            let at = long(cx, args, 0)?;
            let value = arg(cx, args, 1)?.clone();
            with_list(cx, this, |items| {
                let at = index(cx, IOOBE, at, items.len())?;
                Ok(std::mem::replace(&mut items[at], value))
            })
        })
        .method("public void add(int, E)", |cx, this, args| {
            let at = long(cx, args, 0)?;
            let value = arg(cx, args, 1)?.clone();
            with_list(cx, this, |items| {
                let at = index(cx, IOOBE, at, items.len() + 1)?;
                items.insert(at, value);
                Ok(Value::Null)
            })
        })
        .method("public E remove(int)", |cx, this, args| {
            let at = long(cx, args, 0)?;
            with_list(cx, this, |items| {
                let at = index(cx, IOOBE, at, items.len())?;
                Ok(items.remove(at))
            })
        })
        .method("public int indexOf(Object)", |cx, this, args| {
            let needle = arg(cx, args, 0)?.clone();
            with_list(cx, this, |items| {
                let found = items.iter().position(|v| text::equals(v, &needle));
                Ok(Value::Int(found.map_or(-1, |i| i as i32)))
            })
        })
        .method("public int lastIndexOf(Object)", |cx, this, args| {
            let needle = arg(cx, args, 0)?.clone();
            with_list(cx, this, |items| {
                let found = items.iter().rposition(|v| text::equals(v, &needle));
                Ok(Value::Int(found.map_or(-1, |i| i as i32)))
            })
        })
        .method("public List<E> subList(int, int)", |cx, this, args| {
            let (from, to) = (int(cx, args, 0)?, int(cx, args, 1)?);
            with_list(cx, this, |items| {
                if from < 0 || to < from || to as usize > items.len() {
                    return Err(cx.throwable(
                        IOOBE,
                        Some(format!("fromIndex: {from}, toIndex: {to}, size: {}", items.len())),
                    ));
                }
                Ok(new_list(items[from as usize..to as usize].to_vec()))
            })
        })
        .method("public static <E> List<E> of(E...)", |cx, _, args| {
            Ok(new_list(array(cx, args, 0)?.items().clone()))
        })
        .finish();

    registry
        .declare("public class java.util.ArrayList<E> implements List<E>")
        .constructor("public ArrayList()", |_, _, _| Ok(new_list(Vec::new())))
        .constructor("public ArrayList(int)", |cx, _, args| {
            let capacity = int(cx, args, 0)?;
            if capacity < 0 {
                return Err(cx.throwable(IAE, Some(format!("Illegal Capacity: {capacity}"))));
            }
            Ok(new_list(Vec::with_capacity(capacity as usize)))
        })
        .constructor("public ArrayList(Collection<? extends E>)", |cx, _, args| {
            Ok(new_list(elements(cx, args, 0)?))
        })
        .finish();

    install_map(registry);
    install_arrays(registry);
    install_objects(registry);
}

fn install_map(registry: &mut Registry) {
    registry
        .declare("public interface java.util.Map<K, V>")
        .method("public int size()", |cx, this, _| {
            with_map(cx, this, |entries| Ok(Value::Int(entries.len() as i32)))
        })
        .method("public boolean isEmpty()", |cx, this, _| {
            with_map(cx, this, |entries| Ok(Value::Boolean(entries.is_empty())))
        })
        .method("public V put(K, V)", |cx, this, args| {
            let (key, value) = (arg(cx, args, 0)?.clone(), arg(cx, args, 1)?.clone());
            with_map(cx, this, |entries| Ok(put(entries, key, value)))
        })
        .method("public V putIfAbsent(K, V)", |cx, this, args| {
            let (key, value) = (arg(cx, args, 0)?.clone(), arg(cx, args, 1)?.clone());
            with_map(cx, this, |entries| match lookup(entries, &key) {
                Some(existing) if !existing.is_null() => Ok(existing),
                _ => Ok(put(entries, key, value)),
            })
        })
        .method("public V get(Object)", |cx, this, args| {
            let key = arg(cx, args, 0)?.clone();
            with_map(cx, this, |entries| Ok(lookup(entries, &key).unwrap_or(Value::Null)))
        })
        .method("public V getOrDefault(Object, V)", |cx, this, args| {
            let key = arg(cx, args, 0)?.clone();
            let fallback = arg(cx, args, 1)?.clone();
            with_map(cx, this, |entries| Ok(lookup(entries, &key).unwrap_or(fallback)))
        })
        .method("public boolean containsKey(Object)", |cx, this, args| {
            let key = arg(cx, args, 0)?.clone();
            with_map(cx, this, |entries| {
                Ok(Value::Boolean(entries.iter().any(|(k, _)| text::equals(k, &key))))
            })
        })
        .method("public boolean containsValue(Object)", |cx, this, args| {
            let value = arg(cx, args, 0)?.clone();
            with_map(cx, this, |entries| {
                Ok(Value::Boolean(entries.iter().any(|(_, v)| text::equals(v, &value))))
            })
        })
        .method("public V remove(Object)", |cx, this, args| {
            let key = arg(cx, args, 0)?.clone();
            with_map(cx, this, |entries| {
                match entries.iter().position(|(k, _)| text::equals(k, &key)) {
                    Some(at) => Ok(entries.remove(at).1),
                    None => Ok(Value::Null),
                }
            })
        })
        .method("public void putAll(Map<? extends K, ? extends V>)", |cx, this, args| {
            let added = entries(cx, args, 0)?;
            with_map(cx, this, |entries| {
                for (key, value) in added {
                    put(entries, key, value);
                }
                Ok(Value::Null)
            })
        })
        .method("public void clear()", |cx, this, _| {
            with_map(cx, this, |entries| {
                entries.clear();
                Ok(Value::Null)
            })
        })
        .method("public Collection<V> values()", |cx, this, _| {
            with_map(cx, this, |entries| {
                Ok(new_list(entries.iter().map(|(_, v)| v.clone()).collect()))
            })
        })
        .finish();

    registry
        .declare("public class java.util.HashMap<K, V> implements Map<K, V>")
        .constructor("public HashMap()", |_, _, _| Ok(new_map(Vec::new())))
        .constructor("public HashMap(int)", |cx, _, args| {
            let capacity = int(cx, args, 0)?;
            if capacity < 0 {
                return Err(cx.throwable(
                    IAE,
                    Some(format!("Illegal initial capacity: {capacity}")),
                ));
            }
            Ok(new_map(Vec::new()))
        })
        .constructor("public HashMap(Map<? extends K, ? extends V>)", |cx, _, args| {
            Ok(new_map(entries(cx, args, 0)?))
        })
        .finish();
}

/// `[1, 2, 3]`, or `null` for a null array.
fn render_array(cx: &dyn MemberCatalog, _: Option<&Value>, args: &[Value]) -> HostResult<Value> {
    match arg(cx, args, 0)? {
        Value::Array(a) => {
            let parts: Vec<String> = a.items().iter().map(|v| text::display(cx, v)).collect();
            Ok(Value::string(format!("[{}]", parts.join(", "))))
        }
        _ => Ok(Value::string("null")),
    }
}

fn sort_values(cx: &dyn MemberCatalog, items: &mut [Value]) -> HostResult<()> {
    let mut failure = None;
    items.sort_by(|a, b| match text::compare(cx, a, b) {
        Ok(ordering) => ordering,
        Err(thrown) => {
            failure.get_or_insert(thrown);
            Ordering::Equal
        }
    });
    match failure {
        Some(thrown) => Err(thrown),
        None => Ok(()),
    }
}

fn fill(cx: &dyn MemberCatalog, _: Option<&Value>, args: &[Value]) -> HostResult<Value> {
    let target = array(cx, args, 0)?;
    let value = arg(cx, args, 1)?.clone();
    let element = target.element().clone();
    let value = match element.as_primitive() {
        Some(p) => value.convert(p).unwrap_or(value),
        None => {
            if !value.is_null() {
                let actual = cx.runtime_type(&value);
                if !relations::is_instance(cx, &element, &actual) {
                    return Err(cx.throwable(
                        "java.lang.ArrayStoreException",
                        Some(actual.qualified()),
                    ));
                }
            }
            value
        }
    };
    for i in 0..target.len() {
        target.set(i, value.clone());
    }
    Ok(Value::Null)
}

fn copy_of(cx: &dyn MemberCatalog, _: Option<&Value>, args: &[Value]) -> HostResult<Value> {
    let source = array(cx, args, 0)?;
    let len = int(cx, args, 1)?;
    if len < 0 {
        return Err(cx.throwable("java.lang.NegativeArraySizeException", Some(len.to_string())));
    }
    let copy = Array::filled(source.element().clone(), len as usize);
    for (i, value) in source.items().iter().take(len as usize).enumerate() {
        copy.set(i, value.clone());
    }
    Ok(Value::Array(copy))
}

const ELEMENT_TYPES: &[&str] = &[
    "int", "long", "short", "byte", "char", "double", "float", "boolean", "Object",
];

fn install_arrays(registry: &mut Registry) {
    let mut arrays = registry
        .declare("public final class java.util.Arrays")
        .method("public static <T> List<T> asList(T...)", |cx, _, args| {
            Ok(new_list(array(cx, args, 0)?.items().clone()))
        })
        .method("public static <T> T[] copyOf(T[], int)", copy_of);
    for element in ELEMENT_TYPES {
        arrays = arrays
            .method(&format!("public static String toString({element}[])"), render_array)
            .method(&format!("public static void fill({element}[], {element})"), fill)
            .method(
                &format!("public static boolean equals({element}[], {element}[])"),
                |cx, _, args| {
                    let same = match (arg(cx, args, 0)?, arg(cx, args, 1)?) {
                        (Value::Null, Value::Null) => true,
                        (Value::Array(a), Value::Array(b)) => {
                            let (a, b) = (a.items(), b.items());
                            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| text::equals(x, y))
                        }
                        _ => false,
                    };
                    Ok(Value::Boolean(same))
                },
            )
            .method(&format!("public static int hashCode({element}[])"), |cx, _, args| {
                Ok(Value::Int(match arg(cx, args, 0)? {
                    Value::Array(a) => text::sequence_hash(a.items().iter()),
                    _ => 0,
                }))
            });
        if *element != "boolean" {
            arrays = arrays.method(&format!("public static void sort({element}[])"), |cx, _, args| {
                let target = array(cx, args, 0)?;
                let mut items = target.items().clone();
                sort_values(cx, &mut items)?;
                for (i, value) in items.into_iter().enumerate() {
                    target.set(i, value);
                }
                Ok(Value::Null)
            });
        }
        if *element != "Object" {
            arrays = arrays.method(
                &format!("public static {element}[] copyOf({element}[], int)"),
                copy_of,
            );
        }
    }
    arrays.finish();
}

fn install_objects(registry: &mut Registry) {
    registry
        .declare("public final class java.util.Objects")
        .method("public static boolean equals(Object, Object)", |cx, _, args| {
            Ok(Value::Boolean(text::equals(arg(cx, args, 0)?, arg(cx, args, 1)?)))
        })
        .method("public static int hashCode(Object)", |cx, _, args| {
            Ok(Value::Int(text::hash_code(arg(cx, args, 0)?)))
        })
        .method("public static int hash(Object...)", |cx, _, args| {
            Ok(Value::Int(match arg(cx, args, 0)? {
                Value::Array(a) => text::sequence_hash(a.items().iter()),
                _ => 0,
            }))
        })
        .method("public static String toString(Object)", |cx, _, args| {
            Ok(Value::string(text::display(cx, arg(cx, args, 0)?)))
        })
        .method("public static String toString(Object, String)", |cx, _, args| {
            match arg(cx, args, 0)? {
                Value::Null => Ok(arg(cx, args, 1)?.clone()),
                other => Ok(Value::string(text::display(cx, other))),
            }
        })
        .method("public static boolean isNull(Object)", |cx, _, args| {
            Ok(Value::Boolean(arg(cx, args, 0)?.is_null()))
        })
        .method("public static boolean nonNull(Object)", |cx, _, args| {
            Ok(Value::Boolean(!arg(cx, args, 0)?.is_null()))
        })
        .method("public static <T> T requireNonNull(T)", |cx, _, args| {
            match arg(cx, args, 0)? {
                Value::Null => Err(cx.throwable(NPE, None)),
                other => Ok(other.clone()),
            }
        })
        .method("public static <T> T requireNonNull(T, String)", |cx, _, args| {
            match arg(cx, args, 0)? {
                Value::Null => {
                    let message = match arg(cx, args, 1)? {
                        Value::Str(s) => Some(s.to_string()),
                        _ => None,
                    };
                    Err(cx.throwable(NPE, message))
                }
                other => Ok(other.clone()),
            }
        })
        .method("public static <T> T requireNonNullElse(T, T)", |cx, _, args| {
            match arg(cx, args, 0)? {
                Value::Null => match arg(cx, args, 1)? {
                    Value::Null => Err(cx.throwable(NPE, Some("defaultObj".into()))),
                    fallback => Ok(fallback.clone()),
                },
                other => Ok(other.clone()),
            }
        })
        .finish();
}
