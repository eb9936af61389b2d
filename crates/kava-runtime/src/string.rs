//! `String`, `CharSequence` and `StringBuilder`.
//!
//! Indices count UTF-16 code units.

use std::rc::Rc;

use kava_core::{Array, HostResult, MemberCatalog, Native, Object, Type, Value};

use crate::args::{
    arg, array, char_value, chars, index, int, long, receiver, receiver_object, receiver_str,
    string,
};
use crate::registry::Registry;
use crate::text::{self, from_units, units};

const SIOOBE: &str = "java.lang.StringIndexOutOfBoundsException";
const STRING_BUILDER: &str = "java.lang.StringBuilder";

/// Text of a `CharSequence` receiver.
fn sequence(cx: &dyn MemberCatalog, this: Option<&Value>) -> HostResult<String> {
    Ok(text::display(cx, receiver(cx, this)?))
}

fn find(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    (from..haystack.len().saturating_sub(needle.len() - 1))
        .find(|&i| haystack[i..].starts_with(needle))
}

fn rfind(haystack: &[u16], needle: &[u16]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..].starts_with(needle))
}

fn position(found: Option<usize>) -> Value {
    Value::Int(found.map_or(-1, |i| i as i32))
}

/// `begin 2, end 9, length 5`
fn range(cx: &dyn MemberCatalog, begin: i32, end: i32, len: usize) -> HostResult<(usize, usize)> {
    if begin < 0 || end < begin || end as usize > len {
        return Err(cx.throwable(
            SIOOBE,
            Some(format!("begin {begin}, end {end}, length {len}")),
        ));
    }
    Ok((begin as usize, end as usize))
}

fn char_array(units: Vec<u16>) -> Value {
    Value::Array(Array::new(
        Type::primitive(kava_core::Primitive::Char),
        units.into_iter().map(Value::Char).collect(),
    ))
}

fn chars_of(array: &Array) -> Vec<u16> {
    array
        .items()
        .iter()
        .map(|v| match v {
            Value::Char(c) => *c,
            _ => 0,
        })
        .collect()
}

fn builder_text(cx: &dyn MemberCatalog, this: Option<&Value>) -> HostResult<Rc<Object>> {
    let this = receiver_object(cx, this)?;
    if !matches!(&*this.native(), Native::Text(_)) {
        return Err(cx.throwable(
            "java.lang.IllegalStateException",
            Some("not a StringBuilder".into()),
        ));
    }
    Ok(this)
}

/// Apply `edit` to the builder's text, returning the builder.
fn edit_builder(
    cx: &dyn MemberCatalog,
    this: Option<&Value>,
    edit: impl FnOnce(&mut Vec<u16>) -> HostResult<()>,
) -> HostResult<Value> {
    let builder = builder_text(cx, this)?;
    {
        let mut native = builder.native_mut();
        if let Native::Text(text) = &mut *native {
            let mut buffer = units(text);
            edit(&mut buffer)?;
            *text = from_units(&buffer);
        }
    }
    Ok(Value::Object(builder))
}

fn append(cx: &dyn MemberCatalog, this: Option<&Value>, tail: String) -> HostResult<Value> {
    let builder = builder_text(cx, this)?;
    if let Native::Text(text) = &mut *builder.native_mut() {
        text.push_str(&tail);
    }
    Ok(Value::Object(builder))
}

fn new_builder(text: String) -> Value {
    Value::Object(Object::with_native(
        Type::class(STRING_BUILDER),
        Native::Text(text),
    ))
}

pub(crate) fn install(registry: &mut Registry) {
    registry
        .declare("public interface java.lang.CharSequence")
        .method("public int length()", |cx, this, _| {
            Ok(Value::Int(units(&sequence(cx, this)?).len() as i32))
        })
        .method("public char charAt(int)", |cx, this, args| {
            let text = units(&sequence(cx, this)?);
            let at = index(cx, SIOOBE, long(cx, args, 0)?, text.len())?;
            Ok(Value::Char(text[at]))
        })
        .method("public boolean isEmpty()", |cx, this, _| {
            Ok(Value::Boolean(sequence(cx, this)?.is_empty()))
        })
        .method("public String toString()", |cx, this, _| {
            Ok(Value::string(sequence(cx, this)?))
        })
        .finish();

    install_string(registry);
    install_builder(registry);
}

fn install_string(registry: &mut Registry) {
    let mut string_class = registry
        .declare(
            "public final class java.lang.String implements CharSequence, Comparable<String>",
        )
        .constructor("public String()", |_, _, _| Ok(Value::string("")))
        .constructor("public String(String)", |cx, _, args| {
            Ok(Value::Str(string(cx, args, 0)?))
        })
        .constructor("public String(char[])", |cx, _, args| {
            Ok(Value::string(from_units(&chars_of(&*array(cx, args, 0)?))))
        })
        .method("public int length()", |cx, this, _| {
            Ok(Value::Int(units(&receiver_str(cx, this)?).len() as i32))
        })
        .method("public char charAt(int)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            let at = index(cx, SIOOBE, long(cx, args, 0)?, text.len())?;
            Ok(Value::Char(text[at]))
        })
        .method("public boolean isEmpty()", |cx, this, _| {
            Ok(Value::Boolean(receiver_str(cx, this)?.is_empty()))
        })
        .method("public boolean isBlank()", |cx, this, _| {
            Ok(Value::Boolean(receiver_str(cx, this)?.trim().is_empty()))
        })
        .method("public String substring(int)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            let (begin, end) = range(cx, int(cx, args, 0)?, text.len() as i32, text.len())?;
            Ok(Value::string(from_units(&text[begin..end])))
        })
        .method("public String substring(int, int)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            let (begin, end) = range(cx, int(cx, args, 0)?, int(cx, args, 1)?, text.len())?;
            Ok(Value::string(from_units(&text[begin..end])))
        })
        .method("public int indexOf(String)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            Ok(position(find(&text, &units(&string(cx, args, 0)?), 0)))
        })
        .method("public int indexOf(int)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            let unit = int(cx, args, 0)? as u16;
            Ok(position(text.iter().position(|&u| u == unit)))
        })
        .method("public int indexOf(String, int)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            let from = int(cx, args, 1)?.max(0) as usize;
            Ok(position(find(&text, &units(&string(cx, args, 0)?), from)))
        })
        .method("public int lastIndexOf(String)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            Ok(position(rfind(&text, &units(&string(cx, args, 0)?))))
        })
        .method("public int lastIndexOf(int)", |cx, this, args| {
            let text = units(&receiver_str(cx, this)?);
            let unit = int(cx, args, 0)? as u16;
            Ok(position(text.iter().rposition(|&u| u == unit)))
        })
        .method("public boolean contains(CharSequence)", |cx, this, args| {
            Ok(Value::Boolean(
                receiver_str(cx, this)?.contains(chars(cx, args, 0)?.as_str()),
            ))
        })
        .method("public boolean startsWith(String)", |cx, this, args| {
            Ok(Value::Boolean(
                receiver_str(cx, this)?.starts_with(&*string(cx, args, 0)?),
            ))
        })
        .method("public boolean endsWith(String)", |cx, this, args| {
            Ok(Value::Boolean(
                receiver_str(cx, this)?.ends_with(&*string(cx, args, 0)?),
            ))
        })
        .method("public boolean equals(Object)", |cx, this, args| {
            let this = receiver(cx, this)?;
            Ok(Value::Boolean(text::equals(this, arg(cx, args, 0)?)))
        })
        .method("public boolean equalsIgnoreCase(String)", |cx, this, args| {
            let this = receiver_str(cx, this)?;
            Ok(Value::Boolean(match arg(cx, args, 0)? {
                Value::Str(other) => this.to_lowercase() == other.to_lowercase(),
                _ => false,
            }))
        })
        .method("public int compareTo(String)", |cx, this, args| {
            let this = receiver_str(cx, this)?;
            Ok(Value::Int(text::compare_strings(&this, &string(cx, args, 0)?)))
        })
        .method("public int compareToIgnoreCase(String)", |cx, this, args| {
            let this = receiver_str(cx, this)?.to_lowercase();
            let other = string(cx, args, 0)?.to_lowercase();
            Ok(Value::Int(text::compare_strings(&this, &other)))
        })
        .method("public int hashCode()", |cx, this, _| {
            Ok(Value::Int(text::string_hash(&receiver_str(cx, this)?)))
        })
        .method("public String toString()", |cx, this, _| {
            Ok(Value::Str(receiver_str(cx, this)?))
        })
        .method("public String toUpperCase()", |cx, this, _| {
            Ok(Value::string(receiver_str(cx, this)?.to_uppercase()))
        })
        .method("public String toLowerCase()", |cx, this, _| {
            Ok(Value::string(receiver_str(cx, this)?.to_lowercase()))
        })
        .method("public String trim()", |cx, this, _| {
            let this = receiver_str(cx, this)?;
            Ok(Value::string(this.trim_matches(|c: char| c <= ' ')))
        })
        .method("public String strip()", |cx, this, _| {
            Ok(Value::string(receiver_str(cx, this)?.trim()))
        })
        .method("public String concat(String)", |cx, this, args| {
            let this = receiver_str(cx, this)?;
            Ok(Value::string(format!("{this}{}", string(cx, args, 0)?)))
        })
        .method("public String repeat(int)", |cx, this, args| {
            let count = int(cx, args, 0)?;
            if count < 0 {
                return Err(cx.throwable(
                    crate::args::IAE,
                    Some(format!("count is negative: {count}")),
                ));
            }
            Ok(Value::string(receiver_str(cx, this)?.repeat(count as usize)))
        })
        .method("public String replace(char, char)", |cx, this, args| {
            let (from, to) = (char_value(cx, args, 0)?, char_value(cx, args, 1)?);
            let replaced: Vec<u16> = units(&receiver_str(cx, this)?)
                .into_iter()
                .map(|u| if u == from { to } else { u })
                .collect();
            Ok(Value::string(from_units(&replaced)))
        })
        .method(
            "public String replace(CharSequence, CharSequence)",
            |cx, this, args| {
                let this = receiver_str(cx, this)?;
                let (from, to) = (chars(cx, args, 0)?, chars(cx, args, 1)?);
                Ok(Value::string(this.replace(from.as_str(), &to)))
            },
        )
        .method("public String[] split(String)", |cx, this, args| {
            let this = receiver_str(cx, this)?;
            let separator = string(cx, args, 0)?;
            let mut parts: Vec<&str> = if separator.is_empty() {
                this.split("").filter(|s| !s.is_empty()).collect()
            } else {
                this.split(&*separator).collect()
            };
            while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
                parts.pop();
            }
            Ok(Value::Array(Array::new(
                Type::string(),
                parts.into_iter().map(Value::string).collect(),
            )))
        })
        .method("public char[] toCharArray()", |cx, this, _| {
            Ok(char_array(units(&receiver_str(cx, this)?)))
        })
        .method("public static String format(String, Object...)", |cx, _, args| {
            let pattern = string(cx, args, 0)?;
            let values = array(cx, args, 1)?.items().clone();
            Ok(Value::string(text::format(cx, &pattern, &values)?))
        })
        .method(
            "public static String join(CharSequence, CharSequence...)",
            |cx, _, args| {
                let separator = chars(cx, args, 0)?;
                let parts: Vec<String> = array(cx, args, 1)?
                    .items()
                    .iter()
                    .map(|v| text::display(cx, v))
                    .collect();
                Ok(Value::string(parts.join(&separator)))
            },
        )
        .method("public static String valueOf(char[])", |cx, _, args| {
            Ok(Value::string(from_units(&chars_of(&*array(cx, args, 0)?))))
        });
    for param in ["Object", "boolean", "char", "int", "long", "float", "double"] {
        string_class = string_class.method(
            &format!("public static String valueOf({param})"),
            |cx, _, args| Ok(Value::string(text::display(cx, arg(cx, args, 0)?))),
        );
    }
    string_class.finish();
}

fn install_builder(registry: &mut Registry) {
    let mut builder = registry
        .declare("public final class java.lang.StringBuilder implements CharSequence")
        .constructor("public StringBuilder()", |_, _, _| Ok(new_builder(String::new())))
        .constructor("public StringBuilder(int)", |_, _, _| Ok(new_builder(String::new())))
        .constructor("public StringBuilder(String)", |cx, _, args| {
            Ok(new_builder(string(cx, args, 0)?.to_string()))
        })
        .method("public StringBuilder append(char[])", |cx, this, args| {
            let tail = from_units(&chars_of(&*array(cx, args, 0)?));
            append(cx, this, tail)
        });
    for param in ["Object", "String", "CharSequence", "boolean", "char", "int", "long", "float", "double"] {
        builder = builder.method(
            &format!("public StringBuilder append({param})"),
            |cx, this, args| {
                let tail = text::display(cx, arg(cx, args, 0)?);
                append(cx, this, tail)
            },
        );
    }
    builder
        .method("public StringBuilder insert(int, String)", |cx, this, args| {
            let at = int(cx, args, 0)?;
            let inserted = units(&text::display(cx, arg(cx, args, 1)?));
            edit_builder(cx, this, |buffer| {
                let at = offset(cx, at, buffer.len())?;
                let tail = buffer.split_off(at);
                buffer.extend(inserted);
                buffer.extend(tail);
                Ok(())
            })
        })
        .method("public StringBuilder insert(int, char)", |cx, this, args| {
            let at = int(cx, args, 0)?;
            let c = char_value(cx, args, 1)?;
            edit_builder(cx, this, |buffer| {
                let at = offset(cx, at, buffer.len())?;
                buffer.insert(at, c);
                Ok(())
            })
        })
        .method("public StringBuilder reverse()", |cx, this, _| {
            let builder = builder_text(cx, this)?;
            if let Native::Text(text) = &mut *builder.native_mut() {
                *text = text.chars().rev().collect();
            }
            Ok(Value::Object(builder))
        })
        .method("public StringBuilder deleteCharAt(int)", |cx, this, args| {
            let at = long(cx, args, 0)?;
            edit_builder(cx, this, |buffer| {
                let at = index(cx, SIOOBE, at, buffer.len())?;
                buffer.remove(at);
                Ok(())
            })
        })
        .method("public StringBuilder delete(int, int)", |cx, this, args| {
            let (begin, end) = (int(cx, args, 0)?, int(cx, args, 1)?);
            edit_builder(cx, this, |buffer| {
                let end = end.min(buffer.len() as i32);
                let (begin, end) = range(cx, begin, end, buffer.len())?;
                buffer.drain(begin..end);
                Ok(())
            })
        })
        .method("public void setCharAt(int, char)", |cx, this, args| {
            let at = long(cx, args, 0)?;
            let c = char_value(cx, args, 1)?;
            edit_builder(cx, this, |buffer| {
                let at = index(cx, SIOOBE, at, buffer.len())?;
                buffer[at] = c;
                Ok(())
            })?;
            Ok(Value::Null)
        })
        .method("public void setLength(int)", |cx, this, args| {
            let len = int(cx, args, 0)?;
            edit_builder(cx, this, |buffer| {
                if len < 0 {
                    return Err(cx.throwable(SIOOBE, Some(format!("length {len}"))));
                }
                buffer.resize(len as usize, 0);
                Ok(())
            })?;
            Ok(Value::Null)
        })
        .method("public int indexOf(String)", |cx, this, args| {
            let text = units(&sequence(cx, this)?);
            Ok(position(find(&text, &units(&string(cx, args, 0)?), 0)))
        })
        .method("public String substring(int, int)", |cx, this, args| {
            let text = units(&sequence(cx, this)?);
            let (begin, end) = range(cx, int(cx, args, 0)?, int(cx, args, 1)?, text.len())?;
            Ok(Value::string(from_units(&text[begin..end])))
        })
        .finish();
}

/// An insertion offset, `0..=len`.
fn offset(cx: &dyn MemberCatalog, at: i32, len: usize) -> HostResult<usize> {
    if at < 0 || at as usize > len {
        return Err(cx.throwable(SIOOBE, Some(format!("offset {at}, length {len}"))));
    }
    Ok(at as usize)
}
