//! Library-wide value semantics: `toString`, `equals`, `hashCode`,
//! `compareTo` and `String.format`.

use std::cmp::Ordering;
use std::rc::Rc;

use kava_core::relations;
use kava_core::{HostResult, MemberCatalog, Native, Object, Value, types};

use crate::args::IAE;
use crate::{awt, throwable};

/// UTF-16 code units of a string, the unit `length()` and `charAt` count in.
pub fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

pub fn from_units(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

/// `String.valueOf(value)` for library values.
pub fn display(cx: &dyn MemberCatalog, value: &Value) -> String {
    match value {
        Value::Object(object) => display_object(cx, object),
        other => other.to_string(),
    }
}

fn display_object(cx: &dyn MemberCatalog, object: &Rc<Object>) -> String {
    let name = object.class().class_name().unwrap_or(types::OBJECT);
    if name == awt::POINT {
        return awt::describe(object);
    }
    match &*object.native() {
        Native::Text(text) => return text.clone(),
        Native::List(items) => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Object(inner) if Rc::ptr_eq(inner, object) => "(this Collection)".into(),
                    item => display(cx, item),
                })
                .collect();
            return format!("[{}]", rendered.join(", "));
        }
        Native::Map(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}={}", display(cx, k), display(cx, v)))
                .collect();
            return format!("{{{}}}", rendered.join(", "));
        }
        Native::None | Native::Opaque(_) => {}
    }
    if relations::is_subclass(cx, name, types::THROWABLE) {
        return throwable::describe(object);
    }
    Value::Object(object.clone()).to_string()
}

/// `Object.equals` as the library classes define it.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Class(x), Value::Class(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y) || object_equals(x, y),
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        (x, y) => match (x.primitive(), y.primitive()) {
            (Some(px), Some(py)) => px == py && x.identical(y),
            _ => false,
        },
    }
}

fn object_equals(x: &Object, y: &Object) -> bool {
    if x.class() != y.class() {
        return false;
    }
    if x.class().is_class(awt::POINT) {
        return x.field("x").is_some_and(|a| y.field("x").is_some_and(|b| a.identical(&b)))
            && x.field("y").is_some_and(|a| y.field("y").is_some_and(|b| a.identical(&b)));
    }
    match (&*x.native(), &*y.native()) {
        (Native::List(a), Native::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(p, q)| equals(p, q))
        }
        (Native::Map(a), Native::Map(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, v)| {
                    b.iter()
                        .find(|(other, _)| equals(k, other))
                        .is_some_and(|(_, w)| equals(v, w))
                })
        }
        _ => false,
    }
}

/// `Object.hashCode` as the library classes define it.
pub fn hash_code(value: &Value) -> i32 {
    match value {
        Value::Null => 0,
        Value::Boolean(b) => {
            if *b {
                1231
            } else {
                1237
            }
        }
        Value::Byte(v) => *v as i32,
        Value::Short(v) => *v as i32,
        Value::Char(v) => *v as i32,
        Value::Int(v) => *v,
        Value::Long(v) => (*v ^ ((*v as u64) >> 32) as i64) as i32,
        Value::Float(v) => v.to_bits() as i32,
        Value::Double(v) => long_bits_hash(v.to_bits()),
        Value::Str(s) => string_hash(s),
        Value::Class(t) => string_hash(&t.qualified()),
        Value::Array(a) => Rc::as_ptr(a) as usize as i32,
        Value::Object(o) => object_hash(o),
    }
}

fn long_bits_hash(bits: u64) -> i32 {
    (bits ^ (bits >> 32)) as i32
}

/// `s[0]*31^(n-1) + ... + s[n-1]` over UTF-16 units.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Hash of a sequence, as `List.hashCode` and `Arrays.hashCode` define it.
pub fn sequence_hash<'v>(items: impl IntoIterator<Item = &'v Value>) -> i32 {
    items
        .into_iter()
        .fold(1i32, |h, item| h.wrapping_mul(31).wrapping_add(hash_code(item)))
}

fn object_hash(object: &Rc<Object>) -> i32 {
    if object.class().is_class(awt::POINT) {
        let coordinate = |name| object.field(name).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let bits = coordinate("x").to_bits() ^ coordinate("y").to_bits().wrapping_mul(31);
        return long_bits_hash(bits);
    }
    match &*object.native() {
        Native::List(items) => sequence_hash(items),
        Native::Map(entries) => entries
            .iter()
            .fold(0i32, |h, (k, v)| h.wrapping_add(hash_code(k) ^ hash_code(v))),
        _ => Rc::as_ptr(object) as usize as i32,
    }
}

/// `String.compareTo`: difference of the first differing units, else of
/// the lengths.
pub fn compare_strings(a: &str, b: &str) -> i32 {
    let (a, b) = (units(a), units(b));
    for (x, y) in a.iter().zip(&b) {
        if x != y {
            return *x as i32 - *y as i32;
        }
    }
    a.len() as i32 - b.len() as i32
}

/// Natural ordering of `Comparable` library values.
pub fn compare(cx: &dyn MemberCatalog, a: &Value, b: &Value) -> HostResult<Ordering> {
    let ordering = match (a, b) {
        (Value::Str(x), Value::Str(y)) => compare_strings(x, y).cmp(&0),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Float(_) | Value::Double(_), _) | (_, Value::Float(_) | Value::Double(_)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => return Err(not_comparable(cx, a, b)),
            }
        }
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => return Err(not_comparable(cx, a, b)),
        },
    };
    Ok(ordering)
}

fn not_comparable(cx: &dyn MemberCatalog, a: &Value, b: &Value) -> kava_core::Thrown {
    let culprit = if a.is_null() || b.is_null() {
        return cx.throwable("java.lang.NullPointerException", None);
    } else if a.primitive().is_none() && a.as_str().is_none() {
        a
    } else {
        b
    };
    let class = cx.runtime_type(culprit);
    cx.throwable(
        "java.lang.ClassCastException",
        Some(format!("class {class:#} cannot be cast to class java.lang.Comparable")),
    )
}

/// `String.format` over the `%[flags][width][.precision]conversion` subset
/// the library supports: `s S d x X o f e E c b B h n %`.
pub fn format(cx: &dyn MemberCatalog, pattern: &str, args: &[Value]) -> HostResult<String> {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    let mut next_arg = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ',' => spec.group = true,
                ' ' => spec.space = true,
                _ => break,
            }
            chars.next();
        }
        spec.width = digits(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(digits(&mut chars).unwrap_or(0));
        }
        let Some(conversion) = chars.next() else {
            return Err(bad_format(cx, "Format specifier '%'".into()));
        };
        let body = match conversion {
            '%' => "%".to_string(),
            'n' => "\n".to_string(),
            _ => {
                let Some(value) = args.get(next_arg) else {
                    return Err(bad_format(cx, format!("Format specifier '%{conversion}'")));
                };
                next_arg += 1;
                convert(cx, conversion, &spec, value)?
            }
        };
        out.push_str(&spec.pad(body, conversion));
    }
    Ok(out)
}

#[derive(Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    group: bool,
    space: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Spec {
    fn pad(&self, body: String, conversion: char) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = width - len;
        if self.left {
            format!("{body}{}", " ".repeat(fill))
        } else if self.zero && "dxXofeE".contains(conversion) {
            let (sign, digits) = match body.strip_prefix(['-', '+']) {
                Some(rest) => (&body[..1], rest),
                None => ("", body.as_str()),
            };
            format!("{sign}{}{digits}", "0".repeat(fill))
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }

    fn sign(&self, negative: bool, magnitude: String) -> String {
        if negative {
            format!("-{magnitude}")
        } else if self.plus {
            format!("+{magnitude}")
        } else if self.space {
            format!(" {magnitude}")
        } else {
            magnitude
        }
    }
}

fn digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0) * 10 + d as usize);
        chars.next();
    }
    value
}

fn bad_format(cx: &dyn MemberCatalog, message: String) -> kava_core::Thrown {
    cx.throwable(IAE, Some(message))
}

fn group_thousands(digits: &str) -> String {
    let (int_part, rest) = match digits.find('.') {
        Some(dot) => digits.split_at(dot),
        None => (digits, ""),
    };
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped + rest
}

fn convert(cx: &dyn MemberCatalog, conversion: char, spec: &Spec, value: &Value) -> HostResult<String> {
    let mismatch = || {
        let class = match value {
            Value::Null => "null".to_string(),
            other => cx.runtime_type(other).qualified(),
        };
        bad_format(cx, format!("{conversion} != {class}"))
    };
    let text = match conversion {
        's' | 'S' => {
            let mut text = display(cx, value);
            if let Some(precision) = spec.precision {
                text = text.chars().take(precision).collect();
            }
            if conversion == 'S' {
                text.to_uppercase()
            } else {
                text
            }
        }
        'b' | 'B' => {
            let truth = match value {
                Value::Null => false,
                Value::Boolean(b) => *b,
                _ => true,
            };
            let text = truth.to_string();
            if conversion == 'B' { text.to_uppercase() } else { text }
        }
        'h' => match value {
            Value::Null => "null".into(),
            other => format!("{:x}", hash_code(other)),
        },
        'c' => match value {
            Value::Null => "null".into(),
            Value::Char(c) => from_units(&[*c]),
            other => match other.as_i64().and_then(|v| char::from_u32(v as u32)) {
                Some(c) if !matches!(other, Value::Long(_)) => c.to_string(),
                _ => return Err(mismatch()),
            },
        },
        'd' => match value {
            Value::Null => "null".into(),
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) => {
                let v = value.as_i64().unwrap_or_default();
                let magnitude = v.unsigned_abs().to_string();
                let magnitude = if spec.group { group_thousands(&magnitude) } else { magnitude };
                spec.sign(v < 0, magnitude)
            }
            _ => return Err(mismatch()),
        },
        'x' | 'X' | 'o' => {
            let bits = match value {
                Value::Null => return Ok("null".into()),
                Value::Byte(v) => *v as u8 as u64,
                Value::Short(v) => *v as u16 as u64,
                Value::Int(v) => *v as u32 as u64,
                Value::Long(v) => *v as u64,
                _ => return Err(mismatch()),
            };
            match conversion {
                'x' => format!("{bits:x}"),
                'X' => format!("{bits:X}"),
                _ => format!("{bits:o}"),
            }
        }
        'f' | 'e' | 'E' => {
            let v = match value {
                Value::Null => return Ok("null".into()),
                Value::Float(_) | Value::Double(_) => value.as_f64().unwrap_or_default(),
                _ => return Err(mismatch()),
            };
            if v.is_nan() {
                return Ok("NaN".into());
            }
            if v.is_infinite() {
                return Ok(spec.sign(v < 0.0, "Infinity".into()));
            }
            let precision = spec.precision.unwrap_or(6);
            let magnitude = if conversion == 'f' {
                let text = format!("{:.*}", precision, v.abs());
                if spec.group { group_thousands(&text) } else { text }
            } else {
                scientific(v.abs(), precision, conversion == 'E')
            };
            spec.sign(v.is_sign_negative() && v != 0.0, magnitude)
        }
        other => {
            return Err(bad_format(cx, format!("Conversion = '{other}'")));
        }
    };
    Ok(text)
}

/// `1.500000e+01`: Rust writes `1.500000e1`, the library pads the exponent
/// to two digits with an explicit sign.
fn scientific(v: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, v);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let text = format!("{mantissa}e{sign}{:02}", exponent.abs());
    if upper { text.to_uppercase() } else { text }
}
