//! `Number`, the primitive wrapper classes, `Character` and `Boolean`.
//!
//! Boxed values are represented by their primitive [`Value`]; instance
//! methods receive the primitive as their receiver.

use kava_core::{HostResult, MemberCatalog, Primitive, Value};

use crate::args::{arg, boolean, char_value, double, int, long, receiver, string};
use crate::registry::{ClassBuilder, Registry};
use crate::text;

const NFE: &str = "java.lang.NumberFormatException";

fn convert(cx: &dyn MemberCatalog, this: Option<&Value>, to: Primitive) -> HostResult<Value> {
    let this = receiver(cx, this)?;
    this.convert(to).ok_or_else(|| {
        cx.throwable(
            "java.lang.ClassCastException",
            Some(format!("{} is not a number", cx.runtime_type(this).qualified())),
        )
    })
}

/// `Integer.parseInt` and friends: optional sign, digits in `radix`, and
/// a range check against the target width.
fn parse_integral(
    cx: &dyn MemberCatalog,
    text: &str,
    radix: i32,
    min: i64,
    max: i64,
) -> HostResult<i64> {
    let suffix = if radix == 10 {
        String::new()
    } else {
        format!(" under radix {radix}")
    };
    let invalid = || cx.throwable(NFE, Some(format!("For input string: \"{text}\"{suffix}")));
    if !(2..=36).contains(&radix) {
        return Err(cx.throwable(NFE, Some(format!("radix {radix} out of range"))));
    }
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(invalid());
    }
    let value = i128::from_str_radix(text, radix as u32).map_err(|_| invalid())?;
    if value < min as i128 || value > max as i128 {
        if max > i16::MAX as i64 {
            return Err(invalid());
        }
        return Err(cx.throwable(
            NFE,
            Some(format!("Value out of range. Value:\"{text}\" Radix:{radix}")),
        ));
    }
    Ok(value as i64)
}

fn parse_floating(cx: &dyn MemberCatalog, text: &str) -> HostResult<f64> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_suffix(['f', 'F', 'd', 'D'])
        .unwrap_or(trimmed);
    let parsed = match body {
        "NaN" => Ok(f64::NAN),
        "Infinity" | "+Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        _ if body.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => Err(()),
        _ => body.parse::<f64>().map_err(|_| ()),
    };
    parsed.map_err(|_| cx.throwable(NFE, Some(format!("For input string: \"{text}\""))))
}

fn compare_values(cx: &dyn MemberCatalog, a: &Value, b: &Value) -> HostResult<Value> {
    Ok(Value::Int(match text::compare(cx, a, b)? {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }))
}

/// `compareTo` and the static `compare`, shared by every numeric wrapper.
fn comparable<'r>(builder: ClassBuilder<'r>, simple: &str, primitive: &str) -> ClassBuilder<'r> {
    builder
        .method(&format!("public int compareTo({simple})"), |cx, this, args| {
            compare_values(cx, receiver(cx, this)?, arg(cx, args, 0)?)
        })
        .method(
            &format!("public static int compare({primitive}, {primitive})"),
            |cx, _, args| compare_values(cx, arg(cx, args, 0)?, arg(cx, args, 1)?),
        )
}

pub(crate) fn install(registry: &mut Registry) {
    let mut number = registry.declare("public abstract class java.lang.Number");
    for (name, primitive) in [
        ("byteValue", Primitive::Byte),
        ("shortValue", Primitive::Short),
        ("intValue", Primitive::Int),
        ("longValue", Primitive::Long),
        ("floatValue", Primitive::Float),
        ("doubleValue", Primitive::Double),
    ] {
        number = number.method(
            &format!("public {primitive} {name}()"),
            move |cx, this, _| convert(cx, this, primitive),
        );
    }
    number.finish();

    install_integer(registry);
    install_long(registry);
    install_small(registry);
    install_floating(registry);
    install_character(registry);
    install_boolean(registry);
}

fn install_integer(registry: &mut Registry) {
    let integer = registry
        .declare("public final class java.lang.Integer extends Number implements Comparable<Integer>")
        .constant("public static final int MAX_VALUE", Value::Int(i32::MAX))
        .constant("public static final int MIN_VALUE", Value::Int(i32::MIN))
        .constant("public static final int SIZE", Value::Int(32))
        .constructor("public Integer(int)", |cx, _, args| Ok(Value::Int(int(cx, args, 0)?)))
        .method("public static int parseInt(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_integral(cx, &text, 10, i32::MIN as i64, i32::MAX as i64).map(|v| Value::Int(v as i32))
        })
        .method("public static int parseInt(String, int)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            let radix = int(cx, args, 1)?;
            parse_integral(cx, &text, radix, i32::MIN as i64, i32::MAX as i64)
                .map(|v| Value::Int(v as i32))
        })
        .method("public static Integer valueOf(int)", |cx, _, args| Ok(Value::Int(int(cx, args, 0)?)))
        .method("public static Integer valueOf(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_integral(cx, &text, 10, i32::MIN as i64, i32::MAX as i64).map(|v| Value::Int(v as i32))
        })
        .method("public static String toString(int)", |cx, _, args| {
            Ok(Value::string(int(cx, args, 0)?.to_string()))
        })
        .method("public static String toHexString(int)", |cx, _, args| {
            Ok(Value::string(format!("{:x}", int(cx, args, 0)? as u32)))
        })
        .method("public static String toBinaryString(int)", |cx, _, args| {
            Ok(Value::string(format!("{:b}", int(cx, args, 0)? as u32)))
        })
        .method("public static String toOctalString(int)", |cx, _, args| {
            Ok(Value::string(format!("{:o}", int(cx, args, 0)? as u32)))
        })
        .method("public static int sum(int, int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.wrapping_add(int(cx, args, 1)?)))
        })
        .method("public static int max(int, int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.max(int(cx, args, 1)?)))
        })
        .method("public static int min(int, int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.min(int(cx, args, 1)?)))
        })
        .method("public static int signum(int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.signum()))
        })
        .method("public static int bitCount(int)", |cx, _, args| {
            Ok(Value::Int(int(cx, args, 0)?.count_ones() as i32))
        });
    comparable(integer, "Integer", "int").finish();
}

fn install_long(registry: &mut Registry) {
    let long_class = registry
        .declare("public final class java.lang.Long extends Number implements Comparable<Long>")
        .constant("public static final long MAX_VALUE", Value::Long(i64::MAX))
        .constant("public static final long MIN_VALUE", Value::Long(i64::MIN))
        .constant("public static final int SIZE", Value::Int(64))
        .constructor("public Long(long)", |cx, _, args| Ok(Value::Long(long(cx, args, 0)?)))
        .method("public static long parseLong(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_integral(cx, &text, 10, i64::MIN, i64::MAX).map(Value::Long)
        })
        .method("public static long parseLong(String, int)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            let radix = int(cx, args, 1)?;
            parse_integral(cx, &text, radix, i64::MIN, i64::MAX).map(Value::Long)
        })
        .method("public static Long valueOf(long)", |cx, _, args| Ok(Value::Long(long(cx, args, 0)?)))
        .method("public static Long valueOf(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_integral(cx, &text, 10, i64::MIN, i64::MAX).map(Value::Long)
        })
        .method("public static String toString(long)", |cx, _, args| {
            Ok(Value::string(long(cx, args, 0)?.to_string()))
        })
        .method("public static String toHexString(long)", |cx, _, args| {
            Ok(Value::string(format!("{:x}", long(cx, args, 0)? as u64)))
        })
        .method("public static String toBinaryString(long)", |cx, _, args| {
            Ok(Value::string(format!("{:b}", long(cx, args, 0)? as u64)))
        })
        .method("public static long sum(long, long)", |cx, _, args| {
            Ok(Value::Long(long(cx, args, 0)?.wrapping_add(long(cx, args, 1)?)))
        })
        .method("public static long max(long, long)", |cx, _, args| {
            Ok(Value::Long(long(cx, args, 0)?.max(long(cx, args, 1)?)))
        })
        .method("public static long min(long, long)", |cx, _, args| {
            Ok(Value::Long(long(cx, args, 0)?.min(long(cx, args, 1)?)))
        });
    comparable(long_class, "Long", "long").finish();
}

fn install_small(registry: &mut Registry) {
    let short = registry
        .declare("public final class java.lang.Short extends Number implements Comparable<Short>")
        .constant("public static final short MAX_VALUE", Value::Short(i16::MAX))
        .constant("public static final short MIN_VALUE", Value::Short(i16::MIN))
        .method("public static short parseShort(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_integral(cx, &text, 10, i16::MIN as i64, i16::MAX as i64)
                .map(|v| Value::Short(v as i16))
        })
        .method("public static Short valueOf(short)", |cx, _, args| {
            Ok(Value::Short(int(cx, args, 0)? as i16))
        })
        .method("public static String toString(short)", |cx, _, args| {
            Ok(Value::string(int(cx, args, 0)?.to_string()))
        });
    comparable(short, "Short", "short").finish();

    let byte = registry
        .declare("public final class java.lang.Byte extends Number implements Comparable<Byte>")
        .constant("public static final byte MAX_VALUE", Value::Byte(i8::MAX))
        .constant("public static final byte MIN_VALUE", Value::Byte(i8::MIN))
        .method("public static byte parseByte(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_integral(cx, &text, 10, i8::MIN as i64, i8::MAX as i64)
                .map(|v| Value::Byte(v as i8))
        })
        .method("public static Byte valueOf(byte)", |cx, _, args| {
            Ok(Value::Byte(int(cx, args, 0)? as i8))
        })
        .method("public static String toString(byte)", |cx, _, args| {
            Ok(Value::string(int(cx, args, 0)?.to_string()))
        });
    comparable(byte, "Byte", "byte").finish();
}

fn install_floating(registry: &mut Registry) {
    let double_class = registry
        .declare("public final class java.lang.Double extends Number implements Comparable<Double>")
        .constant("public static final double MAX_VALUE", Value::Double(f64::MAX))
        .constant("public static final double MIN_VALUE", Value::Double(f64::from_bits(1)))
        .constant("public static final double POSITIVE_INFINITY", Value::Double(f64::INFINITY))
        .constant("public static final double NEGATIVE_INFINITY", Value::Double(f64::NEG_INFINITY))
        .constant("public static final double NaN", Value::Double(f64::NAN))
        .constructor("public Double(double)", |cx, _, args| Ok(Value::Double(double(cx, args, 0)?)))
        .method("public static double parseDouble(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_floating(cx, &text).map(Value::Double)
        })
        .method("public static Double valueOf(double)", |cx, _, args| {
            Ok(Value::Double(double(cx, args, 0)?))
        })
        .method("public static Double valueOf(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_floating(cx, &text).map(Value::Double)
        })
        .method("public static String toString(double)", |cx, _, args| {
            Ok(Value::string(Value::Double(double(cx, args, 0)?).to_string()))
        })
        .method("public static boolean isNaN(double)", |cx, _, args| {
            Ok(Value::Boolean(double(cx, args, 0)?.is_nan()))
        })
        .method("public static boolean isInfinite(double)", |cx, _, args| {
            Ok(Value::Boolean(double(cx, args, 0)?.is_infinite()))
        })
        .method("public static boolean isFinite(double)", |cx, _, args| {
            Ok(Value::Boolean(double(cx, args, 0)?.is_finite()))
        })
        .method("public boolean isNaN()", |cx, this, _| {
            Ok(Value::Boolean(receiver(cx, this)?.as_f64().is_some_and(f64::is_nan)))
        })
        .method("public static double sum(double, double)", |cx, _, args| {
            Ok(Value::Double(double(cx, args, 0)? + double(cx, args, 1)?))
        })
        .method("public static double max(double, double)", |cx, _, args| {
            Ok(Value::Double(double(cx, args, 0)?.max(double(cx, args, 1)?)))
        })
        .method("public static double min(double, double)", |cx, _, args| {
            Ok(Value::Double(double(cx, args, 0)?.min(double(cx, args, 1)?)))
        });
    comparable(double_class, "Double", "double").finish();

    let float = registry
        .declare("public final class java.lang.Float extends Number implements Comparable<Float>")
        .constant("public static final float MAX_VALUE", Value::Float(f32::MAX))
        .constant("public static final float MIN_VALUE", Value::Float(f32::from_bits(1)))
        .constant("public static final float NaN", Value::Float(f32::NAN))
        .method("public static float parseFloat(String)", |cx, _, args| {
            let text = string(cx, args, 0)?;
            parse_floating(cx, &text).map(|v| Value::Float(v as f32))
        })
        .method("public static Float valueOf(float)", |cx, _, args| {
            Ok(Value::Float(double(cx, args, 0)? as f32))
        })
        .method("public static String toString(float)", |cx, _, args| {
            Ok(Value::string(Value::Float(double(cx, args, 0)? as f32).to_string()))
        })
        .method("public static boolean isNaN(float)", |cx, _, args| {
            Ok(Value::Boolean(double(cx, args, 0)?.is_nan()))
        });
    comparable(float, "Float", "float").finish();
}

fn char_predicate<'r>(
    builder: ClassBuilder<'r>,
    name: &str,
    test: fn(char) -> bool,
) -> ClassBuilder<'r> {
    builder.method(&format!("public static boolean {name}(char)"), move |cx, _, args| {
        let c = char_value(cx, args, 0)?;
        Ok(Value::Boolean(char::from_u32(c as u32).is_some_and(test)))
    })
}

fn map_char(c: u16, f: impl Fn(char) -> Option<char>) -> Value {
    let mapped = char::from_u32(c as u32)
        .and_then(f)
        .and_then(|m| {
            let mut buffer = [0u16; 2];
            match m.encode_utf16(&mut buffer) {
                [single] => Some(*single),
                _ => None,
            }
        })
        .unwrap_or(c);
    Value::Char(mapped)
}

fn install_character(registry: &mut Registry) {
    let mut character = registry
        .declare("public final class java.lang.Character implements Comparable<Character>")
        .constant("public static final char MAX_VALUE", Value::Char(u16::MAX))
        .constant("public static final char MIN_VALUE", Value::Char(0))
        .constructor("public Character(char)", |cx, _, args| {
            Ok(Value::Char(char_value(cx, args, 0)?))
        })
        .method("public char charValue()", |cx, this, _| {
            match receiver(cx, this)? {
                Value::Char(c) => Ok(Value::Char(*c)),
                other => Ok(other.convert(Primitive::Char).unwrap_or(Value::Char(0))),
            }
        })
        .method("public static Character valueOf(char)", |cx, _, args| {
            Ok(Value::Char(char_value(cx, args, 0)?))
        })
        .method("public static char toUpperCase(char)", |cx, _, args| {
            let c = char_value(cx, args, 0)?;
            Ok(map_char(c, |c| c.to_uppercase().next()))
        })
        .method("public static char toLowerCase(char)", |cx, _, args| {
            let c = char_value(cx, args, 0)?;
            Ok(map_char(c, |c| c.to_lowercase().next()))
        })
        .method("public static int getNumericValue(char)", |cx, _, args| {
            let c = char_value(cx, args, 0)?;
            Ok(Value::Int(
                char::from_u32(c as u32)
                    .and_then(|c| c.to_digit(36))
                    .map_or(-1, |d| d as i32),
            ))
        })
        .method("public static String toString(char)", |cx, _, args| {
            Ok(Value::string(text::from_units(&[char_value(cx, args, 0)?])))
        })
        .method("public int compareTo(Character)", |cx, this, args| {
            let this = receiver(cx, this)?.as_i64().unwrap_or_default();
            let other = char_value(cx, args, 0)? as i64;
            Ok(Value::Int((this - other) as i32))
        });
    for (name, test) in [
        ("isDigit", (|c: char| c.is_ascii_digit()) as fn(char) -> bool),
        ("isLetter", char::is_alphabetic),
        ("isLetterOrDigit", char::is_alphanumeric),
        ("isWhitespace", char::is_whitespace),
        ("isUpperCase", char::is_uppercase),
        ("isLowerCase", char::is_lowercase),
    ] {
        character = char_predicate(character, name, test);
    }
    character.finish();
}

fn install_boolean(registry: &mut Registry) {
    registry
        .declare("public final class java.lang.Boolean implements Comparable<Boolean>")
        .constant("public static final Boolean TRUE", Value::Boolean(true))
        .constant("public static final Boolean FALSE", Value::Boolean(false))
        .constructor("public Boolean(boolean)", |cx, _, args| {
            Ok(Value::Boolean(boolean(cx, args, 0)?))
        })
        .method("public boolean booleanValue()", |cx, this, _| {
            Ok(Value::Boolean(receiver(cx, this)?.as_bool().unwrap_or(false)))
        })
        .method("public static boolean parseBoolean(String)", |cx, _, args| {
            Ok(Value::Boolean(match arg(cx, args, 0)? {
                Value::Str(s) => s.eq_ignore_ascii_case("true"),
                _ => false,
            }))
        })
        .method("public static Boolean valueOf(boolean)", |cx, _, args| {
            Ok(Value::Boolean(boolean(cx, args, 0)?))
        })
        .method("public static Boolean valueOf(String)", |cx, _, args| {
            Ok(Value::Boolean(match arg(cx, args, 0)? {
                Value::Str(s) => s.eq_ignore_ascii_case("true"),
                _ => false,
            }))
        })
        .method("public static String toString(boolean)", |cx, _, args| {
            Ok(Value::string(boolean(cx, args, 0)?.to_string()))
        })
        .method("public int compareTo(Boolean)", |cx, this, args| {
            compare_values(cx, receiver(cx, this)?, arg(cx, args, 0)?)
        })
        .method("public static int compare(boolean, boolean)", |cx, _, args| {
            compare_values(cx, arg(cx, args, 0)?, arg(cx, args, 1)?)
        })
        .method("public static boolean logicalXor(boolean, boolean)", |cx, _, args| {
            Ok(Value::Boolean(boolean(cx, args, 0)? ^ boolean(cx, args, 1)?))
        })
        .finish();
}
