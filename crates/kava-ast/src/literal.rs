//! Literal constants: parsing from source text and printing back.
//!
//! Printing is the inverse of parsing: for every literal `l`,
//! `Literal::parse(kind, &l.to_string()) == Ok(l)`.

use std::fmt;
use std::num::IntErrorKind;

use kava_core::{Primitive, Type, Value};

use crate::error::LiteralError;

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Literal {
    pub fn ty(&self) -> Type {
        match self {
            Literal::Null => Type::null(),
            Literal::Boolean(_) => Type::boolean(),
            Literal::Char(_) => Type::primitive(Primitive::Char),
            Literal::Int(_) => Type::int(),
            Literal::Long(_) => Type::primitive(Primitive::Long),
            Literal::Float(_) => Type::primitive(Primitive::Float),
            Literal::Double(_) => Type::primitive(Primitive::Double),
            Literal::String(_) => Type::string(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Char(c) => Value::Char(*c),
            Literal::Int(i) => Value::Int(*i),
            Literal::Long(l) => Value::Long(*l),
            Literal::Float(f) => Value::Float(*f),
            Literal::Double(d) => Value::Double(*d),
            Literal::String(s) => Value::string(s.as_str()),
        }
    }

    pub fn parse_boolean(text: &str) -> Result<Literal, LiteralError> {
        match text {
            "true" => Ok(Literal::Boolean(true)),
            "false" => Ok(Literal::Boolean(false)),
            other => Err(LiteralError::InvalidDigit(other.to_string())),
        }
    }

    /// Parse an integral or floating literal in any radix, with an
    /// optional leading `-`. A leading `-` lets the decimal magnitudes
    /// `2147483648` and `9223372036854775808L` denote `MIN_VALUE`.
    pub fn parse_number(text: &str) -> Result<Literal, LiteralError> {
        let (negated, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, text),
        };
        let lower = body.to_ascii_lowercase();
        let prefixed = lower.starts_with("0x") || lower.starts_with("0b");
        if !prefixed
            && (lower.contains('.')
                || lower.contains('e')
                || lower.ends_with('f')
                || lower.ends_with('d'))
        {
            return parse_floating(body, negated, text);
        }

        let (digits, long) = match body.strip_suffix(['l', 'L']) {
            Some(digits) => (digits, true),
            None => (body, false),
        };
        let (radix, digits) = if prefixed {
            let radix = if lower.starts_with("0x") { 16 } else { 2 };
            (radix, &digits[2..])
        } else if digits.len() > 1 && digits.starts_with('0') {
            (8, &digits[1..])
        } else {
            (10, digits)
        };
        if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
            return Err(LiteralError::InvalidDigit(text.to_string()));
        }
        let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
        let out_of_range = || {
            if long {
                LiteralError::LongOutOfRange(text.to_string())
            } else {
                LiteralError::IntOutOfRange(text.to_string())
            }
        };
        let magnitude = u64::from_str_radix(&cleaned, radix).map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow => out_of_range(),
            _ => LiteralError::InvalidDigit(text.to_string()),
        })?;

        let literal = match (radix, long) {
            (10, false) => {
                let limit = if negated { 1 << 31 } else { i32::MAX as u64 };
                if magnitude > limit {
                    return Err(out_of_range());
                }
                let value = magnitude as i64;
                Literal::Int((if negated { -value } else { value }) as i32)
            }
            (10, true) => {
                let limit = if negated { 1 << 63 } else { i64::MAX as u64 };
                if magnitude > limit {
                    return Err(out_of_range());
                }
                let value = magnitude as i64;
                Literal::Long(if negated { value.wrapping_neg() } else { value })
            }
            (_, false) => {
                let bits = u32::try_from(magnitude).map_err(|_| out_of_range())? as i32;
                Literal::Int(if negated { bits.wrapping_neg() } else { bits })
            }
            (_, true) => {
                let bits = magnitude as i64;
                Literal::Long(if negated { bits.wrapping_neg() } else { bits })
            }
        };
        Ok(literal)
    }

    /// Parse a quoted character literal.
    pub fn parse_char(text: &str) -> Result<Literal, LiteralError> {
        let body = text
            .strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .ok_or_else(|| LiteralError::Unterminated(text.to_string()))?;
        match unescape(body, text)?.as_slice() {
            [unit] => Ok(Literal::Char(*unit)),
            _ => Err(LiteralError::InvalidChar(text.to_string())),
        }
    }

    /// Parse a quoted string literal.
    pub fn parse_string(text: &str) -> Result<Literal, LiteralError> {
        let body = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .filter(|_| text.len() >= 2)
            .ok_or_else(|| LiteralError::Unterminated(text.to_string()))?;
        let units = unescape(body, text)?;
        Ok(Literal::String(String::from_utf16_lossy(&units)))
    }
}

fn parse_floating(body: &str, negated: bool, text: &str) -> Result<Literal, LiteralError> {
    let (digits, single) = match body.as_bytes().last() {
        Some(b'f' | b'F') => (&body[..body.len() - 1], true),
        Some(b'd' | b'D') => (&body[..body.len() - 1], false),
        _ => (body, false),
    };
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let invalid = || LiteralError::InvalidDigit(text.to_string());
    let mantissa_nonzero = cleaned
        .split(['e', 'E'])
        .next()
        .is_some_and(|m| m.chars().any(|c| matches!(c, '1'..='9')));

    if single {
        let value: f32 = cleaned.parse().map_err(|_| invalid())?;
        if value.is_infinite() {
            return Err(LiteralError::FloatTooLarge(text.to_string()));
        }
        if value == 0.0 && mantissa_nonzero {
            return Err(LiteralError::FloatTooSmall(text.to_string()));
        }
        Ok(Literal::Float(if negated { -value } else { value }))
    } else {
        let value: f64 = cleaned.parse().map_err(|_| invalid())?;
        if value.is_infinite() {
            return Err(LiteralError::FloatTooLarge(text.to_string()));
        }
        if value == 0.0 && mantissa_nonzero {
            return Err(LiteralError::FloatTooSmall(text.to_string()));
        }
        Ok(Literal::Double(if negated { -value } else { value }))
    }
}

/// Decode escape sequences into UTF-16 code units.
fn unescape(body: &str, text: &str) -> Result<Vec<u16>, LiteralError> {
    let invalid = || LiteralError::InvalidEscape(text.to_string());
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u16; 2];
            out.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }
        let escape = chars.next().ok_or_else(invalid)?;
        let unit = match escape {
            'b' => 0x08,
            't' => 0x09,
            'n' => 0x0a,
            'f' => 0x0c,
            'r' => 0x0d,
            's' => 0x20,
            '"' => 0x22,
            '\'' => 0x27,
            '\\' => 0x5c,
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(invalid());
                }
                u16::from_str_radix(&hex, 16).map_err(|_| invalid())?
            }
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or(0);
                let extra = if escape <= '3' { 2 } else { 1 };
                for _ in 0..extra {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                value as u16
            }
            _ => return Err(invalid()),
        };
        out.push(unit);
    }
    Ok(out)
}

fn escape_unit(unit: u16, quote: u16, out: &mut String) {
    match unit {
        0x08 => out.push_str("\\b"),
        0x09 => out.push_str("\\t"),
        0x0a => out.push_str("\\n"),
        0x0c => out.push_str("\\f"),
        0x0d => out.push_str("\\r"),
        0x5c => out.push_str("\\\\"),
        u if u == quote => {
            out.push('\\');
            out.push(char::from(u as u8));
        }
        0x20..=0x7e => out.push(char::from(unit as u8)),
        _ => {
            out.push('\\');
            out.push_str(&format!("u{unit:04x}"));
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Long(l) => write!(f, "{l}L"),
            Literal::Float(v) => write!(f, "{v:?}f"),
            Literal::Double(v) => write!(f, "{v:?}"),
            Literal::Char(c) => {
                let mut out = String::from("'");
                escape_unit(*c, u16::from(b'\''), &mut out);
                out.push('\'');
                f.write_str(&out)
            }
            Literal::String(s) => {
                let mut out = String::from("\"");
                for c in s.chars() {
                    if c.is_ascii() {
                        escape_unit(c as u16, u16::from(b'"'), &mut out);
                    } else if c.is_control() {
                        let mut buf = [0u16; 2];
                        for unit in c.encode_utf16(&mut buf) {
                            escape_unit(*unit, 0, &mut out);
                        }
                    } else {
                        out.push(c);
                    }
                }
                out.push('"');
                f.write_str(&out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reparse(literal: &Literal) -> Literal {
        let text = literal.to_string();
        match literal {
            Literal::Char(_) => Literal::parse_char(&text),
            Literal::String(_) => Literal::parse_string(&text),
            Literal::Boolean(_) => Literal::parse_boolean(&text),
            _ => Literal::parse_number(&text),
        }
        .unwrap_or_else(|e| panic!("{text}: {e}"))
    }

    #[test]
    fn printing_round_trips() {
        let literals = [
            Literal::Boolean(true),
            Literal::Char(u16::from(b'\'')),
            Literal::Char(0x263a),
            Literal::Char(0),
            Literal::Int(i32::MIN),
            Literal::Int(42),
            Literal::Long(i64::MIN),
            Literal::Long(-7),
            Literal::Float(1.5e-7),
            Literal::Double(-0.0),
            Literal::Double(1e300),
            Literal::String("tab\there \"quoted\" \\ é".into()),
        ];
        for literal in &literals {
            assert_eq!(&reparse(literal), literal);
        }
    }

    #[test]
    fn source_spellings_survive_printing() {
        let unicode = format!("'{}u263A'", '\\');
        let parsed = [
            Literal::parse_number("0x1F"),
            Literal::parse_number("0XffL"),
            Literal::parse_number("0xFFFFFFFF"),
            Literal::parse_number("017"),
            Literal::parse_number("017L"),
            Literal::parse_number("0b101"),
            Literal::parse_number("0b101L"),
            Literal::parse_number("2f"),
            Literal::parse_number("3d"),
            Literal::parse_number("-0x80000000"),
            Literal::parse_char(&unicode),
        ];
        for literal in parsed {
            let literal = literal.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(reparse(&literal), literal);
        }
        assert_eq!(Literal::parse_char(&unicode), Ok(Literal::Char(0x263a)));
    }

    #[test]
    fn radixes_and_suffixes() {
        assert_eq!(Literal::parse_number("0x1F"), Ok(Literal::Int(31)));
        assert_eq!(Literal::parse_number("0xFFFFFFFF"), Ok(Literal::Int(-1)));
        assert_eq!(Literal::parse_number("0777"), Ok(Literal::Int(511)));
        assert_eq!(Literal::parse_number("0b101L"), Ok(Literal::Long(5)));
        assert_eq!(Literal::parse_number("1_000"), Ok(Literal::Int(1000)));
        assert_eq!(Literal::parse_number("2f"), Ok(Literal::Float(2.0)));
        assert_eq!(Literal::parse_number("0"), Ok(Literal::Int(0)));
    }

    #[test]
    fn out_of_range_literals_fail() {
        assert!(matches!(
            Literal::parse_number("0x1_0000_0000"),
            Err(LiteralError::IntOutOfRange(_))
        ));
        assert!(matches!(
            Literal::parse_number("2147483648"),
            Err(LiteralError::IntOutOfRange(_))
        ));
        assert_eq!(
            Literal::parse_number("-2147483648"),
            Ok(Literal::Int(i32::MIN))
        );
        assert_eq!(
            Literal::parse_number("-9223372036854775808L"),
            Ok(Literal::Long(i64::MIN))
        );
        assert!(matches!(
            Literal::parse_number("0x1_0000_0000_0000_0000L"),
            Err(LiteralError::LongOutOfRange(_))
        ));
        assert!(matches!(
            Literal::parse_number("1e40f"),
            Err(LiteralError::FloatTooLarge(_))
        ));
        assert!(matches!(
            Literal::parse_number("1e-50f"),
            Err(LiteralError::FloatTooSmall(_))
        ));
        assert!(matches!(
            Literal::parse_number("09"),
            Err(LiteralError::InvalidDigit(_))
        ));
    }

    #[test]
    fn char_escapes() {
        let unicode = format!("'{}u0041'", '\\');
        assert_eq!(Literal::parse_char(&unicode), Ok(Literal::Char(0x41)));
        let repeated_u = format!("'{}uu263A'", '\\');
        assert_eq!(Literal::parse_char(&repeated_u), Ok(Literal::Char(0x263a)));
        assert_eq!(Literal::parse_char(r"'\101'"), Ok(Literal::Char(0x41)));
        assert_eq!(Literal::parse_char(r"'\n'"), Ok(Literal::Char(0x0a)));
        assert!(Literal::parse_char("'ab'").is_err());
        assert!(Literal::parse_char(r"'\q'").is_err());
    }
}
