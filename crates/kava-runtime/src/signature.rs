//! Parser for the declaration strings the class library is written in.
//!
//! Every class and member is declared with a Java-style line such as
//! `public static <T> List<T> asList(T...)`. Simple class names are
//! resolved against [`LIBRARY`]; type variables against the enclosing
//! class and method type parameters.

use derive_more::{Display, Error};
use kava_core::{Primitive, Type, TypeParam, Visibility, types};

/// Every class the library declares, fully qualified.
pub const LIBRARY: &[&str] = &[
    "java.lang.Object",
    "java.lang.String",
    "java.lang.CharSequence",
    "java.lang.Comparable",
    "java.lang.Iterable",
    "java.lang.Runnable",
    "java.lang.Number",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Short",
    "java.lang.Byte",
    "java.lang.Character",
    "java.lang.Boolean",
    "java.lang.Float",
    "java.lang.Double",
    "java.lang.Math",
    "java.lang.System",
    "java.lang.StringBuilder",
    "java.lang.Class",
    "java.lang.Thread",
    "java.lang.Throwable",
    "java.lang.Exception",
    "java.lang.RuntimeException",
    "java.lang.Error",
    "java.lang.ArithmeticException",
    "java.lang.NullPointerException",
    "java.lang.ClassCastException",
    "java.lang.IndexOutOfBoundsException",
    "java.lang.ArrayIndexOutOfBoundsException",
    "java.lang.StringIndexOutOfBoundsException",
    "java.lang.NegativeArraySizeException",
    "java.lang.ArrayStoreException",
    "java.lang.IllegalArgumentException",
    "java.lang.NumberFormatException",
    "java.lang.IllegalStateException",
    "java.lang.UnsupportedOperationException",
    "java.lang.InterruptedException",
    "java.lang.CloneNotSupportedException",
    "java.lang.AbstractMethodError",
    "java.lang.InstantiationException",
    "java.util.Collection",
    "java.util.List",
    "java.util.ArrayList",
    "java.util.Map",
    "java.util.HashMap",
    "java.util.Arrays",
    "java.util.Objects",
    "java.io.PrintStream",
    "java.io.IOException",
    "java.awt.Point",
];

/// Qualified name for a simple or already qualified class name.
pub fn qualify(name: &str) -> Option<&str> {
    if name.contains('.') {
        return Some(name);
    }
    LIBRARY
        .iter()
        .copied()
        .find(|qualified| types::simple_name(qualified) == name)
}

#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display("{message} in `{signature}`")]
pub struct SignatureError {
    pub signature: String,
    pub message: String,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Header {
    pub modifiers: Modifiers,
    pub is_interface: bool,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<Type>,
    pub implements: Vec<Type>,
}

#[derive(Clone, Debug)]
pub(crate) enum Member {
    Field {
        modifiers: Modifiers,
        ty: Type,
        name: String,
    },
    Method(Callable),
    Constructor(Callable),
}

#[derive(Clone, Debug)]
pub(crate) struct Callable {
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    pub ret: Type,
    pub name: String,
    pub params: Vec<Type>,
    pub varargs: bool,
    pub throws: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq)]
enum Token<'s> {
    Word(&'s str),
    Punct(char),
    Ellipsis,
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if source[i..].starts_with("...") {
            tokens.push(Token::Ellipsis);
            i += 3;
        } else if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' {
            let start = i;
            while i < bytes.len() {
                let c = bytes[i];
                let dotted = c == b'.' && bytes.get(i + 1) != Some(&b'.');
                if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || dotted {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(&source[start..i]));
        } else {
            tokens.push(Token::Punct(c as char));
            i += 1;
        }
    }
    tokens
}

pub(crate) struct SignatureParser<'s> {
    source: &'s str,
    tokens: Vec<Token<'s>>,
    pos: usize,
    scope: Vec<TypeParam>,
}

impl<'s> SignatureParser<'s> {
    pub fn new(source: &'s str, scope: &[TypeParam]) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            scope: scope.to_vec(),
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, SignatureError> {
        Err(SignatureError {
            signature: self.source.to_string(),
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self) -> Option<&'s str> {
        match self.tokens.get(self.pos) {
            Some(Token::Word(w)) => Some(w),
            _ => None,
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek_word() == Some(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), SignatureError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            self.error(format!("expected `{c}`"))
        }
    }

    fn word(&mut self) -> Result<&'s str, SignatureError> {
        match self.peek_word() {
            Some(w) => {
                self.pos += 1;
                Ok(w)
            }
            None => self.error("expected a name"),
        }
    }

    fn end(&self) -> Result<(), SignatureError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            self.error("trailing input")
        }
    }

    fn modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers {
            visibility: Visibility::Package,
            is_static: false,
            is_final: false,
            is_abstract: false,
        };
        while let Some(word) = self.peek_word() {
            match word {
                "public" => modifiers.visibility = Visibility::Public,
                "protected" => modifiers.visibility = Visibility::Protected,
                "private" => modifiers.visibility = Visibility::Private,
                "static" => modifiers.is_static = true,
                "final" => modifiers.is_final = true,
                "abstract" => modifiers.is_abstract = true,
                _ => break,
            }
            self.pos += 1;
        }
        modifiers
    }

    /// `<T, U extends Comparable<U>>`; names enter scope before bounds are
    /// read so bounds may mention them.
    fn type_params(&mut self) -> Result<Vec<TypeParam>, SignatureError> {
        if !self.eat_punct('<') {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        let mut bounds = Vec::new();
        loop {
            names.push(self.word()?.to_string());
            let start = self.pos;
            let mut depth = 0;
            while let Some(token) = self.peek() {
                match token {
                    Token::Punct('<') => depth += 1,
                    Token::Punct('>') if depth == 0 => break,
                    Token::Punct('>') => depth -= 1,
                    Token::Punct(',') if depth == 0 => break,
                    _ => {}
                }
                self.pos += 1;
            }
            bounds.push((start, self.pos));
            if self.eat_punct('>') {
                break;
            }
            self.expect_punct(',')?;
        }
        let resume = self.pos;
        let base = self.scope.len();
        self.scope.extend(
            names
                .iter()
                .map(|name| TypeParam::new(name.clone(), Type::object())),
        );
        let mut params = Vec::new();
        for (name, (start, end)) in names.into_iter().zip(bounds) {
            self.pos = start;
            let bound = if self.eat_word("extends") {
                self.ty()?
            } else {
                Type::object()
            };
            if self.pos != end {
                return self.error("malformed type parameter bound");
            }
            params.push(TypeParam::new(name, bound));
        }
        self.scope.truncate(base);
        self.scope.extend(params.iter().cloned());
        self.pos = resume;
        Ok(params)
    }

    fn ty(&mut self) -> Result<Type, SignatureError> {
        let name = self.word()?;
        let mut ty = if let Some(p) = Primitive::from_name(name) {
            Type::primitive(p)
        } else if let Some(param) = self.scope.iter().rev().find(|p| p.name == name) {
            param.variable()
        } else {
            let Some(qualified) = qualify(name) else {
                return self.error(format!("unknown class `{name}`"));
            };
            let qualified = qualified.to_string();
            let mut args = Vec::new();
            if self.eat_punct('<') {
                loop {
                    args.push(self.type_argument()?);
                    if self.eat_punct('>') {
                        break;
                    }
                    self.expect_punct(',')?;
                }
            }
            Type::generic(qualified, args)
        };
        while self.eat_punct('[') {
            self.expect_punct(']')?;
            ty = ty.array_of(1);
        }
        Ok(ty)
    }

    fn type_argument(&mut self) -> Result<Type, SignatureError> {
        if !self.eat_punct('?') {
            return self.ty();
        }
        if self.eat_word("extends") {
            Ok(Type::wildcard(Some(self.ty()?), true))
        } else if self.eat_word("super") {
            Ok(Type::wildcard(Some(self.ty()?), false))
        } else {
            Ok(Type::wildcard(None, true))
        }
    }

    fn type_list(&mut self) -> Result<Vec<Type>, SignatureError> {
        let mut out = vec![self.ty()?];
        while self.eat_punct(',') {
            out.push(self.ty()?);
        }
        Ok(out)
    }

    /// `public final class java.lang.Integer extends Number implements Comparable<Integer>`
    pub fn header(mut self) -> Result<Header, SignatureError> {
        let modifiers = self.modifiers();
        let is_interface = if self.eat_word("interface") {
            true
        } else if self.eat_word("class") {
            false
        } else {
            return self.error("expected `class` or `interface`");
        };
        let name = self.word()?.to_string();
        if !name.contains('.') {
            return self.error("class names must be qualified");
        }
        let type_params = self.type_params()?;
        let extends = if self.eat_word("extends") {
            self.type_list()?
        } else {
            Vec::new()
        };
        let implements = if self.eat_word("implements") {
            self.type_list()?
        } else {
            Vec::new()
        };
        self.end()?;
        Ok(Header {
            modifiers,
            is_interface,
            name,
            type_params,
            extends,
            implements,
        })
    }

    /// A field, method or constructor declaration. A constructor is written
    /// with the class's simple name and no return type.
    pub fn member(mut self, class_name: &str) -> Result<Member, SignatureError> {
        let modifiers = self.modifiers();
        let type_params = self.type_params()?;
        if self.peek_word() == Some(types::simple_name(class_name))
            && self.tokens.get(self.pos + 1) == Some(&Token::Punct('('))
        {
            self.pos += 1;
            let (params, varargs, throws) = self.parameters()?;
            return Ok(Member::Constructor(Callable {
                modifiers,
                type_params,
                ret: Type::class(class_name),
                name: kava_core::Method::CONSTRUCTOR.to_string(),
                params,
                varargs,
                throws,
            }));
        }
        let ty = self.ty()?;
        let name = self.word()?.to_string();
        if self.peek() != Some(&Token::Punct('(')) {
            if !type_params.is_empty() {
                return self.error("fields cannot declare type parameters");
            }
            self.end()?;
            return Ok(Member::Field {
                modifiers,
                ty,
                name,
            });
        }
        let (params, varargs, throws) = self.parameters()?;
        Ok(Member::Method(Callable {
            modifiers,
            type_params,
            ret: ty,
            name,
            params,
            varargs,
            throws,
        }))
    }

    fn parameters(&mut self) -> Result<(Vec<Type>, bool, Vec<Type>), SignatureError> {
        self.expect_punct('(')?;
        let mut params = Vec::new();
        let mut varargs = false;
        if !self.eat_punct(')') {
            loop {
                if varargs {
                    return self.error("only the last parameter may be variable-arity");
                }
                let mut ty = self.ty()?;
                if self.peek() == Some(&Token::Ellipsis) {
                    self.pos += 1;
                    ty = ty.array_of(1);
                    varargs = true;
                }
                params.push(ty);
                if self.eat_punct(')') {
                    break;
                }
                self.expect_punct(',')?;
            }
        }
        let throws = if self.eat_word("throws") {
            self.type_list()?
        } else {
            Vec::new()
        };
        self.end()?;
        Ok((params, varargs, throws))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(source: &str, scope: &[TypeParam]) -> Member {
        SignatureParser::new(source, scope)
            .member("java.util.ArrayList")
            .unwrap()
    }

    #[test]
    fn generic_static_varargs_method() {
        let Member::Method(m) = member("public static <T> List<T> asList(T...)", &[]) else {
            panic!("expected a method");
        };
        assert!(m.modifiers.is_static);
        assert!(m.varargs);
        assert_eq!(m.type_params.len(), 1);
        assert_eq!(m.ret.to_string(), "List<T>");
        assert_eq!(m.params[0].to_string(), "T[]");
    }

    #[test]
    fn class_type_variables_are_in_scope() {
        let scope = [TypeParam::new("E", Type::object())];
        let Member::Method(m) = member("public boolean addAll(Collection<? extends E>)", &scope)
        else {
            panic!("expected a method");
        };
        assert_eq!(m.params[0].to_string(), "Collection<? extends E>");
        assert!(m.params[0].has_variables());
    }

    #[test]
    fn constructors_use_the_simple_name() {
        let Member::Constructor(c) = member("public ArrayList(int)", &[]) else {
            panic!("expected a constructor");
        };
        assert_eq!(c.name, "<init>");
        assert_eq!(c.ret, Type::class("java.util.ArrayList"));
    }

    #[test]
    fn fields_and_throws() {
        let Member::Field { modifiers, ty, .. } = member("public static final int MAX_VALUE", &[])
        else {
            panic!("expected a field");
        };
        assert!(modifiers.is_final && modifiers.is_static);
        assert_eq!(ty, Type::int());

        let Member::Method(m) = member("public static void sleep(long) throws InterruptedException", &[])
        else {
            panic!("expected a method");
        };
        assert_eq!(m.throws, [Type::class("java.lang.InterruptedException")]);
    }

    #[test]
    fn headers() {
        let header = SignatureParser::new(
            "public final class java.lang.Integer extends Number implements Comparable<Integer>",
            &[],
        )
        .header()
        .unwrap();
        assert_eq!(header.name, "java.lang.Integer");
        assert_eq!(header.extends, [Type::class("java.lang.Number")]);
        assert_eq!(header.implements[0].to_string(), "Comparable<Integer>");
    }

    #[test]
    fn unknown_names_are_rejected() {
        let error = SignatureParser::new("public Widget make()", &[])
            .member("java.util.ArrayList")
            .unwrap_err();
        insta::assert_snapshot!(error, @"unknown class `Widget` in `public Widget make()`");
    }
}
