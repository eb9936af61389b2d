//! Class registration.
//!
//! Library modules describe each class with a header line and a chain of
//! member declarations, attaching a native closure to every concrete
//! method and constructor:
//!
//! ```ignore
//! registry
//!     .declare("public final class java.lang.Math")
//!     .method("public static double sqrt(double)", |cx, _, args| {
//!         Ok(Value::Double(double(cx, args, 0)?.sqrt()))
//!     })
//!     .finish();
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use kava_core::{
    ClassInfo, Field, HostResult, MemberCatalog, Method, NativeFn, Type, Value, Visibility, types,
};

use crate::io::Output;
use crate::signature::{Callable, Member, SignatureError, SignatureParser};

/// Static field storage, keyed by declaring class and field name.
pub(crate) type Statics = HashMap<(String, String), Value>;

pub(crate) struct Registry {
    classes: HashMap<String, Rc<ClassInfo>>,
    statics: Statics,
    rejected: Vec<SignatureError>,
    out: Output,
    err: Output,
}

/// What a finished registry hands to the runtime.
pub(crate) struct Library {
    pub classes: HashMap<String, Rc<ClassInfo>>,
    pub statics: Statics,
    pub rejected: Vec<SignatureError>,
}

impl Registry {
    pub fn new(out: Output, err: Output) -> Self {
        Self {
            classes: HashMap::new(),
            statics: HashMap::new(),
            rejected: Vec::new(),
            out,
            err,
        }
    }

    pub fn out(&self) -> &Output {
        &self.out
    }

    pub fn err(&self) -> &Output {
        &self.err
    }

    /// Start a class from its header line.
    pub fn declare(&mut self, header: &str) -> ClassBuilder<'_> {
        let parsed = SignatureParser::new(header, &[]).header();
        let (info, valid) = match parsed {
            Ok(header) => {
                let (superclass, interfaces) = if header.is_interface {
                    (None, header.extends)
                } else {
                    let superclass = match header.extends.into_iter().next() {
                        Some(sup) => Some(sup),
                        None if header.name == types::OBJECT => None,
                        None => Some(Type::object()),
                    };
                    (superclass, header.implements)
                };
                let info = ClassInfo {
                    name: header.name,
                    type_params: header.type_params,
                    superclass,
                    interfaces,
                    is_interface: header.is_interface,
                    is_abstract: header.modifiers.is_abstract || header.is_interface,
                    visibility: header.modifiers.visibility,
                    fields: Vec::new(),
                    methods: Vec::new(),
                    constructors: Vec::new(),
                };
                (info, true)
            }
            Err(error) => {
                tracing::warn!(%error, "skipping library class");
                self.rejected.push(error);
                let info = ClassInfo {
                    name: header.to_string(),
                    type_params: Vec::new(),
                    superclass: None,
                    interfaces: Vec::new(),
                    is_interface: false,
                    is_abstract: false,
                    visibility: Visibility::Private,
                    fields: Vec::new(),
                    methods: Vec::new(),
                    constructors: Vec::new(),
                };
                (info, false)
            }
        };
        ClassBuilder {
            registry: self,
            info,
            valid,
        }
    }

    pub fn finish(self) -> Library {
        tracing::debug!(
            classes = self.classes.len(),
            rejected = self.rejected.len(),
            "class library installed"
        );
        Library {
            classes: self.classes,
            statics: self.statics,
            rejected: self.rejected,
        }
    }
}

pub(crate) struct ClassBuilder<'r> {
    registry: &'r mut Registry,
    info: ClassInfo,
    valid: bool,
}

impl ClassBuilder<'_> {
    fn member(&mut self, signature: &str) -> Option<Member> {
        if !self.valid {
            return None;
        }
        match SignatureParser::new(signature, &self.info.type_params).member(&self.info.name) {
            Ok(member) => Some(member),
            Err(error) => {
                tracing::warn!(class = %self.info.name, %error, "skipping library member");
                self.registry.rejected.push(error);
                None
            }
        }
    }

    fn reject(&mut self, signature: &str, message: &str) {
        self.registry.rejected.push(SignatureError {
            signature: signature.to_string(),
            message: message.to_string(),
        });
    }

    fn field_of(&self, modifiers: crate::signature::Modifiers, ty: Type, name: String) -> Field {
        Field {
            name,
            ty,
            is_static: modifiers.is_static,
            is_final: modifiers.is_final,
            visibility: modifiers.visibility,
            declaring: self.info.name.clone(),
        }
    }

    fn method_of(&self, callable: Callable, native: Option<NativeFn>) -> Method {
        Method {
            is_abstract: callable.modifiers.is_abstract || native.is_none(),
            name: callable.name,
            type_params: callable.type_params,
            params: callable.params,
            varargs: callable.varargs,
            ret: callable.ret,
            is_static: callable.modifiers.is_static,
            visibility: callable.modifiers.visibility,
            declaring: self.info.name.clone(),
            throws: callable.throws,
            native,
        }
    }

    /// An instance field stored on each object.
    pub fn field(mut self, signature: &str) -> Self {
        match self.member(signature) {
            Some(Member::Field {
                modifiers, ty, name,
            }) if !modifiers.is_static => {
                let field = self.field_of(modifiers, ty, name);
                self.info.fields.push(Rc::new(field));
            }
            Some(_) => self.reject(signature, "expected an instance field"),
            None => {}
        }
        self
    }

    /// A static field with its initial value.
    pub fn constant(mut self, signature: &str, value: Value) -> Self {
        match self.member(signature) {
            Some(Member::Field {
                modifiers, ty, name,
            }) if modifiers.is_static => {
                self.registry
                    .statics
                    .insert((self.info.name.clone(), name.clone()), value);
                let field = self.field_of(modifiers, ty, name);
                self.info.fields.push(Rc::new(field));
            }
            Some(_) => self.reject(signature, "expected a static field"),
            None => {}
        }
        self
    }

    pub fn method<F>(mut self, signature: &str, native: F) -> Self
    where
        F: Fn(&dyn MemberCatalog, Option<&Value>, &[Value]) -> HostResult<Value> + 'static,
    {
        match self.member(signature) {
            Some(Member::Method(callable)) => {
                let method = self.method_of(callable, Some(Rc::new(native)));
                self.info.methods.push(Rc::new(method));
            }
            Some(_) => self.reject(signature, "expected a method"),
            None => {}
        }
        self
    }

    /// A method scripts must implement (anonymous classes).
    pub fn abstract_method(mut self, signature: &str) -> Self {
        match self.member(signature) {
            Some(Member::Method(callable)) => {
                let method = self.method_of(callable, None);
                self.info.methods.push(Rc::new(method));
            }
            Some(_) => self.reject(signature, "expected a method"),
            None => {}
        }
        self
    }

    pub fn constructor<F>(mut self, signature: &str, native: F) -> Self
    where
        F: Fn(&dyn MemberCatalog, Option<&Value>, &[Value]) -> HostResult<Value> + 'static,
    {
        match self.member(signature) {
            Some(Member::Constructor(callable)) => {
                let ctor = self.method_of(callable, Some(Rc::new(native)));
                self.info.constructors.push(Rc::new(ctor));
            }
            Some(_) => self.reject(signature, "expected a constructor"),
            None => {}
        }
        self
    }

    /// The four `Throwable` constructors, creating instances of this class.
    pub fn exception(self) -> Self {
        let simple = types::simple_name(&self.info.name).to_string();
        let class = self.info.name.clone();
        let with_message = class.clone();
        let with_cause = class.clone();
        let from_cause = class.clone();
        self.constructor(&format!("public {simple}()"), move |_, _, _| {
            Ok(crate::throwable::instance(&class, Value::Null, Value::Null))
        })
        .constructor(&format!("public {simple}(String)"), move |_, _, args| {
            let message = args.first().cloned().unwrap_or(Value::Null);
            Ok(crate::throwable::instance(&with_message, message, Value::Null))
        })
        .constructor(
            &format!("public {simple}(String, Throwable)"),
            move |_, _, args| {
                let message = args.first().cloned().unwrap_or(Value::Null);
                let cause = args.get(1).cloned().unwrap_or(Value::Null);
                Ok(crate::throwable::instance(&with_cause, message, cause))
            },
        )
        .constructor(&format!("public {simple}(Throwable)"), move |cx, _, args| {
            let cause = args.first().cloned().unwrap_or(Value::Null);
            let message = match &cause {
                Value::Null => Value::Null,
                cause => Value::string(cx.display(cause)),
            };
            Ok(crate::throwable::instance(&from_cause, message, cause))
        })
    }

    pub fn finish(self) {
        if !self.valid {
            return;
        }
        tracing::trace!(class = %self.info.name, "registered");
        let name = self.info.name.clone();
        self.registry.classes.insert(name, Rc::new(self.info));
    }
}
