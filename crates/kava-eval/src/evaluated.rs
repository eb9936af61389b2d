use kava_core::{Type, Value};

/// What evaluating an expression node produces.
#[derive(Clone, Debug)]
pub enum Evaluated {
    /// A class named as a qualifier (`Math` in `Math.abs(x)`).
    Static(Type),
    /// A type-only result.
    Typed(Type),
    Value(Type, Value),
    /// A package prefix awaiting further `.segment` access.
    Package(String),
    /// A name that is neither a variable, a type nor a package.
    Name(String),
}

impl Evaluated {
    pub fn ty(&self) -> Option<&Type> {
        match self {
            Evaluated::Static(ty) | Evaluated::Typed(ty) | Evaluated::Value(ty, _) => Some(ty),
            Evaluated::Package(_) | Evaluated::Name(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Evaluated::Value(_, value) => Some(value),
            _ => None,
        }
    }
}

/// Abrupt completion of a statement.
#[derive(Clone, Debug)]
pub enum Signal {
    /// `return`, with the returned value when there is one.
    Return(Option<Evaluated>),
    Break,
    Continue,
}

/// Result of evaluating one top-level construct.
#[derive(Clone, Debug)]
pub enum Outcome {
    Value(Evaluated),
    Normal,
    Signal(Signal),
}
