//! Core data model for the Kava scripting engine.
//!
//! This crate has no knowledge of syntax or evaluation. It defines:
//! - [`Span`]: byte ranges into submitted source text
//! - [`Type`]: runtime type descriptors (primitive, class, array, generic, wildcard)
//! - [`Value`]: computed values, including shared arrays and host objects
//! - [`MemberCatalog`]: the capability a host implements to expose its classes
//! - [`relations`]: assignability, common-type and supertype queries over a catalog

pub mod catalog;
pub mod relations;
pub mod span;
pub mod types;
pub mod value;

pub use catalog::{
    ClassInfo, Field, HostResult, MemberCatalog, Method, NativeFn, Thrown, TypeParam, Visibility,
};
pub use span::{Span, Spanned};
pub use types::{Primitive, Type, TypeKind};
pub use value::{Array, Native, Object, Value};
