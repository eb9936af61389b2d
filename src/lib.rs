//! Kava: an interactive, statically typed Java-flavoured scripting language.
//!
//! A [`Session`] accepts successive submissions, each parsed by
//! `kava-syntax`, constructed into AST nodes by `kava-ast`, type-checked
//! and then evaluated by `kava-eval` against the host class library in
//! `kava-runtime`. Declarations persist from one submission to the next.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod outline;
pub mod session;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use outline::outline;
pub use session::{Reply, Session, parse};
