use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use kava_core::Type;

const THROWABLE: &str = "java.lang.Throwable";

/// How a [`Session`](crate::Session) evaluates submissions.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Only public host members are visible.
    pub public_only: bool,
    /// Enforce checked-exception handling at top level.
    pub strict_exceptions: bool,
    /// Exception types the host handles at top level when
    /// `strict_exceptions` is set.
    pub handled_exceptions: Vec<String>,
    /// Set from another thread to stop a running submission.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SessionConfig {
    pub fn public_only(mut self, public_only: bool) -> Self {
        self.public_only = public_only;
        self
    }

    pub fn strict_exceptions(mut self, strict: bool) -> Self {
        self.strict_exceptions = strict;
        self
    }

    pub fn handle(mut self, class: impl Into<String>) -> Self {
        self.handled_exceptions.push(class.into());
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Types [`kava_eval::Environment::can_handle`] accepts.
    pub fn handled(&self) -> Vec<Type> {
        if self.strict_exceptions {
            self.handled_exceptions.iter().map(Type::class).collect()
        } else {
            vec![Type::class(THROWABLE)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_by_default() {
        let handled = SessionConfig::default().handled();
        assert_eq!(handled, vec![Type::class(THROWABLE)]);
    }

    #[test]
    fn strict_handles_only_listed_types() {
        let config = SessionConfig::default()
            .strict_exceptions(true)
            .handle("java.lang.InterruptedException");
        assert_eq!(config.handled(), vec![Type::class("java.lang.InterruptedException")]);
        assert!(SessionConfig::default().strict_exceptions(true).handled().is_empty());
    }
}
