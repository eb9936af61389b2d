//! REPL-style sessions: successive submissions sharing one scope.

use std::rc::Rc;

use kava_ast::Node;
use kava_core::{MemberCatalog, Type};
use kava_eval::{Counters, Environment, Evaluated, Interpreter, Outcome, Scope};
use kava_runtime::Runtime;

use crate::config::SessionConfig;
use crate::error::Result;

/// Parse and construct a submission without evaluating it.
pub fn parse(source: &str) -> Result<Vec<Node>> {
    let program = kava_syntax::parse_program(source)?;
    Ok(kava_ast::construct_program(source, &program)?)
}

/// What the last construct of a submission produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// The submission ended in a statement, or in a `void` expression.
    Nothing,
    /// The `String.valueOf` rendering of the last expression's value.
    Value { ty: Type, text: String },
}

impl Reply {
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Nothing => None,
            Reply::Value { text, .. } => Some(text),
        }
    }
}

pub struct Session {
    runtime: Rc<Runtime>,
    scope: Scope,
    counters: Counters,
}

impl Session {
    /// A session printing to the process's standard streams.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_runtime(Rc::new(Runtime::new()), config)
    }

    /// A session whose `System.out` is captured, see [`Session::runtime`].
    pub fn captured(config: SessionConfig) -> Self {
        Self::with_runtime(Rc::new(Runtime::captured()), config)
    }

    pub fn with_runtime(runtime: Rc<Runtime>, config: SessionConfig) -> Self {
        let mut scope = Scope::new(runtime.clone() as Rc<dyn MemberCatalog>)
            .with_public_only(config.public_only)
            .with_handled(config.handled());
        if let Some(flag) = config.cancel.clone() {
            scope = scope.with_cancel_flag(flag);
        }
        Self {
            runtime,
            scope,
            counters: Counters::default(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Names of the variables declared so far.
    pub fn variables(&self) -> Vec<String> {
        let mut names = self.scope.variable_names();
        names.sort();
        names
    }

    /// Type-check a submission in a throwaway copy of the session scope.
    /// Nothing is executed and the session is left unchanged.
    pub fn check(&self, source: &str) -> Result<Vec<Node>> {
        let nodes = parse(source)?;
        let interpreter = Interpreter::new(self.runtime.as_ref());
        let mut scope = self.scope.snapshot();
        for node in &nodes {
            interpreter.evaluate(scope.as_mut(), node, false)?;
        }
        Ok(nodes)
    }

    /// Check a submission, then evaluate it construct by construct.
    ///
    /// Constructs evaluated before a runtime failure keep their effects.
    pub fn run(&mut self, source: &str) -> Result<Reply> {
        let nodes = self.check(source)?;
        let interpreter = Interpreter::with_sink(self.runtime.as_ref(), &self.counters);
        let mut reply = Reply::Nothing;
        for node in &nodes {
            reply = match interpreter.evaluate(&mut self.scope, node, true)? {
                Outcome::Value(Evaluated::Value(ty, value)) if !ty.is_void() => Reply::Value {
                    text: interpreter.display(&value)?,
                    ty,
                },
                _ => Reply::Nothing,
            };
        }
        tracing::debug!(
            constructs = nodes.len(),
            nodes = self.counters.nodes(),
            iterations = self.counters.iterations(),
            "submission evaluated"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn void_results_print_nothing() {
        let mut session = Session::captured(SessionConfig::default());
        let reply = session.run(r#"System.out.println("hi");"#).unwrap();
        assert_eq!(reply, Reply::Nothing);
        assert_eq!(session.runtime().out().take(), "hi\n");
    }

    #[test]
    fn failed_check_runs_nothing() {
        let mut session = Session::captured(SessionConfig::default());
        let error = session
            .run(r#"System.out.println("early"); int n = "late";"#)
            .unwrap_err();
        assert!(matches!(error, Error::Evaluation(_)));
        assert_eq!(session.runtime().out().contents(), "");
        assert!(session.variables().is_empty());
    }

    #[test]
    fn check_leaves_the_session_untouched() {
        let session = Session::captured(SessionConfig::default());
        session.check("int x = 1;").unwrap();
        assert!(session.variables().is_empty());
    }
}
