use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kava_ast::{Node, construct_program};
use kava_core::MemberCatalog;
use kava_runtime::Runtime;

use super::*;
use crate::{Counters, DiagnosticSink, Environment, Scope};

fn program(source: &str) -> Vec<Node> {
    let parsed = kava_syntax::parse_program(source).expect("source should parse");
    construct_program(source, &parsed).expect("source should construct")
}

struct Harness {
    runtime: Rc<Runtime>,
    scope: Scope,
}

impl Harness {
    fn new() -> Self {
        let runtime = Rc::new(Runtime::captured());
        let scope = Scope::new(runtime.clone() as Rc<dyn MemberCatalog>);
        Self { runtime, scope }
    }

    fn strict() -> Self {
        let mut harness = Self::new();
        harness.scope = harness.scope.with_handled(Vec::new());
        harness
    }

    /// Evaluate every construct, returning the last outcome.
    fn run(&mut self, source: &str) -> EvalResult<Outcome> {
        let interpreter = Interpreter::new(self.runtime.as_ref());
        let mut last = Outcome::Normal;
        for node in program(source) {
            last = interpreter.evaluate(&mut self.scope, &node, true)?;
        }
        Ok(last)
    }

    fn value(&mut self, source: &str) -> String {
        let outcome = self.run(source);
        let runtime = Rc::clone(&self.runtime);
        let interpreter = Interpreter::new(runtime.as_ref());
        match outcome {
            Ok(Outcome::Value(Evaluated::Value(_, value))) => interpreter.display(&value).unwrap(),
            other => panic!("expected a value, got {other:?}"),
        }
    }

    fn error(&mut self, source: &str) -> String {
        match self.run(source) {
            Err(error) => error.to_string(),
            Ok(outcome) => panic!("expected an error, got {outcome:?}"),
        }
    }
}

fn value(source: &str) -> String {
    Harness::new().value(source)
}

fn error(source: &str) -> String {
    Harness::new().error(source)
}

#[test]
fn compound_assignment_narrows() {
    insta::assert_snapshot!(value("byte b = 10; b += 300; b;"), @"54");
    insta::assert_snapshot!(value("char c = 'a'; c += 2; c;"), @"c");
    insta::assert_snapshot!(value("String s = \"n=\"; s += 1 + 2; s;"), @"n=3");
}

#[test]
fn narrower_overload_is_chosen() {
    let mut h = Harness::new();
    h.run(r#"String f(int x) { return "int"; } String f(long x) { return "long"; }"#)
        .unwrap();
    insta::assert_snapshot!(h.value("f(1);"), @"int");
    insta::assert_snapshot!(h.value("f(1L);"), @"long");
    insta::assert_snapshot!(h.value("f('c');"), @"int");
}

#[test]
fn fixed_arity_before_varargs() {
    let mut h = Harness::new();
    h.run(r#"String g(int a, int b) { return "fixed"; } String g(int... xs) { return "var" + xs.length; }"#)
        .unwrap();
    insta::assert_snapshot!(h.value("g(1, 2);"), @"fixed");
    insta::assert_snapshot!(h.value("g(1, 2, 3);"), @"var3");
    insta::assert_snapshot!(h.value("g();"), @"var0");
}

#[test]
fn finally_overrides_return() {
    let mut h = Harness::new();
    h.run("int h() { try { return 1; } finally { return 2; } }").unwrap();
    insta::assert_snapshot!(h.value("h();"), @"2");
}

#[test]
fn empty_enhanced_for_runs_nothing() {
    insta::assert_snapshot!(value("int n = 0; for (String s : new String[0]) { n++; } n;"), @"0");
}

#[test]
fn dropped_variable_is_gone() {
    insta::assert_snapshot!(error("int x = 1; drop x; x;"), @"x cannot be resolved to a variable");
}

#[test]
fn engine_raises_runtime_exceptions() {
    insta::assert_snapshot!(error("int z = 0; 1 / z;"), @"java.lang.ArithmeticException: / by zero");
    insta::assert_snapshot!(
        error("int[] a = new int[-1];"),
        @"java.lang.NegativeArraySizeException: -1"
    );
    insta::assert_snapshot!(error("String s = null; s.length();"), @"java.lang.NullPointerException");
}

#[test]
fn catch_receives_the_thrown_value() {
    let source = r#"
        String r = "none";
        try {
            int[] a = new int[2];
            a[5] = 1;
        } catch (ArrayIndexOutOfBoundsException e) {
            r = e.getMessage();
        }
        r;
    "#;
    insta::assert_snapshot!(value(source), @"Index 5 out of bounds for length 2");
}

#[test]
fn anonymous_class_overrides_interface_method() {
    let mut h = Harness::new();
    h.run(r#"Runnable r = new Runnable() { public void run() { System.out.println("ran"); } }; r.run();"#)
        .unwrap();
    assert_eq!(h.runtime.out().take(), "ran\n");
}

#[test]
fn anonymous_class_must_implement_abstract_methods() {
    insta::assert_snapshot!(
        error("Runnable r = new Runnable() { };"),
        @"the anonymous class of Runnable must implement the inherited abstract method run()"
    );
}

#[test]
fn deep_recursion_fails_cleanly() {
    let message = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| error("int f(int n) { return f(n + 1); } f(0);"))
        .unwrap()
        .join()
        .unwrap();
    insta::assert_snapshot!(message, @"call depth exceeded 128");
}

#[test]
fn canceled_loops_stop() {
    let mut h = Harness::new();
    h.scope.cancel_flag().store(true, Ordering::Relaxed);
    insta::assert_snapshot!(h.error("while (true) { }"), @"evaluation canceled");
}

/// Raises the cancel flag once `limit` loop iterations have started.
struct CancelAfter {
    limit: u64,
    seen: Cell<u64>,
    flag: Arc<AtomicBool>,
}

impl DiagnosticSink for CancelAfter {
    fn loop_iteration(&self) {
        self.seen.set(self.seen.get() + 1);
        if self.seen.get() == self.limit {
            self.flag.store(true, Ordering::Relaxed);
        }
    }
}

#[test]
fn cancel_mid_loop_keeps_completed_iterations() {
    let mut h = Harness::new();
    h.run("int n = 0;").unwrap();
    let sink = CancelAfter {
        limit: 3,
        seen: Cell::new(0),
        flag: h.scope.cancel_flag(),
    };
    let runtime = Rc::clone(&h.runtime);
    let interpreter = Interpreter::with_sink(runtime.as_ref(), &sink);
    let nodes = program("for (int i = 0; i < 10; i++) { n++; }");
    let error = interpreter.evaluate(&mut h.scope, &nodes[0], true).unwrap_err();
    insta::assert_snapshot!(error, @"evaluation canceled");
    assert_eq!(sink.seen.get(), 3);
    let n = h.scope.variable("n").unwrap();
    assert!(matches!(n.value, Some(Value::Int(3))), "{n:?}");
}

#[test]
fn type_only_try_checks_every_clause() {
    let h = Harness::new();
    let interpreter = Interpreter::new(h.runtime.as_ref());
    let mut scope = h.scope.clone();
    let nodes = program(
        r#"try { System.out.println("a"); } catch (RuntimeException e) { System.out.println(e.getMessage()); } finally { System.out.println("c"); }"#,
    );
    let outcome = interpreter.evaluate(&mut scope, &nodes[0], false).unwrap();
    assert!(matches!(outcome, Outcome::Normal));
    assert_eq!(h.runtime.out().contents(), "");

    let nodes = program(r#"try { } catch (RuntimeException e) { int x = "s"; }"#);
    let error = interpreter.evaluate(&mut scope, &nodes[0], false).unwrap_err();
    insta::assert_snapshot!(error, @"type mismatch: cannot convert from String to int");
}

#[test]
fn type_only_evaluation_has_no_effects() {
    let h = Harness::new();
    let mut scope = h.scope.clone();
    let interpreter = Interpreter::new(h.runtime.as_ref());
    let nodes = program(r#"System.out.println("x");"#);
    let outcome = interpreter.evaluate(&mut scope, &nodes[0], false).unwrap();
    assert!(matches!(outcome, Outcome::Value(Evaluated::Typed(ty)) if ty.is_void()));
    assert_eq!(h.runtime.out().contents(), "");
}

#[test]
fn reading_unassigned_variable_fails() {
    insta::assert_snapshot!(error("int u; u + 1;"), @"the variable u may not have been initialized");
}

#[test]
fn checked_exceptions_must_be_handled() {
    let mut h = Harness::strict();
    insta::assert_snapshot!(
        h.error(r#"throw new Exception("x");"#),
        @"unhandled exception type Exception"
    );
    insta::assert_snapshot!(
        h.value(r#"String m = ""; try { throw new Exception("x"); } catch (Exception e) { m = e.getMessage(); } m;"#),
        @"x"
    );
}

#[test]
fn switch_falls_through_until_break() {
    let source = r#"
        String out = "";
        switch ("b") {
            case "a": out += "a";
            case "b": out += "b";
            case "c": out += "c"; break;
            default: out += "d";
        }
        out;
    "#;
    insta::assert_snapshot!(value(source), @"bc");
}

#[test]
fn conditional_operands_widen() {
    insta::assert_snapshot!(value("true ? 1 : 2.0;"), @"1.0");
}

#[test]
fn missing_return_is_reported() {
    insta::assert_snapshot!(
        error("int f(boolean b) { if (b) { return 1; } }"),
        @"this method must return a result of type int"
    );
}

#[test]
fn sink_counts_loop_iterations() {
    let runtime = Rc::new(Runtime::captured());
    let mut scope = Scope::new(runtime.clone());
    let counters = Counters::default();
    let interpreter = Interpreter::with_sink(runtime.as_ref(), &counters);
    for node in program("for (int i = 0; i < 3; i++) { }") {
        interpreter.evaluate(&mut scope, &node, true).unwrap();
    }
    assert_eq!(counters.iterations(), 4);
    assert!(counters.nodes() > 0);
}
