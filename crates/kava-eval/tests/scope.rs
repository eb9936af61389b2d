use std::rc::Rc;

use kava_ast::{Node, construct_program};
use kava_core::MemberCatalog;
use kava_eval::{Error, Evaluated, Interpreter, Outcome, Scope};
use kava_runtime::Runtime;

fn program(source: &str) -> Vec<Node> {
    let parsed = kava_syntax::parse_program(source).expect("source should parse");
    construct_program(source, &parsed).expect("source should construct")
}

fn submit(runtime: &Runtime, scope: &mut Scope, source: &str) -> Result<Option<String>, Error> {
    let interpreter = Interpreter::new(runtime);
    let mut shown = None;
    for node in program(source) {
        shown = match interpreter.evaluate(scope, &node, true)? {
            Outcome::Value(Evaluated::Value(_, value)) => Some(interpreter.display(&value)?),
            _ => None,
        };
    }
    Ok(shown)
}

fn fresh() -> (Rc<Runtime>, Scope) {
    let runtime = Rc::new(Runtime::captured());
    let scope = Scope::new(runtime.clone() as Rc<dyn MemberCatalog>);
    (runtime, scope)
}

#[test]
fn declarations_survive_between_submissions() {
    let (runtime, mut scope) = fresh();
    submit(&runtime, &mut scope, "int total = 0;").unwrap();
    submit(&runtime, &mut scope, "int twice(int n) { return n * 2; }").unwrap();
    submit(&runtime, &mut scope, "total = twice(4) + twice(5);").unwrap();
    insta::assert_snapshot!(submit(&runtime, &mut scope, "total;").unwrap().unwrap(), @"18");
    assert!(scope.variable_names().contains(&"total".to_string()));
}

#[test]
fn generic_members_are_substituted() {
    let (runtime, mut scope) = fresh();
    let shown = submit(
        &runtime,
        &mut scope,
        r#"
        import java.util.*;
        List<String> names = new ArrayList<String>();
        names.add("ada");
        names.add("grace");
        names.get(1).length();
        "#,
    )
    .unwrap();
    insta::assert_snapshot!(shown.unwrap(), @"5");
}

#[test]
fn host_fields_are_assignable() {
    let (runtime, mut scope) = fresh();
    let shown = submit(
        &runtime,
        &mut scope,
        "java.awt.Point p = new java.awt.Point(1, 2); p.x = 5; p.x + p.y;",
    )
    .unwrap();
    insta::assert_snapshot!(shown.unwrap(), @"7");
}

#[test]
fn public_only_hides_protected_members() {
    let runtime = Rc::new(Runtime::captured());
    let mut scope = Scope::new(runtime.clone() as Rc<dyn MemberCatalog>).with_public_only(true);
    let error = submit(&runtime, &mut scope, "Object o = new Object(); o.clone();").unwrap_err();
    insta::assert_snapshot!(error, @"the method clone() is not visible");
}

#[test]
fn uncaught_exceptions_carry_their_type() {
    let (runtime, mut scope) = fresh();
    let error = submit(
        &runtime,
        &mut scope,
        r#"throw new IllegalStateException("closed");"#,
    )
    .unwrap_err();
    let Error::Execution(thrown) = error else {
        panic!("expected an execution error, got {error:?}");
    };
    assert_eq!(thrown.ty.class_name(), Some("java.lang.IllegalStateException"));
    insta::assert_snapshot!(thrown.message, @"java.lang.IllegalStateException: closed");
}

#[test]
fn evaluation_errors_point_at_the_node() {
    let (runtime, mut scope) = fresh();
    let source = r#"int n = "text";"#;
    let error = submit(&runtime, &mut scope, source).unwrap_err();
    let Error::Evaluation(failure) = &error else {
        panic!("expected an evaluation error, got {error:?}");
    };
    insta::assert_snapshot!(failure, @"type mismatch: cannot convert from String to int");
    assert!(failure.span.end <= source.len());
}

#[test]
fn printed_output_is_captured() {
    let (runtime, mut scope) = fresh();
    submit(
        &runtime,
        &mut scope,
        r#"for (int i = 0; i < 3; i++) { System.out.print(i); } System.out.println("!");"#,
    )
    .unwrap();
    assert_eq!(runtime.out().take(), "012!\n");
}
