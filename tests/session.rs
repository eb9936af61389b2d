use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kava::{Error, Reply, Session, SessionConfig};

fn shown(session: &mut Session, source: &str) -> String {
    match session.run(source) {
        Ok(reply) => reply.text().unwrap_or("<nothing>").to_string(),
        Err(error) => format!("error: {error}"),
    }
}

#[test]
fn submissions_build_on_each_other() {
    let mut session = Session::captured(SessionConfig::default());
    insta::assert_snapshot!(shown(&mut session, "int[] xs = {3, 1, 2};"), @"<nothing>");
    insta::assert_snapshot!(shown(&mut session, "java.util.Arrays.sort(xs);"), @"<nothing>");
    insta::assert_snapshot!(shown(&mut session, "java.util.Arrays.toString(xs);"), @"[1, 2, 3]");
    insta::assert_snapshot!(shown(&mut session, "xs.length * 2;"), @"6");
    assert_eq!(session.variables(), vec!["xs".to_string()]);
}

#[test]
fn replies_carry_the_static_type() {
    let mut session = Session::captured(SessionConfig::default());
    let reply = session.run("'a' + 1;").unwrap();
    let Reply::Value { ty, text } = reply else {
        panic!("expected a value, got {reply:?}");
    };
    assert_eq!(ty.to_string(), "int");
    assert_eq!(text, "98");
}

#[test]
fn runtime_failure_keeps_earlier_effects() {
    let mut session = Session::captured(SessionConfig::default());
    let error = session
        .run(r#"int before = 1; Object o = "s"; Integer i = (Integer) o;"#)
        .unwrap_err();
    assert!(matches!(error, Error::Execution(_)), "{error:?}");
    insta::assert_snapshot!(shown(&mut session, "before;"), @"1");
}

#[test]
fn functions_can_be_dropped_and_redeclared() {
    let mut session = Session::captured(SessionConfig::default());
    session.run("int f() { return 1; }").unwrap();
    insta::assert_snapshot!(shown(&mut session, "int f() { return 2; }"), @"error: duplicate function f()");
    session.run("drop f();").unwrap();
    session.run("int f() { return 2; }").unwrap();
    insta::assert_snapshot!(shown(&mut session, "f();"), @"2");
}

#[test]
fn strict_sessions_require_handlers() {
    let config = SessionConfig::default()
        .strict_exceptions(true)
        .handle("java.lang.InterruptedException");
    let mut session = Session::captured(config);
    session.run("Thread.sleep(0);").unwrap();
    insta::assert_snapshot!(
        shown(&mut session, "void g() { throw new java.io.IOException(); }"),
        @"error: unhandled exception type IOException"
    );
}

#[test]
fn cancel_flag_stops_a_running_loop() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut session = Session::captured(SessionConfig::default().cancel_flag(flag.clone()));
    insta::assert_snapshot!(shown(&mut session, "while (true) { }"), @"error: evaluation canceled");
    flag.store(false, Ordering::Relaxed);
    insta::assert_snapshot!(shown(&mut session, "1 + 1;"), @"2");
}

#[test]
fn block_comments_are_ignored() {
    let mut session = Session::captured(SessionConfig::default());
    insta::assert_snapshot!(shown(&mut session, "/* note */ 1 + /* inline */ 1;"), @"2");
    insta::assert_snapshot!(shown(&mut session, "/** doc\n * lines\n */ int x = 3; x;"), @"3");
}

#[test]
fn extreme_doubles_concatenate_in_exponent_form() {
    let mut session = Session::captured(SessionConfig::default());
    insta::assert_snapshot!(shown(&mut session, "\"\" + 1e20;"), @"1.0E20");
    insta::assert_snapshot!(shown(&mut session, "\"v=\" + 0.00001;"), @"v=1.0E-5");
    insta::assert_snapshot!(shown(&mut session, "\"\" + Double.MIN_VALUE;"), @"4.9E-324");
    insta::assert_snapshot!(shown(&mut session, "\"\" + Float.MAX_VALUE;"), @"3.4028235E38");
}

#[test]
fn generic_function_declarations_are_refused() {
    let mut session = Session::captured(SessionConfig::default());
    insta::assert_snapshot!(
        shown(&mut session, "<T> T id(T x) { return x; }"),
        @"error: generic functions are not supported"
    );
    insta::assert_snapshot!(shown(&mut session, "1 < 2;"), @"true");
}
