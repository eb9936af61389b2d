mod common;

use common::run_kava;

#[test]
fn run_prints_program_output() {
    let finished = run_kava(
        "run",
        &[],
        r#"
        int square(int n) { return n * n; }
        for (int i = 1; i <= 3; i++) {
            System.out.println(square(i));
        }
        "#,
    );
    assert_eq!(finished.code, Some(0), "{}", finished.stderr);
    insta::assert_snapshot!(finished.stdout, @r"
    1
    4
    9
    ");
}

#[test]
fn uncaught_exception_fails_the_run() {
    let finished = run_kava("run", &[], r#"throw new RuntimeException("boom");"#);
    assert_eq!(finished.code, Some(1));
    assert!(finished.stderr.contains("java.lang.RuntimeException: boom"), "{}", finished.stderr);
}

#[test]
fn check_executes_nothing() {
    let finished = run_kava("check", &[], r#"System.out.println("side effect");"#);
    assert_eq!(finished.code, Some(0), "{}", finished.stderr);
    assert_eq!(finished.stdout, "");
}

#[test]
fn check_reports_type_errors() {
    let finished = run_kava("check", &[], "String s = 1 + 2;");
    assert_eq!(finished.code, Some(1));
    assert!(finished.stderr.contains("type mismatch"), "{}", finished.stderr);
}

#[test]
fn strict_exceptions_flag_is_honoured() {
    let source = "Thread.sleep(1);";
    assert_eq!(run_kava("check", &[], source).code, Some(0));
    let strict = run_kava("check", &["--strict-exceptions"], source);
    assert_eq!(strict.code, Some(1));
    assert!(
        strict.stderr.contains("unhandled exception type InterruptedException"),
        "{}",
        strict.stderr
    );
}

#[test]
fn ast_dumps_the_tree() {
    let finished = run_kava("ast", &[], "x++;");
    assert_eq!(finished.code, Some(0), "{}", finished.stderr);
    assert!(finished.stdout.starts_with("unary operator @"), "{}", finished.stdout);
    assert!(finished.stdout.contains("identifier"), "{}", finished.stdout);
}

#[test]
fn syntax_errors_are_reported() {
    let finished = run_kava("run", &[], "x = ;");
    assert_eq!(finished.code, Some(1));
    assert!(finished.stderr.contains("[syntax]"), "{}", finished.stderr);
}
