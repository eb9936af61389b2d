use kava_ast::{
    AssignOp, BinaryOp, ConstructionResult, Import, Keyword, Literal, Node, NodeKind, UnaryOp,
    construct_program,
};
use kava_core::Primitive;

fn build(source: &str) -> ConstructionResult<Vec<Node>> {
    let program = kava_syntax::parse_program(source).expect("source should match the grammar");
    construct_program(source, &program)
}

fn single(source: &str) -> Node {
    let mut nodes = build(source).unwrap();
    assert_eq!(nodes.len(), 1, "expected one construct in {source:?}");
    nodes.remove(0)
}

fn error(source: &str) -> String {
    build(source).unwrap_err().to_string()
}

#[test]
fn binary_operators_associate_left() {
    let node = single("a - b - c * d;");
    let NodeKind::Binary { op, left, right } = &node.kind else {
        panic!("expected binary, got {node:?}");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(
        &left.kind,
        NodeKind::Binary {
            op: BinaryOp::Sub,
            ..
        }
    ));
    assert!(matches!(
        &right.kind,
        NodeKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn unary_position_comes_from_offsets() {
    let nodes = build("x++; ++x; --x; x--; !b;").unwrap();
    let ops: Vec<_> = nodes
        .iter()
        .map(|n| match &n.kind {
            NodeKind::Unary { op, .. } => *op,
            other => panic!("expected unary, got {other:?}"),
        })
        .collect();
    assert_eq!(
        ops,
        [
            UnaryOp::PostIncrement,
            UnaryOp::PreIncrement,
            UnaryOp::PreDecrement,
            UnaryOp::PostDecrement,
            UnaryOp::Not,
        ]
    );
}

#[test]
fn negated_min_value_literals() {
    let node = single("-2147483648;");
    assert_eq!(node.kind, NodeKind::Literal(Literal::Int(i32::MIN)));
    let node = single("-9223372036854775808L;");
    assert_eq!(node.kind, NodeKind::Literal(Literal::Long(i64::MIN)));
    insta::assert_snapshot!(
        error("2147483648;"),
        @"invalid literal: the literal 2147483648 of type int is out of range"
    );
    insta::assert_snapshot!(
        error("int x = 0x1FFFFFFFF;"),
        @"invalid literal: the literal 0x1FFFFFFFF of type int is out of range"
    );
}

#[test]
fn structural_validation() {
    insta::assert_snapshot!(
        error("void f(int... a, int b) { }"),
        @"only the last parameter may be variable-arity"
    );
    insta::assert_snapshot!(
        error("try { }"),
        @"`try` requires at least one `catch` or a `finally`"
    );
    insta::assert_snapshot!(
        error("switch (x) { default: break; default: }"),
        @"duplicate `default` label in switch"
    );
    insta::assert_snapshot!(
        error("Object o = new ArrayList<?>();"),
        @"cannot instantiate the type ArrayList<?>"
    );
    insta::assert_snapshot!(
        error("Runnable r = new Runnable() { x = 5; };"),
        @"anonymous class members must be field or method declarations"
    );
}

#[test]
fn anonymous_class_members() {
    let node = single("Runnable r = new Runnable() { int count = 1; public void run() { count++; } };");
    let NodeKind::Assign { value, .. } = &node.kind else {
        panic!("expected assignment, got {node:?}");
    };
    let NodeKind::New {
        body: Some(members),
        ..
    } = &value.kind
    else {
        panic!("expected anonymous class, got {value:?}");
    };
    assert_eq!(members.len(), 2);
    assert!(matches!(members[1].kind, NodeKind::Function(_)));
}

#[test]
fn array_dimensions_accumulate() {
    let node = single("int a[][] = {{1}, {2, 3}};");
    let NodeKind::Assign { target, value, .. } = &node.kind else {
        panic!("expected assignment, got {node:?}");
    };
    let NodeKind::Declaration(declaration) = &target.kind else {
        panic!("expected declaration, got {target:?}");
    };
    assert_eq!(declaration.ty.dims, 2);
    assert_eq!(declaration.ty.to_string(), "int[][]");
    let NodeKind::ArrayInit { ty, items } = &value.kind else {
        panic!("expected initializer, got {value:?}");
    };
    assert_eq!(ty.as_ref().map(|t| t.dims), Some(2));
    let NodeKind::ArrayInit { ty: inner, .. } = &items[1].kind else {
        panic!("expected nested initializer");
    };
    assert_eq!(inner.as_ref().map(|t| t.dims), Some(1));

    let node = single("new String[3][];");
    let NodeKind::NewArray { sizes, dims, .. } = &node.kind else {
        panic!("expected array creation, got {node:?}");
    };
    assert_eq!((sizes.len(), *dims), (1, 2));

    insta::assert_snapshot!(
        error("int x = {1};"),
        @"array initializer needs an array type, found int"
    );
}

#[test]
fn imports() {
    let nodes = build(
        "import java.util.List; import java.util.*; \
         import static java.lang.Math.max; import static java.lang.Math.*;",
    )
    .unwrap();
    let imports: Vec<_> = nodes
        .into_iter()
        .map(|n| match n.kind {
            NodeKind::Import(import) => import,
            other => panic!("expected import, got {other:?}"),
        })
        .collect();
    assert_eq!(
        imports,
        [
            Import::Class("java.util.List".into()),
            Import::Package("java.util".into()),
            Import::StaticMember {
                owner: "java.lang.Math".into(),
                member: "max".into(),
            },
            Import::Static {
                owner: "java.lang.Math".into(),
            },
        ]
    );
}

#[test]
fn declarations_and_finality() {
    let node = single("final int a = 1, b;");
    let NodeKind::DeclarationList(items) = &node.kind else {
        panic!("expected declaration list, got {node:?}");
    };
    assert!(matches!(
        &items[0].kind,
        NodeKind::Assign {
            op: AssignOp::Assign,
            ..
        }
    ));
    let NodeKind::Declaration(b) = &items[1].kind else {
        panic!("expected bare declaration");
    };
    assert!(b.is_final);
    assert_eq!(b.name, "b");
}

#[test]
fn switch_cases_collect_statements() {
    let node = single("switch (x) { case 1: case 2: y = 1; break; default: y = 2; }");
    let NodeKind::Switch { cases, .. } = &node.kind else {
        panic!("expected switch, got {node:?}");
    };
    let sizes: Vec<_> = cases.iter().map(|c| c.body.len()).collect();
    assert_eq!(sizes, [0, 2, 1]);
    assert!(cases[2].label.is_none());
    assert_eq!(cases[1].body[1].kind, NodeKind::Keyword(Keyword::Break));
}

#[test]
fn function_signatures() {
    let nodes = build(
        "int f(int a, String... rest) { return a; } \
         void f(int b, String... others) { } \
         void f(int b, String[] others) { }",
    )
    .unwrap();
    let functions: Vec<_> = nodes
        .iter()
        .map(|n| match &n.kind {
            NodeKind::Function(f) => f.clone(),
            other => panic!("expected function, got {other:?}"),
        })
        .collect();
    assert!(functions[0].same_signature(&functions[1]));
    assert!(!functions[1].same_signature(&functions[2]));
    assert_eq!(functions[0].signature(), "f(int, String...)");
    assert_eq!(
        functions[0].params[1].ty.name,
        kava_ast::TypeName::Named("String".into())
    );
    assert_eq!(
        functions[2].params[0].ty.name,
        kava_ast::TypeName::Primitive(Primitive::Int)
    );
}

#[test]
fn class_literals() {
    for source in ["int.class;", "String[].class;", "java.util.List.class;"] {
        let node = single(source);
        let NodeKind::ClassLiteral(ty) = &node.kind else {
            panic!("expected class literal, got {node:?}");
        };
        assert!(matches!(ty.kind, NodeKind::Type(_)), "{source}");
    }
}
