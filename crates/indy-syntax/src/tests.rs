use pretty_assertions::assert_eq;

use crate::{
    lex, parse_java, print, print_canonical, AnnotationArgs, Expr, Member, StmtKind, StmtPath,
    Step, TokenKind, TypeRef,
};

fn dump_tokens(input: &str) -> Vec<(TokenKind, String)> {
    lex(input)
        .expect("lexes")
        .into_iter()
        .map(|t| (t.kind, t.text(input).to_string()))
        .collect()
}

fn canonical(src: &str) -> String {
    print_canonical(&parse_java(src).expect("parses"))
}

#[test]
fn shift_operators_lex_as_single_greater_tokens() {
    assert_eq!(
        dump_tokens("a >>= b"),
        vec![
            (TokenKind::Identifier, "a".to_string()),
            (TokenKind::Greater, ">".to_string()),
            (TokenKind::Greater, ">".to_string()),
            (TokenKind::Eq, "=".to_string()),
            (TokenKind::Identifier, "b".to_string()),
            (TokenKind::Eof, String::new()),
        ]
    );
}

#[test]
fn numeric_and_text_literals() {
    let kinds: Vec<_> = dump_tokens("0x1F 10L 1.5f 2e3 'c' \"s\" \"\"\"\n  block\"\"\"")
        .into_iter()
        .map(|(kind, _)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::IntLiteral,
            TokenKind::LongLiteral,
            TokenKind::FloatLiteral,
            TokenKind::DoubleLiteral,
            TokenKind::CharLiteral,
            TokenKind::StringLiteral,
            TokenKind::TextBlock,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn untouched_source_round_trips_byte_for_byte() {
    let src = "package demo;

import a.B;
import c.D;

/**
 * Doc.
 */
public class Sample {
  int x   =  1;

    void f() {  g( x ) ;  }
}
";
    let unit = parse_java(src).unwrap();
    assert_eq!(print(&unit), src);
}

#[test]
fn crlf_line_endings_survive() {
    let src = "class A {\r\n    void f() {\r\n        int x = 1;\r\n    }\r\n}\r\n";
    let unit = parse_java(src).unwrap();
    assert_eq!(print(&unit), src);

    let mut unit = unit;
    unit.types[0].verbatim.clear();
    if let Member::Method(method) = &mut unit.types[0].members[0] {
        method.verbatim.clear();
    }
    assert_eq!(print(&unit), src);
}

#[test]
fn modified_statements_are_reprinted_and_the_rest_is_kept() {
    let src = "class A {
    int   keep = 1;   // aligned


    void f() {
        g( 1 );

        h( 2 );   // two
    }
}
";
    let mut unit = parse_java(src).unwrap();
    let Member::Method(method) = &mut unit.types[0].members[1] else {
        panic!("expected method");
    };
    let body = method.body.as_mut().unwrap();
    body.stmts[1].kind = StmtKind::Return(None);

    let expected = "class A {
    int   keep = 1;   // aligned


    void f() {
        g( 1 );

        return; // two
    }
}
";
    assert_eq!(print(&unit), expected);
}

#[test]
fn cleared_text_falls_back_to_the_tree() {
    let src = "class A {
    void f() {
        g( 1 );
    }
}
";
    let mut unit = parse_java(src).unwrap();
    unit.types[0].verbatim.clear();
    let Member::Method(method) = &mut unit.types[0].members[0] else {
        panic!("expected method");
    };
    method.verbatim.clear();
    method.body.as_mut().unwrap().stmts[0].verbatim.clear();

    assert_eq!(
        print(&unit),
        "class A {
    void f() {
        g(1);
    }
}
"
    );
}

#[test]
fn canonical_printing_is_stable_for_common_constructs() {
    let src = r#"class A {
    void f(List<Map<String, List<Integer>>> xs) {
        int y = (int) z + 1;
        Object o = (Object) (y);
        Runnable r = () -> g(y >> 2, y >>> 1);
        xs.forEach(x -> x.clear());
        boolean b = o instanceof String s && s.isEmpty();
        y >>= 1;
        for (int i = 0, j = 1; i < j; i++) {
            continue;
        }
        for (String s2 : names) g(s2);
        String[] arr = new String[]{"a", "b"};
        int[][] grid = new int[3][];
        label: while (true) break label;
    }
}
"#;
    assert_eq!(canonical(src), src);
}

#[test]
fn switch_statements_in_both_styles() {
    let src = "class A {
    void f(int k) {
        switch (k) {
            case 1:
            case 2:
                g();
                break;
            default:
                return;
        }
        switch (k) {
            case 1, 2 -> g();
            default -> {
                h();
            }
        }
    }
}
";
    assert_eq!(canonical(src), src);
}

#[test]
fn enums_and_anonymous_classes() {
    let src = "enum Color {
    RED,
    GREEN;

    static int count = 0;
}
";
    assert_eq!(canonical(src), src);

    let src = "class A {
    Runnable r = new Runnable() {
        public void run() {
            go();
        }
    };
}
";
    assert_eq!(canonical(src), src);
}

#[test]
fn advice_annotations_keep_their_arguments() {
    let src = r#"public class A {
    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static void enter(@Advice.Argument(value = 0, readOnly = false) String arg, @Advice.Local("otelContext") Context context) {
        arg = "x";
    }
}
"#;
    let unit = parse_java(src).unwrap();
    let method = unit.types[0].methods().next().unwrap();
    let argument = &method.params[0].annotations[0];
    assert_eq!(argument.name, "Advice.Argument");
    assert_eq!(argument.element("value").and_then(|v| v.as_int()), Some(0));
    assert_eq!(argument.element("readOnly").and_then(|v| v.as_bool()), Some(false));
    let local = &method.params[1].annotations[0];
    assert!(matches!(local.args, AnnotationArgs::Single(_)));
    assert_eq!(local.element("value").and_then(|v| v.as_string()), Some("otelContext"));

    assert_eq!(print_canonical(&unit), src);
}

#[test]
fn comments_stay_with_their_statements() {
    let src = "class A {
    void f() {
        // leading
        int x = 1; // trailing

        /* block */
        g(x);
        // dangling
    }
}
";
    let unit = parse_java(src).unwrap();
    let body = unit.types[0].methods().next().unwrap().body.as_ref().unwrap();
    assert_eq!(body.stmts[0].comments[0].text, "// leading");
    assert_eq!(
        body.stmts[0].trailing_comment.as_ref().map(|c| c.text.as_str()),
        Some("// trailing")
    );
    assert!(body.stmts[1].blank_line_before);
    assert_eq!(body.stmts[1].comments[0].text, "/* block */");
    assert_eq!(body.trailing_comments[0].text, "// dangling");

    assert_eq!(print_canonical(&unit), src);
}

#[test]
fn inlined_expressions_get_parenthesized() {
    let src = "class A {
    int f(int a, int b) {
        return x * 2;
    }
}
";
    let mut unit = parse_java(src).unwrap();
    let sum = parse_java("class B { int s = a + b; }").unwrap();
    let Member::Field(field) = &sum.types[0].members[0] else {
        panic!("expected field");
    };
    let sum = field.declarators[0].init.clone().unwrap();

    let Member::Method(method) = &mut unit.types[0].members[0] else {
        panic!("expected method");
    };
    let stmt = &mut method.body.as_mut().unwrap().stmts[0];
    let StmtKind::Return(Some(Expr::Binary { lhs, .. })) = &mut stmt.kind else {
        panic!("expected binary return");
    };
    **lhs = sum;

    assert!(print_canonical(&unit).contains("return (a + b) * 2;"));
}

#[test]
fn syntax_errors_report_line_and_column() {
    let err = parse_java("class A {\n  void f() {\n    int x = ;\n  }\n}").unwrap_err();
    assert_eq!((err.line, err.column), (3, 13));
    assert_eq!(err.message, "expected expression, found `;`");

    let err = parse_java("record R(int x) {}").unwrap_err();
    assert!(err.message.contains("record declarations are not supported"));

    let err = parse_java("class A { String s = \"open; }").unwrap_err();
    assert_eq!(err.message, "unterminated string literal");
}

#[test]
fn statement_paths_address_nested_statements() {
    let src = "class A {
    int f(boolean a) {
        if (a) {
            return 1;
        } else return 2;
        try {
            x();
        } catch (E e) {
            return 3;
        } finally {
            y();
        }
    }
}
";
    let unit = parse_java(src).unwrap();
    let body = unit.types[0].methods().next().unwrap().body.as_ref().unwrap();

    let then_return = StmtPath::root()
        .child(Step::Stmt(0))
        .child(Step::Then)
        .child(Step::Nested)
        .child(Step::Stmt(0));
    assert!(body.stmt_at(&then_return).unwrap().is_return());
    let (parent, idx) = then_return.split_block_index().unwrap();
    assert_eq!(idx, 0);
    assert_eq!(body.block_at(&parent).unwrap().stmts.len(), 1);

    let else_return = StmtPath::root().child(Step::Stmt(0)).child(Step::Else);
    assert!(body.stmt_at(&else_return).unwrap().is_return());
    assert_eq!(else_return.split_block_index(), None);
    assert!(then_return < else_return);

    let catch_return = StmtPath::root()
        .child(Step::Stmt(1))
        .child(Step::Catch(0))
        .child(Step::Stmt(0));
    assert!(body.stmt_at(&catch_return).unwrap().is_return());
    let finally = StmtPath::root().child(Step::Stmt(1)).child(Step::Finally);
    assert_eq!(body.block_at(&finally).unwrap().stmts.len(), 1);
    assert!(body.stmt_at(&finally).is_none());
    assert!(catch_return < finally);
}

#[test]
fn fresh_clone_renumbers_names() {
    let original = Expr::name("a");
    let copy = original.fresh_clone();
    let (a, b) = (original.as_name().unwrap(), copy.as_name().unwrap());
    assert_eq!(a.name, b.name);
    assert_ne!(a.id, b.id);
}

#[test]
fn type_refs_display_as_java() {
    assert_eq!(
        TypeRef::array(TypeRef::class("java.lang.Object")).to_string(),
        "java.lang.Object[]"
    );
}
