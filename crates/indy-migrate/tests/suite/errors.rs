use indy_migrate::{migrate_source, MigrateError};
use pretty_assertions::assert_eq;

fn migrate_err(src: &str) -> MigrateError {
    migrate_source(src).expect_err("migration should fail")
}

#[test]
fn locals_missing_on_one_side_are_rejected() {
    let err = migrate_err(
        r#"import net.bytebuddy.asm.Advice;

public class A {
    @Advice.OnMethodEnter
    public static void enter(@Advice.Local("span") Object span, @Advice.Local("scope") Object scope) {
        span = "s";
    }

    @Advice.OnMethodExit
    public static void exit(@Advice.Local("span") Object span) {
        end(span);
    }
}
"#,
    );
    assert_eq!(
        err,
        MigrateError::MismatchedLocals {
            enter: vec!["scope".to_string(), "span".to_string()],
            exit: vec!["span".to_string()],
        }
    );
    assert!(err.is_malformed_advice());
}

#[test]
fn two_enter_methods_are_rejected() {
    let err = migrate_err(
        r#"import net.bytebuddy.asm.Advice;

public class A {
    @Advice.OnMethodEnter
    public static void first() {
    }

    @Advice.OnMethodEnter
    public static void second() {
    }
}
"#,
    );
    assert_eq!(
        err,
        MigrateError::DuplicateAdviceMethod {
            class: "A".to_string(),
            marker: "OnMethodEnter",
        }
    );
}

#[test]
fn enter_binding_needs_an_enter_method() {
    let err = migrate_err(
        r#"import net.bytebuddy.asm.Advice;

public class A {
    @Advice.OnMethodExit
    public static void exit(@Advice.Enter long start, @Advice.Return(readOnly = false) long value) {
        value = start;
    }
}
"#,
    );
    assert_eq!(
        err,
        MigrateError::EnterBindingWithoutEnterMethod {
            method: "exit".to_string(),
        }
    );
}

#[test]
fn two_enter_bindings_are_rejected() {
    let err = migrate_err(
        r#"import net.bytebuddy.asm.Advice;

public class A {
    @Advice.OnMethodEnter
    public static long enter() {
        return 1;
    }

    @Advice.OnMethodExit
    public static void exit(@Advice.Enter long a, @Advice.Enter long b) {
    }
}
"#,
    );
    assert_eq!(
        err,
        MigrateError::DuplicateEnterBinding {
            method: "exit".to_string(),
        }
    );
}

#[test]
fn syntax_errors_are_reported_with_their_position() {
    let err = migrate_err("public class A {\n    void f( {\n}\n");
    assert!(!err.is_malformed_advice());
    let MigrateError::Parse(parse) = err else {
        panic!("expected a parse error");
    };
    assert_eq!(parse.line, 2);
}

#[test]
fn discarded_return_values_outside_a_block_are_refused() {
    let err = migrate_err(
        r#"import net.bytebuddy.asm.Advice;

public class A {
    @Advice.OnMethodEnter
    public static int enter(@Advice.Argument(value = 0, readOnly = false) String a) {
        if (a == null) return compute();
        a = "x";
        return 0;
    }
}
"#,
    );
    assert_eq!(
        err,
        MigrateError::UnsupportedReturnPosition {
            method: "enter".to_string(),
        }
    );
}
