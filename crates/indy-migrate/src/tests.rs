use std::sync::Arc;

use indy_resolve::TypeScope;
use indy_syntax::{
    parse_java, print_canonical, CompilationUnit, Expr, Member, MethodDecl, Step, StmtKind,
    StmtPath,
};
use pretty_assertions::assert_eq;
use smol_str::SmolStr;

use crate::{
    classify_parameters, fold_returns, pack_returns, prune_if_unused, remove_declaration,
    replace_references, return_paths, usages_of, AdviceLocals, BindingRole, FrameworkTypes,
    MigrateError, Usages, ValueToReturn, WriteTarget,
};

fn parse(src: &str) -> CompilationUnit {
    parse_java(src).expect("parses")
}

fn class_scope(unit: &CompilationUnit) -> TypeScope {
    TypeScope::for_unit(unit, Arc::new(FrameworkTypes)).nested(&unit.types[0])
}

fn method<'a>(unit: &'a CompilationUnit, name: &str) -> &'a MethodDecl {
    unit.types[0]
        .methods()
        .find(|method| method.name == name)
        .expect("method")
}

fn method_mut<'a>(unit: &'a mut CompilationUnit, name: &str) -> &'a mut MethodDecl {
    unit.types[0]
        .members
        .iter_mut()
        .find_map(|member| match member {
            Member::Method(method) if method.name == name => Some(method),
            _ => None,
        })
        .expect("method")
}

fn names(names: &[&str]) -> Vec<SmolStr> {
    names.iter().map(|name| SmolStr::new(name)).collect()
}

/// Values for the parameters of `method`, all written back as arguments.
fn param_values(method: &MethodDecl) -> Vec<ValueToReturn> {
    method
        .params
        .iter()
        .enumerate()
        .map(|(idx, param)| ValueToReturn {
            decl: param.id,
            name: param.name.clone(),
            ty: param.declared_type(),
            target: Some(WriteTarget::Argument(idx as i32)),
        })
        .collect()
}

#[test]
fn returns_of_lambdas_and_nested_classes_are_not_collected() {
    let unit = parse(
        r#"class A {
    String f(boolean c) {
        Supplier<String> s = () -> {
            return "lambda";
        };
        Object o = new Object() {
            public String toString() {
                return "anonymous";
            }
        };
        class Local {
            String g() {
                return "local";
            }
        }
        if (c) {
            return "then";
        }
        try {
            return "try";
        } finally {
            g();
        }
    }
}
"#,
    );
    let body = method(&unit, "f").body.as_ref().unwrap();
    let root = StmtPath::root();
    assert_eq!(
        return_paths(body),
        vec![
            root.child(Step::Stmt(3))
                .child(Step::Then)
                .child(Step::Nested)
                .child(Step::Stmt(0)),
            root.child(Step::Stmt(4)).child(Step::Body).child(Step::Stmt(0)),
        ]
    );
}

#[test]
fn parameters_are_classified_by_their_advice_annotation() {
    let unit = parse(
        r#"import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.Local;

class A {
    @Advice.OnMethodExit
    static void exit(@Advice.Argument(value = 1, readOnly = false) String a, @Advice.Argument(2) String b, @Local("ctx") Object ctx, @Advice.FieldValue(value = "f", readOnly = false) int f, @Advice.Return Object r, @Advice.Enter long start, @Advice.Thrown Throwable t, String plain) {
    }
}
"#,
    );
    let bindings = classify_parameters(method(&unit, "exit"), &class_scope(&unit)).unwrap();
    let roles: Vec<_> = bindings
        .iter()
        .map(|binding| (binding.name.as_str(), binding.role.clone(), binding.is_writable()))
        .collect();
    assert_eq!(roles[0], ("a", BindingRole::Argument(1), true));
    assert_eq!(roles[1], ("b", BindingRole::Argument(2), false));
    assert_eq!(roles[2], ("ctx", BindingRole::Local("ctx".into()), false));
    assert!(matches!(roles[3].1, BindingRole::FieldValue(_)));
    assert!(roles[3].2);
    assert_eq!(roles[4], ("r", BindingRole::Return, false));
    assert_eq!(roles[5], ("start", BindingRole::Enter, false));
    assert_eq!(roles[6], ("t", BindingRole::Thrown, false));
    assert_eq!(roles[7], ("plain", BindingRole::Unbound, false));
    assert_eq!(bindings[2].local_key().map(SmolStr::as_str), Some("ctx"));
}

#[test]
fn non_literal_annotation_values_are_rejected() {
    let unit = parse(
        r#"import net.bytebuddy.asm.Advice;

class A {
    @Advice.OnMethodEnter
    static void enter(@Advice.Argument(value = INDEX, readOnly = false) String a) {
    }
}
"#,
    );
    let err = classify_parameters(method(&unit, "enter"), &class_scope(&unit)).unwrap_err();
    assert!(matches!(err, MigrateError::InvalidAnnotationValue { ref param, .. } if param == "a"));
    assert!(err.is_malformed_advice());
}

fn locals_of(src: &str) -> Result<AdviceLocals, MigrateError> {
    let unit = parse(src);
    let scope = class_scope(&unit);
    let enter = method(&unit, "enter");
    let exit = method(&unit, "exit");
    let enter_bindings = classify_parameters(enter, &scope)?;
    let exit_bindings = classify_parameters(exit, &scope)?;
    AdviceLocals::create(
        Some((enter, enter_bindings.as_slice())),
        Some((exit, exit_bindings.as_slice())),
    )
}

#[test]
fn locals_must_match_between_enter_and_exit() {
    let err = locals_of(
        r#"import net.bytebuddy.asm.Advice;

class A {
    static void enter(@Advice.Local("b") int b, @Advice.Local("a") int a) {
    }
    static void exit(@Advice.Local("a") int a, @Advice.Local("c") int c) {
    }
}
"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        MigrateError::MismatchedLocals {
            enter: vec!["a".to_string(), "b".to_string()],
            exit: vec!["a".to_string(), "c".to_string()],
        }
    );
}

#[test]
fn a_single_carried_value_needs_no_container() {
    let single = locals_of(
        r#"import net.bytebuddy.asm.Advice;

class A {
    static void enter(@Advice.Local("a") String a) {
    }
    static void exit(@Advice.Local("a") String a) {
    }
}
"#,
    )
    .unwrap();
    assert!(single.any_found());
    assert!(!single.requires_container());
    assert_eq!(
        single.carrier_type().map(|ty| ty.to_string()),
        Some("String".to_string())
    );

    let combined = locals_of(
        r#"import net.bytebuddy.asm.Advice;

class A {
    static int enter(@Advice.Local("a") String a) {
        return 1;
    }
    static void exit(@Advice.Local("a") String a, @Advice.Enter int started) {
    }
}
"#,
    )
    .unwrap();
    assert!(combined.requires_container());
    assert_eq!(
        combined.carrier_type().map(|ty| ty.to_string()),
        Some("AdviceLocals".to_string())
    );
    let fields: Vec<_> = combined
        .container_type()
        .field_names()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(fields, vec!["started", "a"]);
}

#[test]
fn duplicate_local_keys_are_rejected() {
    let err = locals_of(
        r#"import net.bytebuddy.asm.Advice;

class A {
    static void enter(@Advice.Local("a") String a, @Advice.Local("a") String b) {
    }
    static void exit(@Advice.Local("a") String a) {
    }
}
"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        MigrateError::DuplicateLocal {
            method: "enter".to_string(),
            key: "a".to_string(),
        }
    );
}

#[test]
fn replacing_references_skips_shadowing_lambda_parameters() {
    let mut unit = parse(
        "class A {
    void f(String x) {
        g(x);
        Function<String, String> h = x -> x.trim();
        x = x + 1;
    }
}
",
    );
    let method = method_mut(&mut unit, "f");
    let param = method.params[0].id;
    let replaced = replace_references(
        method,
        param,
        &Expr::field_access(Expr::name("locals"), "x"),
    );
    assert_eq!(replaced, 3);
    assert_eq!(
        print_canonical(&unit),
        "class A {
    void f(String x) {
        g(locals.x);
        Function<String, String> h = x -> x.trim();
        locals.x = locals.x + 1;
    }
}
"
    );
}

#[test]
fn usages_split_plain_writes_from_reads() {
    let unit = parse(
        "class A {
    void f(int x) {
        x = 1;
        x += 2;
        x++;
        g(x);
    }
}
",
    );
    let method = method(&unit, "f");
    assert_eq!(
        usages_of(method, method.params[0].id),
        Usages {
            reads: 3,
            writes: 1,
        }
    );
}

#[test]
fn removed_statements_hand_their_comments_on() {
    let mut unit = parse(
        "class A {
    void f() {
        // about x
        int x = 0;
        int y = 1, z = 2;
        g(y, z);
    }
}
",
    );
    let method = method_mut(&mut unit, "f");
    let body = method.body.as_ref().unwrap();
    let StmtKind::LocalVar(x) = &body.stmts[0].kind else {
        panic!("expected local");
    };
    let x = x.declarators[0].id;
    let StmtKind::LocalVar(yz) = &body.stmts[1].kind else {
        panic!("expected local");
    };
    let z = yz.declarators[1].id;

    assert!(prune_if_unused(method, x));
    assert!(!prune_if_unused(method, z));
    assert_eq!(
        print_canonical(&unit),
        "class A {
    void f() {
        // about x
        int y = 1, z = 2;
        g(y, z);
    }
}
"
    );
}

#[test]
fn declarators_sharing_a_statement_are_removed_alone() {
    let mut unit = parse(
        "class A {
    void f() {
        int y = 1, z = 2;
        g(y);
    }
}
",
    );
    let method = method_mut(&mut unit, "f");
    let StmtKind::LocalVar(local) = &method.body.as_ref().unwrap().stmts[0].kind else {
        panic!("expected local");
    };
    let z = local.declarators[1].id;
    assert!(remove_declaration(method, z));
    assert_eq!(
        print_canonical(&unit),
        "class A {
    void f() {
        int y = 1;
        g(y);
    }
}
"
    );
}

#[test]
fn packing_rewrites_every_return_of_the_method() {
    let mut unit = parse(
        "class A {
    void f(String a, int b) {
        if (a == null) {
            return;
        }
        Runnable r = () -> {
            return;
        };
        b = 2;
    }
}
",
    );
    let method = method_mut(&mut unit, "f");
    let values = param_values(method);
    pack_returns(method, &values).unwrap();
    assert_eq!(
        print_canonical(&unit),
        "class A {
    Object[] f(String a, int b) {
        if (a == null) {
            return new Object[]{a, b};
        }
        Runnable r = () -> {
            return;
        };
        b = 2;
        return new Object[]{a, b};
    }
}
"
    );
}

#[test]
fn packing_keeps_side_effects_of_discarded_return_values() {
    let mut unit = parse(
        "class A {
    int f(String a) {
        return compute();
    }
}
",
    );
    let method = method_mut(&mut unit, "f");
    let values = param_values(method);
    pack_returns(method, &values).unwrap();
    assert_eq!(
        print_canonical(&unit),
        "class A {
    String f(String a) {
        compute();
        return a;
    }
}
"
    );
}

#[test]
fn returns_outside_a_block_cannot_keep_their_value() {
    let mut unit = parse(
        "class A {
    int f(String a, boolean c) {
        if (c) return compute();
        return 1;
    }
}
",
    );
    let method = method_mut(&mut unit, "f");
    let values = param_values(method);
    let err = pack_returns(method, &values[..1]).unwrap_err();
    assert_eq!(
        err,
        MigrateError::UnsupportedReturnPosition {
            method: "f".to_string(),
        }
    );
}

#[test]
fn folding_inlines_trailing_assignments() {
    let mut unit = parse(
        r#"class A {
    Object[] f(String a, String b) {
        log();
        // first
        a = "x";
        b = "y"; // second
        return new Object[]{a, b};
    }
}
"#,
    );
    let folded = fold_returns(method_mut(&mut unit, "f"), &names(&["a", "b"]));
    assert_eq!(folded, 2);
    assert_eq!(
        print_canonical(&unit),
        r#"class A {
    Object[] f(String a, String b) {
        log();
        // first
        // second
        return new Object[]{"x", "y"};
    }
}
"#
    );
}

#[test]
fn folding_stops_at_values_reading_other_returned_names() {
    let mut unit = parse(
        r#"class A {
    Object[] f(String a, String b) {
        a = "x";
        b = a + "y";
        return new Object[]{a, b};
    }
}
"#,
    );
    assert_eq!(fold_returns(method_mut(&mut unit, "f"), &names(&["a", "b"])), 0);
}

#[test]
fn folding_keeps_calls_in_their_original_order() {
    let mut unit = parse(
        "class A {
    Object[] f(String a, String b) {
        b = first();
        a = second();
        return new Object[]{a, b};
    }
}
",
    );
    let folded = fold_returns(method_mut(&mut unit, "f"), &names(&["a", "b"]));
    assert_eq!(folded, 1);
    assert_eq!(
        print_canonical(&unit),
        "class A {
    Object[] f(String a, String b) {
        b = first();
        return new Object[]{second(), b};
    }
}
"
    );
}

#[test]
fn folding_ignores_compound_assignments_and_shared_slots() {
    let mut unit = parse(
        "class A {
    String f(String a) {
        a += \"x\";
        return a;
    }
    Object[] g(String a, String b) {
        a = \"x\";
        return new Object[]{a, a};
    }
}
",
    );
    assert_eq!(fold_returns(method_mut(&mut unit, "f"), &names(&["a"])), 0);
    assert_eq!(fold_returns(method_mut(&mut unit, "g"), &names(&["a", "b"])), 0);
}

#[test]
fn folding_fills_a_single_unpacked_return() {
    let mut unit = parse(
        "class A {
    String f(String a) {
        if (a == null) {
            a = \"empty\";
            return a;
        }
        a = a.trim();
        return a;
    }
}
",
    );
    let folded = fold_returns(method_mut(&mut unit, "f"), &names(&["a"]));
    assert_eq!(folded, 2);
    assert_eq!(
        print_canonical(&unit),
        "class A {
    String f(String a) {
        if (a == null) {
            return \"empty\";
        }
        return a.trim();
    }
}
"
    );
}

#[test]
fn packing_adds_no_return_after_statements_that_never_complete() {
    let mut unit = parse(
        "class A {
    void f(String a) {
        if (a == null) {
            return;
        } else {
            throw new IllegalStateException();
        }
    }
    void g(String a) {
        while (true) {
            a = next(a);
            if (a != null) {
                return;
            }
        }
    }
    void h(String a) {
        for (;;) {
            if (a == null) {
                break;
            }
            return;
        }
    }
}
",
    );
    for name in ["f", "g", "h"] {
        let method = method_mut(&mut unit, name);
        let values = param_values(method);
        pack_returns(method, &values).unwrap();
    }
    assert_eq!(
        print_canonical(&unit),
        "class A {
    String f(String a) {
        if (a == null) {
            return a;
        } else {
            throw new IllegalStateException();
        }
    }
    String g(String a) {
        while (true) {
            a = next(a);
            if (a != null) {
                return a;
            }
        }
    }
    String h(String a) {
        for (;;) {
            if (a == null) {
                break;
            }
            return a;
        }
        return a;
    }
}
"
    );
}
