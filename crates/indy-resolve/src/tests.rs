use std::collections::HashSet;
use std::sync::Arc;

use indy_syntax::{parse_java, visit, visit::Visitor, CompilationUnit, MethodDecl, NameExpr, NodeId};
use pretty_assertions::assert_eq;

use crate::{BodyScopes, Resolution, TypeIndex, TypeScope};

struct Known(HashSet<&'static str>);

impl TypeIndex for Known {
    fn contains_type(&self, fqn: &str) -> bool {
        self.0.contains(fqn)
    }
}

fn index(types: &[&'static str]) -> Arc<dyn TypeIndex> {
    Arc::new(Known(types.iter().copied().collect()))
}

/// Collects every name expression in a method body, in source order.
#[derive(Default)]
struct Names(Vec<(String, NodeId)>);

impl Visitor for Names {
    fn visit_name(&mut self, name: &NameExpr) {
        self.0.push((name.name.to_string(), name.id));
    }
}

fn names(method: &MethodDecl) -> Vec<(String, NodeId)> {
    let mut names = Names::default();
    if let Some(body) = &method.body {
        visit::walk_block(&mut names, body);
    }
    names.0
}

fn first_method(unit: &CompilationUnit) -> &MethodDecl {
    unit.types[0].methods().next().expect("method")
}

#[test]
fn params_and_locals_resolve_in_order() {
    let unit = parse_java(
        "class A {
    void f(int a) {
        g(a);
        int a2 = a;
        {
            int a3 = a2;
        }
        h(a3);
    }
}",
    )
    .unwrap();
    let method = first_method(&unit);
    let scopes = BodyScopes::build(method);
    let names = names(method);
    let param = method.params[0].id;

    let resolved: Vec<_> = names
        .iter()
        .map(|(name, id)| (name.as_str(), scopes.resolve(*id).is_some()))
        .collect();
    assert_eq!(
        resolved,
        vec![("a", true), ("a", true), ("a2", true), ("a3", false)]
    );
    assert_eq!(scopes.resolve(names[0].1), Some(Resolution::Param(param)));
    assert_eq!(scopes.references(param).count(), 2);
}

#[test]
fn anonymous_class_fields_and_lambda_params_shadow() {
    let unit = parse_java(
        "class A {
    void f(int x) {
        Runnable r = new Runnable() {
            int x = 1;
            public void run() {
                x++;
            }
        };
        java.util.function.IntUnaryOperator op = x -> x + 1;
        use(x);
    }
}",
    )
    .unwrap();
    let method = first_method(&unit);
    let scopes = BodyScopes::build(method);
    let param = method.params[0].id;
    let names = names(method);

    let xs: Vec<_> = names.iter().filter(|(n, _)| n == "x").map(|(_, id)| *id).collect();
    assert_eq!(xs.len(), 3);
    assert!(matches!(scopes.resolve(xs[0]), Some(Resolution::Field(_))));
    assert!(matches!(scopes.resolve(xs[1]), Some(Resolution::Param(id)) if id != param));
    assert!(scopes.resolves_to(xs[2], param));
}

#[test]
fn catch_params_and_pattern_bindings() {
    let unit = parse_java(
        "class A {
    void f(Object o) {
        try {
            g();
        } catch (Exception e) {
            log(e);
        }
        if (!(o instanceof String s)) {
            return;
        }
        use(s);
    }
}",
    )
    .unwrap();
    let method = first_method(&unit);
    let scopes = BodyScopes::build(method);
    let names = names(method);
    let lookup = |wanted: &str| {
        names
            .iter()
            .find(|(n, _)| n == wanted)
            .map(|(_, id)| scopes.resolve(*id))
            .unwrap()
    };
    assert!(matches!(lookup("e"), Some(Resolution::Local(_))));
    assert!(matches!(lookup("s"), Some(Resolution::Local(_))));
    assert!(matches!(lookup("o"), Some(Resolution::Param(_))));
}

#[test]
fn annotation_names_resolve_through_imports() {
    let unit = parse_java(
        "package demo;

import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.Argument;
import net.bytebuddy.implementation.bytecode.assign.*;

class Outer {
    static class Advice2 {
    }
}",
    )
    .unwrap();
    let scope = TypeScope::for_unit(
        &unit,
        index(&["net.bytebuddy.implementation.bytecode.assign.Assigner", "java.lang.Throwable"]),
    );
    assert_eq!(
        scope.resolve_type_name("Advice.OnMethodEnter").as_deref(),
        Some("net.bytebuddy.asm.Advice.OnMethodEnter")
    );
    assert_eq!(
        scope.resolve_type_name("Argument").as_deref(),
        Some("net.bytebuddy.asm.Advice.Argument")
    );
    assert_eq!(
        scope.resolve_type_name("Assigner.Typing").as_deref(),
        Some("net.bytebuddy.implementation.bytecode.assign.Assigner.Typing")
    );
    assert_eq!(
        scope.resolve_type_name("Throwable").as_deref(),
        Some("java.lang.Throwable")
    );
    assert_eq!(
        scope.resolve_type_name("net.bytebuddy.asm.Advice.Return").as_deref(),
        Some("net.bytebuddy.asm.Advice.Return")
    );
    assert_eq!(scope.resolve_type_name("Unknown"), None);

    let inner = scope.nested(&unit.types[0]);
    assert_eq!(inner.enclosing_type(), Some("demo.Outer"));
    assert_eq!(
        inner.resolve_type_name("Advice2").as_deref(),
        Some("demo.Outer.Advice2")
    );
    assert_eq!(inner.qualify("Local"), "demo.Outer.Local");
}

#[test]
fn member_types_shadow_imports() {
    let unit = parse_java(
        "import net.bytebuddy.asm.Advice;

class Outer {
    static class Advice {
    }
}",
    )
    .unwrap();
    let scope = TypeScope::for_unit(&unit, index(&[]));
    assert_eq!(
        scope.resolve_type_name("Advice").as_deref(),
        Some("net.bytebuddy.asm.Advice")
    );
    let inner = scope.nested(&unit.types[0]);
    assert_eq!(
        inner.resolve_type_name("Advice.Argument").as_deref(),
        Some("Outer.Advice.Argument")
    );
}
