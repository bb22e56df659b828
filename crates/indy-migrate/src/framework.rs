//! Names of the ByteBuddy advice API.

use indexmap::IndexSet;
use indy_resolve::{TypeIndex, TypeScope};
use indy_syntax::Annotation;

pub const ADVICE: &str = "net.bytebuddy.asm.Advice";
pub const ON_METHOD_ENTER: &str = "net.bytebuddy.asm.Advice.OnMethodEnter";
pub const ON_METHOD_EXIT: &str = "net.bytebuddy.asm.Advice.OnMethodExit";
pub const ARGUMENT: &str = "net.bytebuddy.asm.Advice.Argument";
pub const FIELD_VALUE: &str = "net.bytebuddy.asm.Advice.FieldValue";
pub const RETURN: &str = "net.bytebuddy.asm.Advice.Return";
pub const LOCAL: &str = "net.bytebuddy.asm.Advice.Local";
pub const ENTER: &str = "net.bytebuddy.asm.Advice.Enter";
pub const THROWN: &str = "net.bytebuddy.asm.Advice.Thrown";
pub const ASSIGN_RETURNED: &str = "net.bytebuddy.asm.Advice.AssignReturned";
pub const TO_ARGUMENT: &str = "net.bytebuddy.asm.Advice.AssignReturned.ToArguments.ToArgument";
pub const TO_FIELD: &str = "net.bytebuddy.asm.Advice.AssignReturned.ToFields.ToField";

/// Annotation names as they are written into migrated sources. They rely on
/// the imports collected in [`RequiredImports`].
pub(crate) const TO_ARGUMENTS_WRAPPER: &str = "AssignReturned.ToArguments";
pub(crate) const TO_FIELDS_WRAPPER: &str = "AssignReturned.ToFields";
pub(crate) const TO_ARGUMENT_NAME: &str = "ToArgument";
pub(crate) const TO_FIELD_NAME: &str = "ToField";
pub(crate) const TO_RETURNED_NAME: &str = "AssignReturned.ToReturned";

const KNOWN_TYPES: &[&str] = &[
    ADVICE,
    ON_METHOD_ENTER,
    ON_METHOD_EXIT,
    ARGUMENT,
    FIELD_VALUE,
    RETURN,
    LOCAL,
    ENTER,
    THROWN,
    "net.bytebuddy.asm.Advice.This",
    "net.bytebuddy.asm.Advice.AllArguments",
    "net.bytebuddy.asm.Advice.Origin",
    "net.bytebuddy.asm.Advice.Exit",
    "net.bytebuddy.asm.Advice.Unused",
    "net.bytebuddy.asm.Advice.StubValue",
    ASSIGN_RETURNED,
    "net.bytebuddy.asm.Advice.AssignReturned.ToArguments",
    TO_ARGUMENT,
    "net.bytebuddy.asm.Advice.AssignReturned.ToFields",
    TO_FIELD,
    "net.bytebuddy.asm.Advice.AssignReturned.ToReturned",
    "net.bytebuddy.asm.Advice.AssignReturned.ToThrown",
    "net.bytebuddy.asm.Advice.AssignReturned.ToThis",
    "net.bytebuddy.asm.Advice.AssignReturned.ToAllArguments",
    "net.bytebuddy.implementation.bytecode.assign.Assigner",
    "net.bytebuddy.implementation.bytecode.assign.Assigner.Typing",
    "java.lang.Object",
    "java.lang.String",
    "java.lang.Class",
    "java.lang.Throwable",
    "java.lang.Exception",
    "java.lang.RuntimeException",
    "java.lang.Error",
    "java.lang.Override",
    "java.lang.Deprecated",
    "java.lang.SuppressWarnings",
    "java.lang.FunctionalInterface",
    "java.lang.SafeVarargs",
];

/// Types an advice class can reach through on-demand imports.
///
/// Only framework types matter for the migration, so the index does not try
/// to know the rest of the classpath.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameworkTypes;

impl TypeIndex for FrameworkTypes {
    fn contains_type(&self, fqn: &str) -> bool {
        KNOWN_TYPES.contains(&fqn)
    }
}

/// Position of the first annotation that resolves to `fqn`.
pub(crate) fn find_annotation(
    annotations: &[Annotation],
    scope: &TypeScope,
    fqn: &str,
) -> Option<usize> {
    annotations
        .iter()
        .position(|annotation| scope.resolve_annotation(annotation).as_deref() == Some(fqn))
}

/// Whether `fqn` is `AssignReturned` or one of its nested annotations.
pub(crate) fn is_assign_returned(fqn: &str) -> bool {
    fqn.strip_prefix(ASSIGN_RETURNED)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Imports the emitted annotations depend on, in the order they were first
/// needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredImports(IndexSet<&'static str>);

impl RequiredImports {
    pub fn insert(&mut self, path: &'static str) {
        self.0.insert(path);
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
