//! What each advice parameter is bound to.

use indy_resolve::TypeScope;
use indy_syntax::{ElementValue, MethodDecl, NodeId, Param, TypeRef};
use smol_str::SmolStr;

use crate::framework;
use crate::MigrateError;

#[derive(Debug, Clone, PartialEq)]
pub enum BindingRole {
    /// `@Advice.Local("key")`
    Local(SmolStr),
    /// `@Advice.Argument(index)`
    Argument(i32),
    /// `@Advice.FieldValue(name)`; the name is kept as written so it can be
    /// repeated in the emitted annotation.
    FieldValue(ElementValue),
    /// `@Advice.Return`
    Return,
    /// `@Advice.Enter`
    Enter,
    /// `@Advice.Thrown`
    Thrown,
    Unbound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub param: NodeId,
    pub name: SmolStr,
    pub ty: TypeRef,
    pub role: BindingRole,
    /// Only meaningful for arguments, field values and the return value.
    pub read_only: bool,
    /// Index of the annotation that carries the role.
    pub annotation: usize,
}

impl Binding {
    /// Whether the advice expects the parameter's final value to be written
    /// back to the instrumented method.
    pub fn is_writable(&self) -> bool {
        !self.read_only
            && matches!(
                self.role,
                BindingRole::Argument(_) | BindingRole::FieldValue(_) | BindingRole::Return
            )
    }

    pub fn local_key(&self) -> Option<&SmolStr> {
        match &self.role {
            BindingRole::Local(key) => Some(key),
            _ => None,
        }
    }
}

const ROLES: &[&str] = &[
    framework::LOCAL,
    framework::ARGUMENT,
    framework::FIELD_VALUE,
    framework::RETURN,
    framework::ENTER,
    framework::THROWN,
];

/// Classifies every parameter of `method`, in declaration order.
pub fn classify_parameters(
    method: &MethodDecl,
    scope: &TypeScope,
) -> Result<Vec<Binding>, MigrateError> {
    method
        .params
        .iter()
        .map(|param| classify(param, scope))
        .collect()
}

fn classify(param: &Param, scope: &TypeScope) -> Result<Binding, MigrateError> {
    let mut binding = Binding {
        param: param.id,
        name: param.name.clone(),
        ty: param.declared_type(),
        role: BindingRole::Unbound,
        read_only: true,
        annotation: 0,
    };
    let found = param.annotations.iter().enumerate().find_map(|(idx, annotation)| {
        let fqn = scope.resolve_annotation(annotation)?;
        ROLES
            .iter()
            .find(|role| **role == fqn)
            .map(|role| (idx, *role, annotation))
    });
    let Some((idx, fqn, annotation)) = found else {
        return Ok(binding);
    };
    binding.annotation = idx;

    let invalid = |message: &str| MigrateError::InvalidAnnotationValue {
        param: param.name.to_string(),
        message: message.to_string(),
    };
    binding.role = match fqn {
        framework::LOCAL => {
            let key = annotation
                .element("value")
                .and_then(ElementValue::as_string)
                .ok_or_else(|| invalid("@Advice.Local needs a string literal name"))?;
            BindingRole::Local(key.into())
        }
        framework::ARGUMENT => {
            let index = annotation
                .element("value")
                .and_then(ElementValue::as_int)
                .ok_or_else(|| invalid("@Advice.Argument needs an integer literal index"))?;
            BindingRole::Argument(index)
        }
        framework::FIELD_VALUE => {
            let name = annotation
                .element("value")
                .ok_or_else(|| invalid("@Advice.FieldValue needs a field name"))?;
            BindingRole::FieldValue(name.clone())
        }
        framework::RETURN => BindingRole::Return,
        framework::ENTER => BindingRole::Enter,
        _ => BindingRole::Thrown,
    };

    if matches!(
        binding.role,
        BindingRole::Argument(_) | BindingRole::FieldValue(_) | BindingRole::Return
    ) {
        if let Some(value) = annotation.element("readOnly") {
            binding.read_only = value
                .as_bool()
                .ok_or_else(|| invalid("readOnly must be a boolean literal"))?;
        }
    }
    Ok(binding)
}
