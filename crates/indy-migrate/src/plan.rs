//! Migration of one advice class.

use indy_resolve::TypeScope;
use indy_syntax::{Annotation, Member, MethodDecl, NodeId, TypeDecl, TypeDeclKind};
use smol_str::SmolStr;

use crate::binding::{classify_parameters, Binding, BindingRole};
use crate::folding::fold_returns;
use crate::framework::{self, RequiredImports};
use crate::locals::AdviceLocals;
use crate::packing::{emit_annotations, pack_returns, ValueToReturn, WriteTarget};
use crate::rewrite::prune_if_unused;
use crate::MigrateError;

/// An `@Advice.OnMethodEnter` or `@Advice.OnMethodExit` method.
#[derive(Debug, Clone)]
struct AdviceMethod {
    id: NodeId,
    name: SmolStr,
    /// Position of the marker among the method annotations.
    marker: usize,
    /// The marker's name as written, e.g. `Advice.OnMethodExit`.
    marker_name: String,
    bindings: Vec<Binding>,
}

impl AdviceMethod {
    fn writable(&self, role: fn(&BindingRole) -> bool) -> impl Iterator<Item = &Binding> + '_ {
        self.bindings
            .iter()
            .filter(move |binding| binding.is_writable() && role(&binding.role))
    }

    fn has_enter_binding(&self) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.role == BindingRole::Enter)
    }
}

fn is_argument(role: &BindingRole) -> bool {
    matches!(role, BindingRole::Argument(_))
}

fn is_field(role: &BindingRole) -> bool {
    matches!(role, BindingRole::FieldValue(_))
}

fn is_return(role: &BindingRole) -> bool {
    matches!(role, BindingRole::Return)
}

fn find_advice_method(
    class: &TypeDecl,
    scope: &TypeScope,
    marker_fqn: &str,
    marker: &'static str,
) -> Result<Option<AdviceMethod>, MigrateError> {
    let mut found = class.methods().filter_map(|method| {
        framework::find_annotation(&method.annotations, scope, marker_fqn)
            .map(|idx| (method, idx))
    });
    let Some((method, idx)) = found.next() else {
        return Ok(None);
    };
    if found.next().is_some() {
        return Err(MigrateError::DuplicateAdviceMethod {
            class: class.name.to_string(),
            marker,
        });
    }
    Ok(Some(AdviceMethod {
        id: method.id,
        name: method.name.clone(),
        marker: idx,
        marker_name: method.annotations[idx].name.clone(),
        bindings: classify_parameters(method, scope)?,
    }))
}

fn with_bindings<'a>(
    class: &'a TypeDecl,
    advice: Option<&'a AdviceMethod>,
) -> Option<(&'a MethodDecl, &'a [Binding])> {
    let advice = advice?;
    let method = class.method(advice.id)?;
    Some((method, advice.bindings.as_slice()))
}

fn already_migrated(class: &TypeDecl, scope: &TypeScope, methods: &[&AdviceMethod]) -> bool {
    methods
        .iter()
        .filter_map(|advice| class.method(advice.id))
        .flat_map(|method| &method.annotations)
        .filter_map(|annotation| scope.resolve_annotation(annotation))
        .any(|fqn| framework::is_assign_returned(&fqn))
}

/// What has to change in one advice class.
#[derive(Debug, Clone)]
pub struct AdviceTransformationPlan {
    class: SmolStr,
    enter: Option<AdviceMethod>,
    exit: Option<AdviceMethod>,
    locals: AdviceLocals,
}

impl AdviceTransformationPlan {
    /// Plans the migration of `class`, where `scope` is the type scope inside
    /// the class body.
    ///
    /// `None` if the class is not advice or has been migrated already.
    pub fn create(class: &TypeDecl, scope: &TypeScope) -> Result<Option<Self>, MigrateError> {
        if class.kind != TypeDeclKind::Class {
            return Ok(None);
        }
        let enter = find_advice_method(class, scope, framework::ON_METHOD_ENTER, "OnMethodEnter")?;
        let exit = find_advice_method(class, scope, framework::ON_METHOD_EXIT, "OnMethodExit")?;
        if enter.is_none() && exit.is_none() {
            return Ok(None);
        }
        let methods: Vec<&AdviceMethod> = enter.iter().chain(exit.iter()).collect();
        if already_migrated(class, scope, &methods) {
            tracing::debug!(
                target = "indy.migrate",
                class = %class.name,
                "advice already returns its writes; skipping"
            );
            return Ok(None);
        }

        if let Some(exit) = &exit {
            if exit.writable(is_return).count() > 1 {
                return Err(MigrateError::MultipleWritableReturns {
                    method: exit.name.to_string(),
                });
            }
            if enter.is_none() && exit.has_enter_binding() {
                return Err(MigrateError::EnterBindingWithoutEnterMethod {
                    method: exit.name.to_string(),
                });
            }
        }

        let locals = AdviceLocals::create(
            with_bindings(class, enter.as_ref()),
            with_bindings(class, exit.as_ref()),
        )?;

        let plan = Self {
            class: class.name.clone(),
            enter,
            exit,
            locals,
        };
        tracing::debug!(
            target = "indy.migrate",
            class = %plan.class,
            enter = ?plan.enter.as_ref().map(|m| m.name.as_str()),
            exit = ?plan.exit.as_ref().map(|m| m.name.as_str()),
            writes = plan.write_count(),
            container = plan.locals.requires_container(),
            "planned advice migration"
        );
        Ok(Some(plan))
    }

    fn write_count(&self) -> usize {
        let enter = self.enter.iter().flat_map(|enter| {
            enter
                .writable(is_argument)
                .chain(enter.writable(is_field))
        });
        let exit = self
            .exit
            .iter()
            .flat_map(|exit| exit.writable(is_return).chain(exit.writable(is_field)));
        enter.count() + exit.count()
    }

    /// Whether [`transform`](Self::transform) would change anything.
    pub fn has_changes(&self) -> bool {
        self.write_count() > 0 || self.locals.has_local_bindings()
    }

    /// Rewrites `class`. Imports the new annotations need are added to
    /// `imports`. Returns `false` if nothing had to change.
    pub fn transform(
        &self,
        class: &mut TypeDecl,
        imports: &mut RequiredImports,
    ) -> Result<bool, MigrateError> {
        if !self.has_changes() {
            tracing::debug!(
                target = "indy.migrate",
                class = %self.class,
                "no writable bindings or advice locals"
            );
            return Ok(false);
        }

        if self.locals.requires_container() {
            let idx = self
                .enter
                .as_ref()
                .and_then(|enter| class.member_index_of(enter.id))
                .unwrap_or(class.members.len());
            let mut container = self.locals.container_type();
            container.blank_line_before = idx > 0;
            class.members.insert(idx, Member::Type(container));
            if let Some(Member::Method(enter)) = class.members.get_mut(idx + 1) {
                enter.blank_line_before = true;
            }
        }

        let mut enter_values = Vec::new();
        if let Some(enter) = &self.enter {
            if let Some(method) = class.method_mut(enter.id) {
                if self.locals.any_found() {
                    enter_values.extend(self.locals.transform_enter(method)?);
                }
                enter_values.extend(write_backs(method, enter.writable(is_field)));
                enter_values.extend(write_backs(method, enter.writable(is_argument)));
                finish_method(method, enter, &enter_values, imports)?;
                for value in &enter_values {
                    prune_if_unused(method, value.decl);
                }
            }
        }

        if let Some(exit) = &self.exit {
            if let Some(method) = class.method_mut(exit.id) {
                let exit_transform = if self.locals.any_found() {
                    let annotation = match self.locals.exit_enter() {
                        Some(enter) => enter.annotation.clone(),
                        None => enter_annotation(&exit.marker_name, imports),
                    };
                    self.locals
                        .transform_exit(method, enter_values.len() > 1, annotation)?
                } else {
                    None
                };
                let mut exit_values = Vec::new();
                exit_values.extend(write_backs(method, exit.writable(is_return)));
                exit_values.extend(write_backs(method, exit.writable(is_field)));
                finish_method(method, exit, &exit_values, imports)?;
                if let Some(transform) = exit_transform {
                    if let Some(unpacking) = transform.unpacking {
                        prune_if_unused(method, unpacking);
                    }
                    prune_if_unused(method, transform.param);
                }
                for value in &exit_values {
                    prune_if_unused(method, value.decl);
                }
            }
        }

        Ok(true)
    }
}

/// Strips `readOnly` from each binding and returns the values to write back.
fn write_backs<'b>(
    method: &mut MethodDecl,
    bindings: impl Iterator<Item = &'b Binding>,
) -> Vec<ValueToReturn> {
    let mut values = Vec::new();
    for binding in bindings {
        let target = match &binding.role {
            BindingRole::Argument(index) => WriteTarget::Argument(*index),
            BindingRole::FieldValue(field) => WriteTarget::Field(field.clone()),
            BindingRole::Return => WriteTarget::Returned,
            _ => continue,
        };
        if let Some(annotation) = method
            .param_mut(binding.param)
            .and_then(|param| param.annotations.get_mut(binding.annotation))
        {
            annotation.remove_element("readOnly");
        }
        values.push(ValueToReturn {
            decl: binding.param,
            name: binding.name.clone(),
            ty: binding.ty.clone(),
            target: Some(target),
        });
    }
    values
}

/// Annotates `method` for `values`, makes it return them and folds the
/// assignments that became redundant.
fn finish_method(
    method: &mut MethodDecl,
    advice: &AdviceMethod,
    values: &[ValueToReturn],
    imports: &mut RequiredImports,
) -> Result<(), MigrateError> {
    if values.is_empty() {
        return Ok(());
    }
    emit_annotations(method, values, advice.marker, imports);
    pack_returns(method, values)?;
    let names: Vec<SmolStr> = values.iter().map(|value| value.name.clone()).collect();
    fold_returns(method, &names);
    Ok(())
}

/// `@Advice.Enter` spelled the way the class spells its exit marker.
fn enter_annotation(marker_name: &str, imports: &mut RequiredImports) -> Annotation {
    match marker_name.strip_suffix("OnMethodExit") {
        Some("") => {
            imports.insert(framework::ENTER);
            Annotation::marker("Enter")
        }
        Some(prefix) => Annotation::marker(&format!("{prefix}Enter")),
        None => {
            imports.insert(framework::ADVICE);
            Annotation::marker("Advice.Enter")
        }
    }
}
