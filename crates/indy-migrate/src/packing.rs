//! Turning the values an advice method writes into its return value.
//!
//! One value is returned as is. Several values are returned as
//! `new Object[]{a, b, ...}` and every write-back annotation names the
//! array slot it reads.

use indy_syntax::{
    Annotation, AnnotationArgs, ElementPair, ElementValue, Expr, MethodDecl, NodeId, Stmt,
    StmtKind, TypeRef,
};
use smol_str::SmolStr;

use crate::framework::{self, RequiredImports};
use crate::returns;
use crate::rewrite;
use crate::MigrateError;

/// Where the framework writes a returned value back to.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteTarget {
    /// Argument at this index of the instrumented method.
    Argument(i32),
    /// Field of the instrumented instance, as written in `@FieldValue`.
    Field(ElementValue),
    /// Return value of the instrumented method.
    Returned,
}

/// A declaration whose final value the advice method must return.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueToReturn {
    pub decl: NodeId,
    pub name: SmolStr,
    pub ty: TypeRef,
    /// `None` for values that are only handed from enter to exit.
    pub target: Option<WriteTarget>,
}

fn index_pair(position: usize) -> ElementPair {
    ElementPair::new("index", ElementValue::Expr(Expr::int(position as i64)))
}

impl WriteTarget {
    fn annotation(&self, position: Option<usize>) -> Annotation {
        match (self, position) {
            (WriteTarget::Argument(arg), None) => Annotation::single(
                framework::TO_ARGUMENT_NAME,
                ElementValue::Expr(Expr::int(i64::from(*arg))),
            ),
            (WriteTarget::Argument(arg), Some(position)) => Annotation::normal(
                framework::TO_ARGUMENT_NAME,
                vec![
                    ElementPair::new("value", ElementValue::Expr(Expr::int(i64::from(*arg)))),
                    index_pair(position),
                ],
            ),
            (WriteTarget::Field(field), None) => {
                Annotation::single(framework::TO_FIELD_NAME, field.clone())
            }
            (WriteTarget::Field(field), Some(position)) => Annotation::normal(
                framework::TO_FIELD_NAME,
                vec![ElementPair::new("value", field.clone()), index_pair(position)],
            ),
            (WriteTarget::Returned, None) => Annotation::marker(framework::TO_RETURNED_NAME),
            (WriteTarget::Returned, Some(position)) => {
                Annotation::normal(framework::TO_RETURNED_NAME, vec![index_pair(position)])
            }
        }
    }
}

/// Adds the write-back annotations for `values` to `method`.
///
/// New annotations go right before the advice marker at `marker`. Argument
/// and field targets are collected in one repeatable wrapper each.
pub fn emit_annotations(
    method: &mut MethodDecl,
    values: &[ValueToReturn],
    marker: usize,
    imports: &mut RequiredImports,
) {
    let mut marker = marker.min(method.annotations.len());
    let packed = values.len() > 1;
    for (position, value) in values.iter().enumerate() {
        let Some(target) = &value.target else {
            continue;
        };
        let annotation = target.annotation(packed.then_some(position));
        imports.insert(framework::ASSIGN_RETURNED);
        match target {
            WriteTarget::Returned => {
                method.annotations.insert(marker, annotation);
                marker += 1;
            }
            WriteTarget::Argument(_) => {
                imports.insert(framework::TO_ARGUMENT);
                push_repeated(method, framework::TO_ARGUMENTS_WRAPPER, annotation, &mut marker);
            }
            WriteTarget::Field(_) => {
                imports.insert(framework::TO_FIELD);
                push_repeated(method, framework::TO_FIELDS_WRAPPER, annotation, &mut marker);
            }
        }
    }
}

fn push_repeated(method: &mut MethodDecl, wrapper: &str, item: Annotation, marker: &mut usize) {
    let item = ElementValue::Annotation(Box::new(item));
    let existing = method
        .annotations
        .iter_mut()
        .find(|annotation| annotation.name == wrapper);
    match existing {
        Some(annotation) => match &mut annotation.args {
            AnnotationArgs::Single(ElementValue::Array(items)) => items.push(item),
            AnnotationArgs::Single(single) => {
                let first = std::mem::replace(single, ElementValue::Array(Vec::new()));
                *single = ElementValue::Array(vec![first, item]);
            }
            args => *args = AnnotationArgs::Single(ElementValue::Array(vec![item])),
        },
        None => {
            method.annotations.insert(
                *marker,
                Annotation::single(wrapper, ElementValue::Array(vec![item])),
            );
            *marker += 1;
        }
    }
}

/// The expression every `return` of a packed method ends up returning.
pub fn return_template(values: &[ValueToReturn]) -> Option<Expr> {
    match values {
        [] => None,
        [single] => Some(Expr::name(&single.name)),
        _ => Some(Expr::NewArray {
            elem_ty: TypeRef::class("Object"),
            dims: vec![None],
            init: Some(values.iter().map(|value| Expr::name(&value.name)).collect()),
        }),
    }
}

/// Makes every `return` of `method`'s own scope return `values`.
///
/// The method gets a trailing `return` first if control can fall off its
/// end, so that path also returns the values. A value
/// the method used to return is dropped, but a call or assignment in it is
/// kept as a statement in front of the `return`.
pub fn pack_returns(method: &mut MethodDecl, values: &[ValueToReturn]) -> Result<(), MigrateError> {
    let Some(template) = return_template(values) else {
        return Ok(());
    };
    let return_type = match values {
        [single] => single.ty.clone(),
        _ => TypeRef::array(TypeRef::class("Object")),
    };
    let name = method.name.to_string();
    let body = method.body.as_mut().ok_or_else(|| MigrateError::MissingBody {
        method: name.clone(),
    })?;
    if returns::can_complete_normally(body) {
        body.stmts.push(Stmt::new(StmtKind::Return(None)));
    }

    let paths = returns::return_paths(body);
    for path in paths.iter().rev() {
        let Some(Stmt {
            kind: StmtKind::Return(value),
            ..
        }) = body.stmt_at_mut(path)
        else {
            continue;
        };
        let previous = value.replace(template.fresh_clone());
        if let Some(previous) = previous.filter(Expr::is_statement_expression) {
            rewrite::insert_before(body, path, Stmt::expr(previous), &name)?;
        }
    }
    method.return_type = Some(return_type);
    tracing::debug!(
        target = "indy.migrate",
        method = %method.name,
        values = values.len(),
        returns = paths.len(),
        "packed return values"
    );
    Ok(())
}
