//! Advice locals: state handed from the enter method to the exit method.
//!
//! Old-style advice shares values through `@Advice.Local("key")` parameters
//! declared on both methods, plus the value the enter method returns, which
//! exit receives through `@Advice.Enter`. After migration the enter method
//! returns all of that as a single carrier:
//! - one value is carried as is,
//! - several values travel in a generated `AdviceLocals` class with one
//!   public field per value.

use std::collections::HashSet;

use indexmap::IndexMap;
use indy_syntax::visit::{self, Visitor};
use indy_syntax::{
    Annotation, Expr, FieldDecl, LocalVarDecl, Member, MethodDecl, Modifier, NameExpr, NewObject,
    NodeId, Param, PrimitiveType, Stmt, StmtKind, TypeDecl, TypeRef, VarDeclarator,
};
use smol_str::SmolStr;

use crate::binding::{Binding, BindingRole};
use crate::packing::ValueToReturn;
use crate::returns;
use crate::rewrite;
use crate::MigrateError;

pub const CONTAINER_CLASS: &str = "AdviceLocals";
pub const CONTAINER_VAR: &str = "locals";
pub const PACKED_ENTER_PARAM: &str = "enterResult";

/// A parameter taking part in the hand-over.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalParam {
    pub param: NodeId,
    pub name: SmolStr,
    pub ty: TypeRef,
}

impl LocalParam {
    fn from_binding(binding: &Binding) -> Self {
        Self {
            param: binding.param,
            name: binding.name.clone(),
            ty: binding.ty.clone(),
        }
    }
}

/// The exit parameter bound with `@Advice.Enter`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnterParam {
    pub local: LocalParam,
    pub annotation: Annotation,
}

/// What [`AdviceLocals::transform_exit`] added to the exit method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitTransform {
    /// The new `@Advice.Enter` parameter.
    pub param: NodeId,
    /// `T x = (T) enterResult[0];` when the enter method returns an array.
    pub unpacking: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdviceLocals {
    enter: IndexMap<SmolStr, LocalParam>,
    exit: IndexMap<SmolStr, LocalParam>,
    exit_enter: Option<EnterParam>,
}

fn collect_locals(
    method: &MethodDecl,
    bindings: &[Binding],
) -> Result<IndexMap<SmolStr, LocalParam>, MigrateError> {
    let mut locals = IndexMap::new();
    for binding in bindings {
        let Some(key) = binding.local_key() else {
            continue;
        };
        if locals
            .insert(key.clone(), LocalParam::from_binding(binding))
            .is_some()
        {
            return Err(MigrateError::DuplicateLocal {
                method: method.name.to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(locals)
}

fn sorted_keys(locals: &IndexMap<SmolStr, LocalParam>) -> Vec<String> {
    let mut keys: Vec<String> = locals.keys().map(SmolStr::to_string).collect();
    keys.sort();
    keys
}

impl AdviceLocals {
    /// Collects the locals of both advice methods, each given with its
    /// classified parameters.
    ///
    /// Both methods must declare the same set of local keys.
    pub fn create(
        enter: Option<(&MethodDecl, &[Binding])>,
        exit: Option<(&MethodDecl, &[Binding])>,
    ) -> Result<Self, MigrateError> {
        let enter_locals = match enter {
            Some((method, bindings)) => collect_locals(method, bindings)?,
            None => IndexMap::new(),
        };
        let (exit_locals, exit_enter) = match exit {
            Some((method, bindings)) => {
                let mut enter_bindings = bindings
                    .iter()
                    .filter(|binding| binding.role == BindingRole::Enter);
                let exit_enter = enter_bindings.next();
                if enter_bindings.next().is_some() {
                    return Err(MigrateError::DuplicateEnterBinding {
                        method: method.name.to_string(),
                    });
                }
                let exit_enter = exit_enter.and_then(|binding| {
                    let param = method.param(binding.param)?;
                    Some(EnterParam {
                        local: LocalParam::from_binding(binding),
                        annotation: param.annotations.get(binding.annotation)?.clone(),
                    })
                });
                (collect_locals(method, bindings)?, exit_enter)
            }
            None => (IndexMap::new(), None),
        };

        let same_keys = enter_locals.len() == exit_locals.len()
            && enter_locals.keys().all(|key| exit_locals.contains_key(key));
        if !same_keys {
            return Err(MigrateError::MismatchedLocals {
                enter: sorted_keys(&enter_locals),
                exit: sorted_keys(&exit_locals),
            });
        }
        Ok(Self {
            enter: enter_locals,
            exit: exit_locals,
            exit_enter,
        })
    }

    pub fn any_found(&self) -> bool {
        !self.enter.is_empty() || self.exit_enter.is_some()
    }

    pub fn has_local_bindings(&self) -> bool {
        !self.enter.is_empty()
    }

    pub fn exit_enter(&self) -> Option<&EnterParam> {
        self.exit_enter.as_ref()
    }

    pub fn requires_container(&self) -> bool {
        self.enter.len() + usize::from(self.exit_enter.is_some()) > 1
    }

    /// Type the enter method hands to the exit method.
    pub fn carrier_type(&self) -> Option<TypeRef> {
        if self.requires_container() {
            return Some(TypeRef::class(CONTAINER_CLASS));
        }
        self.enter
            .values()
            .next()
            .or(self.exit_enter.as_ref().map(|enter| &enter.local))
            .map(|local| local.ty.clone())
    }

    /// Name of the container field that stands for the given parameter of
    /// either method. A local is always named after its enter parameter.
    pub fn container_field_name_for(&self, param: NodeId) -> Option<&SmolStr> {
        if let Some(enter) = &self.exit_enter {
            if enter.local.param == param {
                return Some(&enter.local.name);
            }
        }
        if let Some(local) = self.enter.values().find(|local| local.param == param) {
            return Some(&local.name);
        }
        let (key, _) = self.exit.iter().find(|(_, local)| local.param == param)?;
        self.enter.get(key).map(|local| &local.name)
    }

    /// `public static class AdviceLocals` with a field for the carried enter
    /// value first and one per local after it.
    pub fn container_type(&self) -> TypeDecl {
        let mut container =
            TypeDecl::new_class(CONTAINER_CLASS, vec![Modifier::Public, Modifier::Static]);
        let fields = self
            .exit_enter
            .iter()
            .map(|enter| &enter.local)
            .chain(self.enter.values());
        for local in fields {
            container.members.push(Member::Field(FieldDecl::new(
                vec![Modifier::Public],
                local.ty.clone(),
                &local.name,
            )));
        }
        container
    }

    /// Preferred name and type of the variable the carrier lives in inside
    /// `enter`.
    fn enter_carrier(&self) -> Option<(SmolStr, TypeRef)> {
        if self.requires_container() {
            return Some((CONTAINER_VAR.into(), TypeRef::class(CONTAINER_CLASS)));
        }
        let local = self
            .enter
            .values()
            .next()
            .or(self.exit_enter.as_ref().map(|enter| &enter.local))?;
        Some((local.name.clone(), local.ty.clone()))
    }

    /// Expression standing for `param` once the carrier lives in `var`.
    fn access(&self, var: &str, param: NodeId) -> Expr {
        match self.container_field_name_for(param) {
            Some(field) if self.requires_container() => Expr::field_access(Expr::name(var), field),
            _ => Expr::name(var),
        }
    }

    /// Moves the locals of `method` into a carrier variable declared first in
    /// its body and stores every returned value in it.
    ///
    /// Returns the carrier variable, which the method must return, or `None`
    /// when nothing is handed over.
    pub fn transform_enter(
        &self,
        method: &mut MethodDecl,
    ) -> Result<Option<ValueToReturn>, MigrateError> {
        let Some((base, ty)) = self.enter_carrier() else {
            return Ok(None);
        };
        let name = method.name.to_string();
        if method.body.is_none() {
            return Err(MigrateError::MissingBody { method: name });
        }
        let removed: Vec<NodeId> = self.enter.values().map(|local| local.param).collect();
        let var = TakenNames::of(method, &removed).fresh(&base);

        for local in self.enter.values() {
            let replacement = self.access(&var, local.param);
            rewrite::replace_references(method, local.param, &replacement);
            method.remove_param(local.param);
        }

        if let Some(enter) = &self.exit_enter {
            let target = self.access(&var, enter.local.param);
            let Some(body) = method.body.as_mut() else {
                return Err(MigrateError::MissingBody { method: name });
            };
            let paths = returns::return_paths(body);
            for path in paths.iter().rev() {
                let value = match body.stmt_at_mut(path) {
                    Some(Stmt {
                        kind: StmtKind::Return(value),
                        ..
                    }) => value.take(),
                    _ => None,
                };
                let Some(value) = value else {
                    continue;
                };
                let store = Stmt::expr(Expr::assign(target.fresh_clone(), value));
                rewrite::insert_before(body, path, store, &name)?;
            }
        }

        let init = if self.requires_container() {
            Expr::New(Box::new(NewObject {
                outer: None,
                ty: ty.clone(),
                args: Vec::new(),
                body: None,
            }))
        } else {
            default_value(&ty)
        };
        let declarator = VarDeclarator::new(&var, Some(init));
        let decl = declarator.id;
        if let Some(body) = method.body.as_mut() {
            body.stmts.insert(
                0,
                Stmt::new(StmtKind::LocalVar(LocalVarDecl::single(ty.clone(), declarator))),
            );
        }
        tracing::debug!(
            target = "indy.migrate",
            method = %method.name,
            carrier = %ty,
            locals = self.enter.len(),
            "moved advice locals into carrier"
        );
        Ok(Some(ValueToReturn {
            decl,
            name: var,
            ty,
            target: None,
        }))
    }

    /// Replaces the locals and the `@Advice.Enter` parameter of `method` with
    /// one new `@Advice.Enter` parameter holding the carrier.
    ///
    /// When the enter method returns several values, the parameter is the
    /// whole `Object[]` and the carrier is unpacked from slot 0 into a local.
    pub fn transform_exit(
        &self,
        method: &mut MethodDecl,
        enter_packed: bool,
        annotation: Annotation,
    ) -> Result<Option<ExitTransform>, MigrateError> {
        let Some(ty) = self.carrier_type() else {
            return Ok(None);
        };
        if method.body.is_none() {
            return Err(MigrateError::MissingBody {
                method: method.name.to_string(),
            });
        }
        let base: SmolStr = if self.requires_container() {
            CONTAINER_VAR.into()
        } else {
            let first = self
                .exit
                .values()
                .next()
                .or(self.exit_enter.as_ref().map(|enter| &enter.local));
            match first {
                Some(local) => local.name.clone(),
                None => return Ok(None),
            }
        };

        let replaced: Vec<NodeId> = self
            .exit
            .values()
            .map(|local| local.param)
            .chain(self.exit_enter.iter().map(|enter| enter.local.param))
            .collect();
        let mut taken = TakenNames::of(method, &replaced);
        let var = taken.fresh(&base);
        for param in &replaced {
            let replacement = self.access(&var, *param);
            rewrite::replace_references(method, *param, &replacement);
        }
        for param in &replaced {
            method.remove_param(*param);
        }

        let (param, unpacking) = if enter_packed {
            let packed = taken.fresh(PACKED_ENTER_PARAM);
            let param = Param::new(
                vec![annotation],
                TypeRef::array(TypeRef::class("Object")),
                &packed,
            );
            let unpack = Expr::Cast {
                ty: ty.clone(),
                expr: Box::new(Expr::ArrayAccess {
                    array: Box::new(Expr::name(&packed)),
                    index: Box::new(Expr::int(0)),
                }),
            };
            let declarator = VarDeclarator::new(&var, Some(unpack));
            let unpacking = declarator.id;
            if let Some(body) = method.body.as_mut() {
                body.stmts.insert(
                    0,
                    Stmt::new(StmtKind::LocalVar(LocalVarDecl::single(ty, declarator))),
                );
            }
            (param, Some(unpacking))
        } else {
            (Param::new(vec![annotation], ty, &var), None)
        };
        let result = ExitTransform {
            param: param.id,
            unpacking,
        };
        method.params.push(param);
        tracing::debug!(
            target = "indy.migrate",
            method = %method.name,
            enter_packed,
            "exit reads advice locals from enter result"
        );
        Ok(Some(result))
    }
}

/// Every name a method declares or mentions, except for parameters that are
/// about to be removed.
struct TakenNames(HashSet<SmolStr>);

impl TakenNames {
    fn of(method: &MethodDecl, removed: &[NodeId]) -> Self {
        let removed_names: HashSet<&SmolStr> = method
            .params
            .iter()
            .filter(|param| removed.contains(&param.id))
            .map(|param| &param.name)
            .collect();
        let mut taken = TakenNames(HashSet::new());
        if let Some(body) = &method.body {
            taken.visit_block(body);
        }
        taken.0.retain(|name| !removed_names.contains(name));
        taken.0.extend(
            method
                .params
                .iter()
                .filter(|param| !removed.contains(&param.id))
                .map(|param| param.name.clone()),
        );
        taken
    }

    /// `base`, or `base` followed by the first free number from 2 up. The
    /// result counts as taken afterwards.
    fn fresh(&mut self, base: &str) -> SmolStr {
        let mut candidate = SmolStr::new(base);
        let mut suffix = 2;
        while self.0.contains(&candidate) {
            candidate = SmolStr::new(format!("{base}{suffix}"));
            suffix += 1;
        }
        self.0.insert(candidate.clone());
        candidate
    }
}

impl Visitor for TakenNames {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::Try { catches, .. } = &stmt.kind {
            self.0
                .extend(catches.iter().map(|clause| clause.param.name.clone()));
        }
        visit::walk_stmt(self, stmt);
    }

    fn visit_local_var(&mut self, decl: &LocalVarDecl) {
        self.0
            .extend(decl.declarators.iter().map(|declarator| declarator.name.clone()));
        visit::walk_local_var(self, decl);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Lambda { params, .. } = expr {
            self.0.extend(params.iter().map(|param| param.name.clone()));
        }
        visit::walk_expr(self, expr);
    }

    fn visit_name(&mut self, name: &NameExpr) {
        self.0.insert(name.name.clone());
    }
}

/// Initial value of a carrier variable of type `ty`.
fn default_value(ty: &TypeRef) -> Expr {
    match ty {
        TypeRef::Primitive(PrimitiveType::Boolean) => Expr::bool(false),
        TypeRef::Primitive(_) => Expr::int(0),
        _ => Expr::null(),
    }
}
