//! Lexical scopes of a single method body.
//!
//! Java rules followed here:
//! - A local is only in scope after its declaration, and within its own
//!   initializer.
//! - Fields and parameters of local and anonymous classes shadow the locals
//!   of the enclosing body.
//! - Pattern bindings become visible at the `instanceof` that introduces them
//!   and stay visible for the rest of the enclosing block.
//!
//! Names are resolved while the scopes are built, so a later declaration can
//! never capture an earlier use.

use std::collections::HashMap;

use indy_syntax::{
    Block, Expr, ForInit, LambdaBody, LocalVarDecl, Member, MethodDecl, NodeId, Resource, Stmt,
    StmtKind, TypeDecl,
};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    #[must_use]
    pub const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// What a simple name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// A method or lambda parameter.
    Param(NodeId),
    /// A local variable, catch parameter or pattern binding.
    Local(NodeId),
    /// A field of a local or anonymous class declared inside the body.
    Field(NodeId),
}

impl Resolution {
    pub fn decl(self) -> NodeId {
        match self {
            Resolution::Param(id) | Resolution::Local(id) | Resolution::Field(id) => id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeData {
    parent: Option<ScopeId>,
    entries: HashMap<SmolStr, Resolution>,
}

impl ScopeData {
    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    #[must_use]
    pub fn entries(&self) -> &HashMap<SmolStr, Resolution> {
        &self.entries
    }
}

#[derive(Debug, Clone)]
pub struct BodyScopes {
    scopes: Vec<ScopeData>,
    /// Scope active at each name expression.
    name_scopes: HashMap<NodeId, ScopeId>,
    resolved: HashMap<NodeId, Resolution>,
    root_scope: ScopeId,
}

impl BodyScopes {
    /// Builds scopes for `method`. Its parameters form the root scope; names
    /// that resolve to nothing there are fields or types of the outside world.
    pub fn build(method: &MethodDecl) -> BodyScopes {
        let mut builder = Builder::default();
        let root_scope = builder.alloc_scope(None);
        for param in &method.params {
            builder.declare(root_scope, &param.name, Resolution::Param(param.id));
        }
        if let Some(body) = &method.body {
            builder.visit_block(body, root_scope);
        }
        tracing::trace!(
            target = "indy.resolve",
            method = %method.name,
            scopes = builder.scopes.len(),
            names = builder.resolved.len(),
            "built body scopes"
        );
        BodyScopes {
            scopes: builder.scopes,
            name_scopes: builder.name_scopes,
            resolved: builder.resolved,
            root_scope,
        }
    }

    #[must_use]
    pub fn root_scope(&self) -> ScopeId {
        self.root_scope
    }

    #[must_use]
    pub fn scope_data(&self, scope: ScopeId) -> &ScopeData {
        &self.scopes[scope.idx()]
    }

    #[must_use]
    pub fn scope_for_name(&self, name: NodeId) -> Option<ScopeId> {
        self.name_scopes.get(&name).copied()
    }

    /// Declaration a name expression refers to. `None` for names that leave
    /// the body, such as fields of the advice class.
    #[must_use]
    pub fn resolve(&self, name: NodeId) -> Option<Resolution> {
        self.resolved.get(&name).copied()
    }

    #[must_use]
    pub fn resolves_to(&self, name: NodeId, decl: NodeId) -> bool {
        self.resolve(name).is_some_and(|res| res.decl() == decl)
    }

    /// Name expressions referring to `decl`, in no particular order.
    pub fn references(&self, decl: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.resolved
            .iter()
            .filter(move |(_, res)| res.decl() == decl)
            .map(|(name, _)| *name)
    }

    /// Resolves a simple name by walking up the scope parent chain.
    #[must_use]
    pub fn resolve_in(&self, scope: ScopeId, name: &str) -> Option<Resolution> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id.idx()];
            if let Some(&value) = data.entries.get(name) {
                return Some(value);
            }
            current = data.parent;
        }
        None
    }
}

#[derive(Default)]
struct Builder {
    scopes: Vec<ScopeData>,
    name_scopes: HashMap<NodeId, ScopeId>,
    resolved: HashMap<NodeId, Resolution>,
}

impl Builder {
    fn alloc_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData {
            parent,
            entries: HashMap::new(),
        });
        id
    }

    fn declare(&mut self, scope: ScopeId, name: &SmolStr, value: Resolution) {
        self.scopes[scope.idx()].entries.insert(name.clone(), value);
    }

    fn lookup(&self, scope: ScopeId, name: &str) -> Option<Resolution> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id.idx()];
            if let Some(&value) = data.entries.get(name) {
                return Some(value);
            }
            current = data.parent;
        }
        None
    }

    fn visit_block(&mut self, block: &Block, scope: ScopeId) {
        let mut current = self.alloc_scope(Some(scope));
        for stmt in &block.stmts {
            current = self.visit_stmt(stmt, current);
        }
    }

    /// Visits `stmt` and returns the scope for the statements after it.
    fn visit_stmt(&mut self, stmt: &Stmt, scope: ScopeId) -> ScopeId {
        match &stmt.kind {
            StmtKind::Block(block) => {
                self.visit_block(block, scope);
                scope
            }
            StmtKind::LocalVar(decl) => self.visit_local_var(decl, scope),
            StmtKind::LocalClass(decl) => {
                self.visit_type_decl(decl, scope);
                scope
            }
            StmtKind::Expr(expr) | StmtKind::Throw(expr) => {
                self.visit_expr(expr, scope);
                scope
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(value, scope);
                }
                scope
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond, scope);
                let then_scope = self.alloc_scope(Some(scope));
                let _ = self.visit_stmt(then_branch, then_scope);
                if let Some(else_branch) = else_branch {
                    let else_scope = self.alloc_scope(Some(scope));
                    let _ = self.visit_stmt(else_branch, else_scope);
                }
                scope
            }
            StmtKind::While { cond, body } => {
                self.visit_expr(cond, scope);
                let body_scope = self.alloc_scope(Some(scope));
                let _ = self.visit_stmt(body, body_scope);
                scope
            }
            StmtKind::DoWhile { body, cond } => {
                let body_scope = self.alloc_scope(Some(scope));
                let _ = self.visit_stmt(body, body_scope);
                self.visit_expr(cond, scope);
                scope
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let mut current = self.alloc_scope(Some(scope));
                match init {
                    Some(ForInit::LocalVar(decl)) => current = self.visit_local_var(decl, current),
                    Some(ForInit::Exprs(exprs)) => {
                        exprs.iter().for_each(|e| self.visit_expr(e, current))
                    }
                    None => {}
                }
                if let Some(cond) = cond {
                    self.visit_expr(cond, current);
                }
                update.iter().for_each(|e| self.visit_expr(e, current));
                let body_scope = self.alloc_scope(Some(current));
                let _ = self.visit_stmt(body, body_scope);
                scope
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                self.visit_expr(iterable, scope);
                let for_scope = self.alloc_scope(Some(scope));
                for declarator in &var.declarators {
                    self.declare(for_scope, &declarator.name, Resolution::Local(declarator.id));
                }
                let _ = self.visit_stmt(body, for_scope);
                scope
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                let mut current = self.alloc_scope(Some(scope));
                for resource in resources {
                    match resource {
                        Resource::Decl(decl) => current = self.visit_local_var(decl, current),
                        Resource::Expr(expr) => self.visit_expr(expr, current),
                    }
                }
                self.visit_block(body, current);
                for clause in catches {
                    let catch_scope = self.alloc_scope(Some(scope));
                    self.declare(
                        catch_scope,
                        &clause.param.name,
                        Resolution::Local(clause.param.id),
                    );
                    self.visit_block(&clause.body, catch_scope);
                }
                if let Some(finally) = finally {
                    self.visit_block(finally, scope);
                }
                scope
            }
            StmtKind::Switch { selector, cases } => {
                self.visit_expr(selector, scope);
                // Colon cases share one block; arrow cases are separate.
                let mut shared = self.alloc_scope(Some(scope));
                for case in cases {
                    case.labels.iter().for_each(|e| self.visit_expr(e, scope));
                    if case.arrow.is_some() {
                        self.visit_block(&case.body, scope);
                    } else {
                        for stmt in &case.body.stmts {
                            shared = self.visit_stmt(stmt, shared);
                        }
                    }
                }
                scope
            }
            StmtKind::Synchronized { lock, body } => {
                self.visit_expr(lock, scope);
                self.visit_block(body, scope);
                scope
            }
            StmtKind::Labeled { body, .. } => {
                let _ = self.visit_stmt(body, scope);
                scope
            }
            StmtKind::Assert { cond, message } => {
                self.visit_expr(cond, scope);
                if let Some(message) = message {
                    self.visit_expr(message, scope);
                }
                scope
            }
            StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty => scope,
        }
    }

    fn visit_local_var(&mut self, decl: &LocalVarDecl, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        for declarator in &decl.declarators {
            // Java: the local is in scope within its own initializer.
            let let_scope = self.alloc_scope(Some(current));
            self.declare(let_scope, &declarator.name, Resolution::Local(declarator.id));
            if let Some(init) = &declarator.init {
                self.visit_expr(init, let_scope);
            }
            current = let_scope;
        }
        current
    }

    fn visit_type_decl(&mut self, decl: &TypeDecl, scope: ScopeId) {
        let class_scope = self.alloc_scope(Some(scope));
        for constant in &decl.enum_constants {
            self.declare(
                class_scope,
                &constant.name,
                Resolution::Field(decl.id),
            );
        }
        self.visit_members(&decl.members, class_scope);
        for constant in &decl.enum_constants {
            for arg in constant.args.iter().flatten() {
                self.visit_expr(arg, class_scope);
            }
            if let Some(body) = &constant.body {
                let body_scope = self.alloc_scope(Some(class_scope));
                self.visit_members(body, body_scope);
            }
        }
    }

    /// Visits a class body. Every field of the class is visible in every
    /// member, whatever the declaration order.
    fn visit_members(&mut self, members: &[Member], class_scope: ScopeId) {
        for member in members {
            if let Member::Field(field) = member {
                for declarator in &field.declarators {
                    self.declare(
                        class_scope,
                        &declarator.name,
                        Resolution::Field(declarator.id),
                    );
                }
            }
        }
        for member in members {
            match member {
                Member::Field(field) => {
                    for init in field.declarators.iter().filter_map(|d| d.init.as_ref()) {
                        self.visit_expr(init, class_scope);
                    }
                }
                Member::Method(method) => {
                    let method_scope = self.alloc_scope(Some(class_scope));
                    for param in &method.params {
                        self.declare(method_scope, &param.name, Resolution::Param(param.id));
                    }
                    if let Some(body) = &method.body {
                        self.visit_block(body, method_scope);
                    }
                }
                Member::Type(decl) => self.visit_type_decl(decl, class_scope),
                Member::Initializer(init) => self.visit_block(&init.body, class_scope),
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr, scope: ScopeId) {
        match expr {
            Expr::Name(name) => {
                self.name_scopes.insert(name.id, scope);
                if let Some(res) = self.lookup(scope, &name.name) {
                    self.resolved.insert(name.id, res);
                }
            }
            Expr::Literal(_) | Expr::ClassLit(_) | Expr::This | Expr::Super | Expr::TypeExpr(_) => {
            }
            Expr::FieldAccess { receiver, .. } => self.visit_expr(receiver, scope),
            Expr::MethodCall { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    self.visit_expr(receiver, scope);
                }
                args.iter().for_each(|e| self.visit_expr(e, scope));
            }
            Expr::ArrayAccess { array, index } => {
                self.visit_expr(array, scope);
                self.visit_expr(index, scope);
            }
            Expr::Assign { target, value, .. } => {
                self.visit_expr(target, scope);
                self.visit_expr(value, scope);
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs, scope);
                self.visit_expr(rhs, scope);
            }
            Expr::Unary { operand, .. } => self.visit_expr(operand, scope),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(cond, scope);
                self.visit_expr(then_expr, scope);
                self.visit_expr(else_expr, scope);
            }
            Expr::Cast { expr, .. } | Expr::Paren(expr) => self.visit_expr(expr, scope),
            Expr::InstanceOf { expr, binding, .. } => {
                self.visit_expr(expr, scope);
                if let Some(binding) = binding {
                    self.declare(scope, &binding.name, Resolution::Local(binding.id));
                }
            }
            Expr::New(new) => {
                if let Some(outer) = &new.outer {
                    self.visit_expr(outer, scope);
                }
                new.args.iter().for_each(|e| self.visit_expr(e, scope));
                if let Some(body) = &new.body {
                    let class_scope = self.alloc_scope(Some(scope));
                    self.visit_members(body, class_scope);
                }
            }
            Expr::NewArray { dims, init, .. } => {
                dims.iter().flatten().for_each(|e| self.visit_expr(e, scope));
                init.iter().flatten().for_each(|e| self.visit_expr(e, scope));
            }
            Expr::ArrayInit(items) => items.iter().for_each(|e| self.visit_expr(e, scope)),
            Expr::Lambda { params, body, .. } => {
                let lambda_scope = self.alloc_scope(Some(scope));
                for param in params {
                    self.declare(lambda_scope, &param.name, Resolution::Param(param.id));
                }
                match body {
                    LambdaBody::Expr(expr) => self.visit_expr(expr, lambda_scope),
                    LambdaBody::Block(block) => self.visit_block(block, lambda_scope),
                }
            }
            Expr::MethodRef { target, .. } => self.visit_expr(target, scope),
        }
    }
}
