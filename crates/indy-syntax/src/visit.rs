//! Tree walkers.
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to keep descending. Annotation arguments are
//! constants and are not walked.

use crate::ast::*;
use crate::NodeId;

pub trait Visitor {
    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        walk_type_decl(self, decl);
    }

    fn visit_member(&mut self, member: &Member) {
        walk_member(self, member);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_local_var(&mut self, decl: &LocalVarDecl) {
        walk_local_var(self, decl);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_name(&mut self, _name: &NameExpr) {}
}

pub fn walk_type_decl<V: Visitor + ?Sized>(v: &mut V, decl: &TypeDecl) {
    for constant in &decl.enum_constants {
        for arg in constant.args.iter().flatten() {
            v.visit_expr(arg);
        }
        for member in constant.body.iter().flatten() {
            v.visit_member(member);
        }
    }
    for member in &decl.members {
        v.visit_member(member);
    }
}

pub fn walk_member<V: Visitor + ?Sized>(v: &mut V, member: &Member) {
    match member {
        Member::Field(field) => {
            for init in field.declarators.iter().filter_map(|d| d.init.as_ref()) {
                v.visit_expr(init);
            }
        }
        Member::Method(method) => {
            if let Some(body) = &method.body {
                v.visit_block(body);
            }
        }
        Member::Type(decl) => v.visit_type_decl(decl),
        Member::Initializer(init) => v.visit_block(&init.body),
    }
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_local_var<V: Visitor + ?Sized>(v: &mut V, decl: &LocalVarDecl) {
    for init in decl.declarators.iter().filter_map(|d| d.init.as_ref()) {
        v.visit_expr(init);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Block(block) => v.visit_block(block),
        StmtKind::LocalVar(decl) => v.visit_local_var(decl),
        StmtKind::LocalClass(decl) => v.visit_type_decl(decl),
        StmtKind::Expr(expr) | StmtKind::Throw(expr) => v.visit_expr(expr),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::DoWhile { body, cond } => {
            v.visit_stmt(body);
            v.visit_expr(cond);
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            match init {
                Some(ForInit::LocalVar(decl)) => v.visit_local_var(decl),
                Some(ForInit::Exprs(exprs)) => exprs.iter().for_each(|e| v.visit_expr(e)),
                None => {}
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            update.iter().for_each(|e| v.visit_expr(e));
            v.visit_stmt(body);
        }
        StmtKind::ForEach {
            var,
            iterable,
            body,
        } => {
            v.visit_expr(iterable);
            v.visit_local_var(var);
            v.visit_stmt(body);
        }
        StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for resource in resources {
                match resource {
                    Resource::Decl(decl) => v.visit_local_var(decl),
                    Resource::Expr(expr) => v.visit_expr(expr),
                }
            }
            v.visit_block(body);
            for clause in catches {
                v.visit_block(&clause.body);
            }
            if let Some(finally) = finally {
                v.visit_block(finally);
            }
        }
        StmtKind::Switch { selector, cases } => {
            v.visit_expr(selector);
            for case in cases {
                case.labels.iter().for_each(|e| v.visit_expr(e));
                v.visit_block(&case.body);
            }
        }
        StmtKind::Synchronized { lock, body } => {
            v.visit_expr(lock);
            v.visit_block(body);
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::Assert { cond, message } => {
            v.visit_expr(cond);
            if let Some(message) = message {
                v.visit_expr(message);
            }
        }
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Name(name) => v.visit_name(name),
        Expr::Literal(_)
        | Expr::ClassLit(_)
        | Expr::This
        | Expr::Super
        | Expr::TypeExpr(_) => {}
        Expr::FieldAccess { receiver, .. } => v.visit_expr(receiver),
        Expr::MethodCall { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver);
            }
            args.iter().for_each(|e| v.visit_expr(e));
        }
        Expr::ArrayAccess { array, index } => {
            v.visit_expr(array);
            v.visit_expr(index);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        Expr::Cast { expr, .. } | Expr::InstanceOf { expr, .. } | Expr::Paren(expr) => {
            v.visit_expr(expr)
        }
        Expr::New(new) => {
            if let Some(outer) = &new.outer {
                v.visit_expr(outer);
            }
            new.args.iter().for_each(|e| v.visit_expr(e));
            for member in new.body.iter().flatten() {
                v.visit_member(member);
            }
        }
        Expr::NewArray { dims, init, .. } => {
            dims.iter().flatten().for_each(|e| v.visit_expr(e));
            init.iter().flatten().for_each(|e| v.visit_expr(e));
        }
        Expr::ArrayInit(items) => items.iter().for_each(|e| v.visit_expr(e)),
        Expr::Lambda { body, .. } => match body {
            LambdaBody::Expr(expr) => v.visit_expr(expr),
            LambdaBody::Block(block) => v.visit_block(block),
        },
        Expr::MethodRef { target, .. } => v.visit_expr(target),
    }
}

pub trait VisitorMut {
    fn visit_type_decl(&mut self, decl: &mut TypeDecl) {
        walk_type_decl_mut(self, decl);
    }

    fn visit_member(&mut self, member: &mut Member) {
        walk_member_mut(self, member);
    }

    fn visit_block(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_local_var(&mut self, decl: &mut LocalVarDecl) {
        walk_local_var_mut(self, decl);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    /// Called for every declaration and name id in the walked tree.
    fn visit_node_id(&mut self, _id: &mut NodeId) {}
}

pub fn walk_type_decl_mut<V: VisitorMut + ?Sized>(v: &mut V, decl: &mut TypeDecl) {
    v.visit_node_id(&mut decl.id);
    for constant in &mut decl.enum_constants {
        for arg in constant.args.iter_mut().flatten() {
            v.visit_expr(arg);
        }
        for member in constant.body.iter_mut().flatten() {
            v.visit_member(member);
        }
    }
    for member in &mut decl.members {
        v.visit_member(member);
    }
}

pub fn walk_member_mut<V: VisitorMut + ?Sized>(v: &mut V, member: &mut Member) {
    match member {
        Member::Field(field) => {
            for declarator in &mut field.declarators {
                v.visit_node_id(&mut declarator.id);
                if let Some(init) = &mut declarator.init {
                    v.visit_expr(init);
                }
            }
        }
        Member::Method(method) => {
            v.visit_node_id(&mut method.id);
            for param in &mut method.params {
                v.visit_node_id(&mut param.id);
            }
            if let Some(body) = &mut method.body {
                v.visit_block(body);
            }
        }
        Member::Type(decl) => v.visit_type_decl(decl),
        Member::Initializer(init) => v.visit_block(&mut init.body),
    }
}

pub fn walk_block_mut<V: VisitorMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_local_var_mut<V: VisitorMut + ?Sized>(v: &mut V, decl: &mut LocalVarDecl) {
    for declarator in &mut decl.declarators {
        v.visit_node_id(&mut declarator.id);
        if let Some(init) = &mut declarator.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_stmt_mut<V: VisitorMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Block(block) => v.visit_block(block),
        StmtKind::LocalVar(decl) => v.visit_local_var(decl),
        StmtKind::LocalClass(decl) => v.visit_type_decl(decl),
        StmtKind::Expr(expr) | StmtKind::Throw(expr) => v.visit_expr(expr),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::DoWhile { body, cond } => {
            v.visit_stmt(body);
            v.visit_expr(cond);
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            match init {
                Some(ForInit::LocalVar(decl)) => v.visit_local_var(decl),
                Some(ForInit::Exprs(exprs)) => exprs.iter_mut().for_each(|e| v.visit_expr(e)),
                None => {}
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            update.iter_mut().for_each(|e| v.visit_expr(e));
            v.visit_stmt(body);
        }
        StmtKind::ForEach {
            var,
            iterable,
            body,
        } => {
            v.visit_expr(iterable);
            v.visit_local_var(var);
            v.visit_stmt(body);
        }
        StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for resource in resources {
                match resource {
                    Resource::Decl(decl) => v.visit_local_var(decl),
                    Resource::Expr(expr) => v.visit_expr(expr),
                }
            }
            v.visit_block(body);
            for clause in catches {
                v.visit_node_id(&mut clause.param.id);
                v.visit_block(&mut clause.body);
            }
            if let Some(finally) = finally {
                v.visit_block(finally);
            }
        }
        StmtKind::Switch { selector, cases } => {
            v.visit_expr(selector);
            for case in cases {
                case.labels.iter_mut().for_each(|e| v.visit_expr(e));
                v.visit_block(&mut case.body);
            }
        }
        StmtKind::Synchronized { lock, body } => {
            v.visit_expr(lock);
            v.visit_block(body);
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::Assert { cond, message } => {
            v.visit_expr(cond);
            if let Some(message) = message {
                v.visit_expr(message);
            }
        }
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty => {}
    }
}

pub fn walk_expr_mut<V: VisitorMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Name(name) => v.visit_node_id(&mut name.id),
        Expr::Literal(_)
        | Expr::ClassLit(_)
        | Expr::This
        | Expr::Super
        | Expr::TypeExpr(_) => {}
        Expr::FieldAccess { receiver, .. } => v.visit_expr(receiver),
        Expr::MethodCall { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                v.visit_expr(receiver);
            }
            args.iter_mut().for_each(|e| v.visit_expr(e));
        }
        Expr::ArrayAccess { array, index } => {
            v.visit_expr(array);
            v.visit_expr(index);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        Expr::Cast { expr, .. } | Expr::Paren(expr) => v.visit_expr(expr),
        Expr::InstanceOf { expr, binding, .. } => {
            v.visit_expr(expr);
            if let Some(binding) = binding {
                v.visit_node_id(&mut binding.id);
            }
        }
        Expr::New(new) => {
            if let Some(outer) = &mut new.outer {
                v.visit_expr(outer);
            }
            new.args.iter_mut().for_each(|e| v.visit_expr(e));
            for member in new.body.iter_mut().flatten() {
                v.visit_member(member);
            }
        }
        Expr::NewArray { dims, init, .. } => {
            dims.iter_mut().flatten().for_each(|e| v.visit_expr(e));
            init.iter_mut().flatten().for_each(|e| v.visit_expr(e));
        }
        Expr::ArrayInit(items) => items.iter_mut().for_each(|e| v.visit_expr(e)),
        Expr::Lambda { params, body, .. } => {
            for param in params {
                v.visit_node_id(&mut param.id);
            }
            match body {
                LambdaBody::Expr(expr) => v.visit_expr(expr),
                LambdaBody::Block(block) => v.visit_block(block),
            }
        }
        Expr::MethodRef { target, .. } => v.visit_expr(target),
    }
}

struct Renumber;

impl VisitorMut for Renumber {
    fn visit_node_id(&mut self, id: &mut NodeId) {
        *id = NodeId::fresh();
    }
}

impl Expr {
    /// Deep copy with fresh ids, so the copy can live next to the original.
    pub fn fresh_clone(&self) -> Expr {
        let mut copy = self.clone();
        Renumber.visit_expr(&mut copy);
        copy
    }
}

impl Stmt {
    pub fn fresh_clone(&self) -> Stmt {
        let mut copy = self.clone();
        Renumber.visit_stmt(&mut copy);
        copy
    }
}
