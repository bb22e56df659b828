//! Edits keyed on what a name resolves to rather than how it is spelled.

use indy_resolve::BodyScopes;
use indy_syntax::visit::{self, Visitor, VisitorMut};
use indy_syntax::{AssignOp, Block, Expr, MethodDecl, NameExpr, NodeId, Stmt, StmtKind, StmtPath};

use crate::returns::ScopedStatements;
use crate::MigrateError;

struct Replacer<'s> {
    scopes: &'s BodyScopes,
    decl: NodeId,
    replacement: &'s Expr,
    replaced: usize,
}

impl VisitorMut for Replacer<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let Expr::Name(name) = expr {
            if self.scopes.resolves_to(name.id, self.decl) {
                *expr = self.replacement.fresh_clone();
                self.replaced += 1;
            }
            return;
        }
        visit::walk_expr_mut(self, expr);
    }
}

/// Replaces every name in `method`'s body that refers to `decl` with a copy
/// of `replacement`. Returns the number of replaced names.
pub fn replace_references(method: &mut MethodDecl, decl: NodeId, replacement: &Expr) -> usize {
    let scopes = BodyScopes::build(method);
    let Some(body) = &mut method.body else {
        return 0;
    };
    let mut replacer = Replacer {
        scopes: &scopes,
        decl,
        replacement,
        replaced: 0,
    };
    replacer.visit_block(body);
    replacer.replaced
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usages {
    pub reads: usize,
    /// Plain `=` assignments to the bare name. Compound assignments and
    /// increments also read the old value and count as reads.
    pub writes: usize,
}

impl Usages {
    pub fn is_unused(&self) -> bool {
        self.reads == 0 && self.writes == 0
    }
}

struct UsageCounter<'s> {
    scopes: &'s BodyScopes,
    decl: NodeId,
    usages: Usages,
}

impl Visitor for UsageCounter<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Assign {
            target,
            op: AssignOp::Assign,
            value,
        } = expr
        {
            if let Expr::Name(name) = &**target {
                if self.scopes.resolves_to(name.id, self.decl) {
                    self.usages.writes += 1;
                    self.visit_expr(value);
                    return;
                }
            }
        }
        visit::walk_expr(self, expr);
    }

    fn visit_name(&mut self, name: &NameExpr) {
        if self.scopes.resolves_to(name.id, self.decl) {
            self.usages.reads += 1;
        }
    }
}

pub fn usages_of(method: &MethodDecl, decl: NodeId) -> Usages {
    let scopes = BodyScopes::build(method);
    let mut counter = UsageCounter {
        scopes: &scopes,
        decl,
        usages: Usages::default(),
    };
    if let Some(body) = &method.body {
        counter.visit_block(body);
    }
    counter.usages
}

/// Removes a parameter or a top-level local declaration of `method`.
///
/// A declarator sharing its statement with others is removed alone. Comments
/// of a removed statement move to the statement that follows it.
pub fn remove_declaration(method: &mut MethodDecl, decl: NodeId) -> bool {
    if method.remove_param(decl).is_some() {
        return true;
    }
    let Some(body) = &mut method.body else {
        return false;
    };
    let found = ScopedStatements::new(body).find_map(|(path, stmt)| match &stmt.kind {
        StmtKind::LocalVar(local) if local.declarators.iter().any(|d| d.id == decl) => {
            Some((path, local.declarators.len()))
        }
        _ => None,
    });
    let Some((path, declarators)) = found else {
        return false;
    };
    if declarators > 1 {
        if let Some(Stmt {
            kind: StmtKind::LocalVar(local),
            ..
        }) = body.stmt_at_mut(&path)
        {
            local.declarators.retain(|d| d.id != decl);
        }
        return true;
    }
    let Some((block_path, idx)) = path.split_block_index() else {
        return false;
    };
    let Some(block) = body.block_at_mut(&block_path) else {
        return false;
    };
    let removed = block.stmts.remove(idx);
    if let Some(next) = block.stmts.get_mut(idx) {
        let mut comments = removed.comments;
        comments.extend(removed.trailing_comment);
        comments.append(&mut next.comments);
        next.comments = comments;
        next.blank_line_before |= removed.blank_line_before;
        if removed.leading.fits(&next.comments, next.blank_line_before) {
            next.leading = removed.leading;
        }
    } else {
        let mut comments = removed.comments;
        comments.append(&mut block.trailing_comments);
        block.trailing_comments = comments;
    }
    true
}

/// Removes `decl` when nothing reads or assigns it any more.
pub fn prune_if_unused(method: &mut MethodDecl, decl: NodeId) -> bool {
    if !usages_of(method, decl).is_unused() {
        return false;
    }
    let removed = remove_declaration(method, decl);
    if removed {
        tracing::debug!(
            target = "indy.migrate",
            method = %method.name,
            "removed unused declaration"
        );
    }
    removed
}

/// Inserts `stmt` right before the statement at `path`, which must sit
/// directly in a block. The new statement takes over the leading comments.
pub fn insert_before(
    body: &mut Block,
    path: &StmtPath,
    mut stmt: Stmt,
    method: &str,
) -> Result<(), MigrateError> {
    let unsupported = || MigrateError::UnsupportedReturnPosition {
        method: method.to_string(),
    };
    let (block_path, idx) = path.split_block_index().ok_or_else(unsupported)?;
    let block = body.block_at_mut(&block_path).ok_or_else(unsupported)?;
    let anchor = block.stmts.get_mut(idx).ok_or_else(unsupported)?;
    stmt.comments = std::mem::take(&mut anchor.comments);
    stmt.blank_line_before = std::mem::replace(&mut anchor.blank_line_before, false);
    stmt.leading = std::mem::take(&mut anchor.leading);
    block.stmts.insert(idx, stmt);
    Ok(())
}
