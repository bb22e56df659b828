//! Statements of one control-flow scope.
//!
//! A method body and the bodies of the lambdas, anonymous classes and local
//! classes inside it are separate scopes: a `return` in a lambda returns from
//! the lambda. The walkers here never leave the scope they start in.

use indy_syntax::{Block, Expr, LiteralKind, Stmt, StmtKind, StmtPath, Step};

/// Depth-first, document-order walk over the statements of a block.
///
/// Expressions are not entered, so closures and anonymous class bodies are
/// skipped along with local class declarations.
pub struct ScopedStatements<'a> {
    stack: Vec<(StmtPath, &'a Stmt)>,
}

impl<'a> ScopedStatements<'a> {
    pub fn new(body: &'a Block) -> Self {
        let mut walker = Self { stack: Vec::new() };
        let mut children = Vec::new();
        block_children(&mut children, &StmtPath::root(), body);
        walker.stack.extend(children.into_iter().rev());
        walker
    }

    fn push_children(&mut self, path: &StmtPath, stmt: &'a Stmt) {
        let mut children = Vec::new();
        match &stmt.kind {
            StmtKind::Block(block) => {
                block_children(&mut children, &path.child(Step::Nested), block)
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                children.push((path.child(Step::Then), &**then_branch));
                if let Some(else_branch) = else_branch {
                    children.push((path.child(Step::Else), &**else_branch));
                }
            }
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::ForEach { body, .. }
            | StmtKind::Labeled { body, .. } => children.push((path.child(Step::Body), &**body)),
            StmtKind::Try {
                body,
                catches,
                finally,
                ..
            } => {
                block_children(&mut children, &path.child(Step::Body), body);
                for (idx, clause) in catches.iter().enumerate() {
                    block_children(&mut children, &path.child(Step::Catch(idx)), &clause.body);
                }
                if let Some(finally) = finally {
                    block_children(&mut children, &path.child(Step::Finally), finally);
                }
            }
            StmtKind::Synchronized { body, .. } => {
                block_children(&mut children, &path.child(Step::Body), body)
            }
            StmtKind::Switch { cases, .. } => {
                for (idx, case) in cases.iter().enumerate() {
                    block_children(&mut children, &path.child(Step::Case(idx)), &case.body);
                }
            }
            StmtKind::LocalVar(_)
            | StmtKind::LocalClass(_)
            | StmtKind::Expr(_)
            | StmtKind::Return(_)
            | StmtKind::Throw(_)
            | StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Assert { .. }
            | StmtKind::Empty => {}
        }
        self.stack.extend(children.into_iter().rev());
    }
}

fn block_children<'a>(out: &mut Vec<(StmtPath, &'a Stmt)>, prefix: &StmtPath, block: &'a Block) {
    for (idx, stmt) in block.stmts.iter().enumerate() {
        out.push((prefix.child(Step::Stmt(idx)), stmt));
    }
}

impl<'a> Iterator for ScopedStatements<'a> {
    type Item = (StmtPath, &'a Stmt);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, stmt) = self.stack.pop()?;
        self.push_children(&path, stmt);
        Some((path, stmt))
    }
}

/// The `return` statements of `body`'s own scope, in document order.
pub fn scoped_returns(body: &Block) -> impl Iterator<Item = (StmtPath, &Stmt)> {
    ScopedStatements::new(body).filter(|(_, stmt)| stmt.is_return())
}

/// Paths of [`scoped_returns`], for edits that cannot hold a borrow of the
/// body.
pub fn return_paths(body: &Block) -> Vec<StmtPath> {
    scoped_returns(body).map(|(path, _)| path).collect()
}

/// Whether control can fall off the end of `block`.
///
/// Follows the Java reachability rules closely enough for advice bodies:
/// switches, labeled statements and loops with a condition are assumed to
/// complete, while `while (true)` and `for (;;)` only do through a `break`.
pub fn can_complete_normally(block: &Block) -> bool {
    block.stmts.iter().all(completes)
}

fn completes(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Throw(_) | StmtKind::Break(_) | StmtKind::Continue(_) => {
            false
        }
        StmtKind::Block(block) | StmtKind::Synchronized { body: block, .. } => {
            can_complete_normally(block)
        }
        StmtKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => completes(then_branch) || completes(else_branch),
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            !is_true(cond) || breaks_out(body, false)
        }
        StmtKind::For { cond, body, .. } => {
            !cond.as_ref().map_or(true, is_true) || breaks_out(body, false)
        }
        StmtKind::Try {
            body,
            catches,
            finally,
            ..
        } => {
            finally.as_ref().map_or(true, can_complete_normally)
                && (can_complete_normally(body)
                    || catches.iter().any(|clause| can_complete_normally(&clause.body)))
        }
        _ => true,
    }
}

fn is_true(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(lit) => lit.kind == LiteralKind::Bool && lit.text == "true",
        Expr::Paren(inner) => is_true(inner),
        _ => false,
    }
}

/// Whether a `break` in `stmt` can leave the loop `stmt` belongs to. Plain
/// `break`s inside a nested loop or switch stay there; labeled ones are
/// assumed to escape.
fn breaks_out(stmt: &Stmt, nested: bool) -> bool {
    let any = |block: &Block, nested| block.stmts.iter().any(|stmt| breaks_out(stmt, nested));
    match &stmt.kind {
        StmtKind::Break(None) => !nested,
        StmtKind::Break(Some(_)) => true,
        StmtKind::Block(block) | StmtKind::Synchronized { body: block, .. } => any(block, nested),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            breaks_out(then_branch, nested)
                || else_branch
                    .as_deref()
                    .is_some_and(|stmt| breaks_out(stmt, nested))
        }
        StmtKind::Labeled { body, .. } => breaks_out(body, nested),
        StmtKind::Try {
            body,
            catches,
            finally,
            ..
        } => {
            any(body, nested)
                || catches.iter().any(|clause| any(&clause.body, nested))
                || finally.as_ref().is_some_and(|block| any(block, nested))
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::ForEach { body, .. } => breaks_out(body, true),
        StmtKind::Switch { cases, .. } => cases.iter().any(|case| any(&case.body, true)),
        _ => false,
    }
}
