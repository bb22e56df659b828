//! Folds `x = value; return x;` into `return value;`.
//!
//! After packing, every `return` reads the returned declarations by name.
//! Walking backwards from each `return`, an assignment to one of those names
//! that directly precedes it can be inlined into the slot that reads it. A
//! fold is refused when it could change what the program observes:
//! - the name is read by more than one slot,
//! - the value reads a name that is still waiting to be folded,
//! - the value would now run after (or before) an expression it used to be
//!   ordered against and one of them has side effects.

use std::collections::HashSet;

use indy_syntax::visit::{self, Visitor};
use indy_syntax::{AssignOp, Block, Expr, MethodDecl, NameExpr, Stmt, StmtKind, StmtPath};
use smol_str::SmolStr;

use crate::returns;

/// Folds the returns of `method` that read `returned`, the names of the
/// packed values in slot order. Returns the number of folded assignments.
pub fn fold_returns(method: &mut MethodDecl, returned: &[SmolStr]) -> usize {
    let packed = returned.len() > 1;
    let Some(body) = &mut method.body else {
        return 0;
    };
    let mut folded = 0;
    for path in returns::return_paths(body).iter().rev() {
        folded += fold_one(body, path, returned, packed);
    }
    if folded > 0 {
        tracing::debug!(
            target = "indy.migrate",
            method = %method.name,
            folded,
            "folded assignments into returns"
        );
    }
    folded
}

fn fold_one(body: &mut Block, path: &StmtPath, returned: &[SmolStr], packed: bool) -> usize {
    let Some((block_path, mut idx)) = path.split_block_index() else {
        return 0;
    };
    let Some(block) = body.block_at_mut(&block_path) else {
        return 0;
    };
    let mut pending: HashSet<SmolStr> = returned.iter().cloned().collect();
    let mut folded = 0;
    while idx > 0 {
        let Some((name, slot)) = foldable(&block.stmts[idx - 1], &block.stmts[idx], &pending, packed)
        else {
            break;
        };
        let assignment = block.stmts.remove(idx - 1);
        idx -= 1;
        let StmtKind::Expr(Expr::Assign { value, .. }) = assignment.kind else {
            break;
        };
        let ret = &mut block.stmts[idx];
        if let Some(target) = slot_mut(ret, slot, packed) {
            *target = *value;
        }
        let mut comments = assignment.comments;
        comments.extend(assignment.trailing_comment);
        comments.append(&mut ret.comments);
        ret.comments = comments;
        ret.blank_line_before = assignment.blank_line_before;
        if assignment.leading.fits(&ret.comments, ret.blank_line_before) {
            ret.leading = assignment.leading;
        }
        pending.remove(&name);
        folded += 1;
    }
    folded
}

fn slots(ret: &Stmt, packed: bool) -> Vec<&Expr> {
    match &ret.kind {
        StmtKind::Return(Some(Expr::NewArray {
            init: Some(items), ..
        })) if packed => items.iter().collect(),
        StmtKind::Return(Some(expr)) if !packed => vec![expr],
        _ => Vec::new(),
    }
}

fn slot_mut(ret: &mut Stmt, slot: usize, packed: bool) -> Option<&mut Expr> {
    let StmtKind::Return(Some(expr)) = &mut ret.kind else {
        return None;
    };
    if !packed {
        return (slot == 0).then_some(expr);
    }
    match expr {
        Expr::NewArray {
            init: Some(items), ..
        } => items.get_mut(slot),
        _ => None,
    }
}

/// Checks whether `prev` can be folded into `ret`; returns the assigned name
/// and the slot it goes to.
fn foldable(
    prev: &Stmt,
    ret: &Stmt,
    pending: &HashSet<SmolStr>,
    packed: bool,
) -> Option<(SmolStr, usize)> {
    let StmtKind::Expr(Expr::Assign {
        target,
        op: AssignOp::Assign,
        value,
    }) = &prev.kind
    else {
        return None;
    };
    let name = &target.as_name()?.name;
    if !pending.contains(name) {
        return None;
    }

    let slots = slots(ret, packed);
    let mut matching = slots
        .iter()
        .enumerate()
        .filter(|(_, expr)| expr.as_name().is_some_and(|n| n.name == *name));
    let (slot, _) = matching.next()?;
    if matching.next().is_some() {
        return None;
    }

    let others: HashSet<&SmolStr> = pending.iter().filter(|n| *n != name).collect();
    if mentions_any(value, &others) {
        return None;
    }

    // Slots left of the fold now run before the value; it used to be the
    // other way round.
    if slots[..slot].iter().any(|earlier| conflicts(earlier, value)) {
        return None;
    }
    Some((name.clone(), slot))
}

fn conflicts(earlier: &Expr, later: &Expr) -> bool {
    (has_side_effects(earlier) && !is_constant(later))
        || (has_side_effects(later) && !is_constant(earlier))
}

struct Mentions<'a> {
    names: &'a HashSet<&'a SmolStr>,
    found: bool,
}

impl Visitor for Mentions<'_> {
    fn visit_name(&mut self, name: &NameExpr) {
        self.found |= self.names.contains(&name.name);
    }
}

fn mentions_any(expr: &Expr, names: &HashSet<&SmolStr>) -> bool {
    let mut mentions = Mentions {
        names,
        found: false,
    };
    mentions.visit_expr(expr);
    mentions.found
}

#[derive(Default)]
struct SideEffects(bool);

impl Visitor for SideEffects {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { .. }
            | Expr::MethodCall { .. }
            | Expr::New(_)
            | Expr::NewArray { .. } => self.0 = true,
            Expr::Unary { op, .. } if op.has_side_effects() => self.0 = true,
            _ => visit::walk_expr(self, expr),
        }
    }
}

/// Assignments, increments, calls and allocations anywhere in `expr`.
fn has_side_effects(expr: &Expr) -> bool {
    let mut effects = SideEffects::default();
    effects.visit_expr(expr);
    effects.0
}

/// Built from literals, class literals and `this` only, so no side effect
/// can change its value.
fn is_constant(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) | Expr::ClassLit(_) | Expr::This => true,
        Expr::Paren(inner) | Expr::Cast { expr: inner, .. } => is_constant(inner),
        Expr::Unary { op, operand } => !op.has_side_effects() && is_constant(operand),
        Expr::Binary { lhs, rhs, .. } => is_constant(lhs) && is_constant(rhs),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => is_constant(cond) && is_constant(then_expr) && is_constant(else_expr),
        _ => false,
    }
}
