//! Addresses of statements inside a method body.
//!
//! Rewrites first collect the paths of the statements they want to touch and
//! then apply edits in reverse path order. Paths order like the statements
//! appear in the source, so walking them backwards never invalidates an index
//! that is still pending.

use crate::ast::{Block, Stmt, StmtKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// Statement `n` of a block.
    Stmt(usize),
    /// The block of a `{ ... }` statement.
    Nested,
    /// `if` branch.
    Then,
    /// `else` branch.
    Else,
    /// Body of a loop, labeled statement, `try` or `synchronized`.
    Body,
    /// Block of catch clause `n`.
    Catch(usize),
    Finally,
    /// Statements of switch case `n`.
    Case(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtPath(Vec<Step>);

impl StmtPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, step: Step) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &StmtPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Splits a path that ends inside a block into the block's path and the
    /// statement index. `None` when the statement is the direct body of an
    /// `if`, loop or label.
    pub fn split_block_index(&self) -> Option<(StmtPath, usize)> {
        match self.0.split_last()? {
            (Step::Stmt(idx), parent) => Some((StmtPath(parent.to_vec()), *idx)),
            _ => None,
        }
    }
}

enum Cursor<'a> {
    Block(&'a Block),
    Stmt(&'a Stmt),
}

enum CursorMut<'a> {
    Block(&'a mut Block),
    Stmt(&'a mut Stmt),
}

fn step(cursor: Cursor<'_>, step: Step) -> Option<Cursor<'_>> {
    let stmt = match cursor {
        Cursor::Block(block) => {
            return match step {
                Step::Stmt(idx) => block.stmts.get(idx).map(Cursor::Stmt),
                _ => None,
            }
        }
        Cursor::Stmt(stmt) => stmt,
    };
    match (&stmt.kind, step) {
        (StmtKind::Block(block), Step::Nested) => Some(Cursor::Block(block)),
        (StmtKind::If { then_branch, .. }, Step::Then) => Some(Cursor::Stmt(then_branch)),
        (
            StmtKind::If {
                else_branch: Some(else_branch),
                ..
            },
            Step::Else,
        ) => Some(Cursor::Stmt(else_branch)),
        (
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::ForEach { body, .. }
            | StmtKind::Labeled { body, .. },
            Step::Body,
        ) => Some(Cursor::Stmt(body)),
        (StmtKind::Try { body, .. } | StmtKind::Synchronized { body, .. }, Step::Body) => {
            Some(Cursor::Block(body))
        }
        (StmtKind::Try { catches, .. }, Step::Catch(idx)) => {
            catches.get(idx).map(|clause| Cursor::Block(&clause.body))
        }
        (
            StmtKind::Try {
                finally: Some(finally),
                ..
            },
            Step::Finally,
        ) => Some(Cursor::Block(finally)),
        (StmtKind::Switch { cases, .. }, Step::Case(idx)) => {
            cases.get(idx).map(|case| Cursor::Block(&case.body))
        }
        _ => None,
    }
}

fn step_mut(cursor: CursorMut<'_>, step: Step) -> Option<CursorMut<'_>> {
    let stmt = match cursor {
        CursorMut::Block(block) => {
            return match step {
                Step::Stmt(idx) => block.stmts.get_mut(idx).map(CursorMut::Stmt),
                _ => None,
            }
        }
        CursorMut::Stmt(stmt) => stmt,
    };
    match (&mut stmt.kind, step) {
        (StmtKind::Block(block), Step::Nested) => Some(CursorMut::Block(block)),
        (StmtKind::If { then_branch, .. }, Step::Then) => Some(CursorMut::Stmt(then_branch)),
        (
            StmtKind::If {
                else_branch: Some(else_branch),
                ..
            },
            Step::Else,
        ) => Some(CursorMut::Stmt(else_branch)),
        (
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::ForEach { body, .. }
            | StmtKind::Labeled { body, .. },
            Step::Body,
        ) => Some(CursorMut::Stmt(body)),
        (StmtKind::Try { body, .. } | StmtKind::Synchronized { body, .. }, Step::Body) => {
            Some(CursorMut::Block(body))
        }
        (StmtKind::Try { catches, .. }, Step::Catch(idx)) => catches
            .get_mut(idx)
            .map(|clause| CursorMut::Block(&mut clause.body)),
        (
            StmtKind::Try {
                finally: Some(finally),
                ..
            },
            Step::Finally,
        ) => Some(CursorMut::Block(finally)),
        (StmtKind::Switch { cases, .. }, Step::Case(idx)) => cases
            .get_mut(idx)
            .map(|case| CursorMut::Block(&mut case.body)),
        _ => None,
    }
}

impl Block {
    fn cursor(&self, path: &StmtPath) -> Option<Cursor<'_>> {
        path.steps()
            .iter()
            .try_fold(Cursor::Block(self), |cursor, s| step(cursor, *s))
    }

    fn cursor_mut(&mut self, path: &StmtPath) -> Option<CursorMut<'_>> {
        path.steps()
            .iter()
            .try_fold(CursorMut::Block(self), |cursor, s| step_mut(cursor, *s))
    }

    pub fn stmt_at(&self, path: &StmtPath) -> Option<&Stmt> {
        match self.cursor(path)? {
            Cursor::Stmt(stmt) => Some(stmt),
            Cursor::Block(_) => None,
        }
    }

    pub fn stmt_at_mut(&mut self, path: &StmtPath) -> Option<&mut Stmt> {
        match self.cursor_mut(path)? {
            CursorMut::Stmt(stmt) => Some(stmt),
            CursorMut::Block(_) => None,
        }
    }

    /// The block reached by `path`; the empty path is `self`.
    pub fn block_at(&self, path: &StmtPath) -> Option<&Block> {
        match self.cursor(path)? {
            Cursor::Block(block) => Some(block),
            Cursor::Stmt(_) => None,
        }
    }

    pub fn block_at_mut(&mut self, path: &StmtPath) -> Option<&mut Block> {
        match self.cursor_mut(path)? {
            CursorMut::Block(block) => Some(block),
            CursorMut::Stmt(_) => None,
        }
    }
}
