//! Turns a [`CompilationUnit`] back into Java source.
//!
//! Declarations and statements that still print the way they did when parsed
//! are written from their [`Verbatim`] text, and the blank lines and comments
//! between them from their [`Trivia`]. Everything else is printed in a fixed
//! layout: one statement per line, four space indentation, K&R braces.

use std::collections::hash_map::DefaultHasher;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    /// Spaces per nesting level for code printed from the tree.
    pub indent_width: usize,
    /// Reuse the original text of declarations nobody touched.
    pub preserve_unmodified: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            indent_width: 4,
            preserve_unmodified: true,
        }
    }
}

/// Prints with default options, keeping untouched declarations verbatim.
pub fn print(unit: &CompilationUnit) -> String {
    print_with(unit, &PrintOptions::default())
}

/// Prints every declaration from the tree. Two units with the same structure
/// print identically no matter how their sources were laid out.
pub fn print_canonical(unit: &CompilationUnit) -> String {
    print_with(
        unit,
        &PrintOptions {
            preserve_unmodified: false,
            ..PrintOptions::default()
        },
    )
}

pub fn print_with(unit: &CompilationUnit, options: &PrintOptions) -> String {
    let mut printer = Printer {
        out: String::new(),
        options,
        indent: 0,
    };
    printer.unit(unit);
    match unit.newline {
        NewlineStyle::Lf => printer.out,
        NewlineStyle::CrLf => printer.out.replace('\n', "\r\n"),
    }
}

/// Hash of what `print` writes in the canonical layout at nesting level 0.
fn fingerprint(print: impl FnOnce(&mut Printer<'_>)) -> u64 {
    let options = PrintOptions {
        indent_width: 4,
        preserve_unmodified: false,
    };
    let mut printer = Printer {
        out: String::new(),
        options: &options,
        indent: 0,
    };
    print(&mut printer);
    let mut hasher = DefaultHasher::new();
    printer.out.hash(&mut hasher);
    hasher.finish()
}

pub(crate) fn header_fingerprint(package: Option<&PackageDecl>, imports: &[ImportDecl]) -> u64 {
    fingerprint(|printer| printer.header(package, imports))
}

pub(crate) fn type_fingerprint(decl: &TypeDecl) -> u64 {
    fingerprint(|printer| printer.member_type(decl))
}

pub(crate) fn field_fingerprint(field: &FieldDecl) -> u64 {
    fingerprint(|printer| printer.field(field))
}

pub(crate) fn method_fingerprint(method: &MethodDecl) -> u64 {
    fingerprint(|printer| printer.method(method))
}

pub(crate) fn initializer_fingerprint(init: &InitializerDecl) -> u64 {
    fingerprint(|printer| printer.initializer(init))
}

pub(crate) fn stmt_fingerprint(stmt: &Stmt) -> u64 {
    fingerprint(|printer| printer.stmt_line(stmt))
}

// Binding strength of printed expressions; an operand weaker than its slot
// gets parenthesized.
const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_BINARY_BASE: u8 = 2;
const PREC_UNARY: u8 = 13;
const PREC_POSTFIX: u8 = 14;
const PREC_PRIMARY: u8 = 15;

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Assign { .. } | Expr::Lambda { .. } => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Binary { op, .. } => PREC_BINARY_BASE + op.precedence(),
        Expr::InstanceOf { .. } => PREC_BINARY_BASE + INSTANCEOF_PRECEDENCE,
        Expr::Unary { op, .. } if !op.is_postfix() => PREC_UNARY,
        Expr::Cast { .. } | Expr::NewArray { .. } => PREC_UNARY,
        Expr::Unary { .. }
        | Expr::FieldAccess { .. }
        | Expr::MethodCall { .. }
        | Expr::ArrayAccess { .. }
        | Expr::MethodRef { .. } => PREC_POSTFIX,
        Expr::Name(_)
        | Expr::Literal(_)
        | Expr::New(_)
        | Expr::ArrayInit(_)
        | Expr::ClassLit(_)
        | Expr::This
        | Expr::Super
        | Expr::Paren(_)
        | Expr::TypeExpr(_) => PREC_PRIMARY,
    }
}

struct Printer<'o> {
    out: String,
    options: &'o PrintOptions,
    indent: usize,
}

impl Printer<'_> {
    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn write_indent(&mut self) {
        let width = self.indent * self.options.indent_width;
        self.out.extend(std::iter::repeat(' ').take(width));
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn blank_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    /// Writes the original text of a node that still prints to the same
    /// fingerprint.
    fn verbatim(&mut self, verbatim: &Verbatim, fingerprint: impl FnOnce() -> u64) -> bool {
        if !self.options.preserve_unmodified {
            return false;
        }
        let Some((text, starts_line)) = verbatim.text_for(fingerprint) else {
            return false;
        };
        if !starts_line {
            self.write_indent();
        }
        self.write(text);
        true
    }

    fn trivia(&mut self, trivia: &Trivia, comments: &[Comment], blank_line_before: bool) -> bool {
        if !self.options.preserve_unmodified {
            return false;
        }
        match trivia.text_for(comments, blank_line_before) {
            Some(text) => {
                self.write(text);
                true
            }
            None => false,
        }
    }

    /// Comments and blank line in front of a member or statement.
    fn leading(&mut self, trivia: &Trivia, comments: &[Comment], blank_line_before: bool) {
        if !self.trivia(trivia, comments, blank_line_before) {
            if blank_line_before {
                self.blank_line();
            }
            self.comments(comments);
        }
    }

    /// Comments in front of a closing brace, then the brace. Expects the
    /// indentation of the enclosed code.
    fn closing_brace(&mut self, closing: &Trivia, comments: &[Comment]) {
        let raw = self.trivia(closing, comments, false);
        if !raw {
            self.comments(comments);
        }
        self.indent -= 1;
        if !raw {
            self.write_indent();
        }
        self.write("}");
    }

    fn unit(&mut self, unit: &CompilationUnit) {
        if unit.package.is_some() || !unit.imports.is_empty() {
            let comments = match (&unit.package, unit.imports.first()) {
                (Some(package), _) => package.comments.as_slice(),
                (None, Some(import)) => import.comments.as_slice(),
                (None, None) => &[],
            };
            if !self.trivia(&unit.leading, comments, false) {
                self.comments(comments);
            }
            let fingerprint = || header_fingerprint(unit.package.as_ref(), &unit.imports);
            if self.verbatim(&unit.header, fingerprint) {
                self.newline();
            } else {
                self.header(unit.package.as_ref(), &unit.imports);
            }
        }

        for decl in &unit.types {
            if !self.trivia(&decl.leading, &decl.comments, decl.blank_line_before) {
                self.blank_line();
                self.comments(&decl.comments);
            }
            self.member_type(decl);
        }
        if !self.trivia(&unit.closing, &unit.trailing_comments, false)
            && !unit.trailing_comments.is_empty()
        {
            self.blank_line();
            self.comments(&unit.trailing_comments);
        }
    }

    /// Package and imports from the tree. The comments in front of the first
    /// of them belong to the caller.
    fn header(&mut self, package: Option<&PackageDecl>, imports: &[ImportDecl]) {
        if let Some(package) = package {
            let _ = write!(self.out, "package {};", package.name);
            self.newline();
        }
        for (idx, import) in imports.iter().enumerate() {
            if (idx == 0 && package.is_some()) || (idx > 0 && import.blank_line_before) {
                self.blank_line();
            }
            if idx > 0 || package.is_some() {
                self.comments(&import.comments);
            }
            self.write("import ");
            if import.is_static {
                self.write("static ");
            }
            self.write(&import.path);
            if import.is_wildcard {
                self.write(".*");
            }
            self.write(";");
            self.newline();
        }
    }

    /// Writes comments one per line at the current indentation.
    fn comments(&mut self, comments: &[Comment]) {
        for (idx, comment) in comments.iter().enumerate() {
            if idx > 0 && comment.blank_line_before {
                self.blank_line();
            }
            self.write_indent();
            self.comment_text(comment);
            self.newline();
        }
    }

    fn comment_text(&mut self, comment: &Comment) {
        let mut lines = comment.text.lines();
        if let Some(first) = lines.next() {
            self.write(first);
        }
        for line in lines {
            self.newline();
            let line = line.trim_start();
            self.write_indent();
            if line.starts_with('*') {
                self.write(" ");
            }
            self.write(line);
        }
    }

    fn trailing_comment(&mut self, comment: &Option<Comment>) {
        if let Some(comment) = comment {
            self.write(" ");
            self.comment_text(comment);
        }
    }

    fn member_type(&mut self, decl: &TypeDecl) {
        if !self.verbatim(&decl.verbatim, || type_fingerprint(decl)) {
            self.write_indent();
            self.type_decl_inline(decl);
        }
        self.newline();
    }

    /// Type declaration from the tree, starting at the annotations and ending
    /// at the closing brace.
    fn type_decl_inline(&mut self, decl: &TypeDecl) {
        self.annotations_on_lines(&decl.annotations);
        self.modifiers(&decl.modifiers);
        self.write(match decl.kind {
            TypeDeclKind::Class => "class ",
            TypeDeclKind::Interface => "interface ",
            TypeDeclKind::Enum => "enum ",
        });
        self.write(&decl.name);
        self.type_params(&decl.type_params);
        if !decl.extends.is_empty() {
            self.write(" extends ");
            self.type_list(&decl.extends);
        }
        if !decl.implements.is_empty() {
            self.write(" implements ");
            self.type_list(&decl.implements);
        }
        self.write(" {");
        self.newline();
        self.indent += 1;
        for (idx, constant) in decl.enum_constants.iter().enumerate() {
            self.comments(&constant.comments);
            self.write_indent();
            self.annotations_inline(&constant.annotations);
            self.write(&constant.name);
            if let Some(args) = &constant.args {
                self.args(args);
            }
            if let Some(body) = &constant.body {
                self.write(" ");
                self.class_body(body);
            }
            if idx + 1 < decl.enum_constants.len() {
                self.write(",");
            } else if !decl.members.is_empty() {
                self.write(";");
            }
            self.newline();
        }
        self.members(&decl.members);
        self.closing_brace(&decl.closing, &decl.trailing_comments);
    }

    fn class_body(&mut self, members: &[Member]) {
        self.write("{");
        self.newline();
        self.indent += 1;
        self.members(members);
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn members(&mut self, members: &[Member]) {
        for member in members {
            let (leading, comments, blank) = match member {
                Member::Field(field) => (&field.leading, &field.comments, field.blank_line_before),
                Member::Method(method) => {
                    (&method.leading, &method.comments, method.blank_line_before)
                }
                Member::Type(decl) => (&decl.leading, &decl.comments, decl.blank_line_before),
                Member::Initializer(init) => {
                    (&init.leading, &init.comments, init.blank_line_before)
                }
            };
            self.leading(leading, comments, blank);
            match member {
                Member::Field(field) => self.field(field),
                Member::Method(method) => self.method(method),
                Member::Type(decl) => self.member_type(decl),
                Member::Initializer(init) => self.initializer(init),
            }
        }
    }

    fn field(&mut self, field: &FieldDecl) {
        if !self.verbatim(&field.verbatim, || field_fingerprint(field)) {
            self.write_indent();
            self.annotations_on_lines(&field.annotations);
            self.modifiers(&field.modifiers);
            self.type_ref(&field.ty);
            self.write(" ");
            self.declarators(&field.declarators);
            self.write(";");
            self.trailing_comment(&field.trailing_comment);
        }
        self.newline();
    }

    fn method(&mut self, method: &MethodDecl) {
        if !self.verbatim(&method.verbatim, || method_fingerprint(method)) {
            self.write_indent();
            self.annotations_on_lines(&method.annotations);
            self.modifiers(&method.modifiers);
            if !method.type_params.is_empty() {
                self.type_params(&method.type_params);
                self.write(" ");
            }
            if let Some(ty) = &method.return_type {
                self.type_ref(ty);
                self.write(" ");
            }
            self.write(&method.name);
            self.write("(");
            for (idx, param) in method.params.iter().enumerate() {
                if idx > 0 {
                    self.write(", ");
                }
                self.param(param);
            }
            self.write(")");
            if !method.throws.is_empty() {
                self.write(" throws ");
                self.type_list(&method.throws);
            }
            match &method.body {
                Some(body) => {
                    self.write(" ");
                    self.block(body);
                }
                None => self.write(";"),
            }
        }
        self.newline();
    }

    fn initializer(&mut self, init: &InitializerDecl) {
        if !self.verbatim(&init.verbatim, || initializer_fingerprint(init)) {
            self.write_indent();
            if init.is_static {
                self.write("static ");
            }
            self.block(&init.body);
        }
        self.newline();
    }

    fn param(&mut self, param: &Param) {
        self.annotations_inline(&param.annotations);
        self.modifiers(&param.modifiers);
        self.type_ref(&param.ty);
        self.write(if param.varargs { "... " } else { " " });
        self.write(&param.name);
    }

    fn modifiers(&mut self, modifiers: &[Modifier]) {
        for modifier in modifiers {
            self.write(modifier.as_str());
            self.write(" ");
        }
    }

    /// Declaration annotations, each on its own line.
    fn annotations_on_lines(&mut self, annotations: &[Annotation]) {
        for annotation in annotations {
            self.annotation(annotation);
            self.newline();
            self.write_indent();
        }
    }

    fn annotations_inline(&mut self, annotations: &[Annotation]) {
        for annotation in annotations {
            self.annotation(annotation);
            self.write(" ");
        }
    }

    fn annotation(&mut self, annotation: &Annotation) {
        self.write("@");
        self.write(&annotation.name);
        match &annotation.args {
            AnnotationArgs::Marker => {}
            AnnotationArgs::Single(value) => {
                self.write("(");
                self.element_value(value);
                self.write(")");
            }
            AnnotationArgs::Normal(pairs) => {
                self.write("(");
                for (idx, pair) in pairs.iter().enumerate() {
                    if idx > 0 {
                        self.write(", ");
                    }
                    self.write(&pair.name);
                    self.write(" = ");
                    self.element_value(&pair.value);
                }
                self.write(")");
            }
        }
    }

    fn element_value(&mut self, value: &ElementValue) {
        match value {
            ElementValue::Expr(expr) => self.expr(expr, PREC_CONDITIONAL),
            ElementValue::Annotation(annotation) => self.annotation(annotation),
            ElementValue::Array(values) => {
                self.write("{");
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        self.write(", ");
                    }
                    self.element_value(value);
                }
                self.write("}");
            }
        }
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.write("<");
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                self.write(", ");
            }
            self.write(&param.name);
            for (bound_idx, bound) in param.bounds.iter().enumerate() {
                self.write(if bound_idx == 0 { " extends " } else { " & " });
                self.type_ref(bound);
            }
        }
        self.write(">");
    }

    fn type_list(&mut self, types: &[TypeRef]) {
        for (idx, ty) in types.iter().enumerate() {
            if idx > 0 {
                self.write(", ");
            }
            self.type_ref(ty);
        }
    }

    fn type_ref(&mut self, ty: &TypeRef) {
        let _ = write!(self.out, "{ty}");
    }

    fn declarators(&mut self, declarators: &[VarDeclarator]) {
        for (idx, declarator) in declarators.iter().enumerate() {
            if idx > 0 {
                self.write(", ");
            }
            self.write(&declarator.name);
            for _ in 0..declarator.dims {
                self.write("[]");
            }
            if let Some(init) = &declarator.init {
                self.write(" = ");
                self.expr(init, PREC_ASSIGN);
            }
        }
    }

    fn local_var(&mut self, decl: &LocalVarDecl) {
        self.annotations_inline(&decl.annotations);
        self.modifiers(&decl.modifiers);
        self.type_ref(&decl.ty);
        self.write(" ");
        self.declarators(&decl.declarators);
    }

    // Statements

    /// Writes `{`, the statements and the closing `}` without a final newline.
    fn block(&mut self, block: &Block) {
        self.write("{");
        self.newline();
        self.indent += 1;
        self.stmts(&block.stmts);
        self.closing_brace(&block.closing, &block.trailing_comments);
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.leading(&stmt.leading, &stmt.comments, stmt.blank_line_before);
        if !self.verbatim(&stmt.verbatim, || stmt_fingerprint(stmt)) {
            self.stmt_line(stmt);
        }
        self.newline();
    }

    /// The statement and its trailing comment from the tree, indented.
    fn stmt_line(&mut self, stmt: &Stmt) {
        self.write_indent();
        self.stmt_kind(&stmt.kind);
        self.trailing_comment(&stmt.trailing_comment);
    }

    fn stmt_kind(&mut self, kind: &StmtKind) {
        match kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::LocalVar(decl) => {
                self.local_var(decl);
                self.write(";");
            }
            StmtKind::LocalClass(decl) => self.type_decl_inline(decl),
            StmtKind::Expr(expr) => {
                self.expr(expr, PREC_ASSIGN);
                self.write(";");
            }
            StmtKind::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.expr(value, PREC_ASSIGN);
                }
                self.write(";");
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.write("if (");
                self.expr(cond, PREC_ASSIGN);
                self.write(")");
                let then_is_block = self.branch(then_branch);
                if let Some(else_branch) = else_branch {
                    if then_is_block {
                        self.write(" ");
                    } else {
                        self.newline();
                        self.write_indent();
                    }
                    self.write("else");
                    self.branch(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.write("while (");
                self.expr(cond, PREC_ASSIGN);
                self.write(")");
                self.branch(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.write("do");
                if self.branch(body) {
                    self.write(" ");
                } else {
                    self.newline();
                    self.write_indent();
                }
                self.write("while (");
                self.expr(cond, PREC_ASSIGN);
                self.write(");");
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.write("for (");
                match init {
                    Some(ForInit::LocalVar(decl)) => self.local_var(decl),
                    Some(ForInit::Exprs(exprs)) => self.expr_list(exprs),
                    None => {}
                }
                self.write(";");
                if let Some(cond) = cond {
                    self.write(" ");
                    self.expr(cond, PREC_ASSIGN);
                }
                self.write(";");
                if !update.is_empty() {
                    self.write(" ");
                    self.expr_list(update);
                }
                self.write(")");
                self.branch(body);
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                self.write("for (");
                self.local_var(var);
                self.write(" : ");
                self.expr(iterable, PREC_ASSIGN);
                self.write(")");
                self.branch(body);
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                self.write("try ");
                if !resources.is_empty() {
                    self.write("(");
                    for (idx, resource) in resources.iter().enumerate() {
                        if idx > 0 {
                            self.write("; ");
                        }
                        match resource {
                            Resource::Decl(decl) => self.local_var(decl),
                            Resource::Expr(expr) => self.expr(expr, PREC_ASSIGN),
                        }
                    }
                    self.write(") ");
                }
                self.block(body);
                for clause in catches {
                    self.write(" catch (");
                    self.annotations_inline(&clause.param.annotations);
                    self.modifiers(&clause.param.modifiers);
                    for (idx, ty) in clause.param.types.iter().enumerate() {
                        if idx > 0 {
                            self.write(" | ");
                        }
                        self.type_ref(ty);
                    }
                    self.write(" ");
                    self.write(&clause.param.name);
                    self.write(") ");
                    self.block(&clause.body);
                }
                if let Some(finally) = finally {
                    self.write(" finally ");
                    self.block(finally);
                }
            }
            StmtKind::Throw(expr) => {
                self.write("throw ");
                self.expr(expr, PREC_ASSIGN);
                self.write(";");
            }
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                self.write(if matches!(kind, StmtKind::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            StmtKind::Switch { selector, cases } => {
                self.write("switch (");
                self.expr(selector, PREC_ASSIGN);
                self.write(") {");
                self.newline();
                self.indent += 1;
                for case in cases {
                    self.switch_case(case);
                }
                self.indent -= 1;
                self.write_indent();
                self.write("}");
            }
            StmtKind::Synchronized { lock, body } => {
                self.write("synchronized (");
                self.expr(lock, PREC_ASSIGN);
                self.write(") ");
                self.block(body);
            }
            StmtKind::Labeled { label, body } => {
                self.write(label);
                self.write(": ");
                self.stmt_kind(&body.kind);
            }
            StmtKind::Assert { cond, message } => {
                self.write("assert ");
                self.expr(cond, PREC_ASSIGN);
                if let Some(message) = message {
                    self.write(" : ");
                    self.expr(message, PREC_ASSIGN);
                }
                self.write(";");
            }
            StmtKind::Empty => self.write(";"),
        }
    }

    /// Body of an `if`, loop or `else`. Returns whether it was a block.
    fn branch(&mut self, stmt: &Stmt) -> bool {
        match &stmt.kind {
            StmtKind::Block(block) => {
                self.write(" ");
                self.block(block);
                true
            }
            _ if !stmt.comments.is_empty() => {
                // Comments need lines of their own.
                self.write(" ");
                self.block(&Block::new(vec![stmt.clone()]));
                true
            }
            kind => {
                self.write(" ");
                self.stmt_kind(kind);
                self.trailing_comment(&stmt.trailing_comment);
                false
            }
        }
    }

    fn switch_case(&mut self, case: &SwitchCase) {
        self.comments(&case.comments);
        self.write_indent();
        if case.is_default {
            self.write("default");
        } else {
            self.write("case ");
            self.expr_list(&case.labels);
        }
        match case.arrow {
            Some(ArrowBody::Block) => {
                self.write(" -> ");
                self.block(&case.body);
                self.newline();
            }
            Some(ArrowBody::Single) => {
                self.write(" -> ");
                match case.body.stmts.first() {
                    Some(stmt) => {
                        self.stmt_kind(&stmt.kind);
                        self.trailing_comment(&stmt.trailing_comment);
                    }
                    None => self.write(";"),
                }
                self.newline();
            }
            None => {
                self.write(":");
                self.newline();
                self.indent += 1;
                self.stmts(&case.body.stmts);
                self.comments(&case.body.trailing_comments);
                self.indent -= 1;
            }
        }
    }

    // Expressions

    fn expr_list(&mut self, exprs: &[Expr]) {
        for (idx, expr) in exprs.iter().enumerate() {
            if idx > 0 {
                self.write(", ");
            }
            self.expr(expr, PREC_ASSIGN);
        }
    }

    fn args(&mut self, args: &[Expr]) {
        self.write("(");
        self.expr_list(args);
        self.write(")");
    }

    /// Prints `expr`, parenthesized if it binds weaker than `min`.
    fn expr(&mut self, expr: &Expr, min: u8) {
        let needs_parens = expr_precedence(expr) < min;
        if needs_parens {
            self.write("(");
        }
        self.expr_unparenthesized(expr);
        if needs_parens {
            self.write(")");
        }
    }

    fn expr_unparenthesized(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(name) => self.write(&name.name),
            Expr::Literal(lit) => self.write(&lit.text),
            Expr::FieldAccess { receiver, name } => {
                self.expr(receiver, PREC_POSTFIX);
                self.write(".");
                self.write(name);
            }
            Expr::MethodCall {
                receiver,
                type_args,
                name,
                args,
            } => {
                if let Some(receiver) = receiver {
                    self.expr(receiver, PREC_POSTFIX);
                    self.write(".");
                }
                if !type_args.is_empty() {
                    self.write("<");
                    self.type_list(type_args);
                    self.write(">");
                }
                self.write(name);
                self.args(args);
            }
            Expr::ArrayAccess { array, index } => {
                self.expr(array, PREC_POSTFIX);
                self.write("[");
                self.expr(index, PREC_ASSIGN);
                self.write("]");
            }
            Expr::Assign { target, op, value } => {
                self.expr(target, PREC_POSTFIX);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.expr(value, PREC_ASSIGN);
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = PREC_BINARY_BASE + op.precedence();
                self.expr(lhs, prec);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.expr(rhs, prec + 1);
            }
            Expr::Unary { op, operand } if op.is_postfix() => {
                self.expr(operand, PREC_POSTFIX);
                self.write(op.as_str());
            }
            Expr::Unary { op, operand } => {
                self.write(op.as_str());
                if needs_space_after_sign(*op, operand) {
                    self.write(" ");
                }
                self.expr(operand, PREC_UNARY);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond, PREC_CONDITIONAL + 1);
                self.write(" ? ");
                self.expr(then_expr, PREC_ASSIGN);
                self.write(" : ");
                self.expr(else_expr, PREC_CONDITIONAL);
            }
            Expr::Cast { ty, expr } => {
                self.write("(");
                self.type_ref(ty);
                self.write(") ");
                self.expr(expr, PREC_UNARY);
            }
            Expr::InstanceOf { expr, ty, binding } => {
                self.expr(expr, PREC_BINARY_BASE + INSTANCEOF_PRECEDENCE);
                self.write(" instanceof ");
                if binding.as_ref().is_some_and(|b| b.is_final) {
                    self.write("final ");
                }
                self.type_ref(ty);
                if let Some(binding) = binding {
                    self.write(" ");
                    self.write(&binding.name);
                }
            }
            Expr::New(new) => {
                if let Some(outer) = &new.outer {
                    self.expr(outer, PREC_POSTFIX);
                    self.write(".");
                }
                self.write("new ");
                self.type_ref(&new.ty);
                self.args(&new.args);
                if let Some(body) = &new.body {
                    self.write(" ");
                    self.class_body(body);
                }
            }
            Expr::NewArray {
                elem_ty,
                dims,
                init,
            } => {
                self.write("new ");
                self.type_ref(elem_ty);
                for dim in dims {
                    self.write("[");
                    if let Some(size) = dim {
                        self.expr(size, PREC_ASSIGN);
                    }
                    self.write("]");
                }
                if let Some(items) = init {
                    self.array_init(items);
                }
            }
            Expr::ArrayInit(items) => self.array_init(items),
            Expr::Lambda {
                params,
                parenthesized,
                body,
            } => {
                if *parenthesized || params.len() != 1 {
                    self.write("(");
                }
                for (idx, param) in params.iter().enumerate() {
                    if idx > 0 {
                        self.write(", ");
                    }
                    self.modifiers(&param.modifiers);
                    if let Some(ty) = &param.ty {
                        self.type_ref(ty);
                        self.write(" ");
                    }
                    self.write(&param.name);
                }
                if *parenthesized || params.len() != 1 {
                    self.write(")");
                }
                self.write(" -> ");
                match body {
                    LambdaBody::Expr(expr) => self.expr(expr, PREC_ASSIGN),
                    LambdaBody::Block(block) => self.block(block),
                }
            }
            Expr::MethodRef { target, name } => {
                self.expr(target, PREC_POSTFIX);
                self.write("::");
                self.write(name);
            }
            Expr::ClassLit(ty) => {
                self.type_ref(ty);
                self.write(".class");
            }
            Expr::This => self.write("this"),
            Expr::Super => self.write("super"),
            Expr::Paren(inner) => {
                self.write("(");
                self.expr(inner, PREC_ASSIGN);
                self.write(")");
            }
            Expr::TypeExpr(ty) => self.type_ref(ty),
        }
    }

    fn array_init(&mut self, items: &[Expr]) {
        self.write("{");
        self.expr_list(items);
        self.write("}");
    }
}

/// `- -x` and `+ +x` must not print as `--x` and `++x`.
fn needs_space_after_sign(op: UnaryOp, operand: &Expr) -> bool {
    let sign = match op {
        UnaryOp::Plus => '+',
        UnaryOp::Minus => '-',
        _ => return false,
    };
    match operand {
        Expr::Unary { op: inner, .. } if !inner.is_postfix() => {
            inner.as_str().starts_with(sign)
        }
        Expr::Literal(lit) => lit.text.starts_with(sign),
        _ => false,
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(primitive) => f.write_str(primitive.as_str()),
            TypeRef::Class(segments) => {
                for (idx, segment) in segments.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(&segment.name)?;
                    if let Some(args) = &segment.args {
                        f.write_str("<")?;
                        for (arg_idx, arg) in args.iter().enumerate() {
                            if arg_idx > 0 {
                                f.write_str(", ")?;
                            }
                            match arg {
                                TypeArg::Type(ty) => write!(f, "{ty}")?,
                                TypeArg::Wildcard(None) => f.write_str("?")?,
                                TypeArg::Wildcard(Some(WildcardBound::Extends(ty))) => {
                                    write!(f, "? extends {ty}")?
                                }
                                TypeArg::Wildcard(Some(WildcardBound::Super(ty))) => {
                                    write!(f, "? super {ty}")?
                                }
                            }
                        }
                        f.write_str(">")?;
                    }
                }
                Ok(())
            }
            TypeRef::Array(element) => write!(f, "{element}[]"),
        }
    }
}
