//! Owned Java syntax tree.
//!
//! Only the parts of Java that show up in advice classes are modelled in
//! detail. Every statement and declaration keeps its leading comments so a
//! rewrite can move them along with the code they describe.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use smol_str::SmolStr;

use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    Line,
    Block,
    Doc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comment {
    pub kind: CommentKind,
    /// Full comment text including the `//` or `/* */` delimiters.
    pub text: String,
    pub blank_line_before: bool,
}

impl Comment {
    pub fn line(text: &str) -> Self {
        Self {
            kind: CommentKind::Line,
            text: format!("// {text}"),
            blank_line_before: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewlineStyle {
    #[default]
    Lf,
    CrLf,
}

impl NewlineStyle {
    /// Picks the style of the first line break in `text`.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(idx) if idx > 0 && text.as_bytes()[idx - 1] == b'\r' => NewlineStyle::CrLf,
            _ => NewlineStyle::Lf,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NewlineStyle::Lf => "\n",
            NewlineStyle::CrLf => "\r\n",
        }
    }
}

/// Source text of a declaration or statement as it appeared in the input.
///
/// The text is stored with a fingerprint of the node's printed form taken
/// right after parsing. The printer reuses the text only while the node
/// still prints to that fingerprint, so any edit inside the node retires it.
#[derive(Debug, Clone, Default)]
pub struct Verbatim(Option<VerbatimText>);

#[derive(Debug, Clone)]
struct VerbatimText {
    text: String,
    starts_line: bool,
    fingerprint: u64,
}

impl Verbatim {
    pub(crate) fn new(text: String, starts_line: bool, fingerprint: u64) -> Self {
        Self(Some(VerbatimText {
            text,
            starts_line,
            fingerprint,
        }))
    }

    /// Drops the captured text; the node is printed from the tree.
    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// The captured text and whether it starts at the beginning of a line,
    /// if the node still prints to `fingerprint`.
    pub(crate) fn text_for(&self, fingerprint: impl FnOnce() -> u64) -> Option<(&str, bool)> {
        let verbatim = self.0.as_ref()?;
        (fingerprint() == verbatim.fingerprint)
            .then_some((verbatim.text.as_str(), verbatim.starts_line))
    }
}

// Layout is not part of a node's identity.
impl PartialEq for Verbatim {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

/// Blank lines and comments in front of a node (or in front of a closing
/// brace), as written.
///
/// Reused while the node keeps the comments and blank line flag it was read
/// with. A node that takes over another node's comments can take its
/// `Trivia` along.
#[derive(Debug, Clone, Default)]
pub struct Trivia(Option<TriviaText>);

#[derive(Debug, Clone)]
struct TriviaText {
    text: String,
    fingerprint: u64,
}

fn trivia_fingerprint(comments: &[Comment], blank_line_before: bool) -> u64 {
    let mut hasher = DefaultHasher::new();
    comments.hash(&mut hasher);
    blank_line_before.hash(&mut hasher);
    hasher.finish()
}

impl Trivia {
    pub(crate) fn new(text: &str, comments: &[Comment], blank_line_before: bool) -> Self {
        Self(Some(TriviaText {
            text: text.replace("\r\n", "\n"),
            fingerprint: trivia_fingerprint(comments, blank_line_before),
        }))
    }

    pub(crate) fn text_for(&self, comments: &[Comment], blank_line_before: bool) -> Option<&str> {
        let trivia = self.0.as_ref()?;
        (trivia_fingerprint(comments, blank_line_before) == trivia.fingerprint)
            .then_some(trivia.text.as_str())
    }

    /// Whether the text still matches `comments` and the blank line flag.
    pub fn fits(&self, comments: &[Comment], blank_line_before: bool) -> bool {
        self.text_for(comments, blank_line_before).is_some()
    }
}

impl PartialEq for Trivia {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    pub trailing_comments: Vec<Comment>,
    pub newline: NewlineStyle,
    /// Comments in front of the package or first import.
    pub leading: Trivia,
    /// Package and import header.
    pub header: Verbatim,
    /// Everything after the last type.
    pub closing: Trivia,
}

impl CompilationUnit {
    pub fn has_import(&self, path: &str) -> bool {
        self.imports
            .iter()
            .any(|import| !import.is_static && !import.is_wildcard && import.path == path)
    }

    /// Adds a single-type import unless an identical one exists.
    ///
    /// Returns `true` if the import list changed.
    pub fn add_import(&mut self, path: &str) -> bool {
        if self.has_import(path) {
            return false;
        }
        self.imports.push(ImportDecl {
            comments: Vec::new(),
            blank_line_before: false,
            is_static: false,
            is_wildcard: false,
            path: path.to_string(),
        });
        self.header.clear();
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageDecl {
    pub comments: Vec<Comment>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub comments: Vec<Comment>,
    pub blank_line_before: bool,
    pub is_static: bool,
    pub is_wildcard: bool,
    /// Dotted path without the trailing `.*`.
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Native,
    Synchronized,
    Transient,
    Volatile,
    Strictfp,
    Default,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Abstract => "abstract",
            Modifier::Native => "native",
            Modifier::Synchronized => "synchronized",
            Modifier::Transient => "transient",
            Modifier::Volatile => "volatile",
            Modifier::Strictfp => "strictfp",
            Modifier::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: SmolStr,
    pub bounds: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub id: NodeId,
    pub comments: Vec<Comment>,
    pub blank_line_before: bool,
    pub leading: Trivia,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub kind: TypeDeclKind,
    pub name: SmolStr,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub enum_constants: Vec<EnumConstant>,
    pub members: Vec<Member>,
    pub trailing_comments: Vec<Comment>,
    /// Layout in front of the closing brace, its indentation included.
    pub closing: Trivia,
    pub verbatim: Verbatim,
}

impl TypeDecl {
    /// A `class` with no members, printed from the tree.
    pub fn new_class(name: &str, modifiers: Vec<Modifier>) -> Self {
        Self {
            id: NodeId::fresh(),
            comments: Vec::new(),
            blank_line_before: false,
            leading: Trivia::default(),
            annotations: Vec::new(),
            modifiers,
            kind: TypeDeclKind::Class,
            name: name.into(),
            type_params: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            enum_constants: Vec::new(),
            members: Vec::new(),
            trailing_comments: Vec::new(),
            closing: Trivia::default(),
            verbatim: Verbatim::default(),
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn method(&self, id: NodeId) -> Option<&MethodDecl> {
        self.methods().find(|method| method.id == id)
    }

    pub fn method_mut(&mut self, id: NodeId) -> Option<&mut MethodDecl> {
        self.members.iter_mut().find_map(|member| match member {
            Member::Method(method) if method.id == id => Some(method),
            _ => None,
        })
    }

    pub fn member_index_of(&self, id: NodeId) -> Option<usize> {
        self.members.iter().position(|member| member.id() == Some(id))
    }

    /// Names of the types declared directly inside this one.
    pub fn member_type_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.members.iter().filter_map(|member| match member {
            Member::Type(ty) => Some(&ty.name),
            _ => None,
        })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.members
            .iter()
            .filter_map(|member| match member {
                Member::Field(field) => Some(field),
                _ => None,
            })
            .flat_map(|field| field.declarators.iter().map(|d| &d.name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub comments: Vec<Comment>,
    pub annotations: Vec<Annotation>,
    pub name: SmolStr,
    pub args: Option<Vec<Expr>>,
    pub body: Option<Vec<Member>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Type(TypeDecl),
    Initializer(InitializerDecl),
}

impl Member {
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Member::Method(method) => Some(method.id),
            Member::Type(ty) => Some(ty.id),
            Member::Field(_) | Member::Initializer(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub comments: Vec<Comment>,
    pub blank_line_before: bool,
    pub leading: Trivia,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    pub trailing_comment: Option<Comment>,
    pub verbatim: Verbatim,
}

impl FieldDecl {
    pub fn new(modifiers: Vec<Modifier>, ty: TypeRef, name: &str) -> Self {
        Self {
            comments: Vec::new(),
            blank_line_before: false,
            leading: Trivia::default(),
            annotations: Vec::new(),
            modifiers,
            ty,
            declarators: vec![VarDeclarator::new(name, None)],
            trailing_comment: None,
            verbatim: Verbatim::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub comments: Vec<Comment>,
    pub blank_line_before: bool,
    pub leading: Trivia,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub type_params: Vec<TypeParam>,
    /// `None` for constructors.
    pub return_type: Option<TypeRef>,
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub body: Option<Block>,
    pub verbatim: Verbatim,
}

impl MethodDecl {
    pub fn param(&self, id: NodeId) -> Option<&Param> {
        self.params.iter().find(|param| param.id == id)
    }

    pub fn param_mut(&mut self, id: NodeId) -> Option<&mut Param> {
        self.params.iter_mut().find(|param| param.id == id)
    }

    pub fn remove_param(&mut self, id: NodeId) -> Option<Param> {
        let idx = self.params.iter().position(|param| param.id == id)?;
        Some(self.params.remove(idx))
    }

    pub fn returns_void(&self) -> bool {
        matches!(self.return_type, None | Some(TypeRef::Void))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializerDecl {
    pub comments: Vec<Comment>,
    pub blank_line_before: bool,
    pub leading: Trivia,
    pub is_static: bool,
    pub body: Block,
    pub verbatim: Verbatim,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub varargs: bool,
    pub name: SmolStr,
}

impl Param {
    pub fn new(annotations: Vec<Annotation>, ty: TypeRef, name: &str) -> Self {
        Self {
            id: NodeId::fresh(),
            annotations,
            modifiers: Vec::new(),
            ty,
            varargs: false,
            name: name.into(),
        }
    }

    /// Type of the parameter as seen from the method body.
    pub fn declared_type(&self) -> TypeRef {
        if self.varargs {
            TypeRef::array(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub id: NodeId,
    pub name: SmolStr,
    /// Extra `[]` written after the name.
    pub dims: u8,
    pub init: Option<Expr>,
}

impl VarDeclarator {
    pub fn new(name: &str, init: Option<Expr>) -> Self {
        Self {
            id: NodeId::fresh(),
            name: name.into(),
            dims: 0,
            init,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDecl {
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
}

impl LocalVarDecl {
    pub fn single(ty: TypeRef, declarator: VarDeclarator) -> Self {
        Self {
            annotations: Vec::new(),
            modifiers: Vec::new(),
            ty,
            declarators: vec![declarator],
        }
    }

    /// Type of one declarator, including any `[]` written after its name.
    pub fn declarator_type(&self, declarator: &VarDeclarator) -> TypeRef {
        let mut ty = self.ty.clone();
        for _ in 0..declarator.dims {
            ty = TypeRef::array(ty);
        }
        ty
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    /// Comments between the last statement and the closing brace.
    pub trailing_comments: Vec<Comment>,
    /// Layout in front of the closing brace, its indentation included.
    pub closing: Trivia,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            trailing_comments: Vec::new(),
            closing: Trivia::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub comments: Vec<Comment>,
    /// Comment on the same line after the statement.
    pub trailing_comment: Option<Comment>,
    pub blank_line_before: bool,
    pub leading: Trivia,
    pub kind: StmtKind,
    pub verbatim: Verbatim,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            comments: Vec::new(),
            trailing_comment: None,
            blank_line_before: false,
            leading: Trivia::default(),
            kind,
            verbatim: Verbatim::default(),
        }
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, StmtKind::Return(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Block),
    LocalVar(LocalVarDecl),
    LocalClass(Box<TypeDecl>),
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        var: LocalVarDecl,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Try {
        resources: Vec<Resource>,
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Throw(Expr),
    Break(Option<SmolStr>),
    Continue(Option<SmolStr>),
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Synchronized {
        lock: Expr,
        body: Block,
    },
    Labeled {
        label: SmolStr,
        body: Box<Stmt>,
    },
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    LocalVar(LocalVarDecl),
    Exprs(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Decl(LocalVarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: CatchParam,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchParam {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    /// More than one entry for multi-catch.
    pub types: Vec<TypeRef>,
    pub name: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowBody {
    /// `case X -> { ... }`
    Block,
    /// `case X -> expr;` or `case X -> throw ...;`
    Single,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub comments: Vec<Comment>,
    /// Empty for `default`.
    pub labels: Vec<Expr>,
    pub is_default: bool,
    /// `Some` for `->` cases.
    pub arrow: Option<ArrowBody>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameExpr {
    pub id: NodeId,
    pub name: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    TextBlock,
    Bool,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Literal as written, quotes and suffixes included.
    pub text: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }

    pub fn has_side_effects(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::BitOr => 3,
            BinaryOp::BitXor => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::Eq | BinaryOp::Ne => 6,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 7,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 10,
        }
    }
}

/// Binding power of `instanceof`, shared with the relational operators.
pub const INSTANCEOF_PRECEDENCE: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::UShr => ">>>=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    pub id: NodeId,
    pub modifiers: Vec<Modifier>,
    pub ty: Option<TypeRef>,
    pub name: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternBinding {
    pub id: NodeId,
    pub is_final: bool,
    pub name: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewObject {
    /// `outer.new Inner()`
    pub outer: Option<Expr>,
    pub ty: TypeRef,
    pub args: Vec<Expr>,
    /// Anonymous class body.
    pub body: Option<Vec<Member>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(NameExpr),
    Literal(Literal),
    FieldAccess {
        receiver: Box<Expr>,
        name: SmolStr,
    },
    MethodCall {
        receiver: Option<Box<Expr>>,
        type_args: Vec<TypeRef>,
        name: SmolStr,
        args: Vec<Expr>,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: TypeRef,
        binding: Option<PatternBinding>,
    },
    New(Box<NewObject>),
    NewArray {
        elem_ty: TypeRef,
        /// One entry per `[]`; `None` for an empty pair.
        dims: Vec<Option<Expr>>,
        init: Option<Vec<Expr>>,
    },
    ArrayInit(Vec<Expr>),
    Lambda {
        params: Vec<LambdaParam>,
        parenthesized: bool,
        body: LambdaBody,
    },
    MethodRef {
        target: Box<Expr>,
        name: SmolStr,
    },
    ClassLit(TypeRef),
    This,
    Super,
    Paren(Box<Expr>),
    /// A type in expression position, e.g. the target of `int[]::new`.
    TypeExpr(TypeRef),
}

impl Expr {
    pub fn name(name: &str) -> Self {
        Expr::Name(NameExpr {
            id: NodeId::fresh(),
            name: name.into(),
        })
    }

    pub fn field_access(receiver: Expr, name: &str) -> Self {
        Expr::FieldAccess {
            receiver: Box::new(receiver),
            name: name.into(),
        }
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal {
            kind: LiteralKind::Int,
            text: value.to_string().into(),
        })
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Literal {
            kind: LiteralKind::Bool,
            text: if value { "true" } else { "false" }.into(),
        })
    }

    pub fn null() -> Self {
        Expr::Literal(Literal {
            kind: LiteralKind::Null,
            text: "null".into(),
        })
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            target: Box::new(target),
            op: AssignOp::Assign,
            value: Box::new(value),
        }
    }

    pub fn as_name(&self) -> Option<&NameExpr> {
        match self {
            Expr::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Whether the expression may legally stand alone as `expr;`.
    pub fn is_statement_expression(&self) -> bool {
        match self {
            Expr::Assign { .. } | Expr::MethodCall { .. } | Expr::New(_) => true,
            Expr::Unary { op, .. } => op.has_side_effects(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSegment {
    pub name: SmolStr,
    /// `None` without `<...>`, `Some(vec![])` for the diamond.
    pub args: Option<Vec<TypeArg>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeArg {
    Type(TypeRef),
    Wildcard(Option<WildcardBound>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WildcardBound {
    Extends(TypeRef),
    Super(TypeRef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Void,
    Primitive(PrimitiveType),
    Class(Vec<TypeSegment>),
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// A raw class type from a dotted name.
    pub fn class(dotted: &str) -> Self {
        TypeRef::Class(
            dotted
                .split('.')
                .map(|segment| TypeSegment {
                    name: segment.into(),
                    args: None,
                })
                .collect(),
        )
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Name as written, e.g. `Advice.Argument`.
    pub name: String,
    pub args: AnnotationArgs,
}

impl Annotation {
    pub fn marker(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: AnnotationArgs::Marker,
        }
    }

    pub fn single(name: &str, value: ElementValue) -> Self {
        Self {
            name: name.to_string(),
            args: AnnotationArgs::Single(value),
        }
    }

    pub fn normal(name: &str, pairs: Vec<ElementPair>) -> Self {
        Self {
            name: name.to_string(),
            args: AnnotationArgs::Normal(pairs),
        }
    }

    /// Looks up an element; `value` also matches the single-member form.
    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        match &self.args {
            AnnotationArgs::Marker => None,
            AnnotationArgs::Single(value) => (name == "value").then_some(value),
            AnnotationArgs::Normal(pairs) => pairs
                .iter()
                .find(|pair| pair.name == name)
                .map(|pair| &pair.value),
        }
    }

    /// Removes an element, collapsing the annotation to the shortest form
    /// that still carries the remaining elements.
    ///
    /// Returns `true` if the element was present.
    pub fn remove_element(&mut self, name: &str) -> bool {
        let removed = match &mut self.args {
            AnnotationArgs::Marker => false,
            AnnotationArgs::Single(_) => name == "value",
            AnnotationArgs::Normal(pairs) => {
                let before = pairs.len();
                pairs.retain(|pair| pair.name != name);
                before != pairs.len()
            }
        };
        if removed {
            if matches!(self.args, AnnotationArgs::Single(_)) {
                self.args = AnnotationArgs::Marker;
            } else {
                self.collapse();
            }
        }
        removed
    }

    fn collapse(&mut self) {
        let AnnotationArgs::Normal(pairs) = &mut self.args else {
            return;
        };
        match pairs.len() {
            0 => self.args = AnnotationArgs::Marker,
            1 if pairs[0].name == "value" => {
                if let Some(pair) = pairs.pop() {
                    self.args = AnnotationArgs::Single(pair.value);
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationArgs {
    /// `@Foo`
    Marker,
    /// `@Foo(value)`
    Single(ElementValue),
    /// `@Foo(a = 1, b = 2)`; empty for `@Foo()`.
    Normal(Vec<ElementPair>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementPair {
    pub name: SmolStr,
    pub value: ElementValue,
}

impl ElementPair {
    pub fn new(name: &str, value: ElementValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Expr(Expr),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            ElementValue::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self.as_expr()? {
            Expr::Literal(lit) => Some(lit),
            Expr::Paren(inner) => match &**inner {
                Expr::Literal(lit) => Some(lit),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        let lit = self.as_literal()?;
        match (lit.kind, lit.text.as_str()) {
            (LiteralKind::Bool, "true") => Some(true),
            (LiteralKind::Bool, "false") => Some(false),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        let lit = self.as_literal()?;
        if lit.kind != LiteralKind::Int {
            return None;
        }
        parse_int_literal(&lit.text)
    }

    /// Contents of a plain string literal, escapes left as written.
    pub fn as_string(&self) -> Option<&str> {
        let lit = self.as_literal()?;
        if lit.kind != LiteralKind::String {
            return None;
        }
        lit.text.strip_prefix('"')?.strip_suffix('"')
    }
}

fn parse_int_literal(text: &str) -> Option<i32> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    let value = if let Some(hex) = lower.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).ok()? as i32
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u32::from_str_radix(bin, 2).ok()? as i32
    } else if lower.len() > 1 && lower.starts_with('0') {
        u32::from_str_radix(&lower[1..], 8).ok()? as i32
    } else {
        lower.parse::<i32>().ok()?
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(value: i64) -> ElementValue {
        ElementValue::Expr(Expr::int(value))
    }

    #[test]
    fn removing_last_pair_leaves_marker() {
        let mut ann = Annotation::normal(
            "Advice.Return",
            vec![ElementPair::new("readOnly", ElementValue::Expr(Expr::bool(false)))],
        );
        assert!(ann.remove_element("readOnly"));
        assert_eq!(ann.args, AnnotationArgs::Marker);
    }

    #[test]
    fn removing_to_lone_value_uses_single_member_form() {
        let mut ann = Annotation::normal(
            "Advice.Argument",
            vec![
                ElementPair::new("value", int(2)),
                ElementPair::new("readOnly", ElementValue::Expr(Expr::bool(false))),
            ],
        );
        assert!(ann.remove_element("readOnly"));
        assert_eq!(ann.args, AnnotationArgs::Single(int(2)));
    }

    #[test]
    fn removing_keeps_other_pairs() {
        let mut ann = Annotation::normal(
            "Advice.Argument",
            vec![
                ElementPair::new("value", int(0)),
                ElementPair::new("typing", ElementValue::Expr(Expr::name("DYNAMIC"))),
                ElementPair::new("readOnly", ElementValue::Expr(Expr::bool(false))),
            ],
        );
        assert!(ann.remove_element("readOnly"));
        let AnnotationArgs::Normal(pairs) = &ann.args else {
            panic!("expected normal annotation, got {:?}", ann.args);
        };
        let names: Vec<_> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["value", "typing"]);
    }

    #[test]
    fn missing_element_is_left_alone() {
        let mut ann = Annotation::single("Advice.Argument", int(1));
        assert!(!ann.remove_element("readOnly"));
        assert_eq!(ann.element("value"), Some(&int(1)));
    }

    #[test]
    fn int_literals_in_other_radixes() {
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("010"), Some(8));
        assert_eq!(parse_int_literal("1_000"), Some(1000));
        assert_eq!(parse_int_literal("0"), Some(0));
    }

    #[test]
    fn detects_crlf() {
        assert_eq!(NewlineStyle::detect("a\r\nb"), NewlineStyle::CrLf);
        assert_eq!(NewlineStyle::detect("a\nb\r\n"), NewlineStyle::Lf);
        assert_eq!(NewlineStyle::detect("abc"), NewlineStyle::Lf);
    }
}
