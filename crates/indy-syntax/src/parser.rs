use smol_str::SmolStr;

use crate::ast::*;
use crate::lexer::{Token, TokenKind};
use crate::printer;
use crate::{NodeId, ParseError};

type PResult<T> = Result<T, ParseError>;

/// Recursive descent parser over a fully lexed token stream.
///
/// Speculative lookahead (casts, local variable declarations) rewinds `pos`;
/// comments are only taken on committed paths, so rewinding never loses them.
pub(crate) struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Set while parsing `case` labels, where `X ->` is not a lambda.
    no_lambda: bool,
    /// Token whose first comment was taken as a trailing comment, and the end
    /// of that comment.
    trailing_end: Option<(usize, usize)>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            input,
            tokens,
            pos: 0,
            no_lambda: false,
            trailing_end: None,
        }
    }

    pub(crate) fn parse_compilation_unit(mut self) -> PResult<CompilationUnit> {
        let newline = NewlineStyle::detect(self.input);
        let mut header_start = None;

        let mut package = None;
        if self.at(TokenKind::PackageKw) {
            let (comments, _) = self.take_leading_comments();
            header_start = Some(self.pos);
            self.bump();
            let name = self.parse_qualified_name("expected package name")?;
            self.expect(TokenKind::Semicolon, "expected `;` after package declaration")?;
            package = Some(PackageDecl { comments, name });
        }

        let mut imports = Vec::new();
        while self.at(TokenKind::ImportKw) {
            imports.push(self.parse_import(&mut header_start)?);
        }
        let (leading, header) = match header_start {
            Some(start) => {
                let comments = match (&package, imports.first()) {
                    (Some(package), _) => package.comments.as_slice(),
                    (None, Some(import)) => import.comments.as_slice(),
                    (None, None) => &[],
                };
                let fingerprint = printer::header_fingerprint(package.as_ref(), &imports);
                (
                    self.trivia(start, comments, false),
                    self.verbatim_from(start, fingerprint),
                )
            }
            None => (Trivia::default(), Verbatim::default()),
        };

        let mut types = Vec::new();
        loop {
            if self.at(TokenKind::Semicolon) {
                self.bump();
                continue;
            }
            if self.at(TokenKind::Eof) {
                break;
            }
            let (comments, blank) = self.take_leading_comments();
            let start = self.pos;
            let decl_leading = self.trivia(start, &comments, blank);
            let (annotations, modifiers) = self.parse_modifiers()?;
            let mut decl = self.parse_type_decl_rest(annotations, modifiers, start)?;
            decl.comments = comments;
            decl.blank_line_before = blank;
            decl.leading = decl_leading;
            types.push(decl);
        }
        let eof = self.pos;
        let (trailing_comments, _) = self.take_leading_comments();
        let closing = self.closing_trivia(eof, &trailing_comments);

        Ok(CompilationUnit {
            package,
            imports,
            types,
            trailing_comments,
            newline,
            leading,
            header,
            closing,
        })
    }

    fn parse_import(&mut self, header_start: &mut Option<usize>) -> PResult<ImportDecl> {
        let (comments, blank_line_before) = self.take_leading_comments();
        header_start.get_or_insert(self.pos);
        self.bump();
        let is_static = self.eat(TokenKind::StaticKw);
        let mut path = self.expect_ident("expected import path")?.to_string();
        let mut is_wildcard = false;
        while self.eat(TokenKind::Dot) {
            if self.eat(TokenKind::Star) {
                is_wildcard = true;
                break;
            }
            path.push('.');
            path.push_str(&self.expect_ident("expected identifier in import path")?);
        }
        self.expect(TokenKind::Semicolon, "expected `;` after import")?;
        Ok(ImportDecl {
            comments,
            blank_line_before,
            is_static,
            is_wildcard,
            path,
        })
    }

    fn parse_type_decl_rest(
        &mut self,
        annotations: Vec<Annotation>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> PResult<TypeDecl> {
        let kind = match self.current() {
            TokenKind::ClassKw => TypeDeclKind::Class,
            TokenKind::InterfaceKw => TypeDeclKind::Interface,
            TokenKind::EnumKw => TypeDeclKind::Enum,
            TokenKind::At if self.nth(1) == TokenKind::InterfaceKw => {
                return Err(self.error_here("annotation type declarations are not supported"))
            }
            TokenKind::Identifier if self.at_contextual("record") => {
                return Err(self.error_here("record declarations are not supported"))
            }
            _ => return Err(self.error_here("expected `class`, `interface` or `enum`")),
        };
        self.bump();
        let name = self.expect_ident("expected type name")?;
        let type_params = self.parse_type_params_opt()?;

        let mut extends = Vec::new();
        if self.eat(TokenKind::ExtendsKw) {
            extends = self.parse_type_list()?;
        }
        let mut implements = Vec::new();
        if self.eat(TokenKind::ImplementsKw) {
            implements = self.parse_type_list()?;
        }
        if self.at_contextual("permits") {
            return Err(self.error_here("sealed type hierarchies are not supported"));
        }

        self.expect(TokenKind::LBrace, "expected `{` to open the type body")?;
        let enum_constants = if kind == TypeDeclKind::Enum {
            self.parse_enum_constants()?
        } else {
            Vec::new()
        };
        let (members, trailing_comments, closing) = self.parse_members_until_rbrace()?;

        let mut decl = TypeDecl {
            id: NodeId::fresh(),
            comments: Vec::new(),
            blank_line_before: false,
            leading: Trivia::default(),
            annotations,
            modifiers,
            kind,
            name,
            type_params,
            extends,
            implements,
            enum_constants,
            members,
            trailing_comments,
            closing,
            verbatim: Verbatim::default(),
        };
        decl.verbatim = self.verbatim_from(start, printer::type_fingerprint(&decl));
        Ok(decl)
    }

    /// Parses members up to and including the closing `}`.
    fn parse_members_until_rbrace(&mut self) -> PResult<(Vec<Member>, Vec<Comment>, Trivia)> {
        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("expected `}` to close the type body"));
            }
            if let Some(member) = self.parse_member()? {
                members.push(member);
            }
        }
        let rbrace = self.pos;
        let (trailing, _) = self.take_leading_comments();
        let closing = self.closing_trivia(rbrace, &trailing);
        self.bump();
        Ok((members, trailing, closing))
    }

    fn parse_class_body(&mut self) -> PResult<Vec<Member>> {
        self.expect(TokenKind::LBrace, "expected `{`")?;
        let (members, _, _) = self.parse_members_until_rbrace()?;
        Ok(members)
    }

    fn parse_enum_constants(&mut self) -> PResult<Vec<EnumConstant>> {
        let mut constants = Vec::new();
        loop {
            if self.eat(TokenKind::Semicolon) || self.at(TokenKind::RBrace) {
                break;
            }
            let (comments, _) = self.take_leading_comments();
            let (annotations, _) = self.parse_modifiers()?;
            let name = self.expect_ident("expected enum constant")?;
            let args = if self.at(TokenKind::LParen) {
                Some(self.parse_args()?)
            } else {
                None
            };
            let body = if self.at(TokenKind::LBrace) {
                Some(self.parse_class_body()?)
            } else {
                None
            };
            constants.push(EnumConstant {
                comments,
                annotations,
                name,
                args,
                body,
            });
            if self.eat(TokenKind::Comma) {
                continue;
            }
            if self.eat(TokenKind::Semicolon) || self.at(TokenKind::RBrace) {
                break;
            }
            return Err(self.error_here("expected `,`, `;` or `}` after enum constant"));
        }
        Ok(constants)
    }

    fn parse_member(&mut self) -> PResult<Option<Member>> {
        let (comments, blank_line_before) = self.take_leading_comments();
        let leading = self.trivia(self.pos, &comments, blank_line_before);
        if self.eat(TokenKind::Semicolon) {
            return Ok(None);
        }
        let start = self.pos;

        if self.at(TokenKind::LBrace)
            || (self.at(TokenKind::StaticKw) && self.nth(1) == TokenKind::LBrace)
        {
            let is_static = self.eat(TokenKind::StaticKw);
            let body = self.parse_block()?;
            let mut init = InitializerDecl {
                comments,
                blank_line_before,
                leading,
                is_static,
                body,
                verbatim: Verbatim::default(),
            };
            init.verbatim = self.verbatim_from(start, printer::initializer_fingerprint(&init));
            return Ok(Some(Member::Initializer(init)));
        }

        let (annotations, modifiers) = self.parse_modifiers()?;
        if matches!(
            self.current(),
            TokenKind::ClassKw | TokenKind::InterfaceKw | TokenKind::EnumKw | TokenKind::At
        ) || self.at_contextual("record")
        {
            let mut decl = self.parse_type_decl_rest(annotations, modifiers, start)?;
            decl.comments = comments;
            decl.blank_line_before = blank_line_before;
            decl.leading = leading;
            return Ok(Some(Member::Type(decl)));
        }

        let type_params = self.parse_type_params_opt()?;
        let (return_type, name) = if self.at_ident() && self.nth(1) == TokenKind::LParen {
            (None, self.bump_text())
        } else {
            let ty = if self.eat(TokenKind::VoidKw) {
                TypeRef::Void
            } else {
                self.parse_type()?
            };
            (Some(ty), self.expect_ident("expected member name")?)
        };

        if self.at(TokenKind::LParen) {
            let mut method = MethodDecl {
                id: NodeId::fresh(),
                comments,
                blank_line_before,
                leading,
                annotations,
                modifiers,
                type_params,
                return_type,
                name,
                params: Vec::new(),
                throws: Vec::new(),
                body: None,
                verbatim: Verbatim::default(),
            };
            self.parse_method_rest(&mut method)?;
            method.verbatim = self.verbatim_from(start, printer::method_fingerprint(&method));
            return Ok(Some(Member::Method(method)));
        }

        let Some(ty) = return_type else {
            return Err(self.error_here("expected field or method declaration"));
        };
        let mut declarators = vec![self.parse_declarator_rest(name)?];
        while self.eat(TokenKind::Comma) {
            let name = self.expect_ident("expected field name")?;
            declarators.push(self.parse_declarator_rest(name)?);
        }
        self.expect(TokenKind::Semicolon, "expected `;` after field declaration")?;
        let trailing_comment = self.take_trailing_comment();
        let mut field = FieldDecl {
            comments,
            blank_line_before,
            leading,
            annotations,
            modifiers,
            ty,
            declarators,
            trailing_comment,
            verbatim: Verbatim::default(),
        };
        field.verbatim = self.verbatim_from(start, printer::field_fingerprint(&field));
        Ok(Some(Member::Field(field)))
    }

    fn parse_method_rest(&mut self, method: &mut MethodDecl) -> PResult<()> {
        method.params = self.parse_params()?;
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            method.return_type = method.return_type.take().map(TypeRef::array);
        }
        if self.eat(TokenKind::ThrowsKw) {
            method.throws = self.parse_type_list()?;
        }
        if self.at(TokenKind::DefaultKw) {
            return Err(self.error_here("annotation element defaults are not supported"));
        }
        method.body = if self.eat(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_block()?)
        };
        Ok(())
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(TokenKind::LParen, "expected `(` to open the parameter list")?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "expected `)` to close the parameter list")?;
        Ok(params)
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let (annotations, modifiers) = self.parse_modifiers()?;
        let mut ty = self.parse_type()?;
        let varargs = self.eat(TokenKind::Ellipsis);
        if self.at(TokenKind::ThisKw) {
            return Err(self.error_here("receiver parameters are not supported"));
        }
        let name = self.expect_ident("expected parameter name")?;
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            ty = TypeRef::array(ty);
        }
        Ok(Param {
            id: NodeId::fresh(),
            annotations,
            modifiers,
            ty,
            varargs,
            name,
        })
    }

    fn parse_modifiers(&mut self) -> PResult<(Vec<Annotation>, Vec<Modifier>)> {
        let mut annotations = Vec::new();
        let mut modifiers = Vec::new();
        loop {
            let modifier = match self.current() {
                TokenKind::At if self.nth(1) != TokenKind::InterfaceKw => {
                    annotations.push(self.parse_annotation()?);
                    continue;
                }
                TokenKind::PublicKw => Modifier::Public,
                TokenKind::ProtectedKw => Modifier::Protected,
                TokenKind::PrivateKw => Modifier::Private,
                TokenKind::StaticKw => Modifier::Static,
                TokenKind::FinalKw => Modifier::Final,
                TokenKind::AbstractKw => Modifier::Abstract,
                TokenKind::NativeKw => Modifier::Native,
                TokenKind::SynchronizedKw if self.nth(1) != TokenKind::LParen => {
                    Modifier::Synchronized
                }
                TokenKind::TransientKw => Modifier::Transient,
                TokenKind::VolatileKw => Modifier::Volatile,
                TokenKind::StrictfpKw => Modifier::Strictfp,
                TokenKind::DefaultKw
                    if !matches!(self.nth(1), TokenKind::Colon | TokenKind::Arrow) =>
                {
                    Modifier::Default
                }
                _ => break,
            };
            self.bump();
            modifiers.push(modifier);
        }
        Ok((annotations, modifiers))
    }

    fn parse_annotation(&mut self) -> PResult<Annotation> {
        self.expect(TokenKind::At, "expected `@`")?;
        let name = self.parse_qualified_name("expected annotation name")?;
        if !self.eat(TokenKind::LParen) {
            return Ok(Annotation {
                name,
                args: AnnotationArgs::Marker,
            });
        }
        if self.eat(TokenKind::RParen) {
            return Ok(Annotation {
                name,
                args: AnnotationArgs::Normal(Vec::new()),
            });
        }
        let args = if self.at_ident() && self.nth(1) == TokenKind::Eq {
            let mut pairs = Vec::new();
            loop {
                let key = self.expect_ident("expected annotation element name")?;
                self.expect(TokenKind::Eq, "expected `=` after annotation element name")?;
                let value = self.parse_element_value()?;
                pairs.push(ElementPair { name: key, value });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            AnnotationArgs::Normal(pairs)
        } else {
            AnnotationArgs::Single(self.parse_element_value()?)
        };
        self.expect(TokenKind::RParen, "expected `)` to close annotation arguments")?;
        Ok(Annotation { name, args })
    }

    fn parse_element_value(&mut self) -> PResult<ElementValue> {
        match self.current() {
            TokenKind::At => Ok(ElementValue::Annotation(Box::new(self.parse_annotation()?))),
            TokenKind::LBrace => {
                self.bump();
                let mut values = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    values.push(self.parse_element_value()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "expected `}` to close the element array")?;
                Ok(ElementValue::Array(values))
            }
            _ => Ok(ElementValue::Expr(self.parse_ternary()?)),
        }
    }

    fn parse_qualified_name(&mut self, message: &str) -> PResult<String> {
        let mut name = self.expect_ident(message)?.to_string();
        while self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Identifier {
            self.bump();
            name.push('.');
            name.push_str(&self.bump_text());
        }
        Ok(name)
    }

    fn parse_type_params_opt(&mut self) -> PResult<Vec<TypeParam>> {
        if !self.eat(TokenKind::Less) {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        loop {
            while self.at(TokenKind::At) {
                self.parse_annotation()?;
            }
            let name = self.expect_ident("expected type parameter name")?;
            let mut bounds = Vec::new();
            if self.eat(TokenKind::ExtendsKw) {
                loop {
                    bounds.push(self.parse_type()?);
                    if !self.eat(TokenKind::Amp) {
                        break;
                    }
                }
            }
            params.push(TypeParam { name, bounds });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Greater, "expected `>` to close type parameters")?;
        Ok(params)
    }

    fn parse_type_list(&mut self) -> PResult<Vec<TypeRef>> {
        let mut types = Vec::new();
        loop {
            types.push(self.parse_type()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(types)
    }

    fn parse_type(&mut self) -> PResult<TypeRef> {
        // Type-use annotations carry no meaning for the rewrite.
        while self.at(TokenKind::At) && self.nth(1) != TokenKind::InterfaceKw {
            self.parse_annotation()?;
        }
        let mut ty = if let Some(primitive) = primitive_type(self.current()) {
            self.bump();
            TypeRef::Primitive(primitive)
        } else if self.at_ident() {
            TypeRef::Class(self.parse_class_type_segments()?)
        } else {
            return Err(self.error_here("expected type"));
        };
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            ty = TypeRef::array(ty);
        }
        Ok(ty)
    }

    fn parse_class_type_segments(&mut self) -> PResult<Vec<TypeSegment>> {
        let mut segments = Vec::new();
        loop {
            let name = self.expect_ident("expected type name")?;
            let args = if self.at(TokenKind::Less) {
                Some(self.parse_type_args()?)
            } else {
                None
            };
            segments.push(TypeSegment { name, args });
            if self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Identifier {
                self.bump();
                continue;
            }
            return Ok(segments);
        }
    }

    fn parse_type_args(&mut self) -> PResult<Vec<TypeArg>> {
        self.expect(TokenKind::Less, "expected `<`")?;
        let mut args = Vec::new();
        if self.eat(TokenKind::Greater) {
            return Ok(args);
        }
        loop {
            while self.at(TokenKind::At) {
                self.parse_annotation()?;
            }
            if self.eat(TokenKind::Question) {
                let bound = if self.eat(TokenKind::ExtendsKw) {
                    Some(WildcardBound::Extends(self.parse_type()?))
                } else if self.eat(TokenKind::SuperKw) {
                    Some(WildcardBound::Super(self.parse_type()?))
                } else {
                    None
                };
                args.push(TypeArg::Wildcard(bound));
            } else {
                args.push(TypeArg::Type(self.parse_type()?));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Greater, "expected `>` to close type arguments")?;
        Ok(args)
    }

    fn parse_declarator_rest(&mut self, name: SmolStr) -> PResult<VarDeclarator> {
        let mut dims = 0u8;
        while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
            self.bump();
            self.bump();
            dims = dims.saturating_add(1);
        }
        let init = if self.eat(TokenKind::Eq) {
            Some(self.parse_var_init()?)
        } else {
            None
        };
        Ok(VarDeclarator {
            id: NodeId::fresh(),
            name,
            dims,
            init,
        })
    }

    fn parse_var_init(&mut self) -> PResult<Expr> {
        if self.at(TokenKind::LBrace) {
            Ok(Expr::ArrayInit(self.parse_array_init()?))
        } else {
            self.parse_expr()
        }
    }

    fn parse_array_init(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokenKind::LBrace, "expected `{`")?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            items.push(self.parse_var_init()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "expected `}` to close the array initializer")?;
        Ok(items)
    }

    fn parse_local_var_rest(
        &mut self,
        annotations: Vec<Annotation>,
        modifiers: Vec<Modifier>,
    ) -> PResult<LocalVarDecl> {
        let ty = self.parse_type()?;
        let mut declarators = Vec::new();
        loop {
            let name = self.expect_ident("expected variable name")?;
            declarators.push(self.parse_declarator_rest(name)?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(LocalVarDecl {
            annotations,
            modifiers,
            ty,
            declarators,
        })
    }

    // Statements

    pub(crate) fn parse_block(&mut self) -> PResult<Block> {
        self.expect(TokenKind::LBrace, "expected `{`")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("expected `}` to close the block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        let rbrace = self.pos;
        let (trailing_comments, _) = self.take_leading_comments();
        let closing = self.closing_trivia(rbrace, &trailing_comments);
        self.bump();
        Ok(Block {
            stmts,
            trailing_comments,
            closing,
        })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let (comments, blank_line_before) = self.take_leading_comments();
        let start = self.pos;
        let leading = self.trivia(start, &comments, blank_line_before);
        let kind = self.parse_stmt_kind()?;
        let trailing_comment = self.take_trailing_comment();
        let mut stmt = Stmt {
            comments,
            trailing_comment,
            blank_line_before,
            leading,
            kind,
            verbatim: Verbatim::default(),
        };
        stmt.verbatim = self.verbatim_from(start, printer::stmt_fingerprint(&stmt));
        Ok(stmt)
    }

    fn parse_stmt_kind(&mut self) -> PResult<StmtKind> {
        match self.current() {
            TokenKind::LBrace => Ok(StmtKind::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.bump();
                Ok(StmtKind::Empty)
            }
            TokenKind::IfKw => {
                self.bump();
                let cond = self.parse_paren_expr()?;
                let then_branch = Box::new(self.parse_stmt()?);
                let else_branch = if self.eat(TokenKind::ElseKw) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                Ok(StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            TokenKind::WhileKw => {
                self.bump();
                let cond = self.parse_paren_expr()?;
                let body = Box::new(self.parse_stmt()?);
                Ok(StmtKind::While { cond, body })
            }
            TokenKind::DoKw => {
                self.bump();
                let body = Box::new(self.parse_stmt()?);
                self.expect(TokenKind::WhileKw, "expected `while` after `do` body")?;
                let cond = self.parse_paren_expr()?;
                self.expect(TokenKind::Semicolon, "expected `;` after `do`/`while`")?;
                Ok(StmtKind::DoWhile { body, cond })
            }
            TokenKind::ForKw => self.parse_for(),
            TokenKind::TryKw => self.parse_try(),
            TokenKind::SwitchKw => self.parse_switch(),
            TokenKind::ReturnKw => {
                self.bump();
                if self.eat(TokenKind::Semicolon) {
                    return Ok(StmtKind::Return(None));
                }
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "expected `;` after return value")?;
                Ok(StmtKind::Return(Some(value)))
            }
            TokenKind::ThrowKw => {
                self.bump();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "expected `;` after throw")?;
                Ok(StmtKind::Throw(value))
            }
            TokenKind::BreakKw | TokenKind::ContinueKw => {
                let is_break = self.at(TokenKind::BreakKw);
                self.bump();
                let label = if self.at_ident() {
                    Some(self.bump_text())
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, "expected `;`")?;
                Ok(if is_break {
                    StmtKind::Break(label)
                } else {
                    StmtKind::Continue(label)
                })
            }
            TokenKind::SynchronizedKw if self.nth(1) == TokenKind::LParen => {
                self.bump();
                let lock = self.parse_paren_expr()?;
                let body = self.parse_block()?;
                Ok(StmtKind::Synchronized { lock, body })
            }
            TokenKind::AssertKw => {
                self.bump();
                let cond = self.parse_expr()?;
                let message = if self.eat(TokenKind::Colon) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, "expected `;` after assert")?;
                Ok(StmtKind::Assert { cond, message })
            }
            TokenKind::ClassKw
            | TokenKind::InterfaceKw
            | TokenKind::EnumKw
            | TokenKind::AbstractKw
            | TokenKind::FinalKw
            | TokenKind::At => {
                let start = self.pos;
                let (annotations, modifiers) = self.parse_modifiers()?;
                if matches!(
                    self.current(),
                    TokenKind::ClassKw | TokenKind::InterfaceKw | TokenKind::EnumKw
                ) {
                    let decl = self.parse_type_decl_rest(annotations, modifiers, start)?;
                    return Ok(StmtKind::LocalClass(Box::new(decl)));
                }
                let decl = self.parse_local_var_rest(annotations, modifiers)?;
                self.expect(TokenKind::Semicolon, "expected `;` after local variable")?;
                Ok(StmtKind::LocalVar(decl))
            }
            TokenKind::Identifier if self.nth(1) == TokenKind::Colon => {
                let label = self.bump_text();
                self.bump();
                let body = Box::new(self.parse_stmt()?);
                Ok(StmtKind::Labeled { label, body })
            }
            _ => {
                if self.at_local_var_decl() {
                    let decl = self.parse_local_var_rest(Vec::new(), Vec::new())?;
                    self.expect(TokenKind::Semicolon, "expected `;` after local variable")?;
                    return Ok(StmtKind::LocalVar(decl));
                }
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "expected `;` after expression")?;
                Ok(StmtKind::Expr(expr))
            }
        }
    }

    fn parse_for(&mut self) -> PResult<StmtKind> {
        self.bump();
        self.expect(TokenKind::LParen, "expected `(` after `for`")?;
        let init = if self.at(TokenKind::Semicolon) {
            None
        } else if self.at(TokenKind::FinalKw) || self.at(TokenKind::At) || self.at_local_var_decl()
        {
            let (annotations, modifiers) = self.parse_modifiers()?;
            let ty = self.parse_type()?;
            let name = self.expect_ident("expected variable name")?;
            if self.eat(TokenKind::Colon) {
                let iterable = self.parse_expr()?;
                self.expect(TokenKind::RParen, "expected `)` after for-each header")?;
                let body = Box::new(self.parse_stmt()?);
                return Ok(StmtKind::ForEach {
                    var: LocalVarDecl {
                        annotations,
                        modifiers,
                        ty,
                        declarators: vec![VarDeclarator {
                            id: NodeId::fresh(),
                            name,
                            dims: 0,
                            init: None,
                        }],
                    },
                    iterable,
                    body,
                });
            }
            let mut declarators = vec![self.parse_declarator_rest(name)?];
            while self.eat(TokenKind::Comma) {
                let name = self.expect_ident("expected variable name")?;
                declarators.push(self.parse_declarator_rest(name)?);
            }
            Some(ForInit::LocalVar(LocalVarDecl {
                annotations,
                modifiers,
                ty,
                declarators,
            }))
        } else {
            Some(ForInit::Exprs(self.parse_expr_list()?))
        };
        self.expect(TokenKind::Semicolon, "expected `;` in for header")?;
        let cond = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon, "expected `;` in for header")?;
        let update = if self.at(TokenKind::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect(TokenKind::RParen, "expected `)` after for header")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> PResult<StmtKind> {
        self.bump();
        let mut resources = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.at(TokenKind::RParen) {
                if self.at(TokenKind::FinalKw) || self.at(TokenKind::At) || self.at_local_var_decl()
                {
                    let (annotations, modifiers) = self.parse_modifiers()?;
                    resources.push(Resource::Decl(
                        self.parse_local_var_rest(annotations, modifiers)?,
                    ));
                } else {
                    resources.push(Resource::Expr(self.parse_expr()?));
                }
                if !self.eat(TokenKind::Semicolon) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "expected `)` after try resources")?;
        }
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.eat(TokenKind::CatchKw) {
            self.expect(TokenKind::LParen, "expected `(` after `catch`")?;
            let (annotations, modifiers) = self.parse_modifiers()?;
            let mut types = vec![self.parse_type()?];
            while self.eat(TokenKind::Pipe) {
                types.push(self.parse_type()?);
            }
            let name = self.expect_ident("expected exception parameter name")?;
            self.expect(TokenKind::RParen, "expected `)` after catch parameter")?;
            let body = self.parse_block()?;
            catches.push(CatchClause {
                param: CatchParam {
                    id: NodeId::fresh(),
                    annotations,
                    modifiers,
                    types,
                    name,
                },
                body,
            });
        }
        let finally = if self.eat(TokenKind::FinallyKw) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if resources.is_empty() && catches.is_empty() && finally.is_none() {
            return Err(self.error_here("expected `catch` or `finally` after `try` block"));
        }
        Ok(StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        })
    }

    fn parse_switch(&mut self) -> PResult<StmtKind> {
        self.bump();
        let selector = self.parse_paren_expr()?;
        self.expect(TokenKind::LBrace, "expected `{` after switch selector")?;
        let mut cases: Vec<SwitchCase> = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("expected `}` to close the switch"));
            }
            let (comments, _) = self.take_leading_comments();
            let (labels, is_default) = if self.eat(TokenKind::DefaultKw) {
                (Vec::new(), true)
            } else {
                self.expect(TokenKind::CaseKw, "expected `case` or `default`")?;
                let outer = std::mem::replace(&mut self.no_lambda, true);
                let labels = self.parse_case_labels();
                self.no_lambda = outer;
                (labels?, false)
            };
            if self.eat(TokenKind::Arrow) {
                let (arrow, body) = if self.at(TokenKind::LBrace) {
                    (ArrowBody::Block, self.parse_block()?)
                } else {
                    (ArrowBody::Single, Block::new(vec![self.parse_stmt()?]))
                };
                cases.push(SwitchCase {
                    comments,
                    labels,
                    is_default,
                    arrow: Some(arrow),
                    body,
                });
                continue;
            }
            self.expect(TokenKind::Colon, "expected `:` or `->` after case label")?;
            let mut stmts = Vec::new();
            while !matches!(
                self.current(),
                TokenKind::CaseKw | TokenKind::DefaultKw | TokenKind::RBrace | TokenKind::Eof
            ) {
                stmts.push(self.parse_stmt()?);
            }
            cases.push(SwitchCase {
                comments,
                labels,
                is_default,
                arrow: None,
                body: Block::new(stmts),
            });
        }
        let (trailing, _) = self.take_leading_comments();
        if let Some(last) = cases.last_mut() {
            last.body.trailing_comments = trailing;
        }
        self.bump();
        Ok(StmtKind::Switch { selector, cases })
    }

    fn parse_case_labels(&mut self) -> PResult<Vec<Expr>> {
        let mut labels = Vec::new();
        loop {
            labels.push(self.parse_ternary()?);
            if !self.eat(TokenKind::Comma) {
                return Ok(labels);
            }
        }
    }

    // Expressions

    fn parse_paren_expr(&mut self) -> PResult<Expr> {
        self.expect(TokenKind::LParen, "expected `(`")?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen, "expected `)`")?;
        Ok(expr)
    }

    fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma) {
                return Ok(exprs);
            }
        }
    }

    fn parse_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokenKind::LParen, "expected `(`")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            args = self.parse_expr_list()?;
        }
        self.expect(TokenKind::RParen, "expected `)` to close the argument list")?;
        Ok(args)
    }

    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        let lhs = self.parse_ternary()?;
        if let Some((op, len)) = self.peek_assign_op() {
            for _ in 0..len {
                self.bump();
            }
            let value = self.parse_expr()?;
            return Ok(Expr::Assign {
                target: Box::new(lhs),
                op,
                value: Box::new(value),
            });
        }
        Ok(lhs)
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let cond = self.parse_binary(0)?;
        if !self.eat(TokenKind::Question) {
            return Ok(cond);
        }
        let then_expr = self.parse_ternary()?;
        self.expect(TokenKind::Colon, "expected `:` in conditional expression")?;
        let else_expr = self.parse_ternary()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn parse_binary(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.at(TokenKind::InstanceofKw) {
                if INSTANCEOF_PRECEDENCE <= min_bp {
                    break;
                }
                self.bump();
                let is_final = self.eat(TokenKind::FinalKw);
                let ty = self.parse_type()?;
                let binding = if self.at_ident() {
                    Some(PatternBinding {
                        id: NodeId::fresh(),
                        is_final,
                        name: self.bump_text(),
                    })
                } else {
                    None
                };
                lhs = Expr::InstanceOf {
                    expr: Box::new(lhs),
                    ty,
                    binding,
                };
                continue;
            }
            let Some((op, len)) = self.peek_binary_op() else {
                break;
            };
            let bp = op.precedence();
            if bp <= min_bp {
                break;
            }
            for _ in 0..len {
                self.bump();
            }
            let rhs = self.parse_binary(bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.current() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::PlusPlus => Some(UnaryOp::PreInc),
            TokenKind::MinusMinus => Some(UnaryOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        if self.at(TokenKind::LParen) && !self.at_lambda() {
            if let Some(ty) = self.try_cast_type() {
                let expr = self.parse_unary()?;
                return Ok(Expr::Cast {
                    ty,
                    expr: Box::new(expr),
                });
            }
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    /// Consumes `(Type)` if it starts a cast, rewinding otherwise.
    fn try_cast_type(&mut self) -> Option<TypeRef> {
        let save = self.pos;
        self.bump();
        let primitive = self.current().is_primitive_type();
        let is_cast = match self.parse_type() {
            Ok(ty) if self.eat(TokenKind::RParen) => {
                let next = self.current();
                let operand_ok = if primitive && !matches!(ty, TypeRef::Array(_)) {
                    can_start_operand(next)
                        || matches!(
                            next,
                            TokenKind::Plus
                                | TokenKind::Minus
                                | TokenKind::PlusPlus
                                | TokenKind::MinusMinus
                        )
                } else {
                    can_start_operand(next)
                };
                operand_ok.then_some(ty)
            }
            _ => None,
        };
        if is_cast.is_none() {
            self.pos = save;
        }
        is_cast
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        if self.at_lambda() {
            return self.parse_lambda();
        }
        let kind = self.current();
        if kind.is_literal() {
            return Ok(Expr::Literal(self.parse_literal()));
        }
        match kind {
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "expected `)`")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::ThisKw | TokenKind::SuperKw => {
                let is_this = kind == TokenKind::ThisKw;
                self.bump();
                if self.at(TokenKind::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::MethodCall {
                        receiver: None,
                        type_args: Vec::new(),
                        name: if is_this { "this" } else { "super" }.into(),
                        args,
                    });
                }
                Ok(if is_this { Expr::This } else { Expr::Super })
            }
            TokenKind::NewKw => self.parse_new(None),
            TokenKind::Identifier => {
                let name = self.bump_text();
                if self.at(TokenKind::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::MethodCall {
                        receiver: None,
                        type_args: Vec::new(),
                        name,
                        args,
                    });
                }
                Ok(Expr::Name(NameExpr {
                    id: NodeId::fresh(),
                    name,
                }))
            }
            TokenKind::VoidKw => {
                self.bump();
                self.finish_type_primary(TypeRef::Void)
            }
            _ if kind.is_primitive_type() => {
                let ty = self.parse_type()?;
                self.finish_type_primary(ty)
            }
            TokenKind::SwitchKw => Err(self.error_here("switch expressions are not supported")),
            _ => Err(self.error_here("expected expression")),
        }
    }

    /// `int.class`, `int[]::new` and friends.
    fn finish_type_primary(&mut self, ty: TypeRef) -> PResult<Expr> {
        if self.eat(TokenKind::DoubleColon) {
            let name = self.parse_method_ref_name()?;
            return Ok(Expr::MethodRef {
                target: Box::new(Expr::TypeExpr(ty)),
                name,
            });
        }
        self.expect(TokenKind::Dot, "expected `.class`")?;
        self.expect(TokenKind::ClassKw, "expected `.class`")?;
        Ok(Expr::ClassLit(ty))
    }

    fn parse_method_ref_name(&mut self) -> PResult<SmolStr> {
        if self.eat(TokenKind::NewKw) {
            Ok("new".into())
        } else {
            self.expect_ident("expected method name after `::`")
        }
    }

    fn parse_literal(&mut self) -> Literal {
        let kind = match self.current() {
            TokenKind::IntLiteral => LiteralKind::Int,
            TokenKind::LongLiteral => LiteralKind::Long,
            TokenKind::FloatLiteral => LiteralKind::Float,
            TokenKind::DoubleLiteral => LiteralKind::Double,
            TokenKind::CharLiteral => LiteralKind::Char,
            TokenKind::StringLiteral => LiteralKind::String,
            TokenKind::TextBlock => LiteralKind::TextBlock,
            TokenKind::TrueKw | TokenKind::FalseKw => LiteralKind::Bool,
            _ => LiteralKind::Null,
        };
        let text = self.current_text().replace("\r\n", "\n");
        self.bump();
        Literal {
            kind,
            text: text.into(),
        }
    }

    fn parse_new(&mut self, outer: Option<Expr>) -> PResult<Expr> {
        self.expect(TokenKind::NewKw, "expected `new`")?;
        if self.at(TokenKind::Less) {
            return Err(self.error_here("explicit constructor type arguments are not supported"));
        }
        let ty = if let Some(primitive) = primitive_type(self.current()) {
            self.bump();
            TypeRef::Primitive(primitive)
        } else {
            TypeRef::Class(self.parse_class_type_segments()?)
        };

        if self.at(TokenKind::LBracket) {
            let mut dims = Vec::new();
            while self.eat(TokenKind::LBracket) {
                if self.eat(TokenKind::RBracket) {
                    dims.push(None);
                } else {
                    let size = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "expected `]`")?;
                    dims.push(Some(size));
                }
            }
            let init = if self.at(TokenKind::LBrace) {
                Some(self.parse_array_init()?)
            } else {
                None
            };
            return Ok(Expr::NewArray {
                elem_ty: ty,
                dims,
                init,
            });
        }

        let args = self.parse_args()?;
        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_class_body()?)
        } else {
            None
        };
        Ok(Expr::New(Box::new(NewObject {
            outer,
            ty,
            args,
            body,
        })))
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            match self.current() {
                TokenKind::Dot => {
                    self.bump();
                    expr = match self.current() {
                        TokenKind::Identifier => {
                            let name = self.bump_text();
                            if self.at(TokenKind::LParen) {
                                let args = self.parse_args()?;
                                Expr::MethodCall {
                                    receiver: Some(Box::new(expr)),
                                    type_args: Vec::new(),
                                    name,
                                    args,
                                }
                            } else {
                                Expr::FieldAccess {
                                    receiver: Box::new(expr),
                                    name,
                                }
                            }
                        }
                        TokenKind::Less => {
                            let type_args = self
                                .parse_type_args()?
                                .into_iter()
                                .filter_map(|arg| match arg {
                                    TypeArg::Type(ty) => Some(ty),
                                    TypeArg::Wildcard(_) => None,
                                })
                                .collect();
                            let name = self.expect_ident("expected method name")?;
                            let args = self.parse_args()?;
                            Expr::MethodCall {
                                receiver: Some(Box::new(expr)),
                                type_args,
                                name,
                                args,
                            }
                        }
                        TokenKind::ThisKw | TokenKind::SuperKw => {
                            let name: SmolStr = self.current_text().into();
                            self.bump();
                            Expr::FieldAccess {
                                receiver: Box::new(expr),
                                name,
                            }
                        }
                        TokenKind::ClassKw => {
                            let Some(ty) = expr_as_type(&expr) else {
                                return Err(self.error_here("expected a type before `.class`"));
                            };
                            self.bump();
                            Expr::ClassLit(ty)
                        }
                        TokenKind::NewKw => self.parse_new(Some(expr))?,
                        _ => return Err(self.error_here("expected identifier after `.`")),
                    };
                }
                TokenKind::LBracket if self.nth(1) == TokenKind::RBracket => {
                    let Some(mut ty) = expr_as_type(&expr) else {
                        return Err(self.error_here("expected array index"));
                    };
                    while self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
                        self.bump();
                        self.bump();
                        ty = TypeRef::array(ty);
                    }
                    return self.finish_type_primary(ty);
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "expected `]`")?;
                    expr = Expr::ArrayAccess {
                        array: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.at(TokenKind::PlusPlus) {
                        UnaryOp::PostInc
                    } else {
                        UnaryOp::PostDec
                    };
                    self.bump();
                    expr = Expr::Unary {
                        op,
                        operand: Box::new(expr),
                    };
                }
                TokenKind::DoubleColon => {
                    self.bump();
                    let name = self.parse_method_ref_name()?;
                    expr = Expr::MethodRef {
                        target: Box::new(expr),
                        name,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let (params, parenthesized) = if self.at_ident() {
            let name = self.bump_text();
            (
                vec![LambdaParam {
                    id: NodeId::fresh(),
                    modifiers: Vec::new(),
                    ty: None,
                    name,
                }],
                false,
            )
        } else {
            self.expect(TokenKind::LParen, "expected `(`")?;
            let mut params = Vec::new();
            while !self.at(TokenKind::RParen) {
                let (_, modifiers) = self.parse_modifiers()?;
                let (ty, name) = if self.at_ident()
                    && matches!(self.nth(1), TokenKind::Comma | TokenKind::RParen)
                {
                    (None, self.bump_text())
                } else {
                    let mut ty = self.parse_type()?;
                    if self.eat(TokenKind::Ellipsis) {
                        ty = TypeRef::array(ty);
                    }
                    (Some(ty), self.expect_ident("expected lambda parameter name")?)
                };
                params.push(LambdaParam {
                    id: NodeId::fresh(),
                    modifiers,
                    ty,
                    name,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "expected `)` after lambda parameters")?;
            (params, true)
        };
        self.expect(TokenKind::Arrow, "expected `->`")?;
        let outer = std::mem::replace(&mut self.no_lambda, false);
        let body = if self.at(TokenKind::LBrace) {
            self.parse_block().map(LambdaBody::Block)
        } else {
            self.parse_expr().map(|expr| LambdaBody::Expr(Box::new(expr)))
        };
        self.no_lambda = outer;
        Ok(Expr::Lambda {
            params,
            parenthesized,
            body: body?,
        })
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.current() {
            TokenKind::PipePipe => BinaryOp::Or,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::BangEq => BinaryOp::Ne,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEq => BinaryOp::Le,
            TokenKind::LeftShift => BinaryOp::Shl,
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::Greater => {
                if self.glued(1, TokenKind::Greater) {
                    if self.glued(2, TokenKind::Greater) {
                        if self.glued(3, TokenKind::Eq) {
                            return None;
                        }
                        return Some((BinaryOp::UShr, 3));
                    }
                    if self.glued(2, TokenKind::Eq) {
                        return None;
                    }
                    return Some((BinaryOp::Shr, 2));
                }
                if self.glued(1, TokenKind::Eq) {
                    return Some((BinaryOp::Ge, 2));
                }
                BinaryOp::Gt
            }
            _ => return None,
        };
        Some((op, 1))
    }

    fn peek_assign_op(&self) -> Option<(AssignOp, usize)> {
        let op = match self.current() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PercentEq => AssignOp::Rem,
            TokenKind::AmpEq => AssignOp::BitAnd,
            TokenKind::PipeEq => AssignOp::BitOr,
            TokenKind::CaretEq => AssignOp::BitXor,
            TokenKind::LeftShiftEq => AssignOp::Shl,
            TokenKind::Greater if self.glued(1, TokenKind::Greater) => {
                if self.glued(2, TokenKind::Greater) && self.glued(3, TokenKind::Eq) {
                    return Some((AssignOp::UShr, 4));
                }
                if self.glued(2, TokenKind::Eq) {
                    return Some((AssignOp::Shr, 3));
                }
                return None;
            }
            _ => return None,
        };
        Some((op, 1))
    }

    // Lookahead

    fn at_lambda(&self) -> bool {
        if self.no_lambda {
            return false;
        }
        match self.current() {
            TokenKind::Identifier => self.nth(1) == TokenKind::Arrow,
            TokenKind::LParen => {
                let mut depth = 0usize;
                for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
                    match token.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self.nth(offset + 1) == TokenKind::Arrow;
                            }
                        }
                        TokenKind::Eof | TokenKind::Semicolon | TokenKind::LBrace => return false,
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn at_local_var_decl(&mut self) -> bool {
        let save = self.pos;
        let result = match self.parse_type() {
            Ok(_) => {
                self.at_ident()
                    && matches!(
                        self.nth(1),
                        TokenKind::Eq
                            | TokenKind::Semicolon
                            | TokenKind::Comma
                            | TokenKind::LBracket
                            | TokenKind::Colon
                    )
            }
            Err(_) => false,
        };
        self.pos = save;
        result
    }

    // Token plumbing

    fn current(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn current_text(&self) -> &'a str {
        let input = self.input;
        self.tokens[self.pos].text(input)
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    /// Token `n` ahead has `kind` and touches its predecessor.
    fn glued(&self, n: usize, kind: TokenKind) -> bool {
        self.tokens
            .get(self.pos + n)
            .is_some_and(|token| token.kind == kind && token.joint)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    fn at_ident(&self) -> bool {
        self.at(TokenKind::Identifier)
    }

    fn at_contextual(&self, word: &str) -> bool {
        self.at_ident() && self.current_text() == word
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn bump_text(&mut self) -> SmolStr {
        let text = SmolStr::new(self.current_text());
        self.bump();
        text
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> PResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> PResult<SmolStr> {
        if self.at_ident() {
            Ok(self.bump_text())
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        let token = &self.tokens[self.pos];
        let found = if token.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            format!("`{}`", token.text(self.input))
        };
        ParseError::at(self.input, token.range, format!("{message}, found {found}"))
    }

    /// Takes every comment in front of the current token.
    ///
    /// The flag reports whether an empty line precedes the first of them (or
    /// the token itself when there are none).
    fn take_leading_comments(&mut self) -> (Vec<Comment>, bool) {
        let token = &mut self.tokens[self.pos];
        let leading = std::mem::take(&mut token.leading);
        let blank = leading
            .first()
            .map_or(token.blank_line_before, |first| first.comment.blank_line_before);
        (leading.into_iter().map(|c| c.comment).collect(), blank)
    }

    /// Takes a comment that shares a line with the previous token.
    fn take_trailing_comment(&mut self) -> Option<Comment> {
        let token = &mut self.tokens[self.pos];
        match token.leading.first() {
            Some(first) if !first.newline_before => {
                let taken = token.leading.remove(0);
                self.trailing_end = Some((self.pos, taken.end));
                Some(taken.comment)
            }
            _ => None,
        }
    }

    /// End of the source in front of token `token`: the previous token, or
    /// the trailing comment taken after it.
    fn end_before(&self, token: usize) -> usize {
        match self.trailing_end {
            Some((taken_at, end)) if taken_at == token => end,
            _ => usize::from(self.tokens[token.saturating_sub(1)].range.end()),
        }
    }

    fn line_start(&self, offset: usize) -> usize {
        self.input[..offset].rfind('\n').map_or(0, |idx| idx + 1)
    }

    /// Captures the source of the node that started at token `start` and
    /// ends here, trailing comment included.
    fn verbatim_from(&self, start: usize, fingerprint: u64) -> Verbatim {
        let begin = usize::from(self.tokens[start].range.start());
        let end = self.end_before(self.pos);
        let line_start = self.line_start(begin);
        let starts_line = self.input[line_start..begin].chars().all(char::is_whitespace);
        let from = if starts_line { line_start } else { begin };
        Verbatim::new(
            self.input[from..end].replace("\r\n", "\n"),
            starts_line,
            fingerprint,
        )
    }

    /// The lines between the end of the previous node's line and token
    /// `token`, if the token starts a line and nothing else shares the
    /// previous node's last line. With `indented` the text runs up to the
    /// token itself.
    fn gap(&self, token: usize, indented: bool) -> Option<&'a str> {
        let begin = usize::from(self.tokens[token].range.start());
        let line_start = self.line_start(begin);
        if !self.input[line_start..begin].chars().all(char::is_whitespace) {
            return None;
        }
        let from = if token == 0 {
            0
        } else {
            let end = self.end_before(token);
            let newline = end + self.input[end..].find('\n')?;
            if !self.input[end..newline].trim().is_empty() {
                return None;
            }
            newline + 1
        };
        if from > line_start {
            return None;
        }
        Some(&self.input[from..if indented { begin } else { line_start }])
    }

    fn trivia(&self, token: usize, comments: &[Comment], blank_line_before: bool) -> Trivia {
        self.gap(token, false)
            .map_or_else(Trivia::default, |text| {
                Trivia::new(text, comments, blank_line_before)
            })
    }

    /// Layout in front of the closing token `token`.
    fn closing_trivia(&self, token: usize, comments: &[Comment]) -> Trivia {
        self.gap(token, true)
            .map_or_else(Trivia::default, |text| Trivia::new(text, comments, false))
    }
}

fn primitive_type(kind: TokenKind) -> Option<PrimitiveType> {
    let ty = match kind {
        TokenKind::BooleanKw => PrimitiveType::Boolean,
        TokenKind::ByteKw => PrimitiveType::Byte,
        TokenKind::ShortKw => PrimitiveType::Short,
        TokenKind::CharKw => PrimitiveType::Char,
        TokenKind::IntKw => PrimitiveType::Int,
        TokenKind::LongKw => PrimitiveType::Long,
        TokenKind::FloatKw => PrimitiveType::Float,
        TokenKind::DoubleKw => PrimitiveType::Double,
        _ => return None,
    };
    Some(ty)
}

/// Tokens that may follow the `)` of a reference-type cast.
fn can_start_operand(kind: TokenKind) -> bool {
    kind.is_literal()
        || kind.is_primitive_type()
        || matches!(
            kind,
            TokenKind::Identifier
                | TokenKind::LParen
                | TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::ThisKw
                | TokenKind::SuperKw
                | TokenKind::NewKw
                | TokenKind::VoidKw
        )
}

/// Reinterprets a dotted name expression as a type.
fn expr_as_type(expr: &Expr) -> Option<TypeRef> {
    fn collect(expr: &Expr, segments: &mut Vec<TypeSegment>) -> Option<()> {
        match expr {
            Expr::Name(name) => {
                segments.push(TypeSegment {
                    name: name.name.clone(),
                    args: None,
                });
                Some(())
            }
            Expr::FieldAccess { receiver, name } => {
                collect(receiver, segments)?;
                segments.push(TypeSegment {
                    name: name.clone(),
                    args: None,
                });
                Some(())
            }
            _ => None,
        }
    }
    let mut segments = Vec::new();
    collect(expr, &mut segments)?;
    Some(TypeRef::Class(segments))
}
