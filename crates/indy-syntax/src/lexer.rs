use text_size::{TextRange, TextSize};

use crate::ast::{Comment, CommentKind};
use crate::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    IntLiteral,
    LongLiteral,
    FloatLiteral,
    DoubleLiteral,
    CharLiteral,
    StringLiteral,
    TextBlock,

    AbstractKw,
    AssertKw,
    BooleanKw,
    BreakKw,
    ByteKw,
    CaseKw,
    CatchKw,
    CharKw,
    ClassKw,
    ContinueKw,
    DefaultKw,
    DoKw,
    DoubleKw,
    ElseKw,
    EnumKw,
    ExtendsKw,
    FinalKw,
    FinallyKw,
    FloatKw,
    ForKw,
    IfKw,
    ImplementsKw,
    ImportKw,
    InstanceofKw,
    IntKw,
    InterfaceKw,
    LongKw,
    NativeKw,
    NewKw,
    PackageKw,
    PrivateKw,
    ProtectedKw,
    PublicKw,
    ReturnKw,
    ShortKw,
    StaticKw,
    StrictfpKw,
    SuperKw,
    SwitchKw,
    SynchronizedKw,
    ThisKw,
    ThrowKw,
    ThrowsKw,
    TransientKw,
    TryKw,
    VoidKw,
    VolatileKw,
    WhileKw,
    TrueKw,
    FalseKw,
    NullKw,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Ellipsis,
    At,
    DoubleColon,
    Question,
    Colon,
    Arrow,

    Eq,
    EqEq,
    Bang,
    BangEq,
    Tilde,
    Less,
    LessEq,
    LeftShift,
    LeftShiftEq,
    /// Always lexed alone; the parser glues `>>`, `>>>`, `>=` and friends from
    /// adjacent tokens so generic type arguments can close cleanly.
    Greater,
    Plus,
    PlusPlus,
    PlusEq,
    Minus,
    MinusMinus,
    MinusEq,
    Star,
    StarEq,
    Slash,
    SlashEq,
    Percent,
    PercentEq,
    Amp,
    AmpAmp,
    AmpEq,
    Pipe,
    PipePipe,
    PipeEq,
    Caret,
    CaretEq,

    Eof,
}

impl TokenKind {
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            TokenKind::BooleanKw
                | TokenKind::ByteKw
                | TokenKind::ShortKw
                | TokenKind::CharKw
                | TokenKind::IntKw
                | TokenKind::LongKw
                | TokenKind::FloatKw
                | TokenKind::DoubleKw
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::LongLiteral
                | TokenKind::FloatLiteral
                | TokenKind::DoubleLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
                | TokenKind::TextBlock
                | TokenKind::TrueKw
                | TokenKind::FalseKw
                | TokenKind::NullKw
        )
    }
}

fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "abstract" => TokenKind::AbstractKw,
        "assert" => TokenKind::AssertKw,
        "boolean" => TokenKind::BooleanKw,
        "break" => TokenKind::BreakKw,
        "byte" => TokenKind::ByteKw,
        "case" => TokenKind::CaseKw,
        "catch" => TokenKind::CatchKw,
        "char" => TokenKind::CharKw,
        "class" => TokenKind::ClassKw,
        "continue" => TokenKind::ContinueKw,
        "default" => TokenKind::DefaultKw,
        "do" => TokenKind::DoKw,
        "double" => TokenKind::DoubleKw,
        "else" => TokenKind::ElseKw,
        "enum" => TokenKind::EnumKw,
        "extends" => TokenKind::ExtendsKw,
        "final" => TokenKind::FinalKw,
        "finally" => TokenKind::FinallyKw,
        "float" => TokenKind::FloatKw,
        "for" => TokenKind::ForKw,
        "if" => TokenKind::IfKw,
        "implements" => TokenKind::ImplementsKw,
        "import" => TokenKind::ImportKw,
        "instanceof" => TokenKind::InstanceofKw,
        "int" => TokenKind::IntKw,
        "interface" => TokenKind::InterfaceKw,
        "long" => TokenKind::LongKw,
        "native" => TokenKind::NativeKw,
        "new" => TokenKind::NewKw,
        "package" => TokenKind::PackageKw,
        "private" => TokenKind::PrivateKw,
        "protected" => TokenKind::ProtectedKw,
        "public" => TokenKind::PublicKw,
        "return" => TokenKind::ReturnKw,
        "short" => TokenKind::ShortKw,
        "static" => TokenKind::StaticKw,
        "strictfp" => TokenKind::StrictfpKw,
        "super" => TokenKind::SuperKw,
        "switch" => TokenKind::SwitchKw,
        "synchronized" => TokenKind::SynchronizedKw,
        "this" => TokenKind::ThisKw,
        "throw" => TokenKind::ThrowKw,
        "throws" => TokenKind::ThrowsKw,
        "transient" => TokenKind::TransientKw,
        "try" => TokenKind::TryKw,
        "void" => TokenKind::VoidKw,
        "volatile" => TokenKind::VolatileKw,
        "while" => TokenKind::WhileKw,
        "true" => TokenKind::TrueKw,
        "false" => TokenKind::FalseKw,
        "null" => TokenKind::NullKw,
        _ => return None,
    };
    Some(kind)
}

/// A comment waiting to be attached to the next syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LeadingComment {
    pub(crate) comment: Comment,
    /// `false` when the comment sits on the same line as the previous token.
    pub(crate) newline_before: bool,
    /// Byte offset just past the comment.
    pub(crate) end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
    /// A line break separates this token from the previous token or comment.
    pub newline_before: bool,
    /// An empty line separates this token from the previous token or comment.
    pub blank_line_before: bool,
    /// No whitespace or comment separates this token from the previous one.
    pub joint: bool,
    pub(crate) leading: Vec<LeadingComment>,
}

impl Token {
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.range]
    }
}

/// Splits `input` into tokens. Comments are attached to the token that follows
/// them; whitespace is summarized in the newline flags.
pub fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    pending: Vec<LeadingComment>,
    newlines: usize,
    saw_trivia: bool,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            pending: Vec::new(),
            newlines: 0,
            saw_trivia: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        // A leading byte order mark is not part of the program text.
        if self.input.starts_with('\u{feff}') {
            self.pos = '\u{feff}'.len_utf8();
        }
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let Some(c) = self.peek() else {
                self.push(TokenKind::Eof, start);
                break;
            };
            let kind = self.next_token(c)?;
            self.push(kind, start);
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, start: usize, message: &str) -> ParseError {
        let start = TextSize::from(start as u32);
        ParseError::at(self.input, TextRange::new(start, start), message)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let range = TextRange::new(TextSize::from(start as u32), TextSize::from(self.pos as u32));
        let first = self.tokens.is_empty();
        self.tokens.push(Token {
            kind,
            range,
            newline_before: self.newlines > 0 || first,
            blank_line_before: self.newlines > 1,
            joint: !self.saw_trivia && !first,
            leading: std::mem::take(&mut self.pending),
        });
        self.newlines = 0;
        self.saw_trivia = false;
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                let end = rest.find('\n').unwrap_or(rest.len());
                let text = rest[..end].trim_end_matches('\r').to_string();
                let comment_end = self.pos + text.len();
                self.pos += end;
                self.comment(CommentKind::Line, text, comment_end);
            } else if rest.starts_with("/*") {
                let start = self.pos;
                let Some(end) = rest[2..].find("*/") else {
                    return Err(self.error(start, "unterminated block comment"));
                };
                let text = &rest[..end + 4];
                let kind = if text.starts_with("/**") && text != "/**/" {
                    CommentKind::Doc
                } else {
                    CommentKind::Block
                };
                let text = text.replace("\r\n", "\n");
                self.pos += end + 4;
                self.comment(kind, text, self.pos);
            } else {
                match self.peek() {
                    Some('\n') => {
                        self.newlines += 1;
                        self.saw_trivia = true;
                        self.pos += 1;
                    }
                    Some(c) if c.is_whitespace() => {
                        self.saw_trivia = true;
                        self.pos += c.len_utf8();
                    }
                    _ => return Ok(()),
                }
            }
        }
    }

    fn comment(&mut self, kind: CommentKind, text: String, end: usize) {
        let newline_before = self.newlines > 0 || self.tokens.is_empty();
        self.pending.push(LeadingComment {
            comment: Comment {
                kind,
                text,
                blank_line_before: self.newlines > 1,
            },
            newline_before,
            end,
        });
        self.newlines = 0;
        self.saw_trivia = true;
    }

    fn next_token(&mut self, c: char) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        if is_ident_start(c) {
            self.bump_char();
            while self.peek().is_some_and(is_ident_continue) {
                self.bump_char();
            }
            let text = &self.input[start..self.pos];
            return Ok(keyword(text).unwrap_or(TokenKind::Identifier));
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
            return Ok(self.number());
        }
        match c {
            '"' => return self.string(start),
            '\'' => return self.char_literal(start),
            _ => {}
        }

        const PUNCT: &[(&str, TokenKind)] = &[
            ("<<=", TokenKind::LeftShiftEq),
            ("...", TokenKind::Ellipsis),
            ("->", TokenKind::Arrow),
            ("::", TokenKind::DoubleColon),
            ("==", TokenKind::EqEq),
            ("!=", TokenKind::BangEq),
            ("<=", TokenKind::LessEq),
            ("<<", TokenKind::LeftShift),
            ("++", TokenKind::PlusPlus),
            ("+=", TokenKind::PlusEq),
            ("--", TokenKind::MinusMinus),
            ("-=", TokenKind::MinusEq),
            ("*=", TokenKind::StarEq),
            ("/=", TokenKind::SlashEq),
            ("%=", TokenKind::PercentEq),
            ("&&", TokenKind::AmpAmp),
            ("&=", TokenKind::AmpEq),
            ("||", TokenKind::PipePipe),
            ("|=", TokenKind::PipeEq),
            ("^=", TokenKind::CaretEq),
            ("(", TokenKind::LParen),
            (")", TokenKind::RParen),
            ("{", TokenKind::LBrace),
            ("}", TokenKind::RBrace),
            ("[", TokenKind::LBracket),
            ("]", TokenKind::RBracket),
            (";", TokenKind::Semicolon),
            (",", TokenKind::Comma),
            (".", TokenKind::Dot),
            ("@", TokenKind::At),
            ("?", TokenKind::Question),
            (":", TokenKind::Colon),
            ("=", TokenKind::Eq),
            ("!", TokenKind::Bang),
            ("~", TokenKind::Tilde),
            ("<", TokenKind::Less),
            (">", TokenKind::Greater),
            ("+", TokenKind::Plus),
            ("-", TokenKind::Minus),
            ("*", TokenKind::Star),
            ("/", TokenKind::Slash),
            ("%", TokenKind::Percent),
            ("&", TokenKind::Amp),
            ("|", TokenKind::Pipe),
            ("^", TokenKind::Caret),
        ];
        let rest = self.rest();
        for (text, kind) in PUNCT {
            if rest.starts_with(text) {
                self.pos += text.len();
                return Ok(*kind);
            }
        }
        Err(self.error(start, &format!("unexpected character `{c}`")))
    }

    fn number(&mut self) -> TokenKind {
        let rest = self.rest().as_bytes();
        let mut i = 0;
        let mut floating = false;
        let hex = rest.len() > 1 && rest[0] == b'0' && matches!(rest[1], b'x' | b'X');
        let bin = rest.len() > 1 && rest[0] == b'0' && matches!(rest[1], b'b' | b'B');
        if hex || bin {
            i = 2;
            while i < rest.len() && (rest[i].is_ascii_hexdigit() || rest[i] == b'_') {
                i += 1;
            }
            if hex && i < rest.len() && rest[i] == b'.' {
                floating = true;
                i += 1;
                while i < rest.len() && (rest[i].is_ascii_hexdigit() || rest[i] == b'_') {
                    i += 1;
                }
            }
            if hex && i < rest.len() && matches!(rest[i], b'p' | b'P') {
                floating = true;
                i = exponent(rest, i + 1);
            }
        } else {
            while i < rest.len() && (rest[i].is_ascii_digit() || rest[i] == b'_') {
                i += 1;
            }
            let fraction = rest
                .get(i + 1)
                .map_or(true, |b| b.is_ascii_digit() || !is_ident_byte(*b));
            if i < rest.len() && rest[i] == b'.' && fraction {
                floating = true;
                i += 1;
                while i < rest.len() && (rest[i].is_ascii_digit() || rest[i] == b'_') {
                    i += 1;
                }
            }
            if i < rest.len() && matches!(rest[i], b'e' | b'E') {
                floating = true;
                i = exponent(rest, i + 1);
            }
        }
        let kind = match rest.get(i) {
            Some(b'l' | b'L') if !floating => {
                i += 1;
                TokenKind::LongLiteral
            }
            Some(b'f' | b'F') if !hex || floating => {
                i += 1;
                TokenKind::FloatLiteral
            }
            Some(b'd' | b'D') if !hex || floating => {
                i += 1;
                TokenKind::DoubleLiteral
            }
            _ if floating => TokenKind::DoubleLiteral,
            _ => TokenKind::IntLiteral,
        };
        self.pos += i;
        kind
    }

    fn string(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        if self.rest().starts_with("\"\"\"") {
            self.pos += 3;
            loop {
                let rest = self.rest();
                if rest.starts_with("\\") {
                    self.pos += 1;
                    self.bump_char();
                } else if rest.starts_with("\"\"\"") {
                    self.pos += 3;
                    return Ok(TokenKind::TextBlock);
                } else if self.bump_char().is_none() {
                    return Err(self.error(start, "unterminated text block"));
                }
            }
        }
        self.pos += 1;
        loop {
            match self.bump_char() {
                Some('\\') => {
                    self.bump_char();
                }
                Some('"') => return Ok(TokenKind::StringLiteral),
                Some('\n') | None => return Err(self.error(start, "unterminated string literal")),
                Some(_) => {}
            }
        }
    }

    fn char_literal(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        self.pos += 1;
        loop {
            match self.bump_char() {
                Some('\\') => {
                    self.bump_char();
                }
                Some('\'') => return Ok(TokenKind::CharLiteral),
                Some('\n') | None => {
                    return Err(self.error(start, "unterminated character literal"))
                }
                Some(_) => {}
            }
        }
    }
}

fn exponent(rest: &[u8], mut i: usize) -> usize {
    if i < rest.len() && matches!(rest[i], b'+' | b'-') {
        i += 1;
    }
    while i < rest.len() && (rest[i].is_ascii_digit() || rest[i] == b'_') {
        i += 1;
    }
    i
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || unicode_ident::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    c == '$' || unicode_ident::is_xid_continue(c)
}
