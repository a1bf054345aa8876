// src/frontend/token.rs

/// All token types in the Stoat language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    Identifier,
    Constant,
    Attribute, // @name

    // Keywords
    KwImport,
    KwLet,
    KwMut,
    KwDef,
    KwObject,
    KwTrait,
    KwImpl,
    KwFor,
    KwReturn,
    KwThrow,
    KwTry,
    KwElse,
    KwSelf,
    KwDo,
    KwLambda,
    KwAs,
    KwIntrinsic, // _intrinsic

    // Operators (all parsed as sends)
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    BangEq,
    Ampersand,
    Pipe,
    Caret,
    LessLess,
    GreaterGreater,

    // Punctuation
    Eq,
    Colon,
    ColonColon,
    Comma,
    Dot,
    Arrow,        // ->
    Throws,       // !!
    TypeArgsOpen, // !(
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    HashOpen, // %[

    Newline,
    Eof,
}

impl TokenType {
    /// Human-readable token name for error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::IntLiteral => "integer",
            TokenType::FloatLiteral => "float",
            TokenType::StringLiteral => "string",
            TokenType::Identifier => "identifier",
            TokenType::Constant => "constant",
            TokenType::Attribute => "attribute",
            TokenType::KwImport => "import",
            TokenType::KwLet => "let",
            TokenType::KwMut => "mut",
            TokenType::KwDef => "def",
            TokenType::KwObject => "object",
            TokenType::KwTrait => "trait",
            TokenType::KwImpl => "impl",
            TokenType::KwFor => "for",
            TokenType::KwReturn => "return",
            TokenType::KwThrow => "throw",
            TokenType::KwTry => "try",
            TokenType::KwElse => "else",
            TokenType::KwSelf => "self",
            TokenType::KwDo => "do",
            TokenType::KwLambda => "lambda",
            TokenType::KwAs => "as",
            TokenType::KwIntrinsic => "_intrinsic",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Percent => "%",
            TokenType::Lt => "<",
            TokenType::Gt => ">",
            TokenType::LtEq => "<=",
            TokenType::GtEq => ">=",
            TokenType::EqEq => "==",
            TokenType::BangEq => "!=",
            TokenType::Ampersand => "&",
            TokenType::Pipe => "|",
            TokenType::Caret => "^",
            TokenType::LessLess => "<<",
            TokenType::GreaterGreater => ">>",
            TokenType::Eq => "=",
            TokenType::Colon => ":",
            TokenType::ColonColon => "::",
            TokenType::Comma => ",",
            TokenType::Dot => ".",
            TokenType::Arrow => "->",
            TokenType::Throws => "!!",
            TokenType::TypeArgsOpen => "!(",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LBrace => "{",
            TokenType::RBrace => "}",
            TokenType::LBracket => "[",
            TokenType::RBracket => "]",
            TokenType::HashOpen => "%[",
            TokenType::Newline => "newline",
            TokenType::Eof => "end of input",
        }
    }

    /// True for operator tokens that desugar to binary sends
    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self,
            TokenType::Plus
                | TokenType::Minus
                | TokenType::Star
                | TokenType::Slash
                | TokenType::Percent
                | TokenType::Lt
                | TokenType::Gt
                | TokenType::LtEq
                | TokenType::GtEq
                | TokenType::EqEq
                | TokenType::BangEq
                | TokenType::Ampersand
                | TokenType::Pipe
                | TokenType::Caret
                | TokenType::LessLess
                | TokenType::GreaterGreater
        )
    }
}

/// A source position: 1-indexed line and column.
///
/// Spans are copied onto every AST node and TIR instruction; the owning
/// module records the file path once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A lexed token with its source text and position
#[derive(Debug, Clone)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(ty: TokenType, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            ty,
            lexeme: lexeme.into(),
            span,
        }
    }
}
