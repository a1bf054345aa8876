// src/frontend/lexer.rs

use crate::errors::LexerError;
use crate::frontend::{Span, Token, TokenType};

pub struct Lexer<'src> {
    chars: std::iter::Peekable<std::str::Chars<'src>>,
    buffer: String,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
    // Error collection
    errors: Vec<(LexerError, Span)>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            chars: source.chars().peekable(),
            buffer: String::new(),
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            errors: Vec::new(),
        }
    }

    /// Take all collected errors, leaving the internal list empty.
    pub fn take_errors(&mut self) -> Vec<(LexerError, Span)> {
        std::mem::take(&mut self.errors)
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token {
        self.skip_insignificant();

        self.buffer.clear();
        self.start_line = self.line;
        self.start_column = self.column;

        let Some(c) = self.advance() else {
            return self.make_token(TokenType::Eof);
        };

        match c {
            '\n' => self.make_token(TokenType::Newline),
            '(' => self.make_token(TokenType::LParen),
            ')' => self.make_token(TokenType::RParen),
            '{' => self.make_token(TokenType::LBrace),
            '}' => self.make_token(TokenType::RBrace),
            '[' => self.make_token(TokenType::LBracket),
            ']' => self.make_token(TokenType::RBracket),
            ',' => self.make_token(TokenType::Comma),
            '.' => self.make_token(TokenType::Dot),
            '+' => self.make_token(TokenType::Plus),
            '*' => self.make_token(TokenType::Star),
            '/' => self.make_token(TokenType::Slash),
            '^' => self.make_token(TokenType::Caret),
            '&' => self.make_token(TokenType::Ampersand),
            '|' => self.make_token(TokenType::Pipe),
            '%' => {
                if self.match_char('[') {
                    self.make_token(TokenType::HashOpen)
                } else {
                    self.make_token(TokenType::Percent)
                }
            }
            '-' => {
                if self.match_char('>') {
                    self.make_token(TokenType::Arrow)
                } else {
                    self.make_token(TokenType::Minus)
                }
            }
            '=' => {
                if self.match_char('=') {
                    self.make_token(TokenType::EqEq)
                } else {
                    self.make_token(TokenType::Eq)
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.make_token(TokenType::BangEq)
                } else if self.match_char('!') {
                    self.make_token(TokenType::Throws)
                } else if self.match_char('(') {
                    self.make_token(TokenType::TypeArgsOpen)
                } else {
                    self.unexpected('!')
                }
            }
            '<' => {
                if self.match_char('<') {
                    self.make_token(TokenType::LessLess)
                } else if self.match_char('=') {
                    self.make_token(TokenType::LtEq)
                } else {
                    self.make_token(TokenType::Lt)
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.make_token(TokenType::GreaterGreater)
                } else if self.match_char('=') {
                    self.make_token(TokenType::GtEq)
                } else {
                    self.make_token(TokenType::Gt)
                }
            }
            ':' => {
                if self.match_char(':') {
                    self.make_token(TokenType::ColonColon)
                } else {
                    self.make_token(TokenType::Colon)
                }
            }
            '@' => self.attribute(),
            '\'' | '"' => self.string(c),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier(c),
            c => self.unexpected(c),
        }
    }

    /// Lex the whole source into a token list, Eof included.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.ty == TokenType::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.buffer.push(c);
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip spaces, tabs, carriage returns and comments. Newlines are
    /// significant (statement separators) and are not skipped here.
    fn skip_insignificant(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn make_token(&self, ty: TokenType) -> Token {
        Token::new(
            ty,
            self.buffer.clone(),
            Span::new(self.start_line, self.start_column),
        )
    }

    fn unexpected(&mut self, character: char) -> Token {
        let span = Span::new(self.start_line, self.start_column);
        self.errors
            .push((LexerError::UnexpectedCharacter { character }, span));
        // Produce something the parser can resynchronize on
        self.next_token()
    }

    fn string(&mut self, quote: char) -> Token {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = Span::new(self.start_line, self.start_column);
                    self.errors.push((LexerError::UnterminatedString, span));
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('e') => value.push('\u{1b}'),
                        Some(c) => value.push(c),
                        None => {}
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }
        Token::new(
            TokenType::StringLiteral,
            value,
            Span::new(self.start_line, self.start_column),
        )
    }

    fn number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if self.peek() == Some('.') {
            // Only part of the number when a digit follows; `1.foo` is a send
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() || c == '_' {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let lexeme: String = self.buffer.chars().filter(|&c| c != '_').collect();
        let ty = if is_float {
            TokenType::FloatLiteral
        } else {
            TokenType::IntLiteral
        };
        Token::new(ty, lexeme, Span::new(self.start_line, self.start_column))
    }

    fn attribute(&mut self) -> Token {
        self.buffer.clear();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.make_token(TokenType::Attribute)
    }

    fn identifier(&mut self, first: char) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let ty = match self.buffer.as_str() {
            "import" => TokenType::KwImport,
            "let" => TokenType::KwLet,
            "mut" => TokenType::KwMut,
            "def" => TokenType::KwDef,
            "object" => TokenType::KwObject,
            "trait" => TokenType::KwTrait,
            "impl" => TokenType::KwImpl,
            "for" => TokenType::KwFor,
            "return" => TokenType::KwReturn,
            "throw" => TokenType::KwThrow,
            "try" => TokenType::KwTry,
            "else" => TokenType::KwElse,
            "self" => TokenType::KwSelf,
            "do" => TokenType::KwDo,
            "lambda" => TokenType::KwLambda,
            "as" => TokenType::KwAs,
            "_intrinsic" => TokenType::KwIntrinsic,
            _ if first.is_uppercase() => TokenType::Constant,
            _ => TokenType::Identifier,
        };
        self.make_token(ty)
    }
}
