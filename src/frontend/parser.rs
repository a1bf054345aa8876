// src/frontend/parser.rs

use crate::errors::ParserError;
use crate::frontend::{Lexer, Span, Token, TokenType, ast::*};

/// A parse error wrapping a miette-enabled ParserError
#[derive(Debug)]
pub struct ParseError {
    pub error: ParserError,
    pub span: Span,
}

impl ParseError {
    pub fn new(error: ParserError, span: Span) -> Self {
        Self { error, span }
    }
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    pub(crate) current: Token,
    pub(crate) next: Token,
    next_node_id: u32,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let next = lexer.next_token();
        Self {
            lexer,
            current,
            next,
            next_node_id: 0,
        }
    }

    /// Parse a whole module body.
    pub fn parse_module(&mut self) -> Result<ModuleAst, ParseError> {
        let location = self.current.span;
        let mut body = Vec::new();

        self.skip_newlines();
        while !self.check(TokenType::Eof) {
            body.push(self.expression()?);
            self.skip_newlines();
        }

        Ok(ModuleAst { body, location })
    }

    /// Take lexer errors collected while parsing.
    pub fn take_lexer_errors(&mut self) -> Vec<(crate::errors::LexerError, Span)> {
        self.lexer.take_errors()
    }

    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.lexer.next_token();
        std::mem::swap(&mut self.current, &mut self.next);
        std::mem::replace(&mut self.next, token)
    }

    pub(crate) fn check(&self, ty: TokenType) -> bool {
        self.current.ty == ty
    }

    pub(crate) fn match_token(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn consume(&mut self, ty: TokenType, expected: &str) -> Result<Token, ParseError> {
        if self.check(ty) {
            Ok(self.advance())
        } else {
            Err(self.expected(expected))
        }
    }

    pub(crate) fn expected(&self, expected: &str) -> ParseError {
        ParseError::new(
            ParserError::ExpectedToken {
                expected: expected.to_string(),
                found: self.current.ty.as_str().to_string(),
            },
            self.current.span,
        )
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(TokenType::Newline) {
            self.advance();
        }
    }

    /// Parse one statement-level expression.
    pub(crate) fn expression(&mut self) -> Result<Node, ParseError> {
        match self.current.ty {
            TokenType::KwImport => self.import(),
            TokenType::KwLet => self.define_variable(),
            TokenType::KwDef => self.method_def(),
            TokenType::KwObject => self.object_def(),
            TokenType::KwTrait => self.trait_def(),
            TokenType::KwImpl => self.impl_block(),
            TokenType::KwReturn => self.return_expr(),
            TokenType::KwThrow => self.throw_expr(),
            TokenType::Identifier if self.next.ty == TokenType::Eq => self.reassign_local(),
            TokenType::Attribute if self.next.ty == TokenType::Eq => self.reassign_attribute(),
            _ => self.value_expression(),
        }
    }

    fn import(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'import'

        let mut path = Vec::new();
        let mut symbols = Vec::new();

        let first = self.consume(TokenType::Identifier, "a module name")?;
        path.push(first.lexeme);

        while self.match_token(TokenType::ColonColon) {
            if self.check(TokenType::LParen) {
                symbols = self.import_symbols()?;
                break;
            }
            let segment = self.consume(TokenType::Identifier, "a module name segment")?;
            path.push(segment.lexeme);
        }

        Ok(Node::Import(Import {
            id: self.next_id(),
            path,
            symbols,
            location,
        }))
    }

    fn import_symbols(&mut self) -> Result<Vec<ImportSymbol>, ParseError> {
        self.consume(TokenType::LParen, "'('")?;
        self.skip_newlines();

        let mut symbols = Vec::new();
        loop {
            let location = self.current.span;
            let symbol = match self.current.ty {
                TokenType::KwSelf => {
                    self.advance();
                    let alias = self.import_alias()?;
                    ImportSymbol::SelfModule { alias, location }
                }
                TokenType::Star => {
                    self.advance();
                    ImportSymbol::Glob { location }
                }
                TokenType::Identifier | TokenType::Constant => {
                    let name = self.advance().lexeme;
                    let alias = self.import_alias()?;
                    ImportSymbol::Named {
                        name,
                        alias,
                        location,
                    }
                }
                _ => return Err(self.expected("an import symbol")),
            };
            symbols.push(symbol);

            if !self.match_token(TokenType::Comma) {
                break;
            }
            self.skip_newlines();
        }

        self.skip_newlines();
        self.consume(TokenType::RParen, "')'")?;
        Ok(symbols)
    }

    fn import_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.match_token(TokenType::KwAs) {
            let token = match self.current.ty {
                TokenType::Identifier | TokenType::Constant => self.advance(),
                _ => return Err(self.expected("an alias name")),
            };
            Ok(Some(token.lexeme))
        } else {
            Ok(None)
        }
    }

    fn define_variable(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'let'

        let mutable = self.match_token(TokenType::KwMut);
        let name = match self.current.ty {
            TokenType::Identifier | TokenType::Constant => self.advance().lexeme,
            _ => return Err(self.expected("a variable name")),
        };

        let value_type = if self.match_token(TokenType::Colon) {
            Some(self.type_ref()?)
        } else {
            None
        };

        self.consume(TokenType::Eq, "'='")?;
        let value = self.value_expression()?;

        Ok(Node::DefineVariable(DefineVariable {
            id: self.next_id(),
            name,
            mutable,
            value_type,
            value: Box::new(value),
            location,
        }))
    }

    fn reassign_local(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        let name = self.advance().lexeme;
        self.consume(TokenType::Eq, "'='")?;
        let value = self.value_expression()?;

        Ok(Node::Reassign(Reassign {
            id: self.next_id(),
            target: ReassignTarget::Local(name),
            value: Box::new(value),
            location,
        }))
    }

    fn reassign_attribute(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        let name = self.advance().lexeme;
        self.consume(TokenType::Eq, "'='")?;
        let value = self.value_expression()?;

        Ok(Node::Reassign(Reassign {
            id: self.next_id(),
            target: ReassignTarget::Attribute(name),
            value: Box::new(value),
            location,
        }))
    }

    fn return_expr(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'return'

        let value = if self.check(TokenType::Newline)
            || self.check(TokenType::RBrace)
            || self.check(TokenType::Eof)
        {
            None
        } else {
            Some(Box::new(self.value_expression()?))
        };

        Ok(Node::Return(Return {
            id: self.next_id(),
            value,
            location,
        }))
    }

    fn throw_expr(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'throw'
        let value = self.value_expression()?;

        Ok(Node::Throw(Throw {
            id: self.next_id(),
            value: Box::new(value),
            location,
        }))
    }

    fn method_def(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'def'

        let name = self.method_name()?;
        let type_parameters = self.type_parameter_defs()?;
        let arguments = if self.check(TokenType::LParen) {
            self.argument_defs()?
        } else {
            Vec::new()
        };

        let throws = if self.match_token(TokenType::Throws) {
            Some(self.type_ref()?)
        } else {
            None
        };
        let returns = if self.match_token(TokenType::Arrow) {
            Some(self.type_ref()?)
        } else {
            None
        };

        let body = if self.check(TokenType::LBrace) {
            Some(self.body_block()?)
        } else {
            // Required trait method; validated against its context in sema
            None
        };

        Ok(Node::MethodDef(MethodDef {
            id: self.next_id(),
            name,
            type_parameters,
            arguments,
            returns,
            throws,
            body,
            location,
        }))
    }

    pub(crate) fn method_name(&mut self) -> Result<String, ParseError> {
        if self.check(TokenType::Identifier) || self.check(TokenType::Constant) {
            return Ok(self.advance().lexeme);
        }
        if self.current.ty.is_binary_operator() {
            return Ok(self.advance().lexeme);
        }
        if self.match_token(TokenType::LBracket) {
            self.consume(TokenType::RBracket, "']'")?;
            if self.match_token(TokenType::Eq) {
                return Ok("[]=".to_string());
            }
            return Ok("[]".to_string());
        }
        Err(self.expected("a method name"))
    }

    fn type_parameter_defs(&mut self) -> Result<Vec<TypeParameterDef>, ParseError> {
        if !self.match_token(TokenType::TypeArgsOpen) {
            return Ok(Vec::new());
        }

        let mut parameters = Vec::new();
        loop {
            let token = self.consume(TokenType::Constant, "a type parameter name")?;
            parameters.push(TypeParameterDef {
                name: token.lexeme,
                location: token.span,
            });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.consume(TokenType::RParen, "')'")?;
        Ok(parameters)
    }

    pub(crate) fn argument_defs(&mut self) -> Result<Vec<ArgumentDef>, ParseError> {
        self.consume(TokenType::LParen, "'('")?;
        self.skip_newlines();

        let mut arguments: Vec<ArgumentDef> = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                if let Some(previous) = arguments.last()
                    && previous.rest
                {
                    return Err(ParseError::new(
                        ParserError::RestArgumentNotLast,
                        self.current.span,
                    ));
                }

                let rest = self.match_token(TokenType::Star);
                let token = self.consume(TokenType::Identifier, "an argument name")?;
                let value_type = if self.match_token(TokenType::Colon) {
                    Some(self.type_ref()?)
                } else {
                    None
                };
                let default = if self.match_token(TokenType::Eq) {
                    Some(self.value_expression()?)
                } else {
                    None
                };

                arguments.push(ArgumentDef {
                    name: token.lexeme,
                    value_type,
                    default,
                    rest,
                    location: token.span,
                });

                if !self.match_token(TokenType::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }

        self.skip_newlines();
        self.consume(TokenType::RParen, "')'")?;
        Ok(arguments)
    }

    fn object_def(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'object'

        let name = self.constant_name()?;
        let type_parameters = self.type_parameter_defs()?;
        let body = self.body_block()?;

        Ok(Node::ObjectDef(ObjectDef {
            id: self.next_id(),
            name,
            type_parameters,
            body,
            location,
        }))
    }

    fn trait_def(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'trait'

        let name = self.constant_name()?;
        let type_parameters = self.type_parameter_defs()?;
        let body = self.body_block()?;

        Ok(Node::TraitDef(TraitDef {
            id: self.next_id(),
            name,
            type_parameters,
            body,
            location,
        }))
    }

    fn impl_block(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'impl'

        let first = self.constant_name()?;
        if self.match_token(TokenType::KwFor) {
            let object_name = self.constant_name()?;
            let body = self.body_block()?;
            return Ok(Node::TraitImpl(TraitImpl {
                id: self.next_id(),
                trait_name: first,
                object_name,
                body,
                location,
            }));
        }

        let body = self.body_block()?;
        Ok(Node::Reopen(Reopen {
            id: self.next_id(),
            name: first,
            body,
            location,
        }))
    }

    fn constant_name(&mut self) -> Result<String, ParseError> {
        if self.check(TokenType::Constant) {
            Ok(self.advance().lexeme)
        } else {
            Err(ParseError::new(
                ParserError::ExpectedConstant {
                    found: self.current.ty.as_str().to_string(),
                },
                self.current.span,
            ))
        }
    }

    /// Parse a `{ ... }` body as a statement list.
    pub(crate) fn body_block(&mut self) -> Result<Vec<Node>, ParseError> {
        self.consume(TokenType::LBrace, "'{'")?;
        let mut body = Vec::new();

        self.skip_newlines();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            body.push(self.expression()?);
            self.skip_newlines();
        }

        self.consume(TokenType::RBrace, "'}'")?;
        Ok(body)
    }

    pub(crate) fn type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let token = self.consume(TokenType::Constant, "a type name")?;
        let mut arguments = Vec::new();

        if self.match_token(TokenType::TypeArgsOpen) {
            loop {
                arguments.push(self.type_ref()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
            self.consume(TokenType::RParen, "')'")?;
        }

        Ok(TypeRef {
            name: token.lexeme,
            arguments,
            location: token.span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ModuleAst {
        Parser::new(source).parse_module().expect("parse failed")
    }

    #[test]
    fn parses_import_with_alias() {
        let module = parse("import std::hash_map::(HashMap as Map)");
        let Node::Import(import) = &module.body[0] else {
            panic!("expected an import");
        };
        assert_eq!(import.qualified_name(), "std::hash_map");
        let ImportSymbol::Named { name, alias, .. } = &import.symbols[0] else {
            panic!("expected a named symbol");
        };
        assert_eq!(name, "HashMap");
        assert_eq!(alias.as_deref(), Some("Map"));
    }

    #[test]
    fn parses_import_self_and_glob() {
        let module = parse("import std::fs::(self as files, *)");
        let Node::Import(import) = &module.body[0] else {
            panic!("expected an import");
        };
        assert!(matches!(
            &import.symbols[0],
            ImportSymbol::SelfModule { alias: Some(a), .. } if a == "files"
        ));
        assert!(matches!(&import.symbols[1], ImportSymbol::Glob { .. }));
    }

    #[test]
    fn parses_method_with_defaults_and_rest() {
        let module = parse("def greet(name, prefix = 'Hello', *rest: String) -> String {\n  name\n}");
        let Node::MethodDef(def) = &module.body[0] else {
            panic!("expected a method definition");
        };
        assert_eq!(def.name, "greet");
        assert_eq!(def.arguments.len(), 3);
        assert!(def.arguments[1].default.is_some());
        assert!(def.arguments[2].rest);
        assert_eq!(def.returns.as_ref().unwrap().name, "String");
    }

    #[test]
    fn rest_argument_must_come_last() {
        let result = Parser::new("def f(*rest, other) {}").parse_module();
        assert!(matches!(
            result.unwrap_err().error,
            ParserError::RestArgumentNotLast
        ));
    }

    #[test]
    fn parses_operator_method_names() {
        let module = parse("def +(other) {}\ndef [](index) {}\ndef []=(index, value) {}");
        let names: Vec<_> = module
            .body
            .iter()
            .map(|node| match node {
                Node::MethodDef(def) => def.name.clone(),
                _ => panic!("expected a method definition"),
            })
            .collect();
        assert_eq!(names, vec!["+", "[]", "[]="]);
    }

    #[test]
    fn parses_trait_impl_and_reopen() {
        let module = parse("impl ToString for Person {}\nimpl Person {}");
        assert!(matches!(&module.body[0], Node::TraitImpl(t) if t.trait_name == "ToString"));
        assert!(matches!(&module.body[1], Node::Reopen(r) if r.name == "Person"));
    }

    #[test]
    fn parses_let_with_type_annotation() {
        let module = parse("let mut x: Integer = 10");
        let Node::DefineVariable(define) = &module.body[0] else {
            panic!("expected a variable definition");
        };
        assert!(define.mutable);
        assert_eq!(define.value_type.as_ref().unwrap().name, "Integer");
    }

    #[test]
    fn parses_generic_type_annotation() {
        let module = parse("let x: Array!(Integer) = []");
        let Node::DefineVariable(define) = &module.body[0] else {
            panic!("expected a variable definition");
        };
        let ty = define.value_type.as_ref().unwrap();
        assert_eq!(ty.name, "Array");
        assert_eq!(ty.arguments[0].name, "Integer");
    }

    #[test]
    fn parses_reassignments() {
        let module = parse("x = 1\n@name = 'a'");
        assert!(matches!(
            &module.body[0],
            Node::Reassign(r) if matches!(&r.target, ReassignTarget::Local(n) if n == "x")
        ));
        assert!(matches!(
            &module.body[1],
            Node::Reassign(r) if matches!(&r.target, ReassignTarget::Attribute(n) if n == "name")
        ));
    }
}
