// src/frontend/parse_expr.rs
//! Expression parsing.
//!
//! Binary operators desugar to sends (`a + b` is `a.+(b)`) and share one
//! precedence level, associating to the left. Postfix sends and `as` casts
//! bind tighter than operators.

use crate::errors::ParserError;
use crate::frontend::parser::{ParseError, Parser};
use crate::frontend::{TokenType, ast::*};

impl<'src> Parser<'src> {
    /// Parse a value-producing expression.
    pub(crate) fn value_expression(&mut self) -> Result<Node, ParseError> {
        let mut node = self.postfix_expression()?;

        while self.current.ty.is_binary_operator() {
            let operator = self.advance();
            let rhs = self.postfix_expression()?;
            node = Node::Send(Send {
                id: self.next_id(),
                name: operator.lexeme,
                receiver: Some(Box::new(node)),
                arguments: vec![rhs],
                keyword_arguments: Vec::new(),
                hash_map_literal: false,
                location: operator.span,
            });
        }

        Ok(node)
    }

    fn postfix_expression(&mut self) -> Result<Node, ParseError> {
        let mut node = self.operand()?;

        loop {
            if self.match_token(TokenType::Dot) {
                node = self.send_to(node)?;
            } else if self.match_token(TokenType::KwAs) {
                let target = self.type_ref()?;
                let location = target.location;
                node = Node::TypeCast(TypeCast {
                    id: self.next_id(),
                    expression: Box::new(node),
                    target,
                    location,
                });
            } else {
                break;
            }
        }

        Ok(node)
    }

    fn send_to(&mut self, receiver: Node) -> Result<Node, ParseError> {
        // `receiver.Foo` is a receiver-scoped constant, not a send
        if self.check(TokenType::Constant) {
            let token = self.advance();
            return Ok(Node::Constant(Constant {
                id: self.next_id(),
                name: token.lexeme,
                receiver: Some(Box::new(receiver)),
                location: token.span,
            }));
        }

        let location = self.current.span;
        let name = self.method_name()?;
        let (arguments, keyword_arguments) = if self.check(TokenType::LParen) {
            self.call_arguments()?
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Node::Send(Send {
            id: self.next_id(),
            name,
            receiver: Some(Box::new(receiver)),
            arguments,
            keyword_arguments,
            hash_map_literal: false,
            location,
        }))
    }

    pub(crate) fn call_arguments(&mut self) -> Result<(Vec<Node>, Vec<(String, Node)>), ParseError> {
        self.consume(TokenType::LParen, "'('")?;
        self.skip_newlines();

        let mut arguments = Vec::new();
        let mut keyword_arguments = Vec::new();

        if !self.check(TokenType::RParen) {
            loop {
                if self.check(TokenType::Identifier) && self.next.ty == TokenType::Colon {
                    let name = self.advance().lexeme;
                    self.advance(); // consume ':'
                    self.skip_newlines();
                    let value = self.value_expression()?;
                    keyword_arguments.push((name, value));
                } else {
                    arguments.push(self.value_expression()?);
                }

                if !self.match_token(TokenType::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }

        self.skip_newlines();
        self.consume(TokenType::RParen, "')'")?;
        Ok((arguments, keyword_arguments))
    }

    fn operand(&mut self) -> Result<Node, ParseError> {
        match self.current.ty {
            TokenType::IntLiteral => self.integer_literal(false),
            TokenType::FloatLiteral => self.float_literal(false),
            TokenType::Minus => {
                self.advance();
                match self.current.ty {
                    TokenType::IntLiteral => self.integer_literal(true),
                    TokenType::FloatLiteral => self.float_literal(true),
                    _ => Err(self.expected("a number literal")),
                }
            }
            TokenType::StringLiteral => {
                let token = self.advance();
                Ok(Node::StringLiteral(StringLiteral {
                    id: self.next_id(),
                    value: token.lexeme,
                    location: token.span,
                }))
            }
            TokenType::KwSelf => {
                let token = self.advance();
                Ok(Node::SelfLiteral(SelfLiteral {
                    id: self.next_id(),
                    location: token.span,
                }))
            }
            TokenType::Identifier => self.identifier_or_call(),
            TokenType::Constant => {
                let token = self.advance();
                Ok(Node::Constant(Constant {
                    id: self.next_id(),
                    name: token.lexeme,
                    receiver: None,
                    location: token.span,
                }))
            }
            TokenType::Attribute => {
                let token = self.advance();
                Ok(Node::Attribute(Attribute {
                    id: self.next_id(),
                    name: token.lexeme,
                    location: token.span,
                }))
            }
            TokenType::KwDo => self.closure(BlockKind::Closure),
            TokenType::KwLambda => self.closure(BlockKind::Lambda),
            TokenType::LBrace => self.brace_closure(),
            TokenType::LBracket => self.array_literal(),
            TokenType::HashOpen => self.hash_literal(),
            TokenType::KwTry => self.try_expression(),
            TokenType::KwIntrinsic => self.raw_instruction(),
            TokenType::Star => self.dereference(),
            TokenType::LParen => {
                self.advance();
                self.skip_newlines();
                let node = self.value_expression()?;
                self.skip_newlines();
                self.consume(TokenType::RParen, "')'")?;
                Ok(node)
            }
            _ => Err(ParseError::new(
                ParserError::ExpectedExpression {
                    found: self.current.ty.as_str().to_string(),
                },
                self.current.span,
            )),
        }
    }

    fn integer_literal(&mut self, negate: bool) -> Result<Node, ParseError> {
        let token = self.advance();
        let value: i64 = token.lexeme.parse().unwrap_or(0);
        Ok(Node::IntegerLiteral(IntegerLiteral {
            id: self.next_id(),
            value: if negate { -value } else { value },
            location: token.span,
        }))
    }

    fn float_literal(&mut self, negate: bool) -> Result<Node, ParseError> {
        let token = self.advance();
        let value: f64 = token.lexeme.parse().unwrap_or(0.0);
        Ok(Node::FloatLiteral(FloatLiteral {
            id: self.next_id(),
            value: if negate { -value } else { value },
            location: token.span,
        }))
    }

    fn identifier_or_call(&mut self) -> Result<Node, ParseError> {
        let token = self.advance();

        if self.check(TokenType::LParen) {
            let (arguments, keyword_arguments) = self.call_arguments()?;
            return Ok(Node::Send(Send {
                id: self.next_id(),
                name: token.lexeme,
                receiver: None,
                arguments,
                keyword_arguments,
                hash_map_literal: false,
                location: token.span,
            }));
        }

        Ok(Node::Identifier(Identifier {
            id: self.next_id(),
            name: token.lexeme,
            location: token.span,
        }))
    }

    fn closure(&mut self, kind: BlockKind) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'do' or 'lambda'

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
        let body = self.body_block()?;

        Ok(Node::Block(Block {
            id: self.next_id(),
            kind,
            arguments,
            returns,
            throws,
            body,
            location,
        }))
    }

    /// `{ ... }` in expression position is a closure without arguments.
    fn brace_closure(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        let body = self.body_block()?;

        Ok(Node::Block(Block {
            id: self.next_id(),
            kind: BlockKind::Closure,
            arguments: Vec::new(),
            returns: None,
            throws: None,
            body,
            location,
        }))
    }

    /// `[a, b]` desugars to `Array.new(a, b)`.
    fn array_literal(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume '['
        self.skip_newlines();

        let mut arguments = Vec::new();
        if !self.check(TokenType::RBracket) {
            loop {
                arguments.push(self.value_expression()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }
        self.skip_newlines();
        self.consume(TokenType::RBracket, "']'")?;

        let receiver = Node::Constant(Constant {
            id: self.next_id(),
            name: "Array".to_string(),
            receiver: None,
            location,
        });

        Ok(Node::Send(Send {
            id: self.next_id(),
            name: "new".to_string(),
            receiver: Some(Box::new(receiver)),
            arguments,
            keyword_arguments: Vec::new(),
            hash_map_literal: false,
            location,
        }))
    }

    /// `%[k: v]` desugars to a send the generator expands into
    /// `HashMap.new` plus one `[]=` send per pair. Keys and values are
    /// stored flat in `arguments`, keys at even indices.
    fn hash_literal(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume '%['
        self.skip_newlines();

        let mut arguments = Vec::new();
        if !self.check(TokenType::RBracket) {
            loop {
                let key = self.value_expression()?;
                self.consume(TokenType::Colon, "':'")?;
                self.skip_newlines();
                let value = self.value_expression()?;
                arguments.push(key);
                arguments.push(value);

                if !self.match_token(TokenType::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }
        self.skip_newlines();
        self.consume(TokenType::RBracket, "']'")?;

        let receiver = Node::Constant(Constant {
            id: self.next_id(),
            name: "HashMap".to_string(),
            receiver: None,
            location,
        });

        Ok(Node::Send(Send {
            id: self.next_id(),
            name: "new".to_string(),
            receiver: Some(Box::new(receiver)),
            arguments,
            keyword_arguments: Vec::new(),
            hash_map_literal: true,
            location,
        }))
    }

    fn try_expression(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume 'try'

        let expression = self.value_expression()?;

        let mut else_argument = None;
        let mut else_body = None;
        if self.match_token(TokenType::KwElse) {
            if self.match_token(TokenType::LParen) {
                let token = self.consume(TokenType::Identifier, "an error argument name")?;
                else_argument = Some(token.lexeme);
                self.consume(TokenType::RParen, "')'")?;
            }
            else_body = Some(self.body_block()?);
        }

        Ok(Node::Try(Try {
            id: self.next_id(),
            expression: Box::new(expression),
            else_argument,
            else_body,
            location,
        }))
    }

    /// `_intrinsic.<name>(args)` names a VM opcode to emit directly.
    fn raw_instruction(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume '_intrinsic'
        self.consume(TokenType::Dot, "'.'")?;
        let name = self.consume(TokenType::Identifier, "an intrinsic name")?;

        let arguments = if self.check(TokenType::LParen) {
            let (arguments, _) = self.call_arguments()?;
            arguments
        } else {
            Vec::new()
        };

        Ok(Node::RawInstruction(RawInstruction {
            id: self.next_id(),
            name: name.lexeme,
            arguments,
            location,
        }))
    }

    fn dereference(&mut self) -> Result<Node, ParseError> {
        let location = self.current.span;
        self.advance(); // consume '*'
        let expression = self.operand()?;

        Ok(Node::Dereference(Dereference {
            id: self.next_id(),
            expression: Box::new(expression),
            location,
        }))
    }
}
