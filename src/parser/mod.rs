//=====================================================
// File: parser/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript recursive descent parser
// Objective: Transform token streams into the AST consumed by the evaluator,
//            enforcing block structure and operator precedence
//=====================================================

//=====================================================
// Section 1: Imports
//=====================================================

use thiserror::Error;
use tracing::debug;

use crate::ast::{BinaryOperator, ElseIf, Node, NodeKind, Program, UnaryOperator};
use crate::tokenizer::{Position, Token, TokenKind};

//=====================================================
// Section 2: Parse Errors
//=====================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Expected {expected} but found {found} at {position}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    #[error("Invalid assignment target at {position}")]
    InvalidAssignmentTarget { position: Position },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::InvalidAssignmentTarget { position } => *position,
        }
    }
}

//=====================================================
// Section 3: Parser State
//=====================================================

/// Parse a complete token stream into a [`Program`].
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse()
}

/// Recursive descent parser for RuleScript
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    //Function: new
    //Purpose: Initialize parser with a token stream, guaranteeing a final Eof
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, position));
        }
        Self { tokens, current: 0 }
    }

    //=====================================================
    // Section 4: Statement Parsing
    //=====================================================

    //Function: parse
    //Purpose: Consume all tokens and produce the top-level statement list
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
        }

        debug!(statements = statements.len(), "parsed program");
        Ok(Program::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        match &self.peek().kind {
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Identifier(_) if self.is_function_header() => self.parse_function_def(),
            _ => self.parse_expression_statement(),
        }
    }

    // A definition is `name(p1, p2):`. Anything else that starts with
    // `name(` is an ordinary call statement.
    fn is_function_header(&self) -> bool {
        if self.peek_at(1).kind != TokenKind::LeftParen {
            return false;
        }

        let mut offset = 2;
        if self.peek_at(offset).kind != TokenKind::RightParen {
            loop {
                if !matches!(self.peek_at(offset).kind, TokenKind::Identifier(_)) {
                    return false;
                }
                offset += 1;
                match self.peek_at(offset).kind {
                    TokenKind::Comma => offset += 1,
                    TokenKind::RightParen => break,
                    _ => return false,
                }
            }
        }

        self.peek_at(offset + 1).kind == TokenKind::Colon
    }

    /// Parse function definition: name(params): block
    fn parse_function_def(&mut self) -> Result<Node, ParseError> {
        let (name, position) = self.consume_identifier("function name")?;
        self.consume(&TokenKind::LeftParen, "'(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let (param, _) = self.consume_identifier("parameter name")?;
                params.push(param);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "')' after parameters")?;

        let body = self.parse_suite("function header")?;
        Ok(Node::new(NodeKind::FunctionDef { name, params, body }, position))
    }

    fn parse_if_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.advance().position;
        let condition = self.parse_expression()?;
        let then_block = self.parse_suite("if condition")?;

        let mut else_if_blocks = Vec::new();
        let mut else_block = None;
        while self.check(&TokenKind::Else) {
            if self.peek_at(1).kind == TokenKind::If {
                self.advance();
                self.advance();
                let condition = self.parse_expression()?;
                let block = self.parse_suite("else if condition")?;
                else_if_blocks.push(ElseIf { condition, block });
            } else {
                self.advance();
                else_block = Some(self.parse_suite("'else'")?);
                break;
            }
        }

        Ok(Node::new(
            NodeKind::IfStatement {
                condition: Box::new(condition),
                then_block,
                else_if_blocks,
                else_block,
            },
            position,
        ))
    }

    fn parse_for_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.advance().position;
        let (variable, _) = self.consume_identifier("loop variable after 'for'")?;
        self.consume(&TokenKind::In, "'in' after loop variable")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_suite("for clause")?;

        Ok(Node::new(
            NodeKind::ForLoop {
                variable,
                iterable: Box::new(iterable),
                body,
            },
            position,
        ))
    }

    fn parse_return_statement(&mut self) -> Result<Node, ParseError> {
        let position = self.advance().position;
        let value = if self.at_statement_end() {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.consume_statement_terminator()?;
        Ok(Node::new(NodeKind::ReturnStatement { value }, position))
    }

    // Assignment is recognised after the fact: parse an expression, and if an
    // `=` follows, the expression must have been a bare identifier.
    fn parse_expression_statement(&mut self) -> Result<Node, ParseError> {
        let expr = self.parse_expression()?;

        let statement = if self.check(&TokenKind::Assign) {
            let Node { kind, position } = expr;
            let NodeKind::Identifier { name } = kind else {
                return Err(ParseError::InvalidAssignmentTarget { position });
            };
            self.advance();
            let value = self.parse_expression()?;
            Node::new(
                NodeKind::Assignment {
                    name,
                    value: Box::new(value),
                },
                position,
            )
        } else {
            expr
        };

        self.consume_statement_terminator()?;
        Ok(statement)
    }

    //Function: parse_suite
    //Purpose: Parse `: NEWLINE INDENT statement+ DEDENT`
    fn parse_suite(&mut self, context: &str) -> Result<Vec<Node>, ParseError> {
        self.consume(&TokenKind::Colon, &format!("':' after {}", context))?;
        self.consume(&TokenKind::Newline, "end of line after ':'")?;
        self.consume(&TokenKind::Indent, "an indented block")?;

        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.match_token(&TokenKind::Dedent) || self.is_at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    //=====================================================
    // Section 5: Expression Parsing
    //=====================================================

    fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.parse_logical_or()
    }

    /// Parse logical OR expression: left || right
    fn parse_logical_or(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_logical_and()?;
        while let Some((operator, position)) = self.match_binary_op(&[TokenKind::Or]) {
            let right = self.parse_logical_and()?;
            expr = binary(operator, expr, right, position);
        }
        Ok(expr)
    }

    /// Parse logical AND expression: left && right
    fn parse_logical_and(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_equality()?;
        while let Some((operator, position)) = self.match_binary_op(&[TokenKind::And]) {
            let right = self.parse_equality()?;
            expr = binary(operator, expr, right, position);
        }
        Ok(expr)
    }

    /// Parse equality expression: ==, !=
    fn parse_equality(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_comparison()?;
        while let Some((operator, position)) =
            self.match_binary_op(&[TokenKind::EqualEqual, TokenKind::NotEqual])
        {
            let right = self.parse_comparison()?;
            expr = binary(operator, expr, right, position);
        }
        Ok(expr)
    }

    /// Parse comparison expression: <, >, <=, >=
    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_term()?;
        while let Some((operator, position)) = self.match_binary_op(&[
            TokenKind::Greater,
            TokenKind::Less,
            TokenKind::GreaterEqual,
            TokenKind::LessEqual,
        ]) {
            let right = self.parse_term()?;
            expr = binary(operator, expr, right, position);
        }
        Ok(expr)
    }

    /// Parse term expression: +, -
    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_factor()?;
        while let Some((operator, position)) =
            self.match_binary_op(&[TokenKind::Plus, TokenKind::Minus])
        {
            let right = self.parse_factor()?;
            expr = binary(operator, expr, right, position);
        }
        Ok(expr)
    }

    /// Parse factor expression: *, /, %
    fn parse_factor(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_power()?;
        while let Some((operator, position)) =
            self.match_binary_op(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent])
        {
            let right = self.parse_power()?;
            expr = binary(operator, expr, right, position);
        }
        Ok(expr)
    }

    /// Parse power expression: base ** exponent (right associative)
    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let base = self.parse_unary()?;
        if let Some((operator, position)) = self.match_binary_op(&[TokenKind::Power]) {
            let exponent = self.parse_power()?;
            return Ok(binary(operator, base, exponent, position));
        }
        Ok(base)
    }

    /// Parse unary expression: !, -
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let operator = match self.peek().kind {
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Not => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        let position = self.advance().position;
        let operand = self.parse_unary()?;
        Ok(Node::new(
            NodeKind::UnaryOp {
                operator,
                operand: Box::new(operand),
            },
            position,
        ))
    }

    /// Parse postfix chains: member access, method calls, indexing
    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::Dot) {
                let position = self.advance().position;
                let (name, _) = self.consume_identifier("property name after '.'")?;
                expr = if self.check(&TokenKind::LeftParen) {
                    let arguments = self.parse_arguments()?;
                    Node::new(
                        NodeKind::MethodCall {
                            object: Box::new(expr),
                            method: name,
                            arguments,
                        },
                        position,
                    )
                } else {
                    Node::new(
                        NodeKind::MemberAccess {
                            object: Box::new(expr),
                            property: name,
                        },
                        position,
                    )
                };
            } else if self.check(&TokenKind::LeftBracket) {
                let position = self.advance().position;
                let index = self.parse_expression()?;
                self.consume(&TokenKind::RightBracket, "']' after index")?;
                expr = Node::new(
                    NodeKind::ArrayAccess {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    position,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.peek().clone();
        let position = token.position;

        let kind = match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                NodeKind::NumberLiteral { value }
            }
            TokenKind::String(value) => {
                self.advance();
                NodeKind::StringLiteral { value }
            }
            TokenKind::Boolean(value) => {
                self.advance();
                NodeKind::BooleanLiteral { value }
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    let arguments = self.parse_arguments()?;
                    NodeKind::FunctionCall { name, arguments }
                } else {
                    NodeKind::Identifier { name }
                }
            }
            TokenKind::Subscribe => {
                self.advance();
                if !self.check(&TokenKind::LeftParen) {
                    return Err(self.unexpected("'(' after 'subscribe'"));
                }
                let arguments = self.parse_arguments()?;
                NodeKind::SubscribeCall { arguments }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "')'")?;
                return Ok(expr);
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(&TokenKind::RightBracket, "']' after array elements")?;
                NodeKind::ArrayLiteral { elements }
            }
            _ => return Err(self.unexpected("expression")),
        };

        Ok(Node::new(kind, position))
    }

    // Expects the cursor on '('.
    fn parse_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        self.consume(&TokenKind::LeftParen, "'('")?;
        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "')' after arguments")?;
        Ok(arguments)
    }

    //=====================================================
    // Section 6: Token Navigation
    //=====================================================

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    // Past the end this keeps returning the trailing Eof.
    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<(String, Position), ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let position = self.advance().position;
                Ok((name, position))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    // A simple statement ends at a newline. End of input and the close of the
    // enclosing block also terminate it without being consumed here.
    fn consume_statement_terminator(&mut self) -> Result<(), ParseError> {
        if self.match_token(&TokenKind::Newline) || self.at_statement_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof
        )
    }

    fn skip_newlines(&mut self) {
        while self.match_token(&TokenKind::Newline) {}
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.clone(),
            position: token.position,
        }
    }

    // Utility: match binary operator and return it with the operator position
    fn match_binary_op(&mut self, kinds: &[TokenKind]) -> Option<(BinaryOperator, Position)> {
        let operator = kinds.iter().find(|kind| self.check(kind)).and_then(|kind| {
            Some(match kind {
                TokenKind::Or => BinaryOperator::Or,
                TokenKind::And => BinaryOperator::And,
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                TokenKind::Power => BinaryOperator::Power,
                _ => return None,
            })
        })?;
        let position = self.advance().position;
        Some((operator, position))
    }
}

fn binary(operator: BinaryOperator, left: Node, right: Node, position: Position) -> Node {
    Node::new(
        NodeKind::BinaryOp {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        },
        position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_source(source: &str) -> Program {
        parse(tokenize(source).unwrap()).unwrap()
    }

    fn parse_error(source: &str) -> ParseError {
        parse(tokenize(source).unwrap()).unwrap_err()
    }

    fn single(source: &str) -> Node {
        let mut program = parse_source(source);
        assert_eq!(program.statements.len(), 1, "{program:?}");
        program.statements.remove(0)
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let node = single("1 + 2 * 3");
        let NodeKind::BinaryOp {
            operator, right, ..
        } = node.kind
        else {
            panic!("expected binary op");
        };
        assert_eq!(operator, BinaryOperator::Add);
        assert!(matches!(
            right.kind,
            NodeKind::BinaryOp {
                operator: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_power_is_right_associative_and_above_factor() {
        assert_eq!(single("2 ** 3 ** 2").to_string(), "(2 ** (3 ** 2))");
        assert_eq!(single("2 * 3 ** 2").to_string(), "(2 * (3 ** 2))");
    }

    #[test]
    fn test_logical_precedence() {
        assert_eq!(
            single("a || b && c == d").to_string(),
            "(a || (b && (c == d)))"
        );
        assert_eq!(single("!a && -b < c").to_string(), "((!a) && ((-b) < c))");
    }

    #[test]
    fn test_left_associative_subtraction() {
        assert_eq!(single("10 - 4 - 3").to_string(), "((10 - 4) - 3)");
    }

    #[test]
    fn test_assignment_statement() {
        let node = single("hp = max(0, hp - 3)");
        match node.kind {
            NodeKind::Assignment { name, value } => {
                assert_eq!(name, "hp");
                assert_eq!(value.type_name(), "FunctionCall");
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_error("x\ny + 1 = 3");
        assert!(matches!(err, ParseError::InvalidAssignmentTarget { .. }));
        assert_eq!(err.position().line, 2);
        assert!(err.to_string().starts_with("Invalid assignment target at line 2"));
    }

    #[test]
    fn test_function_definition_vs_call() {
        let program = parse_source("add(a, b):\n    return a + b\nadd(1, 2)\nnoop():\n    return\n");
        let kinds: Vec<_> = program.statements.iter().map(Node::type_name).collect();
        assert_eq!(kinds, vec!["FunctionDef", "FunctionCall", "FunctionDef"]);
        match &program.statements[2].kind {
            NodeKind::FunctionDef { params, body, .. } => {
                assert!(params.is_empty());
                assert!(matches!(
                    body[0].kind,
                    NodeKind::ReturnStatement { value: None }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_if_else_if_else_chain() {
        let source = "if x > 5:\n    a = 1\nelse if x > 2:\n    a = 2\nelse if x > 0:\n    a = 3\nelse:\n    a = 4\n";
        match single(source).kind {
            NodeKind::IfStatement {
                then_block,
                else_if_blocks,
                else_block,
                ..
            } => {
                assert_eq!(then_block.len(), 1);
                assert_eq!(else_if_blocks.len(), 2);
                assert_eq!(else_block.map(|b| b.len()), Some(1));
            }
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_blocks_close_correctly() {
        let source = "for x in xs:\n    if x:\n        y = x\n    z = 1\nw = 2\n";
        let program = parse_source(source);
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            NodeKind::ForLoop { variable, body, .. } => {
                assert_eq!(variable, "x");
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn test_postfix_chain() {
        let node = single("Owner.Attribute(\"HP\").value");
        match node.kind {
            NodeKind::MemberAccess { object, property } => {
                assert_eq!(property, "value");
                assert_eq!(object.type_name(), "MethodCall");
            }
            other => panic!("expected member access, got {other:?}"),
        }
        assert_eq!(single("m[1][0]").type_name(), "ArrayAccess");
    }

    #[test]
    fn test_subscribe_call() {
        match single("subscribe(\"OnTurnStart\", \"OnDamage\")").kind {
            NodeKind::SubscribeCall { arguments } => assert_eq!(arguments.len(), 2),
            other => panic!("expected subscribe, got {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_parenthesis_reports_position() {
        let err = parse_error("x = (1 + 2\ny = 3");
        assert!(err.to_string().contains("')'"), "{err}");
        assert_eq!(err.position().line, 1);
    }

    #[test]
    fn test_missing_block_after_colon() {
        let err = parse_error("if x:\ny = 1");
        assert!(err.to_string().contains("an indented block"), "{err}");
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_missing_colon() {
        let err = parse_error("for x in xs\n    y = x");
        assert!(err.to_string().starts_with("Expected ':' after for clause"), "{err}");
    }

    #[test]
    fn test_empty_program() {
        assert!(parse_source("").is_empty());
        assert!(parse_source("// nothing\n").is_empty());
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        let err = parse_error("x = 1 2");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }
}

//=====================================================
// End of file
//=====================================================
