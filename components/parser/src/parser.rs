//! Recursive descent parser for JavaScript

use std::rc::Rc;

use crate::ast::*;
use crate::error::*;
use crate::lexer::{Keyword, Lexer, Punctuator, Token};
use core_types::{JsError, SourcePosition};

/// Binary-level operator recognized at the current token
#[derive(Debug, Clone, Copy)]
enum InfixOperator {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}

impl InfixOperator {
    fn precedence(&self) -> u8 {
        match self {
            InfixOperator::Logical(LogicalOperator::NullishCoalescing) => 1,
            InfixOperator::Logical(LogicalOperator::Or) => 2,
            InfixOperator::Logical(LogicalOperator::And) => 3,
            InfixOperator::Binary(op) => match op {
                BinaryOperator::BitOr => 4,
                BinaryOperator::BitXor => 5,
                BinaryOperator::BitAnd => 6,
                BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::StrictEq
                | BinaryOperator::StrictNotEq => 7,
                BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
                | BinaryOperator::In
                | BinaryOperator::Instanceof => 8,
                BinaryOperator::LeftShift
                | BinaryOperator::RightShift
                | BinaryOperator::UnsignedRightShift => 9,
                BinaryOperator::Add | BinaryOperator::Sub => 10,
                BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 11,
                BinaryOperator::Exp => 12,
            },
        }
    }
}

/// Deepest nesting of statements and expressions the parser accepts
pub const MAX_NESTING_DEPTH: usize = 256;

/// JavaScript parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Current nesting of statements, expressions and patterns
    nesting_depth: usize,
    /// Track loop depth for break/continue validation
    loop_depth: usize,
    /// Track switch depth for break validation
    switch_depth: usize,
    /// Track if we're in for loop init (disallows 'in' as relational operator)
    in_for_init: bool,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            nesting_depth: 0,
            loop_depth: 0,
            switch_depth: 0,
            in_for_init: false,
        }
    }

    /// Parse the source into a program
    pub fn parse(&mut self) -> Result<Program, JsError> {
        let mut body = Vec::new();
        while !self.is_at_end()? {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    fn is_at_end(&mut self) -> Result<bool, JsError> {
        Ok(matches!(self.lexer.peek_token()?, Token::EOF))
    }

    fn position(&mut self) -> Result<Option<SourcePosition>, JsError> {
        self.lexer.peek_token()?;
        Ok(Some(self.lexer.token_position))
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, JsError>) -> Result<T, JsError> {
        if self.nesting_depth >= MAX_NESTING_DEPTH {
            let position = self.position()?;
            return Err(syntax_error("Maximum nesting depth exceeded", position));
        }
        self.nesting_depth += 1;
        let result = parse(self);
        self.nesting_depth -= 1;
        result
    }

    // Statements

    fn parse_statement(&mut self) -> Result<Statement, JsError> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        let token = self.lexer.peek_token()?.clone();

        match token {
            Token::Punctuator(Punctuator::LBrace) => {
                let body = self.parse_block_body()?;
                Ok(Statement::BlockStatement { body, position })
            }
            Token::Punctuator(Punctuator::Semicolon) => {
                self.lexer.next_token()?;
                Ok(Statement::EmptyStatement { position })
            }
            Token::Keyword(Keyword::Var) | Token::Keyword(Keyword::Let) | Token::Keyword(Keyword::Const) => {
                let (kind, declarations) = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(Statement::VariableDeclaration {
                    kind,
                    declarations,
                    position,
                })
            }
            Token::Keyword(Keyword::Function) => self.parse_function_declaration(),
            Token::Keyword(Keyword::If) => self.parse_if_statement(),
            Token::Keyword(Keyword::While) => self.parse_while_statement(),
            Token::Keyword(Keyword::Do) => self.parse_do_while_statement(),
            Token::Keyword(Keyword::For) => self.parse_for_statement(),
            Token::Keyword(Keyword::Return) => self.parse_return_statement(),
            Token::Keyword(Keyword::Break) => self.parse_break_statement(),
            Token::Keyword(Keyword::Continue) => self.parse_continue_statement(),
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            Token::Keyword(Keyword::Try) => self.parse_try_statement(),
            Token::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            Token::Keyword(Keyword::Class) => Err(unsupported("Class declarations", position)),
            Token::Keyword(Keyword::Import) | Token::Keyword(Keyword::Export) => Err(syntax_error(
                "import/export statements are not supported; use require() and module.exports",
                position,
            )),
            Token::Keyword(Keyword::With) => Err(unsupported("'with' statements", position)),
            Token::Keyword(Keyword::Debugger) => {
                self.lexer.next_token()?;
                self.consume_semicolon()?;
                Ok(Statement::EmptyStatement { position })
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        let expression = self.parse_expression()?;

        if matches!(expression, Expression::Identifier { .. }) && self.check_punctuator(Punctuator::Colon)? {
            return Err(unsupported("Labeled statements", position));
        }

        self.consume_semicolon()?;
        Ok(Statement::ExpressionStatement { expression, position })
    }

    fn parse_variable_declaration(&mut self) -> Result<(VariableKind, Vec<VariableDeclarator>), JsError> {
        let kind = self.parse_variable_kind()?;
        let mut declarations = Vec::new();

        loop {
            let position = self.position()?;
            let id = self.parse_binding_target()?;
            let init = if self.check_punctuator(Punctuator::Assign)? {
                self.lexer.next_token()?;
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            self.check_declarator_initializer(kind, &id, init.is_some(), position)?;
            declarations.push(VariableDeclarator { id, init });

            if !self.check_punctuator(Punctuator::Comma)? {
                break;
            }
            self.lexer.next_token()?;
        }

        Ok((kind, declarations))
    }

    fn parse_variable_kind(&mut self) -> Result<VariableKind, JsError> {
        let position = self.position()?;
        match self.lexer.next_token()? {
            Token::Keyword(Keyword::Var) => Ok(VariableKind::Var),
            Token::Keyword(Keyword::Let) => Ok(VariableKind::Let),
            Token::Keyword(Keyword::Const) => Ok(VariableKind::Const),
            token => Err(expected("variable declaration", &token, position)),
        }
    }

    fn check_declarator_initializer(
        &self,
        kind: VariableKind,
        id: &Pattern,
        has_init: bool,
        position: Option<SourcePosition>,
    ) -> Result<(), JsError> {
        if has_init {
            return Ok(());
        }
        if kind == VariableKind::Const {
            return Err(syntax_error("Missing initializer in const declaration", position));
        }
        if !matches!(id, Pattern::Identifier(_)) {
            return Err(syntax_error("Missing initializer in destructuring declaration", position));
        }
        Ok(())
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Function)?;
        if self.check_punctuator(Punctuator::Star)? {
            return Err(unsupported("Generator functions", position));
        }
        let name = self.expect_identifier()?;
        let function = self.parse_function_rest(Some(name), position)?;
        Ok(Statement::FunctionDeclaration { function, position })
    }

    /// Parse parameters and body of a non-arrow function.
    fn parse_function_rest(
        &mut self,
        name: Option<String>,
        position: Option<SourcePosition>,
    ) -> Result<Rc<FunctionNode>, JsError> {
        let params = self.parse_parameters()?;
        let body = self.parse_function_body()?;
        Ok(Rc::new(FunctionNode {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            position,
        }))
    }

    fn parse_parameters(&mut self) -> Result<Vec<Pattern>, JsError> {
        self.expect_punctuator(Punctuator::LParen)?;
        let mut params = Vec::new();

        while !self.check_punctuator(Punctuator::RParen)? {
            if self.check_punctuator(Punctuator::Spread)? {
                self.lexer.next_token()?;
                let target = self.parse_binding_target()?;
                params.push(Pattern::RestElement(Box::new(target)));
                let position = self.position()?;
                if !self.check_punctuator(Punctuator::RParen)? {
                    return Err(syntax_error("Rest parameter must be last formal parameter", position));
                }
                break;
            }

            params.push(self.parse_binding_element()?);

            if !self.check_punctuator(Punctuator::RParen)? {
                self.expect_punctuator(Punctuator::Comma)?;
            }
        }

        self.expect_punctuator(Punctuator::RParen)?;
        Ok(params)
    }

    fn parse_function_body(&mut self) -> Result<Vec<Statement>, JsError> {
        let saved = (self.loop_depth, self.switch_depth, self.in_for_init);
        self.loop_depth = 0;
        self.switch_depth = 0;
        self.in_for_init = false;
        let body = self.parse_block_body();
        (self.loop_depth, self.switch_depth, self.in_for_init) = saved;
        body
    }

    fn parse_block_body(&mut self) -> Result<Vec<Statement>, JsError> {
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut body = Vec::new();
        while !self.check_punctuator(Punctuator::RBrace)? {
            if self.is_at_end()? {
                let position = self.position()?;
                return Err(unexpected_eof(position));
            }
            body.push(self.parse_statement()?);
        }
        self.expect_punctuator(Punctuator::RBrace)?;
        Ok(body)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::If)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check_keyword(Keyword::Else)? {
            self.lexer.next_token()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::IfStatement {
            test,
            consequent,
            alternate,
            position,
        })
    }

    fn parse_loop_body(&mut self) -> Result<Box<Statement>, JsError> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        Ok(Box::new(body?))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::While)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::WhileStatement { test, body, position })
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.parse_loop_body()?;
        self.expect_keyword(Keyword::While)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        // ASI always applies after the closing paren of do-while
        if self.check_punctuator(Punctuator::Semicolon)? {
            self.lexer.next_token()?;
        }
        Ok(Statement::DoWhileStatement { body, test, position })
    }

    fn parse_for_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::For)?;
        if self.check_identifier("await")? {
            return Err(unsupported("for await loops", position));
        }
        self.expect_punctuator(Punctuator::LParen)?;

        let init = if self.check_punctuator(Punctuator::Semicolon)? {
            None
        } else if matches!(
            self.lexer.peek_token()?,
            Token::Keyword(Keyword::Var) | Token::Keyword(Keyword::Let) | Token::Keyword(Keyword::Const)
        ) {
            let kind = self.parse_variable_kind()?;
            let declarator_position = self.position()?;
            let id = self.parse_binding_target()?;

            if self.check_keyword(Keyword::In)? || self.check_identifier("of")? {
                let left = ForInOfLeft::VariableDeclaration { kind, id };
                return self.parse_for_in_of_rest(left, position);
            }

            let mut declarations = Vec::new();
            let mut id = id;
            let mut declarator_position = declarator_position;
            loop {
                let init = if self.check_punctuator(Punctuator::Assign)? {
                    self.lexer.next_token()?;
                    Some(self.parse_for_init_expression(Self::parse_assignment_expression)?)
                } else {
                    None
                };
                self.check_declarator_initializer(kind, &id, init.is_some(), declarator_position)?;
                declarations.push(VariableDeclarator { id, init });

                if !self.check_punctuator(Punctuator::Comma)? {
                    break;
                }
                self.lexer.next_token()?;
                declarator_position = self.position()?;
                id = self.parse_binding_target()?;
            }
            Some(ForInit::VariableDeclaration { kind, declarations })
        } else {
            let expression = self.parse_for_init_expression(Self::parse_expression)?;
            if self.check_keyword(Keyword::In)? || self.check_identifier("of")? {
                let target = self.expression_to_pattern(expression)?;
                return self.parse_for_in_of_rest(ForInOfLeft::Pattern(target), position);
            }
            Some(ForInit::Expression(expression))
        };

        self.expect_punctuator(Punctuator::Semicolon)?;
        let test = if self.check_punctuator(Punctuator::Semicolon)? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punctuator(Punctuator::Semicolon)?;
        let update = if self.check_punctuator(Punctuator::RParen)? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punctuator(Punctuator::RParen)?;
        let body = self.parse_loop_body()?;

        Ok(Statement::ForStatement {
            init,
            test,
            update,
            body,
            position,
        })
    }

    fn parse_for_init_expression(
        &mut self,
        parse: fn(&mut Self) -> Result<Expression, JsError>,
    ) -> Result<Expression, JsError> {
        let saved = self.in_for_init;
        self.in_for_init = true;
        let result = parse(self);
        self.in_for_init = saved;
        result
    }

    /// Parse `in expr) body` or `of expr) body` after the loop's left side.
    fn parse_for_in_of_rest(
        &mut self,
        left: ForInOfLeft,
        position: Option<SourcePosition>,
    ) -> Result<Statement, JsError> {
        if self.check_keyword(Keyword::In)? {
            self.lexer.next_token()?;
            let right = self.parse_expression()?;
            self.expect_punctuator(Punctuator::RParen)?;
            let body = self.parse_loop_body()?;
            Ok(Statement::ForInStatement {
                left,
                right,
                body,
                position,
            })
        } else {
            self.lexer.next_token()?; // of
            let right = self.parse_assignment_expression()?;
            self.expect_punctuator(Punctuator::RParen)?;
            let body = self.parse_loop_body()?;
            Ok(Statement::ForOfStatement {
                left,
                right,
                body,
                position,
            })
        }
    }

    fn parse_return_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Return)?;
        let argument = if self.at_statement_end()? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::ReturnStatement { argument, position })
    }

    fn parse_break_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Break)?;
        if !self.at_statement_end()? && matches!(self.lexer.peek_token()?, Token::Identifier(_)) {
            return Err(unsupported("Labeled statements", position));
        }
        if self.loop_depth == 0 && self.switch_depth == 0 {
            return Err(syntax_error("Illegal break statement", position));
        }
        self.consume_semicolon()?;
        Ok(Statement::BreakStatement { position })
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Continue)?;
        if !self.at_statement_end()? && matches!(self.lexer.peek_token()?, Token::Identifier(_)) {
            return Err(unsupported("Labeled statements", position));
        }
        if self.loop_depth == 0 {
            return Err(syntax_error(
                "Illegal continue statement: no surrounding iteration statement",
                position,
            ));
        }
        self.consume_semicolon()?;
        Ok(Statement::ContinueStatement { position })
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Throw)?;
        self.lexer.peek_token()?;
        if self.lexer.line_terminator_before_token {
            return Err(syntax_error("Illegal newline after throw", position));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::ThrowStatement { argument, position })
    }

    fn parse_try_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Try)?;
        let block = self.parse_block_body()?;

        let handler = if self.check_keyword(Keyword::Catch)? {
            self.lexer.next_token()?;
            let param = if self.check_punctuator(Punctuator::LParen)? {
                self.lexer.next_token()?;
                let param = self.parse_binding_target()?;
                self.expect_punctuator(Punctuator::RParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block_body()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.check_keyword(Keyword::Finally)? {
            self.lexer.next_token()?;
            Some(self.parse_block_body()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(syntax_error("Missing catch or finally after try", position));
        }

        Ok(Statement::TryStatement {
            block,
            handler,
            finalizer,
            position,
        })
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Switch)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        self.expect_punctuator(Punctuator::LBrace)?;

        self.switch_depth += 1;
        let cases = self.parse_switch_cases();
        self.switch_depth -= 1;
        let cases = cases?;

        self.expect_punctuator(Punctuator::RBrace)?;
        Ok(Statement::SwitchStatement {
            discriminant,
            cases,
            position,
        })
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, JsError> {
        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check_punctuator(Punctuator::RBrace)? {
            let position = self.position()?;
            let test = match self.lexer.next_token()? {
                Token::Keyword(Keyword::Case) => Some(self.parse_expression()?),
                Token::Keyword(Keyword::Default) => {
                    if seen_default {
                        return Err(syntax_error("More than one default clause in switch statement", position));
                    }
                    seen_default = true;
                    None
                }
                token => return Err(expected("'case' or 'default'", &token, position)),
            };
            self.expect_punctuator(Punctuator::Colon)?;

            let mut consequent = Vec::new();
            while !self.check_keyword(Keyword::Case)?
                && !self.check_keyword(Keyword::Default)?
                && !self.check_punctuator(Punctuator::RBrace)?
            {
                if self.is_at_end()? {
                    let position = self.position()?;
                    return Err(unexpected_eof(position));
                }
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, consequent });
        }

        Ok(cases)
    }

    // Patterns

    fn parse_binding_target(&mut self) -> Result<Pattern, JsError> {
        if self.check_punctuator(Punctuator::LBrace)? {
            self.nested(Self::parse_object_pattern)
        } else if self.check_punctuator(Punctuator::LBracket)? {
            self.nested(Self::parse_array_pattern)
        } else {
            Ok(Pattern::Identifier(self.expect_identifier()?))
        }
    }

    /// Binding target with an optional `= default`.
    fn parse_binding_element(&mut self) -> Result<Pattern, JsError> {
        let target = self.parse_binding_target()?;
        if self.check_punctuator(Punctuator::Assign)? {
            self.lexer.next_token()?;
            let default = self.parse_assignment_expression()?;
            return Ok(Pattern::AssignmentPattern {
                left: Box::new(target),
                right: Box::new(default),
            });
        }
        Ok(target)
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, JsError> {
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut properties = Vec::new();
        let mut rest = None;

        while !self.check_punctuator(Punctuator::RBrace)? {
            if self.check_punctuator(Punctuator::Spread)? {
                self.lexer.next_token()?;
                rest = Some(Box::new(Pattern::Identifier(self.expect_identifier()?)));
                break;
            }

            let position = self.position()?;
            let (key, is_identifier) = self.parse_property_key()?;
            let value = if self.check_punctuator(Punctuator::Colon)? {
                self.lexer.next_token()?;
                self.parse_binding_element()?
            } else {
                let name = match (&key, is_identifier) {
                    (PropertyKey::Identifier(name), true) => name.clone(),
                    _ => return Err(syntax_error("Expected ':' in object pattern", position)),
                };
                let target = Pattern::Identifier(name);
                if self.check_punctuator(Punctuator::Assign)? {
                    self.lexer.next_token()?;
                    let default = self.parse_assignment_expression()?;
                    Pattern::AssignmentPattern {
                        left: Box::new(target),
                        right: Box::new(default),
                    }
                } else {
                    target
                }
            };
            properties.push(PatternProperty { key, value });

            if !self.check_punctuator(Punctuator::RBrace)? {
                self.expect_punctuator(Punctuator::Comma)?;
            }
        }

        self.expect_punctuator(Punctuator::RBrace)?;
        Ok(Pattern::ObjectPattern { properties, rest })
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, JsError> {
        self.expect_punctuator(Punctuator::LBracket)?;
        let mut elements = Vec::new();

        while !self.check_punctuator(Punctuator::RBracket)? {
            if self.check_punctuator(Punctuator::Comma)? {
                self.lexer.next_token()?;
                elements.push(None);
                continue;
            }
            if self.check_punctuator(Punctuator::Spread)? {
                self.lexer.next_token()?;
                let target = self.parse_binding_target()?;
                elements.push(Some(Pattern::RestElement(Box::new(target))));
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.check_punctuator(Punctuator::RBracket)? {
                self.expect_punctuator(Punctuator::Comma)?;
            }
        }

        self.expect_punctuator(Punctuator::RBracket)?;
        Ok(Pattern::ArrayPattern(elements))
    }

    // Expressions

    fn parse_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let first = self.parse_assignment_expression()?;
        if !self.check_punctuator(Punctuator::Comma)? {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.check_punctuator(Punctuator::Comma)? {
            self.lexer.next_token()?;
            expressions.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::SequenceExpression { expressions, position })
    }

    fn parse_assignment_expression(&mut self) -> Result<Expression, JsError> {
        self.nested(Self::parse_assignment_kind)
    }

    fn parse_assignment_kind(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let left = self.parse_conditional_expression()?;

        if self.check_punctuator(Punctuator::Arrow)? {
            if let Expression::CallExpression { callee, .. } = &left {
                if matches!(callee.as_ref(), Expression::Identifier { name, .. } if name == "async") {
                    return Err(unsupported("Async functions", position));
                }
            }
        }

        let operator = match self.check_assignment_operator()? {
            Some(operator) => operator,
            None => return Ok(left),
        };
        let operator_position = self.position()?;
        self.lexer.next_token()?;

        let target = match left {
            Expression::Identifier { name, .. } => AssignmentTarget::Identifier(name),
            Expression::MemberExpression { optional: false, .. } => AssignmentTarget::Member(Box::new(left)),
            Expression::ArrayExpression { .. } | Expression::ObjectExpression { .. }
                if operator == AssignmentOperator::Assign =>
            {
                AssignmentTarget::Pattern(self.expression_to_pattern(left)?)
            }
            _ => {
                return Err(syntax_error(
                    "Invalid left-hand side in assignment",
                    operator_position,
                ))
            }
        };

        let right = self.parse_assignment_expression()?;
        Ok(Expression::AssignmentExpression {
            left: target,
            operator,
            right: Box::new(right),
            position,
        })
    }

    fn check_assignment_operator(&mut self) -> Result<Option<AssignmentOperator>, JsError> {
        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(p) => match p {
                Punctuator::Assign => AssignmentOperator::Assign,
                Punctuator::PlusEq => AssignmentOperator::Compound(BinaryOperator::Add),
                Punctuator::MinusEq => AssignmentOperator::Compound(BinaryOperator::Sub),
                Punctuator::StarEq => AssignmentOperator::Compound(BinaryOperator::Mul),
                Punctuator::SlashEq => AssignmentOperator::Compound(BinaryOperator::Div),
                Punctuator::PercentEq => AssignmentOperator::Compound(BinaryOperator::Mod),
                Punctuator::StarStarEq => AssignmentOperator::Compound(BinaryOperator::Exp),
                Punctuator::AndEq => AssignmentOperator::Compound(BinaryOperator::BitAnd),
                Punctuator::OrEq => AssignmentOperator::Compound(BinaryOperator::BitOr),
                Punctuator::XorEq => AssignmentOperator::Compound(BinaryOperator::BitXor),
                Punctuator::LtLtEq => AssignmentOperator::Compound(BinaryOperator::LeftShift),
                Punctuator::GtGtEq => AssignmentOperator::Compound(BinaryOperator::RightShift),
                Punctuator::GtGtGtEq => AssignmentOperator::Compound(BinaryOperator::UnsignedRightShift),
                Punctuator::AndAndEq => AssignmentOperator::AndAssign,
                Punctuator::OrOrEq => AssignmentOperator::OrAssign,
                Punctuator::NullishCoalesceEq => AssignmentOperator::NullishAssign,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(operator))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let test = self.parse_binary_expression(1)?;

        if !self.check_punctuator(Punctuator::Question)? {
            return Ok(test);
        }
        self.lexer.next_token()?;

        let consequent = self.with_in_allowed(Self::parse_assignment_expression)?;
        self.expect_punctuator(Punctuator::Colon)?;
        let alternate = self.parse_assignment_expression()?;

        Ok(Expression::ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            position,
        })
    }

    /// Precedence climbing over all binary and logical operators.
    fn parse_binary_expression(&mut self, min_precedence: u8) -> Result<Expression, JsError> {
        let position = self.position()?;
        let mut left = self.parse_unary_expression()?;

        while let Some(operator) = self.check_infix_operator()? {
            let precedence = operator.precedence();
            if precedence < min_precedence {
                break;
            }
            self.lexer.next_token()?;

            // Exponentiation is right-associative
            let next_min = match operator {
                InfixOperator::Binary(BinaryOperator::Exp) => precedence,
                _ => precedence + 1,
            };
            let right = self.nested(|parser| parser.parse_binary_expression(next_min))?;

            left = match operator {
                InfixOperator::Binary(operator) => Expression::BinaryExpression {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                    position,
                },
                InfixOperator::Logical(operator) => Expression::LogicalExpression {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                    position,
                },
            };
        }

        Ok(left)
    }

    fn check_infix_operator(&mut self) -> Result<Option<InfixOperator>, JsError> {
        let in_for_init = self.in_for_init;
        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(p) => match p {
                Punctuator::NullishCoalesce => InfixOperator::Logical(LogicalOperator::NullishCoalescing),
                Punctuator::OrOr => InfixOperator::Logical(LogicalOperator::Or),
                Punctuator::AndAnd => InfixOperator::Logical(LogicalOperator::And),
                Punctuator::Or => InfixOperator::Binary(BinaryOperator::BitOr),
                Punctuator::Xor => InfixOperator::Binary(BinaryOperator::BitXor),
                Punctuator::And => InfixOperator::Binary(BinaryOperator::BitAnd),
                Punctuator::EqEq => InfixOperator::Binary(BinaryOperator::Eq),
                Punctuator::NotEq => InfixOperator::Binary(BinaryOperator::NotEq),
                Punctuator::EqEqEq => InfixOperator::Binary(BinaryOperator::StrictEq),
                Punctuator::NotEqEq => InfixOperator::Binary(BinaryOperator::StrictNotEq),
                Punctuator::Lt => InfixOperator::Binary(BinaryOperator::Lt),
                Punctuator::LtEq => InfixOperator::Binary(BinaryOperator::LtEq),
                Punctuator::Gt => InfixOperator::Binary(BinaryOperator::Gt),
                Punctuator::GtEq => InfixOperator::Binary(BinaryOperator::GtEq),
                Punctuator::LtLt => InfixOperator::Binary(BinaryOperator::LeftShift),
                Punctuator::GtGt => InfixOperator::Binary(BinaryOperator::RightShift),
                Punctuator::GtGtGt => InfixOperator::Binary(BinaryOperator::UnsignedRightShift),
                Punctuator::Plus => InfixOperator::Binary(BinaryOperator::Add),
                Punctuator::Minus => InfixOperator::Binary(BinaryOperator::Sub),
                Punctuator::Star => InfixOperator::Binary(BinaryOperator::Mul),
                Punctuator::Slash => InfixOperator::Binary(BinaryOperator::Div),
                Punctuator::Percent => InfixOperator::Binary(BinaryOperator::Mod),
                Punctuator::StarStar => InfixOperator::Binary(BinaryOperator::Exp),
                _ => return Ok(None),
            },
            Token::Keyword(Keyword::In) if !in_for_init => InfixOperator::Binary(BinaryOperator::In),
            Token::Keyword(Keyword::Instanceof) => InfixOperator::Binary(BinaryOperator::Instanceof),
            _ => return Ok(None),
        };
        Ok(Some(operator))
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::Not) => Some(UnaryOperator::Not),
            Token::Punctuator(Punctuator::Minus) => Some(UnaryOperator::Minus),
            Token::Punctuator(Punctuator::Plus) => Some(UnaryOperator::Plus),
            Token::Punctuator(Punctuator::Tilde) => Some(UnaryOperator::BitwiseNot),
            Token::Keyword(Keyword::Typeof) => Some(UnaryOperator::Typeof),
            Token::Keyword(Keyword::Void) => Some(UnaryOperator::Void),
            Token::Keyword(Keyword::Delete) => Some(UnaryOperator::Delete),
            _ => None,
        };

        if let Some(operator) = operator {
            self.lexer.next_token()?;
            let argument = self.nested(Self::parse_unary_expression)?;
            return Ok(Expression::UnaryExpression {
                operator,
                argument: Box::new(argument),
                position,
            });
        }

        let update = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::PlusPlus) => Some(UpdateOperator::Increment),
            Token::Punctuator(Punctuator::MinusMinus) => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.lexer.next_token()?;
            let argument = self.nested(Self::parse_unary_expression)?;
            self.validate_update_target(&argument, "prefix", position)?;
            return Ok(Expression::UpdateExpression {
                operator,
                argument: Box::new(argument),
                prefix: true,
                position,
            });
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let expression = self.parse_left_hand_side_expression()?;

        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::PlusPlus) => UpdateOperator::Increment,
            Token::Punctuator(Punctuator::MinusMinus) => UpdateOperator::Decrement,
            _ => return Ok(expression),
        };
        // `a\n++b` is two statements
        if self.lexer.line_terminator_before_token {
            return Ok(expression);
        }
        self.lexer.next_token()?;
        self.validate_update_target(&expression, "postfix", position)?;

        Ok(Expression::UpdateExpression {
            operator,
            argument: Box::new(expression),
            prefix: false,
            position,
        })
    }

    fn validate_update_target(
        &self,
        expression: &Expression,
        form: &str,
        position: Option<SourcePosition>,
    ) -> Result<(), JsError> {
        match expression {
            Expression::Identifier { .. } | Expression::MemberExpression { optional: false, .. } => Ok(()),
            _ => Err(syntax_error(
                format!("Invalid left-hand side expression in {} operation", form),
                position,
            )),
        }
    }

    fn parse_left_hand_side_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let mut expression = if self.check_keyword(Keyword::New)? {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        let mut optional_chain = false;
        loop {
            if self.check_punctuator(Punctuator::Dot)? {
                self.lexer.next_token()?;
                expression = self.finish_dot_member(expression, false, position)?;
            } else if self.check_punctuator(Punctuator::OptionalChain)? {
                self.lexer.next_token()?;
                optional_chain = true;
                if self.check_punctuator(Punctuator::LParen)? {
                    let arguments = self.parse_arguments()?;
                    expression = Expression::CallExpression {
                        callee: Box::new(expression),
                        arguments,
                        optional: true,
                        position,
                    };
                } else if self.check_punctuator(Punctuator::LBracket)? {
                    expression = self.finish_computed_member(expression, true, position)?;
                } else {
                    expression = self.finish_dot_member(expression, true, position)?;
                }
            } else if self.check_punctuator(Punctuator::LBracket)? {
                expression = self.finish_computed_member(expression, false, position)?;
            } else if self.check_punctuator(Punctuator::LParen)? {
                let arguments = self.parse_arguments()?;
                expression = Expression::CallExpression {
                    callee: Box::new(expression),
                    arguments,
                    optional: false,
                    position,
                };
            } else if matches!(
                self.lexer.peek_token()?,
                Token::TemplateLiteral(_) | Token::TemplateHead(_)
            ) {
                let template_position = self.position()?;
                return Err(unsupported("Tagged templates", template_position));
            } else {
                break;
            }
        }

        if optional_chain {
            expression = Expression::OptionalChain {
                expression: Box::new(expression),
                position,
            };
        }
        Ok(expression)
    }

    fn finish_dot_member(
        &mut self,
        object: Expression,
        optional: bool,
        position: Option<SourcePosition>,
    ) -> Result<Expression, JsError> {
        let property_position = self.position()?;
        let name = self.expect_property_name()?;
        Ok(Expression::MemberExpression {
            object: Box::new(object),
            property: Box::new(Expression::Identifier {
                name,
                position: property_position,
            }),
            computed: false,
            optional,
            position,
        })
    }

    fn finish_computed_member(
        &mut self,
        object: Expression,
        optional: bool,
        position: Option<SourcePosition>,
    ) -> Result<Expression, JsError> {
        self.expect_punctuator(Punctuator::LBracket)?;
        let property = self.with_in_allowed(Self::parse_expression)?;
        self.expect_punctuator(Punctuator::RBracket)?;
        Ok(Expression::MemberExpression {
            object: Box::new(object),
            property: Box::new(property),
            computed: true,
            optional,
            position,
        })
    }

    fn parse_new_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::New)?;
        if self.check_punctuator(Punctuator::Dot)? {
            return Err(unsupported("new.target expressions", position));
        }

        let mut callee = if self.check_keyword(Keyword::New)? {
            self.nested(Self::parse_new_expression)?
        } else {
            self.parse_primary_expression()?
        };
        let callee_position = callee.position();

        // Member accesses bind tighter than `new`; the first call ends the callee
        loop {
            if self.check_punctuator(Punctuator::Dot)? {
                self.lexer.next_token()?;
                callee = self.finish_dot_member(callee, false, callee_position)?;
            } else if self.check_punctuator(Punctuator::LBracket)? {
                callee = self.finish_computed_member(callee, false, callee_position)?;
            } else {
                break;
            }
        }

        let arguments = if self.check_punctuator(Punctuator::LParen)? {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expression::NewExpression {
            callee: Box::new(callee),
            arguments,
            position,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, JsError> {
        self.expect_punctuator(Punctuator::LParen)?;
        let saved = self.in_for_init;
        self.in_for_init = false;

        let mut arguments = Vec::new();
        let result = (|| {
            while !self.check_punctuator(Punctuator::RParen)? {
                arguments.push(self.parse_spread_or_assignment()?);
                if !self.check_punctuator(Punctuator::RParen)? {
                    self.expect_punctuator(Punctuator::Comma)?;
                }
            }
            self.expect_punctuator(Punctuator::RParen)
        })();

        self.in_for_init = saved;
        result?;
        Ok(arguments)
    }

    fn parse_spread_or_assignment(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        if self.check_punctuator(Punctuator::Spread)? {
            self.lexer.next_token()?;
            let argument = self.parse_assignment_expression()?;
            return Ok(Expression::SpreadElement {
                argument: Box::new(argument),
                position,
            });
        }
        self.parse_assignment_expression()
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let token = self.lexer.peek_token()?.clone();

        match token {
            Token::Identifier(name) => {
                self.lexer.next_token()?;
                if name == "async" && self.check_keyword(Keyword::Function)? && !self.lexer.line_terminator_before_token {
                    return Err(unsupported("Async functions", position));
                }
                if self.check_punctuator(Punctuator::Arrow)? && !self.lexer.line_terminator_before_token {
                    return self.parse_arrow_function(vec![Pattern::Identifier(name)], position);
                }
                Ok(Expression::Identifier { name, position })
            }
            Token::Number(value) => {
                self.lexer.next_token()?;
                Ok(Expression::Literal {
                    value: Literal::Number(value),
                    position,
                })
            }
            Token::String(value) => {
                self.lexer.next_token()?;
                Ok(Expression::Literal {
                    value: Literal::String(value),
                    position,
                })
            }
            Token::TemplateLiteral(_) | Token::TemplateHead(_) => self.parse_template_literal(),
            Token::Punctuator(Punctuator::Slash) | Token::Punctuator(Punctuator::SlashEq) => {
                match self.lexer.rescan_as_regexp()? {
                    Token::RegExp(pattern, flags) => Ok(Expression::RegExpLiteral {
                        pattern,
                        flags,
                        position,
                    }),
                    other => Err(unexpected_token(&other, position)),
                }
            }
            Token::Punctuator(Punctuator::LParen) => self.parse_parenthesized_or_arrow(),
            Token::Punctuator(Punctuator::LBracket) => self.parse_array_literal(),
            Token::Punctuator(Punctuator::LBrace) => self.parse_object_literal(),
            Token::Keyword(Keyword::This) => {
                self.lexer.next_token()?;
                Ok(Expression::ThisExpression { position })
            }
            Token::Keyword(Keyword::True) | Token::Keyword(Keyword::False) => {
                self.lexer.next_token()?;
                Ok(Expression::Literal {
                    value: Literal::Boolean(token == Token::Keyword(Keyword::True)),
                    position,
                })
            }
            Token::Keyword(Keyword::Null) => {
                self.lexer.next_token()?;
                Ok(Expression::Literal {
                    value: Literal::Null,
                    position,
                })
            }
            Token::Keyword(Keyword::Function) => self.parse_function_expression(),
            Token::Keyword(Keyword::Class) => Err(unsupported("Class expressions", position)),
            Token::Keyword(Keyword::Super) => Err(unsupported("'super' expressions", position)),
            Token::Keyword(Keyword::Import) => Err(syntax_error(
                "import expressions are not supported; use require()",
                position,
            )),
            Token::Keyword(Keyword::Yield) => Err(unsupported("Generator functions", position)),
            other => Err(unexpected_token(&other, position)),
        }
    }

    fn parse_function_expression(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        self.expect_keyword(Keyword::Function)?;
        if self.check_punctuator(Punctuator::Star)? {
            return Err(unsupported("Generator functions", position));
        }
        let name = if self.check_punctuator(Punctuator::LParen)? {
            None
        } else {
            Some(self.expect_identifier()?)
        };
        let function = self.parse_function_rest(name, position)?;
        Ok(Expression::FunctionExpression { function, position })
    }

    fn parse_template_literal(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();

        match self.lexer.next_token()? {
            Token::TemplateLiteral(text) => {
                quasis.push(text);
                return Ok(Expression::TemplateLiteral {
                    quasis,
                    expressions,
                    position,
                });
            }
            Token::TemplateHead(text) => quasis.push(text),
            other => return Err(unexpected_token(&other, position)),
        }

        loop {
            expressions.push(self.with_in_allowed(Self::parse_expression)?);
            let brace_position = self.position()?;
            if !self.check_punctuator(Punctuator::RBrace)? {
                let token = self.lexer.peek_token()?.clone();
                return Err(expected("'}' in template literal", &token, brace_position));
            }
            self.lexer.next_token()?;
            match self.lexer.scan_template_continuation()? {
                Token::TemplateMiddle(text) => quasis.push(text),
                Token::TemplateTail(text) => {
                    quasis.push(text);
                    break;
                }
                other => return Err(unexpected_token(&other, brace_position)),
            }
        }

        Ok(Expression::TemplateLiteral {
            quasis,
            expressions,
            position,
        })
    }

    /// Parse `( ... )` as either an arrow parameter list or a parenthesized expression.
    fn parse_parenthesized_or_arrow(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;

        // Try arrow parameters first; fall back to an expression on failure
        let saved = self.lexer.save();
        if let Ok(params) = self.parse_parameters() {
            if self.check_punctuator(Punctuator::Arrow)? && !self.lexer.line_terminator_before_token {
                return self.parse_arrow_function(params, position);
            }
        }
        self.lexer.restore(saved);

        self.expect_punctuator(Punctuator::LParen)?;
        let expression = self.with_in_allowed(Self::parse_expression)?;
        self.expect_punctuator(Punctuator::RParen)?;
        Ok(expression)
    }

    fn parse_arrow_function(
        &mut self,
        params: Vec<Pattern>,
        position: Option<SourcePosition>,
    ) -> Result<Expression, JsError> {
        self.expect_punctuator(Punctuator::Arrow)?;
        let body = if self.check_punctuator(Punctuator::LBrace)? {
            FunctionBody::Block(self.parse_function_body()?)
        } else {
            FunctionBody::Expression(Box::new(self.parse_assignment_expression()?))
        };
        let function = Rc::new(FunctionNode {
            name: None,
            params,
            body,
            is_arrow: true,
            position,
        });
        Ok(Expression::ArrowFunctionExpression { function, position })
    }

    fn parse_array_literal(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        self.expect_punctuator(Punctuator::LBracket)?;
        let saved = self.in_for_init;
        self.in_for_init = false;

        let mut elements = Vec::new();
        let result = (|| {
            while !self.check_punctuator(Punctuator::RBracket)? {
                if self.check_punctuator(Punctuator::Comma)? {
                    self.lexer.next_token()?;
                    elements.push(None);
                    continue;
                }
                elements.push(Some(self.parse_spread_or_assignment()?));
                if !self.check_punctuator(Punctuator::RBracket)? {
                    self.expect_punctuator(Punctuator::Comma)?;
                }
            }
            self.expect_punctuator(Punctuator::RBracket)
        })();

        self.in_for_init = saved;
        result?;
        Ok(Expression::ArrayExpression { elements, position })
    }

    fn parse_object_literal(&mut self) -> Result<Expression, JsError> {
        let position = self.position()?;
        self.expect_punctuator(Punctuator::LBrace)?;
        let saved = self.in_for_init;
        self.in_for_init = false;

        let mut properties = Vec::new();
        let result = (|| {
            while !self.check_punctuator(Punctuator::RBrace)? {
                properties.push(self.parse_object_property()?);
                if !self.check_punctuator(Punctuator::RBrace)? {
                    self.expect_punctuator(Punctuator::Comma)?;
                }
            }
            self.expect_punctuator(Punctuator::RBrace)
        })();

        self.in_for_init = saved;
        result?;
        Ok(Expression::ObjectExpression { properties, position })
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, JsError> {
        let position = self.position()?;

        if self.check_punctuator(Punctuator::Spread)? {
            self.lexer.next_token()?;
            return Ok(ObjectProperty::Spread(self.parse_assignment_expression()?));
        }
        if self.check_punctuator(Punctuator::Star)? {
            return Err(unsupported("Generator methods", position));
        }

        let (key, is_identifier) = self.parse_property_key()?;

        if let (PropertyKey::Identifier(name), true) = (&key, is_identifier) {
            let accessor_or_async = (name == "get" || name == "set" || name == "async")
                && !matches!(
                    self.lexer.peek_token()?,
                    Token::Punctuator(
                        Punctuator::Colon
                            | Punctuator::LParen
                            | Punctuator::Comma
                            | Punctuator::RBrace
                            | Punctuator::Assign
                    )
                );
            if accessor_or_async {
                let feature = if name == "async" {
                    "Async methods"
                } else {
                    "Getters and setters"
                };
                return Err(unsupported(feature, position));
            }
        }

        if self.check_punctuator(Punctuator::Colon)? {
            self.lexer.next_token()?;
            let value = self.parse_assignment_expression()?;
            return Ok(ObjectProperty::Property {
                key,
                value,
                shorthand: false,
            });
        }

        if self.check_punctuator(Punctuator::LParen)? {
            let name = match &key {
                PropertyKey::Identifier(name) | PropertyKey::String(name) => Some(name.clone()),
                _ => None,
            };
            let function = self.parse_function_rest(name, position)?;
            return Ok(ObjectProperty::Property {
                key,
                value: Expression::FunctionExpression { function, position },
                shorthand: false,
            });
        }

        // Shorthand `{ name }`, or `{ name = default }` in a destructuring cover grammar
        let name = match (&key, is_identifier) {
            (PropertyKey::Identifier(name), true) => name.clone(),
            _ => {
                let token = self.lexer.peek_token()?.clone();
                return Err(unexpected_token(&token, position));
            }
        };
        let mut value = Expression::Identifier {
            name: name.clone(),
            position,
        };
        if self.check_punctuator(Punctuator::Assign)? {
            self.lexer.next_token()?;
            let default = self.parse_assignment_expression()?;
            value = Expression::AssignmentExpression {
                left: AssignmentTarget::Identifier(name),
                operator: AssignmentOperator::Assign,
                right: Box::new(default),
                position,
            };
        }
        Ok(ObjectProperty::Property {
            key,
            value,
            shorthand: true,
        })
    }

    /// Parse a property key; the flag reports whether it was a plain identifier token.
    fn parse_property_key(&mut self) -> Result<(PropertyKey, bool), JsError> {
        let position = self.position()?;
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok((PropertyKey::Identifier(name), true)),
            Token::Keyword(keyword) => Ok((PropertyKey::Identifier(keyword.as_str().to_string()), false)),
            Token::String(value) => Ok((PropertyKey::String(value), false)),
            Token::Number(value) => Ok((PropertyKey::Number(value), false)),
            Token::Punctuator(Punctuator::LBracket) => {
                let expression = self.with_in_allowed(Self::parse_assignment_expression)?;
                self.expect_punctuator(Punctuator::RBracket)?;
                Ok((PropertyKey::Computed(Box::new(expression)), false))
            }
            token => Err(expected("property name", &token, position)),
        }
    }

    /// Reinterpret an expression as a destructuring assignment target.
    fn expression_to_pattern(&self, expression: Expression) -> Result<Pattern, JsError> {
        let position = expression.position();
        match expression {
            Expression::Identifier { name, .. } => Ok(Pattern::Identifier(name)),
            Expression::MemberExpression { optional: false, .. } => Ok(Pattern::Member(Box::new(expression))),
            Expression::AssignmentExpression {
                left,
                operator: AssignmentOperator::Assign,
                right,
                ..
            } => Ok(Pattern::AssignmentPattern {
                left: Box::new(self.assignment_target_to_pattern(left)),
                right,
            }),
            Expression::ArrayExpression { elements, .. } => {
                let count = elements.len();
                let mut patterns = Vec::with_capacity(count);
                for (index, element) in elements.into_iter().enumerate() {
                    let pattern = match element {
                        None => None,
                        Some(Expression::SpreadElement { argument, position }) => {
                            if index + 1 != count {
                                return Err(syntax_error("Rest element must be last element", position));
                            }
                            Some(Pattern::RestElement(Box::new(self.expression_to_pattern(*argument)?)))
                        }
                        Some(element) => Some(self.expression_to_pattern(element)?),
                    };
                    patterns.push(pattern);
                }
                Ok(Pattern::ArrayPattern(patterns))
            }
            Expression::ObjectExpression { properties, .. } => {
                let count = properties.len();
                let mut pattern_properties = Vec::with_capacity(count);
                let mut rest = None;
                for (index, property) in properties.into_iter().enumerate() {
                    match property {
                        ObjectProperty::Property { key, value, .. } => {
                            let value = self.expression_to_pattern(value)?;
                            pattern_properties.push(PatternProperty { key, value });
                        }
                        ObjectProperty::Spread(argument) => {
                            if index + 1 != count {
                                return Err(syntax_error("Rest element must be last element", position));
                            }
                            rest = Some(Box::new(self.expression_to_pattern(argument)?));
                        }
                    }
                }
                Ok(Pattern::ObjectPattern {
                    properties: pattern_properties,
                    rest,
                })
            }
            _ => Err(syntax_error("Invalid destructuring assignment target", position)),
        }
    }

    fn assignment_target_to_pattern(&self, target: AssignmentTarget) -> Pattern {
        match target {
            AssignmentTarget::Identifier(name) => Pattern::Identifier(name),
            AssignmentTarget::Member(expression) => Pattern::Member(expression),
            AssignmentTarget::Pattern(pattern) => pattern,
        }
    }

    // Helper methods

    fn with_in_allowed<T>(&mut self, parse: fn(&mut Self) -> Result<T, JsError>) -> Result<T, JsError> {
        let saved = self.in_for_init;
        self.in_for_init = false;
        let result = parse(self);
        self.in_for_init = saved;
        result
    }

    fn check_punctuator(&mut self, p: Punctuator) -> Result<bool, JsError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Punctuator(ref x) if *x == p))
    }

    fn check_keyword(&mut self, k: Keyword) -> Result<bool, JsError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Keyword(ref x) if *x == k))
    }

    fn check_identifier(&mut self, name: &str) -> Result<bool, JsError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Identifier(ref x) if x == name))
    }

    fn expect_punctuator(&mut self, p: Punctuator) -> Result<(), JsError> {
        let position = self.position()?;
        let token = self.lexer.next_token()?;
        if let Token::Punctuator(ref x) = token {
            if *x == p {
                return Ok(());
            }
        }
        Err(unexpected_token(&token, position))
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<(), JsError> {
        let position = self.position()?;
        let token = self.lexer.next_token()?;
        if let Token::Keyword(ref x) = token {
            if *x == k {
                return Ok(());
            }
        }
        Err(expected(&format!("'{}'", k.as_str()), &token, position))
    }

    fn expect_identifier(&mut self) -> Result<String, JsError> {
        let position = self.position()?;
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok(name),
            token => Err(unexpected_token(&token, position)),
        }
    }

    /// Expect a property name (identifier or keyword) after `.`
    fn expect_property_name(&mut self) -> Result<String, JsError> {
        let position = self.position()?;
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok(name),
            Token::Keyword(keyword) => Ok(keyword.as_str().to_string()),
            token => Err(expected("property name", &token, position)),
        }
    }

    /// True where a `return`/`break`/`continue` operand cannot start.
    fn at_statement_end(&mut self) -> Result<bool, JsError> {
        let token = self.lexer.peek_token()?;
        Ok(matches!(
            token,
            Token::Punctuator(Punctuator::Semicolon) | Token::Punctuator(Punctuator::RBrace) | Token::EOF
        ) || self.lexer.line_terminator_before_token)
    }

    /// Consume a semicolon, implementing Automatic Semicolon Insertion (ASI)
    fn consume_semicolon(&mut self) -> Result<(), JsError> {
        // If there's an explicit semicolon, consume it
        if self.check_punctuator(Punctuator::Semicolon)? {
            self.lexer.next_token()?;
            return Ok(());
        }

        // Insert a semicolon before a line break, at end of input, or before `}`
        if self.lexer.line_terminator_before_token
            || self.is_at_end()?
            || self.check_punctuator(Punctuator::RBrace)?
        {
            return Ok(());
        }

        let position = self.position()?;
        let token = self.lexer.peek_token()?.clone();
        Err(unexpected_token(&token, position))
    }
}
