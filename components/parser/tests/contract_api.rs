//! Contract tests for parser API
//!
//! These tests verify the parser component implements its contract correctly.

use core_types::{ErrorKind, JsError};
use parser::ast::{FunctionBody, Pattern, VariableKind};
use parser::{Expression, Lexer, Parser, Program, Statement, Token};

// =============================================================================
// Lexer Contract Tests
// =============================================================================

#[test]
fn test_lexer_next_token_returns_result() {
    let mut lexer = Lexer::new("let x = 42;");
    let result: Result<Token, JsError> = lexer.next_token();
    assert!(result.is_ok());
}

#[test]
fn test_lexer_peek_does_not_consume() {
    let mut lexer = Lexer::new("myVar");
    assert_eq!(lexer.peek_token().unwrap(), &Token::Identifier("myVar".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("myVar".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::EOF);
}

#[test]
fn test_lexer_reports_positions() {
    let mut lexer = Lexer::new("a\n  b");
    lexer.next_token().unwrap();
    lexer.next_token().unwrap();
    assert_eq!(lexer.token_position.line, 2);
    assert_eq!(lexer.token_position.column, 3);
}

#[test]
fn test_lexer_error_is_syntax_error() {
    let mut lexer = Lexer::new("@");
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert!(err.message.contains('@'));
}

// =============================================================================
// Parser Contract Tests
// =============================================================================

#[test]
fn test_parse_returns_program() {
    let result: Result<Program, JsError> = parser::parse("let x = 42;");
    assert_eq!(result.unwrap().body.len(), 1);
}

#[test]
fn test_parse_empty_source() {
    assert!(parser::parse("").unwrap().body.is_empty());
    assert!(parser::parse("// only a comment\n").unwrap().body.is_empty());
}

#[test]
fn test_parse_commonjs_module() {
    let source = r#"
        const { add } = require('./math.js');
        function double(x) {
            return add(x, x);
        }
        module.exports = { double };
        exports.version = '1.0';
    "#;
    let program = parser::parse(source).unwrap();
    assert_eq!(program.body.len(), 4);

    match &program.body[0] {
        Statement::VariableDeclaration { kind, declarations, .. } => {
            assert_eq!(*kind, VariableKind::Const);
            assert!(matches!(declarations[0].id, Pattern::ObjectPattern { .. }));
        }
        other => panic!("unexpected statement {:?}", other),
    }

    match &program.body[1] {
        Statement::FunctionDeclaration { function, .. } => {
            assert_eq!(function.name.as_deref(), Some("double"));
            assert_eq!(function.length(), 1);
            assert!(!function.is_arrow);
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn test_parse_test_file() {
    let source = r#"
        const math = require('./math');

        describe('math', () => {
            beforeEach(() => { counter = 0; });

            test('adds', () => {
                expect(math.add(2, 3)).toBe(5);
                expect(() => math.add()).not.toThrow();
            });

            it.skip('pending', function (done) {
                setup(done);
            });
        });
    "#;
    let program = parser::parse(source).unwrap();
    assert_eq!(program.body.len(), 2);
}

#[test]
fn test_function_length_stops_at_default() {
    let program = parser::parse("function f(a, b = 1, ...rest) {}").unwrap();
    match &program.body[0] {
        Statement::FunctionDeclaration { function, .. } => {
            assert_eq!(function.params.len(), 3);
            assert_eq!(function.length(), 1);
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn test_arrow_concise_body() {
    let program = parser::parse("const f = (a) => ({ a });").unwrap();
    match &program.body[0] {
        Statement::VariableDeclaration { declarations, .. } => match &declarations[0].init {
            Some(Expression::ArrowFunctionExpression { function, .. }) => {
                assert!(function.is_arrow);
                assert!(matches!(function.body, FunctionBody::Expression(_)));
            }
            other => panic!("unexpected init {:?}", other),
        },
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn test_syntax_error_has_position() {
    let err = Parser::new("const x = {\n  a: 1,\n  b 2\n};").parse().unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    let position = err.source_position.expect("position");
    assert_eq!(position.line, 3);
}

#[test]
fn test_reserved_features_rejected() {
    for source in [
        "class Foo {}",
        "export default 1",
        "const f = async () => 1",
        "function* gen() { yield 1 }",
        "with (obj) {}",
    ] {
        let err = parser::parse(source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError, "source: {}", source);
    }
}
