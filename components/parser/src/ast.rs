//! Abstract Syntax Tree node definitions

use std::rc::Rc;

use core_types::SourcePosition;

/// A parsed script or module body
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements in source order
    pub body: Vec<Statement>,
}

/// JavaScript statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (let, const, var)
    VariableDeclaration {
        /// Declaration kind (let, const, var)
        kind: VariableKind,
        /// List of declarators
        declarations: Vec<VariableDeclarator>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Function declaration
    FunctionDeclaration {
        /// Shared function definition (always named)
        function: Rc<FunctionNode>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Expression statement
    ExpressionStatement {
        /// The expression
        expression: Expression,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Return statement
    ReturnStatement {
        /// Return value
        argument: Option<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// If statement
    IfStatement {
        /// Condition
        test: Expression,
        /// Consequent block
        consequent: Box<Statement>,
        /// Alternate block
        alternate: Option<Box<Statement>>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// While loop
    WhileStatement {
        /// Loop condition
        test: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Do-while loop
    DoWhileStatement {
        /// Loop body
        body: Box<Statement>,
        /// Loop condition
        test: Expression,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// For loop
    ForStatement {
        /// Initialization
        init: Option<ForInit>,
        /// Condition
        test: Option<Expression>,
        /// Update expression
        update: Option<Expression>,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// For...in loop
    ForInStatement {
        /// Left side (variable or pattern)
        left: ForInOfLeft,
        /// Object to iterate over
        right: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// For...of loop
    ForOfStatement {
        /// Left side (variable or pattern)
        left: ForInOfLeft,
        /// Iterable to iterate over
        right: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Block statement
    BlockStatement {
        /// Statements in block
        body: Vec<Statement>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Empty statement (`;`)
    EmptyStatement {
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Break statement
    BreakStatement {
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Continue statement
    ContinueStatement {
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Throw statement
    ThrowStatement {
        /// Value to throw
        argument: Expression,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Try statement
    TryStatement {
        /// Try block
        block: Vec<Statement>,
        /// Catch clause
        handler: Option<CatchClause>,
        /// Finally block
        finalizer: Option<Vec<Statement>>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Switch statement
    SwitchStatement {
        /// Discriminant
        discriminant: Expression,
        /// Cases in source order
        cases: Vec<SwitchCase>,
        /// Source location
        position: Option<SourcePosition>,
    },
}

impl Statement {
    /// Source location of the statement, if recorded
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Statement::VariableDeclaration { position, .. }
            | Statement::FunctionDeclaration { position, .. }
            | Statement::ExpressionStatement { position, .. }
            | Statement::ReturnStatement { position, .. }
            | Statement::IfStatement { position, .. }
            | Statement::WhileStatement { position, .. }
            | Statement::DoWhileStatement { position, .. }
            | Statement::ForStatement { position, .. }
            | Statement::ForInStatement { position, .. }
            | Statement::ForOfStatement { position, .. }
            | Statement::BlockStatement { position, .. }
            | Statement::EmptyStatement { position }
            | Statement::BreakStatement { position }
            | Statement::ContinueStatement { position }
            | Statement::ThrowStatement { position, .. }
            | Statement::TryStatement { position, .. }
            | Statement::SwitchStatement { position, .. } => *position,
        }
    }
}

/// Catch clause of a try statement
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Bound exception, if any (`catch {}` has none)
    pub param: Option<Pattern>,
    /// Catch body
    pub body: Vec<Statement>,
}

/// One `case` or `default` arm of a switch
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Case test; `None` for `default`
    pub test: Option<Expression>,
    /// Statements executed when matched
    pub consequent: Vec<Statement>,
}

/// Function definition shared between the AST and runtime closures
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    /// Function name, if any
    pub name: Option<String>,
    /// Parameters
    pub params: Vec<Pattern>,
    /// Function body
    pub body: FunctionBody,
    /// Arrow functions capture `this` lexically and are not constructible
    pub is_arrow: bool,
    /// Source location
    pub position: Option<SourcePosition>,
}

impl FunctionNode {
    /// Number of parameters before the first default or rest parameter
    pub fn length(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| !matches!(p, Pattern::AssignmentPattern { .. } | Pattern::RestElement(_)))
            .count()
    }
}

/// Function body
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// Block body
    Block(Vec<Statement>),
    /// Expression body (arrow concise body)
    Expression(Box<Expression>),
}

/// JavaScript expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Identifier reference
    Identifier {
        /// Identifier name
        name: String,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Literal value
    Literal {
        /// The literal value
        value: Literal,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Template literal
    TemplateLiteral {
        /// Cooked string parts; always one longer than `expressions`
        quasis: Vec<String>,
        /// Substitutions
        expressions: Vec<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Regular expression literal
    RegExpLiteral {
        /// Pattern source
        pattern: String,
        /// Flags
        flags: String,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Array literal
    ArrayExpression {
        /// Elements (`None` is a hole)
        elements: Vec<Option<Expression>>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Object literal
    ObjectExpression {
        /// Properties
        properties: Vec<ObjectProperty>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Function expression
    FunctionExpression {
        /// Function definition
        function: Rc<FunctionNode>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Arrow function expression
    ArrowFunctionExpression {
        /// Function definition
        function: Rc<FunctionNode>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `this`
    ThisExpression {
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Unary operation
    UnaryExpression {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Increment or decrement
    UpdateExpression {
        /// Operator
        operator: UpdateOperator,
        /// Target
        argument: Box<Expression>,
        /// Prefix form (`++x`) or postfix (`x++`)
        prefix: bool,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Binary operation
    BinaryExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Short-circuiting operation
    LogicalExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: LogicalOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Assignment
    AssignmentExpression {
        /// Target
        left: AssignmentTarget,
        /// Operator
        operator: AssignmentOperator,
        /// Value
        right: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Ternary conditional
    ConditionalExpression {
        /// Condition
        test: Box<Expression>,
        /// Value if truthy
        consequent: Box<Expression>,
        /// Value if falsy
        alternate: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Function call
    CallExpression {
        /// Callee
        callee: Box<Expression>,
        /// Arguments (may contain `SpreadElement`)
        arguments: Vec<Expression>,
        /// Called through `?.()`
        optional: bool,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Property access
    MemberExpression {
        /// Object
        object: Box<Expression>,
        /// Property (an `Identifier` when not computed)
        property: Box<Expression>,
        /// `a[b]` rather than `a.b`
        computed: bool,
        /// Accessed through `?.`
        optional: bool,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Boundary of an optional chain; a short-circuit inside yields `undefined`
    OptionalChain {
        /// The chain
        expression: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `new` expression
    NewExpression {
        /// Constructor
        callee: Box<Expression>,
        /// Arguments
        arguments: Vec<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// Comma-separated expressions
    SequenceExpression {
        /// Expressions evaluated left to right
        expressions: Vec<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },

    /// `...expr` inside array literals and argument lists
    SpreadElement {
        /// Spread operand
        argument: Box<Expression>,
        /// Source location
        position: Option<SourcePosition>,
    },
}

impl Expression {
    /// Source location of the expression, if recorded
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Expression::Identifier { position, .. }
            | Expression::Literal { position, .. }
            | Expression::TemplateLiteral { position, .. }
            | Expression::RegExpLiteral { position, .. }
            | Expression::ArrayExpression { position, .. }
            | Expression::ObjectExpression { position, .. }
            | Expression::FunctionExpression { position, .. }
            | Expression::ArrowFunctionExpression { position, .. }
            | Expression::ThisExpression { position }
            | Expression::UnaryExpression { position, .. }
            | Expression::UpdateExpression { position, .. }
            | Expression::BinaryExpression { position, .. }
            | Expression::LogicalExpression { position, .. }
            | Expression::AssignmentExpression { position, .. }
            | Expression::ConditionalExpression { position, .. }
            | Expression::CallExpression { position, .. }
            | Expression::MemberExpression { position, .. }
            | Expression::OptionalChain { position, .. }
            | Expression::NewExpression { position, .. }
            | Expression::SequenceExpression { position, .. }
            | Expression::SpreadElement { position, .. } => *position,
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// `null`
    Null,
}

/// Variable declaration kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var
    Var,
    /// let
    Let,
    /// const
    Const,
}

/// Single declarator in a variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// Binding target
    pub id: Pattern,
    /// Initializer
    pub init: Option<Expression>,
}

/// For loop initializer
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// `for (let i = 0; ...)`
    VariableDeclaration {
        /// Declaration kind
        kind: VariableKind,
        /// Declarators
        declarations: Vec<VariableDeclarator>,
    },
    /// `for (i = 0; ...)`
    Expression(Expression),
}

/// Left side of for-in / for-of
#[derive(Debug, Clone, PartialEq)]
pub enum ForInOfLeft {
    /// `for (const x of ...)`
    VariableDeclaration {
        /// Declaration kind
        kind: VariableKind,
        /// Binding target
        id: Pattern,
    },
    /// `for (x of ...)`
    Pattern(Pattern),
}

/// Binding and assignment patterns
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Simple identifier
    Identifier(String),
    /// Object destructuring
    ObjectPattern {
        /// Named properties
        properties: Vec<PatternProperty>,
        /// `...rest` target
        rest: Option<Box<Pattern>>,
    },
    /// Array destructuring (`None` is an elision)
    ArrayPattern(Vec<Option<Pattern>>),
    /// Target with default value
    AssignmentPattern {
        /// Target
        left: Box<Pattern>,
        /// Default used when the value is `undefined`
        right: Box<Expression>,
    },
    /// Rest element in array patterns and parameter lists
    RestElement(Box<Pattern>),
    /// Member target, only valid in assignment patterns
    Member(Box<Expression>),
}

/// One `key: target` entry of an object pattern
#[derive(Debug, Clone, PartialEq)]
pub struct PatternProperty {
    /// Property key
    pub key: PropertyKey,
    /// Binding target
    pub value: Pattern,
}

/// Object literal member
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProperty {
    /// `key: value`, shorthand `key`, or method `key() {}`
    Property {
        /// Property key
        key: PropertyKey,
        /// Property value
        value: Expression,
        /// Written as `{ key }` (possibly with `= default` in a pattern)
        shorthand: bool,
    },
    /// `...source`
    Spread(Expression),
}

/// Property keys in object literals and patterns
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier or keyword key
    Identifier(String),
    /// String literal key
    String(String),
    /// Number literal key
    Number(f64),
    /// `[expr]`
    Computed(Box<Expression>),
}

/// Assignment targets
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentTarget {
    /// Simple identifier
    Identifier(String),
    /// Member expression
    Member(Box<Expression>),
    /// Destructuring pattern (only with `=`)
    Pattern(Pattern),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Mod,
    /// **
    Exp,
    /// ==
    Eq,
    /// !=
    NotEq,
    /// ===
    StrictEq,
    /// !==
    StrictNotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ^
    BitXor,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// >>>
    UnsignedRightShift,
    /// in
    In,
    /// instanceof
    Instanceof,
}

/// Short-circuit operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
    /// ??
    NullishCoalescing,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    Not,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// Update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// =
    Assign,
    /// Compound assignment applying a binary operator (`+=`, `<<=`, ...)
    Compound(BinaryOperator),
    /// &&=
    AndAssign,
    /// ||=
    OrAssign,
    /// ??=
    NullishAssign,
}
