//! Statement execution and expression evaluation

use std::rc::Rc;

use core_types::ErrorKind;
use parser::ast::{
    AssignmentOperator, AssignmentTarget, CatchClause, Expression, ForInOfLeft, ForInit,
    Literal, LogicalOperator, ObjectProperty, Pattern, PropertyKey, Statement, SwitchCase, UnaryOperator,
    UpdateOperator, VariableDeclarator, VariableKind,
};
use parser::FunctionNode;

use crate::error::{Completion, Control};
use crate::interpreter::Interpreter;
use crate::scope::{Assign, BindingKind, Lookup, Scope, ScopeRef};
use crate::value::{exceeds_string_limit, number_to_string, strict_equals, Value};

/// How a pattern stores the values it binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingMode {
    /// Initialize a binding declared in the given scope (`let`, `const`, parameters)
    Initialize,
    /// Assign through the scope chain (`var` initializers, assignment expressions)
    Assign,
}

impl Interpreter {
    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    /// Hoist `var` names and block-level declarations of a function body or program
    pub(crate) fn hoist_function_body(&mut self, body: &[Statement], scope: &ScopeRef) -> Result<(), Control> {
        let mut names = Vec::new();
        collect_var_names(body, &mut names);
        for name in &names {
            scope.declare_var(name);
        }
        self.declare_block(body, scope)
    }

    /// Create dead-zone bindings for `let`/`const` and instantiate function declarations
    fn declare_block(&mut self, body: &[Statement], scope: &ScopeRef) -> Result<(), Control> {
        for statement in body {
            match statement {
                Statement::VariableDeclaration {
                    kind: kind @ (VariableKind::Let | VariableKind::Const),
                    declarations,
                    ..
                } => {
                    let binding_kind = lexical_kind(*kind);
                    for declarator in declarations {
                        let mut names = Vec::new();
                        pattern_names(&declarator.id, &mut names);
                        for name in names {
                            if !scope.declare_lexical(&name, binding_kind) {
                                return Err(self.throw_error(
                                    ErrorKind::SyntaxError,
                                    format!("Identifier '{}' has already been declared", name),
                                ));
                            }
                        }
                    }
                }
                Statement::FunctionDeclaration { function, .. } => {
                    let closure = self.realm.new_closure(function.clone(), scope.clone(), None);
                    if let Some(name) = &function.name {
                        scope.initialize(name, Value::Object(closure));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    pub(crate) fn exec_statements(&mut self, body: &[Statement], scope: &ScopeRef) -> Result<Completion, Control> {
        for statement in body {
            match self.exec_statement(statement, scope)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_block(&mut self, body: &[Statement], scope: &ScopeRef) -> Result<Completion, Control> {
        if needs_scope(body) {
            let block = Scope::block(scope);
            self.declare_block(body, &block)?;
            self.exec_statements(body, &block)
        } else {
            self.exec_statements(body, scope)
        }
    }

    pub(crate) fn exec_statement(&mut self, statement: &Statement, scope: &ScopeRef) -> Result<Completion, Control> {
        self.step()?;
        match statement {
            Statement::VariableDeclaration { kind, declarations, .. } => {
                self.exec_variable_declaration(*kind, declarations, scope)?;
                Ok(Completion::Normal)
            }
            Statement::FunctionDeclaration { .. } | Statement::EmptyStatement { .. } => Ok(Completion::Normal),
            Statement::ExpressionStatement { expression, .. } => {
                self.eval_expression(expression, scope)?;
                Ok(Completion::Normal)
            }
            Statement::ReturnStatement { argument, .. } => {
                let value = match argument {
                    Some(argument) => self.eval_expression(argument, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.eval_expression(test, scope)?.to_boolean() {
                    self.exec_statement(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec_statement(alternate, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Statement::WhileStatement { test, body, .. } => {
                loop {
                    self.step()?;
                    if !self.eval_expression(test, scope)?.to_boolean() {
                        break;
                    }
                    match self.exec_statement(body, scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::DoWhileStatement { body, test, .. } => {
                loop {
                    self.step()?;
                    match self.exec_statement(body, scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                    if !self.eval_expression(test, scope)?.to_boolean() {
                        break;
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope),
            Statement::ForInStatement { left, right, body, .. } => {
                let object = self.eval_expression(right, scope)?;
                let keys: Vec<Value> = self.for_in_keys(&object).into_iter().map(Value::String).collect();
                self.exec_for_each(left, keys, body, scope)
            }
            Statement::ForOfStatement { left, right, body, .. } => {
                let iterable = self.eval_expression(right, scope)?;
                let values = self.iterate(&iterable)?;
                self.exec_for_each(left, values, body, scope)
            }
            Statement::BlockStatement { body, .. } => self.exec_block(body, scope),
            Statement::BreakStatement { .. } => Ok(Completion::Break),
            Statement::ContinueStatement { .. } => Ok(Completion::Continue),
            Statement::ThrowStatement { argument, .. } => {
                let value = self.eval_expression(argument, scope)?;
                Err(Control::Throw(value))
            }
            Statement::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => self.exec_try(block, handler.as_ref(), finalizer.as_deref(), scope),
            Statement::SwitchStatement {
                discriminant, cases, ..
            } => self.exec_switch(discriminant, cases, scope),
        }
    }

    fn exec_variable_declaration(
        &mut self,
        kind: VariableKind,
        declarations: &[VariableDeclarator],
        scope: &ScopeRef,
    ) -> Result<(), Control> {
        for declarator in declarations {
            let value = match &declarator.init {
                Some(init) => self.eval_named(init, pattern_name(&declarator.id), scope)?,
                // `var x;` leaves an existing value alone
                None if kind == VariableKind::Var => continue,
                None => Value::Undefined,
            };
            let mode = match kind {
                VariableKind::Var => BindingMode::Assign,
                VariableKind::Let | VariableKind::Const => BindingMode::Initialize,
            };
            self.bind_pattern(&declarator.id, value, scope, mode)?;
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
        scope: &ScopeRef,
    ) -> Result<Completion, Control> {
        let mut per_iteration = false;
        let mut current = scope.clone();

        match init {
            Some(ForInit::VariableDeclaration { kind, declarations }) => {
                if *kind != VariableKind::Var {
                    current = Scope::block(scope);
                    for declarator in declarations {
                        let mut names = Vec::new();
                        pattern_names(&declarator.id, &mut names);
                        for name in names {
                            current.declare_lexical(&name, lexical_kind(*kind));
                        }
                    }
                    per_iteration = *kind == VariableKind::Let;
                }
                self.exec_variable_declaration(*kind, declarations, &current)?;
            }
            Some(ForInit::Expression(expression)) => {
                self.eval_expression(expression, scope)?;
            }
            None => {}
        }

        if per_iteration {
            current = copy_iteration_scope(&current, scope);
        }

        loop {
            self.step()?;
            if let Some(test) = test {
                if !self.eval_expression(test, &current)?.to_boolean() {
                    break;
                }
            }
            match self.exec_statement(body, &current)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }
            if per_iteration {
                current = copy_iteration_scope(&current, scope);
            }
            if let Some(update) = update {
                self.eval_expression(update, &current)?;
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_for_each(
        &mut self,
        left: &ForInOfLeft,
        values: Vec<Value>,
        body: &Statement,
        scope: &ScopeRef,
    ) -> Result<Completion, Control> {
        for value in values {
            self.step()?;
            let iteration_scope = match left {
                ForInOfLeft::VariableDeclaration {
                    kind: kind @ (VariableKind::Let | VariableKind::Const),
                    id,
                } => {
                    let iteration_scope = Scope::block(scope);
                    let mut names = Vec::new();
                    pattern_names(id, &mut names);
                    for name in names {
                        iteration_scope.declare_lexical(&name, lexical_kind(*kind));
                    }
                    self.bind_pattern(id, value, &iteration_scope, BindingMode::Initialize)?;
                    iteration_scope
                }
                ForInOfLeft::VariableDeclaration { id, .. } | ForInOfLeft::Pattern(id) => {
                    self.bind_pattern(id, value, scope, BindingMode::Assign)?;
                    scope.clone()
                }
            };
            match self.exec_statement(body, &iteration_scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_try(
        &mut self,
        block: &[Statement],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Statement]>,
        scope: &ScopeRef,
    ) -> Result<Completion, Control> {
        let mut result = self.exec_block(block, scope);

        let thrown = match &result {
            Err(Control::Throw(value)) => Some(value.clone()),
            _ => None,
        };
        if let (Some(thrown), Some(handler)) = (thrown, handler) {
            let catch_scope = Scope::block(scope);
            result = match &handler.param {
                Some(param) => self
                    .bind_pattern(param, thrown, &catch_scope, BindingMode::Initialize)
                    .and_then(|_| self.exec_block(&handler.body, &catch_scope)),
                None => self.exec_block(&handler.body, &catch_scope),
            };
        }

        match finalizer {
            Some(_) if matches!(result, Err(Control::Halt(_))) => result,
            Some(finalizer) => match self.exec_block(finalizer, scope)? {
                Completion::Normal => result,
                abrupt => Ok(abrupt),
            },
            None => result,
        }
    }

    fn exec_switch(
        &mut self,
        discriminant: &Expression,
        cases: &[SwitchCase],
        scope: &ScopeRef,
    ) -> Result<Completion, Control> {
        let value = self.eval_expression(discriminant, scope)?;
        let switch_scope = Scope::block(scope);
        for case in cases {
            self.declare_block(&case.consequent, &switch_scope)?;
        }

        let mut start = None;
        for (index, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let candidate = self.eval_expression(test, &switch_scope)?;
                if strict_equals(&value, &candidate) {
                    start = Some(index);
                    break;
                }
            }
        }
        let start = match start.or_else(|| cases.iter().position(|case| case.test.is_none())) {
            Some(start) => start,
            None => return Ok(Completion::Normal),
        };

        for case in &cases[start..] {
            match self.exec_statements(&case.consequent, &switch_scope)? {
                Completion::Normal => {}
                Completion::Break => return Ok(Completion::Normal),
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    // ---------------------------------------------------------------------
    // Patterns
    // ---------------------------------------------------------------------

    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        scope: &ScopeRef,
        mode: BindingMode,
    ) -> Result<(), Control> {
        match pattern {
            Pattern::Identifier(name) => match mode {
                BindingMode::Initialize => {
                    scope.initialize(name, value);
                    Ok(())
                }
                BindingMode::Assign => self.assign_identifier(name, value, scope),
            },
            Pattern::AssignmentPattern { left, right } => {
                let value = if value.is_undefined() {
                    self.eval_named(right, pattern_name(left), scope)?
                } else {
                    value
                };
                self.bind_pattern(left, value, scope, mode)
            }
            Pattern::ObjectPattern { properties, rest } => {
                if value.is_nullish() {
                    let message = format!(
                        "Cannot destructure '{}' as it is {}.",
                        self.describe(&value),
                        self.describe(&value)
                    );
                    return Err(self.type_error(message));
                }
                let mut used = Vec::with_capacity(properties.len());
                for property in properties {
                    let key = self.eval_property_key(&property.key, scope)?;
                    let item = self.get(&value, &key)?;
                    self.bind_pattern(&property.value, item, scope, mode)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let remaining = self.realm.new_object();
                    if let Value::Object(source) = &value {
                        for key in source.own_keys() {
                            if !used.contains(&key) {
                                remaining.put(&key, source.get(&key));
                            }
                        }
                    }
                    self.bind_pattern(rest, Value::Object(remaining), scope, mode)?;
                }
                Ok(())
            }
            Pattern::ArrayPattern(elements) => {
                let items = self.iterate(&value)?;
                for (index, element) in elements.iter().enumerate() {
                    match element {
                        None => {}
                        Some(Pattern::RestElement(target)) => {
                            let rest = items.get(index..).map(<[Value]>::to_vec).unwrap_or_default();
                            let rest = Value::Object(self.realm.new_array(rest));
                            self.bind_pattern(target, rest, scope, mode)?;
                        }
                        Some(element) => {
                            let item = items.get(index).cloned().unwrap_or(Value::Undefined);
                            self.bind_pattern(element, item, scope, mode)?;
                        }
                    }
                }
                Ok(())
            }
            Pattern::RestElement(target) => self.bind_pattern(target, value, scope, mode),
            Pattern::Member(expression) => self.assign_to_member(expression, value, scope),
        }
    }

    fn assign_identifier(&mut self, name: &str, value: Value, scope: &ScopeRef) -> Result<(), Control> {
        match scope.set(name, value.clone()) {
            Assign::Ok => Ok(()),
            Assign::Const => Err(self.type_error("Assignment to constant variable.")),
            Assign::Uninitialized => Err(self.reference_error(format!("Cannot access '{}' before initialization", name))),
            Assign::NotFound => {
                self.realm.global().define(name, value);
                Ok(())
            }
        }
    }

    fn assign_to_member(&mut self, target: &Expression, value: Value, scope: &ScopeRef) -> Result<(), Control> {
        let (base, key) = self.eval_member_reference(target, scope)?;
        self.set(&base, &key, value)
    }

    /// Evaluate the object and key of a member expression used as a target
    fn eval_member_reference(&mut self, target: &Expression, scope: &ScopeRef) -> Result<(Value, Rc<str>), Control> {
        match target {
            Expression::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                let base = self.eval_expression(object, scope)?;
                let key = self.eval_member_key(property, *computed, scope)?;
                Ok((base, key))
            }
            _ => Err(self.throw_error(ErrorKind::SyntaxError, "Invalid assignment target")),
        }
    }

    fn eval_member_key(&mut self, property: &Expression, computed: bool, scope: &ScopeRef) -> Result<Rc<str>, Control> {
        match (computed, property) {
            (false, Expression::Identifier { name, .. }) => Ok(Rc::from(name.as_str())),
            _ => {
                let key = self.eval_expression(property, scope)?;
                self.to_property_key(&key)
            }
        }
    }

    fn eval_property_key(&mut self, key: &PropertyKey, scope: &ScopeRef) -> Result<Rc<str>, Control> {
        match key {
            PropertyKey::Identifier(name) | PropertyKey::String(name) => Ok(Rc::from(name.as_str())),
            PropertyKey::Number(n) => Ok(number_to_string(*n).into()),
            PropertyKey::Computed(expression) => {
                let key = self.eval_expression(expression, scope)?;
                self.to_property_key(&key)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    /// Evaluate an expression, naming it `name` if it is an anonymous function
    fn eval_named(&mut self, expression: &Expression, name: Option<&str>, scope: &ScopeRef) -> Result<Value, Control> {
        match (expression, name) {
            (
                Expression::FunctionExpression { function, .. } | Expression::ArrowFunctionExpression { function, .. },
                Some(name),
            ) if function.name.is_none() => Ok(Value::Object(self.realm.new_closure(
                function.clone(),
                scope.clone(),
                Some(name),
            ))),
            _ => self.eval_expression(expression, scope),
        }
    }

    pub(crate) fn eval_expression(&mut self, expression: &Expression, scope: &ScopeRef) -> Result<Value, Control> {
        match expression {
            Expression::Identifier { name, .. } => self.eval_identifier(name, scope),
            Expression::Literal { value, .. } => Ok(match value {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::from(s.as_str()),
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Null => Value::Null,
            }),
            Expression::TemplateLiteral { quasis, expressions, .. } => {
                let mut text = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    text.push_str(quasi);
                    if let Some(expression) = expressions.get(index) {
                        let value = self.eval_expression(expression, scope)?;
                        let piece = self.to_string(&value)?;
                        if exceeds_string_limit(&[text.as_str(), &*piece]) {
                            return Err(self.invalid_string_length());
                        }
                        text.push_str(&piece);
                    }
                }
                Ok(Value::from(text))
            }
            Expression::RegExpLiteral { pattern, flags, .. } => match self.realm.new_regexp(pattern, flags) {
                Ok(regexp) => Ok(Value::Object(regexp)),
                Err(error) => Err(self.throw_js_error(&error)),
            },
            Expression::ArrayExpression { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        None => values.push(Value::Undefined),
                        Some(Expression::SpreadElement { argument, .. }) => {
                            let spread = self.eval_expression(argument, scope)?;
                            values.extend(self.iterate(&spread)?);
                        }
                        Some(element) => values.push(self.eval_expression(element, scope)?),
                    }
                }
                Ok(Value::Object(self.realm.new_array(values)))
            }
            Expression::ObjectExpression { properties, .. } => self.eval_object_literal(properties, scope),
            Expression::FunctionExpression { function, .. } => Ok(self.eval_function_expression(function, scope)),
            Expression::ArrowFunctionExpression { function, .. } => Ok(Value::Object(self.realm.new_closure(
                function.clone(),
                scope.clone(),
                None,
            ))),
            Expression::ThisExpression { .. } => Ok(scope.this_value()),
            Expression::UnaryExpression { operator, argument, .. } => self.eval_unary(*operator, argument, scope),
            Expression::UpdateExpression {
                operator,
                argument,
                prefix,
                ..
            } => self.eval_update(*operator, argument, *prefix, scope),
            Expression::BinaryExpression {
                left, operator, right, ..
            } => {
                let left = self.eval_expression(left, scope)?;
                let right = self.eval_expression(right, scope)?;
                self.binary_operation(*operator, &left, &right)
            }
            Expression::LogicalExpression {
                left, operator, right, ..
            } => {
                let left = self.eval_expression(left, scope)?;
                let short_circuit = match operator {
                    LogicalOperator::And => !left.to_boolean(),
                    LogicalOperator::Or => left.to_boolean(),
                    LogicalOperator::NullishCoalescing => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval_expression(right, scope)
                }
            }
            Expression::AssignmentExpression {
                left, operator, right, ..
            } => self.eval_assignment(left, *operator, right, scope),
            Expression::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.eval_expression(test, scope)?.to_boolean() {
                    self.eval_expression(consequent, scope)
                } else {
                    self.eval_expression(alternate, scope)
                }
            }
            Expression::CallExpression { .. } | Expression::MemberExpression { .. } | Expression::OptionalChain { .. } => {
                Ok(self
                    .eval_chain_link(expression, scope)?
                    .map(|(value, _)| value)
                    .unwrap_or(Value::Undefined))
            }
            Expression::NewExpression { callee, arguments, .. } => {
                let constructor = self.eval_expression(callee, scope)?;
                let args = self.eval_arguments(arguments, scope)?;
                if !matches!(&constructor, Value::Object(object) if object.is_constructor()) {
                    let message = format!("{} is not a constructor", expression_text(callee));
                    return Err(self.type_error(message));
                }
                self.construct(&constructor, &args)
            }
            Expression::SequenceExpression { expressions, .. } => {
                let mut value = Value::Undefined;
                for expression in expressions {
                    value = self.eval_expression(expression, scope)?;
                }
                Ok(value)
            }
            Expression::SpreadElement { .. } => Err(self.throw_error(ErrorKind::SyntaxError, "Unexpected token '...'")),
        }
    }

    fn eval_identifier(&mut self, name: &str, scope: &ScopeRef) -> Result<Value, Control> {
        match scope.lookup(name) {
            Lookup::Found(value) => Ok(value),
            Lookup::Uninitialized => Err(self.reference_error(format!("Cannot access '{}' before initialization", name))),
            Lookup::NotFound => Err(self.reference_error(format!("{} is not defined", name))),
        }
    }

    fn eval_function_expression(&mut self, function: &Rc<FunctionNode>, scope: &ScopeRef) -> Value {
        match &function.name {
            // A named function expression can refer to itself by name
            Some(name) => {
                let own_scope = Scope::block(scope);
                let closure = self.realm.new_closure(function.clone(), own_scope.clone(), None);
                own_scope.define(name, Value::Object(closure.clone()));
                Value::Object(closure)
            }
            None => Value::Object(self.realm.new_closure(function.clone(), scope.clone(), None)),
        }
    }

    fn eval_object_literal(&mut self, properties: &[ObjectProperty], scope: &ScopeRef) -> Result<Value, Control> {
        let object = self.realm.new_object();
        for property in properties {
            match property {
                ObjectProperty::Property { key, value, .. } => {
                    let key = self.eval_property_key(key, scope)?;
                    let value = self.eval_named(value, Some(&*key), scope)?;
                    object.put(&key, value);
                }
                ObjectProperty::Spread(source) => {
                    let source = self.eval_expression(source, scope)?;
                    match &source {
                        Value::Object(source_object) => {
                            for key in source_object.own_keys() {
                                object.put(&key, source_object.get(&key));
                            }
                        }
                        Value::String(_) => {
                            for (index, item) in self.iterate(&source)?.into_iter().enumerate() {
                                object.put(&index.to_string(), item);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(Value::Object(object))
    }

    fn eval_arguments(&mut self, arguments: &[Expression], scope: &ScopeRef) -> Result<Vec<Value>, Control> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            match argument {
                Expression::SpreadElement { argument, .. } => {
                    let spread = self.eval_expression(argument, scope)?;
                    values.extend(self.iterate(&spread)?);
                }
                argument => values.push(self.eval_expression(argument, scope)?),
            }
        }
        Ok(values)
    }

    /// Evaluate one link of a member/call chain, yielding the value and the
    /// receiver for a subsequent call. `None` means an optional link
    /// short-circuited.
    fn eval_chain_link(&mut self, expression: &Expression, scope: &ScopeRef) -> Result<Option<(Value, Value)>, Control> {
        match expression {
            Expression::MemberExpression {
                object,
                property,
                computed,
                optional,
                ..
            } => {
                let base = match self.eval_chain_link(object, scope)? {
                    Some((base, _)) => base,
                    None => return Ok(None),
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval_member_key(property, *computed, scope)?;
                let value = self.get(&base, &key)?;
                Ok(Some((value, base)))
            }
            Expression::CallExpression {
                callee,
                arguments,
                optional,
                ..
            } => {
                let (function, this) = match self.eval_chain_link(callee, scope)? {
                    Some(link) => link,
                    None => return Ok(None),
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_arguments(arguments, scope)?;
                if !function.is_callable() {
                    let message = format!("{} is not a function", expression_text(callee));
                    return Err(self.type_error(message));
                }
                let result = self.call(&function, this, &args)?;
                Ok(Some((result, Value::Undefined)))
            }
            Expression::OptionalChain { expression, .. } => {
                let value = self
                    .eval_chain_link(expression, scope)?
                    .map(|(value, _)| value)
                    .unwrap_or(Value::Undefined);
                Ok(Some((value, Value::Undefined)))
            }
            other => Ok(Some((self.eval_expression(other, scope)?, Value::Undefined))),
        }
    }

    fn eval_unary(&mut self, operator: UnaryOperator, argument: &Expression, scope: &ScopeRef) -> Result<Value, Control> {
        match operator {
            UnaryOperator::Typeof => {
                if let Expression::Identifier { name, .. } = argument {
                    if scope.lookup(name) == Lookup::NotFound {
                        return Ok(Value::from("undefined"));
                    }
                }
                let value = self.eval_expression(argument, scope)?;
                Ok(Value::from(value.type_of()))
            }
            UnaryOperator::Delete => match argument {
                Expression::MemberExpression { .. } => {
                    let (base, key) = self.eval_member_reference(argument, scope)?;
                    match &base {
                        Value::Object(object) => Ok(Value::Boolean(object.delete(&key))),
                        Value::Undefined | Value::Null => Err(self.type_error(format!(
                            "Cannot convert undefined or null to object (deleting '{}')",
                            key
                        ))),
                        _ => Ok(Value::Boolean(true)),
                    }
                }
                other => {
                    self.eval_expression(other, scope)?;
                    Ok(Value::Boolean(true))
                }
            },
            UnaryOperator::Void => {
                self.eval_expression(argument, scope)?;
                Ok(Value::Undefined)
            }
            UnaryOperator::Not => Ok(Value::Boolean(!self.eval_expression(argument, scope)?.to_boolean())),
            UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::BitwiseNot => {
                let value = self.eval_expression(argument, scope)?;
                self.numeric_unary(operator, &value)
            }
        }
    }

    fn eval_update(
        &mut self,
        operator: UpdateOperator,
        argument: &Expression,
        prefix: bool,
        scope: &ScopeRef,
    ) -> Result<Value, Control> {
        let delta = match operator {
            UpdateOperator::Increment => 1.0,
            UpdateOperator::Decrement => -1.0,
        };
        match argument {
            Expression::Identifier { name, .. } => {
                let current = self.eval_identifier(name, scope)?;
                let old = self.to_number(&current)?;
                self.assign_identifier(name, Value::Number(old + delta), scope)?;
                Ok(Value::Number(if prefix { old + delta } else { old }))
            }
            Expression::MemberExpression { .. } => {
                let (base, key) = self.eval_member_reference(argument, scope)?;
                let current = self.get(&base, &key)?;
                let old = self.to_number(&current)?;
                self.set(&base, &key, Value::Number(old + delta))?;
                Ok(Value::Number(if prefix { old + delta } else { old }))
            }
            _ => Err(self.throw_error(
                ErrorKind::SyntaxError,
                "Invalid left-hand side expression in postfix operation",
            )),
        }
    }

    fn eval_assignment(
        &mut self,
        target: &AssignmentTarget,
        operator: AssignmentOperator,
        right: &Expression,
        scope: &ScopeRef,
    ) -> Result<Value, Control> {
        match target {
            AssignmentTarget::Pattern(pattern) => {
                let value = self.eval_expression(right, scope)?;
                self.bind_pattern(pattern, value.clone(), scope, BindingMode::Assign)?;
                Ok(value)
            }
            AssignmentTarget::Identifier(name) => {
                if operator == AssignmentOperator::Assign {
                    let value = self.eval_named(right, Some(name.as_str()), scope)?;
                    self.assign_identifier(name, value.clone(), scope)?;
                    return Ok(value);
                }
                let current = self.eval_identifier(name, scope)?;
                match self.combine(operator, current, right, Some(name.as_str()), scope)? {
                    Some(value) => {
                        self.assign_identifier(name, value.clone(), scope)?;
                        Ok(value)
                    }
                    None => self.eval_identifier(name, scope),
                }
            }
            AssignmentTarget::Member(expression) => {
                let (base, key) = self.eval_member_reference(expression, scope)?;
                if operator == AssignmentOperator::Assign {
                    let value = self.eval_expression(right, scope)?;
                    self.set(&base, &key, value.clone())?;
                    return Ok(value);
                }
                let current = self.get(&base, &key)?;
                match self.combine(operator, current.clone(), right, None, scope)? {
                    Some(value) => {
                        self.set(&base, &key, value.clone())?;
                        Ok(value)
                    }
                    None => Ok(current),
                }
            }
        }
    }

    /// Compute the new value of a compound or logical assignment. `None`
    /// means a logical assignment short-circuited and nothing is stored.
    fn combine(
        &mut self,
        operator: AssignmentOperator,
        current: Value,
        right: &Expression,
        name: Option<&str>,
        scope: &ScopeRef,
    ) -> Result<Option<Value>, Control> {
        let short_circuit = match operator {
            AssignmentOperator::AndAssign => !current.to_boolean(),
            AssignmentOperator::OrAssign => current.to_boolean(),
            AssignmentOperator::NullishAssign => !current.is_nullish(),
            AssignmentOperator::Assign => false,
            AssignmentOperator::Compound(operator) => {
                let right = self.eval_expression(right, scope)?;
                return self.binary_operation(operator, &current, &right).map(Some);
            }
        };
        if short_circuit {
            return Ok(None);
        }
        self.eval_named(right, name, scope).map(Some)
    }
}

fn lexical_kind(kind: VariableKind) -> BindingKind {
    match kind {
        VariableKind::Var => BindingKind::Var,
        VariableKind::Let => BindingKind::Let,
        VariableKind::Const => BindingKind::Const,
    }
}

/// Whether a statement list declares block-scoped names of its own
fn needs_scope(body: &[Statement]) -> bool {
    body.iter().any(|statement| {
        matches!(
            statement,
            Statement::FunctionDeclaration { .. }
                | Statement::VariableDeclaration {
                    kind: VariableKind::Let | VariableKind::Const,
                    ..
                }
        )
    })
}

/// Fresh scope for the next `for (let ...)` iteration holding a copy of the loop variables
fn copy_iteration_scope(previous: &ScopeRef, parent: &ScopeRef) -> ScopeRef {
    let next = Scope::block(parent);
    previous.copy_lexical_into(&next);
    next
}

/// Name given to an anonymous function bound directly to an identifier
fn pattern_name(pattern: &Pattern) -> Option<&str> {
    match pattern {
        Pattern::Identifier(name) => Some(name.as_str()),
        _ => None,
    }
}

/// Names bound by a pattern
fn pattern_names(pattern: &Pattern, names: &mut Vec<String>) {
    match pattern {
        Pattern::Identifier(name) => names.push(name.clone()),
        Pattern::ObjectPattern { properties, rest } => {
            for property in properties {
                pattern_names(&property.value, names);
            }
            if let Some(rest) = rest {
                pattern_names(rest, names);
            }
        }
        Pattern::ArrayPattern(elements) => {
            for element in elements.iter().flatten() {
                pattern_names(element, names);
            }
        }
        Pattern::AssignmentPattern { left, .. } => pattern_names(left, names),
        Pattern::RestElement(target) => pattern_names(target, names),
        Pattern::Member(_) => {}
    }
}

/// `var` names declared anywhere in a function body, excluding nested functions
fn collect_var_names(body: &[Statement], names: &mut Vec<String>) {
    for statement in body {
        collect_statement_var_names(statement, names);
    }
}

fn collect_statement_var_names(statement: &Statement, names: &mut Vec<String>) {
    match statement {
        Statement::VariableDeclaration {
            kind: VariableKind::Var,
            declarations,
            ..
        } => {
            for declarator in declarations {
                pattern_names(&declarator.id, names);
            }
        }
        Statement::IfStatement {
            consequent, alternate, ..
        } => {
            collect_statement_var_names(consequent, names);
            if let Some(alternate) = alternate {
                collect_statement_var_names(alternate, names);
            }
        }
        Statement::WhileStatement { body, .. } | Statement::DoWhileStatement { body, .. } => {
            collect_statement_var_names(body, names)
        }
        Statement::ForStatement { init, body, .. } => {
            if let Some(ForInit::VariableDeclaration {
                kind: VariableKind::Var,
                declarations,
            }) = init
            {
                for declarator in declarations {
                    pattern_names(&declarator.id, names);
                }
            }
            collect_statement_var_names(body, names);
        }
        Statement::ForInStatement { left, body, .. } | Statement::ForOfStatement { left, body, .. } => {
            if let ForInOfLeft::VariableDeclaration {
                kind: VariableKind::Var,
                id,
            } = left
            {
                pattern_names(id, names);
            }
            collect_statement_var_names(body, names);
        }
        Statement::BlockStatement { body, .. } => collect_var_names(body, names),
        Statement::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            collect_var_names(block, names);
            if let Some(handler) = handler {
                collect_var_names(&handler.body, names);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(finalizer, names);
            }
        }
        Statement::SwitchStatement { cases, .. } => {
            for case in cases {
                collect_var_names(&case.consequent, names);
            }
        }
        _ => {}
    }
}

/// Source-like rendering of a callee for "is not a function" messages
fn expression_text(expression: &Expression) -> String {
    match expression {
        Expression::Identifier { name, .. } => name.clone(),
        Expression::ThisExpression { .. } => "this".to_string(),
        Expression::MemberExpression {
            object,
            property,
            computed: false,
            ..
        } => match property.as_ref() {
            Expression::Identifier { name, .. } => format!("{}.{}", expression_text(object), name),
            _ => format!("{}[...]", expression_text(object)),
        },
        Expression::MemberExpression { object, property, .. } => match property.as_ref() {
            Expression::Literal {
                value: Literal::Number(n),
                ..
            } => format!("{}[{}]", expression_text(object), number_to_string(*n)),
            Expression::Literal {
                value: Literal::String(s),
                ..
            } => format!("{}[\"{}\"]", expression_text(object), s),
            _ => format!("{}[...]", expression_text(object)),
        },
        Expression::CallExpression { callee, .. } => format!("{}(...)", expression_text(callee)),
        Expression::OptionalChain { expression, .. } => expression_text(expression),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_text() {
        let program = parser::parse("a.b[0].c(x)").unwrap();
        match &program.body[0] {
            Statement::ExpressionStatement {
                expression: Expression::CallExpression { callee, .. },
                ..
            } => assert_eq!(expression_text(callee), "a.b[0].c"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_var_names_skip_nested_functions() {
        let program = parser::parse(
            "var a = 1; if (x) { var b; } for (var i = 0;;) {} function f() { var hidden; } let c;",
        )
        .unwrap();
        let mut names = Vec::new();
        collect_var_names(&program.body, &mut names);
        assert_eq!(names, vec!["a", "b", "i"]);
    }
}
