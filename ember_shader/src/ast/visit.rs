//! Recursive AST traversal.
//!
//! [`Visitor`] walks shared references, [`VisitorMut`] walks mutable
//! ones. Every method has a default implementation that descends into
//! the owned children in source order via the matching free `walk_*`
//! function; an override can call the `walk_*` function to continue
//! the descent below the node it handled, or return to prune it.

use super::{
    AccessIdentifierExpression, AccessIndexExpression, AssignmentExpression, BinaryExpression,
    BuiltInFunctionCallExpression, CastExpression, ConditionalStatement, ConstantExpression,
    DoWhileLoopStatement, EntryFunctionDeclaration, Expression, ExpressionStatement,
    ExternalDeclaration, ForLoopStatement, FunctionCallExpression, FunctionDeclaration,
    IncludeStatement, InputDeclaration, OptionDeclaration, OptionalStatement, OutputDeclaration,
    ReturnStatement, SequenceStatement, Statement, StructDeclaration, SwizzleExpression,
    TernaryExpression, UnaryExpression, VariableDeclaration, VariableExpression,
    WhileLoopStatement,
};

pub trait Visitor {
    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_conditional(&mut self, statement: &ConditionalStatement) {
        walk_conditional(self, statement);
    }

    fn visit_for_loop(&mut self, statement: &ForLoopStatement) {
        walk_for_loop(self, statement);
    }

    fn visit_while_loop(&mut self, statement: &WhileLoopStatement) {
        walk_while_loop(self, statement);
    }

    fn visit_do_while_loop(&mut self, statement: &DoWhileLoopStatement) {
        walk_do_while_loop(self, statement);
    }

    fn visit_variable_declaration(&mut self, statement: &VariableDeclaration) {
        walk_variable_declaration(self, statement);
    }

    fn visit_struct_declaration(&mut self, statement: &StructDeclaration) {
        walk_struct_declaration(self, statement);
    }

    fn visit_input_declaration(&mut self, statement: &InputDeclaration) {
        walk_input_declaration(self, statement);
    }

    fn visit_output_declaration(&mut self, statement: &OutputDeclaration) {
        walk_output_declaration(self, statement);
    }

    fn visit_external_declaration(&mut self, statement: &ExternalDeclaration) {
        walk_external_declaration(self, statement);
    }

    fn visit_option_declaration(&mut self, statement: &OptionDeclaration) {
        walk_option_declaration(self, statement);
    }

    fn visit_function_declaration(&mut self, statement: &FunctionDeclaration) {
        walk_function_declaration(self, statement);
    }

    fn visit_entry_function_declaration(&mut self, statement: &EntryFunctionDeclaration) {
        walk_entry_function_declaration(self, statement);
    }

    fn visit_expression_statement(&mut self, statement: &ExpressionStatement) {
        self.visit_expression(&statement.expression);
    }

    fn visit_break(&mut self) {}

    fn visit_continue(&mut self) {}

    fn visit_return(&mut self, statement: &ReturnStatement) {
        if let Some(expression) = &statement.expression {
            self.visit_expression(expression);
        }
    }

    fn visit_discard(&mut self) {}

    fn visit_sequence(&mut self, statement: &SequenceStatement) {
        walk_sequence(self, statement);
    }

    fn visit_optional(&mut self, statement: &OptionalStatement) {
        walk_optional(self, statement);
    }

    fn visit_include(&mut self, _statement: &IncludeStatement) {}

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }

    fn visit_constant(&mut self, _expression: &ConstantExpression) {}

    fn visit_variable_expression(&mut self, _expression: &VariableExpression) {}

    fn visit_access_index(&mut self, expression: &AccessIndexExpression) {
        self.visit_expression(&expression.expression);
        self.visit_expression(&expression.index);
    }

    fn visit_access_identifier(&mut self, expression: &AccessIdentifierExpression) {
        self.visit_expression(&expression.expression);
    }

    fn visit_assignment(&mut self, expression: &AssignmentExpression) {
        self.visit_expression(&expression.left);
        self.visit_expression(&expression.right);
    }

    fn visit_unary(&mut self, expression: &UnaryExpression) {
        self.visit_expression(&expression.operand);
    }

    fn visit_binary(&mut self, expression: &BinaryExpression) {
        self.visit_expression(&expression.left);
        self.visit_expression(&expression.right);
    }

    fn visit_function_call(&mut self, expression: &FunctionCallExpression) {
        walk_function_call(self, expression);
    }

    fn visit_built_in_function_call(&mut self, expression: &BuiltInFunctionCallExpression) {
        for argument in &expression.arguments {
            self.visit_expression(argument);
        }
    }

    fn visit_cast(&mut self, expression: &CastExpression) {
        for argument in &expression.arguments {
            self.visit_expression(argument);
        }
    }

    fn visit_swizzle(&mut self, expression: &SwizzleExpression) {
        self.visit_expression(&expression.expression);
    }

    fn visit_ternary(&mut self, expression: &TernaryExpression) {
        self.visit_expression(&expression.condition);
        self.visit_expression(&expression.true_value);
        self.visit_expression(&expression.false_value);
    }
}

pub fn walk_statement<V>(visitor: &mut V, statement: &Statement)
where
    V: Visitor + ?Sized,
{
    match statement {
        Statement::Conditional(s) => visitor.visit_conditional(s),
        Statement::ForLoop(s) => visitor.visit_for_loop(s),
        Statement::WhileLoop(s) => visitor.visit_while_loop(s),
        Statement::DoWhileLoop(s) => visitor.visit_do_while_loop(s),
        Statement::VariableDeclaration(s) => visitor.visit_variable_declaration(s),
        Statement::StructDeclaration(s) => visitor.visit_struct_declaration(s),
        Statement::InputDeclaration(s) => visitor.visit_input_declaration(s),
        Statement::OutputDeclaration(s) => visitor.visit_output_declaration(s),
        Statement::ExternalDeclaration(s) => visitor.visit_external_declaration(s),
        Statement::OptionDeclaration(s) => visitor.visit_option_declaration(s),
        Statement::FunctionDeclaration(s) => visitor.visit_function_declaration(s),
        Statement::EntryFunctionDeclaration(s) => visitor.visit_entry_function_declaration(s),
        Statement::Expression(s) => visitor.visit_expression_statement(s),
        Statement::Break => visitor.visit_break(),
        Statement::Continue => visitor.visit_continue(),
        Statement::Return(s) => visitor.visit_return(s),
        Statement::Discard => visitor.visit_discard(),
        Statement::Sequence(s) => visitor.visit_sequence(s),
        Statement::Optional(s) => visitor.visit_optional(s),
        Statement::Include(s) => visitor.visit_include(s),
    }
}

pub fn walk_conditional<V>(visitor: &mut V, statement: &ConditionalStatement)
where
    V: Visitor + ?Sized,
{
    for branch in &statement.branches {
        visitor.visit_expression(&branch.condition);
        visitor.visit_statement(&branch.statement);
    }

    if let Some(else_statement) = &statement.else_statement {
        visitor.visit_statement(else_statement);
    }
}

pub fn walk_for_loop<V>(visitor: &mut V, statement: &ForLoopStatement)
where
    V: Visitor + ?Sized,
{
    if let Some(initialization) = &statement.initialization {
        visitor.visit_statement(initialization);
    }

    if let Some(condition) = &statement.condition {
        visitor.visit_expression(condition);
    }

    if let Some(increase) = &statement.increase {
        visitor.visit_expression(increase);
    }

    visitor.visit_statement(&statement.statement);
}

pub fn walk_while_loop<V>(visitor: &mut V, statement: &WhileLoopStatement)
where
    V: Visitor + ?Sized,
{
    visitor.visit_expression(&statement.condition);
    visitor.visit_statement(&statement.statement);
}

pub fn walk_do_while_loop<V>(visitor: &mut V, statement: &DoWhileLoopStatement)
where
    V: Visitor + ?Sized,
{
    visitor.visit_expression(&statement.condition);
    visitor.visit_statement(&statement.statement);
}

pub fn walk_variable_declaration<V>(visitor: &mut V, statement: &VariableDeclaration)
where
    V: Visitor + ?Sized,
{
    if let Some(value) = &statement.value {
        visitor.visit_expression(value);
    }
}

pub fn walk_struct_declaration<V>(visitor: &mut V, statement: &StructDeclaration)
where
    V: Visitor + ?Sized,
{
    for member in &statement.members {
        if let Some(condition) = &member.condition {
            visitor.visit_expression(condition);
        }
    }
}

pub fn walk_input_declaration<V>(visitor: &mut V, statement: &InputDeclaration)
where
    V: Visitor + ?Sized,
{
    for variable in &statement.variables {
        visitor.visit_expression(&variable.location);

        if let Some(condition) = &variable.condition {
            visitor.visit_expression(condition);
        }
    }
}

pub fn walk_output_declaration<V>(visitor: &mut V, statement: &OutputDeclaration)
where
    V: Visitor + ?Sized,
{
    for variable in &statement.variables {
        visitor.visit_expression(&variable.location);

        if let Some(condition) = &variable.condition {
            visitor.visit_expression(condition);
        }
    }
}

pub fn walk_external_declaration<V>(visitor: &mut V, statement: &ExternalDeclaration)
where
    V: Visitor + ?Sized,
{
    for variable in &statement.variables {
        visitor.visit_expression(&variable.set_index);
        visitor.visit_expression(&variable.binding_index);

        if let Some(condition) = &variable.condition {
            visitor.visit_expression(condition);
        }
    }
}

pub fn walk_option_declaration<V>(visitor: &mut V, statement: &OptionDeclaration)
where
    V: Visitor + ?Sized,
{
    for variable in &statement.variables {
        if let Some(value) = &variable.value {
            visitor.visit_expression(value);
        }
    }
}

pub fn walk_function_declaration<V>(visitor: &mut V, statement: &FunctionDeclaration)
where
    V: Visitor + ?Sized,
{
    visitor.visit_sequence(&statement.sequence);
}

pub fn walk_entry_function_declaration<V>(visitor: &mut V, statement: &EntryFunctionDeclaration)
where
    V: Visitor + ?Sized,
{
    visitor.visit_sequence(&statement.function.sequence);
}

pub fn walk_sequence<V>(visitor: &mut V, statement: &SequenceStatement)
where
    V: Visitor + ?Sized,
{
    for statement in &statement.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_optional<V>(visitor: &mut V, statement: &OptionalStatement)
where
    V: Visitor + ?Sized,
{
    visitor.visit_expression(&statement.condition);
    visitor.visit_statement(&statement.statement);
}

pub fn walk_expression<V>(visitor: &mut V, expression: &Expression)
where
    V: Visitor + ?Sized,
{
    match expression {
        Expression::Constant(e) => visitor.visit_constant(e),
        Expression::Variable(e) => visitor.visit_variable_expression(e),
        Expression::AccessIndex(e) => visitor.visit_access_index(e),
        Expression::AccessIdentifier(e) => visitor.visit_access_identifier(e),
        Expression::Assignment(e) => visitor.visit_assignment(e),
        Expression::Unary(e) => visitor.visit_unary(e),
        Expression::Binary(e) => visitor.visit_binary(e),
        Expression::FunctionCall(e) => visitor.visit_function_call(e),
        Expression::BuiltInFunctionCall(e) => visitor.visit_built_in_function_call(e),
        Expression::Cast(e) => visitor.visit_cast(e),
        Expression::Swizzle(e) => visitor.visit_swizzle(e),
        Expression::Ternary(e) => visitor.visit_ternary(e),
    }
}

pub fn walk_function_call<V>(visitor: &mut V, expression: &FunctionCallExpression)
where
    V: Visitor + ?Sized,
{
    for argument in &expression.arguments {
        visitor.visit_expression(argument);
    }
}

/// The mutable twin of [`Visitor`].
pub trait VisitorMut {
    fn visit_statement_mut(&mut self, statement: &mut Statement) {
        walk_statement_mut(self, statement);
    }

    fn visit_conditional_mut(&mut self, statement: &mut ConditionalStatement) {
        for branch in &mut statement.branches {
            self.visit_expression_mut(&mut branch.condition);
            self.visit_statement_mut(&mut branch.statement);
        }

        if let Some(else_statement) = &mut statement.else_statement {
            self.visit_statement_mut(else_statement);
        }
    }

    fn visit_for_loop_mut(&mut self, statement: &mut ForLoopStatement) {
        if let Some(initialization) = &mut statement.initialization {
            self.visit_statement_mut(initialization);
        }

        if let Some(condition) = &mut statement.condition {
            self.visit_expression_mut(condition);
        }

        if let Some(increase) = &mut statement.increase {
            self.visit_expression_mut(increase);
        }

        self.visit_statement_mut(&mut statement.statement);
    }

    fn visit_while_loop_mut(&mut self, statement: &mut WhileLoopStatement) {
        self.visit_expression_mut(&mut statement.condition);
        self.visit_statement_mut(&mut statement.statement);
    }

    fn visit_do_while_loop_mut(&mut self, statement: &mut DoWhileLoopStatement) {
        self.visit_expression_mut(&mut statement.condition);
        self.visit_statement_mut(&mut statement.statement);
    }

    fn visit_variable_declaration_mut(&mut self, statement: &mut VariableDeclaration) {
        if let Some(value) = &mut statement.value {
            self.visit_expression_mut(value);
        }
    }

    fn visit_struct_declaration_mut(&mut self, statement: &mut StructDeclaration) {
        for member in &mut statement.members {
            if let Some(condition) = &mut member.condition {
                self.visit_expression_mut(condition);
            }
        }
    }

    fn visit_input_declaration_mut(&mut self, statement: &mut InputDeclaration) {
        for variable in &mut statement.variables {
            self.visit_expression_mut(&mut variable.location);

            if let Some(condition) = &mut variable.condition {
                self.visit_expression_mut(condition);
            }
        }
    }

    fn visit_output_declaration_mut(&mut self, statement: &mut OutputDeclaration) {
        for variable in &mut statement.variables {
            self.visit_expression_mut(&mut variable.location);

            if let Some(condition) = &mut variable.condition {
                self.visit_expression_mut(condition);
            }
        }
    }

    fn visit_external_declaration_mut(&mut self, statement: &mut ExternalDeclaration) {
        for variable in &mut statement.variables {
            self.visit_expression_mut(&mut variable.set_index);
            self.visit_expression_mut(&mut variable.binding_index);

            if let Some(condition) = &mut variable.condition {
                self.visit_expression_mut(condition);
            }
        }
    }

    fn visit_option_declaration_mut(&mut self, statement: &mut OptionDeclaration) {
        for variable in &mut statement.variables {
            if let Some(value) = &mut variable.value {
                self.visit_expression_mut(value);
            }
        }
    }

    fn visit_function_declaration_mut(&mut self, statement: &mut FunctionDeclaration) {
        self.visit_sequence_mut(&mut statement.sequence);
    }

    fn visit_entry_function_declaration_mut(&mut self, statement: &mut EntryFunctionDeclaration) {
        self.visit_sequence_mut(&mut statement.function.sequence);
    }

    fn visit_expression_statement_mut(&mut self, statement: &mut ExpressionStatement) {
        self.visit_expression_mut(&mut statement.expression);
    }

    fn visit_break_mut(&mut self) {}

    fn visit_continue_mut(&mut self) {}

    fn visit_return_mut(&mut self, statement: &mut ReturnStatement) {
        if let Some(expression) = &mut statement.expression {
            self.visit_expression_mut(expression);
        }
    }

    fn visit_discard_mut(&mut self) {}

    fn visit_sequence_mut(&mut self, statement: &mut SequenceStatement) {
        for statement in &mut statement.statements {
            self.visit_statement_mut(statement);
        }
    }

    fn visit_optional_mut(&mut self, statement: &mut OptionalStatement) {
        self.visit_expression_mut(&mut statement.condition);
        self.visit_statement_mut(&mut statement.statement);
    }

    fn visit_include_mut(&mut self, _statement: &mut IncludeStatement) {}

    fn visit_expression_mut(&mut self, expression: &mut Expression) {
        walk_expression_mut(self, expression);
    }

    fn visit_constant_mut(&mut self, _expression: &mut ConstantExpression) {}

    fn visit_variable_expression_mut(&mut self, _expression: &mut VariableExpression) {}

    fn visit_access_index_mut(&mut self, expression: &mut AccessIndexExpression) {
        self.visit_expression_mut(&mut expression.expression);
        self.visit_expression_mut(&mut expression.index);
    }

    fn visit_access_identifier_mut(&mut self, expression: &mut AccessIdentifierExpression) {
        self.visit_expression_mut(&mut expression.expression);
    }

    fn visit_assignment_mut(&mut self, expression: &mut AssignmentExpression) {
        self.visit_expression_mut(&mut expression.left);
        self.visit_expression_mut(&mut expression.right);
    }

    fn visit_unary_mut(&mut self, expression: &mut UnaryExpression) {
        self.visit_expression_mut(&mut expression.operand);
    }

    fn visit_binary_mut(&mut self, expression: &mut BinaryExpression) {
        self.visit_expression_mut(&mut expression.left);
        self.visit_expression_mut(&mut expression.right);
    }

    fn visit_function_call_mut(&mut self, expression: &mut FunctionCallExpression) {
        for argument in &mut expression.arguments {
            self.visit_expression_mut(argument);
        }
    }

    fn visit_built_in_function_call_mut(&mut self, expression: &mut BuiltInFunctionCallExpression) {
        for argument in &mut expression.arguments {
            self.visit_expression_mut(argument);
        }
    }

    fn visit_cast_mut(&mut self, expression: &mut CastExpression) {
        for argument in &mut expression.arguments {
            self.visit_expression_mut(argument);
        }
    }

    fn visit_swizzle_mut(&mut self, expression: &mut SwizzleExpression) {
        self.visit_expression_mut(&mut expression.expression);
    }

    fn visit_ternary_mut(&mut self, expression: &mut TernaryExpression) {
        self.visit_expression_mut(&mut expression.condition);
        self.visit_expression_mut(&mut expression.true_value);
        self.visit_expression_mut(&mut expression.false_value);
    }
}

pub fn walk_statement_mut<V>(visitor: &mut V, statement: &mut Statement)
where
    V: VisitorMut + ?Sized,
{
    match statement {
        Statement::Conditional(s) => visitor.visit_conditional_mut(s),
        Statement::ForLoop(s) => visitor.visit_for_loop_mut(s),
        Statement::WhileLoop(s) => visitor.visit_while_loop_mut(s),
        Statement::DoWhileLoop(s) => visitor.visit_do_while_loop_mut(s),
        Statement::VariableDeclaration(s) => visitor.visit_variable_declaration_mut(s),
        Statement::StructDeclaration(s) => visitor.visit_struct_declaration_mut(s),
        Statement::InputDeclaration(s) => visitor.visit_input_declaration_mut(s),
        Statement::OutputDeclaration(s) => visitor.visit_output_declaration_mut(s),
        Statement::ExternalDeclaration(s) => visitor.visit_external_declaration_mut(s),
        Statement::OptionDeclaration(s) => visitor.visit_option_declaration_mut(s),
        Statement::FunctionDeclaration(s) => visitor.visit_function_declaration_mut(s),
        Statement::EntryFunctionDeclaration(s) => visitor.visit_entry_function_declaration_mut(s),
        Statement::Expression(s) => visitor.visit_expression_statement_mut(s),
        Statement::Break => visitor.visit_break_mut(),
        Statement::Continue => visitor.visit_continue_mut(),
        Statement::Return(s) => visitor.visit_return_mut(s),
        Statement::Discard => visitor.visit_discard_mut(),
        Statement::Sequence(s) => visitor.visit_sequence_mut(s),
        Statement::Optional(s) => visitor.visit_optional_mut(s),
        Statement::Include(s) => visitor.visit_include_mut(s),
    }
}

pub fn walk_expression_mut<V>(visitor: &mut V, expression: &mut Expression)
where
    V: VisitorMut + ?Sized,
{
    match expression {
        Expression::Constant(e) => visitor.visit_constant_mut(e),
        Expression::Variable(e) => visitor.visit_variable_expression_mut(e),
        Expression::AccessIndex(e) => visitor.visit_access_index_mut(e),
        Expression::AccessIdentifier(e) => visitor.visit_access_identifier_mut(e),
        Expression::Assignment(e) => visitor.visit_assignment_mut(e),
        Expression::Unary(e) => visitor.visit_unary_mut(e),
        Expression::Binary(e) => visitor.visit_binary_mut(e),
        Expression::FunctionCall(e) => visitor.visit_function_call_mut(e),
        Expression::BuiltInFunctionCall(e) => visitor.visit_built_in_function_call_mut(e),
        Expression::Cast(e) => visitor.visit_cast_mut(e),
        Expression::Swizzle(e) => visitor.visit_swizzle_mut(e),
        Expression::Ternary(e) => visitor.visit_ternary_mut(e),
    }
}
