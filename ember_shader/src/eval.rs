//! Constant folding of AST expressions.
//!
//! Reflection needs `location`, `set` and `binding` expressions reduced
//! to integral constants; the evaluator folds the constant-expression
//! subset of the language and returns `None` for anything that depends
//! on runtime state.

use crate::ast::{
    BinaryOperator, ConstantValue, Expression, PrimitiveType, Type, UnaryOperator,
};

/// Reduces `expression` to a constant, if possible.
pub fn evaluate(expression: &Expression) -> Option<ConstantValue> {
    match expression {
        Expression::Constant(e) => Some(e.value),
        Expression::Unary(e) => {
            let operand = evaluate(&e.operand)?;
            evaluate_unary(e.operator, operand)
        }
        Expression::Binary(e) => {
            let left = evaluate(&e.left)?;
            let right = evaluate(&e.right)?;
            evaluate_binary(e.operator, left, right)
        }
        Expression::Ternary(e) => match evaluate(&e.condition)? {
            ConstantValue::Bool(true) => evaluate(&e.true_value),
            ConstantValue::Bool(false) => evaluate(&e.false_value),
            _ => None,
        },
        Expression::Cast(e) => {
            let [argument] = e.arguments.as_slice() else {
                return None;
            };
            evaluate_cast(&e.ty, evaluate(argument)?)
        }
        _ => None,
    }
}

/// Reduces `expression` to a non-negative integral constant.
pub fn evaluate_u32(expression: &Expression) -> Option<u32> {
    match evaluate(expression)? {
        ConstantValue::UInt(value) => Some(value),
        ConstantValue::Int(value) => u32::try_from(value).ok(),
        _ => None,
    }
}

fn evaluate_unary(operator: UnaryOperator, operand: ConstantValue) -> Option<ConstantValue> {
    match (operator, operand) {
        (UnaryOperator::Positive, value @ (ConstantValue::Int(_) | ConstantValue::UInt(_) | ConstantValue::Float(_))) => {
            Some(value)
        }
        (UnaryOperator::Negative, ConstantValue::Int(value)) => {
            Some(ConstantValue::Int(value.checked_neg()?))
        }
        (UnaryOperator::Negative, ConstantValue::Float(value)) => {
            Some(ConstantValue::Float(-value))
        }
        (UnaryOperator::Not, ConstantValue::Bool(value)) => Some(ConstantValue::Bool(!value)),
        _ => None,
    }
}

fn evaluate_binary(
    operator: BinaryOperator,
    left: ConstantValue,
    right: ConstantValue,
) -> Option<ConstantValue> {
    use BinaryOperator::{
        Add, And, BitwiseAnd, BitwiseLeftShift, BitwiseOr, BitwiseRightShift, BitwiseXor, Divide,
        Equal, Greater, GreaterEqual, Less, LessEqual, Modulo, Multiply, NotEqual, Or, Subtract,
    };

    match (left, right) {
        (ConstantValue::Int(a), ConstantValue::Int(b)) => match operator {
            Add => a.checked_add(b).map(ConstantValue::Int),
            Subtract => a.checked_sub(b).map(ConstantValue::Int),
            Multiply => a.checked_mul(b).map(ConstantValue::Int),
            Divide => a.checked_div(b).map(ConstantValue::Int),
            Modulo => a.checked_rem(b).map(ConstantValue::Int),
            BitwiseAnd => Some(ConstantValue::Int(a & b)),
            BitwiseOr => Some(ConstantValue::Int(a | b)),
            BitwiseXor => Some(ConstantValue::Int(a ^ b)),
            BitwiseLeftShift => a.checked_shl(u32::try_from(b).ok()?).map(ConstantValue::Int),
            BitwiseRightShift => a.checked_shr(u32::try_from(b).ok()?).map(ConstantValue::Int),
            Equal => Some(ConstantValue::Bool(a == b)),
            NotEqual => Some(ConstantValue::Bool(a != b)),
            Less => Some(ConstantValue::Bool(a < b)),
            LessEqual => Some(ConstantValue::Bool(a <= b)),
            Greater => Some(ConstantValue::Bool(a > b)),
            GreaterEqual => Some(ConstantValue::Bool(a >= b)),
            And | Or => None,
        },
        (ConstantValue::UInt(a), ConstantValue::UInt(b)) => match operator {
            Add => a.checked_add(b).map(ConstantValue::UInt),
            Subtract => a.checked_sub(b).map(ConstantValue::UInt),
            Multiply => a.checked_mul(b).map(ConstantValue::UInt),
            Divide => a.checked_div(b).map(ConstantValue::UInt),
            Modulo => a.checked_rem(b).map(ConstantValue::UInt),
            BitwiseAnd => Some(ConstantValue::UInt(a & b)),
            BitwiseOr => Some(ConstantValue::UInt(a | b)),
            BitwiseXor => Some(ConstantValue::UInt(a ^ b)),
            BitwiseLeftShift => a.checked_shl(b).map(ConstantValue::UInt),
            BitwiseRightShift => a.checked_shr(b).map(ConstantValue::UInt),
            Equal => Some(ConstantValue::Bool(a == b)),
            NotEqual => Some(ConstantValue::Bool(a != b)),
            Less => Some(ConstantValue::Bool(a < b)),
            LessEqual => Some(ConstantValue::Bool(a <= b)),
            Greater => Some(ConstantValue::Bool(a > b)),
            GreaterEqual => Some(ConstantValue::Bool(a >= b)),
            And | Or => None,
        },
        (ConstantValue::Float(a), ConstantValue::Float(b)) => match operator {
            Add => Some(ConstantValue::Float(a + b)),
            Subtract => Some(ConstantValue::Float(a - b)),
            Multiply => Some(ConstantValue::Float(a * b)),
            Divide => Some(ConstantValue::Float(a / b)),
            Equal => Some(ConstantValue::Bool(a == b)),
            NotEqual => Some(ConstantValue::Bool(a != b)),
            Less => Some(ConstantValue::Bool(a < b)),
            LessEqual => Some(ConstantValue::Bool(a <= b)),
            Greater => Some(ConstantValue::Bool(a > b)),
            GreaterEqual => Some(ConstantValue::Bool(a >= b)),
            _ => None,
        },
        (ConstantValue::Bool(a), ConstantValue::Bool(b)) => match operator {
            And => Some(ConstantValue::Bool(a && b)),
            Or => Some(ConstantValue::Bool(a || b)),
            Equal => Some(ConstantValue::Bool(a == b)),
            NotEqual => Some(ConstantValue::Bool(a != b)),
            _ => None,
        },
        _ => None,
    }
}

fn evaluate_cast(ty: &Type, value: ConstantValue) -> Option<ConstantValue> {
    let Type::Primitive(primitive) = ty else {
        return None;
    };

    match (primitive, value) {
        (PrimitiveType::Int, ConstantValue::Int(v)) => Some(ConstantValue::Int(v)),
        (PrimitiveType::Int, ConstantValue::UInt(v)) => i32::try_from(v).ok().map(ConstantValue::Int),
        (PrimitiveType::Int, ConstantValue::Float(v)) => Some(ConstantValue::Int(v as i32)),
        (PrimitiveType::UInt, ConstantValue::UInt(v)) => Some(ConstantValue::UInt(v)),
        (PrimitiveType::UInt, ConstantValue::Int(v)) => u32::try_from(v).ok().map(ConstantValue::UInt),
        (PrimitiveType::UInt, ConstantValue::Float(v)) => Some(ConstantValue::UInt(v as u32)),
        (PrimitiveType::Float, ConstantValue::Float(v)) => Some(ConstantValue::Float(v)),
        (PrimitiveType::Float, ConstantValue::Int(v)) => Some(ConstantValue::Float(v as f32)),
        (PrimitiveType::Float, ConstantValue::UInt(v)) => Some(ConstantValue::Float(v as f32)),
        (PrimitiveType::Bool, ConstantValue::Bool(v)) => Some(ConstantValue::Bool(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{evaluate, evaluate_u32};
    use crate::ast::{
        BinaryExpression, BinaryOperator, ConstantValue, Expression, TernaryExpression,
    };

    fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    #[test]
    fn folds_integer_arithmetic() {
        let expression = binary(
            BinaryOperator::Add,
            Expression::constant(2_i32),
            Expression::constant(1_i32),
        );
        assert_eq!(evaluate(&expression), Some(ConstantValue::Int(3)));
        assert_eq!(evaluate_u32(&expression), Some(3));
    }

    #[test]
    fn folds_ternary_on_constant_condition() {
        let expression = Expression::Ternary(TernaryExpression {
            condition: Box::new(Expression::constant(false)),
            true_value: Box::new(Expression::constant(1_u32)),
            false_value: Box::new(Expression::constant(7_u32)),
        });
        assert_eq!(evaluate(&expression), Some(ConstantValue::UInt(7)));
    }

    #[test]
    fn runtime_values_do_not_fold() {
        let expression = binary(
            BinaryOperator::Add,
            Expression::constant(2_i32),
            Expression::variable("someRuntimeExpr"),
        );
        assert_eq!(evaluate(&expression), None);
        assert_eq!(evaluate_u32(&expression), None);
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let expression = binary(
            BinaryOperator::Divide,
            Expression::constant(2_i32),
            Expression::constant(0_i32),
        );
        assert_eq!(evaluate(&expression), None);
    }

    #[test]
    fn negative_values_are_not_locations() {
        assert_eq!(evaluate_u32(&Expression::constant(-1_i32)), None);
    }
}
