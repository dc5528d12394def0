//! Folds a postfix token sequence into a DAG of binary task specifications.

use calc_shared::domain::Operation;
use calc_shared::errors::{CalcError, CalcResult};
use calc_shared::ids::new_id;

use crate::parser::Token;

/// A scheduled, not-yet-persisted task: parents referenced by ID, literal
/// arguments already resolved where there is no parent.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: String,
    pub parent1_id: Option<String>,
    pub parent2_id: Option<String>,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operation,
}

#[derive(Debug, Clone, Copy)]
enum StackItem {
    Literal(f64),
    TaskRef(usize),
}

/// Walks the RPN sequence, emitting one [`TaskSpec`] per operator. Order is
/// such that parents precede children — the natural consequence of the fold.
///
/// A single-literal expression (no operators) produces zero tasks; the
/// caller is responsible for treating that as an immediately-completed
/// expression whose result is the literal.
pub fn schedule(tokens: &[Token]) -> CalcResult<Vec<TaskSpec>> {
    let mut stack: Vec<StackItem> = Vec::new();
    let mut tasks: Vec<TaskSpec> = Vec::new();

    for token in tokens {
        match token {
            Token::Literal(value) => stack.push(StackItem::Literal(*value)),
            Token::Op(operation) => {
                let right = stack
                    .pop()
                    .ok_or_else(|| CalcError::invalid_expression("missing operand"))?;
                let left = stack
                    .pop()
                    .ok_or_else(|| CalcError::invalid_expression("missing operand"))?;

                let (arg1, parent1_id) = match left {
                    StackItem::Literal(v) => (v, None),
                    StackItem::TaskRef(idx) => (0.0, Some(tasks[idx].id.clone())),
                };
                let (arg2, parent2_id) = match right {
                    StackItem::Literal(v) => (v, None),
                    StackItem::TaskRef(idx) => (0.0, Some(tasks[idx].id.clone())),
                };

                let spec = TaskSpec {
                    id: new_id(),
                    parent1_id,
                    parent2_id,
                    arg1,
                    arg2,
                    operation: *operation,
                };
                let new_index = tasks.len();
                tasks.push(spec);
                stack.push(StackItem::TaskRef(new_index));
            }
        }
    }

    match stack.len() {
        1 => Ok(tasks),
        _ => Err(CalcError::invalid_expression(
            "malformed expression: leftover operands",
        )),
    }
}

/// The degenerate case of a single literal with no operators: the
/// expression's final value, with no tasks to schedule.
pub fn literal_value(tokens: &[Token]) -> Option<f64> {
    match tokens {
        [Token::Literal(value)] => Some(*value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn two_operator_expression_produces_two_tasks_in_dependency_order() {
        let tokens = parse("2 + 2 * 2").unwrap();
        let tasks = schedule(&tokens).unwrap();
        assert_eq!(tasks.len(), 2);

        // T1: 2 * 2
        assert_eq!(tasks[0].operation, Operation::Multiply);
        assert_eq!(tasks[0].arg1, 2.0);
        assert_eq!(tasks[0].arg2, 2.0);
        assert!(tasks[0].parent1_id.is_none());
        assert!(tasks[0].parent2_id.is_none());

        // T2: 2 + T1
        assert_eq!(tasks[1].operation, Operation::Add);
        assert_eq!(tasks[1].arg1, 2.0);
        assert!(tasks[1].parent1_id.is_none());
        assert_eq!(tasks[1].parent2_id.as_deref(), Some(tasks[0].id.as_str()));
    }

    #[test]
    fn parenthesized_expression_has_two_independent_roots_feeding_a_third() {
        let tokens = parse("(1 + 2) * (3 + 4)").unwrap();
        let tasks = schedule(&tokens).unwrap();
        assert_eq!(tasks.len(), 3);

        assert!(tasks[0].parent1_id.is_none() && tasks[0].parent2_id.is_none());
        assert!(tasks[1].parent1_id.is_none() && tasks[1].parent2_id.is_none());

        assert_eq!(tasks[2].parent1_id.as_deref(), Some(tasks[0].id.as_str()));
        assert_eq!(tasks[2].parent2_id.as_deref(), Some(tasks[1].id.as_str()));
        assert_eq!(tasks[2].operation, Operation::Multiply);
    }

    #[test]
    fn single_literal_has_no_tasks() {
        let tokens = parse("7").unwrap();
        assert!(schedule(&tokens).unwrap().is_empty());
        assert_eq!(literal_value(&tokens), Some(7.0));
    }

    #[test]
    fn multi_token_expression_has_no_literal_value() {
        let tokens = parse("1 + 2").unwrap();
        assert_eq!(literal_value(&tokens), None);
    }
}
