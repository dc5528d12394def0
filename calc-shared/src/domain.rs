//! Core data model: expressions, tasks, and the operations between them.

use serde::{Deserialize, Serialize};

/// One of the four supported binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// Applies the operation to two operands, per IEEE-754 double semantics.
    /// Division by zero yields `NaN` rather than panicking or erroring —
    /// the caller (the worker) reports that result and lets the store
    /// classify it as a failure.
    pub fn apply(self, arg1: f64, arg2: f64) -> f64 {
        match self {
            Operation::Add => arg1 + arg2,
            Operation::Subtract => arg1 - arg2,
            Operation::Multiply => arg1 * arg2,
            Operation::Divide => arg1 / arg2,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Subtract => '-',
            Operation::Multiply => '*',
            Operation::Divide => '/',
        }
    }
}

/// Lifecycle status shared by expressions and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// A user-submitted infix arithmetic string and its server-side record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: String,
    pub text: String,
    pub status: Status,
    pub result: Option<f64>,
    pub error: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// A single binary-operation node of an expression's dependency graph.
///
/// `parent1_id`/`parent2_id` reference sibling tasks by ID, never by object
/// pointer — a missing parent ID means the corresponding `arg` is a literal
/// from the source expression rather than a value awaiting propagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub expression_id: String,
    pub parent1_id: Option<String>,
    pub parent2_id: Option<String>,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operation,
    pub status: Status,
    pub result: Option<f64>,
    pub lease_expire_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Task {
    /// A task is ready to dispatch once every non-empty parent has
    /// completed — invariant 3 of the data model.
    pub fn is_ready(&self, parent1_done: bool, parent2_done: bool) -> bool {
        self.status == Status::Pending
            && (self.parent1_id.is_none() || parent1_done)
            && (self.parent2_id.is_none() || parent2_done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_by_zero_yields_nan() {
        let result = Operation::Divide.apply(10.0, 0.0);
        assert!(result.is_nan());
    }

    #[test]
    fn subtraction_is_order_sensitive() {
        assert_eq!(Operation::Subtract.apply(8.0, 3.0), 5.0);
        assert_eq!(Operation::Subtract.apply(3.0, 8.0), -5.0);
    }

    #[test]
    fn task_with_no_parents_is_ready_immediately() {
        let task = Task {
            id: "t1".into(),
            expression_id: "e1".into(),
            parent1_id: None,
            parent2_id: None,
            arg1: 2.0,
            arg2: 2.0,
            operation: Operation::Add,
            status: Status::Pending,
            result: None,
            lease_expire_at_ms: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        assert!(task.is_ready(false, false));
    }

    #[test]
    fn task_with_unfinished_parent_is_not_ready() {
        let task = Task {
            id: "t1".into(),
            expression_id: "e1".into(),
            parent1_id: Some("p1".into()),
            parent2_id: None,
            arg1: 0.0,
            arg2: 2.0,
            operation: Operation::Add,
            status: Status::Pending,
            result: None,
            lease_expire_at_ms: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        assert!(!task.is_ready(false, false));
        assert!(task.is_ready(true, false));
    }
}
