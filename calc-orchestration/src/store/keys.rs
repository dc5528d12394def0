//! Key schema for the single `sled::Tree` backing the store.
//!
//! All keys are ASCII-printable for ease of debugging. Ordered prefix scans
//! over the `expr:list:`, `expr:<id>:tasks:`, and `task:queue:pending:`
//! prefixes drive enumeration, membership lookup, and dispatch order
//! respectively.

pub fn expr_key(id: &str) -> Vec<u8> {
    format!("expr:{id}").into_bytes()
}

pub const EXPR_LIST_PREFIX: &str = "expr:list:";

pub fn expr_list_key(id: &str) -> Vec<u8> {
    format!("{EXPR_LIST_PREFIX}{id}").into_bytes()
}

pub fn expr_tasks_prefix(expr_id: &str) -> String {
    format!("expr:{expr_id}:tasks:")
}

pub fn expr_task_membership_key(expr_id: &str, task_id: &str) -> Vec<u8> {
    format!("{}{}", expr_tasks_prefix(expr_id), task_id).into_bytes()
}

pub fn task_key(id: &str) -> Vec<u8> {
    format!("task:{id}").into_bytes()
}

pub const TASK_QUEUE_PENDING_PREFIX: &str = "task:queue:pending:";

pub fn task_queue_pending_key(id: &str) -> Vec<u8> {
    format!("{TASK_QUEUE_PENDING_PREFIX}{id}").into_bytes()
}
