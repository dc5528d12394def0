//! `sled`-backed implementation of [`Store`].
//!
//! A single [`sled::Tree`] holds every key prefix of the schema; `sled`'s
//! transactional closures provide the atomicity and automatic
//! conflict-retry the design relies on (§4.3, §5).

use std::collections::HashSet;

use calc_shared::config::OperationTimings;
use calc_shared::domain::{Expression, Operation, Status, Task};
use calc_shared::errors::{CalcError, CalcResult};
use calc_shared::ids::new_id;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};

use super::keys::{
    expr_key, expr_list_key, expr_task_membership_key, expr_tasks_prefix, task_key,
    task_queue_pending_key, EXPR_LIST_PREFIX, TASK_QUEUE_PENDING_PREFIX,
};
use super::{LeasedTask, Store};
use crate::scheduler::TaskSpec;

#[derive(Debug, Clone)]
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Opens (creating if absent) the embedded store at `path`.
    pub fn open(path: &str) -> CalcResult<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree("calc")?;
        Ok(Self { tree })
    }

    fn get_task(tx: &TransactionalTree, id: &str) -> TxResult<Option<Task>> {
        let bytes = tx.get(task_key(id)).map_err(storage_err)?;
        match bytes {
            None => Ok(None),
            Some(b) => Ok(Some(decode(&b)?)),
        }
    }

    fn put_task(tx: &TransactionalTree, task: &Task) -> TxResult<()> {
        tx.insert(task_key(&task.id), encode(task)?)
            .map_err(storage_err)?;
        Ok(())
    }

    fn get_expression(tx: &TransactionalTree, id: &str) -> TxResult<Option<Expression>> {
        let bytes = tx.get(expr_key(id)).map_err(storage_err)?;
        match bytes {
            None => Ok(None),
            Some(b) => Ok(Some(decode(&b)?)),
        }
    }

    fn put_expression(tx: &TransactionalTree, expr: &Expression) -> TxResult<()> {
        tx.insert(expr_key(&expr.id), encode(expr)?)
            .map_err(storage_err)?;
        Ok(())
    }

    /// Recomputes an expression's status from its tasks, per invariant 5:
    /// `Failed` if any task failed, `Completed` if all did, `InProgress` if
    /// any task is non-pending, `Pending` otherwise. On transition to
    /// `Completed`, the result is the root task's — the unique task not
    /// referenced as any sibling's parent.
    fn recompute_expression_status(
        tx: &TransactionalTree,
        expr: &mut Expression,
        sibling_ids: &[String],
        now_ms: i64,
    ) -> TxResult<()> {
        let mut tasks = Vec::with_capacity(sibling_ids.len());
        for id in sibling_ids {
            if let Some(t) = Self::get_task(tx, id)? {
                tasks.push(t);
            }
        }

        let any_failed = tasks.iter().any(|t| t.status == Status::Failed);
        let all_completed = !tasks.is_empty() && tasks.iter().all(|t| t.status == Status::Completed);
        let any_non_pending = tasks.iter().any(|t| t.status != Status::Pending);

        let new_status = if any_failed {
            Status::Failed
        } else if all_completed {
            Status::Completed
        } else if any_non_pending {
            Status::InProgress
        } else {
            Status::Pending
        };

        if new_status == expr.status {
            return Ok(());
        }

        expr.status = new_status;
        expr.updated_at_ms = now_ms;

        match new_status {
            Status::Failed => {
                expr.error = Some("Task execution failed".to_string());
            }
            Status::Completed => {
                let referenced: HashSet<&str> = tasks
                    .iter()
                    .flat_map(|t| {
                        [t.parent1_id.as_deref(), t.parent2_id.as_deref()]
                            .into_iter()
                            .flatten()
                    })
                    .collect();
                let root = tasks.iter().find(|t| !referenced.contains(t.id.as_str()));
                if let Some(root) = root {
                    expr.result = root.result;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

/// The abort/conflict error type used by every transaction in this module.
type TxError = ConflictableTransactionError<CalcError>;
type TxResult<T> = Result<T, TxError>;

fn storage_err(e: sled::transaction::UnabortableTransactionError) -> TxError {
    ConflictableTransactionError::Abort(CalcError::internal(e.to_string()))
}

fn abort(e: CalcError) -> TxError {
    ConflictableTransactionError::Abort(e)
}

fn encode<T: serde::Serialize>(value: &T) -> TxResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| abort(CalcError::from(e)))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> TxResult<T> {
    serde_json::from_slice(bytes).map_err(|e| abort(CalcError::from(e)))
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn unwrap_tx<T>(result: Result<T, TransactionError<CalcError>>) -> CalcResult<T> {
    match result {
        Ok(v) => Ok(v),
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(CalcError::from(e)),
    }
}

fn timing_for(timings: &OperationTimings, op: Operation) -> u64 {
    match op {
        Operation::Add => timings.addition_ms,
        Operation::Subtract => timings.subtraction_ms,
        Operation::Multiply => timings.multiplication_ms,
        Operation::Divide => timings.division_ms,
    }
}

#[async_trait::async_trait]
impl Store for SledStore {
    async fn create_expression(
        &self,
        text: String,
        tasks: Vec<TaskSpec>,
        literal_result: Option<f64>,
    ) -> CalcResult<String> {
        let id = new_id();
        let now = now_ms();
        let tree = self.tree.clone();

        let result = tree.transaction(move |tx| -> TxResult<()> {
            let expr = if tasks.is_empty() {
                Expression {
                    id: id.clone(),
                    text: text.clone(),
                    status: Status::Completed,
                    result: literal_result,
                    error: None,
                    created_at_ms: now,
                    updated_at_ms: now,
                }
            } else {
                Expression {
                    id: id.clone(),
                    text: text.clone(),
                    status: Status::Pending,
                    result: None,
                    error: None,
                    created_at_ms: now,
                    updated_at_ms: now,
                }
            };
            SledStore::put_expression(tx, &expr)?;
            tx.insert(expr_list_key(&id), id.as_bytes())
                .map_err(storage_err)?;

            for spec in &tasks {
                let task = Task {
                    id: spec.id.clone(),
                    expression_id: id.clone(),
                    parent1_id: spec.parent1_id.clone(),
                    parent2_id: spec.parent2_id.clone(),
                    arg1: spec.arg1,
                    arg2: spec.arg2,
                    operation: spec.operation,
                    status: Status::Pending,
                    result: None,
                    lease_expire_at_ms: None,
                    created_at_ms: now,
                    updated_at_ms: now,
                };
                SledStore::put_task(tx, &task)?;
                tx.insert(expr_task_membership_key(&id, &task.id), b"1".as_ref())
                    .map_err(storage_err)?;
                if task.parent1_id.is_none() && task.parent2_id.is_none() {
                    tx.insert(task_queue_pending_key(&task.id), b"1".as_ref())
                        .map_err(storage_err)?;
                }
            }

            Ok(())
        });

        unwrap_tx(result)?;
        Ok(id)
    }

    async fn list_expressions(&self) -> CalcResult<Vec<Expression>> {
        let mut out = Vec::new();
        for entry in self.tree.scan_prefix(EXPR_LIST_PREFIX) {
            let (_, id_bytes) = entry?;
            let id = String::from_utf8_lossy(&id_bytes).to_string();
            if let Some(bytes) = self.tree.get(expr_key(&id))? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }

    async fn get_expression(&self, id: &str) -> CalcResult<Expression> {
        match self.tree.get(expr_key(id))? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(CalcError::expression_not_found(id)),
        }
    }

    async fn lease_next_task(
        &self,
        lease_ttl_ms: u64,
        timings: OperationTimings,
    ) -> CalcResult<LeasedTask> {
        let candidates: Vec<String> = self
            .tree
            .scan_prefix(TASK_QUEUE_PENDING_PREFIX)
            .keys()
            .filter_map(|k| k.ok())
            .map(|k| {
                String::from_utf8_lossy(&k)
                    .trim_start_matches(TASK_QUEUE_PENDING_PREFIX)
                    .to_string()
            })
            .collect();

        for candidate in candidates {
            let tree = self.tree.clone();
            let candidate_id = candidate.clone();
            let now = now_ms();

            let result = tree.transaction(move |tx| -> TxResult<Option<Task>> {
                let queue_key = task_queue_pending_key(&candidate_id);
                if tx.get(&queue_key).map_err(storage_err)?.is_none() {
                    // another lease already claimed this entry; caller
                    // should try the next candidate.
                    return Ok(None);
                }
                tx.remove(queue_key).map_err(storage_err)?;

                let mut task = match SledStore::get_task(tx, &candidate_id)? {
                    Some(t) => t,
                    None => {
                        return Err(abort(CalcError::internal(
                            "ready-queue entry referenced a missing task",
                        )))
                    }
                };
                task.status = Status::InProgress;
                task.lease_expire_at_ms = Some(now + lease_ttl_ms as i64);
                task.updated_at_ms = now;
                SledStore::put_task(tx, &task)?;

                if let Some(mut expr) = SledStore::get_expression(tx, &task.expression_id)? {
                    if expr.status == Status::Pending {
                        expr.status = Status::InProgress;
                        expr.updated_at_ms = now;
                        SledStore::put_expression(tx, &expr)?;
                    }
                }

                Ok(Some(task))
            });

            if let Some(task) = unwrap_tx(result)? {
                let operation_time_ms = timing_for(&timings, task.operation);
                return Ok(LeasedTask {
                    task,
                    operation_time_ms,
                });
            }
        }

        Err(CalcError::NoTasksAvailable)
    }

    async fn finish_task(&self, task_id: &str, completed: bool, result: f64) -> CalcResult<()> {
        let task = self
            .tree
            .get(task_key(task_id))?
            .ok_or_else(|| CalcError::task_not_found(task_id))?;
        let task: Task = serde_json::from_slice(&task)?;

        if matches!(task.status, Status::Completed | Status::Failed) {
            // Idempotent: a repeated submission for a terminal task is a no-op.
            return Ok(());
        }

        let expr_id = task.expression_id.clone();
        let sibling_ids: Vec<String> = self
            .tree
            .scan_prefix(expr_tasks_prefix(&expr_id))
            .keys()
            .filter_map(|k| k.ok())
            .map(|k| {
                let full = String::from_utf8_lossy(&k).to_string();
                full.rsplit(':').next().unwrap_or_default().to_string()
            })
            .collect();

        let tree = self.tree.clone();
        let task_id = task_id.to_string();
        let now = now_ms();

        let outcome = tree.transaction(move |tx| -> TxResult<()> {
            let mut task = SledStore::get_task(tx, &task_id)?
                .ok_or_else(|| abort(CalcError::task_not_found(&task_id)))?;

            if matches!(task.status, Status::Completed | Status::Failed) {
                return Ok(());
            }

            task.status = if completed {
                Status::Completed
            } else {
                Status::Failed
            };
            task.result = if completed { Some(result) } else { None };
            task.updated_at_ms = now;
            SledStore::put_task(tx, &task)?;
            tx.remove(task_queue_pending_key(&task_id))
                .map_err(storage_err)?;

            if completed {
                for sibling_id in &sibling_ids {
                    if sibling_id == &task_id {
                        continue;
                    }
                    let Some(mut sibling) = SledStore::get_task(tx, sibling_id)? else {
                        continue;
                    };
                    let mut mutated = false;
                    if sibling.parent1_id.as_deref() == Some(task_id.as_str()) {
                        sibling.arg1 = result;
                        mutated = true;
                    }
                    if sibling.parent2_id.as_deref() == Some(task_id.as_str()) {
                        sibling.arg2 = result;
                        mutated = true;
                    }
                    if !mutated {
                        continue;
                    }
                    sibling.updated_at_ms = now;

                    let parent1_done = match &sibling.parent1_id {
                        None => true,
                        Some(pid) if pid == &task_id => true,
                        Some(pid) => SledStore::get_task(tx, pid)?
                            .map(|p| p.status == Status::Completed)
                            .unwrap_or(false),
                    };
                    let parent2_done = match &sibling.parent2_id {
                        None => true,
                        Some(pid) if pid == &task_id => true,
                        Some(pid) => SledStore::get_task(tx, pid)?
                            .map(|p| p.status == Status::Completed)
                            .unwrap_or(false),
                    };

                    SledStore::put_task(tx, &sibling)?;
                    if sibling.status == Status::Pending && parent1_done && parent2_done {
                        tx.insert(task_queue_pending_key(&sibling.id), b"1".as_ref())
                            .map_err(storage_err)?;
                    }
                }
            } else {
                // Cascading failure: repeated passes over the expression's
                // task set until no new task is pulled in, per the design's
                // accepted O(N^2) bound for small DAGs.
                let mut failed: HashSet<String> = HashSet::new();
                failed.insert(task_id.clone());
                loop {
                    let mut grew = false;
                    for sibling_id in &sibling_ids {
                        if failed.contains(sibling_id) {
                            continue;
                        }
                        let Some(sibling) = SledStore::get_task(tx, sibling_id)? else {
                            continue;
                        };
                        let parent_failed = sibling
                            .parent1_id
                            .as_deref()
                            .map(|p| failed.contains(p))
                            .unwrap_or(false)
                            || sibling
                                .parent2_id
                                .as_deref()
                                .map(|p| failed.contains(p))
                                .unwrap_or(false);
                        if parent_failed {
                            failed.insert(sibling_id.clone());
                            grew = true;
                        }
                    }
                    if !grew {
                        break;
                    }
                }

                for failed_id in &failed {
                    if failed_id == &task_id {
                        continue;
                    }
                    let Some(mut victim) = SledStore::get_task(tx, failed_id)? else {
                        continue;
                    };
                    victim.status = Status::Failed;
                    victim.updated_at_ms = now;
                    SledStore::put_task(tx, &victim)?;
                    tx.remove(task_queue_pending_key(failed_id))
                        .map_err(storage_err)?;
                }
            }

            let mut expr = SledStore::get_expression(tx, &expr_id)?
                .ok_or_else(|| abort(CalcError::expression_not_found(&expr_id)))?;
            SledStore::recompute_expression_status(tx, &mut expr, &sibling_ids, now)?;
            SledStore::put_expression(tx, &expr)?;

            Ok(())
        });

        unwrap_tx(outcome)
    }

    async fn list_expression_tasks(&self, expression_id: &str) -> CalcResult<Vec<Task>> {
        // Confirms existence, raising ExpressionNotFound for a bad ID.
        self.get_expression(expression_id).await?;

        let mut out = Vec::new();
        for entry in self.tree.scan_prefix(expr_tasks_prefix(expression_id)) {
            let (key, _) = entry?;
            let full = String::from_utf8_lossy(&key).to_string();
            let task_id = full.rsplit(':').next().unwrap_or_default().to_string();
            if let Some(bytes) = self.tree.get(task_key(&task_id))? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }

    async fn sweep_expired_leases(&self) -> CalcResult<usize> {
        let now = now_ms();
        let mut reclaimed = 0usize;

        let expired: Vec<String> = self
            .tree
            .scan_prefix("task:")
            .keys()
            .filter_map(|k| k.ok())
            .filter(|k| !k.starts_with(TASK_QUEUE_PENDING_PREFIX.as_bytes()))
            .filter_map(|k| {
                let bytes = self.tree.get(&k).ok().flatten()?;
                let task: Task = serde_json::from_slice(&bytes).ok()?;
                if task.status == Status::InProgress
                    && task.lease_expire_at_ms.map(|t| t < now).unwrap_or(false)
                {
                    Some(task.id)
                } else {
                    None
                }
            })
            .collect();

        for task_id in expired {
            let tree = self.tree.clone();
            let task_id = task_id.clone();
            let result = tree.transaction(move |tx| -> TxResult<bool> {
                let Some(mut task) = SledStore::get_task(tx, &task_id)? else {
                    return Ok(false);
                };
                if task.status != Status::InProgress
                    || !task.lease_expire_at_ms.map(|t| t < now).unwrap_or(false)
                {
                    return Ok(false);
                }
                task.status = Status::Pending;
                task.lease_expire_at_ms = None;
                task.updated_at_ms = now;
                SledStore::put_task(tx, &task)?;
                tx.insert(task_queue_pending_key(&task_id), b"1".as_ref())
                    .map_err(storage_err)?;
                Ok(true)
            });
            if unwrap_tx(result)? {
                reclaimed += 1;
            }
        }

        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::scheduler::schedule;

    fn open_temp() -> (SledStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path().to_str().unwrap()).unwrap();
        (store, dir)
    }

    fn default_timings() -> OperationTimings {
        OperationTimings::default()
    }

    #[tokio::test]
    async fn single_literal_is_immediately_completed() {
        let (store, _dir) = open_temp();
        let tokens = parse("7").unwrap();
        let tasks = schedule(&tokens).unwrap();
        let id = store
            .create_expression("7".to_string(), tasks, Some(7.0))
            .await
            .unwrap();
        let expr = store.get_expression(&id).await.unwrap();
        assert_eq!(expr.status, Status::Completed);
        assert_eq!(expr.result, Some(7.0));
    }

    #[tokio::test]
    async fn two_plus_two_times_two_resolves_to_six() {
        let (store, _dir) = open_temp();
        let tokens = parse("2 + 2 * 2").unwrap();
        let tasks = schedule(&tokens).unwrap();
        let id = store
            .create_expression("2 + 2 * 2".to_string(), tasks, None)
            .await
            .unwrap();

        loop {
            match store.lease_next_task(30_000, default_timings()).await {
                Ok(leased) => {
                    let value = leased.task.operation.apply(leased.task.arg1, leased.task.arg2);
                    store
                        .finish_task(&leased.task.id, true, value)
                        .await
                        .unwrap();
                }
                Err(CalcError::NoTasksAvailable) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        let expr = store.get_expression(&id).await.unwrap();
        assert_eq!(expr.status, Status::Completed);
        assert_eq!(expr.result, Some(6.0));
    }

    #[tokio::test]
    async fn division_by_zero_fails_the_expression() {
        let (store, _dir) = open_temp();
        let tokens = parse("10 / 0").unwrap();
        let tasks = schedule(&tokens).unwrap();
        let id = store
            .create_expression("10 / 0".to_string(), tasks, None)
            .await
            .unwrap();

        let leased = store.lease_next_task(30_000, default_timings()).await.unwrap();
        let value = leased.task.operation.apply(leased.task.arg1, leased.task.arg2);
        assert!(value.is_nan());
        store.finish_task(&leased.task.id, false, value).await.unwrap();

        let expr = store.get_expression(&id).await.unwrap();
        assert_eq!(expr.status, Status::Failed);
        assert!(expr.error.is_some());
    }

    #[tokio::test]
    async fn finish_task_is_idempotent() {
        let (store, _dir) = open_temp();
        let tokens = parse("7").unwrap();
        let tasks = schedule(&tokens).unwrap();
        // force a real task: use a two-token expression instead
        let tokens = parse("1 + 1").unwrap();
        let tasks = schedule(&tokens).unwrap();
        let _ = tasks;
        let _id = store
            .create_expression("7".to_string(), vec![], Some(7.0))
            .await
            .unwrap();
        let _ = tokens;

        let tokens2 = parse("1 + 1").unwrap();
        let tasks2 = schedule(&tokens2).unwrap();
        let id2 = store
            .create_expression("1 + 1".to_string(), tasks2, None)
            .await
            .unwrap();
        let leased = store.lease_next_task(30_000, default_timings()).await.unwrap();
        store.finish_task(&leased.task.id, true, 2.0).await.unwrap();
        // Replay should be a harmless no-op.
        store.finish_task(&leased.task.id, true, 2.0).await.unwrap();

        let expr = store.get_expression(&id2).await.unwrap();
        assert_eq!(expr.result, Some(2.0));
    }

    #[tokio::test]
    async fn lease_next_task_returns_no_tasks_available_when_empty() {
        let (store, _dir) = open_temp();
        let err = store
            .lease_next_task(30_000, default_timings())
            .await
            .unwrap_err();
        assert!(matches!(err, CalcError::NoTasksAvailable));
    }

    #[tokio::test]
    async fn sweep_reclaims_expired_leases() {
        let (store, _dir) = open_temp();
        let tokens = parse("1 + 1").unwrap();
        let tasks = schedule(&tokens).unwrap();
        store
            .create_expression("1 + 1".to_string(), tasks, None)
            .await
            .unwrap();

        // Lease with a TTL already in the past.
        let leased = store.lease_next_task(0, default_timings()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let reclaimed = store.sweep_expired_leases().await.unwrap();
        assert_eq!(reclaimed, 1);

        let relet = store.lease_next_task(30_000, default_timings()).await.unwrap();
        assert_eq!(relet.task.id, leased.task.id);
    }
}
