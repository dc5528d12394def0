//! The orchestrator's three role-facing contracts (§4.4), implemented
//! directly against [`Store`] and independent of any transport. The gRPC
//! service (`grpc::CalcService`) is a thin adapter over these traits.

use std::sync::Arc;

use calc_shared::config::OperationTimings;
use calc_shared::domain::{Expression, Task};
use calc_shared::errors::CalcResult;

use crate::parser::parse;
use crate::scheduler::{literal_value, schedule};
use crate::store::{LeasedTask, Store};

/// Client-facing operations: submit, list, get.
#[async_trait::async_trait]
pub trait ClientApi: Send + Sync {
    async fn calculate(&self, text: &str) -> CalcResult<String>;
    async fn list_expressions(&self) -> CalcResult<Vec<Expression>>;
    async fn get_expression(&self, id: &str) -> CalcResult<Expression>;
}

/// Worker-facing operations: lease a task, submit its result.
#[async_trait::async_trait]
pub trait WorkerApi: Send + Sync {
    async fn get_task(&self) -> CalcResult<LeasedTask>;
    async fn submit_task_result(&self, task_id: &str, result: f64) -> CalcResult<()>;
}

/// Introspection: the full task graph of one expression, for UI/debugging.
#[async_trait::async_trait]
pub trait IntrospectionApi: Send + Sync {
    async fn list_expression_tasks(&self, expression_id: &str) -> CalcResult<Vec<Task>>;
}

/// The concrete orchestrator core: parses and schedules on `Calculate`,
/// otherwise delegates straight to the store.
pub struct Orchestrator<S: Store> {
    store: Arc<S>,
    lease_ttl_ms: u64,
    timings: OperationTimings,
}

impl<S: Store> Clone for Orchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lease_ttl_ms: self.lease_ttl_ms,
            timings: self.timings,
        }
    }
}

impl<S: Store> Orchestrator<S> {
    pub fn new(store: Arc<S>, lease_ttl_ms: u64, timings: OperationTimings) -> Self {
        Self {
            store,
            lease_ttl_ms,
            timings,
        }
    }
}

#[async_trait::async_trait]
impl<S: Store> ClientApi for Orchestrator<S> {
    async fn calculate(&self, text: &str) -> CalcResult<String> {
        let tokens = parse(text)?;
        if let Some(value) = literal_value(&tokens) {
            return self
                .store
                .create_expression(text.to_string(), Vec::new(), Some(value))
                .await;
        }
        let tasks = schedule(&tokens)?;
        self.store
            .create_expression(text.to_string(), tasks, None)
            .await
    }

    async fn list_expressions(&self) -> CalcResult<Vec<Expression>> {
        self.store.list_expressions().await
    }

    async fn get_expression(&self, id: &str) -> CalcResult<Expression> {
        self.store.get_expression(id).await
    }
}

#[async_trait::async_trait]
impl<S: Store> WorkerApi for Orchestrator<S> {
    async fn get_task(&self) -> CalcResult<LeasedTask> {
        self.store
            .lease_next_task(self.lease_ttl_ms, self.timings)
            .await
    }

    async fn submit_task_result(&self, task_id: &str, result: f64) -> CalcResult<()> {
        let completed = !result.is_nan();
        self.store.finish_task(task_id, completed, result).await
    }
}

#[async_trait::async_trait]
impl<S: Store> IntrospectionApi for Orchestrator<S> {
    async fn list_expression_tasks(&self, expression_id: &str) -> CalcResult<Vec<Task>> {
        self.store.list_expression_tasks(expression_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SledStore;

    async fn orchestrator() -> (Orchestrator<SledStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::open(dir.path().to_str().unwrap()).unwrap());
        (
            Orchestrator::new(store, 30_000, OperationTimings::default()),
            dir,
        )
    }

    #[tokio::test]
    async fn calculate_rejects_invalid_expression_without_persisting() {
        let (orch, _dir) = orchestrator().await;
        let err = orch.calculate("2 +").await.unwrap_err();
        assert!(matches!(err, calc_shared::errors::CalcError::InvalidExpression(_)));
        assert!(orch.list_expressions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn calculate_degenerate_literal_completes_immediately() {
        let (orch, _dir) = orchestrator().await;
        let id = orch.calculate("7").await.unwrap();
        let expr = orch.get_expression(&id).await.unwrap();
        assert_eq!(expr.result, Some(7.0));
    }

    #[tokio::test]
    async fn get_task_and_submit_result_round_trip() {
        let (orch, _dir) = orchestrator().await;
        let id = orch.calculate("3 + 4").await.unwrap();
        let leased = orch.get_task().await.unwrap();
        assert_eq!(leased.task.expression_id, id);
        orch.submit_task_result(&leased.task.id, 7.0).await.unwrap();
        let expr = orch.get_expression(&id).await.unwrap();
        assert_eq!(expr.result, Some(7.0));
    }

    #[tokio::test]
    async fn list_expression_tasks_exposes_the_full_graph() {
        let (orch, _dir) = orchestrator().await;
        let id = orch.calculate("2 + 2 * 2").await.unwrap();
        let tasks = orch.list_expression_tasks(&id).await.unwrap();
        assert_eq!(tasks.len(), 2);
    }
}
