//! The poll-execute-report loop run by each worker slot.
//!
//! Workers share no state: every slot independently calls `GetTask`, sleeps
//! for the advertised `operationTime`, computes the result (division by
//! zero yields `NaN`), and calls `SubmitTaskResult`, retrying on transport
//! failure with the same backoff policy used while polling.

use calc_client::{ClientError, GrpcClient};
use calc_shared::domain::Operation;
use calc_shared::proto::calc::v1::Operation as ProtoOperation;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;

fn operation_from_proto(op: i32) -> Operation {
    match ProtoOperation::try_from(op).unwrap_or(ProtoOperation::Add) {
        ProtoOperation::Add | ProtoOperation::Unspecified => Operation::Add,
        ProtoOperation::Subtract => Operation::Subtract,
        ProtoOperation::Multiply => Operation::Multiply,
        ProtoOperation::Divide => Operation::Divide,
    }
}

/// Runs one worker slot until `cancel` fires.
pub async fn run(worker_id: usize, client: GrpcClient, cancel: CancellationToken) {
    let mut poll_backoff = Backoff::new();

    loop {
        if cancel.is_cancelled() {
            tracing::info!(worker_id, "worker shutting down");
            return;
        }

        match client.get_task().await {
            Ok(response) => {
                poll_backoff.reset();
                let Some(task) = response.task else {
                    tracing::warn!(worker_id, "GetTask returned no task body");
                    continue;
                };

                let operation = operation_from_proto(task.operation);
                let sleep_ms = task.operation_time_ms.unwrap_or(0).max(0) as u64;
                tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)).await;

                let result = operation.apply(task.arg1, task.arg2);
                tracing::debug!(
                    worker_id,
                    task_id = %task.id,
                    op = %operation.symbol(),
                    result,
                    "computed task result"
                );

                report_with_retry(&client, &task.id, result, &cancel).await;
            }
            Err(ClientError::NoTasksAvailable) => {
                tokio::time::sleep(poll_backoff.next_delay()).await;
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(worker_id, error = %e, "transient error polling for task");
                tokio::time::sleep(poll_backoff.next_delay()).await;
            }
            Err(e) => {
                tracing::error!(worker_id, error = %e, "unrecoverable error polling for task");
                tokio::time::sleep(poll_backoff.next_delay()).await;
            }
        }
    }
}

async fn report_with_retry(client: &GrpcClient, task_id: &str, result: f64, cancel: &CancellationToken) {
    let mut backoff = Backoff::new();
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match client.submit_task_result(task_id, result).await {
            Ok(()) => return,
            Err(e) => {
                tracing::warn!(task_id, error = %e, "failed to submit task result, retrying");
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }
    }
}
