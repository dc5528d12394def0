//! `CalculatorService` gRPC implementation.

use std::sync::Arc;

use calc_shared::domain::{self, Operation};
use calc_shared::errors::{calc_error_to_status, CalcError};
use calc_shared::proto::calc::v1::{
    calculator_service_server::CalculatorService, CalculateRequest, CalculateResponse,
    Expression as ProtoExpression, ExpressionStatus, GetExpressionRequest, GetExpressionResponse,
    GetTaskRequest, GetTaskResponse, ListExpressionTasksRequest, ListExpressionTasksResponse,
    ListExpressionsRequest, ListExpressionsResponse, Operation as ProtoOperation, SubmitTaskResultRequest,
    SubmitTaskResultResponse, Task as ProtoTask, TaskStatus,
};
use tonic::{Request, Response, Status};

use crate::api::{ClientApi, IntrospectionApi, WorkerApi};
use crate::store::Store;

/// Implements the six RPCs of `CalculatorService` directly over the
/// [`ClientApi`]/[`WorkerApi`]/[`IntrospectionApi`] traits — no
/// service-specific logic lives here beyond request/response translation.
pub struct CalcServiceImpl<S: Store> {
    orchestrator: Arc<crate::api::Orchestrator<S>>,
}

impl<S: Store> CalcServiceImpl<S> {
    pub fn new(orchestrator: Arc<crate::api::Orchestrator<S>>) -> Self {
        Self { orchestrator }
    }
}

fn status_to_proto(status: domain::Status) -> i32 {
    let mapped = match status {
        domain::Status::Pending => ExpressionStatus::Pending,
        domain::Status::InProgress => ExpressionStatus::InProgress,
        domain::Status::Completed => ExpressionStatus::Completed,
        domain::Status::Failed => ExpressionStatus::Failed,
    };
    mapped as i32
}

fn task_status_to_proto(status: domain::Status) -> i32 {
    let mapped = match status {
        domain::Status::Pending => TaskStatus::Pending,
        domain::Status::InProgress => TaskStatus::InProgress,
        domain::Status::Completed => TaskStatus::Completed,
        domain::Status::Failed => TaskStatus::Failed,
    };
    mapped as i32
}

fn operation_to_proto(op: Operation) -> i32 {
    let mapped = match op {
        Operation::Add => ProtoOperation::Add,
        Operation::Subtract => ProtoOperation::Subtract,
        Operation::Multiply => ProtoOperation::Multiply,
        Operation::Divide => ProtoOperation::Divide,
    };
    mapped as i32
}

fn expression_to_proto(expr: domain::Expression) -> ProtoExpression {
    ProtoExpression {
        id: expr.id,
        text: expr.text,
        status: status_to_proto(expr.status),
        result: expr.result,
        error: expr.error,
        created_at_ms: expr.created_at_ms,
        updated_at_ms: expr.updated_at_ms,
    }
}

fn task_to_proto(task: domain::Task, operation_time_ms: Option<i64>) -> ProtoTask {
    ProtoTask {
        id: task.id,
        expression_id: task.expression_id,
        parent1_id: task.parent1_id,
        parent2_id: task.parent2_id,
        arg1: task.arg1,
        arg2: task.arg2,
        operation: operation_to_proto(task.operation),
        status: task_status_to_proto(task.status),
        result: task.result,
        lease_expire_at_ms: task.lease_expire_at_ms,
        created_at_ms: task.created_at_ms,
        updated_at_ms: task.updated_at_ms,
        operation_time_ms,
    }
}

fn to_status(error: CalcError) -> Status {
    calc_error_to_status(&error)
}

#[tonic::async_trait]
impl<S: Store + 'static> CalculatorService for CalcServiceImpl<S> {
    async fn calculate(
        &self,
        request: Request<CalculateRequest>,
    ) -> Result<Response<CalculateResponse>, Status> {
        let text = request.into_inner().text;
        let expression_id = self.orchestrator.calculate(&text).await.map_err(to_status)?;
        Ok(Response::new(CalculateResponse { expression_id }))
    }

    async fn list_expressions(
        &self,
        _request: Request<ListExpressionsRequest>,
    ) -> Result<Response<ListExpressionsResponse>, Status> {
        let expressions = self
            .orchestrator
            .list_expressions()
            .await
            .map_err(to_status)?
            .into_iter()
            .map(expression_to_proto)
            .collect();
        Ok(Response::new(ListExpressionsResponse { expressions }))
    }

    async fn get_expression(
        &self,
        request: Request<GetExpressionRequest>,
    ) -> Result<Response<GetExpressionResponse>, Status> {
        let id = request.into_inner().expression_id;
        let expression = self
            .orchestrator
            .get_expression(&id)
            .await
            .map_err(to_status)?;
        Ok(Response::new(GetExpressionResponse {
            expression: Some(expression_to_proto(expression)),
        }))
    }

    async fn get_task(
        &self,
        _request: Request<GetTaskRequest>,
    ) -> Result<Response<GetTaskResponse>, Status> {
        let leased = self.orchestrator.get_task().await.map_err(to_status)?;
        Ok(Response::new(GetTaskResponse {
            task: Some(task_to_proto(
                leased.task,
                Some(leased.operation_time_ms as i64),
            )),
        }))
    }

    async fn submit_task_result(
        &self,
        request: Request<SubmitTaskResultRequest>,
    ) -> Result<Response<SubmitTaskResultResponse>, Status> {
        let req = request.into_inner();
        self.orchestrator
            .submit_task_result(&req.task_id, req.result)
            .await
            .map_err(to_status)?;
        Ok(Response::new(SubmitTaskResultResponse {}))
    }

    async fn list_expression_tasks(
        &self,
        request: Request<ListExpressionTasksRequest>,
    ) -> Result<Response<ListExpressionTasksResponse>, Status> {
        let id = request.into_inner().expression_id;
        let tasks = self
            .orchestrator
            .list_expression_tasks(&id)
            .await
            .map_err(to_status)?
            .into_iter()
            .map(|t| task_to_proto(t, None))
            .collect();
        Ok(Response::new(ListExpressionTasksResponse { tasks }))
    }
}
