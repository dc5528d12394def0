//! Thin wrapper around the generated `CalculatorServiceClient`, used by both
//! the worker loop and any other process that needs to talk to the
//! orchestrator over gRPC.

use calc_shared::proto::calc::v1::calculator_service_client::CalculatorServiceClient;
use calc_shared::proto::calc::v1::{
    CalculateRequest, CalculateResponse, GetExpressionRequest, GetExpressionResponse,
    GetTaskRequest, GetTaskResponse, ListExpressionTasksRequest, ListExpressionTasksResponse,
    ListExpressionsRequest, ListExpressionsResponse, SubmitTaskResultRequest,
};
use tonic::transport::Channel;

use crate::error::{ClientError, ClientResult};

/// A connected client for the calculator orchestrator's gRPC surface.
#[derive(Debug, Clone)]
pub struct GrpcClient {
    inner: CalculatorServiceClient<Channel>,
}

impl GrpcClient {
    /// Connects to `addr` (e.g. `http://127.0.0.1:50051`).
    pub async fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let channel = Channel::from_shared(addr.into())
            .map_err(|e| ClientError::config(e.to_string()))?
            .connect()
            .await?;
        Ok(Self {
            inner: CalculatorServiceClient::new(channel),
        })
    }

    pub async fn calculate(&self, text: impl Into<String>) -> ClientResult<CalculateResponse> {
        let response = self
            .inner
            .clone()
            .calculate(CalculateRequest { text: text.into() })
            .await?;
        Ok(response.into_inner())
    }

    pub async fn list_expressions(&self) -> ClientResult<ListExpressionsResponse> {
        let response = self
            .inner
            .clone()
            .list_expressions(ListExpressionsRequest {})
            .await?;
        Ok(response.into_inner())
    }

    pub async fn get_expression(
        &self,
        expression_id: impl Into<String>,
    ) -> ClientResult<GetExpressionResponse> {
        let response = self
            .inner
            .clone()
            .get_expression(GetExpressionRequest {
                expression_id: expression_id.into(),
            })
            .await?;
        Ok(response.into_inner())
    }

    /// Leases the next ready task. A `NotFound` status with a "no tasks"
    /// message is translated to [`ClientError::NoTasksAvailable`] so the
    /// worker loop can distinguish it from a real failure.
    pub async fn get_task(&self) -> ClientResult<GetTaskResponse> {
        let response = self.inner.clone().get_task(GetTaskRequest {}).await?;
        Ok(response.into_inner())
    }

    pub async fn submit_task_result(
        &self,
        task_id: impl Into<String>,
        result: f64,
    ) -> ClientResult<()> {
        self.inner
            .clone()
            .submit_task_result(SubmitTaskResultRequest {
                task_id: task_id.into(),
                result,
            })
            .await?;
        Ok(())
    }

    pub async fn list_expression_tasks(
        &self,
        expression_id: impl Into<String>,
    ) -> ClientResult<ListExpressionTasksResponse> {
        let response = self
            .inner
            .clone()
            .list_expression_tasks(ListExpressionTasksRequest {
                expression_id: expression_id.into(),
            })
            .await?;
        Ok(response.into_inner())
    }
}
