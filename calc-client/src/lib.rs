//! Typed gRPC client for the calculator orchestrator.

pub mod error;
pub mod grpc_client;

pub use error::{ClientError, ClientResult};
pub use grpc_client::GrpcClient;
