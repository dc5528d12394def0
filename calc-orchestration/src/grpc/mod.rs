//! Thin `tonic` adapter translating typed requests into calls against the
//! orchestrator's API traits, and typed [`calc_shared::errors::CalcError`]
//! values into gRPC status codes.

pub mod service;

pub use service::CalcServiceImpl;
