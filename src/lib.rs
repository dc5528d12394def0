//! Root crate has no library code — all functionality lives in the workspace
//! members (`calc-shared`, `calc-orchestration`, `calc-worker`, `calc-client`).
//! This crate exists to host end-to-end tests that exercise the whole stack
//! without introducing a circular dependency between the member crates.
