//! Generated gRPC types and service stubs for `calc.v1`.
//!
//! The actual code is produced by `tonic-prost-build` in `build.rs` from
//! `proto/calc/v1/calc.proto` and included verbatim here.

pub mod calc {
    pub mod v1 {
        include!(concat!(env!("OUT_DIR"), "/calc.v1.rs"));
    }
}

pub use calc::v1::*;
