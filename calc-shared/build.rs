//! Build script for calc-shared.
//!
//! Compiles the calculator service Protocol Buffer definitions for gRPC.
//! Generated code is output to `$OUT_DIR/calc.v1.rs` and included via the
//! `include!` macro in `src/proto/mod.rs`.
//!
//! Requires the `protoc` compiler to be installed on the system.

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let local_proto = manifest_dir.join("proto");
    let workspace_proto = manifest_dir
        .parent()
        .map(|p| p.join("proto"))
        .unwrap_or_default();

    let proto_root = if local_proto.join("calc/v1").exists() {
        local_proto
    } else if workspace_proto.join("calc/v1").exists() {
        workspace_proto
    } else {
        panic!(
            "Proto directory not found. Checked {:?} and {:?}. Expected proto files at proto/calc/v1/",
            local_proto, workspace_proto
        );
    };

    let proto_files = ["calc/v1/calc.proto"];

    let proto_paths: Vec<PathBuf> = proto_files
        .iter()
        .map(|f| {
            let path = proto_root.join(f);
            if !path.exists() {
                panic!("Proto file not found: {:?}", path);
            }
            path
        })
        .collect();

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .build_transport(true)
        .file_descriptor_set_path(
            PathBuf::from(std::env::var("OUT_DIR")?).join("calc_descriptor.bin"),
        )
        .emit_rerun_if_changed(true)
        .compile_protos(&proto_paths, std::slice::from_ref(&proto_root))?;

    println!("cargo:rerun-if-changed={}", proto_root.display());
    for proto in &proto_files {
        println!(
            "cargo:rerun-if-changed={}",
            proto_root.join(proto).display()
        );
    }

    Ok(())
}
