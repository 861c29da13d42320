/// Builds the gRPC client and server code for `cryptovote.proto` using
/// `tonic-prost-build`.
///
/// A file descriptor set is written next to the generated code so the server
/// can register it with `tonic-reflection`.
///
/// # Files and Paths
///
/// - Proto file: `proto/cryptovote.proto`
/// - Includes: `proto/`
///
/// # Output
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("cryptovote");
/// }
/// ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("cryptovote_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    println!("cargo:rerun-if-changed=proto/cryptovote.proto");

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/cryptovote.proto"], &["proto"])
        .unwrap();
}
