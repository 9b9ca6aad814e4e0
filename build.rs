use std::error::Error;
use std::path::PathBuf;

const PROTOS: &[&str] = &[
    "proto/laptop_message.proto",
    "proto/auth_service.proto",
    "proto/laptop_service.proto",
];

fn main() -> Result<(), Box<dyn Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    // SAFETY: build scripts run single-threaded.
    unsafe { std::env::set_var("PROTOC", protoc) };

    // Well-known types (google/protobuf/timestamp.proto) ship with the bundled protoc.
    let includes = [PathBuf::from("proto"), protoc_bin_vendored::include_path()?];

    for proto in PROTOS {
        println!("cargo:rerun-if-changed={proto}");
    }
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(PROTOS, &includes)?;
    Ok(())
}
