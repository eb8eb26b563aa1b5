fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=remotejobs.proto");
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["remotejobs.proto"], &["."])?;
    Ok(())
}
