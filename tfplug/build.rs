fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "grpc")]
    {
        println!("cargo:rerun-if-changed=proto/tfplugin6.proto");
        tonic_build::configure()
            .build_client(false)
            .compile_protos(&["proto/tfplugin6.proto"], &["proto"])?;
    }
    Ok(())
}
