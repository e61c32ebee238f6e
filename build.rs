fn main() {
    // The logger capability speaks `logs.Logger/WriteLog`. Messages are plain
    // prost structs in `src/capability/grpc.rs`, so no `.proto` file is needed.
    let service = tonic_build::manual::Service::builder()
        .name("Logger")
        .package("logs")
        .method(
            tonic_build::manual::Method::builder()
                .name("write_log")
                .route_name("WriteLog")
                .input_type("crate::capability::grpc::LogRequest")
                .output_type("crate::capability::grpc::LogResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
