use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    ideaswipe_lib::run().await
}
