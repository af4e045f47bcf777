//! # AutoGest CLI Entry Point
//!
//! The binary only starts the runtime; everything else lives in the
//! library so commands can be tested without a process.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autogest_cli::run().await
}
