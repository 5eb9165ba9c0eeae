//! Batch image generation CLI
//!
//! Command-line interface for generating images from a prompts CSV with the
//! batch-imagegen library.

#[cfg(feature = "cli")]
use batch_imagegen::cli;

#[cfg(feature = "cli")]
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
