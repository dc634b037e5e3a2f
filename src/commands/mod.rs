pub mod counts;
pub mod ingest;
pub mod init;
pub mod run;
pub mod view;
pub mod worker;

use crate::error::Error;

/// Build a Tokio runtime for a synchronous command, exiting on failure
fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    }
}

fn exit_with(context: &str, e: Error) -> ! {
    eprintln!("❌ {}: {}", context, e);
    std::process::exit(1);
}
