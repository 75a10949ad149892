//! Ferry demo binary.
//!
//! Set `RUST_LOG=debug` to follow every dispatched mutation.

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            std::process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    match local.block_on(&runtime, ferry_demo::run()) {
        Ok(summary) => println!(
            "{} transactions synced, {} todos in sync",
            summary.replayed,
            summary.local.len()
        ),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
