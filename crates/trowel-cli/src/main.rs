//! Binary entrypoint for the trowel CLI.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = trowel_cli::run().await;
    process::exit(exit_code);
}
