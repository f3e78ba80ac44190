use clap::Parser;
use meshbridge_cli::{Cli, exit_code};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e}");
        std::process::exit(exit_code(&e));
    }
}
