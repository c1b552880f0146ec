// mwatch entry point

use clap::Parser;
use mwatch_cli::{session, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = session::run(cli).await {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
