use allotment::api::Cli;
use allotment::logging::init_logging;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli.run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
