use clap::Parser;
use tracing::error;
use vv_cli::{cli::Cli, logging, scenario};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = scenario::run(&cli).await {
        error!(target = "vv", error = %err, "verification run failed");
        std::process::exit(1);
    }
}
