use clap::Parser;
use wxweb_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	commands::dispatch(cli).await
}
