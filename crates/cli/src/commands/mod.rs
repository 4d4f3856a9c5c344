pub mod login;

use anyhow::Result;

use crate::cli::{Cli, Commands};
use crate::config::BotConfig;

pub async fn dispatch(cli: Cli) -> Result<()> {
	match cli.command {
		Commands::Login(args) => {
			let mut config = BotConfig::load(cli.config.as_deref())?;
			config.apply(&args);
			login::run(config, args.echo).await
		}
	}
}
