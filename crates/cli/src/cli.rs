use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "wxbot")]
#[command(about = "Bot client for the web messaging protocol")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON config file (defaults to $XDG_CONFIG_HOME/wxbot/config.json)
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Log in with a QR code and serve until the session ends
	Login(LoginArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct LoginArgs {
	/// Reply to every plain-text message with the same text
	#[arg(long)]
	pub echo: bool,

	/// Client language sent with every request
	#[arg(long, value_name = "LANG")]
	pub lang: Option<String>,

	/// Upper bound on concurrently running handlers
	#[arg(long, value_name = "N")]
	pub max_concurrent_handlers: Option<usize>,

	/// Seconds shutdown waits for running handlers
	#[arg(long, value_name = "SECS")]
	pub grace: Option<u64>,
}
