use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directive for a `-v` count.
pub fn filter_for(verbosity: u8) -> &'static str {
	// 0 = warnings only
	// 1 (-v) = info, with the long-poll chatter kept at warn
	// 2+ (-vv) = debug for everything
	match verbosity {
		0 => "warn",
		1 => "info,wxweb_runtime::sync_loop=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
