//! `wxbot login`: QR handshake, then serve until the session ends.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use wxweb::{CancellationToken, HandlerContext, LoopExit, MsgType, ParsedMessage, Session, WebBackend};

use crate::config::BotConfig;

pub async fn run(config: BotConfig, echo: bool) -> Result<()> {
	let backend = Arc::new(WebBackend::new().context("building HTTP client")?);

	let pending = Session::login(backend, config.session, config.runtime)
		.await
		.context("requesting QR code")?;
	println!("Scan to log in: {}", pending.qr_url());

	let session = pending.confirm().await.context("logging in")?;
	println!(
		"Logged in as {} ({} contacts)",
		session.me().nick_name,
		session.contacts().len()
	);

	install_handlers(&session, echo);

	let shutdown = CancellationToken::new();
	tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

	match session.serve(shutdown).await.context("session ended")? {
		LoopExit::LoggedOut => println!("Logged out"),
		LoopExit::Stopped => println!("Stopped"),
	}
	Ok(())
}

/// Logs every message; with `echo`, also replies to plain text.
pub fn install_handlers(session: &Session, echo: bool) {
	for msg_type in MsgType::KNOWN {
		session.register(msg_type, log_message);
	}
	if echo {
		session.register(MsgType::TEXT, echo_text);
	}
}

async fn log_message(ctx: HandlerContext, message: Arc<ParsedMessage>) -> wxweb::Result<()> {
	let contacts = ctx.session.contacts();
	info!(
		msg_type = %message.msg_type,
		from = contacts.display_name(&message.from_user),
		speaker = contacts.display_name(&message.speaker),
		group = message.is_group,
		content = %message.content,
		"Message"
	);
	Ok(())
}

async fn echo_text(ctx: HandlerContext, message: Arc<ParsedMessage>) -> wxweb::Result<()> {
	let me = &ctx.session.me().user_name;
	if message.speaker == *me || message.content.is_empty() {
		return Ok(());
	}
	ctx.session.send_text(&message.content, message.reply_to(me)).await?;
	Ok(())
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
	if tokio::signal::ctrl_c().await.is_ok() {
		info!("Interrupted, shutting down");
		shutdown.cancel();
	}
}

