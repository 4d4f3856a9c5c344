//! Normalizes a raw message into what handlers see.

use wxweb_protocol::{GROUP_MARKER, MsgType, RawMessage};

/// Separates the speaker id from the text in group messages.
pub const SPEAKER_DELIMITER: &str = ":<br/>";

/// Four-per-em space the client inserts after an `@name` mention.
pub const MENTION_SEPARATOR: char = '\u{2005}';

/// A message ready for handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
	pub msg_id: String,
	pub msg_type: MsgType,
	pub from_user: String,
	pub to_user: String,
	/// Content exactly as delivered.
	pub origin_content: String,
	pub is_group: bool,
	/// Who actually spoke. Differs from `from_user` in group conversations.
	pub speaker: String,
	/// Content with speaker and mention prefixes stripped.
	pub content: String,
	/// Leading `@name` plus separator, when the text starts with a single mention.
	pub mention: Option<String>,
}

impl ParsedMessage {
	/// Conversation a reply should go to.
	pub fn reply_to<'a>(&'a self, me: &str) -> &'a str {
		if self.from_user == me { &self.to_user } else { &self.from_user }
	}
}

/// Derives the group flag, effective speaker, display content, and mention.
///
/// `me` is the bot's own user name; it is the speaker of group messages that
/// carry no speaker prefix.
pub fn analyze(raw: RawMessage, me: &str) -> ParsedMessage {
	let is_group = raw.from_user.contains(GROUP_MARKER) || raw.to_user.contains(GROUP_MARKER);

	let (speaker, content) = if is_group {
		match raw.content.split_once(SPEAKER_DELIMITER) {
			Some((speaker, rest)) => (speaker.to_string(), rest.to_string()),
			None => (me.to_string(), raw.content.clone()),
		}
	} else {
		(raw.from_user.clone(), raw.content.clone())
	};

	let (mention, content) = match split_mention(raw.msg_type, &content) {
		Some((mention, rest)) => (Some(mention), rest),
		None => (None, content),
	};

	ParsedMessage {
		msg_id: raw.msg_id,
		msg_type: raw.msg_type,
		from_user: raw.from_user,
		to_user: raw.to_user,
		origin_content: raw.content,
		is_group,
		speaker,
		content,
		mention,
	}
}

fn split_mention(msg_type: MsgType, content: &str) -> Option<(String, String)> {
	if msg_type != MsgType::TEXT || content.len() <= 1 || !content.starts_with('@') {
		return None;
	}
	let parts: Vec<&str> = content.split(MENTION_SEPARATOR).collect();
	match parts.as_slice() {
		[target, rest] => Some((format!("{target}{MENTION_SEPARATOR}"), rest.to_string())),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ME: &str = "@bot";

	fn raw(from: &str, to: &str, content: &str, msg_type: MsgType) -> RawMessage {
		RawMessage {
			msg_id: "1".into(),
			content: content.into(),
			from_user: from.into(),
			to_user: to.into(),
			msg_type,
		}
	}

	#[test]
	fn test_direct_message() {
		let msg = analyze(raw("@alice", ME, "hello", MsgType::TEXT), ME);
		assert!(!msg.is_group);
		assert_eq!(msg.speaker, "@alice");
		assert_eq!(msg.content, "hello");
		assert_eq!(msg.mention, None);
		assert_eq!(msg.reply_to(ME), "@alice");
	}

	#[test]
	fn test_group_with_speaker_prefix() {
		let msg = analyze(raw("abc@@def", ME, "speakerX:<br/>hello", MsgType::TEXT), ME);
		assert!(msg.is_group);
		assert_eq!(msg.speaker, "speakerX");
		assert_eq!(msg.content, "hello");
		assert_eq!(msg.origin_content, "speakerX:<br/>hello");
	}

	#[test]
	fn test_group_without_speaker_prefix() {
		let msg = analyze(raw("abc@@def", ME, "no prefix here", MsgType::TEXT), ME);
		assert!(msg.is_group);
		assert_eq!(msg.speaker, ME);
		assert_eq!(msg.content, "no prefix here");
	}

	#[test]
	fn test_group_detected_from_destination() {
		let msg = analyze(raw(ME, "@@room", "sent by me", MsgType::TEXT), ME);
		assert!(msg.is_group);
		assert_eq!(msg.speaker, ME);
		assert_eq!(msg.reply_to(ME), "@@room");
	}

	#[test]
	fn test_group_keeps_everything_after_first_delimiter() {
		let msg = analyze(raw("@@room", ME, "s1:<br/>a:<br/>b", MsgType::TEXT), ME);
		assert_eq!(msg.speaker, "s1");
		assert_eq!(msg.content, "a:<br/>b");
	}

	#[test]
	fn test_mention_extraction() {
		let msg = analyze(raw("@alice", ME, "@alice\u{2005}do the thing", MsgType::TEXT), ME);
		assert_eq!(msg.mention.as_deref(), Some("@alice\u{2005}"));
		assert_eq!(msg.content, "do the thing");
	}

	#[test]
	fn test_mention_inside_group() {
		let msg = analyze(raw("@@room", ME, "s1:<br/>@bot\u{2005}ping", MsgType::TEXT), ME);
		assert_eq!(msg.speaker, "s1");
		assert_eq!(msg.mention.as_deref(), Some("@bot\u{2005}"));
		assert_eq!(msg.content, "ping");
	}

	#[test]
	fn test_mention_left_alone_when_ambiguous() {
		let none = analyze(raw("@alice", ME, "@alice do the thing", MsgType::TEXT), ME);
		assert_eq!(none.mention, None);
		assert_eq!(none.content, "@alice do the thing");

		let many = analyze(raw("@alice", ME, "@a\u{2005}@b\u{2005}hi", MsgType::TEXT), ME);
		assert_eq!(many.mention, None);
		assert_eq!(many.content, "@a\u{2005}@b\u{2005}hi");

		let short = analyze(raw("@alice", ME, "@", MsgType::TEXT), ME);
		assert_eq!(short.mention, None);
	}

	#[test]
	fn test_mention_only_for_text() {
		let msg = analyze(raw("@alice", ME, "@alice\u{2005}caption", MsgType::IMAGE), ME);
		assert_eq!(msg.mention, None);
		assert_eq!(msg.content, "@alice\u{2005}caption");
	}
}
