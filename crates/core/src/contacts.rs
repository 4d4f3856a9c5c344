//! Read-only contact snapshot taken at session start.

use std::collections::HashMap;

use wxweb_protocol::{Contact, SelfIdentity};

/// Contacts keyed by user name, including the bot itself.
#[derive(Debug, Clone, Default)]
pub struct Contacts {
	by_user_name: HashMap<String, Contact>,
}

impl Contacts {
	pub fn new(me: &SelfIdentity, members: Vec<Contact>) -> Self {
		let mut by_user_name: HashMap<String, Contact> = members.into_iter().map(|c| (c.user_name.clone(), c)).collect();
		by_user_name.entry(me.user_name.clone()).or_insert_with(|| Contact::from(me));
		Self { by_user_name }
	}

	pub fn get(&self, user_name: &str) -> Option<&Contact> {
		self.by_user_name.get(user_name)
	}

	/// Display name for `user_name`, falling back to the id itself.
	pub fn display_name<'a>(&'a self, user_name: &'a str) -> &'a str {
		match self.get(user_name) {
			Some(contact) if !contact.display_name().is_empty() => contact.display_name(),
			_ => user_name,
		}
	}

	pub fn groups(&self) -> impl Iterator<Item = &Contact> {
		self.by_user_name.values().filter(|c| c.is_group())
	}

	pub fn len(&self) -> usize {
		self.by_user_name.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_user_name.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn contact(user_name: &str, nick_name: &str, remark_name: &str) -> Contact {
		Contact {
			user_name: user_name.into(),
			nick_name: nick_name.into(),
			remark_name: remark_name.into(),
		}
	}

	#[test]
	fn test_snapshot_includes_me() {
		let me = SelfIdentity {
			user_name: "@me".into(),
			nick_name: "bot".into(),
		};
		let contacts = Contacts::new(&me, vec![contact("@alice", "Alice", "Al"), contact("@@room", "Room", "")]);

		assert_eq!(contacts.len(), 3);
		assert_eq!(contacts.display_name("@me"), "bot");
		assert_eq!(contacts.display_name("@alice"), "Al");
		assert_eq!(contacts.display_name("@stranger"), "@stranger");
		assert_eq!(contacts.groups().count(), 1);
	}
}
