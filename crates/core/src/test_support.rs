//! In-memory backend and fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wxweb_protocol::{Cookie, LoginTicket, MsgType, SelfIdentity, SyncCheck, SyncKey, SyncKeyList};
use wxweb_runtime::{
	AuthContext, Credentials, Error, LoginApi, Result, RuntimeOptions, SessionApi, SessionConfig, Shard, SyncApi,
};

use crate::analyze::ParsedMessage;
use crate::contacts::Contacts;
use crate::handlers::HandlerContext;
use crate::session::Session;

pub const ME: &str = "@bot";

const REDIRECT: &str = "https://wx2.qq.com/cgi-bin/mmwebwx-bin/webwxnewloginpage?ticket=t&uuid=qr-token&lang=zh_CN&scan=1";

/// Scripted backend: canned session responses, queued sync checks and batches.
pub struct ScriptedBackend {
	pub status_ret: i64,
	pub send_ret: i64,
	pub checks: Mutex<VecDeque<SyncCheck>>,
	pub batches: Mutex<VecDeque<Vec<u8>>>,
	/// Answer once `checks` is exhausted.
	pub fallback: SyncCheck,
	pub calls: Mutex<Vec<String>>,
	/// First cursor value passed to each fetch.
	pub fetched_with: Mutex<Vec<i64>>,
	/// `(file_name, size)` per upload.
	pub uploads: Mutex<Vec<(String, usize)>>,
	/// `(kind, to, content or media id)` per send.
	pub sent: Mutex<Vec<(String, String, String)>>,
}

impl Default for ScriptedBackend {
	fn default() -> Self {
		Self {
			status_ret: 0,
			send_ret: 0,
			checks: Mutex::new(VecDeque::new()),
			batches: Mutex::new(VecDeque::new()),
			fallback: SyncCheck { retcode: 1101, selector: 0 },
			calls: Mutex::new(Vec::new()),
			fetched_with: Mutex::new(Vec::new()),
			uploads: Mutex::new(Vec::new()),
			sent: Mutex::new(Vec::new()),
		}
	}
}

impl ScriptedBackend {
	pub fn with_sync(checks: Vec<SyncCheck>, batches: Vec<Vec<u8>>, fallback: SyncCheck) -> Self {
		Self {
			checks: Mutex::new(checks.into()),
			batches: Mutex::new(batches.into()),
			fallback,
			..Self::default()
		}
	}

	fn record(&self, call: &str) {
		self.calls.lock().push(call.to_string());
	}

	fn send_body(&self) -> Vec<u8> {
		json!({
			"BaseResponse": {"Ret": self.send_ret, "ErrMsg": if self.send_ret == 0 { "" } else { "rejected" }},
			"MsgID": "server-1",
			"LocalID": "local-1",
		})
		.to_string()
		.into_bytes()
	}
}

#[async_trait]
impl LoginApi for ScriptedBackend {
	async fn request_qr_token(&self, _config: &SessionConfig) -> Result<String> {
		self.record("jslogin");
		Ok("qr-token".to_string())
	}

	async fn poll_login(&self, _config: &SessionConfig, _qr_token: &str, _tip: bool) -> Result<String> {
		self.record("login");
		Ok(format!("window.code=200;\nwindow.redirect_uri=\"{REDIRECT}\";"))
	}

	async fn open_login_page(&self, config: &SessionConfig) -> Result<Credentials> {
		self.record("webwxnewloginpage");
		config.shard()?;
		Ok(credentials())
	}
}

#[async_trait]
impl SyncApi for ScriptedBackend {
	async fn sync_check(&self, _auth: AuthContext<'_>, _sync_host: &str, _sync_key: &SyncKeyList) -> Result<SyncCheck> {
		let next = self.checks.lock().pop_front();
		match next {
			Some(check) => Ok(check),
			None => {
				tokio::time::sleep(Duration::from_millis(1)).await;
				Ok(self.fallback)
			}
		}
	}

	async fn fetch_batch(&self, _auth: AuthContext<'_>, sync_key: &SyncKeyList) -> Result<Vec<u8>> {
		self.fetched_with.lock().push(sync_key.list.first().map_or(-1, |k| k.val));
		self.batches
			.lock()
			.pop_front()
			.ok_or_else(|| Error::Transport("no scripted batch".into()))
	}
}

#[async_trait]
impl SessionApi for ScriptedBackend {
	async fn init(&self, _auth: AuthContext<'_>) -> Result<Vec<u8>> {
		self.record("webwxinit");
		Ok(json!({
			"BaseResponse": {"Ret": 0, "ErrMsg": ""},
			"User": {"UserName": ME, "NickName": "bot"},
			"SyncKey": cursor(0),
		})
		.to_string()
		.into_bytes())
	}

	async fn status_notify(&self, _auth: AuthContext<'_>, me: &SelfIdentity) -> Result<i64> {
		self.record("webwxstatusnotify");
		assert_eq!(me.user_name, ME);
		Ok(self.status_ret)
	}

	async fn fetch_contacts(&self, _auth: AuthContext<'_>) -> Result<Vec<u8>> {
		self.record("webwxgetcontact");
		Ok(json!({
			"BaseResponse": {"Ret": 0, "ErrMsg": ""},
			"MemberCount": 2,
			"MemberList": [
				{"UserName": "@alice", "NickName": "Alice", "RemarkName": ""},
				{"UserName": "@@room", "NickName": "Room", "RemarkName": ""},
			],
		})
		.to_string()
		.into_bytes())
	}

	async fn send_text(&self, _auth: AuthContext<'_>, from: &str, to: &str, content: &str) -> Result<Vec<u8>> {
		assert_eq!(from, ME);
		self.sent.lock().push(("text".into(), to.into(), content.into()));
		Ok(self.send_body())
	}

	async fn upload_media(&self, _auth: AuthContext<'_>, from: &str, _to: &str, file_name: &str, data: Vec<u8>) -> Result<Vec<u8>> {
		assert_eq!(from, ME);
		self.uploads.lock().push((file_name.to_string(), data.len()));
		Ok(br#"{"BaseResponse": {"Ret": 0, "ErrMsg": ""}, "MediaId": "media-1"}"#.to_vec())
	}

	async fn send_image(&self, _auth: AuthContext<'_>, _from: &str, to: &str, media_id: &str) -> Result<Vec<u8>> {
		self.sent.lock().push(("image".into(), to.into(), media_id.into()));
		Ok(self.send_body())
	}

	async fn send_emoticon(&self, _auth: AuthContext<'_>, _from: &str, to: &str, media_id: &str) -> Result<Vec<u8>> {
		self.sent.lock().push(("emoticon".into(), to.into(), media_id.into()));
		Ok(self.send_body())
	}

	async fn revoke(&self, _auth: AuthContext<'_>, _client_msg_id: &str, _svr_msg_id: &str, _to: &str) -> Result<Vec<u8>> {
		Ok(self.send_body())
	}

	async fn fetch_image(&self, _auth: AuthContext<'_>, msg_id: &str) -> Result<Vec<u8>> {
		Ok(format!("img:{msg_id}").into_bytes())
	}

	async fn logout(&self, _auth: AuthContext<'_>) -> Result<()> {
		self.record("webwxlogout");
		Ok(())
	}
}

pub fn cursor(val: i64) -> SyncKeyList {
	SyncKeyList::new(vec![SyncKey { key: 1, val }])
}

/// Batch body carrying `(msg_id, msg_type, content)` messages from `@alice`.
pub fn batch_body(messages: &[(&str, i32, &str)], cursor_val: i64) -> Vec<u8> {
	let list: Vec<_> = messages
		.iter()
		.map(|(id, ty, content)| {
			json!({
				"MsgId": id,
				"Content": content,
				"FromUserName": "@alice",
				"ToUserName": ME,
				"MsgType": ty,
			})
		})
		.collect();
	json!({
		"BaseResponse": {"Ret": 0, "ErrMsg": ""},
		"SyncKey": cursor(cursor_val),
		"AddMsgCount": list.len(),
		"AddMsgList": list,
	})
	.to_string()
	.into_bytes()
}

pub fn credentials() -> Credentials {
	Credentials::new(
		vec![Cookie::new("webwx_data_ticket", "dt")],
		LoginTicket {
			skey: "@crypt_k".into(),
			sid: "sid".into(),
			uin: 7,
			pass_ticket: "pt".into(),
		},
	)
}

/// Config with its shard already assigned.
pub fn config() -> SessionConfig {
	let mut config = SessionConfig::default();
	config.assign_shard(Shard::from_redirect(REDIRECT).expect("fixture redirect is valid"));
	config
}

pub fn session_with(backend: Arc<ScriptedBackend>, options: RuntimeOptions) -> Arc<Session> {
	let me = SelfIdentity {
		user_name: ME.into(),
		nick_name: "bot".into(),
	};
	let contacts = Contacts::new(&me, Vec::new());
	Session::from_parts(backend, config(), credentials(), me, contacts, cursor(0), options)
}

pub fn session() -> Arc<Session> {
	session_with(Arc::new(ScriptedBackend::default()), RuntimeOptions::default())
}

pub fn context() -> HandlerContext {
	HandlerContext {
		session: session(),
		cancel: CancellationToken::new(),
	}
}

pub fn parsed(msg_type: MsgType, content: &str) -> ParsedMessage {
	ParsedMessage {
		msg_id: "1".into(),
		msg_type,
		from_user: "@alice".into(),
		to_user: ME.into(),
		origin_content: content.into(),
		is_group: false,
		speaker: "@alice".into(),
		content: content.into(),
		mention: None,
	}
}
