//! HTTP implementation of the backend traits.
//!
//! Each method is a thin wrapper around one vendor endpoint: build the URL and
//! body, attach cookies and the browser user agent, and return the body. Status
//! interpretation is left to the callers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use tracing::debug;
use wxweb_protocol::{Cookie, LoginResponse, SelfIdentity, SyncCheck, SyncKeyList, base_response, parse_qr_token, parse_sync_check};

use crate::backend::{AuthContext, LoginApi, SessionApi, SyncApi};
use crate::config::SessionConfig;
use crate::credentials::{Credentials, DATA_TICKET_COOKIE};
use crate::error::{Error, Result};

/// Redirect target the QR handshake is started with.
const LOGIN_REDIRECT: &str = "https://wx.qq.com/cgi-bin/mmwebwx-bin/webwxnewloginpage";

/// Long polls are held open server-side for ~25s; leave headroom.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend talking to the vendor over HTTPS.
#[derive(Debug, Clone)]
pub struct WebBackend {
	client: Client,
}

impl WebBackend {
	pub fn new() -> Result<Self> {
		let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
		Ok(Self { client })
	}

	/// Uses a caller-configured client (proxies, custom TLS, ...).
	pub fn with_client(client: Client) -> Self {
		Self { client }
	}

	fn get(&self, config: &SessionConfig, url: &str) -> RequestBuilder {
		self.client.get(url).header(USER_AGENT, config.user_agent.as_str())
	}

	fn post(&self, config: &SessionConfig, url: &str) -> RequestBuilder {
		self.client.post(url).header(USER_AGENT, config.user_agent.as_str())
	}

	fn authed_get(&self, auth: AuthContext<'_>, url: &str) -> RequestBuilder {
		self.get(auth.config, url).header(COOKIE, auth.credentials.cookie_header())
	}

	fn authed_post(&self, auth: AuthContext<'_>, url: &str) -> RequestBuilder {
		self.post(auth.config, url).header(COOKIE, auth.credentials.cookie_header())
	}

	async fn post_json(&self, auth: AuthContext<'_>, call: &'static str, path: &str, query: &[(&str, String)], body: &Value) -> Result<Vec<u8>> {
		let url = cgi(auth, path)?;
		debug!(call, "POST {}", url);
		let response = self.authed_post(auth, &url).query(query).json(body).send().await?;
		read_bytes(call, response).await
	}

	async fn get_bytes(&self, auth: AuthContext<'_>, call: &'static str, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>> {
		let url = cgi(auth, path)?;
		debug!(call, "GET {}", url);
		let response = self.authed_get(auth, &url).query(query).send().await?;
		read_bytes(call, response).await
	}

	async fn send_msg(&self, auth: AuthContext<'_>, call: &'static str, path: &str, query: &[(&str, String)], msg: Value) -> Result<Vec<u8>> {
		let body = json!({
			"BaseRequest": auth.credentials.base_request(auth.config),
			"Msg": msg,
			"Scene": 0,
		});
		self.post_json(auth, call, path, query, &body).await
	}
}

#[async_trait]
impl LoginApi for WebBackend {
	async fn request_qr_token(&self, config: &SessionConfig) -> Result<String> {
		let url = format!("{}/jslogin", config.login_url);
		let response = self
			.get(config, &url)
			.query(&[
				("appid", config.app_id.clone()),
				("redirect_uri", LOGIN_REDIRECT.to_string()),
				("fun", "new".to_string()),
				("lang", config.lang.clone()),
				("_", now_millis().to_string()),
			])
			.send()
			.await?;
		let body = read_text("jslogin", response).await?;
		Ok(parse_qr_token(&body)?)
	}

	async fn poll_login(&self, config: &SessionConfig, qr_token: &str, tip: bool) -> Result<String> {
		let url = format!("{}/cgi-bin/mmwebwx-bin/login", config.login_url);
		let response = self
			.get(config, &url)
			.query(&[
				("tip", if tip { "1" } else { "0" }.to_string()),
				("uuid", qr_token.to_string()),
				("_", now_millis().to_string()),
			])
			.send()
			.await?;
		read_text("login", response).await
	}

	async fn open_login_page(&self, config: &SessionConfig) -> Result<Credentials> {
		let shard = config.shard()?;
		let url = format!("{}&fun=new&version=v2", shard.redirect_url);
		let response = self.get(config, &url).send().await?;

		let cookies: Vec<Cookie> = response
			.headers()
			.get_all(SET_COOKIE)
			.iter()
			.filter_map(|v| v.to_str().ok())
			.filter_map(Cookie::parse_set_cookie)
			.collect();

		let body = read_text("webwxnewloginpage", response).await?;
		let page = LoginResponse::from_xml(&body)?;
		match page.ticket {
			Some(ticket) if page.ret == 0 => Ok(Credentials::new(cookies, ticket)),
			_ => Err(Error::LoginRejected {
				ret: page.ret,
				message: page.message,
			}),
		}
	}
}

#[async_trait]
impl SyncApi for WebBackend {
	async fn sync_check(&self, auth: AuthContext<'_>, sync_host: &str, sync_key: &SyncKeyList) -> Result<SyncCheck> {
		let ticket = &auth.credentials.ticket;
		let url = format!("{}/cgi-bin/mmwebwx-bin/synccheck", sync_base(sync_host));
		let response = self
			.authed_get(auth, &url)
			.query(&[
				("r", now_millis().to_string()),
				("skey", ticket.skey.clone()),
				("sid", ticket.sid.clone()),
				("uin", ticket.uin.to_string()),
				("deviceid", auth.config.device_id.clone()),
				("synckey", sync_key.to_query()),
				("_", now_millis().to_string()),
			])
			.send()
			.await?;
		let body = read_text("synccheck", response).await?;
		Ok(parse_sync_check(&body)?)
	}

	async fn fetch_batch(&self, auth: AuthContext<'_>, sync_key: &SyncKeyList) -> Result<Vec<u8>> {
		let ticket = &auth.credentials.ticket;
		let body = json!({
			"BaseRequest": auth.credentials.base_request(auth.config),
			"SyncKey": sync_key,
			"rr": -now_millis(),
		});
		let query = [
			("sid", ticket.sid.clone()),
			("skey", ticket.skey.clone()),
			("pass_ticket", ticket.pass_ticket.clone()),
		];
		self.post_json(auth, "webwxsync", "webwxsync", &query, &body).await
	}
}

#[async_trait]
impl SessionApi for WebBackend {
	async fn init(&self, auth: AuthContext<'_>) -> Result<Vec<u8>> {
		let ticket = &auth.credentials.ticket;
		let body = json!({ "BaseRequest": auth.credentials.base_request(auth.config) });
		let query = [
			("pass_ticket", ticket.pass_ticket.clone()),
			("skey", ticket.skey.clone()),
			("r", now_millis().to_string()),
		];
		self.post_json(auth, "webwxinit", "webwxinit", &query, &body).await
	}

	async fn status_notify(&self, auth: AuthContext<'_>, me: &SelfIdentity) -> Result<i64> {
		let body = json!({
			"BaseRequest": auth.credentials.base_request(auth.config),
			"Code": 3,
			"FromUserName": me.user_name,
			"ToUserName": me.user_name,
			"ClientMsgId": now_millis(),
		});
		let query = [
			("lang", auth.config.lang.clone()),
			("pass_ticket", auth.credentials.ticket.pass_ticket.clone()),
		];
		let raw = self.post_json(auth, "webwxstatusnotify", "webwxstatusnotify", &query, &body).await?;
		Ok(base_response(&raw)?.ret)
	}

	async fn fetch_contacts(&self, auth: AuthContext<'_>) -> Result<Vec<u8>> {
		let ticket = &auth.credentials.ticket;
		let query = [
			("pass_ticket", ticket.pass_ticket.clone()),
			("skey", ticket.skey.clone()),
			("r", now_millis().to_string()),
		];
		self.get_bytes(auth, "webwxgetcontact", "webwxgetcontact", &query).await
	}

	async fn send_text(&self, auth: AuthContext<'_>, from: &str, to: &str, content: &str) -> Result<Vec<u8>> {
		let id = client_msg_id();
		let msg = json!({
			"Type": 1,
			"Content": content,
			"FromUserName": from,
			"ToUserName": to,
			"LocalID": id,
			"ClientMsgId": id,
		});
		let query = [("pass_ticket", auth.credentials.ticket.pass_ticket.clone())];
		self.send_msg(auth, "webwxsendmsg", "webwxsendmsg", &query, msg).await
	}

	async fn upload_media(&self, auth: AuthContext<'_>, from: &str, to: &str, file_name: &str, data: Vec<u8>) -> Result<Vec<u8>> {
		let size = data.len();
		let mime = mime_for(file_name);
		let media_type = if mime.starts_with("image/") { "pic" } else { "doc" };
		let request = json!({
			"UploadType": 2,
			"BaseRequest": auth.credentials.base_request(auth.config),
			"ClientMediaId": now_millis(),
			"TotalLen": size,
			"StartPos": 0,
			"DataLen": size,
			"MediaType": 4,
			"FromUserName": from,
			"ToUserName": to,
			"FileMd5": "",
		});

		let part = Part::bytes(data).file_name(file_name.to_string()).mime_str(&mime)?;
		let form = Form::new()
			.text("id", "WU_FILE_0")
			.text("name", file_name.to_string())
			.text("type", mime.clone())
			.text("lastModifiedDate", "Mon Jan 01 2018 00:00:00 GMT+0800 (CST)")
			.text("size", size.to_string())
			.text("mediatype", media_type)
			.text("uploadmediarequest", request.to_string())
			.text("webwx_data_ticket", auth.credentials.cookie(DATA_TICKET_COOKIE).unwrap_or_default().to_string())
			.text("pass_ticket", auth.credentials.ticket.pass_ticket.clone())
			.part("filename", part);

		debug!(call = "webwxuploadmedia", file_name, size, "POST {}", auth.config.upload_url);
		let response = self.authed_post(auth, &auth.config.upload_url).multipart(form).send().await?;
		read_bytes("webwxuploadmedia", response).await
	}

	async fn send_image(&self, auth: AuthContext<'_>, from: &str, to: &str, media_id: &str) -> Result<Vec<u8>> {
		let id = client_msg_id();
		let msg = json!({
			"Type": 3,
			"MediaId": media_id,
			"FromUserName": from,
			"ToUserName": to,
			"LocalID": id,
			"ClientMsgId": id,
		});
		let query = [
			("fun", "async".to_string()),
			("f", "json".to_string()),
			("pass_ticket", auth.credentials.ticket.pass_ticket.clone()),
		];
		self.send_msg(auth, "webwxsendmsgimg", "webwxsendmsgimg", &query, msg).await
	}

	async fn send_emoticon(&self, auth: AuthContext<'_>, from: &str, to: &str, media_id: &str) -> Result<Vec<u8>> {
		let id = client_msg_id();
		let msg = json!({
			"Type": 47,
			"EmojiFlag": 2,
			"MediaId": media_id,
			"FromUserName": from,
			"ToUserName": to,
			"LocalID": id,
			"ClientMsgId": id,
		});
		let query = [
			("fun", "sys".to_string()),
			("pass_ticket", auth.credentials.ticket.pass_ticket.clone()),
		];
		self.send_msg(auth, "webwxsendemoticon", "webwxsendemoticon", &query, msg).await
	}

	async fn revoke(&self, auth: AuthContext<'_>, client_msg_id: &str, svr_msg_id: &str, to: &str) -> Result<Vec<u8>> {
		let body = json!({
			"BaseRequest": auth.credentials.base_request(auth.config),
			"ClientMsgId": client_msg_id,
			"SvrMsgId": svr_msg_id,
			"ToUserName": to,
		});
		let query = [("pass_ticket", auth.credentials.ticket.pass_ticket.clone())];
		self.post_json(auth, "webwxrevokemsg", "webwxrevokemsg", &query, &body).await
	}

	async fn fetch_image(&self, auth: AuthContext<'_>, msg_id: &str) -> Result<Vec<u8>> {
		let query = [("MsgID", msg_id.to_string()), ("skey", auth.credentials.ticket.skey.clone())];
		self.get_bytes(auth, "webwxgetmsgimg", "webwxgetmsgimg", &query).await
	}

	async fn logout(&self, auth: AuthContext<'_>) -> Result<()> {
		let ticket = &auth.credentials.ticket;
		let url = cgi(auth, "webwxlogout")?;
		let response = self
			.authed_post(auth, &url)
			.query(&[("redirect", "1"), ("type", "1"), ("skey", ticket.skey.as_str())])
			.form(&[("sid", ticket.sid.clone()), ("uin", ticket.uin.to_string())])
			.send()
			.await?;
		read_bytes("webwxlogout", response).await.map(|_| ())
	}
}

fn cgi(auth: AuthContext<'_>, path: &str) -> Result<String> {
	Ok(format!("{}/{}", auth.config.shard()?.cgi_url, path))
}

/// Sync hosts are bare hostnames; an explicit scheme is kept as given.
fn sync_base(sync_host: &str) -> String {
	if sync_host.contains("://") {
		sync_host.trim_end_matches('/').to_string()
	} else {
		format!("https://{sync_host}")
	}
}

async fn read_bytes(call: &'static str, response: Response) -> Result<Vec<u8>> {
	let status = response.status();
	if !status.is_success() {
		return Err(Error::HttpStatus { call, status: status.as_u16() });
	}
	Ok(response.bytes().await?.to_vec())
}

async fn read_text(call: &'static str, response: Response) -> Result<String> {
	let status = response.status();
	if !status.is_success() {
		return Err(Error::HttpStatus { call, status: status.as_u16() });
	}
	Ok(response.text().await?)
}

fn now_millis() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as i64
}

/// Millisecond timestamp followed by four random digits.
fn client_msg_id() -> String {
	let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
	format!("{}{:04}", now_millis(), suffix)
}

fn mime_for(file_name: &str) -> String {
	mime_guess::from_path(file_name).first_or_octet_stream().essence_str().to_string()
}
