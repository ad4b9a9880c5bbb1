use std::path::Path;
use std::time::Duration;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod oauth;

pub use oauth::OAuth1Credentials;

pub const UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
pub const TWEET_URL: &str = "https://api.twitter.com/2/tweets";
/// Bytes sent per APPEND request.
pub const CHUNK_SIZE: usize = 1024 * 1024;
const MAX_STATUS_CHECKS: usize = 30;

#[derive(Debug, Error)]
pub enum TwitterError {
	#[error("twitter request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("could not read media: {0}")]
	Io(#[from] std::io::Error),
	#[error("could not encode form: {0}")]
	Form(#[from] serde_urlencoded::ser::Error),
	#[error("twitter returned {status}: {body}")]
	Api { status: u16, body: String },
	#[error("media {media_id} was not processed: {reason}")]
	Processing { media_id: String, reason: String },
}

#[derive(Deserialize)]
struct MediaUpload {
	media_id_string: String,
	#[serde(default)]
	processing_info: Option<ProcessingInfo>,
}

#[derive(Deserialize)]
struct ProcessingInfo {
	state: String,
	#[serde(default)]
	check_after_secs: u64,
	#[serde(default)]
	error: Option<ProcessingFailure>,
}

#[derive(Deserialize)]
struct ProcessingFailure {
	#[serde(default)]
	message: String,
}

#[derive(Serialize)]
struct TweetMedia<'a> {
	media_ids: &'a [String],
}

#[derive(Serialize)]
struct TweetPayload<'a> {
	text: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	media: Option<TweetMedia<'a>>,
}

#[derive(Deserialize, Debug)]
pub struct PostedTweet {
	pub id: String,
}

#[derive(Deserialize)]
struct TweetResponse {
	data: PostedTweet,
}

pub fn status_url(user: &str, id: &str) -> String {
	format!("https://twitter.com/{}/status/{}", user, id)
}

// mime type and upload category by file extension, GIF unless it looks like a still image
fn media_kind(path: &Path) -> (&'static str, &'static str) {
	let extension = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
	match extension.as_deref() {
		Some("png") => ("image/png", "tweet_image"),
		Some("jpg") | Some("jpeg") => ("image/jpeg", "tweet_image"),
		_ => ("image/gif", "tweet_gif"),
	}
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, TwitterError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().await.unwrap_or_default();
	Err(TwitterError::Api { status: status.as_u16(), body })
}

pub struct TwitterClient {
	client: reqwest::Client,
	credentials: OAuth1Credentials,
	upload_url: String,
	tweet_url: String,
}

impl TwitterClient {
	pub fn new(client: reqwest::Client, credentials: OAuth1Credentials) -> Self {
		TwitterClient {
			client,
			credentials,
			upload_url: UPLOAD_URL.to_string(),
			tweet_url: TWEET_URL.to_string(),
		}
	}

	pub fn with_endpoints(mut self, upload_url: &str, tweet_url: &str) -> Self {
		self.upload_url = upload_url.to_string();
		self.tweet_url = tweet_url.to_string();
		self
	}

	async fn post_form(&self, form: &[(&str, &str)]) -> Result<reqwest::Response, TwitterError> {
		let auth = self.credentials.authorization("POST", &self.upload_url, form);
		let body = serde_urlencoded::to_string(form)?;
		let response = self.client
			.post(&self.upload_url)
			.header(AUTHORIZATION, auth)
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.body(body)
			.send()
			.await?;
		check(response).await
	}

	async fn media_status(&self, media_id: &str) -> Result<MediaUpload, TwitterError> {
		let query = [("command", "STATUS"), ("media_id", media_id)];
		let auth = self.credentials.authorization("GET", &self.upload_url, &query);
		let response = self.client
			.get(&self.upload_url)
			.query(&query)
			.header(AUTHORIZATION, auth)
			.send()
			.await?;
		Ok(check(response).await?.json().await?)
	}

	/// Upload a media file in chunks (INIT, APPEND..., FINALIZE) and return its media id.
	///
	/// When Twitter processes the media asynchronously, STATUS is polled until it
	/// succeeds or fails.
	pub async fn upload_media(&self, path: &Path) -> Result<String, TwitterError> {
		let content = tokio::fs::read(path).await?;
		let (media_type, category) = media_kind(path);
		let total_bytes = content.len().to_string();

		let init: MediaUpload = self.post_form(&[
			("command", "INIT"),
			("total_bytes", total_bytes.as_str()),
			("media_type", media_type),
			("media_category", category),
		]).await?.json().await?;
		let media_id = init.media_id_string;

		for (index, chunk) in content.chunks(CHUNK_SIZE).enumerate() {
			let segment_index = index.to_string();
			let media_data = STANDARD.encode(chunk);
			self.post_form(&[
				("command", "APPEND"),
				("media_id", media_id.as_str()),
				("segment_index", segment_index.as_str()),
				("media_data", media_data.as_str()),
			]).await?;
		}

		let mut upload: MediaUpload = self.post_form(&[("command", "FINALIZE"), ("media_id", media_id.as_str())])
			.await?
			.json()
			.await?;
		let mut checks = 0;
		while let Some(info) = upload.processing_info.take() {
			match info.state.as_str() {
				"succeeded" => break,
				"failed" => {
					let reason = info.error.map(|e| e.message).unwrap_or_else(|| "failed".to_string());
					return Err(TwitterError::Processing { media_id, reason });
				}
				state => {
					checks += 1;
					if checks > MAX_STATUS_CHECKS {
						return Err(TwitterError::Processing { media_id, reason: format!("still {} after {} checks", state, MAX_STATUS_CHECKS) });
					}
					debug!(media_id = %media_id, state, "waiting for media processing");
					tokio::time::sleep(Duration::from_secs(info.check_after_secs)).await;
					upload = self.media_status(&media_id).await?;
				}
			}
		}

		debug!(media_id = %media_id, bytes = content.len(), "media uploaded");
		Ok(media_id)
	}

	pub async fn tweet(&self, text: &str, media_ids: &[String]) -> Result<PostedTweet, TwitterError> {
		let payload = TweetPayload {
			text,
			media: if media_ids.is_empty() { None } else { Some(TweetMedia { media_ids }) },
		};
		let auth = self.credentials.authorization("POST", &self.tweet_url, &[]);

		let response = self.client
			.post(&self.tweet_url)
			.header(AUTHORIZATION, auth)
			.json(&payload)
			.send()
			.await?;
		let posted: TweetResponse = check(response).await?.json().await?;
		Ok(posted.data)
	}
}
