use serde_derive::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";
pub const HELIX_BASE: &str = "https://api.twitch.tv/helix";

#[derive(Debug, Error)]
pub enum TwitchError {
	#[error("twitch request failed: {0}")]
	Request(#[from] reqwest::Error),
}

/// Live stream record from the helix `streams` endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct StreamInfo {
	pub title: String,
	pub viewer_count: u64,
	pub thumbnail_url: String,
}

impl StreamInfo {
	/// The thumbnail url comes with `{width}` and `{height}` left for the caller.
	pub fn thumbnail(&self, width: u32, height: u32) -> String {
		self.thumbnail_url
			.replace("{width}", &width.to_string())
			.replace("{height}", &height.to_string())
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
}

#[derive(Deserialize)]
struct StreamsResponse {
	data: Vec<StreamInfo>,
}

pub struct TwitchClient {
	client: reqwest::Client,
	client_id: String,
	client_secret: String,
	token_url: String,
	helix_base: String,
}

impl TwitchClient {
	pub fn new(client: reqwest::Client, client_id: &str, client_secret: &str) -> Self {
		TwitchClient {
			client,
			client_id: client_id.to_string(),
			client_secret: client_secret.to_string(),
			token_url: TOKEN_ENDPOINT.to_string(),
			helix_base: HELIX_BASE.to_string(),
		}
	}

	pub fn with_endpoints(mut self, token_url: &str, helix_base: &str) -> Self {
		self.token_url = token_url.to_string();
		self.helix_base = helix_base.trim_end_matches('/').to_string();
		self
	}

	// client credentials grant, a fresh token per run
	async fn app_token(&self) -> Result<String, TwitchError> {
		let token: TokenResponse = self.client
			.post(&self.token_url)
			.query(&[
				("client_id", self.client_id.as_str()),
				("client_secret", self.client_secret.as_str()),
				("grant_type", "client_credentials"),
			])
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		Ok(token.access_token)
	}

	/// `Ok(None)` when the channel is not broadcasting.
	pub async fn live_stream(&self, channel: &str) -> Result<Option<StreamInfo>, TwitchError> {
		let token = self.app_token().await?;
		let streams: StreamsResponse = self.client
			.get(format!("{}/streams", self.helix_base))
			.query(&[("user_login", channel)])
			.bearer_auth(token)
			.header("Client-Id", &self.client_id)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		debug!(channel, streams = streams.data.len(), "helix streams lookup");
		Ok(streams.data.into_iter().next())
	}
}
