use reqwest::header::AUTHORIZATION;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::twitch::StreamInfo;

pub const API_BASE: &str = "https://discord.com/api/v10";
pub const TWITCH_PURPLE: u32 = 0x6441A4;
const THUMBNAIL_SIZE: (u32, u32) = (1280, 720);

// guild text and announcement channels
const TEXT_CHANNEL_TYPES: [u8; 2] = [0, 5];

#[derive(Debug, Error)]
pub enum DiscordError {
	#[error("discord request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("discord returned {status}: {body}")]
	Api { status: u16, body: String },
	#[error("channel {0} is not a text channel")]
	NotTextChannel(String),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmbedField {
	pub name: String,
	pub value: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmbedThumbnail {
	pub url: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Embed {
	pub title: String,
	pub description: String,
	pub color: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<EmbedThumbnail>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub fields: Vec<EmbedField>,
}

/// The stream announcement, with stream details only when the channel is live.
pub fn live_embed(channel: &str, game: &str, stream: Option<&StreamInfo>, mention_everyone: bool) -> Embed {
	let (title, link_text) = match stream {
		Some(_) => (format!("{} is now live on Twitch!", channel), "Watch the stream"),
		None => (format!("{} is on Twitch!", channel), "Check out the channel"),
	};
	let mut description = format!("**[{}](https://twitch.tv/{})**", link_text, channel);
	if mention_everyone {
		description.push_str(" @everyone");
	}

	let mut embed = Embed {
		title,
		description,
		color: TWITCH_PURPLE,
		thumbnail: None,
		fields: Vec::new(),
	};
	if let Some(stream) = stream {
		let (width, height) = THUMBNAIL_SIZE;
		embed.thumbnail = Some(EmbedThumbnail { url: stream.thumbnail(width, height) });
		embed.fields = vec![
			EmbedField { name: "Game".to_string(), value: game.to_string() },
			EmbedField { name: "Title".to_string(), value: stream.title.clone() },
			EmbedField { name: "Viewers".to_string(), value: stream.viewer_count.to_string() },
		];
	}
	embed
}

#[derive(Deserialize, Debug)]
pub struct Channel {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: u8,
}

impl Channel {
	pub fn is_text(&self) -> bool {
		TEXT_CHANNEL_TYPES.contains(&self.kind)
	}
}

#[derive(Serialize)]
struct CreateMessage<'a> {
	embeds: [&'a Embed; 1],
}

#[derive(Deserialize)]
struct SentMessage {
	id: String,
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, DiscordError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().await.unwrap_or_default();
	Err(DiscordError::Api { status: status.as_u16(), body })
}

/// Bot-token REST client.
pub struct DiscordClient {
	client: reqwest::Client,
	token: String,
	api_base: String,
}

impl DiscordClient {
	pub fn new(client: reqwest::Client, token: &str) -> Self {
		DiscordClient { client, token: token.to_string(), api_base: API_BASE.to_string() }
	}

	pub fn with_api_base(mut self, api_base: &str) -> Self {
		self.api_base = api_base.trim_end_matches('/').to_string();
		self
	}

	fn authorization(&self) -> String {
		format!("Bot {}", self.token)
	}

	pub async fn fetch_channel(&self, channel_id: &str) -> Result<Channel, DiscordError> {
		let response = self.client
			.get(format!("{}/channels/{}", self.api_base, channel_id))
			.header(AUTHORIZATION, self.authorization())
			.send()
			.await?;
		Ok(check(response).await?.json().await?)
	}

	/// Post `embed` to a text channel and return the message id.
	pub async fn send_embed(&self, channel: &Channel, embed: &Embed) -> Result<String, DiscordError> {
		if !channel.is_text() {
			return Err(DiscordError::NotTextChannel(channel.id.clone()));
		}
		let response = self.client
			.post(format!("{}/channels/{}/messages", self.api_base, channel.id))
			.header(AUTHORIZATION, self.authorization())
			.json(&CreateMessage { embeds: [embed] })
			.send()
			.await?;
		let sent: SentMessage = check(response).await?.json().await?;
		Ok(sent.id)
	}
}
