use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{self, Config, ConfigError};
use crate::discord::{self, DiscordClient, DiscordError};
use crate::giphy::{self, GiphyClient, GiphyError};
use crate::helpers;
use crate::openaiapi::{ChatClient, ChatError};
use crate::twitch::{self, StreamInfo, TwitchClient, TwitchError};
use crate::twitter::{self, OAuth1Credentials, TwitterClient, TwitterError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FlowError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Twitch(#[from] TwitchError),
	#[error(transparent)]
	Chat(#[from] ChatError),
	#[error(transparent)]
	Giphy(#[from] GiphyError),
	#[error(transparent)]
	Twitter(#[from] TwitterError),
	#[error(transparent)]
	Discord(#[from] DiscordError),
	#[error("no twitch channel to announce")]
	NoChannel,
}

#[derive(Debug)]
pub enum FlowOutcome {
	Posted(String),
	Skipped(String),
	Failed(FlowError),
}

impl fmt::Display for FlowOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FlowOutcome::Posted(detail) => write!(f, "posted ({})", detail),
			FlowOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
			FlowOutcome::Failed(err) => write!(f, "failed ({})", err),
		}
	}
}

/// Result of each posting flow for one run.
#[derive(Debug)]
pub struct FlowReport {
	pub twitter: FlowOutcome,
	pub discord: FlowOutcome,
}

/// Base urls of every service the run talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
	pub twitch_token: String,
	pub twitch_helix: String,
	pub giphy_search: String,
	pub giphy_media: String,
	pub twitter_upload: String,
	pub twitter_tweet: String,
	pub discord_api: String,
}

impl Default for Endpoints {
	fn default() -> Self {
		Endpoints {
			twitch_token: twitch::TOKEN_ENDPOINT.to_string(),
			twitch_helix: twitch::HELIX_BASE.to_string(),
			giphy_search: giphy::SEARCH_URL.to_string(),
			giphy_media: giphy::MEDIA_BASE.to_string(),
			twitter_upload: twitter::UPLOAD_URL.to_string(),
			twitter_tweet: twitter::TWEET_URL.to_string(),
			discord_api: discord::API_BASE.to_string(),
		}
	}
}

pub struct Notifier<'a> {
	config: &'a Config,
	client: reqwest::Client,
	endpoints: Endpoints,
}

impl<'a> Notifier<'a> {
	pub fn new(config: &'a Config) -> Result<Self, reqwest::Error> {
		let client = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()?;
		Ok(Notifier { config, client, endpoints: Endpoints::default() })
	}

	#[cfg(test)]
	pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;
		self
	}

	fn channel_name(&self) -> &str {
		self.config.params.twitch.as_deref().unwrap_or("channel")
	}

	/// Look the channel up on Twitch. Any failure is logged and treated as not live.
	pub async fn check_live(&self) -> Option<StreamInfo> {
		let Some(channel) = self.config.params.twitch.as_deref() else {
			error!("no --twitch or TWITCH_CHANNEL found");
			return None;
		};
		match self.lookup_stream(channel).await {
			Ok(Some(stream)) => {
				info!(channel, title = %stream.title, viewers = stream.viewer_count, "channel is live");
				Some(stream)
			}
			Ok(None) => {
				warn!("{} is not live!", channel);
				None
			}
			Err(err) => {
				warn!(error = %err, "could not check whether {} is live", channel);
				None
			}
		}
	}

	async fn lookup_stream(&self, channel: &str) -> Result<Option<StreamInfo>, FlowError> {
		let credentials = &self.config.credentials;
		let client_id = config::require(&credentials.twitch_client_id, "TWITCH_CLIENT_ID")?;
		let client_secret = config::require(&credentials.twitch_client_secret, "TWITCH_CLIENT_SECRET")?;
		let twitch = TwitchClient::new(self.client.clone(), client_id, client_secret)
			.with_endpoints(&self.endpoints.twitch_token, &self.endpoints.twitch_helix);
		Ok(twitch.live_stream(channel).await?)
	}

	pub fn should_post(&self, live: Option<&StreamInfo>) -> bool {
		!self.config.only_notify_if_live || live.is_some()
	}

	/// Check the channel, then run the twitter and discord flows one after the other.
	pub async fn run(&self) -> FlowReport {
		let live = self.check_live().await;
		let live = live.as_ref();

		let twitter = match self.config.params.twitter.as_deref() {
			None => {
				info!("no --twitter or TWITTER_USER found");
				FlowOutcome::Skipped("no twitter user".to_string())
			}
			Some(_) if !self.should_post(live) => {
				info!("{} is not live, will not post tweet", self.channel_name());
				FlowOutcome::Skipped("not live".to_string())
			}
			Some(user) => match self.post_to_twitter(user).await {
				Ok(detail) => FlowOutcome::Posted(detail),
				Err(err) => {
					error!(error = %err, "failed to post to twitter");
					FlowOutcome::Failed(err)
				}
			},
		};

		let discord = match self.config.params.discord.as_deref() {
			None => {
				info!("no --discord or DISCORD_CHANNEL_ID found");
				FlowOutcome::Skipped("no discord channel".to_string())
			}
			Some(_) if !self.should_post(live) => {
				info!("{} is not live, will not post discord message", self.channel_name());
				FlowOutcome::Skipped("not live".to_string())
			}
			Some(channel_id) => match self.post_to_discord(channel_id, live).await {
				Ok(detail) => FlowOutcome::Posted(detail),
				Err(err) => {
					error!(error = %err, "failed to post to discord");
					FlowOutcome::Failed(err)
				}
			},
		};

		FlowReport { twitter, discord }
	}

	fn twitter_credentials(&self) -> Result<OAuth1Credentials, ConfigError> {
		let c = &self.config.credentials;
		Ok(OAuth1Credentials {
			consumer_key: config::require(&c.twitter_api_key, "TWITTER_API_KEY")?.to_string(),
			consumer_secret: config::require(&c.twitter_api_key_secret, "TWITTER_API_KEY_SECRET")?.to_string(),
			token: config::require(&c.twitter_access_token, "TWITTER_ACCESS_TOKEN")?.to_string(),
			token_secret: config::require(&c.twitter_access_secret, "TWITTER_ACCESS_SECRET")?.to_string(),
		})
	}

	async fn generate_message(&self) -> Result<String, FlowError> {
		let prompt = self.config.resolved_prompt()?;
		let llm = self.config.llm.endpoint()?;
		let api_key = llm.api_key.clone().ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))?;
		let chat = ChatClient::new(self.client.clone(), llm, api_key);
		let reply = chat.generate(&prompt).await?;
		Ok(helpers::strip_wrapping_quotes(&reply))
	}

	async fn post_to_twitter(&self, user: &str) -> Result<String, FlowError> {
		let params = &self.config.params;
		let pretend = self.config.pretend;

		let text = self.generate_message().await?;
		println!("{}", text);

		let twitter = if pretend {
			None
		} else {
			Some(TwitterClient::new(self.client.clone(), self.twitter_credentials()?)
				.with_endpoints(&self.endpoints.twitter_upload, &self.endpoints.twitter_tweet))
		};

		let mut media_ids = Vec::new();
		if params.use_giphy {
			let offset = params.parse_giphy_offset()?;
			let api_key = config::require(&self.config.credentials.giphy_api_key, "GIPHY_API_KEY")?;
			let giphy = GiphyClient::new(self.client.clone(), api_key)
				.with_endpoints(&self.endpoints.giphy_search, &self.endpoints.giphy_media);
			let gif = giphy.fetch_first(&params.giphy, offset, &self.config.gif_path).await?;
			info!(id = %gif.id, query = %params.giphy, "attaching gif");
			if let Some(twitter) = &twitter {
				media_ids.push(twitter.upload_media(&self.config.gif_path).await?);
			}
		}

		let Some(twitter) = twitter else {
			info!(user, "pretend: not posting tweet");
			return Ok("pretend".to_string());
		};
		let posted = twitter.tweet(&text, &media_ids).await?;
		let link = twitter::status_url(user, &posted.id);
		info!("sent tweet {}", link);
		Ok(link)
	}

	async fn post_to_discord(&self, channel_id: &str, live: Option<&StreamInfo>) -> Result<String, FlowError> {
		let params = &self.config.params;
		let channel = params.twitch.as_deref().ok_or(FlowError::NoChannel)?;
		let embed = discord::live_embed(channel, &params.game, live, params.mention_everyone);

		if self.config.pretend {
			info!(?embed, "pretend: not sending discord message");
			return Ok("pretend".to_string());
		}

		let token = config::require(&self.config.credentials.discord_bot_token, "DISCORD_BOT_TOKEN")?;
		let discord = DiscordClient::new(self.client.clone(), token)
			.with_api_base(&self.endpoints.discord_api);
		let target = discord.fetch_channel(channel_id).await?;
		let message_id = discord.send_embed(&target, &embed).await?;
		info!(message_id = %message_id, "sent message to discord");
		Ok(message_id)
	}
}
