use std::collections::HashMap;
use std::path::PathBuf;
use clap::ValueEnum;
use thiserror::Error;
use url::Url;

use crate::helpers::{self, MissingPlaceholder, TemplateProcessor};
use crate::Cli;

pub const DEFAULT_GIF_PATH: &str = "./gif.gif";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("please supply a --game")]
	MissingGame,
	#[error("no --prompt or DEFAULT_PROMPT found")]
	MissingPrompt,
	#[error("invalid --giphyOffset {0:?}, expected a non-negative integer")]
	InvalidGiphyOffset(String),
	#[error("invalid --missingPlaceholder {0:?}, expected keep, undefined or empty")]
	InvalidMissingPlaceholder(String),
	#[error("invalid language model endpoint {url}: {source}")]
	InvalidEndpoint {
		url: String,
		#[source]
		source: url::ParseError,
	},
	#[error("{0} is not set")]
	MissingCredential(&'static str),
}

/// Values a prompt template can reference by name.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
	pub twitch: Option<String>,
	pub game: String,
	pub use_giphy: bool,
	pub giphy: String,
	pub giphy_offset: String,
	pub twitter: Option<String>,
	pub discord: Option<String>,
	pub mention_everyone: bool,
}

impl RunParameters {
	pub const NAMES: [&'static str; 8] = [
		"twitch",
		"game",
		"useGiphy",
		"giphy",
		"giphyOffset",
		"twitter",
		"discord",
		"mentionEveryone",
	];

	/// String form of a parameter, `None` for unknown names and unset values.
	pub fn get(&self, name: &str) -> Option<String> {
		match name {
			"twitch" => self.twitch.clone(),
			"game" => Some(self.game.clone()),
			"useGiphy" => Some(self.use_giphy.to_string()),
			"giphy" => Some(self.giphy.clone()),
			"giphyOffset" => Some(self.giphy_offset.clone()),
			"twitter" => self.twitter.clone(),
			"discord" => self.discord.clone(),
			"mentionEveryone" => Some(self.mention_everyone.to_string()),
			_ => None,
		}
	}

	pub fn replacements(&self) -> HashMap<String, String> {
		Self::NAMES
			.iter()
			.filter_map(|name| self.get(name).map(|value| (name.to_string(), value)))
			.collect()
	}

	/// The giphy offset as a number. Only the GIF step needs it.
	pub fn parse_giphy_offset(&self) -> Result<u32, ConfigError> {
		self.giphy_offset
			.trim()
			.parse::<u32>()
			.map_err(|_| ConfigError::InvalidGiphyOffset(self.giphy_offset.clone()))
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiKey {
	Bearer(String),
	/// Sent as an `api-key` header to Azure deployments.
	Azure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmEndpoint {
	pub url: Url,
	pub api_key: Option<ApiKey>,
	pub model: String,
}

/// Language model settings as read from the environment, checked when a message is generated.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
	pub url: String,
	pub api_key: Option<ApiKey>,
	pub model: String,
}

impl LlmSettings {
	pub fn endpoint(&self) -> Result<LlmEndpoint, ConfigError> {
		let url = Url::parse(&self.url)
			.map_err(|source| ConfigError::InvalidEndpoint { url: self.url.clone(), source })?;
		Ok(LlmEndpoint { url, api_key: self.api_key.clone(), model: self.model.clone() })
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
	pub twitch_client_id: Option<String>,
	pub twitch_client_secret: Option<String>,
	pub twitter_api_key: Option<String>,
	pub twitter_api_key_secret: Option<String>,
	pub twitter_access_token: Option<String>,
	pub twitter_access_secret: Option<String>,
	pub giphy_api_key: Option<String>,
	pub discord_bot_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
	pub params: RunParameters,
	pub only_notify_if_live: bool,
	pub prompt: Option<String>,
	pub missing_placeholder: MissingPlaceholder,
	pub gif_path: PathBuf,
	pub pretend: bool,
	pub llm: LlmSettings,
	pub credentials: Credentials,
}

// "true" enables, any other supplied value disables, unset keeps the default
fn parse_switch(value: Option<String>) -> bool {
	value.map_or(true, |v| v == "true")
}

impl Config {
	pub fn from_env(args: &Cli) -> Result<Self, ConfigError> {
		Self::resolve(args, |name| std::env::var(name).ok())
	}

	/// Resolve every setting with the precedence flag > environment > default.
	pub fn resolve<F>(args: &Cli, env: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let lookup = |name: &str| helpers::non_empty(env(name));
		let pick = |flag: &Option<String>, name: &str| helpers::non_empty(flag.clone()).or_else(|| lookup(name));

		let game = pick(&args.game, "GAME").ok_or(ConfigError::MissingGame)?;
		let params = RunParameters {
			twitch: pick(&args.twitch, "TWITCH_CHANNEL"),
			giphy: pick(&args.giphy, "GIPHY_SEARCH").unwrap_or_else(|| game.clone()),
			game,
			use_giphy: parse_switch(pick(&args.use_giphy, "USE_GIPHY")),
			giphy_offset: pick(&args.giphy_offset, "GIPHY_OFFSET").unwrap_or_else(|| "0".to_string()),
			twitter: pick(&args.twitter, "TWITTER_USER"),
			discord: pick(&args.discord, "DISCORD_CHANNEL_ID"),
			mention_everyone: parse_switch(pick(&args.mention_everyone, "MENTION_EVERYONE")),
		};

		let missing_placeholder = match args.missing_placeholder {
			Some(policy) => policy,
			None => match lookup("MISSING_PLACEHOLDER") {
				Some(value) => MissingPlaceholder::from_str(&value, true)
					.map_err(|_| ConfigError::InvalidMissingPlaceholder(value))?,
				None => MissingPlaceholder::default(),
			},
		};

		let gif_path = args.gif_path.clone()
			.or_else(|| lookup("GIF_PATH").map(PathBuf::from))
			.unwrap_or_else(|| PathBuf::from(DEFAULT_GIF_PATH));

		Ok(Config {
			params,
			only_notify_if_live: parse_switch(pick(&args.only_notify_if_live, "ONLY_NOTIFY_IF_LIVE")),
			prompt: pick(&args.prompt, "DEFAULT_PROMPT"),
			missing_placeholder,
			gif_path,
			pretend: args.pretend,
			llm: resolve_llm(&lookup),
			credentials: Credentials {
				twitch_client_id: lookup("TWITCH_CLIENT_ID"),
				twitch_client_secret: lookup("TWITCH_CLIENT_SECRET"),
				twitter_api_key: lookup("TWITTER_API_KEY"),
				twitter_api_key_secret: lookup("TWITTER_API_KEY_SECRET"),
				twitter_access_token: lookup("TWITTER_ACCESS_TOKEN"),
				twitter_access_secret: lookup("TWITTER_ACCESS_SECRET"),
				giphy_api_key: lookup("GIPHY_API_KEY"),
				discord_bot_token: lookup("DISCORD_BOT_TOKEN"),
			},
		})
	}

	/// Expand the prompt template against the run parameters.
	pub fn resolved_prompt(&self) -> Result<String, ConfigError> {
		let template = self.prompt.as_deref().ok_or(ConfigError::MissingPrompt)?;
		let processor = TemplateProcessor::with_replacements(self.params.replacements())
			.missing_placeholder(self.missing_placeholder);
		Ok(processor.process_template(template))
	}
}

fn resolve_llm<F>(lookup: &F) -> LlmSettings
where
	F: Fn(&str) -> Option<String>,
{
	let model = lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

	let azure = (lookup("AZURE_API_KEY"), lookup("AZURE_API_BASE"), lookup("AZURE_API_VERSION"));
	let (url, api_key) = if let (Some(key), Some(base), Some(ver)) = azure {
		(format!("{}chat/completions?api-version={}", base, ver), Some(ApiKey::Azure(key)))
	} else {
		let base = lookup("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string());
		(format!("{}/chat/completions", base.trim_end_matches('/')), lookup("OPENAI_API_KEY").map(ApiKey::Bearer))
	};
	LlmSettings { url, api_key, model }
}

pub fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
	value.as_deref().ok_or(ConfigError::MissingCredential(name))
}
