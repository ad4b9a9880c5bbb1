use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod discord;
mod giphy;
mod helpers;
mod notify;
mod openaiapi;
mod twitch;
mod twitter;


use config::{Config, ConfigError};
use helpers::MissingPlaceholder;

/// Announce a live Twitch stream on Twitter and Discord.
///
/// Every flag falls back to an environment variable (a `.env` file is loaded first).
#[derive(Parser, Debug, Default)]
#[clap(name = "live-notifier", version)]
pub struct Cli {
	#[clap(long)]
	/// Twitch channel to check (TWITCH_CHANNEL)
	pub twitch: Option<String>,
	#[clap(long)]
	/// Game being streamed, required (GAME)
	pub game: Option<String>,
	#[clap(long = "useGiphy")]
	/// "true" to attach a GIF to the tweet (USE_GIPHY)
	pub use_giphy: Option<String>,
	#[clap(long)]
	/// Giphy search query, defaults to the game (GIPHY_SEARCH)
	pub giphy: Option<String>,
	#[clap(long = "giphyOffset")]
	/// Offset into the Giphy search results (GIPHY_OFFSET)
	pub giphy_offset: Option<String>,
	#[clap(long)]
	/// Twitter user to post as (TWITTER_USER)
	pub twitter: Option<String>,
	#[clap(long = "onlyNotifyIfLive")]
	/// "true" to skip posting when the channel is not live (ONLY_NOTIFY_IF_LIVE)
	pub only_notify_if_live: Option<String>,
	#[clap(long)]
	/// Discord channel id to announce in (DISCORD_CHANNEL_ID)
	pub discord: Option<String>,
	#[clap(long = "mentionEveryone")]
	/// "true" to add @everyone to the Discord announcement (MENTION_EVERYONE)
	pub mention_everyone: Option<String>,
	#[clap(long)]
	/// Prompt template with ${name} placeholders (DEFAULT_PROMPT)
	pub prompt: Option<String>,
	#[clap(long = "missingPlaceholder", value_enum)]
	/// How to expand placeholders without a value (MISSING_PLACEHOLDER)
	pub missing_placeholder: Option<MissingPlaceholder>,
	#[clap(long = "gifPath")]
	/// Where the downloaded GIF is written (GIF_PATH)
	pub gif_path: Option<PathBuf>,
	#[clap(long)]
	/// Do the read-only calls and log what would be posted
	pub pretend: bool,
	#[clap(short, long)]
	/// Debug logging (RUST_LOG takes precedence)
	pub verbose: bool,
}

fn init_logging(verbose: bool) {
	let level = if verbose { Level::DEBUG } else { Level::INFO };
	let filter = EnvFilter::builder()
		.with_default_directive(level.into())
		.from_env_lossy();
	let _ = tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr).with_target(false))
		.with(filter)
		.try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();
	let args = Cli::parse();
	init_logging(args.verbose);

	let config = match Config::from_env(&args) {
		Ok(config) => config,
		Err(err) => {
			let kind = match err {
				ConfigError::MissingGame => clap::error::ErrorKind::MissingRequiredArgument,
				_ => clap::error::ErrorKind::InvalidValue,
			};
			Cli::command().error(kind, err).exit();
		}
	};

	let notifier = notify::Notifier::new(&config)?;
	let report = notifier.run().await;
	debug!(twitter = %report.twitter, discord = %report.discord, "run finished");
	Ok(())
}
